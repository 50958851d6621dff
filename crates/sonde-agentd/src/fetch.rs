use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid request method {0:?}")]
    Method(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("file transport is disabled (pass --enable-file-transport)")]
    FileTransportDisabled,

    #[error("failed to read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("response is not valid json: {body}: {source}")]
    Json {
        body: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("probe deadline exceeded while fetching target")]
    Cancelled,
}

/// Target acquisition: retrieve and parse one JSON document.
///
/// The pipeline only ever sees the parsed value; everything about the
/// transport lives behind this trait, which also keeps probe handling
/// testable with a stub.
#[async_trait]
pub trait Fetch: Send + Sync + 'static {
    async fn retrieve(
        &self,
        method: &str,
        target: &str,
        headers: &HashMap<String, String>,
        body: Option<String>,
    ) -> Result<Value, FetchError>;
}

/// Fetcher backed by reqwest, with an optional `file://` transport for
/// probing local JSON documents.
pub struct HttpFetcher {
    client: reqwest::Client,
    file_transport: bool,
}

impl HttpFetcher {
    pub fn new(file_transport: bool) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().gzip(true).build()?;
        Ok(Self {
            client,
            file_transport,
        })
    }

    async fn retrieve_file(&self, target: &str) -> Result<Value, FetchError> {
        if !self.file_transport {
            return Err(FetchError::FileTransportDisabled);
        }
        let path = target.trim_start_matches("file://");
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| FetchError::File {
                path: path.to_string(),
                source,
            })?;
        parse_document(raw)
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn retrieve(
        &self,
        method: &str,
        target: &str,
        headers: &HashMap<String, String>,
        body: Option<String>,
    ) -> Result<Value, FetchError> {
        if target.starts_with("file://") {
            return self.retrieve_file(target).await;
        }

        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| FetchError::Method(method.to_string()))?;

        let mut request = self.client.request(method, target);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        trace!(status = %response.status(), target, "target responded");

        parse_document(response.text().await?)
    }
}

/// Parse the response body, keeping the raw text in the error so a
/// misconfigured target is diagnosable from the log line.
fn parse_document(raw: String) -> Result<Value, FetchError> {
    serde_json::from_str(&raw).map_err(|source| FetchError::Json { body: raw, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_transport_reads_local_json() {
        let path = std::env::temp_dir().join("sonde-fetch-test.json");
        tokio::fs::write(&path, r#"{"up": 1}"#).await.unwrap();

        let fetcher = HttpFetcher::new(true).unwrap();
        let target = format!("file://{}", path.display());
        let value = fetcher
            .retrieve("GET", &target, &HashMap::new(), None)
            .await
            .unwrap();

        assert_eq!(value, serde_json::json!({"up": 1}));
    }

    #[tokio::test]
    async fn file_transport_is_gated() {
        let fetcher = HttpFetcher::new(false).unwrap();
        let err = fetcher
            .retrieve("GET", "file:///tmp/x.json", &HashMap::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::FileTransportDisabled));
    }

    #[tokio::test]
    async fn non_json_body_keeps_text_in_error() {
        let path = std::env::temp_dir().join("sonde-fetch-test.txt");
        tokio::fs::write(&path, "not json").await.unwrap();

        let fetcher = HttpFetcher::new(true).unwrap();
        let target = format!("file://{}", path.display());
        let err = fetcher
            .retrieve("GET", &target, &HashMap::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Json { body, .. } if body == "not json"));
    }

    #[tokio::test]
    async fn invalid_method_is_rejected() {
        let fetcher = HttpFetcher::new(false).unwrap();
        let err = fetcher
            .retrieve("G E T", "http://localhost/", &HashMap::new(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Method(_)));
    }
}
