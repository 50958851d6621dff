use std::path::Path;

use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported config file {0} (expected .json, .yaml or .yml)")]
    UnsupportedExtension(String),

    #[error("invalid json config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid yaml config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Load a config file, dispatching the parser on the file extension.
///
/// When `expand` is set, `$NAME` / `${NAME}` references are replaced from the
/// process environment before parsing.
pub fn load_from_file(path: impl AsRef<Path>, expand: bool) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let mut raw = std::fs::read_to_string(path)?;
    if expand {
        raw = expand_env(&raw);
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    load_from_str(&raw, ext)
}

/// Parse config text as the given format (`json`, `yaml` or `yml`).
pub fn load_from_str(raw: &str, format: &str) -> Result<Config, ConfigError> {
    match format {
        "json" => Ok(serde_json::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        other => Err(ConfigError::UnsupportedExtension(other.to_string())),
    }
}

/// Replace `$NAME` and `${NAME}` with the corresponding environment variable.
///
/// Unset variables expand to the empty string. A `$` not followed by an
/// identifier or `{` is kept verbatim.
pub fn expand_env(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some(&(_, '{')) => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if closed {
                    out.push_str(&std::env::var(&name).unwrap_or_default());
                } else {
                    out.push_str("${");
                    out.push_str(&name);
                }
            }
            Some(&(_, c)) if c == '_' || c.is_ascii_alphabetic() => {
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c == '_' || c.is_ascii_alphanumeric() {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(&std::env::var(&name).unwrap_or_default());
            }
            _ => out.push('$'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
modules:
  wireguard:
    headers:
      Authorization: Bearer token
    metrics:
      - query: .peers
        name: '"rx_bytes"'
        labels:
          machine: "@.name"
        valueType: gauge
        value: "@.rx"
"#;

    #[test]
    fn parses_yaml_module() {
        let cfg = load_from_str(YAML, "yaml").unwrap();
        let module = cfg.module("wireguard").unwrap();

        assert_eq!(module.headers["Authorization"], "Bearer token");
        assert_eq!(module.metrics.len(), 1);

        let metric = &module.metrics[0];
        assert_eq!(metric.query, ".peers");
        assert_eq!(metric.value_type, "gauge");
        assert_eq!(metric.labels["machine"], "@.name");
    }

    #[test]
    fn parses_json_module() {
        let raw = r#"{"modules":{"m":{"metrics":[{"name":"up","valueType":"gauge","value":".up"}]}}}"#;
        let cfg = load_from_str(raw, "json").unwrap();
        let metric = &cfg.module("m").unwrap().metrics[0];
        assert_eq!(metric.name, "up");
        assert!(metric.query.is_empty());
        assert!(metric.labels.is_empty());
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = load_from_str("{}", "toml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedExtension(_)));
    }

    #[test]
    fn expands_env_references() {
        unsafe { std::env::set_var("SONDE_TEST_TOKEN", "s3cret") };

        assert_eq!(expand_env("x=$SONDE_TEST_TOKEN"), "x=s3cret");
        assert_eq!(expand_env("x=${SONDE_TEST_TOKEN}!"), "x=s3cret!");
        assert_eq!(expand_env("x=$SONDE_TEST_UNSET_VAR"), "x=");
        assert_eq!(expand_env("100$ and $$"), "100$ and $$");
    }
}
