use time::{UtcOffset, format_description::well_known::Rfc3339};
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, fmt, fmt::time::OffsetTime, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config::{LogConfig, LogFormat};
use crate::error::LogError;

/// Install the global tracing subscriber for the given configuration.
pub fn log_init(cfg: &LogConfig) -> Result<(), LogError> {
    let filter = mk_filter(&cfg.level)?;

    match cfg.format {
        LogFormat::Text => {
            let layer = fmt::layer()
                .with_ansi(cfg.use_color)
                .with_target(cfg.with_targets)
                .with_timer(mk_timer());
            install(tracing_subscriber::registry().with(filter).with(layer))
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(cfg.with_targets)
                .with_timer(mk_timer());
            install(tracing_subscriber::registry().with(filter).with(layer))
        }
    }
}

fn mk_filter(level: &str) -> Result<EnvFilter, LogError> {
    EnvFilter::try_new(level).map_err(|_| LogError::InvalidLevel(level.to_string()))
}

fn mk_timer() -> OffsetTime<Rfc3339> {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    OffsetTime::new(offset, Rfc3339)
}

fn install<S>(subscriber: S) -> Result<(), LogError>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber.try_init().map_err(|e| {
        let s = e.to_string();
        if s.contains("a global default trace dispatcher has already been set") {
            LogError::AlreadyInitialized
        } else {
            LogError::InitializationFailed(s)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_level_directive() {
        let cfg = LogConfig {
            level: "not a [filter".to_string(),
            ..LogConfig::default()
        };
        assert!(matches!(log_init(&cfg), Err(LogError::InvalidLevel(_))));
    }

    #[test]
    fn installs_rfc3339_timestamped_subscriber_once() {
        let cfg = LogConfig {
            format: LogFormat::Json,
            ..LogConfig::default()
        };
        assert!(log_init(&cfg).is_ok());
        assert!(matches!(log_init(&cfg), Err(LogError::AlreadyInitialized)));
    }
}
