use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_SERVICE_NAME: &str = "schemalister-worker";

/// Worker events at info, pool and HTTP client chatter only when it matters.
pub const DEFAULT_LOG_FILTER: &str = "info,schemalister_worker=info,sqlx=warn,hyper=warn,reqwest=warn";

#[derive(Debug, Error, PartialEq)]
pub enum LoggingError {
    #[error("LOKI_ENABLED is true but LOKI_URL is not set")]
    MissingLokiUrl,

    #[error("invalid LOKI_URL {0}")]
    InvalidLokiUrl(String),

    #[error("invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("failed to install subscriber: {0}")]
    Install(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_filter: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            loki_enabled: non_empty("LOKI_ENABLED")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(false),
            loki_url: non_empty("LOKI_URL"),
            service_name: non_empty("SERVICE_NAME").unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
            environment: non_empty("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            log_filter: non_empty("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), LoggingError> {
        if self.loki_enabled {
            let loki_url = self.loki_url.as_deref().ok_or(LoggingError::MissingLokiUrl)?;
            url::Url::parse(loki_url).map_err(|_| LoggingError::InvalidLokiUrl(loki_url.to_string()))?;
        }
        self.env_filter()?;
        Ok(())
    }

    fn env_filter(&self) -> Result<EnvFilter, LoggingError> {
        EnvFilter::try_new(&self.log_filter).map_err(|e| LoggingError::InvalidFilter {
            filter: self.log_filter.clone(),
            reason: e.to_string(),
        })
    }
}

/// Installs the global subscriber. Must run inside the tokio runtime when
/// Loki shipping is enabled.
pub fn init_logging(config: LoggingConfig) -> Result<(), LoggingError> {
    config.validate()?;

    #[cfg(feature = "loki")]
    {
        if config.loki_enabled {
            if let Some(loki_url) = config.loki_url.clone() {
                return init_with_loki(config, &loki_url);
            }
        }
    }

    init_console_only(config)
}

fn init_console_only(config: LoggingConfig) -> Result<(), LoggingError> {
    tracing_subscriber::registry()
        .with(config.env_filter()?)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        "📊 Console logging initialized"
    );
    Ok(())
}

#[cfg(feature = "loki")]
fn init_with_loki(config: LoggingConfig, loki_url: &str) -> Result<(), LoggingError> {
    let url = url::Url::parse(loki_url).map_err(|_| LoggingError::InvalidLokiUrl(loki_url.to_string()))?;
    let install = |e: tracing_loki::Error| LoggingError::Install(e.to_string());

    let (loki_layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)
        .map_err(install)?
        .label("environment", &config.environment)
        .map_err(install)?
        .label("component", "schema-worker")
        .map_err(install)?
        .build_url(url)
        .map_err(install)?;

    // Ships buffered log lines to Loki in the background
    tokio::spawn(task);

    tracing_subscriber::registry()
        .with(config.env_filter()?)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(loki_layer)
        .try_init()
        .map_err(|e| LoggingError::Install(e.to_string()))?;

    tracing::info!(service = %config.service_name, "✅ Loki logging initialized at {}", loki_url);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> LoggingConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LoggingConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert!(!cfg.loki_enabled);
        assert_eq!(cfg.loki_url, None);
        assert_eq!(cfg.service_name, DEFAULT_SERVICE_NAME);
        assert_eq!(cfg.environment, "development");
        assert_eq!(cfg.log_filter, DEFAULT_LOG_FILTER);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_blank_values_fall_back() {
        let cfg = config(&[("RUST_LOG", "  "), ("SERVICE_NAME", ""), ("LOKI_URL", "")]);
        assert_eq!(cfg.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(cfg.service_name, DEFAULT_SERVICE_NAME);
        assert_eq!(cfg.loki_url, None);
    }

    #[test]
    fn test_loki_flag_spellings() {
        assert!(config(&[("LOKI_ENABLED", "TRUE")]).loki_enabled);
        assert!(config(&[("LOKI_ENABLED", "1")]).loki_enabled);
        assert!(!config(&[("LOKI_ENABLED", "off")]).loki_enabled);
    }

    #[test]
    fn test_loki_requires_url() {
        assert_eq!(
            config(&[("LOKI_ENABLED", "true")]).validate(),
            Err(LoggingError::MissingLokiUrl)
        );
        assert_eq!(
            config(&[("LOKI_ENABLED", "true"), ("LOKI_URL", "not a url")]).validate(),
            Err(LoggingError::InvalidLokiUrl("not a url".to_string()))
        );
        assert!(config(&[("LOKI_ENABLED", "true"), ("LOKI_URL", "http://loki:3100")])
            .validate()
            .is_ok());
        assert!(config(&[("LOKI_URL", "not a url")]).validate().is_ok());
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let err = config(&[("RUST_LOG", "schemalister_worker=loud")])
            .validate()
            .unwrap_err();
        assert!(matches!(err, LoggingError::InvalidFilter { .. }));
    }
}
