use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError};

use crate::error::{FederationError, Result};
use crate::models::MultiSourceModel;
use crate::services::dialect::{
    parse_time_zone, BindMode, DialectConfig, DialectKind, PaginationStrategy,
};
use crate::services::executor::ExecutionSettings;
use crate::services::multisource::StaticCatalog;
use crate::services::registry::DialectRegistry;
use crate::services::renderer::{EngineSettings, SqlRenderer};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub engine: EngineConfig,
    pub execution: ExecutionConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub sources: HashMap<String, SourceConfig>,
    #[serde(default)]
    pub models: Vec<MultiSourceModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub name: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// 0 means one per CPU
    pub max_concurrency: usize,
    pub timeout_secs: u64,
    pub validate_sql: bool,
    pub render_cache: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub style: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub dialect: String,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub bind_mode: BindMode,
    #[serde(default)]
    pub trace_comments: bool,
    #[serde(default)]
    pub pagination: Option<PaginationStrategy>,
    #[serde(default)]
    pub timestamp_nanos_precision: Option<u32>,
}

impl SourceConfig {
    pub fn dialect_config(&self) -> Result<DialectConfig> {
        let mut dialect = DialectConfig::new(DialectKind::from_str(&self.dialect)?)
            .with_bind_mode(self.bind_mode)
            .with_trace_comments(self.trace_comments);
        if let Some(zone) = &self.time_zone {
            dialect = dialect.with_time_zone(parse_time_zone(zone)?);
        }
        if let Some(pagination) = self.pagination {
            dialect = dialect.with_pagination(pagination);
        }
        if let Some(digits) = self.timestamp_nanos_precision {
            dialect = dialect.with_timestamp_precision(digits);
        }
        Ok(dialect)
    }
}

impl Config {
    fn defaults() -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
        config::Config::builder()
            .set_default("engine.name", "Federation")?
            .set_default("engine.time_zone", "+00:00")?
            .set_default("execution.max_concurrency", 0)?
            .set_default("execution.timeout_secs", 30)?
            .set_default("execution.validate_sql", false)?
            .set_default("execution.render_cache", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.style", "auto")
    }

    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        // Try to load from .env file
        let _ = dotenv::dotenv();

        let mut builder = Self::defaults()?;

        if let Ok(path) = env::var("FEDERATION_CONFIG") {
            builder = builder.add_source(config::File::with_name(&path));
        }

        if let Ok(name) = env::var("FEDERATION_ENGINE_NAME") {
            builder = builder.set_override("engine.name", name)?;
        }

        if let Ok(time_zone) = env::var("FEDERATION_TIME_ZONE") {
            builder = builder.set_override("engine.time_zone", time_zone)?;
        }

        if let Ok(value) = env::var("FEDERATION_MAX_CONCURRENCY") {
            let max_concurrency = value.parse::<u64>().map_err(|e| {
                ConfigError::Message(format!("FEDERATION_MAX_CONCURRENCY: {}", e))
            })?;
            builder = builder.set_override("execution.max_concurrency", max_concurrency)?;
        }

        if let Ok(value) = env::var("FEDERATION_TIMEOUT_SECS") {
            let timeout_secs = value
                .parse::<u64>()
                .map_err(|e| ConfigError::Message(format!("FEDERATION_TIMEOUT_SECS: {}", e)))?;
            builder = builder.set_override("execution.timeout_secs", timeout_secs)?;
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            builder = builder.set_override("logging.level", log_level)?;
        }

        if let Ok(log_style) = env::var("RUST_LOG_STYLE") {
            builder = builder.set_override("logging.style", log_style)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Load a configuration file on top of the defaults, ignoring the
    /// environment
    pub fn from_file(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(config::File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }

    pub fn engine_settings(&self) -> Result<EngineSettings> {
        Ok(EngineSettings {
            name: self.engine.name.clone(),
            time_zone: parse_time_zone(&self.engine.time_zone)?,
        })
    }

    pub fn execution_settings(&self) -> ExecutionSettings {
        let max_concurrency = match self.execution.max_concurrency {
            0 => num_cpus::get(),
            n => n,
        };
        ExecutionSettings {
            max_concurrency,
            source_timeout: Duration::from_secs(self.execution.timeout_secs),
            validate_sql: self.execution.validate_sql,
        }
    }

    pub fn dialect_registry(&self) -> Result<DialectRegistry> {
        let renderer = SqlRenderer::new(self.engine_settings()?);
        let mut registry = if self.execution.render_cache {
            DialectRegistry::with_cache(renderer)
        } else {
            DialectRegistry::new(renderer)
        };
        for (binding, source) in &self.sources {
            registry.register(binding.clone(), source.dialect_config()?);
        }
        Ok(registry)
    }

    /// Catalog of the configured models. Every bound source must be
    /// declared under `sources`.
    pub fn catalog(&self) -> Result<StaticCatalog> {
        let mut catalog = StaticCatalog::new();
        for model in &self.models {
            if let Some(unknown) = model
                .sources
                .iter()
                .find(|source| !self.sources.contains_key(source.as_str()))
            {
                return Err(FederationError::Config(format!(
                    "Model '{}' is bound to undeclared source '{}'",
                    model.name, unknown
                )));
            }
            catalog.register(model.clone())?;
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::models::PseudoColumnMode;
    use crate::services::multisource::MultiSourceCatalog;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const FEDERATED: &str = r#"
[engine]
name = "Teiid"
time_zone = "-05:00"

[execution]
max_concurrency = 4
timeout_secs = 5
validate_sql = true

[sources.east]
dialect = "postgresql"
bind_mode = "prepared_statement"
trace_comments = true

[sources.west]
dialect = "oracle"
time_zone = "+01:00"
pagination = "offset_fetch"
timestamp_nanos_precision = 3

[[models]]
name = "Accounts"
sources = ["east", "west"]
pseudo_column = "REGION"
pseudo_column_mode = "reuse_existing"
"#;

    #[test]
    fn test_config_defaults() {
        // Clear environment variables for this test
        env::remove_var("FEDERATION_CONFIG");
        env::remove_var("FEDERATION_ENGINE_NAME");
        env::remove_var("FEDERATION_TIME_ZONE");
        env::remove_var("FEDERATION_MAX_CONCURRENCY");
        env::remove_var("FEDERATION_TIMEOUT_SECS");

        let config = Config::from_env();
        assert!(config.is_ok());

        let config = config.unwrap();
        assert_eq!(config.engine.name, "Federation");
        assert_eq!(config.execution.timeout_secs, 30);
        assert!(config.execution.render_cache);
        assert!(config.execution_settings().max_concurrency >= 1);
    }

    #[test]
    fn test_from_file() {
        let file = write_config(FEDERATED);
        let config = Config::from_file(file.path()).unwrap();

        assert_eq!(config.engine.name, "Teiid");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.sources.len(), 2);

        let settings = config.execution_settings();
        assert_eq!(settings.max_concurrency, 4);
        assert_eq!(settings.source_timeout, Duration::from_secs(5));
        assert!(settings.validate_sql);

        let engine = config.engine_settings().unwrap();
        assert_eq!(engine.time_zone.local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_source_dialects() {
        let file = write_config(FEDERATED);
        let config = Config::from_file(file.path()).unwrap();
        let registry = config.dialect_registry().unwrap();

        assert_eq!(registry.bindings(), vec!["east", "west"]);

        let east = registry.dialect("east").unwrap();
        assert_eq!(east.kind, DialectKind::PostgreSql);
        assert_eq!(east.bind_mode, BindMode::PreparedStatement);
        assert!(east.trace_comments);
        assert!(east.time_zone.is_none());

        let west = registry.dialect("west").unwrap();
        assert_eq!(west.pagination, PaginationStrategy::OffsetFetch);
        assert_eq!(west.timestamp_nanos_precision, 3);
        assert_eq!(west.time_zone.map(|tz| tz.local_minus_utc()), Some(3600));
    }

    #[test]
    fn test_catalog() {
        let file = write_config(FEDERATED);
        let config = Config::from_file(file.path()).unwrap();
        let catalog = config.catalog().unwrap();

        let model = catalog
            .resolve_multi_source_model("Accounts")
            .unwrap()
            .unwrap();
        assert_eq!(model.sources, vec!["east", "west"]);
        assert_eq!(model.pseudo_column, "REGION");
        assert_eq!(model.pseudo_column_mode, PseudoColumnMode::ReuseExisting);
    }

    #[test]
    fn test_undeclared_source_is_rejected() {
        let file = write_config(
            r#"
[sources.east]
dialect = "mysql"

[[models]]
name = "Accounts"
sources = ["east", "north"]
"#,
        );
        let config = Config::from_file(file.path()).unwrap();
        let err = config.catalog().unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_unknown_dialect() {
        let file = write_config("[sources.east]\ndialect = \"sybase\"\n");
        let config = Config::from_file(file.path()).unwrap();
        assert!(config.dialect_registry().is_err());
    }
}
