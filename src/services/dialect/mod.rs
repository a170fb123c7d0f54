// Source Dialects
//
// Each dialect kind contributes its default configuration, function
// modifiers, literal syntax, placeholder token and join support. Everything
// the renderer needs about a source is captured in an immutable
// `DialectConfig` that is shared across renders.

pub mod function_modifier;
pub mod mysql;
pub mod oracle;
pub mod pagination;
pub mod postgresql;
pub mod sqlserver;

use std::sync::Arc;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{FederationError, Result};
use crate::models::JoinKind;

pub use function_modifier::{FunctionModifier, FunctionModifierRegistry, Token};
pub use pagination::PaginationStrategy;

/// Source dialects known to the renderer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    Generic,
    PostgreSql,
    MySql,
    Oracle,
    SqlServer,
}

impl DialectKind {
    /// Parse dialect kind from string
    pub fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "generic" | "ansi" | "jdbc" => Ok(DialectKind::Generic),
            "postgresql" | "postgres" | "pg" => Ok(DialectKind::PostgreSql),
            "mysql" | "mariadb" => Ok(DialectKind::MySql),
            "oracle" => Ok(DialectKind::Oracle),
            "sqlserver" | "mssql" => Ok(DialectKind::SqlServer),
            _ => Err(FederationError::Config(format!(
                "Unsupported dialect: {}",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DialectKind::Generic => "Generic",
            DialectKind::PostgreSql => "PostgreSQL",
            DialectKind::MySql => "MySQL",
            DialectKind::Oracle => "Oracle",
            DialectKind::SqlServer => "SQLServer",
        }
    }

    pub fn function_modifiers(&self) -> FunctionModifierRegistry {
        match self {
            DialectKind::Generic => FunctionModifierRegistry::new()
                .alias("lcase", "LOWER")
                .alias("ucase", "UPPER"),
            DialectKind::PostgreSql => postgresql::function_modifiers(),
            DialectKind::MySql => mysql::function_modifiers(),
            DialectKind::Oracle => oracle::function_modifiers(),
            DialectKind::SqlServer => sqlserver::function_modifiers(),
        }
    }

    pub fn default_pagination(&self) -> PaginationStrategy {
        match self {
            DialectKind::Generic | DialectKind::PostgreSql => PaginationStrategy::LimitOffset,
            DialectKind::MySql => PaginationStrategy::MySqlLimit,
            DialectKind::Oracle | DialectKind::SqlServer => PaginationStrategy::RowNumber,
        }
    }

    pub fn supports_join(&self, kind: JoinKind) -> bool {
        !matches!((self, kind), (DialectKind::MySql, JoinKind::FullOuter))
    }

    /// Bind parameter marker for the 1-based position `index`
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            DialectKind::PostgreSql => format!("${}", index),
            _ => "?".to_string(),
        }
    }

    /// The dialect's row number can be filtered in the WHERE clause of the
    /// query that produces it
    pub fn row_number_in_where(&self) -> bool {
        matches!(self, DialectKind::Oracle)
    }

    pub fn format_boolean(&self, value: bool) -> &'static str {
        match (self, value) {
            (DialectKind::PostgreSql, true) => "TRUE",
            (DialectKind::PostgreSql, false) => "FALSE",
            (_, true) => "1",
            (_, false) => "0",
        }
    }

    /// Wrap the `yyyy-mm-dd` text of a date literal
    pub fn format_date(&self, text: &str) -> String {
        match self {
            DialectKind::PostgreSql | DialectKind::MySql => format!("DATE '{}'", text),
            DialectKind::Oracle => oracle::format_date(text),
            DialectKind::Generic | DialectKind::SqlServer => format!("{{d'{}'}}", text),
        }
    }

    /// Wrap the `hh:mm:ss` text of a time literal
    pub fn format_time(&self, text: &str) -> String {
        match self {
            DialectKind::PostgreSql | DialectKind::MySql => format!("TIME '{}'", text),
            DialectKind::Oracle => oracle::format_timestamp(&format!("1970-01-01 {}", text)),
            DialectKind::Generic | DialectKind::SqlServer => format!("{{t'{}'}}", text),
        }
    }

    /// Wrap the `yyyy-mm-dd hh:mm:ss[.f]` text of a timestamp literal
    pub fn format_timestamp(&self, text: &str) -> String {
        match self {
            DialectKind::PostgreSql | DialectKind::MySql => format!("TIMESTAMP '{}'", text),
            DialectKind::Oracle => oracle::format_timestamp(text),
            DialectKind::Generic | DialectKind::SqlServer => format!("{{ts'{}'}}", text),
        }
    }

    fn uses_as_for_group_alias(&self) -> bool {
        !matches!(self, DialectKind::Oracle)
    }

    fn has_time_type(&self) -> bool {
        !matches!(self, DialectKind::Oracle)
    }

    fn timestamp_nanos_precision(&self) -> u32 {
        match self {
            DialectKind::PostgreSql | DialectKind::MySql => 6,
            DialectKind::SqlServer => 7,
            DialectKind::Generic | DialectKind::Oracle => 9,
        }
    }
}

/// How literals marked bindable are emitted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BindMode {
    #[default]
    Literal,
    PreparedStatement,
}

/// Immutable per-source rendering configuration
#[derive(Debug, Clone)]
pub struct DialectConfig {
    pub kind: DialectKind,
    /// Source time zone; `None` means the engine's own zone
    pub time_zone: Option<FixedOffset>,
    pub bind_mode: BindMode,
    pub trace_comments: bool,
    pub use_as_in_group_alias: bool,
    pub has_time_type: bool,
    /// Fractional-second digits kept in timestamp literals (0-9)
    pub timestamp_nanos_precision: u32,
    pub function_modifiers: Arc<FunctionModifierRegistry>,
    pub pagination: PaginationStrategy,
}

impl DialectConfig {
    pub fn new(kind: DialectKind) -> Self {
        Self {
            kind,
            time_zone: None,
            bind_mode: BindMode::default(),
            trace_comments: false,
            use_as_in_group_alias: kind.uses_as_for_group_alias(),
            has_time_type: kind.has_time_type(),
            timestamp_nanos_precision: kind.timestamp_nanos_precision(),
            function_modifiers: Arc::new(kind.function_modifiers()),
            pagination: kind.default_pagination(),
        }
    }

    pub fn with_time_zone(mut self, time_zone: FixedOffset) -> Self {
        self.time_zone = Some(time_zone);
        self
    }

    pub fn with_bind_mode(mut self, bind_mode: BindMode) -> Self {
        self.bind_mode = bind_mode;
        self
    }

    pub fn with_trace_comments(mut self, enabled: bool) -> Self {
        self.trace_comments = enabled;
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationStrategy) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn with_timestamp_precision(mut self, digits: u32) -> Self {
        self.timestamp_nanos_precision = digits.min(9);
        self
    }

    pub fn with_function_modifiers(mut self, registry: FunctionModifierRegistry) -> Self {
        self.function_modifiers = Arc::new(registry);
        self
    }

    pub fn dialect_name(&self) -> &'static str {
        self.kind.as_str()
    }
}

/// Parse a fixed UTC offset such as `+05:30`, `-08:00` or `Z`
pub fn parse_time_zone(value: &str) -> Result<FixedOffset> {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0)
            .ok_or_else(|| FederationError::Config("invalid UTC offset".to_string()));
    }
    trimmed
        .parse::<FixedOffset>()
        .map_err(|e| FederationError::Config(format!("Invalid time zone '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_kind_parsing() {
        assert_eq!(DialectKind::from_str("postgres").unwrap(), DialectKind::PostgreSql);
        assert_eq!(DialectKind::from_str("MySQL").unwrap(), DialectKind::MySql);
        assert_eq!(DialectKind::from_str("mssql").unwrap(), DialectKind::SqlServer);
        assert!(DialectKind::from_str("sybase").is_err());
    }

    #[test]
    fn test_default_configs() {
        let oracle = DialectConfig::new(DialectKind::Oracle);
        assert!(!oracle.use_as_in_group_alias);
        assert!(!oracle.has_time_type);
        assert_eq!(oracle.pagination, PaginationStrategy::RowNumber);
        assert!(oracle.function_modifiers.has_rule("left"));

        let pg = DialectConfig::new(DialectKind::PostgreSql).with_timestamp_precision(12);
        assert_eq!(pg.timestamp_nanos_precision, 9);
        assert_eq!(pg.pagination, PaginationStrategy::LimitOffset);
        assert_eq!(pg.bind_mode, BindMode::Literal);
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(DialectKind::PostgreSql.placeholder(2), "$2");
        assert_eq!(DialectKind::Oracle.placeholder(2), "?");
    }

    #[test]
    fn test_join_support() {
        assert!(!DialectKind::MySql.supports_join(JoinKind::FullOuter));
        assert!(DialectKind::MySql.supports_join(JoinKind::LeftOuter));
        assert!(DialectKind::Oracle.supports_join(JoinKind::FullOuter));
    }

    #[test]
    fn test_parse_time_zone() {
        assert_eq!(parse_time_zone("+05:30").unwrap().local_minus_utc(), 19800);
        assert_eq!(parse_time_zone("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_time_zone("Mars/Olympus").is_err());
    }
}
