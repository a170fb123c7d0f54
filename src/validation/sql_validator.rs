use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

use crate::error::{FederationError, Result};
use crate::models::Command;
use crate::services::dialect::DialectKind;

/// Outcome of validating rendered SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Parsed as a single statement of the expected kind
    Valid,
    /// Uses syntax the parser does not understand (JDBC escapes, call escapes)
    Skipped,
}

/// Parses rendered SQL before it is sent to a source
pub struct SqlValidator;

impl SqlValidator {
    /// Validate SQL rendered for `kind` from `command`
    pub fn validate_rendered(sql: &str, kind: DialectKind, command: &Command) -> Result<ValidationOutcome> {
        if Self::uses_escape_syntax(sql) {
            tracing::debug!("Skipping validation of escaped SQL: {}", sql);
            return Ok(ValidationOutcome::Skipped);
        }

        let dialect = Self::parser_dialect(kind);
        let mut parser = Parser::new(dialect.as_ref())
            .try_with_sql(sql)
            .map_err(|e| FederationError::Validation(format!("SQL parsing error: {}", e)))?;

        // Parse SQL statement
        let ast = parser
            .parse_statements()
            .map_err(|e| FederationError::Validation(format!("SQL parsing error: {}", e)))?;

        let stmt = match ast.as_slice() {
            [] => return Err(FederationError::Validation("Empty SQL".to_string())),
            [stmt] => stmt,
            _ => {
                return Err(FederationError::Validation(format!(
                    "Expected one statement, found {}",
                    ast.len()
                )))
            }
        };

        if !Self::matches_command(stmt, command) {
            return Err(FederationError::Validation(format!(
                "Rendered statement does not match {} command",
                command.kind()
            )));
        }

        Ok(ValidationOutcome::Valid)
    }

    fn parser_dialect(kind: DialectKind) -> Box<dyn Dialect> {
        match kind {
            DialectKind::PostgreSql => Box::new(PostgreSqlDialect {}),
            DialectKind::MySql => Box::new(MySqlDialect {}),
            DialectKind::SqlServer => Box::new(MsSqlDialect {}),
            DialectKind::Generic | DialectKind::Oracle => Box::new(GenericDialect {}),
        }
    }

    /// JDBC escapes (`{d'...'}`, `{ call ... }`) are resolved by the driver
    fn uses_escape_syntax(sql: &str) -> bool {
        let body = match sql.trim_start().strip_prefix("/*") {
            Some(rest) => rest.split_once("*/").map(|(_, body)| body).unwrap_or(rest),
            None => sql,
        };
        body.trim_start().starts_with('{')
            || ["{d'", "{t'", "{ts'"].iter().any(|escape| body.contains(escape))
    }

    fn matches_command(stmt: &Statement, command: &Command) -> bool {
        match command {
            Command::Select(_) | Command::SetOp(_) => matches!(stmt, Statement::Query(_)),
            Command::Insert(_) => matches!(stmt, Statement::Insert { .. }),
            Command::Update(_) => matches!(stmt, Statement::Update { .. }),
            Command::Delete(_) => matches!(stmt, Statement::Delete { .. }),
            Command::Call(_) => matches!(stmt, Statement::Call { .. }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Call, Delete, GroupRef, Select};

    fn select() -> Command {
        Command::Select(Select::default())
    }

    #[test]
    fn test_valid_rendered_queries() {
        assert_eq!(
            SqlValidator::validate_rendered(
                "SELECT g.e1 FROM g WHERE g.e1 = $1 LIMIT 10 OFFSET 5",
                DialectKind::PostgreSql,
                &select()
            )
            .unwrap(),
            ValidationOutcome::Valid
        );
        assert_eq!(
            SqlValidator::validate_rendered(
                "SELECT g.e1 FROM g ORDER BY g.e1 LIMIT 5, 10",
                DialectKind::MySql,
                &select()
            )
            .unwrap(),
            ValidationOutcome::Valid
        );
        assert!(SqlValidator::validate_rendered(
            "/*Federation sessionid:1, requestid:2.0*/ SELECT 1",
            DialectKind::Generic,
            &select()
        )
        .is_ok());
    }

    #[test]
    fn test_invalid_sql() {
        let err =
            SqlValidator::validate_rendered("SELECT * FROM", DialectKind::Generic, &select())
                .unwrap_err();
        assert_eq!(err.code(), "INVALID_SQL");

        assert!(SqlValidator::validate_rendered(
            "SELECT 1; SELECT 2",
            DialectKind::Generic,
            &select()
        )
        .is_err());
    }

    #[test]
    fn test_statement_kind_must_match() {
        let delete = Command::Delete(Delete {
            group: GroupRef::new("g"),
            where_clause: None,
        });
        assert!(
            SqlValidator::validate_rendered("DELETE FROM g", DialectKind::Generic, &delete).is_ok()
        );
        assert!(
            SqlValidator::validate_rendered("SELECT 1", DialectKind::Generic, &delete).is_err()
        );
    }

    #[test]
    fn test_escape_syntax_is_skipped() {
        assert_eq!(
            SqlValidator::validate_rendered(
                "SELECT g.e1 FROM g WHERE g.d = {d'2024-01-02'}",
                DialectKind::Generic,
                &select()
            )
            .unwrap(),
            ValidationOutcome::Skipped
        );

        let call = Command::Call(Call {
            name: "p".to_string(),
            parameters: Vec::new(),
        });
        assert_eq!(
            SqlValidator::validate_rendered("{ call p() }", DialectKind::Generic, &call).unwrap(),
            ValidationOutcome::Skipped
        );
    }
}
