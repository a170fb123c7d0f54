// SQL Renderer
//
// Walks a command tree and emits source text for one dialect together with
// the ordered values bound to its placeholders. All mutable state lives in a
// `RenderContext` created for each call, so one renderer may be shared by
// any number of concurrent renders.

mod literal;

use chrono::{FixedOffset, Offset, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{FederationError, Result};
use crate::models::{
    Call, Command, DataType, Delete, DerivedColumn, ExecutionContext, Expression, Function,
    Insert, InsertSource, Join, JoinKind, Limit, Literal, LogicalOp, NullOrdering,
    ParameterDirection, QueryExpression, Select, SetOp, SortSpec, TableReference, Update, Value,
};
use crate::services::dialect::pagination::{is_noop, rewrite_for_pagination};
use crate::services::dialect::{BindMode, DialectConfig, DialectKind, Token};

/// Native two-argument functions rendered as parenthesized infix operators
const INFIX_OPERATORS: &[&str] = &["+", "-", "*", "/", "||"];

/// Engine-wide rendering settings
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Name shown in trace comments
    pub name: String,
    /// Zone in which date/time literals are interpreted
    pub time_zone: FixedOffset,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            name: "Federation".to_string(),
            time_zone: Utc.fix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BoundValue {
    pub value: Value,
    pub data_type: DataType,
}

/// Source text plus the values bound to its placeholders, in position order
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderedCommand {
    pub sql: String,
    pub bound_values: Vec<BoundValue>,
}

#[derive(Debug, Clone, Default)]
pub struct SqlRenderer {
    settings: EngineSettings,
}

impl SqlRenderer {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Render `command` for the dialect described by `config`
    pub fn render(
        &self,
        command: &Command,
        config: &DialectConfig,
        context: Option<&ExecutionContext>,
    ) -> Result<RenderedCommand> {
        let mut ctx = RenderContext::new(config, self.settings.time_zone);

        if let (true, Some(context)) = (config.trace_comments, context) {
            ctx.push(&format!(
                "/*{} sessionid:{}, requestid:{}.{}*/ ",
                self.settings.name,
                context.connection_id,
                context.request_id,
                context.sub_request_id
            ));
        }
        ctx.command(command)?;

        debug!(
            "Rendered {} for {}: {} ({} bound values)",
            command.kind(),
            config.dialect_name(),
            ctx.buffer,
            ctx.bound.len()
        );

        Ok(RenderedCommand {
            sql: ctx.buffer,
            bound_values: ctx.bound,
        })
    }
}

/// Render with default engine settings
pub fn render(
    command: &Command,
    config: &DialectConfig,
    context: Option<&ExecutionContext>,
) -> Result<RenderedCommand> {
    SqlRenderer::default().render(command, config, context)
}

/// Per-call render state
struct RenderContext<'a> {
    config: &'a DialectConfig,
    engine_tz: FixedOffset,
    buffer: String,
    bound: Vec<BoundValue>,
}

impl<'a> RenderContext<'a> {
    fn new(config: &'a DialectConfig, engine_tz: FixedOffset) -> Self {
        Self {
            config,
            engine_tz,
            buffer: String::new(),
            bound: Vec::new(),
        }
    }

    fn push(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn kind(&self) -> DialectKind {
        self.config.kind
    }

    fn command(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::Select(select) => self.select(select),
            Command::SetOp(set_op) => self.set_op(set_op),
            Command::Insert(insert) => self.insert(insert),
            Command::Update(update) => self.update(update),
            Command::Delete(delete) => self.delete(delete),
            Command::Call(call) => self.call(call),
        }
    }

    fn query(&mut self, query: &QueryExpression) -> Result<()> {
        match query {
            QueryExpression::Select(select) => self.select(select),
            QueryExpression::SetOp(set_op) => self.set_op(set_op),
        }
    }

    fn select(&mut self, select: &Select) -> Result<()> {
        match select.limit {
            Some(limit) if !is_noop(&limit) && !self.config.pagination.is_native() => {
                let mut detached = select.clone();
                detached.limit = None;
                let rewritten = rewrite_for_pagination(
                    detached.into(),
                    limit,
                    self.kind().row_number_in_where(),
                )?;
                self.select_body(&rewritten)
            }
            limit => {
                self.select_body(select)?;
                self.native_limit(limit);
                Ok(())
            }
        }
    }

    fn set_op(&mut self, set_op: &SetOp) -> Result<()> {
        match set_op.limit {
            Some(limit) if !is_noop(&limit) && !self.config.pagination.is_native() => {
                let mut detached = set_op.clone();
                detached.limit = None;
                let rewritten = rewrite_for_pagination(
                    detached.into(),
                    limit,
                    self.kind().row_number_in_where(),
                )?;
                self.select_body(&rewritten)
            }
            limit => {
                self.set_op_body(set_op)?;
                self.native_limit(limit);
                Ok(())
            }
        }
    }

    fn native_limit(&mut self, limit: Option<Limit>) {
        if let Some(limit) = limit {
            let clause = self.config.pagination.native_clause(&limit);
            self.push(&clause);
        }
    }

    fn select_body(&mut self, select: &Select) -> Result<()> {
        if select.projection.is_empty() {
            return Err(FederationError::internal("select has an empty projection"));
        }

        self.push("SELECT ");
        if select.distinct {
            self.push("DISTINCT ");
        }
        for (idx, column) in select.projection.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            self.derived_column(column)?;
        }

        if select.from.is_empty() {
            if self.kind() == DialectKind::Oracle {
                self.push(" FROM DUAL");
            }
        } else {
            self.push(" FROM ");
            for (idx, table) in select.from.iter().enumerate() {
                if idx > 0 {
                    self.push(", ");
                }
                self.table(table)?;
            }
        }

        if let Some(predicate) = &select.where_clause {
            self.push(" WHERE ");
            self.predicate(predicate)?;
        }
        if !select.group_by.is_empty() {
            self.push(" GROUP BY ");
            self.expression_list(&select.group_by)?;
        }
        if let Some(predicate) = &select.having {
            self.push(" HAVING ");
            self.predicate(predicate)?;
        }
        self.order_by(&select.order_by)
    }

    fn set_op_body(&mut self, set_op: &SetOp) -> Result<()> {
        self.set_op_branch(&set_op.left)?;
        self.push(" ");
        self.push(set_op.op.as_sql());
        if !set_op.distinct {
            self.push(" ALL");
        }
        self.push(" ");
        self.set_op_branch(&set_op.right)?;
        self.order_by(&set_op.order_by)
    }

    fn set_op_branch(&mut self, branch: &QueryExpression) -> Result<()> {
        let nested = matches!(branch, QueryExpression::SetOp(_))
            || branch.limit().is_some()
            || !branch.order_by().is_empty();
        if nested {
            self.push("(");
            self.query(branch)?;
            self.push(")");
            Ok(())
        } else {
            self.query(branch)
        }
    }

    fn derived_column(&mut self, column: &DerivedColumn) -> Result<()> {
        self.expression(&column.expression)?;
        match (&column.alias, &column.expression) {
            (Some(alias), Expression::ColumnRef(c)) if c.name == *alias => {}
            (Some(alias), _) => {
                self.push(" AS ");
                self.push(alias);
            }
            (None, _) => {}
        }
        Ok(())
    }

    fn table_alias(&mut self, alias: &str) {
        if self.config.use_as_in_group_alias {
            self.push(" AS ");
        } else {
            self.push(" ");
        }
        self.push(alias);
    }

    fn table(&mut self, table: &TableReference) -> Result<()> {
        match table {
            TableReference::Group(group) => {
                self.push(&group.name);
                if let Some(alias) = &group.alias {
                    self.table_alias(alias);
                }
                Ok(())
            }
            TableReference::Join(join) => self.join(join),
            TableReference::Derived(derived) => {
                self.push("(");
                self.query(&derived.query)?;
                self.push(")");
                self.table_alias(&derived.alias);
                Ok(())
            }
        }
    }

    fn join(&mut self, join: &Join) -> Result<()> {
        if !self.kind().supports_join(join.kind) {
            return Err(FederationError::unsupported(
                self.config.dialect_name(),
                join.kind.as_sql(),
            ));
        }

        self.table(&join.left)?;
        self.push(" ");
        self.push(join.kind.as_sql());
        self.push(" ");
        if matches!(join.right, TableReference::Join(_)) {
            self.push("(");
            self.table(&join.right)?;
            self.push(")");
        } else {
            self.table(&join.right)?;
        }

        match (&join.condition, join.kind) {
            (Some(condition), _) => {
                self.push(" ON ");
                self.predicate(condition)
            }
            (None, JoinKind::Cross) => Ok(()),
            (None, kind) => Err(FederationError::internal(format!(
                "{} without a join condition",
                kind.as_sql()
            ))),
        }
    }

    fn order_by(&mut self, items: &[SortSpec]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.push(" ORDER BY ");
        self.sort_items(items)
    }

    fn sort_items(&mut self, items: &[SortSpec]) -> Result<()> {
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            self.expression(&item.expression)?;
            if !item.ascending {
                self.push(" DESC");
            }
            match item.nulls {
                Some(NullOrdering::First) => self.push(" NULLS FIRST"),
                Some(NullOrdering::Last) => self.push(" NULLS LAST"),
                None => {}
            }
        }
        Ok(())
    }

    fn insert(&mut self, insert: &Insert) -> Result<()> {
        self.push("INSERT INTO ");
        self.push(&insert.group.name);
        self.push(" (");
        let columns: Vec<&str> = insert.columns.iter().map(|c| c.name.as_str()).collect();
        self.push(&columns.join(", "));
        self.push(") ");

        match &insert.source {
            InsertSource::Values(rows) => {
                if rows.is_empty() {
                    return Err(FederationError::internal("insert without rows"));
                }
                self.push("VALUES ");
                for (idx, row) in rows.iter().enumerate() {
                    if row.len() != insert.columns.len() {
                        return Err(FederationError::internal(format!(
                            "insert row {} has {} values for {} columns",
                            idx,
                            row.len(),
                            insert.columns.len()
                        )));
                    }
                    if idx > 0 {
                        self.push(", ");
                    }
                    self.push("(");
                    self.expression_list(row)?;
                    self.push(")");
                }
                Ok(())
            }
            InsertSource::Query(query) => self.query(query),
        }
    }

    fn update(&mut self, update: &Update) -> Result<()> {
        self.push("UPDATE ");
        self.push(&update.group.name);
        if let Some(alias) = &update.group.alias {
            self.table_alias(alias);
        }
        self.push(" SET ");
        for (idx, clause) in update.set.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            self.push(&clause.column.name);
            self.push(" = ");
            self.expression(&clause.value)?;
        }
        if let Some(predicate) = &update.where_clause {
            self.push(" WHERE ");
            self.predicate(predicate)?;
        }
        Ok(())
    }

    fn delete(&mut self, delete: &Delete) -> Result<()> {
        self.push("DELETE FROM ");
        self.push(&delete.group.name);
        if let Some(alias) = &delete.group.alias {
            self.table_alias(alias);
        }
        if let Some(predicate) = &delete.where_clause {
            self.push(" WHERE ");
            self.predicate(predicate)?;
        }
        Ok(())
    }

    /// `{ ?= call name(?, ?) }`
    fn call(&mut self, call: &Call) -> Result<()> {
        self.push("{ ");
        if call
            .parameters
            .iter()
            .any(|p| p.direction == ParameterDirection::Return)
        {
            self.push("?= ");
        }
        self.push("call ");
        self.push(&call.name);
        self.push("(");

        let mut first = true;
        for parameter in &call.parameters {
            if parameter.direction == ParameterDirection::Return {
                continue;
            }
            if !first {
                self.push(", ");
            }
            first = false;
            self.push("?");

            if matches!(
                parameter.direction,
                ParameterDirection::In | ParameterDirection::InOut
            ) {
                let value = parameter.value.as_ref().ok_or_else(|| {
                    FederationError::internal(format!(
                        "no value for input parameter of procedure {}",
                        call.name
                    ))
                })?;
                self.bound.push(BoundValue {
                    value: value.value.clone(),
                    data_type: parameter.data_type,
                });
            }
        }
        self.push(") }");
        Ok(())
    }

    fn expression_list(&mut self, items: &[Expression]) -> Result<()> {
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                self.push(", ");
            }
            self.expression(item)?;
        }
        Ok(())
    }

    fn expression(&mut self, expr: &Expression) -> Result<()> {
        match expr {
            Expression::ColumnRef(column) => {
                if let Some(group) = &column.group {
                    self.push(group);
                    self.push(".");
                }
                self.push(&column.name);
                Ok(())
            }
            Expression::Literal(literal) => self.literal(literal),
            Expression::Function(function) => self.function(function),
            Expression::Comparison(comparison) => {
                self.expression(&comparison.left)?;
                self.push(" ");
                self.push(comparison.op.as_sql());
                self.push(" ");
                self.expression(&comparison.right)
            }
            Expression::AndOr(and_or) => {
                self.logical_operand(&and_or.left, and_or.op)?;
                self.push(" ");
                self.push(and_or.op.as_sql());
                self.push(" ");
                self.logical_operand(&and_or.right, and_or.op)
            }
            Expression::In(in_list) => {
                if in_list.list.is_empty() {
                    return Err(FederationError::internal("IN predicate with an empty list"));
                }
                self.expression(&in_list.expr)?;
                self.push(if in_list.negated { " NOT IN (" } else { " IN (" });
                self.expression_list(&in_list.list)?;
                self.push(")");
                Ok(())
            }
            Expression::Like(like) => {
                self.expression(&like.expr)?;
                self.push(if like.negated { " NOT LIKE " } else { " LIKE " });
                self.expression(&like.pattern)?;
                if let Some(escape) = like.escape {
                    self.push(" ESCAPE ");
                    self.push(&literal::quote(&escape.to_string()));
                }
                Ok(())
            }
            Expression::ScalarSubquery(select) => {
                self.push("(");
                self.select(select)?;
                self.push(")");
                Ok(())
            }
            Expression::IsNull(is_null) => {
                self.expression(&is_null.expr)?;
                self.push(if is_null.negated { " IS NOT NULL" } else { " IS NULL" });
                Ok(())
            }
            Expression::Not { expr } => {
                self.push("NOT (");
                self.predicate(expr)?;
                self.push(")");
                Ok(())
            }
            Expression::Aggregate(aggregate) => {
                self.push(&aggregate.name.to_uppercase());
                self.push("(");
                if aggregate.distinct {
                    self.push("DISTINCT ");
                }
                match &aggregate.arg {
                    Some(arg) => self.expression(arg)?,
                    None => self.push("*"),
                }
                self.push(")");
                Ok(())
            }
            Expression::RowNumber { order_by } => self.row_number(order_by),
        }
    }

    fn logical_operand(&mut self, operand: &Expression, parent: LogicalOp) -> Result<()> {
        match operand {
            Expression::AndOr(child) if child.op != parent => {
                self.push("(");
                self.expression(operand)?;
                self.push(")");
                Ok(())
            }
            _ => self.predicate(operand),
        }
    }

    /// Expression in a condition position. Boolean constants become
    /// comparisons, since only some dialects accept a bare literal there.
    fn predicate(&mut self, expr: &Expression) -> Result<()> {
        match expr.as_literal() {
            Some(literal) if literal.data_type == DataType::Boolean => {
                self.push(match literal.value {
                    Value::Boolean(true) => "1 = 1",
                    Value::Boolean(false) => "1 = 0",
                    _ => "1 = NULL",
                });
                Ok(())
            }
            _ => self.expression(expr),
        }
    }

    fn row_number(&mut self, order_by: &[SortSpec]) -> Result<()> {
        match (self.kind(), order_by.is_empty()) {
            (DialectKind::Oracle, _) => {
                self.push("ROWNUM");
                Ok(())
            }
            (DialectKind::SqlServer, true) => {
                self.push("ROW_NUMBER() OVER (ORDER BY (SELECT 1))");
                Ok(())
            }
            (_, true) => {
                self.push("ROW_NUMBER() OVER ()");
                Ok(())
            }
            (_, false) => {
                self.push("ROW_NUMBER() OVER (ORDER BY ");
                self.sort_items(order_by)?;
                self.push(")");
                Ok(())
            }
        }
    }

    fn literal(&mut self, literal: &Literal) -> Result<()> {
        if self.config.bind_mode == BindMode::PreparedStatement && literal.bindable {
            self.bound.push(BoundValue {
                value: literal.value.clone(),
                data_type: literal.data_type,
            });
            let placeholder = self.kind().placeholder(self.bound.len());
            self.push(&placeholder);
            return Ok(());
        }
        let text = literal::format_literal(literal, self.config, self.engine_tz)?;
        self.push(&text);
        Ok(())
    }

    fn function(&mut self, function: &Function) -> Result<()> {
        if function.name.is_empty() {
            return Err(FederationError::internal("function without a name"));
        }

        let config = self.config;
        if let Some(tokens) = config.function_modifiers.modify(function)? {
            for token in tokens {
                match token {
                    Token::Text(text) => self.push(&text),
                    Token::Expr(expr) => self.expression(&expr)?,
                }
            }
            return Ok(());
        }

        if let [left, right] = function.args.as_slice() {
            if INFIX_OPERATORS.contains(&function.name.as_str()) {
                self.push("(");
                self.expression(left)?;
                self.push(" ");
                self.push(&function.name);
                self.push(" ");
                self.expression(right)?;
                self.push(")");
                return Ok(());
            }
        }

        self.push(&function.name);
        self.push("(");
        self.expression_list(&function.args)?;
        self.push(")");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnRef, CompareOp, GroupRef, IsNull, Parameter, SetOperator};
    use crate::services::dialect::function_modifier::native_tokens;
    use crate::services::dialect::{FunctionModifierRegistry, PaginationStrategy};

    fn col(group: &str, name: &str) -> Expression {
        Expression::column(Some(group), name, DataType::String)
    }

    fn base_select() -> Select {
        Select::new(
            vec![
                DerivedColumn::new(col("g", "e1")),
                DerivedColumn::new(Expression::column(Some("g"), "e2", DataType::Integer)),
            ],
            vec![TableReference::Group(GroupRef::new("g"))],
        )
        .with_order_by(vec![SortSpec::asc(col("g", "e1"))])
    }

    fn sql(command: Command, config: &DialectConfig) -> String {
        render(&command, config, None).unwrap().sql
    }

    #[test]
    fn test_simple_select() {
        let select = Select::new(
            vec![DerivedColumn::aliased(col("g", "e1"), "name")],
            vec![TableReference::Group(GroupRef::aliased("pm1.g", "g"))],
        )
        .with_where(Expression::compare(
            col("g", "e1"),
            CompareOp::Eq,
            Expression::literal(Literal::string("a")),
        ));

        assert_eq!(
            sql(Command::Select(select.clone()), &DialectConfig::new(DialectKind::Generic)),
            "SELECT g.e1 AS name FROM pm1.g AS g WHERE g.e1 = 'a'"
        );
        assert_eq!(
            sql(Command::Select(select), &DialectConfig::new(DialectKind::Oracle)),
            "SELECT g.e1 AS name FROM pm1.g g WHERE g.e1 = 'a'"
        );
    }

    #[test]
    fn test_double_literal_is_fixed_point() {
        let select = Select::new(
            vec![DerivedColumn::new(Expression::literal(Literal::new(
                Value::Float(3.5e-5),
                DataType::Double,
            )))],
            Vec::new(),
        );
        assert_eq!(
            sql(Command::Select(select), &DialectConfig::new(DialectKind::Generic)),
            "SELECT 0.000035"
        );
    }

    #[test]
    fn test_registered_modifier_replaces_call() {
        let registry = FunctionModifierRegistry::new().transform("left", |f: &Function| {
            let [value, length] = f.args.as_slice() else {
                return Ok(None);
            };
            Ok(Some(native_tokens(
                "SUBSTR",
                vec![
                    value.clone(),
                    Expression::literal(Literal::integer(0)),
                    length.clone(),
                ],
                f.data_type,
            )))
        });
        let config = DialectConfig::new(DialectKind::Generic).with_function_modifiers(registry);

        let call = Expression::function(
            "LEFT",
            vec![
                Expression::column(None, "col", DataType::String),
                Expression::literal(Literal::integer(5)),
            ],
            DataType::String,
        );
        let select = Select::new(vec![DerivedColumn::new(call)], Vec::new());
        assert_eq!(sql(Command::Select(select), &config), "SELECT SUBSTR(col, 0, 5)");
    }

    #[test]
    fn test_modifier_output_is_not_modified_again() {
        // a rule that maps a name onto itself would loop if reapplied
        let registry = FunctionModifierRegistry::new().alias("lower", "lower");
        let config = DialectConfig::new(DialectKind::Generic).with_function_modifiers(registry);
        let select = Select::new(
            vec![DerivedColumn::new(Expression::function(
                "lower",
                vec![col("g", "e1")],
                DataType::String,
            ))],
            Vec::new(),
        );
        assert_eq!(sql(Command::Select(select), &config), "SELECT lower(g.e1)");
    }

    #[test]
    fn test_oracle_right_rewrite() {
        let select = Select::new(
            vec![DerivedColumn::new(Expression::function(
                "right",
                vec![col("g", "e1"), Expression::literal(Literal::integer(2))],
                DataType::String,
            ))],
            vec![TableReference::Group(GroupRef::new("g"))],
        );
        assert_eq!(
            sql(Command::Select(select), &DialectConfig::new(DialectKind::Oracle)),
            "SELECT SUBSTR(g.e1, ((LENGTH(g.e1) - 2) + 1)) FROM g"
        );
    }

    #[test]
    fn test_native_pagination() {
        let select = base_select().with_limit(Limit::new(5, Some(10)));
        assert_eq!(
            sql(Command::Select(select.clone()), &DialectConfig::new(DialectKind::PostgreSql)),
            "SELECT g.e1, g.e2 FROM g ORDER BY g.e1 LIMIT 10 OFFSET 5"
        );
        assert_eq!(
            sql(Command::Select(select), &DialectConfig::new(DialectKind::MySql)),
            "SELECT g.e1, g.e2 FROM g ORDER BY g.e1 LIMIT 5, 10"
        );
    }

    #[test]
    fn test_row_number_pagination() {
        let select = base_select().with_limit(Limit::new(5, Some(10)));
        assert_eq!(
            sql(Command::Select(select), &DialectConfig::new(DialectKind::SqlServer)),
            "SELECT PAGED_VIEW.e1, PAGED_VIEW.e2 FROM (SELECT VIEW_FOR_LIMIT.e1, VIEW_FOR_LIMIT.e2, \
             ROW_NUMBER() OVER (ORDER BY VIEW_FOR_LIMIT.e1) AS rn FROM (SELECT g.e1, g.e2 FROM g) \
             AS VIEW_FOR_LIMIT) AS PAGED_VIEW WHERE PAGED_VIEW.rn > 5 AND PAGED_VIEW.rn <= 15 \
             ORDER BY PAGED_VIEW.rn"
        );
    }

    #[test]
    fn test_oracle_rownum_pagination() {
        let select = base_select().with_limit(Limit::new(0, Some(10)));
        assert_eq!(
            sql(Command::Select(select), &DialectConfig::new(DialectKind::Oracle)),
            "SELECT VIEW_FOR_LIMIT.e1, VIEW_FOR_LIMIT.e2 FROM (SELECT g.e1, g.e2 FROM g ORDER BY e1) \
             VIEW_FOR_LIMIT WHERE ROWNUM <= 10"
        );
    }

    #[test]
    fn test_noop_limit_is_dropped() {
        let select = base_select().with_limit(Limit::new(0, None));
        assert_eq!(
            sql(Command::Select(select), &DialectConfig::new(DialectKind::SqlServer)),
            "SELECT g.e1, g.e2 FROM g ORDER BY g.e1"
        );
    }

    #[test]
    fn test_prepared_statement_binding() {
        let select = Select::new(
            vec![DerivedColumn::new(col("g", "e1"))],
            vec![TableReference::Group(GroupRef::new("g"))],
        )
        .with_where(Expression::and(
            Expression::compare(
                col("g", "e1"),
                CompareOp::Eq,
                Expression::literal(Literal::string("a").bindable()),
            ),
            Expression::compare(
                Expression::column(Some("g"), "e2", DataType::Integer),
                CompareOp::Gt,
                Expression::literal(Literal::integer(3).bindable()),
            ),
        ));
        let command = Command::Select(select);

        let pg = DialectConfig::new(DialectKind::PostgreSql)
            .with_bind_mode(BindMode::PreparedStatement);
        let rendered = render(&command, &pg, None).unwrap();
        assert_eq!(rendered.sql, "SELECT g.e1 FROM g WHERE g.e1 = $1 AND g.e2 > $2");
        assert_eq!(
            rendered.bound_values,
            vec![
                BoundValue {
                    value: Value::String("a".to_string()),
                    data_type: DataType::String
                },
                BoundValue {
                    value: Value::Integer(3),
                    data_type: DataType::Integer
                },
            ]
        );

        let generic = DialectConfig::new(DialectKind::Generic)
            .with_bind_mode(BindMode::PreparedStatement);
        assert_eq!(
            render(&command, &generic, None).unwrap().sql,
            "SELECT g.e1 FROM g WHERE g.e1 = ? AND g.e2 > ?"
        );

        // literal mode inlines bindable values
        let inline = render(&command, &DialectConfig::new(DialectKind::Generic), None).unwrap();
        assert_eq!(inline.sql, "SELECT g.e1 FROM g WHERE g.e1 = 'a' AND g.e2 > 3");
        assert!(inline.bound_values.is_empty());
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let command = Command::Select(base_select().with_limit(Limit::new(3, Some(4))));
        let config = DialectConfig::new(DialectKind::SqlServer);
        assert_eq!(
            render(&command, &config, None).unwrap(),
            render(&command, &config, None).unwrap()
        );
    }

    #[test]
    fn test_trace_comment() {
        let renderer = SqlRenderer::new(EngineSettings {
            name: "Federation".to_string(),
            ..Default::default()
        });
        let context = ExecutionContext::new("conn-7", "42").sub_request(3);
        let command = Command::Select(base_select());

        let traced = DialectConfig::new(DialectKind::Generic).with_trace_comments(true);
        let rendered = renderer.render(&command, &traced, Some(&context)).unwrap();
        assert!(rendered
            .sql
            .starts_with("/*Federation sessionid:conn-7, requestid:42.3*/ SELECT"));

        let untraced = DialectConfig::new(DialectKind::Generic);
        let rendered = renderer.render(&command, &untraced, Some(&context)).unwrap();
        assert!(rendered.sql.starts_with("SELECT"));

        // no context, no comment
        let rendered = renderer.render(&command, &traced, None).unwrap();
        assert!(rendered.sql.starts_with("SELECT"));
    }

    #[test]
    fn test_procedure_call() {
        let call = Call {
            name: "update_stock".to_string(),
            parameters: vec![
                Parameter {
                    direction: ParameterDirection::Return,
                    data_type: DataType::Integer,
                    value: None,
                },
                Parameter {
                    direction: ParameterDirection::In,
                    data_type: DataType::String,
                    value: Some(Literal::string("sku-1")),
                },
                Parameter {
                    direction: ParameterDirection::Out,
                    data_type: DataType::Integer,
                    value: None,
                },
            ],
        };
        let rendered = render(
            &Command::Call(call),
            &DialectConfig::new(DialectKind::Generic),
            None,
        )
        .unwrap();
        assert_eq!(rendered.sql, "{ ?= call update_stock(?, ?) }");
        assert_eq!(rendered.bound_values.len(), 1);
        assert_eq!(rendered.bound_values[0].value, Value::String("sku-1".to_string()));
    }

    #[test]
    fn test_unsupported_join_fails() {
        let join = Join {
            left: TableReference::Group(GroupRef::aliased("a", "x")),
            right: TableReference::Group(GroupRef::aliased("b", "y")),
            kind: JoinKind::FullOuter,
            condition: Some(Expression::compare(col("x", "id"), CompareOp::Eq, col("y", "id"))),
        };
        let select = Select::new(
            vec![DerivedColumn::new(col("x", "id"))],
            vec![TableReference::Join(Box::new(join))],
        );
        let command = Command::Select(select);

        let err = render(&command, &DialectConfig::new(DialectKind::MySql), None).unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_FEATURE");
        assert_eq!(
            sql(command, &DialectConfig::new(DialectKind::PostgreSql)),
            "SELECT x.id FROM a AS x FULL OUTER JOIN b AS y ON x.id = y.id"
        );
    }

    #[test]
    fn test_set_operation_and_mixed_logic() {
        let left = Select::new(
            vec![DerivedColumn::new(col("g", "e1"))],
            vec![TableReference::Group(GroupRef::new("g"))],
        )
        .with_where(Expression::or(
            Expression::and(
                Expression::compare(col("g", "e1"), CompareOp::Eq, col("g", "e2")),
                Expression::IsNull(IsNull {
                    expr: Box::new(col("g", "e3")),
                    negated: true,
                }),
            ),
            Expression::in_list(
                col("g", "e1"),
                vec![
                    Expression::literal(Literal::string("a")),
                    Expression::literal(Literal::string("b")),
                ],
                false,
            ),
        ));
        let right = Select::new(
            vec![DerivedColumn::new(col("h", "e1"))],
            vec![TableReference::Group(GroupRef::new("h"))],
        );
        let set_op = SetOp {
            left: left.into(),
            right: right.into(),
            op: SetOperator::Union,
            distinct: false,
            order_by: Vec::new(),
            limit: None,
        };
        assert_eq!(
            sql(Command::SetOp(set_op), &DialectConfig::new(DialectKind::Generic)),
            "SELECT g.e1 FROM g WHERE (g.e1 = g.e2 AND g.e3 IS NOT NULL) OR g.e1 IN ('a', 'b') \
             UNION ALL SELECT h.e1 FROM h"
        );
    }

    #[test]
    fn test_dml() {
        let insert = Insert {
            group: GroupRef::new("pm1.g"),
            columns: vec![
                ColumnRef::new(None, "e1", DataType::String),
                ColumnRef::new(None, "e2", DataType::Integer),
            ],
            source: InsertSource::Values(vec![
                vec![
                    Expression::literal(Literal::string("a")),
                    Expression::literal(Literal::integer(1)),
                ],
                vec![
                    Expression::literal(Literal::string("b")),
                    Expression::literal(Literal::null(DataType::Integer)),
                ],
            ]),
        };
        assert_eq!(
            sql(Command::Insert(insert), &DialectConfig::new(DialectKind::Generic)),
            "INSERT INTO pm1.g (e1, e2) VALUES ('a', 1), ('b', NULL)"
        );

        let delete = Delete {
            group: GroupRef::new("pm1.g"),
            where_clause: Some(Expression::Not {
                expr: Box::new(Expression::compare(
                    Expression::column(Some("pm1.g"), "e2", DataType::Integer),
                    CompareOp::Lt,
                    Expression::literal(Literal::integer(0)),
                )),
            }),
        };
        assert_eq!(
            sql(Command::Delete(delete), &DialectConfig::new(DialectKind::Generic)),
            "DELETE FROM pm1.g WHERE NOT (pm1.g.e2 < 0)"
        );
    }

    #[test]
    fn test_oracle_select_without_from() {
        let select = Select::new(
            vec![DerivedColumn::new(Expression::literal(Literal::integer(1)))],
            Vec::new(),
        );
        assert_eq!(
            sql(Command::Select(select), &DialectConfig::new(DialectKind::Oracle)),
            "SELECT 1 FROM DUAL"
        );
    }

    #[test]
    fn test_offset_fetch_override() {
        let config = DialectConfig::new(DialectKind::SqlServer)
            .with_pagination(PaginationStrategy::OffsetFetch);
        let select = base_select().with_limit(Limit::new(5, Some(10)));
        assert_eq!(
            sql(Command::Select(select), &config),
            "SELECT g.e1, g.e2 FROM g ORDER BY g.e1 OFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_boolean_constant_in_condition() {
        let flag = |value: bool| Expression::literal(Literal::boolean(value));
        let select = Select::new(
            vec![DerivedColumn::aliased(flag(true), "active")],
            vec![TableReference::Group(GroupRef::new("g"))],
        )
        .with_where(Expression::or(
            Expression::compare(
                Expression::column(Some("g"), "e2", DataType::Integer),
                CompareOp::Gt,
                Expression::literal(Literal::integer(1)),
            ),
            Expression::Not {
                expr: Box::new(flag(true)),
            },
        ));

        assert_eq!(
            sql(Command::Select(select.clone()), &DialectConfig::new(DialectKind::SqlServer)),
            "SELECT 1 AS active FROM g WHERE g.e2 > 1 OR NOT (1 = 1)"
        );
        assert_eq!(
            sql(Command::Select(select), &DialectConfig::new(DialectKind::PostgreSql)),
            "SELECT TRUE AS active FROM g WHERE g.e2 > 1 OR NOT (1 = 1)"
        );

        let select = base_select().with_where(flag(false));
        assert_eq!(
            sql(Command::Select(select), &DialectConfig::new(DialectKind::Oracle)),
            "SELECT g.e1, g.e2 FROM g WHERE 1 = 0 ORDER BY g.e1"
        );
    }
}
