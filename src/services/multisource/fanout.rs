// Fan-Out Planner
//
// Expands one access to a multi-source model into one physical access per
// bound source, pruning the sources whose rewritten command cannot produce
// rows. Planning is synchronous and performs no I/O.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{FederationError, Result};
use crate::models::{
    AccessPlanNode, Command, DerivedColumn, Expression, FanOutResult, InsertSource, Literal,
    MultiSourceModel, PseudoColumnMode, QueryExpression, Select, SetOperator, Value,
};

use super::catalog::MultiSourceCatalog;
use super::folding::ConstantFolder;
use super::substitution::SourceSubstitutionRewriter;

/// Pruning oracle: may this command produce rows (or change data)?
pub trait ShouldExecute: Send + Sync {
    fn should_execute(&self, command: &Command) -> Result<bool>;
}

impl<F> ShouldExecute for F
where
    F: Fn(&Command) -> bool + Send + Sync,
{
    fn should_execute(&self, command: &Command) -> Result<bool> {
        Ok(self(command))
    }
}

/// Decides from the folded command alone: a FALSE or UNKNOWN filter, a
/// zero row limit, an empty set operation or an INSERT without rows never
/// needs to run.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticPruningOracle;

impl ShouldExecute for StaticPruningOracle {
    fn should_execute(&self, command: &Command) -> Result<bool> {
        Ok(match command {
            Command::Select(select) => select_may_return_rows(select),
            Command::SetOp(set_op) => set_op_may_return_rows(
                set_op.op,
                &set_op.left,
                &set_op.right,
                set_op.limit.and_then(|l| l.row_limit),
            ),
            Command::Insert(insert) => match &insert.source {
                InsertSource::Values(rows) => !rows.is_empty(),
                InsertSource::Query(query) => query_may_return_rows(query),
            },
            Command::Update(update) => {
                !update.set.is_empty() && !is_never_true(update.where_clause.as_ref())
            }
            Command::Delete(delete) => !is_never_true(delete.where_clause.as_ref()),
            Command::Call(_) => true,
        })
    }
}

/// FALSE or a NULL boolean
fn is_never_true(predicate: Option<&Expression>) -> bool {
    predicate
        .and_then(Expression::as_literal)
        .is_some_and(|literal| match literal.value {
            Value::Boolean(value) => !value,
            Value::Null => true,
            _ => false,
        })
}

fn select_may_return_rows(select: &Select) -> bool {
    !is_never_true(select.where_clause.as_ref())
        && !is_never_true(select.having.as_ref())
        && select.limit.and_then(|l| l.row_limit) != Some(0)
}

fn set_op_may_return_rows(
    op: SetOperator,
    left: &QueryExpression,
    right: &QueryExpression,
    row_limit: Option<u64>,
) -> bool {
    if row_limit == Some(0) {
        return false;
    }
    let left = query_may_return_rows(left);
    match op {
        SetOperator::Union => left || query_may_return_rows(right),
        SetOperator::Intersect => left && query_may_return_rows(right),
        SetOperator::Except => left,
    }
}

fn query_may_return_rows(query: &QueryExpression) -> bool {
    match query {
        QueryExpression::Select(select) => select_may_return_rows(select),
        QueryExpression::SetOp(set_op) => set_op_may_return_rows(
            set_op.op,
            &set_op.left,
            &set_op.right,
            set_op.limit.and_then(|l| l.row_limit),
        ),
    }
}

pub struct FanOutPlanner {
    catalog: Arc<dyn MultiSourceCatalog>,
    rewriter: SourceSubstitutionRewriter,
}

impl FanOutPlanner {
    pub fn new(catalog: Arc<dyn MultiSourceCatalog>, folder: Arc<dyn ConstantFolder>) -> Self {
        let rewriter = SourceSubstitutionRewriter::new(catalog.clone(), folder);
        Self { catalog, rewriter }
    }

    /// Expand `node`, resolving its model through the catalog
    pub fn plan(&self, node: AccessPlanNode, oracle: &dyn ShouldExecute) -> Result<FanOutResult> {
        let model = self
            .catalog
            .resolve_multi_source_model(&node.model_name)
            .map_err(|e| FederationError::planning(&node.model_name, e.to_string()))?;
        self.fan_out(node, model.as_deref(), oracle)
    }

    /// Expand `node` across the sources of `model`. Without a model the node
    /// passes through unchanged.
    pub fn fan_out(
        &self,
        node: AccessPlanNode,
        model: Option<&MultiSourceModel>,
        oracle: &dyn ShouldExecute,
    ) -> Result<FanOutResult> {
        let Some(model) = model else {
            return Ok(FanOutResult::Single(node));
        };
        if model.sources.is_empty() {
            return Err(FederationError::planning(&model.name, "no bound sources"));
        }

        let mut survivors = Vec::with_capacity(model.sources.len());
        let mut failures = Vec::new();

        for source in &model.sources {
            let rewritten = match self.rewriter.substitute(&node.command, model, source) {
                Ok(rewritten) => rewritten,
                Err(e) => {
                    warn!("Substitution failed for source '{}' of '{}': {}", source, model.name, e);
                    failures.push(format!("{}: {}", source, e));
                    continue;
                }
            };

            match oracle.should_execute(&rewritten) {
                Ok(false) => {
                    debug!("Pruned source '{}' of '{}'", source, model.name);
                    continue;
                }
                Ok(true) => {}
                Err(e) => {
                    warn!(
                        "Pruning check failed for source '{}' of '{}', keeping it: {}",
                        source, model.name, e
                    );
                }
            }
            survivors.push(node.for_source(source, rewritten));
        }

        if !failures.is_empty() {
            return Err(FederationError::planning(
                &model.name,
                format!("source substitution failed ({})", failures.join("; ")),
            ));
        }

        let result = match survivors.len() {
            0 => FanOutResult::Empty,
            1 => match survivors.pop() {
                Some(node) => FanOutResult::Single(node),
                None => FanOutResult::Empty,
            },
            _ => {
                if model.pseudo_column_mode == PseudoColumnMode::Synthesize {
                    for survivor in survivors.iter_mut() {
                        let source = survivor.connector_binding_id.clone().unwrap_or_default();
                        inject_pseudo_column(&mut survivor.command, &model.pseudo_column, &source);
                    }
                }
                FanOutResult::Many(survivors)
            }
        };

        info!(
            "Fan-out of '{}': {} of {} sources {:?}",
            model.name,
            result.len(),
            model.sources.len(),
            result.bindings()
        );
        Ok(result)
    }
}

/// Project `'<source>' AS <pseudo column>` from every branch that does not
/// already project the pseudo column
fn inject_pseudo_column(command: &mut Command, pseudo_column: &str, source: &str) {
    match command {
        Command::Select(select) => inject_into_select(select, pseudo_column, source),
        Command::SetOp(set_op) => {
            inject_into_query(&mut set_op.left, pseudo_column, source);
            inject_into_query(&mut set_op.right, pseudo_column, source);
        }
        Command::Insert(_) | Command::Update(_) | Command::Delete(_) | Command::Call(_) => {}
    }
}

fn inject_into_query(query: &mut QueryExpression, pseudo_column: &str, source: &str) {
    match query {
        QueryExpression::Select(select) => inject_into_select(select, pseudo_column, source),
        QueryExpression::SetOp(set_op) => {
            inject_into_query(&mut set_op.left, pseudo_column, source);
            inject_into_query(&mut set_op.right, pseudo_column, source);
        }
    }
}

fn inject_into_select(select: &mut Select, pseudo_column: &str, source: &str) {
    let projected = select.projection.iter().any(|column| {
        column
            .output_name()
            .is_some_and(|name| name.eq_ignore_ascii_case(pseudo_column))
    });
    if !projected {
        select.projection.push(DerivedColumn::aliased(
            Expression::literal(Literal::string(source)),
            pseudo_column,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CompareOp, DataType, Delete, GroupRef, Join, JoinKind, Limit, TableReference,
    };
    use crate::services::dialect::{DialectConfig, DialectKind};
    use crate::services::renderer::render;
    use crate::validation::SqlValidator;
    use crate::services::multisource::catalog::StaticCatalog;
    use crate::services::multisource::folding::SimpleConstantFolder;

    fn planner(catalog: StaticCatalog) -> FanOutPlanner {
        FanOutPlanner::new(Arc::new(catalog), Arc::new(SimpleConstantFolder))
    }

    fn model() -> MultiSourceModel {
        MultiSourceModel::new(
            "Accounts",
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
        )
    }

    fn pseudo() -> Expression {
        Expression::column(Some("a"), "SOURCE_NAME", DataType::String)
    }

    fn string(value: &str) -> Expression {
        Expression::literal(Literal::string(value))
    }

    fn select(predicate: Option<Expression>) -> Command {
        let mut select = Select::new(
            vec![DerivedColumn::new(Expression::column(
                Some("a"),
                "id",
                DataType::Integer,
            ))],
            vec![TableReference::Group(GroupRef::aliased("accounts", "a"))],
        );
        select.where_clause = predicate;
        Command::Select(select)
    }

    fn node(command: Command) -> AccessPlanNode {
        AccessPlanNode::new("Accounts", command)
    }

    #[test]
    fn test_non_multi_source_passes_through() {
        let planner = planner(StaticCatalog::new());
        let original = node(select(None));

        let result = planner.plan(original.clone(), &StaticPruningOracle).unwrap();
        assert_eq!(result, FanOutResult::Single(original));
    }

    #[test]
    fn test_pruned_source_is_dropped_in_order() {
        let planner = planner(StaticCatalog::new().with_model(model()).unwrap());
        let predicate = Expression::compare(pseudo(), CompareOp::Ne, string("B"));

        let result = planner
            .plan(node(select(Some(predicate))), &StaticPruningOracle)
            .unwrap();
        let FanOutResult::Many(nodes) = &result else {
            panic!("expected many, got {:?}", result);
        };
        assert_eq!(result.bindings(), vec!["A", "C"]);
        assert_ne!(nodes[0].id, nodes[1].id);

        let Command::Select(branch) = &nodes[0].command else {
            panic!("expected select");
        };
        // predicate folded away, source projected
        assert!(branch.where_clause.is_none());
        assert_eq!(
            branch.projection.last(),
            Some(&DerivedColumn::aliased(string("A"), "SOURCE_NAME"))
        );
    }

    #[test]
    fn test_all_sources_pruned_is_empty() {
        let planner = planner(StaticCatalog::new().with_model(model()).unwrap());
        let predicate = Expression::compare(pseudo(), CompareOp::Eq, string("Z"));

        let result = planner
            .plan(node(select(Some(predicate))), &StaticPruningOracle)
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_single_survivor_is_not_decorated() {
        let planner = planner(StaticCatalog::new().with_model(model()).unwrap());
        let predicate = Expression::compare(pseudo(), CompareOp::Eq, string("C"));

        let result = planner
            .plan(node(select(Some(predicate))), &StaticPruningOracle)
            .unwrap();
        let FanOutResult::Single(single) = result else {
            panic!("expected single");
        };
        assert_eq!(single.connector_binding_id.as_deref(), Some("C"));
        let Command::Select(branch) = &single.command else {
            panic!("expected select");
        };
        assert_eq!(branch.projection.len(), 1);
    }

    #[test]
    fn test_every_source_is_considered_in_order() {
        let planner = planner(StaticCatalog::new());
        let model = model();
        let seen = std::sync::Mutex::new(Vec::new());
        let oracle = |command: &Command| {
            if let Ok(mut seen) = seen.lock() {
                seen.push(command.clone());
            }
            true
        };

        let result = planner.fan_out(node(select(None)), Some(&model), &oracle).unwrap();
        assert_eq!(seen.lock().unwrap().len(), 3);
        assert_eq!(result.bindings(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_reuse_existing_mode_does_not_synthesize() {
        let planner = planner(StaticCatalog::new());
        let model = model().with_pseudo_column_mode(PseudoColumnMode::ReuseExisting);

        let result = planner
            .fan_out(node(select(None)), Some(&model), &StaticPruningOracle)
            .unwrap();
        for branch in result.nodes() {
            let Command::Select(select) = &branch.command else {
                panic!("expected select");
            };
            assert_eq!(select.projection.len(), 1);
        }
    }

    #[test]
    fn test_model_without_sources_is_planning_error() {
        let planner = planner(StaticCatalog::new());
        let model = MultiSourceModel::new("Accounts", Vec::new());

        let err = planner
            .fan_out(node(select(None)), Some(&model), &StaticPruningOracle)
            .unwrap_err();
        assert_eq!(err.code(), "PLANNING_ERROR");
        assert!(err.to_string().contains("Accounts"));
    }

    #[test]
    fn test_oracle_failure_keeps_branch() {
        struct Failing;
        impl ShouldExecute for Failing {
            fn should_execute(&self, _: &Command) -> Result<bool> {
                Err(FederationError::Metadata("statistics unavailable".to_string()))
            }
        }

        let planner = planner(StaticCatalog::new());
        let result = planner
            .fan_out(node(select(None)), Some(&model()), &Failing)
            .unwrap();
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_dml_pruning() {
        let planner = planner(StaticCatalog::new());
        let delete = Command::Delete(Delete {
            group: GroupRef::new("accounts"),
            where_clause: Some(Expression::in_list(
                pseudo(),
                vec![string("A"), string("C")],
                false,
            )),
        });

        let result = planner
            .fan_out(node(delete), Some(&model()), &StaticPruningOracle)
            .unwrap();
        assert_eq!(result.bindings(), vec!["A", "C"]);
        for branch in result.nodes() {
            let Command::Delete(delete) = &branch.command else {
                panic!("expected delete");
            };
            assert!(delete.where_clause.is_none());
        }
    }

    #[test]
    fn test_zero_row_limit_is_pruned() {
        let mut select = Select::new(
            vec![DerivedColumn::new(Expression::column(None, "id", DataType::Integer))],
            vec![TableReference::Group(GroupRef::new("accounts"))],
        );
        select.limit = Some(Limit::new(0, Some(0)));
        assert!(!StaticPruningOracle
            .should_execute(&Command::Select(select))
            .unwrap());
    }

    #[test]
    fn test_substitution_failure_reports_sources() {
        struct BrokenCatalog;
        impl MultiSourceCatalog for BrokenCatalog {
            fn resolve_multi_source_model(
                &self,
                _: &str,
            ) -> Result<Option<Arc<MultiSourceModel>>> {
                Ok(None)
            }

            fn is_pseudo_column(
                &self,
                _: &MultiSourceModel,
                _: &crate::models::ColumnRef,
            ) -> Result<bool> {
                Err(FederationError::Metadata("catalog offline".to_string()))
            }
        }

        let planner = FanOutPlanner::new(Arc::new(BrokenCatalog), Arc::new(SimpleConstantFolder));
        let err = planner
            .fan_out(node(select(None)), Some(&model()), &StaticPruningOracle)
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("A: "));
        assert!(message.contains("C: "));
    }

    const DIALECTS: [DialectKind; 5] = [
        DialectKind::Generic,
        DialectKind::PostgreSql,
        DialectKind::MySql,
        DialectKind::Oracle,
        DialectKind::SqlServer,
    ];

    fn two_sources() -> StaticCatalog {
        let model = MultiSourceModel::new("Accounts", vec!["A".to_string(), "B".to_string()]);
        StaticCatalog::new().with_model(model).unwrap()
    }

    fn id(group: &str) -> Expression {
        Expression::column(Some(group), "id", DataType::Integer)
    }

    /// Render every branch for `kind`, checking the text parses
    fn render_branches(result: &FanOutResult, kind: DialectKind) -> Vec<String> {
        let config = DialectConfig::new(kind);
        result
            .nodes()
            .into_iter()
            .map(|node| {
                let rendered = render(&node.command, &config, None).unwrap();
                SqlValidator::validate_rendered(&rendered.sql, kind, &node.command).unwrap();
                rendered.sql
            })
            .collect()
    }

    #[test]
    fn test_folded_join_condition_renders_for_every_dialect() {
        let planner = planner(two_sources());
        let condition = Expression::and(
            Expression::compare(id("a"), CompareOp::Eq, id("o")),
            Expression::compare(pseudo(), CompareOp::Eq, string("A")),
        );
        let command = Command::Select(Select::new(
            vec![DerivedColumn::new(id("a"))],
            vec![TableReference::Join(Box::new(Join {
                left: TableReference::Group(GroupRef::aliased("accounts", "a")),
                right: TableReference::Group(GroupRef::aliased("orders", "o")),
                kind: JoinKind::LeftOuter,
                condition: Some(condition),
            }))],
        ));

        let result = planner.plan(node(command), &StaticPruningOracle).unwrap();
        assert_eq!(result.bindings(), vec!["A", "B"]);

        for kind in DIALECTS {
            let sql = render_branches(&result, kind);
            assert!(sql[0].ends_with("ON a.id = o.id"), "{}: {}", kind.as_str(), sql[0]);
            assert!(sql[1].ends_with("ON 1 = 0"), "{}: {}", kind.as_str(), sql[1]);
        }
    }

    #[test]
    fn test_folded_subquery_predicate_renders_for_every_dialect() {
        let planner = planner(two_sources());
        let subquery = Select::new(
            vec![DerivedColumn::new(Expression::column(Some("t"), "total", DataType::Integer))],
            vec![TableReference::Group(GroupRef::aliased("totals", "t"))],
        )
        .with_where(Expression::compare(pseudo(), CompareOp::Eq, string("A")));
        let command = Command::Select(Select::new(
            vec![
                DerivedColumn::new(id("a")),
                DerivedColumn::aliased(Expression::ScalarSubquery(Box::new(subquery)), "total"),
            ],
            vec![TableReference::Group(GroupRef::aliased("accounts", "a"))],
        ));

        let result = planner.plan(node(command), &StaticPruningOracle).unwrap();
        assert_eq!(result.len(), 2);

        for kind in DIALECTS {
            let sql = render_branches(&result, kind);
            assert!(!sql[0].contains("WHERE"), "{}: {}", kind.as_str(), sql[0]);
            assert!(sql[1].contains(" WHERE 1 = 0)"), "{}: {}", kind.as_str(), sql[1]);
        }
    }
}
