// Constant folding
//
// Once the pseudo column has been replaced by a literal, predicates such as
// `'east' = 'west' AND x > 1` can be decided statically. The folder works on
// three-valued logic: a comparison involving NULL folds to a NULL boolean,
// which a WHERE clause treats as false.

use std::cmp::Ordering;

use crate::error::Result;
use crate::models::visit::rewrite_command;
use crate::models::{
    Command, CompareOp, DataType, Expression, InsertSource, JoinKind, Literal, LogicalOp,
    QueryExpression, Select, TableReference, Value,
};

/// Simplification collaborator used after source substitution
pub trait ConstantFolder: Send + Sync {
    fn fold(&self, command: Command) -> Result<Command>;
}

/// Folds predicates whose operands are all literals
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleConstantFolder;

impl ConstantFolder for SimpleConstantFolder {
    fn fold(&self, mut command: Command) -> Result<Command> {
        rewrite_command(&mut command, &mut |expr| {
            if let Some(folded) = fold_expression(expr) {
                *expr = folded;
            } else if let Expression::ScalarSubquery(select) = expr {
                drop_in_select(select);
            }
            Ok(())
        })?;
        drop_true_clauses(&mut command);
        Ok(command)
    }
}

fn boolean(value: Option<bool>) -> Expression {
    match value {
        Some(value) => Expression::literal(Literal::boolean(value)),
        None => Expression::literal(Literal::null(DataType::Boolean)),
    }
}

/// Truth value of a boolean literal; `Some(None)` is UNKNOWN
fn truth(expr: &Expression) -> Option<Option<bool>> {
    let literal = expr.as_literal()?;
    match (&literal.value, literal.data_type) {
        (Value::Boolean(value), _) => Some(Some(*value)),
        (Value::Null, DataType::Boolean) => Some(None),
        _ => None,
    }
}

fn fold_expression(expr: &Expression) -> Option<Expression> {
    match expr {
        Expression::Comparison(comparison) => {
            let left = comparison.left.as_literal()?;
            let right = comparison.right.as_literal()?;
            if left.value.is_null() || right.value.is_null() {
                return Some(boolean(None));
            }
            let ordering = compare_values(&left.value, &right.value)?;
            let result = match comparison.op {
                CompareOp::Eq => ordering == Ordering::Equal,
                CompareOp::Ne => ordering != Ordering::Equal,
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Le => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                CompareOp::Ge => ordering != Ordering::Less,
            };
            Some(boolean(Some(result)))
        }
        Expression::In(in_list) => {
            let value = in_list.expr.as_literal()?;
            if value.value.is_null() {
                return Some(boolean(None));
            }
            let mut unknown = false;
            for item in &in_list.list {
                let item = item.as_literal()?;
                if item.value.is_null() {
                    unknown = true;
                    continue;
                }
                if compare_values(&value.value, &item.value)? == Ordering::Equal {
                    return Some(boolean(Some(!in_list.negated)));
                }
            }
            Some(boolean(if unknown { None } else { Some(in_list.negated) }))
        }
        Expression::Like(like) => {
            let (Value::String(value), Value::String(pattern)) = (
                &like.expr.as_literal()?.value,
                &like.pattern.as_literal()?.value,
            ) else {
                return None;
            };
            let chars: Vec<char> = value.chars().collect();
            let pattern: Vec<char> = pattern.chars().collect();
            Some(boolean(Some(
                like_matches(&chars, &pattern, like.escape) != like.negated,
            )))
        }
        Expression::IsNull(is_null) => {
            let literal = is_null.expr.as_literal()?;
            Some(boolean(Some(literal.value.is_null() != is_null.negated)))
        }
        Expression::Not { expr } => truth(expr).map(|value| boolean(value.map(|v| !v))),
        Expression::AndOr(and_or) => {
            let left = truth(&and_or.left);
            let right = truth(&and_or.right);
            // FALSE decides an AND, TRUE decides an OR
            let absorbing = matches!(and_or.op, LogicalOp::Or);
            if left == Some(Some(absorbing)) || right == Some(Some(absorbing)) {
                return Some(boolean(Some(absorbing)));
            }
            match (left, right) {
                (Some(Some(_)), _) => Some((*and_or.right).clone()),
                (_, Some(Some(_))) => Some((*and_or.left).clone()),
                (Some(None), Some(None)) => Some(boolean(None)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Ordering of two non-null literal values of comparable kinds
fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (a, b) => numeric(a)?.partial_cmp(&numeric(b)?),
    }
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        Value::Decimal(text) => text.parse().ok(),
        _ => None,
    }
}

/// SQL LIKE matching with `%`, `_` and an optional escape character
fn like_matches(value: &[char], pattern: &[char], escape: Option<char>) -> bool {
    match pattern.split_first() {
        None => value.is_empty(),
        Some((&c, rest)) if Some(c) == escape => match rest.split_first() {
            Some((&literal, rest)) => value.first() == Some(&literal)
                && like_matches(&value[1..], rest, escape),
            None => false,
        },
        Some((&'%', rest)) => (0..=value.len()).any(|skip| like_matches(&value[skip..], rest, escape)),
        Some((&'_', rest)) => !value.is_empty() && like_matches(&value[1..], rest, escape),
        Some((&c, rest)) => value.first() == Some(&c) && like_matches(&value[1..], rest, escape),
    }
}

/// Remove WHERE/HAVING clauses that folded to TRUE. An inner join on TRUE
/// becomes a cross join; outer joins keep their condition.
fn drop_true_clauses(command: &mut Command) {
    match command {
        Command::Select(select) => drop_in_select(select),
        Command::SetOp(set_op) => {
            drop_in_query(&mut set_op.left);
            drop_in_query(&mut set_op.right);
        }
        Command::Insert(insert) => {
            if let InsertSource::Query(query) = &mut insert.source {
                drop_in_query(query);
            }
        }
        Command::Update(update) => drop_if_true(&mut update.where_clause),
        Command::Delete(delete) => drop_if_true(&mut delete.where_clause),
        Command::Call(_) => {}
    }
}

fn drop_in_query(query: &mut QueryExpression) {
    match query {
        QueryExpression::Select(select) => drop_in_select(select),
        QueryExpression::SetOp(set_op) => {
            drop_in_query(&mut set_op.left);
            drop_in_query(&mut set_op.right);
        }
    }
}

fn drop_in_select(select: &mut Select) {
    drop_if_true(&mut select.where_clause);
    drop_if_true(&mut select.having);
    for table in select.from.iter_mut() {
        drop_in_table(table);
    }
}

fn drop_in_table(table: &mut TableReference) {
    match table {
        TableReference::Group(_) => {}
        TableReference::Join(join) => {
            drop_in_table(&mut join.left);
            drop_in_table(&mut join.right);
            if join.kind == JoinKind::Inner {
                drop_if_true(&mut join.condition);
                if join.condition.is_none() {
                    join.kind = JoinKind::Cross;
                }
            }
        }
        TableReference::Derived(derived) => drop_in_query(&mut derived.query),
    }
}

fn drop_if_true(clause: &mut Option<Expression>) {
    if clause.as_ref().and_then(Expression::as_bool_literal) == Some(true) {
        *clause = None;
    }
}
