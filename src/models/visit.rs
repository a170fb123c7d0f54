// Command tree traversal
//
// Post-order mutable walks over every expression reachable from a command,
// including scalar subqueries, derived tables and join conditions.

use crate::error::Result;

use super::command::{
    Command, InsertSource, QueryExpression, Select, SortSpec, TableReference,
};
use super::expression::Expression;

/// Apply `f` to every expression in `command`, children before parents.
///
/// `f` may replace the expression it is given; the replacement is not
/// walked again.
pub fn rewrite_command<F>(command: &mut Command, f: &mut F) -> Result<()>
where
    F: FnMut(&mut Expression) -> Result<()>,
{
    match command {
        Command::Select(select) => rewrite_select(select, f),
        Command::SetOp(set_op) => {
            rewrite_query(&mut set_op.left, f)?;
            rewrite_query(&mut set_op.right, f)?;
            rewrite_sort(&mut set_op.order_by, f)
        }
        Command::Insert(insert) => match &mut insert.source {
            InsertSource::Values(rows) => {
                for row in rows.iter_mut() {
                    for value in row.iter_mut() {
                        rewrite_expression(value, f)?;
                    }
                }
                Ok(())
            }
            InsertSource::Query(query) => rewrite_query(query, f),
        },
        Command::Update(update) => {
            for clause in update.set.iter_mut() {
                rewrite_expression(&mut clause.value, f)?;
            }
            if let Some(predicate) = update.where_clause.as_mut() {
                rewrite_expression(predicate, f)?;
            }
            Ok(())
        }
        Command::Delete(delete) => {
            if let Some(predicate) = delete.where_clause.as_mut() {
                rewrite_expression(predicate, f)?;
            }
            Ok(())
        }
        Command::Call(_) => Ok(()),
    }
}

pub fn rewrite_query<F>(query: &mut QueryExpression, f: &mut F) -> Result<()>
where
    F: FnMut(&mut Expression) -> Result<()>,
{
    match query {
        QueryExpression::Select(select) => rewrite_select(select, f),
        QueryExpression::SetOp(set_op) => {
            rewrite_query(&mut set_op.left, f)?;
            rewrite_query(&mut set_op.right, f)?;
            rewrite_sort(&mut set_op.order_by, f)
        }
    }
}

pub fn rewrite_select<F>(select: &mut Select, f: &mut F) -> Result<()>
where
    F: FnMut(&mut Expression) -> Result<()>,
{
    for column in select.projection.iter_mut() {
        rewrite_expression(&mut column.expression, f)?;
    }
    for table in select.from.iter_mut() {
        rewrite_table(table, f)?;
    }
    if let Some(predicate) = select.where_clause.as_mut() {
        rewrite_expression(predicate, f)?;
    }
    for expr in select.group_by.iter_mut() {
        rewrite_expression(expr, f)?;
    }
    if let Some(predicate) = select.having.as_mut() {
        rewrite_expression(predicate, f)?;
    }
    rewrite_sort(&mut select.order_by, f)
}

fn rewrite_table<F>(table: &mut TableReference, f: &mut F) -> Result<()>
where
    F: FnMut(&mut Expression) -> Result<()>,
{
    match table {
        TableReference::Group(_) => Ok(()),
        TableReference::Join(join) => {
            rewrite_table(&mut join.left, f)?;
            rewrite_table(&mut join.right, f)?;
            if let Some(condition) = join.condition.as_mut() {
                rewrite_expression(condition, f)?;
            }
            Ok(())
        }
        TableReference::Derived(derived) => rewrite_query(&mut derived.query, f),
    }
}

fn rewrite_sort<F>(items: &mut [SortSpec], f: &mut F) -> Result<()>
where
    F: FnMut(&mut Expression) -> Result<()>,
{
    for item in items.iter_mut() {
        rewrite_expression(&mut item.expression, f)?;
    }
    Ok(())
}

pub fn rewrite_expression<F>(expr: &mut Expression, f: &mut F) -> Result<()>
where
    F: FnMut(&mut Expression) -> Result<()>,
{
    match expr {
        Expression::ColumnRef(_) | Expression::Literal(_) => {}
        Expression::Function(function) => {
            for arg in function.args.iter_mut() {
                rewrite_expression(arg, f)?;
            }
        }
        Expression::Comparison(comparison) => {
            rewrite_expression(&mut comparison.left, f)?;
            rewrite_expression(&mut comparison.right, f)?;
        }
        Expression::AndOr(and_or) => {
            rewrite_expression(&mut and_or.left, f)?;
            rewrite_expression(&mut and_or.right, f)?;
        }
        Expression::In(in_list) => {
            rewrite_expression(&mut in_list.expr, f)?;
            for item in in_list.list.iter_mut() {
                rewrite_expression(item, f)?;
            }
        }
        Expression::Like(like) => {
            rewrite_expression(&mut like.expr, f)?;
            rewrite_expression(&mut like.pattern, f)?;
        }
        Expression::ScalarSubquery(select) => rewrite_select(select, f)?,
        Expression::IsNull(is_null) => rewrite_expression(&mut is_null.expr, f)?,
        Expression::Not { expr: inner } => rewrite_expression(inner, f)?,
        Expression::Aggregate(aggregate) => {
            if let Some(arg) = aggregate.arg.as_mut() {
                rewrite_expression(arg, f)?;
            }
        }
        Expression::RowNumber { order_by } => rewrite_sort(order_by, f)?,
    }
    f(expr)
}
