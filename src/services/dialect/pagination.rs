// Pagination strategies
//
// Dialects either append native OFFSET/LIMIT syntax or, lacking it, have the
// query rewritten into nested derived tables filtered on a row number:
//
// ```text
// SELECT PAGED_VIEW.e1, PAGED_VIEW.e2
// FROM (SELECT VIEW_FOR_LIMIT.e1, VIEW_FOR_LIMIT.e2, <row number> AS rn
//       FROM (<original query with aliased projection>) VIEW_FOR_LIMIT) PAGED_VIEW
// WHERE PAGED_VIEW.rn > 5 AND PAGED_VIEW.rn <= 15
// ORDER BY PAGED_VIEW.rn
// ```

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{FederationError, Result};
use crate::models::{
    ColumnRef, CompareOp, DataType, DerivedColumn, DerivedTable, Expression, Limit, Literal,
    QueryExpression, Select, SortSpec, TableReference, Value,
};

/// Alias of the derived table wrapping the original query
pub const LIMIT_VIEW: &str = "VIEW_FOR_LIMIT";
/// Alias of the derived table exposing the row number
pub const PAGED_VIEW: &str = "PAGED_VIEW";
/// Name of the row number column
pub const ROW_NUMBER_COLUMN: &str = "rn";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStrategy {
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `LIMIT m, n`
    MySqlLimit,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY`
    OffsetFetch,
    /// Nested derived tables filtered on a row number
    RowNumber,
}

impl PaginationStrategy {
    pub fn is_native(&self) -> bool {
        !matches!(self, PaginationStrategy::RowNumber)
    }

    /// Native clause appended after the query text. Empty when the limit is
    /// a no-op.
    pub fn native_clause(&self, limit: &Limit) -> String {
        match (self, limit.row_limit) {
            (PaginationStrategy::LimitOffset, Some(n)) if limit.offset > 0 => {
                format!(" LIMIT {} OFFSET {}", n, limit.offset)
            }
            (PaginationStrategy::LimitOffset, Some(n)) => format!(" LIMIT {}", n),
            (PaginationStrategy::LimitOffset, None) if limit.offset > 0 => {
                format!(" OFFSET {}", limit.offset)
            }
            (PaginationStrategy::MySqlLimit, Some(n)) if limit.offset > 0 => {
                format!(" LIMIT {}, {}", limit.offset, n)
            }
            (PaginationStrategy::MySqlLimit, Some(n)) => format!(" LIMIT {}", n),
            (PaginationStrategy::MySqlLimit, None) if limit.offset > 0 => {
                format!(" LIMIT {}, {}", limit.offset, u64::MAX)
            }
            (PaginationStrategy::OffsetFetch, Some(n)) => {
                format!(" OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", limit.offset, n)
            }
            (PaginationStrategy::OffsetFetch, None) if limit.offset > 0 => {
                format!(" OFFSET {} ROWS", limit.offset)
            }
            _ => String::new(),
        }
    }
}

/// True when the limit restricts nothing
pub fn is_noop(limit: &Limit) -> bool {
    limit.offset == 0 && limit.row_limit.is_none()
}

/// Rewrite `query` (whose limit has already been detached) into row-number
/// form selecting rows `[offset, offset + limit)`.
///
/// With `row_number_in_where` and no offset, a single derived table is
/// enough; otherwise two are used. Aliases are assigned deterministically,
/// so rewriting an identical query always yields an identical tree.
pub fn rewrite_for_pagination(
    mut query: QueryExpression,
    limit: Limit,
    row_number_in_where: bool,
) -> Result<Select> {
    let ordered = !query.order_by().is_empty();
    let (visible, all_columns, window_order) = alias_projection(&mut query)?;
    if !row_number_in_where {
        // the window ordering replaces it; derived tables may not be ordered
        match &mut query {
            QueryExpression::Select(select) => select.order_by.clear(),
            QueryExpression::SetOp(set_op) => set_op.order_by.clear(),
        }
    }

    let view_column = |column: &(String, DataType)| {
        Expression::ColumnRef(ColumnRef::new(Some(LIMIT_VIEW), column.0.clone(), column.1))
    };
    let inner = TableReference::Derived(Box::new(DerivedTable {
        query,
        alias: LIMIT_VIEW.to_string(),
    }));

    if row_number_in_where && limit.offset == 0 {
        if let Some(upper) = limit.row_limit {
            let mut select = Select::new(
                visible.iter().map(|c| DerivedColumn::new(view_column(c))).collect(),
                vec![inner],
            );
            select.where_clause = Some(Expression::compare(
                Expression::RowNumber {
                    order_by: Vec::new(),
                },
                CompareOp::Le,
                bound_literal(upper)?,
            ));
            return Ok(select);
        }
    }

    let mut middle_projection: Vec<DerivedColumn> = all_columns
        .iter()
        .map(|c| DerivedColumn::new(view_column(c)))
        .collect();
    middle_projection.push(DerivedColumn::aliased(
        Expression::RowNumber {
            order_by: window_order
                .into_iter()
                .map(|(alias, data_type, template)| SortSpec {
                    expression: Expression::ColumnRef(ColumnRef::new(
                        Some(LIMIT_VIEW),
                        alias,
                        data_type,
                    )),
                    ..template
                })
                .collect(),
        },
        ROW_NUMBER_COLUMN,
    ));
    let middle = Select::new(middle_projection, vec![inner]);

    let row_number = || {
        Expression::ColumnRef(ColumnRef::new(
            Some(PAGED_VIEW),
            ROW_NUMBER_COLUMN,
            DataType::Long,
        ))
    };
    let lower = (limit.offset > 0)
        .then(|| -> Result<Expression> {
            Ok(Expression::compare(
                row_number(),
                CompareOp::Gt,
                bound_literal(limit.offset)?,
            ))
        })
        .transpose()?;
    let upper = limit
        .upper_bound()
        .map(|upper| -> Result<Expression> {
            Ok(Expression::compare(
                row_number(),
                CompareOp::Le,
                bound_literal(upper)?,
            ))
        })
        .transpose()?;

    let mut outer = Select::new(
        visible
            .iter()
            .map(|(name, data_type)| {
                DerivedColumn::new(Expression::ColumnRef(ColumnRef::new(
                    Some(PAGED_VIEW),
                    name.clone(),
                    *data_type,
                )))
            })
            .collect(),
        vec![TableReference::Derived(Box::new(DerivedTable {
            query: middle.into(),
            alias: PAGED_VIEW.to_string(),
        }))],
    );
    outer.where_clause = match (lower, upper) {
        (Some(lower), Some(upper)) => Some(Expression::and(lower, upper)),
        (lower, upper) => lower.or(upper),
    };
    if ordered {
        outer.order_by = vec![SortSpec::asc(row_number())];
    }
    Ok(outer)
}

fn bound_literal(value: u64) -> Result<Expression> {
    let value = i64::try_from(value)
        .map_err(|_| FederationError::internal(format!("row bound {} out of range", value)))?;
    Ok(Expression::literal(Literal::new(
        Value::Integer(value),
        DataType::Long,
    )))
}

type Column = (String, DataType);
type WindowItem = (String, DataType, SortSpec);

/// Give every projected column of the output-defining select a unique
/// alias and point ORDER BY items at those aliases.
///
/// Returns the visible columns, all columns (visible plus those added for
/// non-projected sort keys) and the sort keys expressed as aliases.
fn alias_projection(query: &mut QueryExpression) -> Result<(Vec<Column>, Vec<Column>, Vec<WindowItem>)> {
    let mut used: HashSet<String> = HashSet::new();
    used.insert(ROW_NUMBER_COLUMN.to_uppercase());

    let select = query.leftmost_select_mut();
    let mut visible = Vec::with_capacity(select.projection.len());
    let mut originals = Vec::with_capacity(select.projection.len());
    for column in select.projection.iter_mut() {
        let base = column.output_name().unwrap_or("expr").to_string();
        let alias = unique_alias(&base, &mut used);
        originals.push(column.output_name().map(str::to_string));
        column.alias = Some(alias.clone());
        visible.push((alias, column.expression.data_type()));
    }
    let projected: Vec<Expression> = select
        .projection
        .iter()
        .map(|column| column.expression.clone())
        .collect();

    let mut all_columns = visible.clone();
    let mut window_order = Vec::new();
    let mut hidden = Vec::new();

    let is_set_op = matches!(query, QueryExpression::SetOp(_));
    let distinct = match &*query {
        QueryExpression::Select(select) => select.distinct,
        QueryExpression::SetOp(_) => true,
    };
    let order_by = match &mut *query {
        QueryExpression::Select(select) => &mut select.order_by,
        QueryExpression::SetOp(set_op) => &mut set_op.order_by,
    };

    for item in order_by.iter_mut() {
        let position = projected
            .iter()
            .position(|expr| *expr == item.expression)
            .or_else(|| match &item.expression {
                Expression::ColumnRef(column) => originals.iter().position(|name| {
                    name.as_deref()
                        .is_some_and(|name| name.eq_ignore_ascii_case(&column.name))
                }),
                _ => None,
            });

        let (alias, data_type) = match position {
            Some(idx) => visible[idx].clone(),
            None if is_set_op || distinct => {
                return Err(FederationError::internal(
                    "ORDER BY item is not projected; cannot paginate with a row number",
                ));
            }
            None => {
                let alias = unique_alias("expr", &mut used);
                let data_type = item.expression.data_type();
                hidden.push(DerivedColumn::aliased(item.expression.clone(), alias.clone()));
                all_columns.push((alias.clone(), data_type));
                (alias, data_type)
            }
        };

        item.expression = Expression::ColumnRef(ColumnRef::new(None, alias.clone(), data_type));
        window_order.push((alias, data_type, item.clone()));
    }

    query.leftmost_select_mut().projection.extend(hidden);
    Ok((visible, all_columns, window_order))
}

fn unique_alias(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_uppercase()) {
        return base.to_string();
    }
    let mut counter = 0usize;
    loop {
        let candidate = format!("{}{}", base, counter);
        if used.insert(candidate.to_uppercase()) {
            return candidate;
        }
        counter += 1;
    }
}
