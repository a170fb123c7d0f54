// Command Model
//
// Logical relational commands addressed to virtual groups. Every leaf command
// carries fully resolved group and column references.

use serde::{Deserialize, Serialize};

use super::expression::{ColumnRef, DataType, Expression, Literal};

/// Row window requested by a query
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Limit {
    #[serde(default)]
    pub offset: u64,
    /// `None` means unbounded
    #[serde(default)]
    pub row_limit: Option<u64>,
}

impl Limit {
    pub fn new(offset: u64, row_limit: Option<u64>) -> Self {
        Self { offset, row_limit }
    }

    /// Exclusive upper row bound (`offset + limit`), if bounded
    pub fn upper_bound(&self) -> Option<u64> {
        self.row_limit.map(|limit| self.offset.saturating_add(limit))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NullOrdering {
    First,
    Last,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SortSpec {
    pub expression: Expression,
    #[serde(default = "default_ascending")]
    pub ascending: bool,
    #[serde(default)]
    pub nulls: Option<NullOrdering>,
}

fn default_ascending() -> bool {
    true
}

impl SortSpec {
    pub fn asc(expression: Expression) -> Self {
        Self {
            expression,
            ascending: true,
            nulls: None,
        }
    }

    pub fn desc(expression: Expression) -> Self {
        Self {
            expression,
            ascending: false,
            nulls: None,
        }
    }
}

/// Projected expression with an optional output name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DerivedColumn {
    #[serde(default)]
    pub alias: Option<String>,
    pub expression: Expression,
}

impl DerivedColumn {
    pub fn new(expression: Expression) -> Self {
        Self {
            alias: None,
            expression,
        }
    }

    pub fn aliased(expression: Expression, alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            expression,
        }
    }

    /// Output name of the column, if one can be derived without aliasing
    pub fn output_name(&self) -> Option<&str> {
        match (&self.alias, &self.expression) {
            (Some(alias), _) => Some(alias),
            (None, Expression::ColumnRef(column)) => Some(&column.name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupRef {
    /// Fully qualified name of the group in the source
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
}

impl GroupRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::LeftOuter => "LEFT OUTER JOIN",
            JoinKind::RightOuter => "RIGHT OUTER JOIN",
            JoinKind::FullOuter => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Join {
    pub left: TableReference,
    pub right: TableReference,
    pub kind: JoinKind,
    #[serde(default)]
    pub condition: Option<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DerivedTable {
    pub query: QueryExpression,
    pub alias: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TableReference {
    Group(GroupRef),
    Join(Box<Join>),
    Derived(Box<DerivedTable>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Select {
    #[serde(default)]
    pub distinct: bool,
    pub projection: Vec<DerivedColumn>,
    #[serde(default)]
    pub from: Vec<TableReference>,
    #[serde(default)]
    pub where_clause: Option<Expression>,
    #[serde(default)]
    pub group_by: Vec<Expression>,
    #[serde(default)]
    pub having: Option<Expression>,
    #[serde(default)]
    pub order_by: Vec<SortSpec>,
    #[serde(default)]
    pub limit: Option<Limit>,
}

impl Select {
    pub fn new(projection: Vec<DerivedColumn>, from: Vec<TableReference>) -> Self {
        Self {
            projection,
            from,
            ..Default::default()
        }
    }

    pub fn with_where(mut self, predicate: Expression) -> Self {
        self.where_clause = Some(predicate);
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<SortSpec>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_limit(mut self, limit: Limit) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

impl SetOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SetOperator::Union => "UNION",
            SetOperator::Intersect => "INTERSECT",
            SetOperator::Except => "EXCEPT",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetOp {
    pub left: QueryExpression,
    pub right: QueryExpression,
    pub op: SetOperator,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub order_by: Vec<SortSpec>,
    #[serde(default)]
    pub limit: Option<Limit>,
}

/// A query: either a simple select or a set operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryExpression {
    Select(Box<Select>),
    SetOp(Box<SetOp>),
}

impl QueryExpression {
    pub fn limit(&self) -> Option<Limit> {
        match self {
            QueryExpression::Select(select) => select.limit,
            QueryExpression::SetOp(set_op) => set_op.limit,
        }
    }

    pub fn order_by(&self) -> &[SortSpec] {
        match self {
            QueryExpression::Select(select) => &select.order_by,
            QueryExpression::SetOp(set_op) => &set_op.order_by,
        }
    }

    /// The select whose projection names the output columns
    pub fn leftmost_select(&self) -> &Select {
        match self {
            QueryExpression::Select(select) => select,
            QueryExpression::SetOp(set_op) => set_op.left.leftmost_select(),
        }
    }

    pub fn leftmost_select_mut(&mut self) -> &mut Select {
        match self {
            QueryExpression::Select(select) => select,
            QueryExpression::SetOp(set_op) => set_op.left.leftmost_select_mut(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum InsertSource {
    Values(Vec<Vec<Expression>>),
    Query(QueryExpression),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insert {
    pub group: GroupRef,
    pub columns: Vec<ColumnRef>,
    pub source: InsertSource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SetClause {
    pub column: ColumnRef,
    pub value: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Update {
    pub group: GroupRef,
    pub set: Vec<SetClause>,
    #[serde(default)]
    pub where_clause: Option<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delete {
    pub group: GroupRef,
    #[serde(default)]
    pub where_clause: Option<Expression>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterDirection {
    In,
    Out,
    InOut,
    Return,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parameter {
    pub direction: ParameterDirection,
    pub data_type: DataType,
    /// Value supplied for IN/INOUT parameters
    #[serde(default)]
    pub value: Option<Literal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Call {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// Logical command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Select(Select),
    SetOp(SetOp),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Call(Call),
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Select(_) => "SELECT",
            Command::SetOp(_) => "SET_OP",
            Command::Insert(_) => "INSERT",
            Command::Update(_) => "UPDATE",
            Command::Delete(_) => "DELETE",
            Command::Call(_) => "CALL",
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, Command::Select(_) | Command::SetOp(_))
    }
}

impl From<Select> for QueryExpression {
    fn from(select: Select) -> Self {
        QueryExpression::Select(Box::new(select))
    }
}

impl From<SetOp> for QueryExpression {
    fn from(set_op: SetOp) -> Self {
        QueryExpression::SetOp(Box::new(set_op))
    }
}

impl From<QueryExpression> for Command {
    fn from(query: QueryExpression) -> Self {
        match query {
            QueryExpression::Select(select) => Command::Select(*select),
            QueryExpression::SetOp(set_op) => Command::SetOp(*set_op),
        }
    }
}
