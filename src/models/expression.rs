// Expression Model
//
// Scalar expressions of the logical command tree. Every expression carries a
// resolved type; the renderer and the pruning oracle rely on it.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::command::{Select, SortSpec};

/// Runtime type of an expression
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Char,
    Boolean,
    Byte,
    Short,
    Integer,
    Long,
    BigInteger,
    Float,
    Double,
    BigDecimal,
    Date,
    Time,
    Timestamp,
    Object,
    Null,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Byte
                | DataType::Short
                | DataType::Integer
                | DataType::Long
                | DataType::BigInteger
                | DataType::Float
                | DataType::Double
                | DataType::BigDecimal
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Char => "char",
            DataType::Boolean => "boolean",
            DataType::Byte => "byte",
            DataType::Short => "short",
            DataType::Integer => "integer",
            DataType::Long => "long",
            DataType::BigInteger => "biginteger",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::BigDecimal => "bigdecimal",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::Timestamp => "timestamp",
            DataType::Object => "object",
            DataType::Null => "null",
        }
    }
}

/// Literal value
///
/// `Decimal` keeps its canonical decimal text so no precision is lost
/// between the engine and the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Decimal(String),
    String(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnRef {
    /// Correlation name or group name qualifying the column
    #[serde(default)]
    pub group: Option<String>,
    pub name: String,
    pub data_type: DataType,
}

impl ColumnRef {
    pub fn new(group: Option<&str>, name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            group: group.map(str::to_string),
            name: name.into(),
            data_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Literal {
    pub value: Value,
    pub data_type: DataType,
    /// Eligible to be sent as a bind parameter in prepared-statement mode
    #[serde(default)]
    pub bindable: bool,
}

impl Literal {
    pub fn new(value: Value, data_type: DataType) -> Self {
        Self {
            value,
            data_type,
            bindable: false,
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(Value::String(value.into()), DataType::String)
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(Value::Boolean(value), DataType::Boolean)
    }

    pub fn integer(value: i64) -> Self {
        Self::new(Value::Integer(value), DataType::Integer)
    }

    pub fn null(data_type: DataType) -> Self {
        Self::new(Value::Null, data_type)
    }

    pub fn bindable(mut self) -> Self {
        self.bindable = true;
        self
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Expression>,
    pub data_type: DataType,
    /// Already in the target dialect's form; never passed through the
    /// function modifier registry.
    #[serde(default)]
    pub native: bool,
}

impl Function {
    pub fn new(name: impl Into<String>, args: Vec<Expression>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            args,
            data_type,
            native: false,
        }
    }

    /// Build a dialect-native call, rendered verbatim as `name(args...)`
    pub fn native(name: impl Into<String>, args: Vec<Expression>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            args,
            data_type,
            native: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comparison {
    pub left: Box<Expression>,
    pub op: CompareOp,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AndOr {
    pub left: Box<Expression>,
    pub op: LogicalOp,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct In {
    pub expr: Box<Expression>,
    pub list: Vec<Expression>,
    #[serde(default)]
    pub negated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Like {
    pub expr: Box<Expression>,
    pub pattern: Box<Expression>,
    #[serde(default)]
    pub escape: Option<char>,
    #[serde(default)]
    pub negated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IsNull {
    pub expr: Box<Expression>,
    #[serde(default)]
    pub negated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Aggregate {
    pub name: String,
    #[serde(default)]
    pub distinct: bool,
    /// `None` means `*`
    #[serde(default)]
    pub arg: Option<Box<Expression>>,
    pub data_type: DataType,
}

/// Scalar or predicate expression
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    ColumnRef(ColumnRef),
    Literal(Literal),
    Function(Function),
    Comparison(Comparison),
    AndOr(AndOr),
    In(In),
    Like(Like),
    ScalarSubquery(Box<Select>),
    IsNull(IsNull),
    Not {
        expr: Box<Expression>,
    },
    Aggregate(Aggregate),
    /// Dialect-native sequential row number over the enclosing FROM clause
    RowNumber {
        #[serde(default)]
        order_by: Vec<SortSpec>,
    },
}

impl Expression {
    pub fn column(group: Option<&str>, name: impl Into<String>, data_type: DataType) -> Self {
        Expression::ColumnRef(ColumnRef::new(group, name, data_type))
    }

    pub fn literal(literal: Literal) -> Self {
        Expression::Literal(literal)
    }

    pub fn function(name: impl Into<String>, args: Vec<Expression>, data_type: DataType) -> Self {
        Expression::Function(Function::new(name, args, data_type))
    }

    pub fn compare(left: Expression, op: CompareOp, right: Expression) -> Self {
        Expression::Comparison(Comparison {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Expression::AndOr(AndOr {
            left: Box::new(left),
            op: LogicalOp::And,
            right: Box::new(right),
        })
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Expression::AndOr(AndOr {
            left: Box::new(left),
            op: LogicalOp::Or,
            right: Box::new(right),
        })
    }

    pub fn in_list(expr: Expression, list: Vec<Expression>, negated: bool) -> Self {
        Expression::In(In {
            expr: Box::new(expr),
            list,
            negated,
        })
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Expression::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    /// Boolean literal value, if this expression is one
    pub fn as_bool_literal(&self) -> Option<bool> {
        self.as_literal().and_then(Literal::as_bool)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Expression::ColumnRef(c) => c.data_type,
            Expression::Literal(l) => l.data_type,
            Expression::Function(f) => f.data_type,
            Expression::Aggregate(a) => a.data_type,
            Expression::ScalarSubquery(select) => select
                .projection
                .first()
                .map(|c| c.expression.data_type())
                .unwrap_or(DataType::Null),
            Expression::RowNumber { .. } => DataType::Long,
            Expression::Comparison(_)
            | Expression::AndOr(_)
            | Expression::In(_)
            | Expression::Like(_)
            | Expression::IsNull(_)
            | Expression::Not { .. } => DataType::Boolean,
        }
    }
}
