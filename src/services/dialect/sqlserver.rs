// SQL Server function translations

use super::function_modifier::{ConvertModifier, FunctionModifierRegistry, Token};
use crate::models::{DataType, Function};

pub(super) fn function_modifiers() -> FunctionModifierRegistry {
    FunctionModifierRegistry::new()
        .alias("ifnull", "ISNULL")
        .alias("nvl", "ISNULL")
        .alias("lcase", "LOWER")
        .alias("ucase", "UPPER")
        .alias("length", "LEN")
        .alias("substring", "SUBSTRING")
        .alias("locate", "CHARINDEX")
        .alias("ceil", "CEILING")
        .alias("log", "LOG")
        .alias("now", "GETDATE")
        .register("dayofyear", datepart("dayofyear"))
        .register("dayofweek", datepart("weekday"))
        .register("quarter", datepart("quarter"))
        .register("week", datepart("week"))
        .register("convert", ConvertModifier::new(CAST_TYPES))
        .register("cast", ConvertModifier::new(CAST_TYPES))
}

/// `fn(x)` as `DATEPART(<part>, x)`
fn datepart(part: &'static str) -> impl super::FunctionModifier {
    move |function: &Function| -> crate::error::Result<Option<Vec<Token>>> {
        let [value] = function.args.as_slice() else {
            return Ok(None);
        };
        Ok(Some(vec![
            Token::text(format!("DATEPART({}, ", part)),
            Token::Expr(value.clone()),
            Token::text(")"),
        ]))
    }
}

const CAST_TYPES: &[(DataType, &str)] = &[
    (DataType::String, "VARCHAR(4000)"),
    (DataType::Char, "CHAR(1)"),
    (DataType::Boolean, "BIT"),
    (DataType::Byte, "TINYINT"),
    (DataType::Short, "SMALLINT"),
    (DataType::Integer, "INT"),
    (DataType::Long, "BIGINT"),
    (DataType::BigInteger, "NUMERIC(38)"),
    (DataType::Float, "REAL"),
    (DataType::Double, "FLOAT"),
    (DataType::BigDecimal, "DECIMAL(38, 19)"),
    (DataType::Date, "DATE"),
    (DataType::Time, "TIME"),
    (DataType::Timestamp, "DATETIME2"),
];
