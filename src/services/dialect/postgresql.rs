// PostgreSQL function translations

use super::function_modifier::{extract, left_as_substr, right_as_substr, ConvertModifier, FunctionModifierRegistry, Token};
use crate::models::{DataType, Function};

pub(super) fn function_modifiers() -> FunctionModifierRegistry {
    FunctionModifierRegistry::new()
        .alias("lcase", "lower")
        .alias("ucase", "upper")
        .alias("ifnull", "coalesce")
        .alias("nvl", "coalesce")
        .alias("char", "chr")
        .alias("log", "ln")
        .alias("log10", "log")
        .alias("ceiling", "ceil")
        .alias("dayofmonth", "day")
        .register("left", left_as_substr("substr"))
        .register("right", right_as_substr("substr", "length"))
        .register("dayofyear", extract("DOY"))
        .register("dayofweek", extract("DOW"))
        .register("quarter", extract("QUARTER"))
        .register("week", extract("WEEK"))
        .transform("locate", |function: &Function| {
            // position() has no start argument
            let [search, value] = function.args.as_slice() else {
                return Ok(None);
            };
            Ok(Some(vec![
                Token::text("position("),
                Token::Expr(search.clone()),
                Token::text(" in "),
                Token::Expr(value.clone()),
                Token::text(")"),
            ]))
        })
        .register("convert", ConvertModifier::new(CAST_TYPES))
        .register("cast", ConvertModifier::new(CAST_TYPES))
}

const CAST_TYPES: &[(DataType, &str)] = &[
    (DataType::String, "varchar"),
    (DataType::Char, "char(1)"),
    (DataType::Boolean, "boolean"),
    (DataType::Byte, "smallint"),
    (DataType::Short, "smallint"),
    (DataType::Integer, "integer"),
    (DataType::Long, "bigint"),
    (DataType::BigInteger, "numeric"),
    (DataType::Float, "real"),
    (DataType::Double, "float8"),
    (DataType::BigDecimal, "decimal"),
    (DataType::Date, "date"),
    (DataType::Time, "time"),
    (DataType::Timestamp, "timestamp"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Expression;

    #[test]
    fn test_locate_becomes_position() {
        let registry = function_modifiers();
        let function = Function::new(
            "LOCATE",
            vec![
                Expression::column(None, "a", DataType::String),
                Expression::column(None, "b", DataType::String),
            ],
            DataType::Integer,
        );
        let tokens = registry.modify(&function).unwrap().unwrap();
        assert_eq!(tokens[0], Token::text("position("));
        assert_eq!(tokens[2], Token::text(" in "));
    }

    #[test]
    fn test_three_argument_locate_falls_through() {
        let registry = function_modifiers();
        let function = Function::new(
            "locate",
            vec![
                Expression::column(None, "a", DataType::String),
                Expression::column(None, "b", DataType::String),
                Expression::column(None, "c", DataType::Integer),
            ],
            DataType::Integer,
        );
        assert!(registry.modify(&function).unwrap().is_none());
    }
}
