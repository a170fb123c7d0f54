// Oracle Dialect
//
// Function translations and literal syntax for Oracle Database.

use super::function_modifier::{
    concat_as_operator, left_as_substr, locate_as_instr, native_tokens, right_as_substr,
    ConvertModifier, FunctionModifierRegistry, Token,
};
use crate::models::{DataType, Expression, Function, Literal};

pub(super) fn function_modifiers() -> FunctionModifierRegistry {
    FunctionModifierRegistry::new()
        // NULL handling
        .alias("ifnull", "NVL")
        .alias("coalesce", "COALESCE")
        // String functions
        .alias("lcase", "LOWER")
        .alias("ucase", "UPPER")
        .alias("substring", "SUBSTR")
        .alias("char", "CHR")
        .alias("length", "LENGTH")
        .register("left", left_as_substr("SUBSTR"))
        .register("right", right_as_substr("SUBSTR", "LENGTH"))
        .register("locate", locate_as_instr("INSTR"))
        .register("concat", concat_as_operator())
        // Numeric functions
        .alias("ceiling", "CEIL")
        .alias("log", "LN")
        .transform("log10", |function: &Function| {
            let [value] = function.args.as_slice() else {
                return Ok(None);
            };
            Ok(Some(native_tokens(
                "LOG",
                vec![Expression::literal(Literal::integer(10)), value.clone()],
                function.data_type,
            )))
        })
        // Date/Time functions
        .transform("now", |_: &Function| Ok(Some(vec![Token::text("SYSDATE")])))
        .transform("curdate", |_: &Function| Ok(Some(vec![Token::text("TRUNC(SYSDATE)")])))
        .register("dayofyear", to_char_number("DDD"))
        .register("dayofmonth", to_char_number("DD"))
        .register("dayofweek", to_char_number("D"))
        .register("week", to_char_number("WW"))
        .register("quarter", to_char_number("Q"))
        .register("convert", ConvertModifier::new(CAST_TYPES))
        .register("cast", ConvertModifier::new(CAST_TYPES))
}

/// `fn(x)` as `TO_NUMBER(TO_CHAR(x, '<format>'))`
fn to_char_number(format: &'static str) -> impl super::FunctionModifier {
    move |function: &Function| -> crate::error::Result<Option<Vec<Token>>> {
        let [value] = function.args.as_slice() else {
            return Ok(None);
        };
        Ok(Some(vec![
            Token::text("TO_NUMBER(TO_CHAR("),
            Token::Expr(value.clone()),
            Token::text(format!(", '{}'))", format)),
        ]))
    }
}

const CAST_TYPES: &[(DataType, &str)] = &[
    (DataType::String, "VARCHAR2(4000)"),
    (DataType::Char, "CHAR(1)"),
    (DataType::Byte, "NUMBER(3)"),
    (DataType::Short, "NUMBER(5)"),
    (DataType::Integer, "NUMBER(10)"),
    (DataType::Long, "NUMBER(19)"),
    (DataType::BigInteger, "NUMBER(38)"),
    (DataType::Float, "BINARY_FLOAT"),
    (DataType::Double, "BINARY_DOUBLE"),
    (DataType::BigDecimal, "NUMBER"),
    (DataType::Date, "DATE"),
    (DataType::Timestamp, "TIMESTAMP"),
];

pub(super) fn format_date(text: &str) -> String {
    format!("to_date('{}', 'YYYY-MM-DD')", text)
}

pub(super) fn format_timestamp(text: &str) -> String {
    if text.contains('.') {
        format!("to_timestamp('{}', 'YYYY-MM-DD HH24:MI:SS.FF')", text)
    } else {
        format!("to_timestamp('{}', 'YYYY-MM-DD HH24:MI:SS')", text)
    }
}
