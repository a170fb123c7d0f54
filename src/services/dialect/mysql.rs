// MySQL function translations

use super::function_modifier::{ConvertModifier, FunctionModifierRegistry};
use crate::models::DataType;

pub(super) fn function_modifiers() -> FunctionModifierRegistry {
    FunctionModifierRegistry::new()
        .alias("nvl", "IFNULL")
        .alias("ceil", "CEILING")
        .alias("chr", "CHAR")
        .alias("substr", "SUBSTRING")
        .register("convert", ConvertModifier::new(CAST_TYPES))
        .register("cast", ConvertModifier::new(CAST_TYPES))
}

// MySQL only casts to a small set of target types
const CAST_TYPES: &[(DataType, &str)] = &[
    (DataType::String, "CHAR"),
    (DataType::Char, "CHAR(1)"),
    (DataType::Byte, "SIGNED"),
    (DataType::Short, "SIGNED"),
    (DataType::Integer, "SIGNED"),
    (DataType::Long, "SIGNED"),
    (DataType::BigInteger, "DECIMAL(65)"),
    (DataType::BigDecimal, "DECIMAL(65, 30)"),
    (DataType::Double, "DOUBLE"),
    (DataType::Date, "DATE"),
    (DataType::Time, "TIME"),
    (DataType::Timestamp, "DATETIME"),
];
