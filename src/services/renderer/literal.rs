// Literal formatting
//
// Inline text for literal values in a source's dialect. Date and time
// values are interpreted in the engine time zone and shifted into the
// source's zone when the two differ.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};

use crate::error::{FederationError, Result};
use crate::models::{DataType, Literal, Value};
use crate::services::dialect::DialectConfig;

const NANOS_PER_SECOND: u32 = 1_000_000_000;

pub(super) fn format_literal(
    literal: &Literal,
    config: &DialectConfig,
    engine_tz: FixedOffset,
) -> Result<String> {
    check_type(literal)?;

    match &literal.value {
        Value::Null => Ok("NULL".to_string()),
        Value::Boolean(value) => Ok(config.kind.format_boolean(*value).to_string()),
        Value::Integer(value) => Ok(value.to_string()),
        Value::Float(value) => format_double(*value),
        Value::Decimal(text) => format_decimal(text),
        Value::String(text) => Ok(quote(text)),
        Value::Date(date) => Ok(config.kind.format_date(&date.format("%Y-%m-%d").to_string())),
        Value::Time(time) => {
            let time = convert_time(*time, engine_tz, config.time_zone)?;
            let text = time.format("%H:%M:%S").to_string();
            if config.has_time_type {
                Ok(config.kind.format_time(&text))
            } else {
                Ok(config.kind.format_timestamp(&format!("1970-01-01 {}", text)))
            }
        }
        Value::Timestamp(timestamp) => {
            let timestamp = convert(*timestamp, engine_tz, config.time_zone)?;
            Ok(config
                .kind
                .format_timestamp(&timestamp_text(&timestamp, config.timestamp_nanos_precision)))
        }
    }
}

/// The value variant must be representable in the declared type
fn check_type(literal: &Literal) -> Result<()> {
    let compatible = match (&literal.value, literal.data_type) {
        (Value::Null, _) => true,
        (_, DataType::Object) => true,
        (Value::Boolean(_), data_type) => data_type == DataType::Boolean,
        (Value::Integer(_), data_type) => data_type.is_numeric(),
        (Value::Float(_), data_type) => matches!(
            data_type,
            DataType::Float | DataType::Double | DataType::BigDecimal
        ),
        (Value::Decimal(_), data_type) => data_type.is_numeric(),
        (Value::String(_), data_type) => {
            matches!(data_type, DataType::String | DataType::Char)
        }
        (Value::Date(_), data_type) => data_type == DataType::Date,
        (Value::Time(_), data_type) => data_type == DataType::Time,
        (Value::Timestamp(_), data_type) => data_type == DataType::Timestamp,
    };

    if compatible {
        Ok(())
    } else {
        Err(FederationError::internal(format!(
            "literal {:?} cannot be rendered as type {}",
            literal.value,
            literal.data_type.as_str()
        )))
    }
}

/// Fixed-point for very small and very large magnitudes, shortest
/// round-trip text otherwise.
pub(super) fn format_double(value: f64) -> Result<String> {
    if !value.is_finite() {
        return Err(FederationError::internal(format!(
            "non-finite literal {} cannot be rendered",
            value
        )));
    }
    let magnitude = value.abs();
    if value != 0.0 && (magnitude < 1e-3 || magnitude >= 1e7) {
        // Display never switches to exponent notation
        Ok(format!("{}", value))
    } else {
        Ok(format!("{:?}", value))
    }
}

/// Fractional digits kept when an exponent is expanded
const MAX_FRACTION_DIGITS: usize = 60;

fn format_decimal(text: &str) -> Result<String> {
    let invalid = || FederationError::internal(format!("invalid decimal literal '{}'", text));

    let (mantissa, exponent) = match text.find(['e', 'E']) {
        Some(idx) => (&text[..idx], Some(&text[idx + 1..])),
        None => (text, None),
    };
    let (sign, unsigned) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa.strip_prefix('+').unwrap_or(mantissa)),
    };
    let (integer, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let digits_only = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if integer.len() + fraction.len() == 0 || !digits_only(integer) || !digits_only(fraction) {
        return Err(invalid());
    }

    let Some(exponent) = exponent else {
        return Ok(text.to_string());
    };
    let exponent: i64 = exponent.parse().map_err(|_| invalid())?;
    if exponent.abs() > 1000 {
        return Err(invalid());
    }

    let digits = format!("{}{}", integer, fraction);
    let point = integer.len() as i64 + exponent;
    let (whole, fraction) = if point <= 0 {
        let zeros = "0".repeat(point.unsigned_abs() as usize);
        (String::new(), format!("{}{}", zeros, digits))
    } else if point as usize >= digits.len() {
        let zeros = "0".repeat(point as usize - digits.len());
        (format!("{}{}", digits, zeros), String::new())
    } else {
        let (whole, fraction) = digits.split_at(point as usize);
        (whole.to_string(), fraction.to_string())
    };

    let whole = whole.trim_start_matches('0');
    let fraction: String = fraction.chars().take(MAX_FRACTION_DIGITS).collect();
    let fraction = fraction.trim_end_matches('0');
    let whole = if whole.is_empty() { "0" } else { whole };
    if fraction.is_empty() {
        Ok(format!("{}{}", sign, whole))
    } else {
        Ok(format!("{}{}.{}", sign, whole, fraction))
    }
}

pub(super) fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn convert(
    value: NaiveDateTime,
    engine_tz: FixedOffset,
    source_tz: Option<FixedOffset>,
) -> Result<NaiveDateTime> {
    let Some(source_tz) = source_tz.filter(|tz| *tz != engine_tz) else {
        return Ok(value);
    };
    engine_tz
        .from_local_datetime(&value)
        .single()
        .map(|instant| instant.with_timezone(&source_tz).naive_local())
        .ok_or_else(|| {
            FederationError::internal(format!("cannot convert {} to source time zone", value))
        })
}

fn convert_time(
    value: NaiveTime,
    engine_tz: FixedOffset,
    source_tz: Option<FixedOffset>,
) -> Result<NaiveTime> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| FederationError::internal("invalid epoch date"))?;
    Ok(convert(epoch.and_time(value), engine_tz, source_tz)?.time())
}

/// `yyyy-mm-dd hh:mm:ss[.f]` with the fraction truncated to `precision`
/// digits and trailing zeros removed
pub(super) fn timestamp_text(value: &NaiveDateTime, precision: u32) -> String {
    let mut text = value.format("%Y-%m-%d %H:%M:%S").to_string();
    let precision = precision.min(9);
    let nanos = value.nanosecond() % NANOS_PER_SECOND;
    let truncated = nanos / 10u32.pow(9 - precision);
    if precision > 0 && truncated > 0 {
        let digits = format!("{:0width$}", truncated, width = precision as usize);
        text.push('.');
        text.push_str(digits.trim_end_matches('0'));
    }
    text
}
