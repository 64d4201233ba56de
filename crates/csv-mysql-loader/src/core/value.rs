//! SQL value types and text-to-column coercion.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use super::schema::ConcreteType;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

/// Typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F64(f64),
    Text(String),
    Decimal(Decimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// Text representation, or `None` for NULL.
    pub fn as_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Convert a raw text cell into a value of the given column type.
    ///
    /// An empty cell is NULL for every type. The error message names the
    /// offending value and target type.
    pub fn coerce(raw: &str, ty: &ConcreteType) -> std::result::Result<SqlValue, String> {
        if raw.is_empty() {
            return Ok(SqlValue::Null);
        }

        let invalid = || format!("cannot store {:?} in a {} column", raw, ty);

        match ty {
            ConcreteType::BoundedString(len) => {
                let chars = raw.chars().count();
                if chars > *len as usize {
                    return Err(format!(
                        "value {:?} is {} characters, longer than {}",
                        raw, chars, ty
                    ));
                }
                Ok(SqlValue::Text(raw.to_string()))
            }
            ConcreteType::Text => Ok(SqlValue::Text(raw.to_string())),
            ConcreteType::Int32 => raw
                .trim()
                .parse::<i32>()
                .map(SqlValue::I32)
                .map_err(|_| invalid()),
            ConcreteType::Int64 => raw
                .trim()
                .parse::<i64>()
                .map(SqlValue::I64)
                .map_err(|_| invalid()),
            ConcreteType::Float => match raw.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(SqlValue::F64(f)),
                _ => Err(invalid()),
            },
            ConcreteType::FixedPoint { precision, scale } => {
                let value = Decimal::from_str(raw.trim())
                    .or_else(|_| Decimal::from_scientific(raw.trim()))
                    .map_err(|_| invalid())?;
                let rounded = value.round_dp(*scale);
                let max_int_digits = precision.saturating_sub(*scale) as usize;
                if integer_digits(&rounded) > max_int_digits {
                    return Err(format!("value {:?} is out of range for {}", raw, ty));
                }
                Ok(SqlValue::Decimal(rounded))
            }
            ConcreteType::Date => parse_date(raw.trim())
                .map(SqlValue::Date)
                .ok_or_else(invalid),
            ConcreteType::DateTime => parse_datetime(raw.trim())
                .map(SqlValue::DateTime)
                .ok_or_else(invalid),
            ConcreteType::Boolean => parse_bool(raw.trim())
                .map(SqlValue::Bool)
                .ok_or_else(invalid),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Bool(b) => f.write_str(if *b { "1" } else { "0" }),
            SqlValue::I32(i) => write!(f, "{}", i),
            SqlValue::I64(i) => write!(f, "{}", i),
            SqlValue::F64(v) => write!(f, "{}", v),
            SqlValue::Text(s) => f.write_str(s),
            SqlValue::Decimal(d) => write!(f, "{}", d),
            SqlValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            SqlValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

fn integer_digits(value: &Decimal) -> usize {
    let int_part = value.trunc().abs().to_string();
    let digits = int_part.trim_start_matches('0');
    digits.chars().filter(|c| c.is_ascii_digit()).count()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| parse_date(raw).map(|d| d.and_time(NaiveTime::MIN)))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// A batch of rows, each aligned with a column list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub rows: Vec<Vec<SqlValue>>,
}

impl Batch {
    pub fn new(rows: Vec<Vec<SqlValue>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rows read back from a table, with their column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl Sample {
    /// Cells rendered as text, NULL as `None`.
    pub fn to_text_rows(&self) -> Vec<Vec<Option<String>>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(SqlValue::as_text).collect())
            .collect()
    }
}
