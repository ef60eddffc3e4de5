//! # Decoded Value Representation
//!
//! `Value<'a>` is what a cursor decodes and what a primitive editable holds.
//! Text and binary variants use `Cow` so a cursor can hand out borrowed
//! slices of its buffer while editables own their data.
//!
//! ## Value Variants
//!
//! | Variant | Rust Type | Source |
//! |---------|-----------|--------|
//! | Null | - | null field, list item or Void |
//! | Boolean | bool | Boolean |
//! | Int32 | i32 | Int32, Choice |
//! | Int64 | i64 | Int64 |
//! | Float64 | f64 | Float64 |
//! | Decimal | [`Decimal`] | Decimal |
//! | DateTime | `DateTime<Utc>` | DateTime |
//! | TimeSpan | `chrono::Duration` | TimeSpan |
//! | Guid | `Uuid` | Guid |
//! | String | Cow<str> | String |
//! | Binary | Cow<[u8]> | Binary |
//! | ItemPath | Cow<str> | ItemPath |
//! | MultiChoice | Vec<i32> | MultiChoice |
//! | Money, GeoPosition, Measurement, DateTimeOffset | structured | built-in classes |

use std::borrow::Cow;
use std::fmt;

use base64::Engine;
use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

use super::decimal::Decimal;
use super::timespan::format_timespan;
use super::DataType;

#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Decimal(Decimal),
    DateTime(DateTime<Utc>),
    TimeSpan(Duration),
    Guid(Uuid),
    String(Cow<'a, str>),
    Binary(Cow<'a, [u8]>),
    ItemPath(Cow<'a, str>),
    MultiChoice(Vec<i32>),
    Money {
        amount: Decimal,
        currency: Cow<'a, str>,
    },
    GeoPosition {
        latitude: f64,
        longitude: f64,
    },
    Measurement {
        value: f64,
        unit: Cow<'a, str>,
    },
    DateTimeOffset(DateTime<FixedOffset>),
}

impl<'a> Value<'a> {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn string(text: impl Into<String>) -> Value<'static> {
        Value::String(Cow::Owned(text.into()))
    }

    pub fn binary(bytes: impl Into<Vec<u8>>) -> Value<'static> {
        Value::Binary(Cow::Owned(bytes.into()))
    }

    /// The primitive data type this value naturally encodes as.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Int32(_) => Some(DataType::Int32),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float64(_) => Some(DataType::Float64),
            Value::Decimal(_) => Some(DataType::Decimal),
            Value::DateTime(_) => Some(DataType::DateTime),
            Value::TimeSpan(_) => Some(DataType::TimeSpan),
            Value::Guid(_) => Some(DataType::Guid),
            Value::String(_) => Some(DataType::String),
            Value::Binary(_) => Some(DataType::Binary),
            Value::ItemPath(_) => Some(DataType::ItemPath),
            Value::MultiChoice(_) => Some(DataType::MultiChoice),
            Value::Money { .. }
            | Value::GeoPosition { .. }
            | Value::Measurement { .. }
            | Value::DateTimeOffset(_) => Some(DataType::Class),
        }
    }

    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Null => Value::Null,
            Value::Boolean(b) => Value::Boolean(b),
            Value::Int32(i) => Value::Int32(i),
            Value::Int64(i) => Value::Int64(i),
            Value::Float64(f) => Value::Float64(f),
            Value::Decimal(d) => Value::Decimal(d),
            Value::DateTime(dt) => Value::DateTime(dt),
            Value::TimeSpan(span) => Value::TimeSpan(span),
            Value::Guid(g) => Value::Guid(g),
            Value::String(s) => Value::String(Cow::Owned(s.into_owned())),
            Value::Binary(b) => Value::Binary(Cow::Owned(b.into_owned())),
            Value::ItemPath(p) => Value::ItemPath(Cow::Owned(p.into_owned())),
            Value::MultiChoice(v) => Value::MultiChoice(v),
            Value::Money { amount, currency } => Value::Money {
                amount,
                currency: Cow::Owned(currency.into_owned()),
            },
            Value::GeoPosition {
                latitude,
                longitude,
            } => Value::GeoPosition {
                latitude,
                longitude,
            },
            Value::Measurement { value, unit } => Value::Measurement {
                value,
                unit: Cow::Owned(unit.into_owned()),
            },
            Value::DateTimeOffset(dt) => Value::DateTimeOffset(dt),
        }
    }

    /// A view of this value borrowing its text and bytes.
    pub fn borrowed(&self) -> Value<'_> {
        match self {
            Value::String(s) => Value::String(Cow::Borrowed(s)),
            Value::Binary(b) => Value::Binary(Cow::Borrowed(b)),
            Value::ItemPath(p) => Value::ItemPath(Cow::Borrowed(p)),
            Value::Money { amount, currency } => Value::Money {
                amount: *amount,
                currency: Cow::Borrowed(currency),
            },
            Value::Measurement { value, unit } => Value::Measurement {
                value: *value,
                unit: Cow::Borrowed(unit),
            },
            other => other.clone(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(i) => Some(*i as i64),
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::ItemPath(s) => Some(s),
            _ => None,
        }
    }
}

/// Text form used for string coercion and error messages.
impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int32(i) => write!(f, "{}", i),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::TimeSpan(span) => f.write_str(&format_timespan(span)),
            Value::Guid(g) => write!(f, "{}", g),
            Value::String(s) | Value::ItemPath(s) => f.write_str(s),
            Value::Binary(b) => f.write_str(&base64::engine::general_purpose::STANDARD.encode(b)),
            Value::MultiChoice(v) => write!(f, "{:?}", v),
            Value::Money { amount, currency } => write!(f, "{} {}", amount, currency),
            Value::GeoPosition {
                latitude,
                longitude,
            } => write!(f, "({}, {})", latitude, longitude),
            Value::Measurement { value, unit } => write!(f, "{} {}", value, unit),
            Value::DateTimeOffset(dt) => {
                f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, false))
            }
        }
    }
}

/// Reads the text [`Value`]'s `Display` writes for a DateTime.
///
/// RFC 3339 only admits four-digit years, so years outside 0000-9999
/// (written with an explicit sign, e.g. `+12000-01-01T00:00:00Z`) are read
/// through the signed `%Y` form instead.
pub fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = text.strip_suffix('Z')?;
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

impl From<bool> for Value<'static> {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value<'static> {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value<'static> {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value<'static> {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<Decimal> for Value<'static> {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<Uuid> for Value<'static> {
    fn from(v: Uuid) -> Self {
        Value::Guid(v)
    }
}

impl From<DateTime<Utc>> for Value<'static> {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<Duration> for Value<'static> {
    fn from(v: Duration) -> Self {
        Value::TimeSpan(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::String(Cow::Borrowed(v))
    }
}

impl From<String> for Value<'static> {
    fn from(v: String) -> Self {
        Value::String(Cow::Owned(v))
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(v: &'a [u8]) -> Self {
        Value::Binary(Cow::Borrowed(v))
    }
}

impl<'a, T> From<Option<T>> for Value<'a>
where
    T: Into<Value<'a>>,
{
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
