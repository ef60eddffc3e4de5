//! Permissive conversion of incoming values to a primitive schema's type.
//!
//! | Target | Accepted sources |
//! |--------|------------------|
//! | Boolean | Boolean, integers (non-zero is true), "true"/"false"/"yes"/"no"/"1"/"0" |
//! | Int32, Int64 | integers in range, integral Float64/Decimal, Boolean, numeric text |
//! | Choice | Int32-compatible values, option names of the schema's choice set |
//! | Float64 | any number, numeric text including "NaN"/"inf" |
//! | Decimal | any finite number, decimal text |
//! | DateTime | DateTime, DateTimeOffset, Int64 microseconds, RFC 3339 text (signed year past 9999) |
//! | TimeSpan | TimeSpan within i64 microseconds, Int64 microseconds, `[-][d.]hh:mm:ss[.ffffff]` text |
//! | Guid | Guid, 16-byte Binary, hyphenated or simple text |
//! | String | any scalar (text form) |
//! | ItemPath | String, ItemPath |
//! | Binary | Binary, base64 text |
//!
//! Anything else fails with `FormatError::Conversion` naming the value, the
//! target type and the field.

use std::borrow::Cow;

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use eyre::Result;
use uuid::Uuid;

use crate::error::FormatError;
use crate::schema::Schema;
use crate::types::{parse_datetime, parse_timespan, DataType, Decimal, Value};

pub(crate) fn coerce(value: Value<'_>, schema: &Schema, field: &str) -> Result<Value<'static>> {
    let target = schema.data_type();
    let converted = match target {
        DataType::Void => None,
        DataType::Boolean => to_bool(&value).map(Value::Boolean),
        DataType::Int32 => to_i64(&value)
            .and_then(|i| i32::try_from(i).ok())
            .map(Value::Int32),
        DataType::Choice => choice_value(&value, schema).map(Value::Int32),
        DataType::Int64 => to_i64(&value).map(Value::Int64),
        DataType::Float64 => to_f64(&value).map(Value::Float64),
        DataType::Decimal => to_decimal(&value).map(Value::Decimal),
        DataType::DateTime => to_datetime(&value).map(Value::DateTime),
        DataType::TimeSpan => to_timespan(&value).map(Value::TimeSpan),
        DataType::Guid => to_guid(&value).map(Value::Guid),
        DataType::String => match &value {
            Value::Null => None,
            Value::MultiChoice(_) => None,
            other => Some(Value::String(Cow::Owned(other.to_string()))),
        },
        DataType::ItemPath => match &value {
            Value::String(s) | Value::ItemPath(s) => {
                Some(Value::ItemPath(Cow::Owned(s.to_string())))
            }
            _ => None,
        },
        DataType::Binary => match &value {
            Value::Binary(b) => Some(Value::Binary(Cow::Owned(b.to_vec()))),
            Value::String(s) => base64::engine::general_purpose::STANDARD
                .decode(s.as_bytes())
                .ok()
                .map(|bytes| Value::Binary(Cow::Owned(bytes))),
            _ => None,
        },
        DataType::MultiChoice | DataType::Class | DataType::List => None,
    };

    converted.ok_or_else(|| {
        eyre::Report::new(FormatError::Conversion {
            value: value.to_string(),
            target,
            field: field.to_string(),
        })
    })
}

fn to_bool(value: &Value<'_>) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        Value::Int32(i) => Some(*i != 0),
        Value::Int64(i) => Some(*i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn to_i64(value: &Value<'_>) -> Option<i64> {
    match value {
        Value::Boolean(b) => Some(*b as i64),
        Value::Int32(i) => Some(*i as i64),
        Value::Int64(i) => Some(*i),
        Value::Float64(f) if f.fract() == 0.0 && f.abs() < 9.2e18 => Some(*f as i64),
        Value::Decimal(d) if d.is_integral() => i64::try_from(d.trunc()).ok(),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<Decimal>()
                    .ok()
                    .filter(Decimal::is_integral)
                    .and_then(|d| i64::try_from(d.trunc()).ok())
            })
        }
        _ => None,
    }
}

fn choice_value(value: &Value<'_>, schema: &Schema) -> Option<i32> {
    if let (Value::String(s), Some(set)) = (value, schema.choice_set()) {
        if let Some(option) = set.option_by_name(s.trim()) {
            return Some(option.value);
        }
    }
    to_i64(value).and_then(|i| i32::try_from(i).ok())
}

fn to_f64(value: &Value<'_>) -> Option<f64> {
    match value {
        Value::Int32(i) => Some(*i as f64),
        Value::Int64(i) => Some(*i as f64),
        Value::Float64(f) => Some(*f),
        Value::Decimal(d) => Some(d.to_f64()),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn to_decimal(value: &Value<'_>) -> Option<Decimal> {
    match value {
        Value::Int32(i) => Some(Decimal::from_i64(*i as i64)),
        Value::Int64(i) => Some(Decimal::from_i64(*i)),
        Value::Float64(f) => Decimal::from_f64(*f).ok(),
        Value::Decimal(d) => Some(*d),
        Value::String(s) => s.parse::<Decimal>().ok(),
        _ => None,
    }
}

fn to_datetime(value: &Value<'_>) -> Option<DateTime<Utc>> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::DateTimeOffset(dt) => Some(dt.with_timezone(&Utc)),
        Value::Int64(micros) => DateTime::from_timestamp_micros(*micros),
        Value::String(s) => parse_datetime(s),
        _ => None,
    }
}

fn to_timespan(value: &Value<'_>) -> Option<Duration> {
    match value {
        Value::TimeSpan(span) => span.num_microseconds().map(Duration::microseconds),
        Value::Int64(micros) => Some(Duration::microseconds(*micros)),
        Value::String(s) => parse_timespan(s).ok(),
        _ => None,
    }
}

fn to_guid(value: &Value<'_>) -> Option<Uuid> {
    match value {
        Value::Guid(g) => Some(*g),
        Value::Binary(b) => Uuid::from_slice(b).ok(),
        Value::String(s) => Uuid::parse_str(s.trim()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ChoiceOption, ChoiceSet, SchemaBuilder};

    fn prim(data_type: DataType) -> Schema {
        Schema::primitive(format!("{:?}", data_type), data_type).unwrap()
    }

    fn ok(value: Value<'_>, data_type: DataType) -> Value<'static> {
        coerce(value, &prim(data_type), "f").unwrap()
    }

    #[test]
    fn string_to_scalars() {
        assert_eq!(ok(Value::from("yes"), DataType::Boolean), Value::Boolean(true));
        assert_eq!(ok(Value::from(" 42 "), DataType::Int32), Value::Int32(42));
        assert_eq!(ok(Value::from("1.25"), DataType::Float64), Value::Float64(1.25));
        assert_eq!(
            ok(Value::from("-3.50"), DataType::Decimal),
            Value::Decimal(Decimal::new(-35, 1).unwrap())
        );
        assert_eq!(
            ok(Value::from("AQID"), DataType::Binary),
            Value::binary(vec![1u8, 2, 3])
        );
        assert_eq!(
            ok(Value::from("01:00:00"), DataType::TimeSpan),
            Value::TimeSpan(Duration::hours(1))
        );
        let guid = Uuid::from_u128(0x1234);
        assert_eq!(ok(Value::string(guid.to_string()), DataType::Guid), Value::Guid(guid));
    }

    #[test]
    fn datetime_from_rfc3339() {
        let parsed = ok(Value::from("2024-01-02T03:04:05+01:00"), DataType::DateTime);
        let expected = DateTime::parse_from_rfc3339("2024-01-02T02:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(parsed, Value::DateTime(expected));
    }

    #[test]
    fn datetime_from_signed_year_text() {
        let parsed = ok(Value::from("+12000-06-01T00:00:00Z"), DataType::DateTime);
        let expected = chrono::NaiveDate::from_ymd_opt(12000, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        assert_eq!(parsed, Value::DateTime(expected));
    }

    #[test]
    fn timespan_must_fit_microseconds() {
        let huge = Duration::milliseconds(i64::MAX / 2);
        let err = coerce(Value::TimeSpan(huge), &prim(DataType::TimeSpan), "took").unwrap_err();
        assert!(matches!(
            FormatError::of(&err),
            Some(FormatError::Conversion { field, .. }) if field == "took"
        ));

        let sub_micro = Duration::nanoseconds(1_500);
        assert_eq!(
            ok(Value::TimeSpan(sub_micro), DataType::TimeSpan),
            Value::TimeSpan(Duration::microseconds(1))
        );
    }

    #[test]
    fn numeric_widths_respect_range() {
        assert_eq!(ok(Value::Int64(7), DataType::Int32), Value::Int32(7));
        assert_eq!(ok(Value::Float64(3.0), DataType::Int64), Value::Int64(3));
        let err = coerce(Value::Int64(1 << 40), &prim(DataType::Int32), "count").unwrap_err();
        match FormatError::of(&err) {
            Some(FormatError::Conversion { target, field, .. }) => {
                assert_eq!(*target, DataType::Int32);
                assert_eq!(field, "count");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(coerce(Value::Float64(2.5), &prim(DataType::Int32), "f").is_err());
    }

    #[test]
    fn choice_names_resolve() {
        let set = ChoiceSet::new(vec![ChoiceOption::new(1, "Low"), ChoiceOption::new(5, "High")]);
        let schema = SchemaBuilder::choice("Priority", set).build().unwrap();
        assert_eq!(coerce(Value::from("high"), &schema, "p").unwrap(), Value::Int32(5));
        assert_eq!(coerce(Value::Int32(1), &schema, "p").unwrap(), Value::Int32(1));
        assert!(coerce(Value::from("urgent"), &schema, "p").is_err());
    }

    #[test]
    fn scalars_to_string() {
        assert_eq!(ok(Value::Int32(5), DataType::String), Value::string("5"));
        assert!(coerce(Value::Boolean(true), &prim(DataType::ItemPath), "f").is_err());
    }
}
