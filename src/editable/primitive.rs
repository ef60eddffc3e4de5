//! Scalar nodes.

use std::borrow::Cow;

use chrono::{DateTime, Duration};
use eyre::Result;
use uuid::Uuid;

use super::{coerce, Editable, Node};
use crate::schema::Schema;
use crate::types::{DataType, Decimal, Value};

/// Zero value of a primitive schema. A Choice defaults to its choice set's
/// default option, or 0.
pub(crate) fn default_value(schema: &Schema) -> Value<'static> {
    match schema.data_type() {
        DataType::Boolean => Value::Boolean(false),
        DataType::Int32 => Value::Int32(0),
        DataType::Choice => Value::Int32(
            schema
                .choice_set()
                .and_then(|set| set.default_value())
                .unwrap_or(0),
        ),
        DataType::Int64 => Value::Int64(0),
        DataType::Float64 => Value::Float64(0.0),
        DataType::Decimal => Value::Decimal(Decimal::ZERO),
        DataType::DateTime => Value::DateTime(DateTime::UNIX_EPOCH),
        DataType::TimeSpan => Value::TimeSpan(Duration::zero()),
        DataType::Guid => Value::Guid(Uuid::nil()),
        DataType::String => Value::String(Cow::Borrowed("")),
        DataType::ItemPath => Value::ItemPath(Cow::Borrowed("")),
        DataType::Binary => Value::Binary(Cow::Borrowed(&[])),
        DataType::Void | DataType::MultiChoice | DataType::Class | DataType::List => Value::Null,
    }
}

impl Editable {
    pub(super) fn set_primitive(&mut self, value: Value<'_>) -> Result<()> {
        let coerced = coerce(value, &self.schema, &self.name)?;
        self.node = Node::Primitive(coerced);
        Ok(())
    }
}
