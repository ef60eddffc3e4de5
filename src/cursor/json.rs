//! JSON projection of a cursor.
//!
//! | Value | JSON |
//! |-------|------|
//! | null | `null` |
//! | Boolean | `true` / `false` |
//! | Int32, Int64, Choice | number |
//! | Float64 | number; non-finite values as `"NaN"`, `"inf"`, `"-inf"` |
//! | Decimal, DateTime, TimeSpan, Guid, String, ItemPath | string |
//! | Binary | base64 string |
//! | Class | object, first member `"@schema": <name>` |
//! | Variable | `{"@schema": "Variable", "@dataSchema": <name>, "@data": <payload>}` |
//! | List, MultiChoice | array |

use std::io;

use eyre::{bail, Result};
use serde_json::{Map, Number, Value as JsonValue};

use super::{is_variable, Cursor};
use crate::config::{JSON_DATA_KEY, JSON_DATA_SCHEMA_KEY, JSON_SCHEMA_KEY, MAX_NESTING_DEPTH};
use crate::error::FormatError;
use crate::types::{DataType, Value};

impl Cursor<'_> {
    pub fn to_json(&self) -> Result<JsonValue> {
        self.json_at_depth(0)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(&self.to_json()?)
            .map_err(|e| eyre::Report::new(FormatError::Json(e.to_string())))
    }

    pub fn write_json<W: io::Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, &self.to_json()?)
            .map_err(|e| eyre::Report::new(FormatError::Json(e.to_string())))
    }

    fn json_at_depth(&self, depth: usize) -> Result<JsonValue> {
        if depth > MAX_NESTING_DEPTH {
            bail!(FormatError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        if self.is_null() {
            return Ok(JsonValue::Null);
        }

        match self.schema.data_type() {
            DataType::Class if is_variable(&self.schema) => {
                let data_schema = self.data_schema()?;
                let data = self.variable_data()?;
                let mut object = Map::new();
                object.insert(JSON_SCHEMA_KEY.into(), self.schema.name().into());
                object.insert(JSON_DATA_SCHEMA_KEY.into(), data_schema.name().into());
                object.insert(JSON_DATA_KEY.into(), data.json_at_depth(depth + 1)?);
                Ok(JsonValue::Object(object))
            }
            DataType::Class => {
                let mut object = Map::new();
                object.insert(JSON_SCHEMA_KEY.into(), self.schema.name().into());
                for field in self.schema.fields() {
                    let child = self.goto_with(field.index(), false)?;
                    object.insert(field.name().to_string(), child.json_at_depth(depth + 1)?);
                }
                Ok(JsonValue::Object(object))
            }
            DataType::List | DataType::MultiChoice => {
                let mut items = Vec::with_capacity(self.count()?);
                for child in self.children_with(false) {
                    items.push(child?.json_at_depth(depth + 1)?);
                }
                Ok(JsonValue::Array(items))
            }
            _ => Ok(primitive_json(&self.get()?)),
        }
    }
}

/// JSON form of a primitive value.
pub(crate) fn primitive_json(value: &Value<'_>) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Int32(i) => JsonValue::from(*i),
        Value::Int64(i) => JsonValue::from(*i),
        Value::Float64(f) => match Number::from_f64(*f) {
            Some(n) => JsonValue::Number(n),
            None => JsonValue::String(f.to_string()),
        },
        Value::MultiChoice(values) => values.iter().copied().map(JsonValue::from).collect(),
        other => JsonValue::String(other.to_string()),
    }
}
