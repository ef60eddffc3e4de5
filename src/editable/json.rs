//! JSON projection of an editable tree, identical to the projection of a
//! cursor over the tree's serialized bytes.

use std::io;

use eyre::{bail, Result};
use serde_json::{Map, Value as JsonValue};

use super::{Editable, Node, Payload};
use crate::config::{JSON_DATA_KEY, JSON_DATA_SCHEMA_KEY, JSON_SCHEMA_KEY, MAX_NESTING_DEPTH};
use crate::cursor::primitive_json;
use crate::error::FormatError;
use crate::registry::builtin;

impl Editable {
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

        match &self.node {
            Node::Primitive(value) => Ok(primitive_json(value)),
            Node::Object(children) => {
                let mut object = Map::new();
                object.insert(JSON_SCHEMA_KEY.into(), self.schema.name().into());
                for child in children.iter().flatten() {
                    object.insert(child.name.clone(), child.json_at_depth(depth + 1)?);
                }
                Ok(JsonValue::Object(object))
            }
            Node::List(items) => {
                let mut array = Vec::with_capacity(self.len());
                for item in items.iter().flatten() {
                    array.push(item.json_at_depth(depth + 1)?);
                }
                Ok(JsonValue::Array(array))
            }
            Node::Variable(variable) => {
                let (data_schema, data) = match &variable.data {
                    Payload::Bound(payload) if !payload.is_null() => {
                        (payload.schema.clone(), payload.json_at_depth(depth + 1)?)
                    }
                    Payload::Serialized(cursor) => (cursor.schema().clone(), cursor.to_json()?),
                    _ => (self.provider.get_by_id(builtin::VOID)?, JsonValue::Null),
                };
                let mut object = Map::new();
                object.insert(JSON_SCHEMA_KEY.into(), self.schema.name().into());
                object.insert(JSON_DATA_SCHEMA_KEY.into(), data_schema.name().into());
                object.insert(JSON_DATA_KEY.into(), data);
                Ok(JsonValue::Object(object))
            }
        }
    }
}
