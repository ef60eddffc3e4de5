//! Tagged-union nodes.
//!
//! A Variable's payload is either bound to an editable tree or kept as an
//! isolated cursor over bytes that were already serialized. The cursor form
//! is written back verbatim; [`Editable::data_mut`] turns it into a tree on
//! first mutable access.

use std::sync::Arc;

use eyre::{bail, Result};
use tracing::trace;

use super::{Editable, EditableKind, Node};
use crate::cursor::Cursor;
use crate::error::FormatError;
use crate::registry::builtin;
use crate::schema::{same_schema, Schema, SchemaId};
use crate::types::{DataType, Value};

#[derive(Clone)]
pub(crate) enum Payload {
    Null,
    Bound(Box<Editable>),
    Serialized(Cursor<'static>),
}

#[derive(Clone)]
pub(crate) struct VariableNode {
    pub(crate) present: bool,
    pub(crate) data: Payload,
}

impl VariableNode {
    pub(crate) fn absent() -> Self {
        Self {
            present: false,
            data: Payload::Null,
        }
    }

    pub(crate) fn empty() -> Self {
        Self {
            present: true,
            data: Payload::Null,
        }
    }

    pub(crate) fn bound(payload: Editable) -> Self {
        Self {
            present: true,
            data: Payload::Bound(Box::new(payload)),
        }
    }

    pub(super) fn get(&self) -> Result<Value<'_>> {
        if !self.present {
            return Ok(Value::Null);
        }
        match &self.data {
            Payload::Null => Ok(Value::Null),
            Payload::Bound(payload) => payload.get(),
            Payload::Serialized(cursor) => cursor.get(),
        }
    }

    /// Size of a present payload; `None` when it is written as null.
    pub(super) fn payload_size(&self) -> Result<Option<usize>> {
        match &self.data {
            Payload::Null => Ok(None),
            Payload::Bound(payload) if payload.is_null() => Ok(None),
            Payload::Bound(payload) => payload.serialized_size().map(Some),
            Payload::Serialized(cursor) => cursor.serialized_size().map(Some),
        }
    }

    pub(super) fn payload_schema_id(&self) -> SchemaId {
        match &self.data {
            Payload::Null => builtin::VOID,
            Payload::Bound(payload) => payload.schema.id(),
            Payload::Serialized(cursor) => cursor.schema().id(),
        }
    }

    pub(super) fn freeze_payload(&mut self) -> Result<()> {
        match &mut self.data {
            Payload::Null => Ok(()),
            Payload::Bound(payload) => {
                ensure_registered(&payload.schema)?;
                payload.freeze()
            }
            Payload::Serialized(cursor) => ensure_registered(cursor.schema()),
        }
    }

    pub(super) fn thaw(&mut self) {
        if let Payload::Bound(payload) = &mut self.data {
            payload.thaw();
        }
    }
}

fn ensure_registered(schema: &Schema) -> Result<()> {
    if !schema.is_registered() {
        bail!(FormatError::InvalidData(format!(
            "variable payload schema '{}' is not registered",
            schema.name()
        )));
    }
    Ok(())
}

fn is_void(schema: &Schema) -> bool {
    schema.data_type() == DataType::Void
}

/// Built-in schema a value is stored under when it selects a payload type.
fn builtin_id_for(value: &Value<'_>) -> Option<SchemaId> {
    let id = match value {
        Value::Null => return None,
        Value::Boolean(_) => builtin::BOOLEAN,
        Value::Int32(_) => builtin::INT32,
        Value::Int64(_) => builtin::INT64,
        Value::Float64(_) => builtin::FLOAT64,
        Value::Decimal(_) => builtin::DECIMAL,
        Value::DateTime(_) => builtin::DATE_TIME,
        Value::TimeSpan(_) => builtin::TIME_SPAN,
        Value::Guid(_) => builtin::GUID,
        Value::String(_) => builtin::STRING,
        Value::Binary(_) => builtin::BINARY,
        Value::ItemPath(_) => builtin::ITEM_PATH,
        Value::MultiChoice(_) => builtin::MULTI_CHOICE,
        Value::Money { .. } => builtin::MONEY,
        Value::GeoPosition { .. } => builtin::GEO_POSITION,
        Value::Measurement { .. } => builtin::MEASUREMENT,
        Value::DateTimeOffset(_) => builtin::DATE_TIME_OFFSET,
    };
    Some(id)
}

/// Whether a payload of `schema` can take `value` without changing type.
fn accepts(schema: &Schema, value: &Value<'_>) -> bool {
    match value.data_type() {
        Some(DataType::Class) | None => builtin_id_for(value) == Some(schema.id()),
        Some(DataType::Int32) => matches!(schema.data_type(), DataType::Int32 | DataType::Choice),
        Some(data_type) => schema.data_type() == data_type,
    }
}

impl Editable {
    /// Wraps `payload` in a new Variable node.
    pub(crate) fn variable_wrapping(
        provider: &Arc<dyn crate::registry::SchemaProvider>,
        payload: Editable,
        nullable: bool,
        name: impl Into<String>,
    ) -> Result<Editable> {
        let schema = provider.get_by_id(builtin::VARIABLE)?;
        let mut variable = Editable::from_node(
            provider,
            schema,
            nullable,
            name,
            Node::Variable(VariableNode::empty()),
        );
        variable.set_data(payload)?;
        Ok(variable)
    }

    fn variable_node(&self) -> Result<&VariableNode> {
        match &self.node {
            Node::Variable(variable) => Ok(variable),
            _ => Err(self.mismatch("Variable")),
        }
    }

    /// Mutable access that also marks an absent Variable as present.
    fn variable_node_mut(&mut self) -> Result<&mut VariableNode> {
        self.ensure_mutable()?;
        match &mut self.node {
            Node::Variable(variable) => {
                variable.present = true;
                Ok(variable)
            }
            _ => Err(super::type_mismatch(&self.schema, "Variable")),
        }
    }

    /// Schema of the current payload; Void when there is none.
    pub fn data_schema(&self) -> Result<Arc<Schema>> {
        let variable = self.variable_node()?;
        match &variable.data {
            Payload::Bound(payload) => Ok(payload.schema.clone()),
            Payload::Serialized(cursor) => Ok(cursor.schema().clone()),
            Payload::Null => self.provider.get_by_id(builtin::VOID),
        }
    }

    /// The payload when it is still held as serialized bytes.
    pub fn data_cursor(&self) -> Option<&Cursor<'static>> {
        match &self.node {
            Node::Variable(VariableNode {
                data: Payload::Serialized(cursor),
                ..
            }) => Some(cursor),
            _ => None,
        }
    }

    /// The payload when it is bound to an editable tree.
    pub fn data(&self) -> Option<&Editable> {
        match &self.node {
            Node::Variable(VariableNode {
                data: Payload::Bound(payload),
                ..
            }) => Some(payload),
            _ => None,
        }
    }

    /// Mutable payload, materializing a serialized payload into a tree.
    pub fn data_mut(&mut self) -> Result<&mut Editable> {
        let variable = self.variable_node_mut()?;
        if let Payload::Serialized(cursor) = &variable.data {
            trace!(
                schema = cursor.schema().name(),
                bytes = cursor.serialized_size().unwrap_or(0),
                "materializing variable payload"
            );
            let payload = crate::factory::copy_cursor(cursor, builtin::VARIABLE_DATA_FIELD, true)?;
            variable.data = Payload::Bound(Box::new(payload));
        }
        match &mut variable.data {
            Payload::Bound(payload) => Ok(payload.as_mut()),
            _ => bail!(FormatError::InvalidData(
                "variable has no payload; set a data schema first".to_string()
            )),
        }
    }

    /// Rebinds the payload to a default-valued tree of `schema`. Void
    /// clears the payload.
    pub fn set_data_schema(&mut self, schema: Arc<Schema>) -> Result<()> {
        let provider = self.provider.clone();
        let variable = self.variable_node_mut()?;
        if is_void(&schema) {
            variable.data = Payload::Null;
            return Ok(());
        }
        ensure_registered(&schema)?;
        let mut payload =
            Editable::with_defaults(&provider, schema, false, builtin::VARIABLE_DATA_FIELD)?;
        payload.nullable = true;
        variable.data = Payload::Bound(Box::new(payload));
        Ok(())
    }

    /// Rebinds the payload to a copy of the value under `cursor`.
    pub fn set_data_cursor(&mut self, cursor: &Cursor<'_>) -> Result<()> {
        let variable = self.variable_node_mut()?;
        if cursor.is_null() || is_void(cursor.schema()) {
            variable.data = Payload::Null;
            return Ok(());
        }
        ensure_registered(cursor.schema())?;
        variable.data = Payload::Serialized(cursor.isolate()?);
        Ok(())
    }

    /// Binds `payload` as the Variable's content.
    pub fn set_data(&mut self, mut payload: Editable) -> Result<()> {
        let variable = self.variable_node_mut()?;
        if payload.is_null() || is_void(&payload.schema) {
            variable.data = Payload::Null;
            return Ok(());
        }
        payload.thaw();
        payload.name = builtin::VARIABLE_DATA_FIELD.to_string();
        payload.nullable = true;
        variable.data = Payload::Bound(Box::new(payload));
        Ok(())
    }

    /// Leaves the Variable present with a null payload.
    pub fn clear_data(&mut self) -> Result<()> {
        self.variable_node_mut()?.data = Payload::Null;
        Ok(())
    }

    pub(super) fn set_variable_value(&mut self, value: Value<'_>) -> Result<()> {
        let current = match &self.variable_node()?.data {
            Payload::Bound(payload) => Some(payload.schema.clone()),
            Payload::Serialized(cursor) => Some(cursor.schema().clone()),
            Payload::Null => None,
        };
        if let Some(schema) = current {
            if accepts(&schema, &value) {
                return self.data_mut()?.set(value);
            }
        }

        let Some(id) = builtin_id_for(&value) else {
            return Err(self.conversion(&value));
        };
        let schema = self.provider.get_by_id(id)?;
        let mut payload =
            Editable::with_defaults(&self.provider, schema, false, builtin::VARIABLE_DATA_FIELD)?;
        payload.set(value)?;
        self.set_data(payload)
    }

    pub(super) fn variable_set_from(&mut self, other: &Editable) -> Result<()> {
        if other.kind() != EditableKind::Variable {
            return self.set_data(other.clone_as_editable());
        }
        if same_schema(&self.schema, &other.schema) {
            let copy = other.clone_as_editable();
            self.node = copy.node;
            return Ok(());
        }
        bail!(FormatError::TypeMismatch {
            schema: other.schema.name().to_string(),
            actual: other.schema.data_type(),
            expected: "Variable",
        })
    }
}
