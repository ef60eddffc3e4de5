//! # Editable - Mutable Record Trees
//!
//! An `Editable` is the write side of the record format: a tree of nodes that
//! mirrors a schema, is mutated freely, then frozen into an immutable snapshot
//! that knows its exact serialized size and can be written to bytes a
//! [`Cursor`](crate::cursor::Cursor) decodes back.
//!
//! ## Node Kinds
//!
//! | Kind | Schema | Content |
//! |------|--------|---------|
//! | Primitive | fixed and variable primitives, Choice | one owned [`Value`] |
//! | Object | Class | one child per field, absent when null |
//! | List | List, MultiChoice | item children, absent when null |
//! | Variable | built-in Variable class | bound payload or serialized payload |
//!
//! ## State Machine
//!
//! ```text
//!   unfrozen ──freeze()──> frozen
//!      │                     │
//!      │ set / push / ...    │ set / push / ... -> FormatError::Frozen
//!      │ serialized_size()   │ serialized_size() -> cached size
//!      │   -> NotFrozen      │ write_to() -> bytes
//!      │ write_to()          │
//!      │   -> clone, freeze, write
//! ```
//!
//! Freezing is transitive and idempotent: children freeze first, then the
//! node computes its size from theirs. A frozen tree is never mutated again;
//! [`Editable::clone_as_editable`] returns an unfrozen deep copy.
//!
//! ## Defaults
//!
//! Nodes created for a nullable slot start null. Nodes created for a
//! non-nullable slot start with the type's zero value: `0`, `false`, `""`,
//! the Unix epoch, the nil Guid, an object with defaulted children, an empty
//! list (a MultiChoice starts with its choice set's defaults) and a Variable
//! with a null payload.
//!
//! ## Module Structure
//!
//! - `primitive`: scalar get/set and defaults
//! - `object`: field access and schema-evolution copy
//! - `list`: item manipulation and MultiChoice values
//! - `variable`: tagged-union payload binding
//! - `writer`: size computation and wire encoding
//! - `coerce`: permissive value conversion
//! - `json`: JSON projection matching the cursor's

mod coerce;
mod json;
mod list;
mod object;
mod primitive;
mod variable;
mod writer;

use std::fmt;
use std::sync::Arc;

use eyre::{bail, Result};

use crate::cursor::is_variable;
use crate::error::FormatError;
use crate::registry::SchemaProvider;
use crate::schema::Schema;
use crate::types::{DataType, Value};

pub(crate) use coerce::coerce;
pub(crate) use variable::{Payload, VariableNode};

/// Which of the four node kinds an [`Editable`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableKind {
    Primitive,
    Object,
    List,
    Variable,
}

impl EditableKind {
    pub fn of(schema: &Schema) -> Self {
        match schema.data_type() {
            DataType::Class if is_variable(schema) => EditableKind::Variable,
            DataType::Class => EditableKind::Object,
            DataType::List | DataType::MultiChoice => EditableKind::List,
            _ => EditableKind::Primitive,
        }
    }
}

#[derive(Clone)]
pub(crate) enum Node {
    Primitive(Value<'static>),
    Object(Option<Vec<Editable>>),
    List(Option<Vec<Editable>>),
    Variable(VariableNode),
}

#[derive(Clone)]
pub struct Editable {
    schema: Arc<Schema>,
    provider: Arc<dyn SchemaProvider>,
    name: String,
    nullable: bool,
    frozen: bool,
    size: Option<usize>,
    node: Node,
}

impl Editable {
    /// A node for `schema`, null when `nullable`, defaulted otherwise.
    pub(crate) fn with_defaults(
        provider: &Arc<dyn SchemaProvider>,
        schema: Arc<Schema>,
        nullable: bool,
        name: impl Into<String>,
    ) -> Result<Self> {
        schema.ensure_layout()?;
        let node = if nullable {
            Node::null_for(&schema)
        } else {
            Node::default_for(provider, &schema)?
        };
        Ok(Self::from_node(provider, schema, nullable, name, node))
    }

    pub(crate) fn from_node(
        provider: &Arc<dyn SchemaProvider>,
        schema: Arc<Schema>,
        nullable: bool,
        name: impl Into<String>,
        node: Node,
    ) -> Self {
        Self {
            schema,
            provider: provider.clone(),
            name: name.into(),
            nullable,
            frozen: false,
            size: None,
            node,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn provider(&self) -> &Arc<dyn SchemaProvider> {
        &self.provider
    }

    /// Field name of this node, or the schema name for a root.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn kind(&self) -> EditableKind {
        match self.node {
            Node::Primitive(_) => EditableKind::Primitive,
            Node::Object(_) => EditableKind::Object,
            Node::List(_) => EditableKind::List,
            Node::Variable(_) => EditableKind::Variable,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn is_null(&self) -> bool {
        match &self.node {
            Node::Primitive(value) => value.is_null(),
            Node::Object(children) | Node::List(children) => children.is_none(),
            Node::Variable(variable) => !variable.present,
        }
    }

    /// Current value. Objects yield a value only for the built-in
    /// convenience classes; Variables yield their payload's value.
    pub fn get(&self) -> Result<Value<'_>> {
        match &self.node {
            Node::Primitive(value) => Ok(value.borrowed()),
            Node::Object(children) => self.object_value(children.as_deref()),
            Node::List(items) => self.list_value(items.as_deref()),
            Node::Variable(variable) => variable.get(),
        }
    }

    /// Assigns a value, coercing it to this node's type. `Value::Null`
    /// behaves like [`Editable::set_null`].
    pub fn set<'v>(&mut self, value: impl Into<Value<'v>>) -> Result<()> {
        let value = value.into();
        self.ensure_mutable()?;
        if value.is_null() {
            return self.set_null();
        }
        match self.kind() {
            EditableKind::Primitive => self.set_primitive(value),
            EditableKind::Object => self.set_object_value(value),
            EditableKind::List => self.set_list_value(value),
            EditableKind::Variable => self.set_variable_value(value),
        }
    }

    pub fn set_null(&mut self) -> Result<()> {
        self.ensure_mutable()?;
        if !self.nullable {
            bail!(FormatError::NotNullable(self.name.clone()));
        }
        self.node = Node::null_for(&self.schema);
        Ok(())
    }

    /// Replaces a null node with the type's default content. No-op on a
    /// node that is already present.
    pub fn init(&mut self) -> Result<()> {
        self.ensure_mutable()?;
        if self.is_null() {
            self.node = Node::default_for(&self.provider, &self.schema)?;
        }
        Ok(())
    }

    /// Copies `other` into this node. Same-schema sources are copied whole;
    /// objects of a different schema are copied field by field by name.
    pub fn set_from(&mut self, other: &Editable) -> Result<()> {
        self.ensure_mutable()?;
        if other.is_null() {
            return self.set_null();
        }
        match self.kind() {
            EditableKind::Primitive => {
                let value = other.get()?.into_owned();
                self.set(value)
            }
            EditableKind::Object => self.object_set_from(other),
            EditableKind::List => self.list_set_from(other),
            EditableKind::Variable => self.variable_set_from(other),
        }
    }

    /// Freezes this node and every descendant, caching serialized sizes.
    pub fn freeze(&mut self) -> Result<()> {
        if self.frozen {
            return Ok(());
        }
        self.schema.ensure_layout()?;
        let size = match &mut self.node {
            Node::Primitive(value) => writer::primitive_size(&self.schema, value)?,
            Node::Object(children) => {
                for child in children.iter_mut().flatten() {
                    child.freeze()?;
                }
                writer::object_size(&self.schema, children.as_deref())?
            }
            Node::List(items) => {
                for item in items.iter_mut().flatten() {
                    item.freeze()?;
                }
                writer::list_size(&self.schema, items.as_deref())?
            }
            Node::Variable(variable) => {
                variable.freeze_payload()?;
                writer::variable_size(&self.schema, variable)?
            }
        };
        self.size = Some(size);
        self.frozen = true;
        Ok(())
    }

    /// Cached size of a frozen node.
    pub fn serialized_size(&self) -> Result<usize> {
        match self.size {
            Some(size) if self.frozen => Ok(size),
            _ => bail!(FormatError::NotFrozen(self.name.clone())),
        }
    }

    /// Appends the serialized record to `out`. An unfrozen node is cloned
    /// and the frozen clone is written.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        if !self.frozen {
            let mut snapshot = self.clone_as_editable();
            snapshot.freeze()?;
            return snapshot.write_to(out);
        }

        let size = self.serialized_size()?;
        let start = out.len();
        out.reserve(size);
        if let Err(e) = writer::write_node(self, out) {
            out.truncate(start);
            return Err(e);
        }
        let written = out.len() - start;
        if written != size {
            out.truncate(start);
            bail!(FormatError::InvalidData(format!(
                "'{}' wrote {} bytes, expected {}",
                self.name, written, size
            )));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Unfrozen deep copy.
    pub fn clone_as_editable(&self) -> Editable {
        let mut copy = self.clone();
        copy.thaw();
        copy
    }

    fn thaw(&mut self) {
        self.frozen = false;
        self.size = None;
        match &mut self.node {
            Node::Primitive(_) => {}
            Node::Object(children) | Node::List(children) => {
                for child in children.iter_mut().flatten() {
                    child.thaw();
                }
            }
            Node::Variable(variable) => variable.thaw(),
        }
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.frozen {
            bail!(FormatError::Frozen(self.name.clone()));
        }
        Ok(())
    }

    fn mismatch(&self, expected: &'static str) -> eyre::Report {
        type_mismatch(&self.schema, expected)
    }

    fn conversion(&self, value: &Value<'_>) -> eyre::Report {
        eyre::Report::new(FormatError::Conversion {
            value: value.to_string(),
            target: self.schema.data_type(),
            field: self.name.clone(),
        })
    }
}

fn type_mismatch(schema: &Schema, expected: &'static str) -> eyre::Report {
    eyre::Report::new(FormatError::TypeMismatch {
        schema: schema.name().to_string(),
        actual: schema.data_type(),
        expected,
    })
}

impl Node {
    pub(crate) fn null_for(schema: &Schema) -> Node {
        match EditableKind::of(schema) {
            EditableKind::Primitive => Node::Primitive(Value::Null),
            EditableKind::Object => Node::Object(None),
            EditableKind::List => Node::List(None),
            EditableKind::Variable => Node::Variable(VariableNode::absent()),
        }
    }

    fn default_for(provider: &Arc<dyn SchemaProvider>, schema: &Schema) -> Result<Node> {
        let node = match EditableKind::of(schema) {
            EditableKind::Primitive => Node::Primitive(primitive::default_value(schema)),
            EditableKind::Object => {
                let mut children = Vec::with_capacity(schema.field_count());
                for field in schema.fields() {
                    children.push(Editable::with_defaults(
                        provider,
                        field.schema().clone(),
                        field.is_nullable(),
                        field.name(),
                    )?);
                }
                Node::Object(Some(children))
            }
            EditableKind::List => Node::List(Some(list::default_items(provider, schema)?)),
            EditableKind::Variable => Node::Variable(VariableNode::empty()),
        };
        Ok(node)
    }
}

impl fmt::Debug for Editable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editable")
            .field("name", &self.name)
            .field("schema", &self.schema.name())
            .field("kind", &self.kind())
            .field("null", &self.is_null())
            .field("frozen", &self.frozen)
            .finish()
    }
}
