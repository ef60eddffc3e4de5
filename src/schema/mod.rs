//! # Schema Definition and Layout
//!
//! A `Schema` describes the shape of one kind of value and the physical layout
//! of its serialized form. Layout fields (`fixed_size`, offsets, field
//! `index`/`offset`) are derived by [`Schema::update_layout`] from the data type
//! and the field list and are never edited independently.
//!
//! ## Class Record Layout
//!
//! ```text
//! +-------------------+-------------+---------------------------------+------------------+
//! | Fixed Fields      | Null Bitmap | Variable Header                 | Variable Payload |
//! | (layout order)    | [u8; (N+7)/8] | total-size | offset x M       | (non-null only)  |
//! +-------------------+-------------+---------------------------------+------------------+
//! ^                   ^             ^
//! 0                   null_bitmap_offset
//!                                   variable_size_offset
//! ```
//!
//! Fixed-size fields come first, then variable-size fields; both groups keep
//! their declaration order. A field's `index` is its position in that order.
//! Fixed fields carry a byte offset, variable fields a slot number stored as
//! -1, -2, ... . Every varint of the variable header shares one width.
//!
//! `fixed_size` covers the fixed fields plus the null bitmap: it is the size of
//! the part of a record that the schema alone determines.
//!
//! ## List Layout
//!
//! ```text
//! +------------+------------+----------------------+---------------+
//! | Total Size | Item Count | Null Bitmap          | Items         |
//! | varint     | same width | if items nullable    | in order      |
//! +------------+------------+----------------------+---------------+
//! ```
//!
//! ## Identity
//!
//! Registered schemas (id >= 0) are equal iff their ids are equal. Schemas
//! that are not both registered are equal iff their names are equal and they
//! are structurally equal.
//!
//! ## Module Structure
//!
//! - `field`: `Field`, one named slot of a Class
//! - `layout`: the layout pass
//! - `choice`: `ChoiceSet` / `ChoiceOption` declarations
//! - `builder`: fluent `SchemaBuilder`

pub mod builder;
pub mod choice;
pub mod field;
pub mod layout;

use std::sync::Arc;

use eyre::Result;

use crate::config::{MAX_BUILTIN_SCHEMA_ID, UNREGISTERED_SCHEMA_ID};
use crate::error::FormatError;
use crate::types::DataType;

pub use builder::SchemaBuilder;
pub use choice::{ChoiceOption, ChoiceSet};
pub use field::Field;

pub type SchemaId = i32;

/// Metadata attached to a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    /// Named options of a Choice or MultiChoice.
    Choices(Arc<ChoiceSet>),
    /// Opaque reference into an external item hierarchy.
    Item(String),
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub(crate) id: SchemaId,
    pub(crate) name: String,
    pub(crate) data_type: DataType,
    pub(crate) fields: Vec<Field>,
    pub(crate) fixed_size: usize,
    pub(crate) null_bitmap_offset: i32,
    pub(crate) variable_size_offset: i32,
    pub(crate) variable_field_count: usize,
    pub(crate) declaration: Option<Declaration>,
    pub(crate) layout_stale: bool,
}

impl Schema {
    /// Creates an unregistered schema and runs the layout pass.
    pub fn new(name: impl Into<String>, data_type: DataType, fields: Vec<Field>) -> Result<Self> {
        let mut schema = Self {
            id: UNREGISTERED_SCHEMA_ID,
            name: name.into(),
            data_type,
            fields,
            fixed_size: 0,
            null_bitmap_offset: -1,
            variable_size_offset: -1,
            variable_field_count: 0,
            declaration: None,
            layout_stale: true,
        };
        schema.update_layout()?;
        Ok(schema)
    }

    pub fn primitive(name: impl Into<String>, data_type: DataType) -> Result<Self> {
        Self::new(name, data_type, Vec::new())
    }

    pub fn with_id(mut self, id: SchemaId) -> Self {
        self.id = id;
        self
    }

    pub fn with_declaration(mut self, declaration: Declaration) -> Self {
        self.declaration = Some(declaration);
        self
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: SchemaId) {
        self.id = id;
    }

    pub fn is_registered(&self) -> bool {
        self.id != UNREGISTERED_SCHEMA_ID
    }

    pub fn is_builtin(&self) -> bool {
        (0..=MAX_BUILTIN_SCHEMA_ID).contains(&self.id)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Field at layout position `index`.
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    pub fn fixed_size(&self) -> usize {
        self.fixed_size
    }

    /// Byte offset of the null bitmap, or -1 when no field is nullable.
    pub fn null_bitmap_offset(&self) -> i32 {
        self.null_bitmap_offset
    }

    /// Byte offset of the variable region, or -1 when every field is fixed-size.
    pub fn variable_size_offset(&self) -> i32 {
        self.variable_size_offset
    }

    pub fn variable_field_count(&self) -> usize {
        self.variable_field_count
    }

    pub fn declaration(&self) -> Option<&Declaration> {
        self.declaration.as_ref()
    }

    pub fn choice_set(&self) -> Option<&Arc<ChoiceSet>> {
        match &self.declaration {
            Some(Declaration::Choices(set)) => Some(set),
            _ => None,
        }
    }

    /// True if the serialized size of a value cannot be known from the schema alone.
    pub fn is_variable_size(&self) -> bool {
        match self.data_type {
            DataType::Class => self.variable_size_offset >= 0,
            DataType::String
            | DataType::Binary
            | DataType::ItemPath
            | DataType::List
            | DataType::MultiChoice => true,
            _ => false,
        }
    }

    /// The single item field of a List or MultiChoice.
    pub fn item_field(&self) -> Result<&Field> {
        if !self.data_type.is_list_like() {
            eyre::bail!(FormatError::TypeMismatch {
                schema: self.name.clone(),
                actual: self.data_type,
                expected: "List or MultiChoice",
            });
        }
        self.fields.first().ok_or_else(|| {
            eyre::Report::new(FormatError::Structural {
                schema: self.name.clone(),
                reason: "list has no item field".to_string(),
            })
        })
    }

    /// Adds a field and marks the layout stale.
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
        self.layout_stale = true;
    }

    /// Removes a field by name and marks the layout stale.
    pub fn remove_field(&mut self, name: &str) -> Option<Field> {
        let idx = self.field_index(name)?;
        self.layout_stale = true;
        Some(self.fields.remove(idx))
    }

    pub fn is_layout_current(&self) -> bool {
        !self.layout_stale
    }

    /// Fails if the fields changed since the last layout pass.
    pub fn ensure_layout(&self) -> Result<()> {
        if self.layout_stale {
            eyre::bail!(FormatError::StaleLayout(self.name.clone()));
        }
        Ok(())
    }

    fn structurally_equal(&self, other: &Schema) -> bool {
        self.data_type == other.data_type
            && self.fields.len() == other.fields.len()
            && self.fields.iter().zip(other.fields.iter()).all(|(a, b)| {
                a.name() == b.name() && a.is_nullable() == b.is_nullable() && a.schema() == b.schema()
            })
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.is_registered() && other.is_registered() {
            return self.id == other.id;
        }
        self.name == other.name && self.structurally_equal(other)
    }
}

/// True if both handles denote the same schema.
pub fn same_schema(a: &Arc<Schema>, b: &Arc<Schema>) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
}

#[cfg(test)]
mod tests;
