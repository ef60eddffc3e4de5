//! # Field Definition
//!
//! A `Field` is one named slot of a Class (or the single `Item` slot of a
//! List). `index` and `offset` are assigned by the layout pass:
//!
//! | offset | meaning |
//! |--------|---------|
//! | `>= 0` | byte offset of a fixed-size field from the record start |
//! | `< 0`  | variable slot `-offset - 1` in the record's offset table |
//!
//! `max_length` is advisory metadata and is never enforced.

use std::sync::Arc;

use super::Schema;

/// Name of the single field of List and MultiChoice schemas.
pub const LIST_ITEM_FIELD: &str = "Item";

#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) schema: Arc<Schema>,
    pub(crate) nullable: bool,
    pub(crate) offset: i32,
    pub(crate) max_length: Option<u32>,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Arc<Schema>, nullable: bool) -> Self {
        Self {
            index: 0,
            name: name.into(),
            schema,
            nullable,
            offset: 0,
            max_length: None,
        }
    }

    pub fn item(schema: Arc<Schema>, nullable: bool) -> Self {
        Self::new(LIST_ITEM_FIELD, schema, nullable)
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn max_length(&self) -> Option<u32> {
        self.max_length
    }

    pub fn is_variable(&self) -> bool {
        self.offset < 0
    }

    /// Position in the offset table for variable-size fields.
    pub fn variable_slot(&self) -> Option<usize> {
        if self.offset < 0 {
            Some((-self.offset - 1) as usize)
        } else {
            None
        }
    }
}
