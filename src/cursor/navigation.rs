//! Field and item navigation.
//!
//! Class fields resolve in O(1): fixed fields sit at their schema offset,
//! variable fields are found through the offset table that follows the
//! total-size varint. List items are O(1) for fixed-size item types (null
//! items keep a zeroed slot) and O(index) for variable-size item types, where
//! the sizes of the preceding present items are summed.

use std::sync::Arc;

use eyre::{bail, Result};

use super::{is_variable, read_bytes, read_i32, value_size, Cursor};
use crate::config::PATH_SEPARATOR;
use crate::encoding::varint::varint_width_from_tag;
use crate::encoding::{bit_is_set, bitmap_len, decode_varint_at};
use crate::error::FormatError;
use crate::registry::builtin;
use crate::schema::Schema;
use crate::types::DataType;

/// Decoded prefix of a list record.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ListHeader {
    pub count: usize,
    pub bitmap_at: Option<usize>,
    pub items_at: usize,
}

impl<'a> Cursor<'a> {
    /// Field count for a Class, item count for a List or MultiChoice.
    pub fn count(&self) -> Result<usize> {
        match self.schema.data_type() {
            DataType::Class => Ok(self.schema.field_count()),
            DataType::List | DataType::MultiChoice if !self.is_null() => {
                Ok(self.list_header()?.count)
            }
            _ => Ok(0),
        }
    }

    /// Child at `index`, unwrapping Variable values into their payload.
    pub fn goto(&self, index: usize) -> Result<Cursor<'a>> {
        self.goto_with(index, true)
    }

    pub fn goto_with(&self, index: usize, unwrap_variable: bool) -> Result<Cursor<'a>> {
        let child = match self.schema.data_type() {
            DataType::Class => self.class_field(index)?,
            DataType::List | DataType::MultiChoice => self.list_item(index)?,
            actual => bail!(FormatError::TypeMismatch {
                schema: self.schema.name().to_string(),
                actual,
                expected: "Class, List or MultiChoice",
            }),
        };
        if unwrap_variable {
            child.unwrap_variable()
        } else {
            Ok(child)
        }
    }

    /// Field of a Class by name.
    pub fn goto_name(&self, name: &str) -> Result<Cursor<'a>> {
        match self.schema.field_index(name) {
            Some(index) if self.schema.data_type() == DataType::Class => self.goto(index),
            _ => bail!(FormatError::UnknownField {
                schema: self.schema.name().to_string(),
                field: name.to_string(),
            }),
        }
    }

    /// Follows a `/`-separated path; numeric segments index lists.
    pub fn navigate_to(&self, path: &str) -> Result<Cursor<'a>> {
        let mut current = self.clone();
        for segment in path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()) {
            current = if current.schema.data_type().is_list_like() {
                let index = segment.parse::<usize>().map_err(|_| {
                    eyre::Report::new(FormatError::UnknownField {
                        schema: current.schema.name().to_string(),
                        field: segment.to_string(),
                    })
                })?;
                current.goto(index)?
            } else {
                current.goto_name(segment)?
            };
        }
        Ok(current)
    }

    pub fn try_navigate_to(&self, path: &str) -> Option<Cursor<'a>> {
        self.navigate_to(path).ok()
    }

    /// Replaces a non-null Variable with its payload, repeatedly.
    pub fn unwrap_variable(self) -> Result<Cursor<'a>> {
        let mut current = self;
        while is_variable(&current.schema) && !current.is_null() {
            current = current.variable_data()?;
        }
        Ok(current)
    }

    /// Payload schema of a non-null Variable record.
    pub fn data_schema(&self) -> Result<Arc<Schema>> {
        if !is_variable(&self.schema) {
            bail!(FormatError::TypeMismatch {
                schema: self.schema.name().to_string(),
                actual: self.schema.data_type(),
                expected: "Variable",
            });
        }
        let id_field = self.schema.field_by_name(builtin::VARIABLE_DATA_SCHEMA_ID_FIELD);
        let id = match id_field {
            Some(field) if !self.is_null() => {
                read_i32(self.buffer(), self.offset + field.offset() as usize)?
            }
            _ => builtin::VOID,
        };
        self.provider.get_by_id(id)
    }

    /// Payload cursor of a Variable record, not unwrapped further.
    pub(crate) fn variable_data(&self) -> Result<Cursor<'a>> {
        let index = self
            .schema
            .field_index(builtin::VARIABLE_DATA_FIELD)
            .ok_or_else(|| {
                eyre::Report::new(FormatError::UnknownField {
                    schema: self.schema.name().to_string(),
                    field: builtin::VARIABLE_DATA_FIELD.to_string(),
                })
            })?;
        self.class_field(index)
    }

    fn class_field(&self, index: usize) -> Result<Cursor<'a>> {
        let schema = &self.schema;
        let Some(field) = schema.field(index) else {
            bail!(FormatError::IndexOutOfRange {
                schema: schema.name().to_string(),
                index,
                count: schema.field_count(),
            });
        };

        let child_schema = if is_variable(schema) && field.name() == builtin::VARIABLE_DATA_FIELD {
            self.data_schema()?
        } else {
            field.schema().clone()
        };
        if self.is_null() {
            return Ok(self.null_child(child_schema));
        }

        let buf = self.buffer();
        if field.is_nullable() && schema.null_bitmap_offset() >= 0 {
            let at = self.offset + schema.null_bitmap_offset() as usize;
            let bitmap = read_bytes(buf, at, bitmap_len(schema.field_count()))?;
            if !bit_is_set(bitmap, index) {
                return Ok(self.null_child(child_schema));
            }
        }

        let offset = match field.variable_slot() {
            None => self.offset + field.offset() as usize,
            Some(slot) => {
                let header = self.offset + schema.variable_size_offset() as usize;
                let width = varint_width_from_tag(read_bytes(buf, header, 1)?[0]);
                let (relative, _) = decode_varint_at(buf, header + width * (1 + slot))?;
                self.offset + relative
            }
        };
        Ok(self.child(offset, child_schema))
    }

    pub(crate) fn list_header(&self) -> Result<ListHeader> {
        let buf = self.buffer();
        let (_, width) = decode_varint_at(buf, self.offset)?;
        let (count, count_width) = decode_varint_at(buf, self.offset + width)?;
        let mut items_at = self.offset + width + count_width;
        let bitmap_at = if self.schema.item_field()?.is_nullable() {
            let at = items_at;
            items_at += bitmap_len(count);
            Some(at)
        } else {
            None
        };
        Ok(ListHeader {
            count,
            bitmap_at,
            items_at,
        })
    }

    pub(crate) fn item_present(&self, header: &ListHeader, index: usize) -> Result<bool> {
        match header.bitmap_at {
            Some(at) => {
                let bitmap = read_bytes(self.buffer(), at, bitmap_len(header.count))?;
                Ok(bit_is_set(bitmap, index))
            }
            None => Ok(true),
        }
    }

    fn list_item(&self, index: usize) -> Result<Cursor<'a>> {
        let header = if self.is_null() {
            None
        } else {
            Some(self.list_header()?)
        };
        let header = match header {
            Some(header) if index < header.count => header,
            _ => bail!(FormatError::IndexOutOfRange {
                schema: self.schema.name().to_string(),
                index,
                count: header.map_or(0, |h| h.count),
            }),
        };
        let item_schema = self.schema.item_field()?.schema().clone();
        if !self.item_present(&header, index)? {
            return Ok(self.null_child(item_schema));
        }

        if !item_schema.is_variable_size() {
            let offset = header.items_at + index * item_schema.fixed_size();
            return Ok(self.child(offset, item_schema));
        }

        let mut offset = header.items_at;
        for preceding in 0..index {
            if self.item_present(&header, preceding)? {
                offset += value_size(self.buffer(), offset, &item_schema)?;
            }
        }
        Ok(self.child(offset, item_schema))
    }
}
