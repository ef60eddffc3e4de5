//! # Layout Pass
//!
//! `update_layout` derives every physical property of a schema from its data
//! type and field list. It is deterministic and idempotent: running it twice
//! on an unchanged field list produces identical results.
//!
//! ## Rules
//!
//! | Data type | Fields | fixed_size | null bitmap | variable region |
//! |-----------|--------|------------|-------------|-----------------|
//! | fixed primitive, Choice | none | intrinsic size | -1 | -1 |
//! | String, Binary, ItemPath | none | 0 | -1 | -1 |
//! | List, MultiChoice | exactly one `Item` | 0 | -1 (per record) | 0 |
//! | Class | any | fixed fields + bitmap | after fixed fields | after bitmap |

use eyre::Result;
use hashbrown::HashSet;

use super::Schema;
use crate::encoding::bitmap_len;
use crate::error::FormatError;
use crate::types::DataType;

impl Schema {
    /// Recomputes all derived layout fields.
    pub fn update_layout(&mut self) -> Result<()> {
        match self.data_type {
            DataType::Class => self.layout_class()?,
            DataType::List | DataType::MultiChoice => self.layout_list()?,
            primitive => self.layout_primitive(primitive)?,
        }
        self.layout_stale = false;
        Ok(())
    }

    fn structural(&self, reason: impl Into<String>) -> eyre::Report {
        eyre::Report::new(FormatError::Structural {
            schema: self.name.clone(),
            reason: reason.into(),
        })
    }

    fn layout_primitive(&mut self, data_type: DataType) -> Result<()> {
        if !self.fields.is_empty() {
            return Err(self.structural(format!(
                "primitive type {:?} cannot have fields",
                data_type
            )));
        }
        self.fixed_size = data_type.intrinsic_size().unwrap_or(0);
        self.null_bitmap_offset = -1;
        self.variable_size_offset = -1;
        self.variable_field_count = 0;
        Ok(())
    }

    fn layout_list(&mut self) -> Result<()> {
        if self.fields.len() != 1 {
            return Err(self.structural(format!(
                "{:?} must have exactly one item field, found {}",
                self.data_type,
                self.fields.len()
            )));
        }
        self.fields[0].schema.ensure_layout()?;
        if self.data_type == DataType::MultiChoice
            && self.fields[0].schema.data_type != DataType::Int32
        {
            return Err(self.structural("MultiChoice items must be Int32"));
        }

        let item = &mut self.fields[0];
        item.index = 0;
        item.offset = -1;

        self.fixed_size = 0;
        self.null_bitmap_offset = -1;
        self.variable_size_offset = 0;
        self.variable_field_count = 1;
        Ok(())
    }

    fn layout_class(&mut self) -> Result<()> {
        {
            let mut seen = HashSet::with_capacity(self.fields.len());
            for field in &self.fields {
                field.schema.ensure_layout()?;
                if !seen.insert(field.name.as_str()) {
                    return Err(self.structural(format!("duplicate field '{}'", field.name)));
                }
            }
        }

        let (mut fixed, mut variable): (Vec<_>, Vec<_>) = std::mem::take(&mut self.fields)
            .into_iter()
            .partition(|f| !f.schema.is_variable_size());

        let mut offset = 0usize;
        for field in fixed.iter_mut() {
            field.offset = offset as i32;
            offset += field.schema.fixed_size;
        }
        for (slot, field) in variable.iter_mut().enumerate() {
            field.offset = -(slot as i32) - 1;
        }

        let variable_field_count = variable.len();
        let mut fields = fixed;
        fields.append(&mut variable);
        for (index, field) in fields.iter_mut().enumerate() {
            field.index = index;
        }

        let any_nullable = fields.iter().any(|f| f.nullable);
        self.null_bitmap_offset = if any_nullable { offset as i32 } else { -1 };
        if any_nullable {
            offset += bitmap_len(fields.len());
        }

        self.variable_size_offset = if variable_field_count > 0 {
            offset as i32
        } else {
            -1
        };
        self.fixed_size = offset;
        self.variable_field_count = variable_field_count;
        self.fields = fields;
        Ok(())
    }
}
