//! Deep structural equality of cursors.
//!
//! Cursors over the same schema compare child by child. Cursors over
//! different Class schemas compare by field name: every field of the left
//! schema must resolve in the right one and hold an equal value. Fields only
//! present on the right are ignored, so `a == b` does not imply `b == a` when
//! the schemas differ. Variable values compare by payload.

use eyre::Result;

use super::Cursor;
use crate::schema::same_schema;
use crate::types::DataType;

impl Cursor<'_> {
    /// Structural comparison; decode failures surface as errors.
    pub fn deep_equals(&self, other: &Cursor<'_>) -> Result<bool> {
        let left = self.clone().unwrap_variable()?;
        let right = other.clone().unwrap_variable()?;

        match (left.is_null(), right.is_null()) {
            (true, true) => return Ok(true),
            (true, false) | (false, true) => return Ok(false),
            _ => {}
        }

        let left_type = left.schema.data_type();
        let right_type = right.schema.data_type();
        match (left_type, right_type) {
            (DataType::Class, DataType::Class) => {
                if same_schema(&left.schema, &right.schema) {
                    for index in 0..left.schema.field_count() {
                        if !left.goto(index)?.deep_equals(&right.goto(index)?)? {
                            return Ok(false);
                        }
                    }
                    return Ok(true);
                }
                for field in left.schema.fields() {
                    let Ok(theirs) = right.goto_name(field.name()) else {
                        return Ok(false);
                    };
                    if !left.goto(field.index())?.deep_equals(&theirs)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (DataType::List, DataType::List) => {
                if left.count()? != right.count()? {
                    return Ok(false);
                }
                for (mine, theirs) in left.children().zip(right.children()) {
                    if !mine?.deep_equals(&theirs?)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (DataType::Class | DataType::List, _) | (_, DataType::Class | DataType::List) => {
                Ok(false)
            }
            _ => Ok(left.get()? == right.get()?),
        }
    }
}

impl<'b> PartialEq<Cursor<'b>> for Cursor<'_> {
    fn eq(&self, other: &Cursor<'b>) -> bool {
        self.deep_equals(other).unwrap_or(false)
    }
}
