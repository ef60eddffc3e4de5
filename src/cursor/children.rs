//! Sequential child iteration.
//!
//! `Children` walks the fields of a Class or the items of a List without
//! re-scanning: each list step starts from where the previous item ended, so
//! a full pass over a list of variable-size items is O(n) rather than the
//! O(n^2) of repeated `goto(i)`. The iterator is `Clone`; calling
//! [`Cursor::children`] again restarts from the first child.

use std::sync::Arc;

use eyre::Result;

use super::navigation::ListHeader;
use super::{value_size, Cursor};
use crate::schema::Schema;
use crate::types::DataType;

#[derive(Clone)]
struct ListWalk {
    header: ListHeader,
    next_offset: usize,
    item_schema: Arc<Schema>,
}

#[derive(Clone)]
pub struct Children<'c, 'a> {
    cursor: &'c Cursor<'a>,
    unwrap_variable: bool,
    index: usize,
    walk: Option<ListWalk>,
    done: bool,
}

impl<'a> Cursor<'a> {
    /// Lazily yields every child, unwrapping Variable values.
    pub fn children(&self) -> Children<'_, 'a> {
        self.children_with(true)
    }

    pub fn children_with(&self, unwrap_variable: bool) -> Children<'_, 'a> {
        Children {
            cursor: self,
            unwrap_variable,
            index: 0,
            walk: None,
            done: false,
        }
    }
}

impl<'a> Children<'_, 'a> {
    fn advance(&mut self) -> Result<Option<Cursor<'a>>> {
        let cursor = self.cursor;
        let child = match cursor.schema.data_type() {
            DataType::Class => {
                if self.index >= cursor.schema.field_count() {
                    return Ok(None);
                }
                cursor.goto_with(self.index, false)?
            }
            DataType::List | DataType::MultiChoice if !cursor.is_null() => {
                if self.walk.is_none() {
                    let header = cursor.list_header()?;
                    self.walk = Some(ListWalk {
                        header,
                        next_offset: header.items_at,
                        item_schema: cursor.schema.item_field()?.schema().clone(),
                    });
                }
                let Some(walk) = self.walk.as_mut() else {
                    return Ok(None);
                };
                if self.index >= walk.header.count {
                    return Ok(None);
                }

                let fixed = !walk.item_schema.is_variable_size();
                if cursor.item_present(&walk.header, self.index)? {
                    let child = cursor.child(walk.next_offset, walk.item_schema.clone());
                    walk.next_offset += if fixed {
                        walk.item_schema.fixed_size()
                    } else {
                        value_size(cursor.buffer(), walk.next_offset, &walk.item_schema)?
                    };
                    child
                } else {
                    if fixed {
                        walk.next_offset += walk.item_schema.fixed_size();
                    }
                    cursor.null_child(walk.item_schema.clone())
                }
            }
            _ => return Ok(None),
        };

        self.index += 1;
        if self.unwrap_variable {
            child.unwrap_variable().map(Some)
        } else {
            Ok(Some(child))
        }
    }
}

impl<'a> Iterator for Children<'_, 'a> {
    type Item = Result<Cursor<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.advance() {
            Ok(Some(child)) => Some(Ok(child)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
