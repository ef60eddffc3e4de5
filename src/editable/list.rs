//! List and MultiChoice nodes.
//!
//! Items are full editables of the list's item schema. A MultiChoice is a
//! list of Int32 items whose `get`/`set` speak `Value::MultiChoice`; `set`
//! also takes a comma-separated string of option names or values.

use std::sync::Arc;

use eyre::{bail, Result};

use super::{type_mismatch, Editable, EditableKind, Node};
use crate::error::FormatError;
use crate::registry::SchemaProvider;
use crate::schema::field::LIST_ITEM_FIELD;
use crate::schema::{same_schema, Schema};
use crate::types::{DataType, Value};

/// Initial items of a non-null list: the choice set defaults for a
/// MultiChoice, nothing otherwise.
pub(super) fn default_items(
    provider: &Arc<dyn SchemaProvider>,
    schema: &Schema,
) -> Result<Vec<Editable>> {
    if schema.data_type() != DataType::MultiChoice {
        return Ok(Vec::new());
    }
    let defaults = schema
        .choice_set()
        .map(|set| set.default_values().to_vec())
        .unwrap_or_default();
    multi_choice_items(provider, schema, &defaults)
}

fn multi_choice_items(
    provider: &Arc<dyn SchemaProvider>,
    schema: &Schema,
    values: &[i32],
) -> Result<Vec<Editable>> {
    let field = schema.item_field()?;
    values
        .iter()
        .map(|value| {
            Ok(Editable::from_node(
                provider,
                field.schema().clone(),
                field.is_nullable(),
                LIST_ITEM_FIELD,
                Node::Primitive(Value::Int32(*value)),
            ))
        })
        .collect()
}

impl Editable {
    fn items(&self) -> Option<&[Editable]> {
        match &self.node {
            Node::List(items) => items.as_deref(),
            _ => None,
        }
    }

    /// Present items, materializing a null list as empty.
    fn items_mut(&mut self) -> Result<&mut Vec<Editable>> {
        self.ensure_mutable()?;
        match &mut self.node {
            Node::List(items) => Ok(items.get_or_insert_with(Vec::new)),
            _ => Err(type_mismatch(&self.schema, "List or MultiChoice")),
        }
    }

    fn out_of_range(&self, index: usize) -> eyre::Report {
        eyre::Report::new(FormatError::IndexOutOfRange {
            schema: self.schema.name().to_string(),
            index,
            count: self.len(),
        })
    }

    /// A detached, default-valued item for this list.
    fn new_item(&self) -> Result<Editable> {
        let field = self.schema.item_field()?;
        let mut item =
            Editable::with_defaults(&self.provider, field.schema().clone(), false, LIST_ITEM_FIELD)?;
        item.nullable = field.is_nullable();
        Ok(item)
    }

    /// Item count; 0 for a null list and for other kinds.
    pub fn len(&self) -> usize {
        self.items().map_or(0, <[Editable]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Present items; empty for a null list.
    pub fn item_slice(&self) -> &[Editable] {
        self.items().unwrap_or(&[])
    }

    pub fn item(&self, index: usize) -> Result<&Editable> {
        if self.kind() != EditableKind::List {
            return Err(self.mismatch("List or MultiChoice"));
        }
        self.items()
            .and_then(|items| items.get(index))
            .ok_or_else(|| self.out_of_range(index))
    }

    pub fn item_mut(&mut self, index: usize) -> Result<&mut Editable> {
        if index >= self.len() {
            return Err(self.out_of_range(index));
        }
        let items = self.items_mut()?;
        Ok(&mut items[index])
    }

    /// Appends a default-valued item and returns it for filling in.
    pub fn push(&mut self) -> Result<&mut Editable> {
        let item = self.new_item()?;
        let items = self.items_mut()?;
        items.push(item);
        let last = items.len() - 1;
        Ok(&mut items[last])
    }

    /// Appends an item holding `value`. The list is unchanged on failure.
    pub fn push_value<'v>(&mut self, value: impl Into<Value<'v>>) -> Result<()> {
        let mut item = self.new_item()?;
        item.set(value)?;
        self.items_mut()?.push(item);
        Ok(())
    }

    /// Appends an existing tree. Items of a list of Variables are wrapped
    /// when they are not Variables themselves.
    pub fn push_editable(&mut self, item: Editable) -> Result<()> {
        let item = self.adopt(item)?;
        self.items_mut()?.push(item);
        Ok(())
    }

    fn adopt(&self, mut item: Editable) -> Result<Editable> {
        let field = self.schema.item_field()?;
        let item_schema = field.schema();
        if !same_schema(item_schema, &item.schema) {
            if EditableKind::of(item_schema) == EditableKind::Variable {
                return Editable::variable_wrapping(
                    &self.provider,
                    item,
                    field.is_nullable(),
                    LIST_ITEM_FIELD,
                );
            }
            bail!(FormatError::TypeMismatch {
                schema: item.schema.name().to_string(),
                actual: item.schema.data_type(),
                expected: "the list's item schema",
            });
        }
        if item.is_null() && !field.is_nullable() {
            bail!(FormatError::NotNullable(LIST_ITEM_FIELD.to_string()));
        }
        item.thaw();
        item.name = LIST_ITEM_FIELD.to_string();
        item.nullable = field.is_nullable();
        Ok(item)
    }

    /// Inserts a default-valued item at `index` and returns it.
    pub fn insert(&mut self, index: usize) -> Result<&mut Editable> {
        if index > self.len() {
            return Err(self.out_of_range(index));
        }
        let item = self.new_item()?;
        let items = self.items_mut()?;
        items.insert(index, item);
        Ok(&mut items[index])
    }

    pub fn insert_value<'v>(&mut self, index: usize, value: impl Into<Value<'v>>) -> Result<()> {
        if index > self.len() {
            return Err(self.out_of_range(index));
        }
        let mut item = self.new_item()?;
        item.set(value)?;
        self.items_mut()?.insert(index, item);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Editable> {
        if index >= self.len() {
            return Err(self.out_of_range(index));
        }
        Ok(self.items_mut()?.remove(index))
    }

    /// Removes every item; a null list becomes an empty one.
    pub fn clear(&mut self) -> Result<()> {
        self.items_mut()?.clear();
        Ok(())
    }

    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        self.items_mut()?.reserve(additional);
        Ok(())
    }

    pub(super) fn list_value(&self, items: Option<&[Editable]>) -> Result<Value<'_>> {
        let Some(items) = items else {
            return Ok(Value::Null);
        };
        if self.schema.data_type() != DataType::MultiChoice {
            bail!(FormatError::NotPrimitive {
                schema: self.schema.name().to_string(),
                data_type: self.schema.data_type(),
            });
        }
        let mut selected = Vec::with_capacity(items.len());
        for item in items {
            if let Value::Int32(value) = item.get()? {
                selected.push(value);
            }
        }
        Ok(Value::MultiChoice(selected))
    }

    pub(super) fn set_list_value(&mut self, value: Value<'_>) -> Result<()> {
        if self.schema.data_type() != DataType::MultiChoice {
            return Err(self.conversion(&value));
        }
        let selected = match &value {
            Value::MultiChoice(values) => values.clone(),
            Value::Int32(single) => vec![*single],
            Value::String(text) => self.parse_selection(text, &value)?,
            _ => return Err(self.conversion(&value)),
        };
        let items = multi_choice_items(&self.provider, &self.schema, &selected)?;
        *self.items_mut()? = items;
        Ok(())
    }

    fn parse_selection(&self, text: &str, value: &Value<'_>) -> Result<Vec<i32>> {
        let set = self.schema.choice_set();
        text.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                set.and_then(|set| set.option_by_name(part).map(|option| option.value))
                    .or_else(|| part.parse::<i32>().ok())
                    .ok_or_else(|| self.conversion(value))
            })
            .collect()
    }

    pub(super) fn list_set_from(&mut self, other: &Editable) -> Result<()> {
        if other.kind() != EditableKind::List {
            let value = other.get()?.into_owned();
            return self.set(value);
        }
        if same_schema(&self.schema, &other.schema) {
            self.node = other.clone_as_editable().node;
            return Ok(());
        }
        let mut copied = Vec::with_capacity(other.len());
        for source in other.item_slice() {
            let mut item = self.new_item()?;
            item.set_from(source)?;
            copied.push(item);
        }
        *self.items_mut()? = copied;
        Ok(())
    }
}
