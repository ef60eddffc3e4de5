use eyre::{bail, Result};

use crate::config::MAX_NESTING_DEPTH;
use crate::cursor::Cursor;
use crate::editable::{Editable, EditableKind, Node, VariableNode};
use crate::error::FormatError;
use crate::registry::builtin;
use crate::schema::field::LIST_ITEM_FIELD;

/// Deep copy of the value under `cursor` into an unfrozen tree. Variable
/// payloads are copied into bound trees of their resolved schema.
pub(crate) fn copy_cursor(cursor: &Cursor<'_>, name: &str, nullable: bool) -> Result<Editable> {
    copy_at_depth(cursor, name, nullable, 0)
}

fn copy_at_depth(cursor: &Cursor<'_>, name: &str, nullable: bool, depth: usize) -> Result<Editable> {
    if depth > MAX_NESTING_DEPTH {
        bail!(FormatError::NestingTooDeep(MAX_NESTING_DEPTH));
    }
    let provider = cursor.provider();
    let schema = cursor.schema().clone();
    if cursor.is_null() {
        let node = Node::null_for(&schema);
        return Ok(Editable::from_node(provider, schema, nullable, name, node));
    }

    let node = match EditableKind::of(&schema) {
        EditableKind::Primitive => Node::Primitive(cursor.get()?.into_owned()),
        EditableKind::Object => {
            let mut children = Vec::with_capacity(schema.field_count());
            for field in schema.fields() {
                let child = cursor.goto_with(field.index(), false)?;
                children.push(copy_at_depth(
                    &child,
                    field.name(),
                    field.is_nullable(),
                    depth + 1,
                )?);
            }
            Node::Object(Some(children))
        }
        EditableKind::List => {
            let item_nullable = schema.item_field()?.is_nullable();
            let mut items = Vec::with_capacity(cursor.count()?);
            for item in cursor.children_with(false) {
                items.push(copy_at_depth(&item?, LIST_ITEM_FIELD, item_nullable, depth + 1)?);
            }
            Node::List(Some(items))
        }
        EditableKind::Variable => {
            let data = cursor.variable_data()?;
            if data.is_null() {
                Node::Variable(VariableNode::empty())
            } else {
                let payload = copy_at_depth(&data, builtin::VARIABLE_DATA_FIELD, true, depth + 1)?;
                Node::Variable(VariableNode::bound(payload))
            }
        }
    };
    Ok(Editable::from_node(provider, schema, nullable, name, node))
}
