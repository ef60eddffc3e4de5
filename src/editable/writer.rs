//! Size computation and wire encoding of frozen nodes.
//!
//! ```text
//! Class:     [fixed fields][null bitmap?][total | off_0 .. off_n-1][payloads]
//! List:      [total][count][null bitmap?][items]
//! primitive: fixed bytes, or [len][bytes] for String, Binary, ItemPath
//! ```
//!
//! Every varint of one header (total, count, offsets) shares a width: the
//! smallest of 1, 2 or 4 bytes that fits the largest value. Offsets are
//! absolute from the record start; a null variable field takes no payload
//! bytes, so its offset equals the next field's.

use eyre::{bail, Result};
use smallvec::SmallVec;

use super::{Editable, Node, Payload, VariableNode};
use crate::encoding::varint::{fits_width, push_varint_with_width};
use crate::encoding::{bitmap_len, set_bit, varint_len};
use crate::error::FormatError;
use crate::registry::builtin;
use crate::schema::Schema;
use crate::types::{timespan_micros, DataType, Value};

const HEADER_WIDTHS: [usize; 3] = [1, 2, 4];

/// Placement of a class's variable region.
#[derive(Debug, Clone, Copy)]
struct Region {
    width: usize,
    total: usize,
}

fn plan_region(base: usize, sizes: &[usize]) -> Result<Region> {
    let payload: usize = sizes.iter().sum();
    for width in HEADER_WIDTHS {
        let total = base + width * (1 + sizes.len()) + payload;
        if fits_width(total, width) {
            return Ok(Region { width, total });
        }
    }
    bail!(FormatError::VarintOverflow(
        base + 4 * (1 + sizes.len()) + payload
    ))
}

fn write_region_header(region: Region, base: usize, sizes: &[usize], out: &mut Vec<u8>) -> Result<()> {
    push_varint_with_width(region.total, region.width, out)?;
    let mut offset = base + region.width * (1 + sizes.len());
    for size in sizes {
        push_varint_with_width(offset, region.width, out)?;
        offset += size;
    }
    Ok(())
}

fn plan_list(count: usize, content: usize) -> Result<Region> {
    for width in HEADER_WIDTHS {
        let total = 2 * width + content;
        if fits_width(total.max(count), width) {
            return Ok(Region { width, total });
        }
    }
    bail!(FormatError::VarintOverflow(8 + content))
}

/// Bytes taken by a null value: zeros for fixed-size types, nothing for
/// variable-size ones.
pub(super) fn null_size(schema: &Schema) -> usize {
    if schema.is_variable_size() {
        0
    } else {
        schema.fixed_size()
    }
}

fn write_zeros(len: usize, out: &mut Vec<u8>) {
    out.resize(out.len() + len, 0);
}

pub(super) fn primitive_size(schema: &Schema, value: &Value<'_>) -> Result<usize> {
    match value {
        Value::Null => Ok(null_size(schema)),
        Value::String(s) | Value::ItemPath(s) => Ok(varint_len(s.len())? + s.len()),
        Value::Binary(b) => Ok(varint_len(b.len())? + b.len()),
        _ => Ok(schema.fixed_size()),
    }
}

fn write_primitive(schema: &Schema, value: &Value<'_>, out: &mut Vec<u8>) -> Result<()> {
    match (schema.data_type(), value) {
        (_, Value::Null) => write_zeros(null_size(schema), out),
        (DataType::Boolean, Value::Boolean(b)) => out.push(*b as u8),
        (DataType::Int32 | DataType::Choice, Value::Int32(i)) => {
            out.extend_from_slice(&i.to_le_bytes())
        }
        (DataType::Int64, Value::Int64(i)) => out.extend_from_slice(&i.to_le_bytes()),
        (DataType::Float64, Value::Float64(f)) => out.extend_from_slice(&f.to_le_bytes()),
        (DataType::Decimal, Value::Decimal(d)) => out.extend_from_slice(&d.to_bytes()),
        (DataType::DateTime, Value::DateTime(dt)) => {
            out.extend_from_slice(&dt.timestamp_micros().to_le_bytes())
        }
        (DataType::TimeSpan, Value::TimeSpan(span)) => {
            out.extend_from_slice(&timespan_micros(span).to_le_bytes())
        }
        (DataType::Guid, Value::Guid(g)) => out.extend_from_slice(g.as_bytes()),
        (DataType::String, Value::String(s)) | (DataType::ItemPath, Value::ItemPath(s)) => {
            push_prefixed(s.as_bytes(), out)?
        }
        (DataType::Binary, Value::Binary(b)) => push_prefixed(b, out)?,
        (data_type, value) => bail!(FormatError::InvalidData(format!(
            "'{}' of type {:?} holds {:?}",
            schema.name(),
            data_type,
            value.data_type()
        ))),
    }
    Ok(())
}

fn push_prefixed(bytes: &[u8], out: &mut Vec<u8>) -> Result<()> {
    push_varint_with_width(bytes.len(), varint_len(bytes.len())?, out)?;
    out.extend_from_slice(bytes);
    Ok(())
}

/// Sizes of the variable-size children, in field order.
fn variable_sizes(schema: &Schema, children: &[Editable]) -> Result<SmallVec<[usize; 8]>> {
    schema
        .fields()
        .iter()
        .zip(children)
        .filter(|(field, _)| field.is_variable())
        .map(|(_, child)| child.serialized_size())
        .collect()
}

pub(super) fn object_size(schema: &Schema, children: Option<&[Editable]>) -> Result<usize> {
    let Some(children) = children else {
        return Ok(null_size(schema));
    };
    if schema.variable_size_offset() < 0 {
        return Ok(schema.fixed_size());
    }
    let sizes = variable_sizes(schema, children)?;
    Ok(plan_region(schema.fixed_size(), &sizes)?.total)
}

fn write_object(schema: &Schema, children: Option<&[Editable]>, out: &mut Vec<u8>) -> Result<()> {
    let Some(children) = children else {
        write_zeros(null_size(schema), out);
        return Ok(());
    };

    let fields = schema.fields();
    for (field, child) in fields.iter().zip(children) {
        if !field.is_variable() {
            write_node(child, out)?;
        }
    }

    if schema.null_bitmap_offset() >= 0 {
        let mut bitmap = vec![0u8; bitmap_len(fields.len())];
        for (field, child) in fields.iter().zip(children) {
            if field.is_nullable() && !child.is_null() {
                set_bit(&mut bitmap, field.index());
            }
        }
        out.extend_from_slice(&bitmap);
    }

    if schema.variable_size_offset() >= 0 {
        let sizes = variable_sizes(schema, children)?;
        let region = plan_region(schema.fixed_size(), &sizes)?;
        write_region_header(region, schema.fixed_size(), &sizes, out)?;
        for (field, child) in fields.iter().zip(children) {
            if field.is_variable() {
                write_node(child, out)?;
            }
        }
    }
    Ok(())
}

pub(super) fn list_size(schema: &Schema, items: Option<&[Editable]>) -> Result<usize> {
    let Some(items) = items else {
        return Ok(0);
    };
    let mut content = if schema.item_field()?.is_nullable() {
        bitmap_len(items.len())
    } else {
        0
    };
    for item in items {
        content += item.serialized_size()?;
    }
    Ok(plan_list(items.len(), content)?.total)
}

fn write_list(schema: &Schema, items: Option<&[Editable]>, out: &mut Vec<u8>) -> Result<()> {
    let Some(items) = items else {
        return Ok(());
    };
    let nullable = schema.item_field()?.is_nullable();
    let mut content = if nullable { bitmap_len(items.len()) } else { 0 };
    for item in items {
        content += item.serialized_size()?;
    }
    let region = plan_list(items.len(), content)?;
    push_varint_with_width(region.total, region.width, out)?;
    push_varint_with_width(items.len(), region.width, out)?;

    if nullable {
        let mut bitmap = vec![0u8; bitmap_len(items.len())];
        for (index, item) in items.iter().enumerate() {
            if !item.is_null() {
                set_bit(&mut bitmap, index);
            }
        }
        out.extend_from_slice(&bitmap);
    }
    for item in items {
        write_node(item, out)?;
    }
    Ok(())
}

fn variable_field_positions(schema: &Schema) -> Result<(usize, usize)> {
    let lookup = |name: &str| {
        schema.field_by_name(name).ok_or_else(|| {
            eyre::Report::new(FormatError::UnknownField {
                schema: schema.name().to_string(),
                field: name.to_string(),
            })
        })
    };
    let id_field = lookup(builtin::VARIABLE_DATA_SCHEMA_ID_FIELD)?;
    let data_field = lookup(builtin::VARIABLE_DATA_FIELD)?;
    if id_field.is_variable() || !data_field.is_variable() {
        bail!(FormatError::Structural {
            schema: schema.name().to_string(),
            reason: "variable class needs a fixed id field and a variable data field".to_string(),
        });
    }
    Ok((id_field.offset() as usize, data_field.index()))
}

pub(super) fn variable_size(schema: &Schema, variable: &VariableNode) -> Result<usize> {
    if !variable.present {
        return Ok(null_size(schema));
    }
    let payload = variable.payload_size()?.unwrap_or(0);
    Ok(plan_region(schema.fixed_size(), &[payload])?.total)
}

fn write_variable(schema: &Schema, variable: &VariableNode, out: &mut Vec<u8>) -> Result<()> {
    if !variable.present {
        write_zeros(null_size(schema), out);
        return Ok(());
    }
    let (id_offset, data_index) = variable_field_positions(schema)?;
    let payload = variable.payload_size()?;

    let mut fixed = vec![0u8; schema.fixed_size()];
    let id = match payload {
        Some(_) => variable.payload_schema_id(),
        None => builtin::VOID,
    };
    fixed[id_offset..id_offset + 4].copy_from_slice(&id.to_le_bytes());
    if payload.is_some() && schema.null_bitmap_offset() >= 0 {
        let bitmap_at = schema.null_bitmap_offset() as usize;
        set_bit(&mut fixed[bitmap_at..], data_index);
    }
    out.extend_from_slice(&fixed);

    let sizes = [payload.unwrap_or(0)];
    let region = plan_region(schema.fixed_size(), &sizes)?;
    write_region_header(region, schema.fixed_size(), &sizes, out)?;
    match &variable.data {
        Payload::Bound(node) if payload.is_some() => write_node(node, out),
        Payload::Serialized(cursor) => {
            out.extend_from_slice(cursor.value_bytes()?);
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Appends the bytes of a frozen node.
pub(super) fn write_node(editable: &Editable, out: &mut Vec<u8>) -> Result<()> {
    let schema = &editable.schema;
    match &editable.node {
        Node::Primitive(value) => write_primitive(schema, value, out),
        Node::Object(children) => write_object(schema, children.as_deref(), out),
        Node::List(items) => write_list(schema, items.as_deref(), out),
        Node::Variable(variable) => write_variable(schema, variable, out),
    }
}
