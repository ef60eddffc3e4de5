//! # Cursor - Zero-Copy Record Reader
//!
//! A `Cursor` is a read-only view of one value inside a serialized record:
//! a byte buffer, an offset into it, the schema describing the bytes at that
//! offset and the provider used to resolve Variable payload schemas.
//!
//! ```text
//!   Cursor { buffer, offset, schema, provider }
//!      |
//!      +-- goto(i) / goto_name / navigate_to  -> child Cursor (same buffer)
//!      +-- get()                              -> Value borrowing the buffer
//!      +-- isolate()                          -> Cursor<'static> over a copy
//! ```
//!
//! A cursor with no buffer is null. Navigating into a null field yields a null
//! cursor carrying the field's schema, so callers can still inspect the type.
//!
//! ## Buffer Ownership
//!
//! Cursors over caller-provided bytes borrow them (`Cursor<'a>`). Cursors
//! produced by [`Cursor::isolate`] or [`Cursor::owned`] share an `Arc<[u8]>`
//! and are `'static`. Cloning either kind is cheap.
//!
//! ## Decoding
//!
//! | DataType | `get()` |
//! |----------|---------|
//! | fixed primitives, Choice | read in place (LE) |
//! | String, ItemPath, Binary | borrowed slice after the length varint |
//! | MultiChoice | list of selected i32 values |
//! | Money, GeoPosition, Measurement, DateTimeOffset | structured values |
//! | Variable | the payload's value |
//! | other Class, List | `NotPrimitive` |
//!
//! Every read is bounds-checked; running past the buffer fails with
//! `FormatError::BufferOverrun` rather than panicking.
//!
//! ## Module Structure
//!
//! - `navigation`: `goto`, `goto_name`, `navigate_to`, `count`
//! - `children`: sequential child iteration
//! - `equality`: deep structural comparison
//! - `json`: JSON projection

mod children;
mod equality;
mod json;
mod navigation;

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset};
use eyre::{bail, Result};
use uuid::Uuid;

use crate::encoding::decode_varint_at;
use crate::error::FormatError;
use crate::registry::{builtin, SchemaProvider};
use crate::schema::Schema;
use crate::types::{DataType, Decimal, Value};

pub use children::Children;
pub(crate) use json::primitive_json;

#[derive(Clone)]
enum Backing<'a> {
    Borrowed(&'a [u8]),
    Owned(Arc<[u8]>),
}

impl Backing<'_> {
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::Borrowed(bytes) => bytes,
            Backing::Owned(bytes) => bytes,
        }
    }
}

#[derive(Clone)]
pub struct Cursor<'a> {
    buffer: Option<Backing<'a>>,
    offset: usize,
    schema: Arc<Schema>,
    provider: Arc<dyn SchemaProvider>,
}

impl<'a> Cursor<'a> {
    /// Cursor over a record starting at byte 0 of `bytes`.
    pub fn new(
        provider: Arc<dyn SchemaProvider>,
        schema: Arc<Schema>,
        bytes: &'a [u8],
    ) -> Result<Self> {
        Self::at(provider, schema, bytes, 0)
    }

    /// Cursor over a value starting at `offset` in `bytes`.
    pub fn at(
        provider: Arc<dyn SchemaProvider>,
        schema: Arc<Schema>,
        bytes: &'a [u8],
        offset: usize,
    ) -> Result<Self> {
        schema.ensure_layout()?;
        if offset > bytes.len() {
            bail!(FormatError::BufferOverrun {
                offset,
                needed: 0,
                len: bytes.len(),
            });
        }
        Ok(Self {
            buffer: Some(Backing::Borrowed(bytes)),
            offset,
            schema,
            provider,
        })
    }

    pub fn provider(&self) -> &Arc<dyn SchemaProvider> {
        &self.provider
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_null(&self) -> bool {
        self.buffer.is_none()
    }

    /// The whole underlying buffer; empty for a null cursor.
    pub fn buffer(&self) -> &[u8] {
        self.buffer.as_ref().map(Backing::bytes).unwrap_or(&[])
    }

    /// The bytes of the value under the cursor.
    pub fn value_bytes(&self) -> Result<&[u8]> {
        let size = self.serialized_size()?;
        read_bytes(self.buffer(), self.offset, size)
    }

    /// Copies this value's bytes into an owned buffer.
    pub fn isolate(&self) -> Result<Cursor<'static>> {
        if self.is_null() {
            return Ok(Cursor::null(self.provider.clone(), self.schema.clone()));
        }
        let bytes: Arc<[u8]> = Arc::from(self.value_bytes()?);
        Ok(Cursor {
            buffer: Some(Backing::Owned(bytes)),
            offset: 0,
            schema: self.schema.clone(),
            provider: self.provider.clone(),
        })
    }

    /// Byte size of the value under the cursor; 0 for null.
    pub fn serialized_size(&self) -> Result<usize> {
        if self.is_null() {
            return Ok(0);
        }
        value_size(self.buffer(), self.offset, &self.schema)
    }

    /// Decodes the value under the cursor.
    pub fn get(&self) -> Result<Value<'_>> {
        self.get_in(self.buffer())
    }

    /// Decodes against `buf`, which must be this cursor's buffer. Lets values
    /// of child cursors borrow from the parent's buffer.
    fn get_in<'s>(&self, buf: &'s [u8]) -> Result<Value<'s>> {
        if self.is_null() {
            return Ok(Value::Null);
        }
        let schema = &self.schema;
        match schema.data_type() {
            DataType::Class => self.get_class(buf),
            DataType::MultiChoice => {
                let mut selected = Vec::with_capacity(self.count()?);
                for child in self.children() {
                    let child = child?;
                    if !child.is_null() {
                        selected.push(read_i32(buf, child.offset)?);
                    }
                }
                Ok(Value::MultiChoice(selected))
            }
            DataType::List => bail!(FormatError::NotPrimitive {
                schema: schema.name().to_string(),
                data_type: DataType::List,
            }),
            _ => read_primitive(buf, self.offset, schema),
        }
    }

    fn get_class<'s>(&self, buf: &'s [u8]) -> Result<Value<'s>> {
        let field = |name: &str| -> Result<Value<'s>> { self.goto_name(name)?.get_in(buf) };
        match self.schema.id() {
            builtin::VARIABLE => self.variable_data()?.get_in(buf),
            builtin::MONEY => {
                let amount = match field("Amount")? {
                    Value::Decimal(d) => d,
                    _ => Decimal::ZERO,
                };
                let currency = match field("Currency")? {
                    Value::String(s) => s,
                    _ => Cow::Borrowed(""),
                };
                Ok(Value::Money { amount, currency })
            }
            builtin::GEO_POSITION => Ok(Value::GeoPosition {
                latitude: float_or_zero(field("Latitude")?),
                longitude: float_or_zero(field("Longitude")?),
            }),
            builtin::MEASUREMENT => {
                let value = float_or_zero(field("Value")?);
                let unit = match field("Unit")? {
                    Value::String(s) => s,
                    _ => Cow::Borrowed(""),
                };
                Ok(Value::Measurement { value, unit })
            }
            builtin::DATE_TIME_OFFSET => {
                let utc = match field("DateTime")? {
                    Value::DateTime(dt) => dt,
                    _ => DateTime::UNIX_EPOCH,
                };
                let minutes = match field("OffsetMinutes")? {
                    Value::Int32(m) => m,
                    _ => 0,
                };
                let offset = FixedOffset::east_opt(minutes.saturating_mul(60)).ok_or_else(|| {
                    eyre::Report::new(FormatError::InvalidData(format!(
                        "utc offset of {} minutes out of range",
                        minutes
                    )))
                })?;
                Ok(Value::DateTimeOffset(utc.with_timezone(&offset)))
            }
            _ => bail!(FormatError::NotPrimitive {
                schema: self.schema.name().to_string(),
                data_type: DataType::Class,
            }),
        }
    }

    /// A cursor for a null value of `schema`.
    pub fn null(provider: Arc<dyn SchemaProvider>, schema: Arc<Schema>) -> Cursor<'static> {
        Cursor {
            buffer: None,
            offset: 0,
            schema,
            provider,
        }
    }

    fn child(&self, offset: usize, schema: Arc<Schema>) -> Cursor<'a> {
        Cursor {
            buffer: self.buffer.clone(),
            offset,
            schema,
            provider: self.provider.clone(),
        }
    }

    fn null_child(&self, schema: Arc<Schema>) -> Cursor<'a> {
        Cursor {
            buffer: None,
            offset: 0,
            schema,
            provider: self.provider.clone(),
        }
    }
}

impl Cursor<'static> {
    /// Cursor over a record held in a shared owned buffer.
    pub fn owned(
        provider: Arc<dyn SchemaProvider>,
        schema: Arc<Schema>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Result<Self> {
        schema.ensure_layout()?;
        Ok(Cursor {
            buffer: Some(Backing::Owned(bytes.into())),
            offset: 0,
            schema,
            provider,
        })
    }
}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("schema", &self.schema.name())
            .field("offset", &self.offset)
            .field("null", &self.is_null())
            .field("buffer_len", &self.buffer().len())
            .finish()
    }
}

/// True for the built-in tagged-union class.
pub fn is_variable(schema: &Schema) -> bool {
    schema.id() == builtin::VARIABLE
}

fn float_or_zero(value: Value<'_>) -> f64 {
    match value {
        Value::Float64(v) => v,
        _ => 0.0,
    }
}

pub(crate) fn read_bytes(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    match offset.checked_add(len) {
        Some(end) if end <= buf.len() => Ok(&buf[offset..end]),
        _ => bail!(FormatError::BufferOverrun {
            offset,
            needed: len,
            len: buf.len(),
        }),
    }
}

fn read_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(read_bytes(buf, offset, N)?);
    Ok(out)
}

pub(crate) fn read_i32(buf: &[u8], offset: usize) -> Result<i32> {
    read_array::<4>(buf, offset).map(i32::from_le_bytes)
}

fn read_i64(buf: &[u8], offset: usize) -> Result<i64> {
    read_array::<8>(buf, offset).map(i64::from_le_bytes)
}

/// Content slice of a length-prefixed primitive.
fn read_prefixed(buf: &[u8], offset: usize) -> Result<&[u8]> {
    let (len, width) = decode_varint_at(buf, offset)?;
    read_bytes(buf, offset + width, len)
}

fn read_primitive<'s>(buf: &'s [u8], offset: usize, schema: &Schema) -> Result<Value<'s>> {
    let value = match schema.data_type() {
        DataType::Void => Value::Null,
        DataType::Boolean => Value::Boolean(read_bytes(buf, offset, 1)?[0] != 0),
        DataType::Int32 | DataType::Choice => Value::Int32(read_i32(buf, offset)?),
        DataType::Int64 => Value::Int64(read_i64(buf, offset)?),
        DataType::Float64 => Value::Float64(f64::from_le_bytes(read_array::<8>(buf, offset)?)),
        DataType::Decimal => Value::Decimal(Decimal::from_bytes(&read_array::<16>(buf, offset)?)?),
        DataType::DateTime => {
            let micros = read_i64(buf, offset)?;
            let dt = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
                eyre::Report::new(FormatError::InvalidData(format!(
                    "timestamp {} out of range",
                    micros
                )))
            })?;
            Value::DateTime(dt)
        }
        DataType::TimeSpan => Value::TimeSpan(Duration::microseconds(read_i64(buf, offset)?)),
        DataType::Guid => Value::Guid(Uuid::from_bytes(read_array::<16>(buf, offset)?)),
        DataType::String | DataType::ItemPath => {
            let text = std::str::from_utf8(read_prefixed(buf, offset)?).map_err(|e| {
                eyre::Report::new(FormatError::InvalidData(format!(
                    "invalid UTF-8 in '{}': {}",
                    schema.name(),
                    e
                )))
            })?;
            if schema.data_type() == DataType::String {
                Value::String(Cow::Borrowed(text))
            } else {
                Value::ItemPath(Cow::Borrowed(text))
            }
        }
        DataType::Binary => Value::Binary(Cow::Borrowed(read_prefixed(buf, offset)?)),
        data_type => bail!(FormatError::NotPrimitive {
            schema: schema.name().to_string(),
            data_type,
        }),
    };
    Ok(value)
}

/// Serialized size of a non-null value of `schema` at `offset`.
pub(crate) fn value_size(buf: &[u8], offset: usize, schema: &Schema) -> Result<usize> {
    match schema.data_type() {
        DataType::String | DataType::Binary | DataType::ItemPath => {
            let (len, width) = decode_varint_at(buf, offset)?;
            Ok(width + len)
        }
        DataType::List | DataType::MultiChoice => Ok(decode_varint_at(buf, offset)?.0),
        DataType::Class if schema.variable_size_offset() >= 0 => {
            let header = offset + schema.variable_size_offset() as usize;
            Ok(decode_varint_at(buf, header)?.0)
        }
        _ => Ok(schema.fixed_size()),
    }
}
