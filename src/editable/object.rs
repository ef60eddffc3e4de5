//! Class nodes: field access, convenience values and schema-evolution copy.

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset, Utc};
use eyre::{bail, Result};

use super::{type_mismatch, Editable, EditableKind, Node};
use crate::config::PATH_SEPARATOR;
use crate::error::FormatError;
use crate::registry::builtin;
use crate::schema::same_schema;
use crate::types::{Decimal, Value};

impl Editable {
    fn children(&self) -> Result<Option<&[Editable]>> {
        match &self.node {
            Node::Object(children) => Ok(children.as_deref()),
            _ => Err(self.mismatch("Class")),
        }
    }

    /// Present children, materializing a null object first.
    fn children_mut(&mut self) -> Result<&mut Vec<Editable>> {
        if self.kind() != EditableKind::Object {
            return Err(self.mismatch("Class"));
        }
        self.init()?;
        match &mut self.node {
            Node::Object(Some(children)) => Ok(children),
            _ => Err(type_mismatch(&self.schema, "Class")),
        }
    }

    fn field_slot(&self, name: &str) -> Result<usize> {
        self.schema.field_index(name).ok_or_else(|| {
            eyre::Report::new(FormatError::UnknownField {
                schema: self.schema.name().to_string(),
                field: name.to_string(),
            })
        })
    }

    fn check_field_index(&self, index: usize) -> Result<()> {
        if index >= self.schema.field_count() {
            bail!(FormatError::IndexOutOfRange {
                schema: self.schema.name().to_string(),
                index,
                count: self.schema.field_count(),
            });
        }
        Ok(())
    }

    /// Child for the field at layout position `index`.
    pub fn field_at(&self, index: usize) -> Result<&Editable> {
        self.check_field_index(index)?;
        match self.children()? {
            Some(children) => Ok(&children[index]),
            None => bail!(FormatError::InvalidData(format!(
                "'{}' is null; call init() before reading its fields",
                self.name
            ))),
        }
    }

    pub fn field(&self, name: &str) -> Result<&Editable> {
        let index = self.field_slot(name)?;
        self.field_at(index)
    }

    pub fn field_at_mut(&mut self, index: usize) -> Result<&mut Editable> {
        self.check_field_index(index)?;
        let children = self.children_mut()?;
        Ok(&mut children[index])
    }

    /// Mutable child by field name. A null object is materialized.
    pub fn field_mut(&mut self, name: &str) -> Result<&mut Editable> {
        let index = self.field_slot(name)?;
        self.field_at_mut(index)
    }

    pub fn set_field<'v>(&mut self, name: &str, value: impl Into<Value<'v>>) -> Result<()> {
        self.field_mut(name)?.set(value)
    }

    pub fn set_field_null(&mut self, name: &str) -> Result<()> {
        self.field_mut(name)?.set_null()
    }

    /// Present children in layout order; empty for a null object.
    pub fn fields(&self) -> &[Editable] {
        match &self.node {
            Node::Object(Some(children)) => children,
            _ => &[],
        }
    }

    /// Follows a `/`-separated path, materializing null objects, lists and
    /// serialized Variable payloads on the way. Numeric segments index lists.
    pub fn navigate_mut(&mut self, path: &str) -> Result<&mut Editable> {
        let mut current = self;
        for segment in path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()) {
            current = current.step_mut(segment)?;
        }
        Ok(current)
    }

    fn step_mut(&mut self, segment: &str) -> Result<&mut Editable> {
        match self.kind() {
            EditableKind::Variable => self.data_mut()?.step_mut(segment),
            EditableKind::List => {
                let index = segment.parse::<usize>().map_err(|_| {
                    eyre::Report::new(FormatError::UnknownField {
                        schema: self.schema.name().to_string(),
                        field: segment.to_string(),
                    })
                })?;
                self.item_mut(index)
            }
            _ => self.field_mut(segment),
        }
    }

    pub(super) fn object_value<'e>(
        &'e self,
        children: Option<&'e [Editable]>,
    ) -> Result<Value<'e>> {
        let Some(children) = children else {
            return Ok(Value::Null);
        };
        let field = |name: &str| self.child_value(children, name);
        let value = match self.schema.id() {
            builtin::MONEY => Value::Money {
                amount: match field("Amount")? {
                    Value::Decimal(d) => d,
                    _ => Decimal::ZERO,
                },
                currency: match field("Currency")? {
                    Value::String(s) => s,
                    _ => Cow::Borrowed(""),
                },
            },
            builtin::GEO_POSITION => Value::GeoPosition {
                latitude: float_or_zero(field("Latitude")?),
                longitude: float_or_zero(field("Longitude")?),
            },
            builtin::MEASUREMENT => Value::Measurement {
                value: float_or_zero(field("Value")?),
                unit: match field("Unit")? {
                    Value::String(s) => s,
                    _ => Cow::Borrowed(""),
                },
            },
            builtin::DATE_TIME_OFFSET => {
                let utc = match field("DateTime")? {
                    Value::DateTime(dt) => dt,
                    _ => DateTime::UNIX_EPOCH,
                };
                let minutes = match field("OffsetMinutes")? {
                    Value::Int32(m) => m,
                    _ => 0,
                };
                Value::DateTimeOffset(utc.with_timezone(&utc_offset(minutes)?))
            }
            _ => bail!(FormatError::NotPrimitive {
                schema: self.schema.name().to_string(),
                data_type: self.schema.data_type(),
            }),
        };
        Ok(value)
    }

    fn child_value<'e>(&'e self, children: &'e [Editable], name: &str) -> Result<Value<'e>> {
        let index = self.field_slot(name)?;
        children[index].get()
    }

    /// Accepts the structured values of the built-in convenience classes.
    pub(super) fn set_object_value(&mut self, value: Value<'_>) -> Result<()> {
        match (self.schema.id(), &value) {
            (builtin::MONEY, Value::Money { amount, currency }) => {
                self.set_field("Amount", Value::Decimal(*amount))?;
                self.set_field("Currency", Value::String(Cow::Borrowed(currency.as_ref())))
            }
            (
                builtin::GEO_POSITION,
                Value::GeoPosition {
                    latitude,
                    longitude,
                },
            ) => {
                self.set_field("Latitude", *latitude)?;
                self.set_field("Longitude", *longitude)
            }
            (builtin::MEASUREMENT, Value::Measurement { value, unit }) => {
                self.set_field("Value", *value)?;
                self.set_field("Unit", Value::String(Cow::Borrowed(unit.as_ref())))
            }
            (builtin::DATE_TIME_OFFSET, Value::DateTimeOffset(dt)) => {
                self.set_date_time_offset(*dt)
            }
            (builtin::DATE_TIME_OFFSET, Value::String(text)) => {
                match DateTime::parse_from_rfc3339(text.trim()) {
                    Ok(dt) => self.set_date_time_offset(dt),
                    Err(_) => Err(self.conversion(&value)),
                }
            }
            _ => Err(self.conversion(&value)),
        }
    }

    fn set_date_time_offset(&mut self, dt: DateTime<FixedOffset>) -> Result<()> {
        self.set_field("DateTime", dt.with_timezone(&Utc))?;
        self.set_field("OffsetMinutes", dt.offset().local_minus_utc() / 60)
    }

    pub(super) fn object_set_from(&mut self, other: &Editable) -> Result<()> {
        match other.kind() {
            EditableKind::Object if same_schema(&self.schema, &other.schema) => {
                self.node = other.clone_as_editable().node;
                Ok(())
            }
            EditableKind::Object => {
                let Some(sources) = other.children()? else {
                    return self.set_null();
                };
                let names: Vec<(usize, usize)> = self
                    .schema
                    .fields()
                    .iter()
                    .filter_map(|field| {
                        other
                            .schema
                            .field_index(field.name())
                            .map(|source| (field.index(), source))
                    })
                    .collect();
                let children = self.children_mut()?;
                for (target, source) in names {
                    // a null source leaves a non-nullable target at its default
                    if sources[source].is_null() && !children[target].is_nullable() {
                        continue;
                    }
                    children[target].set_from(&sources[source])?;
                }
                Ok(())
            }
            EditableKind::Variable => match other.data() {
                Some(payload) => self.object_set_from(payload),
                None => {
                    let value = other.get()?.into_owned();
                    self.set(value)
                }
            },
            EditableKind::Primitive | EditableKind::List => {
                let value = other.get()?.into_owned();
                self.set(value)
            }
        }
    }
}

fn float_or_zero(value: Value<'_>) -> f64 {
    match value {
        Value::Float64(v) => v,
        _ => 0.0,
    }
}

fn utc_offset(minutes: i32) -> Result<FixedOffset> {
    FixedOffset::east_opt(minutes.saturating_mul(60)).ok_or_else(|| {
        eyre::Report::new(FormatError::InvalidData(format!(
            "utc offset of {} minutes out of range",
            minutes
        )))
    })
}
