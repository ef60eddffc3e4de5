//! Incremental tree construction from JSON.
//!
//! The reader walks the schema and the token stream together, creating each
//! node as its tokens arrive. Object members are matched to fields by name;
//! `"@schema"` must name the expected schema, unknown members are skipped.
//! A Variable object selects its payload schema with `"@dataSchema"`, which
//! must appear before `"@data"`.

use std::borrow::Cow;
use std::sync::Arc;

use eyre::{bail, Result};
use tracing::trace;

use crate::config::{JSON_DATA_KEY, JSON_DATA_SCHEMA_KEY, JSON_SCHEMA_KEY, MAX_NESTING_DEPTH};
use crate::editable::{Editable, EditableKind};
use crate::error::FormatError;
use crate::parsing::{JsonToken, JsonTokenizer};
use crate::registry::{builtin, SchemaProvider};
use crate::schema::field::LIST_ITEM_FIELD;
use crate::schema::Schema;
use crate::types::{DataType, Decimal, Value};

pub(super) fn read_json(
    provider: &Arc<dyn SchemaProvider>,
    schema: Arc<Schema>,
    text: &str,
) -> Result<Editable> {
    schema.ensure_layout()?;
    let mut reader = JsonReader {
        tokens: JsonTokenizer::new(text),
        provider,
    };
    let root_nullable = matches!(reader.tokens.peek_token()?, Some(JsonToken::Null));
    let name = schema.name().to_string();
    let editable = reader.read_value(schema, &name, root_nullable, 0)?;
    reader.tokens.finish()?;
    Ok(editable)
}

struct JsonReader<'a, 'p> {
    tokens: JsonTokenizer<'a>,
    provider: &'p Arc<dyn SchemaProvider>,
}

impl<'a> JsonReader<'a, '_> {
    fn read_value(
        &mut self,
        schema: Arc<Schema>,
        name: &str,
        nullable: bool,
        depth: usize,
    ) -> Result<Editable> {
        if depth > MAX_NESTING_DEPTH {
            bail!(FormatError::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        if matches!(self.tokens.peek_token()?, Some(JsonToken::Null)) {
            self.tokens.next_token()?;
            if !nullable {
                bail!(FormatError::NotNullable(name.to_string()));
            }
            return Editable::with_defaults(self.provider, schema, true, name);
        }

        let mut node = Editable::with_defaults(self.provider, schema, nullable, name)?;
        node.init()?;
        match node.kind() {
            EditableKind::Primitive => self.read_primitive(&mut node)?,
            EditableKind::Object => self.read_object(&mut node, depth)?,
            EditableKind::List => self.read_list(&mut node, depth)?,
            EditableKind::Variable => self.read_variable(&mut node, depth)?,
        }
        Ok(node)
    }

    fn read_primitive(&mut self, node: &mut Editable) -> Result<()> {
        let data_type = node.schema().data_type();
        let value = match self.tokens.expect_token(node.name())? {
            JsonToken::String(text) => Value::String(text),
            JsonToken::Bool(b) => Value::Boolean(b),
            JsonToken::Number(raw) => number_value(raw, data_type).ok_or_else(|| {
                self.tokens
                    .error(format!("invalid number '{}' for '{}'", raw, node.name()))
            })?,
            other => {
                return Err(self.tokens.error(format!(
                    "expected a {:?} value for '{}', got {:?}",
                    data_type,
                    node.name(),
                    other
                )))
            }
        };
        node.set(value)
    }

    fn read_object(&mut self, node: &mut Editable, depth: usize) -> Result<()> {
        let schema = node.schema().clone();
        self.tokens
            .expect(JsonToken::ObjectStart, &format!("for '{}'", node.name()))?;
        if self.close_if(JsonToken::ObjectEnd)? {
            return Ok(());
        }
        loop {
            let key = self.read_key()?;
            if key == JSON_SCHEMA_KEY {
                self.check_schema_name(&schema)?;
            } else if let Some(field) = schema.field_by_name(&key) {
                let child = self.read_value(
                    field.schema().clone(),
                    field.name(),
                    field.is_nullable(),
                    depth + 1,
                )?;
                *node.field_at_mut(field.index())? = child;
            } else {
                self.skip_member(&schema, &key, depth)?;
            }
            if !self.next_member(JsonToken::ObjectEnd)? {
                return Ok(());
            }
        }
    }

    fn read_list(&mut self, node: &mut Editable, depth: usize) -> Result<()> {
        let schema = node.schema().clone();
        node.clear()?;
        if schema.data_type() == DataType::MultiChoice
            && matches!(self.tokens.peek_token()?, Some(JsonToken::String(_)))
        {
            return self.read_primitive(node);
        }

        self.tokens
            .expect(JsonToken::ArrayStart, &format!("for '{}'", node.name()))?;
        if self.close_if(JsonToken::ArrayEnd)? {
            return Ok(());
        }
        let item_field = schema.item_field()?;
        let mut selected = Vec::new();
        loop {
            if schema.data_type() == DataType::MultiChoice {
                selected.push(self.read_choice(&schema)?);
            } else {
                let item = self.read_value(
                    item_field.schema().clone(),
                    LIST_ITEM_FIELD,
                    item_field.is_nullable(),
                    depth + 1,
                )?;
                node.push_editable(item)?;
            }
            if !self.next_member(JsonToken::ArrayEnd)? {
                break;
            }
        }
        if schema.data_type() == DataType::MultiChoice {
            node.set(Value::MultiChoice(selected))?;
        }
        Ok(())
    }

    /// One MultiChoice element: a value or an option name.
    fn read_choice(&mut self, schema: &Schema) -> Result<i32> {
        let selected = match self.tokens.expect_token("choice list")? {
            JsonToken::Number(raw) => raw.parse::<i32>().ok(),
            JsonToken::String(text) => schema
                .choice_set()
                .and_then(|set| set.option_by_name(&text))
                .map(|option| option.value)
                .or_else(|| text.trim().parse::<i32>().ok()),
            _ => None,
        };
        selected.ok_or_else(|| {
            self.tokens
                .error(format!("invalid choice for '{}'", schema.name()))
        })
    }

    fn read_variable(&mut self, node: &mut Editable, depth: usize) -> Result<()> {
        let schema = node.schema().clone();
        self.tokens
            .expect(JsonToken::ObjectStart, &format!("for '{}'", node.name()))?;
        if self.close_if(JsonToken::ObjectEnd)? {
            return Ok(());
        }
        let mut data_schema: Option<Arc<Schema>> = None;
        loop {
            let key = self.read_key()?;
            match key.as_ref() {
                JSON_SCHEMA_KEY => self.check_schema_name(&schema)?,
                JSON_DATA_SCHEMA_KEY => {
                    let name = self.read_string(JSON_DATA_SCHEMA_KEY)?;
                    data_schema = Some(self.provider.get_by_name(&name)?);
                }
                JSON_DATA_KEY => {
                    let Some(payload_schema) = data_schema.clone() else {
                        return Err(self.tokens.error(format!(
                            "\"{}\" must come after \"{}\"",
                            JSON_DATA_KEY, JSON_DATA_SCHEMA_KEY
                        )));
                    };
                    let payload = self.read_value(
                        payload_schema,
                        builtin::VARIABLE_DATA_FIELD,
                        true,
                        depth + 1,
                    )?;
                    node.set_data(payload)?;
                }
                _ => self.skip_member(&schema, &key, depth)?,
            }
            if !self.next_member(JsonToken::ObjectEnd)? {
                return Ok(());
            }
        }
    }

    fn read_key(&mut self) -> Result<Cow<'a, str>> {
        let key = match self.tokens.expect_token("object key")? {
            JsonToken::String(key) => key,
            other => return Err(self.tokens.error(format!("expected object key, got {:?}", other))),
        };
        self.tokens.expect(JsonToken::Colon, "after object key")?;
        Ok(key)
    }

    fn read_string(&mut self, context: &str) -> Result<Cow<'a, str>> {
        match self.tokens.expect_token(context)? {
            JsonToken::String(text) => Ok(text),
            other => Err(self
                .tokens
                .error(format!("expected a string for {}, got {:?}", context, other))),
        }
    }

    fn check_schema_name(&mut self, schema: &Schema) -> Result<()> {
        let declared = self.read_string(JSON_SCHEMA_KEY)?;
        if declared != schema.name() {
            return Err(self.tokens.error(format!(
                "\"{}\" is '{}', expected '{}'",
                JSON_SCHEMA_KEY,
                declared,
                schema.name()
            )));
        }
        Ok(())
    }

    fn skip_member(&mut self, schema: &Schema, key: &str, depth: usize) -> Result<()> {
        trace!(schema = schema.name(), member = key, "skipping unknown json member");
        self.tokens
            .skip_value(MAX_NESTING_DEPTH.saturating_sub(depth).max(1))
    }

    /// Consumes `close` if it is the next token.
    fn close_if(&mut self, close: JsonToken<'static>) -> Result<bool> {
        let found = matches!(self.tokens.peek_token()?, Some(token) if *token == close);
        if found {
            self.tokens.next_token()?;
        }
        Ok(found)
    }

    /// After a member: `true` on a comma, `false` on `close`.
    fn next_member(&mut self, close: JsonToken<'static>) -> Result<bool> {
        let token = self.tokens.expect_token("separator")?;
        if token == JsonToken::Comma {
            Ok(true)
        } else if token == close {
            Ok(false)
        } else {
            Err(self
                .tokens
                .error(format!("expected ',' or {:?}, got {:?}", close, token)))
        }
    }
}

/// Parses number text against the target type so Int64 and Decimal values
/// never round-trip through `f64`.
fn number_value(raw: &str, data_type: DataType) -> Option<Value<'static>> {
    match data_type {
        DataType::Decimal => raw.parse::<Decimal>().ok().map(Value::Decimal),
        DataType::Float64 => raw.parse::<f64>().ok().map(Value::Float64),
        _ => raw
            .parse::<i64>()
            .ok()
            .map(Value::Int64)
            .or_else(|| raw.parse::<f64>().ok().map(Value::Float64)),
    }
}
