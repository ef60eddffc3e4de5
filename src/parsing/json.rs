//! # JSON Token Stream
//!
//! A pull tokenizer over JSON text. The editable factory consumes it one
//! token at a time, so a record is built while the document is read instead
//! of materializing an intermediate JSON tree.
//!
//! ```text
//! ┌─────────────┐    ┌───────────────┐    ┌──────────────────────────┐
//! │ JSON text   │───>│ JsonTokenizer │───>│ EditableFactory::from_json│
//! └─────────────┘    └───────────────┘    └──────────────────────────┘
//! ```
//!
//! ## Tokens
//!
//! - `{` / `}` - Object delimiters
//! - `[` / `]` - Array delimiters
//! - `:` - Key-value separator
//! - `,` - Element separator
//! - String, Number, Bool, Null - Value tokens
//!
//! Numbers keep their source text so the consumer can parse them against the
//! target type: an Int64 or Decimal never makes a lossy trip through `f64`.
//! Strings without escapes borrow from the input.
//!
//! ## Error Handling
//!
//! Malformed input fails with `FormatError::Json` carrying the byte position:
//!
//! ```text
//! json: expected ':' after object key at position 42
//! ```

use std::borrow::Cow;

use eyre::{bail, Result};

use crate::error::FormatError;

#[derive(Debug, Clone, PartialEq)]
pub enum JsonToken<'a> {
    ObjectStart,
    ObjectEnd,
    ArrayStart,
    ArrayEnd,
    Colon,
    Comma,
    String(Cow<'a, str>),
    Number(&'a str),
    Bool(bool),
    Null,
}

impl JsonToken<'_> {
    /// True for tokens that begin a value.
    pub fn starts_value(&self) -> bool {
        !matches!(
            self,
            JsonToken::ObjectEnd | JsonToken::ArrayEnd | JsonToken::Colon | JsonToken::Comma
        )
    }
}

pub struct JsonTokenizer<'a> {
    input: &'a str,
    pos: usize,
    peeked: Option<(JsonToken<'a>, usize)>,
}

fn json_error(message: String) -> eyre::Report {
    eyre::Report::new(FormatError::Json(message))
}

impl<'a> JsonTokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            peeked: None,
        }
    }

    pub fn position(&self) -> usize {
        match &self.peeked {
            Some((_, start)) => *start,
            None => self.pos,
        }
    }

    pub fn remaining(&self) -> &'a str {
        &self.input[self.position()..]
    }

    /// Fails unless only whitespace remains.
    pub fn finish(&mut self) -> Result<()> {
        match self.next_token()? {
            None => Ok(()),
            Some(token) => Err(self.error(format!("trailing token {:?}", token))),
        }
    }

    pub fn error(&self, message: impl Into<String>) -> eyre::Report {
        json_error(format!("{} at position {}", message.into(), self.position()))
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() {
            match self.input.as_bytes()[self.pos] {
                b' ' | b'\t' | b'\n' | b'\r' => self.pos += 1,
                _ => break,
            }
        }
    }

    pub fn peek_token(&mut self) -> Result<Option<&JsonToken<'a>>> {
        if self.peeked.is_none() {
            self.skip_whitespace();
            let start = self.pos;
            if let Some(token) = self.read_token()? {
                self.peeked = Some((token, start));
            }
        }
        Ok(self.peeked.as_ref().map(|(token, _)| token))
    }

    pub fn next_token(&mut self) -> Result<Option<JsonToken<'a>>> {
        if let Some((token, _)) = self.peeked.take() {
            return Ok(Some(token));
        }
        self.read_token()
    }

    /// Next token, failing at end of input.
    pub fn expect_token(&mut self, context: &str) -> Result<JsonToken<'a>> {
        match self.next_token()? {
            Some(token) => Ok(token),
            None => Err(self.error(format!("unexpected end of input in {}", context))),
        }
    }

    pub fn expect(&mut self, expected: JsonToken<'static>, context: &str) -> Result<()> {
        let token = self.expect_token(context)?;
        if token != expected {
            return Err(self.error(format!("expected {:?} {}, got {:?}", expected, context, token)));
        }
        Ok(())
    }

    /// Consumes one complete value, tracking nesting up to `max_depth`.
    pub fn skip_value(&mut self, max_depth: usize) -> Result<()> {
        let mut depth = 0usize;
        loop {
            let token = self.expect_token("skipped value")?;
            if depth == 0 && !token.starts_value() {
                return Err(self.error(format!("expected a value, got {:?}", token)));
            }
            match token {
                JsonToken::ObjectStart | JsonToken::ArrayStart => {
                    depth += 1;
                    if depth > max_depth {
                        bail!(FormatError::NestingTooDeep(max_depth));
                    }
                }
                JsonToken::ObjectEnd | JsonToken::ArrayEnd => {
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
            if depth == 0 {
                return Ok(());
            }
        }
    }

    fn read_token(&mut self) -> Result<Option<JsonToken<'a>>> {
        self.skip_whitespace();

        if self.pos >= self.input.len() {
            return Ok(None);
        }

        let c = self.input.as_bytes()[self.pos];

        let simple = match c {
            b'{' => Some(JsonToken::ObjectStart),
            b'}' => Some(JsonToken::ObjectEnd),
            b'[' => Some(JsonToken::ArrayStart),
            b']' => Some(JsonToken::ArrayEnd),
            b':' => Some(JsonToken::Colon),
            b',' => Some(JsonToken::Comma),
            _ => None,
        };
        if let Some(token) = simple {
            self.pos += 1;
            return Ok(Some(token));
        }

        match c {
            b'"' => self.parse_string(),
            b't' => self.parse_keyword("true", JsonToken::Bool(true)),
            b'f' => self.parse_keyword("false", JsonToken::Bool(false)),
            b'n' => self.parse_keyword("null", JsonToken::Null),
            b'-' | b'0'..=b'9' => self.parse_number(),
            _ => Err(json_error(format!(
                "unexpected character '{}' at position {}",
                c as char, self.pos
            ))),
        }
    }

    fn parse_string(&mut self) -> Result<Option<JsonToken<'a>>> {
        let start = self.pos + 1;
        self.pos += 1;

        let mut has_escapes = false;
        while self.pos < self.input.len() {
            let c = self.input.as_bytes()[self.pos];
            match c {
                b'"' => {
                    let raw = &self.input[start..self.pos];
                    self.pos += 1;

                    return if has_escapes {
                        let unescaped = unescape_string(raw)?;
                        Ok(Some(JsonToken::String(Cow::Owned(unescaped))))
                    } else {
                        Ok(Some(JsonToken::String(Cow::Borrowed(raw))))
                    };
                }
                b'\\' => {
                    has_escapes = true;
                    self.pos += 2;
                }
                _ => self.pos += 1,
            }
        }

        Err(json_error(format!(
            "unterminated string starting at position {}",
            start - 1
        )))
    }

    fn parse_number(&mut self) -> Result<Option<JsonToken<'a>>> {
        let start = self.pos;

        if self.input.as_bytes()[self.pos] == b'-' {
            self.pos += 1;
        }

        while self.pos < self.input.len() {
            match self.input.as_bytes()[self.pos] {
                b'0'..=b'9' | b'.' | b'e' | b'E' | b'+' | b'-' => self.pos += 1,
                _ => break,
            }
        }

        let text = &self.input[start..self.pos];
        if text.parse::<f64>().is_err() {
            return Err(json_error(format!(
                "invalid number '{}' at position {}",
                text, start
            )));
        }
        Ok(Some(JsonToken::Number(text)))
    }

    fn parse_keyword(
        &mut self,
        keyword: &str,
        token: JsonToken<'a>,
    ) -> Result<Option<JsonToken<'a>>> {
        if self.input[self.pos..].starts_with(keyword) {
            self.pos += keyword.len();
            Ok(Some(token))
        } else {
            Err(json_error(format!(
                "expected '{}' at position {}",
                keyword, self.pos
            )))
        }
    }
}

pub fn unescape_string(s: &str) -> Result<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            result.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('r') => result.push('\r'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some('"') => result.push('"'),
            Some('/') => result.push('/'),
            Some('b') => result.push('\x08'),
            Some('f') => result.push('\x0C'),
            Some('u') => {
                let mut cp = read_hex4(&mut chars)?;
                if (0xD800..0xDC00).contains(&cp) {
                    // High surrogate: a low surrogate escape must follow.
                    if chars.next() != Some('\\') || chars.next() != Some('u') {
                        return Err(json_error("unpaired surrogate in unicode escape".into()));
                    }
                    let low = read_hex4(&mut chars)?;
                    if !(0xDC00..0xE000).contains(&low) {
                        return Err(json_error(format!("invalid low surrogate U+{:04X}", low)));
                    }
                    cp = 0x10000 + ((cp - 0xD800) << 10) + (low - 0xDC00);
                }
                match char::from_u32(cp) {
                    Some(ch) => result.push(ch),
                    None => {
                        return Err(json_error(format!("invalid unicode codepoint: U+{:04X}", cp)))
                    }
                }
            }
            Some(other) => return Err(json_error(format!("invalid escape sequence: \\{}", other))),
            None => return Err(json_error("unexpected end of string after backslash".into())),
        }
    }

    Ok(result)
}

fn read_hex4(chars: &mut std::str::Chars<'_>) -> Result<u32> {
    let hex: String = chars.by_ref().take(4).collect();
    if hex.len() != 4 {
        return Err(json_error("invalid unicode escape: incomplete sequence".into()));
    }
    u32::from_str_radix(&hex, 16)
        .map_err(|_| json_error(format!("invalid unicode escape: \\u{}", hex)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<JsonToken<'_>> {
        let mut tokenizer = JsonTokenizer::new(input);
        let mut out = Vec::new();
        while let Some(token) = tokenizer.next_token().unwrap() {
            out.push(token);
        }
        out
    }

    #[test]
    fn tokenizes_object() {
        assert_eq!(
            tokens(r#"{"a": [1, -2.5e3], "b": null}"#),
            vec![
                JsonToken::ObjectStart,
                JsonToken::String(Cow::Borrowed("a")),
                JsonToken::Colon,
                JsonToken::ArrayStart,
                JsonToken::Number("1"),
                JsonToken::Comma,
                JsonToken::Number("-2.5e3"),
                JsonToken::ArrayEnd,
                JsonToken::Comma,
                JsonToken::String(Cow::Borrowed("b")),
                JsonToken::Colon,
                JsonToken::Null,
                JsonToken::ObjectEnd,
            ]
        );
    }

    #[test]
    fn numbers_keep_source_text() {
        assert_eq!(
            tokens("9007199254740993"),
            vec![JsonToken::Number("9007199254740993")]
        );
    }

    #[test]
    fn peek_does_not_consume() {
        let mut tokenizer = JsonTokenizer::new(" [true]");
        assert_eq!(tokenizer.peek_token().unwrap(), Some(&JsonToken::ArrayStart));
        assert_eq!(tokenizer.position(), 1);
        assert_eq!(tokenizer.next_token().unwrap(), Some(JsonToken::ArrayStart));
        assert_eq!(tokenizer.next_token().unwrap(), Some(JsonToken::Bool(true)));
    }

    #[test]
    fn skip_value_consumes_nested() {
        let mut tokenizer = JsonTokenizer::new(r#"{"x": [1, {"y": 2}]} 7"#);
        tokenizer.skip_value(8).unwrap();
        assert_eq!(tokenizer.next_token().unwrap(), Some(JsonToken::Number("7")));
    }

    #[test]
    fn skip_value_enforces_depth() {
        let mut tokenizer = JsonTokenizer::new("[[[[1]]]]");
        let err = tokenizer.skip_value(2).unwrap_err();
        assert!(matches!(
            FormatError::of(&err),
            Some(FormatError::NestingTooDeep(2))
        ));
    }

    #[test]
    fn unescapes_strings() {
        assert_eq!(unescape_string(r#"a\nb\u0041"#).unwrap(), "a\nbA");
        assert_eq!(unescape_string(r#"\ud83d\ude00"#).unwrap(), "\u{1F600}");
        assert!(unescape_string(r#"\q"#).is_err());
    }

    #[test]
    fn errors_carry_position() {
        let mut tokenizer = JsonTokenizer::new("  @");
        let err = tokenizer.next_token().unwrap_err();
        assert!(err.to_string().contains("position 2"));
    }
}
