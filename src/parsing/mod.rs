//! # Text Parsing
//!
//! Token-level JSON reading used by the editable factory.
//!
//! ## Module Structure
//!
//! - `json`: pull tokenizer with zero-copy strings and raw number text
//!
//! ## Error Handling
//!
//! All parsing functions return `eyre::Result`; malformed input is reported
//! as `FormatError::Json` with the byte position:
//!
//! ```ignore
//! // "json: expected ':' after object key at position 15"
//! ```

pub mod json;

pub use json::{unescape_string, JsonToken, JsonTokenizer};
