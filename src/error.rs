//! # Error Taxonomy
//!
//! All fallible operations return `eyre::Result`. The distinct failure causes
//! of the record format are variants of [`FormatError`], raised as the root
//! cause of the report so callers can branch on them:
//!
//! ```ignore
//! match cursor.goto(7) {
//!     Err(e) if matches!(
//!         e.downcast_ref::<FormatError>(),
//!         Some(FormatError::IndexOutOfRange { .. })
//!     ) => { /* ... */ }
//!     other => { /* ... */ }
//! }
//! ```
//!
//! | Class | Variants |
//! |-------|----------|
//! | Structural | `Structural`, `StaleLayout` |
//! | Navigation | `IndexOutOfRange`, `UnknownField`, `BufferOverrun`, `NotPrimitive`, `NestingTooDeep` |
//! | Codec | `VarintOverflow`, `InvalidData` |
//! | Freeze state | `Frozen`, `NotFrozen` |
//! | Nullability | `NotNullable` |
//! | Lookup | `SchemaNotFound`, `DuplicateSchema` |
//! | Coercion | `Conversion`, `TypeMismatch` |
//! | JSON | `Json` |

use thiserror::Error;

use crate::types::DataType;

/// Key of a failed schema lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaKey {
    Id(i32),
    Name(String),
}

impl std::fmt::Display for SchemaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaKey::Id(id) => write!(f, "id {}", id),
            SchemaKey::Name(name) => write!(f, "name '{}'", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormatError {
    #[error("structural error in schema '{schema}': {reason}")]
    Structural { schema: String, reason: String },

    #[error("schema '{0}' was modified after layout; call update_layout() first")]
    StaleLayout(String),

    #[error("index {index} out of range for '{schema}' (count={count})")]
    IndexOutOfRange {
        schema: String,
        index: usize,
        count: usize,
    },

    #[error("schema '{schema}' has no field '{field}'")]
    UnknownField { schema: String, field: String },

    #[error("read of {needed} bytes at offset {offset} overruns buffer of {len} bytes")]
    BufferOverrun {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("value {0} exceeds the varint range")]
    VarintOverflow(usize),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("'{0}' is frozen, read-only")]
    Frozen(String),

    #[error("'{0}' requires frozen object")]
    NotFrozen(String),

    #[error("'{0}' is not nullable")]
    NotNullable(String),

    #[error("schema not found: {0}")]
    SchemaNotFound(SchemaKey),

    #[error("schema '{0}' already registered")]
    DuplicateSchema(String),

    #[error("cannot convert {value} to {target:?} for '{field}'")]
    Conversion {
        value: String,
        target: DataType,
        field: String,
    },

    #[error("'{schema}' is {actual:?}, expected {expected}")]
    TypeMismatch {
        schema: String,
        actual: DataType,
        expected: &'static str,
    },

    #[error("'{schema}' of type {data_type:?} is not a primitive value")]
    NotPrimitive { schema: String, data_type: DataType },

    #[error("nesting depth exceeds maximum {0}")]
    NestingTooDeep(usize),

    #[error("json: {0}")]
    Json(String),
}

impl FormatError {
    /// Returns the `FormatError` at the root of `report`, if there is one.
    pub fn of(report: &eyre::Report) -> Option<&FormatError> {
        report.downcast_ref::<FormatError>()
    }
}
