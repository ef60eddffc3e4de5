//! # turrecord Configuration Constants
//!
//! This module centralizes the numeric and textual constants of the record
//! format. Values that depend on each other are co-located and checked with
//! compile-time assertions.
//!
//! ## Dependency Graph
//!
//! ```text
//! MAX_BUILTIN_SCHEMA_ID (999)
//!       │
//!       └─> FIRST_DYNAMIC_SCHEMA_ID (5000, must be >)
//!             Dynamically registered schemas never collide with the
//!             built-in catalog, so catalog reads need no lock.
//!
//! VARINT_MAX (2^30 - 1)
//!       │
//!       ├─> VARINT_1_BYTE_LIMIT (128)
//!       └─> VARINT_2_BYTE_LIMIT (16384)
//!             A record larger than VARINT_MAX cannot be framed.
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use crate::config::{FIRST_DYNAMIC_SCHEMA_ID, VARINT_MAX};
//! ```

// ============================================================================
// SCHEMA IDENTIFIERS
// Built-in ids and dynamic ids must never overlap
// ============================================================================

/// Id carried by a schema that has not been registered anywhere.
pub const UNREGISTERED_SCHEMA_ID: i32 = -1;

/// Highest id reserved for the built-in catalog.
pub const MAX_BUILTIN_SCHEMA_ID: i32 = 999;

/// First id handed out by a mutable registry.
pub const FIRST_DYNAMIC_SCHEMA_ID: i32 = 5000;

const _: () = assert!(
    FIRST_DYNAMIC_SCHEMA_ID > MAX_BUILTIN_SCHEMA_ID,
    "dynamic schema ids must start above the built-in range"
);

// ============================================================================
// SIZE CODEC
// Tier limits of the three-width varint
// ============================================================================

/// Values below this limit encode in one byte.
pub const VARINT_1_BYTE_LIMIT: usize = 1 << 7;

/// Values below this limit encode in two bytes.
pub const VARINT_2_BYTE_LIMIT: usize = 1 << 14;

/// Largest value the four-byte tier can carry (30 payload bits).
pub const VARINT_MAX: usize = (1 << 30) - 1;

const _: () = assert!(VARINT_1_BYTE_LIMIT < VARINT_2_BYTE_LIMIT);
const _: () = assert!(VARINT_2_BYTE_LIMIT < VARINT_MAX);

// ============================================================================
// TRAVERSAL LIMITS
// ============================================================================

/// Maximum nesting of records processed recursively (JSON reading, deep
/// copies, equality). Protects the stack against hostile inputs.
pub const MAX_NESTING_DEPTH: usize = 64;

// ============================================================================
// JSON REPRESENTATION
// ============================================================================

/// Member carrying the schema name of an object record.
pub const JSON_SCHEMA_KEY: &str = "@schema";

/// Member carrying the payload schema name of a Variable envelope.
pub const JSON_DATA_SCHEMA_KEY: &str = "@dataSchema";

/// Member carrying the payload of a Variable envelope.
pub const JSON_DATA_KEY: &str = "@data";

/// Separator between segments of a navigation path.
pub const PATH_SEPARATOR: char = '/';
