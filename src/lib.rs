//! # turrecord - Self-Describing Binary Records
//!
//! turrecord encodes structured values into a compact binary layout driven by
//! schemas, and offers two views over the same bytes:
//!
//! - **Cursor**: a read-only, zero-copy view that navigates a record without
//!   decoding what it does not touch
//! - **Editable**: a mutable tree that is frozen into an immutable snapshot
//!   of known size and written out in one pass
//!
//! Bytes written by an `Editable` decode through a `Cursor` to the same
//! logical value, and a `Cursor` copied into an `Editable` writes back the
//! same bytes.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use turrecord::{Cursor, EditableFactory, SchemaBuilder, SchemaProvider, SchemaRegistry};
//!
//! let registry = Arc::new(SchemaRegistry::new()?);
//! let person = registry.add(
//!     SchemaBuilder::class("Person")
//!         .field("Age", registry.get_by_name("Int32")?)
//!         .nullable_field("Name", registry.get_by_name("String")?)
//!         .build()?,
//! )?;
//!
//! let factory = EditableFactory::new(registry.clone());
//! let mut record = factory.create(person.clone(), false)?;
//! record.set_field("Age", 42)?;
//! record.set_field("Name", "Ada")?;
//! let bytes = record.to_bytes()?;
//!
//! let cursor = Cursor::new(registry.clone(), person, &bytes)?;
//! assert_eq!(cursor.navigate_to("Name")?.get()?, "Ada".into());
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │   access (FieldAccess) │ mapping (codecs)  │
//! ├───────────────────────────────────────────┤
//! │  cursor (read)  │  editable + factory      │
//! ├───────────────────────────────────────────┤
//! │     schema + layout │ registry (providers) │
//! ├───────────────────────────────────────────┤
//! │  encoding (varint, bitmap) │ types │ json  │
//! └───────────────────────────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`types`]: data types and decoded values
//! - [`encoding`]: three-tier size varints and null bitmaps
//! - [`schema`]: schemas, fields and the layout pass
//! - [`registry`]: built-in catalog, mutable registry, caching provider
//! - [`cursor`]: zero-copy reader and JSON projection
//! - [`editable`]: mutable record trees and the writer
//! - [`factory`]: tree construction from schemas, cursors and JSON
//! - [`parsing`]: JSON token stream
//! - [`access`]: named field reads over either view
//! - [`mapping`]: application type to schema boundary
//! - [`config`]: reserved ids, limits and JSON keys
//! - [`error`]: the [`FormatError`] causes behind every `eyre::Report`

pub mod access;
pub mod config;
pub mod cursor;
pub mod editable;
pub mod encoding;
pub mod error;
pub mod factory;
pub mod mapping;
pub mod parsing;
pub mod registry;
pub mod schema;
pub mod types;

pub use access::FieldAccess;
pub use cursor::Cursor;
pub use editable::{Editable, EditableKind};
pub use error::{FormatError, SchemaKey};
pub use factory::EditableFactory;
pub use mapping::{RecordCodec, SchemaTypeMap, TypeMapRegistry};
pub use registry::{
    CachingSchemaProvider, SchemaCatalog, SchemaChange, SchemaChangeFeed, SchemaChangeListener,
    SchemaProvider, SchemaRegistry,
};
pub use schema::{ChoiceOption, ChoiceSet, Field, Schema, SchemaBuilder, SchemaId};
pub use types::{DataType, Decimal, Value};
