//! # turrecord Configuration Module
//!
//! Centralizes the constants shared by the codec, the schema layer and the
//! registries. Runtime configuration of a registry lives in
//! [`crate::registry::SchemaRegistryBuilder`].
//!
//! ## Module Organization
//!
//! - [`constants`]: reserved schema ids, varint tiers, traversal limits and
//!   JSON member names

pub mod constants;
pub use constants::*;
