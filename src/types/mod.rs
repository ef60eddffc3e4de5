//! # Value Type System
//!
//! This module provides the closed [`DataType`] enumeration and the decoded
//! [`Value`] representation shared by cursors and editables.
//!
//! ## Module Structure
//!
//! - `data_type`: the `DataType` enum and intrinsic sizes
//! - `value`: `Value<'a>` with zero-copy text and binary variants
//! - `decimal`: 96-bit fixed-width decimal
//! - `timespan`: text form of TimeSpan values

pub mod data_type;
pub mod decimal;
pub mod timespan;
pub mod value;

pub use data_type::DataType;
pub use decimal::Decimal;
pub use timespan::{format_timespan, parse_timespan, timespan_micros};
pub use value::{parse_datetime, Value};
