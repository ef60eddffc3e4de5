//! # Encoding Module
//!
//! Low-level byte encodings shared by the cursor and the editable writer:
//!
//! - **Varint**: the three-tier size codec framing every variable-size value
//! - **Bitmap**: null-bitmap bit addressing

pub mod bitmap;
pub mod varint;

pub use bitmap::{bitmap_len, bit_is_set, set_bit};
pub use varint::{
    decode_varint, decode_varint_at, encode_varint, encode_varint_with_width, varint_len,
    width_for,
};
