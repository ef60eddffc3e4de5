//! # Three-Tier Size Codec
//!
//! Every variable-size construct of the record format (record sizes, list
//! counts, offset tables, string lengths) is framed with this codec. The width
//! is self-describing: the low bits of the first byte carry a tag.
//!
//! ## Encoding Format
//!
//! | Value Range        | Bytes | Stored Word (little-endian) |
//! |--------------------|-------|-----------------------------|
//! | 0 - 127            | 1     | `value << 1`                |
//! | 128 - 16383        | 2     | `(value << 2) \| 0b01`      |
//! | 16384 - 2^30-1     | 4     | `(value << 2) \| 0b11`      |
//!
//! ## Tag Interpretation
//!
//! ```text
//! bit0 == 0          -> 1 byte,  value = byte >> 1
//! bit1,bit0 == 0b01  -> 2 bytes, value = u16 >> 2
//! bit1,bit0 == 0b11  -> 4 bytes, value = u32 >> 2
//! ```
//!
//! ## Forced Width
//!
//! Record headers write several varints (size, count, offsets) with one shared
//! width so a reader can index the table directly. `encode_varint_with_width`
//! writes a value in any width wide enough for it; `width_for` picks the
//! smallest width that fits.
//!
//! ## Usage Example
//!
//! ```rust
//! use turrecord::encoding::varint::{decode_varint, encode_varint, varint_len};
//!
//! let mut buf = [0u8; 4];
//! let written = encode_varint(1000, &mut buf).unwrap();
//! assert_eq!(written, 2);
//! assert_eq!(varint_len(1000).unwrap(), 2);
//!
//! let (value, read) = decode_varint(&buf).unwrap();
//! assert_eq!((value, read), (1000, 2));
//! ```
//!
//! ## Error Handling
//!
//! - Values above [`VARINT_MAX`] fail with `FormatError::VarintOverflow`
//! - Truncated input fails with `FormatError::BufferOverrun`

use eyre::{bail, Result};

use crate::config::{VARINT_1_BYTE_LIMIT, VARINT_2_BYTE_LIMIT, VARINT_MAX};
use crate::error::FormatError;

/// Smallest width (1, 2 or 4 bytes) able to carry `value`.
pub fn varint_len(value: usize) -> Result<usize> {
    if value < VARINT_1_BYTE_LIMIT {
        Ok(1)
    } else if value < VARINT_2_BYTE_LIMIT {
        Ok(2)
    } else if value <= VARINT_MAX {
        Ok(4)
    } else {
        bail!(FormatError::VarintOverflow(value))
    }
}

/// Smallest width able to carry every value in `values`.
pub fn width_for(values: &[usize]) -> Result<usize> {
    let max = values.iter().copied().max().unwrap_or(0);
    varint_len(max)
}

/// True if `value` fits in a varint of `width` bytes.
pub fn fits_width(value: usize, width: usize) -> bool {
    match width {
        1 => value < VARINT_1_BYTE_LIMIT,
        2 => value < VARINT_2_BYTE_LIMIT,
        4 => value <= VARINT_MAX,
        _ => false,
    }
}

/// Encodes `value` with its minimal width, returning the bytes written.
pub fn encode_varint(value: usize, buf: &mut [u8]) -> Result<usize> {
    let width = varint_len(value)?;
    encode_varint_with_width(value, width, buf)
}

/// Encodes `value` with exactly `width` bytes.
pub fn encode_varint_with_width(value: usize, width: usize, buf: &mut [u8]) -> Result<usize> {
    if !fits_width(value, width) {
        if value > VARINT_MAX {
            bail!(FormatError::VarintOverflow(value));
        }
        bail!("value {} does not fit a {}-byte varint", value, width);
    }
    if buf.len() < width {
        bail!(FormatError::BufferOverrun {
            offset: 0,
            needed: width,
            len: buf.len(),
        });
    }
    match width {
        1 => buf[0] = (value << 1) as u8,
        2 => buf[..2].copy_from_slice(&(((value << 2) | 0b01) as u16).to_le_bytes()),
        _ => buf[..4].copy_from_slice(&(((value << 2) | 0b11) as u32).to_le_bytes()),
    }
    Ok(width)
}

/// Appends `value` with exactly `width` bytes.
pub fn push_varint_with_width(value: usize, width: usize, out: &mut Vec<u8>) -> Result<()> {
    let mut buf = [0u8; 4];
    let written = encode_varint_with_width(value, width, &mut buf)?;
    out.extend_from_slice(&buf[..written]);
    Ok(())
}

/// Appends `value` with its minimal width.
pub fn push_varint(value: usize, out: &mut Vec<u8>) -> Result<()> {
    push_varint_with_width(value, varint_len(value)?, out)
}

/// Width announced by the tag bits of a varint's first byte.
#[inline]
pub fn varint_width_from_tag(first: u8) -> usize {
    if first & 0b1 == 0 {
        1
    } else if first & 0b11 == 0b01 {
        2
    } else {
        4
    }
}

/// Decodes a varint at the start of `buf`, returning `(value, bytes_read)`.
pub fn decode_varint(buf: &[u8]) -> Result<(usize, usize)> {
    let Some(&first) = buf.first() else {
        bail!(FormatError::BufferOverrun {
            offset: 0,
            needed: 1,
            len: 0,
        });
    };
    let width = varint_width_from_tag(first);
    if buf.len() < width {
        bail!(FormatError::BufferOverrun {
            offset: 0,
            needed: width,
            len: buf.len(),
        });
    }
    let value = match width {
        1 => (first >> 1) as usize,
        2 => (u16::from_le_bytes([buf[0], buf[1]]) >> 2) as usize,
        _ => (u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) >> 2) as usize,
    };
    Ok((value, width))
}

/// Decodes a varint located at `offset` in `buf`.
pub fn decode_varint_at(buf: &[u8], offset: usize) -> Result<(usize, usize)> {
    if offset >= buf.len() {
        bail!(FormatError::BufferOverrun {
            offset,
            needed: 1,
            len: buf.len(),
        });
    }
    decode_varint(&buf[offset..]).map_err(|_| {
        eyre::Report::new(FormatError::BufferOverrun {
            offset,
            needed: varint_width_from_tag(buf[offset]),
            len: buf.len(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_len_tiers() {
        assert_eq!(varint_len(0).unwrap(), 1);
        assert_eq!(varint_len(127).unwrap(), 1);
        assert_eq!(varint_len(128).unwrap(), 2);
        assert_eq!(varint_len(16383).unwrap(), 2);
        assert_eq!(varint_len(16384).unwrap(), 4);
        assert_eq!(varint_len(VARINT_MAX).unwrap(), 4);
    }

    #[test]
    fn varint_len_overflow_fails() {
        let err = varint_len(VARINT_MAX + 1).unwrap_err();
        assert_eq!(
            FormatError::of(&err),
            Some(&FormatError::VarintOverflow(VARINT_MAX + 1))
        );
    }

    #[test]
    fn encode_single_byte() {
        let mut buf = [0u8; 4];
        assert_eq!(encode_varint(0, &mut buf).unwrap(), 1);
        assert_eq!(buf[0], 0);

        assert_eq!(encode_varint(127, &mut buf).unwrap(), 1);
        assert_eq!(buf[0], 254);
    }

    #[test]
    fn encode_two_byte() {
        let mut buf = [0u8; 4];
        assert_eq!(encode_varint(128, &mut buf).unwrap(), 2);
        assert_eq!(u16::from_le_bytes([buf[0], buf[1]]), (128 << 2) | 1);

        assert_eq!(encode_varint(16383, &mut buf).unwrap(), 2);
        assert_eq!(buf[0] & 0b11, 0b01);
    }

    #[test]
    fn encode_four_byte() {
        let mut buf = [0u8; 4];
        assert_eq!(encode_varint(16384, &mut buf).unwrap(), 4);
        assert_eq!(
            u32::from_le_bytes(buf),
            ((16384u32) << 2) | 0b11
        );
    }

    #[test]
    fn forced_width_is_decodable() {
        let mut buf = [0u8; 4];
        assert_eq!(encode_varint_with_width(5, 4, &mut buf).unwrap(), 4);
        assert_eq!(decode_varint(&buf).unwrap(), (5, 4));

        assert_eq!(encode_varint_with_width(5, 2, &mut buf).unwrap(), 2);
        assert_eq!(decode_varint(&buf).unwrap(), (5, 2));
    }

    #[test]
    fn forced_width_too_narrow_fails() {
        let mut buf = [0u8; 4];
        assert!(encode_varint_with_width(200, 1, &mut buf).is_err());
        assert!(encode_varint_with_width(20000, 2, &mut buf).is_err());
    }

    #[test]
    fn width_for_takes_largest() {
        assert_eq!(width_for(&[1, 2, 3]).unwrap(), 1);
        assert_eq!(width_for(&[1, 200, 3]).unwrap(), 2);
        assert_eq!(width_for(&[]).unwrap(), 1);
    }

    #[test]
    fn decode_truncated_fails() {
        let mut buf = [0u8; 4];
        encode_varint(20000, &mut buf).unwrap();
        assert!(decode_varint(&buf[..2]).is_err());
        assert!(decode_varint(&[]).is_err());
    }

    #[test]
    fn decode_at_reports_offset() {
        let buf = [0u8, 0b01];
        let err = decode_varint_at(&buf, 1).unwrap_err();
        assert!(matches!(
            FormatError::of(&err),
            Some(FormatError::BufferOverrun { offset: 1, .. })
        ));
    }

    #[test]
    fn roundtrip_boundary_values() {
        for &value in &[0usize, 1, 127, 128, 255, 16383, 16384, 1 << 20, VARINT_MAX] {
            let mut buf = [0u8; 4];
            let written = encode_varint(value, &mut buf).unwrap();
            let (decoded, read) = decode_varint(&buf).unwrap();
            assert_eq!(decoded, value, "value mismatch for {}", value);
            assert_eq!(written, read, "length mismatch for {}", value);
        }
    }
}
