//! # Fixed-Width Decimal
//!
//! A 96-bit scaled integer stored in 16 bytes:
//!
//! ```text
//! +----------------------+----------+-------+------+
//! | Magnitude (96 bit LE)| Reserved | Scale | Sign |
//! | bytes 0-11           | 12-13    | 14    | 15   |
//! +----------------------+----------+-------+------+
//! ```
//!
//! The sign byte is `0x80` for negative values and `0x00` otherwise. Scale is
//! the number of fractional decimal digits (0-28). Equality is numeric:
//! `1.50 == 1.5`.

use std::fmt;
use std::str::FromStr;

use eyre::{bail, ensure, Result};

/// Largest magnitude representable in 96 bits.
pub const DECIMAL_MAX_MAGNITUDE: u128 = (1u128 << 96) - 1;

/// Largest supported scale.
pub const DECIMAL_MAX_SCALE: u8 = 28;

const SIGN_NEGATIVE: u8 = 0x80;

#[derive(Debug, Clone, Copy, Default)]
pub struct Decimal {
    mantissa: i128,
    scale: u8,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        mantissa: 0,
        scale: 0,
    };

    pub fn new(mantissa: i128, scale: u8) -> Result<Self> {
        ensure!(
            mantissa.unsigned_abs() <= DECIMAL_MAX_MAGNITUDE,
            "decimal mantissa {} exceeds 96 bits",
            mantissa
        );
        ensure!(
            scale <= DECIMAL_MAX_SCALE,
            "decimal scale {} exceeds maximum {}",
            scale,
            DECIMAL_MAX_SCALE
        );
        Ok(Self { mantissa, scale })
    }

    pub fn from_i64(value: i64) -> Self {
        Self {
            mantissa: value as i128,
            scale: 0,
        }
    }

    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa < 0
    }

    pub fn to_f64(&self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.scale as i32)
    }

    pub fn from_f64(value: f64) -> Result<Self> {
        ensure!(value.is_finite(), "cannot represent {} as decimal", value);
        value.to_string().parse()
    }

    /// Integer part, truncated toward zero.
    pub fn trunc(&self) -> i128 {
        self.mantissa / 10i128.pow(self.scale as u32)
    }

    pub fn is_integral(&self) -> bool {
        self.mantissa % 10i128.pow(self.scale as u32) == 0
    }

    /// Removes trailing fractional zeros.
    pub fn normalize(&self) -> Self {
        let mut mantissa = self.mantissa;
        let mut scale = self.scale;
        while scale > 0 && mantissa % 10 == 0 {
            mantissa /= 10;
            scale -= 1;
        }
        Self { mantissa, scale }
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        let magnitude = self.mantissa.unsigned_abs();
        out[..12].copy_from_slice(&magnitude.to_le_bytes()[..12]);
        out[14] = self.scale;
        out[15] = if self.mantissa < 0 { SIGN_NEGATIVE } else { 0 };
        out
    }

    pub fn from_bytes(bytes: &[u8; 16]) -> Result<Self> {
        let mut wide = [0u8; 16];
        wide[..12].copy_from_slice(&bytes[..12]);
        let magnitude = u128::from_le_bytes(wide) as i128;
        let scale = bytes[14];
        let mantissa = match bytes[15] {
            0 => magnitude,
            SIGN_NEGATIVE => -magnitude,
            other => bail!("invalid decimal sign byte 0x{:02X}", other),
        };
        Self::new(mantissa, scale)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        let a = self.normalize();
        let b = other.normalize();
        a.mantissa == b.mantissa && a.scale == b.scale
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.unsigned_abs().to_string();
        let sign = if self.mantissa < 0 { "-" } else { "" };
        let scale = self.scale as usize;
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

impl FromStr for Decimal {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        ensure!(!body.is_empty(), "empty decimal literal");

        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        ensure!(
            !(int_part.is_empty() && frac_part.is_empty()),
            "invalid decimal literal '{}'",
            s
        );
        ensure!(
            int_part.bytes().all(|b| b.is_ascii_digit())
                && frac_part.bytes().all(|b| b.is_ascii_digit()),
            "invalid decimal literal '{}'",
            s
        );
        ensure!(
            frac_part.len() <= DECIMAL_MAX_SCALE as usize,
            "decimal literal '{}' has more than {} fractional digits",
            s,
            DECIMAL_MAX_SCALE
        );

        let mut magnitude: u128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            magnitude = magnitude
                .checked_mul(10)
                .and_then(|m| m.checked_add((b - b'0') as u128))
                .filter(|m| *m <= DECIMAL_MAX_MAGNITUDE)
                .ok_or_else(|| eyre::eyre!("decimal literal '{}' exceeds 96 bits", s))?;
        }

        let mantissa = if negative {
            -(magnitude as i128)
        } else {
            magnitude as i128
        };
        Self::new(mantissa, frac_part.len() as u8)
    }
}
