//! Null bitmap addressing.
//!
//! Bit `i` lives in byte `i / 8` at position `i % 8`. A set bit marks a
//! present (non-null) value; nullability is only consulted for slots whose
//! field or item type is nullable, so non-nullable slots always read as `0`.

#[inline]
pub fn bitmap_len(slots: usize) -> usize {
    slots.div_ceil(8)
}

#[inline]
pub fn bit_is_set(bitmap: &[u8], idx: usize) -> bool {
    (bitmap[idx / 8] & (1 << (idx % 8))) != 0
}

#[inline]
pub fn set_bit(bitmap: &mut [u8], idx: usize) {
    bitmap[idx / 8] |= 1 << (idx % 8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitmap_len_calculation() {
        assert_eq!(bitmap_len(0), 0);
        assert_eq!(bitmap_len(1), 1);
        assert_eq!(bitmap_len(8), 1);
        assert_eq!(bitmap_len(9), 2);
        assert_eq!(bitmap_len(17), 3);
    }

    #[test]
    fn set_and_read_bits() {
        let mut bitmap = vec![0u8; 2];
        set_bit(&mut bitmap, 0);
        set_bit(&mut bitmap, 9);
        assert_eq!(bitmap, vec![0b0000_0001, 0b0000_0010]);
        assert!(bit_is_set(&bitmap, 9));
        assert!(!bit_is_set(&bitmap, 8));
    }
}
