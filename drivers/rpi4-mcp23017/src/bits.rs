//! Single-bit edits on register bytes

/// Return `origin` with `bit` forced to `value`, the other seven bits untouched.
///
/// Only the low three bits of `bit` are used.
pub const fn set_bit(origin: u8, bit: u8, value: bool) -> u8 {
    let mask = 1u8 << (bit & 7);
    let cleared = origin & !mask;
    if value {
        cleared | mask
    } else {
        cleared
    }
}

/// Whether `bit` of `byte` is set
pub const fn bit_is_set(byte: u8, bit: u8) -> bool {
    byte & (1u8 << (bit & 7)) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_bit_touches_only_target() {
        for origin in 0..=u8::MAX {
            for bit in 0..8 {
                for value in [false, true] {
                    let edited = set_bit(origin, bit, value);
                    assert_eq!(bit_is_set(edited, bit), value);
                    let others = !(1u8 << bit);
                    assert_eq!(edited & others, origin & others);
                }
            }
        }
    }

    #[test]
    fn test_set_bit_idempotent() {
        for origin in 0..=u8::MAX {
            for bit in 0..8 {
                for value in [false, true] {
                    let once = set_bit(origin, bit, value);
                    assert_eq!(set_bit(once, bit, value), once);
                }
            }
        }
    }

    #[test]
    fn test_bit_seven() {
        assert_eq!(set_bit(0x00, 7, true), 0x80);
        assert_eq!(set_bit(0xFF, 7, false), 0x7F);
        assert_eq!(set_bit(0x7F, 7, true), 0xFF);
    }

    #[test]
    fn test_clear_keeps_lower_bits() {
        // Shifting a 0b11111110 mask would also wipe the bits below the target.
        assert_eq!(set_bit(0xFF, 3, false), 0xF7);
        assert_eq!(set_bit(0x0F, 2, false), 0x0B);
    }
}
