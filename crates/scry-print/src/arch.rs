//! Architecture description of the target process.
//!
//! The printer needs to know how wide pointers are and how to assemble
//! multi-byte primitives out of target memory; everything else about the
//! target architecture is someone else's business.

/// Architecture information for value decoding.
#[derive(Debug, Clone, Copy)]
pub struct Arch {
    /// Pointer size in bytes.
    pub pointer_size: i64,
    /// Is the target big endian?
    pub big_endian: bool,
}

impl Default for Arch {
    fn default() -> Self {
        Self::lp64()
    }
}

impl Arch {
    /// LP64 little-endian (Linux/macOS 64-bit).
    pub fn lp64() -> Self {
        Arch {
            pointer_size: 8,
            big_endian: false,
        }
    }

    /// ILP32 little-endian (32-bit).
    pub fn ilp32() -> Self {
        Arch {
            pointer_size: 4,
            big_endian: false,
        }
    }

    pub fn uint16(&self, b: &[u8]) -> u16 {
        if self.big_endian {
            u16::from_be_bytes([b[0], b[1]])
        } else {
            u16::from_le_bytes([b[0], b[1]])
        }
    }

    pub fn uint32(&self, b: &[u8]) -> u32 {
        if self.big_endian {
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        } else {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        }
    }

    pub fn uint64(&self, b: &[u8]) -> u64 {
        if self.big_endian {
            u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        } else {
            u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        }
    }

    /// A pointer-sized unsigned integer.
    pub fn uintptr(&self, b: &[u8]) -> u64 {
        match self.pointer_size {
            4 => self.uint32(b) as u64,
            _ => self.uint64(b),
        }
    }

    pub fn float32(&self, b: &[u8]) -> f32 {
        f32::from_bits(self.uint32(b))
    }

    pub fn float64(&self, b: &[u8]) -> f64 {
        f64::from_bits(self.uint64(b))
    }

    /// Real and imaginary parts of an 8-byte complex value.
    pub fn complex64(&self, b: &[u8]) -> (f32, f32) {
        (self.float32(&b[..4]), self.float32(&b[4..8]))
    }

    /// Real and imaginary parts of a 16-byte complex value.
    pub fn complex128(&self, b: &[u8]) -> (f64, f64) {
        (self.float64(&b[..8]), self.float64(&b[8..16]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_decoding() {
        let arch = Arch::lp64();
        assert_eq!(arch.uint16(&[0x34, 0x12]), 0x1234);
        assert_eq!(arch.uint32(&[0x78, 0x56, 0x34, 0x12]), 0x12345678);
        assert_eq!(
            arch.uintptr(&[1, 0, 0, 0, 0, 0, 0, 0x80]),
            0x8000_0000_0000_0001
        );
    }

    #[test]
    fn big_endian_decoding() {
        let arch = Arch {
            pointer_size: 4,
            big_endian: true,
        };
        assert_eq!(arch.uint16(&[0x12, 0x34]), 0x1234);
        assert_eq!(arch.uintptr(&[0x12, 0x34, 0x56, 0x78]), 0x12345678);
    }

    #[test]
    fn float_decoding() {
        let arch = Arch::lp64();
        assert_eq!(arch.float32(&3.25f32.to_le_bytes()), 3.25);
        assert_eq!(arch.float64(&(-1.5f64).to_le_bytes()), -1.5);
    }

    #[test]
    fn complex_decoding() {
        let arch = Arch::lp64();
        let mut b = Vec::new();
        b.extend_from_slice(&1.5f32.to_le_bytes());
        b.extend_from_slice(&(-2.0f32).to_le_bytes());
        assert_eq!(arch.complex64(&b), (1.5, -2.0));

        let mut b = Vec::new();
        b.extend_from_slice(&3.0f64.to_le_bytes());
        b.extend_from_slice(&4.0f64.to_le_bytes());
        assert_eq!(arch.complex128(&b), (3.0, 4.0));
    }
}
