//! The device's unsigned 16-bit float: 10 mantissa bits, 6 exponent bits, no sign.
//!
//! The mantissa bits are stored least-significant first, so the low 10 bits of
//! the code read back in reverse order. The exponent is the top 6 bits, bias 63.

use std::sync::OnceLock;

const MANTISSA_BITS: u32 = 10;
const MANTISSA_SCALE: f64 = (1u32 << MANTISSA_BITS) as f64;
const EXPONENT_BIAS: i32 = 63;
const TABLE_LEN: usize = 1 << 16;

/// Decode one code without the table.
pub fn decode(code: u16) -> f64 {
    // low ten bits, bit order reversed
    let mantissa = (code & 0x03ff).reverse_bits() >> (16 - MANTISSA_BITS);
    // top six bits, biased
    let exponent = (code >> MANTISSA_BITS) as i32;
    (1.0 + mantissa as f64 / MANTISSA_SCALE) * 2f64.powi(exponent - EXPONENT_BIAS)
}

/// Every decoded value, indexed by code.
pub struct UFloat16Table {
    values: Box<[f64]>,
}

impl UFloat16Table {
    pub fn new() -> Self {
        let values: Vec<f64> = (0..TABLE_LEN).map(|code| decode(code as u16)).collect();
        Self { values: values.into_boxed_slice() }
    }

    /// Process-wide table, built on first use.
    pub fn shared() -> &'static UFloat16Table {
        static TABLE: OnceLock<UFloat16Table> = OnceLock::new();
        TABLE.get_or_init(UFloat16Table::new)
    }

    #[inline]
    pub fn get(&self, code: u16) -> f64 {
        self.values[code as usize]
    }

    /// Decode a run of little-endian codes. A trailing odd byte is ignored.
    pub fn decode_le_bytes(&self, raw: &[u8]) -> Vec<f64> {
        raw.chunks_exact(2).map(|c| self.get(u16::from_le_bytes([c[0], c[1]]))).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Default for UFloat16Table {
    fn default() -> Self {
        Self::new()
    }
}
