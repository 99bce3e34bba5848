use crate::error::{DecodeError, DecodeResult};

/// Bounds-checked little-endian reader over a byte slice.
///
/// Every read advances the cursor; a short read fails with
/// [`DecodeError::Truncated`] and leaves the cursor where it was.
#[derive(Clone, Copy, Debug)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    what: &'static str,
}

impl<'a> Cursor<'a> {
    /// `what` names the structure being parsed and shows up in errors.
    pub fn new(buf: &'a [u8], what: &'static str) -> Self {
        Self { buf, pos: 0, what }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn take(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.buf.len()).ok_or(
            DecodeError::Truncated { what: self.what, need: n, have: self.remaining() },
        )?;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> DecodeResult<()> {
        self.take(n).map(|_| ())
    }

    fn array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> DecodeResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> DecodeResult<u16> {
        self.array().map(u16::from_le_bytes)
    }

    pub fn u32(&mut self) -> DecodeResult<u32> {
        self.array().map(u32::from_le_bytes)
    }

    pub fn i32(&mut self) -> DecodeResult<i32> {
        self.array().map(i32::from_le_bytes)
    }

    pub fn u64(&mut self) -> DecodeResult<u64> {
        self.array().map(u64::from_le_bytes)
    }

    pub fn f32(&mut self) -> DecodeResult<f32> {
        self.array().map(f32::from_le_bytes)
    }

    pub fn f64(&mut self) -> DecodeResult<f64> {
        self.array().map(f64::from_le_bytes)
    }

    /// Fixed-width ASCII field, cut at the first NUL.
    pub fn ascii(&mut self, n: usize) -> DecodeResult<String> {
        let what = self.what;
        ascii_field(self.take(n)?, what)
    }

    /// Fixed-width UTF-16LE field of `n` bytes, trailing NULs stripped.
    pub fn utf16(&mut self, n: usize) -> DecodeResult<String> {
        let what = self.what;
        utf16_field(self.take(n)?, what)
    }
}

/// Decode a NUL-padded ASCII field. Bytes above 0x7f are rejected: the device
/// only ever writes ASCII here, so anything else means the field was damaged.
pub fn ascii_field(raw: &[u8], what: &'static str) -> DecodeResult<String> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    if !raw.is_ascii() {
        return Err(DecodeError::Text { what });
    }
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

pub fn utf16_field(raw: &[u8], what: &'static str) -> DecodeResult<String> {
    if raw.len() % 2 != 0 {
        return Err(DecodeError::Text { what });
    }
    let units: Vec<u16> = raw.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
    let text = String::from_utf16(&units).map_err(|_| DecodeError::Text { what })?;
    Ok(text.trim_end_matches('\0').to_string())
}
