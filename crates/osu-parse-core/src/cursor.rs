//! Bounds-checked reader over an immutable byte buffer
//!
//! Both file formats go through this cursor. `.osr` replays use the binary
//! helpers (little-endian integers, ULEB128, osu! strings, LZMA blocks) and
//! `.osu` beatmaps use [`ByteCursor::read_line`].
//!
//! osu! strings are encoded as:
//! - `0x00`: absent string
//! - `0x0b`: string follows (ULEB128 length, then UTF-8 bytes)

use crate::error::{Error, Result};

const STRING_ABSENT: u8 = 0x00;
const STRING_PRESENT: u8 = 0x0b;

/// Read cursor over a byte slice. All integer reads are little-endian.
///
/// The cursor only holds the borrowed buffer and an offset; it never copies
/// the underlying data.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Remaining bytes from the current offset.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Skip `n` bytes forward.
    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Read a slice of `n` bytes without copying.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Read exactly `len` bytes as UTF-8.
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String> {
        let offset = self.pos;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::malformed(offset, format!("invalid UTF-8 in string: {}", e)))
    }

    /// Read a ULEB128 (unsigned LEB128) encoded length.
    ///
    /// 7 bits per byte for data, high bit as continuation flag.
    pub fn read_uleb128(&mut self) -> Result<u32> {
        let offset = self.pos;
        let mut result: u64 = 0;
        let mut shift = 0;

        loop {
            let byte = self.read_u8()?;
            result |= u64::from(byte & 0x7F) << shift;

            if byte & 0x80 == 0 {
                break;
            }

            shift += 7;
            if shift >= 35 {
                return Err(Error::malformed(offset, "ULEB128 value too large"));
            }
        }

        u32::try_from(result).map_err(|_| Error::malformed(offset, "ULEB128 value too large"))
    }

    /// Read an osu! format string; `None` for the absent marker.
    ///
    /// A length prefix pointing past the end of the buffer is reported as
    /// malformed rather than as a plain EOF since the prefix itself is the
    /// inconsistency.
    pub fn read_var_string(&mut self) -> Result<Option<String>> {
        let offset = self.pos;
        match self.read_u8()? {
            STRING_ABSENT => Ok(None),
            STRING_PRESENT => {
                let length = self.read_uleb128()? as usize;
                if length > self.remaining() {
                    return Err(Error::malformed(
                        offset,
                        format!(
                            "string length {} exceeds remaining {} bytes",
                            length,
                            self.remaining()
                        ),
                    ));
                }
                self.read_fixed_string(length).map(Some)
            }
            other => Err(Error::malformed(
                offset,
                format!("unknown string marker: 0x{:02x}", other),
            )),
        }
    }

    /// Read the next text line without its terminator (`\n` or `\r\n`).
    ///
    /// Returns `None` once the buffer is exhausted.
    pub fn read_line(&mut self) -> Option<&'a [u8]> {
        if self.is_empty() {
            return None;
        }

        let rest = &self.data[self.pos..];
        let (line, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(idx) => (&rest[..idx], idx + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;

        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }

    /// Decompress the next `len` bytes as an LZMA stream.
    pub fn read_compressed_block(&mut self, len: usize) -> Result<Vec<u8>> {
        let offset = self.pos;
        let block = self.read_bytes(len)?;
        decompress_lzma(block).map_err(|e| match e {
            Error::MalformedEncoding { reason, .. } => Error::MalformedEncoding { offset, reason },
            other => other,
        })
    }

    fn ensure(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::UnexpectedEof {
                offset: self.pos,
                need: n,
                have: self.remaining(),
            });
        }
        Ok(())
    }
}

/// Decompress a standalone LZMA ("lzma-alone") stream.
pub fn decompress_lzma(block: &[u8]) -> Result<Vec<u8>> {
    if block.is_empty() {
        return Ok(Vec::new());
    }

    let mut input = block;
    let mut output = Vec::new();
    lzma_rs::lzma_decompress(&mut input, &mut output)
        .map_err(|e| Error::malformed(0, format!("LZMA decode failed: {}", e)))?;
    Ok(output)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Byte writers mirroring the cursor's reads, for building fixtures.

    pub fn write_uleb128(buf: &mut Vec<u8>, mut value: u32) {
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            buf.push(byte);
            if value == 0 {
                break;
            }
        }
    }

    pub fn write_string(buf: &mut Vec<u8>, s: &str) {
        if s.is_empty() {
            buf.push(0x00);
        } else {
            buf.push(0x0b);
            write_uleb128(buf, s.len() as u32);
            buf.extend_from_slice(s.as_bytes());
        }
    }

    pub fn compress_lzma(data: &[u8]) -> Vec<u8> {
        let mut input = data;
        let mut output = Vec::new();
        lzma_rs::lzma_compress(&mut input, &mut output).unwrap();
        output
    }
}
