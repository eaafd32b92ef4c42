//! Little-endian binary primitives for the image format
//!
//! The full file is wrapped in a zlib (deflate, default parameters) envelope.
//! Every other primitive is read/written little-endian: signed 32-bit int,
//! unsigned 32-bit int, signed 64-bit int, IEEE-754 binary64, a single byte,
//! a single UTF-16 code unit stored as 32 bits, and a length-prefixed string
//! (signed 32-bit byte count followed by UTF-8 payload, decoded to a wide
//! `String`).

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::FatalError;

/// A cursor over decompressed image bytes.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], FatalError> {
        if self.remaining() < n {
            return Err(FatalError::ImageInvalid(format!(
                "truncated image: needed {n} bytes at offset {}, had {}",
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_byte(&mut self) -> Result<u8, FatalError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, FatalError> {
        Ok(self.read_byte()? != 0)
    }

    pub fn read_i32(&mut self) -> Result<i32, FatalError> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, FatalError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i64(&mut self) -> Result<i64, FatalError> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes(b.try_into().unwrap()))
    }

    pub fn read_f64(&mut self) -> Result<f64, FatalError> {
        let b = self.take(8)?;
        Ok(f64::from_le_bytes(b.try_into().unwrap()))
    }

    /// A single UTF-16 code unit, encoded on-disk as a 32-bit little-endian
    /// word (the image format never packs code units tightly).
    pub fn read_utf16_unit(&mut self) -> Result<u16, FatalError> {
        let v = self.read_u32()?;
        u16::try_from(v)
            .map_err(|_| FatalError::ImageInvalid(format!("UTF-16 code unit out of range: {v}")))
    }

    /// A length-prefixed UTF-8 string: signed 32-bit byte count, then that
    /// many UTF-8 bytes, decoded to a wide `String`.
    pub fn read_string(&mut self) -> Result<String, FatalError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(FatalError::ImageInvalid(format!(
                "negative string length prefix: {len}"
            )));
        }
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| FatalError::ImageInvalid(format!("invalid UTF-8 string: {e}")))
    }
}

/// An append-only byte buffer used to build an image before compression.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_byte(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_byte(v as u8);
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_utf16_unit(&mut self, v: u16) {
        self.write_u32(v as u32);
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_i32(s.len() as i32);
        self.buf.extend_from_slice(s.as_bytes());
    }
}

/// Decompress a zlib-wrapped image file into its raw byte stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, FatalError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| FatalError::ImageInvalid(format!("zlib decompression failed: {e}")))?;
    Ok(out)
}

/// Compress a raw image byte stream with zlib deflate at default
/// parameters, matching the envelope `decompress` expects.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, FatalError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| FatalError::ImageInvalid(format!("zlib compression failed: {e}")))?;
    encoder
        .finish()
        .map_err(|e| FatalError::ImageInvalid(format!("zlib compression failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_primitives() {
        let mut w = Writer::new();
        w.write_i32(-42);
        w.write_u32(7);
        w.write_i64(i64::MIN);
        w.write_f64(std::f64::consts::PI);
        w.write_byte(0xAB);
        w.write_bool(true);
        w.write_utf16_unit(0x4E2D);
        w.write_string("hello\u{1F600}");
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        assert_eq!(r.read_i32().unwrap(), -42);
        assert_eq!(r.read_u32().unwrap(), 7);
        assert_eq!(r.read_i64().unwrap(), i64::MIN);
        assert_eq!(r.read_f64().unwrap(), std::f64::consts::PI);
        assert_eq!(r.read_byte().unwrap(), 0xAB);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_utf16_unit().unwrap(), 0x4E2D);
        assert_eq!(r.read_string().unwrap(), "hello\u{1F600}");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn truncated_input_is_invalid() {
        let mut r = Reader::new(&[1, 2, 3]);
        assert!(r.read_i64().is_err());
    }

    #[test]
    fn compression_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn bad_compressed_data_is_invalid() {
        assert!(decompress(&[1, 2, 3, 4]).is_err());
    }
}
