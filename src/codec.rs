//! Little-endian, length-prefixed binary encoding of the on-image records.
//!
//! Integers are written at their declared width, booleans as one byte, and
//! strings as a u64 byte length followed by the raw bytes. The format is
//! self-describing as long as reader and writer agree on these widths.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{FsError, Result};

pub fn put_u8(buf: &mut Vec<u8>, value: u8) {
    buf.push(value);
}

pub fn put_bool(buf: &mut Vec<u8>, value: bool) {
    buf.push(value as u8);
}

pub fn put_u16(buf: &mut Vec<u8>, value: u16) {
    let mut bytes = [0u8; 2];
    LittleEndian::write_u16(&mut bytes, value);
    buf.extend_from_slice(&bytes);
}

pub fn put_i16(buf: &mut Vec<u8>, value: i16) {
    let mut bytes = [0u8; 2];
    LittleEndian::write_i16(&mut bytes, value);
    buf.extend_from_slice(&bytes);
}

pub fn put_i64(buf: &mut Vec<u8>, value: i64) {
    let mut bytes = [0u8; 8];
    LittleEndian::write_i64(&mut bytes, value);
    buf.extend_from_slice(&bytes);
}

pub fn put_string(buf: &mut Vec<u8>, value: &str) {
    let mut bytes = [0u8; 8];
    LittleEndian::write_u64(&mut bytes, value.len() as u64);
    buf.extend_from_slice(&bytes);
    buf.extend_from_slice(value.as_bytes());
}

/// Reads fields back out of a byte buffer, advancing an offset. Fails only
/// when the buffer is too short for the requested field.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.buf.len() - self.offset {
            return Err(FsError::Truncated);
        }
        let bytes = &self.buf[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.take(1)?[0] != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.take(8)?))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = LittleEndian::read_u64(self.take(8)?);
        let len = usize::try_from(len).map_err(|_| FsError::Truncated)?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FsError::InvalidName)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut buf = Vec::new();
        put_u8(&mut buf, 1);
        put_bool(&mut buf, true);
        put_u16(&mut buf, 1024);
        put_i16(&mut buf, -1);
        put_i64(&mut buf, 1_700_000_000_000_000_000);
        put_string(&mut buf, "hello");

        let mut reader = ByteReader::new(&buf);
        assert_eq!(reader.read_u8().unwrap(), 1);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_u16().unwrap(), 1024);
        assert_eq!(reader.read_i16().unwrap(), -1);
        assert_eq!(reader.read_i64().unwrap(), 1_700_000_000_000_000_000);
        assert_eq!(reader.read_string().unwrap(), "hello");
        assert_eq!(reader.offset(), buf.len());
    }

    #[test]
    fn test_little_endian_layout() {
        let mut buf = Vec::new();
        put_u16(&mut buf, 0x0201);
        put_string(&mut buf, "ab");
        assert_eq!(buf[..2], [0x01, 0x02]);
        // String length is a u64, low byte first.
        assert_eq!(buf[2..10], [2, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&buf[10..], b"ab");
    }

    #[test]
    fn test_truncated() {
        let mut reader = ByteReader::new(&[0x05]);
        assert!(matches!(reader.read_i16(), Err(FsError::Truncated)));

        // A length prefix pointing past the end of the buffer.
        let mut buf = Vec::new();
        put_string(&mut buf, "hello");
        let mut reader = ByteReader::new(&buf[..buf.len() - 1]);
        assert!(matches!(reader.read_string(), Err(FsError::Truncated)));
    }
}
