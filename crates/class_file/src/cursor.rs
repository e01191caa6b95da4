use byteorder::{BigEndian, ByteOrder};

use crate::{ClassFileError, Result};

type Endian = BigEndian;

/// Forward-only reader over a borrowed class file buffer.
///
/// Every read either consumes exactly its width or fails with
/// [`ClassFileError::TruncatedInput`] without moving. There is no way to seek.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(Endian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(Endian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(Endian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(Endian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(Endian::read_i64(self.read_bytes(8)?))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ClassFileError::TruncatedInput {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }

        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_u16_vec(&mut self, count: u16) -> Result<Vec<u16>> {
        let bytes = self.read_bytes(count as usize * 2)?;
        let mut values = vec![0u16; count as usize];
        Endian::read_u16_into(bytes, &mut values);
        Ok(values)
    }
}
