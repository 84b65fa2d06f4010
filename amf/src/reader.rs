use bytes::{Buf, Bytes};

use crate::DecodingError;

/// Array slots sparse ECMA arrays may add across one buffer, raised to the
/// buffer length for larger buffers.
const SPARSE_SLOT_BUDGET: u64 = 1 << 20;

/// Big-endian cursor over an in-memory AMF buffer.
///
/// Every read checks the remaining length first and fails with
/// [`DecodingError::IncompleteData`] instead of returning partial data.
#[derive(Debug, Clone)]
pub struct AmfReader {
    buf: Bytes,
    len: usize,
    // Shared by every value decoded from this buffer.
    sparse_slots: u64,
}

impl AmfReader {
    pub fn new(buf: Bytes) -> Self {
        Self {
            len: buf.len(),
            sparse_slots: SPARSE_SLOT_BUDGET.max(buf.len() as u64),
            buf,
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.len - self.buf.remaining()
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    /// Unread part of the buffer.
    pub fn into_remaining(self) -> Bytes {
        self.buf
    }

    /// Takes `count` array slots from the buffer-wide budget, `false` once it is spent.
    pub(crate) fn reserve_sparse_slots(&mut self, count: u64) -> bool {
        match self.sparse_slots.checked_sub(count) {
            Some(left) => {
                self.sparse_slots = left;
                true
            }
            None => false,
        }
    }

    fn ensure(&self, needed: usize) -> Result<(), DecodingError> {
        if self.buf.remaining() < needed {
            return Err(DecodingError::IncompleteData {
                offset: self.position(),
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodingError> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodingError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodingError> {
        self.ensure(2)?;
        Ok(self.buf.get_u16())
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodingError> {
        self.ensure(2)?;
        Ok(self.buf.get_i16())
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodingError> {
        self.ensure(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodingError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodingError> {
        self.ensure(8)?;
        Ok(self.buf.get_f64())
    }

    /// Splits off the next `size` bytes without copying.
    pub fn read_bytes(&mut self, size: usize) -> Result<Bytes, DecodingError> {
        self.ensure(size)?;
        Ok(self.buf.split_to(size))
    }

    pub fn read_utf8(&mut self, size: usize) -> Result<String, DecodingError> {
        let offset = self.position();
        let bytes = self.read_bytes(size)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodingError::InvalidUtf8 { offset })
    }

    /// u16 length-prefixed UTF-8 string.
    pub fn read_short_string(&mut self) -> Result<String, DecodingError> {
        let size = self.read_u16()? as usize;
        self.read_utf8(size)
    }

    /// u32 length-prefixed UTF-8 string.
    pub fn read_long_string(&mut self) -> Result<String, DecodingError> {
        let size = self.read_u32()? as usize;
        self.read_utf8(size)
    }
}
