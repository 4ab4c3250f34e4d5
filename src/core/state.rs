use std::cell::Cell;

use crate::core::Error;

/// An append-only byte buffer every stateful component serializes itself
/// into and out of.
///
/// Values are stored little-endian with a write cursor and extracted with an
/// independent read cursor, so a freshly deserialized buffer can be drained
/// in the same order it was filled. Up to 8 boolean flags can be packed into
/// a single byte with [`StateBuffer::store_flags`].
///
/// Extraction is the only fallible operation: reading past the end of the
/// buffer returns [`Error::CorruptState`], which callers must treat as a
/// corrupt or incompatible save file.
/// ```
/// use famicore::core::StateBuffer;
/// let mut buf = StateBuffer::new();
/// buf.store_u16(0xC000);
/// buf.store_flags(&[true, false, true]);
/// assert_eq!(buf.extract_u16().unwrap(), 0xC000);
/// assert_eq!(buf.extract_flags(3).unwrap(), vec![true, false, true]);
/// ```
#[derive(Default)]
pub struct StateBuffer {
    buffer: Vec<u8>,
    read_index: Cell<usize>,
}

impl StateBuffer {
    pub fn new() -> StateBuffer {
        StateBuffer::default()
    }
    /// Wrap an existing byte sequence, e.g. one block of a save-state file.
    pub fn from_bytes(bytes: Vec<u8>) -> StateBuffer {
        StateBuffer {
            buffer: bytes,
            read_index: Cell::new(0),
        }
    }
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
    pub fn len(&self) -> usize {
        self.buffer.len()
    }
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn store_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }
    pub fn store_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }
    pub fn store_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }
    pub fn store_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }
    pub fn store_buffer(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }
    /// Pack up to 8 booleans into one byte, bit `i` holding `flags[i]`.
    pub fn store_flags(&mut self, flags: &[bool]) {
        debug_assert!(flags.len() <= 8);
        let mut packed = 0u8;
        for (i, flag) in flags.iter().enumerate() {
            if *flag {
                packed |= 1 << i;
            }
        }
        self.store_u8(packed);
    }

    fn extract_bytes(&self, count: usize) -> Result<&[u8], Error> {
        let start = self.read_index.get();
        if self.buffer.len() - start < count {
            return Err(Error::CorruptState);
        }
        self.read_index.set(start + count);
        Ok(&self.buffer[start..start + count])
    }

    pub fn extract_u8(&self) -> Result<u8, Error> {
        Ok(self.extract_bytes(1)?[0])
    }
    pub fn extract_u16(&self) -> Result<u16, Error> {
        let b = self.extract_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }
    pub fn extract_u32(&self) -> Result<u32, Error> {
        let b = self.extract_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
    pub fn extract_u64(&self) -> Result<u64, Error> {
        let b = self.extract_bytes(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }
    pub fn extract_buffer(&self, out: &mut [u8]) -> Result<(), Error> {
        out.copy_from_slice(self.extract_bytes(out.len())?);
        Ok(())
    }
    pub fn extract_vec(&self, count: usize) -> Result<Vec<u8>, Error> {
        Ok(self.extract_bytes(count)?.to_vec())
    }
    /// Extract `count` booleans previously packed with
    /// [`StateBuffer::store_flags`].
    pub fn extract_flags(&self, count: usize) -> Result<Vec<bool>, Error> {
        debug_assert!(count <= 8);
        let packed = self.extract_u8()?;
        Ok((0..count).map(|i| packed & (1 << i) != 0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut buf = StateBuffer::new();
        buf.store_u8(0xAB);
        buf.store_u16(0x1234);
        buf.store_u32(0xDEADBEEF);
        buf.store_u64(0x0123_4567_89AB_CDEF);
        buf.store_buffer(&[1, 2, 3]);
        let buf = StateBuffer::from_bytes(buf.into_bytes());
        assert_eq!(buf.extract_u8().unwrap(), 0xAB);
        assert_eq!(buf.extract_u16().unwrap(), 0x1234);
        assert_eq!(buf.extract_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(buf.extract_u64().unwrap(), 0x0123_4567_89AB_CDEF);
        let mut out = [0; 3];
        buf.extract_buffer(&mut out).unwrap();
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn test_flag_packing() {
        let mut buf = StateBuffer::new();
        let flags = [true, false, false, true, true, false, true, true];
        buf.store_flags(&flags);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.extract_flags(8).unwrap(), flags);
    }

    #[test]
    fn test_over_read_is_an_error() {
        let mut buf = StateBuffer::new();
        buf.store_u16(0xFFFF);
        assert!(buf.extract_u32().is_err());
        // A failed extract must not advance the cursor
        assert_eq!(buf.extract_u16().unwrap(), 0xFFFF);
        assert!(matches!(buf.extract_u8(), Err(Error::CorruptState)));
    }
}
