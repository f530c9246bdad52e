use crate::VwbError;

/// A forward-only cursor over little-endian fields.
#[derive(Clone)]
#[repr(transparent)]
pub struct VwbReader<'a>(&'a [u8]);

impl<'a> VwbReader<'a> {
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self(data)
    }

    #[inline]
    pub const fn remaining(&self) -> &'a [u8] {
        self.0
    }

    pub fn skip(&mut self, len: usize) -> Result<&mut Self, VwbError> {
        self.take(len)?;
        Ok(self)
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], VwbError> {
        let (head, tail) = self.0.split_at_checked(len).ok_or(VwbError::TruncatedInput)?;
        self.0 = tail;
        Ok(head)
    }

    pub fn read_u32(&mut self) -> Result<u32, VwbError> {
        let (head, tail) = self
            .0
            .split_first_chunk()
            .ok_or(VwbError::TruncatedInput)?;
        self.0 = tail;
        Ok(u32::from_le_bytes(*head))
    }
}

#[test]
fn test_reader() {
    let data = [1, 0, 0, 0, 0xff, 0xff, 0xff, 0x7f, 9];
    let mut reader = VwbReader::new(&data);
    assert_eq!(reader.read_u32(), Ok(1));
    assert_eq!(reader.read_u32(), Ok(i32::MAX as u32));
    assert_eq!(reader.read_u32(), Err(VwbError::TruncatedInput));
    // a failed read consumes nothing
    assert_eq!(reader.remaining(), &[9]);
    assert!(reader.skip(2).is_err());
    assert_eq!(reader.take(1), Ok(&[9][..]));
    assert!(reader.remaining().is_empty());
}
