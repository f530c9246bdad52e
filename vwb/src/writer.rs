use crate::{pad, WeightBlobHeader, ALIGNMENT};
use internal::Internal;
use std::io::{Result, Write};

#[repr(transparent)]
pub struct VwbWriter<T: Write>(Internal<T>);

impl<T: Write> VwbWriter<T> {
    #[inline]
    pub fn new(writer: T) -> Self {
        Self(Internal::new(writer))
    }

    #[inline]
    pub const fn written_bytes(&self) -> usize {
        self.0.written_bytes()
    }

    #[inline]
    pub fn write_header(&mut self, header: &WeightBlobHeader) -> Result<()> {
        self.0.write_bytes(&header.to_bytes())
    }

    #[inline]
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.0.write_bytes(data)
    }

    pub fn write_padding(&mut self, alignment: usize) -> Result<()> {
        for _ in 0..pad(self.written_bytes(), alignment) {
            self.write_bytes(&[0])?;
        }
        Ok(())
    }

    /// Writes one tensor blob followed by its alignment padding.
    pub fn write_tensor(&mut self, blob: &[u8]) -> Result<()> {
        self.write_bytes(blob)?;
        self.write_padding(ALIGNMENT)
    }

    /// Flushes buffered bytes and returns the inner writer.
    #[inline]
    pub fn finish(self) -> Result<T> {
        self.0.finish()
    }
}

/// Payload bytes of a blob holding `tensors`, padding included.
pub fn payload_size<T: AsRef<[u8]>>(tensors: &[T]) -> usize {
    tensors.iter().fold(0, |cursor, t| {
        let cursor = cursor + t.as_ref().len();
        cursor + pad(cursor, ALIGNMENT)
    })
}

/// Writes a complete weight blob to `writer`, returning the bytes written.
///
/// # Panics
///
/// If the payload is larger than `u32::MAX` bytes.
pub fn write_weight_blob_to<W: Write, T: AsRef<[u8]>>(writer: W, tensors: &[T]) -> Result<usize> {
    let header = new_header(tensors);
    let mut writer = VwbWriter::new(writer);
    writer.write_header(&header)?;
    for t in tensors {
        writer.write_tensor(t.as_ref())?;
    }
    let ans = writer.written_bytes();
    writer.finish()?;
    Ok(ans)
}

/// Builds a complete weight blob in memory.
///
/// # Panics
///
/// If the payload is larger than `u32::MAX` bytes.
pub fn write_weight_blob<T: AsRef<[u8]>>(tensors: &[T]) -> Vec<u8> {
    let header = new_header(tensors);
    let mut ans = Vec::with_capacity(header.nbytes());
    ans.extend_from_slice(&header.to_bytes());
    for t in tensors {
        ans.extend_from_slice(t.as_ref());
        ans.resize(ans.len() + pad(ans.len(), ALIGNMENT), 0);
    }
    ans
}

fn new_header<T: AsRef<[u8]>>(tensors: &[T]) -> WeightBlobHeader {
    let payload = payload_size(tensors);
    assert!(
        payload <= u32::MAX as usize,
        "payload of {payload} bytes is too large"
    );
    WeightBlobHeader::new(payload as _)
}

mod internal {
    use std::io::{BufWriter, IntoInnerError, Result, Write};

    pub(super) struct Internal<T: Write>(BufWriter<T>, usize);

    impl<T: Write> Internal<T> {
        #[inline]
        pub fn new(writer: T) -> Self {
            Self(BufWriter::new(writer), 0)
        }

        #[inline]
        pub const fn written_bytes(&self) -> usize {
            self.1
        }

        #[inline]
        pub fn write_bytes(&mut self, val: &[u8]) -> Result<()> {
            self.1 += val.len();
            self.0.write_all(val)
        }

        #[inline]
        pub fn finish(self) -> Result<T> {
            self.0.into_inner().map_err(IntoInnerError::into_error)
        }
    }
}

#[test]
fn test_layout() {
    let tensors = [vec![1u8; 26], vec![2; 8], vec![3; 5]];
    assert_eq!(payload_size(&tensors), 28 + 8 + 8);

    let blob = write_weight_blob(&tensors);
    assert_eq!(blob.len(), crate::HEADER_BYTES + 44);
    assert_eq!(blob[4..8], 44u32.to_le_bytes());
    assert_eq!(blob[16 + 26..16 + 28], [0, 0]);
    assert_eq!(blob[16 + 28..16 + 36], [2; 8]);
    assert_eq!(blob[16 + 41..], [0; 3]);
    assert_eq!(blob.len() % ALIGNMENT, 0);
}

#[test]
fn test_stream_matches_memory() {
    let tensors = [crate::encode_tensor(&[9; 45]), crate::encode_tensor(&[-4; 2])];

    let mut streamed = Vec::new();
    let n = write_weight_blob_to(&mut streamed, &tensors).unwrap();
    assert_eq!(n, streamed.len());
    assert_eq!(streamed, write_weight_blob(&tensors));
}

#[test]
fn test_writer_padding() {
    let mut writer = VwbWriter::new(Vec::new());
    writer.write_bytes(&[1; 5]).unwrap();
    writer.write_padding(ALIGNMENT).unwrap();
    assert_eq!(writer.written_bytes(), 8);
    writer.write_padding(ALIGNMENT).unwrap();
    assert_eq!(writer.finish().unwrap(), [1, 1, 1, 1, 1, 0, 0, 0]);
}
