use crate::{VwbError, VwbReader, BLOCK_SIZE};

/// `VWB1` read as a little-endian `u32`.
pub const MAGIC: u32 = 0x5657_4231;
pub const HEADER_BYTES: usize = 16;

/// The 16-byte header of a weight blob. All fields are little-endian on disk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct WeightBlobHeader {
    magic: u32,
    /// Bytes after the header: tensor blobs and their padding.
    pub payload_size: u32,
    pub block_size: u32,
    pub reserved: u32,
}

impl VwbReader<'_> {
    pub fn read_header(&mut self) -> Result<WeightBlobHeader, VwbError> {
        Ok(WeightBlobHeader {
            magic: self.read_u32()?,
            payload_size: self.read_u32()?,
            block_size: self.read_u32()?,
            reserved: self.read_u32()?,
        })
    }
}

impl WeightBlobHeader {
    #[inline]
    pub const fn new(payload_size: u32) -> Self {
        Self {
            magic: MAGIC,
            payload_size,
            block_size: BLOCK_SIZE as _,
            reserved: 0,
        }
    }

    #[inline]
    pub const fn magic(&self) -> u32 {
        self.magic
    }

    #[inline]
    pub const fn is_magic_correct(&self) -> bool {
        self.magic == MAGIC
    }

    #[inline]
    pub const fn is_block_size_supported(&self) -> bool {
        self.block_size == BLOCK_SIZE as u32
    }

    /// Length of the whole blob this header describes.
    #[inline]
    pub const fn nbytes(&self) -> usize {
        HEADER_BYTES + self.payload_size as usize
    }

    pub fn to_bytes(&self) -> [u8; HEADER_BYTES] {
        let mut ans = [0; HEADER_BYTES];
        let fields = [self.magic, self.payload_size, self.block_size, self.reserved];
        for (dst, field) in ans.chunks_exact_mut(size_of::<u32>()).zip(fields) {
            dst.copy_from_slice(&field.to_le_bytes());
        }
        ans
    }
}

#[test]
fn test_header_bytes() {
    let header = WeightBlobHeader::new(0x0102);
    let bytes = header.to_bytes();
    assert_eq!(bytes[..4], *b"1BWV");
    assert_eq!(bytes[4..8], [0x02, 0x01, 0, 0]);
    assert_eq!(bytes[8..12], [32, 0, 0, 0]);
    assert_eq!(bytes[12..], [0; 4]);

    let parsed = VwbReader::new(&bytes).read_header().unwrap();
    assert_eq!(parsed, header);
    assert!(parsed.is_magic_correct());
    assert!(parsed.is_block_size_supported());
    assert_eq!(parsed.nbytes(), 16 + 0x0102);
}

#[test]
fn test_header_truncated() {
    assert_eq!(
        VwbReader::new(&[0; 15]).read_header(),
        Err(VwbError::TruncatedInput)
    );
}
