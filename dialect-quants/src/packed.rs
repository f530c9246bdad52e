use crate::{CodecError, DataBlock, EncodedBlock, Quantize, _32};
use std::array::from_fn;

/// Bytes of one packed block: 2 metadata bytes and 16 bytes of nibbles.
pub const PACKED_BLOCK_BYTES: usize = size_of::<BlockDialect>();

/// A block as stored on disk.
///
/// `meta` is a big-endian `u16`: dialect id in bits 15..12, shared exponent
/// in bits 11..7, the low 7 bits zero. Byte `i` of `codes` holds element
/// `2i` in its high nibble and element `2i + 1` in its low nibble.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(C)]
pub struct BlockDialect {
    meta: [u8; 2],
    codes: [u8; _32 / 2],
}

impl DataBlock for BlockDialect {
    #[cfg(feature = "types")]
    const ID: digit_layout::DigitLayout = crate::types::BD4;
    const COUNT: usize = _32;
    const ZEROS: Self = Self {
        meta: [0; 2],
        codes: [0; _32 / 2],
    };
}

impl BlockDialect {
    pub fn pack(block: &EncodedBlock) -> Self {
        let dialect = block.dialect_id() as u16 & 0xf;
        let exponent = block.shared_exponent() as u16 & 0x1f;
        let meta = dialect << 12 | exponent << 7;
        let codes = block.codes();
        Self {
            meta: meta.to_be_bytes(),
            codes: from_fn(|i| (codes[2 * i] & 0xf) << 4 | (codes[2 * i + 1] & 0xf)),
        }
    }

    pub fn unpack(&self) -> EncodedBlock {
        let meta = u16::from_be_bytes(self.meta);
        let codes = from_fn(|i| {
            let byte = self.codes[i / 2];
            if i % 2 == 0 {
                byte >> 4
            } else {
                byte & 0xf
            }
        });
        EncodedBlock::from_fields((meta >> 12) as _, (meta >> 7) as _, codes)
    }

    /// Quantizes up to one block of `data`. Missing elements are zero, extra ones are ignored.
    pub fn quantize_partial(data: &[i8]) -> Self {
        let data: [i8; _32] = from_fn(|i| data.get(i).copied().unwrap_or(0));
        Self::quantize(&data)
    }

    /// Reads the first [`PACKED_BLOCK_BYTES`] of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let (meta, tail) = bytes.split_first_chunk().ok_or(CodecError::TruncatedInput)?;
        let (codes, _) = tail.split_first_chunk().ok_or(CodecError::TruncatedInput)?;
        Ok(Self {
            meta: *meta,
            codes: *codes,
        })
    }

    pub fn to_bytes(&self) -> [u8; PACKED_BLOCK_BYTES] {
        let mut ans = [0; PACKED_BLOCK_BYTES];
        let (meta, codes) = ans.split_at_mut(self.meta.len());
        meta.copy_from_slice(&self.meta);
        codes.copy_from_slice(&self.codes);
        ans
    }
}

impl From<&EncodedBlock> for BlockDialect {
    #[inline]
    fn from(block: &EncodedBlock) -> Self {
        Self::pack(block)
    }
}

impl Quantize<i8, _32> for BlockDialect {
    #[inline]
    fn quantize(data: &[i8; _32]) -> Self {
        Self::pack(&EncodedBlock::encode(data))
    }

    #[inline]
    fn dequantize(&self) -> [i8; _32] {
        self.unpack().decode()
    }
}

#[test]
fn test_layout() {
    assert_eq!(PACKED_BLOCK_BYTES, 18);

    let mut codes = [0; _32];
    codes[0] = 0xa;
    codes[1] = 0x5;
    codes[31] = 0xf;
    let blk = BlockDialect::pack(&EncodedBlock::new(0xb, 0x13, codes).unwrap());
    let bytes = blk.to_bytes();
    // 1011 10011 0000000
    assert_eq!(bytes[..2], [0xb9, 0x80]);
    assert_eq!(bytes[2], 0xa5);
    assert_eq!(bytes[3..17], [0; 14]);
    assert_eq!(bytes[17], 0x0f);
}

#[test]
fn test_pack_unpack() {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(1);
    for dialect in 0..16 {
        for exponent in [0, 1, 5, 17, 31] {
            let codes = from_fn(|_| rng.gen_range(0..16));
            let blk = EncodedBlock::new(dialect, exponent, codes).unwrap();
            let packed = BlockDialect::pack(&blk);
            assert_eq!(packed.unpack(), blk);
            assert_eq!(BlockDialect::from_bytes(&packed.to_bytes()), Ok(packed));
        }
    }
}

#[test]
fn test_from_bytes_truncated() {
    assert_eq!(
        BlockDialect::from_bytes(&[0; 17]),
        Err(CodecError::TruncatedInput)
    );
    assert_eq!(BlockDialect::from_bytes(&[]), Err(CodecError::TruncatedInput));
    // trailing bytes are left to the caller
    assert_eq!(BlockDialect::from_bytes(&[0; 20]), Ok(BlockDialect::ZEROS));
}

#[test]
fn test_reserved_bits_ignored() {
    let mut bytes = [0u8; PACKED_BLOCK_BYTES];
    bytes[0] = 0x12;
    bytes[1] = 0xff;
    let blk = BlockDialect::from_bytes(&bytes).unwrap().unpack();
    assert_eq!(blk.dialect_id(), 1);
    assert_eq!(blk.shared_exponent(), 0b00101);
}

#[test]
fn test_quantize_block() {
    let mut data = [0i8; _32];
    data[..4].copy_from_slice(&[-3, 3, 1, -1]);
    let blk = BlockDialect::quantize(&data);
    assert_eq!(blk.dequantize(), data);
    assert_eq!(BlockDialect::quantize(&[0; _32]), BlockDialect::ZEROS);
    assert_eq!(BlockDialect::quantize_partial(&data[..4]), blk);
    assert_eq!(BlockDialect::quantize_partial(&[]), BlockDialect::ZEROS);
}
