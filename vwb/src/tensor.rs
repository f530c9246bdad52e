use crate::{VwbError, VwbReader, BLOCK_SIZE, PACKED_BLOCK_BYTES};
use dialect_quants::{BlockDialect, Quantize};
use rayon::{
    iter::{IntoParallelRefIterator, ParallelIterator},
    slice::ParallelSlice,
};
use std::slice::from_raw_parts;

pub const TENSOR_HEADER_BYTES: usize = 8;

/// `element_count` and `block_count`, both little-endian `u32`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TensorHeader {
    /// Elements before zero padding.
    pub element_count: u32,
    pub block_count: u32,
}

impl TensorHeader {
    /// # Panics
    ///
    /// If `n` does not fit in a `u32`.
    pub fn for_elements(n: usize) -> Self {
        assert!(n <= u32::MAX as usize, "tensor of {n} elements is too large");
        Self {
            element_count: n as _,
            block_count: n.div_ceil(BLOCK_SIZE) as _,
        }
    }

    /// Elements the blocks can hold, padding included.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.block_count as usize * BLOCK_SIZE
    }

    #[inline]
    pub const fn nbytes(&self) -> usize {
        TENSOR_HEADER_BYTES + self.block_count as usize * PACKED_BLOCK_BYTES
    }

    pub fn to_bytes(&self) -> [u8; TENSOR_HEADER_BYTES] {
        let mut ans = [0; TENSOR_HEADER_BYTES];
        let (count, blocks) = ans.split_at_mut(size_of::<u32>());
        count.copy_from_slice(&self.element_count.to_le_bytes());
        blocks.copy_from_slice(&self.block_count.to_le_bytes());
        ans
    }
}

/// A tensor blob borrowed from its buffer, not yet decoded.
#[derive(Clone, Copy, Debug)]
pub struct EncodedTensor<'a> {
    header: TensorHeader,
    blocks: &'a [BlockDialect],
}

impl<'a> VwbReader<'a> {
    #[inline]
    pub fn read_tensor_header(&mut self) -> Result<TensorHeader, VwbError> {
        Ok(TensorHeader {
            element_count: self.read_u32()?,
            block_count: self.read_u32()?,
        })
    }

    pub fn read_tensor(&mut self) -> Result<EncodedTensor<'a>, VwbError> {
        let header = self.read_tensor_header()?;
        let capacity = (header.block_count as usize)
            .checked_mul(BLOCK_SIZE)
            .ok_or(VwbError::TruncatedInput)?;
        if header.element_count as usize > capacity {
            return Err(VwbError::ElementCountMismatch {
                elements: header.element_count as _,
                capacity,
            });
        }
        let len = (header.block_count as usize)
            .checked_mul(PACKED_BLOCK_BYTES)
            .ok_or(VwbError::TruncatedInput)?;
        let data = self.take(len)?;
        // BlockDialect is plain bytes with alignment 1
        let blocks = unsafe {
            from_raw_parts(
                data.as_ptr().cast::<BlockDialect>(),
                header.block_count as _,
            )
        };
        Ok(EncodedTensor { header, blocks })
    }
}

impl<'a> EncodedTensor<'a> {
    #[inline]
    pub const fn header(&self) -> TensorHeader {
        self.header
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.header.element_count as _
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub const fn nbytes(&self) -> usize {
        self.header.nbytes()
    }

    #[inline]
    pub const fn blocks(&self) -> &'a [BlockDialect] {
        self.blocks
    }

    /// Decodes all blocks and drops the padding.
    pub fn decode(&self) -> Vec<i8> {
        let mut ans = self
            .blocks
            .par_iter()
            .flat_map_iter(|blk| <BlockDialect as Quantize<i8, BLOCK_SIZE>>::dequantize(blk))
            .collect::<Vec<_>>();
        ans.truncate(self.len());
        ans
    }
}

/// Length of `encode_tensor` output for `n` elements.
#[inline]
pub fn encoded_len(n: usize) -> usize {
    TensorHeader::for_elements(n).nbytes()
}

/// Encodes `elements` into a tensor blob, zero padding the last block.
///
/// # Panics
///
/// If there are more than `u32::MAX` elements.
pub fn encode_tensor(elements: &[i8]) -> Vec<u8> {
    let header = TensorHeader::for_elements(elements.len());
    let blocks = elements
        .par_chunks(BLOCK_SIZE)
        .map(BlockDialect::quantize_partial)
        .collect::<Vec<_>>();

    let mut ans = Vec::with_capacity(header.nbytes());
    ans.extend_from_slice(&header.to_bytes());
    for blk in &blocks {
        ans.extend_from_slice(&blk.to_bytes());
    }
    ans
}

/// Decodes the tensor blob starting at `offset`.
///
/// Returns the elements and the number of bytes the blob occupies.
pub fn decode_tensor(data: &[u8], offset: usize) -> Result<(Vec<i8>, usize), VwbError> {
    let data = data.get(offset..).ok_or(VwbError::TruncatedInput)?;
    let tensor = VwbReader::new(data).read_tensor()?;
    Ok((tensor.decode(), tensor.nbytes()))
}

#[cfg(test)]
fn random_tensor(seed: u64, n: usize, range: i8) -> Vec<i8> {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-range..=range)).collect()
}

#[test]
fn test_length_preservation() {
    for n in [0, 1, 31, 32, 33, 64, 432, 1000] {
        let data = random_tensor(n as _, n, 127);
        let blob = encode_tensor(&data);
        assert_eq!(blob.len(), encoded_len(n));
        assert_eq!(blob.len(), 8 + 18 * n.div_ceil(32));

        let (decoded, consumed) = decode_tensor(&blob, 0).unwrap();
        assert_eq!(decoded.len(), n);
        assert_eq!(consumed, blob.len());
    }
}

#[test]
fn test_tensor_header() {
    let blob = encode_tensor(&[1; 33]);
    assert_eq!(blob[..8], [33, 0, 0, 0, 2, 0, 0, 0]);

    let tensor = VwbReader::new(&blob).read_tensor().unwrap();
    assert_eq!(
        tensor.header(),
        TensorHeader {
            element_count: 33,
            block_count: 2
        }
    );
    assert_eq!(tensor.blocks().len(), 2);
    assert_eq!(tensor.blocks()[1].dequantize()[1..], [0; 31]);
    assert_eq!(tensor.decode(), [1; 33]);
}

#[test]
fn test_small_values_exact() {
    let data = [0, 1, -1, 2, -2, 3, -3, 0, 3, 3];
    let (decoded, _) = decode_tensor(&encode_tensor(&data), 0).unwrap();
    assert_eq!(decoded, data);
}

#[test]
fn test_decode_at_offset() {
    let data = random_tensor(9, 100, 50);
    let mut buf = vec![0xaa; 5];
    buf.extend(encode_tensor(&data));
    buf.extend([0xbb; 3]);

    let (decoded, consumed) = decode_tensor(&buf, 5).unwrap();
    assert_eq!(consumed, encoded_len(100));
    assert_eq!(decoded, decode_tensor(&buf[5..], 0).unwrap().0);
    for (a, b) in data.iter().zip(&decoded) {
        assert!(a.abs_diff(*b) <= 16);
    }
}

#[test]
fn test_compression_ratio() {
    // a 16x3x3x3 conv weight
    let data = random_tensor(789, 432, 50);
    let blob = encode_tensor(&data);
    let ratio = data.len() as f64 / (blob.len() - TENSOR_HEADER_BYTES) as f64;
    assert!(ratio > 1.5, "ratio {ratio}");
}

#[test]
fn test_truncated() {
    let blob = encode_tensor(&[5; 40]);
    assert_eq!(
        decode_tensor(&blob[..blob.len() - 1], 0),
        Err(VwbError::TruncatedInput)
    );
    assert_eq!(decode_tensor(&blob[..7], 0), Err(VwbError::TruncatedInput));
    assert_eq!(decode_tensor(&blob, blob.len() + 1), Err(VwbError::TruncatedInput));
    // offset at the very end leaves no room for a header
    assert_eq!(decode_tensor(&blob, blob.len()), Err(VwbError::TruncatedInput));
}

#[test]
fn test_element_count_mismatch() {
    let mut blob = encode_tensor(&[5; 40]);
    blob[..4].copy_from_slice(&65u32.to_le_bytes());
    assert_eq!(
        decode_tensor(&blob, 0),
        Err(VwbError::ElementCountMismatch {
            elements: 65,
            capacity: 64
        })
    );
}

#[test]
fn test_huge_block_count() {
    let mut blob = TensorHeader {
        element_count: 0,
        block_count: u32::MAX,
    }
    .to_bytes()
    .to_vec();
    blob.extend([0; 18]);
    assert_eq!(decode_tensor(&blob, 0), Err(VwbError::TruncatedInput));
}
