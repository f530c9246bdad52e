use crate::{pad, EncodedTensor, VwbReader, WeightBlobHeader, ALIGNMENT};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::{error::Error, fmt};

/// A parsed weight blob. Tensors still borrow the original bytes.
pub struct WeightBlob<'a> {
    pub header: WeightBlobHeader,
    pub tensors: Vec<EncodedTensor<'a>>,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum VwbError {
    TruncatedInput,
    BadMagic(u32),
    UnsupportedBlockSize(u32),
    ElementCountMismatch { elements: usize, capacity: usize },
}

impl fmt::Display for VwbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedInput => f.write_str("truncated input"),
            Self::BadMagic(magic) => write!(f, "bad magic: {magic:#010x}"),
            Self::UnsupportedBlockSize(size) => write!(f, "unsupported block size: {size}"),
            Self::ElementCountMismatch { elements, capacity } => {
                write!(f, "{elements} elements do not fit in blocks of {capacity}")
            }
        }
    }
}

impl Error for VwbError {}

impl<'a> WeightBlob<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, VwbError> {
        use VwbError::*;

        let mut reader = VwbReader::new(data);

        let header = reader.read_header()?;
        if !header.is_magic_correct() {
            return Err(BadMagic(header.magic()));
        }
        if !header.is_block_size_supported() {
            return Err(UnsupportedBlockSize(header.block_size));
        }

        let payload = reader.take(header.payload_size as _)?;
        let mut reader = VwbReader::new(payload);
        let mut tensors = Vec::new();
        while !reader.remaining().is_empty() {
            tensors.push(reader.read_tensor()?);

            let cursor = payload.len() - reader.remaining().len();
            let padding = pad(cursor, ALIGNMENT).min(reader.remaining().len());
            reader.skip(padding)?;
        }

        Ok(Self { header, tensors })
    }

    /// Decodes every tensor, in blob order.
    pub fn decode(&self) -> Vec<Vec<i8>> {
        self.tensors.par_iter().map(EncodedTensor::decode).collect()
    }
}

/// Parses and decodes a whole weight blob.
#[inline]
pub fn read_weight_blob(data: &[u8]) -> Result<Vec<Vec<i8>>, VwbError> {
    WeightBlob::new(data).map(|blob| blob.decode())
}

#[cfg(test)]
fn sample_tensors() -> Vec<Vec<i8>> {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(456);
    [432, 16, 16, 1, 0, 70]
        .into_iter()
        .map(|n| (0..n).map(|_| rng.gen_range(-127..=127)).collect())
        .collect()
}

#[test]
fn test_blob_round_trip() {
    use crate::{encode_tensor, write_weight_blob};
    use dialect_quants::ErrorCollector;

    let tensors = sample_tensors();
    let blob = write_weight_blob(&tensors.iter().map(|t| encode_tensor(t)).collect::<Vec<_>>());

    let parsed = WeightBlob::new(&blob).unwrap();
    assert_eq!(parsed.header.nbytes(), blob.len());
    assert_eq!(parsed.tensors.len(), tensors.len());

    let decoded = read_weight_blob(&blob).unwrap();
    assert_eq!(decoded.len(), tensors.len());
    for (orig, dec) in tensors.iter().zip(&decoded) {
        assert_eq!(orig.len(), dec.len());
        let mut ec = ErrorCollector::new(64);
        ec.extend(orig.iter().copied().zip(dec.iter().copied()));
        assert!(ec.outliers().is_empty(), "{ec}");
    }
}

#[test]
fn test_empty_blob() {
    let blob = crate::write_weight_blob::<Vec<u8>>(&[]);
    assert_eq!(blob.len(), 16);
    assert_eq!(read_weight_blob(&blob), Ok(vec![]));
}

#[test]
fn test_bad_magic() {
    let mut blob = crate::write_weight_blob(&[crate::encode_tensor(&[1, 2, 3])]);
    blob[..4].copy_from_slice(&0x5657_4230u32.to_le_bytes());
    assert_eq!(
        WeightBlob::new(&blob).err(),
        Some(VwbError::BadMagic(0x5657_4230))
    );
}

#[test]
fn test_unsupported_block_size() {
    let mut blob = crate::write_weight_blob(&[crate::encode_tensor(&[1, 2, 3])]);
    blob[8..12].copy_from_slice(&64u32.to_le_bytes());
    assert_eq!(
        WeightBlob::new(&blob).err(),
        Some(VwbError::UnsupportedBlockSize(64))
    );
}

#[test]
fn test_truncated_blob() {
    let blob = crate::write_weight_blob(&[crate::encode_tensor(&[1; 50])]);
    // payload claims more than the file holds
    assert_eq!(
        read_weight_blob(&blob[..blob.len() - 4]),
        Err(VwbError::TruncatedInput)
    );
    assert_eq!(read_weight_blob(&blob[..12]), Err(VwbError::TruncatedInput));

    // payload ends in the middle of a tensor
    let mut blob = blob;
    let payload = (blob.len() - 16 - 8) as u32;
    blob[4..8].copy_from_slice(&payload.to_le_bytes());
    assert_eq!(read_weight_blob(&blob), Err(VwbError::TruncatedInput));
}

#[test]
fn test_trailing_bytes_ignored() {
    let mut blob = crate::write_weight_blob(&[crate::encode_tensor(&[7; 3])]);
    blob.extend([0xff; 9]);
    assert_eq!(read_weight_blob(&blob).unwrap().len(), 1);
}

#[test]
fn test_payload_ends_before_padding() {
    use crate::{decode_tensor, encode_tensor, WeightBlobHeader};

    fn blob(payload: &[u8]) -> Vec<u8> {
        let mut ans = WeightBlobHeader::new(payload.len() as _).to_bytes().to_vec();
        ans.extend_from_slice(payload);
        ans
    }

    let a = encode_tensor(&[5]);
    let b = encode_tensor(&[40; 3]);
    assert_eq!(a.len(), 26);
    assert_eq!(b.len(), 26);
    let a_dec = decode_tensor(&a, 0).unwrap().0;
    let b_dec = decode_tensor(&b, 0).unwrap().0;

    // last tensor without padding
    let unpadded = blob(&a);
    assert_eq!(read_weight_blob(&unpadded), Ok(vec![a_dec.clone()]));

    // payload ends inside the padding
    let mut payload = a.clone();
    payload.push(0);
    assert_eq!(payload.len(), 27);
    assert_eq!(read_weight_blob(&blob(&payload)), Ok(vec![a_dec.clone()]));

    // padded tensor followed by an unpadded one
    let mut payload = a.clone();
    payload.extend([0; 2]);
    payload.extend_from_slice(&b);
    assert_eq!(payload.len(), 28 + 26);
    let parsed = blob(&payload);
    assert_eq!(WeightBlob::new(&parsed).unwrap().tensors.len(), 2);
    assert_eq!(read_weight_blob(&parsed), Ok(vec![a_dec, b_dec]));
}
