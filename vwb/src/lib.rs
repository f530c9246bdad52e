#![doc = include_str!("../README.md")]
#![deny(warnings)]

mod file;
mod header;
mod read;
mod tensor;
mod writer;

pub use dialect_quants::{BlockDialect, CodecError, BLOCK_SIZE, PACKED_BLOCK_BYTES};
pub use file::{read_weight_blob, VwbError, WeightBlob};
pub use header::{WeightBlobHeader, HEADER_BYTES, MAGIC};
pub use read::VwbReader;
pub use tensor::{
    decode_tensor, encode_tensor, encoded_len, EncodedTensor, TensorHeader, TENSOR_HEADER_BYTES,
};
pub use writer::{payload_size, write_weight_blob, write_weight_blob_to, VwbWriter};

/// Every tensor blob in a weight blob starts on this boundary.
pub const ALIGNMENT: usize = 4;

#[inline(always)]
const fn pad(pos: usize, align: usize) -> usize {
    (align - pos % align) % align
}

#[test]
fn test_pad() {
    assert_eq!(pad(0, ALIGNMENT), 0);
    assert_eq!(pad(26, ALIGNMENT), 2);
    assert_eq!(pad(44, ALIGNMENT), 0);
    assert_eq!(pad(45, ALIGNMENT), 3);
}
