use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use std::{
    error::Error,
    fmt,
    slice::{from_raw_parts, from_raw_parts_mut},
};

pub trait DataBlock: Sized + 'static {
    #[cfg(feature = "types")]
    const ID: digit_layout::DigitLayout;
    const COUNT: usize;
    const ZEROS: Self;
}

pub trait Quantize<T, const N: usize>: DataBlock {
    fn quantize(data: &[T; N]) -> Self;
    fn dequantize(&self) -> [T; N];
}

pub trait QuantExt<T, const N: usize>: Sized {
    fn quantize_slice(dst: &mut [Self], src: &[T]) -> Result<(), QuantizeError>;
    fn dequantize_slice(dst: &mut [T], src: &[Self]) -> Result<(), QuantizeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantizeError {
    Indivisible,
    LengthMismatch,
}

impl fmt::Display for QuantizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Indivisible => f.write_str("element count is not a multiple of the block size"),
            Self::LengthMismatch => f.write_str("block count does not match element count"),
        }
    }
}

impl Error for QuantizeError {}

/// Failures of the block layer. Only reachable from corrupted or hand-built input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecError {
    /// A dialect id, shared exponent or code does not fit its bit width.
    OutOfRange,
    /// Fewer bytes than one packed block.
    TruncatedInput,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => f.write_str("field out of range"),
            Self::TruncatedInput => f.write_str("truncated input"),
        }
    }
}

impl Error for CodecError {}

impl<Blk, T, const N: usize> QuantExt<T, N> for Blk
where
    Blk: Quantize<T, N> + Send + Sync,
    T: Send + Sync,
{
    fn quantize_slice(dst: &mut [Self], src: &[T]) -> Result<(), QuantizeError> {
        if src.len() % N != 0 {
            return Err(QuantizeError::Indivisible);
        }
        if dst.len() != src.len() / N {
            return Err(QuantizeError::LengthMismatch);
        }
        let src = unsafe { from_raw_parts(src.as_ptr().cast::<[T; N]>(), dst.len()) };
        dst.into_par_iter()
            .zip(src)
            .for_each(|(dst, src)| *dst = Blk::quantize(src));
        Ok(())
    }

    fn dequantize_slice(dst: &mut [T], src: &[Self]) -> Result<(), QuantizeError> {
        if dst.len() % N != 0 {
            return Err(QuantizeError::Indivisible);
        }
        if src.len() != dst.len() / N {
            return Err(QuantizeError::LengthMismatch);
        }
        let dst = unsafe { from_raw_parts_mut(dst.as_mut_ptr().cast::<[T; N]>(), src.len()) };
        src.into_par_iter()
            .zip(dst)
            .for_each(|(src, dst)| *dst = Blk::dequantize(src));
        Ok(())
    }
}

#[cfg(feature = "types")]
pub mod types;

mod block;
mod dialect;
mod packed;
mod stats;

pub use block::EncodedBlock;
pub use dialect::{dialect, Dialect, DIALECTS, DIALECT_COUNT};
pub use packed::{BlockDialect, PACKED_BLOCK_BYTES};
pub use stats::ErrorCollector;

/// Elements per block.
pub const BLOCK_SIZE: usize = _32;

const _32: usize = 32;

#[test]
fn test_quantize_slice() {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(7);
    let src = (0.._32 * 5)
        .map(|_| rng.gen_range(-20i8..=20))
        .collect::<Vec<_>>();

    let mut blocks = vec![BlockDialect::ZEROS; 5];
    <BlockDialect as QuantExt<i8, _32>>::quantize_slice(&mut blocks, &src).unwrap();
    for (blk, chunk) in blocks.iter().zip(src.chunks_exact(_32)) {
        let chunk: &[i8; _32] = chunk.try_into().unwrap();
        let expected = BlockDialect::quantize(chunk);
        assert_eq!(*blk, expected);
    }

    let mut dst = vec![0i8; src.len()];
    <BlockDialect as QuantExt<i8, _32>>::dequantize_slice(&mut dst, &blocks).unwrap();
    let mut ec = ErrorCollector::new(8);
    for (&a, &b) in src.iter().zip(&dst) {
        ec.push(a, b);
    }
    assert!(ec.outliers().is_empty(), "{ec}");
}

#[test]
fn test_quantize_slice_errors() {
    let mut blocks = vec![BlockDialect::ZEROS; 2];
    assert_eq!(
        <BlockDialect as QuantExt<i8, _32>>::quantize_slice(&mut blocks, &[0; 33]),
        Err(QuantizeError::Indivisible)
    );
    assert_eq!(
        <BlockDialect as QuantExt<i8, _32>>::quantize_slice(&mut blocks, &[0; 96]),
        Err(QuantizeError::LengthMismatch)
    );
    let mut dst = [0i8; 64];
    assert_eq!(
        <BlockDialect as QuantExt<i8, _32>>::dequantize_slice(&mut dst[..40], &blocks),
        Err(QuantizeError::Indivisible)
    );
    assert_eq!(
        <BlockDialect as QuantExt<i8, _32>>::dequantize_slice(&mut dst[..32], &blocks),
        Err(QuantizeError::LengthMismatch)
    );
}
