use crate::{
    dialect::{nearest, squared_error, MAX_SCALED},
    CodecError, DIALECTS, DIALECT_COUNT, _32,
};
use std::array::from_fn;

/// One block after dialect selection, before bit packing.
///
/// Each code is `sign << 3 | index`, where `index` points into
/// `DIALECTS[dialect_id]` and the element reconstructs as
/// `(-1)^sign * 0.5 * DIALECTS[dialect_id][index] * 2^shared_exponent`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EncodedBlock {
    dialect: u8,
    exponent: u8,
    codes: [u8; _32],
}

const MAX_EXPONENT: u8 = 31;
const SIGN: u8 = 0b1000;
const INDEX: u8 = 0b0111;

impl EncodedBlock {
    pub const ZEROS: Self = Self {
        dialect: 0,
        exponent: 0,
        codes: [0; _32],
    };

    pub fn new(dialect: u8, exponent: u8, codes: [u8; _32]) -> Result<Self, CodecError> {
        if dialect as usize >= DIALECT_COUNT
            || exponent > MAX_EXPONENT
            || codes.iter().any(|&c| c > SIGN | INDEX)
        {
            return Err(CodecError::OutOfRange);
        }
        Ok(Self {
            dialect,
            exponent,
            codes,
        })
    }

    /// Fields are masked to their bit widths, so the result is always valid.
    #[inline]
    pub(crate) const fn from_fields(dialect: u8, exponent: u8, codes: [u8; _32]) -> Self {
        Self {
            dialect: dialect & 0xf,
            exponent: exponent & 0x1f,
            codes,
        }
    }

    #[inline]
    pub const fn dialect_id(&self) -> u8 {
        self.dialect
    }

    #[inline]
    pub const fn shared_exponent(&self) -> u8 {
        self.exponent
    }

    #[inline]
    pub const fn codes(&self) -> &[u8; _32] {
        &self.codes
    }

    pub fn encode(data: &[i8; _32]) -> Self {
        let magnitudes = data.map(|x| x.unsigned_abs() as u16);
        let max = magnitudes.iter().copied().max().unwrap_or(0);

        let exponent = shared_exponent(max);
        let scaled = magnitudes.map(|m| scale(m, exponent));
        let dialect = select_dialect(&scaled);

        let table = &DIALECTS[dialect];
        Self {
            dialect: dialect as _,
            exponent,
            codes: from_fn(|i| {
                let sign = if data[i] < 0 { SIGN } else { 0 };
                sign | nearest(table, scaled[i])
            }),
        }
    }

    pub fn decode(&self) -> [i8; _32] {
        let table = &DIALECTS[self.dialect as usize];
        self.codes.map(|code| {
            let magnitude = reconstruct(table[(code & INDEX) as usize], self.exponent);
            if code & SIGN != 0 {
                -magnitude
            } else {
                magnitude
            }
        })
    }
}

/// Smallest `e` such that `max <= 7.5 * 2^e`.
fn shared_exponent(max: u16) -> u8 {
    let mut e = 0;
    while 2 * max as u32 > (MAX_SCALED as u32) << e {
        e += 1;
    }
    e
}

/// Magnitude to half units under exponent `e`, rounding half up, clamped to the table range.
fn scale(magnitude: u16, e: u8) -> u8 {
    let twice = 2 * magnitude as u32;
    let scaled = if e == 0 {
        twice
    } else {
        (twice + (1 << (e - 1))) >> e
    };
    scaled.min(MAX_SCALED as _) as _
}

/// First dialect with the smallest squared error.
fn select_dialect(scaled: &[u8; _32]) -> usize {
    let mut best = 0;
    let mut best_err = u32::MAX;
    for (i, table) in DIALECTS.iter().enumerate() {
        let err = squared_error(table, scaled);
        if err < best_err {
            best = i;
            best_err = err;
        }
    }
    best
}

/// Half units back to a magnitude, saturating at `i8::MAX`.
fn reconstruct(scaled: u8, e: u8) -> i8 {
    let magnitude = if e == 0 {
        (scaled as u64 + 1) >> 1
    } else {
        (scaled as u64) << (e - 1)
    };
    magnitude.min(i8::MAX as _) as _
}

#[cfg(test)]
fn max_abs_error(data: &[i8; _32]) -> u8 {
    let restored = EncodedBlock::encode(data).decode();
    data.iter()
        .zip(&restored)
        .map(|(&a, &b)| (a as i16 - b as i16).unsigned_abs() as u8)
        .max()
        .unwrap()
}

#[test]
fn test_shared_exponent() {
    assert_eq!(shared_exponent(0), 0);
    assert_eq!(shared_exponent(7), 0);
    assert_eq!(shared_exponent(8), 1);
    assert_eq!(shared_exponent(15), 1);
    assert_eq!(shared_exponent(16), 2);
    assert_eq!(shared_exponent(120), 4);
    assert_eq!(shared_exponent(121), 5);
    assert_eq!(shared_exponent(127), 5);
    assert_eq!(shared_exponent(128), 5);
}

#[test]
fn test_scale_rounding() {
    assert_eq!(scale(3, 0), 6);
    // 2 * 5 / 4 = 2.5 rounds up
    assert_eq!(scale(5, 2), 3);
    assert_eq!(scale(4, 2), 2);
    assert_eq!(scale(127, 5), 8);
    assert_eq!(scale(128, 5), 8);
    assert_eq!(scale(7, 0), 14);

    assert_eq!(reconstruct(5, 0), 3);
    assert_eq!(reconstruct(4, 0), 2);
    assert_eq!(reconstruct(8, 5), 127);
    assert_eq!(reconstruct(15, 31), 127);
    assert_eq!(reconstruct(3, 2), 6);
}

#[test]
fn test_zeros() {
    let blk = EncodedBlock::encode(&[0; _32]);
    assert_eq!(blk.shared_exponent(), 0);
    assert_eq!(blk.dialect_id(), 0);
    assert_eq!(blk.codes(), &[0; _32]);
    assert_eq!(blk.decode(), [0; _32]);
    assert_eq!(EncodedBlock::ZEROS.decode(), [0; _32]);
}

#[test]
fn test_small_values() {
    let mut data = [0i8; _32];
    data[..7].copy_from_slice(&[0, 1, -1, 2, -2, 3, -3]);

    let blk = EncodedBlock::encode(&data);
    assert_eq!(blk.shared_exponent(), 0);
    assert!(max_abs_error(&data) <= 2);
    // 0, 2, 4, 6 half units all exist in the first dialect that reaches 6
    assert_eq!(blk.dialect_id(), 4);
    assert_eq!(blk.decode(), data);
}

#[test]
fn test_saturated_block() {
    let blk = EncodedBlock::encode(&[127; _32]);
    assert_eq!(blk.shared_exponent(), 5);
    // one scaled unit is 2^(5-1) = 16
    for x in blk.decode() {
        assert!((127 - x as i16).abs() <= 16);
        assert!(x > 0);
    }
}

#[test]
fn test_most_negative() {
    let blk = EncodedBlock::encode(&[i8::MIN; _32]);
    assert_eq!(blk.shared_exponent(), 5);
    assert!(blk.codes().iter().all(|&c| c & SIGN != 0));
    assert_eq!(blk.decode(), [-127; _32]);

    let mut data = [0i8; _32];
    data[0] = i8::MIN;
    data[1] = i8::MAX;
    data[2] = -1;
    let restored = EncodedBlock::encode(&data).decode();
    assert_eq!(restored[0], -127);
    assert!(restored[1] > 100);
}

#[test]
fn test_sign_of_zero_magnitude() {
    // -1 under a large exponent scales to zero but keeps its sign bit
    let mut data = [0i8; _32];
    data[0] = 100;
    data[1] = -1;
    let blk = EncodedBlock::encode(&data);
    assert_eq!(blk.codes()[1], SIGN);
    assert_eq!(blk.decode()[1], 0);
}

#[test]
fn test_random_blocks() {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(42);
    for (range, ceiling) in [(7i8, 2u8), (50, 16), (127, 64)] {
        for _ in 0..500 {
            let data: [i8; _32] = from_fn(|_| rng.gen_range(-range..=range));
            let err = max_abs_error(&data);
            assert!(err <= ceiling, "range ±{range}: error {err} over {ceiling}");
        }
    }
}

#[test]
fn test_new_validates() {
    assert!(EncodedBlock::new(15, 31, [15; _32]).is_ok());
    assert_eq!(
        EncodedBlock::new(16, 0, [0; _32]),
        Err(CodecError::OutOfRange)
    );
    assert_eq!(
        EncodedBlock::new(0, 32, [0; _32]),
        Err(CodecError::OutOfRange)
    );
    let mut codes = [0; _32];
    codes[31] = 16;
    assert_eq!(EncodedBlock::new(0, 0, codes), Err(CodecError::OutOfRange));
}

#[test]
fn test_large_exponent_saturates() {
    let blk = EncodedBlock::new(14, 31, from_fn(|i| (i % 16) as u8)).unwrap();
    for (i, x) in blk.decode().into_iter().enumerate() {
        let expected = match i % 8 {
            0 => 0,
            _ => 127,
        };
        let expected = if i % 16 >= 8 { -expected } else { expected };
        assert_eq!(x, expected);
    }
}
