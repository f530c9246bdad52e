use crate::CodecError;

/// Eight ascending magnitudes in half units. Index 7 is the maximum.
pub type Dialect = [u8; 8];

pub const DIALECT_COUNT: usize = 16;

/// The formatbook: 8 pairs of dialects, each pair sharing its maximum.
///
/// Magnitude of an entry is `0.5 * value`, before the block's shared exponent.
#[rustfmt::skip]
pub const DIALECTS: [Dialect; DIALECT_COUNT] = [
    [0, 1, 2, 3, 4,  4,  4,  4],
    [0, 1, 2, 3, 3,  3,  4,  4],
    [0, 1, 2, 3, 4,  5,  5,  5],
    [0, 1, 2, 3, 3,  4,  5,  5],
    [0, 1, 2, 3, 4,  5,  6,  6],
    [0, 1, 2, 3, 4,  4,  6,  6],
    [0, 1, 2, 3, 4,  5,  6,  7],
    [0, 1, 2, 3, 4,  5,  7,  7],
    [0, 1, 2, 3, 4,  6,  7,  8],
    [0, 1, 2, 3, 4,  6,  8,  8],
    [0, 1, 2, 3, 4,  6,  8, 10],
    [0, 1, 2, 3, 4,  6, 10, 10],
    [0, 1, 2, 3, 4,  6, 10, 12],
    [0, 1, 2, 3, 4,  6, 12, 12],
    [0, 1, 2, 3, 4,  6, 12, 15],
    [0, 1, 2, 3, 4,  6, 13, 15],
];

/// Largest scaled magnitude any dialect can represent (7.5 in real units).
pub(crate) const MAX_SCALED: u8 = 15;

#[inline]
pub fn dialect(id: usize) -> Result<&'static Dialect, CodecError> {
    DIALECTS.get(id).ok_or(CodecError::OutOfRange)
}

/// Index of the entry nearest to `scaled`. Ties go to the lower index.
pub(crate) fn nearest(dialect: &Dialect, scaled: u8) -> u8 {
    let mut best = 0;
    let mut best_dist = scaled.abs_diff(dialect[0]);
    for (i, &v) in dialect.iter().enumerate().skip(1) {
        let dist = scaled.abs_diff(v);
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best as _
}

/// Sum of squared quantization errors of `scaled` against `dialect`.
pub(crate) fn squared_error(dialect: &Dialect, scaled: &[u8]) -> u32 {
    scaled
        .iter()
        .map(|&s| {
            let d = s.abs_diff(dialect[nearest(dialect, s) as usize]) as u32;
            d * d
        })
        .sum()
}

#[test]
fn test_dialect_table() {
    for (i, d) in DIALECTS.iter().enumerate() {
        assert!(d.windows(2).all(|w| w[0] <= w[1]), "dialect {i} not sorted");
        assert!(d[7] <= MAX_SCALED);
    }
    for pair in DIALECTS.chunks_exact(2) {
        assert_eq!(pair[0][7], pair[1][7]);
    }
    let maxima = DIALECTS.iter().map(|d| d[7]).collect::<Vec<_>>();
    assert_eq!(maxima.first(), Some(&4));
    assert_eq!(maxima.last(), Some(&MAX_SCALED));

    assert_eq!(dialect(14), Ok(&[0, 1, 2, 3, 4, 6, 12, 15]));
    assert_eq!(dialect(16), Err(CodecError::OutOfRange));
}

#[test]
fn test_nearest_tie_break() {
    let d = &DIALECTS[14];
    // 9 is 3 away from both 6 and 12
    assert_eq!(nearest(d, 9), 5);
    assert_eq!(nearest(d, 10), 6);
    assert_eq!(nearest(d, 15), 7);
    // duplicated maxima resolve to the first copy
    assert_eq!(nearest(&DIALECTS[0], 15), 4);
    assert_eq!(squared_error(d, &[0, 5, 9]), 1 + 9);
}
