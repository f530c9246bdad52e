use std::fmt;

/// Accumulates reconstruction errors of `(original, restored)` pairs.
pub struct ErrorCollector {
    tolerance: u8,
    count: usize,
    max: u8,
    sum_sq: u64,
    outliers: Vec<usize>,
}

impl ErrorCollector {
    /// Pairs whose absolute error exceeds `tolerance` are recorded as outliers.
    #[inline]
    pub const fn new(tolerance: u8) -> Self {
        Self {
            tolerance,
            count: 0,
            max: 0,
            sum_sq: 0,
            outliers: Vec::new(),
        }
    }

    pub fn push(&mut self, original: i8, restored: i8) {
        let diff = original.abs_diff(restored);
        if diff > self.tolerance {
            self.outliers.push(self.count);
        }
        self.count += 1;
        self.max = self.max.max(diff);
        self.sum_sq += diff as u64 * diff as u64;
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn mse(&self) -> f64 {
        if self.count == 0 {
            0.
        } else {
            self.sum_sq as f64 / self.count as f64
        }
    }

    #[inline]
    pub fn rmse(&self) -> f64 {
        self.mse().sqrt()
    }

    #[inline]
    pub fn outliers(&self) -> &[usize] {
        &self.outliers
    }
}

impl Extend<(i8, i8)> for ErrorCollector {
    fn extend<T: IntoIterator<Item = (i8, i8)>>(&mut self, iter: T) {
        for (a, b) in iter {
            self.push(a, b)
        }
    }
}

impl fmt::Display for ErrorCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "n = {}, max = {}, rmse = {:.3}, outliers (> {}) = {}",
            self.count,
            self.max,
            self.rmse(),
            self.tolerance,
            self.outliers.len(),
        )
    }
}

#[test]
fn test_error_collector() {
    let mut ec = ErrorCollector::new(2);
    assert_eq!(ec.mse(), 0.);

    ec.extend([(0, 0), (10, 7), (-128, 127), (5, 4)]);
    assert_eq!(ec.count(), 4);
    assert_eq!(ec.max(), 255);
    assert_eq!(ec.outliers(), &[1, 2]);
    assert_eq!(ec.mse(), (9. + 255. * 255. + 1.) / 4.);
    assert_eq!(
        ec.to_string(),
        format!("n = 4, max = 255, rmse = {:.3}, outliers (> 2) = 2", ec.rmse())
    );
}
