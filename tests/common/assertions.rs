//! Assertion utilities for testing.
//!
//! This module provides helper functions for making assertions in tests,
//! particularly for floating-point and envelope comparisons.

#![allow(dead_code)]

use geo::Rect;

/// Default epsilon for floating-point comparisons
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Assert that two floating-point values are approximately equal.
///
/// # Panics
///
/// Panics if the absolute difference between `actual` and `expected` is greater than `epsilon`.
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: Option<f64>) {
    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON);
    let diff = (actual - expected).abs();

    assert!(
        diff <= epsilon,
        "Values not approximately equal: actual = {}, expected = {}, diff = {}, epsilon = {}",
        actual,
        expected,
        diff,
        epsilon
    );
}

/// Assert that an envelope matches `(min_x, min_y, max_x, max_y)`.
pub fn assert_envelope_eq(actual: Rect<f64>, expected: (f64, f64, f64, f64), epsilon: Option<f64>) {
    let got = (actual.min().x, actual.min().y, actual.max().x, actual.max().y);
    for (a, e) in [
        (got.0, expected.0),
        (got.1, expected.1),
        (got.2, expected.2),
        (got.3, expected.3),
    ] {
        assert!(
            (a - e).abs() <= epsilon.unwrap_or(DEFAULT_EPSILON),
            "Envelopes differ: actual = {:?}, expected = {:?}",
            got,
            expected
        );
    }
}

/// Assert that a sequence of `(row, col)` pairs is strictly increasing in
/// row-major order.
pub fn assert_row_major(cells: &[(usize, usize)]) {
    for pair in cells.windows(2) {
        assert!(
            pair[0] < pair[1],
            "Cells out of row-major order: {:?} before {:?}",
            pair[0],
            pair[1]
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    #[test]
    fn test_assert_approx_eq() {
        assert_approx_eq(1.0, 1.0, None);
        assert_approx_eq(1.0, 1.0 + 1e-12, None);
        assert_approx_eq(1.0, 1.001, Some(0.01));
    }

    #[test]
    fn test_assert_envelope_eq() {
        let rect = Rect::new(Coord { x: 0.0, y: 1.0 }, Coord { x: 2.0, y: 3.0 });
        assert_envelope_eq(rect, (0.0, 1.0, 2.0, 3.0), None);
    }

    #[test]
    fn test_assert_row_major() {
        assert_row_major(&[(0, 1), (0, 2), (1, 0)]);
        assert_row_major(&[]);
    }
}
