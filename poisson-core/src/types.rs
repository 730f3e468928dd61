//! Core geometric types.

use nalgebra::Vector2;

/// A point in the plane.
pub type Point2 = Vector2<f64>;

/// A 2D vector (gradient, flux, normal).
pub type Vec2 = Vector2<f64>;

/// Tolerance-aware float comparison with numpy `isclose` semantics.
///
/// `|a - b| <= atol + rtol * |b|` with `rtol = 1e-5`, `atol = 1e-8`.
#[inline]
pub fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_close() {
        assert!(is_close(0.0, 0.0));
        assert!(is_close(2.0, 2.0 + 1e-6));
        assert!(is_close(1e-9, 0.0));
        assert!(!is_close(0.0, 1e-6));
        assert!(!is_close(1.0, 1.001));
    }
}
