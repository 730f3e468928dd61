//! Gauss quadrature rules for numerical integration.
//!
//! This module provides quadrature rules for:
//! - 1D line integration (boundary facets)
//! - Triangle area integration (cells)
//!
//! # Usage
//!
//! ```
//! use poisson_core::element::gauss::{gauss_1d, gauss_tri};
//!
//! // 2-point 1D rule
//! for (xi, w) in gauss_1d(2) {
//!     // integrate at point xi with weight w
//! }
//!
//! // 3-point triangle rule
//! for gp in gauss_tri(3) {
//!     // gp.coords gives (L1, L2, L3) area coordinates
//!     // gp.weight is the integration weight
//! }
//! ```

/// A quadrature point in area coordinates with its weight.
#[derive(Debug, Clone, Copy)]
pub struct GaussPoint {
    /// Area coordinates [L1, L2, L3], summing to 1.
    pub coords: [f64; 3],
    /// Integration weight on the reference triangle (area 1/2).
    pub weight: f64,
}

impl GaussPoint {
    /// Create a new Gauss point.
    pub fn new(coords: [f64; 3], weight: f64) -> Self {
        Self { coords, weight }
    }
}

/// 1D Gauss-Legendre quadrature points and weights.
///
/// Returns (point, weight) pairs for integration on [-1, 1].
///
/// # Arguments
///
/// * `n` - Number of integration points (1, 2, 3, or 4)
///
/// # Panics
///
/// Panics if `n` is not in 1..=4.
pub fn gauss_1d(n: usize) -> Vec<(f64, f64)> {
    match n {
        1 => vec![(0.0, 2.0)],
        2 => {
            let p = 1.0 / 3.0_f64.sqrt();
            vec![(-p, 1.0), (p, 1.0)]
        }
        3 => {
            let p = (3.0 / 5.0_f64).sqrt();
            vec![(-p, 5.0 / 9.0), (0.0, 8.0 / 9.0), (p, 5.0 / 9.0)]
        }
        4 => {
            // Points: ±√((3 ∓ 2√(6/5))/7)
            let sqrt_6_5 = (6.0 / 5.0_f64).sqrt();
            let p1 = ((3.0 - 2.0 * sqrt_6_5) / 7.0).sqrt();
            let p2 = ((3.0 + 2.0 * sqrt_6_5) / 7.0).sqrt();
            // Weights: (18 ± √30) / 36
            let sqrt_30 = 30.0_f64.sqrt();
            let w1 = (18.0 + sqrt_30) / 36.0;
            let w2 = (18.0 - sqrt_30) / 36.0;
            vec![(-p2, w2), (-p1, w1), (p1, w1), (p2, w2)]
        }
        _ => panic!("gauss_1d: n must be 1, 2, 3, or 4, got {}", n),
    }
}

/// Triangle quadrature points.
///
/// Returns integration points for the unit triangle with vertices at (0,0), (1,0), (0,1).
/// Weights are scaled for the unit triangle (area = 1/2).
///
/// # Arguments
///
/// * `n` - Number of integration points (1, 3, 4, or 6)
///
/// # Integration Order
///
/// - n=1: degree 1 (centroid)
/// - n=3: degree 2 (edge midpoints)
/// - n=4: degree 3
/// - n=6: degree 4 (Dunavant)
///
/// # Panics
///
/// Panics if `n` is not 1, 3, 4, or 6.
pub fn gauss_tri(n: usize) -> Vec<GaussPoint> {
    match n {
        1 => vec![GaussPoint::new([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], 0.5)],
        3 => {
            let w = 1.0 / 6.0;
            vec![
                GaussPoint::new([0.5, 0.5, 0.0], w),
                GaussPoint::new([0.0, 0.5, 0.5], w),
                GaussPoint::new([0.5, 0.0, 0.5], w),
            ]
        }
        4 => {
            let w_center = -27.0 / 96.0;
            let w_corner = 25.0 / 96.0;
            vec![
                GaussPoint::new([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], w_center),
                GaussPoint::new([0.6, 0.2, 0.2], w_corner),
                GaussPoint::new([0.2, 0.6, 0.2], w_corner),
                GaussPoint::new([0.2, 0.2, 0.6], w_corner),
            ]
        }
        6 => {
            let a = 0.445_948_490_915_965;
            let b = 0.091_576_213_509_771;
            let wa = 0.5 * 0.223_381_589_678_011;
            let wb = 0.5 * 0.109_951_743_655_322;
            vec![
                GaussPoint::new([a, a, 1.0 - 2.0 * a], wa),
                GaussPoint::new([a, 1.0 - 2.0 * a, a], wa),
                GaussPoint::new([1.0 - 2.0 * a, a, a], wa),
                GaussPoint::new([b, b, 1.0 - 2.0 * b], wb),
                GaussPoint::new([b, 1.0 - 2.0 * b, b], wb),
                GaussPoint::new([1.0 - 2.0 * b, b, b], wb),
            ]
        }
        _ => panic!("gauss_tri: n must be 1, 3, 4, or 6, got {}", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gauss_1d_integrates_polynomials() {
        // ∫_{-1}^{1} 3 dx = 6
        let rule = gauss_1d(1);
        let integral: f64 = rule.iter().map(|&(_, w)| 3.0 * w).sum();
        assert_relative_eq!(integral, 6.0, epsilon = 1e-14);

        // 2-point rule integrates x³ exactly (degree 2n-1 = 3)
        let rule = gauss_1d(2);
        let integral: f64 = rule.iter().map(|&(x, w)| x.powi(3) * w).sum();
        assert_relative_eq!(integral, 0.0, epsilon = 1e-14);

        // ∫_{-1}^{1} x² dx = 2/3
        let integral: f64 = rule.iter().map(|&(x, w)| x.powi(2) * w).sum();
        assert_relative_eq!(integral, 2.0 / 3.0, epsilon = 1e-14);
    }

    #[test]
    fn test_gauss_1d_weights_sum() {
        for n in 1..=4 {
            let rule = gauss_1d(n);
            let sum: f64 = rule.iter().map(|&(_, w)| w).sum();
            assert_relative_eq!(sum, 2.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_gauss_tri_weights_sum() {
        for &n in &[1, 3, 4, 6] {
            let rule = gauss_tri(n);
            let sum: f64 = rule.iter().map(|gp| gp.weight).sum();
            assert_relative_eq!(sum, 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gauss_tri_area_coordinates_sum() {
        for &n in &[1, 3, 4, 6] {
            for gp in gauss_tri(n) {
                let sum: f64 = gp.coords.iter().sum();
                assert_relative_eq!(sum, 1.0, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_gauss_tri_degree_four() {
        // ∫_T x^a y^b dA = a! b! / (a + b + 2)!, with x = L2 and y = L3
        // ∫_T x⁴ dA = 4! / 6! = 1/30
        let integral: f64 = gauss_tri(6)
            .iter()
            .map(|gp| gp.coords[1].powi(4) * gp.weight)
            .sum();
        assert_relative_eq!(integral, 1.0 / 30.0, epsilon = 1e-12);

        // ∫_T x² y² dA = 2! 2! / 6! = 1/180
        let integral: f64 = gauss_tri(6)
            .iter()
            .map(|gp| gp.coords[1].powi(2) * gp.coords[2].powi(2) * gp.weight)
            .sum();
        assert_relative_eq!(integral, 1.0 / 180.0, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "gauss_1d: n must be")]
    fn test_gauss_1d_invalid_n() {
        gauss_1d(5);
    }

    #[test]
    #[should_panic(expected = "gauss_tri: n must be")]
    fn test_gauss_tri_invalid_n() {
        gauss_tri(5);
    }
}
