//! 3-node linear Lagrange triangle (P1).
//!
//! Shape functions are the area coordinates themselves:
//!
//! ```text
//! N1 = L1,  N2 = L2,  N3 = L3
//! ```
//!
//! Gradients are constant over the cell.

use crate::element::LagrangeElement;

/// Linear Lagrange triangle.
#[derive(Debug, Clone, Copy, Default)]
pub struct P1;

impl LagrangeElement for P1 {
    fn degree(&self) -> usize {
        1
    }

    fn n_dofs(&self) -> usize {
        3
    }

    fn dofs_per_edge(&self) -> usize {
        0
    }

    fn shape_values(&self, l: [f64; 3]) -> Vec<f64> {
        l.to_vec()
    }

    fn shape_derivatives(&self, _l: [f64; 3]) -> Vec<[f64; 3]> {
        vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
    }

    fn cell_quadrature(&self) -> usize {
        3
    }

    fn facet_quadrature(&self) -> usize {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::gauss::gauss_tri;
    use approx::assert_relative_eq;

    #[test]
    fn test_partition_of_unity() {
        for gp in gauss_tri(4) {
            let sum: f64 = P1.shape_values(gp.coords).iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_kronecker_at_vertices() {
        let n = P1.shape_values([0.0, 1.0, 0.0]);
        assert_eq!(n, vec![0.0, 1.0, 0.0]);
    }
}
