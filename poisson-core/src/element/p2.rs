//! 6-node quadratic Lagrange triangle (P2).
//!
//! # Node Numbering
//!
//! ```text
//!        3
//!       /\
//!      /  \
//!     6    5
//!    /      \
//!   /        \
//!  1----4-----2
//! ```
//!
//! - Vertex dofs: 1, 2, 3 (local indices 0, 1, 2)
//! - Edge dofs: 4 (edge 1-2), 5 (edge 2-3), 6 (edge 3-1) (local indices 3, 4, 5)
//!
//! # Shape Functions
//!
//! ```text
//! N1 = L1 * (2*L1 - 1)   (vertex 1)
//! N2 = L2 * (2*L2 - 1)   (vertex 2)
//! N3 = L3 * (2*L3 - 1)   (vertex 3)
//! N4 = 4 * L1 * L2       (edge 1-2)
//! N5 = 4 * L2 * L3       (edge 2-3)
//! N6 = 4 * L3 * L1       (edge 3-1)
//! ```

use crate::element::LagrangeElement;

/// Quadratic Lagrange triangle.
#[derive(Debug, Clone, Copy, Default)]
pub struct P2;

impl LagrangeElement for P2 {
    fn degree(&self) -> usize {
        2
    }

    fn n_dofs(&self) -> usize {
        6
    }

    fn dofs_per_edge(&self) -> usize {
        1
    }

    fn shape_values(&self, l: [f64; 3]) -> Vec<f64> {
        let [l1, l2, l3] = l;
        vec![
            l1 * (2.0 * l1 - 1.0),
            l2 * (2.0 * l2 - 1.0),
            l3 * (2.0 * l3 - 1.0),
            4.0 * l1 * l2,
            4.0 * l2 * l3,
            4.0 * l3 * l1,
        ]
    }

    fn shape_derivatives(&self, l: [f64; 3]) -> Vec<[f64; 3]> {
        let [l1, l2, l3] = l;
        vec![
            [4.0 * l1 - 1.0, 0.0, 0.0],
            [0.0, 4.0 * l2 - 1.0, 0.0],
            [0.0, 0.0, 4.0 * l3 - 1.0],
            [4.0 * l2, 4.0 * l1, 0.0],
            [0.0, 4.0 * l3, 4.0 * l2],
            [4.0 * l3, 0.0, 4.0 * l1],
        ]
    }

    fn cell_quadrature(&self) -> usize {
        6
    }

    fn facet_quadrature(&self) -> usize {
        3
    }
}
