//! Lagrange element trait and implementations.
//!
//! The [`LagrangeElement`] trait describes scalar continuous Lagrange basis
//! functions on the reference triangle in area coordinates, so the assembly
//! process can work with any polynomial degree uniformly. [`CellGeometry`]
//! carries the affine map of a physical triangle.
//!
//! # Submodules
//!
//! - [`gauss`] - Quadrature rules for numerical integration
//! - [`p1`] - Linear triangle
//! - [`p2`] - Quadratic triangle

use crate::error::{Error, Result};
use crate::types::{Point2, Vec2};
use nalgebra::Matrix2;

pub mod gauss;
pub mod p1;
pub mod p2;

pub use gauss::{gauss_1d, gauss_tri, GaussPoint};
pub use p1::P1;
pub use p2::P2;

/// Scalar Lagrange element on triangles.
///
/// Local dofs are numbered vertex dofs first (local vertex order), then edge
/// dofs (edge i joins local vertices i and i+1).
///
/// Elements must be thread-safe (Send + Sync) to enable parallel assembly.
pub trait LagrangeElement: Send + Sync + std::fmt::Debug {
    /// Polynomial degree.
    fn degree(&self) -> usize;

    /// Number of local basis functions.
    fn n_dofs(&self) -> usize;

    /// Number of dofs attached to each edge interior.
    fn dofs_per_edge(&self) -> usize;

    /// Basis function values at area coordinates `l`.
    fn shape_values(&self, l: [f64; 3]) -> Vec<f64>;

    /// Basis function derivatives with respect to (L1, L2, L3) at `l`.
    fn shape_derivatives(&self, l: [f64; 3]) -> Vec<[f64; 3]>;

    /// Number of points of the triangle rule used for cell integrals.
    fn cell_quadrature(&self) -> usize;

    /// Number of points of the Gauss-Legendre rule used for facet integrals.
    fn facet_quadrature(&self) -> usize;

    /// Local dofs lying on local edge `edge` (closure: both vertices and interior).
    fn facet_dofs(&self, edge: usize) -> Vec<usize> {
        let mut dofs = vec![edge, (edge + 1) % 3];
        let per_edge = self.dofs_per_edge();
        dofs.extend((0..per_edge).map(|k| 3 + edge * per_edge + k));
        dofs
    }
}

/// Create an element implementation for a polynomial degree.
pub fn create_element(degree: usize) -> Result<Box<dyn LagrangeElement>> {
    match degree {
        1 => Ok(Box::new(P1)),
        2 => Ok(Box::new(P2)),
        _ => Err(Error::Element(format!(
            "Lagrange degree {} is not supported (use 1 or 2)",
            degree
        ))),
    }
}

/// Area coordinates of the point at parameter `t` ∈ [0, 1] along local edge `edge`.
pub fn edge_point(edge: usize, t: f64) -> [f64; 3] {
    let mut l = [0.0; 3];
    l[edge] = 1.0 - t;
    l[(edge + 1) % 3] = t;
    l
}

/// Affine geometry of a physical triangle.
///
/// The mapping uses parametric coordinates (ξ, η) where:
/// - L1 = 1 - ξ - η
/// - L2 = ξ
/// - L3 = η
///
/// so `x = x1 + (x2 - x1) ξ + (x3 - x1) η`.
#[derive(Debug, Clone, Copy)]
pub struct CellGeometry {
    vertices: [Point2; 3],
    det_j: f64,
    /// J^(-T), mapping parametric gradients to physical gradients.
    inv_t: Matrix2<f64>,
}

impl CellGeometry {
    /// Build the affine map of a triangle.
    pub fn new(vertices: [Point2; 3]) -> Result<Self> {
        let [a, b, c] = vertices;
        // Columns are dx/dξ and dx/dη
        let j = Matrix2::new(b.x - a.x, c.x - a.x, b.y - a.y, c.y - a.y);
        let det_j = j.determinant();
        let inv = j.try_inverse().ok_or_else(|| {
            Error::Element(format!(
                "Degenerate cell: Jacobian is singular at ({}, {})",
                a.x, a.y
            ))
        })?;

        Ok(Self {
            vertices,
            det_j,
            inv_t: inv.transpose(),
        })
    }

    /// Absolute Jacobian determinant (twice the cell area).
    pub fn det_j(&self) -> f64 {
        self.det_j.abs()
    }

    /// Cell area.
    pub fn area(&self) -> f64 {
        0.5 * self.det_j()
    }

    /// Physical point at area coordinates `l`.
    pub fn to_physical(&self, l: [f64; 3]) -> Point2 {
        let [a, b, c] = self.vertices;
        a * l[0] + b * l[1] + c * l[2]
    }

    /// Physical gradient of a function given its derivatives in area coordinates.
    pub fn physical_gradient(&self, dn_dl: [f64; 3]) -> Vec2 {
        // dN/dξ = dN/dL2 - dN/dL1, dN/dη = dN/dL3 - dN/dL1
        let dn_dnat = Vec2::new(dn_dl[1] - dn_dl[0], dn_dl[2] - dn_dl[0]);
        self.inv_t * dn_dnat
    }

    /// Length of local edge `edge`.
    pub fn edge_length(&self, edge: usize) -> f64 {
        (self.vertices[(edge + 1) % 3] - self.vertices[edge]).norm()
    }

    /// Outward unit normal of local edge `edge` (counter-clockwise cells).
    pub fn edge_normal(&self, edge: usize) -> Vec2 {
        let t = self.vertices[(edge + 1) % 3] - self.vertices[edge];
        let n = Vec2::new(t.y, -t.x);
        if self.det_j > 0.0 {
            n / n.norm()
        } else {
            -n / n.norm()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference() -> CellGeometry {
        CellGeometry::new([
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_create_element() {
        assert_eq!(create_element(1).unwrap().n_dofs(), 3);
        assert_eq!(create_element(2).unwrap().n_dofs(), 6);
        assert!(create_element(3).is_err());
        assert!(create_element(0).is_err());
    }

    #[test]
    fn test_reference_geometry() {
        let geom = reference();
        assert_relative_eq!(geom.area(), 0.5, epsilon = 1e-14);
        let g = geom.physical_gradient([0.0, 1.0, 0.0]);
        assert_relative_eq!(g.x, 1.0, epsilon = 1e-14);
        assert_relative_eq!(g.y, 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_scaled_geometry_gradients() {
        let geom = CellGeometry::new([
            Point2::new(1.0, 1.0),
            Point2::new(3.0, 1.0),
            Point2::new(1.0, 2.0),
        ])
        .unwrap();

        assert_relative_eq!(geom.area(), 1.0, epsilon = 1e-14);
        // L2 = (x - 1) / 2, L3 = y - 1
        let g2 = geom.physical_gradient([0.0, 1.0, 0.0]);
        assert_relative_eq!(g2.x, 0.5, epsilon = 1e-14);
        assert_relative_eq!(g2.y, 0.0, epsilon = 1e-14);
        let g3 = geom.physical_gradient([0.0, 0.0, 1.0]);
        assert_relative_eq!(g3.x, 0.0, epsilon = 1e-14);
        assert_relative_eq!(g3.y, 1.0, epsilon = 1e-14);

        let p = geom.to_physical([0.0, 0.5, 0.5]);
        assert_relative_eq!(p.x, 2.0, epsilon = 1e-14);
        assert_relative_eq!(p.y, 1.5, epsilon = 1e-14);
    }

    #[test]
    fn test_degenerate_geometry() {
        let result = CellGeometry::new([
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_edge_normals_point_outward() {
        let geom = reference();
        let n0 = geom.edge_normal(0);
        assert_relative_eq!(n0.y, -1.0, epsilon = 1e-14);
        let n2 = geom.edge_normal(2);
        assert_relative_eq!(n2.x, -1.0, epsilon = 1e-14);
        assert_relative_eq!(geom.edge_length(1), 2.0_f64.sqrt(), epsilon = 1e-14);
    }

    #[test]
    fn test_facet_dofs() {
        assert_eq!(P1.facet_dofs(2), vec![2, 0]);
        assert_eq!(P2.facet_dofs(1), vec![1, 2, 4]);
    }

    #[test]
    fn test_edge_point() {
        assert_eq!(edge_point(2, 0.25), [0.25, 0.0, 0.75]);
    }
}
