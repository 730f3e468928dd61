//! Boundary conditions.
//!
//! - [`DirichletBC`] prescribes solution values on a set of dofs.
//! - [`NeumannBC`] prescribes the outward normal flux `∂u/∂n = g` on a set of
//!   boundary facets; it enters the linear form as `∫ g v ds`.

use crate::error::{Error, Result};
use crate::expression::Expression;
use crate::function_space::FunctionSpace;
use crate::mesh::Mesh;
use crate::types::{is_close, Point2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Fixed solution values on a set of dofs of one function space.
#[derive(Debug, Clone)]
pub struct DirichletBC {
    space: Arc<FunctionSpace>,
    dofs: Vec<usize>,
    value: Expression,
}

impl DirichletBC {
    /// Constrain `dofs` of `space` to the nodal values of `value`.
    pub fn new(
        space: &Arc<FunctionSpace>,
        dofs: Vec<usize>,
        value: impl Into<Expression>,
    ) -> Result<Self> {
        if let Some(&bad) = dofs.iter().find(|&&d| d >= space.n_dofs()) {
            return Err(Error::Assembly(format!(
                "Dirichlet dof {} out of bounds (space has {} dofs)",
                bad,
                space.n_dofs()
            )));
        }
        Ok(Self {
            space: space.clone(),
            dofs,
            value: value.into(),
        })
    }

    /// Constrain all dofs on the closure of the given boundary facets.
    pub fn from_facets(
        space: &Arc<FunctionSpace>,
        facets: &[usize],
        value: impl Into<Expression>,
    ) -> Result<Self> {
        let dofs = space.locate_dofs_topological(facets)?;
        Self::new(space, dofs, value)
    }

    /// Space the dofs are numbered in.
    pub fn space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    /// Constrained dofs.
    pub fn dofs(&self) -> &[usize] {
        &self.dofs
    }

    /// Prescribed value expression.
    pub fn value(&self) -> &Expression {
        &self.value
    }

    /// `(dof, prescribed value)` pairs, evaluated at the dof coordinates.
    pub fn values(&self) -> Vec<(usize, f64)> {
        let coords = self.space.dof_coordinates();
        self.dofs
            .iter()
            .map(|&d| (d, self.value.eval(&coords[d])))
            .collect()
    }
}

/// Prescribed normal flux on boundary facets.
#[derive(Debug, Clone)]
pub struct NeumannBC {
    facets: Vec<usize>,
    flux: Expression,
}

impl NeumannBC {
    /// Flux `g` on the given boundary facets (edge indices).
    pub fn new(mesh: &Mesh, facets: Vec<usize>, flux: impl Into<Expression>) -> Result<Self> {
        if let Some(&bad) = facets.iter().find(|&&f| mesh.boundary_facet(f).is_none()) {
            return Err(Error::Assembly(format!(
                "Edge {} is not a boundary facet",
                bad
            )));
        }
        Ok(Self {
            facets,
            flux: flux.into(),
        })
    }

    /// Flux `g` on every boundary facet.
    pub fn on_whole_boundary(mesh: &Mesh, flux: impl Into<Expression>) -> Self {
        Self {
            facets: mesh.boundary_facets().iter().map(|f| f.index).collect(),
            flux: flux.into(),
        }
    }

    /// Boundary facets carrying the flux.
    pub fn facets(&self) -> &[usize] {
        &self.facets
    }

    /// Flux expression.
    pub fn flux(&self) -> &Expression {
        &self.flux
    }
}

/// A side of an axis-aligned rectangular domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundarySide {
    Left,
    Right,
    Bottom,
    Top,
}

impl BoundarySide {
    /// All four sides.
    pub const ALL: [BoundarySide; 4] = [
        BoundarySide::Left,
        BoundarySide::Right,
        BoundarySide::Bottom,
        BoundarySide::Top,
    ];

    /// Whether `p` lies on this side of the box `[p0, p1]`.
    pub fn contains(self, p: &Point2, p0: &Point2, p1: &Point2) -> bool {
        match self {
            BoundarySide::Left => is_close(p.x, p0.x),
            BoundarySide::Right => is_close(p.x, p1.x),
            BoundarySide::Bottom => is_close(p.y, p0.y),
            BoundarySide::Top => is_close(p.y, p1.y),
        }
    }

    /// Boundary facets of `mesh` lying on any of `sides` of its bounding box.
    pub fn locate_facets(mesh: &Mesh, sides: &[BoundarySide]) -> Vec<usize> {
        let Some((p0, p1)) = mesh.bounds() else {
            return Vec::new();
        };
        mesh.locate_entities_boundary(|p| sides.iter().any(|s| s.contains(p, &p0, &p1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::DiagonalDirection;

    fn demo_mesh() -> Arc<Mesh> {
        Arc::new(
            Mesh::rectangle(
                Point2::new(0.0, 0.0),
                Point2::new(2.0, 1.0),
                8,
                4,
                DiagonalDirection::Right,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_dirichlet_from_facets() {
        let mesh = demo_mesh();
        let v = FunctionSpace::new(mesh.clone(), 1).unwrap();
        let facets = BoundarySide::locate_facets(&mesh, &[BoundarySide::Left, BoundarySide::Right]);
        assert_eq!(facets.len(), 8);

        let bc = DirichletBC::from_facets(&v, &facets, 0.0).unwrap();
        assert_eq!(bc.dofs().len(), 10);
        assert!(bc.values().iter().all(|&(_, g)| g == 0.0));
    }

    #[test]
    fn test_dirichlet_values_from_expression() {
        let mesh = demo_mesh();
        let v = FunctionSpace::new(mesh.clone(), 2).unwrap();
        let facets = BoundarySide::locate_facets(&mesh, &[BoundarySide::Top]);
        let bc = DirichletBC::from_facets(&v, &facets, Expression::new(|p| p.x)).unwrap();

        // 8 facets on top: 9 vertex dofs + 8 edge dofs
        assert_eq!(bc.dofs().len(), 17);
        let coords = v.dof_coordinates();
        for (dof, g) in bc.values() {
            assert_eq!(g, coords[dof].x);
        }
    }

    #[test]
    fn test_dirichlet_rejects_out_of_range_dof() {
        let mesh = demo_mesh();
        let v = FunctionSpace::new(mesh, 1).unwrap();
        assert!(DirichletBC::new(&v, vec![10_000], 1.0).is_err());
    }

    #[test]
    fn test_neumann_validation() {
        let mesh = demo_mesh();
        let all = NeumannBC::on_whole_boundary(&mesh, 1.0);
        assert_eq!(all.facets().len(), 2 * (8 + 4));

        // Find an interior edge
        let interior = (0..mesh.n_edges())
            .find(|&e| mesh.boundary_facet(e).is_none())
            .unwrap();
        assert!(NeumannBC::new(&mesh, vec![interior], 1.0).is_err());
        assert!(NeumannBC::new(&mesh, all.facets().to_vec(), 1.0).is_ok());
    }

    #[test]
    fn test_boundary_side_json() {
        let sides: Vec<BoundarySide> = serde_json::from_str(r#"["left", "top"]"#).unwrap();
        assert_eq!(sides, vec![BoundarySide::Left, BoundarySide::Top]);
    }
}
