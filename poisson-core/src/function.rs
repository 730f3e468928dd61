//! Finite element functions and post-processing.
//!
//! A [`Function`] is a coefficient vector on a [`FunctionSpace`]. After a
//! solve it supports point evaluation, cell-wise gradient recovery and error
//! norms against a known solution:
//! 1. Loop through all cells (in parallel)
//! 2. Gather the cell's dof values from the global vector
//! 3. Evaluate `u_h = Σ u_i φ_i` (or its gradient) at quadrature points

use crate::element::{gauss_tri, CellGeometry};
use crate::error::{Error, Result};
use crate::expression::Expression;
use crate::function_space::FunctionSpace;
use crate::types::{Point2, Vec2};
use rayon::prelude::*;
use std::sync::Arc;

/// Quadrature used for error integrals, one degree above what P2 needs.
const ERROR_QUADRATURE: usize = 6;

/// A finite element function `u_h = Σ u_i φ_i`.
#[derive(Debug, Clone)]
pub struct Function {
    space: Arc<FunctionSpace>,
    values: Vec<f64>,
    name: String,
}

impl Function {
    /// The zero function.
    pub fn zeros(space: Arc<FunctionSpace>) -> Self {
        let n = space.n_dofs();
        Self {
            space,
            values: vec![0.0; n],
            name: "u".to_string(),
        }
    }

    /// Wrap a coefficient vector.
    pub fn from_values(space: Arc<FunctionSpace>, values: Vec<f64>) -> Result<Self> {
        if values.len() != space.n_dofs() {
            return Err(Error::FunctionSpace(format!(
                "Expected {} coefficients, got {}",
                space.n_dofs(),
                values.len()
            )));
        }
        Ok(Self {
            space,
            values,
            name: "u".to_string(),
        })
    }

    /// Nodal interpolant of an expression.
    pub fn interpolate(space: Arc<FunctionSpace>, expr: &Expression) -> Self {
        let values = space.dof_coordinates().iter().map(|p| expr.eval(p)).collect();
        Self {
            space,
            values,
            name: "u".to_string(),
        }
    }

    /// Set the field name used by output writers.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The function space.
    pub fn space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    /// Coefficient vector.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Smallest coefficient.
    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest coefficient.
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Values at mesh vertices.
    ///
    /// Vertex dofs are numbered first and coincide with vertex indices for
    /// every supported degree.
    pub fn vertex_values(&self) -> &[f64] {
        &self.values[..self.space.mesh().n_nodes()]
    }

    fn cell_values(&self, cell: usize) -> impl Iterator<Item = f64> + '_ {
        self.space.cell_dofs(cell).iter().map(|&d| self.values[d])
    }

    fn value_at(&self, cell: usize, l: [f64; 3]) -> f64 {
        self.space
            .element()
            .shape_values(l)
            .into_iter()
            .zip(self.cell_values(cell))
            .map(|(n, u)| n * u)
            .sum()
    }

    fn gradient_at(&self, cell: usize, geom: &CellGeometry, l: [f64; 3]) -> Vec2 {
        self.space
            .element()
            .shape_derivatives(l)
            .into_iter()
            .zip(self.cell_values(cell))
            .map(|(d, u)| geom.physical_gradient(d) * u)
            .sum()
    }

    /// Evaluate at a point; `None` outside the mesh.
    pub fn eval(&self, point: &Point2) -> Option<f64> {
        let (cell, l) = self.space.mesh().locate_point(point)?;
        Some(self.value_at(cell, l))
    }

    /// Cell-averaged gradient `∇u_h` for every cell.
    pub fn gradients(&self) -> Result<Vec<Vec2>> {
        let mesh = self.space.mesh();
        (0..mesh.n_cells())
            .into_par_iter()
            .map(|cell| -> Result<Vec2> {
                let geom = CellGeometry::new(mesh.cell_coords(cell))?;
                let rule = gauss_tri(3);
                let sum: Vec2 = rule
                    .iter()
                    .map(|gp| self.gradient_at(cell, &geom, gp.coords) * gp.weight)
                    .sum();
                // weights sum to 1/2
                Ok(sum * 2.0)
            })
            .collect()
    }

    /// `‖u_h - u‖_L2` against an exact solution.
    pub fn errornorm_l2(&self, exact: &Expression) -> Result<f64> {
        let mesh = self.space.mesh();
        let squared: f64 = (0..mesh.n_cells())
            .into_par_iter()
            .map(|cell| -> Result<f64> {
                let geom = CellGeometry::new(mesh.cell_coords(cell))?;
                Ok(gauss_tri(ERROR_QUADRATURE)
                    .iter()
                    .map(|gp| {
                        let e = self.value_at(cell, gp.coords) - exact.eval(&geom.to_physical(gp.coords));
                        gp.weight * geom.det_j() * e * e
                    })
                    .sum())
            })
            .sum::<Result<f64>>()?;
        Ok(squared.sqrt())
    }

    /// `|u_h - u|_H1` (gradient seminorm) against an exact gradient.
    pub fn errornorm_h1_semi<G>(&self, exact_grad: G) -> Result<f64>
    where
        G: Fn(&Point2) -> Vec2 + Sync,
    {
        let mesh = self.space.mesh();
        let squared: f64 = (0..mesh.n_cells())
            .into_par_iter()
            .map(|cell| -> Result<f64> {
                let geom = CellGeometry::new(mesh.cell_coords(cell))?;
                Ok(gauss_tri(ERROR_QUADRATURE)
                    .iter()
                    .map(|gp| {
                        let e = self.gradient_at(cell, &geom, gp.coords)
                            - exact_grad(&geom.to_physical(gp.coords));
                        gp.weight * geom.det_j() * e.norm_squared()
                    })
                    .sum())
            })
            .sum::<Result<f64>>()?;
        Ok(squared.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use approx::assert_relative_eq;

    fn space(degree: usize) -> Arc<FunctionSpace> {
        FunctionSpace::new(Arc::new(Mesh::unit_square(4, 4).unwrap()), degree).unwrap()
    }

    #[test]
    fn test_from_values_checks_length() {
        let v = space(1);
        assert!(Function::from_values(v.clone(), vec![0.0; 3]).is_err());
        assert!(Function::from_values(v.clone(), vec![0.0; v.n_dofs()]).is_ok());
    }

    #[test]
    fn test_interpolate_linear_is_exact() {
        let v = space(1);
        let u = Function::interpolate(v, &Expression::new(|p| 2.0 * p.x - p.y + 1.0));

        let value = u.eval(&Point2::new(0.33, 0.71)).unwrap();
        assert_relative_eq!(value, 2.0 * 0.33 - 0.71 + 1.0, epsilon = 1e-12);
        assert!(u.eval(&Point2::new(2.0, 0.0)).is_none());

        for g in u.gradients().unwrap() {
            assert_relative_eq!(g.x, 2.0, epsilon = 1e-12);
            assert_relative_eq!(g.y, -1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(u.min(), 0.0, epsilon = 1e-14);
        assert_relative_eq!(u.max(), 3.0, epsilon = 1e-14);
    }

    #[test]
    fn test_p2_reproduces_quadratics() {
        let exact = Expression::new(|p| 1.0 + p.x * p.x + 2.0 * p.y * p.y);
        let u = Function::interpolate(space(2), &exact);

        assert_relative_eq!(u.errornorm_l2(&exact).unwrap(), 0.0, epsilon = 1e-12);
        let h1 = u
            .errornorm_h1_semi(|p| Vec2::new(2.0 * p.x, 4.0 * p.y))
            .unwrap();
        assert_relative_eq!(h1, 0.0, epsilon = 1e-11);
    }

    #[test]
    fn test_errornorm_of_constant_offset() {
        let v = space(1);
        let u = Function::interpolate(v, &Expression::constant(1.0));
        // ‖1 - 0‖ over the unit square
        let err = u.errornorm_l2(&Expression::constant(0.0)).unwrap();
        assert_relative_eq!(err, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_vertex_values() {
        let v = space(2);
        let u = Function::interpolate(v.clone(), &Expression::new(|p| p.x + p.y));
        let n_nodes = v.mesh().n_nodes();
        assert_eq!(u.vertex_values().len(), n_nodes);
        for (p, &val) in v.mesh().nodes().iter().zip(u.vertex_values()) {
            assert_relative_eq!(val, p.x + p.y, epsilon = 1e-14);
        }
    }
}
