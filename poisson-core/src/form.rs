//! Weak form of the Poisson problem.
//!
//! ```text
//! a(u, v) = ∫_Ω κ ∇u·∇v dx
//! L(v)    = ∫_Ω f v dx + Σ ∫_Γ_N g v ds
//! ```
//!
//! Each form exposes local kernels (element matrix, element vector, facet
//! vector) that [`crate::assembly`] scatters into global storage.

use crate::bc::NeumannBC;
use crate::element::{edge_point, gauss_1d, gauss_tri, CellGeometry};
use crate::error::{Error, Result};
use crate::expression::Expression;
use crate::function_space::FunctionSpace;
use crate::mesh::Facet;
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

/// Bilinear form `a(u, v) = ∫ κ ∇u·∇v dx`.
#[derive(Debug, Clone)]
pub struct BilinearForm {
    space: Arc<FunctionSpace>,
    kappa: Expression,
}

impl BilinearForm {
    /// The Laplace operator with unit coefficient.
    pub fn laplace(space: Arc<FunctionSpace>) -> Self {
        Self {
            space,
            kappa: Expression::constant(1.0),
        }
    }

    /// Replace the diffusion coefficient κ.
    pub fn with_coefficient(mut self, kappa: impl Into<Expression>) -> Self {
        self.kappa = kappa.into();
        self
    }

    /// Trial and test space.
    pub fn space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    /// Diffusion coefficient.
    pub fn coefficient(&self) -> &Expression {
        &self.kappa
    }

    /// Element matrix `K_ij = ∫_T κ ∇φ_j·∇φ_i dx`.
    pub fn cell_matrix(&self, cell: usize) -> Result<DMatrix<f64>> {
        let element = self.space.element();
        let geom = CellGeometry::new(self.space.mesh().cell_coords(cell))?;
        let n = element.n_dofs();
        let mut k = DMatrix::zeros(n, n);
        let constant_kappa = self.kappa.as_constant();

        for gp in gauss_tri(element.cell_quadrature()) {
            let kappa = match constant_kappa {
                Some(c) => c,
                None => self.kappa.eval(&geom.to_physical(gp.coords)),
            };
            let grads: Vec<_> = element
                .shape_derivatives(gp.coords)
                .into_iter()
                .map(|d| geom.physical_gradient(d))
                .collect();

            let scale = gp.weight * geom.det_j() * kappa;
            for i in 0..n {
                for j in i..n {
                    let v = scale * grads[i].dot(&grads[j]);
                    k[(i, j)] += v;
                    if i != j {
                        k[(j, i)] += v;
                    }
                }
            }
        }

        Ok(k)
    }
}

/// Linear form `L(v) = ∫ f v dx + Σ ∫ g v ds`.
#[derive(Debug, Clone)]
pub struct LinearForm {
    space: Arc<FunctionSpace>,
    source: Option<Expression>,
    neumann: Vec<NeumannBC>,
}

impl LinearForm {
    /// Empty linear form on `space`.
    pub fn new(space: Arc<FunctionSpace>) -> Self {
        Self {
            space,
            source: None,
            neumann: Vec::new(),
        }
    }

    /// Add the volume source term `∫ f v dx`.
    pub fn with_source(mut self, f: impl Into<Expression>) -> Self {
        self.source = Some(f.into());
        self
    }

    /// Add a boundary flux term `∫ g v ds`.
    pub fn with_neumann(mut self, bc: NeumannBC) -> Self {
        self.neumann.push(bc);
        self
    }

    /// Test space.
    pub fn space(&self) -> &Arc<FunctionSpace> {
        &self.space
    }

    /// Volume source, if any.
    pub fn source(&self) -> Option<&Expression> {
        self.source.as_ref()
    }

    /// Boundary flux terms.
    pub fn neumann(&self) -> &[NeumannBC] {
        &self.neumann
    }

    /// Element source vector `b_i = ∫_T f φ_i dx`.
    pub fn cell_vector(&self, cell: usize) -> Result<DVector<f64>> {
        let element = self.space.element();
        let mut b = DVector::zeros(element.n_dofs());
        let Some(f) = &self.source else {
            return Ok(b);
        };

        let geom = CellGeometry::new(self.space.mesh().cell_coords(cell))?;
        for gp in gauss_tri(element.cell_quadrature()) {
            let fx = f.eval(&geom.to_physical(gp.coords));
            let scale = gp.weight * geom.det_j() * fx;
            for (bi, ni) in b.iter_mut().zip(element.shape_values(gp.coords)) {
                *bi += scale * ni;
            }
        }

        Ok(b)
    }

    /// Facet flux vector `b_i = ∫_F g φ_i ds`, in the local dof order of the owning cell.
    pub fn facet_vector(&self, facet: &Facet, g: &Expression) -> Result<DVector<f64>> {
        let element = self.space.element();
        let mesh = self.space.mesh();
        if facet.cell >= mesh.n_cells() || facet.local_index >= 3 {
            return Err(Error::Assembly(format!(
                "Facet {} refers to an invalid cell or local edge",
                facet.index
            )));
        }

        let geom = CellGeometry::new(mesh.cell_coords(facet.cell))?;
        let length = geom.edge_length(facet.local_index);
        let local = element.facet_dofs(facet.local_index);
        let mut b = DVector::zeros(element.n_dofs());

        for (xi, w) in gauss_1d(element.facet_quadrature()) {
            // Map [-1, 1] onto the edge parameter t ∈ [0, 1]
            let t = 0.5 * (xi + 1.0);
            let l = edge_point(facet.local_index, t);
            let gx = g.eval(&geom.to_physical(l));
            let n = element.shape_values(l);
            let scale = 0.5 * w * length * gx;
            for &i in &local {
                b[i] += scale * n[i];
            }
        }

        Ok(b)
    }
}
