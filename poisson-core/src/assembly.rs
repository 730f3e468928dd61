//! Parallel finite element assembly.
//!
//! Assembles the global stiffness matrix and load vector from element
//! contributions using Rayon for shared-memory parallelism. Each worker fills
//! its own triplet buffer; the buffers are concatenated and duplicates summed
//! during CSR conversion.

use crate::bc::DirichletBC;
use crate::error::{Error, Result};
use crate::form::{BilinearForm, LinearForm};
use crate::sparse::{CsrMatrix, LoadVector, TripletMatrix};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Assembled system ready for solving.
#[derive(Debug, Clone)]
pub struct AssembledSystem {
    /// Global matrix after Dirichlet elimination.
    pub matrix: CsrMatrix,
    /// Right-hand side after lifting.
    pub rhs: Vec<f64>,
    /// Number of dofs in the system.
    pub n_dofs: usize,
    /// Constrained dofs and their prescribed values.
    pub constraints: BTreeMap<usize, f64>,
}

/// Assembly options.
#[derive(Debug, Clone, Default)]
pub struct AssemblyOptions {
    /// Number of parallel threads (0 = Rayon's global pool).
    pub n_threads: usize,
}

impl AssemblyOptions {
    /// Run `op` on a pool with the configured thread count.
    fn install<T, F>(&self, op: F) -> Result<T>
    where
        T: Send,
        F: FnOnce() -> Result<T> + Send,
    {
        if self.n_threads == 0 {
            return op();
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.n_threads)
            .build()
            .map_err(|e| Error::Assembly(format!("Failed to build thread pool: {}", e)))?
            .install(op)
    }
}

/// Assemble the global matrix of a bilinear form (no boundary conditions).
pub fn assemble_matrix(form: &BilinearForm) -> Result<CsrMatrix> {
    let space = form.space();
    let n = space.n_dofs();
    let n_cells = space.mesh().n_cells();

    let triplet = (0..n_cells)
        .into_par_iter()
        .try_fold(
            || TripletMatrix::new(n, n),
            |mut acc, cell| -> Result<TripletMatrix> {
                let ke = form.cell_matrix(cell)?;
                acc.add_submatrix(space.cell_dofs(cell), &ke);
                Ok(acc)
            },
        )
        .try_reduce(
            || TripletMatrix::new(n, n),
            |mut a, b| {
                a.append(b);
                Ok(a)
            },
        )?;

    debug!(triplets = triplet.nnz(), "scattered element matrices");
    triplet.to_csr()
}

/// Assemble the global vector of a linear form (no boundary conditions).
pub fn assemble_vector(form: &LinearForm) -> Result<Vec<f64>> {
    let space = form.space();
    let n = space.n_dofs();
    let mesh = space.mesh();

    let mut rhs = (0..mesh.n_cells())
        .into_par_iter()
        .try_fold(
            || LoadVector::zeros(n),
            |mut acc, cell| -> Result<LoadVector> {
                let be = form.cell_vector(cell)?;
                acc.add_subvector(space.cell_dofs(cell), be.as_slice());
                Ok(acc)
            },
        )
        .try_reduce(
            || LoadVector::zeros(n),
            |mut a, b| {
                a += &b;
                Ok(a)
            },
        )?;

    for bc in form.neumann() {
        for &edge in bc.facets() {
            let facet = mesh.boundary_facet(edge).ok_or_else(|| {
                Error::Assembly(format!("Edge {} is not a boundary facet", edge))
            })?;
            let be = form.facet_vector(facet, bc.flux())?;
            rhs.add_subvector(space.cell_dofs(facet.cell), be.as_slice());
        }
    }

    Ok(rhs.into_vec())
}

/// Eliminate Dirichlet dofs symmetrically.
///
/// For each constrained dof `d` with value `g_d`: `b -= A[:, d] g_d`, row and
/// column `d` are zeroed, `A[d, d] = 1` and `b[d] = g_d`. The result stays
/// symmetric positive definite when `A` is SPD on the free dofs.
pub fn apply_dirichlet(
    matrix: &CsrMatrix,
    rhs: &mut [f64],
    constraints: &BTreeMap<usize, f64>,
) -> Result<CsrMatrix> {
    let n = matrix.nrows();
    if matrix.ncols() != n || rhs.len() != n {
        return Err(Error::Assembly(format!(
            "System shape mismatch: matrix {}x{}, rhs {}",
            n,
            matrix.ncols(),
            rhs.len()
        )));
    }
    if let Some((&dof, _)) = constraints.range(n..).next() {
        return Err(Error::Assembly(format!(
            "Constrained dof {} out of bounds (system has {} dofs)",
            dof, n
        )));
    }

    let mut triplet = TripletMatrix::with_capacity(n, n, matrix.nnz());
    for (i, row) in matrix.row_iter().enumerate() {
        if constraints.contains_key(&i) {
            continue;
        }
        for (&j, &a) in row.col_indices().iter().zip(row.values()) {
            match constraints.get(&j) {
                Some(&g) => rhs[i] -= a * g,
                None => triplet.add(i, j, a),
            }
        }
    }
    for (&d, &g) in constraints {
        triplet.add(d, d, 1.0);
        rhs[d] = g;
    }

    triplet.to_csr()
}

/// Assemble `a(u, v) = L(v)` and apply Dirichlet conditions.
///
/// When several conditions constrain the same dof, the last one wins.
pub fn assemble_system(
    a: &BilinearForm,
    l: &LinearForm,
    bcs: &[DirichletBC],
    options: &AssemblyOptions,
) -> Result<AssembledSystem> {
    if !Arc::ptr_eq(a.space(), l.space()) {
        return Err(Error::Assembly(
            "Bilinear and linear forms must share one function space".into(),
        ));
    }
    let space = a.space();
    if let Some(bc) = bcs.iter().find(|bc| !Arc::ptr_eq(bc.space(), space)) {
        return Err(Error::Assembly(format!(
            "Dirichlet condition defined on a different function space ({} dofs, problem has {})",
            bc.space().n_dofs(),
            space.n_dofs()
        )));
    }
    let n_dofs = space.n_dofs();
    let start = Instant::now();

    let (matrix, mut rhs) = options.install(|| Ok((assemble_matrix(a)?, assemble_vector(l)?)))?;

    let mut constraints = BTreeMap::new();
    for bc in bcs {
        constraints.extend(bc.values());
    }
    let matrix = apply_dirichlet(&matrix, &mut rhs, &constraints)?;

    info!(
        n_dofs,
        n_constrained = constraints.len(),
        nnz = matrix.nnz(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1e3,
        "assembled linear system"
    );

    Ok(AssembledSystem {
        matrix,
        rhs,
        n_dofs,
        constraints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bc::{BoundarySide, NeumannBC};
    use crate::function_space::FunctionSpace;
    use crate::mesh::Mesh;
    use crate::sparse::TripletMatrix;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn space(n: usize, degree: usize) -> Arc<FunctionSpace> {
        FunctionSpace::new(Arc::new(Mesh::unit_square(n, n).unwrap()), degree).unwrap()
    }

    #[test]
    fn test_global_matrix_symmetric_with_zero_row_sums() {
        for degree in 1..=2 {
            let v = space(3, degree);
            let k = assemble_matrix(&BilinearForm::laplace(v.clone())).unwrap();
            let dense = DMatrix::from(&k);
            let n = v.n_dofs();
            for i in 0..n {
                let row: f64 = dense.row(i).iter().sum();
                assert_relative_eq!(row, 0.0, epsilon = 1e-12);
                for j in 0..n {
                    assert!(
                        (dense[(i, j)] - dense[(j, i)]).abs() < 1e-12,
                        "Matrix not symmetric at ({}, {})",
                        i,
                        j
                    );
                }
                assert!(dense[(i, i)] > 0.0, "Diagonal {} is not positive", i);
            }
        }
    }

    #[test]
    fn test_p1_interior_stencil() {
        // Right-diagonal P1 Laplacian is the 5-point stencil at interior vertices
        let v = space(4, 1);
        let dense = DMatrix::from(&assemble_matrix(&BilinearForm::laplace(v)).unwrap());
        let center = 2 * 5 + 2;
        assert_relative_eq!(dense[(center, center)], 4.0, epsilon = 1e-12);
        assert_relative_eq!(dense[(center, center + 1)], -1.0, epsilon = 1e-12);
        assert_relative_eq!(dense[(center, center + 5)], -1.0, epsilon = 1e-12);
        assert_relative_eq!(dense[(center, center + 6)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_load_vector_total() {
        let v = space(4, 2);
        let l = LinearForm::new(v.clone())
            .with_source(3.0)
            .with_neumann(NeumannBC::on_whole_boundary(v.mesh(), 0.5));
        let b = assemble_vector(&l).unwrap();
        // ∫ 3 dx over unit square + ∫ 0.5 ds over perimeter 4
        let total: f64 = b.iter().sum();
        assert_relative_eq!(total, 3.0 + 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_apply_dirichlet_symmetric_lifting() {
        // [2 -1; -1 2] u = [0; 0] with u0 = 1
        let mut triplet = TripletMatrix::new(2, 2);
        triplet.add(0, 0, 2.0);
        triplet.add(0, 1, -1.0);
        triplet.add(1, 0, -1.0);
        triplet.add(1, 1, 2.0);
        let k = triplet.to_csr().unwrap();

        let mut rhs = vec![0.0, 0.0];
        let constraints = BTreeMap::from([(0, 1.0)]);
        let k = apply_dirichlet(&k, &mut rhs, &constraints).unwrap();
        let dense = DMatrix::from(&k);

        assert_eq!(dense[(0, 0)], 1.0);
        assert_eq!(dense[(0, 1)], 0.0);
        assert_eq!(dense[(1, 0)], 0.0);
        assert_eq!(dense[(1, 1)], 2.0);
        assert_eq!(rhs, vec![1.0, 1.0]);
    }

    #[test]
    fn test_apply_dirichlet_out_of_bounds() {
        let k = TripletMatrix::new(2, 2).to_csr().unwrap();
        let mut rhs = vec![0.0; 2];
        let constraints = BTreeMap::from([(5, 0.0)]);
        assert!(apply_dirichlet(&k, &mut rhs, &constraints).is_err());
    }

    #[test]
    fn test_assemble_system_with_bcs() {
        let v = space(4, 1);
        let facets = BoundarySide::locate_facets(v.mesh(), &BoundarySide::ALL);
        let bc = DirichletBC::from_facets(&v, &facets, 2.0).unwrap();
        let a = BilinearForm::laplace(v.clone());
        let l = LinearForm::new(v.clone()).with_source(1.0);

        let system = assemble_system(&a, &l, &[bc], &AssemblyOptions { n_threads: 2 }).unwrap();

        assert_eq!(system.n_dofs, 25);
        assert_eq!(system.constraints.len(), 16);
        for (&d, &g) in &system.constraints {
            assert_eq!(system.rhs[d], g);
        }
        let dense = DMatrix::from(&system.matrix);
        assert_relative_eq!((dense.clone() - dense.transpose()).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_last_dirichlet_condition_wins() {
        let v = space(3, 1);
        let facets = BoundarySide::locate_facets(v.mesh(), &BoundarySide::ALL);
        let first = DirichletBC::from_facets(&v, &facets, 1.0).unwrap();
        let second = DirichletBC::from_facets(&v, &facets, 2.0).unwrap();
        let a = BilinearForm::laplace(v.clone());
        let l = LinearForm::new(v.clone());

        let system =
            assemble_system(&a, &l, &[first, second], &AssemblyOptions::default()).unwrap();

        assert_eq!(system.constraints.len(), 12);
        for (&d, &g) in &system.constraints {
            assert_eq!(g, 2.0);
            assert_eq!(system.rhs[d], 2.0);
        }
    }

    #[test]
    fn test_dirichlet_on_other_space_rejected() {
        let v = space(2, 1);
        let fine = space(8, 1);
        let facets = BoundarySide::locate_facets(fine.mesh(), &BoundarySide::ALL);
        let bc = DirichletBC::from_facets(&fine, &facets, 0.0).unwrap();
        let a = BilinearForm::laplace(v.clone());
        let l = LinearForm::new(v);

        let err = assemble_system(&a, &l, &[bc], &AssemblyOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Assembly(_)));
    }

    #[test]
    fn test_assemble_system_rejects_mismatched_spaces() {
        let a = BilinearForm::laplace(space(2, 1));
        let l = LinearForm::new(space(2, 1));
        assert!(assemble_system(&a, &l, &[], &AssemblyOptions::default()).is_err());
    }
}
