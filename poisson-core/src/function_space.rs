//! Continuous Lagrange function spaces and their dofmaps.
//!
//! Degree 1 places one dof on each mesh vertex. Degree 2 numbers all vertex
//! dofs first (dof = vertex index), then one dof per edge
//! (dof = n_vertices + edge index).

use crate::element::{create_element, LagrangeElement};
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::types::Point2;
use std::sync::Arc;
use tracing::debug;

/// Continuous scalar Lagrange space on a triangular mesh.
#[derive(Debug)]
pub struct FunctionSpace {
    mesh: Arc<Mesh>,
    element: Box<dyn LagrangeElement>,
    /// Flattened cell → dof table, `element.n_dofs()` entries per cell.
    dofmap: Vec<usize>,
    dof_coords: Vec<Point2>,
}

impl FunctionSpace {
    /// Build the space of continuous piecewise polynomials of `degree` on `mesh`.
    pub fn new(mesh: Arc<Mesh>, degree: usize) -> Result<Arc<Self>> {
        if mesh.n_cells() == 0 {
            return Err(Error::FunctionSpace("Mesh has no cells".into()));
        }
        let element = create_element(degree)?;
        let per_cell = element.n_dofs();
        let n_vertices = mesh.n_nodes();

        let mut dofmap = Vec::with_capacity(mesh.n_cells() * per_cell);
        for (cell_idx, cell) in mesh.cells().iter().enumerate() {
            dofmap.extend_from_slice(cell);
            if element.dofs_per_edge() > 0 {
                dofmap.extend(mesh.cell_edges(cell_idx).iter().map(|&e| n_vertices + e));
            }
        }

        let mut dof_coords = mesh.nodes().to_vec();
        if element.dofs_per_edge() > 0 {
            dof_coords.extend(
                mesh.edges()
                    .iter()
                    .map(|[a, b]| (mesh.nodes()[*a] + mesh.nodes()[*b]) * 0.5),
            );
        }

        debug!(
            degree,
            n_dofs = dof_coords.len(),
            n_cells = mesh.n_cells(),
            "built Lagrange function space"
        );

        Ok(Arc::new(Self {
            mesh,
            element,
            dofmap,
            dof_coords,
        }))
    }

    /// The underlying mesh.
    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    /// The reference element.
    pub fn element(&self) -> &dyn LagrangeElement {
        self.element.as_ref()
    }

    /// Polynomial degree.
    pub fn degree(&self) -> usize {
        self.element.degree()
    }

    /// Number of global degrees of freedom.
    pub fn n_dofs(&self) -> usize {
        self.dof_coords.len()
    }

    /// Global dofs of a cell, in local element order.
    pub fn cell_dofs(&self, cell: usize) -> &[usize] {
        let n = self.element.n_dofs();
        &self.dofmap[cell * n..(cell + 1) * n]
    }

    /// Coordinates of every dof.
    pub fn dof_coordinates(&self) -> &[Point2] {
        &self.dof_coords
    }

    /// Global dofs on the closure of an edge.
    pub fn edge_dofs(&self, edge: usize) -> Result<Vec<usize>> {
        let [a, b] = *self.mesh.edges().get(edge).ok_or_else(|| {
            Error::FunctionSpace(format!(
                "Edge index {} out of bounds (mesh has {} edges)",
                edge,
                self.mesh.n_edges()
            ))
        })?;
        let mut dofs = vec![a, b];
        if self.element.dofs_per_edge() > 0 {
            dofs.push(self.mesh.n_nodes() + edge);
        }
        Ok(dofs)
    }

    /// Dofs on the closure of the given edges, sorted and unique.
    pub fn locate_dofs_topological(&self, edges: &[usize]) -> Result<Vec<usize>> {
        let mut dofs = Vec::with_capacity(edges.len() * 3);
        for &edge in edges {
            dofs.extend(self.edge_dofs(edge)?);
        }
        dofs.sort_unstable();
        dofs.dedup();
        Ok(dofs)
    }

    /// Dofs whose coordinates satisfy `marker`, sorted.
    pub fn locate_dofs_geometrical<F>(&self, marker: F) -> Vec<usize>
    where
        F: Fn(&Point2) -> bool,
    {
        self.dof_coords
            .iter()
            .enumerate()
            .filter(|(_, p)| marker(p))
            .map(|(i, _)| i)
            .collect()
    }
}
