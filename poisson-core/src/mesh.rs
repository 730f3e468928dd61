//! Triangular mesh data structure.
//!
//! Stores vertex coordinates and cell connectivity, plus a lazily built
//! facet (edge) topology used to locate boundary entities.

use crate::error::{Error, Result};
use crate::types::Point2;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Supported cell types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellType {
    /// 3-vertex linear triangle.
    Triangle,
}

impl CellType {
    /// Number of vertices for this cell type.
    pub fn n_vertices(self) -> usize {
        match self {
            CellType::Triangle => 3,
        }
    }

    /// Number of facets (edges) for this cell type.
    pub fn n_facets(self) -> usize {
        match self {
            CellType::Triangle => 3,
        }
    }
}

/// How each rectangle of a structured mesh is split into triangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagonalDirection {
    /// Split along the lower-left to upper-right diagonal.
    #[default]
    Right,
    /// Split along the upper-left to lower-right diagonal.
    Left,
    /// Insert a centre vertex and split into four triangles.
    Crossed,
}

/// A boundary facet with the cell it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facet {
    /// Global edge index.
    pub index: usize,
    /// Edge vertices, in the counter-clockwise order of the owning cell.
    pub vertices: [usize; 2],
    /// The single cell adjacent to this facet.
    pub cell: usize,
    /// Local edge number within the cell (edge i joins local vertices i and i+1).
    pub local_index: usize,
}

/// Edge topology derived from cell connectivity.
#[derive(Debug, Clone)]
struct Topology {
    /// Unique edges as sorted vertex pairs.
    edges: Vec<[usize; 2]>,
    /// Global edge index for each local edge of each cell.
    cell_edges: Vec<[usize; 3]>,
    /// Facets adjacent to exactly one cell, sorted by edge index.
    boundary: Vec<Facet>,
}

impl Topology {
    fn build(cells: &[[usize; 3]]) -> Self {
        let mut edge_ids: HashMap<[usize; 2], usize> = HashMap::with_capacity(cells.len() * 2);
        let mut edges = Vec::new();
        let mut owners: Vec<Vec<(usize, usize)>> = Vec::new();
        let mut cell_edges = Vec::with_capacity(cells.len());

        for (cell_idx, cell) in cells.iter().enumerate() {
            let mut local = [0usize; 3];
            for (i, slot) in local.iter_mut().enumerate() {
                let a = cell[i];
                let b = cell[(i + 1) % 3];
                let key = if a < b { [a, b] } else { [b, a] };
                let id = *edge_ids.entry(key).or_insert_with(|| {
                    edges.push(key);
                    owners.push(Vec::with_capacity(2));
                    edges.len() - 1
                });
                owners[id].push((cell_idx, i));
                *slot = id;
            }
            cell_edges.push(local);
        }

        let boundary = owners
            .iter()
            .enumerate()
            .filter(|(_, o)| o.len() == 1)
            .map(|(index, o)| {
                let (cell, local_index) = o[0];
                let c = cells[cell];
                Facet {
                    index,
                    vertices: [c[local_index], c[(local_index + 1) % 3]],
                    cell,
                    local_index,
                }
            })
            .collect();

        Self {
            edges,
            cell_edges,
            boundary,
        }
    }
}

/// Finite element mesh of triangles.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Vertex coordinates.
    nodes: Vec<Point2>,
    /// Cell connectivity, counter-clockwise.
    cells: Vec<[usize; 3]>,
    cell_type: CellType,
    topology: OnceLock<Topology>,
}

impl Mesh {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(n_nodes: usize, n_cells: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(n_nodes),
            cells: Vec::with_capacity(n_cells),
            cell_type: CellType::Triangle,
            topology: OnceLock::new(),
        }
    }

    /// Structured triangulation of the box spanned by `p0` (lower left) and `p1` (upper right).
    ///
    /// Produces `(nx + 1) * (ny + 1)` grid vertices. `Right` and `Left` give
    /// `2 * nx * ny` cells, `Crossed` adds one vertex per rectangle and gives
    /// `4 * nx * ny` cells.
    pub fn rectangle(
        p0: Point2,
        p1: Point2,
        nx: usize,
        ny: usize,
        diagonal: DiagonalDirection,
    ) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(Error::Mesh(format!(
                "Rectangle mesh needs at least one cell per direction, got {}x{}",
                nx, ny
            )));
        }
        let (lx, ly) = (p1.x - p0.x, p1.y - p0.y);
        if !(lx > 0.0 && ly > 0.0) {
            return Err(Error::Mesh(format!(
                "Degenerate rectangle: ({}, {}) to ({}, {})",
                p0.x, p0.y, p1.x, p1.y
            )));
        }

        let n_grid = (nx + 1) * (ny + 1);
        let (n_nodes, n_cells) = match diagonal {
            DiagonalDirection::Crossed => (n_grid + nx * ny, 4 * nx * ny),
            _ => (n_grid, 2 * nx * ny),
        };
        let mut mesh = Self::with_capacity(n_nodes, n_cells);

        let dx = lx / nx as f64;
        let dy = ly / ny as f64;
        for j in 0..=ny {
            for i in 0..=nx {
                mesh.add_node(Point2::new(p0.x + i as f64 * dx, p0.y + j as f64 * dy));
            }
        }
        if diagonal == DiagonalDirection::Crossed {
            for j in 0..ny {
                for i in 0..nx {
                    mesh.add_node(Point2::new(
                        p0.x + (i as f64 + 0.5) * dx,
                        p0.y + (j as f64 + 0.5) * dy,
                    ));
                }
            }
        }

        let vertex = |i: usize, j: usize| j * (nx + 1) + i;
        for j in 0..ny {
            for i in 0..nx {
                let v0 = vertex(i, j);
                let v1 = vertex(i + 1, j);
                let v2 = vertex(i, j + 1);
                let v3 = vertex(i + 1, j + 1);
                match diagonal {
                    DiagonalDirection::Right => {
                        mesh.push_cell([v0, v1, v3]);
                        mesh.push_cell([v0, v3, v2]);
                    }
                    DiagonalDirection::Left => {
                        mesh.push_cell([v0, v1, v2]);
                        mesh.push_cell([v1, v3, v2]);
                    }
                    DiagonalDirection::Crossed => {
                        let c = n_grid + j * nx + i;
                        mesh.push_cell([v0, v1, c]);
                        mesh.push_cell([v1, v3, c]);
                        mesh.push_cell([v3, v2, c]);
                        mesh.push_cell([v2, v0, c]);
                    }
                }
            }
        }

        Ok(mesh)
    }

    /// Structured mesh of the unit square.
    pub fn unit_square(nx: usize, ny: usize) -> Result<Self> {
        Self::rectangle(
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            nx,
            ny,
            DiagonalDirection::Right,
        )
    }

    /// Add a vertex to the mesh, returning its index.
    pub fn add_node(&mut self, point: Point2) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(point);
        idx
    }

    /// Add a triangle to the mesh.
    ///
    /// Clockwise input is reordered to counter-clockwise.
    pub fn add_cell(&mut self, vertices: &[usize]) -> Result<usize> {
        if vertices.len() != self.cell_type.n_vertices() {
            return Err(Error::Mesh(format!(
                "Cell type {:?} requires {} vertices, got {}",
                self.cell_type,
                self.cell_type.n_vertices(),
                vertices.len()
            )));
        }

        for &v in vertices {
            if v >= self.nodes.len() {
                return Err(Error::Mesh(format!(
                    "Vertex index {} out of bounds (mesh has {} vertices)",
                    v,
                    self.nodes.len()
                )));
            }
        }

        let mut cell = [vertices[0], vertices[1], vertices[2]];
        let signed = self.signed_area(&cell);
        if signed.abs() <= f64::EPSILON * self.longest_edge_squared(&cell) {
            return Err(Error::Mesh(format!(
                "Degenerate cell with vertices {:?} (zero area)",
                cell
            )));
        }
        if signed < 0.0 {
            cell.swap(1, 2);
        }

        Ok(self.push_cell(cell))
    }

    fn push_cell(&mut self, cell: [usize; 3]) -> usize {
        let idx = self.cells.len();
        self.cells.push(cell);
        self.topology = OnceLock::new();
        idx
    }

    fn signed_area(&self, cell: &[usize; 3]) -> f64 {
        let a = self.nodes[cell[0]];
        let b = self.nodes[cell[1]];
        let c = self.nodes[cell[2]];
        0.5 * ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y))
    }

    fn longest_edge_squared(&self, cell: &[usize; 3]) -> f64 {
        (0..3)
            .map(|i| (self.nodes[cell[(i + 1) % 3]] - self.nodes[cell[i]]).norm_squared())
            .fold(0.0, f64::max)
    }

    fn topology(&self) -> &Topology {
        self.topology.get_or_init(|| Topology::build(&self.cells))
    }

    /// Cell type of every cell in the mesh.
    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    /// Number of vertices in the mesh.
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of cells in the mesh.
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Vertex coordinates.
    pub fn nodes(&self) -> &[Point2] {
        &self.nodes
    }

    /// A specific vertex's coordinates.
    pub fn node(&self, idx: usize) -> Option<&Point2> {
        self.nodes.get(idx)
    }

    /// Cell connectivity.
    pub fn cells(&self) -> &[[usize; 3]] {
        &self.cells
    }

    /// Coordinates of a cell's vertices.
    pub fn cell_coords(&self, cell: usize) -> [Point2; 3] {
        let c = self.cells[cell];
        [self.nodes[c[0]], self.nodes[c[1]], self.nodes[c[2]]]
    }

    /// Area of a cell.
    pub fn cell_area(&self, cell: usize) -> f64 {
        self.signed_area(&self.cells[cell])
    }

    /// Sum of all cell areas.
    pub fn total_area(&self) -> f64 {
        (0..self.cells.len()).map(|c| self.cell_area(c)).sum()
    }

    /// Number of unique edges.
    pub fn n_edges(&self) -> usize {
        self.topology().edges.len()
    }

    /// Unique edges as sorted vertex pairs.
    pub fn edges(&self) -> &[[usize; 2]] {
        &self.topology().edges
    }

    /// Global edge indices of a cell's three local edges.
    pub fn cell_edges(&self, cell: usize) -> [usize; 3] {
        self.topology().cell_edges[cell]
    }

    /// Facets on the domain boundary.
    pub fn boundary_facets(&self) -> &[Facet] {
        &self.topology().boundary
    }

    /// Boundary facet with the given edge index, if the edge is on the boundary.
    pub fn boundary_facet(&self, edge: usize) -> Option<&Facet> {
        let boundary = &self.topology().boundary;
        boundary
            .binary_search_by_key(&edge, |f| f.index)
            .ok()
            .map(|i| &boundary[i])
    }

    /// Boundary facets whose vertices all satisfy `marker`.
    ///
    /// Returns sorted edge indices.
    pub fn locate_entities_boundary<F>(&self, marker: F) -> Vec<usize>
    where
        F: Fn(&Point2) -> bool,
    {
        self.boundary_facets()
            .iter()
            .filter(|f| f.vertices.iter().all(|&v| marker(&self.nodes[v])))
            .map(|f| f.index)
            .collect()
    }

    /// Longest edge length.
    pub fn h_max(&self) -> f64 {
        self.edges()
            .iter()
            .map(|[a, b]| (self.nodes[*b] - self.nodes[*a]).norm())
            .fold(0.0, f64::max)
    }

    /// Compute mesh bounding box.
    pub fn bounds(&self) -> Option<(Point2, Point2)> {
        let first = *self.nodes.first()?;
        let mut min = first;
        let mut max = first;

        for node in &self.nodes[1..] {
            for i in 0..2 {
                min[i] = min[i].min(node[i]);
                max[i] = max[i].max(node[i]);
            }
        }

        Some((min, max))
    }

    /// Find a cell containing `point` and its barycentric coordinates there.
    pub fn locate_point(&self, point: &Point2) -> Option<(usize, [f64; 3])> {
        const TOL: f64 = 1e-10;
        self.cells.iter().enumerate().find_map(|(idx, _)| {
            let [a, b, c] = self.cell_coords(idx);
            let det = (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y);
            let l2 = ((point.x - a.x) * (c.y - a.y) - (c.x - a.x) * (point.y - a.y)) / det;
            let l3 = ((b.x - a.x) * (point.y - a.y) - (point.x - a.x) * (b.y - a.y)) / det;
            let l1 = 1.0 - l2 - l3;
            (l1 >= -TOL && l2 >= -TOL && l3 >= -TOL).then_some((idx, [l1, l2, l3]))
        })
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer tags attached to boundary facets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshTags {
    /// Tagged edge indices, sorted.
    indices: Vec<usize>,
    /// Tag of each entry in `indices`.
    values: Vec<i32>,
}

impl MeshTags {
    /// Tag boundary facets with the first marker whose predicate holds on all facet vertices.
    pub fn from_markers<F>(mesh: &Mesh, markers: &[(i32, F)]) -> Self
    where
        F: Fn(&Point2) -> bool,
    {
        let mut tags = Self::default();
        for facet in mesh.boundary_facets() {
            let hit = markers.iter().find(|(_, marker)| {
                facet
                    .vertices
                    .iter()
                    .all(|&v| marker(&mesh.nodes()[v]))
            });
            if let Some((tag, _)) = hit {
                tags.indices.push(facet.index);
                tags.values.push(*tag);
            }
        }
        tags
    }

    /// Edge indices carrying `tag`.
    pub fn find(&self, tag: i32) -> Vec<usize> {
        self.indices
            .iter()
            .zip(&self.values)
            .filter(|(_, v)| **v == tag)
            .map(|(&i, _)| i)
            .collect()
    }

    /// Tag of an edge, if tagged.
    pub fn value(&self, edge: usize) -> Option<i32> {
        self.indices
            .binary_search(&edge)
            .ok()
            .map(|i| self.values[i])
    }

    /// Number of tagged facets.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True if no facet is tagged.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mesh_creation() {
        let mut mesh = Mesh::new();
        mesh.add_node(Point2::new(0.0, 0.0));
        mesh.add_node(Point2::new(1.0, 0.0));
        mesh.add_node(Point2::new(0.0, 1.0));

        assert_eq!(mesh.n_nodes(), 3);
        mesh.add_cell(&[0, 1, 2]).unwrap();
        assert_eq!(mesh.n_cells(), 1);
        assert_relative_eq!(mesh.cell_area(0), 0.5, epsilon = 1e-14);
    }

    #[test]
    fn test_clockwise_cell_is_reordered() {
        let mut mesh = Mesh::new();
        mesh.add_node(Point2::new(0.0, 0.0));
        mesh.add_node(Point2::new(1.0, 0.0));
        mesh.add_node(Point2::new(0.0, 1.0));

        mesh.add_cell(&[0, 2, 1]).unwrap();
        assert_eq!(mesh.cells()[0], [0, 1, 2]);
        assert!(mesh.cell_area(0) > 0.0);
    }

    #[test]
    fn test_invalid_cell_vertex_count() {
        let mut mesh = Mesh::new();
        mesh.add_node(Point2::new(0.0, 0.0));
        mesh.add_node(Point2::new(1.0, 0.0));

        assert!(mesh.add_cell(&[0, 1]).is_err());
    }

    #[test]
    fn test_invalid_vertex_index() {
        let mut mesh = Mesh::new();
        mesh.add_node(Point2::new(0.0, 0.0));

        assert!(mesh.add_cell(&[0, 1, 2]).is_err());
    }

    #[test]
    fn test_degenerate_cell_rejected() {
        let mut mesh = Mesh::new();
        mesh.add_node(Point2::new(0.0, 0.0));
        mesh.add_node(Point2::new(1.0, 0.0));
        mesh.add_node(Point2::new(2.0, 0.0));

        assert!(mesh.add_cell(&[0, 1, 2]).is_err());

        // coincident vertices
        mesh.add_node(Point2::new(1.0, 0.0));
        assert!(mesh.add_cell(&[0, 1, 3]).is_err());
    }

    #[test]
    fn test_small_cell_accepted_in_large_mesh() {
        let mut mesh = Mesh::new();
        mesh.add_node(Point2::new(1.0e6, 1.0e6));
        mesh.add_node(Point2::new(0.0, 0.0));
        mesh.add_node(Point2::new(1.0e-6, 0.0));
        mesh.add_node(Point2::new(0.0, 1.0e-6));

        let cell = mesh.add_cell(&[1, 2, 3]).unwrap();
        assert_relative_eq!(mesh.cell_area(cell), 0.5e-12, max_relative = 1e-12);
    }

    #[test]
    fn test_rectangle_counts() {
        let mesh = Mesh::rectangle(
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 1.0),
            32,
            16,
            DiagonalDirection::Right,
        )
        .unwrap();

        assert_eq!(mesh.n_nodes(), 33 * 17);
        assert_eq!(mesh.n_cells(), 2 * 32 * 16);
        // Euler: E = V + F - 1 for a simply connected planar triangulation
        assert_eq!(mesh.n_edges(), mesh.n_nodes() + mesh.n_cells() - 1);
        assert_eq!(mesh.boundary_facets().len(), 2 * (32 + 16));
        assert_relative_eq!(mesh.total_area(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rectangle_crossed() {
        let mesh = Mesh::rectangle(
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            3,
            2,
            DiagonalDirection::Crossed,
        )
        .unwrap();

        assert_eq!(mesh.n_nodes(), 4 * 3 + 3 * 2);
        assert_eq!(mesh.n_cells(), 4 * 3 * 2);
        assert_eq!(mesh.boundary_facets().len(), 2 * (3 + 2));
        assert_relative_eq!(mesh.total_area(), 1.0, epsilon = 1e-12);
        for c in 0..mesh.n_cells() {
            assert!(mesh.cell_area(c) > 0.0);
        }
    }

    #[test]
    fn test_rectangle_left_cells_counter_clockwise() {
        let mesh = Mesh::rectangle(
            Point2::new(-1.0, -1.0),
            Point2::new(1.0, 1.0),
            4,
            4,
            DiagonalDirection::Left,
        )
        .unwrap();

        for c in 0..mesh.n_cells() {
            assert_relative_eq!(mesh.cell_area(c), 4.0 / 32.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rectangle_invalid() {
        assert!(Mesh::unit_square(0, 4).is_err());
        assert!(Mesh::rectangle(
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
            2,
            2,
            DiagonalDirection::Right
        )
        .is_err());
    }

    #[test]
    fn test_locate_entities_boundary() {
        let mesh = Mesh::rectangle(
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 1.0),
            4,
            2,
            DiagonalDirection::Right,
        )
        .unwrap();

        let left_right = mesh.locate_entities_boundary(|p| {
            crate::types::is_close(p.x, 0.0) || crate::types::is_close(p.x, 2.0)
        });
        // two facets on each vertical side
        assert_eq!(left_right.len(), 4);
        for edge in left_right {
            let facet = mesh.boundary_facet(edge).unwrap();
            let [a, b] = facet.vertices;
            assert_relative_eq!(mesh.nodes()[a].x, mesh.nodes()[b].x);
        }
    }

    #[test]
    fn test_boundary_facet_orientation() {
        let mesh = Mesh::unit_square(2, 2).unwrap();
        for facet in mesh.boundary_facets() {
            let cell = mesh.cells()[facet.cell];
            assert_eq!(facet.vertices[0], cell[facet.local_index]);
            assert_eq!(facet.vertices[1], cell[(facet.local_index + 1) % 3]);
        }
    }

    #[test]
    fn test_mesh_tags() {
        let mesh = Mesh::unit_square(3, 3).unwrap();
        let markers: [(i32, fn(&Point2) -> bool); 2] = [
            (1, |p| p.x.abs() < 1e-12),
            (2, |p| (p.y - 1.0).abs() < 1e-12),
        ];
        let tags = MeshTags::from_markers(&mesh, &markers);

        assert_eq!(tags.find(1).len(), 3);
        assert_eq!(tags.find(2).len(), 3);
        assert_eq!(tags.len(), 6);
        assert!(tags.find(3).is_empty());
    }

    #[test]
    fn test_locate_point() {
        let mesh = Mesh::unit_square(2, 2).unwrap();
        let (cell, bary) = mesh.locate_point(&Point2::new(0.3, 0.2)).unwrap();
        let [a, b, c] = mesh.cell_coords(cell);
        let x = a * bary[0] + b * bary[1] + c * bary[2];
        assert_relative_eq!(x.x, 0.3, epsilon = 1e-12);
        assert_relative_eq!(x.y, 0.2, epsilon = 1e-12);

        assert!(mesh.locate_point(&Point2::new(1.5, 0.5)).is_none());
    }

    #[test]
    fn test_bounds_and_h_max() {
        let mesh = Mesh::rectangle(
            Point2::new(-1.0, -2.0),
            Point2::new(1.0, 2.0),
            2,
            4,
            DiagonalDirection::Right,
        )
        .unwrap();

        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Point2::new(-1.0, -2.0));
        assert_eq!(max, Point2::new(1.0, 2.0));
        assert_relative_eq!(mesh.h_max(), 2.0_f64.sqrt(), epsilon = 1e-12);
    }
}
