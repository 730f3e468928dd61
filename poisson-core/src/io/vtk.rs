//! VTK XML UnstructuredGrid writer.

use super::{create, data_element, finish, join_indices, join_values, output_cells, output_points};
use crate::error::Result;
use crate::function::Function;
use std::path::Path;
use tracing::debug;

/// VTK_TRIANGLE
const VTK_TRIANGLE: u8 = 5;
/// VTK_QUADRATIC_TRIANGLE
const VTK_QUADRATIC_TRIANGLE: u8 = 22;

/// Writes a function to an ASCII `.vtu` file.
///
/// Points are the dof coordinates (z = 0). P1 cells are linear triangles,
/// P2 cells are 6-node quadratic triangles. The solution is stored as point
/// data under the function's name and the cell-averaged gradient as a
/// 3-component cell vector `grad_<name>`.
pub fn write_vtu(path: &Path, u: &Function) -> Result<()> {
    let points = output_points(u);
    let n_cells = u.space().mesh().n_cells();
    let nodes_per_cell = u.space().element().n_dofs();
    let cell_type = if nodes_per_cell == 6 {
        VTK_QUADRATIC_TRIANGLE
    } else {
        VTK_TRIANGLE
    };
    let gradients = u.gradients()?;
    let name = u.name();
    let grad_name = format!("grad_{}", name);

    let n_points = points.len().to_string();
    let n_cells_attr = n_cells.to_string();
    let values = join_values(u.values().iter().copied());
    let grads = join_values(gradients.iter().flat_map(|g| [g.x, g.y, 0.0]));
    let coords = join_values(points.iter().flat_map(|p| [p.x, p.y, 0.0]));
    let connectivity = join_indices(output_cells(u).flatten().copied());
    let offsets = join_indices((1..=n_cells).map(|c| c * nodes_per_cell));
    let types = join_indices((0..n_cells).map(|_| cell_type as usize));

    let mut w = create(path)?;
    w.create_element("VTKFile")
        .with_attributes([
            ("type", "UnstructuredGrid"),
            ("version", "1.0"),
            ("byte_order", "LittleEndian"),
            ("header_type", "UInt64"),
        ])
        .write_inner_content(|w| {
            w.create_element("UnstructuredGrid").write_inner_content(|w| {
                w.create_element("Piece")
                    .with_attribute(("NumberOfPoints", n_points.as_str()))
                    .with_attribute(("NumberOfCells", n_cells_attr.as_str()))
                    .write_inner_content(|w| {
                        w.create_element("PointData")
                            .with_attribute(("Scalars", name))
                            .write_inner_content(|w| {
                                data_element(
                                    w,
                                    "DataArray",
                                    &[("type", "Float64"), ("Name", name), ("format", "ascii")],
                                    &values,
                                )
                            })?;
                        w.create_element("CellData")
                            .with_attribute(("Vectors", grad_name.as_str()))
                            .write_inner_content(|w| {
                                data_element(
                                    w,
                                    "DataArray",
                                    &[
                                        ("type", "Float64"),
                                        ("Name", grad_name.as_str()),
                                        ("NumberOfComponents", "3"),
                                        ("format", "ascii"),
                                    ],
                                    &grads,
                                )
                            })?;
                        w.create_element("Points").write_inner_content(|w| {
                            data_element(
                                w,
                                "DataArray",
                                &[
                                    ("type", "Float64"),
                                    ("NumberOfComponents", "3"),
                                    ("format", "ascii"),
                                ],
                                &coords,
                            )
                        })?;
                        w.create_element("Cells").write_inner_content(|w| {
                            data_element(
                                w,
                                "DataArray",
                                &[("type", "Int64"), ("Name", "connectivity"), ("format", "ascii")],
                                &connectivity,
                            )?;
                            data_element(
                                w,
                                "DataArray",
                                &[("type", "Int64"), ("Name", "offsets"), ("format", "ascii")],
                                &offsets,
                            )?;
                            data_element(
                                w,
                                "DataArray",
                                &[("type", "UInt8"), ("Name", "types"), ("format", "ascii")],
                                &types,
                            )
                        })?;
                        Ok(())
                    })?;
                Ok(())
            })?;
            Ok(())
        })?;
    finish(w)?;

    debug!(path = %path.display(), points = points.len(), cells = n_cells, "wrote vtu");
    Ok(())
}
