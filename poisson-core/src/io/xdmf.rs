//! XDMF 3 writer with inline XML data items.

use super::{create, data_element, finish, join_indices, join_values, output_cells, output_points};
use crate::error::Result;
use crate::function::Function;
use quick_xml::events::{BytesText, Event};
use std::path::Path;
use tracing::debug;

/// Attributes of an inline 8-byte float data item.
fn float_item(dims: &str) -> [(&str, &str); 4] {
    [
        ("Dimensions", dims),
        ("NumberType", "Float"),
        ("Precision", "8"),
        ("Format", "XML"),
    ]
}

/// Writes a function to a self-contained `.xdmf` file.
///
/// The grid is a single uniform grid at time 0 holding the solution as a
/// nodal scalar and the cell-averaged gradient as a cell vector.
pub fn write_xdmf(path: &Path, u: &Function) -> Result<()> {
    let points = output_points(u);
    let n_cells = u.space().mesh().n_cells();
    let nodes_per_cell = u.space().element().n_dofs();
    let topology = if nodes_per_cell == 6 {
        "Triangle_6"
    } else {
        "Triangle"
    };
    let gradients = u.gradients()?;
    let name = u.name();
    let grad_name = format!("grad_{}", name);

    let n_cells_attr = n_cells.to_string();
    let nodes_attr = nodes_per_cell.to_string();
    let topology_dims = format!("{} {}", n_cells, nodes_per_cell);
    let geometry_dims = format!("{} 2", points.len());
    let value_dims = format!("{} 1", u.values().len());
    let grad_dims = format!("{} 3", n_cells);

    let connectivity = join_indices(output_cells(u).flatten().copied());
    let coords = join_values(points.iter().flat_map(|p| [p.x, p.y]));
    let values = join_values(u.values().iter().copied());
    let grads = join_values(gradients.iter().flat_map(|g| [g.x, g.y, 0.0]));

    let mut w = create(path)?;
    w.write_event(Event::DocType(BytesText::from_escaped(r#"Xdmf SYSTEM "Xdmf.dtd" []"#)))?;
    w.create_element("Xdmf")
        .with_attributes([
            ("Version", "3.0"),
            ("xmlns:xi", "http://www.w3.org/2001/XInclude"),
        ])
        .write_inner_content(|w| {
            w.create_element("Domain").write_inner_content(|w| {
                w.create_element("Grid")
                    .with_attributes([("Name", "mesh"), ("GridType", "Uniform")])
                    .write_inner_content(|w| {
                        w.create_element("Topology")
                            .with_attributes([
                                ("TopologyType", topology),
                                ("NumberOfElements", n_cells_attr.as_str()),
                                ("NodesPerElement", nodes_attr.as_str()),
                            ])
                            .write_inner_content(|w| {
                                data_element(
                                    w,
                                    "DataItem",
                                    &[
                                        ("Dimensions", topology_dims.as_str()),
                                        ("NumberType", "Int"),
                                        ("Format", "XML"),
                                    ],
                                    &connectivity,
                                )
                            })?;
                        w.create_element("Geometry")
                            .with_attribute(("GeometryType", "XY"))
                            .write_inner_content(|w| {
                                data_element(w, "DataItem", &float_item(&geometry_dims), &coords)
                            })?;
                        w.create_element("Time")
                            .with_attribute(("Value", "0"))
                            .write_empty()?;
                        w.create_element("Attribute")
                            .with_attributes([
                                ("Name", name),
                                ("AttributeType", "Scalar"),
                                ("Center", "Node"),
                            ])
                            .write_inner_content(|w| {
                                data_element(w, "DataItem", &float_item(&value_dims), &values)
                            })?;
                        w.create_element("Attribute")
                            .with_attributes([
                                ("Name", grad_name.as_str()),
                                ("AttributeType", "Vector"),
                                ("Center", "Cell"),
                            ])
                            .write_inner_content(|w| {
                                data_element(w, "DataItem", &float_item(&grad_dims), &grads)
                            })?;
                        Ok(())
                    })?;
                Ok(())
            })?;
            Ok(())
        })?;
    finish(w)?;

    debug!(path = %path.display(), points = points.len(), cells = n_cells, "wrote xdmf");
    Ok(())
}
