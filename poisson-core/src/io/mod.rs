//! Solution output.
//!
//! Both writers produce self-contained ASCII XML that ParaView can open.
//! Documents are emitted through `quick-xml`, so names are escaped:
//! - [`write_vtu`]: VTK XML UnstructuredGrid (`.vtu`)
//! - [`write_xdmf`]: XDMF 3 with inline data items (`.xdmf`, `.xmf`)

mod vtk;
mod xdmf;

pub use vtk::write_vtu;
pub use xdmf::write_xdmf;

use crate::error::{Error, Result};
use crate::function::Function;
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Vtu,
    Xdmf,
}

impl OutputFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("vtu") => Ok(OutputFormat::Vtu),
            Some("xdmf") | Some("xmf") => Ok(OutputFormat::Xdmf),
            _ => Err(Error::Output(format!(
                "Cannot infer output format from '{}' (expected .vtu, .xdmf or .xmf)",
                path.display()
            ))),
        }
    }

    /// Canonical file extension.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Vtu => "vtu",
            OutputFormat::Xdmf => "xdmf",
        }
    }
}

/// Write `u` to `path` in the given format, or the one implied by the extension.
pub fn write_function(path: &Path, u: &Function, format: Option<OutputFormat>) -> Result<()> {
    let format = match format {
        Some(f) => f,
        None => OutputFormat::from_path(path)?,
    };
    match format {
        OutputFormat::Vtu => write_vtu(path, u),
        OutputFormat::Xdmf => write_xdmf(path, u),
    }
}

/// XML writer over the output file.
type XmlWriter = Writer<BufWriter<File>>;

/// Create the output file and any missing parent directories, and write the
/// XML declaration.
fn create(path: &Path) -> Result<XmlWriter> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut w = Writer::new_with_indent(BufWriter::new(File::create(path)?), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
    Ok(w)
}

/// Terminate the document with a newline and flush.
fn finish(w: XmlWriter) -> Result<()> {
    let mut inner = w.into_inner();
    inner.write_all(b"\n")?;
    inner.flush()?;
    Ok(())
}

/// Element holding whitespace-separated data as escaped text content.
fn data_element<W: Write>(
    w: &mut Writer<W>,
    tag: &str,
    attributes: &[(&str, &str)],
    data: &str,
) -> io::Result<()> {
    w.create_element(tag)
        .with_attributes(attributes.iter().copied())
        .write_text_content(BytesText::new(data))?;
    Ok(())
}

/// Space-separated floats in shortest exponent form.
fn join_values<I, T>(values: I) -> String
where
    I: IntoIterator<Item = T>,
    T: std::fmt::LowerExp,
{
    let mut text = String::new();
    for (i, v) in values.into_iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        let _ = write!(text, "{:e}", v);
    }
    text
}

/// Space-separated integers.
fn join_indices<I>(values: I) -> String
where
    I: IntoIterator<Item = usize>,
{
    let mut text = String::new();
    for (i, v) in values.into_iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        let _ = write!(text, "{}", v);
    }
    text
}

/// Output points: mesh vertices followed by P2 edge midpoints.
fn output_points(u: &Function) -> &[crate::types::Point2] {
    u.space().dof_coordinates()
}

/// Cell connectivity in VTK/XDMF node order (vertices, then edge midpoints).
fn output_cells(u: &Function) -> impl Iterator<Item = &[usize]> + '_ {
    let space = u.space();
    (0..space.mesh().n_cells()).map(move |c| space.cell_dofs(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use crate::function_space::FunctionSpace;
    use crate::mesh::Mesh;
    use quick_xml::events::Event as XmlEvent;
    use quick_xml::Reader;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_format_from_path() {
        assert_eq!(OutputFormat::from_path(Path::new("a/b.vtu")).unwrap(), OutputFormat::Vtu);
        assert_eq!(OutputFormat::from_path(Path::new("b.XDMF")).unwrap(), OutputFormat::Xdmf);
        assert_eq!(OutputFormat::from_path(Path::new("b.xmf")).unwrap(), OutputFormat::Xdmf);
        assert!(OutputFormat::from_path(Path::new("b.bp")).is_err());
        assert!(OutputFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_format_serde() {
        let f: OutputFormat = serde_json::from_str("\"xdmf\"").unwrap();
        assert_eq!(f, OutputFormat::Xdmf);
        assert_eq!(f.extension(), "xdmf");
    }

    #[test]
    fn test_write_function_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let space = FunctionSpace::new(Arc::new(Mesh::unit_square(2, 2).unwrap()), 1).unwrap();
        let u = Function::interpolate(space, &Expression::new(|p| p.x));

        let vtu = dir.path().join("nested/out/u.vtu");
        write_function(&vtu, &u, None).unwrap();
        assert!(vtu.exists());

        // explicit format overrides the extension
        let other = dir.path().join("u.dat");
        write_function(&other, &u, Some(OutputFormat::Xdmf)).unwrap();
        let text = std::fs::read_to_string(&other).unwrap();
        assert!(text.contains("<Xdmf"));

        assert!(write_function(&dir.path().join("u.txt"), &u, None).is_err());
    }

    #[test]
    fn test_join_values() {
        assert_eq!(join_values([1.0_f64, 2.5, 0.0, 1e-3, -4.0]), "1e0 2.5e0 0e0 1e-3 -4e0");
        assert_eq!(join_indices([3, 0, 12]), "3 0 12");
        assert_eq!(join_indices(std::iter::empty::<usize>()), "");
    }

    /// Collect the unescaped `Name` attributes, failing on malformed XML.
    fn attribute_names(text: &str) -> Vec<String> {
        let mut reader = Reader::from_str(text);
        let mut names = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                XmlEvent::Start(e) | XmlEvent::Empty(e) => {
                    if let Some(attr) = e.try_get_attribute("Name").unwrap() {
                        names.push(attr.unescape_value().unwrap().into_owned());
                    }
                }
                XmlEvent::Eof => break,
                _ => {}
            }
        }
        names
    }

    #[test]
    fn test_markup_in_name_is_escaped() {
        let dir = tempdir().unwrap();
        let space = FunctionSpace::new(Arc::new(Mesh::unit_square(2, 2).unwrap()), 1).unwrap();
        let name = r#"u "a<b" & c"#;
        let u = Function::interpolate(space, &Expression::new(|p| p.x)).with_name(name);

        for file in ["u.vtu", "u.xdmf"] {
            let path = dir.path().join(file);
            write_function(&path, &u, None).unwrap();
            let text = std::fs::read_to_string(&path).unwrap();

            assert!(!text.contains(name), "raw name leaked into {}", file);
            let names = attribute_names(&text);
            assert!(names.iter().any(|n| n == name), "{}: {:?}", file, names);
            assert!(names.contains(&format!("grad_{}", name)), "{}: {:?}", file, names);
        }
    }
}
