//! Heat-map rendering of P1/P2 solutions.
//!
//! Rendering goes through plotters' SVG backend and is compiled only with
//! the `plot` feature. Without it [`render_svg`] reports
//! [`Error::VisualizationUnavailable`] so callers can skip the step.

use crate::error::{Error, Result};
use crate::function::Function;
use std::path::Path;

/// Image options for [`render_svg`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// Draw a vertical colour bar on the right.
    pub colorbar: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 440,
            colorbar: true,
        }
    }
}

/// Blue → white → red ramp for `t ∈ [0, 1]`.
pub fn colormap(t: f64) -> (u8, u8, u8) {
    const STOPS: [(f64, [f64; 3]); 3] = [
        (0.0, [59.0, 76.0, 192.0]),
        (0.5, [221.0, 221.0, 221.0]),
        (1.0, [180.0, 4.0, 38.0]),
    ];
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let (lo, hi) = if t <= 0.5 {
        (STOPS[0], STOPS[1])
    } else {
        (STOPS[1], STOPS[2])
    };
    let s = (t - lo.0) / (hi.0 - lo.0);
    let mix = |k: usize| (lo.1[k] + s * (hi.1[k] - lo.1[k])).round() as u8;
    (mix(0), mix(1), mix(2))
}

/// Normalise `v` into `[0, 1]` over `[min, max]`; constant fields map to 0.5.
#[cfg_attr(not(feature = "plot"), allow(dead_code))]
fn normalise(v: f64, min: f64, max: f64) -> f64 {
    if max - min > f64::EPSILON * max.abs().max(1.0) {
        (v - min) / (max - min)
    } else {
        0.5
    }
}

/// Render `u` as a filled-triangle heat map to an SVG file.
///
/// Each cell is coloured by the mean of its vertex values.
#[cfg(feature = "plot")]
pub fn render_svg(u: &Function, path: &Path, options: &RenderOptions) -> Result<()> {
    use plotters::prelude::*;

    let mesh = u.space().mesh();
    let (p0, p1) = mesh
        .bounds()
        .ok_or_else(|| Error::Output("Cannot render an empty mesh".into()))?;
    let values = u.vertex_values();
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    let margin = 20.0;
    let bar_width = if options.colorbar { 60.0 } else { 0.0 };
    let avail_w = f64::from(options.width) - 2.0 * margin - bar_width;
    let avail_h = f64::from(options.height) - 2.0 * margin;
    if avail_w <= 0.0 || avail_h <= 0.0 {
        return Err(Error::Output(format!(
            "Image size {}x{} is too small",
            options.width, options.height
        )));
    }
    let extent = p1 - p0;
    let scale = (avail_w / extent.x).min(avail_h / extent.y);
    // y grows downwards in image space
    let to_pixel = |x: f64, y: f64| -> (i32, i32) {
        (
            (margin + (x - p0.x) * scale).round() as i32,
            (margin + (p1.y - y) * scale).round() as i32,
        )
    };
    let color = |v: f64| {
        let (r, g, b) = colormap(normalise(v, min, max));
        RGBColor(r, g, b)
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        let draw_err = |e: plotters::drawing::DrawingAreaErrorKind<std::io::Error>| {
            Error::Output(format!("SVG render error: {}", e))
        };
        root.fill(&WHITE).map_err(draw_err)?;

        for cell in mesh.cells() {
            let mean = cell.iter().map(|&n| values[n]).sum::<f64>() / 3.0;
            let points = cell
                .iter()
                .map(|&n| to_pixel(mesh.nodes()[n].x, mesh.nodes()[n].y))
                .collect::<Vec<_>>();
            root.draw(&Polygon::new(points, color(mean).filled()))
                .map_err(draw_err)?;
        }

        if options.colorbar {
            let x0 = (f64::from(options.width) - margin - 0.5 * bar_width) as i32;
            let x1 = x0 + 20;
            let top = margin as i32;
            let steps = 64;
            let step_h = avail_h / steps as f64;
            for k in 0..steps {
                let t = 1.0 - (k as f64 + 0.5) / steps as f64;
                let (r, g, b) = colormap(t);
                let y0 = top + (k as f64 * step_h) as i32;
                let y1 = top + ((k + 1) as f64 * step_h).ceil() as i32;
                root.draw(&Rectangle::new(
                    [(x0, y0), (x1, y1)],
                    RGBColor(r, g, b).filled(),
                ))
                .map_err(draw_err)?;
            }
            root.draw(&Rectangle::new(
                [(x0, top), (x1, top + avail_h as i32)],
                BLACK.stroke_width(1),
            ))
            .map_err(draw_err)?;
        }

        root.present().map_err(draw_err)?;
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, svg)?;
    tracing::debug!(path = %path.display(), min, max, "rendered heat map");
    Ok(())
}

/// Rendering is not compiled in; always returns
/// [`Error::VisualizationUnavailable`].
#[cfg(not(feature = "plot"))]
pub fn render_svg(_u: &Function, _path: &Path, _options: &RenderOptions) -> Result<()> {
    Err(Error::VisualizationUnavailable(
        "built without the `plot` feature".into(),
    ))
}
