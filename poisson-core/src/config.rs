//! Problem configuration.
//!
//! A [`ProblemConfig`] is read from JSON; every field is optional and the
//! defaults describe the reference problem on `[0, 2] × [0, 1]`:
//! `-Δu = 10 exp(-((x-0.5)² + (y-0.5)²) / 0.02)` with `u = 0` on `x = 0` and
//! `x = 2`, and `∂u/∂n = sin(5x)` on the boundary.

use crate::bc::{BoundarySide, DirichletBC, NeumannBC};
use crate::error::{Error, Result};
use crate::expression::{Axis, FieldSpec};
use crate::form::{BilinearForm, LinearForm};
use crate::function_space::FunctionSpace;
use crate::io::OutputFormat;
use crate::mesh::{DiagonalDirection, Mesh};
use crate::problem::LinearProblem;
use crate::solver::{SolverConfig, SolverType};
use crate::types::Point2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Solution file.
    pub path: PathBuf,
    /// Format; inferred from the extension when absent.
    pub format: Option<OutputFormat>,
    /// Heat-map SVG; no rendering when absent.
    pub plot: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("out_poisson/poisson.vtu"),
            format: None,
            plot: Some(PathBuf::from("out_poisson/poisson.svg")),
        }
    }
}

/// Full description of a Poisson problem on a rectangle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProblemConfig {
    /// Lower-left corner.
    pub lower: [f64; 2],
    /// Upper-right corner.
    pub upper: [f64; 2],
    pub nx: usize,
    pub ny: usize,
    pub diagonal: DiagonalDirection,
    /// Lagrange degree (1 or 2).
    pub degree: usize,
    /// Diffusion coefficient κ.
    pub kappa: FieldSpec,
    /// Volume source f.
    pub source: FieldSpec,
    /// Normal flux g.
    pub flux: FieldSpec,
    pub dirichlet_sides: Vec<BoundarySide>,
    pub dirichlet_value: FieldSpec,
    /// Sides carrying the flux; the whole boundary when absent.
    pub neumann_sides: Option<Vec<BoundarySide>>,
    pub solver: SolverConfig,
    pub output: OutputConfig,
}

impl Default for ProblemConfig {
    fn default() -> Self {
        Self {
            lower: [0.0, 0.0],
            upper: [2.0, 1.0],
            nx: 32,
            ny: 16,
            diagonal: DiagonalDirection::Right,
            degree: 1,
            kappa: FieldSpec::Constant { value: 1.0 },
            source: FieldSpec::Gaussian {
                amplitude: 10.0,
                center: [0.5, 0.5],
                width: 0.02,
            },
            flux: FieldSpec::Sine {
                amplitude: 1.0,
                frequency: 5.0,
                axis: Axis::X,
            },
            dirichlet_sides: vec![BoundarySide::Left, BoundarySide::Right],
            dirichlet_value: FieldSpec::Constant { value: 0.0 },
            neumann_sides: None,
            solver: SolverConfig {
                solver_type: SolverType::Direct,
                ..SolverConfig::default()
            },
            output: OutputConfig::default(),
        }
    }
}

impl ProblemConfig {
    /// Load and validate a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration describes a well-posed problem.
    pub fn validate(&self) -> Result<()> {
        if !(self.lower[0] < self.upper[0] && self.lower[1] < self.upper[1]) {
            return Err(Error::Config(format!(
                "domain corners must satisfy lower < upper, got {:?} and {:?}",
                self.lower, self.upper
            )));
        }
        if self.nx == 0 || self.ny == 0 {
            return Err(Error::Config(format!(
                "mesh resolution must be positive, got {}x{}",
                self.nx, self.ny
            )));
        }
        if !(1..=2).contains(&self.degree) {
            return Err(Error::Config(format!(
                "degree must be 1 or 2, got {}",
                self.degree
            )));
        }
        if self.dirichlet_sides.is_empty() {
            // pure Neumann leaves the constant mode undetermined
            return Err(Error::Config(
                "at least one Dirichlet side is required".into(),
            ));
        }
        for field in [
            &self.kappa,
            &self.source,
            &self.flux,
            &self.dirichlet_value,
        ] {
            field.validate()?;
        }
        if let FieldSpec::Constant { value } = self.kappa {
            if value <= 0.0 {
                return Err(Error::Config(format!(
                    "diffusion coefficient must be positive, got {}",
                    value
                )));
            }
        }
        self.solver.validate()
    }

    /// Build the mesh described by the configuration.
    pub fn build_mesh(&self) -> Result<Mesh> {
        Mesh::rectangle(
            Point2::new(self.lower[0], self.lower[1]),
            Point2::new(self.upper[0], self.upper[1]),
            self.nx,
            self.ny,
            self.diagonal,
        )
    }

    /// Build mesh, space, boundary conditions and forms.
    pub fn build_problem(&self) -> Result<LinearProblem> {
        self.validate()?;
        let mesh = Arc::new(self.build_mesh()?);
        let space = FunctionSpace::new(mesh.clone(), self.degree)?;

        let dirichlet_facets = BoundarySide::locate_facets(&mesh, &self.dirichlet_sides);
        let bc = DirichletBC::from_facets(
            &space,
            &dirichlet_facets,
            self.dirichlet_value.to_expression(),
        )?;

        let flux = self.flux.to_expression();
        let neumann = match &self.neumann_sides {
            None => NeumannBC::on_whole_boundary(&mesh, flux),
            Some(sides) => {
                NeumannBC::new(&mesh, BoundarySide::locate_facets(&mesh, sides), flux)?
            }
        };

        info!(
            cells = mesh.n_cells(),
            dofs = space.n_dofs(),
            degree = self.degree,
            dirichlet_dofs = bc.dofs().len(),
            neumann_facets = neumann.facets().len(),
            "built problem"
        );

        let a = BilinearForm::laplace(space.clone()).with_coefficient(self.kappa.to_expression());
        let l = LinearForm::new(space)
            .with_source(self.source.to_expression())
            .with_neumann(neumann);
        LinearProblem::new(a, l, vec![bc], self.solver.clone())
    }
}
