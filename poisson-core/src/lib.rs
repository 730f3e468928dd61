//! Poisson Core - 2D finite element solver for the Poisson equation
//!
//! Solves `-∇·(κ∇u) = f` on triangulated rectangles with:
//! - Continuous Lagrange elements of degree 1 and 2
//! - Dirichlet values and Neumann fluxes on boundary facets
//! - Parallel assembly using Rayon
//! - Sparse matrix operations (CSR format)
//! - Direct and iterative linear solvers
//! - VTK/XDMF output and SVG heat maps
//!
//! # Architecture
//!
//! The solver is designed around these core abstractions:
//!
//! - [`Mesh`]: Connectivity, coordinates and boundary facets
//! - [`LagrangeElement`] trait: Reference shape functions and quadrature
//! - [`FunctionSpace`]: Global dof numbering over a mesh
//! - [`BilinearForm`] / [`LinearForm`]: Local element kernels of the weak form
//! - [`Solver`] trait: Linear system solution strategies
//! - [`LinearProblem`]: Assembly and solve in one call
//!
//! # Example
//!
//! ```no_run
//! use poisson_core::{ProblemConfig, write_function};
//! use std::path::Path;
//!
//! let (u, stats) = ProblemConfig::default().build_problem()?.solve()?;
//! println!("{}: min {:.4}, max {:.4}", stats.solver, u.min(), u.max());
//! write_function(Path::new("poisson.vtu"), &u, None)?;
//! # Ok::<(), poisson_core::Error>(())
//! ```

pub mod types;
pub mod mesh;
pub mod element;
pub mod function_space;
pub mod expression;
pub mod bc;
pub mod form;
pub mod sparse;
pub mod assembly;
pub mod solver;
pub mod problem;
pub mod function;
pub mod io;
pub mod plot;
pub mod config;
pub mod error;

pub use types::{Point2, Vec2};
pub use mesh::{DiagonalDirection, Mesh, MeshTags};
pub use element::{create_element, LagrangeElement};
pub use function_space::FunctionSpace;
pub use expression::{Expression, FieldSpec};
pub use bc::{BoundarySide, DirichletBC, NeumannBC};
pub use form::{BilinearForm, LinearForm};
pub use sparse::CsrMatrix;
pub use assembly::{assemble_system, AssemblyOptions};
pub use solver::{Solver, SolverConfig, SolverType, SolveStats};
pub use problem::LinearProblem;
pub use function::Function;
pub use io::{write_function, OutputFormat};
pub use plot::{render_svg, RenderOptions};
pub use config::ProblemConfig;
pub use error::{Error, Result};
