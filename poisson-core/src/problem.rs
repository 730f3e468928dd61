//! Linear variational problem `a(u, v) = L(v)`.

use crate::assembly::{assemble_system, AssemblyOptions};
use crate::bc::DirichletBC;
use crate::error::{Error, Result};
use crate::form::{BilinearForm, LinearForm};
use crate::function::Function;
use crate::solver::{select_solver, SolveStats, SolverConfig};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A linear problem with Dirichlet conditions and a solver configuration.
#[derive(Debug, Clone)]
pub struct LinearProblem {
    a: BilinearForm,
    l: LinearForm,
    bcs: Vec<DirichletBC>,
    solver: SolverConfig,
    assembly: AssemblyOptions,
}

impl LinearProblem {
    /// Create a problem. Forms and boundary conditions must share one
    /// function space.
    pub fn new(
        a: BilinearForm,
        l: LinearForm,
        bcs: Vec<DirichletBC>,
        solver: SolverConfig,
    ) -> Result<Self> {
        if !Arc::ptr_eq(a.space(), l.space()) {
            return Err(Error::Assembly(
                "Bilinear and linear forms must share one function space".into(),
            ));
        }
        if let Some(bc) = bcs.iter().find(|bc| !Arc::ptr_eq(bc.space(), a.space())) {
            return Err(Error::Assembly(format!(
                "Dirichlet condition defined on a different function space ({} dofs, problem has {})",
                bc.space().n_dofs(),
                a.space().n_dofs()
            )));
        }
        solver.validate()?;
        Ok(Self {
            a,
            l,
            bcs,
            solver,
            assembly: AssemblyOptions::default(),
        })
    }

    /// Override assembly threading.
    pub fn with_assembly_options(mut self, options: AssemblyOptions) -> Self {
        self.assembly = options;
        self
    }

    pub fn bilinear_form(&self) -> &BilinearForm {
        &self.a
    }

    pub fn linear_form(&self) -> &LinearForm {
        &self.l
    }

    pub fn bcs(&self) -> &[DirichletBC] {
        &self.bcs
    }

    pub fn solver_config(&self) -> &SolverConfig {
        &self.solver
    }

    /// Assemble, apply boundary conditions and solve.
    pub fn solve(&self) -> Result<(Function, SolveStats)> {
        let start = Instant::now();
        let space = self.a.space().clone();
        let system = assemble_system(&self.a, &self.l, &self.bcs, &self.assembly)?;
        let assembly_time = start.elapsed().as_secs_f64();

        let solver = select_solver(&self.solver, system.n_dofs);
        debug!(solver = solver.name(), n_dofs = system.n_dofs, "selected solver");
        let (values, stats) = solver.solve_with_stats(&system.matrix, &system.rhs)?;

        info!(
            solver = %stats.solver,
            n_dofs = stats.n_dofs,
            assembly_s = assembly_time,
            solve_s = stats.total_time_seconds,
            "solved linear problem"
        );

        Ok((Function::from_values(space, values)?, stats))
    }
}
