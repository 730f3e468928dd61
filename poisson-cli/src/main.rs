//! Poisson demo driver
//!
//! Solves `-Δu = f` on `[0, 2] × [0, 1]` with `u = 0` on the vertical sides
//! and `∂u/∂n = sin(5x)` on the boundary, writes the solution for ParaView
//! and renders a heat map when a rendering backend is compiled in.
//!
//! Every setting can be changed through a JSON file (`--config`); command
//! line flags override the file.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use poisson_core::{
    render_svg, write_function, Error, OutputFormat, Point2, ProblemConfig, RenderOptions,
    SolverType,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "poisson")]
#[command(about = "Solve the 2D Poisson equation with mixed boundary conditions")]
#[command(version)]
struct Args {
    /// JSON problem configuration.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Cells in x direction.
    #[arg(long)]
    nx: Option<usize>,

    /// Cells in y direction.
    #[arg(long)]
    ny: Option<usize>,

    /// Lagrange degree (1 or 2).
    #[arg(short, long)]
    degree: Option<usize>,

    /// Linear solver.
    #[arg(short, long, value_enum)]
    solver: Option<SolverArg>,

    /// Solution file (.vtu, .xdmf or .xmf).
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format, overriding the file extension.
    #[arg(long, value_enum)]
    format: Option<FormatArg>,

    /// Heat-map SVG file.
    #[arg(long, value_name = "FILE", conflicts_with = "no_plot")]
    plot: Option<PathBuf>,

    /// Skip rendering.
    #[arg(long)]
    no_plot: bool,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SolverArg {
    Direct,
    Lu,
    Iterative,
    Auto,
}

impl From<SolverArg> for SolverType {
    fn from(arg: SolverArg) -> Self {
        match arg {
            SolverArg::Direct => SolverType::Direct,
            SolverArg::Lu => SolverType::Lu,
            SolverArg::Iterative => SolverType::Iterative,
            SolverArg::Auto => SolverType::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Vtu,
    Xdmf,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Vtu => OutputFormat::Vtu,
            FormatArg::Xdmf => OutputFormat::Xdmf,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(&args)?;
    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }
    run(&config)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Read the configuration file, if any, and apply command line overrides.
fn load_config(args: &Args) -> Result<ProblemConfig> {
    let mut config = match &args.config {
        Some(path) => ProblemConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => ProblemConfig::default(),
    };

    if let Some(nx) = args.nx {
        config.nx = nx;
    }
    if let Some(ny) = args.ny {
        config.ny = ny;
    }
    if let Some(degree) = args.degree {
        config.degree = degree;
    }
    if let Some(solver) = args.solver {
        config.solver.solver_type = solver.into();
    }
    if let Some(output) = &args.output {
        config.output.path = output.clone();
    }
    if let Some(format) = args.format {
        config.output.format = Some(format.into());
    }
    if let Some(plot) = &args.plot {
        config.output.plot = Some(plot.clone());
    }
    if args.no_plot {
        config.output.plot = None;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Solve, write the solution and render it.
fn run(config: &ProblemConfig) -> Result<()> {
    let start = Instant::now();
    let problem = config.build_problem().context("Failed to set up the problem")?;
    let space = problem.bilinear_form().space().clone();
    let (u, stats) = problem.solve().context("Failed to solve the linear system")?;

    write_function(&config.output.path, &u, config.output.format).with_context(|| {
        format!("Failed to write solution to {}", config.output.path.display())
    })?;
    info!(path = %config.output.path.display(), "wrote solution");

    println!(
        "Poisson problem on [{}, {}] x [{}, {}]",
        config.lower[0], config.upper[0], config.lower[1], config.upper[1]
    );
    println!(
        "  mesh:     {} cells, {} vertices ({}x{}, {:?} diagonal)",
        space.mesh().n_cells(),
        space.mesh().n_nodes(),
        config.nx,
        config.ny,
        config.diagonal
    );
    println!("  space:    P{} with {} dofs", space.degree(), space.n_dofs());
    println!("  solver:   {}", stats.solver);
    if let (Some(iterations), Some(residual)) = (stats.iterations, stats.residual) {
        println!("            {} iterations, residual {:.3e}", iterations, residual);
    }
    println!("  solution: min {:.6}, max {:.6}", u.min(), u.max());
    let center = Point2::new(
        0.5 * (config.lower[0] + config.upper[0]),
        0.5 * (config.lower[1] + config.upper[1]),
    );
    if let Some(value) = u.eval(&center) {
        println!("            u({}, {}) = {:.6}", center.x, center.y, value);
    }
    println!("  output:   {}", config.output.path.display());

    if let Some(plot) = &config.output.plot {
        match render_svg(&u, plot, &RenderOptions::default()) {
            Ok(()) => println!("  plot:     {}", plot.display()),
            Err(Error::VisualizationUnavailable(reason)) => {
                println!("  plot:     skipped, visualization unavailable ({})", reason);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to render {}", plot.display()));
            }
        }
    }

    println!("  time:     {:.3} s", start.elapsed().as_secs_f64());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_reference_problem() {
        let args = Args::try_parse_from(["poisson"]).unwrap();
        let config = load_config(&args).unwrap();
        assert_eq!(config, ProblemConfig::default());
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "poisson",
            "--nx",
            "8",
            "--ny",
            "4",
            "-d",
            "2",
            "--solver",
            "iterative",
            "-o",
            "out/u.dat",
            "--format",
            "xdmf",
            "--no-plot",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);

        let config = load_config(&args).unwrap();
        assert_eq!((config.nx, config.ny, config.degree), (8, 4, 2));
        assert_eq!(config.solver.solver_type, SolverType::Iterative);
        assert_eq!(config.output.path, PathBuf::from("out/u.dat"));
        assert_eq!(config.output.format, Some(OutputFormat::Xdmf));
        assert_eq!(config.output.plot, None);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let args = Args::try_parse_from(["poisson", "--degree", "4"]).unwrap();
        assert!(load_config(&args).is_err());
        assert!(Args::try_parse_from(["poisson", "--plot", "a.svg", "--no-plot"]).is_err());
    }

    #[test]
    fn test_run_writes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ProblemConfig {
            nx: 8,
            ny: 4,
            ..ProblemConfig::default()
        };
        config.output.path = dir.path().join("out/poisson.vtu");
        config.output.plot = Some(dir.path().join("out/poisson.svg"));

        run(&config).unwrap();

        assert!(config.output.path.exists());
        #[cfg(feature = "plot")]
        assert!(dir.path().join("out/poisson.svg").exists());
    }
}
