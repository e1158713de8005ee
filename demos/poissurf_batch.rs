//! Batch surface reconstruction
//!
//! Reconstructs every input file (OFF or PLY with vertex normals, or a mesh
//! whose faces give the normals), optionally writes the meshes and exits
//! with a non-zero status when any input failed.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use poissurf_core::{ellipsoid_samples, sphere_samples, Vector3f};
use poissurf_reconstruction::{
    init_thread_pool, InputReport, InputSource, MeshingCriteria, ParallelConfig, PoissonConfig, PoissonSolver,
    ReconstructionPipeline,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Off,
    Ply,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Off => "off",
            Format::Ply => "ply",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "poissurf-batch")]
#[command(about = "Reconstruct surfaces from oriented point clouds", long_about = None)]
struct Cli {
    /// Input files (.off or .ply)
    inputs: Vec<PathBuf>,

    /// Also reconstruct a synthetic unit sphere with this many samples
    #[arg(long)]
    sphere: Option<usize>,

    /// Also reconstruct a synthetic ellipsoid (radii 1, 0.6, 0.4) with this many samples
    #[arg(long)]
    ellipsoid: Option<usize>,

    /// Directory for the reconstructed meshes; nothing is written without it
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output mesh format
    #[arg(long, value_enum, default_value = "off")]
    format: Format,

    /// Minimum triangle angle in degrees
    #[arg(long, default_value = "30")]
    min_angle: f64,

    /// Maximum surface ball radius, relative to the point set size
    #[arg(long, default_value = "0.1")]
    radius_factor: f64,

    /// Maximum center distance, relative to the point set size
    #[arg(long, default_value = "0.005")]
    distance_factor: f64,

    /// Stop refining after this many facets
    #[arg(long, default_value = "200000")]
    max_facets: usize,

    /// Keep non-manifold edges
    #[arg(long)]
    allow_non_manifold: bool,

    /// Quantile of the sample values used as the zero level (0.5 = median)
    #[arg(long, default_value = "0.5")]
    level_quantile: f64,

    /// Worker threads (default: one per core)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Log stage timings
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

fn output_path(dir: &Path, id: &str, format: Format) -> PathBuf {
    let stem = Path::new(id)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("surface");
    dir.join(format!("{}.{}", stem, format.extension()))
}

fn print_status(report: &InputReport) {
    match &report.result {
        Ok(result) => {
            let mut flags = Vec::new();
            if report.status.warnings.degraded {
                flags.push("degraded");
            }
            if report.status.warnings.non_manifold {
                flags.push("non-manifold");
            }
            println!(
                "ok      {}: {} vertices, {} triangles, min angle {:.1}, {:.2}s{}",
                report.id,
                report.status.vertex_count,
                report.status.triangle_count,
                result.quality_metrics.min_angle_degrees,
                result.processing_time,
                if flags.is_empty() { String::new() } else { format!(" [{}]", flags.join(", ")) }
            );
            if let Some(solve) = &result.solve {
                println!(
                    "        {} Steiner points, {} unknowns, {} iterations",
                    solve.steiner_points, solve.unknowns, solve.iterations
                );
            }
        }
        Err(e) => println!("failed  {}: {} ({})", report.id, e, e.kind()),
    }
}

fn run(cli: Cli) -> Result<i32> {
    if let Some(threads) = cli.threads {
        init_thread_pool(ParallelConfig::default().with_threads(threads)).context("Failed to start thread pool")?;
    }

    let criteria = MeshingCriteria::default()
        .with_min_facet_angle(cli.min_angle)
        .with_max_circumradius_factor(cli.radius_factor)
        .with_max_distance_factor(cli.distance_factor)
        .with_max_facets(cli.max_facets)
        .with_allow_non_manifold(cli.allow_non_manifold);
    let solver = PoissonSolver::new(PoissonConfig::default().with_level_quantile(cli.level_quantile));
    let pipeline = ReconstructionPipeline::new(criteria)?.with_solver(Box::new(solver));

    let mut inputs: Vec<InputSource> = cli.inputs.iter().cloned().map(InputSource::File).collect();
    if let Some(n) = cli.sphere {
        inputs.push(InputSource::samples("sphere", sphere_samples(1.0, n)));
    }
    if let Some(n) = cli.ellipsoid {
        inputs.push(InputSource::samples(
            "ellipsoid",
            ellipsoid_samples(Vector3f::new(1.0, 0.6, 0.4), n),
        ));
    }
    if inputs.is_empty() {
        anyhow::bail!("no inputs given");
    }

    if let Some(dir) = &cli.output_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }

    let batch = pipeline.run_batch(&inputs)?;
    let mut write_failures = 0;
    for report in &batch.inputs {
        print_status(report);
        if let (Some(dir), Ok(result)) = (&cli.output_dir, &report.result) {
            let path = output_path(dir, &report.id, cli.format);
            match poissurf_io::write_mesh(&result.mesh, &path) {
                Ok(()) => info!("Wrote {:?}", path),
                Err(e) => {
                    warn!("Failed to write {:?}: {}", path, e);
                    write_failures += 1;
                }
            }
        }
    }
    println!("{} succeeded, {} failed", batch.success_count(), batch.failure_count());

    if write_failures > 0 {
        println!("{} meshes could not be written", write_failures);
        return Ok(1);
    }
    Ok(batch.exit_code())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let code = run(cli)?;
    std::process::exit(code);
}
