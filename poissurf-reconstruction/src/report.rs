//! Per-input outcomes, batch aggregation and progress reporting

use crate::error::{ReconstructionError, Result};
use crate::pipeline::ReconstructionResult;
use poissurf_core::NormalPointCloud3f;
use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the samples of one input come from
#[derive(Debug, Clone)]
pub enum InputSource {
    /// An OFF or PLY file
    File(PathBuf),
    /// An in-memory oriented cloud
    Samples { name: String, cloud: NormalPointCloud3f },
}

impl InputSource {
    pub fn samples(name: impl Into<String>, cloud: NormalPointCloud3f) -> Self {
        Self::Samples {
            name: name.into(),
            cloud,
        }
    }

    /// Identifier used in logs and reports
    pub fn id(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Samples { name, .. } => name.clone(),
        }
    }

    pub fn load(&self) -> Result<Cow<'_, NormalPointCloud3f>> {
        match self {
            Self::File(path) => Ok(Cow::Owned(poissurf_io::read_oriented_points(path)?)),
            Self::Samples { cloud, .. } => Ok(Cow::Borrowed(cloud)),
        }
    }
}

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Load,
    PointSet,
    Triangulation,
    Solve,
    Seed,
    Extract,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Load => "load",
            Stage::PointSet => "point set",
            Stage::Triangulation => "triangulation",
            Stage::Solve => "solve",
            Stage::Seed => "seed",
            Stage::Extract => "extract",
        };
        f.write_str(name)
    }
}

/// Non-fatal conditions of a successful reconstruction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarningFlags {
    /// Refinement stopped at the facet ceiling
    pub degraded: bool,
    /// The mesh has edges shared by more than two triangles
    pub non_manifold: bool,
}

impl WarningFlags {
    pub fn any(&self) -> bool {
        self.degraded || self.non_manifold
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputStatus {
    pub success: bool,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub warnings: WarningFlags,
}

#[derive(Debug)]
pub struct InputReport {
    pub id: String,
    pub status: InputStatus,
    pub result: Result<ReconstructionResult>,
}

impl InputReport {
    pub fn new(id: impl Into<String>, result: Result<ReconstructionResult>) -> Self {
        let status = match &result {
            Ok(r) => InputStatus {
                success: true,
                vertex_count: r.mesh.vertex_count(),
                triangle_count: r.mesh.face_count(),
                warnings: WarningFlags {
                    degraded: r.is_degraded(),
                    non_manifold: r.quality_metrics.non_manifold_edges > 0,
                },
            },
            Err(_) => InputStatus::default(),
        };
        Self {
            id: id.into(),
            status,
            result,
        }
    }

    pub fn error(&self) -> Option<&ReconstructionError> {
        self.result.as_ref().err()
    }
}

/// Outcome of a batch; failed as soon as one input failed
#[derive(Debug, Default)]
pub struct BatchReport {
    pub inputs: Vec<InputReport>,
}

impl BatchReport {
    pub fn push(&mut self, report: InputReport) {
        self.inputs.push(report);
    }

    pub fn failed(&self) -> bool {
        self.inputs.iter().any(|r| !r.status.success)
    }

    pub fn success_count(&self) -> usize {
        self.inputs.iter().filter(|r| r.status.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.inputs.len() - self.success_count()
    }

    /// Process exit status for the batch
    pub fn exit_code(&self) -> i32 {
        i32::from(self.failed())
    }
}

/// Receives stage timings and per-input outcomes
pub trait ProgressReporter: Send + Sync {
    fn stage_started(&self, _input: &str, _stage: Stage) {}

    fn stage_finished(&self, _input: &str, _stage: Stage, _elapsed: Duration) {}

    fn input_finished(&self, _report: &InputReport) {}
}

/// Reports through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn stage_started(&self, input: &str, stage: Stage) {
        debug!("[{}] {} started", input, stage);
    }

    fn stage_finished(&self, input: &str, stage: Stage, elapsed: Duration) {
        info!("[{}] {} finished in {:.3}s", input, stage, elapsed.as_secs_f64());
    }

    fn input_finished(&self, report: &InputReport) {
        match &report.result {
            Ok(_) => info!(
                "[{}] reconstructed {} vertices, {} triangles{}",
                report.id,
                report.status.vertex_count,
                report.status.triangle_count,
                if report.status.warnings.any() { " (with warnings)" } else { "" }
            ),
            Err(e) => warn!("[{}] failed: {}", report.id, e),
        }
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {}
