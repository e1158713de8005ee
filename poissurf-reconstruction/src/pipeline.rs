//! Reconstruction pipeline
//!
//! Runs one input through point set validation, triangulation, the implicit
//! function solve, seed selection and surface extraction. Batches run their
//! inputs one after the other; a failing input is recorded and the batch
//! moves on.

use crate::criteria::{MeshingCriteria, SurfaceDomain};
use crate::error::Result;
use crate::implicit::{ImplicitFunctionSolver, SolveReport};
use crate::point_set::PointSet;
use crate::poisson::PoissonSolver;
use crate::report::{BatchReport, InputReport, InputSource, ProgressReporter, Stage, TracingReporter};
use crate::surface_mesher::{DelaunayRefinementExtractor, SurfaceExtractor, Termination};
use crate::triangulation::DelaunayTriangulation;
use poissurf_core::{Bounded, NormalPointCloud3f, TriangleMesh};
use std::time::Instant;
use tracing::{debug, info};

/// Result of a reconstruction with metadata
#[derive(Debug, Clone)]
pub struct ReconstructionResult {
    pub mesh: TriangleMesh,
    pub termination: Termination,
    /// Processing time in seconds
    pub processing_time: f32,
    pub quality_metrics: QualityMetrics,
    /// Solver figures, when the solver provides them
    pub solve: Option<SolveReport>,
}

impl ReconstructionResult {
    pub fn is_degraded(&self) -> bool {
        self.termination == Termination::FacetLimit
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityMetrics {
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub non_manifold_edges: usize,
    pub boundary_edges: usize,
    /// Facets left violating a criterion
    pub skipped_facets: usize,
    /// Surface points inserted by the extractor
    pub surface_points: usize,
    /// Smallest triangle angle of the mesh, in degrees
    pub min_angle_degrees: f64,
}

impl QualityMetrics {
    fn of(mesh: &TriangleMesh) -> Self {
        let min_angle = mesh
            .faces
            .iter()
            .map(|face| {
                let p = face.map(|i| mesh.vertices[i].cast::<f64>());
                crate::geometry::triangle_min_angle(&p[0], &p[1], &p[2])
            })
            .fold(f64::INFINITY, f64::min);
        Self {
            vertex_count: mesh.vertex_count(),
            triangle_count: mesh.face_count(),
            min_angle_degrees: if min_angle.is_finite() { min_angle.to_degrees() } else { 0.0 },
            ..Self::default()
        }
    }
}

/// The reconstruction pipeline
pub struct ReconstructionPipeline {
    criteria: MeshingCriteria,
    solver: Box<dyn ImplicitFunctionSolver>,
    extractor: Box<dyn SurfaceExtractor>,
    reporter: Box<dyn ProgressReporter>,
}

impl ReconstructionPipeline {
    /// Pipeline with the Poisson solver and the Delaunay refinement extractor.
    ///
    /// Fails with `InvalidCriteria` before anything is processed.
    pub fn new(criteria: MeshingCriteria) -> Result<Self> {
        criteria.validate()?;
        Ok(Self {
            criteria,
            solver: Box::new(PoissonSolver::default()),
            extractor: Box::new(DelaunayRefinementExtractor::default()),
            reporter: Box::new(TracingReporter),
        })
    }

    pub fn with_solver(mut self, solver: Box<dyn ImplicitFunctionSolver>) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn SurfaceExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn criteria(&self) -> &MeshingCriteria {
        &self.criteria
    }

    fn timed<T>(&self, input: &str, stage: Stage, op: impl FnOnce() -> Result<T>) -> Result<T> {
        self.reporter.stage_started(input, stage);
        let start = Instant::now();
        let result = op();
        self.reporter.stage_finished(input, stage, start.elapsed());
        result
    }

    /// Reconstruct a surface from an in-memory oriented cloud
    pub fn reconstruct(&self, cloud: &NormalPointCloud3f) -> Result<ReconstructionResult> {
        self.solver.validate()?;
        self.reconstruct_input("samples", cloud)
    }

    fn reconstruct_input(&self, id: &str, cloud: &NormalPointCloud3f) -> Result<ReconstructionResult> {
        let start_time = Instant::now();
        let (min, max) = cloud.bounding_box();
        debug!("[{}] {} samples spanning {:?} to {:?}", id, cloud.len(), min, max);

        let points = self.timed(id, Stage::PointSet, || PointSet::from_cloud(cloud))?;
        let triangulation = self.timed(id, Stage::Triangulation, || {
            let mut triangulation = DelaunayTriangulation::new(
                points.centroid(),
                points.bounding_radius() * self.solver.domain_radius_factor(),
            )?;
            triangulation.insert_samples(&points)?;
            Ok(triangulation)
        })?;
        let function = self.timed(id, Stage::Solve, || self.solver.compute(&points, triangulation))?;
        let seed = self.timed(id, Stage::Seed, || function.inner_point())?;

        let radius = function.bounding_radius();
        let domain = SurfaceDomain::around_seed(seed, radius);
        let facet_criteria = self.criteria.resolve(radius / 2.0);
        let surface = self.timed(id, Stage::Extract, || {
            self.extractor.extract(function.as_ref(), &domain, &facet_criteria)
        })?;

        let quality_metrics = QualityMetrics {
            non_manifold_edges: surface.non_manifold_edges,
            boundary_edges: surface.boundary_edges,
            skipped_facets: surface.skipped_facets,
            surface_points: surface.inserted_points,
            ..QualityMetrics::of(&surface.mesh)
        };
        let processing_time = start_time.elapsed().as_secs_f32();
        info!(
            "[{}] {} triangles in {:.2}s ({:?})",
            id, quality_metrics.triangle_count, processing_time, surface.termination
        );

        Ok(ReconstructionResult {
            mesh: surface.mesh,
            termination: surface.termination,
            processing_time,
            quality_metrics,
            solve: function.report(),
        })
    }

    /// Load and reconstruct one input, capturing any failure in the report
    pub fn process(&self, input: &InputSource) -> InputReport {
        let id = input.id();
        let result = self
            .timed(&id, Stage::Load, || input.load())
            .and_then(|cloud| self.reconstruct_input(&id, &cloud));
        let report = InputReport::new(id, result);
        self.reporter.input_finished(&report);
        report
    }

    /// Process every input in order.
    ///
    /// Configuration errors are returned before any input is touched; data
    /// errors are recorded per input.
    pub fn run_batch<'a>(&self, inputs: impl IntoIterator<Item = &'a InputSource>) -> Result<BatchReport> {
        self.criteria.validate()?;
        self.solver.validate()?;

        let mut batch = BatchReport::default();
        for input in inputs {
            batch.push(self.process(input));
        }
        info!(
            "Batch finished: {} succeeded, {} failed",
            batch.success_count(),
            batch.failure_count()
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconstructionError;
    use crate::poisson::PoissonConfig;
    use crate::report::NullReporter;
    use poissurf_core::{NormalPoint3f, Point3f, Vector3f};

    #[test]
    fn test_invalid_criteria_rejected_up_front() {
        let result = ReconstructionPipeline::new(MeshingCriteria::default().with_min_facet_angle(75.0));
        assert!(matches!(result, Err(ReconstructionError::InvalidCriteria { .. })));
    }

    #[test]
    fn test_invalid_solver_config_stops_batch() {
        let pipeline = ReconstructionPipeline::new(MeshingCriteria::default())
            .unwrap()
            .with_solver(Box::new(PoissonSolver::new(PoissonConfig::default().with_level_quantile(-0.5))))
            .with_reporter(Box::new(NullReporter));
        let inputs = [InputSource::samples("never", NormalPointCloud3f::new())];
        assert!(pipeline.run_batch(&inputs).unwrap_err().is_fatal_for_batch());
    }

    #[test]
    fn test_degenerate_input_does_not_panic() {
        let pipeline = ReconstructionPipeline::new(MeshingCriteria::default())
            .unwrap()
            .with_reporter(Box::new(NullReporter));
        let cloud: NormalPointCloud3f = (0..10)
            .map(|i| NormalPoint3f::new(Point3f::new(i as f32, 2.0 * i as f32, 0.0), Vector3f::z()))
            .collect();
        let err = pipeline.reconstruct(&cloud).unwrap_err();
        assert_eq!(err.kind(), "UnreadableInput");
    }

    #[test]
    fn test_quality_metrics_of_tetrahedron() {
        let mesh = TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
        );
        let metrics = QualityMetrics::of(&mesh);
        assert_eq!(metrics.triangle_count, 4);
        assert!((metrics.min_angle_degrees - 45.0).abs() < 1e-4);
    }
}
