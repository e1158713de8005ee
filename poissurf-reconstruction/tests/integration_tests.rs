//! Integration tests for poissurf-reconstruction
//!
//! These run whole reconstructions of synthetic spheres through the public
//! API, with coarse meshing criteria to keep them quick.

use poissurf_core::{
    fibonacci_directions, jitter_positions, sphere_samples, NormalPoint3f, NormalPointCloud3f, Point3d, Point3f,
    TriangleMesh, Vector3f,
};
use poissurf_reconstruction::geometry::{triangle_circumradius, triangle_min_angle};
use poissurf_reconstruction::*;
use tempfile::tempdir;

const RADIUS_FACTOR: f64 = 0.4;

fn coarse_criteria() -> MeshingCriteria {
    MeshingCriteria::default()
        .with_max_circumradius_factor(RADIUS_FACTOR)
        .with_max_distance_factor(0.05)
}

fn pipeline() -> ReconstructionPipeline {
    ReconstructionPipeline::new(coarse_criteria())
        .unwrap()
        .with_reporter(Box::new(NullReporter))
}

/// Positive everywhere, so no seed can be found
struct Outside {
    centroid: Point3d,
    bounding_radius: f64,
}

impl ImplicitFunction for Outside {
    fn evaluate(&self, _point: &Point3d) -> f64 {
        1.0
    }

    fn inner_point(&self) -> Result<Point3d, ReconstructionError> {
        Err(ReconstructionError::NoValidSeed { value: 1.0 })
    }

    fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    fn centroid(&self) -> Point3d {
        self.centroid
    }
}

/// Fails small inputs the way a real solve can, solves the rest with Poisson
struct SizeDependentSolver;

impl ImplicitFunctionSolver for SizeDependentSolver {
    fn name(&self) -> &str {
        "size-dependent"
    }

    fn compute(
        &self,
        points: &PointSet,
        triangulation: DelaunayTriangulation,
    ) -> Result<Box<dyn ImplicitFunction>, ReconstructionError> {
        match points.len() {
            0..=249 => PoissonSolver::new(PoissonConfig::default().with_solver(1e-12, 1)).compute(points, triangulation),
            250..=349 => Ok(Box::new(Outside {
                centroid: points.centroid(),
                bounding_radius: points.bounding_radius(),
            })),
            _ => PoissonSolver::default().compute(points, triangulation),
        }
    }
}

fn solve(cloud: &NormalPointCloud3f) -> (PointSet, Box<dyn ImplicitFunction>) {
    let points = PointSet::from_cloud(cloud).unwrap();
    let solver = PoissonSolver::default();
    let mut triangulation = DelaunayTriangulation::new(
        points.centroid(),
        points.bounding_radius() * solver.domain_radius_factor(),
    )
    .unwrap();
    triangulation.insert_samples(&points).unwrap();
    let function = solver.compute(&points, triangulation).unwrap();
    (points, function)
}

#[test]
fn test_sphere_indicator_sign() {
    let (points, function) = solve(&sphere_samples(1.0, 500));
    let radius = points.bounding_radius();

    assert!(function.evaluate(&Point3d::origin()) < 0.0);
    for d in fibonacci_directions(40) {
        assert!(function.evaluate(&(Point3d::origin() + d * 1.25 * radius)) > 0.0);
        assert!(function.evaluate(&(Point3d::origin() + d * 2.0 * radius)) > 0.0);
    }
}

#[test]
fn test_samples_lie_near_the_zero_level() {
    let (points, function) = solve(&sphere_samples(1.0, 500));
    let interior = function.evaluate(&Point3d::origin()).abs();

    let values: Vec<f64> = points
        .samples()
        .iter()
        .map(|s| function.evaluate(&s.position).abs())
        .collect();
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let max = values.iter().copied().fold(0.0, f64::max);
    assert!(mean < 0.02 * interior, "mean {} vs interior {}", mean, interior);
    assert!(max < 0.4 * interior, "max {} vs interior {}", max, interior);
}

#[test]
fn test_sphere_mesh_quality() {
    let result = pipeline().reconstruct(&sphere_samples(1.0, 600)).unwrap();
    assert_eq!(result.termination, Termination::Converged);
    assert_eq!(result.quality_metrics.skipped_facets, 0);

    let mesh = &result.mesh;
    assert!(mesh.face_count() > 20);
    assert!(mesh.has_valid_indices());

    let bounding_radius = 1.0;
    let min_angle = coarse_criteria().min_facet_angle_degrees.to_radians() - 1e-6;
    for face in &mesh.faces {
        let p = face.map(|i| mesh.vertices[i].cast::<f64>());
        assert!(triangle_min_angle(&p[0], &p[1], &p[2]) >= min_angle);
        assert!(triangle_circumradius(&p[0], &p[1], &p[2]) <= RADIUS_FACTOR * bounding_radius + 1e-5);
    }
}

#[test]
fn test_reconstruction_is_repeatable() {
    let cloud = sphere_samples(1.0, 400);
    let first = pipeline().reconstruct(&cloud).unwrap();
    let second = pipeline().reconstruct(&cloud).unwrap();
    assert_eq!(first.mesh.vertex_count(), second.mesh.vertex_count());
    assert_eq!(first.mesh.face_count(), second.mesh.face_count());
}

#[test]
fn test_translated_noisy_sphere() {
    let offset = Vector3f::new(5.0, -2.0, 10.0);
    let mut cloud = jitter_positions(&sphere_samples(2.0, 500), 0.01, 3);
    for sample in cloud.points.iter_mut() {
        sample.position += offset;
    }

    let result = pipeline().reconstruct(&cloud).unwrap();
    let center = Point3f::from(offset);
    for v in &result.mesh.vertices {
        let d = (v - center).norm();
        assert!(d > 1.2 && d < 2.2, "vertex at distance {}", d);
    }
    let solve = result.solve.unwrap();
    assert!(solve.steiner_points > 0);
}

#[test]
fn test_too_few_points_unreadable() {
    let cloud: NormalPointCloud3f = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
        .iter()
        .map(|p| NormalPoint3f::new(Point3f::new(p[0], p[1], p[2]), Vector3f::z()))
        .collect();
    let err = pipeline().reconstruct(&cloud).unwrap_err();
    assert!(matches!(err, ReconstructionError::UnreadableInput { .. }));
}

#[test]
fn test_coplanar_points_unreadable() {
    let cloud: NormalPointCloud3f = (0..50)
        .map(|i| {
            let t = i as f32 * 0.37;
            NormalPoint3f::new(Point3f::new(t.cos() * t, t.sin() * t, 0.0), Vector3f::z())
        })
        .collect();
    let err = pipeline().reconstruct(&cloud).unwrap_err();
    assert_eq!(err.kind(), "UnreadableInput");
}

#[test]
fn test_batch_with_valid_and_empty_files() {
    let dir = tempdir().unwrap();

    let cloud = sphere_samples(1.0, 400);
    let mut samples = TriangleMesh::from_vertices_and_faces(cloud.iter().map(|s| s.position).collect(), vec![]);
    samples.set_normals(cloud.iter().map(|s| s.normal).collect());
    let sphere_path = dir.path().join("sphere.off");
    poissurf_io::write_mesh(&samples, &sphere_path).unwrap();

    let empty_path = dir.path().join("empty.off");
    std::fs::write(&empty_path, "").unwrap();

    let inputs = [InputSource::File(sphere_path), InputSource::File(empty_path)];
    let batch = pipeline().run_batch(&inputs).unwrap();

    assert_eq!(batch.inputs.len(), 2);
    assert!(batch.inputs[0].status.success);
    assert!(batch.inputs[0].status.triangle_count > 0);
    assert!(matches!(
        batch.inputs[1].error(),
        Some(ReconstructionError::UnreadableInput { .. })
    ));
    assert!(batch.failed());
    assert_ne!(batch.exit_code(), 0);
}

#[test]
fn test_batch_continues_after_solve_and_seed_failures() {
    let pipeline = pipeline().with_solver(Box::new(SizeDependentSolver));
    let inputs = [
        InputSource::samples("stalled", sphere_samples(1.0, 200)),
        InputSource::samples("seedless", sphere_samples(1.0, 300)),
        InputSource::samples("sphere", sphere_samples(1.0, 400)),
    ];
    let batch = pipeline.run_batch(&inputs).unwrap();

    assert_eq!(batch.inputs.len(), 3);
    assert_eq!(batch.inputs[0].error().map(|e| e.kind()), Some("DidNotConverge"));
    assert!(!batch.inputs[0].status.success);
    assert_eq!(batch.inputs[1].error().map(|e| e.kind()), Some("NoValidSeed"));
    assert!(batch.inputs[2].status.success);
    assert!(batch.inputs[2].status.triangle_count > 0);
    assert_eq!(batch.success_count(), 1);
    assert_eq!(batch.failure_count(), 2);
    assert_ne!(batch.exit_code(), 0);
}
