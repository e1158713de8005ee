//! Poisson implicit function over a Delaunay triangulation
//!
//! The indicator function is the piecewise linear `f` minimizing
//! `∫ |∇f - V|²`, where `V` interpolates the sample normals. Its
//! Euler–Lagrange equation `Δf = div V` is discretized with the Voronoi-dual
//! Laplacian of the triangulation and a divergence right-hand side built
//! from barycentric basis gradients. A shell of boundary vertices holds the
//! function at zero far from the samples.

use crate::error::{ReconstructionError, Result};
use crate::geometry::{barycentric_coordinates, barycentric_gradients, clamped_triangle_weights, tetrahedron_volume};
use crate::implicit::{ImplicitFunction, ImplicitFunctionSolver, SolveReport};
use crate::parallel::parallel_map;
use crate::point_set::PointSet;
use crate::sparse::{self, SparseSystem};
use crate::triangulation::{DelaunayTriangulation, Insertion, VertexKind, INVALID};
use itertools::Itertools;
use nalgebra::DVector;
use poissurf_core::{fibonacci_directions, Point3d, Vector3d};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Steiner points stay this far inside the boundary shell so they never
/// reach the hull of the triangulation
const STEINER_SHELL_FRACTION: f64 = 0.9;

/// Configuration parameters for the Poisson solve
#[derive(Debug, Clone, PartialEq)]
pub struct PoissonConfig {
    /// Radius of the boundary shell in bounding radii (default: 3.0)
    pub boundary_radius_factor: f64,
    /// Number of Dirichlet vertices on the shell (default: 256)
    pub boundary_points: usize,
    /// Target cell circumradius near the samples, in bounding radii (default: 0.15)
    pub size_factor: f64,
    /// Cap on refinement vertices (default: 50_000)
    pub max_steiner_points: usize,
    /// Relative residual at which conjugate gradient stops (default: 1e-8)
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Quantile of the sample values moved to zero, 0.5 = median (default: 0.5)
    pub level_quantile: f64,
}

impl Default for PoissonConfig {
    fn default() -> Self {
        Self {
            boundary_radius_factor: 3.0,
            boundary_points: 256,
            size_factor: 0.15,
            max_steiner_points: 50_000,
            tolerance: 1e-8,
            max_iterations: 10_000,
            level_quantile: 0.5,
        }
    }
}

impl PoissonConfig {
    pub fn with_boundary(mut self, radius_factor: f64, points: usize) -> Self {
        self.boundary_radius_factor = radius_factor;
        self.boundary_points = points;
        self
    }

    pub fn with_size_factor(mut self, size_factor: f64) -> Self {
        self.size_factor = size_factor;
        self
    }

    pub fn with_max_steiner_points(mut self, max: usize) -> Self {
        self.max_steiner_points = max;
        self
    }

    pub fn with_solver(mut self, tolerance: f64, max_iterations: usize) -> Self {
        self.tolerance = tolerance;
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_level_quantile(mut self, quantile: f64) -> Self {
        self.level_quantile = quantile;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.boundary_radius_factor > 1.0 && self.boundary_radius_factor.is_finite()) {
            return Err(ReconstructionError::invalid_criteria(format!(
                "boundary radius factor must exceed 1, got {}",
                self.boundary_radius_factor
            )));
        }
        if self.boundary_points < 4 {
            return Err(ReconstructionError::invalid_criteria("the boundary shell needs at least 4 points"));
        }
        if !(self.size_factor > 0.0 && self.size_factor.is_finite()) {
            return Err(ReconstructionError::invalid_criteria(format!(
                "size factor must be positive, got {}",
                self.size_factor
            )));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(ReconstructionError::invalid_criteria(format!(
                "solver tolerance must lie in (0, 1), got {}",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(ReconstructionError::invalid_criteria("max_iterations must be positive"));
        }
        if !(0.0..=1.0).contains(&self.level_quantile) {
            return Err(ReconstructionError::invalid_criteria(format!(
                "level quantile must lie in [0, 1], got {}",
                self.level_quantile
            )));
        }
        Ok(())
    }
}

/// Default [`ImplicitFunctionSolver`]
#[derive(Debug, Clone, Default)]
pub struct PoissonSolver {
    pub config: PoissonConfig,
}

impl PoissonSolver {
    pub fn new(config: PoissonConfig) -> Self {
        Self { config }
    }
}

impl ImplicitFunctionSolver for PoissonSolver {
    fn name(&self) -> &str {
        "poisson"
    }

    fn domain_radius_factor(&self) -> f64 {
        self.config.boundary_radius_factor + 1.0
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()
    }

    fn compute(
        &self,
        points: &PointSet,
        mut triangulation: DelaunayTriangulation,
    ) -> Result<Box<dyn ImplicitFunction>> {
        self.config.validate()?;
        let centroid = points.centroid();
        let radius = points.bounding_radius();

        let boundary_points = add_boundary_shell(&mut triangulation, centroid, radius, &self.config)?;
        let steiner_points = refine(&mut triangulation, centroid, radius, &self.config);
        info!(
            "Poisson triangulation: {} vertices ({} Steiner, {} boundary), {} cells",
            triangulation.number_of_vertices(),
            steiner_points,
            boundary_points,
            triangulation.number_of_cells()
        );

        let system = assemble(&triangulation, points);
        debug!("Assembled {} unknowns with {} non-zeros", system.dim(), system.nnz());
        let solution = sparse::solve(&system, self.config.tolerance, self.config.max_iterations)?;
        info!(
            "Solved in {} iterations, relative residual {:.3e}",
            solution.iterations, solution.residual
        );

        for (row, &v) in system.unknowns.iter().enumerate() {
            triangulation.set_value(v, solution.values[row]);
        }

        let mut function = PoissonImplicitFunction {
            triangulation,
            centroid,
            bounding_radius: radius,
            hint: AtomicUsize::new(INVALID),
            report: SolveReport {
                steiner_points,
                boundary_points,
                unknowns: system.dim(),
                iterations: solution.iterations,
                residual: solution.residual,
                level_shift: 0.0,
            },
        };
        function.shift_level(points, self.config.level_quantile);
        Ok(Box::new(function))
    }
}

/// Dirichlet vertices on a Fibonacci sphere around the samples
fn add_boundary_shell(
    triangulation: &mut DelaunayTriangulation,
    centroid: Point3d,
    radius: f64,
    config: &PoissonConfig,
) -> Result<usize> {
    let shell_radius = config.boundary_radius_factor * radius;
    let mut added = 0;
    for direction in fibonacci_directions(config.boundary_points) {
        let report = triangulation.insert_point(centroid + direction * shell_radius, VertexKind::Boundary)?;
        if let Insertion::Inserted(_) = report.insertion {
            added += 1;
        }
    }
    Ok(added)
}

/// Insert circumcenters of oversized cells until every cell inside the shell
/// meets its size bound.
///
/// The bound is `size_factor * R` up to the bounding radius `R` and grows
/// quadratically beyond it, so the mesh is fine near the samples and coarse
/// near the shell.
fn refine(triangulation: &mut DelaunayTriangulation, centroid: Point3d, radius: f64, config: &PoissonConfig) -> usize {
    let reach = STEINER_SHELL_FRACTION * config.boundary_radius_factor * radius;
    let size_bound = |center: &Point3d| {
        let d = (center - centroid).norm() / radius;
        config.size_factor * radius * d.max(1.0).powi(2)
    };

    let mut queue: VecDeque<usize> = triangulation.cells().map(|(c, _)| c).collect();
    let mut added = 0;
    let mut skipped = 0;
    while let Some(c) = queue.pop_front() {
        if added >= config.max_steiner_points {
            warn!("Steiner point cap of {} reached", config.max_steiner_points);
            break;
        }
        let cell = triangulation.cell(c);
        if !cell.is_alive() || triangulation.has_auxiliary_vertex(c) {
            continue;
        }
        let center = cell.circumcenter;
        if (center - centroid).norm() >= reach || cell.squared_radius.sqrt() <= size_bound(&center) {
            continue;
        }
        match triangulation.insert_point(center, VertexKind::Steiner) {
            Ok(report) => match report.insertion {
                Insertion::Inserted(_) => {
                    added += 1;
                    queue.extend(report.created);
                }
                Insertion::Merged(_) => skipped += 1,
            },
            Err(e) => {
                debug!("Skipping refinement point {:?}: {}", center, e);
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        debug!("Skipped {} refinement points", skipped);
    }
    added
}

/// Signed Voronoi-dual weight `area(dual face) / |ab|` of edge `ab`.
///
/// The dual face is the polygon of circumcenters of the cells around the
/// edge. Its winding is compared with that of the cell centroids, which
/// always turn the same way around the edge as the ring.
pub(crate) fn dual_weight(triangulation: &DelaunayTriangulation, a: usize, b: usize) -> Option<f64> {
    let ring = triangulation.cells_around_edge(a, b)?;
    let pa = triangulation.vertex(a).position;
    let pb = triangulation.vertex(b).position;
    let edge = pb - pa;
    let length = edge.norm();
    let axis = edge / length;
    let midpoint = pa + edge * 0.5;

    let vector_area = |points: &[Point3d]| -> Vector3d {
        points
            .iter()
            .circular_tuple_windows()
            .map(|(p, q)| (p - midpoint).cross(&(q - midpoint)))
            .sum::<Vector3d>()
            * 0.5
    };

    let circumcenters: Vec<Point3d> = ring.iter().map(|&c| triangulation.cell(c).circumcenter).collect();
    let centroids: Vec<Point3d> = ring
        .iter()
        .map(|&c| {
            let sum = triangulation
                .cell(c)
                .vertices
                .iter()
                .fold(Vector3d::zeros(), |acc, &v| acc + triangulation.vertex(v).position.coords);
            Point3d::from(sum / 4.0)
        })
        .collect();

    let winding = vector_area(&centroids).dot(&axis).signum();
    let weight = winding * vector_area(&circumcenters).dot(&axis) / length;
    weight.is_finite().then_some(weight)
}

/// Build the Poisson system over the non-Dirichlet vertices.
///
/// Rows hold `Σ w` on the diagonal and `-w` towards free neighbors;
/// Dirichlet neighbors only feed the diagonal since their value is zero.
pub fn assemble(triangulation: &DelaunayTriangulation, points: &PointSet) -> SparseSystem {
    let vertices = triangulation.vertices();
    let mut row_of = vec![INVALID; vertices.len()];
    let mut unknowns = Vec::new();
    for (v, vertex) in vertices.iter().enumerate() {
        if !vertex.kind.is_dirichlet() {
            row_of[v] = unknowns.len();
            unknowns.push(v);
        }
    }

    // Each edge once, from its free endpoint with the smaller id
    let mut edges = Vec::new();
    for &v in &unknowns {
        for u in triangulation.vertex_neighbors(v) {
            if triangulation.is_auxiliary(u) || (row_of[u] != INVALID && u < v) {
                continue;
            }
            edges.push((v, u));
        }
    }
    let weights = parallel_map(&edges, |&(a, b)| dual_weight(triangulation, a, b));

    let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); unknowns.len()];
    let mut dropped = 0;
    for (&(a, b), weight) in edges.iter().zip(weights) {
        let Some(w) = weight else {
            dropped += 1;
            continue;
        };
        for (i, j) in [(a, b), (b, a)] {
            let row = row_of[i];
            if row == INVALID {
                continue;
            }
            rows[row].push((row, w));
            if row_of[j] != INVALID {
                rows[row].push((row_of[j], -w));
            }
        }
    }
    if dropped > 0 {
        warn!("Dropped {} edges with open or degenerate dual faces", dropped);
    }

    let rhs = divergence(triangulation, points, &row_of, unknowns.len());
    SparseSystem::from_rows(rows, rhs, unknowns)
}

/// `b_i = Σ_cells vol · V_cell · ∇λ_i`, with `V_cell` the mean of the
/// sample normals at the cell's vertices (zero at other vertices)
fn divergence(
    triangulation: &DelaunayTriangulation,
    points: &PointSet,
    row_of: &[usize],
    dim: usize,
) -> DVector<f64> {
    let samples = points.samples();
    let normal_at = |v: usize| match triangulation.vertex(v).kind {
        VertexKind::Input(i) => samples[i].normal,
        _ => Vector3d::zeros(),
    };

    let mut rhs = DVector::zeros(dim);
    for (c, cell) in triangulation.cells() {
        if triangulation.has_auxiliary_vertex(c) {
            continue;
        }
        let field = cell.vertices.iter().fold(Vector3d::zeros(), |acc, &v| acc + normal_at(v)) / 4.0;
        if field == Vector3d::zeros() {
            continue;
        }
        let q = cell.vertices.map(|v| triangulation.vertex(v).position);
        let Some(gradients) = barycentric_gradients(&q[0], &q[1], &q[2], &q[3]) else {
            continue;
        };
        let volume = tetrahedron_volume(&q[0], &q[1], &q[2], &q[3]);
        for (k, &v) in cell.vertices.iter().enumerate() {
            if row_of[v] != INVALID {
                rhs[row_of[v]] += volume * field.dot(&gradients[k]);
            }
        }
    }
    rhs
}

/// Piecewise linear function carried by the vertices of its triangulation
#[derive(Debug)]
pub struct PoissonImplicitFunction {
    triangulation: DelaunayTriangulation,
    centroid: Point3d,
    bounding_radius: f64,
    hint: AtomicUsize,
    report: SolveReport,
}

impl PoissonImplicitFunction {
    pub fn triangulation(&self) -> &DelaunayTriangulation {
        &self.triangulation
    }

    /// Subtract the `quantile` of the sample values from every vertex value
    fn shift_level(&mut self, points: &PointSet, quantile: f64) {
        let mut values: Vec<f64> = points.samples().iter().map(|s| self.evaluate(&s.position)).collect();
        values.sort_by(f64::total_cmp);
        let index = (quantile * (values.len() - 1) as f64).round() as usize;
        let shift = values[index.min(values.len() - 1)];
        debug!("Shifting implicit function by {:.6e} (quantile {})", shift, quantile);

        let count = self.triangulation.vertices().len();
        for v in 0..count {
            let value = self.triangulation.vertex(v).value;
            self.triangulation.set_value(v, value - shift);
        }
        self.report.level_shift = shift;
    }

    fn interpolate(&self, c: usize, point: &Point3d) -> Option<f64> {
        let cell = self.triangulation.cell(c);
        let vertex = |k: usize| self.triangulation.vertex(cell.vertices[k]);
        let auxiliary: Vec<usize> = (0..4).filter(|&k| self.triangulation.is_auxiliary(cell.vertices[k])).collect();

        match auxiliary.as_slice() {
            [] => {
                let bary = barycentric_coordinates(
                    point,
                    &vertex(0).position,
                    &vertex(1).position,
                    &vertex(2).position,
                    &vertex(3).position,
                )?;
                Some((0..4).map(|k| bary[k] * vertex(k).value).sum())
            }
            // Outside the hull: clamp onto the hull facet of this cell
            &[outer] => {
                let face = cell.face(outer);
                let p = face.map(|v| self.triangulation.vertex(v));
                let weights = clamped_triangle_weights(point, &p[0].position, &p[1].position, &p[2].position)?;
                Some((0..3).map(|k| weights[k] * p[k].value).sum())
            }
            _ => None,
        }
    }

    fn nearest_value(&self, point: &Point3d) -> f64 {
        self.triangulation
            .nearest(point)
            .map(|v| self.triangulation.vertex(v).value)
            .unwrap_or(0.0)
    }
}

impl ImplicitFunction for PoissonImplicitFunction {
    fn evaluate(&self, point: &Point3d) -> f64 {
        let hint = self.hint.load(Ordering::Relaxed);
        match self.triangulation.locate_from(point, hint) {
            Ok(c) => {
                self.hint.store(c, Ordering::Relaxed);
                self.interpolate(c, point).unwrap_or_else(|| self.nearest_value(point))
            }
            Err(_) => self.nearest_value(point),
        }
    }

    /// The centroid when it is inside, otherwise the lowest vertices
    fn inner_point(&self) -> Result<Point3d> {
        let at_centroid = self.evaluate(&self.centroid);
        if at_centroid < 0.0 {
            return Ok(self.centroid);
        }

        let mut candidates: Vec<(usize, f64)> = self
            .triangulation
            .vertices()
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.kind.is_dirichlet())
            .map(|(i, v)| (i, v.value))
            .collect();
        candidates.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut best = at_centroid;
        for &(v, _) in candidates.iter().take(16) {
            let position = self.triangulation.vertex(v).position;
            let value = self.evaluate(&position);
            if value < 0.0 {
                debug!("Centroid is outside (f = {:.3e}), seeding from vertex {}", at_centroid, v);
                return Ok(position);
            }
            best = best.min(value);
        }
        Err(ReconstructionError::NoValidSeed { value: best })
    }

    fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    fn centroid(&self) -> Point3d {
        self.centroid
    }

    fn report(&self) -> Option<SolveReport> {
        Some(self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poissurf_core::sphere_samples;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn solve_sphere(n: usize, config: PoissonConfig) -> (PointSet, Box<dyn ImplicitFunction>) {
        let points = PointSet::from_cloud(&sphere_samples(1.0, n)).unwrap();
        let solver = PoissonSolver::new(config);
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
    fn test_config_validation() {
        assert!(PoissonConfig::default().validate().is_ok());
        assert!(PoissonConfig::default().with_boundary(0.5, 256).validate().is_err());
        assert!(PoissonConfig::default().with_size_factor(0.0).validate().is_err());
        assert!(PoissonConfig::default().with_solver(0.0, 10).validate().is_err());
        assert!(PoissonConfig::default().with_level_quantile(1.5).validate().is_err());
    }

    #[test]
    fn test_dual_weights_match_gradient_stiffness() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut dt = DelaunayTriangulation::new(Point3d::origin(), 2.0).unwrap();
        for _ in 0..60 {
            let p = Point3d::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            dt.insert_point(p, VertexKind::Steiner).unwrap();
        }

        let mut checked = 0;
        for v in 4..dt.vertices().len() {
            for u in dt.vertex_neighbors(v) {
                if u < v {
                    continue;
                }
                let ring = dt.cells_around_edge(v, u).unwrap();
                if ring.iter().any(|&c| dt.has_auxiliary_vertex(c)) {
                    continue;
                }
                let stiffness: f64 = ring
                    .iter()
                    .map(|&c| {
                        let cell = dt.cell(c);
                        let q = cell.vertices.map(|x| dt.vertex(x).position);
                        let g = barycentric_gradients(&q[0], &q[1], &q[2], &q[3]).unwrap();
                        let (i, j) = (cell.index_of(v).unwrap(), cell.index_of(u).unwrap());
                        -tetrahedron_volume(&q[0], &q[1], &q[2], &q[3]) * g[i].dot(&g[j])
                    })
                    .sum();
                let weight = dual_weight(&dt, v, u).unwrap();
                assert!(
                    (weight - stiffness).abs() <= 1e-6 * (1.0 + stiffness.abs()),
                    "edge ({}, {}): dual {} vs stiffness {}",
                    v,
                    u,
                    weight,
                    stiffness
                );
                checked += 1;
            }
        }
        assert!(checked > 20);
    }

    #[test]
    fn test_system_is_symmetric() {
        let points = PointSet::from_cloud(&sphere_samples(1.0, 100)).unwrap();
        let mut dt = DelaunayTriangulation::new(points.centroid(), 4.0).unwrap();
        dt.insert_samples(&points).unwrap();
        add_boundary_shell(&mut dt, points.centroid(), 1.0, &PoissonConfig::default()).unwrap();
        let system = assemble(&dt, &points);

        assert_eq!(system.dim(), 100);
        for i in 0..system.dim() {
            for (j, value) in system.row(i) {
                assert!((value - system.get(j, i)).abs() < 1e-9);
            }
            assert!(system.get(i, i) > 0.0);
        }
    }

    #[test]
    fn test_sphere_sign() {
        let (_, function) = solve_sphere(300, PoissonConfig::default());
        assert!(function.evaluate(&Point3d::origin()) < 0.0);
        for d in fibonacci_directions(20) {
            assert!(function.evaluate(&(Point3d::origin() + d * 1.5)) > 0.0);
        }
        assert!(function.inner_point().is_ok());
    }

    #[test]
    fn test_report_counts_added_vertices() {
        let (_, function) = solve_sphere(200, PoissonConfig::default());
        let report = function.report().unwrap();
        assert_eq!(report.boundary_points, 256);
        assert!(report.steiner_points > 0);
        assert_eq!(report.unknowns, 200 + report.steiner_points);
        assert!(report.residual <= 1e-8);
    }

    #[test]
    fn test_boundary_vertices_hold_the_shifted_zero() {
        let points = PointSet::from_cloud(&sphere_samples(1.0, 150)).unwrap();
        let solver = PoissonSolver::default();
        let mut dt = DelaunayTriangulation::new(points.centroid(), points.bounding_radius() * 4.0).unwrap();
        dt.insert_samples(&points).unwrap();
        let function = match solver.compute(&points, dt.clone()) {
            Ok(f) => f,
            Err(e) => panic!("solve failed: {}", e),
        };
        let shift = function.report().unwrap().level_shift;
        assert!(shift < 0.0);

        // Rebuild the concrete function to reach its triangulation
        let mut dt2 = dt;
        add_boundary_shell(&mut dt2, points.centroid(), points.bounding_radius(), &solver.config).unwrap();
        let system = assemble(&dt2, &points);
        let solution = sparse::solve(&system, 1e-8, 10_000).unwrap();
        for (row, &v) in system.unknowns.iter().enumerate() {
            dt2.set_value(v, solution.values[row]);
        }
        let mut concrete = PoissonImplicitFunction {
            triangulation: dt2,
            centroid: points.centroid(),
            bounding_radius: points.bounding_radius(),
            hint: AtomicUsize::new(INVALID),
            report: SolveReport::default(),
        };
        concrete.shift_level(&points, 0.0);
        let lowest_shift = concrete.report().unwrap().level_shift;
        for vertex in concrete.triangulation().vertices() {
            if vertex.kind == VertexKind::Boundary {
                assert_eq!(vertex.value, -lowest_shift);
            }
        }
    }

    #[test]
    fn test_default_level_is_the_sample_median() {
        let (points, function) = solve_sphere(151, PoissonConfig::default());
        let values: Vec<f64> = points.samples().iter().map(|s| function.evaluate(&s.position)).collect();
        let below = values.iter().filter(|&&v| v < -1e-12).count();
        let above = values.iter().filter(|&&v| v > 1e-12).count();
        assert!((70..=80).contains(&below), "{} samples below zero", below);
        assert!((70..=80).contains(&above), "{} samples above zero", above);
    }

    #[test]
    fn test_steiner_cap_is_honored() {
        let (_, function) = solve_sphere(200, PoissonConfig::default().with_max_steiner_points(10));
        assert_eq!(function.report().unwrap().steiner_points, 10);
    }

    #[test]
    fn test_iteration_cap_fails_the_solve() {
        let points = PointSet::from_cloud(&sphere_samples(1.0, 200)).unwrap();
        let solver = PoissonSolver::new(PoissonConfig::default().with_solver(1e-12, 1));
        let mut dt = DelaunayTriangulation::new(points.centroid(), points.bounding_radius() * 4.0).unwrap();
        dt.insert_samples(&points).unwrap();
        match solver.compute(&points, dt) {
            Err(ReconstructionError::DidNotConverge { iterations, .. }) => assert_eq!(iterations, 1),
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("one iteration should not converge"),
        }
    }
}
