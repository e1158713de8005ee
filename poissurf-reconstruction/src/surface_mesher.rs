//! Delaunay refinement meshing of an implicit surface
//!
//! The mesher keeps a 3D Delaunay triangulation of points lying on the zero
//! level set. A facet of that triangulation is *restricted* when its dual
//! Voronoi segment, clipped to the search ball, crosses the level set; the
//! crossing point is the center of the facet's surface Delaunay ball.
//! Restricted facets that are too small in angle, too large, or too far
//! from the surface get their ball center inserted, until none is left.
//!
//! The run moves through three states: `Seeded` once initial surface
//! points are in, `Refining` while the queue of bad facets drains, and
//! `Converged` when no facet is bad or the facet ceiling was hit.

use crate::criteria::{FacetCriteria, SurfaceDomain};
use crate::error::{ReconstructionError, Result};
use crate::geometry::{clip_segment_to_ball, triangle_circumcenter, triangle_min_angle};
use crate::implicit::ImplicitFunction;
use crate::triangulation::{DelaunayTriangulation, Insertion, InsertionReport, VertexKind, INVALID};
use poissurf_core::{fibonacci_directions, Point3d, TriangleMesh, Vector3d};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Extracts a triangle mesh approximating the zero level set of a function
pub trait SurfaceExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// Mesh the part of the level set inside `domain`.
    ///
    /// `domain.center` must be a point where the function is negative.
    fn extract(
        &self,
        function: &dyn ImplicitFunction,
        domain: &SurfaceDomain,
        criteria: &FacetCriteria,
    ) -> Result<ExtractedSurface>;
}

/// Why refinement stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// No restricted facet violates a criterion
    Converged,
    /// The facet ceiling was reached; the mesh is partial
    FacetLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MesherState {
    Seeded,
    Refining,
    Converged,
}

#[derive(Debug, Clone)]
pub struct ExtractedSurface {
    pub mesh: TriangleMesh,
    pub termination: Termination,
    /// Surface points inserted, initial ones included
    pub inserted_points: usize,
    pub non_manifold_edges: usize,
    /// Edges with one incident triangle, where the surface leaves the search ball
    pub boundary_edges: usize,
    /// Facets left violating a criterion because their center could not be inserted
    pub skipped_facets: usize,
}

impl ExtractedSurface {
    /// True when refinement stopped at the facet ceiling
    pub fn is_degraded(&self) -> bool {
        self.termination == Termination::FacetLimit
    }
}

/// Default [`SurfaceExtractor`]
#[derive(Debug, Clone)]
pub struct DelaunayRefinementExtractor {
    /// Rays shot from the seed to find initial surface points
    pub initial_rays: usize,
    /// Random ray directions from this seed instead of a Fibonacci spiral
    pub random_seed: Option<u64>,
    /// Cap on bisection steps when locating the level set
    pub max_bisection_steps: usize,
}

impl Default for DelaunayRefinementExtractor {
    fn default() -> Self {
        Self {
            initial_rays: 32,
            random_seed: None,
            max_bisection_steps: 64,
        }
    }
}

impl DelaunayRefinementExtractor {
    pub fn with_initial_rays(mut self, rays: usize) -> Self {
        self.initial_rays = rays;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    fn ray_directions(&self) -> Vec<Vector3d> {
        match self.random_seed {
            None => fibonacci_directions(self.initial_rays),
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut directions = Vec::with_capacity(self.initial_rays);
                while directions.len() < self.initial_rays {
                    let v = Vector3d::new(
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                    );
                    let norm = v.norm();
                    if norm > 1e-3 && norm <= 1.0 {
                        directions.push(v / norm);
                    }
                }
                directions
            }
        }
    }
}

impl SurfaceExtractor for DelaunayRefinementExtractor {
    fn name(&self) -> &str {
        "delaunay-refinement"
    }

    fn extract(
        &self,
        function: &dyn ImplicitFunction,
        domain: &SurfaceDomain,
        criteria: &FacetCriteria,
    ) -> Result<ExtractedSurface> {
        let mut mesher = Mesher::new(function, *domain, *criteria, self.max_bisection_steps)?;
        mesher.seed(&self.ray_directions())?;
        mesher.refine();
        mesher.into_surface()
    }
}

/// A restricted facet and its surface Delaunay ball
#[derive(Debug, Clone, Copy)]
struct SurfaceFacet {
    center: Point3d,
    /// From the inside end of the dual segment to its outside end
    outward: Vector3d,
    ball_radius2: f64,
    bad: bool,
}

type FacetKey = [usize; 3];

fn facet_key(mut face: [usize; 3]) -> FacetKey {
    face.sort_unstable();
    face
}

struct Mesher<'a> {
    function: &'a dyn ImplicitFunction,
    domain: SurfaceDomain,
    criteria: FacetCriteria,
    triangulation: DelaunayTriangulation,
    facets: BTreeMap<FacetKey, SurfaceFacet>,
    queue: VecDeque<FacetKey>,
    skipped: HashSet<FacetKey>,
    inserted: usize,
    termination: Termination,
    state: MesherState,
    tolerance: f64,
    max_steps: usize,
}

impl<'a> Mesher<'a> {
    fn new(
        function: &'a dyn ImplicitFunction,
        domain: SurfaceDomain,
        criteria: FacetCriteria,
        max_steps: usize,
    ) -> Result<Self> {
        let radius = domain.radius();
        let triangulation = DelaunayTriangulation::new(domain.center, radius * 1.05)?;
        Ok(Self {
            function,
            domain,
            criteria,
            triangulation,
            facets: BTreeMap::new(),
            queue: VecDeque::new(),
            skipped: HashSet::new(),
            inserted: 0,
            termination: Termination::Converged,
            state: MesherState::Seeded,
            tolerance: 1e-9 * radius,
            max_steps,
        })
    }

    fn is_inside(&self, p: &Point3d) -> bool {
        self.function.evaluate(p) < 0.0
    }

    /// Level set crossing between an inside and an outside point
    fn bisect(&self, mut inside: Point3d, mut outside: Point3d) -> Point3d {
        for _ in 0..self.max_steps {
            if (outside - inside).norm() <= self.tolerance {
                break;
            }
            let mid = inside + (outside - inside) * 0.5;
            if self.is_inside(&mid) {
                inside = mid;
            } else {
                outside = mid;
            }
        }
        inside + (outside - inside) * 0.5
    }

    fn seed(&mut self, directions: &[Vector3d]) -> Result<()> {
        let center = self.domain.center;
        let value = self.function.evaluate(&center);
        if !(value < 0.0) {
            return Err(ReconstructionError::NoValidSeed { value });
        }

        let reach = self.domain.radius() * (1.0 - 1e-9);
        for direction in directions {
            let end = center + direction * reach;
            if self.is_inside(&end) {
                continue;
            }
            let point = self.bisect(center, end);
            match self.triangulation.insert_point(point, VertexKind::Steiner) {
                Ok(InsertionReport {
                    insertion: Insertion::Inserted(_),
                    ..
                }) => self.inserted += 1,
                Ok(_) => {}
                Err(e) => debug!("Dropping initial point {:?}: {}", point, e),
            }
        }
        if self.inserted == 0 {
            warn!("No ray from the seed crossed the surface");
            return Err(ReconstructionError::EmptySurface);
        }

        let cells: Vec<usize> = self.triangulation.cells().map(|(c, _)| c).collect();
        let mut seen = HashSet::new();
        for c in cells {
            for i in 0..4 {
                let key = facet_key(self.triangulation.cell(c).face(i));
                if seen.insert(key) {
                    self.update_facet(key, c, i);
                }
            }
        }
        info!(
            "Seeded surface mesher with {} points, {} restricted facets ({} bad)",
            self.inserted,
            self.facets.len(),
            self.queue.len()
        );
        Ok(())
    }

    /// The restricted facet across face `i` of cell `c`, if the dual segment
    /// crosses the level set inside the search ball
    fn restricted_facet(&self, c: usize, i: usize) -> Option<SurfaceFacet> {
        let cell = self.triangulation.cell(c);
        let n = cell.neighbors[i];
        if n == INVALID {
            return None;
        }
        let (a, b) = clip_segment_to_ball(
            &cell.circumcenter,
            &self.triangulation.cell(n).circumcenter,
            &self.domain.center,
            self.domain.squared_radius,
        )?;
        let (inside, outside) = match (self.is_inside(&a), self.is_inside(&b)) {
            (true, false) => (a, b),
            (false, true) => (b, a),
            _ => return None,
        };
        let center = self.bisect(inside, outside);

        let face = cell.face(i);
        let p = face.map(|v| self.triangulation.vertex(v).position);
        let ball_radius2 = (center - p[0]).norm_squared();
        Some(SurfaceFacet {
            center,
            outward: outside - inside,
            ball_radius2,
            bad: self.violates_criteria(&p, &center, ball_radius2),
        })
    }

    fn violates_criteria(&self, p: &[Point3d; 3], center: &Point3d, ball_radius2: f64) -> bool {
        if triangle_min_angle(&p[0], &p[1], &p[2]) < self.criteria.min_angle {
            return true;
        }
        if ball_radius2 > self.criteria.radius_bound * self.criteria.radius_bound {
            return true;
        }
        match triangle_circumcenter(&p[0], &p[1], &p[2]) {
            Some(circumcenter) => (circumcenter - center).norm() > self.criteria.distance_bound,
            None => true,
        }
    }

    fn update_facet(&mut self, key: FacetKey, c: usize, i: usize) {
        self.skipped.remove(&key);
        match self.restricted_facet(c, i) {
            Some(facet) => {
                if facet.bad {
                    self.queue.push_back(key);
                }
                self.facets.insert(key, facet);
            }
            None => {
                self.facets.remove(&key);
            }
        }
    }

    /// Insert the ball center of a facet. Returns whether a vertex was added.
    fn refine_facet(&mut self, key: FacetKey, center: Point3d) -> bool {
        match self.triangulation.insert_point(center, VertexKind::Steiner) {
            Ok(report) => match report.insertion {
                Insertion::Inserted(_) => {
                    self.inserted += 1;
                    self.apply(&report);
                    true
                }
                Insertion::Merged(v) => {
                    debug!("Center of facet {:?} coincides with vertex {}", key, v);
                    self.skipped.insert(key);
                    false
                }
            },
            Err(e) => {
                debug!("Cannot refine facet {:?}: {}", key, e);
                self.skipped.insert(key);
                false
            }
        }
    }

    fn apply(&mut self, report: &InsertionReport) {
        for &c in &report.removed {
            for i in 0..4 {
                let key = facet_key(self.triangulation.cell(c).face(i));
                self.facets.remove(&key);
            }
        }
        let mut seen = HashSet::new();
        for &c in &report.created {
            for i in 0..4 {
                let key = facet_key(self.triangulation.cell(c).face(i));
                if seen.insert(key) {
                    self.update_facet(key, c, i);
                }
            }
        }
    }

    fn at_facet_limit(&mut self) -> bool {
        if self.facets.len() >= self.criteria.max_facets {
            if self.termination != Termination::FacetLimit {
                warn!("Facet limit of {} reached, stopping refinement", self.criteria.max_facets);
            }
            self.termination = Termination::FacetLimit;
            return true;
        }
        false
    }

    /// Pop bad facets in FIFO order until none is left
    fn drain_queue(&mut self) {
        while let Some(key) = self.queue.pop_front() {
            if self.at_facet_limit() {
                return;
            }
            let Some(facet) = self.facets.get(&key).copied() else {
                continue;
            };
            if facet.bad && !self.skipped.contains(&key) {
                self.refine_facet(key, facet.center);
            }
        }
    }

    fn refine(&mut self) {
        self.state = MesherState::Refining;
        debug!("Mesher state {:?}", self.state);
        self.drain_queue();

        if !self.criteria.allow_non_manifold {
            while self.termination == Termination::Converged {
                let targets = self.non_manifold_targets();
                if targets.is_empty() {
                    break;
                }
                debug!("Refining {} facets around non-manifold features", targets.len());
                let mut progress = false;
                for key in targets {
                    if let Some(facet) = self.facets.get(&key).copied() {
                        progress |= self.refine_facet(key, facet.center);
                    }
                }
                self.drain_queue();
                if !progress {
                    break;
                }
            }
        }

        self.state = MesherState::Converged;
        info!(
            "Mesher state {:?} ({:?}): {} points, {} facets",
            self.state,
            self.termination,
            self.inserted,
            self.facets.len()
        );
    }

    /// For every edge shared by more than two facets and every vertex whose
    /// link is branched or disconnected, the incident facet with the
    /// largest surface ball
    fn non_manifold_targets(&self) -> Vec<FacetKey> {
        let mut edge_facets: BTreeMap<(usize, usize), Vec<FacetKey>> = BTreeMap::new();
        let mut links: BTreeMap<usize, Vec<(usize, usize)>> = BTreeMap::new();
        let mut vertex_facets: BTreeMap<usize, Vec<FacetKey>> = BTreeMap::new();
        for key in self.facets.keys() {
            let [a, b, c] = *key;
            for (u, v, w) in [(a, b, c), (a, c, b), (b, c, a)] {
                edge_facets.entry((u, v)).or_default().push(*key);
                links.entry(w).or_default().push((u, v));
                vertex_facets.entry(w).or_default().push(*key);
            }
        }

        let largest = |candidates: &mut dyn Iterator<Item = FacetKey>| {
            candidates
                .filter(|k| !self.skipped.contains(k))
                .max_by(|x, y| self.facets[x].ball_radius2.total_cmp(&self.facets[y].ball_radius2))
        };

        let mut targets = BTreeSet::new();
        for incident in edge_facets.values().filter(|f| f.len() > 2) {
            if let Some(key) = largest(&mut incident.iter().copied()) {
                targets.insert(key);
            }
        }
        for (&v, link) in &links {
            if !is_disk_or_fan(link) {
                if let Some(key) = largest(&mut vertex_facets[&v].iter().copied()) {
                    targets.insert(key);
                }
            }
        }
        targets.into_iter().collect()
    }

    fn into_surface(self) -> Result<ExtractedSurface> {
        let mut index = vec![INVALID; self.triangulation.vertices().len()];
        let mut mesh = TriangleMesh::new();
        let mut skipped_auxiliary = 0;

        for (key, facet) in &self.facets {
            if key.iter().any(|&v| self.triangulation.is_auxiliary(v)) {
                skipped_auxiliary += 1;
                continue;
            }
            let p = key.map(|v| self.triangulation.vertex(v).position);
            let normal = (p[1] - p[0]).cross(&(p[2] - p[0]));
            let ordered = if normal.dot(&facet.outward) >= 0.0 {
                *key
            } else {
                [key[0], key[2], key[1]]
            };
            let face = ordered.map(|v| {
                if index[v] == INVALID {
                    let position = self.triangulation.vertex(v).position;
                    index[v] = mesh.add_vertex(position.cast::<f32>());
                }
                index[v]
            });
            mesh.add_face(face);
        }
        if skipped_auxiliary > 0 {
            debug!("Left out {} facets touching the enclosing cell", skipped_auxiliary);
        }
        if mesh.faces.is_empty() {
            return Err(ReconstructionError::EmptySurface);
        }

        let normals = mesh.compute_vertex_normals();
        mesh.set_normals(normals);
        let non_manifold_edges = mesh.non_manifold_edges().len();
        let boundary_edges = mesh.boundary_edges().len();
        let skipped_facets = self.facets.values().filter(|f| f.bad).count();
        if non_manifold_edges > 0 {
            warn!("Surface has {} non-manifold edges", non_manifold_edges);
        }

        Ok(ExtractedSurface {
            mesh,
            termination: self.termination,
            inserted_points: self.inserted,
            non_manifold_edges,
            boundary_edges,
            skipped_facets,
        })
    }
}

/// Whether a vertex link, given as edges, is a single cycle or a single path
fn is_disk_or_fan(link: &[(usize, usize)]) -> bool {
    let mut adjacency: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &(u, v) in link {
        adjacency.entry(u).or_default().push(v);
        adjacency.entry(v).or_default().push(u);
    }
    if adjacency.values().any(|n| n.len() > 2) {
        return false;
    }
    let Some(&start) = adjacency.keys().next() else {
        return true;
    };
    let mut seen = BTreeSet::from([start]);
    let mut stack = vec![start];
    while let Some(u) = stack.pop() {
        for &w in &adjacency[&u] {
            if seen.insert(w) {
                stack.push(w);
            }
        }
    }
    seen.len() == adjacency.len()
}
