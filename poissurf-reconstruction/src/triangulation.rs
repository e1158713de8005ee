//! Incremental 3D Delaunay triangulation
//!
//! Vertices and cells live in two arenas addressed by integer ids. Cell
//! neighbor `i` is the cell across the face opposite vertex `i`; a missing
//! neighbor is [`INVALID`]. Removed cells stay in the arena with their
//! `alive` flag cleared so ids handed out earlier never get reused.
//!
//! The triangulation starts from a large auxiliary tetrahedron enclosing the
//! construction domain, then inserts points with the Bowyer–Watson cavity
//! algorithm.

use crate::error::{ReconstructionError, Result};
use crate::geometry::{circumsphere, normalized_orient3d, orient3d};
use crate::point_set::PointSet;
use poissurf_core::{Point3d, Vector3d};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// Sentinel for a missing neighbor or vertex
pub const INVALID: usize = usize::MAX;

/// Auxiliary vertices sit this many domain radii away from the center
const SUPER_SCALE: f64 = 100.0;
/// Relative tolerance on normalized orientations
const ORIENT_EPS: f64 = 1e-12;
/// Relative tolerance on circumsphere containment
const SPHERE_EPS: f64 = 1e-12;

/// What a vertex stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexKind {
    /// An input sample, with its index in the point set
    Input(usize),
    /// A point added for refinement
    Steiner,
    /// A point of the outer boundary shell
    Boundary,
    /// A corner of the enclosing tetrahedron
    Auxiliary,
}

impl VertexKind {
    /// Vertices whose value is fixed to zero by the solver
    pub fn is_dirichlet(&self) -> bool {
        matches!(self, Self::Boundary | Self::Auxiliary)
    }
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub position: Point3d,
    pub kind: VertexKind,
    /// Implicit function value, written by the solver
    pub value: f64,
    cell: usize,
}

#[derive(Debug, Clone)]
pub struct Cell {
    /// Positively oriented vertex ids
    pub vertices: [usize; 4],
    /// `neighbors[i]` is across the face opposite `vertices[i]`
    pub neighbors: [usize; 4],
    pub circumcenter: Point3d,
    pub squared_radius: f64,
    alive: bool,
}

impl Cell {
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Local index of vertex `v` in this cell
    pub fn index_of(&self, v: usize) -> Option<usize> {
        self.vertices.iter().position(|&x| x == v)
    }

    /// The three vertex ids of the face opposite local vertex `i`
    pub fn face(&self, i: usize) -> [usize; 3] {
        let v = self.vertices;
        match i {
            0 => [v[1], v[2], v[3]],
            1 => [v[0], v[2], v[3]],
            2 => [v[0], v[1], v[3]],
            _ => [v[0], v[1], v[2]],
        }
    }
}

/// Outcome of inserting one point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// A new vertex was created
    Inserted(usize),
    /// The point coincided with an existing vertex, which was kept
    Merged(usize),
}

impl Insertion {
    pub fn vertex(&self) -> usize {
        match *self {
            Self::Inserted(v) | Self::Merged(v) => v,
        }
    }
}

/// Cells created and destroyed by an insertion
#[derive(Debug, Clone)]
pub struct InsertionReport {
    pub insertion: Insertion,
    pub created: Vec<usize>,
    pub removed: Vec<usize>,
}

/// Counts from inserting a whole point set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertionSummary {
    pub inserted: usize,
    pub merged: usize,
}

#[derive(Debug, Clone)]
pub struct DelaunayTriangulation {
    vertices: Vec<Vertex>,
    cells: Vec<Cell>,
    live_cells: usize,
    center: Point3d,
    radius: f64,
    merge_tolerance: f64,
    last_cell: usize,
}

impl DelaunayTriangulation {
    /// Empty triangulation accepting points within `radius` of `center`
    pub fn new(center: Point3d, radius: f64) -> Result<Self> {
        if !(radius > 0.0 && radius.is_finite()) || !center.coords.iter().all(|c| c.is_finite()) {
            return Err(ReconstructionError::Triangulation(format!(
                "invalid domain: center {:?}, radius {}",
                center, radius
            )));
        }

        let k = SUPER_SCALE * radius;
        let corners = [
            Vector3d::new(1.0, 1.0, 1.0),
            Vector3d::new(1.0, -1.0, -1.0),
            Vector3d::new(-1.0, 1.0, -1.0),
            Vector3d::new(-1.0, -1.0, 1.0),
        ];
        let vertices: Vec<Vertex> = corners
            .iter()
            .map(|c| Vertex {
                position: center + c * k,
                kind: VertexKind::Auxiliary,
                value: 0.0,
                cell: 0,
            })
            .collect();

        let mut ids = [0, 1, 2, 3];
        let p = |i: usize| &vertices[i].position;
        if orient3d(p(0), p(1), p(2), p(3)) < 0.0 {
            ids.swap(2, 3);
        }
        let (circumcenter, squared_radius) = circumsphere(p(ids[0]), p(ids[1]), p(ids[2]), p(ids[3]))
            .ok_or_else(|| ReconstructionError::Triangulation("degenerate enclosing cell".into()))?;

        Ok(Self {
            vertices,
            cells: vec![Cell {
                vertices: ids,
                neighbors: [INVALID; 4],
                circumcenter,
                squared_radius,
                alive: true,
            }],
            live_cells: 1,
            center,
            radius,
            merge_tolerance: 1e-9 * radius,
            last_cell: 0,
        })
    }

    /// Distance under which an inserted point merges with an existing vertex
    pub fn with_merge_tolerance(mut self, tolerance: f64) -> Self {
        self.merge_tolerance = tolerance.max(0.0);
        self
    }

    pub fn domain_center(&self) -> Point3d {
        self.center
    }

    pub fn domain_radius(&self) -> f64 {
        self.radius
    }

    pub fn vertex(&self, v: usize) -> &Vertex {
        &self.vertices[v]
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn cell(&self, c: usize) -> &Cell {
        &self.cells[c]
    }

    /// Live cells with their ids
    pub fn cells(&self) -> impl Iterator<Item = (usize, &Cell)> + '_ {
        self.cells.iter().enumerate().filter(|(_, c)| c.alive)
    }

    /// Number of vertices that are not auxiliary
    pub fn number_of_vertices(&self) -> usize {
        self.vertices
            .iter()
            .filter(|v| v.kind != VertexKind::Auxiliary)
            .count()
    }

    pub fn number_of_cells(&self) -> usize {
        self.live_cells
    }

    pub fn set_value(&mut self, v: usize, value: f64) {
        self.vertices[v].value = value;
    }

    pub fn is_auxiliary(&self, v: usize) -> bool {
        self.vertices[v].kind == VertexKind::Auxiliary
    }

    pub fn has_auxiliary_vertex(&self, c: usize) -> bool {
        self.cells[c].vertices.iter().any(|&v| self.is_auxiliary(v))
    }

    fn positions(&self, ids: &[usize; 4]) -> [Point3d; 4] {
        ids.map(|v| self.vertices[v].position)
    }

    /// Normalized orientation of cell `c` with vertex `i` replaced by `p`
    fn orientation_with(&self, c: usize, i: usize, p: &Point3d) -> f64 {
        let mut q = self.positions(&self.cells[c].vertices);
        q[i] = *p;
        normalized_orient3d(&q[0], &q[1], &q[2], &q[3])
    }

    fn circumsphere_contains(&self, c: usize, p: &Point3d) -> bool {
        let cell = &self.cells[c];
        (p - cell.circumcenter).norm_squared() < cell.squared_radius * (1.0 - SPHERE_EPS)
    }

    /// Insert every sample of a point set, tagging vertices with sample indices.
    ///
    /// Coincident samples are merged into the first inserted one.
    pub fn insert_samples(&mut self, points: &PointSet) -> Result<InsertionSummary> {
        let mut summary = InsertionSummary::default();
        for (i, sample) in points.samples().iter().enumerate() {
            match self.insert_point(sample.position, VertexKind::Input(i))?.insertion {
                Insertion::Inserted(_) => summary.inserted += 1,
                Insertion::Merged(v) => {
                    debug!("Sample {} merged into vertex {}", i, v);
                    summary.merged += 1;
                }
            }
        }
        if summary.merged > 0 {
            warn!("Merged {} coincident samples", summary.merged);
        }
        Ok(summary)
    }

    /// Insert one point, keeping the triangulation Delaunay.
    ///
    /// The triangulation is left untouched when an error is returned.
    pub fn insert_point(&mut self, p: Point3d, kind: VertexKind) -> Result<InsertionReport> {
        if !p.coords.iter().all(|c| c.is_finite()) {
            return Err(ReconstructionError::Triangulation(format!("non-finite point {:?}", p)));
        }
        if (p - self.center).norm() > self.radius * (1.0 + 1e-9) {
            return Err(ReconstructionError::Triangulation(format!(
                "point {:?} lies outside the domain of radius {}",
                p, self.radius
            )));
        }

        let start = self.locate_from(&p, self.last_cell)?;

        // A point this close to a vertex lies in one of its incident cells
        if let Some(&v) = self.cells[start]
            .vertices
            .iter()
            .find(|&&v| (self.vertices[v].position - p).norm() <= self.merge_tolerance)
        {
            return Ok(InsertionReport {
                insertion: Insertion::Merged(v),
                created: Vec::new(),
                removed: Vec::new(),
            });
        }

        let (cavity, boundary) = self.find_cavity(start, &p)?;

        let pid = self.vertices.len();
        let first_new = self.cells.len();
        let mut new_cells = Vec::with_capacity(boundary.len());
        for &(c, i, n) in &boundary {
            let mut vertices = self.cells[c].vertices;
            vertices[i] = pid;
            let mut q = self.positions(&self.cells[c].vertices);
            q[i] = p;
            let (circumcenter, squared_radius) = circumsphere(&q[0], &q[1], &q[2], &q[3])
                .ok_or_else(|| ReconstructionError::Triangulation(format!("flat cell while inserting {:?}", p)))?;
            let mut neighbors = [INVALID; 4];
            neighbors[i] = n;
            new_cells.push(Cell {
                vertices,
                neighbors,
                circumcenter,
                squared_radius,
                alive: true,
            });
        }

        // Faces through the new vertex are matched by their two other vertices
        let mut open_faces: HashMap<(usize, usize), (usize, usize)> = HashMap::new();
        for k in 0..new_cells.len() {
            let vertices = new_cells[k].vertices;
            for j in 0..4 {
                if vertices[j] == pid {
                    continue;
                }
                let mut others = vertices.iter().copied().filter(|&v| v != pid && v != vertices[j]);
                let (a, b) = match (others.next(), others.next()) {
                    (Some(a), Some(b)) => (a.min(b), a.max(b)),
                    _ => continue,
                };
                match open_faces.remove(&(a, b)) {
                    Some((k2, j2)) => {
                        new_cells[k].neighbors[j] = first_new + k2;
                        new_cells[k2].neighbors[j2] = first_new + k;
                    }
                    None => {
                        open_faces.insert((a, b), (k, j));
                    }
                }
            }
        }
        if !open_faces.is_empty() {
            return Err(ReconstructionError::Triangulation(format!(
                "cavity of {:?} is not a topological ball",
                p
            )));
        }

        // Commit
        self.vertices.push(Vertex {
            position: p,
            kind,
            value: 0.0,
            cell: first_new,
        });
        for (k, &(c, _, n)) in boundary.iter().enumerate() {
            if n != INVALID {
                if let Some(slot) = self.cells[n].neighbors.iter().position(|&x| x == c) {
                    self.cells[n].neighbors[slot] = first_new + k;
                }
            }
        }
        for &c in &cavity {
            self.cells[c].alive = false;
        }
        self.live_cells = self.live_cells + new_cells.len() - cavity.len();
        for (k, cell) in new_cells.iter().enumerate() {
            for &v in &cell.vertices {
                self.vertices[v].cell = first_new + k;
            }
        }
        let created: Vec<usize> = (first_new..first_new + new_cells.len()).collect();
        self.cells.extend(new_cells);
        self.last_cell = first_new;

        Ok(InsertionReport {
            insertion: Insertion::Inserted(pid),
            created,
            removed: cavity,
        })
    }

    /// Conflict region of `p` and its boundary faces `(cell, local index, outer neighbor)`.
    ///
    /// Cells whose circumsphere contains `p` form the cavity. The cavity then
    /// grows until every boundary face sees `p` strictly on its inner side,
    /// so the new cells come out positively oriented.
    fn find_cavity(&self, start: usize, p: &Point3d) -> Result<(Vec<usize>, Vec<(usize, usize, usize)>)> {
        let mut in_cavity = HashSet::from([start]);
        let mut cavity = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(c) = queue.pop_front() {
            for &n in &self.cells[c].neighbors {
                if n != INVALID && !in_cavity.contains(&n) && self.circumsphere_contains(n, p) {
                    in_cavity.insert(n);
                    cavity.push(n);
                    queue.push_back(n);
                }
            }
        }

        loop {
            let mut grown = false;
            let mut boundary = Vec::new();
            for &c in &cavity {
                for (i, &n) in self.cells[c].neighbors.iter().enumerate() {
                    if n == INVALID || !in_cavity.contains(&n) {
                        boundary.push((c, i, n));
                    }
                }
            }
            let mut additions = Vec::new();
            for &(c, i, n) in &boundary {
                if self.orientation_with(c, i, p) <= ORIENT_EPS {
                    if n == INVALID {
                        return Err(ReconstructionError::Triangulation(format!(
                            "point {:?} is not visible from the domain boundary",
                            p
                        )));
                    }
                    if in_cavity.insert(n) {
                        additions.push(n);
                        grown = true;
                    }
                }
            }
            cavity.extend(additions);
            if !grown {
                let on_boundary: HashSet<usize> = boundary
                    .iter()
                    .flat_map(|&(c, i, _)| self.cells[c].face(i))
                    .collect();
                if let Some(&v) = cavity
                    .iter()
                    .flat_map(|&c| self.cells[c].vertices.iter())
                    .find(|v| !on_boundary.contains(v))
                {
                    return Err(ReconstructionError::Triangulation(format!(
                        "inserting {:?} would orphan vertex {}",
                        p, v
                    )));
                }
                return Ok((cavity, boundary));
            }
        }
    }

    /// Cell containing `query`, walking from the most recently created cell
    pub fn locate(&self, query: &Point3d) -> Result<usize> {
        self.locate_from(query, self.last_cell)
    }

    /// Cell containing `query`, walking from `hint`.
    ///
    /// The visibility walk crosses any face that has the query strictly on
    /// its far side. Points outside the enclosing tetrahedron are an error.
    pub fn locate_from(&self, query: &Point3d, hint: usize) -> Result<usize> {
        let mut c = if hint < self.cells.len() && self.cells[hint].alive {
            hint
        } else {
            self.any_live_cell()
        };
        let max_steps = self.live_cells + 16;

        'walk: for step in 0..max_steps {
            // Rotating the first face avoids cycling on degenerate configurations
            for r in 0..4 {
                let i = (r + step) % 4;
                if self.orientation_with(c, i, query) < -ORIENT_EPS {
                    let n = self.cells[c].neighbors[i];
                    if n == INVALID {
                        return Err(ReconstructionError::Triangulation(format!(
                            "point {:?} lies outside the triangulation",
                            query
                        )));
                    }
                    c = n;
                    continue 'walk;
                }
            }
            return Ok(c);
        }

        debug!("Visibility walk exhausted after {} steps, scanning all cells", max_steps);
        self.locate_exhaustive(query)
    }

    fn locate_exhaustive(&self, query: &Point3d) -> Result<usize> {
        let mut best = (INVALID, f64::NEG_INFINITY);
        for (c, _) in self.cells() {
            let worst = (0..4)
                .map(|i| self.orientation_with(c, i, query))
                .fold(f64::INFINITY, f64::min);
            if worst > best.1 {
                best = (c, worst);
            }
        }
        if best.0 == INVALID || best.1 < -1e-6 {
            return Err(ReconstructionError::Triangulation(format!(
                "no cell contains {:?}",
                query
            )));
        }
        Ok(best.0)
    }

    fn any_live_cell(&self) -> usize {
        self.cells.iter().rposition(|c| c.alive).unwrap_or(0)
    }

    /// Live cells incident to vertex `v`
    pub fn incident_cells(&self, v: usize) -> Vec<usize> {
        let start = self.vertices[v].cell;
        let mut seen = HashSet::from([start]);
        let mut result = vec![start];
        let mut k = 0;
        while k < result.len() {
            let cell = &self.cells[result[k]];
            for j in 0..4 {
                let n = cell.neighbors[j];
                // Faces not opposite `v` contain it
                if cell.vertices[j] != v && n != INVALID && seen.insert(n) {
                    result.push(n);
                }
            }
            k += 1;
        }
        result
    }

    /// Vertices sharing an edge with `v`, sorted by id
    pub fn vertex_neighbors(&self, v: usize) -> Vec<usize> {
        let mut neighbors: Vec<usize> = self
            .incident_cells(v)
            .into_iter()
            .flat_map(|c| self.cells[c].vertices)
            .filter(|&u| u != v)
            .collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    /// Cells around edge `ab` in rotational order, `None` if the edge does
    /// not exist or its ring is open.
    pub fn cells_around_edge(&self, a: usize, b: usize) -> Option<Vec<usize>> {
        let start = self
            .incident_cells(a)
            .into_iter()
            .find(|&c| self.cells[c].index_of(b).is_some())?;
        let mut others = self.cells[start].vertices.iter().copied().filter(|&v| v != a && v != b);
        let (mut x, mut y) = (others.next()?, others.next()?);

        let mut ring = vec![start];
        let mut current = start;
        loop {
            let next = self.cells[current].neighbors[self.cells[current].index_of(x)?];
            if next == INVALID {
                return None;
            }
            if next == start {
                return Some(ring);
            }
            let z = self.cells[next]
                .vertices
                .iter()
                .copied()
                .find(|&v| v != a && v != b && v != y)?;
            ring.push(next);
            if ring.len() > self.live_cells {
                return None;
            }
            x = y;
            y = z;
            current = next;
        }
    }

    /// Vertex nearest to `query` among non-auxiliary vertices.
    ///
    /// Greedy walk on the Delaunay graph starting from the containing cell.
    pub fn nearest(&self, query: &Point3d) -> Result<usize> {
        let cell = self.locate(query)?;
        let dist = |v: usize| (self.vertices[v].position - query).norm_squared();
        let start = self.cells[cell]
            .vertices
            .iter()
            .copied()
            .filter(|&v| !self.is_auxiliary(v))
            .min_by(|&u, &v| dist(u).total_cmp(&dist(v)))
            .or_else(|| (0..self.vertices.len()).find(|&v| !self.is_auxiliary(v)))
            .ok_or_else(|| ReconstructionError::Triangulation("triangulation has no vertices".into()))?;

        let mut current = start;
        loop {
            let best = self
                .vertex_neighbors(current)
                .into_iter()
                .filter(|&u| !self.is_auxiliary(u))
                .fold(current, |best, u| if dist(u) < dist(best) { u } else { best });
            if best == current {
                return Ok(current);
            }
            current = best;
        }
    }

    /// Check adjacency symmetry, orientation and the empty-sphere property.
    ///
    /// Quadratic in size; meant for tests and debugging.
    pub fn verify(&self, tolerance: f64) -> Result<()> {
        let fail = |msg: String| Err(ReconstructionError::Triangulation(msg));
        for (c, cell) in self.cells() {
            let q = self.positions(&cell.vertices);
            if orient3d(&q[0], &q[1], &q[2], &q[3]) <= 0.0 {
                return fail(format!("cell {} is not positively oriented", c));
            }
            for (i, &n) in cell.neighbors.iter().enumerate() {
                if n == INVALID {
                    continue;
                }
                if !self.cells[n].alive || !self.cells[n].neighbors.contains(&c) {
                    return fail(format!("cell {} and neighbor {} disagree", c, n));
                }
                let mut shared = cell.face(i);
                shared.sort_unstable();
                let j = self.cells[n].neighbors.iter().position(|&x| x == c).unwrap_or(0);
                let mut other = self.cells[n].face(j);
                other.sort_unstable();
                if shared != other {
                    return fail(format!("cells {} and {} share no face", c, n));
                }
            }
            for (v, vertex) in self.vertices.iter().enumerate() {
                if cell.vertices.contains(&v) || self.incident_cells(v).is_empty() {
                    continue;
                }
                let d2 = (vertex.position - cell.circumcenter).norm_squared();
                if d2 < cell.squared_radius * (1.0 - tolerance) {
                    return fail(format!("vertex {} lies inside the circumsphere of cell {}", v, c));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_points(n: usize, seed: u64) -> Vec<Point3d> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                Point3d::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                )
            })
            .collect()
    }

    fn build(points: &[Point3d]) -> DelaunayTriangulation {
        let mut dt = DelaunayTriangulation::new(Point3d::origin(), 2.0).unwrap();
        for p in points {
            dt.insert_point(*p, VertexKind::Steiner).unwrap();
        }
        dt
    }

    #[test]
    fn test_enclosing_cell_is_valid() {
        let dt = DelaunayTriangulation::new(Point3d::new(1.0, 2.0, 3.0), 1.0).unwrap();
        assert_eq!(dt.number_of_cells(), 1);
        assert_eq!(dt.number_of_vertices(), 0);
        dt.verify(1e-9).unwrap();
    }

    #[test]
    fn test_invalid_domain() {
        assert!(DelaunayTriangulation::new(Point3d::origin(), 0.0).is_err());
        assert!(DelaunayTriangulation::new(Point3d::origin(), f64::NAN).is_err());
    }

    #[test]
    fn test_random_insertion_stays_delaunay() {
        let dt = build(&random_points(200, 1));
        assert_eq!(dt.number_of_vertices(), 200);
        dt.verify(1e-9).unwrap();
    }

    #[test]
    fn test_grid_points_with_cospherical_degeneracy() {
        let mut points = Vec::new();
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    points.push(Point3d::new(x as f64, y as f64, z as f64) * 0.4 - Vector3d::repeat(0.6));
                }
            }
        }
        let dt = build(&points);
        assert_eq!(dt.number_of_vertices(), 64);
        dt.verify(1e-9).unwrap();
    }

    #[test]
    fn test_coincident_points_merge_into_first() {
        let mut dt = DelaunayTriangulation::new(Point3d::origin(), 2.0).unwrap();
        let p = Point3d::new(0.1, 0.2, 0.3);
        let first = dt.insert_point(p, VertexKind::Input(0)).unwrap();
        let second = dt.insert_point(p, VertexKind::Input(1)).unwrap();
        assert!(matches!(first.insertion, Insertion::Inserted(_)));
        assert_eq!(second.insertion, Insertion::Merged(first.insertion.vertex()));
        assert!(second.created.is_empty());
        assert_eq!(dt.vertex(first.insertion.vertex()).kind, VertexKind::Input(0));
    }

    #[test]
    fn test_merge_tolerance_is_configurable() {
        let mut dt = DelaunayTriangulation::new(Point3d::new(1.0, 1.0, 1.0), 2.0)
            .unwrap()
            .with_merge_tolerance(0.05);
        assert_eq!(dt.domain_center(), Point3d::new(1.0, 1.0, 1.0));
        let first = dt.insert_point(Point3d::new(1.1, 1.2, 1.3), VertexKind::Steiner).unwrap();
        let near = dt.insert_point(Point3d::new(1.12, 1.2, 1.3), VertexKind::Steiner).unwrap();
        assert_eq!(near.insertion, Insertion::Merged(first.insertion.vertex()));
        assert_eq!(dt.number_of_vertices(), 1);
    }

    #[test]
    fn test_point_outside_domain_is_rejected() {
        let mut dt = DelaunayTriangulation::new(Point3d::origin(), 1.0).unwrap();
        let before = dt.number_of_cells();
        assert!(dt.insert_point(Point3d::new(5.0, 0.0, 0.0), VertexKind::Steiner).is_err());
        assert_eq!(dt.number_of_cells(), before);
    }

    #[test]
    fn test_insertion_report_accounts_for_cells() {
        let mut dt = build(&random_points(30, 2));
        let before = dt.number_of_cells();
        let report = dt.insert_point(Point3d::new(0.05, -0.1, 0.2), VertexKind::Steiner).unwrap();
        assert_eq!(dt.number_of_cells(), before + report.created.len() - report.removed.len());
        assert!(report.removed.iter().all(|&c| !dt.cell(c).is_alive()));
        assert!(report.created.iter().all(|&c| dt.cell(c).is_alive()));
    }

    #[test]
    fn test_locate_contains_query() {
        let points = random_points(100, 3);
        let dt = build(&points);
        for q in random_points(50, 4) {
            let c = dt.locate(&q).unwrap();
            let cell = dt.cell(c);
            let bary = crate::geometry::barycentric_coordinates(
                &q,
                &dt.vertex(cell.vertices[0]).position,
                &dt.vertex(cell.vertices[1]).position,
                &dt.vertex(cell.vertices[2]).position,
                &dt.vertex(cell.vertices[3]).position,
            )
            .unwrap();
            assert!(bary.iter().all(|&l| l > -1e-9));
        }
    }

    #[test]
    fn test_nearest_matches_brute_force() {
        let points = random_points(150, 5);
        let dt = build(&points);
        for q in random_points(40, 6) {
            let v = dt.nearest(&q).unwrap();
            let brute = points
                .iter()
                .map(|p| (p - q).norm())
                .fold(f64::INFINITY, f64::min);
            assert!(((dt.vertex(v).position - q).norm() - brute).abs() < 1e-12);
        }
    }

    #[test]
    fn test_cells_around_edge_form_closed_ring() {
        let dt = build(&random_points(80, 7));
        let v = 10;
        for u in dt.vertex_neighbors(v) {
            let ring = dt.cells_around_edge(v, u).unwrap();
            assert!(ring.len() >= 3);
            for w in ring.windows(2) {
                assert!(dt.cell(w[0]).neighbors.contains(&w[1]));
            }
            for &c in &ring {
                assert!(dt.cell(c).index_of(v).is_some() && dt.cell(c).index_of(u).is_some());
            }
            assert!(dt.cell(ring[ring.len() - 1]).neighbors.contains(&ring[0]));
        }
    }

    #[test]
    fn test_incident_cells_contain_vertex() {
        let dt = build(&random_points(60, 8));
        for v in 4..dt.vertices().len() {
            let cells = dt.incident_cells(v);
            assert!(!cells.is_empty());
            assert!(cells.iter().all(|&c| dt.cell(c).is_alive() && dt.cell(c).index_of(v).is_some()));
            let expected = dt.cells().filter(|(_, c)| c.index_of(v).is_some()).count();
            assert_eq!(cells.len(), expected);
        }
    }
}
