//! Validated oriented samples in double precision

use crate::error::{ReconstructionError, Result};
use crate::parallel::{parallel_map_indexed, parallel_reduce};
use poissurf_core::{NormalPointCloud3f, Point3d, Vector3d};

/// Relative extent below which points count as collinear or coplanar
const FLATNESS_TOLERANCE: f64 = 1e-9;

/// A position with its unit outward normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub position: Point3d,
    pub normal: Vector3d,
}

/// Immutable oriented point set.
///
/// Construction normalizes normals and rejects inputs that cannot span a
/// tetrahedron, so downstream stages can rely on a full-dimensional set.
#[derive(Debug, Clone)]
pub struct PointSet {
    samples: Vec<Sample>,
    centroid: Point3d,
    bounding_radius: f64,
}

impl PointSet {
    pub fn from_cloud(cloud: &NormalPointCloud3f) -> Result<Self> {
        let samples = parallel_map_indexed(&cloud.points, |i, p| {
            let position = p.position_f64();
            let normal = p.normal_f64();
            let length = normal.norm();
            let finite = position.coords.iter().chain(normal.iter()).all(|c| c.is_finite());
            if finite && length > 0.0 {
                Ok(Sample {
                    position,
                    normal: normal / length,
                })
            } else {
                Err(ReconstructionError::unreadable(format!(
                    "sample {} has a zero or non-finite normal",
                    i
                )))
            }
        })
        .into_iter()
        .collect::<Result<Vec<_>>>()?;

        Self::from_samples(samples)
    }

    /// Build from already normalized samples
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self> {
        if samples.len() < 4 {
            return Err(ReconstructionError::unreadable(format!(
                "need at least 4 samples, got {}",
                samples.len()
            )));
        }
        check_full_dimensional(&samples)?;

        let sum = samples
            .iter()
            .fold(Vector3d::zeros(), |acc, s| acc + s.position.coords);
        let centroid = Point3d::from(sum / samples.len() as f64);
        let bounding_radius = parallel_reduce(
            &samples,
            0.0_f64,
            |s| (s.position - centroid).norm(),
            f64::max,
        );

        Ok(Self {
            samples,
            centroid,
            bounding_radius,
        })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn centroid(&self) -> Point3d {
        self.centroid
    }

    /// Radius of the centroid-centered sphere enclosing every sample
    pub fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }
}

/// Find four points spanning a tetrahedron: the farthest point from the
/// first, the farthest from that line, the farthest from that plane.
fn check_full_dimensional(samples: &[Sample]) -> Result<()> {
    let p0 = samples[0].position;
    let farthest = |score: &dyn Fn(&Point3d) -> f64| {
        samples
            .iter()
            .map(|s| score(&s.position))
            .fold(0.0_f64, f64::max)
    };

    let (p1, extent) = samples
        .iter()
        .map(|s| (s.position, (s.position - p0).norm()))
        .fold((p0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
    if extent == 0.0 {
        return Err(ReconstructionError::unreadable("all samples coincide"));
    }

    let axis = (p1 - p0) / extent;
    let off_line = |q: &Point3d| (q - p0).cross(&axis).norm();
    let p2 = samples
        .iter()
        .map(|s| s.position)
        .fold(p0, |best, q| if off_line(&q) > off_line(&best) { q } else { best });
    if farthest(&off_line) <= FLATNESS_TOLERANCE * extent {
        return Err(ReconstructionError::unreadable("samples are collinear"));
    }

    let normal = axis.cross(&(p2 - p0)).normalize();
    let off_plane = |q: &Point3d| (q - p0).dot(&normal).abs();
    if farthest(&off_plane) <= FLATNESS_TOLERANCE * extent {
        return Err(ReconstructionError::unreadable("samples are coplanar"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use poissurf_core::{sphere_samples, NormalPoint3f, Point3f, Vector3f};

    fn cloud(points: &[[f32; 3]]) -> NormalPointCloud3f {
        points
            .iter()
            .map(|p| NormalPoint3f::new(Point3f::new(p[0], p[1], p[2]), Vector3f::new(0.0, 0.0, 2.0)))
            .collect()
    }

    #[test]
    fn test_sphere_centroid_and_radius() {
        let set = PointSet::from_cloud(&sphere_samples(2.0, 500)).unwrap();
        assert_eq!(set.len(), 500);
        assert!(set.centroid().coords.norm() < 1e-2);
        assert_relative_eq!(set.bounding_radius(), 2.0, epsilon = 1e-2);
    }

    #[test]
    fn test_normals_are_normalized() {
        let set = PointSet::from_cloud(&cloud(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]))
            .unwrap();
        for s in set.samples() {
            assert_relative_eq!(s.normal.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_too_few_points() {
        let err = PointSet::from_cloud(&cloud(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])).unwrap_err();
        assert_eq!(err.kind(), "UnreadableInput");
        assert!(PointSet::from_cloud(&NormalPointCloud3f::new()).is_err());
    }

    #[test]
    fn test_coplanar_and_collinear_points() {
        let flat = cloud(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [0.5, 0.2, 0.0]]);
        assert!(matches!(
            PointSet::from_cloud(&flat),
            Err(ReconstructionError::UnreadableInput { .. })
        ));
        let line = cloud(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0], [2.0, 2.0, 2.0], [3.0, 3.0, 3.0]]);
        assert!(PointSet::from_cloud(&line).is_err());
        let same = cloud(&[[1.0, 2.0, 3.0]; 5]);
        assert!(PointSet::from_cloud(&same).is_err());
    }

    #[test]
    fn test_bad_normals() {
        let mut points = cloud(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        points[2].normal = Vector3f::zeros();
        assert!(PointSet::from_cloud(&points).is_err());
        points[2].normal = Vector3f::new(f32::NAN, 0.0, 1.0);
        assert!(PointSet::from_cloud(&points).is_err());
    }
}
