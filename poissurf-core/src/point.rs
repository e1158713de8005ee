//! Point types and related functionality

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use bytemuck::{Pod, Zeroable};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// A point with normal vector
///
/// This is the oriented sample consumed by the reconstruction: the normal is
/// expected to point away from the enclosed volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct NormalPoint3f {
    pub position: Point3f,
    pub normal: Vector3f,
}

unsafe impl Pod for NormalPoint3f {}
unsafe impl Zeroable for NormalPoint3f {}

impl NormalPoint3f {
    /// Create a sample from a position and a normal
    pub fn new(position: Point3f, normal: Vector3f) -> Self {
        Self { position, normal }
    }

    /// Position promoted to double precision
    pub fn position_f64(&self) -> Point3d {
        self.position.cast::<f64>()
    }

    /// Normal promoted to double precision
    pub fn normal_f64(&self) -> Vector3d {
        self.normal.cast::<f64>()
    }
}

impl Default for NormalPoint3f {
    fn default() -> Self {
        Self {
            position: Point3f::origin(),
            normal: Vector3f::new(0.0, 0.0, 1.0),
        }
    }
}

impl From<NormalPoint3f> for Point3f {
    fn from(sample: NormalPoint3f) -> Self {
        sample.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_normal_points_up() {
        let sample = NormalPoint3f::default();
        assert_eq!(sample.position, Point3f::origin());
        assert_eq!(sample.normal, Vector3f::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_pod_cast() {
        let samples = [NormalPoint3f::new(Point3f::new(1.0, 2.0, 3.0), Vector3f::new(0.0, 1.0, 0.0))];
        let floats: &[f32] = bytemuck::cast_slice(&samples);
        assert_eq!(floats, &[1.0, 2.0, 3.0, 0.0, 1.0, 0.0]);
    }
}
