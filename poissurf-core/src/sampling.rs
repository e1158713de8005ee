//! Synthetic oriented samples of analytic shapes
//!
//! Used by tests, benchmarks and the demo binaries to produce clouds whose
//! exact surface is known.

use crate::point::*;
use crate::point_cloud::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Unit directions spread over the sphere along a Fibonacci spiral.
///
/// Deterministic: the same `n` always yields the same directions.
pub fn fibonacci_directions(n: usize) -> Vec<Vector3d> {
    let golden_angle = std::f64::consts::PI * (3.0 - 5.0_f64.sqrt());
    (0..n)
        .map(|i| {
            let z = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
            let r = (1.0 - z * z).max(0.0).sqrt();
            let theta = golden_angle * i as f64;
            Vector3d::new(r * theta.cos(), r * theta.sin(), z)
        })
        .collect()
}

/// `n` samples of a sphere centered at the origin with outward normals
pub fn sphere_samples(radius: f32, n: usize) -> NormalPointCloud3f {
    fibonacci_directions(n)
        .into_iter()
        .map(|d| {
            let normal = d.cast::<f32>();
            NormalPoint3f::new(Point3f::from(normal * radius), normal)
        })
        .collect()
}

/// `n` samples of an axis-aligned ellipsoid centered at the origin.
///
/// Normals are the normalized gradient of `x²/a² + y²/b² + z²/c²`.
pub fn ellipsoid_samples(radii: Vector3f, n: usize) -> NormalPointCloud3f {
    fibonacci_directions(n)
        .into_iter()
        .map(|d| {
            let d = d.cast::<f32>();
            let position = Point3f::new(d.x * radii.x, d.y * radii.y, d.z * radii.z);
            let gradient = Vector3f::new(
                position.x / (radii.x * radii.x),
                position.y / (radii.y * radii.y),
                position.z / (radii.z * radii.z),
            );
            NormalPoint3f::new(position, gradient.normalize())
        })
        .collect()
}

/// Displace every position by a uniform offset in `[-amplitude, amplitude]³`.
///
/// Normals are left untouched. The generator is seeded so results are reproducible.
pub fn jitter_positions(cloud: &NormalPointCloud3f, amplitude: f32, seed: u64) -> NormalPointCloud3f {
    let mut rng = StdRng::seed_from_u64(seed);
    cloud
        .iter()
        .map(|s| {
            let offset = Vector3f::new(
                rng.gen_range(-amplitude..=amplitude),
                rng.gen_range(-amplitude..=amplitude),
                rng.gen_range(-amplitude..=amplitude),
            );
            NormalPoint3f::new(s.position + offset, s.normal)
        })
        .collect()
}
