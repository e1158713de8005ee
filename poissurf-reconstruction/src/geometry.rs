//! Floating-point geometric predicates and constructions
//!
//! Everything here works in double precision on `nalgebra` types. The
//! predicates are not exact; callers compare against relative tolerances.

use nalgebra::Matrix3;
use poissurf_core::{Point3d, Vector3d};

/// Six times the signed volume of the tetrahedron `abcd`.
///
/// Positive when `d` lies on the side of the plane `abc` that the normal
/// `(b - a) x (c - a)` points to.
pub fn orient3d(a: &Point3d, b: &Point3d, c: &Point3d, d: &Point3d) -> f64 {
    (b - a).dot(&(c - a).cross(&(d - a)))
}

/// Unsigned volume of a tetrahedron
pub fn tetrahedron_volume(a: &Point3d, b: &Point3d, c: &Point3d, d: &Point3d) -> f64 {
    orient3d(a, b, c, d).abs() / 6.0
}

/// Orientation divided by the product of the three edge lengths from `a`.
///
/// This is the sine-like measure used for degeneracy tests; it is
/// independent of the scale of the input.
pub fn normalized_orient3d(a: &Point3d, b: &Point3d, c: &Point3d, d: &Point3d) -> f64 {
    let (u, v, w) = (b - a, c - a, d - a);
    let scale = u.norm() * v.norm() * w.norm();
    if scale == 0.0 {
        return 0.0;
    }
    u.dot(&v.cross(&w)) / scale
}

/// Circumscribed sphere of a tetrahedron as `(center, squared_radius)`.
///
/// Returns `None` for flat or nearly flat tetrahedra.
pub fn circumsphere(a: &Point3d, b: &Point3d, c: &Point3d, d: &Point3d) -> Option<(Point3d, f64)> {
    let (u, v, w) = (b - a, c - a, d - a);
    let denom = 2.0 * u.dot(&v.cross(&w));
    let scale = u.norm() * v.norm() * w.norm();
    if !(denom.abs() > 1e-14 * scale) {
        return None;
    }
    let offset = (v.cross(&w) * u.norm_squared()
        + w.cross(&u) * v.norm_squared()
        + u.cross(&v) * w.norm_squared())
        / denom;
    let center = a + offset;
    Some((center, offset.norm_squared()))
}

/// Circumcenter of a triangle in 3D, `None` when the triangle is degenerate
pub fn triangle_circumcenter(a: &Point3d, b: &Point3d, c: &Point3d) -> Option<Point3d> {
    let u = b - a;
    let v = c - a;
    let n = u.cross(&v);
    let n2 = n.norm_squared();
    if n2 <= f64::EPSILON * u.norm_squared() * v.norm_squared() {
        return None;
    }
    let offset = (v * u.norm_squared() - u * v.norm_squared()).cross(&n) / (2.0 * n2);
    Some(a + offset)
}

/// Circumradius of a triangle, infinite for degenerate triangles
pub fn triangle_circumradius(a: &Point3d, b: &Point3d, c: &Point3d) -> f64 {
    triangle_circumcenter(a, b, c)
        .map(|center| (center - a).norm())
        .unwrap_or(f64::INFINITY)
}

fn angle_between(u: &Vector3d, v: &Vector3d) -> f64 {
    u.cross(v).norm().atan2(u.dot(v))
}

/// Smallest interior angle of a triangle, in radians
pub fn triangle_min_angle(a: &Point3d, b: &Point3d, c: &Point3d) -> f64 {
    let at_a = angle_between(&(b - a), &(c - a));
    let at_b = angle_between(&(c - b), &(a - b));
    let at_c = angle_between(&(a - c), &(b - c));
    at_a.min(at_b).min(at_c)
}

fn inverse_frame(a: &Point3d, b: &Point3d, c: &Point3d, d: &Point3d) -> Option<Matrix3<f64>> {
    Matrix3::from_columns(&[b - a, c - a, d - a]).try_inverse()
}

/// Gradients of the four barycentric basis functions of a tetrahedron.
///
/// Entry `k` is the (constant) gradient of the linear function that is one
/// at vertex `k` and zero at the other three.
pub fn barycentric_gradients(a: &Point3d, b: &Point3d, c: &Point3d, d: &Point3d) -> Option<[Vector3d; 4]> {
    let inv = inverse_frame(a, b, c, d)?;
    let g1: Vector3d = inv.row(0).transpose();
    let g2: Vector3d = inv.row(1).transpose();
    let g3: Vector3d = inv.row(2).transpose();
    Some([-(g1 + g2 + g3), g1, g2, g3])
}

/// Barycentric coordinates of `p` with respect to tetrahedron `abcd`
pub fn barycentric_coordinates(
    p: &Point3d,
    a: &Point3d,
    b: &Point3d,
    c: &Point3d,
    d: &Point3d,
) -> Option<[f64; 4]> {
    let inv = inverse_frame(a, b, c, d)?;
    let l = inv * (p - a);
    Some([1.0 - l.x - l.y - l.z, l.x, l.y, l.z])
}

/// Barycentric weights of the projection of `p` onto triangle `abc`,
/// with negative weights clamped to zero and the rest renormalized.
pub fn clamped_triangle_weights(p: &Point3d, a: &Point3d, b: &Point3d, c: &Point3d) -> Option<[f64; 3]> {
    let u = b - a;
    let v = c - a;
    let w = p - a;
    let (uu, uv, vv) = (u.dot(&u), u.dot(&v), v.dot(&v));
    let det = uu * vv - uv * uv;
    if !(det > f64::EPSILON * uu * vv) {
        return None;
    }
    let (wu, wv) = (w.dot(&u), w.dot(&v));
    let l1 = (vv * wu - uv * wv) / det;
    let l2 = (uu * wv - uv * wu) / det;
    let weights = [(1.0 - l1 - l2).max(0.0), l1.max(0.0), l2.max(0.0)];
    let sum: f64 = weights.iter().sum();
    Some(weights.map(|x| x / sum))
}

/// Portion of the segment `p0 p1` inside the closed ball `(center, squared_radius)`
pub fn clip_segment_to_ball(
    p0: &Point3d,
    p1: &Point3d,
    center: &Point3d,
    squared_radius: f64,
) -> Option<(Point3d, Point3d)> {
    let d = p1 - p0;
    let f = p0 - center;
    let a = d.norm_squared();
    let c = f.norm_squared() - squared_radius;
    if a == 0.0 {
        return (c <= 0.0).then_some((*p0, *p0));
    }
    let b = 2.0 * f.dot(&d);
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let t0 = ((-b - root) / (2.0 * a)).max(0.0);
    let t1 = ((-b + root) / (2.0 * a)).min(1.0);
    if t0 > t1 {
        return None;
    }
    Some((p0 + d * t0, p0 + d * t1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_corner() -> [Point3d; 4] {
        [
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
            Point3d::new(0.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_orientation_sign() {
        let [a, b, c, d] = unit_corner();
        assert_relative_eq!(orient3d(&a, &b, &c, &d), 1.0);
        assert_relative_eq!(orient3d(&a, &c, &b, &d), -1.0);
        assert_relative_eq!(tetrahedron_volume(&a, &c, &b, &d), 1.0 / 6.0);
        assert_relative_eq!(normalized_orient3d(&a, &b, &c, &d), 1.0);
    }

    #[test]
    fn test_circumsphere_passes_through_vertices() {
        let [a, b, c, d] = unit_corner();
        let (center, r2) = circumsphere(&a, &b, &c, &d).unwrap();
        assert_relative_eq!(center, Point3d::new(0.5, 0.5, 0.5), epsilon = 1e-12);
        for p in [a, b, c, d] {
            assert_relative_eq!((p - center).norm_squared(), r2, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_flat_tetrahedron_has_no_circumsphere() {
        let [a, b, c, _] = unit_corner();
        let d = Point3d::new(1.0, 1.0, 0.0);
        assert!(circumsphere(&a, &b, &c, &d).is_none());
        assert!(barycentric_gradients(&a, &b, &c, &d).is_none());
    }

    #[test]
    fn test_triangle_circumcenter_equidistant() {
        let a = Point3d::new(0.0, 0.0, 1.0);
        let b = Point3d::new(2.0, 0.0, 1.0);
        let c = Point3d::new(0.5, 1.5, 1.0);
        let center = triangle_circumcenter(&a, &b, &c).unwrap();
        let r = (center - a).norm();
        assert_relative_eq!((center - b).norm(), r, epsilon = 1e-12);
        assert_relative_eq!((center - c).norm(), r, epsilon = 1e-12);
        assert_relative_eq!(center.z, 1.0, epsilon = 1e-12);
        assert_relative_eq!(triangle_circumradius(&a, &b, &c), r, epsilon = 1e-12);
    }

    #[test]
    fn test_equilateral_min_angle() {
        let a = Point3d::new(0.0, 0.0, 0.0);
        let b = Point3d::new(1.0, 0.0, 0.0);
        let c = Point3d::new(0.5, 3.0_f64.sqrt() / 2.0, 0.0);
        assert_relative_eq!(triangle_min_angle(&a, &b, &c), std::f64::consts::FRAC_PI_3, epsilon = 1e-12);
        let flat = Point3d::new(2.0, 0.0, 0.0);
        assert_relative_eq!(triangle_min_angle(&a, &b, &flat), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_barycentric_gradients_reproduce_linear_function() {
        let [a, b, c, d] = unit_corner();
        let grads = barycentric_gradients(&a, &b, &c, &d).unwrap();
        // f(x) = 2x - y + 3z + 1 sampled at the vertices
        let f = |p: &Point3d| 2.0 * p.x - p.y + 3.0 * p.z + 1.0;
        let gradient: Vector3d = [a, b, c, d]
            .iter()
            .zip(grads.iter())
            .map(|(p, g)| g * f(p))
            .sum();
        assert_relative_eq!(gradient, Vector3d::new(2.0, -1.0, 3.0), epsilon = 1e-12);
        let total: Vector3d = grads.iter().sum();
        assert_relative_eq!(total.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_barycentric_coordinates_of_centroid() {
        let [a, b, c, d] = unit_corner();
        let centroid = Point3d::new(0.25, 0.25, 0.25);
        let l = barycentric_coordinates(&centroid, &a, &b, &c, &d).unwrap();
        for x in l {
            assert_relative_eq!(x, 0.25, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_clamped_weights_outside_triangle() {
        let a = Point3d::new(0.0, 0.0, 0.0);
        let b = Point3d::new(1.0, 0.0, 0.0);
        let c = Point3d::new(0.0, 1.0, 0.0);
        let w = clamped_triangle_weights(&Point3d::new(2.0, -1.0, 5.0), &a, &b, &c).unwrap();
        assert_relative_eq!(w[1], 1.0, epsilon = 1e-12);
        let inside = clamped_triangle_weights(&Point3d::new(0.25, 0.25, -3.0), &a, &b, &c).unwrap();
        assert_relative_eq!(inside[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(inside[1], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_segment_clipping() {
        let center = Point3d::origin();
        let (p, q) = clip_segment_to_ball(
            &Point3d::new(-3.0, 0.0, 0.0),
            &Point3d::new(0.5, 0.0, 0.0),
            &center,
            1.0,
        )
        .unwrap();
        assert_relative_eq!(p.x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(q.x, 0.5, epsilon = 1e-12);
        assert!(clip_segment_to_ball(
            &Point3d::new(-3.0, 2.0, 0.0),
            &Point3d::new(3.0, 2.0, 0.0),
            &center,
            1.0
        )
        .is_none());
        assert!(clip_segment_to_ball(
            &Point3d::new(2.0, 0.0, 0.0),
            &Point3d::new(3.0, 0.0, 0.0),
            &center,
            1.0
        )
        .is_none());
    }
}
