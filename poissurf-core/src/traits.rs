//! Core traits for poissurf

use crate::{mesh::*, point::*, point_cloud::*};

/// Objects with a spatial extent
pub trait Bounded {
    /// Axis-aligned bounding box as (min, max)
    fn bounding_box(&self) -> (Point3f, Point3f);

    /// Center of the bounding box
    fn center(&self) -> Point3f {
        let (min, max) = self.bounding_box();
        nalgebra::center(&min, &max)
    }
}

fn bounds_of<I: IntoIterator<Item = Point3f>>(points: I) -> (Point3f, Point3f) {
    let mut iter = points.into_iter();
    let Some(first) = iter.next() else {
        return (Point3f::origin(), Point3f::origin());
    };
    iter.fold((first, first), |(min, max), p| (min.inf(&p), max.sup(&p)))
}

impl<T> Bounded for PointCloud<T>
where
    T: Clone + Copy,
    Point3f: From<T>,
{
    fn bounding_box(&self) -> (Point3f, Point3f) {
        bounds_of(self.points.iter().map(|p| Point3f::from(*p)))
    }
}

impl Bounded for TriangleMesh {
    fn bounding_box(&self) -> (Point3f, Point3f) {
        bounds_of(self.vertices.iter().copied())
    }
}
