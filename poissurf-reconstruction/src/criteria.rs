//! Surface meshing criteria

use crate::error::{ReconstructionError, Result};
use poissurf_core::Point3d;

/// Relative quality bounds for the extracted surface.
///
/// The two factors are scaled by the extraction size (half the bounding
/// radius of the samples) into absolute lengths.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshingCriteria {
    /// Lower bound on every triangle angle, in degrees (default: 30)
    pub min_facet_angle_degrees: f64,
    /// Upper bound on surface Delaunay ball radii (default: 0.1)
    pub max_circumradius_factor: f64,
    /// Upper bound on the distance between a facet's circumcenter and the
    /// center of its surface Delaunay ball (default: 0.005)
    pub max_distance_factor: f64,
    /// Refinement stops once this many restricted facets exist (default: 200_000)
    pub max_facets: usize,
    /// Keep non-manifold edges instead of refining around them (default: false)
    pub allow_non_manifold: bool,
}

impl Default for MeshingCriteria {
    fn default() -> Self {
        Self {
            min_facet_angle_degrees: 30.0,
            max_circumradius_factor: 0.1,
            max_distance_factor: 0.005,
            max_facets: 200_000,
            allow_non_manifold: false,
        }
    }
}

impl MeshingCriteria {
    pub fn with_min_facet_angle(mut self, degrees: f64) -> Self {
        self.min_facet_angle_degrees = degrees;
        self
    }

    pub fn with_max_circumradius_factor(mut self, factor: f64) -> Self {
        self.max_circumradius_factor = factor;
        self
    }

    pub fn with_max_distance_factor(mut self, factor: f64) -> Self {
        self.max_distance_factor = factor;
        self
    }

    pub fn with_max_facets(mut self, max_facets: usize) -> Self {
        self.max_facets = max_facets;
        self
    }

    pub fn with_allow_non_manifold(mut self, allow: bool) -> Self {
        self.allow_non_manifold = allow;
        self
    }

    /// Angles at or above 60° cannot be met by every triangle; refinement
    /// would not terminate.
    pub fn validate(&self) -> Result<()> {
        let angle = self.min_facet_angle_degrees;
        if !(angle > 0.0 && angle < 60.0) {
            return Err(ReconstructionError::invalid_criteria(format!(
                "minimum facet angle must lie in (0, 60) degrees, got {}",
                angle
            )));
        }
        for (name, value) in [
            ("circumradius", self.max_circumradius_factor),
            ("distance", self.max_distance_factor),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ReconstructionError::invalid_criteria(format!(
                    "{} factor must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if self.max_facets == 0 {
            return Err(ReconstructionError::invalid_criteria("max_facets must be positive"));
        }
        Ok(())
    }

    /// Absolute bounds for an extraction of the given size
    pub fn resolve(&self, size: f64) -> FacetCriteria {
        FacetCriteria {
            min_angle: self.min_facet_angle_degrees.to_radians(),
            radius_bound: self.max_circumradius_factor * size,
            distance_bound: self.max_distance_factor * size,
            max_facets: self.max_facets,
            allow_non_manifold: self.allow_non_manifold,
        }
    }
}

/// Absolute facet bounds used during one extraction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacetCriteria {
    /// Radians
    pub min_angle: f64,
    pub radius_bound: f64,
    pub distance_bound: f64,
    pub max_facets: usize,
    pub allow_non_manifold: bool,
}

/// Ball the surface is searched in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDomain {
    pub center: Point3d,
    pub squared_radius: f64,
}

impl SurfaceDomain {
    pub fn new(center: Point3d, squared_radius: f64) -> Self {
        Self { center, squared_radius }
    }

    /// Ball around the seed with squared radius `4 (R / 2)²`, `R` being the
    /// bounding radius of the samples
    pub fn around_seed(seed: Point3d, bounding_radius: f64) -> Self {
        let size = bounding_radius / 2.0;
        Self::new(seed, 4.0 * size * size)
    }

    pub fn radius(&self) -> f64 {
        self.squared_radius.sqrt()
    }

    pub fn contains(&self, point: &Point3d) -> bool {
        (point - self.center).norm_squared() <= self.squared_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        let criteria = MeshingCriteria::default();
        assert!(criteria.validate().is_ok());
        assert!(!criteria.allow_non_manifold);
    }

    #[test]
    fn test_invalid_criteria() {
        for criteria in [
            MeshingCriteria::default().with_min_facet_angle(0.0),
            MeshingCriteria::default().with_min_facet_angle(60.0),
            MeshingCriteria::default().with_max_circumradius_factor(-1.0),
            MeshingCriteria::default().with_max_distance_factor(f64::NAN),
            MeshingCriteria::default().with_max_facets(0),
        ] {
            let err = criteria.validate().unwrap_err();
            assert!(err.is_fatal_for_batch());
        }
    }

    #[test]
    fn test_resolve_scales_factors() {
        let facets = MeshingCriteria::default().resolve(2.0);
        assert_relative_eq!(facets.min_angle, 30.0_f64.to_radians());
        assert_relative_eq!(facets.radius_bound, 0.2);
        assert_relative_eq!(facets.distance_bound, 0.01);
    }

    #[test]
    fn test_seed_domain_covers_bounding_radius() {
        let domain = SurfaceDomain::around_seed(Point3d::origin(), 3.0);
        assert_relative_eq!(domain.radius(), 3.0);
        assert!(domain.contains(&Point3d::new(0.0, 3.0, 0.0)));
        assert!(!domain.contains(&Point3d::new(0.0, 3.1, 0.0)));
    }
}
