//! Interfaces between the solver, the extractor and the pipeline

use crate::error::Result;
use crate::point_set::PointSet;
use crate::triangulation::DelaunayTriangulation;
use poissurf_core::Point3d;

/// Figures from one implicit-function solve
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveReport {
    /// Refinement vertices added inside the boundary shell
    pub steiner_points: usize,
    /// Dirichlet vertices of the boundary shell
    pub boundary_points: usize,
    /// Rows of the linear system
    pub unknowns: usize,
    pub iterations: usize,
    pub residual: f64,
    /// Constant subtracted from the raw solution
    pub level_shift: f64,
}

/// Scalar field whose zero level set is the reconstructed surface.
///
/// Negative inside, positive outside. Implementations must be safe to
/// evaluate from several threads.
pub trait ImplicitFunction: Send + Sync {
    fn evaluate(&self, point: &Point3d) -> f64;

    /// A point where the function is strictly negative
    fn inner_point(&self) -> Result<Point3d>;

    /// Radius of the centroid-centered sphere enclosing the input samples
    fn bounding_radius(&self) -> f64;

    fn centroid(&self) -> Point3d;

    fn report(&self) -> Option<SolveReport> {
        None
    }
}

/// Turns an oriented point set into an [`ImplicitFunction`]
pub trait ImplicitFunctionSolver: Send + Sync {
    fn name(&self) -> &str;

    /// Radius of the triangulation domain, in units of the bounding radius.
    ///
    /// Every point the solver inserts must fall inside this domain.
    fn domain_radius_factor(&self) -> f64 {
        4.0
    }

    /// Check the configuration before any input is processed
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Solve over `triangulation`, which already holds every sample
    fn compute(
        &self,
        points: &PointSet,
        triangulation: DelaunayTriangulation,
    ) -> Result<Box<dyn ImplicitFunction>>;
}
