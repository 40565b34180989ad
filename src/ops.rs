//! Pivot-preserving uniform scaling, free of any scene state.

use nalgebra::{Matrix4, Point3};

use crate::error::ScaleError;
use crate::transform::Transform;

/// Smallest distance a pair of vertices can be scaled to.
pub const MIN_TARGET_DISTANCE: f64 = 1e-6;

/// Scale factors closer than this to 1 leave the object untouched.
pub const SCALE_TOLERANCE: f64 = 1e-6;

/// Exactly two points, in whatever space the caller is working in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectionPair(pub Point3<f64>, pub Point3<f64>);

impl TryFrom<Vec<Point3<f64>>> for SelectionPair {
    type Error = ScaleError;

    fn try_from(points: Vec<Point3<f64>>) -> Result<Self, Self::Error> {
        match points.as_slice() {
            [a, b] => Ok(Self(*a, *b)),
            _ => Err(ScaleError::InvalidSelection {
                count: points.len(),
            }),
        }
    }
}

impl SelectionPair {
    pub fn map(self, matrix: &Matrix4<f64>) -> Self {
        Self(matrix.transform_point(&self.0), matrix.transform_point(&self.1))
    }

    pub fn distance(&self) -> f64 {
        measure_distance(&self.0, &self.1)
    }

    pub fn midpoint(&self) -> Point3<f64> {
        nalgebra::center(&self.0, &self.1)
    }
}

pub fn measure_distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (a - b).norm()
}

/// Result of [`scale_to_distance`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformScale {
    pub current_distance: f64,
    /// The distance actually aimed for, after clamping.
    pub target_distance: f64,
    pub clamped: bool,
    pub factor: f64,
    pub pivot: Point3<f64>,
    /// `None` when the factor is within [`SCALE_TOLERANCE`] of 1.
    pub transform: Option<Transform>,
}

impl UniformScale {
    pub fn is_noop(&self) -> bool {
        self.transform.is_none()
    }
}

/// Computes the transform that makes the world distance between `pair` equal
/// to `target`, keeping the pair's midpoint fixed in world space.
///
/// `pair` is in world space. `parent_world` is the world matrix of the
/// object's parent, if it has one; `transform.location` is expressed in that
/// parent's space.
pub fn scale_to_distance(
    pair: SelectionPair,
    transform: &Transform,
    parent_world: Option<&Matrix4<f64>>,
    target: f64,
) -> Result<UniformScale, ScaleError> {
    let current_distance = pair.distance();
    if current_distance.is_nan() || current_distance == 0. {
        return Err(ScaleError::DegenerateSelection);
    }
    if !target.is_finite() {
        return Err(ScaleError::InvalidTargetDistance(target));
    }

    let clamped = target <= 0.;
    let target_distance = if clamped { MIN_TARGET_DISTANCE } else { target };

    let factor = target_distance / current_distance;
    if !factor.is_finite() {
        return Err(ScaleError::DegenerateSelection);
    }

    let pivot = pair.midpoint();
    let mut result = UniformScale {
        current_distance,
        target_distance,
        clamped,
        factor,
        pivot,
        transform: None,
    };
    if (factor - 1.).abs() < SCALE_TOLERANCE {
        return Ok(result);
    }

    let location = Point3::from(transform.location);
    let old_origin = match parent_world {
        Some(parent) => parent.transform_point(&location),
        None => location,
    };
    let new_origin = pivot + (old_origin - pivot) * factor;

    let new_location = match parent_world {
        Some(parent) => parent
            .try_inverse()
            .ok_or(ScaleError::SingularParent)?
            .transform_point(&new_origin),
        None => new_origin,
    };

    result.transform = Some(Transform {
        location: new_location.coords,
        rotation: transform.rotation,
        scale: transform.scale * factor,
    });
    Ok(result)
}
