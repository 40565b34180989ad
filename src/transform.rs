use nalgebra::{Matrix4, Point3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Location, rotation and scale of an object relative to its parent (or the
/// world, when it has none). Composed as translate · rotate · scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub location: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
    pub scale: Vector3<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            location: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
        }
    }

    pub fn from_location(location: Vector3<f64>) -> Self {
        Self {
            location,
            ..Self::identity()
        }
    }

    pub fn with_rotation(mut self, rotation: UnitQuaternion<f64>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vector3<f64>) -> Self {
        self.scale = scale;
        self
    }

    pub fn to_matrix(&self) -> Matrix4<f64> {
        Translation3::from(self.location).to_homogeneous()
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.to_matrix().transform_point(point)
    }
}

/// Wire form of [`Transform`]: plain arrays, rotation as XYZ euler angles in
/// radians.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformDto {
    pub location: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: [f64; 3],
}

impl Default for TransformDto {
    fn default() -> Self {
        Transform::identity().into()
    }
}

impl From<Transform> for TransformDto {
    fn from(t: Transform) -> Self {
        let (roll, pitch, yaw) = t.rotation.euler_angles();
        Self {
            location: t.location.into(),
            rotation: [roll, pitch, yaw],
            scale: t.scale.into(),
        }
    }
}

impl From<TransformDto> for Transform {
    fn from(t: TransformDto) -> Self {
        Self {
            location: t.location.into(),
            rotation: UnitQuaternion::from_euler_angles(t.rotation[0], t.rotation[1], t.rotation[2]),
            scale: t.scale.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn scales_then_rotates_then_translates() {
        let t = Transform::from_location(Vector3::new(1., 0., 0.))
            .with_rotation(UnitQuaternion::from_euler_angles(0., 0., FRAC_PI_2))
            .with_scale(Vector3::new(2., 2., 2.));
        let p = t.apply(&Point3::new(1., 0., 0.));
        assert_relative_eq!(p, Point3::new(1., 2., 0.), epsilon = 1e-12);
    }

    #[test]
    fn dto_keeps_rotation() {
        let t = Transform::identity().with_rotation(UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3));
        let back: Transform = TransformDto::from(t).into();
        assert_relative_eq!(back.rotation, t.rotation, epsilon = 1e-12);
    }
}
