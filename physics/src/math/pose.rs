use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// A rigid transform: rotate by `orientation` then translate by `position`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.position + self.orientation * point
    }

    #[inline]
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.orientation * vector
    }

    #[inline]
    pub fn inverse_transform_point(&self, point: Vec3) -> Vec3 {
        self.orientation.conjugate() * (point - self.position)
    }

    #[inline]
    pub fn inverse_transform_vector(&self, vector: Vec3) -> Vec3 {
        self.orientation.conjugate() * vector
    }

    /// `self * local`: the pose of a frame given relative to `self`.
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose {
            position: self.transform_point(local.position),
            orientation: (self.orientation * local.orientation).normalize(),
        }
    }

    pub fn inverse(&self) -> Pose {
        let orientation = self.orientation.conjugate();
        Pose {
            position: orientation * -self.position,
            orientation,
        }
    }
}

#[cfg(test)]
mod test {
    use super::Pose;
    use approx::assert_relative_eq;
    use glam::{Quat, Vec3};

    #[test]
    fn test_compose_inverse() {
        let a = Pose::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quat::from_rotation_z(0.7) * Quat::from_rotation_x(-0.3),
        );
        let b = Pose::new(Vec3::new(-0.5, 0.0, 0.25), Quat::from_rotation_y(1.1));
        let ab = a.compose(&b);
        let p = Vec3::new(0.3, -0.2, 0.9);
        let expected = a.transform_point(b.transform_point(p));
        assert!(ab.transform_point(p).abs_diff_eq(expected, 1e-5));

        let back = a.inverse().compose(&ab);
        assert!(back.position.abs_diff_eq(b.position, 1e-5));
        assert_relative_eq!(back.orientation.dot(b.orientation).abs(), 1.0, epsilon = 1e-5);
        assert!(a
            .inverse_transform_point(a.transform_point(p))
            .abs_diff_eq(p, 1e-5));
    }
}
