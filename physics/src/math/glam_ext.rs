use glam::{Quat, Vec3};

pub trait QuatExt {
    fn xyz(self) -> Vec3;
}

impl QuatExt for Quat {
    fn xyz(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

pub trait Vec3Ext {
    /// Returns `Some(normalized)` if the vector length is usable as an axis.
    fn try_axis(self) -> Option<Vec3>;
}

impl Vec3Ext for Vec3 {
    fn try_axis(self) -> Option<Vec3> {
        const MIN_AXIS_LENGTH_SQ: f32 = 1e-12;
        let length_sq = self.length_squared();
        if length_sq.is_finite() && length_sq > MIN_AXIS_LENGTH_SQ {
            Some(self / length_sq.sqrt())
        } else {
            None
        }
    }
}
