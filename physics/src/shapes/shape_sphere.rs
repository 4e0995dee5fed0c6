use super::ShapeTrait;
use crate::{
    bounds::Bounds,
    error::{PhysicsError, Result},
    math::Pose,
};
use glam::{Mat3, Vec3};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShapeSphere {
    pub radius: f32,
}

impl ShapeTrait for ShapeSphere {
    fn validate(&self) -> Result<()> {
        if self.radius.is_finite() && self.radius > 0.0 {
            Ok(())
        } else {
            Err(PhysicsError::InvalidShape(format!(
                "sphere radius must be positive, got {}",
                self.radius
            )))
        }
    }

    fn unit_inertia_tensor(&self) -> Option<Mat3> {
        let i = 2.0 * self.radius * self.radius / 5.0;
        Some(Mat3::from_diagonal(Vec3::splat(i)))
    }

    fn bounds(&self, pose: &Pose) -> Bounds {
        Bounds::from_center_half_extents(pose.position, Vec3::splat(self.radius))
    }

    fn support(&self, dir: Vec3) -> Vec3 {
        dir.normalize_or_zero() * self.radius
    }
}
