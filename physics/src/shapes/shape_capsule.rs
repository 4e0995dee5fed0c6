use super::ShapeTrait;
use crate::{
    bounds::Bounds,
    error::{PhysicsError, Result},
    math::Pose,
};
use glam::{Mat3, Vec3};
use std::f32::consts::PI;

/// Capsule along the local Z axis.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShapeCapsule {
    pub radius: f32,
    /// Distance between the centres of the two caps.
    pub length: f32,
}

impl ShapeCapsule {
    #[inline]
    pub fn half_length(&self) -> f32 {
        self.length * 0.5
    }

    /// World space centres of the two caps.
    pub fn segment(&self, pose: &Pose) -> (Vec3, Vec3) {
        let half = pose.orientation * Vec3::new(0.0, 0.0, self.half_length());
        (pose.position - half, pose.position + half)
    }
}

impl ShapeTrait for ShapeCapsule {
    fn validate(&self) -> Result<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(PhysicsError::InvalidShape(format!(
                "capsule radius must be positive, got {}",
                self.radius
            )));
        }
        if !(self.length.is_finite() && self.length >= 0.0) {
            return Err(PhysicsError::InvalidShape(format!(
                "capsule length must be non-negative, got {}",
                self.length
            )));
        }
        Ok(())
    }

    fn unit_inertia_tensor(&self) -> Option<Mat3> {
        let r2 = self.radius * self.radius;
        let l = self.length;
        let m_cylinder = PI * r2 * l;
        let m_caps = (4.0 / 3.0) * PI * r2 * self.radius;
        let i_axis = (0.5 * m_cylinder + 0.4 * m_caps) * r2;
        let i_side = m_cylinder * (0.25 * r2 + l * l / 12.0)
            + m_caps * (0.4 * r2 + 0.375 * self.radius * l + 0.25 * l * l);
        let scale = (m_cylinder + m_caps).recip();
        Some(Mat3::from_diagonal(Vec3::new(i_side, i_side, i_axis) * scale))
    }

    fn bounds(&self, pose: &Pose) -> Bounds {
        let (p0, p1) = self.segment(pose);
        Bounds {
            mins: p0.min(p1) - Vec3::splat(self.radius),
            maxs: p0.max(p1) + Vec3::splat(self.radius),
        }
    }

    fn support(&self, dir: Vec3) -> Vec3 {
        let cap = if dir.z >= 0.0 {
            self.half_length()
        } else {
            -self.half_length()
        };
        Vec3::new(0.0, 0.0, cap) + dir.normalize_or_zero() * self.radius
    }
}
