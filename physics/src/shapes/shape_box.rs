use super::ShapeTrait;
use crate::{
    bounds::Bounds,
    error::{PhysicsError, Result},
    math::Pose,
};
use glam::{Mat3, Vec3};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShapeBox {
    pub half_extents: Vec3,
}

impl ShapeBox {
    pub fn lengths(&self) -> Vec3 {
        self.half_extents * 2.0
    }

    /// Corners in local space, bit `i` of the index selects the sign of axis `i`.
    pub fn corners(&self) -> [Vec3; 8] {
        let e = self.half_extents;
        let mut corners = [Vec3::ZERO; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            *corner = Vec3::new(
                if i & 1 == 0 { -e.x } else { e.x },
                if i & 2 == 0 { -e.y } else { e.y },
                if i & 4 == 0 { -e.z } else { e.z },
            );
        }
        corners
    }
}

impl ShapeTrait for ShapeBox {
    fn validate(&self) -> Result<()> {
        let e = self.half_extents;
        if e.is_finite() && e.cmpgt(Vec3::ZERO).all() {
            Ok(())
        } else {
            Err(PhysicsError::InvalidShape(format!(
                "box lengths must be positive, got {}",
                self.lengths()
            )))
        }
    }

    fn unit_inertia_tensor(&self) -> Option<Mat3> {
        let d = self.lengths();
        let dd = d * d;
        let diagonal = Vec3::new(dd.y + dd.z, dd.x + dd.z, dd.x + dd.y) / 12.0;
        Some(Mat3::from_diagonal(diagonal))
    }

    fn bounds(&self, pose: &Pose) -> Bounds {
        // extent along each world axis of the rotated box
        let rotation = Mat3::from_quat(pose.orientation);
        let extent = rotation.x_axis.abs() * self.half_extents.x
            + rotation.y_axis.abs() * self.half_extents.y
            + rotation.z_axis.abs() * self.half_extents.z;
        Bounds::from_center_half_extents(pose.position, extent)
    }

    fn support(&self, dir: Vec3) -> Vec3 {
        Vec3::select(dir.cmpge(Vec3::ZERO), self.half_extents, -self.half_extents)
    }
}
