use super::ShapeTrait;
use crate::{
    bounds::Bounds,
    error::{PhysicsError, Result},
    math::{glam_ext::Vec3Ext, Pose},
};
use glam::{Mat3, Vec3};

/// The half-space `dot(normal, x) <= offset` in world space. The normal points out of the solid.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ShapePlane {
    normal: Vec3,
    offset: f32,
}

impl ShapePlane {
    pub fn new(normal: Vec3, offset: f32) -> Result<Self> {
        let length = normal.length();
        let unit = normal
            .try_axis()
            .ok_or(PhysicsError::DegenerateAxis(normal.to_array()))?;
        if !offset.is_finite() {
            return Err(PhysicsError::InvalidShape(format!(
                "plane offset must be finite, got {}",
                offset
            )));
        }
        Ok(Self {
            normal: unit,
            offset: offset / length,
        })
    }

    #[inline]
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    #[inline]
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Positive outside the solid, negative inside.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.offset
    }
}

impl ShapeTrait for ShapePlane {
    fn validate(&self) -> Result<()> {
        if self.normal.try_axis().is_some() && self.offset.is_finite() {
            Ok(())
        } else {
            Err(PhysicsError::DegenerateAxis(self.normal.to_array()))
        }
    }

    fn unit_inertia_tensor(&self) -> Option<Mat3> {
        None
    }

    // the pose is ignored, planes live in world space
    fn bounds(&self, _: &Pose) -> Bounds {
        let mut bounds = Bounds::everything();
        for axis in 0..3 {
            if self.normal[axis] == 1.0 {
                bounds.maxs[axis] = self.offset;
            } else if self.normal[axis] == -1.0 {
                bounds.mins[axis] = -self.offset;
            }
        }
        bounds
    }

    fn support(&self, dir: Vec3) -> Vec3 {
        // unbounded in every direction except straight out of the solid
        let tangent = dir - self.normal * self.normal.dot(dir);
        if tangent.length_squared() > 1e-12 || self.normal.dot(dir) < 0.0 {
            dir.normalize_or_zero() * f32::MAX
        } else {
            self.normal * self.offset
        }
    }
}
