use crate::{
    arena::BodyHandle,
    bounds::Bounds,
    config::Softness,
    error::{PhysicsError, Result},
    math::Pose,
    shapes::Shape,
};

/// Contact material of a geometry.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfaceParams {
    /// Coulomb friction coefficient, may be infinite.
    pub mu: f32,
    /// Coefficient of restitution in `[0, 1]`.
    pub restitution: f32,
    /// Minimum approach speed for a bounce.
    pub bounce_velocity: f32,
    /// Contact softness, the world ERP/CFM when `None`.
    pub softness: Option<Softness>,
}

impl Default for SurfaceParams {
    fn default() -> Self {
        Self {
            mu: f32::INFINITY,
            restitution: 0.0,
            bounce_velocity: 0.1,
            softness: None,
        }
    }
}

impl SurfaceParams {
    pub fn validate(&self) -> Result<()> {
        if self.mu.is_nan() || self.mu < 0.0 {
            return Err(PhysicsError::InvalidParameter {
                name: "mu",
                value: self.mu,
            });
        }
        if !(self.restitution.is_finite() && (0.0..=1.0).contains(&self.restitution)) {
            return Err(PhysicsError::InvalidParameter {
                name: "restitution",
                value: self.restitution,
            });
        }
        if !(self.bounce_velocity.is_finite() && self.bounce_velocity >= 0.0) {
            return Err(PhysicsError::InvalidParameter {
                name: "bounce_velocity",
                value: self.bounce_velocity,
            });
        }
        if let Some(softness) = &self.softness {
            softness.validate()?;
        }
        Ok(())
    }

    /// Surface of a contact between `self` and `other`.
    pub fn combine(&self, other: &SurfaceParams, world: Softness) -> ContactSurface {
        let softness = match (self.softness, other.softness) {
            (Some(a), Some(b)) => a.softer(b),
            (Some(s), None) | (None, Some(s)) => s,
            (None, None) => world,
        };
        ContactSurface {
            mu: self.mu.min(other.mu),
            restitution: self.restitution.max(other.restitution),
            bounce_velocity: self.bounce_velocity.max(other.bounce_velocity),
            softness,
        }
    }
}

/// Resolved material of a single contact.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactSurface {
    pub mu: f32,
    pub restitution: f32,
    pub bounce_velocity: f32,
    pub softness: Softness,
}

/// Membership and filter bits. Two geometries collide only when each one's group intersects
/// the other's mask.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CollisionGroups {
    pub group: u32,
    pub mask: u32,
}

impl Default for CollisionGroups {
    fn default() -> Self {
        Self {
            group: u32::MAX,
            mask: u32::MAX,
        }
    }
}

impl CollisionGroups {
    pub const fn new(group: u32, mask: u32) -> Self {
        Self { group, mask }
    }

    #[inline]
    pub fn test(&self, other: &CollisionGroups) -> bool {
        (self.group & other.mask) != 0 && (other.group & self.mask) != 0
    }
}

/// Collision geometry. Either follows a body (plus `offset`) or sits still at `pose`.
#[derive(Clone, Debug)]
pub struct Geom {
    pub(crate) shape: Shape,
    pub(crate) body: Option<BodyHandle>,
    pub(crate) offset: Pose,
    pub(crate) pose: Pose,
    pub(crate) surface: SurfaceParams,
    pub(crate) groups: CollisionGroups,
    pub(crate) enabled: bool,
    pub(crate) bounds: Bounds,
}

impl Geom {
    pub fn new(shape: Shape) -> Self {
        let pose = Pose::IDENTITY;
        Self {
            bounds: shape.bounds(&pose),
            shape,
            body: None,
            offset: Pose::IDENTITY,
            pose,
            surface: SurfaceParams::default(),
            groups: CollisionGroups::default(),
            enabled: true,
        }
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Pose::new(pose.position, pose.orientation.normalize());
        self.bounds = self.shape.bounds(&self.pose);
        self
    }

    pub fn with_offset(mut self, offset: Pose) -> Self {
        self.offset = Pose::new(offset.position, offset.orientation.normalize());
        self
    }

    pub fn with_surface(mut self, surface: SurfaceParams) -> Self {
        self.surface = surface;
        self
    }

    pub fn with_collision_groups(mut self, groups: CollisionGroups) -> Self {
        self.groups = groups;
        self
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn body(&self) -> Option<BodyHandle> {
        self.body
    }

    #[inline]
    pub fn offset(&self) -> &Pose {
        &self.offset
    }

    /// World pose as of the last step or pose change.
    #[inline]
    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    #[inline]
    pub fn surface(&self) -> &SurfaceParams {
        &self.surface
    }

    #[inline]
    pub fn collision_groups(&self) -> CollisionGroups {
        self.groups
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.shape.validate()?;
        self.surface.validate()?;
        if !(self.pose.position.is_finite() && self.pose.orientation.is_finite()) {
            return Err(PhysicsError::InvalidParameter {
                name: "pose",
                value: f32::NAN,
            });
        }
        Ok(())
    }

    pub(crate) fn update_pose(&mut self, pose: Pose) {
        self.pose = pose;
        self.bounds = self.shape.bounds(&self.pose);
    }

    /// Follows `body_pose` when attached.
    pub(crate) fn sync_with_body(&mut self, body_pose: &Pose) {
        if self.body.is_some() {
            self.update_pose(body_pose.compose(&self.offset));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_combine_surfaces() {
        let world = Softness { erp: 0.2, cfm: 1e-5 };
        let ground = SurfaceParams {
            mu: f32::INFINITY,
            restitution: 0.9,
            bounce_velocity: 0.0,
            softness: Some(Softness { erp: 0.2, cfm: 0.001 }),
        };
        let ball = SurfaceParams {
            mu: 0.7,
            restitution: 0.6,
            bounce_velocity: 0.1,
            softness: None,
        };
        let surface = ground.combine(&ball, world);
        assert_eq!(surface.mu, 0.7);
        assert_eq!(surface.restitution, 0.9);
        assert_eq!(surface.bounce_velocity, 0.1);
        assert_eq!(surface.softness, Softness { erp: 0.2, cfm: 0.001 });

        let surface = ball.combine(&ball, world);
        assert_eq!(surface.softness, world);
    }

    #[test]
    fn test_collision_groups() {
        const GROUND: u32 = 1;
        const PARTS: u32 = 2;
        let ground = CollisionGroups::new(GROUND, u32::MAX);
        let part = CollisionGroups::new(PARTS, GROUND);
        assert!(ground.test(&part));
        assert!(part.test(&ground));
        assert!(!part.test(&part));
        assert!(CollisionGroups::default().test(&part));
    }

    #[test]
    fn test_validate_surface() {
        assert!(SurfaceParams::default().validate().is_ok());
        let bad = SurfaceParams {
            restitution: 1.5,
            ..SurfaceParams::default()
        };
        assert!(bad.validate().is_err());
        let bad = SurfaceParams {
            mu: -1.0,
            ..SurfaceParams::default()
        };
        assert!(bad.validate().is_err());
    }
}
