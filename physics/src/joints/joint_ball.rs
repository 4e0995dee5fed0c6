use super::{BodyFrame, JointRow, RowContext};
use crate::math::VecN;
use glam::Vec3;

/// Keeps an anchor point of each body at the same place. Three rows.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct JointBall {
    /// Anchor in the frame of body a, or world space without body a.
    pub(crate) anchor_a: Vec3,
    /// Anchor in the frame of body b, or world space without body b.
    pub(crate) anchor_b: Vec3,
}

impl JointBall {
    pub(crate) fn set_anchor(&mut self, anchor: Vec3, a: &BodyFrame, b: &BodyFrame) {
        self.anchor_a = a.world_to_local(anchor);
        self.anchor_b = b.world_to_local(anchor);
    }

    /// World space anchors as seen from each body. They drift apart when the joint is violated.
    pub(crate) fn world_anchors(&self, a: &BodyFrame, b: &BodyFrame) -> (Vec3, Vec3) {
        (a.local_to_world(self.anchor_a), b.local_to_world(self.anchor_b))
    }

    pub(crate) fn add_rows(
        &self,
        a: &BodyFrame,
        b: &BodyFrame,
        ctx: &RowContext,
        rows: &mut Vec<JointRow>,
    ) {
        let (world_anchor_a, world_anchor_b) = self.world_anchors(a, b);
        let ra = world_anchor_a - a.position;
        let rb = world_anchor_b - b.position;
        let error = world_anchor_b - world_anchor_a;

        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            rows.push(JointRow {
                jacobian: VecN::from_row(-axis, -ra.cross(axis), axis, rb.cross(axis)),
                rhs: -ctx.erp / ctx.h * error.dot(axis),
                cfm: ctx.cfm,
                lo: f32::NEG_INFINITY,
                hi: f32::INFINITY,
                friction: None,
            });
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Softness;
    use glam::Quat;

    #[test]
    fn test_anchor_frames() {
        let a = BodyFrame {
            position: Vec3::new(1.0, 0.0, 0.0),
            orientation: Quat::from_rotation_z(core::f32::consts::FRAC_PI_2),
            ..BodyFrame::WORLD
        };
        let mut ball = JointBall::default();
        ball.set_anchor(Vec3::new(1.0, 1.0, 0.0), &a, &BodyFrame::WORLD);
        assert!(ball.anchor_a.abs_diff_eq(Vec3::X, 1e-6));
        // the world side is stored in world space
        assert_eq!(ball.anchor_b, Vec3::new(1.0, 1.0, 0.0));

        let world = Softness { erp: 0.5, cfm: 0.0 };
        let ctx = RowContext {
            h: 0.1,
            erp: world.erp,
            cfm: world.cfm,
            world,
            contact_max_correcting_velocity: f32::INFINITY,
            contact_surface_layer: 0.0,
        };
        // body a drifted by +0.1 on x, the rows push it back
        let moved = BodyFrame {
            position: Vec3::new(1.1, 0.0, 0.0),
            ..a
        };
        let mut rows = Vec::new();
        ball.add_rows(&moved, &BodyFrame::WORLD, &ctx, &mut rows);
        assert_eq!(rows.len(), 3);
        assert!((rows[0].rhs - 0.5).abs() < 1e-5);
        assert_eq!(rows[0].jacobian.lin_a(), -Vec3::X);
    }
}
