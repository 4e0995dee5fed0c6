use super::{
    initial_relative_rotation, relative_rotation, BodyFrame, JointBall, JointRow, LimitMotor,
    RowContext,
};
use crate::math::{glam_ext::QuatExt, wrap_angle, VecN};
use glam::{Quat, Vec3};

/// One rotational degree of freedom about an axis through an anchor. Five rows plus motor and
/// stops.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JointHinge {
    pub(crate) ball: JointBall,
    /// Axis in the frame of body a, or world space without body a.
    pub(crate) axis_a: Vec3,
    /// Axis in the frame of body b, or world space without body b.
    pub(crate) axis_b: Vec3,
    /// Relative rotation at which the angle is zero.
    pub(crate) q_rel0: Quat,
    pub limit: LimitMotor,
}

impl Default for JointHinge {
    fn default() -> Self {
        Self {
            ball: JointBall::default(),
            axis_a: Vec3::Z,
            axis_b: Vec3::Z,
            q_rel0: Quat::IDENTITY,
            limit: LimitMotor::default(),
        }
    }
}

impl JointHinge {
    pub(crate) fn set_anchor(&mut self, anchor: Vec3, a: &BodyFrame, b: &BodyFrame) {
        self.ball.set_anchor(anchor, a, b);
    }

    /// `axis` must be unit length. Resets the zero angle to the current configuration.
    pub(crate) fn set_axis(&mut self, axis: Vec3, a: &BodyFrame, b: &BodyFrame) {
        self.axis_a = a.orientation.conjugate() * axis;
        self.axis_b = b.orientation.conjugate() * axis;
        self.q_rel0 = initial_relative_rotation(a, b);
    }

    pub(crate) fn anchor(&self, a: &BodyFrame) -> Vec3 {
        a.local_to_world(self.ball.anchor_a)
    }

    pub(crate) fn world_axis(&self, a: &BodyFrame) -> Vec3 {
        a.orientation * self.axis_a
    }

    /// Rotation of body a relative to body b about the axis, in `[-PI, PI]`.
    pub(crate) fn angle(&self, a: &BodyFrame, b: &BodyFrame) -> f32 {
        let delta = relative_rotation(self.q_rel0, a, b);
        let b_rel_a = 2.0 * delta.xyz().dot(self.axis_a).atan2(delta.w);
        wrap_angle(-b_rel_a)
    }

    pub(crate) fn angle_rate(&self, a: &BodyFrame, b: &BodyFrame) -> f32 {
        self.world_axis(a)
            .dot(a.angular_velocity - b.angular_velocity)
    }

    pub(crate) fn add_rows(
        &self,
        a: &BodyFrame,
        b: &BodyFrame,
        ctx: &RowContext,
        rows: &mut Vec<JointRow>,
    ) {
        self.ball.add_rows(a, b, ctx, rows);

        // keep the two copies of the axis aligned
        let axis_wa = self.world_axis(a);
        let axis_wb = b.orientation * self.axis_b;
        let error = axis_wa.cross(axis_wb);
        let (p, q) = axis_wa.any_orthonormal_pair();
        for perp in [p, q] {
            rows.push(JointRow {
                jacobian: VecN::from_row(Vec3::ZERO, -perp, Vec3::ZERO, perp),
                rhs: -ctx.erp / ctx.h * error.dot(perp),
                cfm: ctx.cfm,
                lo: f32::NEG_INFINITY,
                hi: f32::INFINITY,
                friction: None,
            });
        }

        let jacobian = VecN::from_row(Vec3::ZERO, axis_wa, Vec3::ZERO, -axis_wa);
        self.limit
            .add_rows(jacobian, self.angle(a, b), ctx, rows);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_angle_follows_body() {
        let start = BodyFrame {
            position: Vec3::new(0.0, 0.0, 1.0),
            orientation: Quat::from_rotation_y(0.3),
            ..BodyFrame::WORLD
        };
        let mut hinge = JointHinge::default();
        hinge.set_anchor(start.position, &start, &BodyFrame::WORLD);
        hinge.set_axis(Vec3::X, &start, &BodyFrame::WORLD);
        assert_relative_eq!(hinge.angle(&start, &BodyFrame::WORLD), 0.0, epsilon = 1e-6);

        for angle in [0.5_f32, -1.2, 3.0] {
            let turned = BodyFrame {
                orientation: Quat::from_rotation_x(angle) * start.orientation,
                angular_velocity: Vec3::X * 2.0,
                ..start
            };
            assert_relative_eq!(
                hinge.angle(&turned, &BodyFrame::WORLD),
                angle,
                epsilon = 1e-5
            );
            assert_relative_eq!(hinge.angle_rate(&turned, &BodyFrame::WORLD), 2.0);
        }

        // the same rotation applied to the second body reads as the opposite angle
        let mut hinge = JointHinge::default();
        hinge.set_axis(Vec3::X, &BodyFrame::WORLD, &start);
        let turned = BodyFrame {
            orientation: Quat::from_rotation_x(0.5) * start.orientation,
            ..start
        };
        assert_relative_eq!(
            hinge.angle(&BodyFrame::WORLD, &turned),
            -0.5,
            epsilon = 1e-5
        );
    }
}
