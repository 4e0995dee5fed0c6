use super::{
    initial_relative_rotation, orientation_lock_rows, BodyFrame, JointRow, LimitMotor, RowContext,
};
use crate::math::VecN;
use glam::{Quat, Vec3};

/// One translational degree of freedom along an axis fixed in body a.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JointSlider {
    /// Axis in the frame of body a, or world space without body a.
    pub(crate) axis_a: Vec3,
    /// `a - b` at zero displacement, in the frame of body a.
    pub(crate) offset: Vec3,
    pub(crate) q_rel0: Quat,
    pub limit: LimitMotor,
}

impl Default for JointSlider {
    fn default() -> Self {
        Self {
            axis_a: Vec3::Z,
            offset: Vec3::ZERO,
            q_rel0: Quat::IDENTITY,
            limit: LimitMotor::default(),
        }
    }
}

impl JointSlider {
    /// `axis` must be unit length. Resets the zero displacement to the current configuration.
    pub(crate) fn set_axis(&mut self, axis: Vec3, a: &BodyFrame, b: &BodyFrame) {
        self.axis_a = a.orientation.conjugate() * axis;
        self.offset = a.orientation.conjugate() * (a.position - b.position);
        self.q_rel0 = initial_relative_rotation(a, b);
    }

    pub(crate) fn world_axis(&self, a: &BodyFrame) -> Vec3 {
        a.orientation * self.axis_a
    }

    fn separation_error(&self, a: &BodyFrame, b: &BodyFrame) -> Vec3 {
        (a.position - b.position) - a.orientation * self.offset
    }

    /// Displacement of body a relative to body b along the axis.
    pub(crate) fn position(&self, a: &BodyFrame, b: &BodyFrame) -> f32 {
        self.world_axis(a).dot(self.separation_error(a, b))
    }

    pub(crate) fn position_rate(&self, a: &BodyFrame, b: &BodyFrame) -> f32 {
        self.world_axis(a)
            .dot(a.linear_velocity - b.linear_velocity)
    }

    pub(crate) fn add_rows(
        &self,
        a: &BodyFrame,
        b: &BodyFrame,
        ctx: &RowContext,
        rows: &mut Vec<JointRow>,
    ) {
        orientation_lock_rows(self.q_rel0, a, b, ctx, rows);

        let axis = self.world_axis(a);
        let r = a.position - b.position;
        let error = self.separation_error(a, b);
        let row_along = |dir: Vec3| VecN::from_row(dir, Vec3::ZERO, -dir, -r.cross(dir));

        let (p, q) = axis.any_orthonormal_pair();
        for perp in [p, q] {
            rows.push(JointRow {
                jacobian: row_along(perp),
                rhs: -ctx.erp / ctx.h * error.dot(perp),
                cfm: ctx.cfm,
                lo: f32::NEG_INFINITY,
                hi: f32::INFINITY,
                friction: None,
            });
        }

        self.limit
            .add_rows(row_along(axis), error.dot(axis), ctx, rows);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_position_between_bodies() {
        let a = BodyFrame {
            position: Vec3::new(0.0, -0.2, 2.2),
            ..BodyFrame::WORLD
        };
        let b = BodyFrame {
            position: Vec3::new(0.5, 0.5, 3.0),
            ..BodyFrame::WORLD
        };
        let mut slider = JointSlider::default();
        slider.set_axis(Vec3::Z, &a, &b);
        assert_relative_eq!(slider.position(&a, &b), 0.0);

        let moved = BodyFrame {
            position: a.position + Vec3::new(0.3, 0.0, 0.25),
            linear_velocity: Vec3::new(1.0, 0.0, -0.5),
            ..a
        };
        assert_relative_eq!(slider.position(&moved, &b), 0.25, epsilon = 1e-6);
        assert_relative_eq!(slider.position_rate(&moved, &b), -0.5);

        let world = crate::config::Softness { erp: 1.0, cfm: 0.0 };
        let ctx = RowContext {
            h: 0.1,
            erp: world.erp,
            cfm: world.cfm,
            world,
            contact_max_correcting_velocity: f32::INFINITY,
            contact_surface_layer: 0.0,
        };
        let mut rows = Vec::new();
        slider.add_rows(&moved, &b, &ctx, &mut rows);
        // three orientation rows and two perpendicular rows, no motor or stops
        assert_eq!(rows.len(), 5);
        // the sideways drift is corrected, the slide along the axis is not
        let sideways: f32 = rows[3..].iter().map(|row| row.rhs * row.rhs).sum();
        assert_relative_eq!(sideways.sqrt(), 3.0, epsilon = 1e-4);
    }
}
