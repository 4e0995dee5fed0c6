use super::{
    initial_relative_rotation, orientation_lock_rows, BodyFrame, JointBall, JointRow, RowContext,
};
use glam::{Quat, Vec3};

/// Locks the relative pose of two bodies, or of a body and the world. Six rows.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JointFixed {
    pub(crate) ball: JointBall,
    pub(crate) q_rel0: Quat,
}

impl Default for JointFixed {
    fn default() -> Self {
        Self {
            ball: JointBall::default(),
            q_rel0: Quat::IDENTITY,
        }
    }
}

impl JointFixed {
    /// Captures the current relative pose, holding the bodies together at `anchor`.
    pub(crate) fn set(&mut self, anchor: Vec3, a: &BodyFrame, b: &BodyFrame) {
        self.ball.set_anchor(anchor, a, b);
        self.q_rel0 = initial_relative_rotation(a, b);
    }

    pub(crate) fn add_rows(
        &self,
        a: &BodyFrame,
        b: &BodyFrame,
        ctx: &RowContext,
        rows: &mut Vec<JointRow>,
    ) {
        self.ball.add_rows(a, b, ctx, rows);
        orientation_lock_rows(self.q_rel0, a, b, ctx, rows);
    }
}
