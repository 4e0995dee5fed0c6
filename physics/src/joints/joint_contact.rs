use super::{BodyFrame, JointRow, RowContext};
use crate::{contact::Contact, math::VecN};
use glam::Vec3;

/// One contact point: a unilateral normal row and up to two friction rows.
#[derive(Copy, Clone, Debug)]
pub struct JointContact {
    pub contact: Contact,
}

impl JointContact {
    pub(crate) fn new(contact: Contact) -> Self {
        Self { contact }
    }

    /// `a` and `b` must carry the velocities from before this step's forces were applied, the
    /// bounce is computed from them. `rows` holds only the rows of this joint.
    pub(crate) fn add_rows(
        &self,
        a: &BodyFrame,
        b: &BodyFrame,
        ctx: &RowContext,
        rows: &mut Vec<JointRow>,
    ) {
        let point = &self.contact.point;
        let surface = &self.contact.surface;
        let n = point.normal;
        let ra = point.position - a.position;
        let rb = point.position - b.position;
        let row_along = |dir: Vec3| VecN::from_row(-dir, -ra.cross(dir), dir, rb.cross(dir));

        let normal = row_along(n);
        let penetration = (point.depth - ctx.contact_surface_layer).max(0.0);
        let mut rhs = (surface.softness.erp * penetration / ctx.h)
            .min(ctx.contact_max_correcting_velocity);

        if surface.restitution > 0.0 {
            let velocities = VecN::from_row(
                a.linear_velocity,
                a.angular_velocity,
                b.linear_velocity,
                b.angular_velocity,
            );
            // positive when separating
            let normal_velocity = normal.dot(&velocities);
            if -normal_velocity > surface.bounce_velocity {
                rhs = rhs.max(-surface.restitution * normal_velocity);
            }
        }

        let normal_index = rows.len();
        rows.push(JointRow {
            jacobian: normal,
            rhs,
            cfm: surface.softness.cfm,
            lo: 0.0,
            hi: f32::INFINITY,
            friction: None,
        });

        if surface.mu > 0.0 {
            let (t1, t2) = n.any_orthonormal_pair();
            for tangent in [t1, t2] {
                rows.push(JointRow {
                    jacobian: row_along(tangent),
                    rhs: 0.0,
                    cfm: surface.softness.cfm,
                    lo: f32::NEG_INFINITY,
                    hi: f32::INFINITY,
                    friction: Some((normal_index, surface.mu)),
                });
            }
        }
    }
}
