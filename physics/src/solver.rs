//! Projected Gauss-Seidel over scalar constraint rows, in impulse form.
//!
//! Each row solves `J v + (cfm / h) lambda = rhs` for its accumulated impulse `lambda`, clamped
//! to `[lo, hi]`. Friction rows take their bounds from the impulse of their normal row.

use crate::math::VecN;
use glam::{Mat3, Vec3};

/// Effective masses below this are treated as degenerate.
const MIN_EFFECTIVE_MASS: f32 = 1e-12;

/// Velocity state and inverse mass of one body for the duration of a solve.
#[derive(Copy, Clone, Debug)]
pub(crate) struct SolverBody {
    pub inv_mass: f32,
    pub inv_inertia_world: Mat3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl SolverBody {
    /// A body that never moves, standing in for the world.
    pub const STATIC: Self = Self {
        inv_mass: 0.0,
        inv_inertia_world: Mat3::ZERO,
        linear_velocity: Vec3::ZERO,
        angular_velocity: Vec3::ZERO,
    };
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct ConstraintRow {
    /// Index into the solver bodies, `None` for the world.
    pub body_a: Option<usize>,
    pub body_b: Option<usize>,
    pub jacobian: VecN<12>,
    pub rhs: f32,
    pub cfm: f32,
    pub lo: f32,
    pub hi: f32,
    /// Absolute index of the normal row and the friction coefficient.
    pub friction: Option<(usize, f32)>,
    /// Accumulated impulse. Holds the warm start value on entry and the solution on exit.
    pub lambda: f32,
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct SolverParams {
    pub h: f32,
    pub iterations: u32,
    pub min_cfm: f32,
}

struct PreparedRow {
    inv_m_jt: VecN<12>,
    inv_diag: f32,
    cfm_over_h: f32,
}

fn body_or_static(bodies: &[SolverBody], index: Option<usize>) -> SolverBody {
    index.map_or(SolverBody::STATIC, |i| bodies[i])
}

fn row_velocity(bodies: &[SolverBody], row: &ConstraintRow) -> f32 {
    let a = body_or_static(bodies, row.body_a);
    let b = body_or_static(bodies, row.body_b);
    let velocities = VecN::from_row(
        a.linear_velocity,
        a.angular_velocity,
        b.linear_velocity,
        b.angular_velocity,
    );
    row.jacobian.dot(&velocities)
}

fn apply_impulse(bodies: &mut [SolverBody], row: &ConstraintRow, inv_m_jt: &VecN<12>, impulse: f32) {
    if let Some(i) = row.body_a {
        bodies[i].linear_velocity += inv_m_jt.lin_a() * impulse;
        bodies[i].angular_velocity += inv_m_jt.ang_a() * impulse;
    }
    if let Some(i) = row.body_b {
        bodies[i].linear_velocity += inv_m_jt.lin_b() * impulse;
        bodies[i].angular_velocity += inv_m_jt.ang_b() * impulse;
    }
}

fn bounds(rows: &[ConstraintRow], row: &ConstraintRow) -> (f32, f32) {
    match row.friction {
        Some((normal, mu)) => {
            if mu.is_infinite() {
                (f32::NEG_INFINITY, f32::INFINITY)
            } else {
                let limit = mu * rows[normal].lambda.max(0.0);
                (-limit, limit)
            }
        }
        None => (row.lo, row.hi),
    }
}

/// Solves `rows` in order for a fixed number of sweeps, updating the body velocities in place.
///
/// Returns the number of degenerate rows. Those rows are skipped and end with a zero impulse.
pub(crate) fn solve(
    bodies: &mut [SolverBody],
    rows: &mut [ConstraintRow],
    params: &SolverParams,
) -> usize {
    let mut degenerate = 0;
    let prepared: Vec<Option<PreparedRow>> = rows
        .iter_mut()
        .map(|row| {
            let a = body_or_static(bodies, row.body_a);
            let b = body_or_static(bodies, row.body_b);
            let j = &row.jacobian;
            let inv_m_jt = VecN::from_row(
                j.lin_a() * a.inv_mass,
                a.inv_inertia_world * j.ang_a(),
                j.lin_b() * b.inv_mass,
                b.inv_inertia_world * j.ang_b(),
            );
            let effective = j.dot(&inv_m_jt);
            if !(j.is_finite() && row.rhs.is_finite() && effective > MIN_EFFECTIVE_MASS) {
                degenerate += 1;
                row.lambda = 0.0;
                return None;
            }
            let cfm_over_h = row.cfm.max(params.min_cfm) / params.h;
            Some(PreparedRow {
                inv_m_jt,
                inv_diag: 1.0 / (effective + cfm_over_h),
                cfm_over_h,
            })
        })
        .collect();

    // warm start
    for (row, prep) in rows.iter_mut().zip(prepared.iter()) {
        if let Some(prep) = prep {
            if row.lambda != 0.0 {
                row.lambda = row.lambda.clamp(row.lo, row.hi);
                apply_impulse(bodies, row, &prep.inv_m_jt, row.lambda);
            }
        }
    }

    for _ in 0..params.iterations {
        for i in 0..rows.len() {
            let Some(prep) = &prepared[i] else {
                continue;
            };
            let row = rows[i];
            let (lo, hi) = bounds(rows, &row);
            let residual = row.rhs - row_velocity(bodies, &row) - prep.cfm_over_h * row.lambda;
            let lambda = (row.lambda + residual * prep.inv_diag).clamp(lo, hi);
            let delta = lambda - row.lambda;
            if delta != 0.0 {
                apply_impulse(bodies, &row, &prep.inv_m_jt, delta);
                rows[i].lambda = lambda;
            }
        }
    }

    degenerate
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn body(inv_mass: f32, velocity: Vec3) -> SolverBody {
        SolverBody {
            inv_mass,
            inv_inertia_world: Mat3::IDENTITY * inv_mass,
            linear_velocity: velocity,
            angular_velocity: Vec3::ZERO,
        }
    }

    fn row(body_a: Option<usize>, body_b: Option<usize>, jacobian: VecN<12>) -> ConstraintRow {
        ConstraintRow {
            body_a,
            body_b,
            jacobian,
            rhs: 0.0,
            cfm: 0.0,
            lo: f32::NEG_INFINITY,
            hi: f32::INFINITY,
            friction: None,
            lambda: 0.0,
        }
    }

    const PARAMS: SolverParams = SolverParams {
        h: 0.01,
        iterations: 20,
        min_cfm: 0.0,
    };

    #[test]
    fn test_equal_velocity_row() {
        // v_b.x - v_a.x = 0 between masses 1 and 3
        let mut bodies = [body(1.0, Vec3::X * 4.0), body(1.0 / 3.0, Vec3::ZERO)];
        let mut rows = [row(
            Some(0),
            Some(1),
            VecN::from_row(-Vec3::X, Vec3::ZERO, Vec3::X, Vec3::ZERO),
        )];
        assert_eq!(solve(&mut bodies, &mut rows, &PARAMS), 0);
        // momentum is conserved
        assert_relative_eq!(bodies[0].linear_velocity.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(bodies[1].linear_velocity.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(rows[0].lambda, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_unilateral_and_friction() {
        // body resting on the world, moving sideways and away
        let mut bodies = [body(1.0, Vec3::new(2.0, 0.0, 1.0))];
        let mut normal = row(None, Some(0), VecN::from_row(Vec3::ZERO, Vec3::ZERO, Vec3::Z, Vec3::ZERO));
        normal.lo = 0.0;
        let mut friction = row(None, Some(0), VecN::from_row(Vec3::ZERO, Vec3::ZERO, Vec3::X, Vec3::ZERO));
        friction.friction = Some((0, 0.5));
        let mut rows = [normal, friction];
        solve(&mut bodies, &mut rows, &PARAMS);
        // separating contacts do not pull, so no friction either
        assert_eq!(rows[0].lambda, 0.0);
        assert_eq!(rows[1].lambda, 0.0);
        assert_eq!(bodies[0].linear_velocity, Vec3::new(2.0, 0.0, 1.0));

        // approaching: the normal stops it and friction is bounded by mu * lambda_n
        bodies[0].linear_velocity = Vec3::new(2.0, 0.0, -1.0);
        rows[0].lambda = 0.0;
        rows[1].lambda = 0.0;
        solve(&mut bodies, &mut rows, &PARAMS);
        assert_relative_eq!(bodies[0].linear_velocity.z, 0.0, epsilon = 1e-5);
        assert_relative_eq!(rows[1].lambda, -0.5, epsilon = 1e-5);
        assert_relative_eq!(bodies[0].linear_velocity.x, 1.5, epsilon = 1e-5);
    }

    #[test]
    fn test_soft_row_and_degenerate() {
        // with cfm the row settles at J v = rhs - (cfm / h) lambda
        let mut bodies = [body(1.0, Vec3::ZERO)];
        let mut soft = row(None, Some(0), VecN::from_row(Vec3::ZERO, Vec3::ZERO, Vec3::Z, Vec3::ZERO));
        soft.rhs = 1.0;
        soft.cfm = 0.01;
        let static_row = row(None, None, VecN::from_row(Vec3::ZERO, Vec3::ZERO, Vec3::Z, Vec3::ZERO));
        let mut rows = [soft, static_row];
        assert_eq!(solve(&mut bodies, &mut rows, &PARAMS), 1);
        // v = lambda and v + lambda = 1
        assert_relative_eq!(bodies[0].linear_velocity.z, 0.5, epsilon = 1e-5);
        assert_relative_eq!(rows[0].lambda, 0.5, epsilon = 1e-5);
        assert_eq!(rows[1].lambda, 0.0);
    }
}
