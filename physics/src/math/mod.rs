pub mod glam_ext;
mod pose;
mod vector;

pub use pose::Pose;
pub use vector::VecN;

use core::f32::consts::{PI, TAU};

pub(crate) fn dot<const N: usize>(a: &[f32; N], b: &[f32; N]) -> f32 {
    a.iter()
        .zip(b.iter())
        .fold(0.0, |dot, (&lhs, &rhs)| dot + lhs * rhs)
}

/// Wraps an angle in radians into `[-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    // rem_euclid can return TAU for tiny negative inputs
    if wrapped > PI {
        wrapped - TAU
    } else {
        wrapped
    }
}
