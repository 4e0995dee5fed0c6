use super::{
    segment::{closest_point_on_segment, closest_points_segment_segment},
    sphere::{sphere_box, sphere_sphere},
};
use crate::{
    contact::ContactPoint,
    math::Pose,
    shapes::{ShapeBox, ShapeCapsule, ShapePlane},
};
use glam::Vec3;

/// Squared sine of the angle below which two capsule axes count as parallel.
const PARALLEL_SIN_SQ: f32 = 1e-6;

/// Contacts closer than this are merged.
const MERGE_DIST_SQ: f32 = 1e-8;

pub fn capsule_capsule(
    capsule_a: &ShapeCapsule,
    pose_a: &Pose,
    capsule_b: &ShapeCapsule,
    pose_b: &Pose,
) -> Vec<ContactPoint> {
    let (a0, a1) = capsule_a.segment(pose_a);
    let (b0, b1) = capsule_b.segment(pose_b);
    let da = a1 - a0;
    let db = b1 - b0;
    let len_a_sq = da.length_squared();
    let len_b_sq = db.length_squared();

    // parallel axes that overlap along their length touch along a line, report both ends
    let cross_sq = da.cross(db).length_squared();
    if len_a_sq > 1e-12 && len_b_sq > 1e-12 && cross_sq <= PARALLEL_SIN_SQ * len_a_sq * len_b_sq {
        let len_b = len_b_sq.sqrt();
        let dir = db / len_b;
        let ta0 = (a0 - b0).dot(dir);
        let ta1 = (a1 - b0).dot(dir);
        let lo = ta0.min(ta1).max(0.0);
        let hi = ta0.max(ta1).min(len_b);
        if hi - lo > 1e-6 {
            let mut contacts = Vec::with_capacity(2);
            for t in [lo, hi] {
                let on_b = b0 + dir * t;
                let (_, on_a) = closest_point_on_segment(a0, a1, on_b);
                if let Some(contact) =
                    sphere_sphere(on_a, capsule_a.radius, on_b, capsule_b.radius)
                {
                    contacts.push(contact);
                }
            }
            return contacts;
        }
    }

    let (_, _, on_a, on_b) = closest_points_segment_segment(a0, a1, b0, b1);
    sphere_sphere(on_a, capsule_a.radius, on_b, capsule_b.radius)
        .into_iter()
        .collect()
}

pub fn capsule_plane(capsule: &ShapeCapsule, pose: &Pose, plane: &ShapePlane) -> Vec<ContactPoint> {
    let (p0, p1) = capsule.segment(pose);
    let n = plane.normal();
    let mut contacts = Vec::with_capacity(2);
    for end in [p0, p1] {
        let dist = plane.signed_distance(end);
        if dist <= capsule.radius {
            contacts.push(ContactPoint {
                position: end - n * ((capsule.radius + dist) * 0.5),
                normal: -n,
                depth: capsule.radius - dist,
            });
        }
    }
    if capsule.length == 0.0 {
        contacts.truncate(1);
    }
    contacts
}

/// Squared distance from `point` (box local space) to the box.
fn box_distance_sq(cuboid: &ShapeBox, local: Vec3) -> f32 {
    let e = cuboid.half_extents;
    (local - local.clamp(-e, e)).length_squared()
}

pub fn capsule_box(
    capsule: &ShapeCapsule,
    capsule_pose: &Pose,
    cuboid: &ShapeBox,
    box_pose: &Pose,
) -> Vec<ContactPoint> {
    let (p0, p1) = capsule.segment(capsule_pose);
    let l0 = box_pose.inverse_transform_point(p0);
    let l1 = box_pose.inverse_transform_point(p1);

    // the distance from a segment point to a convex set is convex along the segment
    let (mut lo, mut hi) = (0.0_f32, 1.0_f32);
    for _ in 0..32 {
        let m0 = lo + (hi - lo) / 3.0;
        let m1 = hi - (hi - lo) / 3.0;
        if box_distance_sq(cuboid, l0.lerp(l1, m0)) <= box_distance_sq(cuboid, l0.lerp(l1, m1)) {
            hi = m1;
        } else {
            lo = m0;
        }
    }
    let t_closest = 0.5 * (lo + hi);

    let mut contacts: Vec<ContactPoint> = Vec::with_capacity(3);
    for t in [0.0, 1.0, t_closest] {
        let center = p0.lerp(p1, t);
        if let Some(contact) = sphere_box(center, capsule.radius, cuboid, box_pose) {
            let duplicate = contacts
                .iter()
                .any(|c| c.position.distance_squared(contact.position) <= MERGE_DIST_SQ);
            if !duplicate {
                contacts.push(contact);
            }
        }
    }
    contacts
}
