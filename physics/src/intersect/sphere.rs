use super::segment::closest_point_on_segment;
use crate::{
    contact::ContactPoint,
    math::Pose,
    shapes::{ShapeBox, ShapeCapsule, ShapePlane},
};
use glam::Vec3;

/// Separating direction used when two centres coincide.
const FALLBACK_NORMAL: Vec3 = Vec3::Z;

pub fn sphere_sphere(
    pos_a: Vec3,
    radius_a: f32,
    pos_b: Vec3,
    radius_b: f32,
) -> Option<ContactPoint> {
    let ab = pos_b - pos_a;
    let radius_ab = radius_a + radius_b;
    let length_squared = ab.length_squared();
    if length_squared > radius_ab * radius_ab {
        return None;
    }

    let length = length_squared.sqrt();
    let normal = if length > 1e-6 {
        ab / length
    } else {
        FALLBACK_NORMAL
    };
    let depth = radius_ab - length;
    let pt_on_a = pos_a + normal * radius_a;
    let pt_on_b = pos_b - normal * radius_b;
    Some(ContactPoint {
        position: (pt_on_a + pt_on_b) * 0.5,
        normal,
        depth,
    })
}

pub fn sphere_plane(pos: Vec3, radius: f32, plane: &ShapePlane) -> Option<ContactPoint> {
    let dist = plane.signed_distance(pos);
    if dist > radius {
        return None;
    }
    let n = plane.normal();
    Some(ContactPoint {
        // midway between the deepest point of the sphere and the plane
        position: pos - n * ((radius + dist) * 0.5),
        normal: -n,
        depth: radius - dist,
    })
}

pub fn sphere_box(
    pos: Vec3,
    radius: f32,
    cuboid: &ShapeBox,
    box_pose: &Pose,
) -> Option<ContactPoint> {
    let e = cuboid.half_extents;
    let local = box_pose.inverse_transform_point(pos);
    let clamped = local.clamp(-e, e);

    if clamped != local {
        // centre outside the box
        let delta = local - clamped;
        let dist_sq = delta.length_squared();
        if dist_sq > radius * radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        let box_normal = box_pose.transform_vector(delta / dist);
        let pt_on_box = box_pose.transform_point(clamped);
        let pt_on_sphere = pos - box_normal * radius;
        return Some(ContactPoint {
            position: (pt_on_box + pt_on_sphere) * 0.5,
            normal: -box_normal,
            depth: radius - dist,
        });
    }

    // centre inside the box, push out through the nearest face
    let face_dist = e - local.abs();
    let axis = if face_dist.x <= face_dist.y && face_dist.x <= face_dist.z {
        0
    } else if face_dist.y <= face_dist.z {
        1
    } else {
        2
    };
    let sign = if local[axis] >= 0.0 { 1.0 } else { -1.0 };
    let mut local_normal = Vec3::ZERO;
    local_normal[axis] = sign;
    let mut on_face = local;
    on_face[axis] = sign * e[axis];

    let box_normal = box_pose.transform_vector(local_normal);
    let pt_on_box = box_pose.transform_point(on_face);
    let pt_on_sphere = pos - box_normal * radius;
    Some(ContactPoint {
        position: (pt_on_box + pt_on_sphere) * 0.5,
        normal: -box_normal,
        depth: radius + face_dist[axis],
    })
}

pub fn sphere_capsule(
    pos: Vec3,
    radius: f32,
    capsule: &ShapeCapsule,
    capsule_pose: &Pose,
) -> Option<ContactPoint> {
    let (p0, p1) = capsule.segment(capsule_pose);
    let (_, closest) = closest_point_on_segment(p0, p1, pos);
    sphere_sphere(pos, radius, closest, capsule.radius)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shapes::Shape;
    use approx::assert_relative_eq;
    use glam::Quat;

    fn unit_box() -> ShapeBox {
        match Shape::make_box(Vec3::ONE).unwrap() {
            Shape::Box(cuboid) => cuboid,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_sphere_sphere() {
        let contact = sphere_sphere(Vec3::ZERO, 1.0, Vec3::new(1.5, 0.0, 0.0), 1.0).unwrap();
        assert_eq!(contact.normal, Vec3::X);
        assert_relative_eq!(contact.depth, 0.5);
        assert_relative_eq!(contact.position.x, 0.75);
        assert!(sphere_sphere(Vec3::ZERO, 1.0, Vec3::new(2.5, 0.0, 0.0), 1.0).is_none());

        // coincident centres still give a finite normal
        let contact = sphere_sphere(Vec3::ONE, 1.0, Vec3::ONE, 0.5).unwrap();
        assert!(contact.normal.is_finite());
        assert_relative_eq!(contact.depth, 1.5);
    }

    #[test]
    fn test_sphere_plane() {
        let plane = ShapePlane::new(Vec3::Z, 0.0).unwrap();
        let contact = sphere_plane(Vec3::new(0.0, 0.0, 0.15), 0.2, &plane).unwrap();
        assert_eq!(contact.normal, -Vec3::Z);
        assert_relative_eq!(contact.depth, 0.05, epsilon = 1e-6);
        assert_relative_eq!(contact.position.z, -0.025, epsilon = 1e-6);
        assert!(sphere_plane(Vec3::new(0.0, 0.0, 0.25), 0.2, &plane).is_none());
    }

    #[test]
    fn test_sphere_box() {
        let cuboid = unit_box();
        let pose = Pose::IDENTITY;

        let contact = sphere_box(Vec3::new(0.0, 0.0, 0.6), 0.2, &cuboid, &pose).unwrap();
        assert!(contact.normal.abs_diff_eq(-Vec3::Z, 1e-6));
        assert_relative_eq!(contact.depth, 0.1, epsilon = 1e-6);

        // centre inside, nearest face is +x
        let contact = sphere_box(Vec3::new(0.4, 0.1, 0.0), 0.2, &cuboid, &pose).unwrap();
        assert!(contact.normal.abs_diff_eq(-Vec3::X, 1e-6));
        assert_relative_eq!(contact.depth, 0.3, epsilon = 1e-6);

        // corner region of a rotated box
        let pose = Pose::new(Vec3::ZERO, Quat::from_rotation_z(core::f32::consts::FRAC_PI_4));
        assert!(sphere_box(Vec3::new(0.8, 0.0, 0.0), 0.2, &cuboid, &pose).is_some());
        assert!(sphere_box(Vec3::new(0.95, 0.0, 0.0), 0.2, &cuboid, &pose).is_none());
    }

    #[test]
    fn test_sphere_capsule() {
        let capsule = ShapeCapsule {
            radius: 0.1,
            length: 1.0,
        };
        let pose = Pose::IDENTITY;
        let contact = sphere_capsule(Vec3::new(0.25, 0.0, 0.4), 0.2, &capsule, &pose).unwrap();
        assert!(contact.normal.abs_diff_eq(-Vec3::X, 1e-6));
        assert_relative_eq!(contact.depth, 0.05, epsilon = 1e-6);
        assert!(sphere_capsule(Vec3::new(0.0, 0.0, 0.85), 0.2, &capsule, &pose).is_none());
    }
}
