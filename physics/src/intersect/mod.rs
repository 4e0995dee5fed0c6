mod capsule;
mod cuboid;
mod segment;
mod sphere;

pub use capsule::{capsule_box, capsule_capsule, capsule_plane};
pub use cuboid::{box_box, box_plane};
pub use segment::{closest_point_on_segment, closest_points_segment_segment};
pub use sphere::{sphere_box, sphere_capsule, sphere_plane, sphere_sphere};

use crate::{contact::cull_contacts, contact::ContactPoint, math::Pose, shapes::Shape};

/// Contacts between two posed shapes, at most `max_contacts` of them.
///
/// Normals point from `shape_a` towards `shape_b`. Two planes never collide.
pub fn collide(
    shape_a: &Shape,
    pose_a: &Pose,
    shape_b: &Shape,
    pose_b: &Pose,
    max_contacts: usize,
) -> Vec<ContactPoint> {
    if max_contacts == 0 {
        return Vec::new();
    }

    let mut contacts = match (shape_a, shape_b) {
        (Shape::Sphere(a), Shape::Sphere(b)) => {
            sphere_sphere(pose_a.position, a.radius, pose_b.position, b.radius)
                .into_iter()
                .collect()
        }
        (Shape::Sphere(a), Shape::Box(b)) => sphere_box(pose_a.position, a.radius, b, pose_b)
            .into_iter()
            .collect(),
        (Shape::Sphere(a), Shape::Capsule(b)) => {
            sphere_capsule(pose_a.position, a.radius, b, pose_b)
                .into_iter()
                .collect()
        }
        (Shape::Sphere(a), Shape::Plane(b)) => sphere_plane(pose_a.position, a.radius, b)
            .into_iter()
            .collect(),
        (Shape::Box(a), Shape::Box(b)) => box_box(a, pose_a, b, pose_b),
        (Shape::Box(a), Shape::Plane(b)) => box_plane(a, pose_a, b),
        (Shape::Capsule(a), Shape::Box(b)) => capsule_box(a, pose_a, b, pose_b),
        (Shape::Capsule(a), Shape::Capsule(b)) => capsule_capsule(a, pose_a, b, pose_b),
        (Shape::Capsule(a), Shape::Plane(b)) => capsule_plane(a, pose_a, b),
        (Shape::Plane(_), Shape::Plane(_)) => Vec::new(),
        // remaining pairs are the mirror of one above
        _ => {
            return collide(shape_b, pose_b, shape_a, pose_a, max_contacts)
                .into_iter()
                .map(ContactPoint::flipped)
                .collect();
        }
    };

    cull_contacts(&mut contacts, max_contacts);
    contacts
}
