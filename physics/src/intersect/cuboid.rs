use super::segment::closest_points_segment_segment;
use crate::{
    contact::ContactPoint,
    math::Pose,
    shapes::{ShapeBox, ShapePlane},
};
use glam::{Mat3, Vec3};

pub fn box_plane(cuboid: &ShapeBox, pose: &Pose, plane: &ShapePlane) -> Vec<ContactPoint> {
    let n = plane.normal();
    cuboid
        .corners()
        .iter()
        .filter_map(|corner| {
            let pt = pose.transform_point(*corner);
            let dist = plane.signed_distance(pt);
            if dist <= 0.0 {
                Some(ContactPoint {
                    position: pt - n * (dist * 0.5),
                    normal: -n,
                    depth: -dist,
                })
            } else {
                None
            }
        })
        .collect()
}

struct OrientedBox {
    center: Vec3,
    axes: [Vec3; 3],
    half_extents: Vec3,
}

impl OrientedBox {
    fn new(cuboid: &ShapeBox, pose: &Pose) -> Self {
        let rotation = Mat3::from_quat(pose.orientation);
        Self {
            center: pose.position,
            axes: [rotation.x_axis, rotation.y_axis, rotation.z_axis],
            half_extents: cuboid.half_extents,
        }
    }

    /// Half length of the projection onto the unit vector `axis`.
    fn project(&self, axis: Vec3) -> f32 {
        (0..3)
            .map(|i| self.half_extents[i] * self.axes[i].dot(axis).abs())
            .sum()
    }

    fn corner_towards(&self, dir: Vec3) -> Vec3 {
        (0..3).fold(self.center, |pt, i| {
            let sign = if self.axes[i].dot(dir) >= 0.0 { 1.0 } else { -1.0 };
            pt + self.axes[i] * (sign * self.half_extents[i])
        })
    }

    /// The edge parallel to axis `i` that lies furthest along `dir`.
    fn edge_towards(&self, i: usize, dir: Vec3) -> (Vec3, Vec3) {
        let mut mid = self.center;
        for k in 0..3 {
            if k != i {
                let sign = if self.axes[k].dot(dir) >= 0.0 { 1.0 } else { -1.0 };
                mid += self.axes[k] * (sign * self.half_extents[k]);
            }
        }
        let half = self.axes[i] * self.half_extents[i];
        (mid - half, mid + half)
    }

    /// Corners of the face whose outward normal is most aligned with `dir`, in winding order.
    fn face_towards(&self, dir: Vec3) -> [Vec3; 4] {
        let mut best = 0;
        let mut best_dot = 0.0;
        for i in 0..3 {
            let d = self.axes[i].dot(dir);
            if d.abs() > best_dot {
                best = i;
                best_dot = d.abs();
            }
        }
        let sign = if self.axes[best].dot(dir) >= 0.0 { 1.0 } else { -1.0 };
        let center = self.center + self.axes[best] * (sign * self.half_extents[best]);
        let u_axis = (best + 1) % 3;
        let v_axis = (best + 2) % 3;
        let u = self.axes[u_axis] * self.half_extents[u_axis];
        let v = self.axes[v_axis] * self.half_extents[v_axis];
        [
            center + u + v,
            center - u + v,
            center - u - v,
            center + u - v,
        ]
    }
}

#[derive(Copy, Clone, Debug)]
enum Axis {
    FaceA(usize),
    FaceB(usize),
    Edge(usize, usize),
}

/// Sutherland-Hodgman clip of `polygon` against `dot(normal, x) <= offset`.
fn clip_polygon(polygon: &[Vec3], normal: Vec3, offset: f32) -> Vec<Vec3> {
    let mut clipped = Vec::with_capacity(polygon.len() + 4);
    for (i, &current) in polygon.iter().enumerate() {
        let next = polygon[(i + 1) % polygon.len()];
        let d_current = normal.dot(current) - offset;
        let d_next = normal.dot(next) - offset;
        if d_current <= 0.0 {
            clipped.push(current);
        }
        if (d_current < 0.0 && d_next > 0.0) || (d_current > 0.0 && d_next < 0.0) {
            let t = d_current / (d_current - d_next);
            clipped.push(current.lerp(next, t));
        }
    }
    clipped
}

/// Separating axis test over the 15 candidate axes, followed by face clipping or edge-edge
/// closest points along the axis of minimum penetration.
pub fn box_box(
    box_a: &ShapeBox,
    pose_a: &Pose,
    box_b: &ShapeBox,
    pose_b: &Pose,
) -> Vec<ContactPoint> {
    let a = OrientedBox::new(box_a, pose_a);
    let b = OrientedBox::new(box_b, pose_b);
    let d = b.center - a.center;

    let mut best: Option<(f32, Vec3, Axis)> = None;
    let mut consider = |axis: Vec3, kind: Axis, bias: f32| -> bool {
        let overlap = a.project(axis) + b.project(axis) - d.dot(axis).abs();
        if overlap < 0.0 {
            return false;
        }
        let normal = if d.dot(axis) >= 0.0 { axis } else { -axis };
        match best {
            Some((best_overlap, _, _)) if overlap * bias >= best_overlap => {}
            _ => best = Some((overlap, normal, kind)),
        }
        true
    };

    for i in 0..3 {
        if !consider(a.axes[i], Axis::FaceA(i), 1.0) {
            return Vec::new();
        }
    }
    for i in 0..3 {
        if !consider(b.axes[i], Axis::FaceB(i), 1.0) {
            return Vec::new();
        }
    }
    for i in 0..3 {
        for j in 0..3 {
            let cross = a.axes[i].cross(b.axes[j]);
            let length_sq = cross.length_squared();
            // near parallel edges are covered by the face axes
            if length_sq < 1e-6 {
                continue;
            }
            // prefer face contacts unless an edge axis is clearly better
            if !consider(cross / length_sq.sqrt(), Axis::Edge(i, j), 1.05) {
                return Vec::new();
            }
        }
    }

    let (depth, normal, kind) = match best {
        Some(best) => best,
        None => return Vec::new(),
    };

    match kind {
        Axis::FaceA(_) => clip_faces(&a, &b, normal, depth, false),
        Axis::FaceB(_) => clip_faces(&b, &a, -normal, depth, true),
        Axis::Edge(i, j) => {
            let (a0, a1) = a.edge_towards(i, normal);
            let (b0, b1) = b.edge_towards(j, -normal);
            let (_, _, on_a, on_b) = closest_points_segment_segment(a0, a1, b0, b1);
            vec![ContactPoint {
                position: (on_a + on_b) * 0.5,
                normal,
                depth,
            }]
        }
    }
}

/// Clips the incident face of `incident` against the reference face of `reference`.
///
/// `ref_normal` points out of the reference box towards the incident box. When `flip` is set the
/// reference box is the second box of the pair and the reported normals are negated.
fn clip_faces(
    reference: &OrientedBox,
    incident: &OrientedBox,
    ref_normal: Vec3,
    depth: f32,
    flip: bool,
) -> Vec<ContactPoint> {
    let ref_face = reference.face_towards(ref_normal);
    let incident_face = incident.face_towards(-ref_normal);
    let ref_offset = ref_normal.dot(ref_face[0]);

    // side planes of the reference face
    let mut polygon = incident_face.to_vec();
    for i in 0..4 {
        if polygon.is_empty() {
            break;
        }
        let edge = ref_face[(i + 1) % 4] - ref_face[i];
        let mut side = edge.cross(ref_normal);
        let center = (ref_face[0] + ref_face[2]) * 0.5;
        if side.dot(ref_face[i] - center) < 0.0 {
            side = -side;
        }
        let side = side.normalize_or_zero();
        polygon = clip_polygon(&polygon, side, side.dot(ref_face[i]));
    }

    let normal = if flip { -ref_normal } else { ref_normal };
    let mut contacts: Vec<ContactPoint> = polygon
        .iter()
        .filter_map(|&pt| {
            let separation = ref_normal.dot(pt) - ref_offset;
            if separation <= 0.0 {
                Some(ContactPoint {
                    position: pt - ref_normal * (separation * 0.5),
                    normal,
                    depth: -separation,
                })
            } else {
                None
            }
        })
        .collect();

    if contacts.is_empty() {
        // clipping lost every point, fall back to the deepest incident corner
        let pt = incident.corner_towards(-ref_normal);
        contacts.push(ContactPoint {
            position: pt + ref_normal * (depth * 0.5),
            normal,
            depth,
        });
    }
    contacts
}
