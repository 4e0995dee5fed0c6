use crate::{
    arena::{BodyHandle, GeomHandle},
    geom::ContactSurface,
};
use glam::Vec3;

/// A single narrow phase result.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactPoint {
    /// World space point midway between the two surfaces.
    pub position: Vec3,
    /// Unit normal pointing from the first geometry towards the second.
    pub normal: Vec3,
    /// Penetration depth, zero when the surfaces just touch.
    pub depth: f32,
}

impl ContactPoint {
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// Contact generated during a step. Only lives until the end of that step.
#[derive(Copy, Clone, Debug)]
pub struct Contact {
    pub geom_a: GeomHandle,
    pub geom_b: GeomHandle,
    pub body_a: Option<BodyHandle>,
    pub body_b: Option<BodyHandle>,
    pub point: ContactPoint,
    pub surface: ContactSurface,
}

/// Reduces `points` to at most `max_contacts`, deepest first, then spread out.
pub(crate) fn cull_contacts(points: &mut Vec<ContactPoint>, max_contacts: usize) {
    if points.len() <= max_contacts {
        return;
    }
    if max_contacts == 0 {
        points.clear();
        return;
    }

    let mut remaining = std::mem::take(points);
    let mut deepest = 0;
    for (i, point) in remaining.iter().enumerate() {
        if point.depth > remaining[deepest].depth {
            deepest = i;
        }
    }
    points.push(remaining.remove(deepest));

    while points.len() < max_contacts {
        // furthest remaining point from everything chosen so far
        let mut best = 0;
        let mut best_dist = -1.0;
        for (i, candidate) in remaining.iter().enumerate() {
            let dist = points
                .iter()
                .map(|chosen| chosen.position.distance_squared(candidate.position))
                .fold(f32::MAX, f32::min);
            if dist > best_dist {
                best = i;
                best_dist = dist;
            }
        }
        points.push(remaining.remove(best));
    }
}

#[cfg(test)]
mod test {
    use super::{cull_contacts, ContactPoint};
    use glam::Vec3;

    fn point(x: f32, y: f32, depth: f32) -> ContactPoint {
        ContactPoint {
            position: Vec3::new(x, y, 0.0),
            normal: Vec3::Z,
            depth,
        }
    }

    #[test]
    fn test_cull_keeps_deepest_and_spread() {
        let mut points = vec![
            point(0.0, 0.0, 0.01),
            point(0.01, 0.0, 0.02),
            point(1.0, 0.0, 0.01),
            point(0.0, 1.0, 0.05),
            point(1.0, 1.0, 0.01),
        ];
        cull_contacts(&mut points, 3);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], point(0.0, 1.0, 0.05));
        assert_eq!(points[1], point(1.0, 0.0, 0.01));
        assert!(points.iter().all(|p| p.depth >= 0.0));

        let mut few = vec![point(0.0, 0.0, 0.0)];
        cull_contacts(&mut few, 4);
        assert_eq!(few.len(), 1);
    }
}
