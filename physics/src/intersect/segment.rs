use glam::Vec3;

const EPSILON: f32 = 1e-12;

/// Closest point to `point` on the segment `a..b`, with its parameter in `[0, 1]`.
pub fn closest_point_on_segment(a: Vec3, b: Vec3, point: Vec3) -> (f32, Vec3) {
    let ab = b - a;
    let length_sq = ab.length_squared();
    if length_sq <= EPSILON {
        return (0.0, a);
    }
    let t = ((point - a).dot(ab) / length_sq).clamp(0.0, 1.0);
    (t, a + ab * t)
}

/// Closest points between the segments `p1..q1` and `p2..q2`.
///
/// Returns the parameters along each segment followed by the two points. Parallel segments
/// resolve to the start of the first segment.
pub fn closest_points_segment_segment(
    p1: Vec3,
    q1: Vec3,
    p2: Vec3,
    q2: Vec3,
) -> (f32, f32, Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    if a <= EPSILON && e <= EPSILON {
        return (0.0, 0.0, p1, p2);
    }

    let (s, t) = if a <= EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s = if denom > EPSILON * a * e {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    (s, t, p1 + d1 * s, p2 + d2 * t)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_segment() {
        let (t, pt) = closest_point_on_segment(Vec3::ZERO, Vec3::X * 2.0, Vec3::new(0.5, 1.0, 0.0));
        assert_relative_eq!(t, 0.25);
        assert_eq!(pt, Vec3::new(0.5, 0.0, 0.0));
        let (t, pt) = closest_point_on_segment(Vec3::ZERO, Vec3::X, Vec3::new(-3.0, 1.0, 0.0));
        assert_eq!(t, 0.0);
        assert_eq!(pt, Vec3::ZERO);
        // degenerate segment
        let (_, pt) = closest_point_on_segment(Vec3::ONE, Vec3::ONE, Vec3::ZERO);
        assert_eq!(pt, Vec3::ONE);
    }

    #[test]
    fn test_crossing_segments() {
        let (s, t, c1, c2) = closest_points_segment_segment(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        );
        assert_relative_eq!(s, 0.5);
        assert_relative_eq!(t, 0.5);
        assert!(c1.abs_diff_eq(Vec3::ZERO, 1e-6));
        assert!(c2.abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn test_parallel_segments_are_finite() {
        let (s, t, c1, c2) = closest_points_segment_segment(
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(0.5, 1.0, 0.0),
            Vec3::new(1.5, 1.0, 0.0),
        );
        assert!(s.is_finite() && t.is_finite());
        assert_relative_eq!(c1.distance(c2), 1.0, epsilon = 1e-6);
    }
}
