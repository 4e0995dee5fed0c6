use glam::Vec3;
use std::ops::{Add, AddAssign};

/// World space axis aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub mins: Vec3,
    pub maxs: Vec3,
}

impl Bounds {
    /// Empty bounds, ready to be expanded.
    pub fn new() -> Bounds {
        Bounds {
            mins: Vec3::splat(f32::MAX),
            maxs: Vec3::splat(-f32::MAX),
        }
    }

    /// Bounds covering all of space.
    pub fn everything() -> Bounds {
        Bounds {
            mins: Vec3::splat(-f32::MAX),
            maxs: Vec3::splat(f32::MAX),
        }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Bounds {
            mins: center - half_extents,
            maxs: center + half_extents,
        }
    }

    pub fn from_points(pts: &[Vec3]) -> Self {
        pts.iter().fold(Bounds::new(), |acc, pt| acc + *pt)
    }

    pub fn intersects(&self, rhs: &Self) -> bool {
        !(self.maxs.cmplt(rhs.mins).any() || rhs.maxs.cmplt(self.mins).any())
    }

    pub fn expand_by_point(&mut self, pt: Vec3) {
        self.add_assign(pt);
    }

    pub fn expanded(&self, margin: f32) -> Self {
        Bounds {
            mins: self.mins - Vec3::splat(margin),
            maxs: self.maxs + Vec3::splat(margin),
        }
    }

    pub fn width(&self) -> Vec3 {
        self.maxs - self.mins
    }

    pub fn center(&self) -> Vec3 {
        (self.maxs + self.mins) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.maxs - self.mins) * 0.5
    }

    /// Smallest value of `dot(normal, x)` over the box.
    pub fn min_along(&self, normal: Vec3) -> f32 {
        let support = Vec3::select(normal.cmpge(Vec3::ZERO), self.mins, self.maxs);
        normal.dot(support)
    }
}

impl Default for Bounds {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Add<Vec3> for Bounds {
    type Output = Self;
    fn add(self, pt: Vec3) -> Self::Output {
        Bounds {
            mins: Vec3::select(pt.cmplt(self.mins), pt, self.mins),
            maxs: Vec3::select(pt.cmpgt(self.maxs), pt, self.maxs),
        }
    }
}

impl AddAssign<Vec3> for Bounds {
    fn add_assign(&mut self, pt: Vec3) {
        self.mins = Vec3::select(pt.cmplt(self.mins), pt, self.mins);
        self.maxs = Vec3::select(pt.cmpgt(self.maxs), pt, self.maxs);
    }
}

#[cfg(test)]
mod test {
    use super::Bounds;
    use glam::Vec3;

    #[test]
    fn test_intersects() {
        let a = Bounds::from_points(&[Vec3::ZERO, Vec3::ONE]);
        let b = Bounds::from_center_half_extents(Vec3::splat(1.5), Vec3::splat(0.5));
        let c = Bounds::from_center_half_extents(Vec3::new(3.0, 0.5, 0.5), Vec3::splat(0.5));
        // touching faces count as overlap
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(Bounds::everything().intersects(&c));
        assert!(!Bounds::new().intersects(&a));
    }

    #[test]
    fn test_min_along() {
        let a = Bounds::from_points(&[Vec3::new(-1.0, 2.0, 3.0), Vec3::new(1.0, 4.0, 5.0)]);
        assert_eq!(a.min_along(Vec3::Z), 3.0);
        assert_eq!(a.min_along(-Vec3::Z), -5.0);
        assert_eq!(a.min_along(Vec3::X), -1.0);
    }
}
