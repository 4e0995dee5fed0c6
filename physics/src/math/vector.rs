use super::dot;
use core::ops::{Add, AddAssign, Deref, DerefMut, Mul, Neg, Sub};
use glam::Vec3;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VecN<const N: usize>(pub(crate) [f32; N]);

impl<const N: usize> VecN<N> {
    #[inline]
    pub const fn zero() -> Self {
        Self([0.; N])
    }

    #[inline]
    pub fn dot(&self, rhs: &Self) -> f32 {
        dot(&self.0, &rhs.0)
    }
}

impl<const N: usize> Default for VecN<N> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const N: usize> Deref for VecN<N> {
    type Target = [f32; N];
    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<const N: usize> DerefMut for VecN<N> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<const N: usize> Add<VecN<N>> for VecN<N> {
    type Output = VecN<N>;
    #[inline]
    fn add(self, rhs: VecN<N>) -> Self::Output {
        let mut tmp = self;
        for n in 0..N {
            tmp[n] += rhs[n];
        }
        tmp
    }
}

impl<const N: usize> Mul<f32> for VecN<N> {
    type Output = VecN<N>;
    #[inline]
    fn mul(self, rhs: f32) -> Self::Output {
        let mut tmp = self;
        for n in 0..N {
            tmp[n] *= rhs;
        }
        tmp
    }
}

impl<const N: usize> Sub<VecN<N>> for VecN<N> {
    type Output = VecN<N>;
    #[inline]
    fn sub(self, rhs: VecN<N>) -> Self::Output {
        let mut tmp = self;
        for n in 0..N {
            tmp[n] -= rhs[n];
        }
        tmp
    }
}

impl<const N: usize> AddAssign<VecN<N>> for VecN<N> {
    #[inline]
    fn add_assign(&mut self, rhs: VecN<N>) {
        for n in 0..N {
            self[n] += rhs[n];
        }
    }
}

impl<const N: usize> Neg for VecN<N> {
    type Output = VecN<N>;
    #[inline]
    fn neg(self) -> Self::Output {
        self * -1.0
    }
}

impl VecN<12> {
    /// Builds a constraint row `[lin_a, ang_a, lin_b, ang_b]`.
    pub fn from_row(lin_a: Vec3, ang_a: Vec3, lin_b: Vec3, ang_b: Vec3) -> Self {
        let mut row = Self::zero();
        lin_a.write_to_slice(&mut row[0..3]);
        ang_a.write_to_slice(&mut row[3..6]);
        lin_b.write_to_slice(&mut row[6..9]);
        ang_b.write_to_slice(&mut row[9..12]);
        row
    }

    #[inline]
    pub fn lin_a(&self) -> Vec3 {
        Vec3::from_slice(&self[0..3])
    }

    #[inline]
    pub fn ang_a(&self) -> Vec3 {
        Vec3::from_slice(&self[3..6])
    }

    #[inline]
    pub fn lin_b(&self) -> Vec3 {
        Vec3::from_slice(&self[6..9])
    }

    #[inline]
    pub fn ang_b(&self) -> Vec3 {
        Vec3::from_slice(&self[9..12])
    }

    pub fn is_finite(&self) -> bool {
        self.iter().all(|x| x.is_finite())
    }
}
