use crate::{
    error::{PhysicsError, Result},
    shapes::Shape,
};
use glam::{Mat3, Vec3};

/// Mass properties of a body about its centre of mass, in body space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Mass {
    mass: f32,
    inertia: Mat3,
    inv_mass: f32,
    inv_inertia: Mat3,
}

impl Default for Mass {
    // unit sphere of unit mass
    fn default() -> Self {
        let i = 0.4;
        Self {
            mass: 1.0,
            inertia: Mat3::from_diagonal(Vec3::splat(i)),
            inv_mass: 1.0,
            inv_inertia: Mat3::from_diagonal(Vec3::splat(1.0 / i)),
        }
    }
}

fn check_total_mass(mass: f32) -> Result<()> {
    if mass.is_finite() && mass > 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::InvalidMass(format!(
            "total mass must be positive and finite, got {}",
            mass
        )))
    }
}

impl Mass {
    /// Validates that `inertia` is symmetric positive-definite.
    pub fn new(mass: f32, inertia: Mat3) -> Result<Self> {
        check_total_mass(mass)?;
        if !inertia.is_finite() {
            return Err(PhysicsError::InvalidMass(
                "inertia tensor is not finite".to_string(),
            ));
        }

        let scale = inertia.x_axis.abs().max_element()
            + inertia.y_axis.abs().max_element()
            + inertia.z_axis.abs().max_element();
        let symmetric = (inertia - inertia.transpose()).abs_diff_eq(Mat3::ZERO, 1e-5 * scale);
        if !symmetric {
            return Err(PhysicsError::InvalidMass(
                "inertia tensor is not symmetric".to_string(),
            ));
        }

        // Sylvester's criterion on the leading principal minors
        let m = inertia;
        let minor1 = m.x_axis.x;
        let minor2 = m.x_axis.x * m.y_axis.y - m.y_axis.x * m.x_axis.y;
        let minor3 = m.determinant();
        if !(minor1 > 0.0 && minor2 > 0.0 && minor3 > 0.0) {
            return Err(PhysicsError::InvalidMass(
                "inertia tensor is not positive-definite".to_string(),
            ));
        }

        Ok(Self {
            mass,
            inertia,
            inv_mass: mass.recip(),
            inv_inertia: inertia.inverse(),
        })
    }

    /// Infinite mass: impulses never change the velocity of the body.
    pub fn infinite() -> Self {
        Self {
            mass: f32::INFINITY,
            inertia: Mat3::ZERO,
            inv_mass: 0.0,
            inv_inertia: Mat3::ZERO,
        }
    }

    pub fn sphere_total(mass: f32, radius: f32) -> Result<Self> {
        Self::from_shape(&Shape::make_sphere(radius)?, mass)
    }

    /// Solid box with full side lengths `lengths`.
    pub fn box_total(mass: f32, lengths: Vec3) -> Result<Self> {
        Self::from_shape(&Shape::make_box(lengths)?, mass)
    }

    /// Capsule along the local Z axis; `length` excludes the two hemispherical caps.
    pub fn capsule_total(mass: f32, radius: f32, length: f32) -> Result<Self> {
        Self::from_shape(&Shape::make_capsule(radius, length)?, mass)
    }

    /// Solid `shape` with total mass `mass`, centred on the body position.
    pub fn from_shape(shape: &Shape, mass: f32) -> Result<Self> {
        check_total_mass(mass)?;
        let inertia = shape.unit_inertia_tensor().ok_or_else(|| {
            PhysicsError::InvalidShape("planes have no mass distribution".to_string())
        })?;
        Self::new(mass, inertia * mass)
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn inertia(&self) -> Mat3 {
        self.inertia
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    #[inline]
    pub fn inv_inertia(&self) -> Mat3 {
        self.inv_inertia
    }

    pub fn is_infinite(&self) -> bool {
        self.inv_mass == 0.0
    }
}
