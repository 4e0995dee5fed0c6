use crate::error::{PhysicsError, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Hard cap on the number of contacts generated for a single geometry pair.
pub const MAX_CONTACTS_CAP: usize = 16;

/// Error reduction and constraint force mixing for a group of constraint rows.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Softness {
    /// Fraction of positional error corrected per step, in `[0, 1]`.
    pub erp: f32,
    /// Constraint force mixing, `>= 0`. Zero is a hard constraint.
    pub cfm: f32,
}

impl Softness {
    pub fn new(erp: f32, cfm: f32) -> Result<Self> {
        let softness = Self { erp, cfm };
        softness.validate()?;
        Ok(softness)
    }

    /// Softness of a spring with stiffness `kp` and damping `kd` integrated with step size `h`.
    ///
    /// erp = h kp / (h kp + kd), cfm = 1 / (h kp + kd)
    pub fn from_spring_damper(h: f32, kp: f32, kd: f32) -> Result<Self> {
        if !(h.is_finite() && h > 0.0) {
            return Err(PhysicsError::InvalidStepSize(h));
        }
        if !(kp.is_finite() && kp >= 0.0) {
            return Err(PhysicsError::InvalidParameter {
                name: "kp",
                value: kp,
            });
        }
        if !(kd.is_finite() && kd >= 0.0) {
            return Err(PhysicsError::InvalidParameter {
                name: "kd",
                value: kd,
            });
        }
        let denom = h * kp + kd;
        if denom <= 0.0 {
            return Err(PhysicsError::InvalidParameter {
                name: "h * kp + kd",
                value: denom,
            });
        }
        Self::new(h * kp / denom, 1.0 / denom)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.erp.is_finite() && (0.0..=1.0).contains(&self.erp)) {
            return Err(PhysicsError::InvalidParameter {
                name: "erp",
                value: self.erp,
            });
        }
        if !(self.cfm.is_finite() && self.cfm >= 0.0) {
            return Err(PhysicsError::InvalidParameter {
                name: "cfm",
                value: self.cfm,
            });
        }
        Ok(())
    }

    /// The softer of the two: the lower error reduction and the higher force mixing.
    pub fn softer(self, other: Softness) -> Softness {
        Softness {
            erp: self.erp.min(other.erp),
            cfm: self.cfm.max(other.cfm),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadPhaseKind {
    /// Sorted bound endpoints along a fixed axis followed by a full bounds test.
    #[default]
    SweepAndPrune,
    /// Tests every pair.
    BruteForce,
}

/// Global simulation settings. Every field has a default so a partial JSON document is enough.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: Vec3,
    /// Step size used by [`crate::world::World::step_default`].
    pub step_size: f32,
    pub erp: f32,
    pub cfm: f32,
    pub solver_iterations: u32,
    /// Fraction of last step's joint impulses applied before solving, in `[0, 1]`.
    pub warm_start: f32,
    pub max_contacts_per_pair: usize,
    #[serde(with = "unbounded")]
    pub contact_max_correcting_velocity: f32,
    pub contact_surface_layer: f32,
    #[serde(with = "unbounded")]
    pub max_angular_speed: f32,
    pub gyroscopic: bool,
    pub skip_connected_pairs: bool,
    pub broad_phase: BroadPhaseKind,
    /// Lower bound on the regularisation of a row whose effective mass is degenerate.
    pub min_cfm: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, 0.0, -9.81),
            step_size: 0.01,
            erp: 0.2,
            cfm: 1e-5,
            solver_iterations: 20,
            warm_start: 0.0,
            max_contacts_per_pair: 4,
            contact_max_correcting_velocity: f32::INFINITY,
            contact_surface_layer: 0.0,
            max_angular_speed: f32::INFINITY,
            gyroscopic: true,
            skip_connected_pairs: true,
            broad_phase: BroadPhaseKind::SweepAndPrune,
            min_cfm: 1e-9,
        }
    }
}

// JSON has no infinity, an unbounded limit is written as `null`
mod unbounded {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
        Ok(Option::<f32>::deserialize(deserializer)?.unwrap_or(f32::INFINITY))
    }
}

fn invalid(name: &'static str, value: f32) -> PhysicsError {
    PhysicsError::InvalidParameter { name, value }
}

impl WorldConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: WorldConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn softness(&self) -> Softness {
        Softness {
            erp: self.erp,
            cfm: self.cfm,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.gravity.is_finite() {
            return Err(invalid("gravity", self.gravity.length()));
        }
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(PhysicsError::InvalidStepSize(self.step_size));
        }
        self.softness().validate()?;
        if self.solver_iterations == 0 {
            return Err(invalid("solver_iterations", 0.0));
        }
        if !(self.warm_start.is_finite() && (0.0..=1.0).contains(&self.warm_start)) {
            return Err(invalid("warm_start", self.warm_start));
        }
        if self.max_contacts_per_pair == 0 || self.max_contacts_per_pair > MAX_CONTACTS_CAP {
            return Err(invalid(
                "max_contacts_per_pair",
                self.max_contacts_per_pair as f32,
            ));
        }
        // infinity is allowed for the two speed limits, NaN and negatives are not
        if self.contact_max_correcting_velocity.is_nan()
            || self.contact_max_correcting_velocity < 0.0
        {
            return Err(invalid(
                "contact_max_correcting_velocity",
                self.contact_max_correcting_velocity,
            ));
        }
        if !(self.contact_surface_layer.is_finite() && self.contact_surface_layer >= 0.0) {
            return Err(invalid("contact_surface_layer", self.contact_surface_layer));
        }
        if self.max_angular_speed.is_nan() || self.max_angular_speed <= 0.0 {
            return Err(invalid("max_angular_speed", self.max_angular_speed));
        }
        if !(self.min_cfm.is_finite() && self.min_cfm >= 0.0) {
            return Err(invalid("min_cfm", self.min_cfm));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spring_damper_softness() {
        let h = 0.01;
        let (kp, kd) = (200.0, 4.0);
        let softness = Softness::from_spring_damper(h, kp, kd).unwrap();
        assert_relative_eq!(softness.erp, h * kp / (h * kp + kd));
        assert_relative_eq!(softness.cfm, 1.0 / (h * kp + kd));

        // pure damper never corrects position
        let damper = Softness::from_spring_damper(h, 0.0, 2.0).unwrap();
        assert_eq!(damper.erp, 0.0);
        assert_relative_eq!(damper.cfm, 0.5);

        assert!(Softness::from_spring_damper(h, 0.0, 0.0).is_err());
        assert!(Softness::from_spring_damper(0.0, 1.0, 1.0).is_err());
        assert!(Softness::from_spring_damper(h, -1.0, 1.0).is_err());
    }

    #[test]
    fn test_softness_validation() {
        assert!(Softness::new(0.5, 0.0).is_ok());
        assert!(Softness::new(1.5, 0.0).is_err());
        assert!(Softness::new(0.5, -1.0).is_err());
        assert!(Softness::new(f32::NAN, 0.0).is_err());

        let a = Softness::new(0.8, 1e-5).unwrap();
        let b = Softness::new(0.2, 1e-6).unwrap();
        assert_eq!(a.softer(b), Softness { erp: 0.2, cfm: 1e-5 });
    }

    #[test]
    fn test_config_from_json() {
        let config = WorldConfig::from_json(r#"{ "erp": 0.9, "cfm": 1e-4, "gravity": [0, 0, -9.81] }"#)
            .unwrap();
        assert_eq!(config.erp, 0.9);
        assert_eq!(config.cfm, 1e-4);
        assert_eq!(config.solver_iterations, WorldConfig::default().solver_iterations);

        assert!(matches!(
            WorldConfig::from_json(r#"{ "erp": 2.0 }"#),
            Err(PhysicsError::InvalidParameter { name: "erp", .. })
        ));
        assert!(matches!(
            WorldConfig::from_json(r#"{ "step_size": -0.1 }"#),
            Err(PhysicsError::InvalidStepSize(_))
        ));
        assert!(matches!(
            WorldConfig::from_json("not json"),
            Err(PhysicsError::Config(_))
        ));
        assert!(WorldConfig::from_json(r#"{ "max_contacts_per_pair": 17 }"#).is_err());
    }

    #[test]
    fn test_unbounded_limits_survive_json() {
        let json = WorldConfig::default().to_json().unwrap();
        let config = WorldConfig::from_json(&json).unwrap();
        assert_eq!(config, WorldConfig::default());
        assert!(config.max_angular_speed.is_infinite());

        let config = WorldConfig::from_json(r#"{ "contact_max_correcting_velocity": 2.5 }"#).unwrap();
        assert_eq!(config.contact_max_correcting_velocity, 2.5);
    }

    #[test]
    fn test_default_is_valid() {
        WorldConfig::default().validate().unwrap();
    }
}
