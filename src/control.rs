//! Control laws that run outside the simulation core, once per physics step.

use rigid_physics::{math::wrap_angle, JointHandle, JointParam, Result, World};

/// Drives a hinge towards a target angle by setting its motor velocity proportional to the
/// wrapped angle error.
#[derive(Copy, Clone, Debug)]
pub struct HingeServo {
    pub joint: JointHandle,
    pub kp: f32,
    pub fmax: f32,
}

impl HingeServo {
    pub fn apply(&self, world: &mut World, target: f32) -> Result<()> {
        let angle = world.joint_position(self.joint)?;
        let error = wrap_angle(target - angle);
        world.set_joint_param(self.joint, JointParam::Vel, self.kp * error)?;
        world.set_joint_param(self.joint, JointParam::FMax, self.fmax)
    }
}

/// Same as [`HingeServo`] for a slider displacement, without wrapping.
#[derive(Copy, Clone, Debug)]
pub struct SliderServo {
    pub joint: JointHandle,
    pub kp: f32,
    pub fmax: f32,
}

impl SliderServo {
    pub fn apply(&self, world: &mut World, target: f32) -> Result<()> {
        let position = world.joint_position(self.joint)?;
        world.set_joint_param(self.joint, JointParam::Vel, self.kp * (target - position))?;
        world.set_joint_param(self.joint, JointParam::FMax, self.fmax)
    }
}

/// Proportional and derivative gains for one joint.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Gains {
    pub kp: f32,
    pub kv: f32,
}

/// PD controller producing a hinge torque. The joint rate is estimated from the angle seen at
/// the previous step.
#[derive(Copy, Clone, Debug)]
pub struct PdTorque {
    pub joint: JointHandle,
    pub gains: Gains,
    prev_angle: Option<f32>,
}

impl PdTorque {
    pub fn new(joint: JointHandle, gains: Gains) -> Self {
        Self {
            joint,
            gains,
            prev_angle: None,
        }
    }

    /// Torque for `target` and `target_rate`, without applying it.
    pub fn torque(&mut self, angle: f32, target: f32, target_rate: f32, h: f32) -> f32 {
        let rate = self
            .prev_angle
            .map_or(0.0, |prev| wrap_angle(angle - prev) / h);
        self.prev_angle = Some(angle);
        self.gains.kp * wrap_angle(target - angle) + self.gains.kv * (target_rate - rate)
    }

    pub fn apply(&mut self, world: &mut World, target: f32, target_rate: f32, h: f32) -> Result<f32> {
        let angle = world.joint_position(self.joint)?;
        let torque = self.torque(angle, target, target_rate, h);
        world.add_joint_torque(self.joint, torque)?;
        Ok(torque)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec3;
    use rigid_physics::{Body, JointType, Mass, WorldConfig};

    fn hinged_world() -> (World, JointHandle) {
        let mut world = World::new(WorldConfig {
            gravity: Vec3::ZERO,
            ..WorldConfig::default()
        })
        .unwrap();
        let body = world.add_body(Body::new(Vec3::ZERO, Mass::default())).unwrap();
        let hinge = world.create_joint(JointType::Hinge).unwrap();
        world.attach_joint(hinge, Some(body), None).unwrap();
        (world, hinge)
    }

    #[test]
    fn test_hinge_servo_takes_short_way_round() {
        let (mut world, hinge) = hinged_world();
        let servo = HingeServo {
            joint: hinge,
            kp: 10.0,
            fmax: 1000.0,
        };
        // from 0 to just under PI is positive, just over PI wraps to negative
        servo.apply(&mut world, 3.0).unwrap();
        assert!(world.joint_param(hinge, JointParam::Vel).unwrap() > 0.0);
        servo.apply(&mut world, 3.5).unwrap();
        assert!(world.joint_param(hinge, JointParam::Vel).unwrap() < 0.0);
        assert_eq!(world.joint_param(hinge, JointParam::FMax).unwrap(), 1000.0);
    }

    #[test]
    fn test_hinge_servo_reaches_target() {
        let (mut world, hinge) = hinged_world();
        let servo = HingeServo {
            joint: hinge,
            kp: 10.0,
            fmax: 1000.0,
        };
        for _ in 0..300 {
            servo.apply(&mut world, 0.75).unwrap();
            world.step(0.01).unwrap();
        }
        assert_relative_eq!(world.joint_position(hinge).unwrap(), 0.75, epsilon = 1e-3);
    }

    #[test]
    fn test_pd_torque() {
        let (_, hinge) = hinged_world();
        let mut pd = PdTorque::new(hinge, Gains { kp: 2.0, kv: 0.5 });
        // no rate estimate on the first call
        assert_relative_eq!(pd.torque(0.0, 0.1, 0.0, 0.05), 0.2);
        // moved 0.05 rad in 0.05 s, a rate of 1
        assert_relative_eq!(pd.torque(0.05, 0.1, 0.0, 0.05), 2.0 * 0.05 - 0.5, epsilon = 1e-6);
    }
}
