use crate::{mass::Mass, math::Pose};
use glam::{Mat3, Quat, Vec3};

/// Rigid body state. `position` is the centre of mass.
#[derive(Clone, Debug)]
pub struct Body {
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// When false the world gravity is not applied to this body.
    pub gravity_mode: bool,
    mass: Mass,
    force: Vec3,
    torque: Vec3,
}

impl Default for Body {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            gravity_mode: true,
            mass: Mass::default(),
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
        }
    }
}

impl Body {
    pub fn new(position: Vec3, mass: Mass) -> Self {
        Self {
            position,
            mass,
            ..Self::default()
        }
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation.normalize();
        self
    }

    pub fn with_linear_velocity(mut self, linear_velocity: Vec3) -> Self {
        self.linear_velocity = linear_velocity;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn with_gravity_mode(mut self, gravity_mode: bool) -> Self {
        self.gravity_mode = gravity_mode;
        self
    }

    #[inline]
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.orientation)
    }

    pub fn set_pose(&mut self, pose: Pose) {
        self.position = pose.position;
        self.orientation = pose.orientation.normalize();
    }

    #[inline]
    pub fn mass(&self) -> &Mass {
        &self.mass
    }

    pub fn set_mass(&mut self, mass: Mass) {
        self.mass = mass;
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        self.mass.inv_mass()
    }

    pub fn has_infinite_mass(&self) -> bool {
        self.mass.is_infinite()
    }

    pub fn world_to_local(&self, world_point: Vec3) -> Vec3 {
        self.orientation.conjugate() * (world_point - self.position)
    }

    pub fn local_to_world(&self, body_point: Vec3) -> Vec3 {
        self.position + self.orientation * body_point
    }

    /// Velocity of the material point currently at `world_point`.
    pub fn point_velocity(&self, world_point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(world_point - self.position)
    }

    pub fn inv_inertia_tensor_world(&self) -> Mat3 {
        let orientation = Mat3::from_quat(self.orientation);
        orientation * self.mass.inv_inertia() * orientation.transpose()
    }

    pub fn inertia_tensor_world(&self) -> Mat3 {
        let orientation = Mat3::from_quat(self.orientation);
        orientation * self.mass.inertia() * orientation.transpose()
    }

    pub fn add_force(&mut self, force: Vec3) {
        self.force += force;
    }

    pub fn add_torque(&mut self, torque: Vec3) {
        self.torque += torque;
    }

    /// Force applied at a world space point, producing a torque about the centre of mass.
    pub fn add_force_at_position(&mut self, force: Vec3, world_point: Vec3) {
        self.force += force;
        self.torque += (world_point - self.position).cross(force);
    }

    /// Force given in body space, applied at a point given in body space.
    pub fn add_relative_force_at_relative_position(&mut self, force: Vec3, body_point: Vec3) {
        let force = self.orientation * force;
        self.add_force_at_position(force, self.local_to_world(body_point));
    }

    #[inline]
    pub fn force(&self) -> Vec3 {
        self.force
    }

    #[inline]
    pub fn torque(&self) -> Vec3 {
        self.torque
    }

    pub fn clear_accumulators(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    /// First half of a semi-implicit Euler step: velocities from the accumulated force and torque.
    pub(crate) fn integrate_velocity(&mut self, delta_seconds: f32, gravity: Vec3, gyroscopic: bool) {
        if self.has_infinite_mass() {
            return;
        }

        let inv_mass = self.mass.inv_mass();
        let mut linear_acceleration = self.force * inv_mass;
        if self.gravity_mode {
            linear_acceleration += gravity;
        }
        self.linear_velocity += linear_acceleration * delta_seconds;

        // Euler's equation, I dw/dt = T - w x (I w)
        let mut torque = self.torque;
        if gyroscopic {
            let inertia = self.inertia_tensor_world();
            torque -= self
                .angular_velocity
                .cross(inertia * self.angular_velocity);
        }
        self.angular_velocity += self.inv_inertia_tensor_world() * torque * delta_seconds;
    }

    pub(crate) fn clamp_angular_speed(&mut self, max_angular_speed: f32) {
        if self.angular_velocity.length_squared() > max_angular_speed * max_angular_speed {
            self.angular_velocity = self.angular_velocity.normalize() * max_angular_speed;
        }
    }

    /// Second half of a semi-implicit Euler step: pose from the updated velocities.
    pub(crate) fn integrate_position(&mut self, delta_seconds: f32) {
        self.position += self.linear_velocity * delta_seconds;

        let d_angle = self.angular_velocity * delta_seconds;
        let angle = d_angle.length();
        let rcp_angle = angle.recip();
        let dq = if rcp_angle.is_finite() {
            Quat::from_axis_angle(d_angle * rcp_angle, angle)
        } else {
            Quat::IDENTITY
        };
        self.orientation = (dq * self.orientation).normalize();
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.orientation.is_finite()
            && self.linear_velocity.is_finite()
            && self.angular_velocity.is_finite()
    }
}
