use crate::{
    arena::{Arena, BodyHandle, GeomHandle, JointHandle},
    body::Body,
    config::WorldConfig,
    contact::{Contact, ContactPoint},
    error::{PhysicsError, Result},
    geom::{CollisionGroups, Geom, SurfaceParams},
    intersect::collide,
    joints::{BodyFrame, Joint, JointKind, JointParam, JointRow, JointType, RowContext},
    math::{glam_ext::Vec3Ext, Pose},
    solver::{self, ConstraintRow, SolverBody, SolverParams},
    space::Space,
};
use glam::Vec3;

/// Counters describing a single call to [`World::step`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StepStats {
    /// Candidate pairs reported by the broad phase.
    pub pairs: usize,
    pub contacts: usize,
    pub rows: usize,
    /// Rows skipped because their effective mass was degenerate or they were not finite.
    pub degenerate_rows: usize,
    /// Bodies whose state became non-finite and was reset.
    pub recovered_bodies: usize,
}

/// Owns every body, geometry and joint of one simulation.
#[derive(Clone, Debug)]
pub struct World {
    config: WorldConfig,
    bodies: Arena<Body>,
    geoms: Arena<Geom>,
    joints: Arena<Joint>,
    space: Space,
    contacts: Vec<Contact>,
    step_num: u64,
}

impl Default for World {
    fn default() -> Self {
        Self::from_valid_config(WorldConfig::default())
    }
}

fn check_axis(axis: Vec3) -> Result<Vec3> {
    axis.try_axis()
        .ok_or(PhysicsError::DegenerateAxis(axis.to_array()))
}

fn check_point(name: &'static str, point: Vec3) -> Result<Vec3> {
    if point.is_finite() {
        Ok(point)
    } else {
        Err(PhysicsError::InvalidParameter {
            name,
            value: point.length(),
        })
    }
}

fn check_pose(pose: Pose) -> Result<Pose> {
    let orientation = pose.orientation.normalize();
    if pose.position.is_finite() && orientation.is_finite() {
        Ok(Pose::new(pose.position, orientation))
    } else {
        Err(PhysicsError::InvalidParameter {
            name: "pose",
            value: f32::NAN,
        })
    }
}

impl World {
    pub fn new(config: WorldConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: WorldConfig) -> Self {
        Self {
            space: Space::new(config.broad_phase),
            config,
            bodies: Arena::new(),
            geoms: Arena::new(),
            joints: Arena::new(),
            contacts: Vec::new(),
            step_num: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: WorldConfig) -> Result<()> {
        config.validate()?;
        self.space.set_kind(config.broad_phase);
        self.config = config;
        Ok(())
    }

    pub fn set_gravity(&mut self, gravity: Vec3) -> Result<()> {
        self.config.gravity = check_point("gravity", gravity)?;
        Ok(())
    }

    /// Number of completed steps.
    #[inline]
    pub fn step_num(&self) -> u64 {
        self.step_num
    }

    // bodies

    pub fn add_body(&mut self, mut body: Body) -> Result<BodyHandle> {
        let pose = check_pose(body.pose())?;
        body.set_pose(pose);
        if !(body.linear_velocity.is_finite() && body.angular_velocity.is_finite()) {
            return Err(PhysicsError::InvalidParameter {
                name: "velocity",
                value: f32::NAN,
            });
        }
        let handle = self.bodies.insert(body);
        tracing::debug!("added body {:?}", handle);
        Ok(handle)
    }

    pub fn body(&self, handle: BodyHandle) -> Result<&Body> {
        self.bodies
            .get(handle)
            .ok_or(PhysicsError::StaleBody(handle))
    }

    /// Direct access to body state. Poses written here are picked up by attached geometries at
    /// the next step.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body> {
        self.bodies
            .get_mut(handle)
            .ok_or(PhysicsError::StaleBody(handle))
    }

    /// Destroys the body and every joint attached to it. Its geometries stay where they are as
    /// static geometry.
    pub fn destroy_body(&mut self, handle: BodyHandle) -> Result<()> {
        let body = self
            .bodies
            .remove(handle)
            .ok_or(PhysicsError::StaleBody(handle))?;

        let joints: Vec<JointHandle> = self
            .joints
            .iter()
            .filter(|(_, joint)| joint.references(handle))
            .map(|(joint_handle, _)| joint_handle)
            .collect();
        for joint in &joints {
            self.joints.remove(*joint);
        }

        let body_pose = body.pose();
        let mut detached = 0;
        for (_, geom) in self.geoms.iter_mut() {
            if geom.body == Some(handle) {
                geom.sync_with_body(&body_pose);
                geom.body = None;
                detached += 1;
            }
        }
        tracing::debug!(
            "destroyed body {:?} with {} joints, detached {} geometries",
            handle,
            joints.len(),
            detached
        );
        Ok(())
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    // geometries

    pub fn add_geom(&mut self, geom: Geom) -> Result<GeomHandle> {
        geom.validate()?;
        let enabled = geom.is_enabled();
        let handle = self.geoms.insert(geom);
        if enabled {
            self.space.insert(handle);
        }
        tracing::debug!("added geometry {:?}", handle);
        Ok(handle)
    }

    pub fn geom(&self, handle: GeomHandle) -> Result<&Geom> {
        self.geoms
            .get(handle)
            .ok_or(PhysicsError::StaleGeom(handle))
    }

    fn geom_mut(&mut self, handle: GeomHandle) -> Result<&mut Geom> {
        self.geoms
            .get_mut(handle)
            .ok_or(PhysicsError::StaleGeom(handle))
    }

    pub fn geoms(&self) -> impl Iterator<Item = (GeomHandle, &Geom)> {
        self.geoms.iter()
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    /// Attaches the geometry to `body` so that it follows it, or detaches it with `None`.
    pub fn set_geom_body(&mut self, handle: GeomHandle, body: Option<BodyHandle>) -> Result<()> {
        let body_pose = match body {
            Some(body) => Some(self.body(body)?.pose()),
            None => None,
        };
        let geom = self.geom_mut(handle)?;
        if body.is_some() && !geom.shape().is_placeable() {
            return Err(PhysicsError::NonPlaceableGeom(handle));
        }
        geom.body = body;
        if let Some(body_pose) = body_pose {
            geom.sync_with_body(&body_pose);
        }
        Ok(())
    }

    /// Pose of the geometry relative to its body.
    pub fn set_geom_offset(&mut self, handle: GeomHandle, offset: Pose) -> Result<()> {
        let offset = check_pose(offset)?;
        let body_pose = match self.geom(handle)?.body() {
            Some(body) => Some(self.body(body)?.pose()),
            None => None,
        };
        let geom = self.geom_mut(handle)?;
        geom.offset = offset;
        if let Some(body_pose) = body_pose {
            geom.sync_with_body(&body_pose);
        }
        Ok(())
    }

    /// World pose of a static geometry.
    pub fn set_geom_pose(&mut self, handle: GeomHandle, pose: Pose) -> Result<()> {
        let pose = check_pose(pose)?;
        let geom = self.geom_mut(handle)?;
        if geom.body().is_some() {
            return Err(PhysicsError::AttachedGeom(handle));
        }
        geom.update_pose(pose);
        Ok(())
    }

    pub fn set_geom_surface(&mut self, handle: GeomHandle, surface: SurfaceParams) -> Result<()> {
        surface.validate()?;
        self.geom_mut(handle)?.surface = surface;
        Ok(())
    }

    pub fn set_geom_collision_groups(
        &mut self,
        handle: GeomHandle,
        groups: CollisionGroups,
    ) -> Result<()> {
        self.geom_mut(handle)?.groups = groups;
        Ok(())
    }

    pub fn enable_geom(&mut self, handle: GeomHandle) -> Result<()> {
        self.geom_mut(handle)?.enabled = true;
        self.space.insert(handle);
        Ok(())
    }

    /// Disabled geometries stay in the world but are not collided.
    pub fn disable_geom(&mut self, handle: GeomHandle) -> Result<()> {
        self.geom_mut(handle)?.enabled = false;
        self.space.remove(handle);
        Ok(())
    }

    pub fn destroy_geom(&mut self, handle: GeomHandle) -> Result<()> {
        self.geoms
            .remove(handle)
            .ok_or(PhysicsError::StaleGeom(handle))?;
        self.space.remove(handle);
        tracing::debug!("destroyed geometry {:?}", handle);
        Ok(())
    }

    fn geom_world_pose(&self, geom: &Geom) -> Pose {
        match geom.body().and_then(|body| self.bodies.get(body)) {
            Some(body) => body.pose().compose(geom.offset()),
            None => *geom.pose(),
        }
    }

    /// Narrow phase test of two geometries at their current poses. Normals point from `a`
    /// towards `b`.
    pub fn collide_geoms(&self, a: GeomHandle, b: GeomHandle) -> Result<Vec<ContactPoint>> {
        let geom_a = self.geom(a)?;
        let geom_b = self.geom(b)?;
        Ok(collide(
            geom_a.shape(),
            &self.geom_world_pose(geom_a),
            geom_b.shape(),
            &self.geom_world_pose(geom_b),
            self.config.max_contacts_per_pair,
        ))
    }

    // joints

    pub fn create_joint(&mut self, joint_type: JointType) -> Result<JointHandle> {
        let handle = self.joints.insert(Joint::new(joint_type)?);
        tracing::debug!("created {:?} joint {:?}", joint_type, handle);
        Ok(handle)
    }

    pub fn joint(&self, handle: JointHandle) -> Result<&Joint> {
        self.joints
            .get(handle)
            .ok_or(PhysicsError::StaleJoint(handle))
    }

    fn attached_joint(&self, handle: JointHandle) -> Result<&Joint> {
        let joint = self.joint(handle)?;
        if joint.is_attached() {
            Ok(joint)
        } else {
            Err(PhysicsError::JointNotAttached(handle))
        }
    }

    fn attached_joint_mut(&mut self, handle: JointHandle) -> Result<&mut Joint> {
        let joint = self
            .joints
            .get_mut(handle)
            .ok_or(PhysicsError::StaleJoint(handle))?;
        if joint.is_attached() {
            Ok(joint)
        } else {
            Err(PhysicsError::JointNotAttached(handle))
        }
    }

    pub fn joints(&self) -> impl Iterator<Item = (JointHandle, &Joint)> {
        self.joints.iter()
    }

    fn frame(&self, body: Option<BodyHandle>) -> BodyFrame {
        BodyFrame::of(body.and_then(|body| self.bodies.get(body)))
    }

    fn joint_frames(&self, joint: &Joint) -> (BodyFrame, BodyFrame) {
        let (a, b) = joint.bodies();
        (self.frame(a), self.frame(b))
    }

    /// Connects `body_a` to `body_b`, or to the static world when one side is `None`.
    ///
    /// The joint's rest configuration (zero angle or displacement) is the bodies' current
    /// relative pose. The anchor defaults to the position of the first body and the axis to world
    /// Z.
    pub fn attach_joint(
        &mut self,
        handle: JointHandle,
        body_a: Option<BodyHandle>,
        body_b: Option<BodyHandle>,
    ) -> Result<()> {
        if self.joint(handle)?.is_attached() {
            return Err(PhysicsError::JointAlreadyAttached(handle));
        }
        for body in [body_a, body_b].into_iter().flatten() {
            self.body(body)?;
        }
        if (body_a.is_none() && body_b.is_none()) || (body_a.is_some() && body_a == body_b) {
            return Err(PhysicsError::InvalidAttachment(handle));
        }

        let a = self.frame(body_a);
        let b = self.frame(body_b);
        let joint = self
            .joints
            .get_mut(handle)
            .ok_or(PhysicsError::StaleJoint(handle))?;
        joint.attach(body_a, body_b, &a, &b);
        tracing::debug!(
            "attached {:?} joint {:?} to {:?} and {:?}",
            joint.joint_type(),
            handle,
            body_a,
            body_b
        );
        Ok(())
    }

    pub fn destroy_joint(&mut self, handle: JointHandle) -> Result<()> {
        self.joints
            .remove(handle)
            .ok_or(PhysicsError::StaleJoint(handle))?;
        tracing::debug!("destroyed joint {:?}", handle);
        Ok(())
    }

    /// True if a persistent, attached joint links the two bodies.
    pub fn are_connected(&self, a: BodyHandle, b: BodyHandle) -> bool {
        self.joints
            .iter()
            .any(|(_, joint)| joint.is_persistent() && joint.connects(a, b))
    }

    pub fn set_joint_param(&mut self, handle: JointHandle, param: JointParam, value: f32) -> Result<()> {
        self.attached_joint_mut(handle)?.set_param(param, value)
    }

    pub fn joint_param(&self, handle: JointHandle, param: JointParam) -> Result<f32> {
        self.attached_joint(handle)?
            .param(param, self.config.softness())
    }

    fn wrong_kind(operation: &'static str, joint: &Joint) -> PhysicsError {
        PhysicsError::WrongJointKind {
            operation,
            found: joint.joint_type(),
        }
    }

    fn frames_for_edit(&self, handle: JointHandle) -> Result<(BodyFrame, BodyFrame, JointType)> {
        let joint = self.attached_joint(handle)?;
        let (a, b) = self.joint_frames(joint);
        Ok((a, b, joint.joint_type()))
    }

    /// Moves the anchor of a ball or hinge joint to `anchor`, in world space.
    pub fn set_ball_anchor(&mut self, handle: JointHandle, anchor: Vec3) -> Result<()> {
        let anchor = check_point("anchor", anchor)?;
        let (a, b, found) = self.frames_for_edit(handle)?;
        match &mut self.attached_joint_mut(handle)?.kind {
            JointKind::Ball(ball) => ball.set_anchor(anchor, &a, &b),
            JointKind::Hinge(hinge) => hinge.set_anchor(anchor, &a, &b),
            _ => {
                return Err(PhysicsError::WrongJointKind {
                    operation: "set_ball_anchor",
                    found,
                })
            }
        }
        Ok(())
    }

    pub fn set_hinge_anchor(&mut self, handle: JointHandle, anchor: Vec3) -> Result<()> {
        let found = self.joint(handle)?.joint_type();
        if found != JointType::Hinge {
            return Err(PhysicsError::WrongJointKind {
                operation: "set_hinge_anchor",
                found,
            });
        }
        self.set_ball_anchor(handle, anchor)
    }

    /// Sets the hinge axis in world space. The current configuration becomes angle zero.
    pub fn set_hinge_axis(&mut self, handle: JointHandle, axis: Vec3) -> Result<()> {
        let axis = check_axis(axis)?;
        let (a, b, found) = self.frames_for_edit(handle)?;
        let joint = self.attached_joint_mut(handle)?;
        match &mut joint.kind {
            JointKind::Hinge(hinge) => hinge.set_axis(axis, &a, &b),
            _ => {
                return Err(PhysicsError::WrongJointKind {
                    operation: "set_hinge_axis",
                    found,
                })
            }
        }
        joint.cached_lambda.clear();
        Ok(())
    }

    /// Sets the slider axis in world space. The current configuration becomes displacement
    /// zero.
    pub fn set_slider_axis(&mut self, handle: JointHandle, axis: Vec3) -> Result<()> {
        let axis = check_axis(axis)?;
        let (a, b, found) = self.frames_for_edit(handle)?;
        let joint = self.attached_joint_mut(handle)?;
        match &mut joint.kind {
            JointKind::Slider(slider) => slider.set_axis(axis, &a, &b),
            _ => {
                return Err(PhysicsError::WrongJointKind {
                    operation: "set_slider_axis",
                    found,
                })
            }
        }
        joint.cached_lambda.clear();
        Ok(())
    }

    /// Hinge angle in `[-PI, PI]` or slider displacement of body a relative to body b.
    pub fn joint_position(&self, handle: JointHandle) -> Result<f32> {
        let joint = self.attached_joint(handle)?;
        let (a, b) = self.joint_frames(joint);
        joint
            .position(&a, &b)
            .ok_or_else(|| Self::wrong_kind("joint_position", joint))
    }

    /// Time derivative of [`World::joint_position`].
    pub fn joint_rate(&self, handle: JointHandle) -> Result<f32> {
        let joint = self.attached_joint(handle)?;
        let (a, b) = self.joint_frames(joint);
        joint
            .rate(&a, &b)
            .ok_or_else(|| Self::wrong_kind("joint_rate", joint))
    }

    /// World space anchor of a ball or hinge joint, as seen from body a.
    pub fn joint_anchor(&self, handle: JointHandle) -> Result<Vec3> {
        let joint = self.attached_joint(handle)?;
        let (a, b) = self.joint_frames(joint);
        match joint.kind() {
            JointKind::Ball(ball) => Ok(ball.world_anchors(&a, &b).0),
            JointKind::Hinge(hinge) => Ok(hinge.anchor(&a)),
            _ => Err(Self::wrong_kind("joint_anchor", joint)),
        }
    }

    /// World space axis of a hinge or slider joint.
    pub fn joint_axis(&self, handle: JointHandle) -> Result<Vec3> {
        let joint = self.attached_joint(handle)?;
        let (a, _) = self.joint_frames(joint);
        joint
            .free_axis(&a)
            .map(|(axis, _)| axis)
            .ok_or_else(|| Self::wrong_kind("joint_axis", joint))
    }

    /// Applies a torque about a hinge axis, or a force along a slider axis, to both bodies in
    /// opposite directions. Accumulated like any other force until the next step.
    pub fn add_joint_torque(&mut self, handle: JointHandle, torque: f32) -> Result<()> {
        if !torque.is_finite() {
            return Err(PhysicsError::InvalidParameter {
                name: "torque",
                value: torque,
            });
        }
        let joint = self.attached_joint(handle)?;
        let (a, _) = self.joint_frames(joint);
        let (axis, angular) = joint
            .free_axis(&a)
            .ok_or_else(|| Self::wrong_kind("add_joint_torque", joint))?;
        let (body_a, body_b) = joint.bodies();
        let effort = axis * torque;
        for (body, sign) in [(body_a, 1.0), (body_b, -1.0)] {
            if let Some(body) = body.and_then(|body| self.bodies.get_mut(body)) {
                if angular {
                    body.add_torque(effort * sign);
                } else {
                    body.add_force(effort * sign);
                }
            }
        }
        Ok(())
    }

    // stepping

    /// Contacts generated by the last step.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Steps by the configured [`WorldConfig::step_size`].
    pub fn step_default(&mut self) -> Result<StepStats> {
        self.step(self.config.step_size)
    }

    fn sync_geoms(&mut self) {
        for (_, geom) in self.geoms.iter_mut() {
            if let Some(body) = geom.body().and_then(|body| self.bodies.get(body)) {
                geom.sync_with_body(&body.pose());
            }
        }
    }

    fn is_mobile(&self, body: Option<BodyHandle>) -> bool {
        body.and_then(|body| self.bodies.get(body))
            .map_or(false, |body| body.inv_mass() > 0.0)
    }

    fn generate_contacts(&self) -> (usize, Vec<Contact>) {
        let pairs = self.space.collide(&self.geoms);
        let world_softness = self.config.softness();
        let mut contacts = Vec::new();
        for pair in &pairs {
            let (Some(geom_a), Some(geom_b)) = (self.geoms.get(pair.a), self.geoms.get(pair.b)) else {
                continue;
            };
            let (body_a, body_b) = (geom_a.body(), geom_b.body());
            if body_a.is_some() && body_a == body_b {
                continue;
            }
            if !geom_a.collision_groups().test(&geom_b.collision_groups()) {
                continue;
            }
            if !(self.is_mobile(body_a) || self.is_mobile(body_b)) {
                continue;
            }
            if let (true, Some(a), Some(b)) = (self.config.skip_connected_pairs, body_a, body_b) {
                if self.are_connected(a, b) {
                    continue;
                }
            }

            let points = collide(
                geom_a.shape(),
                geom_a.pose(),
                geom_b.shape(),
                geom_b.pose(),
                self.config.max_contacts_per_pair,
            );
            if points.is_empty() {
                continue;
            }
            let surface = geom_a.surface().combine(geom_b.surface(), world_softness);
            contacts.extend(points.into_iter().map(|point| Contact {
                geom_a: pair.a,
                geom_b: pair.b,
                body_a,
                body_b,
                point,
                surface,
            }));
        }
        (pairs.len(), contacts)
    }

    /// Advances the simulation by `h` seconds.
    ///
    /// Runs the broad and narrow phase, turns every contact into a contact joint, solves all
    /// joints together and integrates. Contact joints are removed again before returning.
    pub fn step(&mut self, h: f32) -> Result<StepStats> {
        if !(h.is_finite() && h > 0.0) {
            return Err(PhysicsError::InvalidStepSize(h));
        }
        let mut stats = StepStats::default();

        self.sync_geoms();
        let (pairs, contacts) = self.generate_contacts();
        stats.pairs = pairs;
        stats.contacts = contacts.len();

        let contact_joints: Vec<JointHandle> = contacts
            .iter()
            .map(|contact| self.joints.insert(Joint::contact(*contact)))
            .collect();

        // dense solver indices in body slot order
        let body_handles = self.bodies.handles();
        let mut solver_index = vec![None; self.bodies.capacity()];
        for (i, handle) in body_handles.iter().enumerate() {
            solver_index[handle.index()] = Some(i);
        }
        let index_of = |body: Option<BodyHandle>| body.and_then(|body| solver_index[body.index()]);

        // rows are built from the state before forces are applied
        let base = RowContext {
            h,
            erp: self.config.erp,
            cfm: self.config.cfm,
            world: self.config.softness(),
            contact_max_correcting_velocity: self.config.contact_max_correcting_velocity,
            contact_surface_layer: self.config.contact_surface_layer,
        };
        let mut rows: Vec<ConstraintRow> = Vec::new();
        let mut joint_rows: Vec<(JointHandle, usize, usize)> = Vec::new();
        let mut scratch: Vec<JointRow> = Vec::new();
        for (handle, joint) in self.joints.iter() {
            let (a, b) = self.joint_frames(joint);
            scratch.clear();
            joint.build_rows(&a, &b, &joint.row_context(&base), &mut scratch);
            if scratch.is_empty() {
                continue;
            }

            let start = rows.len();
            let (body_a, body_b) = joint.bodies();
            let warm = joint.is_persistent()
                && self.config.warm_start > 0.0
                && joint.cached_lambda.len() == scratch.len();
            for (i, row) in scratch.iter().enumerate() {
                rows.push(ConstraintRow {
                    body_a: index_of(body_a),
                    body_b: index_of(body_b),
                    jacobian: row.jacobian,
                    rhs: row.rhs,
                    cfm: row.cfm,
                    lo: row.lo,
                    hi: row.hi,
                    friction: row.friction.map(|(normal, mu)| (start + normal, mu)),
                    lambda: if warm {
                        self.config.warm_start * joint.cached_lambda[i]
                    } else {
                        0.0
                    },
                });
            }
            joint_rows.push((handle, start, scratch.len()));
        }
        stats.rows = rows.len();

        let gravity = self.config.gravity;
        let gyroscopic = self.config.gyroscopic;
        let saved_poses: Vec<Pose> = body_handles
            .iter()
            .filter_map(|handle| self.bodies.get(*handle).map(Body::pose))
            .collect();
        let mut solver_bodies: Vec<SolverBody> = Vec::with_capacity(body_handles.len());
        for handle in &body_handles {
            if let Some(body) = self.bodies.get_mut(*handle) {
                body.integrate_velocity(h, gravity, gyroscopic);
                solver_bodies.push(SolverBody {
                    inv_mass: body.inv_mass(),
                    inv_inertia_world: body.inv_inertia_tensor_world(),
                    linear_velocity: body.linear_velocity,
                    angular_velocity: body.angular_velocity,
                });
            }
        }

        let params = SolverParams {
            h,
            iterations: self.config.solver_iterations,
            min_cfm: self.config.min_cfm,
        };
        stats.degenerate_rows = solver::solve(&mut solver_bodies, &mut rows, &params);
        if stats.degenerate_rows > 0 {
            tracing::debug!(
                "step {}: skipped {} degenerate rows",
                self.step_num,
                stats.degenerate_rows
            );
        }

        let max_angular_speed = self.config.max_angular_speed;
        for ((handle, solved), saved) in body_handles
            .iter()
            .zip(solver_bodies.iter())
            .zip(saved_poses.iter())
        {
            let Some(body) = self.bodies.get_mut(*handle) else {
                continue;
            };
            body.linear_velocity = solved.linear_velocity;
            body.angular_velocity = solved.angular_velocity;
            body.clamp_angular_speed(max_angular_speed);
            body.integrate_position(h);
            if !body.is_finite() {
                tracing::warn!(
                    "step {}: body {:?} became non-finite, resetting it",
                    self.step_num,
                    handle
                );
                body.set_pose(*saved);
                body.linear_velocity = Vec3::ZERO;
                body.angular_velocity = Vec3::ZERO;
                stats.recovered_bodies += 1;
            }
            body.clear_accumulators();
        }

        for (handle, start, count) in joint_rows {
            if let Some(joint) = self.joints.get_mut(handle) {
                if joint.is_persistent() {
                    joint.cached_lambda.clear();
                    joint
                        .cached_lambda
                        .extend(rows[start..start + count].iter().map(|row| row.lambda));
                }
            }
        }

        for handle in contact_joints {
            self.joints.remove(handle);
        }
        self.contacts = contacts;
        self.sync_geoms();
        self.step_num += 1;

        tracing::trace!(
            "step {}: {} pairs, {} contacts, {} rows",
            self.step_num,
            stats.pairs,
            stats.contacts,
            stats.rows
        );
        Ok(stats)
    }

    pub fn print_bodies(&self) {
        for (handle, body) in self.bodies.iter() {
            if !body.has_infinite_mass() {
                println!(
                    "step: {} body: {:?} pos: {} rot: {} lin: {} ang: {}",
                    self.step_num,
                    handle,
                    body.position,
                    body.orientation,
                    body.linear_velocity,
                    body.angular_velocity
                );
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{mass::Mass, shapes::Shape};
    use approx::assert_relative_eq;

    fn ball_world() -> (World, BodyHandle, GeomHandle) {
        let mut world = World::default();
        let body = world
            .add_body(Body::new(Vec3::new(0.0, 0.0, 1.0), Mass::sphere_total(1.0, 0.5).unwrap()))
            .unwrap();
        let geom = world
            .add_geom(Geom::new(Shape::make_sphere(0.5).unwrap()))
            .unwrap();
        world.set_geom_body(geom, Some(body)).unwrap();
        (world, body, geom)
    }

    #[test]
    fn test_destroy_body_cleans_up() {
        let (mut world, body, geom) = ball_world();
        let joint = world.create_joint(JointType::Hinge).unwrap();
        world.attach_joint(joint, Some(body), None).unwrap();

        world.destroy_body(body).unwrap();
        assert!(matches!(world.joint(joint), Err(PhysicsError::StaleJoint(_))));
        let geom = world.geom(geom).unwrap();
        assert_eq!(geom.body(), None);
        assert_eq!(geom.pose().position, Vec3::new(0.0, 0.0, 1.0));
        assert!(matches!(
            world.destroy_body(body),
            Err(PhysicsError::StaleBody(_))
        ));
    }

    #[test]
    fn test_contact_joints_are_transient() {
        let (mut world, _, _) = ball_world();
        world
            .add_geom(Geom::new(Shape::make_plane(Vec3::Z, 0.55).unwrap()))
            .unwrap();
        let stats = world.step(0.01).unwrap();
        assert_eq!(stats.pairs, 1);
        assert_eq!(stats.contacts, 1);
        assert_eq!(stats.rows, 3);
        assert_eq!(world.contacts().len(), 1);
        assert_eq!(world.joints().count(), 0);
        // the sphere comes first, normals point from it into the ground
        assert_relative_eq!(world.contacts()[0].point.normal.z, -1.0);
    }

    #[test]
    fn test_connected_pairs_skipped() {
        let (mut world, body, _) = ball_world();
        let other = world
            .add_body(Body::new(Vec3::new(0.0, 0.0, 1.5), Mass::default()))
            .unwrap();
        let geom = world
            .add_geom(Geom::new(Shape::make_sphere(0.5).unwrap()))
            .unwrap();
        world.set_geom_body(geom, Some(other)).unwrap();
        world.set_gravity(Vec3::ZERO).unwrap();

        assert_eq!(world.step(0.01).unwrap().contacts, 1);
        let joint = world.create_joint(JointType::Fixed).unwrap();
        world.attach_joint(joint, Some(body), Some(other)).unwrap();
        assert!(world.are_connected(other, body));
        let stats = world.step(0.01).unwrap();
        assert_eq!(stats.contacts, 0);
        assert_eq!(stats.rows, 6);
    }

    #[test]
    fn test_joint_state_machine() {
        let (mut world, body, _) = ball_world();
        let joint = world.create_joint(JointType::Slider).unwrap();
        assert!(matches!(
            world.set_joint_param(joint, JointParam::Vel, 1.0),
            Err(PhysicsError::JointNotAttached(_))
        ));
        assert!(matches!(
            world.joint_position(joint),
            Err(PhysicsError::JointNotAttached(_))
        ));
        assert!(matches!(
            world.attach_joint(joint, None, None),
            Err(PhysicsError::InvalidAttachment(_))
        ));
        assert!(matches!(
            world.attach_joint(joint, Some(body), Some(body)),
            Err(PhysicsError::InvalidAttachment(_))
        ));
        world.attach_joint(joint, Some(body), None).unwrap();
        assert!(matches!(
            world.attach_joint(joint, Some(body), None),
            Err(PhysicsError::JointAlreadyAttached(_))
        ));
        assert!(matches!(
            world.set_hinge_axis(joint, Vec3::X),
            Err(PhysicsError::WrongJointKind { .. })
        ));
        assert!(matches!(
            world.set_slider_axis(joint, Vec3::ZERO),
            Err(PhysicsError::DegenerateAxis(_))
        ));
        world.set_joint_param(joint, JointParam::Vel, 1.0).unwrap();
        assert_eq!(world.joint_param(joint, JointParam::Vel).unwrap(), 1.0);
        assert_eq!(world.joint_param(joint, JointParam::Erp).unwrap(), 0.2);
        world.destroy_joint(joint).unwrap();
        assert!(matches!(
            world.set_joint_param(joint, JointParam::Vel, 1.0),
            Err(PhysicsError::StaleJoint(_))
        ));
    }

    #[test]
    fn test_joint_torque() {
        let (mut world, body, _) = ball_world();
        let other = world
            .add_body(Body::new(Vec3::new(1.0, 0.0, 1.0), Mass::default()))
            .unwrap();
        let hinge = world.create_joint(JointType::Hinge).unwrap();
        world.attach_joint(hinge, Some(body), Some(other)).unwrap();
        world.set_hinge_axis(hinge, Vec3::Y).unwrap();
        world.add_joint_torque(hinge, 2.0).unwrap();
        assert_eq!(world.body(body).unwrap().torque(), Vec3::Y * 2.0);
        assert_eq!(world.body(other).unwrap().torque(), Vec3::Y * -2.0);

        let ball = world.create_joint(JointType::Ball).unwrap();
        world.attach_joint(ball, Some(body), None).unwrap();
        assert!(matches!(
            world.add_joint_torque(ball, 1.0),
            Err(PhysicsError::WrongJointKind { .. })
        ));
    }

    #[test]
    fn test_invalid_inputs() {
        let (mut world, body, geom) = ball_world();
        assert!(matches!(world.step(0.0), Err(PhysicsError::InvalidStepSize(_))));
        assert!(matches!(
            world.step(f32::NAN),
            Err(PhysicsError::InvalidStepSize(_))
        ));
        assert!(matches!(
            world.set_geom_pose(geom, Pose::IDENTITY),
            Err(PhysicsError::AttachedGeom(_))
        ));
        let ground = world
            .add_geom(Geom::new(Shape::make_plane(Vec3::Z, 0.0).unwrap()))
            .unwrap();
        assert!(matches!(
            world.set_geom_body(ground, Some(body)),
            Err(PhysicsError::NonPlaceableGeom(_))
        ));
        assert!(World::new(WorldConfig {
            erp: 2.0,
            ..WorldConfig::default()
        })
        .is_err());
    }
}
