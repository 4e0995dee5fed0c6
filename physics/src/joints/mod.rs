mod joint_ball;
mod joint_contact;
mod joint_fixed;
mod joint_hinge;
mod joint_slider;

pub use joint_ball::JointBall;
pub use joint_contact::JointContact;
pub use joint_fixed::JointFixed;
pub use joint_hinge::JointHinge;
pub use joint_slider::JointSlider;

use crate::{
    arena::BodyHandle,
    body::Body,
    config::Softness,
    contact::Contact,
    error::{PhysicsError, Result},
    math::{glam_ext::QuatExt, VecN},
};
use glam::{Quat, Vec3};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum JointType {
    Ball,
    Hinge,
    Slider,
    Fixed,
    /// Created by the world for each contact point, lives for one step.
    Contact,
}

/// Joint parameters that can be read and written by name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum JointParam {
    LoStop,
    HiStop,
    /// Target velocity of the motor.
    Vel,
    /// Maximum motor force or torque, the motor is off at zero.
    FMax,
    StopErp,
    StopCfm,
    /// ERP of the rows that hold the joint together.
    Erp,
    /// CFM of the rows that hold the joint together.
    Cfm,
}

/// Stops and motor along the single degree of freedom of a hinge or slider.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LimitMotor {
    pub lo: f32,
    pub hi: f32,
    pub vel: f32,
    pub fmax: f32,
    /// World ERP when `None`.
    pub stop_erp: Option<f32>,
    /// World CFM when `None`.
    pub stop_cfm: Option<f32>,
}

impl Default for LimitMotor {
    fn default() -> Self {
        Self {
            lo: f32::NEG_INFINITY,
            hi: f32::INFINITY,
            vel: 0.0,
            fmax: 0.0,
            stop_erp: None,
            stop_cfm: None,
        }
    }
}

fn invalid(name: &'static str, value: f32) -> PhysicsError {
    PhysicsError::InvalidParameter { name, value }
}

impl LimitMotor {
    pub(crate) fn set(&mut self, param: JointParam, value: f32) -> Result<()> {
        if value.is_nan() {
            return Err(invalid("joint parameter", value));
        }
        match param {
            JointParam::LoStop => {
                if value > self.hi {
                    return Err(invalid("lo_stop", value));
                }
                self.lo = value;
            }
            JointParam::HiStop => {
                if value < self.lo {
                    return Err(invalid("hi_stop", value));
                }
                self.hi = value;
            }
            JointParam::Vel => {
                if !value.is_finite() {
                    return Err(invalid("vel", value));
                }
                self.vel = value;
            }
            JointParam::FMax => {
                if value < 0.0 {
                    return Err(invalid("fmax", value));
                }
                self.fmax = value;
            }
            JointParam::StopErp => {
                Softness::new(value, 0.0)?;
                self.stop_erp = Some(value);
            }
            JointParam::StopCfm => {
                Softness::new(0.0, value)?;
                self.stop_cfm = Some(value);
            }
            JointParam::Erp | JointParam::Cfm => return Err(invalid("limit parameter", value)),
        }
        Ok(())
    }

    pub(crate) fn get(&self, param: JointParam, world: Softness) -> f32 {
        match param {
            JointParam::LoStop => self.lo,
            JointParam::HiStop => self.hi,
            JointParam::Vel => self.vel,
            JointParam::FMax => self.fmax,
            JointParam::StopErp => self.stop_erp.unwrap_or(world.erp),
            JointParam::StopCfm => self.stop_cfm.unwrap_or(world.cfm),
            JointParam::Erp => world.erp,
            JointParam::Cfm => world.cfm,
        }
    }

    /// Motor and limit rows along `jacobian`, whose velocity is the rate of `position`.
    fn add_rows(&self, jacobian: VecN<12>, position: f32, ctx: &RowContext, rows: &mut Vec<JointRow>) {
        if self.fmax > 0.0 {
            let impulse = self.fmax * ctx.h;
            rows.push(JointRow {
                jacobian,
                rhs: self.vel,
                cfm: ctx.cfm,
                lo: -impulse,
                hi: impulse,
                friction: None,
            });
        }

        let at_lo = position <= self.lo;
        let at_hi = position >= self.hi;
        if at_lo || at_hi {
            let bound = if at_lo { self.lo } else { self.hi };
            let erp = self.stop_erp.unwrap_or(ctx.world.erp);
            let cfm = self.stop_cfm.unwrap_or(ctx.world.cfm);
            let (lo, hi) = if self.lo == self.hi {
                (f32::NEG_INFINITY, f32::INFINITY)
            } else if at_lo {
                (0.0, f32::INFINITY)
            } else {
                (f32::NEG_INFINITY, 0.0)
            };
            rows.push(JointRow {
                jacobian,
                rhs: -erp * (position - bound) / ctx.h,
                cfm,
                lo,
                hi,
                friction: None,
            });
        }
    }
}

/// Pose and velocity of one side of a joint. A missing body is the static world frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct BodyFrame {
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl BodyFrame {
    pub const WORLD: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
        linear_velocity: Vec3::ZERO,
        angular_velocity: Vec3::ZERO,
    };

    pub fn of(body: Option<&Body>) -> Self {
        match body {
            Some(body) => Self {
                position: body.position,
                orientation: body.orientation,
                linear_velocity: body.linear_velocity,
                angular_velocity: body.angular_velocity,
            },
            None => Self::WORLD,
        }
    }

    #[inline]
    pub fn local_to_world(&self, point: Vec3) -> Vec3 {
        self.position + self.orientation * point
    }

    #[inline]
    pub fn world_to_local(&self, point: Vec3) -> Vec3 {
        self.orientation.conjugate() * (point - self.position)
    }
}

/// Step-wide values needed to build rows.
#[derive(Copy, Clone, Debug)]
pub(crate) struct RowContext {
    pub h: f32,
    /// Structural ERP after applying the joint's own override.
    pub erp: f32,
    /// Structural CFM after applying the joint's own override.
    pub cfm: f32,
    pub world: Softness,
    pub contact_max_correcting_velocity: f32,
    pub contact_surface_layer: f32,
}

/// One scalar constraint row, `J v + (cfm / h) lambda = rhs` with `lo <= lambda <= hi`.
#[derive(Copy, Clone, Debug)]
pub(crate) struct JointRow {
    pub jacobian: VecN<12>,
    pub rhs: f32,
    pub cfm: f32,
    pub lo: f32,
    pub hi: f32,
    /// Index of the normal row within the same joint and the friction coefficient. The bounds
    /// become `±mu * lambda_normal`.
    pub friction: Option<(usize, f32)>,
}

/// Rotation of `b` relative to `a` since `q_rel0` was captured, in the frame of `a`.
fn relative_rotation(q_rel0: Quat, a: &BodyFrame, b: &BodyFrame) -> Quat {
    (a.orientation.conjugate() * b.orientation * q_rel0.conjugate()).normalize()
}

fn initial_relative_rotation(a: &BodyFrame, b: &BodyFrame) -> Quat {
    (a.orientation.conjugate() * b.orientation).normalize()
}

/// Three rows keeping the relative orientation of `a` and `b` at `q_rel0`.
fn orientation_lock_rows(q_rel0: Quat, a: &BodyFrame, b: &BodyFrame, ctx: &RowContext, rows: &mut Vec<JointRow>) {
    let delta = relative_rotation(q_rel0, a, b);
    // small angle rotation vector, shortest way round
    let sign = if delta.w < 0.0 { -1.0 } else { 1.0 };
    let error = a.orientation * (delta.xyz() * (2.0 * sign));
    for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
        rows.push(JointRow {
            jacobian: VecN::from_row(Vec3::ZERO, -axis, Vec3::ZERO, axis),
            rhs: -ctx.erp / ctx.h * error.dot(axis),
            cfm: ctx.cfm,
            lo: f32::NEG_INFINITY,
            hi: f32::INFINITY,
            friction: None,
        });
    }
}

/// Per-type data of a joint.
#[derive(Clone, Debug)]
pub enum JointKind {
    Ball(JointBall),
    Hinge(JointHinge),
    Slider(JointSlider),
    Fixed(JointFixed),
    Contact(JointContact),
}

/// A constraint between one body and the world or between two bodies.
#[derive(Clone, Debug)]
pub struct Joint {
    pub(crate) kind: JointKind,
    pub(crate) body_a: Option<BodyHandle>,
    pub(crate) body_b: Option<BodyHandle>,
    pub(crate) attached: bool,
    pub(crate) erp: Option<f32>,
    pub(crate) cfm: Option<f32>,
    /// Impulses of the previous step, for warm starting.
    pub(crate) cached_lambda: Vec<f32>,
}

impl Joint {
    /// A new unattached joint. Contact joints are only made by [`Joint::contact`].
    pub(crate) fn new(joint_type: JointType) -> Result<Self> {
        let kind = match joint_type {
            JointType::Ball => JointKind::Ball(JointBall::default()),
            JointType::Hinge => JointKind::Hinge(JointHinge::default()),
            JointType::Slider => JointKind::Slider(JointSlider::default()),
            JointType::Fixed => JointKind::Fixed(JointFixed::default()),
            JointType::Contact => {
                return Err(PhysicsError::WrongJointKind {
                    operation: "create_joint",
                    found: JointType::Contact,
                })
            }
        };
        Ok(Self {
            kind,
            body_a: None,
            body_b: None,
            attached: false,
            erp: None,
            cfm: None,
            cached_lambda: Vec::new(),
        })
    }

    pub(crate) fn contact(contact: Contact) -> Self {
        Self {
            body_a: contact.body_a,
            body_b: contact.body_b,
            kind: JointKind::Contact(JointContact::new(contact)),
            attached: true,
            erp: None,
            cfm: None,
            cached_lambda: Vec::new(),
        }
    }

    pub fn joint_type(&self) -> JointType {
        match self.kind {
            JointKind::Ball(_) => JointType::Ball,
            JointKind::Hinge(_) => JointType::Hinge,
            JointKind::Slider(_) => JointType::Slider,
            JointKind::Fixed(_) => JointType::Fixed,
            JointKind::Contact(_) => JointType::Contact,
        }
    }

    #[inline]
    pub fn kind(&self) -> &JointKind {
        &self.kind
    }

    #[inline]
    pub fn bodies(&self) -> (Option<BodyHandle>, Option<BodyHandle>) {
        (self.body_a, self.body_b)
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Contact joints are transient, every other joint persists across steps.
    #[inline]
    pub fn is_persistent(&self) -> bool {
        !matches!(self.kind, JointKind::Contact(_))
    }

    pub(crate) fn connects(&self, a: BodyHandle, b: BodyHandle) -> bool {
        self.attached
            && ((self.body_a == Some(a) && self.body_b == Some(b))
                || (self.body_a == Some(b) && self.body_b == Some(a)))
    }

    pub(crate) fn references(&self, body: BodyHandle) -> bool {
        self.body_a == Some(body) || self.body_b == Some(body)
    }

    /// Records the bodies and captures the rest configuration from their current poses.
    pub(crate) fn attach(
        &mut self,
        body_a: Option<BodyHandle>,
        body_b: Option<BodyHandle>,
        a: &BodyFrame,
        b: &BodyFrame,
    ) {
        self.body_a = body_a;
        self.body_b = body_b;
        self.attached = true;
        self.cached_lambda.clear();
        // default anchor at the first body's centre of mass
        let anchor = if body_a.is_some() { a.position } else { b.position };
        match &mut self.kind {
            JointKind::Ball(ball) => ball.set_anchor(anchor, a, b),
            JointKind::Hinge(hinge) => {
                hinge.set_anchor(anchor, a, b);
                hinge.set_axis(Vec3::Z, a, b);
            }
            JointKind::Slider(slider) => slider.set_axis(Vec3::Z, a, b),
            JointKind::Fixed(fixed) => {
                let anchor = if body_b.is_some() { b.position } else { a.position };
                fixed.set(anchor, a, b);
            }
            JointKind::Contact(_) => {}
        }
    }

    pub(crate) fn limit_motor(&self) -> Option<&LimitMotor> {
        match &self.kind {
            JointKind::Hinge(hinge) => Some(&hinge.limit),
            JointKind::Slider(slider) => Some(&slider.limit),
            _ => None,
        }
    }

    pub(crate) fn limit_motor_mut(&mut self) -> Option<&mut LimitMotor> {
        match &mut self.kind {
            JointKind::Hinge(hinge) => Some(&mut hinge.limit),
            JointKind::Slider(slider) => Some(&mut slider.limit),
            _ => None,
        }
    }

    pub(crate) fn set_param(&mut self, param: JointParam, value: f32) -> Result<()> {
        let found = self.joint_type();
        match param {
            JointParam::Erp | JointParam::Cfm if found != JointType::Contact => {
                if param == JointParam::Erp {
                    Softness::new(value, 0.0)?;
                    self.erp = Some(value);
                } else {
                    Softness::new(0.0, value)?;
                    self.cfm = Some(value);
                }
                Ok(())
            }
            _ => self
                .limit_motor_mut()
                .ok_or(PhysicsError::WrongJointKind {
                    operation: "set_param",
                    found,
                })?
                .set(param, value),
        }
    }

    pub(crate) fn param(&self, param: JointParam, world: Softness) -> Result<f32> {
        let found = self.joint_type();
        match param {
            JointParam::Erp if found != JointType::Contact => Ok(self.erp.unwrap_or(world.erp)),
            JointParam::Cfm if found != JointType::Contact => Ok(self.cfm.unwrap_or(world.cfm)),
            _ => self
                .limit_motor()
                .map(|limit| limit.get(param, world))
                .ok_or(PhysicsError::WrongJointKind {
                    operation: "param",
                    found,
                }),
        }
    }

    /// Angle or displacement along the free axis, `None` for joints without one.
    pub(crate) fn position(&self, a: &BodyFrame, b: &BodyFrame) -> Option<f32> {
        match &self.kind {
            JointKind::Hinge(hinge) => Some(hinge.angle(a, b)),
            JointKind::Slider(slider) => Some(slider.position(a, b)),
            _ => None,
        }
    }

    pub(crate) fn rate(&self, a: &BodyFrame, b: &BodyFrame) -> Option<f32> {
        match &self.kind {
            JointKind::Hinge(hinge) => Some(hinge.angle_rate(a, b)),
            JointKind::Slider(slider) => Some(slider.position_rate(a, b)),
            _ => None,
        }
    }

    /// World space free axis and whether it is angular.
    pub(crate) fn free_axis(&self, a: &BodyFrame) -> Option<(Vec3, bool)> {
        match &self.kind {
            JointKind::Hinge(hinge) => Some((hinge.world_axis(a), true)),
            JointKind::Slider(slider) => Some((slider.world_axis(a), false)),
            _ => None,
        }
    }

    /// `base` with the structural softness replaced by this joint's overrides.
    pub(crate) fn row_context(&self, base: &RowContext) -> RowContext {
        RowContext {
            erp: self.erp.unwrap_or(base.world.erp),
            cfm: self.cfm.unwrap_or(base.world.cfm),
            ..*base
        }
    }

    pub(crate) fn build_rows(
        &self,
        a: &BodyFrame,
        b: &BodyFrame,
        ctx: &RowContext,
        rows: &mut Vec<JointRow>,
    ) {
        if !self.attached {
            return;
        }
        match &self.kind {
            JointKind::Ball(ball) => ball.add_rows(a, b, ctx, rows),
            JointKind::Hinge(hinge) => hinge.add_rows(a, b, ctx, rows),
            JointKind::Slider(slider) => slider.add_rows(a, b, ctx, rows),
            JointKind::Fixed(fixed) => fixed.add_rows(a, b, ctx, rows),
            JointKind::Contact(contact) => contact.add_rows(a, b, ctx, rows),
        }
    }
}
