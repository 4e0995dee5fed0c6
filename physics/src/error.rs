//! Error types for the simulation core.

use crate::{
    arena::{BodyHandle, GeomHandle, JointHandle},
    joints::JointType,
};
use thiserror::Error;

/// Errors returned by fallible world, body, geometry and joint operations.
///
/// Only configuration and usage mistakes are reported here. Numerical trouble inside a step is
/// recovered locally and surfaced through [`crate::world::StepStats`] instead.
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// Mass or inertia is negative, zero, non-finite or not positive-definite.
    #[error("invalid mass properties: {0}")]
    InvalidMass(String),

    /// Shape parameters are zero, negative or non-finite.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// An axis or normal has (almost) zero length.
    #[error("degenerate axis vector {0:?}")]
    DegenerateAxis([f32; 3]),

    /// A parameter value is outside its documented range.
    #[error("invalid value {value} for {name}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f32,
    },

    /// Step size must be positive and finite.
    #[error("invalid step size {0}")]
    InvalidStepSize(f32),

    /// The world configuration could not be parsed.
    #[error("invalid world configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The body handle was destroyed or never belonged to this world.
    #[error("body {0:?} is no longer valid")]
    StaleBody(BodyHandle),

    /// The geometry handle was destroyed or never belonged to this world.
    #[error("geometry {0:?} is no longer valid")]
    StaleGeom(GeomHandle),

    /// The joint handle was destroyed or never belonged to this world.
    #[error("joint {0:?} is no longer valid")]
    StaleJoint(JointHandle),

    /// `attach` was called on a joint that is already attached.
    #[error("joint {0:?} is already attached")]
    JointAlreadyAttached(JointHandle),

    /// A parameter was set on a joint that has not been attached yet.
    #[error("joint {0:?} is not attached")]
    JointNotAttached(JointHandle),

    /// A joint needs at least one body, and two distinct ones when both are given.
    #[error("joint {0:?} needs one body or two distinct bodies")]
    InvalidAttachment(JointHandle),

    /// The operation does not apply to this kind of joint.
    #[error("operation `{operation}` is not supported by {found:?} joints")]
    WrongJointKind {
        /// Operation name.
        operation: &'static str,
        /// Kind of the joint the operation was applied to.
        found: JointType,
    },

    /// Planes are not placeable and cannot follow a body.
    #[error("geometry {0:?} is a plane and cannot be attached to a body")]
    NonPlaceableGeom(GeomHandle),

    /// The pose of a geometry attached to a body follows the body.
    #[error("geometry {0:?} is attached to a body, move the body instead")]
    AttachedGeom(GeomHandle),
}

pub type Result<T> = std::result::Result<T, PhysicsError>;
