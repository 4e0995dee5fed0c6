//! Constrained rigid body simulation: bodies, collision geometry, joints and a projected
//! Gauss-Seidel solver stepped by a [`World`].

pub mod arena;
pub mod body;
pub mod bounds;
mod broadphase;
pub mod config;
pub mod contact;
pub mod error;
pub mod geom;
pub mod intersect;
pub mod joints;
pub mod mass;
pub mod math;
pub mod shapes;
mod solver;
pub mod space;
pub mod world;

pub use arena::{BodyHandle, GeomHandle, JointHandle};
pub use body::Body;
pub use broadphase::CollisionPair;
pub use config::{BroadPhaseKind, Softness, WorldConfig};
pub use contact::{Contact, ContactPoint};
pub use error::{PhysicsError, Result};
pub use geom::{CollisionGroups, ContactSurface, Geom, SurfaceParams};
pub use joints::{Joint, JointParam, JointType, LimitMotor};
pub use mass::Mass;
pub use math::Pose;
pub use shapes::Shape;
pub use world::{StepStats, World};
