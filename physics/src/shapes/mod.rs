mod shape_box;
mod shape_capsule;
mod shape_plane;
mod shape_sphere;

use crate::{bounds::Bounds, error::Result, math::Pose};
use glam::{Mat3, Vec3};

pub use shape_box::ShapeBox;
pub use shape_capsule::ShapeCapsule;
pub use shape_plane::ShapePlane;
pub use shape_sphere::ShapeSphere;

trait ShapeTrait {
    fn validate(&self) -> Result<()>;
    /// Inertia tensor about the centre for a unit mass, `None` for unbounded shapes.
    fn unit_inertia_tensor(&self) -> Option<Mat3>;
    fn bounds(&self, pose: &Pose) -> Bounds;
    /// Furthest point along `dir`, in local space.
    fn support(&self, dir: Vec3) -> Vec3;
}

/// Closed set of collision primitives.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Shape {
    Sphere(ShapeSphere),
    Box(ShapeBox),
    Capsule(ShapeCapsule),
    Plane(ShapePlane),
}

impl Default for Shape {
    fn default() -> Shape {
        Shape::Sphere(ShapeSphere { radius: 1.0 })
    }
}

impl Shape {
    pub fn make_sphere(radius: f32) -> Result<Self> {
        let sphere = ShapeSphere { radius };
        sphere.validate()?;
        Ok(Shape::Sphere(sphere))
    }

    /// Box with full side lengths `lengths`.
    pub fn make_box(lengths: Vec3) -> Result<Self> {
        let cuboid = ShapeBox {
            half_extents: lengths * 0.5,
        };
        cuboid.validate()?;
        Ok(Shape::Box(cuboid))
    }

    /// Capsule along local Z; `length` is the distance between the cap centres.
    pub fn make_capsule(radius: f32, length: f32) -> Result<Self> {
        let capsule = ShapeCapsule { radius, length };
        capsule.validate()?;
        Ok(Shape::Capsule(capsule))
    }

    /// The half-space `dot(normal, x) <= offset`. `normal` does not need to be unit length.
    pub fn make_plane(normal: Vec3, offset: f32) -> Result<Self> {
        ShapePlane::new(normal, offset).map(Shape::Plane)
    }

    fn shape_trait(&self) -> &dyn ShapeTrait {
        match self {
            Shape::Sphere(data) => data,
            Shape::Box(data) => data,
            Shape::Capsule(data) => data,
            Shape::Plane(data) => data,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.shape_trait().validate()
    }

    pub fn unit_inertia_tensor(&self) -> Option<Mat3> {
        self.shape_trait().unit_inertia_tensor()
    }

    pub fn bounds(&self, pose: &Pose) -> Bounds {
        self.shape_trait().bounds(pose)
    }

    pub fn support(&self, dir: Vec3) -> Vec3 {
        self.shape_trait().support(dir)
    }

    /// Planes are fixed in the world and cannot follow a body.
    pub fn is_placeable(&self) -> bool {
        !matches!(self, Shape::Plane(_))
    }
}
