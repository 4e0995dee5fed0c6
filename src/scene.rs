use crate::control::{Gains, HingeServo, PdTorque, SliderServo};
use clap::ValueEnum;
use core::f32::consts::{FRAC_PI_2, PI};
use glam::{Quat, Vec3};
use rigid_physics::{
    math::wrap_angle, Body, BodyHandle, CollisionGroups, Geom, GeomHandle, JointHandle, JointParam,
    JointType, Mass, Pose, Result, Shape, Softness, StepStats, SurfaceParams, World,
    WorldConfig,
};

const GROUND: u32 = 1;
const PARTS: u32 = 1 << 1;

/// Collides with everything.
const GROUND_GROUPS: CollisionGroups = CollisionGroups::new(GROUND, u32::MAX);
/// Only collides with the ground group.
const PART_GROUPS: CollisionGroups = CollisionGroups::new(PARTS, GROUND);

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Lesson {
    /// A ball dropped on bouncy ground.
    Bounce,
    /// A ball rolling down a tilted static box.
    Slope,
    /// Two balls joined by a slider whose stops act as a spring.
    Spring,
    /// A one-legged hopper: sphere torso, hinged thigh and sliding shin.
    Monobot,
    /// A hinged arm on a fixed post balancing a ball.
    Arm,
    /// Foot, shin, thigh and head driven by PD torques at ankle and knee.
    Leg,
}

impl Lesson {
    pub fn config(self) -> WorldConfig {
        let lesson = WorldConfig::default();
        match self {
            Lesson::Bounce | Lesson::Slope | Lesson::Spring => lesson,
            Lesson::Monobot => WorldConfig {
                gravity: Vec3::new(0.0, 0.0, -9.8),
                erp: 0.9,
                cfm: 1e-4,
                ..lesson
            },
            Lesson::Arm => WorldConfig {
                step_size: 0.05,
                erp: 0.9,
                cfm: 1e-4,
                ..lesson
            },
            Lesson::Leg => WorldConfig {
                step_size: 0.05,
                erp: 0.9,
                cfm: 1e-4,
                max_contacts_per_pair: 3,
                ..lesson
            },
        }
    }
}

fn add_ground(world: &mut World, surface: SurfaceParams) -> Result<GeomHandle> {
    world.add_geom(
        Geom::new(Shape::make_plane(Vec3::Z, 0.0)?)
            .with_surface(surface)
            .with_collision_groups(GROUND_GROUPS),
    )
}

/// Body with a solid mass distribution of `shape` and a matching geometry.
fn add_solid(
    world: &mut World,
    shape: Shape,
    mass: f32,
    pose: Pose,
    surface: SurfaceParams,
    groups: CollisionGroups,
) -> Result<BodyHandle> {
    let body = world.add_body(
        Body::new(pose.position, Mass::from_shape(&shape, mass)?).with_orientation(pose.orientation),
    )?;
    let geom = world.add_geom(
        Geom::new(shape)
            .with_surface(surface)
            .with_collision_groups(groups),
    )?;
    world.set_geom_body(geom, Some(body))?;
    Ok(body)
}

fn add_hinge(
    world: &mut World,
    body_a: BodyHandle,
    body_b: Option<BodyHandle>,
    anchor: Vec3,
    axis: Vec3,
) -> Result<JointHandle> {
    let hinge = world.create_joint(JointType::Hinge)?;
    world.attach_joint(hinge, Some(body_a), body_b)?;
    world.set_hinge_anchor(hinge, anchor)?;
    world.set_hinge_axis(hinge, axis)?;
    Ok(hinge)
}

fn bouncy_ground() -> SurfaceParams {
    SurfaceParams {
        restitution: 0.9,
        bounce_velocity: 0.0,
        ..SurfaceParams::default()
    }
}

fn build_bounce(world: &mut World) -> Result<Control> {
    add_ground(world, bouncy_ground())?;
    add_solid(
        world,
        Shape::make_sphere(0.2)?,
        1.2,
        Pose::from_position(Vec3::new(0.0, -0.2, 2.2)),
        SurfaceParams::default(),
        PART_GROUPS,
    )?;
    Ok(Control::None)
}

fn build_slope(world: &mut World) -> Result<Control> {
    let surface = SurfaceParams {
        softness: Some(Softness::new(1.0, 0.0)?),
        ..SurfaceParams::default()
    };
    add_ground(world, surface)?;
    // static geometry only, no body
    world.add_geom(
        Geom::new(Shape::make_box(Vec3::new(100.0, 2.0, 0.01))?)
            .with_pose(Pose::new(Vec3::ZERO, Quat::from_rotation_y(10f32.to_radians())))
            .with_surface(surface)
            .with_collision_groups(GROUND_GROUPS),
    )?;
    add_solid(
        world,
        Shape::make_sphere(0.2)?,
        1.0,
        Pose::from_position(Vec3::new(-10.0, 0.0, 2.2)),
        SurfaceParams::default(),
        PART_GROUPS,
    )?;
    Ok(Control::None)
}

fn build_spring(world: &mut World) -> Result<Control> {
    add_ground(world, bouncy_ground())?;
    let radii = [0.2, 0.5];
    let masses = [1.2, 2.5];
    let positions = [Vec3::new(0.0, -0.2, 2.2), Vec3::new(0.5, 0.5, 3.0)];
    let mut balls = Vec::with_capacity(2);
    for i in 0..2 {
        balls.push(add_solid(
            world,
            Shape::make_sphere(radii[i])?,
            masses[i],
            Pose::from_position(positions[i]),
            SurfaceParams::default(),
            PART_GROUPS,
        )?);
    }

    let slider = world.create_joint(JointType::Slider)?;
    world.attach_joint(slider, Some(balls[0]), Some(balls[1]))?;
    world.set_slider_axis(slider, Vec3::Z)?;

    // the spring's rest length is the initial separation
    let spring = Softness::from_spring_damper(0.0001, 500.0, 1.0)?;
    world.set_joint_param(slider, JointParam::LoStop, 0.0)?;
    world.set_joint_param(slider, JointParam::HiStop, 0.0)?;
    world.set_joint_param(slider, JointParam::StopErp, spring.erp)?;
    world.set_joint_param(slider, JointParam::StopCfm, spring.cfm)?;
    Ok(Control::None)
}

#[derive(Copy, Clone, Debug)]
enum Command {
    /// Adds to the hinge target angle.
    Turn(f32),
    /// Sets the slider target.
    Extend(f32),
    /// Force on the torso for a single step.
    Kick(Vec3),
}

/// Stands in for the keyboard of the interactive lesson.
const MONOBOT_SCRIPT: [(u64, Command); 7] = [
    (50, Command::Turn(0.75)),
    (150, Command::Extend(0.25)),
    (250, Command::Extend(-0.25)),
    (300, Command::Kick(Vec3::new(100.0, 0.0, 500.0))),
    (400, Command::Turn(-0.75)),
    (450, Command::Extend(0.0)),
    (500, Command::Turn(-0.75)),
];

struct Monobot {
    torso: BodyHandle,
    hinge: HingeServo,
    slider: SliderServo,
    hinge_target: f32,
    slider_target: f32,
}

impl Monobot {
    const SLIDER_RANGE: f32 = 0.25;

    fn update(&mut self, world: &mut World, step: u64) -> Result<()> {
        for (_, command) in MONOBOT_SCRIPT.iter().filter(|(at, _)| *at == step) {
            match *command {
                Command::Turn(delta) => self.hinge_target += delta,
                Command::Extend(target) => self.slider_target = target,
                Command::Kick(force) => world.body_mut(self.torso)?.add_force(force),
            }
        }
        self.slider_target = self
            .slider_target
            .clamp(-Self::SLIDER_RANGE, Self::SLIDER_RANGE);
        self.hinge_target = wrap_angle(self.hinge_target);

        self.slider.apply(world, self.slider_target)?;
        self.hinge.apply(world, self.hinge_target)
    }
}

fn build_monobot(world: &mut World) -> Result<Control> {
    add_ground(
        world,
        SurfaceParams {
            softness: Some(Softness::new(0.2, 0.001)?),
            ..SurfaceParams::default()
        },
    )?;

    let top = Vec3::new(0.0, 0.0, 1.5);
    let torso = add_solid(
        world,
        Shape::make_sphere(0.25)?,
        14.0,
        Pose::from_position(top),
        SurfaceParams::default(),
        PART_GROUPS,
    )?;
    let leg_length = 0.75;
    let thigh = add_solid(
        world,
        Shape::make_capsule(0.05, leg_length)?,
        3.0,
        Pose::from_position(top - Vec3::Z * (0.5 * leg_length)),
        SurfaceParams::default(),
        PART_GROUPS,
    )?;
    let shin = add_solid(
        world,
        Shape::make_capsule(0.03, leg_length)?,
        3.0,
        Pose::from_position(top - Vec3::Z * (0.5 * leg_length + 0.5)),
        SurfaceParams::default(),
        PART_GROUPS,
    )?;

    let hinge = add_hinge(world, torso, Some(thigh), top, Vec3::X)?;
    let slider = world.create_joint(JointType::Slider)?;
    world.attach_joint(slider, Some(thigh), Some(shin))?;
    world.set_slider_axis(slider, Vec3::Z)?;
    world.set_joint_param(slider, JointParam::LoStop, -Monobot::SLIDER_RANGE)?;
    world.set_joint_param(slider, JointParam::HiStop, Monobot::SLIDER_RANGE)?;

    Ok(Control::Monobot(Monobot {
        torso,
        hinge: HingeServo {
            joint: hinge,
            kp: 10.0,
            fmax: 1000.0,
        },
        slider: SliderServo {
            joint: slider,
            kp: 10.0,
            fmax: 1000.0,
        },
        hinge_target: 0.0,
        slider_target: 0.0,
    }))
}

struct Arm {
    ball: BodyHandle,
    hinge: HingeServo,
    length: f32,
}

impl Arm {
    /// Tilts the arm so the ball rolls back towards the middle, with some velocity feedback.
    fn target(&self, position: Vec3, velocity: Vec3) -> f32 {
        let offset = position.x / (0.5 * self.length) - 1.0;
        (offset * 45.0 + velocity.x * 1.5).to_radians()
    }

    fn update(&mut self, world: &mut World) -> Result<()> {
        let ball = world.body(self.ball)?;
        let target = self.target(ball.position, ball.linear_velocity);
        self.hinge.apply(world, target)
    }
}

fn build_arm(world: &mut World) -> Result<Control> {
    let surface = SurfaceParams {
        restitution: 0.8,
        bounce_velocity: 0.0,
        ..SurfaceParams::default()
    };
    add_ground(world, surface)?;

    let post_lengths = Vec3::new(1.0, 4.0, 25.0);
    let arm_lengths = Vec3::new(40.0, 4.0, 1.0);
    let top = post_lengths.z;

    let post = add_solid(
        world,
        Shape::make_box(post_lengths)?,
        10.0,
        Pose::from_position(Vec3::new(0.0, 0.0, 0.5 * top)),
        surface,
        PART_GROUPS,
    )?;
    let arm = add_solid(
        world,
        Shape::make_box(arm_lengths)?,
        1.0,
        Pose::from_position(Vec3::new(0.5 * arm_lengths.x, 0.0, top)),
        surface,
        PART_GROUPS,
    )?;
    let motor = add_solid(
        world,
        Shape::make_capsule(2.0, 4.0)?,
        10.0,
        Pose::new(Vec3::new(0.0, 0.0, top), Quat::from_rotation_x(FRAC_PI_2)),
        surface,
        PART_GROUPS,
    )?;
    let ball = add_solid(
        world,
        Shape::make_sphere(2.0)?,
        1.0,
        Pose::from_position(Vec3::new(0.3 * arm_lengths.x, 0.0, 1.5 * top)),
        surface,
        GROUND_GROUPS,
    )?;

    let to_ground = world.create_joint(JointType::Fixed)?;
    world.attach_joint(to_ground, Some(post), None)?;
    let to_post = world.create_joint(JointType::Fixed)?;
    world.attach_joint(to_post, Some(post), Some(motor))?;
    let hinge = add_hinge(world, post, Some(arm), Vec3::new(0.0, 0.0, top), Vec3::Y)?;

    Ok(Control::Arm(Arm {
        ball,
        hinge: HingeServo {
            joint: hinge,
            kp: 10.0,
            fmax: 2000.0,
        },
        length: arm_lengths.x,
    }))
}

struct Leg {
    ankle: PdTorque,
    knee: PdTorque,
    time: f32,
}

impl Leg {
    const ANKLE_TARGET: f32 = 0.1;

    /// Knee angle swinging at half a hertz, and its derivative.
    fn knee_target(time: f32) -> (f32, f32) {
        let angle = -(0.4 * PI * (PI * time).sin() + 0.1 * PI);
        let rate = -0.4 * PI * PI * (PI * time).cos();
        (angle, rate)
    }

    fn update(&mut self, world: &mut World, h: f32) -> Result<()> {
        let ankle = self.ankle.apply(world, Self::ANKLE_TARGET, 0.0, h)?;
        let (target, rate) = Self::knee_target(self.time);
        let knee = self.knee.apply(world, target, rate, h)?;
        tracing::trace!("t {:.2}: ankle torque {} knee torque {}", self.time, ankle, knee);
        self.time += h;
        Ok(())
    }
}

fn build_leg(world: &mut World, gains: [Gains; 2]) -> Result<Control> {
    let surface = SurfaceParams {
        mu: 0.7,
        restitution: 0.6,
        bounce_velocity: 0.0,
        softness: None,
    };
    add_ground(world, surface)?;
    let all = CollisionGroups::default();

    let foot = add_solid(
        world,
        Shape::make_box(Vec3::new(0.8, 0.7, 0.2))?,
        7.0,
        Pose::from_position(Vec3::new(0.2, 0.0, 0.15)),
        surface,
        all,
    )?;
    let shin = add_solid(
        world,
        Shape::make_capsule(0.2, 0.5)?,
        5.0,
        Pose::from_position(Vec3::new(0.0, 0.0, 0.6)),
        surface,
        all,
    )?;
    let thigh = add_solid(
        world,
        Shape::make_capsule(0.2, 0.5)?,
        3.0,
        Pose::from_position(Vec3::new(0.0, 0.0, 1.55)),
        surface,
        all,
    )?;
    let head = add_solid(
        world,
        Shape::make_sphere(0.4)?,
        2.0,
        Pose::from_position(Vec3::new(0.0, 0.0, 2.4)),
        surface,
        all,
    )?;

    let ankle = add_hinge(world, shin, Some(foot), Vec3::new(0.2, 0.0, 0.2), Vec3::Y)?;
    let knee = add_hinge(world, thigh, Some(shin), Vec3::new(0.0, 0.0, 1.1), Vec3::Y)?;
    let neck = world.create_joint(JointType::Fixed)?;
    world.attach_joint(neck, Some(head), Some(thigh))?;
    for joint in [ankle, knee] {
        world.set_joint_param(joint, JointParam::LoStop, -0.7 * PI)?;
        world.set_joint_param(joint, JointParam::HiStop, 0.7 * PI)?;
    }

    Ok(Control::Leg(Leg {
        ankle: PdTorque::new(ankle, gains[0]),
        knee: PdTorque::new(knee, gains[1]),
        time: 0.0,
    }))
}

enum Control {
    None,
    Monobot(Monobot),
    Arm(Arm),
    Leg(Leg),
}

/// A lesson world plus the controller that drives it between steps.
pub struct LessonScene {
    lesson: Lesson,
    gains: [Gains; 2],
    config: WorldConfig,
    world: World,
    control: Control,
    step_num: u64,
}

impl LessonScene {
    /// `config` replaces the lesson's own world settings when given.
    pub fn new(lesson: Lesson, gains: [Gains; 2], config: Option<WorldConfig>) -> Result<Self> {
        let config = config.unwrap_or_else(|| lesson.config());
        let mut scene = LessonScene {
            lesson,
            gains,
            world: World::new(config.clone())?,
            config,
            control: Control::None,
            step_num: 0,
        };
        scene.reset()?;
        Ok(scene)
    }

    pub fn reset(&mut self) -> Result<()> {
        self.step_num = 0;
        self.world = World::new(self.config.clone())?;
        let world = &mut self.world;
        self.control = match self.lesson {
            Lesson::Bounce => build_bounce(world)?,
            Lesson::Slope => build_slope(world)?,
            Lesson::Spring => build_spring(world)?,
            Lesson::Monobot => build_monobot(world)?,
            Lesson::Arm => build_arm(world)?,
            Lesson::Leg => build_leg(world, self.gains)?,
        };
        tracing::debug!(
            "built {:?} with {} bodies and {} joints",
            self.lesson,
            self.world.body_count(),
            self.world.joints().count()
        );
        Ok(())
    }

    pub fn update(&mut self) -> Result<StepStats> {
        let h = self.step_secs();
        match &mut self.control {
            Control::None => {}
            Control::Monobot(monobot) => monobot.update(&mut self.world, self.step_num)?,
            Control::Arm(arm) => arm.update(&mut self.world)?,
            Control::Leg(leg) => leg.update(&mut self.world, h)?,
        }
        let stats = self.world.step(h)?;
        self.step_num += 1;
        Ok(stats)
    }

    pub fn step_secs(&self) -> f32 {
        self.config.step_size
    }

    pub fn world(&self) -> &World {
        &self.world
    }
}
