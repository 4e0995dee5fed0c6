use approx::assert_relative_eq;
use glam::{Quat, Vec3};
use rigid_physics::{
    Body, Geom, Mass, Shape, Softness, SurfaceParams, World, WorldConfig,
};

fn ground(world: &mut World) {
    world
        .add_geom(Geom::new(Shape::make_plane(Vec3::Z, 0.0).unwrap()))
        .unwrap();
}

fn add_ball(world: &mut World, position: Vec3, radius: f32, mass: f32) -> rigid_physics::BodyHandle {
    let body = world
        .add_body(Body::new(position, Mass::sphere_total(mass, radius).unwrap()))
        .unwrap();
    let geom = world
        .add_geom(Geom::new(Shape::make_sphere(radius).unwrap()))
        .unwrap();
    world.set_geom_body(geom, Some(body)).unwrap();
    body
}

#[test]
fn free_fall_matches_semi_implicit_euler() {
    let mut world = World::default();
    let g = world.config().gravity.z;
    let still = world
        .add_body(Body::new(Vec3::new(0.0, 0.0, 10.0), Mass::default()))
        .unwrap();
    let moving = world
        .add_body(
            Body::new(Vec3::new(5.0, 0.0, 10.0), Mass::default())
                .with_linear_velocity(Vec3::new(3.0, -1.0, 0.0)),
        )
        .unwrap();

    let h = 0.01;
    let n = 100;
    for _ in 0..n {
        world.step(h).unwrap();
    }

    let expected = n as f32 * g * h;
    let still = world.body(still).unwrap();
    let moving = world.body(moving).unwrap();
    assert_relative_eq!(still.linear_velocity.z, expected, epsilon = 1e-4);
    assert_relative_eq!(moving.linear_velocity.z, expected, epsilon = 1e-4);
    assert_eq!(moving.linear_velocity.x, 3.0);
    assert_eq!(moving.linear_velocity.y, -1.0);

    // semi-implicit Euler: z = z0 + h^2 g n (n + 1) / 2
    let drop = h * h * g * (n * (n + 1)) as f32 * 0.5;
    assert_relative_eq!(still.position.z, 10.0 + drop, epsilon = 1e-3);
}

#[test]
fn gravity_mode_off_floats() {
    let mut world = World::default();
    let body = world
        .add_body(Body::new(Vec3::new(0.0, 0.0, 1.0), Mass::default()).with_gravity_mode(false))
        .unwrap();
    for _ in 0..50 {
        world.step_default().unwrap();
    }
    assert_eq!(world.body(body).unwrap().position, Vec3::new(0.0, 0.0, 1.0));
}

#[test]
fn resting_sphere_does_not_drift() {
    let mut world = World::default();
    ground(&mut world);
    let start = Vec3::new(0.3, -0.2, 0.5);
    let ball = add_ball(&mut world, start, 0.5, 1.0);

    for _ in 0..1000 {
        world.step(0.01).unwrap();
    }
    let body = world.body(ball).unwrap();
    assert!(body.position.abs_diff_eq(start, 1e-3), "{}", body.position);
    assert!(body.linear_velocity.length() < 1e-2);
}

#[test]
fn resting_box_does_not_drift() {
    let mut world = World::default();
    ground(&mut world);
    let start = Vec3::new(0.0, 0.0, 0.5);
    let body = world
        .add_body(Body::new(start, Mass::box_total(1.0, Vec3::ONE).unwrap()))
        .unwrap();
    let geom = world
        .add_geom(Geom::new(Shape::make_box(Vec3::ONE).unwrap()))
        .unwrap();
    world.set_geom_body(geom, Some(body)).unwrap();

    for _ in 0..500 {
        let stats = world.step(0.01).unwrap();
        assert!(stats.contacts <= 4);
    }
    let body = world.body(body).unwrap();
    assert!(body.position.abs_diff_eq(start, 1e-3), "{}", body.position);
    assert!(body.orientation.angle_between(Quat::IDENTITY) < 1e-2);
}

#[test]
fn ball_bounces_and_settles() {
    let mut world = World::default();
    let ground = world
        .add_geom(Geom::new(Shape::make_plane(Vec3::Z, 0.0).unwrap()))
        .unwrap();
    world
        .set_geom_surface(
            ground,
            SurfaceParams {
                mu: f32::INFINITY,
                restitution: 0.9,
                bounce_velocity: 0.0,
                softness: Some(Softness::new(0.2, 0.001).unwrap()),
            },
        )
        .unwrap();
    let ball = add_ball(&mut world, Vec3::new(0.0, 0.0, 2.2), 0.2, 1.2);

    let mut bounced = false;
    let mut apex: f32 = 0.0;
    let mut bounces = 0;
    let mut rising = false;
    for _ in 0..3000 {
        world.step(0.01).unwrap();
        let body = world.body(ball).unwrap();
        let now_rising = body.linear_velocity.z > 0.0;
        if now_rising && !rising {
            bounces += 1;
        }
        rising = now_rising;
        if body.linear_velocity.z > 1.0 {
            bounced = true;
        }
        if bounced && bounces == 1 {
            apex = apex.max(body.position.z);
        }
    }

    assert!(bounced);
    assert!(bounces > 1);
    // clearly left the ground and did not gain energy
    assert!(apex > 0.8 && apex < 2.2, "apex {}", apex);
    let body = world.body(ball).unwrap();
    assert!((body.position.z - 0.2).abs() < 1e-3, "rest height {}", body.position.z);
    assert!(body.linear_velocity.length() < 1e-2);
}

#[test]
fn kinematic_body_pushes_without_being_pushed() {
    let mut world = World::new(WorldConfig {
        gravity: Vec3::ZERO,
        ..WorldConfig::default()
    })
    .unwrap();
    let pusher = world
        .add_body(
            Body::new(Vec3::ZERO, Mass::infinite()).with_linear_velocity(Vec3::new(1.0, 0.0, 0.0)),
        )
        .unwrap();
    let geom = world
        .add_geom(Geom::new(Shape::make_box(Vec3::ONE).unwrap()))
        .unwrap();
    world.set_geom_body(geom, Some(pusher)).unwrap();
    let ball = add_ball(&mut world, Vec3::new(0.75, 0.0, 0.0), 0.25, 1.0);

    for _ in 0..50 {
        world.step(0.01).unwrap();
    }
    assert_eq!(
        world.body(pusher).unwrap().linear_velocity,
        Vec3::new(1.0, 0.0, 0.0)
    );
    assert!(world.body(ball).unwrap().position.x > 1.0);
}

#[test]
fn identical_worlds_step_identically() {
    let build = || {
        let mut world = World::default();
        ground(&mut world);
        for i in 0..5 {
            add_ball(
                &mut world,
                Vec3::new(i as f32 * 0.3, 0.0, 0.5 + i as f32 * 0.45),
                0.2,
                1.0,
            );
        }
        world
    };
    let mut a = build();
    let mut b = build();
    for _ in 0..200 {
        assert_eq!(a.step(0.01).unwrap(), b.step(0.01).unwrap());
    }
    for ((_, body_a), (_, body_b)) in a.bodies().zip(b.bodies()) {
        assert_eq!(body_a.position, body_b.position);
        assert_eq!(body_a.orientation, body_b.orientation);
    }
}
