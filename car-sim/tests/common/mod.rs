// Deterministic flat-ground backend for scenario tests.
//
// Plane y = `ground_y`, no chassis collision, semi-implicit Euler rigid body
// integration about the centre of mass. Forces are cleared after each step.
#![allow(dead_code)]

use car_sim::dynamics::{
    BackendError, BodyState, Car, ChassisDesc, ChassisShape, MassDesc, PhysicsBackend, RayHit, SetupParams,
};
use nalgebra::{Isometry3, Matrix3, Point3, Translation3, UnitQuaternion, Vector3};

pub const DT: f32 = 1.0 / 60.0;

#[derive(Debug, Clone)]
pub struct MockBody {
    pub pose: Isometry3<f32>,
    pub linvel: Vector3<f32>,
    pub angvel: Vector3<f32>,
    pub mass: MassDesc,
    pub shape: ChassisShape,
    pub gravity: bool,
    force: Vector3<f32>,
    torque: Vector3<f32>,
}

impl MockBody {
    fn world_com(&self) -> Point3<f32> {
        self.pose * self.mass.local_com
    }

    fn inv_inertia_world(&self) -> Matrix3<f32> {
        let r = self.pose.rotation.to_rotation_matrix().into_inner();
        let inv = self.mass.principal_inertia.map(|i| if i > 0.0 { 1.0 / i } else { 0.0 });
        r * Matrix3::from_diagonal(&inv) * r.transpose()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlatGround {
    pub ground_y: f32,
    pub bodies: Vec<Option<MockBody>>,
}

impl FlatGround {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(&self, h: usize) -> Option<&MockBody> {
        self.bodies.get(h).and_then(Option::as_ref)
    }

    pub fn body_mut(&mut self, h: usize) -> Option<&mut MockBody> {
        self.bodies.get_mut(h).and_then(Option::as_mut)
    }

    pub fn set_linvel(&mut self, h: usize, v: Vector3<f32>) {
        if let Some(b) = self.body_mut(h) {
            b.linvel = v;
        }
    }

    pub fn lift(&mut self, h: usize, dy: f32) {
        if let Some(b) = self.body_mut(h) {
            b.pose.translation.vector.y += dy;
            b.linvel.y = 0.0;
        }
    }

    pub fn step(&mut self, dt: f32) {
        for b in self.bodies.iter_mut().flatten() {
            let mut force = b.force;
            if b.gravity {
                force.y -= 9.81 * b.mass.mass;
            }
            b.linvel += force / b.mass.mass * dt;
            b.angvel += b.inv_inertia_world() * b.torque * dt;

            // integrate about the centre of mass
            let com = b.world_com() + b.linvel * dt;
            let rot = UnitQuaternion::from_scaled_axis(b.angvel * dt) * b.pose.rotation;
            let origin = com - rot * b.mass.local_com.coords;
            b.pose = Isometry3::from_parts(Translation3::from(origin.coords), rot);

            b.force = Vector3::zeros();
            b.torque = Vector3::zeros();
        }
    }
}

impl PhysicsBackend for FlatGround {
    type Handle = usize;

    fn create_chassis(&mut self, desc: &ChassisDesc) -> Result<usize, BackendError> {
        if desc.mass.mass <= 0.0 {
            return Err(BackendError::BodyCreation("non-positive mass".into()));
        }
        self.bodies.push(Some(MockBody {
            pose: desc.pose,
            linvel: Vector3::zeros(),
            angvel: Vector3::zeros(),
            mass: desc.mass,
            shape: desc.shape.clone(),
            gravity: desc.gravity_enabled,
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
        }));
        Ok(self.bodies.len() - 1)
    }

    fn replace_chassis_shape(&mut self, body: usize, shape: &ChassisShape) -> Result<(), BackendError> {
        let b = self.body_mut(body).ok_or(BackendError::UnknownBody)?;
        b.shape = shape.clone();
        Ok(())
    }

    fn set_mass_properties(&mut self, body: usize, mass: &MassDesc) -> Result<(), BackendError> {
        let b = self.body_mut(body).ok_or(BackendError::UnknownBody)?;
        b.mass = *mass;
        Ok(())
    }

    fn destroy_body(&mut self, body: usize) {
        if let Some(slot) = self.bodies.get_mut(body) {
            *slot = None;
        }
    }

    fn body_state(&self, body: usize) -> Option<BodyState> {
        let b = self.body(body)?;
        Some(BodyState { pose: b.pose, linvel: b.linvel, angvel: b.angvel, center_of_mass: b.world_com() })
    }

    fn add_force(&mut self, body: usize, force: Vector3<f32>) {
        if let Some(b) = self.body_mut(body) {
            b.force += force;
        }
    }

    fn add_force_at_point(&mut self, body: usize, force: Vector3<f32>, point: Point3<f32>) {
        if let Some(b) = self.body_mut(body) {
            let arm = point - b.world_com();
            b.force += force;
            b.torque += arm.cross(&force);
        }
    }

    fn add_torque(&mut self, body: usize, torque: Vector3<f32>) {
        if let Some(b) = self.body_mut(body) {
            b.torque += torque;
        }
    }

    fn cast_ray(&self, origin: Point3<f32>, dir: Vector3<f32>, max_dist: f32, _exclude: usize) -> Option<RayHit> {
        if dir.y > -1e-6 {
            return None;
        }
        let t = (origin.y - self.ground_y) / -dir.y;
        if !(0.0..=max_dist).contains(&t) {
            return None;
        }
        Some(RayHit { point: origin + dir * t, normal: Vector3::y(), distance: t })
    }
}

pub type TestCar = Car<usize>;

/// Default car on flat ground, settled for `settle_s` seconds.
pub fn spawn(settle_s: f32) -> (FlatGround, TestCar) {
    spawn_with(TestCar::default(), settle_s)
}

pub fn spawn_with(mut car: TestCar, settle_s: f32) -> (FlatGround, TestCar) {
    let mut world = FlatGround::new();
    car.setup(&mut world, SetupParams::default()).expect("setup on flat ground");
    run(&mut world, &mut car, settle_s);
    (world, car)
}

pub fn run(world: &mut FlatGround, car: &mut TestCar, seconds: f32) {
    let ticks = (seconds / DT).round() as usize;
    for _ in 0..ticks {
        car.tick(world, DT);
        world.step(DT);
    }
}

/// Run tick by tick, calling `each` after every world step.
pub fn run_with(world: &mut FlatGround, car: &mut TestCar, seconds: f32, mut each: impl FnMut(&FlatGround, &TestCar)) {
    let ticks = (seconds / DT).round() as usize;
    for _ in 0..ticks {
        car.tick(world, DT);
        world.step(DT);
        each(world, car);
    }
}
