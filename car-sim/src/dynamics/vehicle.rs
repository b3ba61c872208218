// ==============================================================================
// vehicle.rs — CAR: OWNED STATE + TICK ORCHESTRATION
// ==============================================================================
// One `Car` per drivable vehicle. It owns every piece of mutable simulation
// state and a non-owning handle to its chassis body inside some backend.
//
// Tick order (fixed):
//   input smoothing -> brake cooling -> steering -> drivetrain
//   -> ground sensing + compression -> suspension forces -> tyres
//   -> self-aligning torque -> aero + rolling resistance -> gravity
//   -> rear wheel speed correction -> optional telemetry line
//
// The drivetrain sees last tick's wheel spin; the tyres see this tick's.
// ==============================================================================

use nalgebra::{Isometry3, Point3, Vector3};
use tracing::{debug, info, warn};

use crate::dynamics::aero::{compute_aero, derive_from_shape};
use crate::dynamics::backend::{BodyState, ChassisDesc, ChassisShape, MassDesc, PhysicsBackend};
use crate::dynamics::brakes::{brake_efficiency, cool_brakes, AbsState};
use crate::dynamics::debug::{AeroDebugData, DebugRay, DebugSuspension, DebugOverlay, Shape2D, RAYS_PER_WHEEL};
use crate::dynamics::drivetrain::{DriveContext, Drivetrain};
use crate::dynamics::error::SetupError;
use crate::dynamics::input::InputState;
use crate::dynamics::steering::SteeringGeometry;
use crate::dynamics::suspension::{
    apply_contact, derive_constants, integrate_compression, sense_ground, spawn_height, spring_damper_forces,
    static_spring_force, suspension_endpoints, tire_load, ProbePattern,
};
use crate::dynamics::telemetry::{AidsTelemetry, Telemetry, WheelTelemetry};
use crate::dynamics::tire::{temp_grip_factor, PatchVelocity, TireModel};
use crate::dynamics::tuning::TuningParameters;
use crate::dynamics::types::{DerivedConstants, SurfaceType, VehicleConfig, Wheel, WheelId, GRAVITY, WHEEL_COUNT};

/// Everything `Car::setup` needs besides the backend.
#[derive(Debug, Clone, Default)]
pub struct SetupParams {
    /// Chassis-local collision hull. `None` falls back to a box.
    pub chassis_hull: Option<Vec<Point3<f32>>>,
    /// Render mesh vertices, used only for aero estimation.
    pub vertices: Vec<Point3<f32>>,
    pub config: VehicleConfig,
}

#[derive(Debug, Clone)]
pub struct Car<H> {
    body: Option<H>,
    cfg: VehicleConfig,
    tuning: TuningParameters,
    constants: DerivedConstants,
    probes: ProbePattern,

    wheels: [Wheel; WHEEL_COUNT],
    steer_angles: [f32; WHEEL_COUNT],
    input: InputState,
    input_target: InputState,
    drivetrain: Drivetrain,
    abs: AbsState,

    overlay: DebugOverlay,
    aero_debug: AeroDebugData,
    shape: Shape2D,
}

impl<H: Copy + PartialEq + std::fmt::Debug> Default for Car<H> {
    fn default() -> Self {
        Self::new(TuningParameters::default())
    }
}

fn validate(cfg: &VehicleConfig) -> Result<(), SetupError> {
    let positive = [
        (cfg.mass, "mass must be positive"),
        (cfg.length, "length must be positive"),
        (cfg.width, "width must be positive"),
        (cfg.height, "height must be positive"),
        (cfg.wheel_radius, "wheel_radius must be positive"),
        (cfg.wheel_mass, "wheel_mass must be positive"),
        (cfg.suspension_travel, "suspension_travel must be positive"),
    ];
    for (value, msg) in positive {
        if !(value.is_finite() && value > 0.0) {
            return Err(SetupError::InvalidConfig(msg));
        }
    }
    if cfg.wheel_width < 0.0 || cfg.wheel_width >= cfg.width {
        return Err(SetupError::InvalidConfig("wheel_width must be in [0, width)"));
    }
    Ok(())
}

impl<H: Copy + PartialEq + std::fmt::Debug> Car<H> {
    /// Inert car (no body) using `tuning`. Call [`Car::setup`] before ticking.
    pub fn new(tuning: TuningParameters) -> Self {
        let cfg = VehicleConfig::default();
        Self {
            body: None,
            constants: derive_constants(&cfg, &tuning.suspension),
            probes: ProbePattern::new(&cfg),
            wheels: [Wheel::new(tuning.tire.ambient_temp, tuning.brakes.ambient_temp); WHEEL_COUNT],
            steer_angles: [0.0; WHEEL_COUNT],
            input: InputState::default(),
            input_target: InputState::default(),
            drivetrain: Drivetrain::new(&tuning.engine),
            abs: AbsState::default(),
            overlay: DebugOverlay::default(),
            aero_debug: AeroDebugData::default(),
            shape: Shape2D::default(),
            cfg,
            tuning,
        }
    }

    // --------------------------------------------------
    // lifecycle
    // --------------------------------------------------

    /// (Re)create the chassis body and reset all dynamic state. On error the
    /// car is left without a body and `tick` does nothing.
    pub fn setup<P>(&mut self, physics: &mut P, params: SetupParams) -> Result<(), SetupError>
    where
        P: PhysicsBackend<Handle = H>,
    {
        self.destroy(physics);
        validate(&params.config)?;

        self.cfg = params.config;
        self.constants = derive_constants(&self.cfg, &self.tuning.suspension);
        self.probes = ProbePattern::new(&self.cfg);
        self.reset_state();

        let spawn_y = spawn_height(&self.cfg, &self.tuning.suspension);
        let desc = ChassisDesc {
            pose: Isometry3::translation(0.0, spawn_y, 0.0),
            shape: self.chassis_shape(params.chassis_hull),
            mass: self.mass_desc(),
            linear_damping: self.tuning.chassis.linear_damping,
            angular_damping: self.tuning.chassis.angular_damping,
            gravity_enabled: false,
            ccd_enabled: true,
        };
        self.body = Some(physics.create_chassis(&desc)?);

        if !params.vertices.is_empty() {
            if let Some(shape) = derive_from_shape(&params.vertices, &mut self.tuning.aero) {
                self.shape = shape;
            }
        }

        info!(
            mass = self.cfg.mass,
            spawn_y,
            k_front = self.constants.spring_stiffness[0],
            k_rear = self.constants.spring_stiffness[2],
            "car setup complete"
        );
        Ok(())
    }

    /// Swap the chassis collision shape and refresh mass / aero.
    pub fn set_chassis<P>(
        &mut self,
        physics: &mut P,
        hull: Option<Vec<Point3<f32>>>,
        vertices: &[Point3<f32>],
    ) -> Result<(), SetupError>
    where
        P: PhysicsBackend<Handle = H>,
    {
        let body = self.body.ok_or(SetupError::NotInitialized)?;
        physics.replace_chassis_shape(body, &self.chassis_shape(hull))?;
        physics.set_mass_properties(body, &self.mass_desc())?;
        if !vertices.is_empty() {
            if let Some(shape) = derive_from_shape(vertices, &mut self.tuning.aero) {
                self.shape = shape;
            }
        }
        info!("chassis shape replaced");
        Ok(())
    }

    /// Release the chassis body. The car becomes inert.
    pub fn destroy<P>(&mut self, physics: &mut P)
    where
        P: PhysicsBackend<Handle = H>,
    {
        if let Some(body) = self.body.take() {
            physics.destroy_body(body);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.body.is_some()
    }

    pub fn body(&self) -> Option<H> {
        self.body
    }

    fn reset_state(&mut self) {
        let t = &self.tuning;
        self.wheels = [Wheel::new(t.tire.ambient_temp, t.brakes.ambient_temp); WHEEL_COUNT];
        self.steer_angles = [0.0; WHEEL_COUNT];
        self.input = InputState::default();
        self.input_target = InputState::default();
        self.drivetrain = Drivetrain::new(&t.engine);
        self.abs = AbsState::default();
        self.overlay.clear();
        self.aero_debug = AeroDebugData::default();
    }

    fn chassis_shape(&self, hull: Option<Vec<Point3<f32>>>) -> ChassisShape {
        match hull {
            Some(points) if points.len() >= 4 => ChassisShape::ConvexHull(points),
            _ => ChassisShape::Box {
                half_extents: Vector3::new(self.cfg.width, self.cfg.height, self.cfg.length) * 0.5,
            },
        }
    }

    fn mass_desc(&self) -> MassDesc {
        let [x, y, z] = self.tuning.chassis.center_of_mass;
        MassDesc {
            mass: self.cfg.mass,
            local_com: Point3::new(x, y, z),
            principal_inertia: self.cfg.box_inertia(),
        }
    }

    // --------------------------------------------------
    // tick
    // --------------------------------------------------

    /// Advance the car by `dt` seconds. Forces are queued on the backend; the
    /// caller steps the world afterwards. No-op without a body.
    pub fn tick<P>(&mut self, physics: &mut P, dt: f32)
    where
        P: PhysicsBackend<Handle = H>,
    {
        let Some(body) = self.body else { return };
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        let Some(state) = physics.body_state(body) else {
            warn!(?body, "chassis body missing from physics world");
            return;
        };

        self.input.smooth_toward(&self.input_target, &self.tuning.input, dt);

        let forward_speed = state.linvel.dot(&state.forward());
        let speed_kmh = state.linvel.norm() * 3.6;

        cool_brakes(&mut self.wheels, state.linvel.norm(), &self.tuning.brakes, dt);

        let compression = self.wheels.map(|w| w.compression);
        self.steer_angles = SteeringGeometry {
            config: &self.cfg,
            steering: &self.tuning.steering,
            alignment: &self.tuning.alignment,
            deadzone: self.tuning.input.steering_deadzone,
        }
        .wheel_angles(self.input.steering, forward_speed, speed_kmh, &compression);

        let ctx = DriveContext {
            tuning: &self.tuning,
            input: self.input,
            forward_speed,
            radius: self.cfg.wheel_radius,
            moi: self.constants.wheel_moi,
            dt,
        };
        self.drivetrain.step(&ctx, &mut self.wheels, &mut self.abs);

        self.update_suspension(physics, body, &state, dt);
        self.apply_suspension_forces(physics, body, &state);
        let front_lateral = self.apply_tire_forces(physics, body, &state, dt);

        let sat = front_lateral * self.tuning.steering.pneumatic_trail * self.tuning.steering.self_align_gain;
        physics.add_torque(body, state.up() * sat);

        let aero = compute_aero(&state, &self.wheels, &self.cfg, &self.tuning.aero);
        for f in &aero.forces {
            match f.point {
                Some(p) => physics.add_force_at_point(body, f.force, p),
                None => physics.add_force(body, f.force),
            }
        }
        self.aero_debug = aero.debug;

        physics.add_force(body, Vector3::new(0.0, -GRAVITY * self.cfg.mass, 0.0));

        // rear wheels must not creep away from road speed
        let ground_w = forward_speed.abs() / self.cfg.wheel_radius;
        if ground_w > 5.0 && self.input.handbrake < self.tuning.input.deadzone {
            for w in self.wheels[2..].iter_mut() {
                let spin = w.angular_velocity.abs();
                if spin < ground_w * 0.3 || spin > ground_w * 1.5 {
                    w.angular_velocity = ground_w.copysign(forward_speed);
                }
            }
        }

        if self.tuning.diagnostics.log_telemetry {
            let rear_w = (self.wheels[2].angular_velocity + self.wheels[3].angular_velocity) * 0.5;
            info!(
                "rpm={:.0}, speed={:.0} km/h, gear={}{}, wheel_speed={:.0} km/h, throttle={:.0}%",
                self.drivetrain.rpm,
                speed_kmh,
                self.drivetrain.gear_string(),
                if self.drivetrain.is_shifting { "(shifting)" } else { "" },
                rear_w * self.cfg.wheel_radius * 3.6,
                self.input.throttle * 100.0
            );
        }
    }

    fn update_suspension<P>(&mut self, physics: &P, body: H, state: &BodyState, dt: f32)
    where
        P: PhysicsBackend<Handle = H>,
    {
        for id in WheelId::ALL {
            let i = id.index();
            let top = state.to_world(&(self.constants.wheel_offsets[i] + Vector3::y() * self.cfg.suspension_travel));
            let contact = sense_ground(physics, body, state, &top, &self.probes, &mut self.overlay.rays[i]);

            let w = &mut self.wheels[i];
            w.prev_compression = w.compression;
            apply_contact(w, contact, &self.cfg);
            integrate_compression(
                w,
                self.constants.spring_stiffness[i],
                self.constants.spring_damping[i],
                self.cfg.wheel_mass,
                dt,
            );
            self.overlay.suspension[i] = suspension_endpoints(state, &top, w.compression, &self.cfg);
        }
    }

    fn apply_suspension_forces<P>(&mut self, physics: &mut P, body: H, state: &BodyState)
    where
        P: PhysicsBackend<Handle = H>,
    {
        let forces = spring_damper_forces(&self.wheels, &self.constants, &self.cfg, &self.tuning.suspension);
        for (i, w) in self.wheels.iter_mut().enumerate() {
            w.tire_load = tire_load(w, forces[i], self.cfg.wheel_mass);
            if w.grounded && forces[i] > 0.0 {
                let at = state.to_world(&self.constants.wheel_offsets[i]);
                physics.add_force_at_point(body, w.contact_normal * forces[i], at);
            }
        }
    }

    /// Solve every tyre, push the forces, return the summed front lateral
    /// force of grounded wheels.
    fn apply_tire_forces<P>(&mut self, physics: &mut P, body: H, state: &BodyState, dt: f32) -> f32
    where
        P: PhysicsBackend<Handle = H>,
    {
        let model = TireModel {
            tire: &self.tuning.tire,
            wheel: &self.tuning.wheels,
            alignment: &self.tuning.alignment,
            surfaces: &self.tuning.surfaces,
            deadzone: self.tuning.input.deadzone,
            radius: self.cfg.wheel_radius,
            moi: self.constants.wheel_moi,
            chassis_mass: self.cfg.mass,
            log: self.tuning.diagnostics.log_pacejka,
        };
        let (fwd, right) = (state.forward(), state.right());
        if model.log {
            debug!(speed = state.linvel.norm(), "tire pass");
        }

        let mut front_lateral = 0.0;
        for id in WheelId::ALL {
            let i = id.index();
            let w = &mut self.wheels[i];

            if !w.grounded || w.tire_load <= 0.0 {
                model.relax_airborne(w, id, state.linvel.dot(&fwd), self.input.handbrake, dt);
                continue;
            }

            let at = state.to_world(&self.constants.wheel_offsets[i]);
            let mut v = state.velocity_at(&at);
            v -= w.contact_normal * v.dot(&w.contact_normal);

            let (sn, cs) = self.steer_angles[i].sin_cos();
            let wheel_fwd = fwd * cs + right * sn;
            let wheel_lat = right * cs - fwd * sn;
            let patch = PatchVelocity { vx: v.dot(&wheel_fwd), vy: v.dot(&wheel_lat) };

            let f = model.solve(w, id, patch, &self.input, dt);
            physics.add_force_at_point(body, wheel_lat * f.lateral + wheel_fwd * f.longitudinal, at);

            if id.is_front() {
                front_lateral += f.lateral;
            }
        }
        front_lateral
    }

    // --------------------------------------------------
    // driver input
    // --------------------------------------------------

    pub fn set_throttle(&mut self, v: f32) {
        self.input_target.throttle = v.clamp(0.0, 1.0);
    }

    pub fn set_brake(&mut self, v: f32) {
        self.input_target.brake = v.clamp(0.0, 1.0);
    }

    pub fn set_steering(&mut self, v: f32) {
        self.input_target.steering = v.clamp(-1.0, 1.0);
    }

    pub fn set_handbrake(&mut self, v: f32) {
        self.input_target.handbrake = v.clamp(0.0, 1.0);
    }

    pub fn set_input(&mut self, input: InputState) {
        self.input_target = input.clamped();
    }

    /// Smoothed input as used by the last tick.
    pub fn input(&self) -> InputState {
        self.input
    }

    pub fn input_target(&self) -> InputState {
        self.input_target
    }

    pub fn throttle(&self) -> f32 {
        self.input.throttle
    }

    pub fn brake(&self) -> f32 {
        self.input.brake
    }

    pub fn steering(&self) -> f32 {
        self.input.steering
    }

    pub fn handbrake(&self) -> f32 {
        self.input.handbrake
    }

    // --------------------------------------------------
    // body queries
    // --------------------------------------------------

    pub fn body_state<P>(&self, physics: &P) -> Option<BodyState>
    where
        P: PhysicsBackend<Handle = H>,
    {
        self.body.and_then(|b| physics.body_state(b))
    }

    pub fn speed_kmh<P>(&self, physics: &P) -> f32
    where
        P: PhysicsBackend<Handle = H>,
    {
        self.body_state(physics).map_or(0.0, |s| s.linvel.norm() * 3.6)
    }

    /// Signed speed along the chassis forward axis (m/s).
    pub fn forward_speed<P>(&self, physics: &P) -> f32
    where
        P: PhysicsBackend<Handle = H>,
    {
        self.body_state(physics).map_or(0.0, |s| s.linvel.dot(&s.forward()))
    }

    // --------------------------------------------------
    // engine / gearbox
    // --------------------------------------------------

    pub fn gear(&self) -> usize {
        self.drivetrain.gear
    }

    pub fn gear_string(&self) -> &'static str {
        self.drivetrain.gear_string()
    }

    pub fn current_rpm(&self) -> f32 {
        self.drivetrain.rpm
    }

    pub fn idle_rpm(&self) -> f32 {
        self.tuning.engine.idle_rpm
    }

    pub fn redline_rpm(&self) -> f32 {
        self.tuning.engine.redline_rpm
    }

    pub fn max_rpm(&self) -> f32 {
        self.tuning.engine.max_rpm
    }

    pub fn clutch(&self) -> f32 {
        self.drivetrain.clutch
    }

    pub fn is_shifting(&self) -> bool {
        self.drivetrain.is_shifting
    }

    pub fn engine_torque_current(&self) -> f32 {
        self.drivetrain.current_torque(&self.tuning.engine, &self.tuning.turbo)
    }

    pub fn boost_pressure(&self) -> f32 {
        self.drivetrain.boost
    }

    pub fn max_boost_pressure(&self) -> f32 {
        self.tuning.turbo.max_pressure
    }

    pub fn drivetrain(&self) -> &Drivetrain {
        &self.drivetrain
    }

    pub fn set_manual_transmission(&mut self, enabled: bool) {
        self.tuning.gearbox.manual = enabled;
    }

    pub fn manual_transmission(&self) -> bool {
        self.tuning.gearbox.manual
    }

    pub fn shift_up(&mut self) {
        self.drivetrain.shift_up(&self.tuning.gearbox);
    }

    pub fn shift_down(&mut self) {
        self.drivetrain.shift_down(&self.tuning.gearbox);
    }

    pub fn shift_to_neutral(&mut self) {
        self.drivetrain.shift_to_neutral(&self.tuning.gearbox);
    }

    // --------------------------------------------------
    // per-wheel queries (out of range -> neutral defaults)
    // --------------------------------------------------

    pub fn wheel(&self, i: usize) -> Option<&Wheel> {
        self.wheels.get(i)
    }

    pub fn wheels(&self) -> &[Wheel; WHEEL_COUNT] {
        &self.wheels
    }

    fn wheel_value(&self, i: usize, f: impl Fn(&Wheel) -> f32) -> f32 {
        self.wheels.get(i).map_or(0.0, f)
    }

    pub fn wheel_compression(&self, i: usize) -> f32 {
        self.wheel_value(i, |w| w.compression)
    }

    pub fn wheel_slip_angle(&self, i: usize) -> f32 {
        self.wheel_value(i, |w| w.slip_angle)
    }

    pub fn wheel_slip_ratio(&self, i: usize) -> f32 {
        self.wheel_value(i, |w| w.slip_ratio)
    }

    pub fn wheel_tire_load(&self, i: usize) -> f32 {
        self.wheel_value(i, |w| w.tire_load)
    }

    pub fn wheel_lateral_force(&self, i: usize) -> f32 {
        self.wheel_value(i, |w| w.lateral_force)
    }

    pub fn wheel_longitudinal_force(&self, i: usize) -> f32 {
        self.wheel_value(i, |w| w.longitudinal_force)
    }

    pub fn wheel_angular_velocity(&self, i: usize) -> f32 {
        self.wheel_value(i, |w| w.angular_velocity)
    }

    pub fn wheel_rotation(&self, i: usize) -> f32 {
        self.wheel_value(i, |w| w.rotation)
    }

    pub fn wheel_temperature(&self, i: usize) -> f32 {
        self.wheel_value(i, |w| w.temperature)
    }

    pub fn wheel_brake_temp(&self, i: usize) -> f32 {
        self.wheel_value(i, |w| w.brake_temp)
    }

    pub fn wheel_steer_angle(&self, i: usize) -> f32 {
        self.steer_angles.get(i).copied().unwrap_or(0.0)
    }

    pub fn is_wheel_grounded(&self, i: usize) -> bool {
        self.wheels.get(i).is_some_and(|w| w.grounded)
    }

    pub fn wheel_brake_efficiency(&self, i: usize) -> f32 {
        self.wheels.get(i).map_or(1.0, |w| brake_efficiency(w.brake_temp, &self.tuning.brakes))
    }

    pub fn wheel_temp_grip_factor(&self, i: usize) -> f32 {
        self.wheels.get(i).map_or(1.0, |w| temp_grip_factor(w.temperature, &self.tuning.tire))
    }

    pub fn wheel_suspension_force(&self, i: usize) -> f32 {
        match self.wheels.get(i) {
            Some(w) => static_spring_force(w, self.constants.spring_stiffness[i], self.cfg.suspension_travel),
            None => 0.0,
        }
    }

    pub fn wheel_surface(&self, i: usize) -> SurfaceType {
        self.wheels.get(i).map_or(SurfaceType::Asphalt, |w| w.contact_surface)
    }

    pub fn set_wheel_surface(&mut self, i: usize, surface: SurfaceType) {
        if let Some(w) = self.wheels.get_mut(i) {
            w.contact_surface = surface;
        }
    }

    /// Surface name for a raw index, "Unknown" when out of range.
    pub fn surface_name(index: usize) -> &'static str {
        SurfaceType::ALL.get(index).map_or("Unknown", |s| s.name())
    }

    /// Chassis-local wheel attachment, zero when out of range.
    pub fn wheel_offset(&self, i: usize) -> Vector3<f32> {
        self.constants.wheel_offsets.get(i).copied().unwrap_or_else(Vector3::zeros)
    }

    /// Move a wheel in the ground plane (x, z). Height is kept.
    pub fn set_wheel_offset(&mut self, i: usize, x: f32, z: f32) {
        if let Some(o) = self.constants.wheel_offsets.get_mut(i) {
            o.x = x;
            o.z = z;
        }
    }

    // --------------------------------------------------
    // geometry / alignment
    // --------------------------------------------------

    pub fn config(&self) -> &VehicleConfig {
        &self.cfg
    }

    pub fn tuning(&self) -> &TuningParameters {
        &self.tuning
    }

    pub fn suspension_travel(&self) -> f32 {
        self.cfg.suspension_travel
    }

    /// Vertical offset for the visual chassis mesh relative to the body.
    pub fn chassis_visual_offset_y(&self) -> f32 {
        -(self.cfg.height * 0.5 + self.cfg.suspension_height) + 0.1
    }

    pub fn front_camber(&self) -> f32 {
        self.tuning.alignment.front_camber
    }

    pub fn rear_camber(&self) -> f32 {
        self.tuning.alignment.rear_camber
    }

    pub fn front_toe(&self) -> f32 {
        self.tuning.alignment.front_toe
    }

    pub fn rear_toe(&self) -> f32 {
        self.tuning.alignment.rear_toe
    }

    // --------------------------------------------------
    // centre of mass
    // --------------------------------------------------

    pub fn center_of_mass(&self) -> [f32; 3] {
        self.tuning.chassis.center_of_mass
    }

    /// Store a new chassis-local centre of mass and push it to the body.
    pub fn set_center_of_mass<P>(&mut self, physics: &mut P, com: [f32; 3]) -> Result<(), SetupError>
    where
        P: PhysicsBackend<Handle = H>,
    {
        self.tuning.chassis.center_of_mass = com;
        match self.body {
            Some(body) => Ok(physics.set_mass_properties(body, &self.mass_desc())?),
            None => Ok(()),
        }
    }

    pub fn set_center_of_mass_x<P>(&mut self, physics: &mut P, x: f32) -> Result<(), SetupError>
    where
        P: PhysicsBackend<Handle = H>,
    {
        let [_, y, z] = self.center_of_mass();
        self.set_center_of_mass(physics, [x, y, z])
    }

    pub fn set_center_of_mass_y<P>(&mut self, physics: &mut P, y: f32) -> Result<(), SetupError>
    where
        P: PhysicsBackend<Handle = H>,
    {
        let [x, _, z] = self.center_of_mass();
        self.set_center_of_mass(physics, [x, y, z])
    }

    pub fn set_center_of_mass_z<P>(&mut self, physics: &mut P, z: f32) -> Result<(), SetupError>
    where
        P: PhysicsBackend<Handle = H>,
    {
        let [x, y, _] = self.center_of_mass();
        self.set_center_of_mass(physics, [x, y, z])
    }

    // --------------------------------------------------
    // aero
    // --------------------------------------------------

    pub fn frontal_area(&self) -> f32 {
        self.tuning.aero.frontal_area
    }

    pub fn set_frontal_area(&mut self, v: f32) {
        self.tuning.aero.frontal_area = v;
    }

    pub fn side_area(&self) -> f32 {
        self.tuning.aero.side_area
    }

    pub fn set_side_area(&mut self, v: f32) {
        self.tuning.aero.side_area = v;
    }

    pub fn drag_coeff(&self) -> f32 {
        self.tuning.aero.drag_coeff
    }

    pub fn set_drag_coeff(&mut self, v: f32) {
        self.tuning.aero.drag_coeff = v;
    }

    pub fn lift_coeff_front(&self) -> f32 {
        self.tuning.aero.lift_coeff_front
    }

    pub fn set_lift_coeff_front(&mut self, v: f32) {
        self.tuning.aero.lift_coeff_front = v;
    }

    pub fn lift_coeff_rear(&self) -> f32 {
        self.tuning.aero.lift_coeff_rear
    }

    pub fn set_lift_coeff_rear(&mut self, v: f32) {
        self.tuning.aero.lift_coeff_rear = v;
    }

    pub fn ground_effect_enabled(&self) -> bool {
        self.tuning.aero.ground_effect_enabled
    }

    pub fn set_ground_effect_enabled(&mut self, enabled: bool) {
        self.tuning.aero.ground_effect_enabled = enabled;
    }

    pub fn ground_effect_multiplier(&self) -> f32 {
        self.tuning.aero.ground_effect_multiplier
    }

    pub fn set_ground_effect_multiplier(&mut self, v: f32) {
        self.tuning.aero.ground_effect_multiplier = v;
    }

    pub fn yaw_aero_enabled(&self) -> bool {
        self.tuning.aero.yaw_aero_enabled
    }

    pub fn set_yaw_aero_enabled(&mut self, enabled: bool) {
        self.tuning.aero.yaw_aero_enabled = enabled;
    }

    pub fn pitch_aero_enabled(&self) -> bool {
        self.tuning.aero.pitch_aero_enabled
    }

    pub fn set_pitch_aero_enabled(&mut self, enabled: bool) {
        self.tuning.aero.pitch_aero_enabled = enabled;
    }

    /// Last tick's aero forces and application points.
    pub fn aero_debug(&self) -> &AeroDebugData {
        &self.aero_debug
    }

    /// Hull silhouettes from the last aero-from-shape pass.
    pub fn shape_data(&self) -> &Shape2D {
        &self.shape
    }

    // --------------------------------------------------
    // driver aids
    // --------------------------------------------------

    pub fn set_abs_enabled(&mut self, enabled: bool) {
        self.tuning.abs.enabled = enabled;
    }

    pub fn abs_enabled(&self) -> bool {
        self.tuning.abs.enabled
    }

    pub fn is_abs_active(&self, i: usize) -> bool {
        self.abs.active.get(i).copied().unwrap_or(false)
    }

    pub fn is_abs_active_any(&self) -> bool {
        self.abs.any_active()
    }

    pub fn set_tc_enabled(&mut self, enabled: bool) {
        self.tuning.traction_control.enabled = enabled;
    }

    pub fn tc_enabled(&self) -> bool {
        self.tuning.traction_control.enabled
    }

    pub fn is_tc_active(&self) -> bool {
        self.drivetrain.tc_active
    }

    pub fn tc_reduction(&self) -> f32 {
        self.drivetrain.tc_reduction
    }

    pub fn set_turbo_enabled(&mut self, enabled: bool) {
        self.tuning.turbo.enabled = enabled;
    }

    pub fn turbo_enabled(&self) -> bool {
        self.tuning.turbo.enabled
    }

    // --------------------------------------------------
    // diagnostics
    // --------------------------------------------------

    pub fn set_draw_raycasts(&mut self, enabled: bool) {
        self.tuning.diagnostics.draw_raycasts = enabled;
    }

    pub fn draw_raycasts(&self) -> bool {
        self.tuning.diagnostics.draw_raycasts
    }

    pub fn set_draw_suspension(&mut self, enabled: bool) {
        self.tuning.diagnostics.draw_suspension = enabled;
    }

    pub fn draw_suspension(&self) -> bool {
        self.tuning.diagnostics.draw_suspension
    }

    pub fn set_log_pacejka(&mut self, enabled: bool) {
        self.tuning.diagnostics.log_pacejka = enabled;
    }

    pub fn log_pacejka(&self) -> bool {
        self.tuning.diagnostics.log_pacejka
    }

    pub fn set_log_telemetry(&mut self, enabled: bool) {
        self.tuning.diagnostics.log_telemetry = enabled;
    }

    pub fn log_telemetry(&self) -> bool {
        self.tuning.diagnostics.log_telemetry
    }

    pub fn rays_per_wheel(&self) -> usize {
        RAYS_PER_WHEEL
    }

    /// Probe ray `ray` of `wheel`; a zeroed, non-hit ray when out of range.
    pub fn debug_ray(&self, wheel: usize, ray: usize) -> DebugRay {
        self.overlay.ray(wheel, ray).copied().unwrap_or_default()
    }

    pub fn debug_suspension(&self, wheel: usize) -> DebugSuspension {
        self.overlay.suspension(wheel).copied().unwrap_or_default()
    }

    // --------------------------------------------------
    // telemetry
    // --------------------------------------------------

    pub fn telemetry<P>(&self, physics: &P, tick: u64) -> Telemetry
    where
        P: PhysicsBackend<Handle = H>,
    {
        let state = self.body_state(physics);
        let wheels = WheelId::ALL.map(|id| {
            let i = id.index();
            let w = &self.wheels[i];
            WheelTelemetry {
                id,
                grounded: w.grounded,
                compression: w.compression,
                suspension_force: self.wheel_suspension_force(i),
                load: w.tire_load,
                steer_angle: self.steer_angles[i],
                angular_velocity: w.angular_velocity,
                slip_angle: w.slip_angle,
                slip_ratio: w.slip_ratio,
                lateral_force: w.lateral_force,
                longitudinal_force: w.longitudinal_force,
                tire_temp: w.temperature,
                temp_grip_factor: self.wheel_temp_grip_factor(i),
                brake_temp: w.brake_temp,
                brake_efficiency: self.wheel_brake_efficiency(i),
                abs_active: self.abs.active[i],
                surface: w.contact_surface,
            }
        });

        Telemetry {
            tick,
            position: state.map_or([0.0; 3], |s| {
                let t = s.pose.translation.vector;
                [t.x, t.y, t.z]
            }),
            speed_kmh: state.map_or(0.0, |s| s.linvel.norm() * 3.6),
            gear: self.drivetrain.gear,
            gear_name: self.drivetrain.gear_string(),
            rpm: self.drivetrain.rpm,
            clutch: self.drivetrain.clutch,
            shifting: self.drivetrain.is_shifting,
            boost: self.drivetrain.boost,
            engine_torque: self.engine_torque_current(),
            throttle: self.input.throttle,
            brake: self.input.brake,
            steering: self.input.steering,
            handbrake: self.input.handbrake,
            aids: AidsTelemetry {
                abs_enabled: self.tuning.abs.enabled,
                abs_active: self.abs.any_active(),
                tc_enabled: self.tuning.traction_control.enabled,
                tc_active: self.drivetrain.tc_active,
                tc_reduction: self.drivetrain.tc_reduction,
                turbo_enabled: self.tuning.turbo.enabled,
                manual: self.tuning.gearbox.manual,
            },
            wheels,
            aero: self.aero_debug,
        }
    }
}
