// ==============================================================================
// suspension.rs — GROUND SENSING + SPRING / DAMPER / ANTI-ROLL
// ------------------------------------------------------------------------------
// Per wheel:
// 1) 7 probe rays from the top of travel, straight down in chassis space.
//    Fore/aft probes are raised by the tyre curvature height so a round tyre
//    rolling over a step does not clip or float.
// 2) nearest corrected hit -> target compression in [0, 1]
// 3) unsprung mass tracks the target (semi-implicit Euler, clamped)
//
// Then, once all four compressions are known:
// 4) spring + asymmetric damper force, anti-roll coupling, tyre load.
//
// Compression 0 = fully extended, 1 = fully compressed.
// ==============================================================================

use nalgebra::{Point3, Vector3};

use crate::dynamics::backend::{BodyState, PhysicsBackend};
use crate::dynamics::debug::{DebugRay, DebugSuspension, RAYS_PER_WHEEL};
use crate::dynamics::tuning::SuspensionTuning;
use crate::dynamics::types::{p3, DerivedConstants, VehicleConfig, Wheel, WheelId, GRAVITY, WHEEL_COUNT};

const TWO_PI: f32 = 2.0 * std::f32::consts::PI;

/// Wheel offsets, spin inertia and per-corner spring/damper rates.
pub fn derive_constants(cfg: &VehicleConfig, tuning: &SuspensionTuning) -> DerivedConstants {
    let front_z = cfg.length * 0.35;
    let rear_z = -cfg.length * 0.35;
    let half_w = cfg.width * 0.5 - cfg.wheel_width * 0.5;
    let y = -cfg.suspension_height;

    let wheel_offsets = [
        Vector3::new(-half_w, y, front_z),
        Vector3::new(half_w, y, front_z),
        Vector3::new(-half_w, y, rear_z),
        Vector3::new(half_w, y, rear_z),
    ];

    let mut spring_stiffness = [0.0; WHEEL_COUNT];
    let mut spring_damping = [0.0; WHEEL_COUNT];
    for id in WheelId::ALL {
        let (mass, freq) = corner_mass_and_freq(cfg, tuning, id);
        let omega = TWO_PI * freq;
        let k = mass * omega * omega;
        spring_stiffness[id.index()] = k;
        spring_damping[id.index()] = 2.0 * tuning.damping_ratio * (k * mass).sqrt();
    }

    DerivedConstants {
        wheel_offsets,
        wheel_moi: 0.7 * cfg.wheel_mass * cfg.wheel_radius * cfg.wheel_radius,
        spring_stiffness,
        spring_damping,
    }
}

fn corner_mass_and_freq(cfg: &VehicleConfig, tuning: &SuspensionTuning, id: WheelId) -> (f32, f32) {
    if id.is_front() {
        (cfg.mass * tuning.front_mass_share * 0.5, tuning.front_spring_freq)
    } else {
        (cfg.mass * (1.0 - tuning.front_mass_share) * 0.5, tuning.rear_spring_freq)
    }
}

/// Chassis spawn height so the front springs start near their static sag.
pub fn spawn_height(cfg: &VehicleConfig, tuning: &SuspensionTuning) -> f32 {
    let (mass, freq) = corner_mass_and_freq(cfg, tuning, WheelId::FL);
    let omega = TWO_PI * freq;
    let stiffness = mass * omega * omega;
    let sag = (mass * GRAVITY / stiffness).clamp(0.0, cfg.suspension_travel * 0.8);
    cfg.wheel_radius + cfg.suspension_height + sag
}

// --------------------------------------------------
// probe pattern
// --------------------------------------------------

/// Height of the tyre surface above its lowest point at fore/aft offset `x`.
pub fn curvature_height(radius: f32, x: f32) -> f32 {
    let x = x.abs().min(radius * 0.95);
    radius - (radius * radius - x * x).sqrt()
}

/// One probe: `forward` / `right` offsets and how far it is raised.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    pub forward: f32,
    pub right: f32,
    pub raise: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbePattern {
    pub probes: [Probe; RAYS_PER_WHEEL],
    pub ray_length: f32,
    /// Corrected distance beyond which a hit is ignored.
    pub max_distance: f32,
}

impl ProbePattern {
    pub fn new(cfg: &VehicleConfig) -> Self {
        let r = cfg.wheel_radius;
        let near = r * 0.4;
        let far = r * 0.75;
        let h_near = curvature_height(r, near);
        let h_far = curvature_height(r, far);
        let side = cfg.wheel_width * 0.4;

        let p = |forward, right, raise| Probe { forward, right, raise };
        Self {
            probes: [
                p(0.0, 0.0, 0.0),
                p(near, 0.0, h_near),
                p(far, 0.0, h_far),
                p(-near, 0.0, h_near),
                p(-far, 0.0, h_far),
                p(0.0, -side, 0.0),
                p(0.0, side, 0.0),
            ],
            ray_length: cfg.suspension_travel + r + h_far + 0.5,
            max_distance: cfg.suspension_travel + r,
        }
    }
}

/// Result of probing under one wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundContact {
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    /// Corrected distance from the top of travel to the ground.
    pub distance: f32,
}

/// Cast the probe pattern for one wheel. Fills `rays` for visualisation.
pub fn sense_ground<P: PhysicsBackend>(
    physics: &P,
    body: P::Handle,
    state: &BodyState,
    attach_top: &Point3<f32>,
    pattern: &ProbePattern,
    rays: &mut [DebugRay; RAYS_PER_WHEEL],
) -> Option<GroundContact> {
    let fwd = state.forward();
    let right = state.right();
    let down = -state.up();

    let mut best: Option<(f32, Point3<f32>)> = None;
    let mut normal_sum = Vector3::zeros();

    for (probe, debug) in pattern.probes.iter().zip(rays.iter_mut()) {
        let origin = attach_top + fwd * probe.forward + right * probe.right - down * probe.raise;
        *debug = DebugRay {
            origin: p3(&origin),
            hit_point: p3(&(origin + down * pattern.ray_length)),
            hit: false,
        };

        let Some(hit) = physics.cast_ray(origin, down, pattern.ray_length, body) else {
            continue;
        };
        debug.hit_point = p3(&hit.point);
        debug.hit = true;

        let corrected = hit.distance - probe.raise;
        if corrected > pattern.max_distance {
            continue;
        }
        normal_sum += hit.normal;
        if best.is_none_or(|(d, _)| corrected < d) {
            best = Some((corrected, hit.point));
        }
    }

    let (distance, point) = best?;
    let normal = normal_sum.try_normalize(1e-6).unwrap_or_else(Vector3::y);
    Some(GroundContact { point, normal, distance })
}

/// Record the probe result on the wheel and derive its target compression.
pub fn apply_contact(wheel: &mut Wheel, contact: Option<GroundContact>, cfg: &VehicleConfig) {
    match contact {
        Some(c) => {
            wheel.grounded = true;
            wheel.contact_point = c.point;
            wheel.contact_normal = c.normal;
            let from_rest = c.distance - cfg.wheel_radius;
            wheel.target_compression = (1.0 - from_rest / cfg.suspension_travel).clamp(0.0, 1.0);
        }
        None => {
            wheel.grounded = false;
            wheel.target_compression = 0.0;
            wheel.contact_normal = Vector3::y();
        }
    }
}

/// Advance the unsprung mass toward its target compression.
pub fn integrate_compression(wheel: &mut Wheel, stiffness: f32, damping: f32, wheel_mass: f32, dt: f32) {
    let error = wheel.target_compression - wheel.compression;
    let spring = stiffness * error;
    let damper = -damping * wheel.compression_velocity * 0.15;
    let accel = (spring + damper) / wheel_mass.max(1e-3);

    wheel.compression_velocity += accel * dt;
    wheel.compression += wheel.compression_velocity * dt;

    // no velocity may push through a bound
    if wheel.compression > 1.0 {
        wheel.compression = 1.0;
        wheel.compression_velocity = wheel.compression_velocity.min(0.0);
    } else if wheel.compression < 0.0 {
        wheel.compression = 0.0;
        wheel.compression_velocity = wheel.compression_velocity.max(0.0);
    } else if !wheel.compression.is_finite() {
        wheel.compression = 0.0;
        wheel.compression_velocity = 0.0;
    }
}

/// Suspension debug endpoints: top of travel and current wheel centre.
pub fn suspension_endpoints(
    state: &BodyState,
    attach_top: &Point3<f32>,
    compression: f32,
    cfg: &VehicleConfig,
) -> DebugSuspension {
    let down = -state.up();
    let centre = attach_top + down * (cfg.suspension_travel * (1.0 - compression) + cfg.wheel_radius);
    DebugSuspension { top: p3(attach_top), bottom: p3(&centre) }
}

// --------------------------------------------------
// forces
// --------------------------------------------------

/// Spring + damper force per wheel after anti-roll coupling, clamped to
/// `[0, max_force]`. Airborne wheels get 0.
pub fn spring_damper_forces(
    wheels: &[Wheel; WHEEL_COUNT],
    constants: &DerivedConstants,
    cfg: &VehicleConfig,
    tuning: &SuspensionTuning,
) -> [f32; WHEEL_COUNT] {
    let mut forces = [0.0; WHEEL_COUNT];
    for (i, w) in wheels.iter().enumerate() {
        if !w.grounded {
            continue;
        }
        let spring = constants.spring_stiffness[i] * w.compression * cfg.suspension_travel;
        let vel = (w.compression_velocity * cfg.suspension_travel)
            .clamp(-tuning.max_damper_velocity, tuning.max_damper_velocity);
        let ratio = if vel > 0.0 { tuning.bump_ratio } else { tuning.rebound_ratio };
        let damper = constants.spring_damping[i] * vel * ratio;
        forces[i] = (spring + damper).clamp(0.0, tuning.max_force);
    }

    anti_roll(&mut forces, wheels, WheelId::FL, WheelId::FR, tuning.front_arb_stiffness, cfg.suspension_travel);
    anti_roll(&mut forces, wheels, WheelId::RL, WheelId::RR, tuning.rear_arb_stiffness, cfg.suspension_travel);

    for f in &mut forces {
        *f = f.clamp(0.0, tuning.max_force);
    }
    forces
}

fn anti_roll(
    forces: &mut [f32; WHEEL_COUNT],
    wheels: &[Wheel; WHEEL_COUNT],
    left: WheelId,
    right: WheelId,
    stiffness: f32,
    travel: f32,
) {
    let (l, r) = (left.index(), right.index());
    let arb = (wheels[l].compression - wheels[r].compression) * stiffness * travel;
    if wheels[l].grounded {
        forces[l] += arb;
    }
    if wheels[r].grounded {
        forces[r] -= arb;
    }
}

/// Normal load seen by the tyre: spring force plus unsprung weight.
pub fn tire_load(wheel: &Wheel, force: f32, wheel_mass: f32) -> f32 {
    if wheel.grounded { force + wheel_mass * GRAVITY } else { 0.0 }
}

/// Spring-only force, as reported to telemetry.
pub fn static_spring_force(wheel: &Wheel, stiffness: f32, travel: f32) -> f32 {
    if wheel.grounded { stiffness * wheel.compression * travel } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grounded_wheel(compression: f32) -> Wheel {
        Wheel { grounded: true, compression, ..Wheel::new(50.0, 200.0) }
    }

    #[test]
    fn constants_follow_corner_mass() {
        let cfg = VehicleConfig::default();
        let c = derive_constants(&cfg, &SuspensionTuning::default());

        // 1500 kg * 0.4 / 2 = 300 kg per front corner at 1.5 Hz
        let omega = TWO_PI * 1.5;
        assert_relative_eq!(c.spring_stiffness[0], 300.0 * omega * omega, max_relative = 1e-5);
        assert_eq!(c.spring_stiffness[0], c.spring_stiffness[1]);
        assert!(c.spring_stiffness[2] > c.spring_stiffness[0]);
        assert_relative_eq!(c.wheel_moi, 0.7 * 20.0 * 0.35 * 0.35, max_relative = 1e-6);

        assert!(c.wheel_offsets[0].x < 0.0 && c.wheel_offsets[1].x > 0.0);
        assert!(c.wheel_offsets[0].z > 0.0 && c.wheel_offsets[2].z < 0.0);
    }

    #[test]
    fn curvature_is_zero_at_centre_and_capped() {
        assert_eq!(curvature_height(0.35, 0.0), 0.0);
        let capped = curvature_height(0.35, 10.0);
        assert_relative_eq!(capped, curvature_height(0.35, 0.35 * 0.95));
        assert!(capped < 0.35);
    }

    #[test]
    fn contact_maps_distance_to_target() {
        let cfg = VehicleConfig::default();
        let mut w = Wheel::new(50.0, 200.0);

        let contact = GroundContact { point: Point3::origin(), normal: Vector3::y(), distance: cfg.wheel_radius };
        apply_contact(&mut w, Some(contact), &cfg);
        assert!(w.grounded);
        assert_eq!(w.target_compression, 1.0);

        let half = GroundContact { distance: cfg.wheel_radius + cfg.suspension_travel * 0.5, ..contact };
        apply_contact(&mut w, Some(half), &cfg);
        assert_relative_eq!(w.target_compression, 0.5, epsilon = 1e-5);

        apply_contact(&mut w, None, &cfg);
        assert!(!w.grounded);
        assert_eq!(w.target_compression, 0.0);
        assert_eq!(w.contact_normal, Vector3::y());
    }

    #[test]
    fn integration_clamps_and_kills_outward_velocity() {
        let mut w = Wheel { target_compression: 1.0, compression: 0.99, compression_velocity: 50.0, ..Wheel::new(50.0, 200.0) };
        integrate_compression(&mut w, 30000.0, 4000.0, 20.0, 1.0 / 60.0);
        assert_eq!(w.compression, 1.0);
        assert!(w.compression_velocity <= 0.0);

        let mut w = Wheel { target_compression: 0.0, compression: 0.01, compression_velocity: -50.0, ..Wheel::new(50.0, 200.0) };
        integrate_compression(&mut w, 30000.0, 4000.0, 20.0, 1.0 / 60.0);
        assert_eq!(w.compression, 0.0);
        assert!(w.compression_velocity >= 0.0);
    }

    #[test]
    fn damper_is_softer_in_bump_than_rebound() {
        let cfg = VehicleConfig::default();
        let tuning = SuspensionTuning { front_arb_stiffness: 0.0, rear_arb_stiffness: 0.0, ..Default::default() };
        let c = derive_constants(&cfg, &tuning);

        let mut wheels = [grounded_wheel(0.5); WHEEL_COUNT];
        wheels[0].compression_velocity = 1.0;
        wheels[1].compression_velocity = -1.0;
        let f = spring_damper_forces(&wheels, &c, &cfg, &tuning);
        let spring = c.spring_stiffness[0] * 0.5 * cfg.suspension_travel;
        assert!(f[0] - spring < spring - f[1]);
    }

    #[test]
    fn anti_roll_loads_the_compressed_side() {
        let cfg = VehicleConfig::default();
        let tuning = SuspensionTuning::default();
        let c = derive_constants(&cfg, &tuning);

        let wheels = [grounded_wheel(0.7), grounded_wheel(0.3), grounded_wheel(0.5), grounded_wheel(0.5)];
        let f = spring_damper_forces(&wheels, &c, &cfg, &tuning);
        let spring_l = c.spring_stiffness[0] * 0.7 * cfg.suspension_travel;
        let arb = 0.4 * tuning.front_arb_stiffness * cfg.suspension_travel;
        assert_relative_eq!(f[0], spring_l + arb, max_relative = 1e-5);
        assert_relative_eq!(f[2], f[3]);
    }

    #[test]
    fn airborne_wheel_carries_no_load() {
        let w = Wheel::new(50.0, 200.0);
        assert_eq!(tire_load(&w, 0.0, 20.0), 0.0);
        let g = grounded_wheel(0.5);
        assert_relative_eq!(tire_load(&g, 1000.0, 20.0), 1000.0 + 20.0 * GRAVITY);
        assert_eq!(static_spring_force(&w, 1e4, 0.2), 0.0);
    }
}
