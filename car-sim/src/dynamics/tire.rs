// ==============================================================================
// tire.rs — TIRE FORCE MODEL
// ------------------------------------------------------------------------------
// Engine-agnostic. Given the contact patch velocity in the wheel frame and the
// wheel state, produce lateral / longitudinal forces, update slip, spin and
// tyre temperature. The caller applies the returned force to the chassis.
//
// Regimes, checked in this order every tick:
//   Airborne  : not grounded or no load     -> spin relaxes to body speed
//   AtRest    : ground + wheel speed ~ 0     -> viscous friction, no Pacejka
//   Rolling   : max(|ws|, |vx|) > min slip   -> relaxed slip + Pacejka
//   LowSpeed  : in between                   -> linear blend
//
// Frame: `vx` along the wheel heading, `vy` along the wheel's right vector.
// Positive lateral force pushes toward the wheel's right.
// ==============================================================================

use tracing::debug;

use crate::dynamics::input::InputState;
use crate::dynamics::tuning::{AlignmentTuning, PacejkaCoeffs, SurfaceTuning, TireTuning, WheelTuning};
use crate::dynamics::types::{exp_decay, lerp, Wheel, WheelId};

// ------------------------------------------------------------------------------
// pure curve helpers
// ------------------------------------------------------------------------------

/// D·sin(C·atan(Bx − E·(Bx − atan(Bx))))
#[inline]
pub fn pacejka(slip: f32, k: &PacejkaCoeffs) -> f32 {
    let bx = k.b * slip;
    k.d * (k.c * (bx - k.e * (bx - bx.atan())).atan()).sin()
}

/// Grip grows sub-linearly with load.
pub fn load_sensitive_grip(load: f32, tuning: &TireTuning) -> f32 {
    if load <= 0.0 {
        return 0.0;
    }
    load * (load / tuning.load_reference).powf(tuning.load_sensitivity - 1.0)
}

/// Symmetric penalty around the optimal tyre temperature.
pub fn temp_grip_factor(temperature: f32, tuning: &TireTuning) -> f32 {
    let penalty = ((temperature - tuning.optimal_temp).abs() / tuning.temp_range.max(1e-3)).clamp(0.0, 1.0);
    1.0 - penalty * tuning.grip_temp_factor
}

/// Grip loss from effective camber. Right-hand wheels see slip mirrored.
pub fn camber_grip_factor(camber: f32, slip_angle: f32, is_left: bool) -> f32 {
    let side_slip = if is_left { slip_angle } else { -slip_angle };
    1.0 - (camber - side_slip * 0.3).abs() * 0.1
}

/// Quadratic fade of slip angles inside the deadband.
pub fn apply_deadband(slip_angle: f32, deadband: f32) -> f32 {
    if deadband > 0.0 && slip_angle.abs() < deadband {
        let f = slip_angle.abs() / deadband;
        slip_angle * f * f
    } else {
        slip_angle
    }
}

/// Scale a (lat, long) pair back onto the unit friction circle if outside it.
#[inline]
pub fn friction_ellipse(lat: f32, long: f32) -> (f32, f32) {
    let combined = lat.hypot(long);
    if combined > 1.0 { (lat / combined, long / combined) } else { (lat, long) }
}

/// Combined-slip friction coefficients for an (already deadbanded) slip angle
/// and a slip ratio. The result always lies inside the unit circle.
pub fn combined_mu(slip_angle: f32, slip_ratio: f32, tuning: &TireTuning) -> (f32, f32) {
    let (mut lat, long) = friction_ellipse(
        pacejka(slip_angle, &tuning.lateral),
        pacejka(slip_ratio, &tuning.longitudinal),
    );

    // keep some cornering force under heavy wheelspin / lockup
    let floor = tuning.min_lateral_grip * long.abs();
    if lat.abs() < floor && slip_angle.abs() > 0.001 {
        let scale = floor / lat.abs().max(0.001);
        lat *= scale.min(2.0);
    }
    friction_ellipse(lat, long)
}

// ------------------------------------------------------------------------------
// model
// ------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchVelocity {
    pub vx: f32, // m/s along wheel heading
    pub vy: f32, // m/s along wheel right
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TireRegime {
    Airborne,
    AtRest,
    Rolling,
    LowSpeed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TireForce {
    pub lateral: f32,
    pub longitudinal: f32,
    pub regime: TireRegime,
}

#[derive(Debug, Clone, Copy)]
pub struct TireModel<'a> {
    pub tire: &'a TireTuning,
    pub wheel: &'a WheelTuning,
    pub alignment: &'a AlignmentTuning,
    pub surfaces: &'a SurfaceTuning,
    pub deadzone: f32,
    pub radius: f32,
    pub moi: f32,
    pub chassis_mass: f32,
    pub log: bool,
}

impl TireModel<'_> {
    pub fn camber(&self, id: WheelId) -> f32 {
        if id.is_front() { self.alignment.front_camber } else { self.alignment.rear_camber }
    }

    pub fn peak_force(&self, id: WheelId, wheel: &Wheel) -> f32 {
        self.tire.friction
            * load_sensitive_grip(wheel.tire_load.max(0.0), self.tire)
            * temp_grip_factor(wheel.temperature, self.tire)
            * camber_grip_factor(self.camber(id), wheel.slip_angle, id.is_left())
            * self.surfaces.friction(wheel.contact_surface)
    }

    /// No contact: forces cleared, spin drifts toward the body's rolling speed.
    pub fn relax_airborne(&self, wheel: &mut Wheel, id: WheelId, forward_speed: f32, handbrake: f32, dt: f32) -> TireForce {
        wheel.clear_tire_forces();

        if handbrake > self.deadzone && id.is_rear() {
            wheel.angular_velocity = 0.0;
        } else {
            let target = forward_speed / self.radius;
            wheel.angular_velocity =
                lerp(wheel.angular_velocity, target, exp_decay(self.wheel.airborne_match_rate, dt));
        }

        let above = wheel.temperature - self.tire.ambient_temp;
        if above > 0.0 {
            wheel.temperature -= self.tire.cooling_rate * 3.0 * (above / 60.0) * dt;
        }
        wheel.temperature = wheel.temperature.max(self.tire.ambient_temp).min(self.tire.max_temp);
        wheel.rotation += wheel.angular_velocity * dt;

        if self.log {
            debug!(wheel = %id, load = wheel.tire_load, w = wheel.angular_velocity, "tire airborne");
        }
        TireForce { lateral: 0.0, longitudinal: 0.0, regime: TireRegime::Airborne }
    }

    /// Grounded tyre step. Mutates slip, spin, temperature and stored forces.
    pub fn solve(&self, wheel: &mut Wheel, id: WheelId, patch: PatchVelocity, input: &InputState, dt: f32) -> TireForce {
        let t = self.tire;
        let PatchVelocity { vx, vy } = patch;
        let wheel_speed = wheel.angular_velocity * self.radius;
        let ground_speed = vx.hypot(vy);
        let max_v = wheel_speed.abs().max(vx.abs());
        let peak = self.peak_force(id, wheel);

        if self.log {
            debug!(wheel = %id, vx, vy, ws = wheel_speed, load = wheel.tire_load, peak, "tire input");
        }

        if ground_speed < 0.1 && wheel_speed.abs() < 0.2 {
            return self.hold_at_rest(wheel, id, patch, peak, dt);
        }

        let rolling = max_v > t.min_slip_speed;
        let (mut lat, mut long) = if rolling {
            let raw_ratio = ((wheel_speed - vx) / max_v).clamp(-1.0, 1.0);
            let raw_angle = vy.atan2(vx.abs());
            let blend = 1.0 - (-(ground_speed * dt) / t.relaxation_length.max(1e-3)).exp();
            wheel.slip_ratio = lerp(wheel.slip_ratio, raw_ratio, blend);
            wheel.slip_angle = lerp(wheel.slip_angle, raw_angle, blend);

            let slip_angle = apply_deadband(wheel.slip_angle, t.slip_angle_deadband);
            let (lat_mu, long_mu) = combined_mu(slip_angle, wheel.slip_ratio, t);

            let mut lat = -lat_mu * peak;
            let long = long_mu * peak;
            if id.is_rear() {
                lat *= t.rear_grip_ratio;
            }
            let thrust = self.camber(id) * wheel.tire_load * t.camber_thrust_coeff;
            lat += if id.is_left() { -thrust } else { thrust };

            if self.log {
                debug!(wheel = %id, sr = wheel.slip_ratio, sa = wheel.slip_angle, lat_mu, long_mu, "pacejka");
            }
            (lat, long)
        } else {
            wheel.slip_ratio = 0.0;
            wheel.slip_angle = 0.0;
            let speed_factor = (max_v / t.min_slip_speed).clamp(0.0, 1.0);
            let force = peak * speed_factor * 0.3;
            let long = ((wheel_speed - vx) / t.min_slip_speed).clamp(-1.0, 1.0) * force;
            let lat = (-vy / t.min_slip_speed).clamp(-1.0, 1.0) * force;
            (lat, long)
        };

        self.heat(wheel, lat.hypot(long), ground_speed, wheel_speed, rolling, dt);

        let handbrake = id.is_rear() && input.handbrake > self.deadzone;
        if handbrake {
            let sliding = self.wheel.handbrake_sliding_factor * peak;
            long = if vx.abs() > 0.01 { -vx.signum() * sliding * input.handbrake } else { 0.0 };
            lat *= 1.0 - 0.5 * input.handbrake;
        }

        wheel.lateral_force = lat;
        wheel.longitudinal_force = long;

        if handbrake {
            wheel.angular_velocity = 0.0;
        } else {
            wheel.angular_velocity += (-long * self.radius / self.moi) * dt;

            let coasting = input.is_coasting(self.deadzone);
            let slow = ground_speed < t.min_slip_speed;
            if coasting || id.is_front() || slow {
                let rate = if coasting {
                    50.0
                } else if slow {
                    self.wheel.ground_match_rate * 2.0
                } else {
                    self.wheel.ground_match_rate
                };
                wheel.angular_velocity = lerp(wheel.angular_velocity, vx / self.radius, exp_decay(rate, dt));
            }
            wheel.angular_velocity *= 1.0 - self.wheel.bearing_friction * dt;
        }
        wheel.rotation += wheel.angular_velocity * dt;

        if self.log {
            debug!(wheel = %id, w = wheel.angular_velocity, lat, long, "tire output");
        }

        let regime = if rolling { TireRegime::Rolling } else { TireRegime::LowSpeed };
        TireForce { lateral: lat, longitudinal: long, regime }
    }

    fn hold_at_rest(&self, wheel: &mut Wheel, id: WheelId, patch: PatchVelocity, peak: f32, dt: f32) -> TireForce {
        let t = self.tire;
        wheel.slip_ratio = 0.0;
        wheel.slip_angle = 0.0;
        wheel.angular_velocity = lerp(wheel.angular_velocity, 0.0, exp_decay(20.0, dt));
        wheel.rotation += wheel.angular_velocity * dt;

        let cap = peak * t.at_rest_force_fraction;
        let gain = self.chassis_mass * t.at_rest_gain_per_kg;
        let lat = (-patch.vy * gain).clamp(-cap, cap);
        let long = (-patch.vx * gain).clamp(-cap, cap);
        wheel.lateral_force = lat;
        wheel.longitudinal_force = long;

        let above = wheel.temperature - t.ambient_temp;
        if above > 0.0 {
            wheel.temperature = (wheel.temperature - t.cooling_rate * (above / 50.0) * dt).max(t.ambient_temp);
        }

        if self.log {
            debug!(wheel = %id, vx = patch.vx, vy = patch.vy, lat, long, "tire at rest");
        }
        TireForce { lateral: lat, longitudinal: long, regime: TireRegime::AtRest }
    }

    fn heat(&self, wheel: &mut Wheel, force: f32, ground_speed: f32, wheel_speed: f32, rolling: bool, dt: f32) {
        let t = self.tire;
        let normalized = force / t.load_reference;
        let friction_work = if rolling {
            normalized * (wheel.slip_angle.abs() + wheel.slip_ratio.abs())
        } else {
            normalized * 0.01
        };
        let heating = friction_work * t.heat_from_slip + wheel_speed.abs() * t.heat_from_rolling;

        let above = wheel.temperature - t.ambient_temp;
        let cooling = t.cooling_rate + ground_speed * t.cooling_airflow;
        let cooling_factor = if above > 0.0 { (above / 30.0).min(1.0) } else { 0.0 };

        wheel.temperature += (heating - cooling * cooling_factor) * dt;
        wheel.temperature = wheel.temperature.clamp(t.min_temp, t.max_temp);
    }
}
