// ==============================================================================
// brakes.rs — SERVICE BRAKES, BRAKE THERMALS, ABS
// ------------------------------------------------------------------------------
// Brake torque acts directly on wheel spin; the tyre model then turns the
// resulting slip into a ground force. Disc temperature scales efficiency:
//   cold  (< optimal) : 0.85 .. 1.0
//   warm  (optimal..fade) : 1.0 .. 0.6
//   faded (>= fade)   : 0.6
// ==============================================================================

use crate::dynamics::tuning::{AbsTuning, BrakeTuning};
use crate::dynamics::types::{Wheel, WheelId, WHEEL_COUNT};

pub fn brake_efficiency(temp: f32, tuning: &BrakeTuning) -> f32 {
    if temp >= tuning.fade_temp {
        return 0.6;
    }
    if temp < tuning.optimal_temp {
        let span = (tuning.optimal_temp - tuning.ambient_temp).max(1e-3);
        return 0.85 + 0.15 * ((temp - tuning.ambient_temp) / span).clamp(0.0, 1.0);
    }
    let span = (tuning.fade_temp - tuning.optimal_temp).max(1e-3);
    1.0 - 0.4 * (temp - tuning.optimal_temp) / span
}

/// Newtonian cooling toward ambient, faster with airflow.
pub fn cool_brakes(wheels: &mut [Wheel; WHEEL_COUNT], airspeed: f32, tuning: &BrakeTuning, dt: f32) {
    let rate = tuning.cooling_base + airspeed * tuning.cooling_airflow;
    for w in wheels.iter_mut() {
        let above = w.brake_temp - tuning.ambient_temp;
        if above > 0.0 {
            let drop = rate * above / tuning.thermal_mass.max(1e-3) * dt;
            w.brake_temp = (w.brake_temp - drop).max(tuning.ambient_temp);
        }
    }
}

/// Shared pulse clock plus per-wheel intervention flags.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AbsState {
    pub phase: f32, // 0..1
    pub active: [bool; WHEEL_COUNT],
}

impl AbsState {
    pub fn advance(&mut self, frequency: f32, dt: f32) {
        self.phase += frequency * dt;
        if self.phase > 1.0 {
            self.phase -= 1.0;
        }
    }

    /// First half of every pulse releases pressure.
    pub fn releasing(&self) -> bool {
        self.phase < 0.5
    }

    pub fn clear(&mut self) {
        self.active = [false; WHEEL_COUNT];
    }

    pub fn any_active(&self) -> bool {
        self.active.iter().any(|a| *a)
    }
}

/// Per-wheel brake torque for a pedal position, before thermal and ABS scaling.
pub fn base_brake_torque(pedal: f32, radius: f32, tuning: &BrakeTuning) -> [f32; WHEEL_COUNT] {
    let total = tuning.force * radius * pedal;
    let front = total * tuning.bias_front * 0.5;
    let rear = total * (1.0 - tuning.bias_front) * 0.5;
    WheelId::ALL.map(|id| if id.is_front() { front } else { rear })
}

/// Apply the service brakes for one tick. Spin moves toward zero and never
/// crosses it. Returns the torque actually applied per wheel.
pub fn apply_service_brakes(
    wheels: &mut [Wheel; WHEEL_COUNT],
    abs: &mut AbsState,
    brakes: &BrakeTuning,
    abs_tuning: &AbsTuning,
    pedal: f32,
    radius: f32,
    moi: f32,
    dt: f32,
) -> [f32; WHEEL_COUNT] {
    let base = base_brake_torque(pedal, radius, brakes);
    abs.advance(abs_tuning.pulse_frequency, dt);

    let mut applied = [0.0; WHEEL_COUNT];
    for (i, w) in wheels.iter_mut().enumerate() {
        let mut torque = base[i] * brake_efficiency(w.brake_temp, brakes);

        w.brake_temp = (w.brake_temp + w.angular_velocity.abs() * torque * brakes.heat_coefficient * dt)
            .min(brakes.max_temp);

        abs.active[i] = abs_tuning.enabled && w.grounded && -w.slip_ratio > abs_tuning.slip_threshold;
        if abs.active[i] && abs.releasing() {
            torque *= abs_tuning.release_rate;
        }

        let decel = torque / moi * dt;
        if w.angular_velocity > 0.0 {
            w.angular_velocity = (w.angular_velocity - decel).max(0.0);
        } else if w.angular_velocity < 0.0 {
            w.angular_velocity = (w.angular_velocity + decel).min(0.0);
        }
        applied[i] = torque;
    }
    applied
}
