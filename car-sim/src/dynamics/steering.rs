// ==============================================================================
// steering.rs — ACKERMANN STEERING GEOMETRY
// ==============================================================================
// Responsibilities:
// - Map the smoothed steering input to a nominal (bicycle model) angle
// - Reduce that angle at high speed
// - Split it into inner / outer front wheel angles (Ackermann)
// - Add static toe and compression dependent bump steer on every wheel
// ------------------------------------------------------------------------------
// Sign convention: positive angle turns the wheel toward chassis +x (right).
// A positive steering input therefore makes FR the inner wheel.
//
// Left wheels take +toe / +bump, right wheels -toe / -bump, so the output is
// exactly mirrored when the input and compressions are mirrored.
// ==============================================================================

use crate::dynamics::tuning::{AlignmentTuning, SteeringTuning};
use crate::dynamics::types::{VehicleConfig, WheelId, WHEEL_COUNT};

const FL: usize = 0;
const FR: usize = 1;
const RL: usize = 2;
const RR: usize = 3;

// --------------------------------------------------
// ackermann steering angles (stateless)
// --------------------------------------------------
/// Returns (inner, outer) magnitudes for a nominal angle `base`.
pub fn ackermann_angles(base: f32, wheelbase: f32, half_track: f32) -> (f32, f32) {
    let a = base.abs();
    if a <= f32::EPSILON {
        return (0.0, 0.0);
    }

    // turning radius of the centreline bicycle model
    let r = wheelbase / a.tan();

    let inner = (wheelbase / (r - half_track).max(0.1)).atan();
    let outer = (wheelbase / (r + half_track).max(0.1)).atan();
    (inner, outer)
}

/// 1 below 80 km/h, easing down to `1 - reduction` at 200 km/h.
pub fn speed_reduction(speed_kmh: f32, reduction: f32) -> f32 {
    if speed_kmh > 80.0 {
        1.0 - reduction * ((speed_kmh - 80.0) / 120.0).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SteeringGeometry<'a> {
    pub config: &'a VehicleConfig,
    pub steering: &'a SteeringTuning,
    pub alignment: &'a AlignmentTuning,
    pub deadzone: f32,
}

impl SteeringGeometry<'_> {
    /// Nominal steering angle before the Ackermann split.
    pub fn base_angle(&self, input: f32, speed_kmh: f32) -> f32 {
        let curved = input.abs().powf(self.steering.linearity).copysign(input);
        curved * self.steering.max_angle * speed_reduction(speed_kmh, self.steering.high_speed_reduction)
    }

    /// Per-wheel steer angles (rad) in FL, FR, RL, RR order.
    pub fn wheel_angles(
        &self,
        input: f32,
        forward_speed: f32,
        speed_kmh: f32,
        compression: &[f32; WHEEL_COUNT],
    ) -> [f32; WHEEL_COUNT] {
        let al = self.alignment;
        let travel = self.config.suspension_travel;
        let bump = |i: usize| {
            let coeff = if WheelId::ALL[i].is_front() { al.front_bump_steer } else { al.rear_bump_steer };
            compression[i] * travel * coeff
        };

        let mut out = [0.0; WHEEL_COUNT];
        out[RL] = al.rear_toe + bump(RL);
        out[RR] = -al.rear_toe - bump(RR);

        let left_static = al.front_toe + bump(FL);
        let right_static = -al.front_toe - bump(FR);

        let base = self.base_angle(input, speed_kmh);
        if base.abs() < self.deadzone {
            out[FL] = left_static;
            out[FR] = right_static;
            return out;
        }

        if forward_speed >= 0.0 {
            let (inner, outer) =
                ackermann_angles(base, self.config.wheelbase(), self.config.half_track());
            if base > 0.0 {
                out[FR] = inner + right_static;
                out[FL] = outer + left_static;
            } else {
                out[FL] = -inner + left_static;
                out[FR] = -outer + right_static;
            }
        } else {
            // reversing: plain parallel steer
            out[FL] = base + left_static;
            out[FR] = base + right_static;
        }
        out
    }
}
