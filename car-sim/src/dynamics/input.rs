use serde::{Deserialize, Serialize};

use crate::dynamics::tuning::InputTuning;
use crate::dynamics::types::{exp_decay, lerp};

/// Driver controls. `throttle`, `brake`, `handbrake` in [0, 1], `steering` in [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputState {
    pub throttle: f32,
    pub brake: f32,
    pub steering: f32,
    pub handbrake: f32,
}

impl InputState {
    pub fn clamped(self) -> Self {
        Self {
            throttle: self.throttle.clamp(0.0, 1.0),
            brake: self.brake.clamp(0.0, 1.0),
            steering: self.steering.clamp(-1.0, 1.0),
            handbrake: self.handbrake.clamp(0.0, 1.0),
        }
    }

    /// Neither pedal pressed beyond the deadzone.
    pub fn is_coasting(&self, deadzone: f32) -> bool {
        self.throttle < deadzone && self.brake < deadzone
    }

    /// Move the smoothed input one step toward `target`.
    ///
    /// Steering is rate limited. Pedals drop instantly and ease up.
    /// Handbrake follows the target directly.
    pub fn smooth_toward(&mut self, target: &InputState, tuning: &InputTuning, dt: f32) {
        let diff = target.steering - self.steering;
        let max_change = tuning.steering_rate * dt;
        self.steering = if diff.abs() <= max_change {
            target.steering
        } else {
            self.steering + max_change.copysign(diff)
        };

        let k = exp_decay(tuning.throttle_smoothing, dt);
        self.throttle = ease_up(self.throttle, target.throttle, k);
        self.brake = ease_up(self.brake, target.brake, k);
        self.handbrake = target.handbrake;
    }
}

#[inline]
fn ease_up(current: f32, target: f32, k: f32) -> f32 {
    if target < current { target } else { lerp(current, target, k) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn steering_is_rate_limited() {
        let tuning = InputTuning::default();
        let mut input = InputState::default();
        let target = InputState { steering: 1.0, ..Default::default() };

        input.smooth_toward(&target, &tuning, DT);
        assert!((input.steering - tuning.steering_rate * DT).abs() < 1e-6);

        for _ in 0..120 {
            input.smooth_toward(&target, &tuning, DT);
        }
        assert_eq!(input.steering, 1.0);
    }

    #[test]
    fn pedals_snap_down_and_ease_up() {
        let tuning = InputTuning::default();
        let mut input = InputState { throttle: 0.8, brake: 0.0, ..Default::default() };
        let target = InputState { throttle: 0.2, brake: 1.0, handbrake: 1.0, ..Default::default() };

        input.smooth_toward(&target, &tuning, DT);
        assert_eq!(input.throttle, 0.2);
        assert!(input.brake > 0.0 && input.brake < 1.0);
        assert_eq!(input.handbrake, 1.0);
    }

    #[test]
    fn clamped_limits_every_axis() {
        let raw = InputState { throttle: 2.0, brake: -1.0, steering: -3.0, handbrake: 7.0 };
        let c = raw.clamped();
        assert_eq!(c, InputState { throttle: 1.0, brake: 0.0, steering: -1.0, handbrake: 1.0 });
    }
}
