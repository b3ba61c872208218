// ==============================================================================
// drivetrain.rs — ENGINE, GEARBOX, CLUTCH, DIFFERENTIAL, DRIVER AIDS
// ==============================================================================
// Rear wheel drive. Engine torque is never applied to the chassis directly:
// it changes rear wheel spin, the tyre model converts the resulting slip into
// ground force.
//
// Gear indices: 0 = R, 1 = N, 2..=8 = 1st..7th.
//
// Per tick (`Drivetrain::step`):
//   1. gearbox state machine (auto mode) + shift / blip timers
//   2. clutch engagement, engine rpm toward wheel-driven / free-rev target
//   3. engine braking, turbo spool
//   4. throttle -> LSD (with traction control), or reverse throttle-as-brake
//   5. service brakes / ABS, or low speed reverse drive
//   6. handbrake lock, coasting wheel sync
// ==============================================================================

use std::f32::consts::PI;

use tracing::debug;

use crate::dynamics::brakes::{apply_service_brakes, AbsState};
use crate::dynamics::input::InputState;
use crate::dynamics::tuning::{
    DifferentialTuning, EngineTuning, GearboxTuning, TurboTuning, TuningParameters, GEAR_FIRST,
    GEAR_NEUTRAL, GEAR_REVERSE, GEAR_TOP,
};
use crate::dynamics::types::{exp_decay, lerp, rad_per_sec_to_rpm, Wheel, WHEEL_COUNT};

const RL: usize = 2;
const RR: usize = 3;

// --------------------------------------------------
// stateless curves / lookups
// --------------------------------------------------

/// Torque (N·m) at `rpm`, piecewise linear factor × peak torque.
pub fn engine_torque(rpm: f32, e: &EngineTuning) -> f32 {
    let rpm = rpm.clamp(e.idle_rpm, e.max_rpm);
    let factor = if rpm < 2500.0 {
        0.55 + (rpm - e.idle_rpm) / 1500.0 * 0.15
    } else if rpm < 4500.0 {
        0.70 + (rpm - 2500.0) / 2000.0 * 0.15
    } else if rpm < e.peak_torque_rpm {
        0.85 + (rpm - 4500.0) / (e.peak_torque_rpm - 4500.0) * 0.15
    } else if rpm < 8000.0 {
        1.0 - (rpm - e.peak_torque_rpm) / (8000.0 - e.peak_torque_rpm) * 0.08
    } else if rpm < e.redline_rpm {
        0.92 - (rpm - 8000.0) / (e.redline_rpm - 8000.0) * 0.10
    } else {
        0.82 * (1.0 - (rpm - e.redline_rpm) / (e.max_rpm - e.redline_rpm).max(1.0) * 0.8)
    };
    factor * e.peak_torque
}

/// "R", "N", "1".."7", or "?" for an invalid index.
pub fn gear_string(gear: usize) -> &'static str {
    const NAMES: [&str; 9] = ["R", "N", "1", "2", "3", "4", "5", "6", "7"];
    NAMES.get(gear).copied().unwrap_or("?")
}

/// Automatic upshift speed (km/h), interpolated between the light and full
/// throttle tables. 999 when no upshift exists from `gear`.
pub fn upshift_speed(gear: usize, throttle: f32, g: &GearboxTuning) -> f32 {
    if !(GEAR_FIRST..GEAR_TOP).contains(&gear) {
        return 999.0;
    }
    let t = ((throttle - 0.3) / 0.5).clamp(0.0, 1.0);
    lerp(g.upshift_kmh_base[gear], g.upshift_kmh_sport[gear], t)
}

pub fn downshift_speed(gear: usize, g: &GearboxTuning) -> f32 {
    if (GEAR_FIRST..=GEAR_TOP).contains(&gear) { g.downshift_kmh[gear] } else { 0.0 }
}

/// Split `torque` between the rear wheels. Preload plus a speed-difference
/// term bias torque toward the slower wheel.
pub fn apply_lsd(wheels: &mut [Wheel; WHEEL_COUNT], torque: f32, diff: &DifferentialTuning, moi: f32, dt: f32) {
    let delta = wheels[RL].angular_velocity - wheels[RR].angular_velocity;
    let ratio = if torque >= 0.0 { diff.lock_ratio_accel } else { diff.lock_ratio_decel };
    let lock = (diff.preload + delta.abs() * ratio * torque.abs()).min(0.9 * torque.abs());

    let bias = if delta > 0.0 {
        -lock
    } else if delta < 0.0 {
        lock
    } else {
        0.0
    };

    wheels[RL].angular_velocity += (torque * 0.5 + bias * 0.5) / moi * dt;
    wheels[RR].angular_velocity += (torque * 0.5 - bias * 0.5) / moi * dt;
}

// --------------------------------------------------
// state
// --------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drivetrain {
    pub rpm: f32,
    pub gear: usize,
    pub clutch: f32,            // 0..1
    pub is_shifting: bool,
    pub shift_timer: f32,       // s remaining
    pub shift_cooldown: f32,    // s remaining
    pub last_shift_dir: i8,     // -1, 0, +1
    pub boost: f32,             // bar
    pub blip_timer: f32,        // s remaining
    pub tc_reduction: f32,      // 0..1
    pub tc_active: bool,
}

/// Everything `Drivetrain::step` reads besides its own state.
#[derive(Debug, Clone, Copy)]
pub struct DriveContext<'a> {
    pub tuning: &'a TuningParameters,
    pub input: InputState,
    pub forward_speed: f32, // m/s, signed
    pub radius: f32,
    pub moi: f32,
    pub dt: f32,
}

impl Drivetrain {
    /// Idle, first gear, clutch engaged.
    pub fn new(engine: &EngineTuning) -> Self {
        Self {
            rpm: engine.idle_rpm,
            gear: GEAR_FIRST,
            clutch: 1.0,
            is_shifting: false,
            shift_timer: 0.0,
            shift_cooldown: 0.0,
            last_shift_dir: 0,
            boost: 0.0,
            blip_timer: 0.0,
            tc_reduction: 0.0,
            tc_active: false,
        }
    }

    pub fn gear_string(&self) -> &'static str {
        gear_string(self.gear)
    }

    /// Torque available right now, boost included.
    pub fn current_torque(&self, e: &EngineTuning, turbo: &TurboTuning) -> f32 {
        engine_torque(self.rpm, e) * (1.0 + self.boost * turbo.torque_multiplier)
    }

    /// Engine rpm implied by a wheel rpm in the current gear; idle in neutral.
    pub fn wheel_rpm_to_engine_rpm(&self, wheel_rpm: f32, g: &GearboxTuning, e: &EngineTuning) -> f32 {
        if self.gear == GEAR_NEUTRAL || self.gear > GEAR_TOP {
            return e.idle_rpm;
        }
        (wheel_rpm * g.ratios[self.gear] * g.final_drive).abs()
    }

    fn begin_shift(&mut self, duration: f32, dir: i8) {
        self.is_shifting = true;
        self.shift_timer = duration;
        self.last_shift_dir = dir;
    }

    fn shift_to(&mut self, gear: usize, duration: f32, dir: i8) {
        debug!(from = gear_string(self.gear), to = gear_string(gear), "gear change");
        self.gear = gear;
        self.begin_shift(duration, dir);
    }

    // --------------------------------------------------
    // manual shifting (ignored in automatic mode or mid-shift)
    // --------------------------------------------------

    pub fn shift_up(&mut self, g: &GearboxTuning) {
        if !g.manual || self.is_shifting || self.gear >= GEAR_TOP {
            return;
        }
        self.shift_to(self.gear + 1, g.shift_time, 1);
    }

    pub fn shift_down(&mut self, g: &GearboxTuning) {
        if !g.manual || self.is_shifting || self.gear == GEAR_REVERSE {
            return;
        }
        self.shift_to(self.gear - 1, g.shift_time, -1);
    }

    pub fn shift_to_neutral(&mut self, g: &GearboxTuning) {
        if !g.manual || self.is_shifting {
            return;
        }
        self.shift_to(GEAR_NEUTRAL, g.shift_time, 0);
    }

    // --------------------------------------------------
    // automatic gearbox
    // --------------------------------------------------

    pub fn update_gearbox(&mut self, ctx: &DriveContext<'_>) {
        let t = ctx.tuning;
        let g = &t.gearbox;
        let forward_speed = ctx.forward_speed;
        let speed_kmh = forward_speed * 3.6;
        if self.shift_cooldown > 0.0 {
            self.shift_cooldown = (self.shift_cooldown - ctx.dt).max(0.0);
        }

        if self.is_shifting {
            self.shift_timer -= ctx.dt;
            if self.shift_timer <= 0.0 {
                self.is_shifting = false;
                self.shift_timer = 0.0;
                self.shift_cooldown = g.shift_cooldown;
            }
            return;
        }
        if g.manual {
            return;
        }

        let (thr, brk) = (ctx.input.throttle, ctx.input.brake);

        if forward_speed < -1.0 && brk > 0.1 && thr < 0.1 && self.gear != GEAR_REVERSE {
            self.shift_to(GEAR_REVERSE, g.shift_time * 2.0, -1);
            return;
        }
        if self.gear == GEAR_NEUTRAL && thr > 0.1 && forward_speed >= -0.5 {
            self.shift_to(GEAR_FIRST, g.shift_time, 1);
            return;
        }
        if self.gear == GEAR_REVERSE {
            if (thr > 0.1 && forward_speed > -2.0) || forward_speed > 0.5 {
                self.shift_to(GEAR_FIRST, g.shift_time * 2.0, 1);
            }
            return;
        }
        if self.gear < GEAR_FIRST {
            return;
        }

        // up / downshifts wait out the cooldown, kickdown does not
        if self.shift_cooldown <= 0.0 {
            let mut up = upshift_speed(self.gear, thr, g);
            if self.last_shift_dir == -1 {
                up += g.hysteresis_kmh;
            }
            if (speed_kmh > up || self.rpm > g.shift_up_rpm) && self.gear < GEAR_TOP && thr > 0.1 {
                self.shift_to(self.gear + 1, g.shift_time, 1);
                return;
            }

            let mut down = downshift_speed(self.gear, g);
            if self.last_shift_dir == 1 {
                down -= g.hysteresis_kmh;
            }
            if speed_kmh < down && self.gear > GEAR_FIRST {
                self.shift_to(self.gear - 1, g.shift_time, -1);
                self.blip_timer = t.engine.downshift_blip_duration;
                return;
            }
        }

        if thr > g.kickdown_throttle && self.gear > GEAR_FIRST {
            let redline_cap = g.kickdown_redline_fraction * t.engine.redline_rpm;
            let shaft_rpm = forward_speed / ctx.radius * 60.0 / (2.0 * PI);
            let mut best = self.gear;
            for candidate in (GEAR_FIRST..self.gear).rev() {
                let potential = shaft_rpm * g.ratios[candidate].abs() * g.final_drive;
                if potential < redline_cap {
                    best = candidate;
                } else {
                    break;
                }
            }
            if best < self.gear {
                self.shift_to(best, g.shift_time, -1);
                self.blip_timer = t.engine.downshift_blip_duration;
            }
        }
    }

    // --------------------------------------------------
    // turbo
    // --------------------------------------------------

    pub fn update_boost(&mut self, throttle: f32, turbo: &TurboTuning, dt: f32) {
        if !turbo.enabled {
            self.boost = lerp(self.boost, 0.0, exp_decay(turbo.spool_rate * 3.0, dt));
            return;
        }

        let mut target = 0.0;
        if throttle > 0.3 && self.rpm > turbo.min_rpm {
            target = turbo.max_pressure * ((self.rpm - turbo.min_rpm) / 4000.0).min(1.0);
            if self.rpm > turbo.wastegate_rpm {
                target *= (1.0 - (self.rpm - turbo.wastegate_rpm) / 2000.0).max(0.0);
            }
        }
        let rate = if target > self.boost { turbo.spool_rate } else { turbo.spool_rate * 2.0 };
        self.boost = lerp(self.boost, target, exp_decay(rate, dt));
    }

    // --------------------------------------------------
    // full drivetrain tick
    // --------------------------------------------------

    pub fn step(&mut self, ctx: &DriveContext<'_>, wheels: &mut [Wheel; WHEEL_COUNT], abs: &mut AbsState) {
        let t = ctx.tuning;
        let (e, g) = (&t.engine, &t.gearbox);
        let input = ctx.input;
        let dz = t.input.deadzone;
        let dt = ctx.dt;

        self.update_gearbox(ctx);
        if self.blip_timer > 0.0 {
            self.blip_timer = (self.blip_timer - dt).max(0.0);
        }

        self.update_engine_speed(ctx, wheels);
        self.apply_engine_braking(ctx, wheels);
        self.update_boost(input.throttle, &t.turbo, dt);

        if input.throttle > dz && self.gear >= GEAR_FIRST {
            let mut torque = self.current_torque(e, &t.turbo) * input.throttle;
            torque *= 1.0 - self.traction_control(ctx, wheels);

            let mut wheel_torque = torque * g.ratios[self.gear] * g.final_drive * self.clutch * g.efficiency;
            if self.is_shifting {
                wheel_torque *= 0.3;
            }
            apply_lsd(wheels, wheel_torque, &t.differential, ctx.moi, dt);
        } else if input.throttle > dz && self.gear == GEAR_REVERSE {
            // throttle in reverse acts as a brake on backward spin
            let torque = t.brakes.force * ctx.radius * input.throttle * 0.5;
            for w in wheels.iter_mut().filter(|w| w.angular_velocity < 0.0) {
                w.angular_velocity = (w.angular_velocity + torque / ctx.moi * dt).min(0.0);
            }
        } else {
            let release = t.traction_control.response_rate * 2.0;
            self.tc_reduction = lerp(self.tc_reduction, 0.0, exp_decay(release, dt));
            self.tc_active = false;
        }

        if input.brake > dz {
            self.apply_brake_pedal(ctx, wheels, abs);
        } else {
            abs.clear();
        }

        if input.handbrake > dz {
            wheels[RL].angular_velocity = 0.0;
            wheels[RR].angular_velocity = 0.0;
        }

        if input.is_coasting(dz) && input.handbrake < dz {
            let ground_w = ctx.forward_speed.abs() / ctx.radius;
            if ground_w > 1.0 {
                for w in wheels[RL..=RR].iter_mut() {
                    let spin = w.angular_velocity.abs();
                    if spin < ground_w * 0.5 || spin > ground_w * 1.5 {
                        w.angular_velocity = ground_w.copysign(ctx.forward_speed);
                    }
                }
            }
        }
    }

    fn update_engine_speed(&mut self, ctx: &DriveContext<'_>, wheels: &[Wheel; WHEEL_COUNT]) {
        let t = ctx.tuning;
        let (e, g) = (&t.engine, &t.gearbox);
        let input = ctx.input;
        let dt = ctx.dt;

        let rear_w = (wheels[RL].angular_velocity + wheels[RR].angular_velocity) * 0.5;
        let mut wheel_rpm = self.wheel_rpm_to_engine_rpm(rad_per_sec_to_rpm(rear_w), g, e);
        if input.is_coasting(t.input.deadzone) && self.gear >= GEAR_FIRST {
            let ground_w = ctx.forward_speed / ctx.radius;
            wheel_rpm = wheel_rpm.max(self.wheel_rpm_to_engine_rpm(rad_per_sec_to_rpm(ground_w), g, e));
        }

        self.clutch = if self.is_shifting {
            0.2
        } else if self.gear == GEAR_NEUTRAL {
            0.0
        } else if ctx.forward_speed.abs() < 2.0 && input.throttle > 0.1 {
            lerp(self.clutch, 1.0, exp_decay(g.clutch_engagement_rate, dt))
        } else {
            1.0
        };

        let blip = if self.blip_timer > 0.0 {
            e.downshift_blip_amount * (self.blip_timer / e.downshift_blip_duration.max(1e-3))
        } else {
            0.0
        };
        let free_rpm = e.idle_rpm + input.throttle.max(blip) * (e.redline_rpm - e.idle_rpm) * 0.7;
        let driven_rpm = wheel_rpm.max(e.idle_rpm);

        let target = if self.gear == GEAR_NEUTRAL {
            free_rpm
        } else if self.clutch < 0.9 {
            lerp(free_rpm, driven_rpm, self.clutch)
        } else {
            driven_rpm
        };

        self.rpm = lerp(self.rpm, target, exp_decay(e.rpm_smoothing, dt)).clamp(e.idle_rpm, e.max_rpm);
    }

    fn apply_engine_braking(&self, ctx: &DriveContext<'_>, wheels: &mut [Wheel; WHEEL_COUNT]) {
        let t = ctx.tuning;
        if ctx.input.throttle >= t.input.deadzone || self.clutch <= 0.5 || self.gear < GEAR_FIRST {
            return;
        }
        let g = &t.gearbox;
        let torque = t.engine.friction * self.rpm * 0.1 * g.ratios[self.gear].abs() * g.final_drive * 0.5;
        let dw = torque / ctx.moi * ctx.dt;
        for w in wheels[RL..=RR].iter_mut() {
            if w.angular_velocity > 0.0 {
                w.angular_velocity = (w.angular_velocity - dw).max(0.0);
            }
        }
    }

    /// Fraction of engine torque removed this tick.
    fn traction_control(&mut self, ctx: &DriveContext<'_>, wheels: &[Wheel; WHEEL_COUNT]) -> f32 {
        let tc = &ctx.tuning.traction_control;
        if !tc.enabled {
            self.tc_reduction = 0.0;
            self.tc_active = false;
            return 0.0;
        }

        let slip = [RL, RR]
            .iter()
            .filter(|&&i| wheels[i].grounded)
            .map(|&i| wheels[i].slip_ratio)
            .fold(0.0f32, f32::max);

        self.tc_active = slip > tc.slip_threshold;
        let target = if self.tc_active {
            ((slip - tc.slip_threshold) * 5.0).clamp(0.0, tc.power_reduction)
        } else {
            0.0
        };
        self.tc_reduction = lerp(self.tc_reduction, target, exp_decay(tc.response_rate, ctx.dt));
        self.tc_reduction
    }

    fn apply_brake_pedal(&mut self, ctx: &DriveContext<'_>, wheels: &mut [Wheel; WHEEL_COUNT], abs: &mut AbsState) {
        let t = ctx.tuning;
        let input = ctx.input;
        let speed_kmh = ctx.forward_speed * 3.6;

        if speed_kmh > t.input.braking_speed_threshold_kmh {
            apply_service_brakes(wheels, abs, &t.brakes, &t.abs, input.brake, ctx.radius, ctx.moi, ctx.dt);
            return;
        }

        // near standstill the brake pedal doubles as reverse throttle
        abs.clear();
        if self.gear == GEAR_REVERSE {
            let g = &t.gearbox;
            let torque = engine_torque(self.rpm, &t.engine) * input.brake * t.brakes.reverse_power_ratio
                * g.ratios[GEAR_REVERSE]
                * g.final_drive
                * self.clutch;
            apply_lsd(wheels, torque, &t.differential, ctx.moi, ctx.dt);
        } else if ctx.forward_speed > -0.5 && !self.is_shifting {
            debug!(from = self.gear_string(), "engaging reverse");
            self.gear = GEAR_REVERSE;
            self.is_shifting = true;
            self.shift_timer = t.gearbox.shift_time * 2.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DT: f32 = 1.0 / 60.0;

    fn ctx(t: &TuningParameters, input: InputState, forward_speed: f32) -> DriveContext<'_> {
        DriveContext { tuning: t, input, forward_speed, radius: 0.35, moi: 1.715, dt: DT }
    }

    fn rolling_wheels(forward_speed: f32) -> [Wheel; WHEEL_COUNT] {
        [Wheel { angular_velocity: forward_speed / 0.35, grounded: true, ..Wheel::new(50.0, 200.0) }; 4]
    }

    #[test]
    fn torque_curve_is_continuous_and_peaks_at_peak_rpm() {
        let e = EngineTuning::default();
        for edge in [2500.0, 4500.0, e.peak_torque_rpm, 8000.0, e.redline_rpm] {
            let below = engine_torque(edge - 0.01, &e);
            let above = engine_torque(edge + 0.01, &e);
            assert!((below - above).abs() < 1.0, "step at {edge}: {below} vs {above}");
        }
        assert_relative_eq!(engine_torque(e.peak_torque_rpm, &e), e.peak_torque);
        assert_eq!(engine_torque(0.0, &e), engine_torque(e.idle_rpm, &e));
        assert!(engine_torque(e.max_rpm, &e) < 0.2 * e.peak_torque);
    }

    #[test]
    fn gear_strings() {
        assert_eq!(gear_string(0), "R");
        assert_eq!(gear_string(1), "N");
        assert_eq!(gear_string(2), "1");
        assert_eq!(gear_string(8), "7");
        assert_eq!(gear_string(9), "?");
    }

    #[test]
    fn upshift_speed_follows_throttle() {
        let g = GearboxTuning::default();
        assert_eq!(upshift_speed(2, 0.0, &g), 40.0);
        assert_eq!(upshift_speed(2, 1.0, &g), 60.0);
        assert_eq!(upshift_speed(GEAR_TOP, 1.0, &g), 999.0);
        assert_eq!(upshift_speed(GEAR_NEUTRAL, 1.0, &g), 999.0);
        assert_eq!(downshift_speed(3, &g), 20.0);
        assert_eq!(downshift_speed(0, &g), 0.0);
    }

    #[test]
    fn automatic_upshift_then_cooldown() {
        let t = TuningParameters::default();
        let mut d = Drivetrain::new(&t.engine);
        let input = InputState { throttle: 1.0, ..Default::default() };

        d.update_gearbox(&ctx(&t, input, 70.0 / 3.6));
        assert_eq!(d.gear, GEAR_FIRST + 1);
        assert!(d.is_shifting);
        assert_eq!(d.last_shift_dir, 1);

        let mut ticks = 0;
        while d.is_shifting {
            d.update_gearbox(&ctx(&t, input, 70.0 / 3.6));
            ticks += 1;
        }
        assert!((3..=4).contains(&ticks), "ticks = {ticks}");
        // cooldown blocks an immediate second shift
        d.update_gearbox(&ctx(&t, input, 250.0 / 3.6));
        assert_eq!(d.gear, GEAR_FIRST + 1);
    }

    #[test]
    fn downshift_sets_blip_and_hysteresis_applies() {
        let t = TuningParameters::default();
        let mut d = Drivetrain { gear: 4, last_shift_dir: 1, ..Drivetrain::new(&t.engine) };
        // 3rd gear downshift at 35 km/h, minus 10 after an upshift
        d.update_gearbox(&ctx(&t, InputState::default(), 30.0 / 3.6));
        assert_eq!(d.gear, 4);
        d.update_gearbox(&ctx(&t, InputState::default(), 20.0 / 3.6));
        assert_eq!(d.gear, 3);
        assert_eq!(d.blip_timer, t.engine.downshift_blip_duration);
    }

    #[test]
    fn kickdown_jumps_to_lowest_safe_gear() {
        let t = TuningParameters::default();
        let mut d = Drivetrain { gear: 7, ..Drivetrain::new(&t.engine) };
        let input = InputState { throttle: 1.0, ..Default::default() };
        d.update_gearbox(&ctx(&t, input, 100.0 / 3.6));
        assert!(d.gear < 6, "gear = {}", d.gear);
        assert!(d.gear >= GEAR_FIRST);
        let shaft = 100.0 / 3.6 / 0.35 * 60.0 / (2.0 * PI);
        let rpm = shaft * t.gearbox.ratios[d.gear] * t.gearbox.final_drive;
        assert!(rpm < 0.85 * t.engine.redline_rpm);
        assert_eq!(d.last_shift_dir, -1);
    }

    #[test]
    fn kickdown_ignores_shift_cooldown() {
        let t = TuningParameters::default();
        let mut d = Drivetrain { gear: 7, shift_cooldown: t.gearbox.shift_cooldown, ..Drivetrain::new(&t.engine) };
        // cooldown still holds off an ordinary downshift
        d.update_gearbox(&ctx(&t, InputState::default(), 20.0 / 3.6));
        assert_eq!(d.gear, 7);

        let floor_it = InputState { throttle: 1.0, ..Default::default() };
        d.update_gearbox(&ctx(&t, floor_it, 100.0 / 3.6));
        assert!(d.gear < 7, "gear = {}", d.gear);
        assert!(d.is_shifting);
    }

    #[test]
    fn shift_cooldown_bottoms_out_at_zero() {
        let t = TuningParameters::default();
        let mut d = Drivetrain { gear: 4, shift_cooldown: 0.1, ..Drivetrain::new(&t.engine) };
        let cruise = InputState { throttle: 0.2, ..Default::default() };
        for _ in 0..600 {
            d.update_gearbox(&ctx(&t, cruise, 50.0 / 3.6));
        }
        assert_eq!(d.gear, 4);
        assert_eq!(d.shift_cooldown, 0.0);
    }

    #[test]
    fn reverse_requested_when_rolling_back_on_brake() {
        let t = TuningParameters::default();
        let mut d = Drivetrain::new(&t.engine);
        let input = InputState { brake: 1.0, ..Default::default() };
        d.update_gearbox(&ctx(&t, input, -2.0));
        assert_eq!(d.gear, GEAR_REVERSE);
        assert_relative_eq!(d.shift_timer, 2.0 * t.gearbox.shift_time);
    }

    #[test]
    fn manual_shifts_only_in_manual_mode() {
        let mut t = TuningParameters::default();
        let mut d = Drivetrain::new(&t.engine);
        d.shift_up(&t.gearbox);
        assert_eq!(d.gear, GEAR_FIRST);

        t.gearbox.manual = true;
        d.shift_up(&t.gearbox);
        assert_eq!(d.gear, GEAR_FIRST + 1);
        // mid-shift requests are dropped
        d.shift_up(&t.gearbox);
        assert_eq!(d.gear, GEAR_FIRST + 1);

        d.is_shifting = false;
        d.shift_to_neutral(&t.gearbox);
        assert_eq!(d.gear, GEAR_NEUTRAL);
        d.is_shifting = false;
        d.shift_down(&t.gearbox);
        assert_eq!(d.gear, GEAR_REVERSE);
        d.is_shifting = false;
        d.shift_down(&t.gearbox);
        assert_eq!(d.gear, GEAR_REVERSE);
    }

    #[test]
    fn lsd_splits_evenly_at_equal_speeds() {
        let diff = DifferentialTuning::default();
        let mut wheels = rolling_wheels(10.0);
        apply_lsd(&mut wheels, 1000.0, &diff, 1.7, DT);
        assert_eq!(wheels[RL].angular_velocity, wheels[RR].angular_velocity);
        assert_relative_eq!(wheels[RL].angular_velocity, 10.0 / 0.35 + 500.0 / 1.7 * DT, max_relative = 1e-5);
    }

    #[test]
    fn lsd_favours_slower_wheel() {
        let diff = DifferentialTuning::default();
        let mut wheels = rolling_wheels(10.0);
        wheels[RL].angular_velocity += 5.0;
        let (l0, r0) = (wheels[RL].angular_velocity, wheels[RR].angular_velocity);
        apply_lsd(&mut wheels, 1000.0, &diff, 1.7, DT);
        assert!(wheels[RR].angular_velocity - r0 > wheels[RL].angular_velocity - l0);
    }

    #[test]
    fn neutral_disengages_clutch_and_free_revs() {
        let t = TuningParameters::default();
        let mut d = Drivetrain { gear: GEAR_NEUTRAL, ..Drivetrain::new(&t.engine) };
        let mut wheels = rolling_wheels(0.0);
        let mut abs = AbsState::default();
        let input = InputState { throttle: 1.0, ..Default::default() };
        let mut t2 = t.clone();
        t2.gearbox.manual = true;
        for _ in 0..120 {
            d.step(&ctx(&t2, input, 0.0), &mut wheels, &mut abs);
            assert_eq!(d.clutch, 0.0);
        }
        assert!(d.rpm > 0.6 * t.engine.redline_rpm);
        assert_eq!(wheels[RL].angular_velocity, 0.0);
    }

    #[test]
    fn throttle_spins_rear_wheels_only() {
        let t = TuningParameters::default();
        let mut d = Drivetrain::new(&t.engine);
        let mut wheels = rolling_wheels(5.0);
        let mut abs = AbsState::default();
        let input = InputState { throttle: 1.0, ..Default::default() };
        d.step(&ctx(&t, input, 5.0), &mut wheels, &mut abs);
        assert!(wheels[RL].angular_velocity > 5.0 / 0.35);
        assert_eq!(wheels[0].angular_velocity, 5.0 / 0.35);
        assert!(d.rpm > t.engine.idle_rpm);
    }

    #[test]
    fn traction_control_cuts_torque_on_wheelspin() {
        let mut t = TuningParameters::default();
        t.traction_control.enabled = true;
        let mut d = Drivetrain::new(&t.engine);
        let mut wheels = rolling_wheels(5.0);
        for w in wheels.iter_mut() {
            w.slip_ratio = 0.4;
        }
        let mut abs = AbsState::default();
        let input = InputState { throttle: 1.0, ..Default::default() };
        d.step(&ctx(&t, input, 5.0), &mut wheels, &mut abs);
        assert!(d.tc_active);
        assert!(d.tc_reduction > 0.0 && d.tc_reduction <= t.traction_control.power_reduction);

        d.step(&ctx(&t, InputState::default(), 5.0), &mut wheels, &mut abs);
        assert!(!d.tc_active);
    }

    #[test]
    fn turbo_spools_up_and_bleeds_off_when_disabled() {
        let mut turbo = TurboTuning { enabled: true, ..Default::default() };
        let mut d = Drivetrain { rpm: 6500.0, ..Drivetrain::new(&EngineTuning::default()) };
        for _ in 0..300 {
            d.update_boost(1.0, &turbo, DT);
        }
        assert_relative_eq!(d.boost, turbo.max_pressure, max_relative = 0.01);

        turbo.enabled = false;
        for _ in 0..300 {
            d.update_boost(1.0, &turbo, DT);
        }
        assert!(d.boost < 0.01);
    }

    #[test]
    fn wastegate_limits_boost_at_high_rpm() {
        let turbo = TurboTuning { enabled: true, ..Default::default() };
        let mut d = Drivetrain { rpm: 9400.0, ..Drivetrain::new(&EngineTuning::default()) };
        for _ in 0..600 {
            d.update_boost(1.0, &turbo, DT);
        }
        assert!(d.boost < 0.2 * turbo.max_pressure);
    }

    #[test]
    fn brake_at_standstill_selects_reverse() {
        let t = TuningParameters::default();
        let mut d = Drivetrain::new(&t.engine);
        let mut wheels = rolling_wheels(0.0);
        let mut abs = AbsState::default();
        let input = InputState { brake: 0.5, ..Default::default() };
        d.step(&ctx(&t, input, 0.0), &mut wheels, &mut abs);
        assert_eq!(d.gear, GEAR_REVERSE);
        assert!(d.is_shifting);

        for _ in 0..10 {
            d.step(&ctx(&t, input, 0.0), &mut wheels, &mut abs);
        }
        assert!(!d.is_shifting);
        d.step(&ctx(&t, input, 0.0), &mut wheels, &mut abs);
        assert!(wheels[RL].angular_velocity < 0.0);
    }
}
