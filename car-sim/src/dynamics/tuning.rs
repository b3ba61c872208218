// ==============================================================================
// tuning.rs — PHYSICAL CONSTANTS, GROUPED BY SUBSYSTEM
// ------------------------------------------------------------------------------
// Pure data. Every group derives serde with `#[serde(default)]` so a partial
// JSON document only overrides what it names.
//
// The car owns one `TuningParameters` value. Aero coefficients, centre of mass,
// driver aids and diagnostics are changed at runtime through setters on `Car`;
// aero coefficients are also re-derived from the chassis hull at setup.
// ==============================================================================

use serde::{Deserialize, Serialize};

pub const GEAR_COUNT: usize = 9;
pub const GEAR_REVERSE: usize = 0;
pub const GEAR_NEUTRAL: usize = 1;
pub const GEAR_FIRST: usize = 2;
pub const GEAR_TOP: usize = GEAR_COUNT - 1;

const DEG: f32 = std::f32::consts::PI / 180.0;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningParameters {
    pub engine: EngineTuning,
    pub gearbox: GearboxTuning,
    pub brakes: BrakeTuning,
    pub input: InputTuning,
    pub tire: TireTuning,
    pub suspension: SuspensionTuning,
    pub aero: AeroTuning,
    pub steering: SteeringTuning,
    pub alignment: AlignmentTuning,
    pub wheels: WheelTuning,
    pub differential: DifferentialTuning,
    pub abs: AbsTuning,
    pub traction_control: TractionControlTuning,
    pub turbo: TurboTuning,
    pub surfaces: SurfaceTuning,
    pub chassis: ChassisTuning,
    pub diagnostics: Diagnostics,
}

// ----- engine -----------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineTuning {
    pub idle_rpm: f32,
    pub redline_rpm: f32,
    pub max_rpm: f32,
    pub peak_torque: f32,      // N·m
    pub peak_torque_rpm: f32,
    pub inertia: f32,          // kg·m²
    pub friction: f32,         // engine braking coefficient
    pub rpm_smoothing: f32,    // 1/s
    pub downshift_blip_amount: f32,
    pub downshift_blip_duration: f32, // s
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            idle_rpm: 1000.0,
            redline_rpm: 9250.0,
            max_rpm: 9500.0,
            peak_torque: 900.0,
            peak_torque_rpm: 6750.0,
            inertia: 0.25,
            friction: 0.02,
            rpm_smoothing: 6.0,
            downshift_blip_amount: 0.35,
            downshift_blip_duration: 0.15,
        }
    }
}

// ----- gearbox ----------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearboxTuning {
    /// Indexed by gear: 0 = R, 1 = N, 2.. = 1st..7th.
    pub ratios: [f32; GEAR_COUNT],
    pub final_drive: f32,
    pub shift_up_rpm: f32,
    pub shift_down_rpm: f32,
    pub shift_time: f32,       // s
    pub shift_cooldown: f32,   // s, after a shift completes
    pub clutch_engagement_rate: f32,
    pub efficiency: f32,
    pub manual: bool,
    /// Upshift speeds (km/h) at light / full throttle, indexed by current gear.
    pub upshift_kmh_base: [f32; GEAR_COUNT],
    pub upshift_kmh_sport: [f32; GEAR_COUNT],
    /// Downshift speeds (km/h), indexed by current gear.
    pub downshift_kmh: [f32; GEAR_COUNT],
    /// Anti-hunting margin applied after a shift in the other direction.
    pub hysteresis_kmh: f32,
    pub kickdown_throttle: f32,
    pub kickdown_redline_fraction: f32,
}

impl Default for GearboxTuning {
    fn default() -> Self {
        Self {
            ratios: [-3.15, 0.0, 3.08, 2.19, 1.63, 1.29, 1.03, 0.84, 0.69],
            final_drive: 4.44,
            shift_up_rpm: 8500.0,
            shift_down_rpm: 3500.0,
            shift_time: 0.05,
            shift_cooldown: 0.5,
            clutch_engagement_rate: 8.0,
            efficiency: 0.88,
            manual: false,
            upshift_kmh_base: [0.0, 0.0, 40.0, 65.0, 90.0, 120.0, 155.0, 200.0, 0.0],
            upshift_kmh_sport: [0.0, 0.0, 60.0, 95.0, 130.0, 175.0, 225.0, 290.0, 0.0],
            downshift_kmh: [0.0, 0.0, 0.0, 20.0, 35.0, 50.0, 70.0, 95.0, 125.0],
            hysteresis_kmh: 10.0,
            kickdown_throttle: 0.9,
            kickdown_redline_fraction: 0.85,
        }
    }
}

// ----- brakes -----------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrakeTuning {
    pub force: f32,               // N at the contact patch, full pedal
    pub bias_front: f32,          // 0..1
    pub reverse_power_ratio: f32,
    pub ambient_temp: f32,        // °C
    pub optimal_temp: f32,
    pub fade_temp: f32,
    pub max_temp: f32,
    pub heat_coefficient: f32,
    pub cooling_base: f32,
    pub cooling_airflow: f32,
    pub thermal_mass: f32,
}

impl Default for BrakeTuning {
    fn default() -> Self {
        Self {
            force: 12000.0,
            bias_front: 0.65,
            reverse_power_ratio: 0.5,
            ambient_temp: 200.0,
            optimal_temp: 400.0,
            fade_temp: 700.0,
            max_temp: 900.0,
            heat_coefficient: 0.015,
            cooling_base: 8.0,
            cooling_airflow: 1.5,
            thermal_mass: 5.0,
        }
    }
}

// ----- driver input -----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputTuning {
    pub throttle_smoothing: f32,  // 1/s, applies to throttle and brake
    pub steering_rate: f32,       // full-scale units per second
    pub deadzone: f32,
    pub steering_deadzone: f32,   // rad
    pub braking_speed_threshold_kmh: f32,
}

impl Default for InputTuning {
    fn default() -> Self {
        Self {
            throttle_smoothing: 10.0,
            steering_rate: 1.5,
            deadzone: 0.01,
            steering_deadzone: 0.001,
            braking_speed_threshold_kmh: 3.0,
        }
    }
}

// ----- tires ------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacejkaCoeffs {
    pub b: f32, // stiffness
    pub c: f32, // shape
    pub d: f32, // peak
    pub e: f32, // curvature
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TireTuning {
    pub lateral: PacejkaCoeffs,
    pub longitudinal: PacejkaCoeffs,
    pub friction: f32,
    pub min_slip_speed: f32,      // m/s
    pub load_sensitivity: f32,
    pub load_reference: f32,      // N
    pub rear_grip_ratio: f32,
    pub slip_angle_deadband: f32, // rad
    pub min_lateral_grip: f32,
    pub camber_thrust_coeff: f32,
    pub relaxation_length: f32,   // m
    /// Viscous gain per kg of chassis mass for the at-rest model.
    pub at_rest_gain_per_kg: f32,
    pub at_rest_force_fraction: f32,

    // thermals
    pub ambient_temp: f32,
    pub optimal_temp: f32,
    pub temp_range: f32,
    pub heat_from_slip: f32,
    pub heat_from_rolling: f32,
    pub cooling_rate: f32,
    pub cooling_airflow: f32,
    pub grip_temp_factor: f32,
    pub min_temp: f32,
    pub max_temp: f32,
}

impl Default for TireTuning {
    fn default() -> Self {
        Self {
            lateral: PacejkaCoeffs { b: 12.0, c: 1.4, d: 1.0, e: 0.6 },
            longitudinal: PacejkaCoeffs { b: 20.0, c: 1.5, d: 1.0, e: -0.5 },
            friction: 1.8,
            min_slip_speed: 0.5,
            load_sensitivity: 0.92,
            load_reference: 4000.0,
            rear_grip_ratio: 1.10,
            slip_angle_deadband: 0.01,
            min_lateral_grip: 0.4,
            camber_thrust_coeff: 0.015,
            relaxation_length: 0.3,
            at_rest_gain_per_kg: 10.0,
            at_rest_force_fraction: 0.8,
            ambient_temp: 50.0,
            optimal_temp: 90.0,
            temp_range: 50.0,
            heat_from_slip: 25.0,
            heat_from_rolling: 0.15,
            cooling_rate: 2.0,
            cooling_airflow: 0.05,
            grip_temp_factor: 0.15,
            min_temp: 10.0,
            max_temp: 150.0,
        }
    }
}

// ----- suspension -------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspensionTuning {
    pub front_spring_freq: f32, // Hz
    pub rear_spring_freq: f32,  // Hz
    pub damping_ratio: f32,
    pub bump_ratio: f32,
    pub rebound_ratio: f32,
    pub front_arb_stiffness: f32,
    pub rear_arb_stiffness: f32,
    pub max_force: f32,          // N
    pub max_damper_velocity: f32, // m/s
    pub front_mass_share: f32,   // static weight on the front axle
}

impl Default for SuspensionTuning {
    fn default() -> Self {
        Self {
            front_spring_freq: 1.5,
            rear_spring_freq: 1.4,
            damping_ratio: 0.85,
            bump_ratio: 0.7,
            rebound_ratio: 1.3,
            front_arb_stiffness: 3500.0,
            rear_arb_stiffness: 1500.0,
            max_force: 35000.0,
            max_damper_velocity: 5.0,
            front_mass_share: 0.4,
        }
    }
}

// ----- aerodynamics -----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AeroTuning {
    pub air_density: f32,        // kg/m³
    pub rolling_resistance: f32,
    pub drag_coeff: f32,
    pub frontal_area: f32,       // m²
    pub side_area: f32,          // m²
    pub lift_coeff_front: f32,   // negative = downforce
    pub lift_coeff_rear: f32,

    pub ground_effect_enabled: bool,
    pub ground_effect_multiplier: f32,
    pub ground_effect_height_ref: f32, // m
    pub ground_effect_height_max: f32, // m

    pub yaw_aero_enabled: bool,
    pub yaw_drag_multiplier: f32,
    pub yaw_side_force_coeff: f32,

    pub pitch_aero_enabled: bool,
    pub pitch_sensitivity: f32,

    // chassis local aero centres
    pub center_height: f32,
    pub center_front_z: f32,
    pub center_rear_z: f32,
}

impl Default for AeroTuning {
    fn default() -> Self {
        Self {
            air_density: 1.225,
            rolling_resistance: 0.015,
            drag_coeff: 0.35,
            frontal_area: 2.2,
            side_area: 4.0,
            lift_coeff_front: -0.3,
            lift_coeff_rear: -0.4,
            ground_effect_enabled: true,
            ground_effect_multiplier: 1.5,
            ground_effect_height_ref: 0.15,
            ground_effect_height_max: 0.30,
            yaw_aero_enabled: true,
            yaw_drag_multiplier: 2.5,
            yaw_side_force_coeff: 1.2,
            pitch_aero_enabled: true,
            pitch_sensitivity: 0.5,
            center_height: 0.3,
            center_front_z: 0.0,
            center_rear_z: 0.0,
        }
    }
}

// ----- steering + alignment ---------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringTuning {
    pub max_angle: f32,            // rad
    pub high_speed_reduction: f32,
    pub pneumatic_trail: f32,      // m
    pub self_align_gain: f32,
    pub linearity: f32,            // input exponent
}

impl Default for SteeringTuning {
    fn default() -> Self {
        Self {
            max_angle: 0.65,
            high_speed_reduction: 0.4,
            pneumatic_trail: 0.03,
            self_align_gain: 0.5,
            linearity: 1.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentTuning {
    pub front_camber: f32, // rad
    pub rear_camber: f32,
    pub front_toe: f32,
    pub rear_toe: f32,
    pub front_bump_steer: f32, // rad per m of travel
    pub rear_bump_steer: f32,
}

impl Default for AlignmentTuning {
    fn default() -> Self {
        Self {
            front_camber: -1.5 * DEG,
            rear_camber: -1.0 * DEG,
            front_toe: 0.1 * DEG,
            rear_toe: 0.2 * DEG,
            front_bump_steer: -0.02,
            rear_bump_steer: 0.01,
        }
    }
}

// ----- wheels / differential --------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelTuning {
    pub bearing_friction: f32,
    pub ground_match_rate: f32,
    pub handbrake_sliding_factor: f32,
    pub airborne_match_rate: f32,
}

impl Default for WheelTuning {
    fn default() -> Self {
        Self {
            bearing_friction: 0.2,
            ground_match_rate: 8.0,
            handbrake_sliding_factor: 0.75,
            airborne_match_rate: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferentialTuning {
    pub preload: f32, // N·m
    pub lock_ratio_accel: f32,
    pub lock_ratio_decel: f32,
}

impl Default for DifferentialTuning {
    fn default() -> Self {
        Self { preload: 150.0, lock_ratio_accel: 0.5, lock_ratio_decel: 0.3 }
    }
}

// ----- driver aids ------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbsTuning {
    pub enabled: bool,
    pub slip_threshold: f32,
    pub release_rate: f32,    // torque fraction kept while released
    pub pulse_frequency: f32, // Hz
}

impl Default for AbsTuning {
    fn default() -> Self {
        Self { enabled: false, slip_threshold: 0.15, release_rate: 0.7, pulse_frequency: 15.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TractionControlTuning {
    pub enabled: bool,
    pub slip_threshold: f32,
    pub power_reduction: f32, // max fraction removed
    pub response_rate: f32,   // 1/s
}

impl Default for TractionControlTuning {
    fn default() -> Self {
        Self { enabled: false, slip_threshold: 0.08, power_reduction: 0.8, response_rate: 15.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurboTuning {
    pub enabled: bool,
    pub max_pressure: f32, // bar
    pub spool_rate: f32,   // 1/s
    pub wastegate_rpm: f32,
    pub torque_multiplier: f32,
    pub min_rpm: f32,
}

impl Default for TurboTuning {
    fn default() -> Self {
        Self {
            enabled: false,
            max_pressure: 1.2,
            spool_rate: 3.0,
            wastegate_rpm: 7500.0,
            torque_multiplier: 0.35,
            min_rpm: 2500.0,
        }
    }
}

// ----- surfaces ---------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceTuning {
    pub asphalt: f32,
    pub concrete: f32,
    pub wet_asphalt: f32,
    pub gravel: f32,
    pub grass: f32,
    pub ice: f32,
}

impl Default for SurfaceTuning {
    fn default() -> Self {
        Self { asphalt: 1.0, concrete: 0.95, wet_asphalt: 0.7, gravel: 0.6, grass: 0.4, ice: 0.1 }
    }
}

impl SurfaceTuning {
    pub fn friction(&self, surface: crate::dynamics::SurfaceType) -> f32 {
        use crate::dynamics::SurfaceType::*;
        match surface {
            Asphalt => self.asphalt,
            Concrete => self.concrete,
            WetAsphalt => self.wet_asphalt,
            Gravel => self.gravel,
            Grass => self.grass,
            Ice => self.ice,
        }
    }
}

// ----- chassis body -----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChassisTuning {
    pub center_of_mass: [f32; 3], // chassis local, m
    pub linear_damping: f32,
    pub angular_damping: f32,
}

impl Default for ChassisTuning {
    fn default() -> Self {
        Self { center_of_mass: [0.0, -0.15, -0.3], linear_damping: 0.001, angular_damping: 0.5 }
    }
}

// ----- diagnostics ------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Diagnostics {
    pub log_telemetry: bool,
    pub log_pacejka: bool,
    pub draw_raycasts: bool,
    pub draw_suspension: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gear_table_has_reverse_and_neutral_slots() {
        let g = GearboxTuning::default();
        assert!(g.ratios[GEAR_REVERSE] < 0.0);
        assert_eq!(g.ratios[GEAR_NEUTRAL], 0.0);
        assert!(g.ratios[GEAR_FIRST..].windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let t: TuningParameters =
            serde_json::from_str(r#"{ "abs": { "enabled": true }, "engine": { "peak_torque": 500.0 } }"#)
                .unwrap();
        assert!(t.abs.enabled);
        assert_eq!(t.abs.pulse_frequency, 15.0);
        assert_eq!(t.engine.peak_torque, 500.0);
        assert_eq!(t.engine.idle_rpm, 1000.0);
        assert_eq!(t.brakes, BrakeTuning::default());
    }

    #[test]
    fn surface_friction_lookup() {
        let s = SurfaceTuning::default();
        assert_eq!(s.friction(crate::dynamics::SurfaceType::Ice), 0.1);
        assert_eq!(s.friction(crate::dynamics::SurfaceType::Asphalt), 1.0);
    }
}
