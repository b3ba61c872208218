// ==============================================================================
// telemetry.rs — PER-TICK SNAPSHOT
// ------------------------------------------------------------------------------
// Read-only copy of everything a HUD / remote client wants once per tick.
// Serialized as-is onto the websocket (`"type": "telemetry"`).
// ==============================================================================

use serde::Serialize;
use tracing::info;

use crate::dynamics::debug::AeroDebugData;
use crate::dynamics::types::{SurfaceType, WheelId, WHEEL_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WheelTelemetry {
    pub id: WheelId,
    pub grounded: bool,
    pub compression: f32,
    pub suspension_force: f32,
    pub load: f32,
    pub steer_angle: f32,
    pub angular_velocity: f32,
    pub slip_angle: f32,
    pub slip_ratio: f32,
    pub lateral_force: f32,
    pub longitudinal_force: f32,
    pub tire_temp: f32,
    pub temp_grip_factor: f32,
    pub brake_temp: f32,
    pub brake_efficiency: f32,
    pub abs_active: bool,
    pub surface: SurfaceType,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AidsTelemetry {
    pub abs_enabled: bool,
    pub abs_active: bool,
    pub tc_enabled: bool,
    pub tc_active: bool,
    pub tc_reduction: f32,
    pub turbo_enabled: bool,
    pub manual: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "telemetry")]
pub struct Telemetry {
    pub tick: u64,
    pub position: [f32; 3],
    pub speed_kmh: f32,
    pub gear: usize,
    pub gear_name: &'static str,
    pub rpm: f32,
    pub clutch: f32,
    pub shifting: bool,
    pub boost: f32,
    pub engine_torque: f32,
    pub throttle: f32,
    pub brake: f32,
    pub steering: f32,
    pub handbrake: f32,
    pub aids: AidsTelemetry,
    pub wheels: [WheelTelemetry; WHEEL_COUNT],
    pub aero: AeroDebugData,
}

impl Telemetry {
    /// One-line summary at `info` level.
    pub fn log(&self) {
        let w = &self.wheels;
        info!(
            "tick {} | {:6.1} km/h | gear {} | {:5.0} rpm | thr {:.2} brk {:.2} str {:+.2} | \
             load {:.0}/{:.0}/{:.0}/{:.0} | sr {:+.2}/{:+.2}/{:+.2}/{:+.2} | tc {:.2}",
            self.tick,
            self.speed_kmh,
            self.gear_name,
            self.rpm,
            self.throttle,
            self.brake,
            self.steering,
            w[0].load,
            w[1].load,
            w[2].load,
            w[3].load,
            w[0].slip_ratio,
            w[1].slip_ratio,
            w[2].slip_ratio,
            w[3].slip_ratio,
            self.aids.tc_reduction,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wheel(id: WheelId) -> WheelTelemetry {
        WheelTelemetry {
            id,
            grounded: true,
            compression: 0.5,
            suspension_force: 2700.0,
            load: 2900.0,
            steer_angle: 0.0,
            angular_velocity: 0.0,
            slip_angle: 0.0,
            slip_ratio: 0.0,
            lateral_force: 0.0,
            longitudinal_force: 0.0,
            tire_temp: 50.0,
            temp_grip_factor: 0.88,
            brake_temp: 200.0,
            brake_efficiency: 0.85,
            abs_active: false,
            surface: SurfaceType::WetAsphalt,
        }
    }

    #[test]
    fn serializes_with_type_tag() {
        let t = Telemetry {
            tick: 42,
            position: [0.0, 0.9, 0.0],
            speed_kmh: 0.0,
            gear: 2,
            gear_name: "1",
            rpm: 1000.0,
            clutch: 1.0,
            shifting: false,
            boost: 0.0,
            engine_torque: 495.0,
            throttle: 0.0,
            brake: 0.0,
            steering: 0.0,
            handbrake: 0.0,
            aids: AidsTelemetry::default(),
            wheels: WheelId::ALL.map(wheel),
            aero: AeroDebugData::default(),
        };
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["type"], "telemetry");
        assert_eq!(json["tick"], 42);
        assert_eq!(json["gear_name"], "1");
        assert_eq!(json["wheels"][3]["id"], "RR");
        assert_eq!(json["wheels"][0]["surface"], "wet_asphalt");
    }
}
