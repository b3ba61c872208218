// ==============================================================================
// debug.rs — DEBUG / VISUALISATION SNAPSHOTS
// ------------------------------------------------------------------------------
// Serializable side-channel state, kept apart from the physical wheel state:
// - DebugRay: one ground probe (origin, end or hit point, hit flag)
// - DebugOverlay: 7 probes per wheel + suspension top/bottom points
// - AeroDebugData: per-tick aero forces and application points
// - Shape2D: side / front convex silhouettes of the chassis hull
//
// Nothing in here feeds back into the simulation.
// ==============================================================================

use serde::Serialize;

use crate::dynamics::types::WHEEL_COUNT;

pub const RAYS_PER_WHEEL: usize = 7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DebugRay {
    pub origin: [f32; 3],
    pub hit_point: [f32; 3], // ray end when nothing was hit
    pub hit: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DebugSuspension {
    pub top: [f32; 3],
    pub bottom: [f32; 3],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DebugOverlay {
    pub rays: [[DebugRay; RAYS_PER_WHEEL]; WHEEL_COUNT],
    pub suspension: [DebugSuspension; WHEEL_COUNT],
}

impl DebugOverlay {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Probe `ray` of `wheel`, or `None` when either index is out of range.
    pub fn ray(&self, wheel: usize, ray: usize) -> Option<&DebugRay> {
        self.rays.get(wheel)?.get(ray)
    }

    pub fn suspension(&self, wheel: usize) -> Option<&DebugSuspension> {
        self.suspension.get(wheel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AeroDebugData {
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub drag_force: [f32; 3],
    pub front_downforce: [f32; 3],
    pub rear_downforce: [f32; 3],
    pub side_force: [f32; 3],
    pub front_aero_pos: [f32; 3],
    pub rear_aero_pos: [f32; 3],
    pub ride_height: f32,
    pub yaw_angle: f32,
    pub ground_effect_factor: f32,
    pub valid: bool,
}

impl Default for AeroDebugData {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            velocity: [0.0; 3],
            drag_force: [0.0; 3],
            front_downforce: [0.0; 3],
            rear_downforce: [0.0; 3],
            side_force: [0.0; 3],
            front_aero_pos: [0.0; 3],
            rear_aero_pos: [0.0; 3],
            ride_height: 0.0,
            yaw_angle: 0.0,
            ground_effect_factor: 1.0,
            valid: false,
        }
    }
}

/// 2D projections of the chassis hull for visualisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Shape2D {
    pub side_profile: Vec<(f32, f32)>,  // (z, y)
    pub front_profile: Vec<(f32, f32)>, // (x, y)
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_probe_lookups_are_none() {
        let overlay = DebugOverlay::default();
        assert!(overlay.ray(0, 6).is_some());
        assert!(overlay.ray(0, 7).is_none());
        assert!(overlay.ray(4, 0).is_none());
        assert!(overlay.suspension(4).is_none());
    }

    #[test]
    fn clear_resets_everything() {
        let mut overlay = DebugOverlay::default();
        overlay.rays[1][2].hit = true;
        overlay.suspension[3].top = [1.0, 2.0, 3.0];
        overlay.clear();
        assert_eq!(overlay, DebugOverlay::default());
    }
}
