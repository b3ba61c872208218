//! Core shared types for the vehicle dynamics core (engine-agnostic).
// dynamics/types.rs
use std::fmt;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

pub const WHEEL_COUNT: usize = 4;

pub const GRAVITY: f32 = 9.81; // m/s²

// ----- scalar helpers ---------------------------------------------------------
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Blend factor for a first-order filter running at `rate` (1/s) over `dt`.
#[inline]
pub fn exp_decay(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

#[inline]
pub fn rad_per_sec_to_rpm(w: f32) -> f32 {
    w * 60.0 / (2.0 * std::f32::consts::PI)
}

#[inline] pub fn v3(v: &Vector3<f32>) -> [f32; 3] { [v.x, v.y, v.z] }
#[inline] pub fn p3(p: &Point3<f32>) -> [f32; 3] { [p.x, p.y, p.z] }

// ============================================
// Wheel identification
// ============================================

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum WheelId { FL, FR, RL, RR }

impl WheelId {
    /// Processing order. Anything iterating wheels goes through this.
    pub const ALL: [WheelId; WHEEL_COUNT] = [WheelId::FL, WheelId::FR, WheelId::RL, WheelId::RR];

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    pub fn index(self) -> usize {
        match self {
            WheelId::FL => 0,
            WheelId::FR => 1,
            WheelId::RL => 2,
            WheelId::RR => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WheelId::FL => "FL",
            WheelId::FR => "FR",
            WheelId::RL => "RL",
            WheelId::RR => "RR",
        }
    }

    pub fn is_front(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::FR)
    }

    pub fn is_rear(&self) -> bool {
        matches!(self, WheelId::RL | WheelId::RR)
    }

    pub fn is_left(&self) -> bool {
        matches!(self, WheelId::FL | WheelId::RL)
    }

    /// Same axle, other side.
    pub fn mirrored(self) -> Self {
        match self {
            WheelId::FL => WheelId::FR,
            WheelId::FR => WheelId::FL,
            WheelId::RL => WheelId::RR,
            WheelId::RR => WheelId::RL,
        }
    }
}

impl fmt::Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Name for a raw wheel index, "??" when out of range.
pub fn wheel_name(i: usize) -> &'static str {
    WheelId::from_index(i).map(|w| w.as_str()).unwrap_or("??")
}

// ============================================
// Surfaces
// ============================================

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceType {
    #[default]
    Asphalt,
    Concrete,
    WetAsphalt,
    Gravel,
    Grass,
    Ice,
}

impl SurfaceType {
    pub const ALL: [SurfaceType; 6] = [
        SurfaceType::Asphalt,
        SurfaceType::Concrete,
        SurfaceType::WetAsphalt,
        SurfaceType::Gravel,
        SurfaceType::Grass,
        SurfaceType::Ice,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SurfaceType::Asphalt => "Asphalt",
            SurfaceType::Concrete => "Concrete",
            SurfaceType::WetAsphalt => "Wet",
            SurfaceType::Gravel => "Gravel",
            SurfaceType::Grass => "Grass",
            SurfaceType::Ice => "Ice",
        }
    }
}

impl fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================
// ----- chassis geometry ---------------------
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub length: f32,            // m
    pub width: f32,             // m
    pub height: f32,            // m
    pub mass: f32,              // kg
    pub wheel_radius: f32,      // m
    pub wheel_width: f32,       // m
    pub wheel_mass: f32,        // kg (unsprung, per corner)
    pub suspension_travel: f32, // m
    pub suspension_height: f32, // m, attachment point below chassis origin
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            length: 4.5,
            width: 2.0,
            height: 0.5,
            mass: 1500.0,
            wheel_radius: 0.35,
            wheel_width: 0.25,
            wheel_mass: 20.0,
            suspension_travel: 0.20,
            suspension_height: 0.35,
        }
    }
}

impl VehicleConfig {
    pub fn wheelbase(&self) -> f32 {
        self.length * 0.7
    }

    pub fn half_track(&self) -> f32 {
        (self.width - self.wheel_width) * 0.5
    }

    /// Principal inertia of a solid box with the chassis dimensions.
    pub fn box_inertia(&self) -> Vector3<f32> {
        let (w, h, l) = (self.width, self.height, self.length);
        let k = self.mass / 12.0;
        Vector3::new(k * (h * h + l * l), k * (w * w + l * l), k * (w * w + h * h))
    }
}

// ============================================
// ----- per-wheel state ----------------------
// ============================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wheel {
    pub compression: f32,          // 0..1
    pub target_compression: f32,   // 0..1
    pub prev_compression: f32,
    pub compression_velocity: f32, // 1/s
    pub grounded: bool,
    pub contact_point: Point3<f32>,
    pub contact_normal: Vector3<f32>,
    pub angular_velocity: f32,     // rad/s
    pub rotation: f32,             // rad, accumulated
    pub tire_load: f32,            // N
    pub slip_angle: f32,           // rad
    pub slip_ratio: f32,
    pub lateral_force: f32,        // N
    pub longitudinal_force: f32,   // N
    pub temperature: f32,          // °C
    pub brake_temp: f32,           // °C
    pub contact_surface: SurfaceType,
}

impl Wheel {
    /// Fresh wheel sitting at the given ambient temperatures.
    pub fn new(tire_ambient: f32, brake_ambient: f32) -> Self {
        Self {
            compression: 0.0,
            target_compression: 0.0,
            prev_compression: 0.0,
            compression_velocity: 0.0,
            grounded: false,
            contact_point: Point3::origin(),
            contact_normal: Vector3::y(),
            angular_velocity: 0.0,
            rotation: 0.0,
            tire_load: 0.0,
            slip_angle: 0.0,
            slip_ratio: 0.0,
            lateral_force: 0.0,
            longitudinal_force: 0.0,
            temperature: tire_ambient,
            brake_temp: brake_ambient,
            contact_surface: SurfaceType::Asphalt,
        }
    }

    pub fn clear_tire_forces(&mut self) {
        self.slip_angle = 0.0;
        self.slip_ratio = 0.0;
        self.lateral_force = 0.0;
        self.longitudinal_force = 0.0;
    }
}

/// Constants derived from [`VehicleConfig`] + tuning at setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedConstants {
    pub wheel_offsets: [Vector3<f32>; WHEEL_COUNT], // chassis local
    pub wheel_moi: f32,                             // kg·m²
    pub spring_stiffness: [f32; WHEEL_COUNT],       // N/m
    pub spring_damping: [f32; WHEEL_COUNT],         // N·s/m
}
