// ==============================================================================
// backend.rs — RIGID-BODY ENGINE BOUNDARY
// ------------------------------------------------------------------------------
// The simulation core never owns the chassis body. It holds a `Handle` handed
// out by the backend and asks the backend to create / reshape / destroy it.
//
// Per tick the core reads the body state and casts rays first, then writes
// forces and torques. Forces are continuous (N), not impulses; the backend is
// expected to clear them after each world step.
// ==============================================================================

use std::fmt;

use nalgebra::{Isometry3, Point3, Vector3};

use crate::dynamics::error::BackendError;

/// Collision shape for the chassis.
#[derive(Debug, Clone, PartialEq)]
pub enum ChassisShape {
    /// Convex hull of chassis-local points.
    ConvexHull(Vec<Point3<f32>>),
    Box { half_extents: Vector3<f32> },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassDesc {
    pub mass: f32,
    pub local_com: Point3<f32>,
    pub principal_inertia: Vector3<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChassisDesc {
    pub pose: Isometry3<f32>,
    pub shape: ChassisShape,
    pub mass: MassDesc,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub gravity_enabled: bool,
    pub ccd_enabled: bool,
}

/// Snapshot of the chassis body read at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub pose: Isometry3<f32>,
    pub linvel: Vector3<f32>,
    pub angvel: Vector3<f32>,
    /// World-space centre of mass.
    pub center_of_mass: Point3<f32>,
}

impl BodyState {
    pub fn forward(&self) -> Vector3<f32> {
        self.pose.rotation * Vector3::z()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.pose.rotation * Vector3::x()
    }

    pub fn up(&self) -> Vector3<f32> {
        self.pose.rotation * Vector3::y()
    }

    pub fn to_world(&self, local: &Vector3<f32>) -> Point3<f32> {
        self.pose * Point3::from(*local)
    }

    pub fn velocity_at(&self, point: &Point3<f32>) -> Vector3<f32> {
        self.linvel + self.angvel.cross(&(point - self.center_of_mass))
    }
}

/// Nearest blocking hit of a scene ray query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    pub distance: f32,
}

pub trait PhysicsBackend {
    type Handle: Copy + PartialEq + fmt::Debug;

    fn create_chassis(&mut self, desc: &ChassisDesc) -> Result<Self::Handle, BackendError>;
    fn replace_chassis_shape(&mut self, body: Self::Handle, shape: &ChassisShape) -> Result<(), BackendError>;
    fn set_mass_properties(&mut self, body: Self::Handle, mass: &MassDesc) -> Result<(), BackendError>;
    fn destroy_body(&mut self, body: Self::Handle);

    fn body_state(&self, body: Self::Handle) -> Option<BodyState>;
    fn add_force(&mut self, body: Self::Handle, force: Vector3<f32>);
    fn add_force_at_point(&mut self, body: Self::Handle, force: Vector3<f32>, point: Point3<f32>);
    fn add_torque(&mut self, body: Self::Handle, torque: Vector3<f32>);

    /// Cast against static and dynamic scene geometry, ignoring `exclude`.
    fn cast_ray(
        &self,
        origin: Point3<f32>,
        dir: Vector3<f32>,
        max_dist: f32,
        exclude: Self::Handle,
    ) -> Option<RayHit>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    #[test]
    fn body_axes_follow_rotation() {
        let state = BodyState {
            pose: Isometry3::from_parts(
                Vector3::new(1.0, 2.0, 3.0).into(),
                UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::FRAC_PI_2),
            ),
            linvel: Vector3::zeros(),
            angvel: Vector3::new(0.0, 1.0, 0.0),
            center_of_mass: Point3::new(1.0, 2.0, 3.0),
        };
        // yaw +90° about y takes +z onto +x
        assert_relative_eq!(state.forward(), Vector3::x(), epsilon = 1e-6);
        assert_relative_eq!(state.up(), Vector3::y(), epsilon = 1e-6);

        let p = Point3::new(1.0, 2.0, 4.0);
        assert_relative_eq!(state.velocity_at(&p), Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
    }
}
