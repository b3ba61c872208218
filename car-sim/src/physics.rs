// src/physics.rs
//
// rapier3d world: static ground + dynamic chassis bodies. Implements
// `PhysicsBackend` so the dynamics core can drive it without knowing rapier.

use rapier3d::prelude::*;
use tracing::{info, warn};

use crate::dynamics::{BackendError, BodyState, ChassisDesc, ChassisShape, MassDesc, PhysicsBackend, RayHit};

const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);

/// Bodies further than this from the origin (or NaN) are reset.
const SAFETY_RADIUS: f32 = 1_000.0;

pub struct RapierWorld {
    pub gravity: Vector<Real>,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline, // raycasts
    pub ground: RigidBodyHandle,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn usable_hull(points: &[Point<Real>]) -> bool {
    !points.is_empty() && points.iter().all(|p| p.coords.iter().all(|c| c.is_finite()))
}

fn chassis_collider(shape: &ChassisShape) -> Result<ColliderBuilder, BackendError> {
    let builder = match shape {
        ChassisShape::ConvexHull(points) if !usable_hull(points) => {
            return Err(BackendError::Shape(format!("hull of {} points is empty or not finite", points.len())));
        }
        ChassisShape::ConvexHull(points) => match ColliderBuilder::convex_hull(points) {
            Some(b) => b,
            None => {
                let (lo, hi) = points.iter().fold(
                    (point![f32::MAX, f32::MAX, f32::MAX], point![f32::MIN, f32::MIN, f32::MIN]),
                    |(lo, hi), p| (lo.inf(p), hi.sup(p)),
                );
                let half = ((hi - lo) * 0.5).map(|v| v.max(0.05));
                warn!(points = points.len(), "convex hull failed, falling back to bounding box");
                ColliderBuilder::cuboid(half.x, half.y, half.z).translation((lo.coords + hi.coords) * 0.5)
            }
        },
        ChassisShape::Box { half_extents } => ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z),
    };

    // mass comes from `MassDesc`, not from the shape
    Ok(builder
        .collision_groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND))
        .active_events(ActiveEvents::empty())
        .density(0.0)
        .friction(0.0) // tyres carry all ground friction
        .restitution(0.0))
}

fn mass_properties(mass: &MassDesc) -> MassProperties {
    MassProperties::new(mass.local_com, mass.mass, mass.principal_inertia)
}

impl RapierWorld {
    pub fn new() -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // Large static ground box, top surface at y = 0.
        let ground_rb = RigidBodyBuilder::fixed().translation(vector![0.0, -1.0, 0.0]).build();
        let ground = bodies.insert(ground_rb);

        let ground_collider = ColliderBuilder::cuboid(500.0, 1.0, 500.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(ground_collider, ground, &mut bodies);

        let mut query_pipeline = QueryPipeline::new();
        query_pipeline.update(&colliders);

        info!(bodies = bodies.len(), colliders = colliders.len(), "ground inserted");

        Self {
            gravity: vector![0.0, -9.81, 0.0],
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline,
            ground,
        }
    }

    /// Add a fixed axis-aligned box to the scene (ramps, kerbs, test props).
    pub fn add_static_box(&mut self, center: Vector<Real>, half_extents: Vector<Real>) -> RigidBodyHandle {
        let handle = self.bodies.insert(RigidBodyBuilder::fixed().translation(center).build());
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);
        handle
    }

    pub fn step(&mut self, dt: Real) {
        let hooks = ();
        let events = ();

        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters { dt, ..IntegrationParameters::default() },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &hooks,
            &events,
        );

        for (handle, body) in self.bodies.iter_mut() {
            // forces are per-tick; the dynamics core re-adds them every frame
            body.reset_forces(false);
            body.reset_torques(false);

            let pos = *body.translation();
            let bad = !(pos.x.is_finite() && pos.y.is_finite() && pos.z.is_finite())
                || pos.x.abs() > SAFETY_RADIUS
                || pos.y.abs() > SAFETY_RADIUS
                || pos.z.abs() > SAFETY_RADIUS;

            if bad {
                let safe = vector![0.0, 1.0, 0.0];
                body.set_position(Isometry::translation(safe.x, safe.y, safe.z), true);
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);
                warn!(?handle, ?pos, "reset exploding body");
            }
        }
    }

    fn remove_colliders(&mut self, body: RigidBodyHandle) {
        let attached: Vec<ColliderHandle> = match self.bodies.get(body) {
            Some(rb) => rb.colliders().to_vec(),
            None => return,
        };
        for c in attached {
            self.colliders.remove(c, &mut self.island_manager, &mut self.bodies, true);
        }
    }
}

impl PhysicsBackend for RapierWorld {
    type Handle = RigidBodyHandle;

    fn create_chassis(&mut self, desc: &ChassisDesc) -> Result<RigidBodyHandle, BackendError> {
        if !desc.mass.mass.is_finite() || desc.mass.mass <= 0.0 {
            return Err(BackendError::BodyCreation(format!("mass {} is not positive", desc.mass.mass)));
        }

        let collider = chassis_collider(&desc.shape)?.build();
        let rb = RigidBodyBuilder::dynamic()
            .position(desc.pose)
            .linear_damping(desc.linear_damping)
            .angular_damping(desc.angular_damping)
            .gravity_scale(if desc.gravity_enabled { 1.0 } else { 0.0 })
            .ccd_enabled(desc.ccd_enabled)
            .additional_mass_properties(mass_properties(&desc.mass))
            .build();
        let handle = self.bodies.insert(rb);

        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);

        info!(?handle, mass = desc.mass.mass, "chassis body created");
        Ok(handle)
    }

    fn replace_chassis_shape(&mut self, body: RigidBodyHandle, shape: &ChassisShape) -> Result<(), BackendError> {
        if !self.bodies.contains(body) {
            return Err(BackendError::UnknownBody);
        }
        let collider = chassis_collider(shape)?.build();
        self.remove_colliders(body);
        self.colliders.insert_with_parent(collider, body, &mut self.bodies);
        self.query_pipeline.update(&self.colliders);
        Ok(())
    }

    fn set_mass_properties(&mut self, body: RigidBodyHandle, mass: &MassDesc) -> Result<(), BackendError> {
        let rb = self.bodies.get_mut(body).ok_or(BackendError::UnknownBody)?;
        rb.set_additional_mass_properties(mass_properties(mass), true);
        Ok(())
    }

    fn destroy_body(&mut self, body: RigidBodyHandle) {
        self.bodies.remove(
            body,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            true,
        );
        self.query_pipeline.update(&self.colliders);
    }

    fn body_state(&self, body: RigidBodyHandle) -> Option<BodyState> {
        let rb = self.bodies.get(body)?;
        Some(BodyState {
            pose: *rb.position(),
            linvel: *rb.linvel(),
            angvel: *rb.angvel(),
            center_of_mass: *rb.center_of_mass(),
        })
    }

    fn add_force(&mut self, body: RigidBodyHandle, force: Vector<Real>) {
        if let Some(rb) = self.bodies.get_mut(body) {
            rb.add_force(force, true);
        }
    }

    fn add_force_at_point(&mut self, body: RigidBodyHandle, force: Vector<Real>, point: Point<Real>) {
        if let Some(rb) = self.bodies.get_mut(body) {
            rb.add_force_at_point(force, point, true);
        }
    }

    fn add_torque(&mut self, body: RigidBodyHandle, torque: Vector<Real>) {
        if let Some(rb) = self.bodies.get_mut(body) {
            rb.add_torque(torque, true);
        }
    }

    fn cast_ray(
        &self,
        origin: Point<Real>,
        dir: Vector<Real>,
        max_dist: Real,
        exclude: RigidBodyHandle,
    ) -> Option<RayHit> {
        let ray = Ray::new(origin, dir);
        let filter = QueryFilter::default().exclude_rigid_body(exclude);
        let (_collider, hit) =
            self.query_pipeline
                .cast_ray_and_get_normal(&self.bodies, &self.colliders, &ray, max_dist, true, filter)?;
        Some(RayHit {
            point: ray.point_at(hit.time_of_impact),
            normal: hit.normal,
            distance: hit.time_of_impact,
        })
    }
}
