// ==============================================================================
// aero.rs — AERODYNAMICS + CHASSIS SHAPE ANALYSIS
// ------------------------------------------------------------------------------
// Per tick:
//   - drag along -v, grown by yaw (crosswind / slide)
//   - side force from lateral airflow
//   - front / rear downforce at the aero centres, scaled by ground effect,
//     pitch and yaw
//   - rolling resistance proportional to total grounded load
//
// At setup the chassis hull is used to estimate frontal / side area, drag
// coefficient, aero centres and the front/rear downforce split.
// ==============================================================================

use nalgebra::{Point3, Vector3};
use tracing::info;

use crate::dynamics::backend::BodyState;
use crate::dynamics::debug::{AeroDebugData, Shape2D};
use crate::dynamics::tuning::AeroTuning;
use crate::dynamics::types::{p3, v3, VehicleConfig, Wheel, WHEEL_COUNT};

/// One force for the backend. `point == None` means through the centre of mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AeroForce {
    pub force: Vector3<f32>,
    pub point: Option<Point3<f32>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AeroOutput {
    pub forces: Vec<AeroForce>,
    pub debug: AeroDebugData,
}

impl AeroOutput {
    fn push(&mut self, force: Vector3<f32>, point: Option<Point3<f32>>) {
        self.forces.push(AeroForce { force, point });
    }
}

/// Multiplier on downforce when running close to the ground.
pub fn ground_effect_factor(ride_height: f32, aero: &AeroTuning) -> f32 {
    if !aero.ground_effect_enabled || ride_height >= aero.ground_effect_height_max {
        return 1.0;
    }
    let span = (aero.ground_effect_height_max - aero.ground_effect_height_ref).max(1e-3);
    let t = ((aero.ground_effect_height_max - ride_height) / span).clamp(0.0, 1.0);
    1.0 + t * (aero.ground_effect_multiplier - 1.0)
}

pub fn compute_aero(
    state: &BodyState,
    wheels: &[Wheel; WHEEL_COUNT],
    cfg: &VehicleConfig,
    aero: &AeroTuning,
) -> AeroOutput {
    let pose = &state.pose;
    let front_pt = pose * Point3::new(0.0, aero.center_height, aero.center_front_z);
    let rear_pt = pose * Point3::new(0.0, aero.center_height, aero.center_rear_z);
    let v = state.linvel;
    let speed = v.norm();

    let mut out = AeroOutput {
        forces: Vec::with_capacity(5),
        debug: AeroDebugData {
            position: v3(&pose.translation.vector),
            velocity: v3(&v),
            front_aero_pos: p3(&front_pt),
            rear_aero_pos: p3(&rear_pt),
            ride_height: cfg.suspension_height + cfg.wheel_radius,
            ..Default::default()
        },
    };

    let grounded_load: f32 = wheels.iter().filter(|w| w.grounded).map(|w| w.tire_load).sum();

    if speed < 0.5 {
        if speed > 0.1 && grounded_load > 0.0 {
            out.push(-(v / speed) * aero.rolling_resistance * grounded_load, None);
        }
        out.debug.valid = true;
        return out;
    }

    let dir = v / speed;
    let (fwd, right, up) = (state.forward(), state.right(), state.up());

    let yaw = if speed > 1.0 { dir.dot(&fwd).clamp(-1.0, 1.0).abs().acos() } else { 0.0 };

    let front_c = (wheels[0].compression + wheels[1].compression) * 0.5;
    let rear_c = (wheels[2].compression + wheels[3].compression) * 0.5;
    let pitch = (rear_c - front_c) * cfg.suspension_travel / cfg.wheelbase().max(0.1);
    let ride_height =
        cfg.suspension_height - (front_c + rear_c) * 0.5 * cfg.suspension_travel + cfg.wheel_radius;

    // drag
    let q = 0.5 * aero.air_density * speed * speed;
    let mut drag = q * aero.drag_coeff * aero.frontal_area;
    if aero.yaw_aero_enabled && yaw > 0.01 {
        drag *= 1.0 + yaw.sin() * (aero.yaw_drag_multiplier - 1.0);
    }
    let drag_force = -dir * drag;
    out.push(drag_force, None);
    out.debug.drag_force = v3(&drag_force);

    // crosswind / slide
    if aero.yaw_aero_enabled {
        let lateral = v.dot(&right);
        if lateral.abs() > 1.0 {
            let side = 0.5 * aero.air_density * aero.yaw_side_force_coeff * aero.side_area * lateral * lateral.abs();
            let side_force = -right * side;
            out.push(side_force, None);
            out.debug.side_force = v3(&side_force);
        }
    }

    // downforce
    let mut ge = 1.0;
    if speed > 10.0 {
        ge = ground_effect_factor(ride_height, aero);

        let (mut front_mul, mut rear_mul) = (1.0, 1.0);
        if aero.pitch_aero_enabled {
            front_mul -= pitch * aero.pitch_sensitivity;
            rear_mul += pitch * aero.pitch_sensitivity;
        }
        let yaw_factor = if aero.yaw_aero_enabled && yaw > 0.1 { (1.0 - 0.7 * yaw.sin()).max(0.3) } else { 1.0 };

        let base = q * aero.frontal_area * ge * yaw_factor;
        let front = up * (aero.lift_coeff_front * base * front_mul);
        let rear = up * (aero.lift_coeff_rear * base * rear_mul);
        out.push(front, Some(front_pt));
        out.push(rear, Some(rear_pt));
        out.debug.front_downforce = v3(&front);
        out.debug.rear_downforce = v3(&rear);
    }

    if grounded_load > 0.0 {
        out.push(-dir * aero.rolling_resistance * grounded_load, None);
    }

    out.debug.ride_height = ride_height;
    out.debug.yaw_angle = yaw;
    out.debug.ground_effect_factor = ge;
    out.debug.valid = true;
    out
}

// ------------------------------------------------------------------------------
// shape analysis
// ------------------------------------------------------------------------------

fn bounds(vertices: &[Point3<f32>]) -> (Point3<f32>, Point3<f32>) {
    let mut min = Point3::new(f32::MAX, f32::MAX, f32::MAX);
    let mut max = Point3::new(f32::MIN, f32::MIN, f32::MIN);
    for v in vertices {
        min = min.inf(v);
        max = max.sup(v);
    }
    (min, max)
}

/// Estimate aero coefficients from the chassis hull. Implausible estimates
/// keep the current value. Returns the 2D silhouettes, or `None` when there
/// are fewer than four vertices.
pub fn derive_from_shape(vertices: &[Point3<f32>], aero: &mut AeroTuning) -> Option<Shape2D> {
    if vertices.len() < 4 {
        return None;
    }

    let (min, max) = bounds(vertices);
    let width = max.x - min.x;
    let height = max.y - min.y;
    let length = max.z - min.z;

    let frontal = width * height * 0.82;
    if frontal > 0.5 && frontal < 10.0 {
        aero.frontal_area = frontal;
        info!("aero: frontal area = {:.2} m²", frontal);
    }
    let side = length * height * 0.75;
    if side > 1.0 && side < 20.0 {
        aero.side_area = side;
        info!("aero: side area = {:.2} m²", side);
    }
    let slenderness = length / height.max(0.1);
    let cd = 0.32 * (2.5 / slenderness).clamp(0.8, 1.3);
    if cd > 0.2 && cd < 0.6 {
        aero.drag_coeff = cd;
        info!("aero: drag coefficient = {:.3}", cd);
    }

    // upper surfaces dominate: weight by squared height above the floor
    let mid_z = (min.z + max.z) * 0.5;
    let (mut weighted_y, mut front_w, mut rear_w) = (0.0, 0.0, 0.0);
    for v in vertices {
        let h = v.y - min.y;
        let w = h * h;
        weighted_y += v.y * w;
        if v.z > mid_z { front_w += w } else { rear_w += w }
    }
    let total = front_w + rear_w;
    aero.center_height = if total > 0.0 { weighted_y / total } else { (min.y + max.y) * 0.5 };
    let front_bias = if total > 0.0 { front_w / total } else { 0.5 };

    aero.center_front_z = max.z * 0.8;
    aero.center_rear_z = min.z * 0.8;

    let total_lift = aero.lift_coeff_front + aero.lift_coeff_rear;
    aero.lift_coeff_front = total_lift * (0.5 + (front_bias - 0.5) * 0.5);
    aero.lift_coeff_rear = total_lift * (0.5 + (0.5 - front_bias) * 0.5);

    info!("aero: dimensions {:.2} x {:.2} x {:.2} m (L x W x H)", length, width, height);
    info!(
        "aero: center height={:.2}, front_z={:.2}, rear_z={:.2}",
        aero.center_height, aero.center_front_z, aero.center_rear_z
    );
    info!(
        "aero: front/rear bias={:.0}%/{:.0}%, lift F/R={:.2}/{:.2}",
        front_bias * 100.0,
        (1.0 - front_bias) * 100.0,
        aero.lift_coeff_front,
        aero.lift_coeff_rear
    );

    Some(silhouettes(vertices, min, max))
}

fn silhouettes(vertices: &[Point3<f32>], min: Point3<f32>, max: Point3<f32>) -> Shape2D {
    let side: Vec<_> = vertices.iter().map(|v| (v.z, v.y)).collect();
    let front: Vec<_> = vertices.iter().map(|v| (v.x, v.y)).collect();
    let side_profile = convex_hull_2d(&side);
    let front_profile = convex_hull_2d(&front);
    info!("aero: shape profiles computed (side: {} pts, front: {} pts)", side_profile.len(), front_profile.len());
    Shape2D {
        valid: !side_profile.is_empty() && !front_profile.is_empty(),
        side_profile,
        front_profile,
        min: p3(&min),
        max: p3(&max),
    }
}

/// Gift-wrapping hull starting from the leftmost point. Never emits more
/// points than it was given; fewer than three points are returned as-is.
pub fn convex_hull_2d(points: &[(f32, f32)]) -> Vec<(f32, f32)> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let start = (1..n).fold(0, |best, i| if points[i].0 < points[best].0 { i } else { best });

    let mut hull = Vec::new();
    let mut current = start;
    loop {
        hull.push(points[current]);
        let mut next = 0;
        for i in 0..n {
            if i == current {
                continue;
            }
            let (ax, ay) = (points[next].0 - points[current].0, points[next].1 - points[current].1);
            let (bx, by) = (points[i].0 - points[current].0, points[i].1 - points[current].1);
            let cross = ax * by - ay * bx;
            if next == current || cross < 0.0 || (cross == 0.0 && bx * bx + by * by > ax * ax + ay * ay) {
                next = i;
            }
        }
        current = next;
        if current == start || hull.len() >= n {
            break;
        }
    }
    hull
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Isometry3;

    fn body(linvel: Vector3<f32>) -> BodyState {
        BodyState {
            pose: Isometry3::translation(0.0, 1.0, 0.0),
            linvel,
            angvel: Vector3::zeros(),
            center_of_mass: Point3::new(0.0, 0.85, -0.3),
        }
    }

    fn grounded_wheels(load: f32, compression: f32) -> [Wheel; 4] {
        [Wheel { grounded: true, tire_load: load, compression, ..Wheel::new(50.0, 200.0) }; 4]
    }

    fn box_vertices(w: f32, h: f32, l: f32) -> Vec<Point3<f32>> {
        let mut v = Vec::new();
        for x in [-w / 2.0, w / 2.0] {
            for y in [-h / 2.0, h / 2.0] {
                for z in [-l / 2.0, l / 2.0] {
                    v.push(Point3::new(x, y, z));
                }
            }
        }
        v
    }

    #[test]
    fn stationary_car_has_no_aero_forces() {
        let out = compute_aero(&body(Vector3::zeros()), &grounded_wheels(3600.0, 0.5), &VehicleConfig::default(), &AeroTuning::default());
        assert!(out.forces.is_empty());
        assert!(out.debug.valid);
        assert_eq!(out.debug.ground_effect_factor, 1.0);
    }

    #[test]
    fn straight_line_drag_matches_formula() {
        let aero = AeroTuning { yaw_aero_enabled: false, ..Default::default() };
        let wheels = grounded_wheels(0.0, 0.5);
        let out = compute_aero(&body(Vector3::new(0.0, 0.0, 30.0)), &wheels, &VehicleConfig::default(), &aero);
        let expected = 0.5 * aero.air_density * aero.drag_coeff * aero.frontal_area * 900.0;
        assert_relative_eq!(out.debug.drag_force[2], -expected, max_relative = 1e-5);
        assert!(out.debug.front_downforce[1] < 0.0);
        assert!(out.debug.rear_downforce[1] < 0.0);
        assert_eq!(out.debug.side_force, [0.0; 3]);
    }

    #[test]
    fn sliding_sideways_adds_side_force_and_drag() {
        let aero = AeroTuning::default();
        let cfg = VehicleConfig::default();
        let wheels = grounded_wheels(0.0, 0.5);
        let straight = compute_aero(&body(Vector3::new(0.0, 0.0, 30.0)), &wheels, &cfg, &aero);
        let slide = compute_aero(&body(Vector3::new(10.0, 0.0, 28.3)), &wheels, &cfg, &aero);
        assert!(slide.debug.yaw_angle > 0.3);
        assert!(slide.debug.side_force[0] < 0.0);
        let mag = |f: [f32; 3]| Vector3::from(f).norm();
        assert!(mag(slide.debug.drag_force) > mag(straight.debug.drag_force));
    }

    #[test]
    fn yaw_downforce_loss_follows_yaw_toggle() {
        let cfg = VehicleConfig::default();
        let wheels = grounded_wheels(0.0, 0.5);
        let v = Vector3::new(20.0, 0.0, 30.0);
        let on = compute_aero(&body(v), &wheels, &cfg, &AeroTuning::default());
        let off = compute_aero(&body(v), &wheels, &cfg, &AeroTuning { yaw_aero_enabled: false, ..Default::default() });

        assert!(on.debug.yaw_angle > 0.1);
        assert_relative_eq!(on.debug.yaw_angle, off.debug.yaw_angle);
        // with yaw aero off the full downforce is kept
        let factor = (1.0 - 0.7 * on.debug.yaw_angle.sin()).max(0.3);
        assert_relative_eq!(on.debug.front_downforce[1], off.debug.front_downforce[1] * factor, max_relative = 1e-5);
        assert_relative_eq!(on.debug.rear_downforce[1], off.debug.rear_downforce[1] * factor, max_relative = 1e-5);
        assert!(off.debug.front_downforce[1] < on.debug.front_downforce[1]);
    }

    #[test]
    fn ground_effect_ramps_between_heights() {
        let aero = AeroTuning::default();
        assert_eq!(ground_effect_factor(1.0, &aero), 1.0);
        assert_relative_eq!(ground_effect_factor(aero.ground_effect_height_ref, &aero), aero.ground_effect_multiplier);
        assert_relative_eq!(ground_effect_factor(0.0, &aero), aero.ground_effect_multiplier);
        let mid = ground_effect_factor(0.225, &aero);
        assert!(mid > 1.0 && mid < aero.ground_effect_multiplier);
        let off = AeroTuning { ground_effect_enabled: false, ..aero };
        assert_eq!(ground_effect_factor(0.0, &off), 1.0);
    }

    #[test]
    fn hull_of_square_with_interior_point() {
        let pts = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.5, 0.5)];
        let hull = convex_hull_2d(&pts);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&(0.5, 0.5)));
        assert_eq!(convex_hull_2d(&pts[..2]), pts[..2].to_vec());
    }

    #[test]
    fn shape_derivation_from_box() {
        let mut aero = AeroTuning::default();
        let verts = box_vertices(1.9, 1.3, 4.6);
        let shape = derive_from_shape(&verts, &mut aero).expect("enough vertices");
        assert_relative_eq!(aero.frontal_area, 1.9 * 1.3 * 0.82, max_relative = 1e-5);
        assert_relative_eq!(aero.side_area, 4.6 * 1.3 * 0.75, max_relative = 1e-5);
        assert_relative_eq!(aero.center_front_z, 2.3 * 0.8, max_relative = 1e-5);
        // symmetric box: even split, total lift preserved
        let total = AeroTuning::default().lift_coeff_front + AeroTuning::default().lift_coeff_rear;
        assert_relative_eq!(aero.lift_coeff_front, aero.lift_coeff_rear, max_relative = 1e-5);
        assert_relative_eq!(aero.lift_coeff_front + aero.lift_coeff_rear, total, max_relative = 1e-5);
        assert!(shape.valid);
        assert_eq!(shape.side_profile.len(), 4);
        assert_eq!(shape.front_profile.len(), 4);
        assert_eq!(shape.max, [0.95, 0.65, 2.3]);
    }

    #[test]
    fn too_few_vertices_changes_nothing() {
        let mut aero = AeroTuning::default();
        assert!(derive_from_shape(&box_vertices(2.0, 1.0, 4.0)[..3], &mut aero).is_none());
        assert_eq!(aero, AeroTuning::default());
    }
}
