//! Ray-probe collision against the solid map meshes.
//!
//! Horizontal moves are tested with a fan of rays cast at several heights
//! below the eye, so low walls and overhangs both register. Vertical motion
//! only checks for a ceiling; the floor comes from the ground bounds.

use std::f32::consts::{FRAC_PI_8, TAU};

use cgmath::{InnerSpace, Vector3, Zero};

use crate::gfx::picking::{Ray, RayHit};
use crate::gfx::scene::{Role, Scene};
use crate::options::StreetViewOptions;

/// Directions of the clearance fan around a step's endpoint.
const CLEARANCE_RAYS: usize = 8;

/// Nearest solid hit over all probe heights.
pub fn nearest_hit(
    scene: &Scene,
    origin: Vector3<f32>,
    direction: Vector3<f32>,
    offsets: &[f32],
    max_distance: f32,
) -> Option<RayHit> {
    offsets
        .iter()
        .filter_map(|offset| {
            let ray = Ray::new(origin + Vector3::new(0.0, *offset, 0.0), direction);
            scene.raycast_solid(&ray, max_distance)
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Distance from the ray origin to the plane of the surface it hit.
fn perpendicular_gap(direction: Vector3<f32>, hit: &RayHit) -> f32 {
    hit.distance * direction.dot(hit.normal).abs()
}

/// Resolves one step of horizontal movement no longer than `max_step`.
///
/// Returns the displacement actually allowed: the full move, a shortened move
/// that stops `collision_radius` short of the wall, the strafe part alone when
/// sliding, or zero. Clearance is measured along the wall normal, so grazing
/// approaches stop as far out as head-on ones.
pub fn resolve_step(
    scene: &Scene,
    position: Vector3<f32>,
    movement: Vector3<f32>,
    forward: Vector3<f32>,
    right: Vector3<f32>,
    options: &StreetViewOptions,
) -> Vector3<f32> {
    let distance = movement.magnitude();
    if distance <= f32::EPSILON {
        return Vector3::zero();
    }
    let direction = movement / distance;
    let radius = options.collision_radius;
    let reach = (distance + radius).min(options.max_step);

    let allowed = match nearest_hit(scene, position, direction, &options.probe_offsets, reach) {
        None => movement,
        Some(hit) if perpendicular_gap(direction, &hit) < radius => {
            let along_forward = forward.dot(direction);
            let along_right = right.dot(direction);
            if along_right.abs() <= along_forward.abs() * options.slide_ratio {
                return Vector3::zero();
            }

            let side = right * along_right.signum();
            let side_hit = nearest_hit(
                scene,
                position,
                side,
                &options.probe_offsets,
                distance + radius,
            );
            match side_hit {
                Some(h) if perpendicular_gap(side, &h) < radius => return Vector3::zero(),
                _ => right * right.dot(movement),
            }
        }
        Some(hit) => {
            let facing = direction.dot(hit.normal).abs();
            let safe = (hit.distance - radius / facing).max(0.0);
            if safe >= distance {
                movement
            } else if safe > options.min_advance {
                direction * safe
            } else {
                return Vector3::zero();
            }
        }
    };

    keep_clear(scene, position, allowed, options)
}

/// Backs the endpoint of `allowed` out of any wall it ended up within
/// `collision_radius` of.
///
/// A fan of horizontal rays around the endpoint finds faces the forward probe
/// could not reach, such as a wall approached at a shallow angle. Each face
/// pushes the endpoint back along its normal, never further than the motion
/// made toward it.
fn keep_clear(
    scene: &Scene,
    position: Vector3<f32>,
    allowed: Vector3<f32>,
    options: &StreetViewOptions,
) -> Vector3<f32> {
    let radius = options.collision_radius;
    let reach = radius / FRAC_PI_8.cos();
    let end = position + allowed;
    let mut adjusted = allowed;

    for i in 0..CLEARANCE_RAYS {
        let angle = i as f32 * TAU / CLEARANCE_RAYS as f32;
        let direction = Vector3::new(angle.cos(), 0.0, angle.sin());
        for offset in &options.probe_offsets {
            let ray = Ray::new(end + Vector3::new(0.0, *offset, 0.0), direction);
            let Some(hit) = scene.raycast_solid(&ray, reach) else {
                continue;
            };
            let flat = Vector3::new(hit.normal.x, 0.0, hit.normal.z);
            if flat.magnitude2() < 1e-6 {
                continue;
            }
            // unit horizontal normal on the endpoint's side of the face
            let mut away = flat.normalize();
            if away.dot(direction) > 0.0 {
                away = -away;
            }

            let gap = hit.distance * direction.dot(away).abs() + (adjusted - allowed).dot(away);
            let approach = -adjusted.dot(away);
            if gap + 1e-5 < radius && approach > 0.0 {
                adjusted += away * (radius - gap).min(approach);
            }
        }
    }
    adjusted
}

/// Resolves a horizontal move of any length by splitting it into steps short
/// enough that a probe always reaches past the step's end.
pub fn resolve_horizontal(
    scene: &Scene,
    position: Vector3<f32>,
    movement: Vector3<f32>,
    forward: Vector3<f32>,
    right: Vector3<f32>,
    options: &StreetViewOptions,
) -> Vector3<f32> {
    let distance = movement.magnitude();
    if distance <= f32::EPSILON {
        return Vector3::zero();
    }
    let limit = (options.max_step - options.collision_radius).max(options.min_advance);
    let steps = (distance / limit).ceil().max(1.0) as usize;
    let step = movement / steps as f32;

    let mut current = position;
    for _ in 0..steps {
        let allowed = resolve_step(scene, current, step, forward, right, options);
        current += allowed;
        if allowed != step {
            break;
        }
    }
    current - position
}

/// Height the eye must not drop below, minus the eye offset.
///
/// The top of the ground mesh bounds, else the base of the building, else
/// `fallback`.
pub fn ground_level(scene: &Scene, fallback: f32) -> f32 {
    scene
        .role_bounds(Role::Ground)
        .map(|bounds| bounds.max.y)
        .or_else(|| scene.role_bounds(Role::Building).map(|bounds| bounds.min.y))
        .unwrap_or(fallback)
}

/// Eye height to clamp to when rising by `rise` would put the head through a
/// ceiling, or `None` when the way up is clear. The clamp never lies below
/// the current eye height.
pub fn ceiling_clamp(
    scene: &Scene,
    eye: Vector3<f32>,
    rise: f32,
    options: &StreetViewOptions,
) -> Option<f32> {
    if rise <= 0.0 {
        return None;
    }
    let origin = eye + Vector3::new(0.0, options.ceiling_probe_offset, 0.0);
    let ray = Ray::new(origin, Vector3::unit_y());
    let hit = scene.raycast_solid(&ray, rise + 1.0)?;
    let limit = hit.point.y - options.ceiling_clearance;
    // already closer than the clearance: hold height rather than sink
    (eye.y + rise >= limit).then_some(limit.max(eye.y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::ViewCamera;
    use crate::gfx::geometry::generate_box;
    use crate::gfx::scene::{Material, Mesh, Object};

    fn block(min: [f32; 3], max: [f32; 3]) -> Object {
        Object::new("block", vec![Mesh::surface(generate_box(min, max), Material::default())])
    }

    fn scene_with(building: Option<Object>) -> Scene {
        let mut scene = Scene::new(ViewCamera::new(Vector3::new(0.0, 6.0, 0.0), 0.0, 0.0, 1.0));
        if let Some(building) = building {
            scene.add_role_object(Role::Building, building);
        }
        scene
    }

    // heading π: facing -Z with +X to the right
    fn axes() -> (Vector3<f32>, Vector3<f32>) {
        (Vector3::new(0.0, 0.0, -1.0), Vector3::new(1.0, 0.0, 0.0))
    }

    #[test]
    fn open_space_moves_freely() {
        let scene = scene_with(None);
        let options = StreetViewOptions::default();
        let (forward, right) = axes();
        let movement = Vector3::new(0.0, 0.0, -0.8);
        let allowed = resolve_step(&scene, Vector3::new(0.0, 6.0, 0.0), movement, forward, right, &options);
        assert_eq!(allowed, movement);
    }

    #[test]
    fn approach_stops_a_radius_short() {
        let scene = scene_with(Some(block([-20.0, 0.0, -3.0], [20.0, 20.0, -2.0])));
        let options = StreetViewOptions::default();
        let (forward, right) = axes();
        let start = Vector3::new(1.3, 6.0, -0.8);
        let allowed = resolve_step(&scene, start, Vector3::new(0.0, 0.0, -0.8), forward, right, &options);
        // wall 1.2 away: advance 0.4
        assert!((allowed.z - -0.4).abs() < 1e-4);
    }

    #[test]
    fn head_on_contact_blocks() {
        let scene = scene_with(Some(block([-20.0, 0.0, -3.0], [20.0, 20.0, -2.0])));
        let options = StreetViewOptions::default();
        let (forward, right) = axes();
        let start = Vector3::new(1.3, 6.0, -1.3);
        let allowed = resolve_step(&scene, start, Vector3::new(0.0, 0.0, -0.8), forward, right, &options);
        assert_eq!(allowed, Vector3::zero());
    }

    #[test]
    fn strafe_dominant_move_slides_when_side_is_clear() {
        // a thin post just ahead of the diagonal, nothing along +X
        let scene = scene_with(Some(block([0.45, 0.0, -0.3], [0.65, 20.0, -0.1])));
        let options = StreetViewOptions::default();
        let (forward, right) = axes();
        let movement = Vector3::new(0.78, 0.0, -0.2);
        let allowed = resolve_step(&scene, Vector3::new(0.0, 6.0, 0.0), movement, forward, right, &options);
        assert!((allowed - Vector3::new(0.78, 0.0, 0.0)).magnitude() < 1e-5);
    }

    #[test]
    fn strafe_into_wall_blocks() {
        let scene = scene_with(Some(block([0.5, 0.0, -5.0], [1.0, 20.0, 5.0])));
        let options = StreetViewOptions::default();
        let (forward, right) = axes();
        let movement = Vector3::new(0.78, 0.0, -0.2);
        let allowed = resolve_step(&scene, Vector3::new(0.0, 6.0, 0.0), movement, forward, right, &options);
        assert_eq!(allowed, Vector3::zero());
    }

    #[test]
    fn long_moves_do_not_tunnel() {
        let scene = scene_with(Some(block([-20.0, 0.0, -3.0], [20.0, 20.0, -2.0])));
        let options = StreetViewOptions::default();
        let (forward, right) = axes();
        let start = Vector3::new(1.3, 6.0, 0.0);
        let moved = resolve_horizontal(&scene, start, Vector3::new(0.0, 0.0, -24.0), forward, right, &options);
        let end = start + moved;
        assert!(end.z - -2.0 >= 0.75);
    }

    #[test]
    fn shallow_approach_keeps_clearance() {
        // face at z = -2, start 0.9 out, heading mostly along the wall
        let scene = scene_with(Some(block([-60.0, 0.0, -3.0], [60.0, 20.0, -2.0])));
        let options = StreetViewOptions::default();
        let (forward, right) = axes();
        let direction = Vector3::new(0.954, 0.0, -0.3).normalize();
        let start = Vector3::new(0.0, 6.0, -1.1);

        let moved = resolve_horizontal(&scene, start, direction * 10.0, forward, right, &options);
        assert!((start + moved).z - -2.0 >= 0.75);

        let mut position = start;
        for _ in 0..30 {
            position += resolve_horizontal(&scene, position, direction * 0.8, forward, right, &options);
            let gap = position.z - -2.0;
            assert!(gap >= 0.75, "ended {gap} from the wall");
        }
        // still slides along the face
        assert!(position.x > 5.0);
    }

    #[test]
    fn low_wall_is_caught_by_lower_probe() {
        // top at y = 4, below the eye but within the probe fan
        let scene = scene_with(Some(block([-20.0, 0.0, -3.0], [20.0, 4.0, -2.0])));
        let options = StreetViewOptions::default();
        let (forward, right) = axes();
        let start = Vector3::new(1.3, 6.0, -1.3);
        let allowed = resolve_step(&scene, start, Vector3::new(0.0, 0.0, -0.8), forward, right, &options);
        assert_eq!(allowed, Vector3::zero());
    }

    #[test]
    fn ground_level_prefers_ground_then_building() {
        let mut scene = scene_with(None);
        assert_eq!(ground_level(&scene, -2.0), -2.0);
        scene.add_role_object(Role::Building, block([0.0, 1.5, 0.0], [4.0, 9.0, 4.0]));
        assert_eq!(ground_level(&scene, -2.0), 1.5);
        scene.add_role_object(Role::Ground, block([-50.0, -1.0, -50.0], [50.0, 0.25, 50.0]));
        assert_eq!(ground_level(&scene, -2.0), 0.25);
    }

    #[test]
    fn ceiling_clamps_rising_eye() {
        let scene = scene_with(Some(block([-20.0, 10.0, -20.0], [20.0, 11.0, 20.0])));
        let options = StreetViewOptions::default();
        let eye = Vector3::new(0.3, 6.0, 0.2);
        assert_eq!(ceiling_clamp(&scene, eye, 0.5, &options), None);
        let clamped = ceiling_clamp(&scene, eye, 3.0, &options).unwrap();
        assert!((clamped - 8.5).abs() < 1e-4);
        assert_eq!(ceiling_clamp(&scene, eye, -1.0, &options), None);
    }

    #[test]
    fn ceiling_within_clearance_holds_the_eye() {
        // underside 1 above the eye, closer than the 1.5 clearance
        let scene = scene_with(Some(block([-20.0, 7.0, -20.0], [20.0, 8.0, 20.0])));
        let options = StreetViewOptions::default();
        let eye = Vector3::new(0.3, 6.0, 0.2);
        let clamped = ceiling_clamp(&scene, eye, 0.2, &options).unwrap();
        assert!((clamped - eye.y).abs() < 1e-5);
    }
}
