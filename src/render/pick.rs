//! Ray picking math
//!
//! Screen points are unprojected through the inverse view-projection into a
//! world-space ray; the scene then tests that ray against every object's
//! collision box.

use glam::{Mat4, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        origin.is_finite().then_some(Self { origin, direction })
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Closest pick result of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit<Id> {
    pub id: Id,
    pub distance: f32,
}

/// Keeps the nearest strictly positive hit.
#[derive(Debug, Clone, Copy)]
pub struct ClosestHit<Id> {
    best: Option<PickHit<Id>>,
}

impl<Id: Copy> Default for ClosestHit<Id> {
    fn default() -> Self {
        Self { best: None }
    }
}

impl<Id: Copy> ClosestHit<Id> {
    pub fn offer(&mut self, id: Id, distance: f32) {
        if !(distance > 0.0) || !distance.is_finite() {
            return;
        }
        match self.best {
            Some(best) if best.distance <= distance => {}
            _ => self.best = Some(PickHit { id, distance }),
        }
    }

    pub fn into_hit(self) -> Option<PickHit<Id>> {
        self.best
    }
}

/// Forward / right / up for a camera at `eye` looking at `target` with world up `up`.
pub fn camera_basis(eye: Vec3, target: Vec3, up: Vec3) -> (Vec3, Vec3, Vec3) {
    let forward = (target - eye).normalize_or_zero();
    let right = forward.cross(up).normalize_or_zero();
    let up = right.cross(forward).normalize_or_zero();
    (forward, right, up)
}

/// Unprojects a pixel (top-left origin) into a world-space ray running from
/// the near plane towards the far plane.
pub fn screen_to_ray(
    screen_x: f32,
    screen_y: f32,
    viewport_width: f32,
    viewport_height: f32,
    view: Mat4,
    projection: Mat4,
) -> Option<Ray> {
    if !(viewport_width > 0.0 && viewport_height > 0.0) {
        return None;
    }
    let ndc_x = screen_x / viewport_width * 2.0 - 1.0;
    let ndc_y = 1.0 - screen_y / viewport_height * 2.0;

    let inverse = (projection * view).inverse();
    let near = unproject(inverse, Vec4::new(ndc_x, ndc_y, 0.0, 1.0))?;
    let far = unproject(inverse, Vec4::new(ndc_x, ndc_y, 1.0, 1.0))?;
    Ray::new(near, far - near)
}

fn unproject(inverse: Mat4, clip: Vec4) -> Option<Vec3> {
    let world = inverse * clip;
    if world.w.abs() < f32::EPSILON {
        return None;
    }
    let point = world.truncate() / world.w;
    point.is_finite().then_some(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn look_down_negative_z() -> (Mat4, Mat4) {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh(60f32.to_radians(), 1.0, 1.0, 1000.0);
        (view, projection)
    }

    #[test]
    fn centre_pixel_ray_points_at_target() {
        let (view, projection) = look_down_negative_z();
        let ray = screen_to_ray(50.0, 50.0, 100.0, 100.0, view, projection).unwrap();
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
        assert!((ray.origin - Vec3::new(0.0, 0.0, 9.0)).length() < 1e-3);
    }

    #[test]
    fn top_of_screen_points_up() {
        let (view, projection) = look_down_negative_z();
        let ray = screen_to_ray(50.0, 0.0, 100.0, 100.0, view, projection).unwrap();
        assert!(ray.direction.y > 0.0);
        let ray = screen_to_ray(100.0, 50.0, 100.0, 100.0, view, projection).unwrap();
        assert!(ray.direction.x > 0.0);
    }

    #[test]
    fn empty_viewport_has_no_ray() {
        let (view, projection) = look_down_negative_z();
        assert!(screen_to_ray(0.0, 0.0, 0.0, 100.0, view, projection).is_none());
    }

    #[test]
    fn basis_is_orthonormal() {
        let (f, r, u) = camera_basis(Vec3::new(3.0, 4.0, 5.0), Vec3::ZERO, Vec3::Y);
        assert!((f.length() - 1.0).abs() < 1e-5);
        assert!(f.dot(r).abs() < 1e-5);
        assert!(f.dot(u).abs() < 1e-5);
        assert!(u.y > 0.0);
    }

    #[test]
    fn closest_hit_ignores_non_positive_distances() {
        let mut closest = ClosestHit::default();
        closest.offer(1, 0.0);
        closest.offer(2, -3.0);
        closest.offer(3, 8.0);
        closest.offer(4, 2.0);
        closest.offer(5, 2.0);
        closest.offer(6, f32::NAN);
        let hit = closest.into_hit().unwrap();
        assert_eq!(hit.id, 4);
        assert_eq!(hit.distance, 2.0);
    }

    #[test]
    fn zero_direction_is_not_a_ray() {
        assert!(Ray::new(Vec3::ZERO, Vec3::ZERO).is_none());
    }
}
