use crate::render::pick::Ray;
use glam::{Mat4, Vec3};

const PARALLEL_EPSILON: f32 = 1e-8;

/// Object-space bounding box used for picking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionVolume {
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
    pub enabled: bool,
}

impl CollisionVolume {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            bounds_min: a.min(b),
            bounds_max: a.max(b),
            enabled: true,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.bounds_min + self.bounds_max) * 0.5
    }

    /// Distance along `ray` to the box transformed by `world`, or `None` on a miss.
    /// A ray starting inside the box reports the distance to where it leaves.
    ///
    /// `world` must be `T(location) * R * S(scale) * T(-origin)`. The ray is
    /// projected onto the (unit) columns of `world`; along each axis the box
    /// spans `|scale| * (bounds - origin)` around `location`.
    pub fn intersect(&self, ray: &Ray, world: &Mat4, scale: Vec3, origin: Vec3) -> Option<f32> {
        let location = world.transform_point3(origin);
        let delta = location - ray.origin;
        let columns = [world.x_axis, world.y_axis, world.z_axis];

        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;
        for i in 0..3 {
            let axis = columns[i].truncate().normalize_or_zero();
            let s = scale[i].abs();
            let lo = (self.bounds_min[i] - origin[i]) * s;
            let hi = (self.bounds_max[i] - origin[i]) * s;
            let e = axis.dot(delta);
            let f = axis.dot(ray.direction);

            if f.abs() > PARALLEL_EPSILON {
                let mut t1 = (e + lo) / f;
                let mut t2 = (e + hi) / f;
                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }
                t_min = t_min.max(t1);
                t_max = t_max.min(t2);
                if t_max < t_min {
                    return None;
                }
            } else if -e + lo > 0.0 || -e + hi < 0.0 {
                return None;
            }
        }
        if t_min > 0.0 {
            Some(t_min)
        } else if t_max > 0.0 && t_max.is_finite() {
            Some(t_max)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn unit_box_at(location: Vec3, scale: Vec3) -> (CollisionVolume, Mat4, Vec3) {
        let origin = Vec3::splat(0.5);
        let world = Mat4::from_translation(location)
            * Mat4::from_scale(scale)
            * Mat4::from_translation(-origin);
        (CollisionVolume::new(Vec3::ZERO, Vec3::ONE), world, origin)
    }

    #[test]
    fn head_on_hit_reports_near_face_distance() {
        let (volume, world, origin) = unit_box_at(Vec3::new(0.0, 0.0, -10.0), Vec3::splat(2.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z).unwrap();
        let t = volume.intersect(&ray, &world, Vec3::splat(2.0), origin).unwrap();
        assert!((t - 9.0).abs() < 1e-4, "t = {}", t);
    }

    #[test]
    fn ray_from_inside_reports_exit_distance() {
        let (volume, world, origin) = unit_box_at(Vec3::ZERO, Vec3::splat(10.0));
        let ray = Ray::new(Vec3::new(0.0, 0.0, 2.0), Vec3::NEG_Z).unwrap();
        let t = volume.intersect(&ray, &world, Vec3::splat(10.0), origin).unwrap();
        assert!((t - 7.0).abs() < 1e-4, "t = {}", t);
    }

    #[test]
    fn box_behind_the_ray_misses() {
        let (volume, world, origin) = unit_box_at(Vec3::new(0.0, 0.0, 10.0), Vec3::splat(2.0));
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z).unwrap();
        assert!(volume.intersect(&ray, &world, Vec3::splat(2.0), origin).is_none());
    }

    #[test]
    fn ray_pointing_away_misses() {
        let (volume, world, origin) = unit_box_at(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE);
        let ray = Ray::new(Vec3::ZERO, Vec3::Z).unwrap();
        assert!(volume.intersect(&ray, &world, Vec3::ONE, origin).is_none());
    }

    #[test]
    fn parallel_ray_outside_slab_is_rejected() {
        let (volume, world, origin) = unit_box_at(Vec3::new(0.0, 0.0, -10.0), Vec3::ONE);
        // Travels along -Z, offset two units in X: parallel to the X slabs and outside them.
        let ray = Ray::new(Vec3::new(2.0, 0.0, 0.0), Vec3::NEG_Z).unwrap();
        assert!(volume.intersect(&ray, &world, Vec3::ONE, origin).is_none());
        // Inside the X and Y slabs the parallel axes impose no constraint.
        let ray = Ray::new(Vec3::new(0.25, -0.25, 0.0), Vec3::NEG_Z).unwrap();
        assert!(volume.intersect(&ray, &world, Vec3::ONE, origin).is_some());
    }

    #[test]
    fn rotation_moves_the_box_faces() {
        let origin = Vec3::splat(0.5);
        let volume = CollisionVolume::new(Vec3::ZERO, Vec3::ONE);
        let scale = Vec3::new(8.0, 1.0, 1.0);
        // Long box along X, rotated a quarter turn about Y so it lies along Z.
        let world = Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0))
            * Mat4::from_quat(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2))
            * Mat4::from_scale(scale)
            * Mat4::from_translation(-origin);
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z).unwrap();
        let t = volume.intersect(&ray, &world, scale, origin).unwrap();
        assert!((t - 6.0).abs() < 1e-3, "t = {}", t);
    }

    #[test]
    fn new_orders_corners() {
        let volume = CollisionVolume::new(Vec3::new(1.0, -1.0, 2.0), Vec3::new(-1.0, 1.0, 0.0));
        assert_eq!(volume.bounds_min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(volume.bounds_max, Vec3::new(1.0, 1.0, 2.0));
        assert_eq!(volume.center(), Vec3::new(0.0, 0.0, 1.0));
    }
}
