//! Fixed two-light Lambertian model baked into vertex colours.
//!
//! A key light from above-front and a weaker fill light from the opposite
//! direction, on top of an ambient floor. Bright spots get a small specular
//! boost of `intensity^4 * SPECULAR_GAIN`.

use super::Rgba;
use glam::Vec3;

pub const AMBIENT: f32 = 0.35;
pub const KEY_STRENGTH: f32 = 0.55;
pub const FILL_STRENGTH: f32 = 0.25;
pub const SPECULAR_GAIN: f32 = 0.15;

fn key_light() -> Vec3 {
    Vec3::new(0.5, 1.0, 0.7).normalize()
}

/// Light intensity for a surface with the given normal, before the specular boost.
pub fn intensity(normal: Vec3) -> f32 {
    let n = normal.normalize_or_zero();
    let key = key_light();
    let diffuse_key = n.dot(key).max(0.0) * KEY_STRENGTH;
    let diffuse_fill = n.dot(-key).max(0.0) * FILL_STRENGTH;
    (AMBIENT + diffuse_key + diffuse_fill).min(1.0)
}

/// Shades `base` for `normal`. Alpha passes through untouched.
pub fn shade(normal: Vec3, base: Rgba) -> Rgba {
    let i = intensity(normal);
    let boost = i.powi(4) * SPECULAR_GAIN;
    [
        (base[0] * i + boost).clamp(0.0, 1.0),
        (base[1] * i + boost).clamp(0.0, 1.0),
        (base[2] * i + boost).clamp(0.0, 1.0),
        base[3],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambient_floor_applies_to_unlit_side() {
        // Perpendicular to both lights.
        let key = key_light();
        let side = key.any_orthonormal_vector();
        assert!((intensity(side) - AMBIENT).abs() < 1e-5);
    }

    #[test]
    fn key_side_is_brighter_than_fill_side() {
        let key = key_light();
        assert!(intensity(key) > intensity(-key));
        assert!(intensity(-key) > AMBIENT);
    }

    #[test]
    fn shading_preserves_alpha_and_stays_in_range() {
        for normal in [Vec3::X, Vec3::Y, Vec3::Z, -Vec3::Y, Vec3::ONE] {
            let c = shade(normal, [1.0, 0.5, 0.0, 0.3]);
            assert_eq!(c[3], 0.3);
            assert!(c[..3].iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn zero_normal_falls_back_to_ambient() {
        assert!((intensity(Vec3::ZERO) - AMBIENT).abs() < 1e-6);
    }
}
