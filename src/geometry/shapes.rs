use super::shading::shade;
use super::{uniform_colors, MeshData, Rgba, WHITE};
use glam::Vec3;
use std::f32::consts::{FRAC_PI_2, PI};

/// Tessellation of the point marker, independent of event energy.
pub const POINT_TESSELLATION: u32 = 8;

/// Pole-to-pole grid on the unit sphere, as `(unit direction, azimuth)` pairs.
/// Row `i` is parallel `i`, column `j` meridian `j`.
fn sphere_grid(parallels: u32, meridians: u32) -> Vec<(Vec3, f32)> {
    let mut grid = Vec::with_capacity(((parallels + 1) * meridians) as usize);
    for i in 0..=parallels {
        let theta = i as f32 * PI / parallels as f32;
        for j in 0..meridians {
            let phi = j as f32 * 2.0 * PI / meridians as f32;
            let dir = Vec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
            grid.push((dir, phi));
        }
    }
    grid
}

fn grid_triangles(parallels: u32, meridians: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity((parallels * meridians * 6) as usize);
    for i in 0..parallels {
        for j in 0..meridians {
            let a = i * meridians + j;
            let b = i * meridians + (j + 1) % meridians;
            let c = (i + 1) * meridians + j;
            let d = (i + 1) * meridians + (j + 1) % meridians;
            indices.extend_from_slice(&[a, b, c, b, d, c]);
        }
    }
    indices
}

fn grid_edges(parallels: u32, meridians: u32) -> Vec<u32> {
    let mut edges = Vec::new();
    for i in 0..parallels {
        for j in 0..meridians {
            let current = i * meridians + j;
            edges.extend_from_slice(&[current, i * meridians + (j + 1) % meridians]);
            if i + 1 < parallels {
                edges.extend_from_slice(&[current, (i + 1) * meridians + j]);
            }
        }
    }
    edges
}

fn shaded_grid(parallels: u32, meridians: u32, color_at: impl Fn(f32) -> Rgba) -> MeshData {
    let parallels = parallels.max(1);
    let meridians = meridians.max(3);
    let grid = sphere_grid(parallels, meridians);
    let vertices = grid.iter().map(|(dir, _)| *dir * 0.5 + Vec3::splat(0.5)).collect();
    let colors = grid.iter().map(|(dir, phi)| shade(*dir, color_at(*phi))).collect();
    MeshData {
        vertices,
        colors,
        triangles: grid_triangles(parallels, meridians),
        quads: Vec::new(),
        edges: grid_edges(parallels, meridians),
    }
}

/// UV sphere inscribed in the unit box `[0, 1]^3`, shaded from `color`.
pub fn sphere(parallels: u32, meridians: u32, color: Rgba) -> MeshData {
    shaded_grid(parallels, meridians, |_| color)
}

/// Sphere split into four longitudinal sectors alternating white and `color`.
pub fn beach_ball(parallels: u32, meridians: u32, color: Rgba) -> MeshData {
    let white = [WHITE[0], WHITE[1], WHITE[2], color[3]];
    shaded_grid(parallels, meridians, |phi| {
        if beach_ball_sector(phi) % 2 == 0 {
            white
        } else {
            color
        }
    })
}

/// Sector index in `0..4` for an azimuth in radians.
pub fn beach_ball_sector(azimuth: f32) -> u32 {
    let sector = (azimuth.rem_euclid(2.0 * PI) / FRAC_PI_2).floor() as u32;
    sector % 4
}

/// Low-poly sphere used for the fixed-size point style.
pub fn point_marker(tessellation: u32, color: Rgba) -> MeshData {
    sphere(tessellation, tessellation, color)
}

/// Square-based pyramid in the unit box, apex up.
pub fn pyramid(color: Rgba) -> MeshData {
    let vertices = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(0.5, 1.0, 0.5),
    ];
    MeshData {
        colors: uniform_colors(vertices.len(), color),
        vertices,
        triangles: vec![0, 1, 2, 0, 2, 3, 0, 1, 4, 1, 2, 4, 2, 3, 4, 3, 0, 4],
        quads: Vec::new(),
        edges: vec![0, 1, 1, 2, 2, 3, 3, 0, 0, 4, 1, 4, 2, 4, 3, 4],
    }
}

/// Unit cube with six quad faces and twelve edges.
pub fn cube(color: Rgba) -> MeshData {
    let vertices = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(0.0, 1.0, 1.0),
    ];
    MeshData {
        colors: uniform_colors(vertices.len(), color),
        vertices,
        triangles: Vec::new(),
        quads: vec![
            0, 1, 2, 3, //
            3, 2, 6, 7, //
            1, 0, 4, 5, //
            2, 1, 5, 6, //
            0, 3, 7, 4, //
            7, 6, 5, 4,
        ],
        edges: vec![
            0, 1, 1, 2, 2, 3, 3, 0, 0, 4, 1, 5, 2, 6, 3, 7, 4, 5, 5, 6, 6, 7, 7, 4,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_indices_in_range(mesh: &MeshData) {
        let n = mesh.vertex_count() as u32;
        for list in [&mesh.triangles, &mesh.quads, &mesh.edges] {
            assert!(list.iter().all(|&i| i < n), "index out of range");
        }
    }

    #[test]
    fn small_sphere_has_expected_counts() {
        let mesh = sphere(2, 4, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.triangles.len(), 48);
        assert_eq!(mesh.colors.len(), 12);
        assert!(mesh.quads.is_empty());
        assert_indices_in_range(&mesh);
    }

    #[test]
    fn sphere_fits_unit_box_and_keeps_alpha() {
        let mesh = sphere(16, 16, [0.0, 1.0, 0.0, 0.4]);
        let (lo, hi) = mesh.bounds();
        assert!(lo.cmpge(Vec3::splat(-1e-5)).all());
        assert!(hi.cmple(Vec3::splat(1.0 + 1e-5)).all());
        assert!((lo.x).abs() < 1e-5 && (hi.x - 1.0).abs() < 1e-5);
        assert!(mesh.colors.iter().all(|c| c[3] == 0.4));
        assert_indices_in_range(&mesh);
    }

    #[test]
    fn sphere_edges_skip_the_last_ring_link() {
        let mesh = sphere(3, 4, WHITE);
        // Every cell has a ring edge; only the first two parallels link downwards.
        assert_eq!(mesh.edges.len(), (3 * 4 + 2 * 4) * 2);
    }

    #[test]
    fn beach_ball_alternates_sectors() {
        assert_eq!(beach_ball_sector(0.1), 0);
        assert_eq!(beach_ball_sector(FRAC_PI_2 + 0.1), 1);
        assert_eq!(beach_ball_sector(PI + 0.1), 2);
        assert_eq!(beach_ball_sector(3.0 * FRAC_PI_2 + 0.1), 3);
        assert_eq!(beach_ball_sector(2.0 * PI + 0.1), 0);

        let red = [1.0, 0.0, 0.0, 0.5];
        let mesh = beach_ball(4, 8, red);
        // Meridian 2 sits at azimuth pi/2 (sector 1, event colour); meridian 0 is white.
        let equator = 2 * 8;
        let white_vertex = mesh.colors[equator];
        let red_vertex = mesh.colors[equator + 2];
        assert!(white_vertex[1] > red_vertex[1]);
        assert!(mesh.colors.iter().all(|c| c[3] == 0.5));
    }

    #[test]
    fn point_marker_is_low_poly() {
        let mesh = point_marker(POINT_TESSELLATION, WHITE);
        let n = POINT_TESSELLATION as usize;
        assert_eq!(mesh.vertex_count(), (n + 1) * n);
    }

    #[test]
    fn cube_and_pyramid_tables_are_valid() {
        let c = cube(WHITE);
        assert_eq!(c.vertex_count(), 8);
        assert_eq!(c.quads.len(), 24);
        assert_eq!(c.edges.len(), 24);
        assert_indices_in_range(&c);

        let p = pyramid(WHITE);
        assert_eq!(p.vertex_count(), 5);
        assert_eq!(p.triangles.len(), 18);
        assert_eq!(p.edges.len(), 16);
        assert_indices_in_range(&p);
    }

    #[test]
    fn degenerate_tessellation_is_clamped() {
        let mesh = sphere(0, 0, WHITE);
        assert!(!mesh.is_empty());
        assert_indices_in_range(&mesh);
    }
}
