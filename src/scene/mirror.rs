use std::path::Path;

use glam::{DMat4, DVec2, DVec3, DVec4};
use image::{GrayImage, Luma};
use serde::Deserialize;

use crate::error::RenderError;
use crate::io;
use crate::scene::transform::reflection_matrix;

#[derive(Debug, Deserialize)]
struct MirrorDescription {
    equation: [f64; 4],
    points: Vec<[f64; 3]>,
    #[serde(default = "MirrorDescription::default_reflectivity")]
    reflectivity: f64,
}

impl MirrorDescription {
    fn default_reflectivity() -> f64 {
        1.0
    }
}

/// Orthonormal frame spanning a mirror plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneBasis {
    pub origin: DVec3,
    pub u: DVec3,
    pub v: DVec3,
}

impl PlaneBasis {
    fn project(&self, p: DVec3) -> DVec2 {
        let rel = p - self.origin;
        DVec2::new(rel.dot(self.u), rel.dot(self.v))
    }

    fn lift(&self, p: DVec2) -> DVec3 {
        self.origin + self.u * p.x + self.v * p.y
    }
}

/// A planar reflective polygon, immutable once loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct MirrorSurface {
    plane: DVec4,
    reflectivity: f32,
    basis: PlaneBasis,
    outline: Vec<DVec2>,
    min: DVec2,
    max: DVec2,
}

impl MirrorSurface {
    /// Builds a mirror from the plane `equation` (`a x + b y + c z + d = 0`) and
    /// its boundary polygon. Points are projected onto the plane.
    pub fn new(equation: [f64; 4], points: &[[f64; 3]], reflectivity: f64) -> Result<Self, RenderError> {
        let raw = DVec4::from_array(equation);
        let normal_len = raw.truncate().length();
        if !raw.is_finite() || normal_len < 1e-12 {
            return Err(RenderError::Mirror(format!(
                "plane equation {:?} has no usable normal",
                equation
            )));
        }
        if points.len() < 3 {
            return Err(RenderError::Mirror(format!(
                "a mirror needs at least 3 boundary points, got {}",
                points.len()
            )));
        }
        if !reflectivity.is_finite() {
            return Err(RenderError::Mirror("reflectivity must be finite".into()));
        }

        let plane = raw / normal_len;
        let n = plane.truncate();
        let points: Vec<DVec3> = points.iter().map(|p| DVec3::from_array(*p)).collect();

        let centroid = points.iter().copied().sum::<DVec3>() / points.len() as f64;
        let origin = centroid - n * (n.dot(centroid) + plane.w);
        let helper = if n.z.abs() < 0.9 { DVec3::Z } else { DVec3::X };
        let u = helper.cross(n).normalize();
        let v = n.cross(u);
        let basis = PlaneBasis { origin, u, v };

        let outline: Vec<DVec2> = points.iter().map(|p| basis.project(*p)).collect();
        let min = outline.iter().copied().fold(DVec2::splat(f64::INFINITY), DVec2::min);
        let max = outline
            .iter()
            .copied()
            .fold(DVec2::splat(f64::NEG_INFINITY), DVec2::max);
        let extent = max - min;
        if extent.x < 1e-9 || extent.y < 1e-9 {
            return Err(RenderError::Mirror(
                "mirror boundary is degenerate within its plane".into(),
            ));
        }

        Ok(Self {
            plane,
            reflectivity: reflectivity.clamp(0.0, 1.0) as f32,
            basis,
            outline,
            min,
            max,
        })
    }

    /// Unit-normal plane equation.
    pub fn plane(&self) -> DVec4 {
        self.plane
    }

    pub fn reflectivity(&self) -> f32 {
        self.reflectivity
    }

    pub fn basis(&self) -> &PlaneBasis {
        &self.basis
    }

    /// World transform that mirrors the scene through this plane.
    pub fn reflection(&self) -> DMat4 {
        reflection_matrix(self.plane)
    }

    /// The plane oriented so that `eye` lies on its positive side.
    ///
    /// Geometry on the negative side sits behind the mirror and must not show
    /// up in the reflection.
    pub fn clip_plane_facing(&self, eye: DVec3) -> DVec4 {
        let side = self.plane.truncate().dot(eye) + self.plane.w;
        if side < 0.0 {
            -self.plane
        } else {
            self.plane
        }
    }

    /// Corners of the bounding rectangle in world space, counter-clockwise in
    /// plane coordinates, paired with their mask coordinates.
    pub fn quad(&self) -> [(DVec3, [f32; 2]); 4] {
        let (lo, hi) = (self.min, self.max);
        [
            (self.basis.lift(DVec2::new(lo.x, lo.y)), [0.0, 0.0]),
            (self.basis.lift(DVec2::new(hi.x, lo.y)), [1.0, 0.0]),
            (self.basis.lift(DVec2::new(hi.x, hi.y)), [1.0, 1.0]),
            (self.basis.lift(DVec2::new(lo.x, hi.y)), [0.0, 1.0]),
        ]
    }

    /// Rasterizes the boundary polygon over the bounding rectangle.
    ///
    /// Texel `(x, y)` covers mask coordinate `((x + 0.5) / size, (y + 0.5) / size)`;
    /// inside texels are 255, outside texels 0.
    pub fn mask(&self, size: u32) -> GrayImage {
        let extent = self.max - self.min;
        GrayImage::from_fn(size, size, |x, y| {
            let uv = DVec2::new(
                (x as f64 + 0.5) / size as f64,
                (y as f64 + 0.5) / size as f64,
            );
            let p = self.min + uv * extent;
            if point_in_polygon(p, &self.outline) {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }
}

/// Even-odd rule.
fn point_in_polygon(p: DVec2, polygon: &[DVec2]) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Parses a JSON array of mirror descriptions, preserving order.
pub fn parse_mirrors(json: &str) -> Result<Vec<MirrorSurface>, RenderError> {
    let descriptions: Vec<MirrorDescription> = serde_json::from_str(json)?;
    descriptions
        .iter()
        .enumerate()
        .map(|(index, desc)| {
            MirrorSurface::new(desc.equation, &desc.points, desc.reflectivity).map_err(|err| match err {
                RenderError::Mirror(reason) => RenderError::Mirror(format!("mirror {index}: {reason}")),
                other => other,
            })
        })
        .collect()
}

pub fn load_mirrors(path: &Path) -> Result<Vec<MirrorSurface>, RenderError> {
    let json = io::load_string(path)?;
    let mirrors = parse_mirrors(&json)?;
    log::info!("Loaded {} mirrors from {:?}", mirrors.len(), path);
    Ok(mirrors)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unit square in the plane x = 1.
    fn wall_mirror() -> MirrorSurface {
        MirrorSurface::new(
            [1.0, 0.0, 0.0, -1.0],
            &[
                [1.0, -0.5, 0.0],
                [1.0, 0.5, 0.0],
                [1.0, 0.5, 1.0],
                [1.0, -0.5, 1.0],
            ],
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn parses_mirror_json_in_order() {
        let json = r#"[
            { "equation": [2, 0, 0, -2], "points": [[1, 0, 0], [1, 1, 0], [1, 1, 1]], "reflectivity": 0.5 },
            { "equation": [0, 0, 1, 0], "points": [[0, 0, 0], [1, 0, 0], [1, 1, 0]] }
        ]"#;
        let mirrors = parse_mirrors(json).unwrap();
        assert_eq!(mirrors.len(), 2);
        assert_eq!(mirrors[0].plane(), DVec4::new(1.0, 0.0, 0.0, -1.0));
        assert_eq!(mirrors[0].reflectivity(), 0.5);
        assert_eq!(mirrors[1].reflectivity(), 1.0);
        assert_eq!(mirrors[1].plane(), DVec4::new(0.0, 0.0, 1.0, 0.0));
    }

    #[test]
    fn rejects_malformed_mirrors() {
        assert!(parse_mirrors(r#"[{ "equation": [0, 0, 0, 1], "points": [[0,0,0],[1,0,0],[0,1,0]] }]"#).is_err());
        assert!(parse_mirrors(r#"[{ "equation": [0, 0, 1, 0], "points": [[0,0,0],[1,0,0]] }]"#).is_err());
        assert!(parse_mirrors(r#"{ "equation": [0, 0, 1, 0] }"#).is_err());
    }

    #[test]
    fn empty_list_is_valid() {
        assert!(parse_mirrors("[]").unwrap().is_empty());
    }

    #[test]
    fn basis_is_orthonormal_and_in_plane() {
        let mirror = wall_mirror();
        let b = mirror.basis();
        let n = mirror.plane().truncate();
        assert!((b.u.length() - 1.0).abs() < 1e-12);
        assert!((b.v.length() - 1.0).abs() < 1e-12);
        assert!(b.u.dot(b.v).abs() < 1e-12);
        assert!(b.u.dot(n).abs() < 1e-12);
        assert!((n.dot(b.origin) + mirror.plane().w).abs() < 1e-12);
    }

    #[test]
    fn quad_spans_the_boundary() {
        let mirror = wall_mirror();
        for (corner, _) in mirror.quad() {
            assert!((corner.x - 1.0).abs() < 1e-12);
            assert!(corner.y.abs() <= 0.5 + 1e-12);
            assert!(corner.z >= -1e-12 && corner.z <= 1.0 + 1e-12);
        }
    }

    #[test]
    fn clip_plane_faces_the_eye() {
        let mirror = wall_mirror();
        let eye = DVec3::new(0.0, 0.0, 0.5);
        let plane = mirror.clip_plane_facing(eye);
        assert!(plane.truncate().dot(eye) + plane.w > 0.0);

        let behind = DVec3::new(3.0, 0.0, 0.5);
        let flipped = mirror.clip_plane_facing(behind);
        assert!(flipped.truncate().dot(behind) + flipped.w > 0.0);
    }

    #[test]
    fn rectangular_mirror_mask_is_full() {
        let mask = wall_mirror().mask(16);
        assert!(mask.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn triangular_mirror_mask_covers_about_half() {
        let mirror = MirrorSurface::new(
            [0.0, 0.0, 1.0, 0.0],
            &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            1.0,
        )
        .unwrap();
        let mask = mirror.mask(64);
        let inside = mask.pixels().filter(|p| p.0[0] == 255).count();
        let total = 64 * 64;
        assert!(inside > total * 45 / 100 && inside < total * 55 / 100, "{inside}");
    }

    #[test]
    fn point_in_polygon_handles_concave_outline() {
        // An L shape.
        let outline = [
            DVec2::new(0.0, 0.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(2.0, 1.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(1.0, 2.0),
            DVec2::new(0.0, 2.0),
        ];
        assert!(point_in_polygon(DVec2::new(0.5, 1.5), &outline));
        assert!(point_in_polygon(DVec2::new(1.5, 0.5), &outline));
        assert!(!point_in_polygon(DVec2::new(1.5, 1.5), &outline));
    }
}
