use glam::{DMat4, DVec3, DVec4};

/// A fixed incremental transform paired with its inverse.
///
/// Both matrices are computed once on construction. Applying `forward` and then
/// `inverse` (or the other way round) therefore uses the same two matrices
/// every time, so the camera never accumulates drift from re-derived inverses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RigidStep {
    forward: DMat4,
    inverse: DMat4,
}

impl RigidStep {
    pub fn new(forward: DMat4) -> Self {
        Self {
            forward,
            inverse: forward.inverse(),
        }
    }

    pub fn from_translation(translation: DVec3) -> Self {
        Self::new(DMat4::from_translation(translation))
    }

    pub fn forward(&self) -> DMat4 {
        self.forward
    }

    pub fn inverse(&self) -> DMat4 {
        self.inverse
    }
}

/// Householder reflection through the plane `n.x + d = 0`.
///
/// `plane` must carry a unit normal in `xyz`.
pub fn reflection_matrix(plane: DVec4) -> DMat4 {
    let n = plane.truncate();
    let d = plane.w;
    DMat4::from_cols(
        DVec4::new(1.0 - 2.0 * n.x * n.x, -2.0 * n.y * n.x, -2.0 * n.z * n.x, 0.0),
        DVec4::new(-2.0 * n.x * n.y, 1.0 - 2.0 * n.y * n.y, -2.0 * n.z * n.y, 0.0),
        DVec4::new(-2.0 * n.x * n.z, -2.0 * n.y * n.z, 1.0 - 2.0 * n.z * n.z, 0.0),
        DVec4::new(-2.0 * d * n.x, -2.0 * d * n.y, -2.0 * d * n.z, 1.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_is_computed_once_and_exact_enough() {
        let step = RigidStep::new(
            DMat4::from_rotation_z(0.3) * DMat4::from_translation(DVec3::new(0.5, -1.0, 2.0)),
        );
        assert!((step.forward() * step.inverse()).abs_diff_eq(DMat4::IDENTITY, 1e-12));
        let copy = step;
        assert_eq!(copy.inverse(), step.inverse());
    }

    #[test]
    fn reflection_is_an_involution() {
        let n = DVec3::new(1.0, 2.0, -0.5).normalize();
        let r = reflection_matrix(n.extend(-0.7));
        assert!((r * r).abs_diff_eq(DMat4::IDENTITY, 1e-12));
    }

    #[test]
    fn reflection_fixes_points_on_the_plane_and_mirrors_others() {
        // Plane x = 2.
        let r = reflection_matrix(DVec4::new(1.0, 0.0, 0.0, -2.0));
        let on_plane = DVec3::new(2.0, 5.0, -1.0);
        assert!(r.transform_point3(on_plane).abs_diff_eq(on_plane, 1e-12));

        let p = DVec3::new(3.0, 1.0, 1.0);
        assert!(r
            .transform_point3(p)
            .abs_diff_eq(DVec3::new(1.0, 1.0, 1.0), 1e-12));
    }

    #[test]
    fn reflection_flips_handedness() {
        let r = reflection_matrix(DVec4::new(0.0, 0.0, 1.0, 0.0));
        assert!(r.determinant() < 0.0);
    }
}
