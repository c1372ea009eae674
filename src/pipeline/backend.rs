use glam::DVec4;
use image::{ImageBuffer, Luma, RgbImage};

use crate::error::RenderError;
use crate::scene::{MirrorSurface, RenderCamera};
use crate::settings::Resolution;

/// Floating point depth image, one camera-space distance per pixel.
pub type DepthImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Offscreen render targets a framebuffer backend can bind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// RGB image for the current eye.
    Color,
    /// Single channel float image holding scaled camera depth.
    Depth,
    /// Scratch image that receives a mirror's reflected view.
    Capture,
}

/// Triangle winding treated as front facing, in normalized device coordinates.
///
/// The default is clockwise: `projection_rdf` flips y to put the image origin
/// at the top left, which mirrors screen-space winding relative to a GL
/// bottom-left projection with counter-clockwise front faces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Winding {
    Ccw,
    #[default]
    Cw,
}

impl Winding {
    pub fn flipped(self) -> Self {
        match self {
            Winding::Ccw => Winding::Cw,
            Winding::Cw => Winding::Ccw,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn full(resolution: Resolution) -> Self {
        Self {
            x: 0,
            y: 0,
            width: resolution.width,
            height: resolution.height,
        }
    }
}

/// Offscreen framebuffer state machine.
///
/// At most one target is bound at a time. Drawing state (viewport, culling,
/// winding, clip plane) applies to whatever gets drawn while bound. Viewport
/// and pending clears are forgotten on unbind; culling, winding and clip plane
/// persist until changed.
pub trait Framebuffers {
    fn resolution(&self) -> Resolution;

    /// Fails with [`RenderError::Binding`] if a target is already bound.
    fn bind(&mut self, target: Target) -> Result<(), RenderError>;

    /// Fails with [`RenderError::Binding`] if nothing is bound.
    fn unbind(&mut self) -> Result<(), RenderError>;

    fn bound(&self) -> Option<Target>;

    fn set_viewport(&mut self, viewport: Viewport);

    /// Clears color and depth of the bound target.
    fn clear(&mut self);

    fn set_cull_face(&mut self, enabled: bool);

    fn set_front_face(&mut self, winding: Winding);

    fn front_face(&self) -> Winding;

    /// Fragments with `dot(plane, (p, 1)) < 0` are discarded while set.
    fn set_clip_plane(&mut self, plane: Option<DVec4>);

    fn clip_plane(&self) -> Option<DVec4>;

    /// Copies the color target into `out`. Fails if a target is bound.
    fn download_color(&mut self, out: &mut RgbImage) -> Result<(), RenderError>;

    /// Copies the depth target into `out`. Fails if a target is bound.
    fn download_depth(&mut self, out: &mut DepthImage) -> Result<(), RenderError>;
}

/// Draws the textured scene mesh into whatever target is bound.
pub trait SceneRenderer<F: Framebuffers> {
    fn render_color(&mut self, fb: &mut F, camera: &RenderCamera) -> Result<(), RenderError>;

    /// Writes camera-space depth multiplied by `scale`.
    fn render_depth(
        &mut self,
        fb: &mut F,
        camera: &RenderCamera,
        scale: f32,
    ) -> Result<(), RenderError>;
}

/// Captures and composites planar mirror reflections.
pub trait MirrorRenderer<F: Framebuffers> {
    /// Per-mirror outline mask handle.
    type Mask: Copy;

    fn mask_resource(&self, index: usize) -> Option<Self::Mask>;

    /// Renders the scene reflected through `mirror` into [`Target::Capture`].
    ///
    /// Leaves the framebuffers unbound, with `front_face` restored and the
    /// clip plane cleared.
    fn capture_reflection<S: SceneRenderer<F>>(
        &mut self,
        fb: &mut F,
        mirror: &MirrorSurface,
        scene: &mut S,
        camera: &RenderCamera,
        front_face: Winding,
    ) -> Result<(), RenderError>;

    /// Blends the captured reflection into the bound target, limited to the
    /// mirror's outline.
    fn render(
        &mut self,
        fb: &mut F,
        mirror: &MirrorSurface,
        mask: Self::Mask,
        camera: &RenderCamera,
    ) -> Result<(), RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flipping_twice_restores_winding() {
        assert_eq!(Winding::Ccw.flipped(), Winding::Cw);
        assert_eq!(Winding::Cw.flipped().flipped(), Winding::Cw);
    }

    #[test]
    fn full_viewport_covers_resolution() {
        let vp = Viewport::full(Resolution {
            width: 10,
            height: 4,
        });
        assert_eq!((vp.x, vp.y, vp.width, vp.height), (0, 0, 10, 4));
    }
}
