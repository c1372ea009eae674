use crate::error::RenderError;
use crate::pipeline::backend::{Framebuffers, MirrorRenderer, SceneRenderer, Target, Viewport};
use crate::scene::{MirrorSurface, RenderCamera};

/// Runs capture-then-draw for every mirror, in list order.
///
/// Captures only see the scene, never other mirrors. Composites share the
/// color target, so a mirror drawn later paints over earlier ones where they
/// overlap.
pub struct MirrorCompositor<'a> {
    mirrors: &'a [MirrorSurface],
}

impl<'a> MirrorCompositor<'a> {
    pub fn new(mirrors: &'a [MirrorSurface]) -> Self {
        Self { mirrors }
    }

    pub fn composite<F, S, M>(
        &self,
        fb: &mut F,
        scene: &mut S,
        mirror_renderer: &mut M,
        camera: &RenderCamera,
    ) -> Result<(), RenderError>
    where
        F: Framebuffers,
        S: SceneRenderer<F>,
        M: MirrorRenderer<F>,
    {
        for (index, mirror) in self.mirrors.iter().enumerate() {
            let mask = mirror_renderer.mask_resource(index).ok_or_else(|| {
                RenderError::Mirror(format!("no mask resource for mirror {index}"))
            })?;

            let front_face = fb.front_face();
            mirror_renderer.capture_reflection(fb, mirror, scene, camera, front_face)?;

            fb.bind(Target::Color)?;
            fb.set_viewport(Viewport::full(fb.resolution()));
            mirror_renderer.render(fb, mirror, mask, camera)?;
            fb.unbind()?;
        }
        Ok(())
    }
}
