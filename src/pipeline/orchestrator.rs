use glam::{DMat4, DVec3};
use image::RgbImage;

use crate::error::RenderError;
use crate::pipeline::backend::{
    DepthImage, Framebuffers, MirrorRenderer, SceneRenderer, Target, Viewport,
};
use crate::pipeline::compositor::MirrorCompositor;
use crate::pipeline::output::{Eye, OutputWriter};
use crate::pipeline::quantize::{quantize_depth_image, Depth16Image};
use crate::scene::{projection_rdf, CameraPoseController, MirrorSurface, RenderCamera, RigidStep};
use crate::settings::RenderSettings;

/// One unit of work in the per-frame render sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FramePhase {
    LeftPass,
    MirrorsLeft,
    SaveLeft,
    ShiftToRight,
    RightPass,
    MirrorsRight,
    SaveRight,
    RestoreToLeft,
    DepthPass,
    SaveDepth,
    AdvanceTrajectory,
    Done,
}

/// Drives the stereo and depth passes for every frame of the trajectory.
pub struct FrameOrchestrator<F, S, M> {
    framebuffers: F,
    scene: S,
    mirror_renderer: M,
    mirrors: Vec<MirrorSurface>,
    camera: CameraPoseController,
    projection: DMat4,
    baseline: RigidStep,
    trajectory_step: RigidStep,
    output: OutputWriter,
    frame_count: usize,
    render_depth: bool,
    depth_scale: f32,
    color: RgbImage,
    depth: DepthImage,
    depth16: Depth16Image,
    frame: usize,
    phase: FramePhase,
}

impl<F, S, M> FrameOrchestrator<F, S, M>
where
    F: Framebuffers,
    S: SceneRenderer<F>,
    M: MirrorRenderer<F>,
{
    pub fn new(
        framebuffers: F,
        scene: S,
        mirror_renderer: M,
        mirrors: Vec<MirrorSurface>,
        settings: &RenderSettings,
        output: OutputWriter,
    ) -> Self {
        let resolution = framebuffers.resolution();
        let look_at = &settings.look_at;
        let camera = CameraPoseController::look_at(
            DVec3::from_array(look_at.eye),
            DVec3::from_array(look_at.target),
            DVec3::from_array(look_at.up),
        );

        let phase = if settings.frame_count == 0 {
            FramePhase::Done
        } else {
            FramePhase::LeftPass
        };

        Self {
            framebuffers,
            scene,
            mirror_renderer,
            mirrors,
            camera,
            projection: projection_rdf(resolution, &settings.intrinsics),
            baseline: RigidStep::new(settings.baseline_matrix()),
            trajectory_step: RigidStep::new(settings.trajectory_step_matrix()),
            output,
            frame_count: settings.frame_count,
            render_depth: settings.render_depth,
            depth_scale: settings.depth_scale,
            color: RgbImage::new(resolution.width, resolution.height),
            depth: DepthImage::new(resolution.width, resolution.height),
            depth16: Depth16Image::new(resolution.width, resolution.height),
            frame: 0,
            phase,
        }
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn frame_index(&self) -> usize {
        self.frame
    }

    pub fn framebuffers(&self) -> &F {
        &self.framebuffers
    }

    /// Runs every remaining phase.
    pub fn run(&mut self) -> Result<(), RenderError> {
        while self.phase != FramePhase::Done {
            self.step()?;
        }
        log::info!(
            "Done: rendered {} frames into {:?}",
            self.frame_count,
            self.output.dir()
        );
        Ok(())
    }

    /// Executes the current phase and returns the one that follows.
    ///
    /// On error the phase is left unchanged.
    pub fn step(&mut self) -> Result<FramePhase, RenderError> {
        let next = match self.phase {
            FramePhase::LeftPass => {
                log::info!("Rendering frame {}/{}", self.frame + 1, self.frame_count);
                self.color_pass()?;
                FramePhase::MirrorsLeft
            }
            FramePhase::MirrorsLeft => {
                self.composite_mirrors()?;
                FramePhase::SaveLeft
            }
            FramePhase::SaveLeft => {
                self.save_color(Eye::Left)?;
                FramePhase::ShiftToRight
            }
            FramePhase::ShiftToRight => {
                self.camera.apply_right(&self.baseline);
                FramePhase::RightPass
            }
            FramePhase::RightPass => {
                self.color_pass()?;
                FramePhase::MirrorsRight
            }
            FramePhase::MirrorsRight => {
                self.composite_mirrors()?;
                FramePhase::SaveRight
            }
            FramePhase::SaveRight => {
                self.save_color(Eye::Right)?;
                FramePhase::RestoreToLeft
            }
            FramePhase::RestoreToLeft => {
                self.camera.undo_right(&self.baseline);
                if self.render_depth {
                    FramePhase::DepthPass
                } else {
                    FramePhase::AdvanceTrajectory
                }
            }
            FramePhase::DepthPass => {
                self.depth_pass()?;
                FramePhase::SaveDepth
            }
            FramePhase::SaveDepth => {
                self.save_depth()?;
                FramePhase::AdvanceTrajectory
            }
            FramePhase::AdvanceTrajectory => {
                self.camera.advance_trajectory(&self.trajectory_step);
                self.frame += 1;
                if self.frame >= self.frame_count {
                    FramePhase::Done
                } else {
                    FramePhase::LeftPass
                }
            }
            FramePhase::Done => FramePhase::Done,
        };
        self.phase = next;
        Ok(next)
    }

    fn render_camera(&self) -> RenderCamera {
        RenderCamera::new(self.projection, self.camera.pose())
    }

    fn begin_pass(&mut self, target: Target) -> Result<(), RenderError> {
        self.framebuffers.bind(target)?;
        self.framebuffers
            .set_viewport(Viewport::full(self.framebuffers.resolution()));
        self.framebuffers.clear();
        self.framebuffers.set_cull_face(true);
        Ok(())
    }

    fn end_pass(&mut self) -> Result<(), RenderError> {
        self.framebuffers.set_cull_face(false);
        self.framebuffers.unbind()
    }

    fn color_pass(&mut self) -> Result<(), RenderError> {
        let camera = self.render_camera();
        self.begin_pass(Target::Color)?;
        self.scene.render_color(&mut self.framebuffers, &camera)?;
        self.end_pass()
    }

    fn depth_pass(&mut self) -> Result<(), RenderError> {
        let camera = self.render_camera();
        self.begin_pass(Target::Depth)?;
        self.scene
            .render_depth(&mut self.framebuffers, &camera, self.depth_scale)?;
        self.end_pass()
    }

    fn composite_mirrors(&mut self) -> Result<(), RenderError> {
        let camera = self.render_camera();
        MirrorCompositor::new(&self.mirrors).composite(
            &mut self.framebuffers,
            &mut self.scene,
            &mut self.mirror_renderer,
            &camera,
        )
    }

    fn save_color(&mut self, eye: Eye) -> Result<(), RenderError> {
        self.framebuffers.download_color(&mut self.color)?;
        self.output.write_color(self.frame, eye, &self.color)?;
        Ok(())
    }

    fn save_depth(&mut self) -> Result<(), RenderError> {
        self.framebuffers.download_depth(&mut self.depth)?;
        quantize_depth_image(&self.depth, &mut self.depth16);
        self.output.write_depth(self.frame, &self.depth16)?;
        Ok(())
    }
}
