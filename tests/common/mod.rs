//! CPU stand-ins for the GPU backend that record every call.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use glam::{DMat4, DVec4};
use image::{Rgb, RgbImage};
use stereo_synth::error::RenderError;
use stereo_synth::pipeline::{
    DepthImage, Framebuffers, MirrorRenderer, SceneRenderer, Target, Viewport, Winding,
};
use stereo_synth::scene::{MirrorSurface, RenderCamera};
use stereo_synth::settings::{RenderSettings, Resolution};

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Bind(Target),
    Unbind,
    Viewport(Viewport),
    Clear,
    CullFace(bool),
    FrontFace(Winding),
    ClipPlane(Option<DVec4>),
    SceneColor {
        target: Target,
        view: DMat4,
        cull: bool,
        front_face: Winding,
        clipped: bool,
    },
    SceneDepth {
        view: DMat4,
        scale: f32,
    },
    Capture(usize),
    MirrorDraw {
        mirror: usize,
        target: Option<Target>,
    },
    DownloadColor,
    DownloadDepth,
}

pub type EventLog = Rc<RefCell<Vec<Event>>>;

pub fn new_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

pub const RESOLUTION: Resolution = Resolution {
    width: 8,
    height: 6,
};

pub fn settings(frame_count: usize, render_depth: bool) -> RenderSettings {
    RenderSettings {
        resolution: RESOLUTION,
        frame_count,
        render_depth,
        ..RenderSettings::default()
    }
}

/// Deterministic color for a view matrix.
pub fn shade(view: &DMat4) -> Rgb<u8> {
    let hash = view
        .to_cols_array()
        .iter()
        .fold(0xcbf29ce484222325u64, |h, v| {
            (h ^ v.to_bits()).wrapping_mul(0x100000001b3)
        });
    let bytes = hash.to_le_bytes();
    Rgb([bytes[0], bytes[1], bytes[2]])
}

pub struct CpuFramebuffers {
    log: EventLog,
    bound: Option<Target>,
    viewport: Option<Viewport>,
    cull_face: bool,
    front_face: Winding,
    clip_plane: Option<DVec4>,
    pub color: RgbImage,
    pub depth: DepthImage,
    pub capture: RgbImage,
}

impl CpuFramebuffers {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            bound: None,
            viewport: None,
            cull_face: false,
            front_face: Winding::default(),
            clip_plane: None,
            color: RgbImage::new(RESOLUTION.width, RESOLUTION.height),
            depth: DepthImage::new(RESOLUTION.width, RESOLUTION.height),
            capture: RgbImage::new(RESOLUTION.width, RESOLUTION.height),
        }
    }

    fn record(&self, event: Event) {
        self.log.borrow_mut().push(event);
    }

    pub fn cull_face(&self) -> bool {
        self.cull_face
    }

    fn color_target_mut(&mut self) -> Option<&mut RgbImage> {
        match self.bound {
            Some(Target::Color) => Some(&mut self.color),
            Some(Target::Capture) => Some(&mut self.capture),
            _ => None,
        }
    }
}

impl Framebuffers for CpuFramebuffers {
    fn resolution(&self) -> Resolution {
        RESOLUTION
    }

    fn bind(&mut self, target: Target) -> Result<(), RenderError> {
        if let Some(bound) = self.bound {
            return Err(RenderError::Binding(format!("{bound:?} already bound")));
        }
        self.bound = Some(target);
        self.record(Event::Bind(target));
        Ok(())
    }

    fn unbind(&mut self) -> Result<(), RenderError> {
        if self.bound.take().is_none() {
            return Err(RenderError::Binding("nothing bound".into()));
        }
        self.viewport = None;
        self.record(Event::Unbind);
        Ok(())
    }

    fn bound(&self) -> Option<Target> {
        self.bound
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        self.record(Event::Viewport(viewport));
    }

    fn clear(&mut self) {
        match self.bound {
            Some(Target::Color) => self.color.pixels_mut().for_each(|p| *p = Rgb([0, 0, 0])),
            Some(Target::Capture) => self.capture.pixels_mut().for_each(|p| *p = Rgb([0, 0, 0])),
            Some(Target::Depth) => self.depth.pixels_mut().for_each(|p| p.0[0] = 0.0),
            None => {}
        }
        self.record(Event::Clear);
    }

    fn set_cull_face(&mut self, enabled: bool) {
        self.cull_face = enabled;
        self.record(Event::CullFace(enabled));
    }

    fn set_front_face(&mut self, winding: Winding) {
        self.front_face = winding;
        self.record(Event::FrontFace(winding));
    }

    fn front_face(&self) -> Winding {
        self.front_face
    }

    fn set_clip_plane(&mut self, plane: Option<DVec4>) {
        self.clip_plane = plane;
        self.record(Event::ClipPlane(plane));
    }

    fn clip_plane(&self) -> Option<DVec4> {
        self.clip_plane
    }

    fn download_color(&mut self, out: &mut RgbImage) -> Result<(), RenderError> {
        if self.bound.is_some() {
            return Err(RenderError::Binding("download while bound".into()));
        }
        out.copy_from_slice(&self.color);
        self.record(Event::DownloadColor);
        Ok(())
    }

    fn download_depth(&mut self, out: &mut DepthImage) -> Result<(), RenderError> {
        if self.bound.is_some() {
            return Err(RenderError::Binding("download while bound".into()));
        }
        out.copy_from_slice(&self.depth);
        self.record(Event::DownloadDepth);
        Ok(())
    }
}

/// Fills the bound target with a color derived from the view, or with a
/// depth derived from the camera position, leaving a one pixel border empty.
pub struct FakeScene {
    log: EventLog,
    /// Fails the n-th depth pass (zero based) when set.
    pub fail_depth_on_call: Option<usize>,
    depth_calls: usize,
}

impl FakeScene {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            fail_depth_on_call: None,
            depth_calls: 0,
        }
    }
}

pub fn fake_depth(view: &DMat4, scale: f32) -> f32 {
    (1.0 + view.w_axis.truncate().length() as f32) * scale
}

impl SceneRenderer<CpuFramebuffers> for FakeScene {
    fn render_color(
        &mut self,
        fb: &mut CpuFramebuffers,
        camera: &RenderCamera,
    ) -> Result<(), RenderError> {
        let target = fb
            .bound()
            .ok_or_else(|| RenderError::Binding("scene draw while unbound".into()))?;
        self.log.borrow_mut().push(Event::SceneColor {
            target,
            view: camera.view,
            cull: fb.cull_face(),
            front_face: fb.front_face(),
            clipped: fb.clip_plane().is_some(),
        });
        let color = shade(&camera.view);
        if let Some(image) = fb.color_target_mut() {
            let (w, h) = image.dimensions();
            for y in 1..h - 1 {
                for x in 1..w - 1 {
                    image.put_pixel(x, y, color);
                }
            }
        }
        Ok(())
    }

    fn render_depth(
        &mut self,
        fb: &mut CpuFramebuffers,
        camera: &RenderCamera,
        scale: f32,
    ) -> Result<(), RenderError> {
        let call = self.depth_calls;
        self.depth_calls += 1;
        if self.fail_depth_on_call == Some(call) {
            return Err(RenderError::Gpu("injected depth failure".into()));
        }
        if fb.bound() != Some(Target::Depth) {
            return Err(RenderError::Binding("depth draw without depth target".into()));
        }
        self.log.borrow_mut().push(Event::SceneDepth {
            view: camera.view,
            scale,
        });
        let value = fake_depth(&camera.view, scale);
        let (w, h) = fb.depth.dimensions();
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                fb.depth.put_pixel(x, y, image::Luma([value]));
            }
        }
        Ok(())
    }
}

/// Pixel rectangle `[x0, x1) x [y0, y1)` a fake mirror covers on screen.
#[derive(Clone, Copy, Debug)]
pub struct Rect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

pub struct FakeMirrors {
    log: EventLog,
    mirrors: Vec<MirrorSurface>,
    rects: Vec<Rect>,
}

impl FakeMirrors {
    pub fn new(log: EventLog, mirrors: Vec<MirrorSurface>, rects: Vec<Rect>) -> Self {
        Self {
            log,
            mirrors,
            rects,
        }
    }

    fn index_of(&self, mirror: &MirrorSurface) -> usize {
        self.mirrors
            .iter()
            .position(|m| m == mirror)
            .expect("mirror not registered with the fake renderer")
    }
}

/// Tint identifying which mirror wrote a pixel.
pub fn mirror_tint(index: usize) -> u8 {
    40 * (index as u8 + 1)
}

impl MirrorRenderer<CpuFramebuffers> for FakeMirrors {
    type Mask = usize;

    fn mask_resource(&self, index: usize) -> Option<usize> {
        (index < self.mirrors.len()).then_some(index)
    }

    fn capture_reflection<S: SceneRenderer<CpuFramebuffers>>(
        &mut self,
        fb: &mut CpuFramebuffers,
        mirror: &MirrorSurface,
        scene: &mut S,
        camera: &RenderCamera,
        front_face: Winding,
    ) -> Result<(), RenderError> {
        let index = self.index_of(mirror);
        self.log.borrow_mut().push(Event::Capture(index));

        fb.bind(Target::Capture)?;
        fb.set_viewport(Viewport::full(fb.resolution()));
        fb.clear();
        fb.set_cull_face(true);
        fb.set_front_face(front_face.flipped());
        fb.set_clip_plane(Some(mirror.clip_plane_facing(camera.eye())));
        scene.render_color(fb, &camera.with_world_transform(mirror.reflection()))?;
        fb.set_clip_plane(None);
        fb.set_front_face(front_face);
        fb.set_cull_face(false);
        fb.unbind()
    }

    fn render(
        &mut self,
        fb: &mut CpuFramebuffers,
        _mirror: &MirrorSurface,
        mask: usize,
        _camera: &RenderCamera,
    ) -> Result<(), RenderError> {
        self.log.borrow_mut().push(Event::MirrorDraw {
            mirror: mask,
            target: fb.bound(),
        });
        let rect = self.rects[mask];
        for y in rect.y0..rect.y1 {
            for x in rect.x0..rect.x1 {
                let mut reflected = *fb.capture.get_pixel(x, y);
                reflected.0[0] = mirror_tint(mask);
                fb.color.put_pixel(x, y, reflected);
            }
        }
        Ok(())
    }
}

/// Mirror in the plane `x = offset`, facing the default camera.
pub fn wall_mirror(offset: f64) -> MirrorSurface {
    MirrorSurface::new(
        [1.0, 0.0, 0.0, -offset],
        &[
            [offset, -0.5, 0.25],
            [offset, 0.5, 0.25],
            [offset, 0.5, 1.25],
            [offset, -0.5, 1.25],
        ],
        1.0,
    )
    .unwrap()
}

/// Sorted file names in `dir`.
pub fn file_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
