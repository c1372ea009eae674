use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::error::RenderError;
use crate::pipeline::quantize::Depth16Image;

/// Color frames are training imagery; keep them as close to lossless as JPEG gets.
const JPEG_QUALITY: u8 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eye::Left => f.write_str("left"),
            Eye::Right => f.write_str("right"),
        }
    }
}

/// Names and encodes the per-frame output files.
#[derive(Clone, Debug)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    /// Creates the output directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, RenderError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| RenderError::io(&dir, e))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn color_path(&self, index: usize, eye: Eye) -> PathBuf {
        self.dir.join(format!("frame{index:06}_{eye}.jpg"))
    }

    pub fn depth_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("depth{index:06}.png"))
    }

    pub fn write_color(
        &self,
        index: usize,
        eye: Eye,
        image: &RgbImage,
    ) -> Result<PathBuf, RenderError> {
        let path = self.color_path(index, eye);
        let file = File::create(&path).map_err(|e| RenderError::io(&path, e))?;
        image.write_with_encoder(JpegEncoder::new_with_quality(
            BufWriter::new(file),
            JPEG_QUALITY,
        ))?;
        log::debug!("Wrote {:?}", path);
        Ok(path)
    }

    pub fn write_depth(&self, index: usize, image: &Depth16Image) -> Result<PathBuf, RenderError> {
        let path = self.depth_path(index);
        image.save_with_format(&path, image::ImageFormat::Png)?;
        log::debug!("Wrote {:?}", path);
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_zero_padded_to_six_digits() {
        let writer = OutputWriter {
            dir: PathBuf::from("out"),
        };
        assert_eq!(
            writer.color_path(7, Eye::Left),
            Path::new("out/frame000007_left.jpg")
        );
        assert_eq!(
            writer.color_path(123456, Eye::Right),
            Path::new("out/frame123456_right.jpg")
        );
        assert_eq!(writer.depth_path(42), Path::new("out/depth000042.png"));
    }

    #[test]
    fn writes_decodable_images() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path().join("nested")).unwrap();

        let color = RgbImage::from_pixel(8, 4, image::Rgb([128, 128, 128]));
        let path = writer.write_color(0, Eye::Left, &color).unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
        assert_eq!((decoded.width(), decoded.height()), (8, 4));

        let depth = Depth16Image::from_pixel(8, 4, image::Luma([13107]));
        let path = writer.write_depth(0, &depth).unwrap();
        let decoded = image::open(&path).unwrap().into_luma16();
        assert!(decoded.pixels().all(|p| p.0[0] == 13107));
    }

    #[test]
    fn color_frames_keep_fine_detail() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path()).unwrap();

        // A one-pixel checkerboard is the pattern default-quality JPEG smears most.
        let color = RgbImage::from_fn(16, 16, |x, y| {
            let v = if (x + y) % 2 == 0 { 40 } else { 200 };
            image::Rgb([v, v, v])
        });
        let path = writer.write_color(3, Eye::Right, &color).unwrap();
        let decoded = image::open(&path).unwrap().into_rgb8();

        for (written, read) in color.pixels().zip(decoded.pixels()) {
            for (a, b) in written.0.iter().zip(read.0) {
                assert!(a.abs_diff(b) <= 8, "{written:?} decoded as {read:?}");
            }
        }
    }
}
