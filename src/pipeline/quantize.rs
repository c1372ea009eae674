use image::{ImageBuffer, Luma};

use crate::pipeline::DepthImage;

pub type Depth16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Rounds a scaled depth value to the nearest 16-bit step, halves rounding up.
///
/// Out of range values saturate: negatives and NaN become 0, anything at or
/// above 65535 becomes 65535. The half is added in f64 so the sum is exact.
pub fn quantize_depth(value: f32) -> u16 {
    (f64::from(value) + 0.5) as u16
}

pub fn quantize_depth_image(depth: &DepthImage, out: &mut Depth16Image) {
    for (dst, src) in out.pixels_mut().zip(depth.pixels()) {
        dst.0[0] = quantize_depth(src.0[0]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_nearest() {
        assert_eq!(quantize_depth(0.0), 0);
        assert_eq!(quantize_depth(0.49), 0);
        assert_eq!(quantize_depth(0.5), 1);
        assert_eq!(quantize_depth(13106.9), 13107);
        assert_eq!(quantize_depth(2.0 * 6553.5), 13107);
    }

    /// Every integer, quarter step and the half steps with their f32 neighbours,
    /// in ascending order.
    fn half_step_samples() -> Vec<f32> {
        let mut samples = Vec::new();
        for k in 0..65535u32 {
            let half = k as f32 + 0.5;
            let bits = half.to_bits();
            samples.extend([
                k as f32,
                k as f32 + 0.25,
                f32::from_bits(bits - 1),
                half,
                f32::from_bits(bits + 1),
            ]);
        }
        samples.retain(|&d| d < 65534.5);
        samples
    }

    #[test]
    fn matches_floor_of_half_up_across_the_range() {
        let samples = half_step_samples();
        assert!(samples.contains(&0.49999997));
        for &d in &samples {
            assert_eq!(
                f64::from(quantize_depth(d)),
                (f64::from(d) + 0.5).floor(),
                "depth {d}"
            );
        }
    }

    #[test]
    fn never_decreases() {
        let samples = half_step_samples();
        for pair in samples.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(quantize_depth(pair[0]) <= quantize_depth(pair[1]), "{pair:?}");
        }
    }

    #[test]
    fn saturates_out_of_range() {
        assert_eq!(quantize_depth(-3.0), 0);
        assert_eq!(quantize_depth(f32::NAN), 0);
        assert_eq!(quantize_depth(65534.6), 65535);
        assert_eq!(quantize_depth(1.0e9), 65535);
        assert_eq!(quantize_depth(f32::INFINITY), 65535);
    }

    #[test]
    fn converts_whole_images() {
        let depth = DepthImage::from_raw(2, 1, vec![1.2, 70000.0]).unwrap();
        let mut out = Depth16Image::new(2, 1);
        quantize_depth_image(&depth, &mut out);
        assert_eq!(out.as_raw(), &vec![1, 65535]);
    }
}
