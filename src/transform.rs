use image::{imageops, imageops::FilterType, Rgb32FImage, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;

use crate::config::{DEFAULT_INPUT_SIZE, PATCH_SIZE};

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Fixed preprocessing applied to every frame before inference.
///
/// Resizes so that both sides reach at least `lower_bound` while keeping the
/// aspect ratio, snaps each side to a multiple of `multiple_of`, normalizes
/// with per-channel mean/std, and lays the result out as `[1, 3, H, W]`.
#[derive(Debug, Clone)]
pub struct DepthTransform {
    lower_bound: u32,
    multiple_of: u32,
    mean: [f32; 3],
    std: [f32; 3],
    filter: FilterType,
}

impl Default for DepthTransform {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}

impl DepthTransform {
    pub const fn new(lower_bound: u32) -> Self {
        Self {
            lower_bound,
            multiple_of: PATCH_SIZE,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
            filter: FilterType::Lanczos3,
        }
    }

    pub const fn lower_bound(&self) -> u32 {
        self.lower_bound
    }

    /// Model input size for a `width` x `height` frame.
    pub fn target_size(&self, width: u32, height: u32) -> (u32, u32) {
        let bound = f64::from(self.lower_bound);
        let scale_width = bound / f64::from(width.max(1));
        let scale_height = bound / f64::from(height.max(1));
        let scale = scale_width.max(scale_height);

        (
            self.constrain(scale * f64::from(width.max(1))),
            self.constrain(scale * f64::from(height.max(1))),
        )
    }

    fn constrain(&self, x: f64) -> u32 {
        let multiple = f64::from(self.multiple_of);
        let y = (x / multiple).round_ties_even() * multiple;
        let y = if y < f64::from(self.lower_bound) {
            (x / multiple).ceil() * multiple
        } else {
            y
        };
        y as u32
    }

    /// Scales 8-bit RGB samples into `[0, 1]`.
    pub fn to_unit_range(frame: &RgbImage) -> Rgb32FImage {
        Rgb32FImage::from_fn(frame.width(), frame.height(), |x, y| {
            let [r, g, b] = frame.get_pixel(x, y).0;
            image::Rgb([
                f32::from(r) / 255.0,
                f32::from(g) / 255.0,
                f32::from(b) / 255.0,
            ])
        })
    }

    pub fn apply(&self, image: &Rgb32FImage) -> Array4<f32> {
        let (width, height) = self.target_size(image.width(), image.height());
        let resized = imageops::resize(image, width, height, self.filter);

        let mut tensor = resized.as_ndarray3().insert_axis(Axis(0)).to_owned();
        for (channel, mut plane) in tensor.axis_iter_mut(Axis(1)).enumerate() {
            let (mean, std) = (self.mean[channel], self.std[channel]);
            plane.mapv_inplace(|v| (v - mean) / std);
        }
        tensor.as_standard_layout().into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_target_size_is_patch_multiple_for_any_frame() {
        let transform = DepthTransform::default();
        for width in (1..2000).step_by(37) {
            for height in (1..1500).step_by(41) {
                let (w, h) = transform.target_size(width, height);
                assert_eq!(w % PATCH_SIZE, 0, "width {} for {}x{}", w, width, height);
                assert_eq!(h % PATCH_SIZE, 0, "height {} for {}x{}", h, width, height);
                assert!(w >= DEFAULT_INPUT_SIZE && h >= DEFAULT_INPUT_SIZE);
            }
        }
    }

    #[test]
    fn test_target_size_keeps_aspect_on_landscape() {
        let transform = DepthTransform::default();
        // 640x480 scales by 532/480; width 709.33 rounds to 714.
        assert_eq!(transform.target_size(640, 480), (714, 532));
        assert_eq!(transform.target_size(1920, 1080), (952, 532));
        assert_eq!(transform.target_size(532, 532), (532, 532));
    }

    #[test]
    fn test_target_size_is_idempotent() {
        let transform = DepthTransform::default();
        let (w, h) = transform.target_size(1280, 720);
        assert_eq!(transform.target_size(w, h), (w, h));
    }

    #[test]
    fn test_to_unit_range() {
        let frame = RgbImage::from_pixel(2, 2, Rgb([0, 255, 51]));
        let unit = DepthTransform::to_unit_range(&frame);
        assert_eq!(unit.get_pixel(1, 1).0, [0.0, 1.0, 0.2]);
    }

    #[test]
    fn test_apply_layout_and_normalization() {
        let transform = DepthTransform::new(28);
        let image = Rgb32FImage::from_pixel(40, 20, Rgb([0.485, 0.456, 1.0]));
        let tensor = transform.apply(&image);

        assert_eq!(tensor.shape(), &[1, 3, 28, 56]);
        assert!(tensor.is_standard_layout());
        let center = tensor.slice(s![0, .., 14, 28]).to_vec();
        assert!(center[0].abs() < 1e-3);
        assert!(center[1].abs() < 1e-3);
        assert!((center[2] - (1.0 - 0.406) / 0.225).abs() < 1e-3);
    }
}
