use image::{imageops, imageops::FilterType, GrayImage, ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;
use ndarray::prelude::*;
use num_traits::ToPrimitive;

/// 5-tap Gaussian weights; what OpenCV resolves a 5x5 kernel with sigma 0 to.
pub const GAUSSIAN_KERNEL_5: [f32; 5] = [0.0625, 0.25, 0.375, 0.25, 0.0625];

/// Per-frame min-max rescale of a depth map into 8-bit grayscale.
///
/// Values are truncated, not rounded. A frame without range (all samples
/// equal, or no finite samples) has no meaningful scale and comes out all
/// zero. NaN samples map to zero.
pub fn normalize_depth(depth: &Array2<f32>) -> GrayImage {
    let (height, width) = depth.dim();
    let (min, max) = depth
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    let pixels = if range.is_finite() && range > 0.0 {
        depth
            .iter()
            .map(|&v| {
                ((v - min) / range * 255.0)
                    .clamp(0.0, 255.0)
                    .to_u8()
                    .unwrap_or(0)
            })
            .collect()
    } else {
        vec![0; height * width]
    };

    GrayImage::from_raw(width as u32, height as u32, pixels)
        .unwrap_or_else(|| GrayImage::new(width as u32, height as u32))
}

/// 5x5 Gaussian blur. Both passes run in `f32` and the result is rounded once,
/// so values match OpenCV's `GaussianBlur` away from the borders.
pub fn smooth(depth: &GrayImage) -> GrayImage {
    let samples: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(depth.width(), depth.height(), |x, y| {
            Luma([f32::from(depth.get_pixel(x, y)[0])])
        });
    let blurred = separable_filter_equal(&samples, &GAUSSIAN_KERNEL_5);

    GrayImage::from_fn(depth.width(), depth.height(), |x, y| {
        let value = blurred.get_pixel(x, y)[0].round().clamp(0.0, 255.0);
        Luma([value.to_u8().unwrap_or(0)])
    })
}

pub fn resize_to(depth: &GrayImage, width: u32, height: u32) -> GrayImage {
    if depth.dimensions() == (width, height) {
        return depth.clone();
    }
    imageops::resize(depth, width, height, FilterType::Lanczos3)
}
