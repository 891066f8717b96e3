// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the pill detection model

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Square input size of the YOLO detection model
pub const DETECTION_INPUT_SIZE: u32 = 640;

/// Letterbox padding value (YOLO convention)
pub const PAD_VALUE: u8 = 114;

/// Preprocess an image for pill detection
///
/// Steps:
/// 1. Resize with aspect ratio preservation to `DETECTION_INPUT_SIZE`
/// 2. Pad to square with gray (114) background, image centered
/// 3. Scale pixels to [0, 1] (no mean/std normalization)
/// 4. Convert to NCHW tensor format [1, 3, H, W]
pub fn preprocess_for_detection(image: &DynamicImage) -> Array4<f32> {
    let size = DETECTION_INPUT_SIZE as usize;
    let letterboxed = letterbox(image, DETECTION_INPUT_SIZE);
    let rgb = letterboxed.to_rgb8();

    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    tensor
}

/// Resize image with aspect ratio preservation and center padding
pub fn letterbox(image: &DynamicImage, target_size: u32) -> DynamicImage {
    let pad = Rgb([PAD_VALUE, PAD_VALUE, PAD_VALUE]);
    let info = PreprocessInfo::new(image, target_size);

    if info.original_width == 0 || info.original_height == 0 {
        return DynamicImage::ImageRgb8(RgbImage::from_pixel(target_size, target_size, pad));
    }

    let (new_w, new_h) = info.scaled_dimensions();
    let resized = image
        .resize_exact(new_w, new_h, image::imageops::FilterType::Triangle)
        .to_rgb8();

    let mut output = RgbImage::from_pixel(target_size, target_size, pad);
    image::imageops::replace(
        &mut output,
        &resized,
        info.offset_x as i64,
        info.offset_y as i64,
    );

    DynamicImage::ImageRgb8(output)
}

/// Scale factor and offsets used during letterboxing.
/// Maps detection results back to original coordinates.
#[derive(Debug, Clone, Copy)]
pub struct PreprocessInfo {
    /// Scale factor applied
    pub scale: f32,
    /// X offset from padding
    pub offset_x: u32,
    /// Y offset from padding
    pub offset_y: u32,
    /// Original image width
    pub original_width: u32,
    /// Original image height
    pub original_height: u32,
}

impl PreprocessInfo {
    /// Calculate preprocessing info for an image
    pub fn new(image: &DynamicImage, target_size: u32) -> Self {
        let (orig_w, orig_h) = image.dimensions();

        if orig_w == 0 || orig_h == 0 {
            return Self {
                scale: 1.0,
                offset_x: 0,
                offset_y: 0,
                original_width: orig_w,
                original_height: orig_h,
            };
        }

        let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
        let new_w = ((orig_w as f32 * scale).round() as u32).clamp(1, target_size);
        let new_h = ((orig_h as f32 * scale).round() as u32).clamp(1, target_size);

        Self {
            scale,
            offset_x: (target_size - new_w) / 2,
            offset_y: (target_size - new_h) / 2,
            original_width: orig_w,
            original_height: orig_h,
        }
    }

    fn scaled_dimensions(&self) -> (u32, u32) {
        let w = (self.original_width as f32 * self.scale).round() as u32;
        let h = (self.original_height as f32 * self.scale).round() as u32;
        (w.max(1), h.max(1))
    }

    /// Map a coordinate from preprocessed space back to original image space
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.offset_x as f32) / self.scale;
        let orig_y = (y - self.offset_y as f32) / self.scale;
        (orig_x, orig_y)
    }
}
