use crate::error::InferenceError;
use image::{imageops::FilterType, ColorType, DynamicImage};
use ndarray::Array4;

/// Side length of the square canvas the classifier was trained on.
pub const IMAGE_SIZE: u32 = 200;

/// Decodes an uploaded image and prepares it for the classifier.
/// Returns a tensor of shape [1, 200, 200, C] with values in [0, 1].
pub fn process_bytes(buffer: &[u8]) -> Result<Array4<f32>, InferenceError> {
    // 1. Load image from bytes (guess format)
    let img = image::load_from_memory(buffer).map_err(InferenceError::ImageError)?;

    to_tensor(&img)
}

/// Resizes to 200x200 without preserving the aspect ratio, then scales pixel
/// values by 1/255. The decoded channel count is kept as-is (grayscale stays
/// one channel); deeper bit depths are reduced to 8 bits first.
pub fn to_tensor(img: &DynamicImage) -> Result<Array4<f32>, InferenceError> {
    // Bicubic, the default resampling of the tooling the model was trained with
    let resized = img.resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::CatmullRom);

    let (channels, raw) = match resized.color() {
        ColorType::L8 | ColorType::L16 => (1, resized.to_luma8().into_raw()),
        ColorType::La8 | ColorType::La16 => (2, resized.to_luma_alpha8().into_raw()),
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => {
            (4, resized.to_rgba8().into_raw())
        }
        _ => (3, resized.to_rgb8().into_raw()),
    };

    let data: Vec<f32> = raw.into_iter().map(|v| v as f32 / 255.0).collect();

    // [H, W, C] pixels plus a leading batch axis
    let side = IMAGE_SIZE as usize;
    let array = Array4::from_shape_vec((1, side, side, channels), data)?;

    Ok(array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, RgbImage, RgbaImage};
    use std::io::Cursor;

    fn encode_png(img: DynamicImage) -> Vec<u8> {
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_process_bytes_shape() {
        let buffer = encode_png(DynamicImage::ImageRgb8(RgbImage::new(10, 10)));

        let tensor = process_bytes(&buffer).unwrap();
        assert_eq!(tensor.shape(), &[1, 200, 200, 3]);
    }

    #[test]
    fn test_aspect_ratio_is_not_preserved() {
        let buffer = encode_png(DynamicImage::ImageRgb8(RgbImage::new(640, 48)));

        let tensor = process_bytes(&buffer).unwrap();
        assert_eq!(tensor.shape(), &[1, 200, 200, 3]);
    }

    #[test]
    fn test_values_in_unit_range() {
        let mut img = RgbImage::new(37, 53);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = image::Rgb([(x * 7) as u8, (y * 5) as u8, ((x + y) * 3) as u8]);
        }
        let tensor = process_bytes(&encode_png(DynamicImage::ImageRgb8(img))).unwrap();

        assert!(tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_white_pixels_normalize_to_one() {
        let img = RgbImage::from_pixel(10, 10, image::Rgb([255, 255, 255]));
        let tensor = process_bytes(&encode_png(DynamicImage::ImageRgb8(img))).unwrap();

        assert_eq!(tensor[[0, 0, 0, 0]], 1.0);
        assert_eq!(tensor[[0, 199, 199, 2]], 1.0);
    }

    #[test]
    fn test_uniform_gray_value() {
        let img = RgbImage::from_pixel(10, 10, image::Rgb([128, 128, 128]));
        let tensor = process_bytes(&encode_png(DynamicImage::ImageRgb8(img))).unwrap();

        let expected = 128.0 / 255.0;
        assert!((tensor[[0, 100, 100, 1]] - expected).abs() < 0.001);
    }

    #[test]
    fn test_grayscale_keeps_single_channel() {
        let img = GrayImage::from_pixel(64, 64, image::Luma([51]));
        let tensor = process_bytes(&encode_png(DynamicImage::ImageLuma8(img))).unwrap();

        assert_eq!(tensor.shape(), &[1, 200, 200, 1]);
        assert!((tensor[[0, 10, 10, 0]] - 0.2).abs() < 0.001);
    }

    #[test]
    fn test_rgba_keeps_alpha_channel() {
        let img = RgbaImage::from_pixel(20, 20, image::Rgba([0, 0, 0, 255]));
        let tensor = process_bytes(&encode_png(DynamicImage::ImageRgba8(img))).unwrap();

        assert_eq!(tensor.shape(), &[1, 200, 200, 4]);
        assert_eq!(tensor[[0, 0, 0, 3]], 1.0);
    }

    #[test]
    fn test_process_bytes_error_handling() {
        let result = process_bytes(b"invalid image data");

        match result {
            Err(InferenceError::ImageError(_)) => {}
            _ => panic!("Expected ImageError"),
        }
    }
}
