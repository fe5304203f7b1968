//! BMP load/save adapter, isolated from the rest of the pipeline so the
//! `image` crate is the only place this codec touches a third-party image
//! format. Everything past this module works in terms of [`RawImage`].

use image::{DynamicImage, GenericImageView};

use crate::error::{CodecError, Result};
use crate::pipeline::RawImage;

/// Loads a BMP file into planar form: one plane for grayscale, three
/// (R, G, B) for color.
pub fn load_rgb_bmp(path: &str) -> Result<RawImage> {
    let img = image::open(path).map_err(CodecError::ImageIo)?;
    Ok(dynamic_image_to_raw(&img))
}

/// Saves a [`RawImage`] as a BMP file, grayscale if it has one plane, RGB if three.
pub fn save_rgb_bmp(image: &RawImage, path: &str) -> Result<()> {
    let dynamic = raw_to_dynamic_image(image)?;
    dynamic.save_with_format(path, image::ImageFormat::Bmp).map_err(CodecError::ImageIo)
}

fn dynamic_image_to_raw(img: &DynamicImage) -> RawImage {
    let (width, height) = img.dimensions();
    let (width, height) = (width as usize, height as usize);

    match img {
        DynamicImage::ImageLuma8(buf) => RawImage { height, width, planes: vec![buf.as_raw().clone()] },
        _ => {
            let rgb = img.to_rgb8();
            let mut planes = vec![vec![0u8; width * height]; 3];
            for (i, px) in rgb.pixels().enumerate() {
                for c in 0..3 {
                    planes[c][i] = px.0[c];
                }
            }
            RawImage { height, width, planes }
        }
    }
}

fn raw_to_dynamic_image(image: &RawImage) -> Result<DynamicImage> {
    match image.planes.len() {
        1 => {
            let buf = image::GrayImage::from_raw(image.width as u32, image.height as u32, image.planes[0].clone())
                .ok_or_else(|| CodecError::FormatReject("plane length does not match image dimensions".into()))?;
            Ok(DynamicImage::ImageLuma8(buf))
        }
        3 => {
            let mut data = vec![0u8; image.width * image.height * 3];
            for i in 0..image.width * image.height {
                for c in 0..3 {
                    data[i * 3 + c] = image.planes[c][i];
                }
            }
            let buf = image::RgbImage::from_raw(image.width as u32, image.height as u32, data)
                .ok_or_else(|| CodecError::FormatReject("plane length does not match image dimensions".into()))?;
            Ok(DynamicImage::ImageRgb8(buf))
        }
        n => Err(CodecError::ParameterOutOfRange(format!("channel count {n}, expected 1 or 3"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    #[test]
    fn save_then_load_grayscale_roundtrip() {
        let plane: Vec<u8> = (0..64).map(|i| (i * 4) as u8).collect();
        let image = RawImage { height: 8, width: 8, planes: vec![plane] };

        let path = temp_dir().join("ccsds122_test_gray.bmp");
        let path_str = path.to_str().unwrap();
        save_rgb_bmp(&image, path_str).unwrap();
        let loaded = load_rgb_bmp(path_str).unwrap();

        assert_eq!(loaded.height, image.height);
        assert_eq!(loaded.width, image.width);
        assert_eq!(loaded.planes, image.planes);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn save_then_load_rgb_roundtrip() {
        let planes: Vec<Vec<u8>> = (0..3)
            .map(|c| (0..64).map(|i| ((i * 4 + c * 11) % 256) as u8).collect())
            .collect();
        let image = RawImage { height: 8, width: 8, planes };

        let path = temp_dir().join("ccsds122_test_rgb.bmp");
        let path_str = path.to_str().unwrap();
        save_rgb_bmp(&image, path_str).unwrap();
        let loaded = load_rgb_bmp(path_str).unwrap();

        assert_eq!(loaded.planes, image.planes);
        let _ = std::fs::remove_file(path);
    }
}
