//! Image loading for body and backdrop textures.

use std::path::{Path, PathBuf};

/// Errors raised while loading an image from disk.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Decoded pixels, tightly packed, row-major from the top-left corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

/// Load an image file and convert it to RGBA8.
pub fn load_image(path: &Path) -> Result<PixelBuffer, AssetError> {
    if !path.is_file() {
        return Err(AssetError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let img = image::open(path)
        .map_err(|source| AssetError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .to_rgba8();
    let (width, height) = img.dimensions();
    log::debug!("Loaded {} ({width}x{height})", path.display());
    Ok(PixelBuffer {
        width,
        height,
        channels: 4,
        data: img.into_raw(),
    })
}

/// Copy `pixels` with alpha replaced by Rec. 601 luminance.
///
/// Cloud and ring maps ship without an alpha channel; brightness stands in
/// for coverage. Inputs with fewer than three channels are treated as grey.
pub fn luminance_to_alpha(pixels: &PixelBuffer) -> PixelBuffer {
    let channels = pixels.channels.max(1) as usize;
    let mut data = Vec::with_capacity(pixels.width as usize * pixels.height as usize * 4);
    for px in pixels.data.chunks_exact(channels) {
        let (r, g, b) = if channels >= 3 {
            (px[0], px[1], px[2])
        } else {
            (px[0], px[0], px[0])
        };
        let lum = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        data.extend_from_slice(&[r, g, b, lum.round().clamp(0.0, 255.0) as u8]);
    }
    PixelBuffer {
        width: pixels.width,
        height: pixels.height,
        channels: 4,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.png");
        match load_image(&path) {
            Err(AssetError::NotFound { path: p }) => assert_eq!(p, path),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_corrupt_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(load_image(&path), Err(AssetError::Decode { .. })));
    }

    #[test]
    fn test_rgb_png_loads_as_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        let mut img = image::RgbImage::new(3, 2);
        img.put_pixel(0, 0, image::Rgb([10, 20, 30]));
        img.save(&path).unwrap();

        let pixels = load_image(&path).unwrap();
        assert_eq!((pixels.width, pixels.height, pixels.channels), (3, 2, 4));
        assert_eq!(pixels.data.len(), 3 * 2 * 4);
        assert_eq!(&pixels.data[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_luminance_to_alpha() {
        let pixels = PixelBuffer {
            width: 3,
            height: 1,
            channels: 4,
            data: vec![255, 255, 255, 7, 0, 0, 0, 200, 255, 0, 0, 255],
        };
        let out = luminance_to_alpha(&pixels);
        assert_eq!(out.data[3], 255);
        assert_eq!(out.data[7], 0);
        assert_eq!(out.data[11], 76);
        assert_eq!(&out.data[8..11], &[255, 0, 0]);
    }

    #[test]
    fn test_luminance_to_alpha_expands_rgb() {
        let pixels = PixelBuffer {
            width: 1,
            height: 1,
            channels: 3,
            data: vec![0, 255, 0],
        };
        let out = luminance_to_alpha(&pixels);
        assert_eq!(out.channels, 4);
        assert_eq!(out.data, vec![0, 255, 0, 150]);
    }
}
