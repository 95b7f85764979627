use serde::Serialize;
use std::fmt;
use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{BackendError, BridgeError, Result};

/// Native bitmap encodings the platform clipboards exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    /// Windows device-independent bitmap, as a complete `.bmp` file.
    Bmp,
    /// `image/png` as offered on Wayland.
    Png,
}

impl ImageEncoding {
    fn format(self) -> ImageFormat {
        match self {
            ImageEncoding::Bmp => ImageFormat::Bmp,
            ImageEncoding::Png => ImageFormat::Png,
        }
    }
}

/// Raw RGBA8 pixel buffer, row-major, top row first.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Bitmap {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 {
            return Err(BridgeError::InvalidArgument(format!(
                "bitmap dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        if pixels.len() != expected {
            return Err(BridgeError::InvalidArgument(format!(
                "bitmap of {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Decode a native bitmap into raw pixels.
    pub fn decode(bytes: &[u8], encoding: ImageEncoding) -> std::result::Result<Self, BackendError> {
        let decoded = image::load_from_memory_with_format(bytes, encoding.format())?.to_rgba8();
        let (width, height) = decoded.dimensions();
        Ok(Self { width, height, pixels: decoded.into_raw() })
    }

    /// Encode raw pixels into a native bitmap.
    pub fn encode(&self, encoding: ImageEncoding) -> std::result::Result<Vec<u8>, BackendError> {
        let buffer = RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| BackendError::Image("pixel buffer does not match dimensions".to_string()))?;
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(buffer).write_to(&mut out, encoding.format())?;
        Ok(out.into_inner())
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}
