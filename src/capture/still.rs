//! PNG snapshots of the styled surface.

use std::io::Cursor;
use std::time::Instant;

use image::{ImageFormat, RgbaImage};

use super::errors::EncodeError;
use crate::styled::Surface;

/// One PNG-encoded frame collected for a loop.
#[derive(Debug, Clone)]
pub struct StillFrame {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub captured_at: Instant,
}

/// Encode a surface as PNG.
pub fn encode_png(surface: &Surface) -> Result<Vec<u8>, EncodeError> {
    let image = RgbaImage::from_raw(surface.width, surface.height, surface.pixels.clone())
        .ok_or(EncodeError::FrameSize {
            expected: (surface.width as usize) * (surface.height as usize) * 4,
            actual: surface.pixels.len(),
        })?;
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| EncodeError::Png(e.to_string()))?;
    Ok(bytes)
}

/// Snapshot a surface into a [`StillFrame`].
pub fn snapshot(surface: &Surface, captured_at: Instant) -> Result<StillFrame, EncodeError> {
    Ok(StillFrame {
        png: encode_png(surface)?,
        width: surface.width,
        height: surface.height,
        captured_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_encode_png_has_signature() {
        let png = encode_png(&Surface::new(4, 3)).unwrap();
        assert_eq!(&png[..8], &PNG_MAGIC);
    }

    #[test]
    fn test_encode_png_rejects_short_buffer() {
        let mut surface = Surface::new(4, 3);
        surface.pixels.truncate(8);
        assert!(matches!(
            encode_png(&surface),
            Err(EncodeError::FrameSize { expected: 48, actual: 8 })
        ));
    }

    #[test]
    fn test_png_decodes_back_to_same_size() {
        let png = encode_png(&Surface::new(7, 5)).unwrap();
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (7, 5));
    }
}
