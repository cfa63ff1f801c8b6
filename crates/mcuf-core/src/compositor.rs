//! Turning the engine's grayscale preview into displayable RGBA

use crate::error::{ConverterError, Result};

/// Four bytes per pixel: intensity, intensity, intensity, opaque
pub const CHANNELS: usize = 4;

/// RGBA pixels ready for a display surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewPixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PreviewPixelBuffer {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// The RGBA quadruple at `(x, y)`, if inside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let px = self.data.get(i..i + CHANNELS)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Expands single-channel bitmaps into [`PreviewPixelBuffer`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct PreviewCompositor;

impl PreviewCompositor {
    pub fn new() -> Self {
        Self
    }

    /// Build a fresh RGBA buffer from `grayscale`, row-major `width × height`
    pub fn compose(&self, grayscale: &[u8], width: u32, height: u32) -> Result<PreviewPixelBuffer> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or(ConverterError::SizeMismatch {
                expected: usize::MAX,
                actual: grayscale.len(),
            })?;
        if grayscale.len() != expected {
            return Err(ConverterError::SizeMismatch {
                expected,
                actual: grayscale.len(),
            });
        }

        let mut data = vec![0u8; expected * CHANNELS];
        for y in 0..height as usize {
            for x in 0..width as usize {
                let src = y * width as usize + x;
                let dst = src * CHANNELS;
                let g = grayscale[src];
                data[dst] = g;
                data[dst + 1] = g;
                data[dst + 2] = g;
                data[dst + 3] = 255;
            }
        }

        Ok(PreviewPixelBuffer {
            width,
            height,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_black() {
        let out = PreviewCompositor::new().compose(&[0; 6], 3, 2).unwrap();
        assert_eq!(out.data().len(), 24);
        assert!(out.data().chunks(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn test_all_white() {
        let out = PreviewCompositor::new().compose(&[255; 6], 2, 3).unwrap();
        assert!(out.data().chunks(4).all(|px| px == [255, 255, 255, 255]));
    }

    #[test]
    fn test_row_major_placement() {
        let gray = [10, 20, 30, 40, 50, 60];
        let out = PreviewCompositor::new().compose(&gray, 3, 2).unwrap();

        assert_eq!(out.pixel(0, 0), Some([10, 10, 10, 255]));
        assert_eq!(out.pixel(2, 0), Some([30, 30, 30, 255]));
        assert_eq!(out.pixel(0, 1), Some([40, 40, 40, 255]));
        assert_eq!(out.pixel(2, 1), Some([60, 60, 60, 255]));
        assert_eq!(out.pixel(3, 0), None);
    }

    #[test]
    fn test_undersized_input_rejected() {
        let result = PreviewCompositor::new().compose(&[0; 5], 3, 2);
        match result {
            Err(ConverterError::SizeMismatch { expected, actual }) => {
                assert_eq!(expected, 6);
                assert_eq!(actual, 5);
            },
            other => unreachable!("expected size mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_input_rejected() {
        let result = PreviewCompositor::new().compose(&[0; 7], 3, 2);
        assert!(matches!(
            result,
            Err(ConverterError::SizeMismatch {
                expected: 6,
                actual: 7
            })
        ));
    }

    #[test]
    fn test_empty_image() {
        let out = PreviewCompositor::new().compose(&[], 0, 5).unwrap();
        assert!(out.data().is_empty());
        assert_eq!(out.height(), 5);
    }
}
