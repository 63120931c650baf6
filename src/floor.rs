//! Arena floor image used for sensor emulation.
//!
//! The floor is stored as tightly packed RGB triples with row 0 at the
//! *bottom* of the arena, so world `y` grows with the row index.

use crate::config::{ARENA_EXTENT, ARENA_HALF_EXTENT};
use crate::error::FloorError;

/// Immutable decoded floor image with a fixed world-to-pixel mapping.
#[derive(Debug, Clone)]
pub struct FloorMap {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl FloorMap {
    /// Wrap a bottom-up RGB buffer of `width * height * 3` bytes.
    pub fn from_rgb(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self, FloorError> {
        if width == 0 || height == 0 {
            return Err(FloorError::Empty { width, height });
        }
        let expected = width * height * 3;
        if pixels.len() != expected {
            return Err(FloorError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(FloorMap {
            width,
            height,
            pixels,
        })
    }

    /// A floor of one uniform colour, for tests.
    #[cfg(test)]
    pub fn uniform(width: usize, height: usize, rgb: [u8; 3]) -> Result<Self, FloorError> {
        let pixels = rgb
            .iter()
            .copied()
            .cycle()
            .take(width * height * 3)
            .collect();
        Self::from_rgb(width, height, pixels)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// RGB triple at a pixel, row 0 being the bottom of the floor.
    pub fn rgb(&self, column: usize, row: usize) -> [u8; 3] {
        let i = (row * self.width + column) * 3;
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2]]
    }

    /// Pixel under a world coordinate. Coordinates outside the arena are
    /// clamped to its edge and indices are truncated, never interpolated.
    pub fn pixel_at(&self, x: f64, y: f64) -> (usize, usize) {
        (
            Self::axis_index(x, self.width),
            Self::axis_index(y, self.height),
        )
    }

    /// Floor reflectance at a world coordinate: the mean of the three colour
    /// channels, rounded toward zero.
    pub fn intensity_at(&self, x: f64, y: f64) -> u8 {
        let (column, row) = self.pixel_at(x, y);
        let [r, g, b] = self.rgb(column, row);
        ((r as u16 + g as u16 + b as u16) / 3) as u8
    }

    fn axis_index(coord: f64, pixels: usize) -> usize {
        // NaN falls through clamp unchanged and casts to 0
        let unit = ((coord + ARENA_HALF_EXTENT) / ARENA_EXTENT).clamp(0.0, 1.0);
        // unit == 1.0 would address one past the last pixel
        ((pixels as f64 * unit) as usize).min(pixels - 1)
    }
}
