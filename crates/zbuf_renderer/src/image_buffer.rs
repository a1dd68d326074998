use zbuf_core::Color;

/// Clamp a value to [0, 1] range.
#[inline]
pub fn clamp_01(x: f32) -> f32 {
    x.clamp(0.0, 1.0)
}

/// Convert a color to 8-bit RGB. No gamma is applied.
pub fn color_to_rgb(color: Color) -> [u8; 3] {
    [color.x, color.y, color.z].map(|c| (255.0 * clamp_01(c)).round() as u8)
}

/// Row-major offset of pixel `(x, y)`, computed in `usize` so large screens
/// do not overflow.
#[inline]
pub(crate) fn pixel_index(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}

/// In-memory render target. Pixel `(0, 0)` is the bottom-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with `background`.
    pub fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![background; width as usize * height as usize],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[pixel_index(self.width, x, y)]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.pixels[pixel_index(self.width, x, y)] = color;
    }

    pub fn fill(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    /// Row-major RGB bytes with the first row at the top of the picture,
    /// the layout image encoders expect.
    pub fn to_rgb8(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 3);
        for row in self.pixels.chunks_exact(self.width.max(1) as usize).rev() {
            for color in row {
                bytes.extend_from_slice(&color_to_rgb(*color));
            }
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_pixel_index_past_u32() {
        assert_eq!(pixel_index(4, 1, 2), 9);
        // 70000 * 70000 does not fit in a u32
        assert_eq!(pixel_index(70_000, 5, 70_000), 4_900_000_005);
    }

    #[test]
    fn test_color_to_rgb_clamps() {
        assert_eq!(color_to_rgb(Color::new(0.0, 1.0, 0.5)), [0, 255, 128]);
        assert_eq!(color_to_rgb(Color::new(-2.0, 3.0, 1.0)), [0, 255, 255]);
    }

    #[test]
    fn test_get_set_fill() {
        let mut image = ImageBuffer::new(3, 2, Color::ZERO);
        image.set(2, 1, Color::ONE);

        assert_eq!(image.get(2, 1), Color::ONE);
        assert_eq!(image.get(0, 0), Color::ZERO);

        image.fill(Color::X);
        assert!(image.pixels.iter().all(|&c| c == Color::X));
    }

    #[test]
    fn test_to_rgb8_flips_rows() {
        let mut image = ImageBuffer::new(2, 2, Color::ZERO);
        // Bottom-left pixel
        image.set(0, 0, Color::ONE);
        let bytes = image.to_rgb8();

        assert_eq!(bytes.len(), 12);
        // Lands at the start of the last row in top-down order
        assert_eq!(&bytes[6..9], &[255, 255, 255]);
        assert_eq!(&bytes[0..3], &[0, 0, 0]);
    }
}
