use crate::error::CoreError;

/// Nombre de canaux par pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channels {
    /// One byte per pixel.
    Gray = 1,
    /// Three interleaved bytes per pixel (R, G, B).
    Rgb = 3,
}

impl Channels {
    /// Bytes per pixel.
    #[must_use]
    pub const fn count(self) -> usize {
        self as usize
    }
}

/// Borrowed, validated view over a caller-owned pixel buffer.
///
/// Row-major, one byte per channel. The core never keeps the view beyond
/// a single call.
///
/// # Example
/// ```
/// use tc_core::buffer::{Channels, PixelBuffer};
/// let data = [0u8; 2 * 3 * 3];
/// let buf = PixelBuffer::new(&data, 2, 3, Channels::Rgb).unwrap();
/// assert_eq!(buf.pixel_count(), 6);
/// assert!(PixelBuffer::new(&data, 3, 3, Channels::Rgb).is_err());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct PixelBuffer<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    channels: Channels,
}

impl<'a> PixelBuffer<'a> {
    /// Validate `data.len() == width * height * channels` and non-zero dimensions.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidDimensions`] for a zero-sized image and
    /// [`CoreError::InputSize`] when the slice length is wrong.
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        channels: Channels,
    ) -> Result<Self, CoreError> {
        let expected = expected_len(width, height, channels)?;
        if data.len() != expected {
            return Err(CoreError::InputSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    /// Shorthand for an RGB view.
    ///
    /// # Errors
    /// See [`PixelBuffer::new`].
    pub fn rgb(data: &'a [u8], width: u32, height: u32) -> Result<Self, CoreError> {
        Self::new(data, width, height, Channels::Rgb)
    }

    /// Shorthand for a grayscale view.
    ///
    /// # Errors
    /// See [`PixelBuffer::new`].
    pub fn gray(data: &'a [u8], width: u32, height: u32) -> Result<Self, CoreError> {
        Self::new(data, width, height, Channels::Gray)
    }

    /// Raw bytes.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Channel layout.
    #[must_use]
    pub fn channels(&self) -> Channels {
        self.channels
    }

    /// `width * height`.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Accès au pixel (x, y) → (r, g, b). Gray pixels are replicated.
    ///
    /// Caller guarantees `x < width && y < height`.
    #[inline(always)]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let i = y as usize * self.width as usize + x as usize;
        match self.channels {
            Channels::Gray => {
                let g = self.data[i];
                (g, g, g)
            }
            Channels::Rgb => {
                let idx = i * 3;
                (self.data[idx], self.data[idx + 1], self.data[idx + 2])
            }
        }
    }
}

/// Expected byte length for an image, rejecting zero-sized dimensions.
///
/// # Errors
/// Returns [`CoreError::InvalidDimensions`] when `width` or `height` is zero,
/// or when the byte count does not fit in `usize`.
pub fn expected_len(width: u32, height: u32, channels: Channels) -> Result<usize, CoreError> {
    if width == 0 || height == 0 {
        return Err(CoreError::InvalidDimensions { width, height });
    }
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(channels.count()))
        .ok_or(CoreError::InvalidDimensions { width, height })
}

/// Cell-grid contract: non-zero grid, output slice sized `cells_w * cells_h`.
///
/// # Errors
/// Returns [`CoreError::InvalidCellGrid`] or [`CoreError::OutputSize`].
pub fn check_cell_output(cells_w: u32, cells_h: u32, out_len: usize) -> Result<usize, CoreError> {
    if cells_w == 0 || cells_h == 0 {
        return Err(CoreError::InvalidCellGrid { cells_w, cells_h });
    }
    let expected = cells_w as usize * cells_h as usize;
    if out_len != expected {
        return Err(CoreError::OutputSize {
            expected,
            actual: out_len,
        });
    }
    Ok(expected)
}

/// Output buffer contract for per-pixel operations.
///
/// # Errors
/// Returns [`CoreError::OutputSize`] when `out_len != expected`.
pub fn check_pixel_output(expected: usize, out_len: usize) -> Result<(), CoreError> {
    if out_len == expected {
        Ok(())
    } else {
        Err(CoreError::OutputSize {
            expected,
            actual: out_len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimensions() {
        let err = PixelBuffer::gray(&[], 0, 4).unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidDimensions {
                width: 0,
                height: 4
            }
        );
    }

    #[test]
    fn rejects_length_mismatch() {
        let data = [0u8; 5];
        let err = PixelBuffer::rgb(&data, 1, 2).unwrap_err();
        assert_eq!(
            err,
            CoreError::InputSize {
                expected: 6,
                actual: 5
            }
        );
    }

    #[test]
    fn pixel_reads_rgb_and_gray() {
        let rgb = [1, 2, 3, 4, 5, 6];
        let view = PixelBuffer::rgb(&rgb, 2, 1).unwrap();
        assert_eq!(view.pixel(1, 0), (4, 5, 6));

        let gray = [10, 20];
        let view = PixelBuffer::gray(&gray, 1, 2).unwrap();
        assert_eq!(view.pixel(0, 1), (20, 20, 20));
    }

    #[test]
    fn cell_output_contract() {
        assert_eq!(check_cell_output(3, 2, 6), Ok(6));
        assert!(check_cell_output(0, 2, 0).is_err());
        assert!(check_cell_output(3, 2, 5).is_err());
    }
}
