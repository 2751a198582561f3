use tc_core::buffer::PixelBuffer;
use tc_core::cell::HalfBlockCellResult;
use tc_core::pixel::{Rgb, to_gray};

/// Pixel `(x, y)`, or black when outside the image.
#[inline(always)]
fn sample(src: &PixelBuffer<'_>, x: u32, y: u32) -> Rgb {
    if x < src.width() && y < src.height() {
        Rgb::from(src.pixel(x, y))
    } else {
        Rgb::default()
    }
}

/// Cellule demi-bloc `(cx, cy)` : pixel du haut `(cx, 2cy)`, pixel du bas `(cx, 2cy+1)`.
///
/// No averaging: each half is exactly one source pixel.
///
/// # Example
/// ```
/// use tc_core::buffer::PixelBuffer;
/// use tc_core::pixel::Rgb;
/// use tc_cells::halfblock::process_cell;
///
/// let rgb = [255, 0, 0, 0, 0, 255];
/// let src = PixelBuffer::rgb(&rgb, 1, 2).unwrap();
/// let cell = process_cell(&src, 0, 0);
/// assert_eq!(cell.top, Rgb::new(255, 0, 0));
/// assert_eq!(cell.bottom, Rgb::new(0, 0, 255));
/// assert_eq!(cell.top_gray, 76);
/// assert_eq!(cell.bottom_gray, 29);
/// ```
#[must_use]
pub fn process_cell(src: &PixelBuffer<'_>, cx: u32, cy: u32) -> HalfBlockCellResult {
    let top = sample(src, cx, cy * 2);
    let bottom = sample(src, cx, cy * 2 + 1);
    HalfBlockCellResult {
        top,
        bottom,
        top_gray: to_gray(top.r, top.g, top.b),
        bottom_gray: to_gray(bottom.r, bottom.g, bottom.b),
    }
}
