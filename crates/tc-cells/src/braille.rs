use tc_core::buffer::PixelBuffer;
use tc_core::cell::CellResult;
use tc_core::pixel::{Rgb, to_gray};

use crate::dither::{bayer_threshold, ordered_threshold};

/// Bit of each dot, indexed `[row][col]` inside the 2×4 cell.
///
/// Unicode braille numbering (column-major, dots 7 and 8 on the last row):
/// ```text
///  1 4      0x01 0x08
///  2 5  →   0x02 0x10
///  3 6      0x04 0x20
///  7 8      0x40 0x80
/// ```
pub const DOTS: [[u8; 2]; 4] = [[0x01, 0x08], [0x02, 0x10], [0x04, 0x20], [0x40, 0x80]];

/// Inverse of [`DOTS`]: bit index → `(row, col)`.
pub const BRAILLE_BIT_TO_POS: [(u32, u32); 8] = [
    (0, 0),
    (1, 0),
    (2, 0),
    (0, 1),
    (1, 1),
    (2, 1),
    (3, 0),
    (3, 1),
];

/// Règle d'allumage d'un point Braille.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightingPolicy {
    /// Lit when `gray >= threshold`.
    Threshold(u8),
    /// Lit when `gray >=` the ordered 2×4 table entry of the dot.
    Ordered,
    /// Every in-bounds dot is lit.
    Flood,
    /// Lit when `gray >=` the 2×2 Bayer entry of the dot.
    Bayer,
}

impl LightingPolicy {
    /// Resolve the boolean flags of the backend API. `flood` wins over `use_dither`.
    ///
    /// # Example
    /// ```
    /// use tc_cells::braille::LightingPolicy;
    /// assert_eq!(LightingPolicy::from_flags(90, true, true), LightingPolicy::Flood);
    /// assert_eq!(LightingPolicy::from_flags(90, true, false), LightingPolicy::Ordered);
    /// assert_eq!(LightingPolicy::from_flags(90, false, false), LightingPolicy::Threshold(90));
    /// ```
    #[must_use]
    pub fn from_flags(threshold: u8, use_dither: bool, flood: bool) -> Self {
        if flood {
            Self::Flood
        } else if use_dither {
            Self::Ordered
        } else {
            Self::Threshold(threshold)
        }
    }

    #[inline(always)]
    fn is_lit(self, gray: u8, row: u32, col: u32) -> bool {
        match self {
            Self::Threshold(t) => gray >= t,
            Self::Ordered => gray >= ordered_threshold(row, col),
            Self::Flood => true,
            Self::Bayer => gray >= bayer_threshold(row, col),
        }
    }
}

/// Running channel sums; integer average, truncated, black when empty.
#[derive(Default)]
struct ColorSum {
    r: u32,
    g: u32,
    b: u32,
    n: u32,
}

impl ColorSum {
    #[inline(always)]
    fn add(&mut self, (r, g, b): (u8, u8, u8)) {
        self.r += u32::from(r);
        self.g += u32::from(g);
        self.b += u32::from(b);
        self.n += 1;
    }

    fn average(&self) -> Rgb {
        if self.n == 0 {
            return Rgb::default();
        }
        // n <= 8 and each channel sum <= 8 * 255: the quotient fits in u8.
        Rgb::new(
            (self.r / self.n) as u8,
            (self.g / self.n) as u8,
            (self.b / self.n) as u8,
        )
    }
}

/// Extrait la cellule Braille `(cx, cy)` : motif, points allumés, couleurs moyennes.
///
/// The cell covers pixels `(cx*2 + col, cy*4 + row)`; samples outside the
/// image are skipped entirely (never lit, never averaged). Works on RGB and
/// gray views alike since gray pixels read back as `(g, g, g)`.
///
/// # Example
/// ```
/// use tc_core::buffer::PixelBuffer;
/// use tc_cells::braille::{LightingPolicy, process_cell};
///
/// let gray = [128u8; 2 * 4];
/// let src = PixelBuffer::gray(&gray, 2, 4).unwrap();
/// let cell = process_cell(&src, 0, 0, LightingPolicy::Threshold(128));
/// assert_eq!(cell.pattern, 0xFF);
/// assert_eq!(cell.on_count, 8);
/// ```
#[must_use]
pub fn process_cell(src: &PixelBuffer<'_>, cx: u32, cy: u32, policy: LightingPolicy) -> CellResult {
    let mut pattern = 0u8;
    let mut lit = ColorSum::default();
    let mut all = ColorSum::default();

    for (row, bits) in DOTS.iter().enumerate() {
        let py = cy * 4 + row as u32;
        if py >= src.height() {
            break;
        }
        for (col, &bit) in bits.iter().enumerate() {
            let px = cx * 2 + col as u32;
            if px >= src.width() {
                continue;
            }
            let rgb = src.pixel(px, py);
            all.add(rgb);
            if policy.is_lit(to_gray(rgb.0, rgb.1, rgb.2), row as u32, col as u32) {
                pattern |= bit;
                lit.add(rgb);
            }
        }
    }

    CellResult {
        pattern,
        on_count: pattern.count_ones() as u8,
        avg_color: lit.average(),
        avg_all_color: all.average(),
    }
}

/// Dots `(row, col)` lit by `pattern`, in bit order.
///
/// # Example
/// ```
/// use tc_cells::braille::lit_positions;
/// assert_eq!(lit_positions(0x41), vec![(0, 0), (3, 0)]);
/// ```
#[must_use]
pub fn lit_positions(pattern: u8) -> Vec<(u32, u32)> {
    BRAILLE_BIT_TO_POS
        .iter()
        .enumerate()
        .filter(|&(bit, _)| pattern & (1 << bit) != 0)
        .map(|(_, &pos)| pos)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb_image(w: u32, h: u32, f: impl Fn(u32, u32) -> (u8, u8, u8)) -> Vec<u8> {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                let (r, g, b) = f(x, y);
                data.extend_from_slice(&[r, g, b]);
            }
        }
        data
    }

    #[test]
    fn dot_tables_are_inverse() {
        for (bit, &(row, col)) in BRAILLE_BIT_TO_POS.iter().enumerate() {
            assert_eq!(DOTS[row as usize][col as usize], 1 << bit);
        }
    }

    #[test]
    fn mid_gray_cell_is_fully_lit() {
        let data = rgb_image(4, 4, |_, _| (128, 128, 128));
        let src = PixelBuffer::rgb(&data, 4, 4).unwrap();
        let cell = process_cell(&src, 0, 0, LightingPolicy::Threshold(128));
        assert_eq!(cell.pattern, 0xFF);
        assert_eq!(cell.on_count, 8);
        assert_eq!(cell.avg_color, Rgb::splat(128));
        assert_eq!(cell.avg_all_color, Rgb::splat(128));
    }

    #[test]
    fn dark_cell_keeps_background_average() {
        let data = rgb_image(2, 4, |_, _| (10, 20, 30));
        let src = PixelBuffer::rgb(&data, 2, 4).unwrap();
        let cell = process_cell(&src, 0, 0, LightingPolicy::Threshold(128));
        assert_eq!(cell.pattern, 0);
        assert_eq!(cell.avg_color, Rgb::default());
        assert_eq!(cell.avg_all_color, Rgb::new(10, 20, 30));
    }

    #[test]
    fn flood_lights_every_dot() {
        let data = vec![0u8; 2 * 4 * 3];
        let src = PixelBuffer::rgb(&data, 2, 4).unwrap();
        let cell = process_cell(&src, 0, 0, LightingPolicy::Flood);
        assert_eq!(cell.pattern, 0xFF);
        assert_eq!(cell.on_count, 8);
    }

    #[test]
    fn edge_cells_skip_out_of_bounds_samples() {
        // 3×5 image: cell (1, 1) only sees pixel (2, 4).
        let data = rgb_image(3, 5, |_, _| (255, 255, 255));
        let src = PixelBuffer::rgb(&data, 3, 5).unwrap();
        let cell = process_cell(&src, 1, 1, LightingPolicy::Flood);
        assert_eq!(cell.on_count, 1);
        assert_eq!(cell.pattern, 0x01);

        let cell = process_cell(&src, 1, 0, LightingPolicy::Threshold(0));
        // Column 0 only, four rows.
        assert_eq!(cell.pattern, 0x01 | 0x02 | 0x04 | 0x40);
        assert_eq!(cell.on_count, 4);
    }

    #[test]
    fn ordered_policy_follows_table() {
        // gray 100 ≥ 16, 80, 48 only
        let gray = [100u8; 8];
        let src = PixelBuffer::gray(&gray, 2, 4).unwrap();
        let cell = process_cell(&src, 0, 0, LightingPolicy::Ordered);
        assert_eq!(cell.pattern, 0x01 | 0x02 | 0x40);
        assert_eq!(cell.on_count, 3);
        assert_eq!(cell.avg_color, Rgb::splat(100));
    }

    #[test]
    fn bayer_policy_follows_matrix() {
        // gray 100 ≥ 0 (even row, even col) and 64 (odd row, odd col)
        let data = rgb_image(2, 4, |_, _| (100, 100, 100));
        let src = PixelBuffer::rgb(&data, 2, 4).unwrap();
        let cell = process_cell(&src, 0, 0, LightingPolicy::Bayer);
        assert_eq!(cell.pattern, 0x01 | 0x04 | 0x10 | 0x80);
        assert_eq!(cell.avg_all_color, Rgb::splat(100));
    }

    #[test]
    fn gray_matches_replicated_rgb() {
        let gray: Vec<u8> = (0..6 * 8).map(|i| (i * 37 % 256) as u8).collect();
        let rgb: Vec<u8> = gray.iter().flat_map(|&g| [g, g, g]).collect();
        let g = PixelBuffer::gray(&gray, 6, 8).unwrap();
        let c = PixelBuffer::rgb(&rgb, 6, 8).unwrap();
        for policy in [
            LightingPolicy::Threshold(90),
            LightingPolicy::Ordered,
            LightingPolicy::Flood,
            LightingPolicy::Bayer,
        ] {
            for cy in 0..2 {
                for cx in 0..3 {
                    assert_eq!(process_cell(&g, cx, cy, policy), process_cell(&c, cx, cy, policy));
                }
            }
        }
    }

    #[test]
    fn lit_average_truncates() {
        // Two lit pixels 255 and 200 (luma), rest dark.
        let data = rgb_image(2, 4, |x, y| match (x, y) {
            (0, 0) => (255, 255, 255),
            (1, 0) => (200, 200, 201),
            _ => (0, 0, 0),
        });
        let src = PixelBuffer::rgb(&data, 2, 4).unwrap();
        let cell = process_cell(&src, 0, 0, LightingPolicy::Threshold(128));
        assert_eq!(cell.pattern, 0x09);
        assert_eq!(cell.avg_color, Rgb::new(227, 227, 228));
        assert_eq!(cell.avg_all_color, Rgb::new(56, 56, 57));
    }
}
