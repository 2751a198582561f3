//! Primitives scalaires par pixel.
//!
//! `to_gray` is the one luma formula of the workspace. The GPU shaders in
//! `tc-accel` repeat the same integer expression and must stay in sync.

/// Simple RGB triple (no alpha).
///
/// # Example
/// ```
/// use tc_core::pixel::Rgb;
/// let c = Rgb::new(255, 0, 0);
/// assert_eq!(c.gray(), 76);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Build a colour from its three channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Neutral grey with all channels set to `v`.
    #[must_use]
    pub const fn splat(v: u8) -> Self {
        Self { r: v, g: v, b: v }
    }

    /// BT.601 luma of this colour.
    #[inline(always)]
    #[must_use]
    pub fn gray(self) -> u8 {
        to_gray(self.r, self.g, self.b)
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb> for (u8, u8, u8) {
    fn from(c: Rgb) -> Self {
        (c.r, c.g, c.b)
    }
}

/// Luma ITU-R BT.601, arithmétique entière tronquée.
///
/// `(299 r + 587 g + 114 b) / 1000`, never rounded.
///
/// # Example
/// ```
/// use tc_core::pixel::to_gray;
/// assert_eq!(to_gray(0, 0, 0), 0);
/// assert_eq!(to_gray(255, 255, 255), 255);
/// assert_eq!(to_gray(0, 255, 0), 149);
/// ```
#[inline(always)]
#[must_use]
pub fn to_gray(r: u8, g: u8, b: u8) -> u8 {
    ((299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000) as u8
}

/// Map a gray level onto the 24-step grayscale ramp of the 256-colour palette (232..=255).
///
/// # Example
/// ```
/// use tc_core::pixel::gray_to_palette_index;
/// assert_eq!(gray_to_palette_index(0), 232);
/// assert_eq!(gray_to_palette_index(255), 255);
/// ```
#[inline(always)]
#[must_use]
pub fn gray_to_palette_index(gray: u8) -> u8 {
    (232 + u32::from(gray) * 23 / 255) as u8
}

/// Replicate a single-channel buffer into an interleaved RGB buffer.
///
/// `to_gray(g, g, g) == g` for every `g`, so cell extraction over the
/// expanded buffer yields the same lit/unlit decisions as over the source.
///
/// # Example
/// ```
/// use tc_core::pixel::expand_gray_to_rgb;
/// assert_eq!(expand_gray_to_rgb(&[7, 9]), vec![7, 7, 7, 9, 9, 9]);
/// ```
#[must_use]
pub fn expand_gray_to_rgb(gray: &[u8]) -> Vec<u8> {
    gray.iter().flat_map(|&g| [g, g, g]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gray_extremes() {
        assert_eq!(to_gray(0, 0, 0), 0);
        assert_eq!(to_gray(255, 255, 255), 255);
    }

    #[test]
    fn gray_truncates_instead_of_rounding() {
        // 299*1 / 1000 = 0.299 -> 0 ; 587*1 = 0.587 would round to 1
        assert_eq!(to_gray(0, 1, 0), 0);
        // 299+587+114 = 1000 -> exact
        assert_eq!(to_gray(1, 1, 1), 1);
        // (299*100 + 587*150 + 114*200) / 1000 = 140.75 -> 140
        assert_eq!(to_gray(100, 150, 200), 140);
    }

    #[test]
    fn gray_is_identity_on_neutral_colours() {
        for v in 0..=255u8 {
            assert_eq!(to_gray(v, v, v), v, "gris neutre non conservé à {v}");
        }
    }

    #[test]
    fn gray_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(to_gray(12, 200, 77), to_gray(12, 200, 77));
        }
    }

    #[test]
    fn palette_index_stays_in_ramp() {
        let mut prev = 232;
        for g in 0..=255u8 {
            let idx = gray_to_palette_index(g);
            assert!((232..=255).contains(&idx));
            assert!(idx >= prev, "rampe non monotone à {g}");
            prev = idx;
        }
        assert_eq!(gray_to_palette_index(128), 232 + 128 * 23 / 255);
    }
}
