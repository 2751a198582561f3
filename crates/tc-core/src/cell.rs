use crate::pixel::Rgb;

/// Braille base codepoint (U+2800).
pub const BRAILLE_BASE: u32 = 0x2800;

/// Upper-half block used by the half-block renderer (fg = top, bg = bottom).
pub const UPPER_HALF_BLOCK: char = '\u{2580}';

/// Résultat d'une cellule Braille 2×4.
///
/// Produced fresh for every cell of every call; `Copy` and never mutated by
/// the core afterwards.
///
/// # Example
/// ```
/// use tc_core::cell::CellResult;
/// let cell = CellResult::default();
/// assert_eq!(cell.glyph(), '\u{2800}');
/// assert_eq!(cell.on_count, 0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CellResult {
    /// 8-bit dot pattern, Unicode braille bit order.
    pub pattern: u8,
    /// Number of lit dots (0..=8).
    pub on_count: u8,
    /// Average colour of the lit dots. Black when nothing is lit.
    pub avg_color: Rgb,
    /// Average colour of every in-bounds sample of the cell.
    pub avg_all_color: Rgb,
}

impl CellResult {
    /// Brightness of the foreground colour.
    #[must_use]
    pub fn avg_gray(&self) -> u8 {
        self.avg_color.gray()
    }

    /// Renderable braille character for `pattern`.
    #[must_use]
    pub fn glyph(&self) -> char {
        braille_char(self.pattern)
    }
}

/// Résultat d'une cellule demi-bloc : deux pixels empilés, jamais mélangés.
///
/// # Example
/// ```
/// use tc_core::cell::HalfBlockCellResult;
/// let cell = HalfBlockCellResult::default();
/// assert_eq!(cell.top_gray, 0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HalfBlockCellResult {
    /// Top sample (foreground).
    pub top: Rgb,
    /// Bottom sample (background).
    pub bottom: Rgb,
    /// Luma of `top`.
    pub top_gray: u8,
    /// Luma of `bottom`.
    pub bottom_gray: u8,
}

/// Map un motif 8 bits vers le caractère Braille `U+2800 + pattern`.
///
/// # Example
/// ```
/// use tc_core::cell::braille_char;
/// assert_eq!(braille_char(0x00), '\u{2800}');
/// assert_eq!(braille_char(0xFF), '\u{28FF}');
/// ```
#[must_use]
#[inline(always)]
pub const fn braille_char(pattern: u8) -> char {
    match char::from_u32(BRAILLE_BASE + pattern as u32) {
        Some(c) => c,
        None => ' ',
    }
}

/// Braille patterns occupy U+2800..=U+28FF.
#[must_use]
pub const fn is_braille_char(codepoint: u32) -> bool {
    codepoint >= 0x2800 && codepoint <= 0x28FF
}

/// Block elements occupy U+2580..=U+259F.
#[must_use]
pub const fn is_block_char(codepoint: u32) -> bool {
    codepoint >= 0x2580 && codepoint <= 0x259F
}
