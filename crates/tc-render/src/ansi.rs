use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use tc_core::cell::{CellResult, HalfBlockCellResult, UPPER_HALF_BLOCK};
use tc_core::pixel::{Rgb, gray_to_palette_index};

/// Espace de couleurs du terminal cible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Palette {
    /// 24-bit `38;2;r;g;b` escapes.
    TrueColor,
    /// 256-colour gray ramp (232..=255), from the colour's luma.
    Gray256,
}

impl Palette {
    /// `true` → truecolor, `false` → gray ramp.
    #[must_use]
    pub fn from_color_enabled(color_enabled: bool) -> Self {
        if color_enabled { Self::TrueColor } else { Self::Gray256 }
    }

    /// Terminal colour for `rgb` in this palette.
    ///
    /// # Example
    /// ```
    /// use crossterm::style::Color;
    /// use tc_core::pixel::Rgb;
    /// use tc_render::ansi::Palette;
    /// assert_eq!(Palette::Gray256.color(Rgb::splat(255)), Color::AnsiValue(255));
    /// assert_eq!(Palette::TrueColor.color(Rgb::new(1, 2, 3)), Color::Rgb { r: 1, g: 2, b: 3 });
    /// ```
    #[must_use]
    pub fn color(self, rgb: Rgb) -> Color {
        match self {
            Self::TrueColor => Color::Rgb {
                r: rgb.r,
                g: rgb.g,
                b: rgb.b,
            },
            Self::Gray256 => Color::AnsiValue(gray_to_palette_index(rgb.gray())),
        }
    }
}

/// Couleur des points Braille allumés.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DotColor {
    /// Terminal default foreground.
    Plain,
    /// Average colour of the lit dots.
    Lit,
    /// Gray ramp from the lit-dot average brightness.
    GrayRamp,
}

/// Écrit une grille Braille, une ligne terminal par rangée de cellules.
///
/// Colour escapes are only emitted when the colour changes along a row.
/// [`DotColor::Plain`] writes [`braille_text`] as is.
///
/// # Errors
/// Propagates I/O errors of `out`.
///
/// # Example
/// ```
/// use tc_core::cell::CellResult;
/// use tc_render::ansi::{render_braille, DotColor, Palette};
///
/// let cells = [CellResult { pattern: 0xFF, on_count: 8, ..CellResult::default() }; 2];
/// let mut out = Vec::new();
/// render_braille(&mut out, &cells, 2, DotColor::Plain, Palette::TrueColor).unwrap();
/// assert_eq!(String::from_utf8(out).unwrap(), "⣿⣿\n");
/// ```
pub fn render_braille<W: Write>(
    out: &mut W,
    cells: &[CellResult],
    cells_w: u32,
    dots: DotColor,
    palette: Palette,
) -> io::Result<()> {
    if dots == DotColor::Plain {
        queue!(out, Print(braille_text(cells, cells_w)))?;
        return out.flush();
    }
    for row in cells.chunks(cells_w.max(1) as usize) {
        let mut current: Option<Color> = None;
        for cell in row {
            let color = match dots {
                DotColor::Plain => None,
                DotColor::Lit => Some(palette.color(cell.avg_color)),
                DotColor::GrayRamp => Some(Color::AnsiValue(gray_to_palette_index(cell.avg_gray()))),
            };
            if let Some(c) = color.filter(|_| cell.on_count > 0) {
                if current != Some(c) {
                    queue!(out, SetForegroundColor(c))?;
                    current = Some(c);
                }
            }
            queue!(out, Print(cell.glyph()))?;
        }
        if current.is_some() {
            queue!(out, ResetColor)?;
        }
        queue!(out, Print('\n'))?;
    }
    out.flush()
}

/// Écrit une grille demi-blocs : `▀` avec fg = haut, bg = bas.
///
/// # Errors
/// Propagates I/O errors of `out`.
pub fn render_halfblock<W: Write>(
    out: &mut W,
    cells: &[HalfBlockCellResult],
    cells_w: u32,
    palette: Palette,
) -> io::Result<()> {
    for row in cells.chunks(cells_w.max(1) as usize) {
        let mut current: Option<(Color, Color)> = None;
        for cell in row {
            let pair = (palette.color(cell.top), palette.color(cell.bottom));
            if current.map(|(fg, _)| fg) != Some(pair.0) {
                queue!(out, SetForegroundColor(pair.0))?;
            }
            if current.map(|(_, bg)| bg) != Some(pair.1) {
                queue!(out, SetBackgroundColor(pair.1))?;
            }
            current = Some(pair);
            queue!(out, Print(UPPER_HALF_BLOCK))?;
        }
        queue!(out, ResetColor, Print('\n'))?;
    }
    out.flush()
}

/// Grille Braille en texte brut, sans couleur.
///
/// # Example
/// ```
/// use tc_core::cell::CellResult;
/// use tc_render::ansi::braille_text;
/// let cells = [CellResult::default(), CellResult { pattern: 0x01, ..CellResult::default() }];
/// assert_eq!(braille_text(&cells, 1), "\u{2800}\n\u{2801}\n");
/// ```
#[must_use]
pub fn braille_text(cells: &[CellResult], cells_w: u32) -> String {
    let mut text = String::with_capacity(cells.len() * 3 + cells.len() / cells_w.max(1) as usize);
    for row in cells.chunks(cells_w.max(1) as usize) {
        text.extend(row.iter().map(CellResult::glyph));
        text.push('\n');
    }
    text
}
