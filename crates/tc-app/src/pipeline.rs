use std::io::Write;

use anyhow::{Context, Result};
use tc_core::cell::{CellResult, HalfBlockCellResult};
use tc_core::config::{AccelConfig, RenderMode};
use tc_core::traits::ComputeBackend;
use tc_render::ansi::{self, DotColor, Palette};

use crate::source::{self, Picture};

/// Règle d'allumage Braille d'un mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lighting {
    /// `gray >= threshold`.
    Threshold,
    /// Ordered thresholds of the 2×4 cell.
    Ordered,
    /// Tous les points.
    Flood,
    /// 2×2 Bayer matrix, coloured dots.
    Bayer,
}

/// Source des points Braille.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Input {
    /// RGB pixels, luma computed per dot.
    Rgb,
    /// Grayscale plane computed by the backend first.
    Gray,
    /// Floyd–Steinberg binary plane, read back with a mid threshold.
    Diffused,
}

/// What a render mode asks of the backend and the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plan {
    /// `▀` cells, 1×2 pixels.
    HalfBlock,
    /// Braille cells, 2×4 pixels.
    Braille {
        input: Input,
        lighting: Lighting,
        dots: DotColor,
    },
}

/// Seuil de relecture d'un plan déjà binaire {0, 255}.
const DIFFUSED_THRESHOLD: u8 = 128;

impl Plan {
    #[must_use]
    pub fn for_mode(mode: RenderMode) -> Self {
        let braille = |input, lighting, dots| Self::Braille {
            input,
            lighting,
            dots,
        };
        match mode {
            RenderMode::Colored => Self::HalfBlock,
            RenderMode::Bw => braille(Input::Rgb, Lighting::Threshold, DotColor::Plain),
            RenderMode::BwDot => braille(Input::Gray, Lighting::Threshold, DotColor::Plain),
            RenderMode::ColoredDot => braille(Input::Rgb, Lighting::Threshold, DotColor::Lit),
            RenderMode::BwDithered => braille(Input::Rgb, Lighting::Ordered, DotColor::Plain),
            RenderMode::GrayscaleDot => braille(Input::Gray, Lighting::Ordered, DotColor::GrayRamp),
            RenderMode::FloodDot => braille(Input::Rgb, Lighting::Flood, DotColor::GrayRamp),
            RenderMode::FloodDotColored => braille(Input::Rgb, Lighting::Flood, DotColor::Lit),
            RenderMode::ColoredDithered => braille(Input::Rgb, Lighting::Bayer, DotColor::Lit),
            RenderMode::FloydDot => braille(Input::Diffused, Lighting::Threshold, DotColor::Plain),
        }
    }

    /// Pixels per cell, `(w, h)`.
    #[must_use]
    pub fn cell_size(self) -> (u32, u32) {
        match self {
            Self::HalfBlock => (1, 2),
            Self::Braille { .. } => (2, 4),
        }
    }
}

/// Redimensionne, convertit puis écrit l'image dans `out`.
///
/// # Errors
/// Resize failures, backend contract errors, or I/O errors of `out`.
pub fn render_picture<W: Write>(
    backend: &dyn ComputeBackend,
    config: &AccelConfig,
    picture: &Picture,
    cols: u32,
    out: &mut W,
) -> Result<()> {
    let plan = Plan::for_mode(config.render_mode);
    let (cell_w, cell_h) = plan.cell_size();
    let (pw, ph, cw, ch) = source::grid_size(picture.width, picture.height, cols, cell_w, cell_h);
    let scaled = source::resize(picture, pw, ph)?;
    let palette = Palette::from_color_enabled(config.color_enabled);
    let n_cells = cw as usize * ch as usize;
    log::debug!("rendu {:?} : {pw}×{ph} px → {cw}×{ch} cellules", config.render_mode);

    match plan {
        Plan::HalfBlock => {
            let mut cells = vec![HalfBlockCellResult::default(); n_cells];
            backend.halfblock_cells_rgb(&scaled.data, pw, ph, cw, ch, &mut cells)?;
            ansi::render_halfblock(out, &cells, cw, palette).context("Écriture du rendu")?;
        }
        Plan::Braille { input, lighting, dots } => {
            let mut cells = vec![CellResult::default(); n_cells];
            let dither = lighting == Lighting::Ordered;
            let flood = lighting == Lighting::Flood;
            let n_pixels = pw as usize * ph as usize;
            match (input, lighting) {
                (_, Lighting::Bayer) => {
                    backend.braille_cells_bayer(&scaled.data, pw, ph, cw, ch, &mut cells)?;
                }
                (Input::Rgb, _) => {
                    backend.braille_cells_rgb(&scaled.data, pw, ph, cw, ch, &mut cells, config.threshold, dither, flood)?;
                }
                (Input::Gray, _) => {
                    let mut gray = vec![0u8; n_pixels];
                    backend.grayscale(&scaled.data, pw, ph, &mut gray)?;
                    backend.braille_cells_gray(&gray, pw, ph, cw, ch, &mut cells, config.threshold, dither, flood)?;
                }
                (Input::Diffused, _) => {
                    let mut binary = vec![0u8; n_pixels];
                    backend.floyd_steinberg_rgb(&scaled.data, pw, ph, &mut binary)?;
                    backend.braille_cells_gray(&binary, pw, ph, cw, ch, &mut cells, DIFFUSED_THRESHOLD, false, false)?;
                }
            }
            ansi::render_braille(out, &cells, cw, dots, palette).context("Écriture du rendu")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_accel::CpuBackend;

    fn white(width: u32, height: u32) -> Picture {
        Picture {
            data: vec![255; (width * height * 3) as usize],
            width,
            height,
        }
    }

    fn render(mode: RenderMode, picture: &Picture, cols: u32) -> String {
        let config = AccelConfig {
            render_mode: mode,
            ..AccelConfig::default()
        };
        let mut out = Vec::new();
        render_picture(&CpuBackend::new(1), &config, picture, cols, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn every_mode_has_a_plan() {
        assert_eq!(Plan::for_mode(RenderMode::Colored), Plan::HalfBlock);
        assert_eq!(Plan::for_mode(RenderMode::Colored).cell_size(), (1, 2));
        assert_eq!(
            Plan::for_mode(RenderMode::GrayscaleDot),
            Plan::Braille {
                input: Input::Gray,
                lighting: Lighting::Ordered,
                dots: DotColor::GrayRamp
            }
        );
        assert_eq!(
            Plan::for_mode(RenderMode::FloydDot),
            Plan::Braille {
                input: Input::Diffused,
                lighting: Lighting::Threshold,
                dots: DotColor::Plain
            }
        );
        assert_eq!(Plan::for_mode(RenderMode::ColoredDithered).cell_size(), (2, 4));
    }

    #[test]
    fn white_image_lights_every_dot() {
        let s = render(RenderMode::Bw, &white(8, 8), 4);
        // 4 colonnes × 2 px = 8 px → 8 px de haut → 2 rangées.
        assert_eq!(s, "⣿⣿⣿⣿\n⣿⣿⣿⣿\n");
    }

    #[test]
    fn colored_mode_emits_halfblocks() {
        let s = render(RenderMode::Colored, &white(4, 4), 4);
        assert_eq!(s.matches('▀').count(), 4 * 2);
        assert!(s.contains("38;2;255;255;255"));
    }

    #[test]
    fn black_image_stays_blank_in_threshold_modes() {
        let black = Picture {
            data: vec![0; 4 * 4 * 3],
            width: 4,
            height: 4,
        };
        for mode in [RenderMode::Bw, RenderMode::BwDot, RenderMode::ColoredDot] {
            let s = render(mode, &black, 2);
            assert!(s.chars().filter(|c| !c.is_whitespace()).all(|c| c == '\u{2800}'), "{mode:?}: {s:?}");
        }
    }

    #[test]
    fn flood_lights_black_pixels_too() {
        let black = Picture {
            data: vec![0; 4 * 8 * 3],
            width: 4,
            height: 8,
        };
        let s = render(RenderMode::FloodDot, &black, 2);
        assert_eq!(s.matches('⣿').count(), 2 * 2);
    }

    #[test]
    fn floyd_mode_spreads_mid_gray_over_dots() {
        let gray = Picture {
            data: vec![128; 16 * 16 * 3],
            width: 16,
            height: 16,
        };
        let s = render(RenderMode::FloydDot, &gray, 8);
        let lit: u32 = s
            .chars()
            .filter(|c| ('\u{2800}'..='\u{28FF}').contains(c))
            .map(|c| (c as u32 - 0x2800).count_ones())
            .sum();
        // 8×4 cellules → 256 points ; la diffusion en allume environ la moitié.
        assert!((96..=160).contains(&lit), "{lit} points allumés");
        assert!(!s.contains('\x1b'));
    }

    #[test]
    fn floyd_mode_keeps_white_full() {
        assert_eq!(render(RenderMode::FloydDot, &white(8, 8), 4), "⣿⣿⣿⣿\n⣿⣿⣿⣿\n");
    }

    #[test]
    fn no_color_uses_gray_ramp() {
        let config = AccelConfig {
            render_mode: RenderMode::ColoredDot,
            color_enabled: false,
            ..AccelConfig::default()
        };
        let mut out = Vec::new();
        render_picture(&CpuBackend::new(1), &config, &white(4, 4), 2, &mut out).unwrap();
        let s = String::from_utf8(out).unwrap();
        assert!(s.contains("38;5;255"), "{s:?}");
        assert!(!s.contains("38;2;"));
    }
}
