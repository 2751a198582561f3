use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Mode de rendu : famille de glyphes, entrée RGB ou grise, règle d'allumage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum RenderMode {
    /// Threshold braille from RGB input, white dots.
    Bw,
    /// Threshold braille from grayscale input, white dots.
    BwDot,
    /// True-colour half-blocks.
    Colored,
    /// Threshold braille, dots coloured with the lit-dot average.
    #[default]
    ColoredDot,
    /// Ordered-dither braille, white dots.
    BwDithered,
    /// Ordered-dither braille from grayscale, 256-colour gray ramp.
    GrayscaleDot,
    /// Every dot lit, gray ramp colour.
    FloodDot,
    /// Every dot lit, true colour.
    FloodDotColored,
    /// 2×2 Bayer braille, true colour.
    ColoredDithered,
    /// Floyd–Steinberg braille, white dots.
    FloydDot,
}

/// Configuration d'exécution : backend, parallélisme, rendu.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use tc_core::config::AccelConfig;
/// let config = AccelConfig::default();
/// assert_eq!(config.threshold, 128);
/// assert!(config.prefer_gpu);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AccelConfig {
    // === Backend ===
    /// Worker threads for bulk calls. 0 = auto (available parallelism, 4 if unknown).
    pub threads: usize,
    /// Try the GPU backend before falling back to CPU.
    pub prefer_gpu: bool,
    /// Floyd–Steinberg tile width. 0 = auto (clamped to [32, 64]).
    pub tile_width: u32,
    /// Floyd–Steinberg tile height. 0 = auto (clamped to [32, 64]).
    pub tile_height: u32,

    // === Rendu ===
    /// Glyph family and lighting rule.
    pub render_mode: RenderMode,
    /// Brightness threshold for threshold modes (pixels >= threshold light up).
    pub threshold: u8,
    /// Emit truecolor escapes. When false, gray ramp only.
    pub color_enabled: bool,
}

impl Default for AccelConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            prefer_gpu: true,
            tile_width: 0,
            tile_height: 0,
            render_mode: RenderMode::default(),
            threshold: 128,
            color_enabled: true,
        }
    }
}

impl AccelConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.threads = self.threads.min(256);
        if self.tile_width != 0 {
            self.tile_width = self.tile_width.clamp(8, 4096);
        }
        if self.tile_height != 0 {
            self.tile_height = self.tile_height.clamp(8, 4096);
        }
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    accel: Option<AccelSection>,
    render: Option<RenderSection>,
}

/// Accel section of the TOML config, all fields optional for partial override.
#[derive(Deserialize)]
struct AccelSection {
    threads: Option<usize>,
    prefer_gpu: Option<bool>,
    tile_width: Option<u32>,
    tile_height: Option<u32>,
}

/// Render section of the TOML config, all fields optional.
#[derive(Deserialize)]
struct RenderSection {
    render_mode: Option<RenderMode>,
    threshold: Option<u8>,
    color_enabled: Option<bool>,
}

/// Parse TOML text and merge it over the defaults.
///
/// # Errors
/// Returns an error if the text is not valid TOML for this schema.
///
/// # Example
/// ```
/// use tc_core::config::{parse_config, RenderMode};
/// let config = parse_config("[render]\nrender_mode = \"Colored\"\n").unwrap();
/// assert_eq!(config.render_mode, RenderMode::Colored);
/// ```
pub fn parse_config(content: &str) -> Result<AccelConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;
    let mut config = AccelConfig::default();

    if let Some(a) = file.accel {
        if let Some(v) = a.threads {
            config.threads = v;
        }
        if let Some(v) = a.prefer_gpu {
            config.prefer_gpu = v;
        }
        if let Some(v) = a.tile_width {
            config.tile_width = v;
        }
        if let Some(v) = a.tile_height {
            config.tile_height = v;
        }
    }

    if let Some(r) = file.render {
        if let Some(v) = r.render_mode {
            config.render_mode = v;
        }
        if let Some(v) = r.threshold {
            config.threshold = v;
        }
        if let Some(v) = r.color_enabled {
            config.color_enabled = v;
        }
    }

    config.clamp_all();
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use tc_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<AccelConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    let config = parse_config(&content)
        .with_context(|| format!("Configuration invalide dans {}", path.display()))?;
    log::debug!("config chargée depuis {}: {config:?}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.threads, 0);
        assert!(config.prefer_gpu);
        assert_eq!(config.render_mode, RenderMode::ColoredDot);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = parse_config("[accel]\nthreads = 8\nprefer_gpu = false\n").unwrap();
        assert_eq!(config.threads, 8);
        assert!(!config.prefer_gpu);
        assert_eq!(config.threshold, 128);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config = parse_config("[accel]\nthreads = 100000\ntile_width = 2\n").unwrap();
        assert_eq!(config.threads, 256);
        assert_eq!(config.tile_width, 8);
        assert_eq!(config.tile_height, 0);
    }

    #[test]
    fn floyd_mode_is_named_in_toml() {
        let config = parse_config("[render]\nrender_mode = \"FloydDot\"\n").unwrap();
        assert_eq!(config.render_mode, RenderMode::FloydDot);
    }

    #[test]
    fn unknown_mode_is_an_error() {
        assert!(parse_config("[render]\nrender_mode = \"Sixel\"\n").is_err());
    }

    #[test]
    fn load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[render]\nthreshold = 90\ncolor_enabled = false").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.threshold, 90);
        assert!(!config.color_enabled);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/termcell.toml")).is_err());
    }
}
