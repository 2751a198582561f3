use std::path::PathBuf;

use clap::Parser;
use tc_core::config::RenderMode;

/// termcell — conversion d'images en cellules Braille / demi-blocs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Image à convertir (PNG, JPEG, BMP, GIF, PNM).
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Mode de rendu : bw, bw-dot, colored, colored-dot, bw-dithered,
    /// grayscale-dot, flood-dot, flood-dot-colored, colored-dithered, floyd-dot.
    #[arg(long)]
    pub mode: Option<String>,

    /// Largeur de sortie en colonnes. Défaut : largeur du terminal, sinon 80.
    #[arg(long)]
    pub width: Option<u32>,

    /// Seuil de luminosité des modes à seuil (0-255).
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Threads CPU (0 = auto).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Forcer le backend CPU.
    #[arg(long, default_value_t = false)]
    pub cpu: bool,

    /// Désactiver la couleur (rampe de gris 256 couleurs).
    #[arg(long, default_value_t = false)]
    pub no_color: bool,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Afficher les GPU détectés puis quitter.
    #[arg(long, default_value_t = false)]
    pub info: bool,

    /// Afficher les capacités matérielles (GPU, encodeurs, backend) puis quitter.
    #[arg(long, default_value_t = false)]
    pub capabilities: bool,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Map a `--mode` name onto a [`RenderMode`].
#[must_use]
pub fn parse_mode(name: &str) -> Option<RenderMode> {
    let mode = match name {
        "bw" => RenderMode::Bw,
        "bw-dot" => RenderMode::BwDot,
        "colored" | "halfblock" => RenderMode::Colored,
        "colored-dot" | "braille" => RenderMode::ColoredDot,
        "bw-dithered" => RenderMode::BwDithered,
        "grayscale-dot" => RenderMode::GrayscaleDot,
        "flood-dot" => RenderMode::FloodDot,
        "flood-dot-colored" => RenderMode::FloodDotColored,
        "colored-dithered" => RenderMode::ColoredDithered,
        "floyd-dot" => RenderMode::FloydDot,
        _ => return None,
    };
    Some(mode)
}
