use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tc_core::config::AccelConfig;

pub mod cli;
pub mod info;
pub mod pipeline;
pub mod source;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config puis appliquer les overrides CLI
    let mut config = resolve_config(&cli)?;
    apply_overrides(&cli, &mut config);

    let mut stdout = io::stdout().lock();

    // 4. Diagnostics
    if cli.info {
        let gpus = tc_accel::detect::detect_gpus();
        info::write_gpu_info(&mut stdout, &gpus)?;
        return Ok(());
    }
    if cli.capabilities {
        let best = tc_accel::detect::best_gpu(&tc_accel::detect::detect_gpus());
        let encoders = tc_accel::detect::detect_hw_encoders();
        let backend = tc_accel::factory::init_backend(&config);
        info::write_capabilities(&mut stdout, &best, &encoders, &backend.name())?;
        return Ok(());
    }

    // 5. Charger l'image
    let Some(path) = cli.image.as_deref() else {
        anyhow::bail!("Aucune image spécifiée. Utilisez --image, --info ou --capabilities.");
    };
    let picture = source::load_picture(path)?;

    // 6. Backend, une fois par processus
    let backend = tc_accel::factory::init_backend(&config);
    log::info!(
        "backend {} (état {:?})",
        backend.name(),
        tc_accel::factory::current_state()
    );

    // 7. Rendu
    let cols = cli.width.unwrap_or_else(terminal_columns);
    pipeline::render_picture(backend.as_ref(), &config, &picture, cols, &mut stdout)?;
    stdout.flush().context("Écriture sur stdout")?;
    Ok(())
}

/// Config file if present, defaults otherwise.
fn resolve_config(cli: &cli::Cli) -> Result<AccelConfig> {
    if cli.config.exists() {
        tc_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(AccelConfig::default())
    }
}

fn apply_overrides(cli: &cli::Cli, config: &mut AccelConfig) {
    if let Some(ref mode) = cli.mode {
        let current = config.render_mode;
        config.render_mode = cli::parse_mode(mode).unwrap_or_else(|| {
            log::warn!("Mode inconnu '{mode}', utilisation du défaut.");
            current
        });
    }
    if let Some(threshold) = cli.threshold {
        config.threshold = threshold;
    }
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    if cli.cpu {
        config.prefer_gpu = false;
    }
    if cli.no_color {
        config.color_enabled = false;
    }
    config.clamp_all();
}

fn terminal_columns() -> u32 {
    crossterm::terminal::size().map_or(80, |(cols, _)| u32::from(cols))
}
