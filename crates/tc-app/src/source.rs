use std::path::Path;

use anyhow::{Context, Result};
use fast_image_resize::images::Image;
use fast_image_resize::{PixelType, ResizeOptions, Resizer};

/// Image RGB entrelacée, 3 octets par pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Picture {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Charge une image depuis le disque et la convertit en RGB8.
///
/// # Errors
/// Returns an error if the file cannot be decoded.
pub fn load_picture(path: &Path) -> Result<Picture> {
    let img = image::open(path)
        .with_context(|| format!("Impossible de charger {}", path.display()))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    log::debug!("image chargée : {} ({width}×{height})", path.display());
    Ok(Picture {
        data: rgb.into_raw(),
        width,
        height,
    })
}

/// Pixel size of a `cols`-wide cell grid keeping the source aspect ratio.
///
/// Braille (2×4) and half-block (1×2) cells both map to roughly square
/// pixels on a 1:2 terminal font, so the height follows the width directly
/// and is rounded up to whole cells.
///
/// Returns `(pixel_w, pixel_h, cells_w, cells_h)`.
#[must_use]
pub fn grid_size(src_w: u32, src_h: u32, cols: u32, cell_w: u32, cell_h: u32) -> (u32, u32, u32, u32) {
    let cols = cols.max(1);
    let pixel_w = cols * cell_w;
    let scaled_h = u64::from(src_h) * u64::from(pixel_w) / u64::from(src_w.max(1));
    let rows = (scaled_h.div_ceil(u64::from(cell_h)).max(1)) as u32;
    (pixel_w, rows * cell_h, cols, rows)
}

/// Redimensionne `src` en `width`×`height`. Identité si la taille est déjà bonne.
///
/// # Errors
/// Returns an error on zero dimensions or a failed resize.
pub fn resize(src: &Picture, width: u32, height: u32) -> Result<Picture> {
    if src.width == width && src.height == height {
        return Ok(src.clone());
    }
    anyhow::ensure!(
        width > 0 && height > 0 && src.width > 0 && src.height > 0,
        "Dimensions de redimensionnement invalides : {}×{} → {width}×{height}",
        src.width,
        src.height
    );
    let src_image = Image::from_vec_u8(src.width, src.height, src.data.clone(), PixelType::U8x3)
        .context("Invalid source dimensions")?;
    let mut dst_image = Image::new(width, height, PixelType::U8x3);
    Resizer::new()
        .resize(&src_image, &mut dst_image, Some(&ResizeOptions::new()))
        .context("Resize failed")?;
    Ok(Picture {
        data: dst_image.into_vec(),
        width,
        height,
    })
}
