//! Algorithmique de tramage : tables ordonnées et diffusion d'erreur Floyd–Steinberg.
//!
//! Floyd–Steinberg carries a right/below data dependency from every pixel to
//! the next, so the parallel variant cuts the image into independent tiles and
//! restarts the serial algorithm at each tile origin. Output differs from the
//! serial result along tile seams; that deviation is accepted.
//!
//! Tile edges do not depend on the machine: an automatic edge is the image
//! dimension clamped to [`TILE_MIN`, `TILE_MAX`], so a given image always
//! yields the same tiles and the same output. Thread availability decides
//! how the tiles are spread: the tile list is cut into
//! [`resolve_threads`](crate::dispatch::resolve_threads) contiguous groups of
//! `ceil(tiles / threads)` tiles, one group per worker.
//!
//! The seam deviation is not confined to the pixels next to a seam. A tile
//! restarted from its origin starts with zero carried error, and the
//! difference propagates through the whole tile. What holds is local:
//! every tile is exactly a standalone serial run over its region, and each
//! tile keeps its own mean brightness up to the error dropped on its right
//! and bottom edges.

use rayon::prelude::*;
use tc_core::buffer::{self, Channels};
use tc_core::error::CoreError;

use crate::dispatch::{chunk_ranges, resolve_threads};

/// Seuils ordonnés pour une cellule Braille 2×4, ordre raster (`row * 2 + col`).
///
/// Spread over [16, 240] so a smooth gradient lights dots one by one.
pub const BRAILLE_ORDERED: [u8; 8] = [
    16,  // row 0, col 0
    144, // row 0, col 1
    80,  // row 1, col 0
    208, // row 1, col 1
    112, // row 2, col 0
    240, // row 2, col 1
    48,  // row 3, col 0
    176, // row 3, col 1
];

/// Matrice de Bayer 2×2 mise à l'échelle [0, 255], indexée `[row % 2][col % 2]`.
pub const BAYER_2X2: [[u8; 2]; 2] = [[0, 128], [192, 64]];

/// Smallest automatic tile edge.
pub const TILE_MIN: u32 = 32;
/// Largest automatic tile edge.
pub const TILE_MAX: u32 = 64;

/// Quantization threshold: `>= 128` becomes white.
const QUANT_THRESHOLD: f32 = 128.0;

/// Ordered-dither threshold of a dot in the 2×4 braille cell.
///
/// # Example
/// ```
/// use tc_cells::dither::ordered_threshold;
/// assert_eq!(ordered_threshold(0, 0), 16);
/// assert_eq!(ordered_threshold(3, 1), 176);
/// ```
#[must_use]
#[inline(always)]
pub fn ordered_threshold(row: u32, col: u32) -> u8 {
    BRAILLE_ORDERED[(row * 2 + col) as usize]
}

/// Bayer 2×2 threshold at `(row, col)`.
///
/// # Example
/// ```
/// use tc_cells::dither::bayer_threshold;
/// assert_eq!(bayer_threshold(0, 0), 0);
/// assert_eq!(bayer_threshold(3, 0), 192);
/// ```
#[must_use]
#[inline(always)]
pub fn bayer_threshold(row: u32, col: u32) -> u8 {
    BAYER_2X2[(row % 2) as usize][(col % 2) as usize]
}

/// Serpentine Floyd–Steinberg over a float working buffer, in place.
///
/// After the call every element is exactly 0.0 or 255.0. Even rows scan
/// left to right, odd rows right to left; "ahead" and "behind" follow the
/// scan direction so the 3/16 and 1/16 shares swap sides with it.
fn diffuse_in_place(buf: &mut [f32], width: usize, height: usize) {
    for y in 0..height {
        let ltr = y % 2 == 0;
        let row = y * width;
        for step in 0..width {
            let x = if ltr { step } else { width - 1 - step };
            let idx = row + x;
            let old_px = buf[idx];
            let new_px = if old_px >= QUANT_THRESHOLD { 255.0 } else { 0.0 };
            buf[idx] = new_px;
            let err = old_px - new_px;

            let ahead = if ltr {
                Some(x + 1).filter(|&n| n < width)
            } else {
                x.checked_sub(1)
            };
            let behind = if ltr {
                x.checked_sub(1)
            } else {
                Some(x + 1).filter(|&n| n < width)
            };

            if let Some(nx) = ahead {
                buf[row + nx] += err * 7.0 / 16.0;
            }
            if y + 1 < height {
                let below = row + width;
                if let Some(px) = behind {
                    buf[below + px] += err * 3.0 / 16.0;
                }
                buf[below + x] += err * 5.0 / 16.0;
                if let Some(nx) = ahead {
                    buf[below + nx] += err * 1.0 / 16.0;
                }
            }
        }
    }
}

fn check_gray_io(gray: &[u8], width: u32, height: u32, out: &[u8]) -> Result<usize, CoreError> {
    let expected = buffer::expected_len(width, height, Channels::Gray)?;
    if gray.len() != expected {
        return Err(CoreError::InputSize {
            expected,
            actual: gray.len(),
        });
    }
    buffer::check_pixel_output(expected, out.len())?;
    Ok(expected)
}

/// Floyd–Steinberg série (serpentin) : gris → binaire {0, 255}.
///
/// # Errors
/// Returns a [`CoreError`] when dimensions are zero or slice lengths differ
/// from `width * height`.
///
/// # Example
/// ```
/// use tc_cells::dither::floyd_steinberg;
/// let gray = [0u8, 255, 255, 0];
/// let mut out = [0u8; 4];
/// floyd_steinberg(&gray, 2, 2, &mut out).unwrap();
/// assert_eq!(out, [0, 255, 255, 0]);
/// ```
pub fn floyd_steinberg(gray: &[u8], width: u32, height: u32, out: &mut [u8]) -> Result<(), CoreError> {
    check_gray_io(gray, width, height, out)?;
    let mut buf: Vec<f32> = gray.iter().map(|&g| f32::from(g)).collect();
    diffuse_in_place(&mut buf, width as usize, height as usize);
    for (dst, &v) in out.iter_mut().zip(&buf) {
        *dst = v as u8;
    }
    Ok(())
}

/// Tile edges for the block-parallel variant.
///
/// `0` on an axis means automatic: the image dimension clamped to
/// [`TILE_MIN`, `TILE_MAX`].
///
/// # Example
/// ```
/// use tc_cells::dither::tile_size;
/// assert_eq!(tile_size(640, 20, 0, 0), (64, 32));
/// assert_eq!(tile_size(640, 480, 16, 0), (16, 64));
/// ```
#[must_use]
pub fn tile_size(width: u32, height: u32, tile_w: u32, tile_h: u32) -> (u32, u32) {
    let tw = if tile_w == 0 {
        width.clamp(TILE_MIN, TILE_MAX)
    } else {
        tile_w
    };
    let th = if tile_h == 0 {
        height.clamp(TILE_MIN, TILE_MAX)
    } else {
        tile_h
    };
    (tw, th)
}

/// Floyd–Steinberg par blocs indépendants, répartis sur le pool rayon.
///
/// Each tile gets its own float buffer and runs the serial algorithm from
/// its local origin. Pass `0` for automatic tile edges; `threads` follows
/// [`resolve_threads`] (`0` = every hardware thread). Output does not depend
/// on `threads`.
///
/// # Errors
/// Returns a [`CoreError`] on contract violations.
///
/// # Example
/// ```
/// use tc_cells::dither::{floyd_steinberg, floyd_steinberg_parallel};
/// let gray: Vec<u8> = (0..40 * 40).map(|i| (i % 256) as u8).collect();
/// let mut serial = vec![0u8; gray.len()];
/// let mut tiled = vec![0u8; gray.len()];
/// floyd_steinberg(&gray, 40, 40, &mut serial).unwrap();
/// floyd_steinberg_parallel(&gray, 40, 40, &mut tiled, 0, 0, 0).unwrap();
/// // A single tile covers the whole image: no seam, no difference.
/// assert_eq!(serial, tiled);
/// ```
pub fn floyd_steinberg_parallel(
    gray: &[u8],
    width: u32,
    height: u32,
    out: &mut [u8],
    tile_w: u32,
    tile_h: u32,
    threads: usize,
) -> Result<(), CoreError> {
    check_gray_io(gray, width, height, out)?;
    let (tw, th) = tile_size(width, height, tile_w, tile_h);
    let (w, tw, th) = (width as usize, tw as usize, th as usize);
    let h = height as usize;
    let tiles_x = w.div_ceil(tw);
    let tiles_y = h.div_ceil(th);
    let groups = chunk_ranges(tiles_x * tiles_y, resolve_threads(threads));

    let dither_tile = |t: usize| {
        let x0 = (t % tiles_x) * tw;
        let y0 = (t / tiles_x) * th;
        let bw = tw.min(w - x0);
        let bh = th.min(h - y0);
        let mut buf = Vec::with_capacity(bw * bh);
        for ly in 0..bh {
            let start = (y0 + ly) * w + x0;
            buf.extend(gray[start..start + bw].iter().map(|&g| f32::from(g)));
        }
        diffuse_in_place(&mut buf, bw, bh);
        (x0, y0, bw, buf)
    };

    let tiles: Vec<Vec<_>> = groups
        .into_par_iter()
        .map(|group| group.map(dither_tile).collect())
        .collect();

    for (x0, y0, bw, buf) in tiles.into_iter().flatten() {
        for (ly, line) in buf.chunks_exact(bw).enumerate() {
            let start = (y0 + ly) * w + x0;
            for (dst, &v) in out[start..start + bw].iter_mut().zip(line) {
                *dst = v as u8;
            }
        }
    }
    log::trace!("floyd_steinberg_parallel: {width}x{height}, {tiles_x}x{tiles_y} tuiles de {tw}x{th}");
    Ok(())
}
