//! Format d'échange hôte ↔ kernels GPU.
//!
//! WGSL storage buffers have no `u8` type, so every byte stream crosses the
//! bus packed four-per-word, little-endian. Each cell comes back as two
//! words, i.e. eight bytes:
//!
//! ```text
//! braille    [pattern, on_count, avg_r, avg_g, avg_b, all_r, all_g, all_b]
//! half-block [top_r, top_g, top_b, top_gray, bot_r, bot_g, bot_b, bot_gray]
//! ```
//!
//! The shaders in `shaders/` write exactly these layouts. Invocations are
//! laid out on a 2D workgroup grid and flattened back in the kernels.

use tc_core::cell::{CellResult, HalfBlockCellResult};
use tc_core::pixel::Rgb;

/// `u32` words per cell in the readback buffer.
pub const WORDS_PER_CELL: usize = 2;

/// Invocations per workgroup, fixed in every kernel.
pub const WORKGROUP_SIZE: u32 = 256;

/// Workgroup grid `(x, y)` covering `invocations`, each axis at most
/// `max_per_dim`. `None` when even the 2D grid is too small.
///
/// # Example
/// ```
/// use tc_accel::gpu::wire::dispatch_grid;
/// assert_eq!(dispatch_grid(1000, 65535), Some((4, 1)));
/// assert_eq!(dispatch_grid(256 * 70_000, 65535), Some((65535, 2)));
/// assert_eq!(dispatch_grid(u32::MAX, 16), None);
/// ```
#[must_use]
pub fn dispatch_grid(invocations: u32, max_per_dim: u32) -> Option<(u32, u32)> {
    let groups = invocations.div_ceil(WORKGROUP_SIZE).max(1);
    if groups <= max_per_dim {
        return Some((groups, 1));
    }
    let rows = groups.div_ceil(max_per_dim);
    (rows <= max_per_dim).then_some((max_per_dim, rows))
}

/// Pack bytes into little-endian words, zero-padding the last one.
///
/// # Example
/// ```
/// use tc_accel::gpu::wire::pack_bytes;
/// assert_eq!(pack_bytes(&[1, 2, 3, 4, 5]), vec![0x0403_0201, 0x0000_0005]);
/// ```
#[must_use]
pub fn pack_bytes(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks(4)
        .map(|c| {
            let mut word = [0u8; 4];
            word[..c.len()].copy_from_slice(c);
            u32::from_le_bytes(word)
        })
        .collect()
}

/// Unpack little-endian words into `out`, ignoring trailing padding.
pub fn unpack_bytes(words: &[u32], out: &mut [u8]) {
    for (chunk, word) in out.chunks_mut(4).zip(words) {
        let bytes = word.to_le_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
    }
}

fn to_words(b: [u8; 8]) -> [u32; 2] {
    [
        u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        u32::from_le_bytes([b[4], b[5], b[6], b[7]]),
    ]
}

fn to_bytes(w: [u32; 2]) -> [u8; 8] {
    let [a, b, c, d] = w[0].to_le_bytes();
    let [e, f, g, h] = w[1].to_le_bytes();
    [a, b, c, d, e, f, g, h]
}

/// Braille cell → two wire words.
#[must_use]
pub fn pack_cell(cell: &CellResult) -> [u32; 2] {
    let (l, a) = (cell.avg_color, cell.avg_all_color);
    to_words([cell.pattern, cell.on_count, l.r, l.g, l.b, a.r, a.g, a.b])
}

/// Two wire words → braille cell.
///
/// # Example
/// ```
/// use tc_accel::gpu::wire::unpack_cell;
/// let cell = unpack_cell([0x8080_08FF, 0x8080_8080]);
/// assert_eq!(cell.pattern, 0xFF);
/// assert_eq!(cell.on_count, 8);
/// assert_eq!(cell.avg_color.r, 128);
/// ```
#[must_use]
pub fn unpack_cell(words: [u32; 2]) -> CellResult {
    let b = to_bytes(words);
    CellResult {
        pattern: b[0],
        on_count: b[1],
        avg_color: Rgb::new(b[2], b[3], b[4]),
        avg_all_color: Rgb::new(b[5], b[6], b[7]),
    }
}

/// Half-block cell → two wire words.
#[must_use]
pub fn pack_halfblock(cell: &HalfBlockCellResult) -> [u32; 2] {
    let (t, b) = (cell.top, cell.bottom);
    to_words([t.r, t.g, t.b, cell.top_gray, b.r, b.g, b.b, cell.bottom_gray])
}

/// Two wire words → half-block cell.
#[must_use]
pub fn unpack_halfblock(words: [u32; 2]) -> HalfBlockCellResult {
    let b = to_bytes(words);
    HalfBlockCellResult {
        top: Rgb::new(b[0], b[1], b[2]),
        top_gray: b[3],
        bottom: Rgb::new(b[4], b[5], b[6]),
        bottom_gray: b[7],
    }
}

/// Decode a readback buffer of `out.len()` cells.
pub fn unpack_cells<T>(words: &[u32], out: &mut [T], decode: impl Fn([u32; 2]) -> T) {
    for (slot, pair) in out.iter_mut().zip(words.chunks_exact(WORDS_PER_CELL)) {
        *slot = decode([pair[0], pair[1]]);
    }
}
