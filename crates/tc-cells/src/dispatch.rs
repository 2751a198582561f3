//! Répartition des opérations en masse sur plusieurs threads.
//!
//! Every output element depends only on read-only input, so the output slice
//! is split into contiguous chunks and each chunk goes to one scoped worker.
//! Results are identical for any thread count.

use std::num::NonZeroUsize;
use std::ops::Range;

use rayon::prelude::*;
use tc_core::buffer::{self, PixelBuffer};
use tc_core::cell::{CellResult, HalfBlockCellResult};
use tc_core::error::CoreError;
use tc_core::pixel::to_gray;
use tc_core::traits::BatchImage;

use crate::braille::{self, LightingPolicy};
use crate::halfblock;

/// Worker count used when the platform cannot report its parallelism.
pub const FALLBACK_THREADS: usize = 4;

/// Effective worker count: `min(requested, hardware)`, `0` meaning "all".
///
/// # Example
/// ```
/// use tc_cells::dispatch::resolve_threads;
/// assert_eq!(resolve_threads(1), 1);
/// assert!(resolve_threads(0) >= 1);
/// ```
#[must_use]
pub fn resolve_threads(requested: usize) -> usize {
    let hw = std::thread::available_parallelism().map_or(FALLBACK_THREADS, NonZeroUsize::get);
    if requested == 0 { hw } else { requested.min(hw) }
}

/// Contiguous ranges of at most `ceil(n / threads)` elements covering `0..n`.
///
/// # Example
/// ```
/// use tc_cells::dispatch::chunk_ranges;
/// assert_eq!(chunk_ranges(10, 4), vec![0..3, 3..6, 6..9, 9..10]);
/// assert!(chunk_ranges(0, 4).is_empty());
/// ```
#[must_use]
pub fn chunk_ranges(n: usize, threads: usize) -> Vec<Range<usize>> {
    if n == 0 {
        return Vec::new();
    }
    let chunk = n.div_ceil(threads.max(1));
    (0..n)
        .step_by(chunk)
        .map(|start| start..(start + chunk).min(n))
        .collect()
}

/// Exécuteur CPU des opérations en masse.
///
/// # Example
/// ```
/// use tc_cells::dispatch::BulkDispatcher;
/// use tc_core::cell::CellResult;
///
/// let dispatcher = BulkDispatcher::new(0);
/// let rgb = vec![128u8; 4 * 4 * 3];
/// let mut cells = vec![CellResult::default(); 2];
/// dispatcher.braille_cells_rgb(&rgb, 4, 4, 2, 1, &mut cells, 128, false, false).unwrap();
/// assert!(cells.iter().all(|c| c.pattern == 0xFF));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct BulkDispatcher {
    threads: usize,
}

impl Default for BulkDispatcher {
    fn default() -> Self {
        Self::new(0)
    }
}

impl BulkDispatcher {
    /// `requested = 0` selects every available hardware thread.
    #[must_use]
    pub fn new(requested: usize) -> Self {
        Self {
            threads: resolve_threads(requested),
        }
    }

    /// Effective worker count.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// `out[i] = f(i)` for every index, chunks spread over scoped workers.
    pub fn fill<T, F>(&self, out: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        let n = out.len();
        if n == 0 {
            return;
        }
        let workers = self.threads.min(n);
        if workers <= 1 {
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = f(i);
            }
            return;
        }
        let f = &f;
        std::thread::scope(|s| {
            let mut rest = out;
            for range in chunk_ranges(n, workers) {
                let (part, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
                rest = tail;
                s.spawn(move || {
                    for (slot, i) in part.iter_mut().zip(range) {
                        *slot = f(i);
                    }
                });
            }
        });
    }

    /// RGB → gray, one output byte per pixel.
    ///
    /// # Errors
    /// Returns a [`CoreError`] on zero dimensions or slice length mismatch.
    pub fn grayscale(&self, rgb: &[u8], width: u32, height: u32, out: &mut [u8]) -> Result<(), CoreError> {
        let src = PixelBuffer::rgb(rgb, width, height)?;
        buffer::check_pixel_output(src.pixel_count(), out.len())?;
        let data = src.data();
        self.fill(out, |i| {
            let p = i * 3;
            to_gray(data[p], data[p + 1], data[p + 2])
        });
        Ok(())
    }

    /// Independent grayscale of each image; images are spread over the rayon pool.
    ///
    /// # Errors
    /// Fails if any image violates the buffer contract.
    pub fn grayscale_batch(&self, inputs: &[BatchImage<'_>]) -> Result<Vec<Vec<u8>>, CoreError> {
        inputs
            .par_iter()
            .map(|&(data, width, height)| -> Result<Vec<u8>, CoreError> {
                let src = PixelBuffer::rgb(data, width, height)?;
                Ok(src
                    .data()
                    .chunks_exact(3)
                    .map(|p| to_gray(p[0], p[1], p[2]))
                    .collect())
            })
            .collect()
    }

    /// Braille cells over any pixel view with an explicit lighting policy.
    ///
    /// # Errors
    /// Returns a [`CoreError`] if the cell grid is empty or `out` is mis-sized.
    pub fn braille_cells(
        &self,
        src: &PixelBuffer<'_>,
        cells_w: u32,
        cells_h: u32,
        policy: LightingPolicy,
        out: &mut [CellResult],
    ) -> Result<(), CoreError> {
        buffer::check_cell_output(cells_w, cells_h, out.len())?;
        let cw = cells_w as usize;
        self.fill(out, |i| {
            braille::process_cell(src, (i % cw) as u32, (i / cw) as u32, policy)
        });
        Ok(())
    }

    /// Braille cells from RGB, flags resolved by [`LightingPolicy::from_flags`].
    ///
    /// # Errors
    /// Contract violations only.
    pub fn braille_cells_rgb(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
        cells_w: u32,
        cells_h: u32,
        out: &mut [CellResult],
        threshold: u8,
        use_dither: bool,
        flood: bool,
    ) -> Result<(), CoreError> {
        let src = PixelBuffer::rgb(rgb, width, height)?;
        let policy = LightingPolicy::from_flags(threshold, use_dither, flood);
        self.braille_cells(&src, cells_w, cells_h, policy, out)
    }

    /// Braille cells from gray; colours are the gray value replicated.
    ///
    /// # Errors
    /// Contract violations only.
    pub fn braille_cells_gray(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
        cells_w: u32,
        cells_h: u32,
        out: &mut [CellResult],
        threshold: u8,
        use_dither: bool,
        flood: bool,
    ) -> Result<(), CoreError> {
        let src = PixelBuffer::gray(gray, width, height)?;
        let policy = LightingPolicy::from_flags(threshold, use_dither, flood);
        self.braille_cells(&src, cells_w, cells_h, policy, out)
    }

    /// Braille cells lit through the 2×2 Bayer matrix.
    ///
    /// # Errors
    /// Contract violations only.
    pub fn braille_cells_bayer(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
        cells_w: u32,
        cells_h: u32,
        out: &mut [CellResult],
    ) -> Result<(), CoreError> {
        let src = PixelBuffer::rgb(rgb, width, height)?;
        self.braille_cells(&src, cells_w, cells_h, LightingPolicy::Bayer, out)
    }

    /// Half-block cells over any pixel view.
    ///
    /// # Errors
    /// Contract violations only.
    pub fn halfblock_cells(
        &self,
        src: &PixelBuffer<'_>,
        cells_w: u32,
        cells_h: u32,
        out: &mut [HalfBlockCellResult],
    ) -> Result<(), CoreError> {
        buffer::check_cell_output(cells_w, cells_h, out.len())?;
        let cw = cells_w as usize;
        self.fill(out, |i| halfblock::process_cell(src, (i % cw) as u32, (i / cw) as u32));
        Ok(())
    }

    /// Half-block cells from RGB.
    ///
    /// # Errors
    /// Contract violations only.
    pub fn halfblock_cells_rgb(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
        cells_w: u32,
        cells_h: u32,
        out: &mut [HalfBlockCellResult],
    ) -> Result<(), CoreError> {
        let src = PixelBuffer::rgb(rgb, width, height)?;
        self.halfblock_cells(&src, cells_w, cells_h, out)
    }

    /// Half-block cells from gray.
    ///
    /// # Errors
    /// Contract violations only.
    pub fn halfblock_cells_gray(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
        cells_w: u32,
        cells_h: u32,
        out: &mut [HalfBlockCellResult],
    ) -> Result<(), CoreError> {
        let src = PixelBuffer::gray(gray, width, height)?;
        self.halfblock_cells(&src, cells_w, cells_h, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_core::pixel::Rgb;

    fn noise_rgb(w: u32, h: u32) -> Vec<u8> {
        let mut state = 0x1234_5678u32;
        (0..w * h * 3)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect()
    }

    fn forced(threads: usize) -> BulkDispatcher {
        BulkDispatcher { threads }
    }

    #[test]
    fn chunks_cover_everything_once() {
        for n in [1, 7, 64, 1000] {
            for t in [1, 3, 8] {
                let ranges = chunk_ranges(n, t);
                assert!(ranges.len() <= t);
                assert_eq!(ranges.first().map(|r| r.start), Some(0));
                assert_eq!(ranges.last().map(|r| r.end), Some(n));
                for pair in ranges.windows(2) {
                    assert_eq!(pair[0].end, pair[1].start);
                }
            }
        }
    }

    #[test]
    fn requested_threads_never_exceed_hardware() {
        let hw = resolve_threads(0);
        assert_eq!(resolve_threads(usize::MAX), hw);
        assert_eq!(BulkDispatcher::new(1).threads(), 1);
    }

    #[test]
    fn fill_handles_more_workers_than_items() {
        let mut out = [0usize; 3];
        forced(16).fill(&mut out, |i| i * 10);
        assert_eq!(out, [0, 10, 20]);
    }

    #[test]
    fn grayscale_is_thread_count_invariant() {
        let rgb = noise_rgb(37, 23);
        let mut one = vec![0u8; 37 * 23];
        let mut many = vec![0u8; 37 * 23];
        forced(1).grayscale(&rgb, 37, 23, &mut one).unwrap();
        forced(8).grayscale(&rgb, 37, 23, &mut many).unwrap();
        assert_eq!(one, many);
        assert_eq!(one[0], to_gray(rgb[0], rgb[1], rgb[2]));
    }

    #[test]
    fn braille_is_thread_count_invariant() {
        let rgb = noise_rgb(41, 30);
        let (cw, ch) = (21, 8);
        for (threshold, dither, flood) in [(128, false, false), (60, true, false), (0, false, true)] {
            let mut one = vec![CellResult::default(); cw * ch];
            let mut many = vec![CellResult::default(); cw * ch];
            forced(1)
                .braille_cells_rgb(&rgb, 41, 30, cw as u32, ch as u32, &mut one, threshold, dither, flood)
                .unwrap();
            forced(8)
                .braille_cells_rgb(&rgb, 41, 30, cw as u32, ch as u32, &mut many, threshold, dither, flood)
                .unwrap();
            assert_eq!(one, many);
        }
    }

    #[test]
    fn halfblock_and_bayer_are_thread_count_invariant() {
        let rgb = noise_rgb(19, 13);
        let mut one = vec![HalfBlockCellResult::default(); 19 * 7];
        let mut many = vec![HalfBlockCellResult::default(); 19 * 7];
        forced(1).halfblock_cells_rgb(&rgb, 19, 13, 19, 7, &mut one).unwrap();
        forced(8).halfblock_cells_rgb(&rgb, 19, 13, 19, 7, &mut many).unwrap();
        assert_eq!(one, many);
        assert_eq!(one[19 * 6].bottom, Rgb::default());

        let mut one = vec![CellResult::default(); 10 * 4];
        let mut many = vec![CellResult::default(); 10 * 4];
        forced(1).braille_cells_bayer(&rgb, 19, 13, 10, 4, &mut one).unwrap();
        forced(8).braille_cells_bayer(&rgb, 19, 13, 10, 4, &mut many).unwrap();
        assert_eq!(one, many);
    }

    #[test]
    fn flood_reports_full_pattern() {
        let rgb = vec![0u8; 8 * 8 * 3];
        let mut cells = vec![CellResult::default(); 16];
        forced(4)
            .braille_cells_rgb(&rgb, 8, 8, 4, 2, &mut cells, 255, true, true)
            .unwrap();
        assert!(cells.iter().all(|c| c.pattern == 0xFF && c.on_count == 8));
    }

    #[test]
    fn grid_larger_than_image_yields_empty_cells() {
        let rgb = vec![255u8; 2 * 4 * 3];
        let mut cells = vec![CellResult::default(); 3];
        forced(2)
            .braille_cells_rgb(&rgb, 2, 4, 3, 1, &mut cells, 128, false, false)
            .unwrap();
        assert_eq!(cells[0].on_count, 8);
        assert_eq!(cells[1], CellResult::default());
        assert_eq!(cells[2], CellResult::default());
    }

    #[test]
    fn gray_entry_points_match_replicated_rgb() {
        let gray: Vec<u8> = (0..20 * 12).map(|i| (i * 13 % 256) as u8).collect();
        let rgb: Vec<u8> = gray.iter().flat_map(|&g| [g, g, g]).collect();
        let d = forced(3);

        let mut a = vec![CellResult::default(); 10 * 3];
        let mut b = vec![CellResult::default(); 10 * 3];
        d.braille_cells_gray(&gray, 20, 12, 10, 3, &mut a, 100, true, false).unwrap();
        d.braille_cells_rgb(&rgb, 20, 12, 10, 3, &mut b, 100, true, false).unwrap();
        assert_eq!(a, b);

        let mut a = vec![HalfBlockCellResult::default(); 20 * 6];
        let mut b = vec![HalfBlockCellResult::default(); 20 * 6];
        d.halfblock_cells_gray(&gray, 20, 12, 20, 6, &mut a).unwrap();
        d.halfblock_cells_rgb(&rgb, 20, 12, 20, 6, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn batch_matches_single_calls() {
        let a = noise_rgb(5, 4);
        let b = noise_rgb(3, 9);
        let batch = forced(2).grayscale_batch(&[(a.as_slice(), 5, 4), (b.as_slice(), 3, 9)]).unwrap();
        assert_eq!(batch.len(), 2);
        let mut single = vec![0u8; 27];
        forced(2).grayscale(&b, 3, 9, &mut single).unwrap();
        assert_eq!(batch[1], single);
        assert!(forced(1).grayscale_batch(&[]).unwrap().is_empty());
    }

    #[test]
    fn contract_violations_are_errors() {
        let d = forced(2);
        let mut cells = vec![CellResult::default(); 4];
        assert!(matches!(
            d.braille_cells_rgb(&[0; 12], 2, 2, 2, 1, &mut cells, 0, false, false),
            Err(CoreError::OutputSize { expected: 2, actual: 4 })
        ));
        assert!(matches!(
            d.braille_cells_rgb(&[0; 12], 2, 2, 0, 4, &mut cells, 0, false, false),
            Err(CoreError::InvalidCellGrid { .. })
        ));
        let mut out = [0u8; 4];
        assert!(matches!(
            d.grayscale(&[0; 11], 2, 2, &mut out),
            Err(CoreError::InputSize { expected: 12, actual: 11 })
        ));
        assert!(d.grayscale_batch(&[(&[0u8; 3][..], 0, 1)]).is_err());
    }
}
