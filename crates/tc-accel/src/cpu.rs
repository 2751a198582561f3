use tc_cells::dispatch::BulkDispatcher;
use tc_cells::dither;
use tc_core::cell::{CellResult, HalfBlockCellResult};
use tc_core::config::AccelConfig;
use tc_core::error::CoreError;
use tc_core::traits::{BatchImage, ComputeBackend};

/// Backend CPU multi-thread. Toujours disponible.
///
/// Cell extraction and grayscale go through the [`BulkDispatcher`];
/// Floyd–Steinberg runs tile-parallel on the rayon pool.
///
/// # Example
/// ```
/// use tc_accel::cpu::CpuBackend;
/// use tc_core::traits::ComputeBackend;
///
/// let backend = CpuBackend::new(2);
/// assert!(backend.is_available());
/// assert!((backend.speedup_factor() - 1.0).abs() < f32::EPSILON);
/// let mut gray = [0u8; 1];
/// backend.grayscale(&[255, 0, 0], 1, 1, &mut gray).unwrap();
/// assert_eq!(gray[0], 76);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct CpuBackend {
    dispatcher: BulkDispatcher,
    tile_width: u32,
    tile_height: u32,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new(0)
    }
}

impl CpuBackend {
    /// `threads = 0` uses every hardware thread. Automatic dither tiles.
    #[must_use]
    pub fn new(threads: usize) -> Self {
        Self {
            dispatcher: BulkDispatcher::new(threads),
            tile_width: 0,
            tile_height: 0,
        }
    }

    /// Threads and dither tile size taken from the configuration.
    #[must_use]
    pub fn from_config(config: &AccelConfig) -> Self {
        Self {
            dispatcher: BulkDispatcher::new(config.threads),
            tile_width: config.tile_width,
            tile_height: config.tile_height,
        }
    }

    /// Effective worker count.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.dispatcher.threads()
    }

    /// Dither tile edges `(w, h)`, `0` = automatic.
    #[must_use]
    pub fn tile_size(&self) -> (u32, u32) {
        (self.tile_width, self.tile_height)
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> String {
        format!("CPU (multi-threaded, {} threads)", self.threads())
    }

    fn is_available(&self) -> bool {
        true
    }

    fn speedup_factor(&self) -> f32 {
        1.0
    }

    fn grayscale(&self, rgb: &[u8], width: u32, height: u32, out: &mut [u8]) -> Result<(), CoreError> {
        self.dispatcher.grayscale(rgb, width, height, out)
    }

    fn grayscale_batch(&self, inputs: &[BatchImage<'_>]) -> Result<Vec<Vec<u8>>, CoreError> {
        self.dispatcher.grayscale_batch(inputs)
    }

    fn floyd_steinberg(&self, gray: &[u8], width: u32, height: u32, out: &mut [u8]) -> Result<(), CoreError> {
        dither::floyd_steinberg_parallel(
            gray,
            width,
            height,
            out,
            self.tile_width,
            self.tile_height,
            self.dispatcher.threads(),
        )
    }

    fn braille_cells_rgb(
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
        self.dispatcher
            .braille_cells_rgb(rgb, width, height, cells_w, cells_h, out, threshold, use_dither, flood)
    }

    fn braille_cells_gray(
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
        self.dispatcher
            .braille_cells_gray(gray, width, height, cells_w, cells_h, out, threshold, use_dither, flood)
    }

    fn braille_cells_bayer(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
        cells_w: u32,
        cells_h: u32,
        out: &mut [CellResult],
    ) -> Result<(), CoreError> {
        self.dispatcher
            .braille_cells_bayer(rgb, width, height, cells_w, cells_h, out)
    }

    fn halfblock_cells_rgb(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
        cells_w: u32,
        cells_h: u32,
        out: &mut [HalfBlockCellResult],
    ) -> Result<(), CoreError> {
        self.dispatcher
            .halfblock_cells_rgb(rgb, width, height, cells_w, cells_h, out)
    }

    fn halfblock_cells_gray(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
        cells_w: u32,
        cells_h: u32,
        out: &mut [HalfBlockCellResult],
    ) -> Result<(), CoreError> {
        self.dispatcher
            .halfblock_cells_gray(gray, width, height, cells_w, cells_h, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_core::pixel::Rgb;

    #[test]
    fn mid_gray_braille_cell() {
        let backend = CpuBackend::new(0);
        let rgb = vec![128u8; 4 * 4 * 3];
        let mut cells = vec![CellResult::default(); 2];
        backend
            .braille_cells_rgb(&rgb, 4, 4, 2, 1, &mut cells, 128, false, false)
            .unwrap();
        assert_eq!(cells[0].pattern, 0xFF);
        assert_eq!(cells[0].on_count, 8);
        assert_eq!(cells[0].avg_color, Rgb::splat(128));
    }

    #[test]
    fn red_over_blue_half_block() {
        let backend = CpuBackend::new(1);
        let rgb = [255, 0, 0, 0, 0, 255];
        let mut cells = [HalfBlockCellResult::default(); 1];
        backend.halfblock_cells_rgb(&rgb, 1, 2, 1, 1, &mut cells).unwrap();
        assert_eq!(cells[0].top, Rgb::new(255, 0, 0));
        assert_eq!(cells[0].bottom, Rgb::new(0, 0, 255));
        assert_eq!(cells[0].top_gray, 76);
        assert_eq!(cells[0].bottom_gray, 29);
    }

    #[test]
    fn dithering_is_binary_and_uses_configured_tiles() {
        let config = AccelConfig {
            threads: 2,
            tile_width: 16,
            tile_height: 16,
            ..AccelConfig::default()
        };
        let backend = CpuBackend::from_config(&config);
        assert_eq!(backend.tile_size(), (16, 16));

        let gray: Vec<u8> = (0..50 * 40).map(|i| (i % 256) as u8).collect();
        let mut out = vec![0u8; gray.len()];
        backend.floyd_steinberg(&gray, 50, 40, &mut out).unwrap();
        assert!(out.iter().all(|&v| v == 0 || v == 255));

        let mut direct = vec![0u8; gray.len()];
        dither::floyd_steinberg_parallel(&gray, 50, 40, &mut direct, 16, 16, 2).unwrap();
        assert_eq!(out, direct);
    }

    #[test]
    fn rgb_dither_goes_through_grayscale() {
        let backend = CpuBackend::new(0);
        let rgb: Vec<u8> = (0..20 * 10 * 3).map(|i| (i * 11 % 256) as u8).collect();
        let mut via_trait = vec![0u8; 200];
        backend.floyd_steinberg_rgb(&rgb, 20, 10, &mut via_trait).unwrap();

        let mut gray = vec![0u8; 200];
        backend.grayscale(&rgb, 20, 10, &mut gray).unwrap();
        let mut expected = vec![0u8; 200];
        backend.floyd_steinberg(&gray, 20, 10, &mut expected).unwrap();
        assert_eq!(via_trait, expected);
    }

    #[test]
    fn oversized_rgb_dither_is_an_error() {
        let backend = CpuBackend::new(1);
        assert!(backend.floyd_steinberg_rgb(&[], 1 << 20, 1 << 20, &mut []).is_err());
        assert!(backend.floyd_steinberg_rgb(&[], u32::MAX, u32::MAX, &mut []).is_err());
    }

    #[test]
    fn name_reports_thread_count() {
        let backend = CpuBackend::new(1);
        assert_eq!(backend.name(), "CPU (multi-threaded, 1 threads)");
    }

    #[test]
    fn zero_sized_input_is_rejected() {
        let backend = CpuBackend::new(0);
        let mut out = [0u8; 0];
        assert!(matches!(
            backend.grayscale(&[], 0, 0, &mut out),
            Err(CoreError::InvalidDimensions { .. })
        ));
    }
}
