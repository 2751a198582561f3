use crate::buffer::{self, PixelBuffer};
use crate::cell::{CellResult, HalfBlockCellResult};
use crate::error::CoreError;

/// One RGB image of a batch: `(data, width, height)`.
pub type BatchImage<'a> = (&'a [u8], u32, u32);

/// Surface d'exécution des opérations pixel (CPU ou GPU).
///
/// Every method takes the raw input bytes and explicit dimensions, writes into
/// a caller-provided output slice, and keeps no state about image size
/// between calls. Results are identical across implementations, except the
/// Floyd–Steinberg tile seams.
///
/// Implémenté par : `CpuBackend`, `GpuBackend`.
///
/// # Example
/// ```
/// use tc_core::traits::ComputeBackend;
/// use tc_core::cell::{CellResult, HalfBlockCellResult};
/// use tc_core::error::CoreError;
///
/// struct NullBackend;
/// impl ComputeBackend for NullBackend {
///     fn name(&self) -> String { "null".into() }
///     fn is_available(&self) -> bool { false }
///     fn speedup_factor(&self) -> f32 { 0.0 }
///     fn grayscale(&self, _: &[u8], _: u32, _: u32, _: &mut [u8]) -> Result<(), CoreError> { Ok(()) }
///     fn floyd_steinberg(&self, _: &[u8], _: u32, _: u32, _: &mut [u8]) -> Result<(), CoreError> { Ok(()) }
///     fn braille_cells_rgb(&self, _: &[u8], _: u32, _: u32, _: u32, _: u32, _: &mut [CellResult], _: u8, _: bool, _: bool) -> Result<(), CoreError> { Ok(()) }
///     fn braille_cells_gray(&self, _: &[u8], _: u32, _: u32, _: u32, _: u32, _: &mut [CellResult], _: u8, _: bool, _: bool) -> Result<(), CoreError> { Ok(()) }
///     fn braille_cells_bayer(&self, _: &[u8], _: u32, _: u32, _: u32, _: u32, _: &mut [CellResult]) -> Result<(), CoreError> { Ok(()) }
///     fn halfblock_cells_rgb(&self, _: &[u8], _: u32, _: u32, _: u32, _: u32, _: &mut [HalfBlockCellResult]) -> Result<(), CoreError> { Ok(()) }
///     fn halfblock_cells_gray(&self, _: &[u8], _: u32, _: u32, _: u32, _: u32, _: &mut [HalfBlockCellResult]) -> Result<(), CoreError> { Ok(()) }
/// }
/// assert!(!NullBackend.is_available());
/// ```
pub trait ComputeBackend: Send + Sync {
    /// Nom lisible pour le debug/UI.
    fn name(&self) -> String;

    /// Whether the backend can execute work on its own device.
    fn is_available(&self) -> bool;

    /// Self-reported relative performance hint. CPU = 1.0. Not a guarantee.
    fn speedup_factor(&self) -> f32;

    /// RGB → gray, `out.len() == width * height`.
    ///
    /// # Errors
    /// Contract violations only (zero size, wrong slice lengths).
    fn grayscale(&self, rgb: &[u8], width: u32, height: u32, out: &mut [u8])
    -> Result<(), CoreError>;

    /// Independent grayscale conversion of several RGB images.
    ///
    /// # Errors
    /// Fails on the first image violating the buffer contract.
    fn grayscale_batch(&self, inputs: &[BatchImage<'_>]) -> Result<Vec<Vec<u8>>, CoreError> {
        inputs
            .iter()
            .map(|&(data, width, height)| {
                let src = PixelBuffer::rgb(data, width, height)?;
                let mut out = vec![0u8; src.pixel_count()];
                self.grayscale(data, width, height, &mut out)?;
                Ok(out)
            })
            .collect()
    }

    /// Floyd–Steinberg gray → binary (0/255).
    ///
    /// # Errors
    /// Contract violations only.
    fn floyd_steinberg(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
        out: &mut [u8],
    ) -> Result<(), CoreError>;

    /// Gray-converts an RGB buffer, then dithers it.
    ///
    /// # Errors
    /// Contract violations only.
    fn floyd_steinberg_rgb(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
        out: &mut [u8],
    ) -> Result<(), CoreError> {
        // Buffers validés avant toute allocation.
        let src = PixelBuffer::rgb(rgb, width, height)?;
        buffer::check_pixel_output(src.pixel_count(), out.len())?;
        let mut gray = vec![0u8; src.pixel_count()];
        self.grayscale(rgb, width, height, &mut gray)?;
        self.floyd_steinberg(&gray, width, height, out)
    }

    /// Braille cells from RGB. `flood` wins over `use_dither`, which wins over `threshold`.
    ///
    /// # Errors
    /// Contract violations only.
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
    ) -> Result<(), CoreError>;

    /// Braille cells from a grayscale buffer.
    ///
    /// # Errors
    /// Contract violations only.
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
    ) -> Result<(), CoreError>;

    /// Braille cells lit through the 2×2 Bayer matrix.
    ///
    /// # Errors
    /// Contract violations only.
    fn braille_cells_bayer(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
        cells_w: u32,
        cells_h: u32,
        out: &mut [CellResult],
    ) -> Result<(), CoreError>;

    /// Half-block cells from RGB.
    ///
    /// # Errors
    /// Contract violations only.
    fn halfblock_cells_rgb(
        &self,
        rgb: &[u8],
        width: u32,
        height: u32,
        cells_w: u32,
        cells_h: u32,
        out: &mut [HalfBlockCellResult],
    ) -> Result<(), CoreError>;

    /// Half-block cells from a grayscale buffer.
    ///
    /// # Errors
    /// Contract violations only.
    fn halfblock_cells_gray(
        &self,
        gray: &[u8],
        width: u32,
        height: u32,
        cells_w: u32,
        cells_h: u32,
        out: &mut [HalfBlockCellResult],
    ) -> Result<(), CoreError>;
}
