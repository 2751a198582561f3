//! Backend GPU (wgpu compute).
//!
//! Only compiled with the `gpu` feature, except [`wire`] which describes the
//! host ↔ kernel data layout and stays testable without a device.
//!
//! ```toml
//! [dependencies]
//! tc-accel = { path = "../tc-accel", features = ["gpu"] }
//! ```
//!
//! Every operation validates its buffers first, then tries the device. Any
//! device-side failure is logged and the same call is served by the CPU
//! backend, so callers never observe a GPU error.

pub mod wire;

#[cfg(feature = "gpu")]
mod context;
#[cfg(feature = "gpu")]
mod kernels;

#[cfg(feature = "gpu")]
pub use context::{GpuContext, GpuError};

#[cfg(feature = "gpu")]
pub use backend::GpuBackend;

#[cfg(feature = "gpu")]
mod backend {
    use tc_core::buffer::{self, PixelBuffer};
    use tc_core::cell::{CellResult, HalfBlockCellResult};
    use tc_core::config::AccelConfig;
    use tc_core::error::CoreError;
    use tc_core::pixel::expand_gray_to_rgb;
    use tc_core::traits::ComputeBackend;

    use super::context::{GpuContext, GpuError};
    use super::kernels::{self, Kernels, Params};
    use super::wire;
    use crate::cpu::CpuBackend;

    /// Relative performance hint reported while a device is active.
    const GPU_SPEEDUP: f32 = 8.0;

    struct Device {
        ctx: GpuContext,
        kernels: Kernels,
    }

    /// Backend GPU avec repli CPU intégré.
    ///
    /// Construction never fails: when no adapter is found or a kernel does
    /// not compile, the backend reports `is_available() == false` and serves
    /// every call on its embedded [`CpuBackend`].
    pub struct GpuBackend {
        device: Option<Device>,
        cpu: CpuBackend,
    }

    impl GpuBackend {
        /// Open the device and compile every kernel.
        #[must_use]
        pub fn new(config: &AccelConfig) -> Self {
            let device = GpuContext::new()
                .and_then(|ctx| Kernels::compile(&ctx).map(|kernels| Device { ctx, kernels }));
            let device = match device {
                Ok(d) => Some(d),
                Err(e) => {
                    log::warn!("Backend GPU indisponible : {e}");
                    None
                }
            };
            Self {
                device,
                cpu: CpuBackend::from_config(config),
            }
        }

        /// Adapter name, if a device is open.
        #[must_use]
        pub fn adapter_name(&self) -> Option<&str> {
            self.device.as_ref().map(|d| d.ctx.info.name.as_str())
        }

        fn with_fallback<T, F, C>(&self, op: &'static str, out: &mut T, gpu: F, cpu: C) -> Result<(), CoreError>
        where
            T: ?Sized,
            F: FnOnce(&Device, &mut T) -> Result<(), GpuError>,
            C: FnOnce(&CpuBackend, &mut T) -> Result<(), CoreError>,
        {
            run_with_fallback(self.device.as_ref(), &self.cpu, op, out, gpu, cpu)
        }

        fn braille(
            device: &Device,
            rgb: &[u8],
            width: u32,
            height: u32,
            cells_w: u32,
            cells_h: u32,
            out: &mut [CellResult],
            threshold: u8,
            mode: u32,
        ) -> Result<(), GpuError> {
            let cells = out.len() as u32;
            let params = Params {
                width,
                height,
                cells_w,
                cells_h,
                threshold: u32::from(threshold),
                mode,
                total: cells,
                _pad: 0,
            };
            let words = device.kernels.run(
                &device.ctx,
                &device.kernels.braille,
                &wire::pack_bytes(rgb),
                &params,
                cells,
                out.len() * wire::WORDS_PER_CELL,
            )?;
            wire::unpack_cells(&words, out, wire::unpack_cell);
            Ok(())
        }

        fn halfblock(
            device: &Device,
            rgb: &[u8],
            width: u32,
            height: u32,
            cells_w: u32,
            cells_h: u32,
            out: &mut [HalfBlockCellResult],
        ) -> Result<(), GpuError> {
            let cells = out.len() as u32;
            let params = Params {
                width,
                height,
                cells_w,
                cells_h,
                total: cells,
                ..Params::default()
            };
            let words = device.kernels.run(
                &device.ctx,
                &device.kernels.halfblock,
                &wire::pack_bytes(rgb),
                &params,
                cells,
                out.len() * wire::WORDS_PER_CELL,
            )?;
            wire::unpack_cells(&words, out, wire::unpack_halfblock);
            Ok(())
        }
    }

    /// Essaie `gpu` sur le périphérique s'il existe, sinon ou en cas d'échec `cpu`.
    ///
    /// `cpu` rewrites the whole of `out`, so a partial device write never leaks.
    fn run_with_fallback<D, T, F, C>(
        device: Option<&D>,
        cpu_backend: &CpuBackend,
        op: &str,
        out: &mut T,
        gpu: F,
        cpu: C,
    ) -> Result<(), CoreError>
    where
        T: ?Sized,
        F: FnOnce(&D, &mut T) -> Result<(), GpuError>,
        C: FnOnce(&CpuBackend, &mut T) -> Result<(), CoreError>,
    {
        if let Some(device) = device {
            match gpu(device, out) {
                Ok(()) => return Ok(()),
                Err(e) => log::warn!("{op}: échec GPU, repli CPU ({e})"),
            }
        }
        cpu(cpu_backend, out)
    }

    fn braille_mode(use_dither: bool, flood: bool) -> u32 {
        if flood {
            kernels::MODE_FLOOD
        } else if use_dither {
            kernels::MODE_ORDERED
        } else {
            kernels::MODE_THRESHOLD
        }
    }

    impl ComputeBackend for GpuBackend {
        fn name(&self) -> String {
            match &self.device {
                Some(d) => format!("GPU wgpu ({}, {:?})", d.ctx.info.name, d.ctx.info.backend),
                None => "GPU wgpu (indisponible)".to_string(),
            }
        }

        fn is_available(&self) -> bool {
            self.device.is_some()
        }

        fn speedup_factor(&self) -> f32 {
            if self.is_available() { GPU_SPEEDUP } else { 0.0 }
        }

        fn grayscale(&self, rgb: &[u8], width: u32, height: u32, out: &mut [u8]) -> Result<(), CoreError> {
            let src = PixelBuffer::rgb(rgb, width, height)?;
            buffer::check_pixel_output(src.pixel_count(), out.len())?;
            self.with_fallback(
                "grayscale",
                out,
                |device, out| {
                    let pixels = out.len() as u32;
                    let params = Params {
                        width,
                        height,
                        total: pixels,
                        ..Params::default()
                    };
                    let words = pixels.div_ceil(4);
                    let result = device.kernels.run(
                        &device.ctx,
                        &device.kernels.grayscale,
                        &wire::pack_bytes(rgb),
                        &params,
                        words,
                        words as usize,
                    )?;
                    wire::unpack_bytes(&result, out);
                    Ok(())
                },
                |cpu, out| cpu.grayscale(rgb, width, height, out),
            )
        }

        fn floyd_steinberg(&self, gray: &[u8], width: u32, height: u32, out: &mut [u8]) -> Result<(), CoreError> {
            // Diffusion par tuiles côté CPU, quel que soit le backend.
            self.cpu.floyd_steinberg(gray, width, height, out)
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
            PixelBuffer::rgb(rgb, width, height)?;
            buffer::check_cell_output(cells_w, cells_h, out.len())?;
            let mode = braille_mode(use_dither, flood);
            self.with_fallback(
                "braille_cells_rgb",
                out,
                |device, out| Self::braille(device, rgb, width, height, cells_w, cells_h, out, threshold, mode),
                |cpu, out| cpu.braille_cells_rgb(rgb, width, height, cells_w, cells_h, out, threshold, use_dither, flood),
            )
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
            PixelBuffer::gray(gray, width, height)?;
            buffer::check_cell_output(cells_w, cells_h, out.len())?;
            let mode = braille_mode(use_dither, flood);
            self.with_fallback(
                "braille_cells_gray",
                out,
                |device, out| {
                    let rgb = expand_gray_to_rgb(gray);
                    Self::braille(device, &rgb, width, height, cells_w, cells_h, out, threshold, mode)
                },
                |cpu, out| cpu.braille_cells_gray(gray, width, height, cells_w, cells_h, out, threshold, use_dither, flood),
            )
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
            PixelBuffer::rgb(rgb, width, height)?;
            buffer::check_cell_output(cells_w, cells_h, out.len())?;
            self.with_fallback(
                "braille_cells_bayer",
                out,
                |device, out| Self::braille(device, rgb, width, height, cells_w, cells_h, out, 0, kernels::MODE_BAYER),
                |cpu, out| cpu.braille_cells_bayer(rgb, width, height, cells_w, cells_h, out),
            )
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
            PixelBuffer::rgb(rgb, width, height)?;
            buffer::check_cell_output(cells_w, cells_h, out.len())?;
            self.with_fallback(
                "halfblock_cells_rgb",
                out,
                |device, out| Self::halfblock(device, rgb, width, height, cells_w, cells_h, out),
                |cpu, out| cpu.halfblock_cells_rgb(rgb, width, height, cells_w, cells_h, out),
            )
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
            PixelBuffer::gray(gray, width, height)?;
            buffer::check_cell_output(cells_w, cells_h, out.len())?;
            self.with_fallback(
                "halfblock_cells_gray",
                out,
                |device, out| {
                    let rgb = expand_gray_to_rgb(gray);
                    Self::halfblock(device, &rgb, width, height, cells_w, cells_h, out)
                },
                |cpu, out| cpu.halfblock_cells_gray(gray, width, height, cells_w, cells_h, out),
            )
        }
    }

}
