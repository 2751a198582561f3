/// Backends de calcul et sélection matérielle pour termcell.
///
/// The CPU backend is always built; the wgpu backend sits behind the `gpu`
/// feature. `detect` queries vendor tools and ffmpeg encoders, `factory`
/// picks the process-wide backend once.
pub mod cpu;
pub mod detect;
pub mod factory;
pub mod gpu;

pub use cpu::CpuBackend;
pub use factory::{BackendState, current_backend, get_best_backend};
#[cfg(feature = "gpu")]
pub use gpu::GpuBackend;
