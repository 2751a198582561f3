/// Moteur de conversion pixels → cellules terminal.
///
/// Braille (2×4 dots) and half-block (1×2) cell extraction, ordered and
/// error-diffusion dithering, and the multi-threaded bulk dispatcher used by
/// the CPU backend.
pub mod braille;
pub mod dispatch;
pub mod dither;
pub mod halfblock;

pub use braille::LightingPolicy;
pub use dispatch::BulkDispatcher;
