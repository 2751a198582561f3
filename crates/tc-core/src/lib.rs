/// Types partagés, contrat des backends et configuration pour termcell.
///
/// This crate holds the pixel primitives, the cell result types, the
/// `ComputeBackend` trait and the TOML configuration used across the
/// termcell workspace.

pub mod buffer;
pub mod cell;
pub mod config;
pub mod error;
pub mod pixel;
pub mod traits;

pub use buffer::{Channels, PixelBuffer};
pub use cell::{CellResult, HalfBlockCellResult};
pub use config::AccelConfig;
pub use error::CoreError;
pub use pixel::{Rgb, to_gray};
pub use traits::ComputeBackend;
