/// Rendu terminal des grilles de cellules termcell.
///
/// Turns `CellResult` / `HalfBlockCellResult` arrays into escape-coded text
/// on any `io::Write`.
pub mod ansi;

pub use ansi::{DotColor, Palette};
