use thiserror::Error;

/// Violations of the buffer/dimension contract shared by every pixel operation.
///
/// Capability problems (no GPU, missing vendor tool) never surface here: they
/// degrade to a slower path instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Image width or height is zero, or its byte size overflows `usize`.
    #[error("Dimensions invalides : {width}×{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },

    /// Cell grid has zero columns or rows.
    #[error("Grille de cellules invalide : {cells_w}×{cells_h}")]
    InvalidCellGrid {
        /// Number of cell columns.
        cells_w: u32,
        /// Number of cell rows.
        cells_h: u32,
    },

    /// Input buffer length does not match `width * height * channels`.
    #[error("Taille de buffer d'entrée incorrecte : attendu {expected}, reçu {actual}")]
    InputSize {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },

    /// Output slice length does not match the number of produced elements.
    #[error("Taille de buffer de sortie incorrecte : attendu {expected}, reçu {actual}")]
    OutputSize {
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },
}
