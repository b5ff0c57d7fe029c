use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaskTreeError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Shape mismatch in {context}: expected {expected_width}x{expected_height}, found {found_width}x{found_height}")]
    ShapeMismatch {
        context: &'static str,
        expected_width: u32,
        expected_height: u32,
        found_width: u32,
        found_height: u32,
    },

    #[error("Mask selects no pixels")]
    EmptySelection,

    #[error("Contour tracing produced no ring with at least 3 points")]
    NoShape,

    #[error("Seed ({x}, {y}) is not inside the candidate mask")]
    InvalidSeed { x: u32, y: u32 },

    #[error("Geometric computation error: {0}")]
    GeometricComputation(String),

    #[error("Corrupt persisted data: {0}")]
    Corrupt(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Base64 decode error: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl MaskTreeError {
    /// Build a [`MaskTreeError::ShapeMismatch`] from two `(width, height)` pairs.
    pub fn shape_mismatch(context: &'static str, expected: (u32, u32), found: (u32, u32)) -> Self {
        Self::ShapeMismatch {
            context,
            expected_width: expected.0,
            expected_height: expected.1,
            found_width: found.0,
            found_height: found.1,
        }
    }

    /// True for the "nothing to segment/convert" conditions callers skip silently.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::EmptySelection | Self::NoShape)
    }
}

pub type Result<T> = std::result::Result<T, MaskTreeError>;
