pub mod extraction;
pub mod filtering;
pub mod flood_fill;
pub mod generator;
pub mod refit;

pub use extraction::to_polygon;
pub use filtering::Segmentation;
pub use flood_fill::FloodFillSegmenter;
pub use generator::SegmenterMaskGenerator;
pub use refit::{repair, robust_intersection};
