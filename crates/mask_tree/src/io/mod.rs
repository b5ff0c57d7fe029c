pub mod export;
pub mod geojson;
pub mod load;
pub mod persist;

pub use load::{load_image, load_mask, load_mask_dir, mask_paths};
