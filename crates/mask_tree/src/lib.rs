//! # Hierarchical Mask Vectorization
//!
//! Turns an image plus a flat list of region masks into a tree of colored
//! polygons.
//!
//! ## Core Features
//!
//! - **Flood-fill segmentation**: split a region into color-homogeneous parts
//!   by growing from seeds, with border, size and containment filters
//! - **Mask tree**: organise masks under a background root and refine each
//!   region one level deeper
//! - **Vectorization**: trace every mask into a polygon ring and clip children
//!   to their parents
//! - **Export**: JSON trees, PNG raster, SVG, GeoJSON and centroid lists
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mask_tree::{Pipeline, load_image, load_mask_dir};
//!
//! let image = load_image("photo.png")?;
//! let masks = load_mask_dir("photo_masks")?;
//!
//! let pipeline = Pipeline::builder().build();
//! let output = pipeline.run(&image, masks)?;
//! pipeline.export(&output, "out", "photo")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Working With the Trees
//!
//! ```rust,no_run
//! use mask_tree::{DetailRefiner, FloodFillSegmenter, MaskTree, NodeId, SegmentationConfig};
//! # let image = mask_tree::load_image("photo.png")?;
//! # let masks = mask_tree::load_mask_dir("photo_masks")?;
//!
//! let mut tree = MaskTree::build(&image, masks)?;
//! let segmenter = FloodFillSegmenter::new(SegmentationConfig::new(50, 0.1));
//! DetailRefiner::new(&segmenter).refine(&mut tree, &image, NodeId::ROOT)?;
//!
//! let mut vector = tree.to_vector_tree(5)?;
//! vector.refit_to_parent(true);
//! vector.save_svg("photo.svg")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod algorithms;
pub mod color;
pub mod config;
pub mod error;
pub mod grid;
pub mod io;
pub mod pipeline;
pub mod traits;
pub mod tree;
pub mod typed_geojson;
pub mod types;

pub use algorithms::{FloodFillSegmenter, Segmentation, SegmenterMaskGenerator, to_polygon};
pub use color::ColorStatistic;
pub use config::{ExportOptions, SegmentationConfig};
pub use error::{MaskTreeError, Result};
pub use grid::BoolMask;
pub use io::{load_image, load_mask, load_mask_dir};
pub use pipeline::{Artifact, MaskSet, Pipeline, PipelineOutput, builder::PipelineBuilder};
pub use traits::{MaskGenerator, Segmenter};
pub use tree::{DetailRefiner, MaskNode, MaskTree, NodeId, Synthesis, VectorNode};
pub use types::{Color, Ring};

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgb32FImage};

    /// A red and an orange half side by side, and a stripe across the image.
    fn scene() -> Rgb32FImage {
        Rgb32FImage::from_fn(64, 48, |x, y| {
            if (10..22).contains(&x) && (8..32).contains(&y) {
                Rgb([0.8, 0.2, 0.2])
            } else if (22..34).contains(&x) && (8..32).contains(&y) {
                Rgb([0.8, 0.6, 0.2])
            } else if y >= 40 {
                Rgb([0.2, 0.2, 0.8])
            } else {
                Rgb([0.3, 0.3, 0.3])
            }
        })
    }

    fn config() -> SegmentationConfig {
        SegmentationConfig {
            min_area: 30,
            tolerance: 0.15,
            contrast: None,
            ..SegmentationConfig::default()
        }
    }

    #[test]
    fn test_generator_skips_background_and_stripe() {
        let masks = SegmenterMaskGenerator::new(FloodFillSegmenter::new(config()))
            .generate(&scene())
            .expect("generate");
        assert_eq!(masks.len(), 2);
        assert!(masks.iter().all(|m| m.count() == 12 * 24));
    }

    #[test]
    fn test_block_refined_into_refit_vector_tree() {
        let image = scene();
        let block = BoolMask::from_fn(64, 48, |x, y| (10..34).contains(&x) && (8..32).contains(&y));
        let mut tree = MaskTree::build(&image, [block]).expect("tree");

        let segmenter = FloodFillSegmenter::new(SegmentationConfig {
            border_offset: 0,
            ..config()
        });
        let added = DetailRefiner::new(&segmenter)
            .refine(&mut tree, &image, NodeId::ROOT)
            .expect("refine");
        assert_eq!(added, 2);

        let mut vector = tree.to_vector_tree(5).expect("vector");
        vector.refit_to_parent(true);
        assert_eq!(vector.len(), 4);
        for node in vector.level_order(true) {
            for child in &node.children {
                assert!(node.is_fully_contained(child));
            }
        }

        let raster = vector.to_raster();
        // the root outline runs through the outermost pixel centres
        assert_eq!(raster.dimensions(), (63, 47));
        assert_eq!(*raster.get_pixel(12, 20), Rgb([204, 51, 51]));
        assert_eq!(*raster.get_pixel(30, 20), Rgb([204, 153, 51]));
        assert_eq!(*raster.get_pixel(50, 20), types::color_or_black(tree.root().color));
    }
}
