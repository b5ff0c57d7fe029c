use image::Rgb32FImage;

use crate::{
    algorithms::Segmentation,
    config::SegmentationConfig,
    error::Result,
    grid::BoolMask,
};

/// Region-growing strategy that splits a mask into color-homogeneous parts
pub trait Segmenter: Send + Sync {
    /// Settings this segmenter was built with
    fn config(&self) -> &SegmentationConfig;

    /// Split `mask` into disjoint regions covering it, in discovery order.
    /// A mask selecting no pixels is `MaskTreeError::EmptySelection`.
    fn segment(&self, image: &Rgb32FImage, mask: &BoolMask) -> Result<Vec<BoolMask>>;

    /// Segment, then sort candidates into accepted regions and a remainder
    fn segment_with_remainder(&self, image: &Rgb32FImage, mask: &BoolMask) -> Result<Segmentation> {
        let candidates = self.segment(image, mask)?;
        Ok(Segmentation::from_candidates(
            candidates,
            mask.dimensions(),
            self.config(),
        ))
    }
}

/// Source of the initial flat mask list for an image
pub trait MaskGenerator: Send + Sync {
    fn generate(&self, image: &Rgb32FImage) -> Result<Vec<BoolMask>>;
}
