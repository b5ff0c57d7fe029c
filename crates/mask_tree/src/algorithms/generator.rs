use image::Rgb32FImage;
use tracing::info;

use crate::{
    error::Result,
    grid::BoolMask,
    traits::{MaskGenerator, Segmenter},
};

/// Whole-image masks from a [`Segmenter`], for runs without external masks.
pub struct SegmenterMaskGenerator<S> {
    segmenter: S,
}

impl<S: Segmenter> SegmenterMaskGenerator<S> {
    pub fn new(segmenter: S) -> Self {
        Self { segmenter }
    }
}

impl<S: Segmenter> MaskGenerator for SegmenterMaskGenerator<S> {
    fn generate(&self, image: &Rgb32FImage) -> Result<Vec<BoolMask>> {
        let everything = BoolMask::full(image.width(), image.height());
        let segmentation = self.segmenter.segment_with_remainder(image, &everything)?;
        info!(masks = segmentation.segments.len(), "generated masks");
        Ok(segmentation.segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{algorithms::FloodFillSegmenter, config::SegmentationConfig};
    use image::Rgb;

    #[test]
    fn test_generates_interior_regions() {
        let image = Rgb32FImage::from_fn(40, 40, |x, y| {
            if (5..15).contains(&x) && (5..15).contains(&y) {
                Rgb([1.0, 1.0, 0.0])
            } else if (25..35).contains(&x) && (20..30).contains(&y) {
                Rgb([0.0, 1.0, 1.0])
            } else {
                Rgb([0.0, 0.0, 0.0])
            }
        });
        let generator = SegmenterMaskGenerator::new(FloodFillSegmenter::new(SegmentationConfig {
            min_area: 20,
            contrast: None,
            ..SegmentationConfig::default()
        }));
        let masks = generator.generate(&image).expect("generate");
        assert_eq!(masks.len(), 2);
        assert!(masks[0].get(5, 5));
        assert_eq!(masks[1].count(), 100);
    }
}
