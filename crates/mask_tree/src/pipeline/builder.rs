use crate::{
    algorithms::FloodFillSegmenter,
    config::{ExportOptions, SegmentationConfig},
    pipeline::{Artifact, Pipeline},
    traits::Segmenter,
};

/// Builder for creating pipelines with a fluent API
#[derive(Default)]
pub struct PipelineBuilder {
    segmenter: Option<Box<dyn Segmenter>>,
    options: ExportOptions,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all export options at once
    pub fn options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Segmenter for the detail pass; defaults to flood fill with the
    /// options' segmentation settings
    pub fn segmenter<S>(mut self, segmenter: S) -> Self
    where
        S: Segmenter + 'static,
    {
        self.segmenter = Some(Box::new(segmenter));
        self
    }

    pub fn segmentation(mut self, config: SegmentationConfig) -> Self {
        self.options.segmentation = config;
        self
    }

    pub fn pad(mut self, pad: u32) -> Self {
        self.options.pad = pad;
        self
    }

    pub fn refit(mut self, refit: bool) -> Self {
        self.options.refit = refit;
        self
    }

    pub fn root_as_canvas(mut self, root_as_canvas: bool) -> Self {
        self.options.root_as_canvas = root_as_canvas;
        self
    }

    /// Turn one artifact on or off
    pub fn save(mut self, artifact: Artifact, enabled: bool) -> Self {
        let flag = match artifact {
            Artifact::MaskTree => &mut self.options.save_mask_tree,
            Artifact::VectorTree => &mut self.options.save_vector_tree,
            Artifact::Raster => &mut self.options.save_raster,
            Artifact::Centroids => &mut self.options.save_centroids,
            Artifact::Svg => &mut self.options.save_svg,
            Artifact::GeoJson => &mut self.options.save_geojson,
            Artifact::DetailMaskTree => &mut self.options.save_detail_mask_tree,
            Artifact::DetailVectorTree => &mut self.options.save_detail_vector_tree,
            Artifact::DetailRaster => &mut self.options.save_detail_raster,
        };
        *flag = enabled;
        self
    }

    pub fn build(self) -> Pipeline {
        let segmenter = self
            .segmenter
            .unwrap_or_else(|| Box::new(FloodFillSegmenter::new(self.options.segmentation.clone())));
        Pipeline::new(segmenter, self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let pipeline = PipelineBuilder::new().build();
        assert_eq!(pipeline.options(), &ExportOptions::default());
        assert!(pipeline.info().contains("mask_tree"));
    }

    #[test]
    fn test_builder_toggles() {
        let pipeline = Pipeline::builder()
            .pad(2)
            .refit(false)
            .root_as_canvas(true)
            .save(Artifact::Raster, false)
            .save(Artifact::DetailRaster, true)
            .segmentation(SegmentationConfig::new(7, 0.3))
            .build();
        let options = pipeline.options();
        assert_eq!(options.pad, 2);
        assert!(!options.refit);
        assert!(options.root_as_canvas);
        assert!(!options.save_raster);
        assert!(options.needs_detail());
        assert!(pipeline.info().contains("min area 7"));
    }
}
