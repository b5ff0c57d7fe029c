use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Construction-time settings for a segmenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Segments with fewer pixels than this go to the remainder
    #[schemars(range(min = 1))]
    pub min_area: usize,
    /// Color distance to the seed below which a pixel joins the region
    #[schemars(range(min = 0.0))]
    pub tolerance: f32,
    /// Width of the band along each image edge used for border rejection
    pub border_offset: u32,
    /// Sigmoid steepness applied after stretching; `None` disables the boost
    pub contrast: Option<f32>,
    /// Also put segments dropped by the containment filter into the remainder
    pub fold_duplicates_into_remainder: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            min_area: 50,
            tolerance: 0.1,
            border_offset: 5,
            contrast: Some(10.0),
            fold_duplicates_into_remainder: false,
        }
    }
}

impl SegmentationConfig {
    pub fn new(min_area: usize, tolerance: f32) -> Self {
        Self {
            min_area,
            tolerance,
            ..Self::default()
        }
    }
}

/// Which artifacts an export writes, and how the trees behind them are made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExportOptions {
    pub save_mask_tree: bool,
    pub save_vector_tree: bool,
    pub save_raster: bool,
    pub save_centroids: bool,
    pub save_svg: bool,
    pub save_geojson: bool,
    pub save_detail_mask_tree: bool,
    pub save_detail_vector_tree: bool,
    pub save_detail_raster: bool,
    /// Background padding used when tracing contours
    pub pad: u32,
    /// Clip every child polygon to its parent before export
    pub refit: bool,
    /// Use the full image rectangle as the root polygon instead of tracing
    /// the unclaimed mask
    pub root_as_canvas: bool,
    /// Settings for the detail pass
    pub segmentation: SegmentationConfig,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            save_mask_tree: true,
            save_vector_tree: true,
            save_raster: true,
            save_centroids: true,
            save_svg: false,
            save_geojson: false,
            save_detail_mask_tree: false,
            save_detail_vector_tree: false,
            save_detail_raster: false,
            pad: 5,
            refit: true,
            root_as_canvas: false,
            segmentation: SegmentationConfig::default(),
        }
    }
}

impl ExportOptions {
    /// Whether any artifact needs the detail pass.
    pub fn needs_detail(&self) -> bool {
        self.save_detail_mask_tree || self.save_detail_vector_tree || self.save_detail_raster
    }
}
