pub mod builder;
pub mod mask_set;

use std::path::{Path, PathBuf};

use image::Rgb32FImage;
use strum::{Display, EnumIter, IntoEnumIterator};
use tracing::info;

use crate::{
    config::ExportOptions,
    error::Result,
    grid::BoolMask,
    traits::Segmenter,
    tree::{DetailRefiner, MaskTree, NodeId, VectorNode},
};

pub use mask_set::MaskSet;

/// A file the pipeline can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Artifact {
    MaskTree,
    VectorTree,
    Raster,
    Centroids,
    Svg,
    GeoJson,
    DetailMaskTree,
    DetailVectorTree,
    DetailRaster,
}

impl Artifact {
    /// File name for an image called `name`.
    pub fn file_name(self, name: &str) -> String {
        match self {
            Self::MaskTree => format!("{name}_mask_tree.json"),
            Self::VectorTree => format!("{name}_vector_tree.json"),
            Self::Raster => format!("{name}.png"),
            Self::Centroids => format!("{name}_centroids.json"),
            Self::Svg => format!("{name}.svg"),
            Self::GeoJson => format!("{name}.geojson"),
            Self::DetailMaskTree => format!("{name}_detail_mask_tree.json"),
            Self::DetailVectorTree => format!("{name}_detail_vector_tree.json"),
            Self::DetailRaster => format!("{name}_detail.png"),
        }
    }

    pub fn is_enabled(self, options: &ExportOptions) -> bool {
        match self {
            Self::MaskTree => options.save_mask_tree,
            Self::VectorTree => options.save_vector_tree,
            Self::Raster => options.save_raster,
            Self::Centroids => options.save_centroids,
            Self::Svg => options.save_svg,
            Self::GeoJson => options.save_geojson,
            Self::DetailMaskTree => options.save_detail_mask_tree,
            Self::DetailVectorTree => options.save_detail_vector_tree,
            Self::DetailRaster => options.save_detail_raster,
        }
    }
}

/// Trees produced for one image.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub mask_tree: MaskTree,
    pub vector_tree: VectorNode,
    /// Present when the options ask for a detail artifact
    pub detail: Option<DetailOutput>,
}

#[derive(Debug, Clone)]
pub struct DetailOutput {
    pub mask_tree: MaskTree,
    pub vector_tree: VectorNode,
}

/// Mask list in, trees and export files out
pub struct Pipeline {
    segmenter: Box<dyn Segmenter>,
    options: ExportOptions,
}

impl Pipeline {
    pub fn builder() -> builder::PipelineBuilder {
        builder::PipelineBuilder::new()
    }

    pub fn new(segmenter: Box<dyn Segmenter>, options: ExportOptions) -> Self {
        Self { segmenter, options }
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Build the mask tree, vectorize it, and when needed run the detail pass
    /// on a copy and vectorize that as well.
    pub fn run(&self, image: &Rgb32FImage, masks: Vec<BoolMask>) -> Result<PipelineOutput> {
        let mask_tree = MaskTree::build(image, masks)?;
        let vector_tree = self.vectorize(&mask_tree)?;

        let detail = if self.options.needs_detail() {
            let mut detailed = mask_tree.clone();
            DetailRefiner::new(self.segmenter.as_ref()).refine(&mut detailed, image, NodeId::ROOT)?;
            let vector_tree = self.vectorize(&detailed)?;
            Some(DetailOutput {
                mask_tree: detailed,
                vector_tree,
            })
        } else {
            None
        };

        Ok(PipelineOutput {
            mask_tree,
            vector_tree,
            detail,
        })
    }

    fn vectorize(&self, tree: &MaskTree) -> Result<VectorNode> {
        let mut vector = if self.options.root_as_canvas {
            tree.to_canvas_vector_tree(self.options.pad)?
        } else {
            tree.to_vector_tree(self.options.pad)?
        };
        if self.options.refit {
            vector.refit_to_parent(true);
        }
        Ok(vector)
    }

    /// Write every enabled artifact into `dir` (created if missing) and
    /// return the written paths. Detail artifacts are skipped when `output`
    /// has no detail trees.
    pub fn export(&self, output: &PipelineOutput, dir: impl AsRef<Path>, name: &str) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for artifact in Artifact::iter().filter(|a| a.is_enabled(&self.options)) {
            let path = dir.join(artifact.file_name(name));
            let saved = match (artifact, &output.detail) {
                (Artifact::MaskTree, _) => output.mask_tree.save_json(&path).map(|_| true),
                (Artifact::VectorTree, _) => output.vector_tree.save_json(&path).map(|_| true),
                (Artifact::Raster, _) => output.vector_tree.save_raster(&path).map(|_| true),
                (Artifact::Centroids, _) => output.vector_tree.save_centroids(&path).map(|_| true),
                (Artifact::Svg, _) => output.vector_tree.save_svg(&path).map(|_| true),
                (Artifact::GeoJson, _) => output.vector_tree.save_geojson(&path).map(|_| true),
                (Artifact::DetailMaskTree, Some(detail)) => detail.mask_tree.save_json(&path).map(|_| true),
                (Artifact::DetailVectorTree, Some(detail)) => detail.vector_tree.save_json(&path).map(|_| true),
                (Artifact::DetailRaster, Some(detail)) => detail.vector_tree.save_raster(&path).map(|_| true),
                (_, None) => Ok(false),
            }?;
            if saved {
                info!(%artifact, path = %path.display(), "exported");
                written.push(path);
            }
        }
        Ok(written)
    }

    /// Short description of the configured pipeline
    pub fn info(&self) -> String {
        let enabled: Vec<String> = Artifact::iter()
            .filter(|a| a.is_enabled(&self.options))
            .map(|a| a.to_string())
            .collect();
        format!(
            "Pipeline: pad {}, refit {}, canvas root {}, tolerance {}, min area {}, artifacts [{}]",
            self.options.pad,
            self.options.refit,
            self.options.root_as_canvas,
            self.segmenter.config().tolerance,
            self.segmenter.config().min_area,
            enabled.join(", ")
        )
    }
}
