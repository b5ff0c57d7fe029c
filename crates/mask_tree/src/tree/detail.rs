use image::Rgb32FImage;
use tracing::{debug, info};

use crate::{
    color::ColorStatistic,
    error::Result,
    traits::Segmenter,
    tree::{MaskTree, NodeId, mask_tree::sample},
};

/// Splits the children of a mask-tree node into finer regions with a
/// [`Segmenter`].
pub struct DetailRefiner<'a> {
    segmenter: &'a dyn Segmenter,
}

impl<'a> DetailRefiner<'a> {
    pub fn new(segmenter: &'a dyn Segmenter) -> Self {
        Self { segmenter }
    }

    /// Segment each direct child of `node` and hang the accepted regions
    /// under it, colored by their median. The child's own color becomes the
    /// median over the pixels no new region took. Children whose mask selects
    /// nothing are skipped. Returns the number of nodes added.
    ///
    /// Only one level is refined; new nodes are not segmented again.
    pub fn refine(&self, tree: &mut MaskTree, image: &Rgb32FImage, node: NodeId) -> Result<usize> {
        let children = tree.children(node)?.to_vec();
        let mut added = 0usize;

        for child in children {
            let mask = tree.node(child)?.mask().clone();
            let segmentation = match self.segmenter.segment_with_remainder(image, &mask) {
                Ok(segmentation) => segmentation,
                Err(err) if err.is_no_data() => {
                    debug!(node = child.index(), "nothing to refine");
                    continue;
                }
                Err(err) => return Err(err),
            };

            let mut unclaimed = mask;
            for segment in segmentation.segments {
                unclaimed.difference_assign(&segment);
                let color = sample(ColorStatistic::Median, image, &segment)?;
                tree.add_child(child, segment, color)?;
                added += 1;
            }

            if let Some(color) = sample(ColorStatistic::Median, image, &unclaimed)? {
                tree.set_color(child, Some(color))?;
            }
        }

        info!(added, "refined mask tree");
        Ok(added)
    }
}
