use std::collections::VecDeque;

use image::Rgb32FImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    algorithms::to_polygon,
    color::{ColorStatistic, ensure_image_shape},
    error::{MaskTreeError, Result},
    grid::BoolMask,
    tree::VectorNode,
    types::Color,
};

/// Index of a node inside its [`MaskTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// One region of the mask tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskNode {
    mask: BoolMask,
    filled_mask: BoolMask,
    pub color: Option<Color>,
    pub level: u32,
    children: Vec<NodeId>,
}

impl MaskNode {
    fn new(mask: BoolMask, color: Option<Color>, level: u32) -> Self {
        let filled_mask = mask.fill_holes();
        Self {
            mask,
            filled_mask,
            color,
            level,
            children: Vec::new(),
        }
    }

    pub fn mask(&self) -> &BoolMask {
        &self.mask
    }

    /// The mask with every enclosed hole closed, kept in step with `mask`.
    pub fn filled_mask(&self) -> &BoolMask {
        &self.filled_mask
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn area(&self) -> usize {
        self.mask.count()
    }

    /// Whether every pixel of `other` lies inside this node's filled mask.
    pub fn is_fully_contained(&self, other: &BoolMask) -> bool {
        self.filled_mask.contains(other)
    }

    /// Whether `other` overlaps this mask grown by one pixel.
    pub fn is_touching(&self, other: &BoolMask) -> bool {
        self.mask.is_touching(other)
    }
}

#[derive(Deserialize)]
struct MaskTreeRecord {
    nodes: Vec<MaskNode>,
}

/// Arena of mask nodes; the root lives at [`NodeId::ROOT`].
///
/// The root's mask holds every pixel not claimed by one of its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MaskTreeRecord")]
pub struct MaskTree {
    nodes: Vec<MaskNode>,
}

impl TryFrom<MaskTreeRecord> for MaskTree {
    type Error = MaskTreeError;

    fn try_from(record: MaskTreeRecord) -> Result<Self> {
        let root = record
            .nodes
            .first()
            .ok_or_else(|| MaskTreeError::Corrupt("mask tree has no root".into()))?;
        let dimensions = root.mask.dimensions();

        let mut has_parent = vec![false; record.nodes.len()];
        for (index, node) in record.nodes.iter().enumerate() {
            node.mask.ensure_same_shape(&root.mask, "stored mask")?;
            if node.filled_mask.dimensions() != dimensions {
                return Err(MaskTreeError::shape_mismatch(
                    "stored filled mask",
                    dimensions,
                    node.filled_mask.dimensions(),
                ));
            }
            for child in &node.children {
                let slot = has_parent.get_mut(child.0).ok_or_else(|| {
                    MaskTreeError::Corrupt(format!("node {index} points at missing node {}", child.0))
                })?;
                if child.0 == 0 || *slot {
                    return Err(MaskTreeError::Corrupt(format!("node {} has more than one parent", child.0)));
                }
                *slot = true;
            }
        }
        if let Some(orphan) = has_parent.iter().skip(1).position(|&p| !p) {
            return Err(MaskTreeError::Corrupt(format!("node {} is unreachable", orphan + 1)));
        }

        let tree = Self { nodes: record.nodes };
        if tree.level_order().len() != tree.nodes.len() {
            return Err(MaskTreeError::Corrupt("mask tree contains a cycle".into()));
        }
        Ok(tree)
    }
}

impl MaskTree {
    /// Tree with a single root covering the whole `width` x `height` canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            nodes: vec![MaskNode::new(BoolMask::full(width, height), None, 0)],
        }
    }

    /// Organise a flat mask list into a two-level tree.
    ///
    /// Masks become depth-1 children in input order, colored by the mean
    /// image color beneath them. Each mask is subtracted from the root, so
    /// where masks overlap the first one claims the pixels for the root's
    /// background, and the root is colored by what nobody claimed.
    pub fn build(image: &Rgb32FImage, masks: impl IntoIterator<Item = BoolMask>) -> Result<Self> {
        let mut tree = Self::new(image.width(), image.height());
        for mask in masks {
            ensure_image_shape(image, &mask, "mask tree input")?;
            tree.nodes[0].mask.difference_assign(&mask);
            let color = sample(ColorStatistic::Mean, image, &mask)?;
            tree.add_child(NodeId::ROOT, mask, color)?;
        }
        tree.recompute_color(NodeId::ROOT, image, ColorStatistic::Mean)?;

        info!(
            children = tree.nodes[0].children.len(),
            unclaimed = tree.nodes[0].area(),
            "built mask tree"
        );
        Ok(tree)
    }

    pub fn root(&self) -> &MaskNode {
        &self.nodes[0]
    }

    pub fn get(&self, id: NodeId) -> Option<&MaskNode> {
        self.nodes.get(id.0)
    }

    pub fn node(&self, id: NodeId) -> Result<&MaskNode> {
        self.get(id)
            .ok_or_else(|| MaskTreeError::Corrupt(format!("no node {}", id.0)))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut MaskNode> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| MaskTreeError::Corrupt(format!("no node {}", id.0)))
    }

    pub fn children(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.node(id)?.children())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.nodes[0].mask.dimensions()
    }

    /// Append a node under `parent`, one level deeper.
    pub fn add_child(&mut self, parent: NodeId, mask: BoolMask, color: Option<Color>) -> Result<NodeId> {
        mask.ensure_same_shape(&self.nodes[0].mask, "mask tree child")?;
        let level = self.node(parent)?.level + 1;
        let id = NodeId(self.nodes.len());
        self.nodes.push(MaskNode::new(mask, color, level));
        self.node_mut(parent)?.children.push(id);
        Ok(id)
    }

    /// Replace a node's color with `statistic` over its own mask, or clear it
    /// when the mask is empty.
    pub fn recompute_color(&mut self, id: NodeId, image: &Rgb32FImage, statistic: ColorStatistic) -> Result<()> {
        let color = sample(statistic, image, &self.node(id)?.mask)?;
        self.node_mut(id)?.color = color;
        Ok(())
    }

    pub(crate) fn set_color(&mut self, id: NodeId, color: Option<Color>) -> Result<()> {
        self.node_mut(id)?.color = color;
        Ok(())
    }

    /// Node ids breadth first, root first.
    pub fn level_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut queue = VecDeque::from([NodeId::ROOT]);
        while let Some(id) = queue.pop_front() {
            out.push(id);
            queue.extend(self.nodes[id.0].children.iter().copied());
        }
        out
    }

    /// Trace every node's outline into a vector tree of the same shape.
    ///
    /// The root is traced from its own unclaimed mask like any other node.
    /// When nothing is left unclaimed the root falls back to the canvas
    /// rectangle. A non-root node whose mask traces to nothing is left out
    /// together with its subtree.
    pub fn to_vector_tree(&self, pad: u32) -> Result<VectorNode> {
        match self.vectorize(NodeId::ROOT, pad)? {
            Some(root) => self.attach_children(root, pad),
            None => {
                warn!("root mask has no outline, using the canvas rectangle");
                self.to_canvas_vector_tree(pad)
            }
        }
    }

    /// Like [`MaskTree::to_vector_tree`], but the root polygon is always the
    /// canvas rectangle and its mask only decides its color.
    pub fn to_canvas_vector_tree(&self, pad: u32) -> Result<VectorNode> {
        let (width, height) = self.dimensions();
        let root = VectorNode::from_rectangle(width as f64, height as f64, None, self.nodes[0].color);
        self.attach_children(root, pad)
    }

    fn attach_children(&self, mut vector: VectorNode, pad: u32) -> Result<VectorNode> {
        for &child in &self.nodes[0].children {
            if let Some(node) = self.vectorize_subtree(child, pad)? {
                vector.add_child(node);
            }
        }
        debug!(nodes = vector.len(), "vectorized mask tree");
        Ok(vector)
    }

    fn vectorize_subtree(&self, id: NodeId, pad: u32) -> Result<Option<VectorNode>> {
        let Some(mut vector) = self.vectorize(id, pad)? else {
            warn!(node = id.0, "dropping node without an outline");
            return Ok(None);
        };
        for &child in &self.nodes[id.0].children {
            if let Some(node) = self.vectorize_subtree(child, pad)? {
                vector.add_child(node);
            }
        }
        Ok(Some(vector))
    }

    fn vectorize(&self, id: NodeId, pad: u32) -> Result<Option<VectorNode>> {
        let node = self.node(id)?;
        match to_polygon(&node.mask, pad) {
            Ok(ring) => Ok(Some(VectorNode::new(ring, None, node.color, node.level))),
            Err(err) if err.is_no_data() => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Color under `mask`, or `None` when the mask selects nothing.
pub(crate) fn sample(statistic: ColorStatistic, image: &Rgb32FImage, mask: &BoolMask) -> Result<Option<Color>> {
    match statistic.sample(image, mask) {
        Ok(color) => Ok(Some(color)),
        Err(MaskTreeError::EmptySelection) => Ok(None),
        Err(err) => Err(err),
    }
}
