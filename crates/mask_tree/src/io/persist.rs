//! JSON persistence for both trees.

use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    error::Result,
    tree::{MaskTree, VectorNode},
};

fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string(value)?;
    std::fs::write(path, json)?;
    debug!(path = %path.display(), "saved json");
    Ok(())
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

impl MaskTree {
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a stored tree; broken child links are rejected.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(self, path.as_ref())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }
}

impl VectorNode {
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(self, path.as_ref())
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{grid::BoolMask, tree::NodeId};
    use image::{Rgb, Rgb32FImage};

    fn mask_tree() -> MaskTree {
        let image = Rgb32FImage::from_fn(23, 17, |x, y| Rgb([x as f32 / 23.0, y as f32 / 17.0, 0.5]));
        let ring = BoolMask::from_fn(23, 17, |x, y| (2..12).contains(&x) && (2..12).contains(&y))
            .difference(&BoolMask::from_fn(23, 17, |x, y| (5..8).contains(&x) && (5..8).contains(&y)));
        let mut tree = MaskTree::build(&image, [ring, BoolMask::from_fn(23, 17, |x, _| x > 15)]).expect("tree");
        let first = tree.children(NodeId::ROOT).expect("children")[0];
        tree.add_child(first, BoolMask::from_fn(23, 17, |x, y| (3..5).contains(&x) && (3..6).contains(&y)), Some([0.25, 0.5, 0.75]))
            .expect("grandchild");
        tree
    }

    #[test]
    fn test_mask_tree_round_trip() {
        let tree = mask_tree();
        let restored = MaskTree::from_json_str(&tree.to_json_string().expect("json")).expect("parse");
        assert_eq!(restored, tree);
        assert_eq!(restored.level_order(), tree.level_order());
    }

    #[test]
    fn test_mask_tree_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mask_tree.json");
        let tree = mask_tree();
        tree.save_json(&path).expect("save");
        assert_eq!(MaskTree::load_json(&path).expect("load"), tree);
    }

    #[test]
    fn test_vector_tree_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("vector_tree.json");
        let tree = mask_tree().to_vector_tree(5).expect("vector");
        tree.save_json(&path).expect("save");
        let restored = VectorNode::load_json(&path).expect("load");
        assert_eq!(restored, tree);
        assert_eq!(restored.len(), 4);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(MaskTree::load_json(dir.path().join("absent.json")).is_err());
    }
}
