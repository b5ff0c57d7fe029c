//! Mask and vector trees, and the passes that build and reshape them.

pub mod detail;
pub mod mask_tree;
pub mod synthesis;
pub mod vector_node;

pub use detail::DetailRefiner;
pub use mask_tree::{MaskNode, MaskTree, NodeId};
pub use synthesis::Synthesis;
pub use vector_node::VectorNode;
