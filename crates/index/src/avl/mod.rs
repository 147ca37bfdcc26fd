//! Arena-based AVL tree index.

pub mod node;
pub mod tree;

pub use node::{Node, NodeId, NIL};
pub use tree::{AvlTree, IndexError, Iter};
