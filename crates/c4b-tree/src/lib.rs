//! Source tree scanning for c4b.
//!
//! Walks a directory of Markdown (`.md`) and Mermaid (`.mmd`) sources into a
//! [`SourceTree`]: one [`TreeNode`] per directory that has something to
//! publish, stored in an index-based arena with explicit traversal orders.
//!
//! ```no_run
//! use c4b_tree::SourceTreeBuilder;
//!
//! let tree = SourceTreeBuilder::new("src")
//!     .homepage_name("Overview")
//!     .mirror_into("docs")
//!     .build();
//!
//! for node in tree.root_first() {
//!     println!("{}{}", "  ".repeat(node.level), node.name);
//! }
//! ```

mod builder;
mod tree;

pub use builder::SourceTreeBuilder;
pub use tree::{SourceFile, SourceTree, TreeNode};
