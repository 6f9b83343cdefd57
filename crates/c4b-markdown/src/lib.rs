//! Markdown rewriting for c4b.
//!
//! Prepares source documents for publication: linked files are copied into
//! the destination tree, Mermaid diagrams are either embedded as code blocks
//! or rendered to SVG through a [`DiagramRenderer`](c4b_diagrams::DiagramRenderer),
//! and every rewritten URL is made relative according to the [`OutputTarget`].
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use c4b_diagrams::MermaidCli;
//! use c4b_markdown::{MarkdownTransformer, OutputTarget, TransformConfig};
//!
//! let renderer = MermaidCli::new("mmdc");
//! let config = TransformConfig {
//!     root_folder: "src".into(),
//!     dist_folder: "docs".into(),
//!     embed_mermaid_diagrams: false,
//!     target: OutputTarget::Bundle,
//! };
//!
//! let result = MarkdownTransformer::new(&renderer).transform(
//!     "[Context](context.mmd)",
//!     "README.md",
//!     Path::new("src"),
//!     &config,
//! );
//! assert!(result.warnings.is_empty());
//! ```

mod document;
mod paths;
mod transformer;

pub use paths::{anchor, encode_uri, mirror_path, normalize, relative_url};
pub use transformer::{MarkdownTransformer, OutputTarget, TransformConfig, Transformed};
