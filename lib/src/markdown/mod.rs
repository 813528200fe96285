//! The markdown/MDX compiler.
//!
//! [`Compiler`] runs a document through a fixed chain of [`Plugin`]s over the
//! `pulldown-cmark` event stream and folds the result into a [`Node`] tree with
//! [`TreeBuilder`]. The tree is what gets stored in the build artifact and
//! what the render executor interprets.

mod plugin;
mod node;
mod tree;
mod compiler;
mod admonition;
mod auto_heading;
mod code_filter;
mod toc;
mod text;

pub mod component;
pub mod highlight;

pub use plugin::Plugin;
pub use node::{plain_text, Align, Node, Props};
pub use tree::TreeBuilder;
pub use compiler::{Compiled, Compiler};
pub use component::{ComponentSet, ComponentSpec, Kind, PropSpec};
pub use admonition::Admonition;
pub use auto_heading::AutoHeading;
pub use code_filter::{CodeFilter, CodeTrim};
pub use toc::{TableOfContents, TocEntry};
pub use text::{excerpt, PlainText, ReadingMetadata};
