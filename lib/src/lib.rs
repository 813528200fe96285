#![doc = svgbobdoc::transform!(
//! A build-time content pipeline for markdown blogs.
//!
//! # Overview
//!
//! Quire turns a directory of markdown/MDX documents into typed, validated
//! entries with a compiled, render-ready body, and provides the read model a
//! blog's pages are built from: date ordering, tag counts, tag filtering, and
//! pagination.
//!
//! Content is organized as follows:
//!
//! ```svgbob
//!                     +------+
//!                     | Site |
//!                     +--+---+
//!                        |
//!       +----------------+----------------+
//!       |                                 |
//! +-----+------+                   +------+-----+
//! | Collection | posts -> /blog    | Collection | essays -> /essays
//! +-----+------+                   +------+-----+
//!       |                                 |
//!  +----+----+----------+                 +---------+
//!  |         |          |                           |
//! +-+-----+ +-+-----+  +-+-----+                 +--+----+
//! | entry | | entry |..| entry |                 | entry |
//! +-------+ +-------+  +-------+                 +-------+
//! ```
//!
//! In words, a **site** consists of named **collections**, each a directory
//! of documents published under one route root. Each document becomes a
//! [`ContentEntry`](content::ContentEntry): its validated front-matter, its
//! slug, and its body compiled into a tree of [`Node`](markdown::Node)s.
//!
//! ## Building
//!
//! A site is built via the following set of operations:
//!
//! 1. Configuration is read from `quire.toml`, if there is one.
//! 2. Each collection's documents are discovered. In parallel, each one is:
//!    - split into front-matter and body, and the front-matter validated
//!      against the entry schema;
//!    - assigned a slug from its path;
//!    - compiled: markdown with embedded components becomes a node tree, plus
//!      a table of contents, an excerpt, and reading metadata.
//! 3. Duplicate slugs are rejected. Any failure fails the whole build, and
//!    every failing document is reported.
//! 4. The site is written atomically as a single JSON artifact.
//!
//! ## Reading
//!
//! The functions in [`query`] and the view models in [`view`] operate on a
//! built collection; [`render::render()`] turns a compiled body into HTML
//! against a fixed table of component implementations.
)]

#[macro_use]
pub mod error;
pub mod util;
pub mod fstree;
pub mod config;
pub mod content;
pub mod markdown;
pub mod render;
pub mod query;
pub mod view;
pub mod watch;

#[doc(hidden)]
pub use log;
pub use rayon;
