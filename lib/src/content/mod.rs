//! Content collections: authored documents validated, slugged, and compiled
//! into [`ContentEntry`]s, grouped into [`Collection`]s of a [`Site`].

pub mod frontmatter;
pub mod schema;
pub mod slug;
mod entry;
mod collection;
mod site;

pub use entry::*;
pub use collection::{Collection, EXTENSIONS};
pub use site::*;
