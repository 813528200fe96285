use std::path::PathBuf;

xflags::xflags! {
    /// Builds and inspects a quire blog.
    cmd quill {
        /// Site root holding `quire.toml` and `content/`. Defaults to the
        /// current directory.
        optional -r, --root root: PathBuf

        /// Build every collection and write the artifact.
        cmd build {}

        /// Build every collection without writing the artifact.
        cmd check {}

        /// Build, then rebuild whenever content or configuration changes.
        cmd watch {}

        /// Print a page of a collection's published entries.
        cmd list {
            required collection: String
            /// 1-based page number.
            optional -p, --page page: String
            /// Only entries carrying the tag with this slug.
            optional -t, --tag tag: String
        }

        /// Print tags with their counts, most used first.
        cmd tags {
            /// Only count tags in this collection.
            optional collection: String
        }

        /// Render a published entry to HTML.
        cmd show {
            required collection: String
            repeated slug: String
        }
    }
}
