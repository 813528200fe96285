//! Public slugs from source paths.
//!
//! A document at `<collection dir>/2024/my-post.mdx` in a collection routed at
//! `/blog` gets the slug `/blog/2024/my-post` and the route parameter
//! `2024/my-post`. A file named `index` collapses onto its directory, so
//! `2024/index.md` becomes `/blog/2024`, and a top-level `index.md` becomes
//! `/blog` itself.
//!
//! Slugs preserve case and are not otherwise normalized: two documents that
//! differ only in extension or that name a directory and its `index` resolve
//! to the same slug, which the collection builder reports.

use std::path::{Component, Path};

/// A derived slug: the full public path and the route-relative parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slug {
    pub slug: String,
    pub params: String,
}

/// Derives the slug of the document at `relative`, a path relative to the
/// collection directory, for a collection routed at `route`.
pub fn derive<P: AsRef<Path>>(route: &str, relative: P) -> Slug {
    let mut segments: Vec<String> = relative.as_ref()
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(last) = segments.last_mut() {
        if let Some((stem, _)) = last.rsplit_once('.').filter(|(stem, _)| !stem.is_empty()) {
            *last = stem.to_string();
        }
    }

    if segments.last().is_some_and(|s| s == "index") {
        segments.pop();
    }

    let params = segments.join("/");
    Slug { slug: join_route(route, &params), params }
}

/// Joins a route root and route-relative parameters into a public path.
pub fn join_route(route: &str, params: &str) -> String {
    let route = match route.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    match (route, params) {
        (route, "") => route.to_string(),
        ("/", params) => format!("/{params}"),
        (route, params) => format!("{route}/{params}"),
    }
}

/// Splits route parameters into their segments, the form dynamic routes
/// receive them in.
pub fn segments(params: &str) -> Vec<&str> {
    params.split('/').filter(|s| !s.is_empty()).collect()
}
