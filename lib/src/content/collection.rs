use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::config::{CollectionSpec, Config};
use crate::content::frontmatter;
use crate::content::schema::{self, Document};
use crate::content::slug;
use crate::content::ContentEntry;
use crate::error::{Chainable, ContentError, Error, Result};
use crate::fstree::FsTree;
use crate::markdown::Compiler;
use crate::util::is_hidden;

/// File extensions read as documents.
pub const EXTENSIONS: &[&str] = &["md", "mdx", "markdown"];

/// A named, built set of entries sharing one route root. Entries are in
/// source-path order; listings sort them by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    #[serde(skip)]
    pub name: String,
    pub route: String,
    pub entries: Vec<Arc<ContentEntry>>,
}

impl Collection {
    pub fn empty(spec: &CollectionSpec) -> Self {
        Collection {
            name: spec.name.clone(),
            route: spec.route.clone(),
            entries: vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the collection described by `spec`.
    ///
    /// Documents are read, validated, and compiled in parallel. Any failure
    /// fails the whole collection; every failing document is reported, in
    /// source-path order.
    pub fn build(config: &Config, spec: &CollectionSpec, compiler: &Compiler) -> Result<Self> {
        let content_root = config.content_root();
        let dir = content_root.join(&spec.directory);
        if !dir.is_dir() {
            log::warn!("collection `{}`: {} is not a directory; it will be empty", spec.name, dir.display());
            return Ok(Collection::empty(spec));
        }

        let tree = FsTree::build(&dir)?;
        let root = tree.root();
        let files: Vec<_> = tree.files(|e| !is_hidden(&e.file_name))
            .into_iter()
            .filter(|e| e.file_ext().is_some_and(|ext| {
                EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
            }))
            .filter_map(|e| Some((e, e.path_relative_to(root)?)))
            .collect();

        let results: Vec<Result<ContentEntry>> = files.par_iter()
            .map(|(file, relative)| {
                let path = display_path(&spec.directory.join(relative));
                build_entry(&file.path, &path, relative, spec, compiler)
            })
            .collect();

        let mut entries = vec![];
        let mut errors = vec![];
        for result in results {
            match result {
                Ok(entry) => entries.push(entry),
                Err(e) => errors.push(e),
            }
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        errors.extend(duplicate_slugs(&entries).into_iter().map(Error::from));
        if let Some(error) = chain_in_order(errors) {
            return Err(error.chain(error! {
                "failed to build collection",
                "collection" => &spec.name,
                "directory" => dir.display(),
            }));
        }

        log::info!("collection `{}`: built {} entries", spec.name, entries.len());
        Ok(Collection {
            name: spec.name.clone(),
            route: spec.route.clone(),
            entries: entries.into_iter().map(Arc::new).collect(),
        })
    }
}

fn build_entry(
    file: &Path,
    path: &str,
    relative: &Path,
    spec: &CollectionSpec,
    compiler: &Compiler,
) -> Result<ContentEntry> {
    let source = std::fs::read_to_string(file)
        .chain_with(|| error!("failed to read document", "path" => path))?;

    let split = frontmatter::split(&source).map_err(|e| ContentError::SchemaValidation {
        path: path.to_string(),
        field: "front-matter".into(),
        reason: e.to_string(),
    })?;

    let document = Document { path, fields: &split.fields, body: split.body };
    let valid = schema::validate(&document)?;
    let slug = slug::derive(&spec.route, relative);

    let header = &source[..source.len() - split.body.len()];
    let first_line = 1 + memchr::memchr_iter(b'\n', header.as_bytes()).count();
    let compiled = compiler.compile_from(path, valid.body, first_line)?;

    log::debug!("compiled {path} as {}", slug.slug);
    Ok(ContentEntry {
        slug: slug.slug,
        slug_as_params: slug.params,
        path: path.to_string(),
        title: valid.title,
        description: valid.description,
        date: valid.date,
        published: valid.published,
        tags: valid.tags,
        body: compiled.body,
        toc: compiled.toc,
        excerpt: compiled.excerpt,
        metadata: compiled.metadata,
    })
}

/// Every pair of entries sharing a slug, reported against the first entry
/// (in path order) that claimed it.
fn duplicate_slugs(entries: &[ContentEntry]) -> Vec<ContentError> {
    let mut claimed: FxHashMap<&str, &str> = FxHashMap::default();
    let mut duplicates = vec![];
    for entry in entries {
        match claimed.get(entry.slug.as_str()) {
            Some(first) => duplicates.push(ContentError::DuplicateSlug {
                slug: entry.slug.clone(),
                first: first.to_string(),
                second: entry.path.clone(),
            }),
            None => { claimed.insert(&entry.slug, &entry.path); }
        }
    }

    duplicates
}

/// Chains `errors` so that the first one is outermost.
pub(crate) fn chain_in_order(errors: Vec<Error>) -> Option<Error> {
    errors.into_iter().rev().reduce(|behind, error| behind.chain(error))
}

fn display_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
