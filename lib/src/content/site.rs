use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use derive_more::Debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::content::collection::{chain_in_order, Collection};
use crate::content::ContentEntry;
use crate::error::{Chainable, Result};
use crate::markdown::{highlight, Compiler};

/// Every built collection of a site, keyed by collection name. This is the
/// build artifact: the sole thing handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub collections: BTreeMap<String, Collection>,
}

impl Site {
    /// Builds every configured collection. If any collection fails, the site
    /// fails and the errors of all failing collections are reported in
    /// configuration order.
    pub fn build(config: &Config) -> Result<Site> {
        let compiler = Compiler::new(&config.markdown);
        if config.markdown.highlight {
            highlight::warm_up();
        }

        let results: Vec<Result<Collection>> = crate::time!("site build" => {
            config.collections.par_iter()
                .map(|spec| Collection::build(config, spec, &compiler))
                .collect()
        });

        let mut collections = BTreeMap::new();
        let mut errors = vec![];
        for result in results {
            match result {
                Ok(collection) => { collections.insert(collection.name.clone(), collection); }
                Err(e) => errors.push(e),
            }
        }

        if let Some(error) = chain_in_order(errors) {
            return Err(error);
        }

        Ok(Site { collections })
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    /// The entries of collection `name`; empty if there is no such collection.
    pub fn entries(&self, name: &str) -> &[Arc<ContentEntry>] {
        self.collection(name).map(|c| c.entries.as_slice()).unwrap_or_default()
    }

    /// Writes the artifact to `path`.
    ///
    /// The artifact is written in full to a temporary file next to `path` and
    /// then renamed over it, so a concurrent reader sees either the previous
    /// artifact or this one, never a partial file.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        std::fs::create_dir_all(dir)
            .chain_with(|| error!("failed to create output directory", "path" => dir.display()))?;

        let file = tempfile::NamedTempFile::new_in(dir)
            .chain_with(|| error!("failed to create temporary artifact", "directory" => dir.display()))?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;

        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.as_file().sync_all()?;
        file.persist(path)
            .map_err(|e| e.error)
            .chain_with(|| error!("failed to replace artifact", "path" => path.display()))?;

        log::info!("wrote {}", path.display());
        Ok(())
    }

    /// Reads an artifact written by [`Site::write()`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Site> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .chain_with(|| error!("failed to open artifact", "path" => path.display()))?;

        let mut site: Site = serde_json::from_reader(BufReader::new(file))
            .chain_with(|| error!("malformed artifact", "path" => path.display()))?;

        for (name, collection) in &mut site.collections {
            collection.name = name.clone();
        }

        Ok(site)
    }
}

/// A process-wide, read-only handle to the current [`Site`].
///
/// Readers take a snapshot with [`SiteHandle::load()`] and keep it for as
/// long as they like; a rebuild swaps in a whole new site.
#[derive(Debug, Clone)]
pub struct SiteHandle {
    #[debug(ignore)]
    current: Arc<ArcSwap<Site>>,
}

impl SiteHandle {
    pub fn new(site: Site) -> Self {
        SiteHandle { current: Arc::new(ArcSwap::from_pointee(site)) }
    }

    pub fn load(&self) -> Arc<Site> {
        self.current.load_full()
    }

    pub fn replace(&self, site: Site) {
        self.current.store(Arc::new(site));
    }
}
