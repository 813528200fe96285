use std::sync::Arc;
use std::path::{Path, PathBuf};
use std::{fs, fmt};

use rustc_hash::FxHashMap;

use crate::error::{Chainable, Result};

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct EntryId(pub(crate) usize);

/// An in-memory snapshot of a directory tree, discovered in parallel.
#[derive(Debug)]
pub struct FsTree {
    entries: Vec<Entry>,
    map: FxHashMap<Arc<Path>, EntryId>,
}

#[derive(Debug)]
pub struct Entry {
    pub id: EntryId,
    pub path: Arc<Path>,
    pub file_name: String,
    pub file_type: fs::FileType,
    pub parent: Option<EntryId>,
    pub children: Vec<EntryId>,
    pub depth: usize,
}

impl FsTree {
    fn new() -> Self {
        Self {
            map: FxHashMap::default(),
            entries: vec![],
        }
    }

    /// Walks `root` on the calling thread. Callers already fan out over
    /// collections and documents with rayon; a nested jwalk pool would
    /// compete with them for the same workers.
    pub fn build<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let walker = jwalk::WalkDir::new(root)
            .follow_links(true)
            .skip_hidden(false)
            .parallelism(jwalk::Parallelism::Serial)
            .sort(true);

        let mut tree: FsTree = FsTree::new();
        for entry in walker.into_iter() {
            let entry = entry.chain_with(|| error! {
                "failed to read directory entry",
                "search root" => root.display(),
            })?;

            tree.insert(entry);
        }

        if tree.len() == 0 {
            return err! {
                "file system tree discovery yielded zero files",
                "search root" => root.display(),
            }
        }

        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn root(&self) -> &Entry {
        &self[self.root_id()]
    }

    pub fn root_id(&self) -> EntryId {
        EntryId(0)
    }

    pub fn depth_first_search<'a, F>(&'a self, root: EntryId, mut progress: F)
        where F: FnMut(&'a Entry) -> bool
    {
        fn _dfs<'a, F>(tree: &'a FsTree, root: EntryId, progress: &mut F)
            where F: FnMut(&'a Entry) -> bool
        {
            let entry = &tree[root];
            if progress(entry) {
                for &child in &entry.children {
                    _dfs(tree, child, progress)
                }
            }
        }

        _dfs(self, root, &mut progress)
    }

    /// Every file below the root whose path does not pass through an entry
    /// rejected by `keep`. Rejected directories are not descended into.
    pub fn files<F>(&self, mut keep: F) -> Vec<&Entry>
        where F: FnMut(&Entry) -> bool
    {
        let mut files = vec![];
        self.depth_first_search(self.root_id(), |entry| {
            if entry.depth > 0 && !keep(entry) {
                return false;
            }

            if entry.file_type.is_file() {
                files.push(entry);
            }

            true
        });

        files
    }

    fn insert(&mut self, entry: jwalk::DirEntry<((), ())>) -> EntryId {
        let path: PathBuf = entry.path();
        let entry = Entry {
            id: EntryId(self.entries.len()),
            path: Arc::from(path.into_boxed_path()),
            file_type: entry.file_type,
            file_name: entry.file_name.to_string_lossy().into_owned(),
            parent: self.map.get(&*entry.parent_path).cloned(),
            children: vec![],
            depth: entry.depth,
        };

        self.map.insert(entry.path.clone(), entry.id);
        if let Some(parent) = entry.parent {
            self.entries[parent.0].children.push(entry.id);
        }

        let id = entry.id;
        self.entries.push(entry);
        id
    }
}

impl Entry {
    /// The final extension, if any.
    pub fn file_ext(&self) -> Option<&str> {
        match self.file_name.rsplit_once('.') {
            Some(("", _)) | None => None,
            Some((_, right)) => Some(right),
        }
    }

    /// Path relative to `other`. `self` must be super-path of `other`.
    pub fn path_relative_to(&self, other: &Entry) -> Option<&Path> {
        self.path.strip_prefix(&other.path).ok()
    }
}

impl std::ops::Index<EntryId> for FsTree {
    type Output = Entry;

    fn index(&self, index: EntryId) -> &Self::Output {
        &self.entries[index.0]
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
