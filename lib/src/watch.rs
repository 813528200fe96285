//! Watch mode: rebuild the site when its sources change.
//!
//! File system events are batched by a [`Debouncer`] and handed to a
//! [`Rebuilder`] on the same loop, so at most one build runs at a time and
//! events that arrive during a build are folded into the next one. A failed
//! build is logged and changes nothing: the previous artifact stays on disk
//! and the previous site stays in the handle.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

use crate::config::{Config, CONFIG_FILE};
use crate::content::{Site, SiteHandle};
use crate::error::{Chainable, Result};

pub const DEBOUNCE: Duration = Duration::from_millis(300);

const IDLE: Duration = Duration::from_secs(60);

/// Whether a changed path can affect the build. Editor droppings and hidden
/// files are ignored.
fn is_relevant(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    !(matches!(ext, "bak" | "swp" | "swo" | "tmp") || name.ends_with('~') || name.starts_with('.'))
}

/// Batches changed paths until no event has arrived for the debounce period.
#[derive(Debug)]
pub struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
    period: Duration,
}

impl Debouncer {
    pub fn new(period: Duration) -> Self {
        Debouncer { pending: FxHashSet::default(), last_event: None, period }
    }

    pub fn add<I: IntoIterator<Item = PathBuf>>(&mut self, paths: I, now: Instant) {
        let before = self.pending.len();
        self.pending.extend(paths.into_iter().filter(|p| is_relevant(p)));
        if self.pending.len() > before {
            self.last_event = Some(now);
        }
    }

    pub fn ready(&self, now: Instant) -> bool {
        !self.pending.is_empty()
            && self.last_event.is_some_and(|t| now.saturating_duration_since(t) >= self.period)
    }

    /// Takes the batch, sorted.
    pub fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        let mut paths: Vec<_> = self.pending.drain().collect();
        paths.sort();
        paths
    }

    /// How long to wait for the next event.
    pub fn timeout(&self) -> Duration {
        match self.pending.is_empty() {
            true => IDLE,
            false => self.period,
        }
    }
}

/// Rebuilds the site, publishing the result only when the build succeeds.
#[derive(Debug)]
pub struct Rebuilder {
    config: Config,
    handle: SiteHandle,
}

impl Rebuilder {
    pub fn new(config: Config, handle: SiteHandle) -> Self {
        Rebuilder { config, handle }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn handle(&self) -> &SiteHandle {
        &self.handle
    }

    /// Builds, writes the artifact, then swaps the handle.
    pub fn rebuild(&self) -> Result<()> {
        let site = Site::build(&self.config)?;
        site.write(self.config.artifact_path())?;
        self.handle.replace(site);
        Ok(())
    }

    /// Re-reads the configuration file, keeping the current configuration
    /// if the new one is invalid.
    pub fn reload_config(&mut self) -> Result<()> {
        self.config = Config::discover(&self.config.root)?;
        Ok(())
    }

    /// Handles one debounced batch of changes. Failures are logged.
    pub fn changed(&mut self, paths: &[PathBuf]) -> bool {
        if paths.iter().any(|p| p.ends_with(CONFIG_FILE)) {
            log::info!("{CONFIG_FILE} changed; reloading configuration");
            if let Err(e) = self.reload_config() {
                log::error!("configuration reload failed; keeping the previous configuration\n{e}");
                return false;
            }
        }

        match paths {
            [path] => log::info!("{} changed, rebuilding", path.display()),
            paths => log::info!("{} files changed, rebuilding", paths.len()),
        }

        match crate::time!("rebuild" => self.rebuild()) {
            Ok(()) => true,
            Err(e) => {
                log::error!("rebuild failed; keeping the previous artifact\n{e}");
                false
            }
        }
    }
}

/// Watches the content root and configuration file and rebuilds on change,
/// until the watcher shuts down. A configuration change that moves the
/// content root moves the watch with it.
pub fn watch_blocking(mut rebuilder: Rebuilder) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx)
        .chain_with(|| error!("failed to create file watcher"))?;

    let mut watched = None;
    watch_content(&mut watcher, &mut watched, rebuilder.config().content_root())?;

    let config_file = rebuilder.config().root.join(CONFIG_FILE);
    if config_file.exists() {
        watcher.watch(&config_file, RecursiveMode::NonRecursive)
            .chain_with(|| error!("failed to watch configuration", "path" => config_file.display()))?;
    }

    let mut debouncer = Debouncer::new(DEBOUNCE);
    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_change(&event) => debouncer.add(event.paths, Instant::now()),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => log::warn!("watch error: {e}"),
            Err(RecvTimeoutError::Timeout) if debouncer.ready(Instant::now()) => {
                rebuilder.changed(&debouncer.take());
                let content = rebuilder.config().content_root();
                if let Err(e) = watch_content(&mut watcher, &mut watched, content) {
                    log::error!("{e}");
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}

/// Points the recursive content watch at `content` if it isn't already.
fn watch_content<W: Watcher>(watcher: &mut W, watched: &mut Option<PathBuf>, content: PathBuf) -> Result<()> {
    if watched.as_ref() == Some(&content) {
        return Ok(());
    }

    if let Some(old) = watched.take() {
        if let Err(e) = watcher.unwatch(&old) {
            log::warn!("failed to stop watching {}: {e}", old.display());
        }
    }

    watcher.watch(&content, RecursiveMode::Recursive)
        .chain_with(|| error!("failed to watch content", "path" => content.display()))?;

    log::info!("watching {} for changes", content.display());
    *watched = Some(content);
    Ok(())
}

fn is_change(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_))
}
