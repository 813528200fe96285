use std::path::PathBuf;

use quire::config::Config;
use quire::content::{Site, SiteHandle};
use quire::error::Result;
use quire::watch::{self, Rebuilder};

mod commands;
mod flags;

pub fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let flags = flags::Quill::from_env_or_exit();
    let root = flags.root.unwrap_or_else(|| PathBuf::from("."));
    if let Err(e) = run(root, flags.subcommand) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(root: PathBuf, command: flags::QuillCmd) -> Result<()> {
    use flags::QuillCmd::*;

    let config = Config::discover(&root)?;
    match command {
        Build(_) => {
            let site = Site::build(&config)?;
            site.write(config.artifact_path())?;
            commands::summarize(&site);
        }
        Check(_) => {
            let site = Site::build(&config)?;
            commands::summarize(&site);
        }
        Watch(_) => {
            let rebuilder = Rebuilder::new(config, SiteHandle::new(Site::default()));
            if let Err(e) = rebuilder.rebuild() {
                log::error!("initial build failed; watching for fixes\n{e}");
            }

            watch::watch_blocking(rebuilder)?;
        }
        List(list) => {
            let site = commands::site(&config)?;
            commands::list(&site, &config, &list.collection, list.page.as_deref(), list.tag.as_deref())?;
        }
        Tags(tags) => {
            let site = commands::site(&config)?;
            commands::tags(&site, tags.collection.as_deref())?;
        }
        Show(show) => {
            let site = commands::site(&config)?;
            commands::show(&site, &show.collection, &show.slug)?;
        }
    }

    Ok(())
}
