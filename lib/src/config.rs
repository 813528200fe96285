//! Site configuration, read from `quire.toml` at the site root.
//!
//! Every section has defaults, so a site without a configuration file builds
//! the `posts` and `essays` collections from `content/`.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Chainable, Result};

pub const CONFIG_FILE: &str = "quire.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the configuration file. Relative paths below are
    /// resolved against it.
    #[serde(skip)]
    pub root: PathBuf,
    pub site: SiteSettings,
    pub build: BuildSettings,
    pub markdown: MarkdownSettings,
    pub collections: Vec<CollectionSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSettings {
    pub name: String,
    pub description: String,
    pub author: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
    pub url: Option<String>,
    pub links: FxHashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSettings {
    pub content: PathBuf,
    pub output: PathBuf,
    pub artifact: String,
    pub per_page: usize,
    pub latest: usize,
    pub description_limit: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownSettings {
    pub highlight: bool,
    pub excerpt_length: usize,
    pub words_per_minute: usize,
}

/// A named collection: a directory of documents published under one route.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CollectionSpec {
    pub name: String,
    /// Source directory, relative to the content root.
    pub directory: PathBuf,
    /// Public route root, e.g. `/blog`.
    pub route: String,
}

impl Config {
    /// Reads `quire.toml` from `root` if it exists; defaults otherwise.
    pub fn discover<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let path = root.join(CONFIG_FILE);
        let mut config = match path.exists() {
            true => {
                let source = std::fs::read_to_string(&path).chain_with(|| error! {
                    "failed to read configuration file",
                    "path" => path.display(),
                })?;

                Config::from_toml(&source).chain_with(|| error! {
                    "invalid configuration file",
                    "path" => path.display(),
                })?
            }
            false => {
                log::debug!("no {CONFIG_FILE} in {}; using defaults", root.display());
                Config::default()
            }
        };

        config.root = root.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn content_root(&self) -> PathBuf {
        self.root.join(&self.build.content)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.build.output)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.output_dir().join(&self.build.artifact)
    }

    pub fn collection(&self, name: &str) -> Option<&CollectionSpec> {
        self.collections.iter().find(|c| c.name == name)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = FxHashMap::default();
        for spec in &self.collections {
            if let Some(previous) = seen.insert(spec.name.as_str(), &spec.directory) {
                return err! {
                    "collection names must be unique",
                    "name" => &spec.name,
                    "first directory" => previous.display(),
                    "second directory" => spec.directory.display(),
                };
            }
        }

        if self.build.per_page == 0 {
            return err!("`build.per_page` must be at least 1");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            root: PathBuf::from("."),
            site: SiteSettings::default(),
            build: BuildSettings::default(),
            markdown: MarkdownSettings::default(),
            collections: vec![
                CollectionSpec::new("posts", "posts", "/blog"),
                CollectionSpec::new("essays", "essays", "/essays"),
            ],
        }
    }
}

impl Default for SiteSettings {
    fn default() -> Self {
        SiteSettings {
            name: "Blog".into(),
            description: "My Personal Blog".into(),
            author: "Anonymous".into(),
            email: None,
            avatar: None,
            url: None,
            links: FxHashMap::default(),
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        BuildSettings {
            content: "content".into(),
            output: ".quire".into(),
            artifact: "content.json".into(),
            per_page: 5,
            latest: 5,
            description_limit: 150,
        }
    }
}

impl Default for MarkdownSettings {
    fn default() -> Self {
        MarkdownSettings {
            highlight: true,
            excerpt_length: 250,
            words_per_minute: 200,
        }
    }
}

impl CollectionSpec {
    pub fn new(name: &str, directory: impl Into<PathBuf>, route: &str) -> Self {
        CollectionSpec {
            name: name.into(),
            directory: directory.into(),
            route: route.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::discover(dir.path()).unwrap();
        assert_eq!(config.build.per_page, 5);
        assert_eq!(config.collections.len(), 2);
        assert_eq!(config.collection("posts").unwrap().route, "/blog");
        assert_eq!(config.artifact_path(), dir.path().join(".quire/content.json"));
    }

    #[test]
    fn explicit_collections_replace_defaults() {
        let config = Config::from_toml(r#"
            [site]
            name = "Ame"
            author = "Rick"

            [site.links]
            github = "https://github.com/rick-ame"

            [build]
            per_page = 10

            [[collections]]
            name = "notes"
            directory = "notes"
            route = "/notes"
        "#).unwrap();

        assert_eq!(config.site.name, "Ame");
        assert_eq!(config.site.links["github"], "https://github.com/rick-ame");
        assert_eq!(config.build.per_page, 10);
        assert_eq!(config.build.latest, 5);
        assert_eq!(config.collections, vec![CollectionSpec::new("notes", "notes", "/notes")]);
        assert!(config.markdown.highlight);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("[build]\nper_pge = 3").is_err());
    }

    #[test]
    fn duplicate_collection_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), r#"
            [[collections]]
            name = "posts"
            directory = "a"
            route = "/a"

            [[collections]]
            name = "posts"
            directory = "b"
            route = "/b"
        "#).unwrap();

        assert!(Config::discover(dir.path()).is_err());
    }
}
