use std::path::{Path, PathBuf};

use crate::context::{DEFAULT_REFERENCE_LIMIT, LabelUrl, RenderContext};
use crate::dom::IgnoreRules;
use crate::error::Error;
use crate::model::ParentType;
use crate::store::MemoryStore;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = ".reflink.toml";

/// Settings loaded from `.reflink.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Scheme and host for generated links.
    pub base_url: String,
    /// Group the rendered documents belong to.
    pub group: Option<String>,
    /// Skip text inside `<blockquote>`.
    pub ignore_blockquotes: bool,
    /// Page label links open: `issues`, `merge_requests` or `group`.
    pub label_url: LabelUrl,
    /// Emit path-only hrefs.
    pub only_path: bool,
    /// Project the rendered documents belong to.
    pub project: Option<String>,
    /// Links created per kind per document before the rest are left as text.
    pub reference_limit: usize,
    /// Record store fixture, relative to the config's directory.
    pub store: Option<PathBuf>,
}

/// Raw TOML structure for `.reflink.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ReflinkTomlConfig {
    /// See [`Config::base_url`].
    base_url: Option<String>,
    /// See [`Config::group`].
    group: Option<String>,
    /// See [`Config::ignore_blockquotes`].
    #[serde(default)]
    ignore_blockquotes: bool,
    /// See [`Config::label_url`].
    #[serde(default)]
    label_url: LabelUrl,
    /// See [`Config::only_path`].
    #[serde(default)]
    only_path: bool,
    /// See [`Config::project`].
    project: Option<String>,
    /// See [`Config::reference_limit`].
    reference_limit: Option<usize>,
    /// See [`Config::store`].
    store: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            base_url: "http://localhost".to_string(),
            group: None,
            ignore_blockquotes: false,
            label_url: LabelUrl::default(),
            only_path: false,
            project: None,
            reference_limit: DEFAULT_REFERENCE_LIMIT,
            store: None,
        };
    }
}

impl Config {
    /// Build the render context, resolving the configured project and group
    /// against `store`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownContainer` if the project or group is not in the store.
    pub fn context(&self, store: &MemoryStore) -> Result<RenderContext, Error> {
        let mut context = RenderContext::new(&self.base_url);
        context.ignore = IgnoreRules { blockquotes: self.ignore_blockquotes };
        context.label_url = self.label_url;
        context.only_path = self.only_path;
        context.reference_limit = self.reference_limit;

        if let Some(path) = &self.group {
            let group = store.lookup(ParentType::Group, path).ok_or_else(|| {
                return Error::UnknownContainer { kind: "group", path: path.clone() };
            })?;
            context = context.with_group(group.clone());
        }
        if let Some(path) = &self.project {
            let project = store.lookup(ParentType::Project, path).ok_or_else(|| {
                return Error::UnknownContainer { kind: "project", path: path.clone() };
            })?;
            context = context.with_project(project.clone());
        }
        return Ok(context);
    }

    /// Load config from `.reflink.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist, and an error if it exists
    /// but is malformed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// `Error::TomlDe` if the TOML is malformed, or `Error::InvalidConfig`
    /// if a value is out of range.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::parse(&content, root);
    }

    /// Load config from an explicitly named file.
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigNotFound` if the file is missing, otherwise as
    /// [`Config::load`].
    pub fn load_file(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ConfigNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
        };
        let root = path.parent().unwrap_or_else(|| return Path::new("."));
        return Self::parse(&content, root);
    }

    /// Load the configured store fixture, or an empty store if none is set.
    ///
    /// # Errors
    ///
    /// Returns the store's load errors.
    pub fn load_store(&self) -> Result<MemoryStore, Error> {
        return match &self.store {
            Some(path) => MemoryStore::load(path),
            None => Ok(MemoryStore::default()),
        };
    }

    /// Parse and validate config content. Relative store paths are joined to `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` or `Error::InvalidConfig`.
    fn parse(content: &str, root: &Path) -> Result<Self, Error> {
        let raw: ReflinkTomlConfig = toml::from_str(content)?;
        let defaults = Self::default();

        let base_url = raw.base_url.unwrap_or(defaults.base_url);
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig {
                key: "base_url".to_string(),
                reason: format!("`{base_url}` is not an http(s) URL"),
            });
        }
        let reference_limit = raw.reference_limit.unwrap_or(defaults.reference_limit);
        if reference_limit == 0 {
            return Err(Error::InvalidConfig {
                key: "reference_limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        return Ok(Self {
            base_url,
            group: raw.group,
            ignore_blockquotes: raw.ignore_blockquotes,
            label_url: raw.label_url,
            only_path: raw.only_path,
            project: raw.project,
            reference_limit,
            store: raw.store.map(|store| return root.join(store)),
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.reference_limit, 1000);
    }

    #[test]
    fn reads_every_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "base_url = \"https://git.example.com\"\nonly_path = true\nreference_limit = 5\n\
             ignore_blockquotes = true\nstore = \"store.toml\"\nproject = \"acme/api\"\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config.base_url, "https://git.example.com");
        assert!(config.only_path);
        assert!(config.ignore_blockquotes);
        assert_eq!(config.reference_limit, 5);
        assert_eq!(config.store, Some(dir.path().join("store.toml")));
        assert_eq!(config.project.as_deref(), Some("acme/api"));
    }

    #[test]
    fn label_url_reaches_the_context() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "label_url = \"merge_requests\"\n").unwrap();

        let config = Config::load(dir.path()).unwrap();
        let context = config.context(&MemoryStore::default()).unwrap();

        assert_eq!(config.label_url, LabelUrl::MergeRequests);
        assert_eq!(context.label_url, LabelUrl::MergeRequests);
        assert_eq!(Config::default().label_url, LabelUrl::Issues);
    }

    #[test]
    fn unknown_label_url_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "label_url = \"boards\"\n").unwrap();

        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "base_url = [").unwrap();

        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
    }

    #[test]
    fn zero_limit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "reference_limit = 0").unwrap();

        assert!(matches!(Config::load(dir.path()), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn explicit_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");

        assert!(matches!(Config::load_file(&path), Err(Error::ConfigNotFound { .. })));
    }

    #[test]
    fn unknown_project_is_an_error() {
        let config = Config {
            project: Some("acme/missing".to_string()),
            ..Config::default()
        };

        let err = config.context(&MemoryStore::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownContainer { kind: "project", .. }));
    }
}
