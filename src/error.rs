/// Crate-level error types for reflink diagnostics.
use std::path::PathBuf;

/// Errors raised while setting up a render: loading configuration, loading the
/// record store, compiling reference patterns, or reading and writing files.
///
/// Reference resolution itself never fails. A reference that cannot be resolved
/// is left as plain text, so nothing in this enum describes a "not found" record.
#[allow(clippy::error_impl_error, reason = "crate-level error type")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced config file does not exist on disk.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// A config value is present but unusable.
    #[error("invalid config: `{key}`: {reason}")]
    InvalidConfig {
        /// Config key holding the bad value.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A file named on the command line does not exist.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization of render results failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// A directory was given to `render` without an output directory.
    #[error("{} is a directory, pass --out-dir to render it", path.display())]
    OutDirRequired {
        /// Directory that was passed as the input.
        path: PathBuf,
    },

    /// A reference pattern failed to compile.
    #[error("invalid {kind} reference pattern: {source}")]
    Pattern {
        /// Entity kind whose pattern was being built.
        kind: &'static str,
        /// The wrapped regex error.
        source: regex::Error,
    },

    /// The store fixture is readable TOML but violates a store invariant.
    #[error("store corrupt: {reason}")]
    StoreCorrupt {
        /// Description of the violated invariant.
        reason: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// The render context names a project or group the store does not know.
    #[error("unknown {kind}: `{path}`")]
    UnknownContainer {
        /// `project` or `group`.
        kind: &'static str,
        /// Full path that failed to resolve.
        path: String,
    },

    /// The filesystem watcher could not be started.
    #[error("watch: {0}")]
    Watch(
        /// The wrapped notify error.
        #[from]
        notify::Error,
    ),
}
