//! CLI commands for reflink: render and refs. `watch` lives in its own module.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use walkdir::WalkDir;

use crate::cache::RecordCache;
use crate::config::Config;
use crate::context::RenderContext;
use crate::error::Error;
use crate::pipeline::{Pipeline, Rendered};
use crate::store::MemoryStore;

/// Exit code when output was produced but some references were left as text.
pub const EXIT_TRUNCATED: u8 = 2;

/// Everything a render needs, built once per command.
pub struct Session {
    /// Process-wide record cache. One per command run, so a batch shares it.
    pub cache: RecordCache,
    /// Render context from the config.
    pub context: RenderContext,
    /// Reference passes.
    pub pipeline: Pipeline,
    /// Record store.
    pub store: MemoryStore,
}

impl Session {
    /// Load config, store and pipeline.
    ///
    /// # Errors
    ///
    /// Returns config, store or pattern errors.
    pub fn open(config_path: Option<&Path>) -> Result<Self, Error> {
        let config = match config_path {
            Some(path) => Config::load_file(path)?,
            None => Config::load(Path::new("."))?,
        };
        let store = config.load_store()?;
        let context = config.context(&store)?;
        let pipeline = Pipeline::default_kinds(&context)?;
        tracing::debug!(kinds = ?pipeline.kinds(), base_url = %context.base_url, "session ready");
        return Ok(Self {
            cache: RecordCache::new(),
            context,
            pipeline,
            store,
        });
    }

    /// Render one file.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` or `Error::Io` if the file cannot be read.
    pub fn render_file(&mut self, path: &Path) -> Result<Rendered, Error> {
        let html = read_input(path)?;
        let rendered = self.pipeline.render(&html, &self.context, &self.store, &mut self.cache);
        tracing::info!(
            path = %path.display(),
            links = rendered.references.values().map(Vec::len).sum::<usize>(),
            truncated = rendered.truncated,
            "rendered"
        );
        return Ok(rendered);
    }
}

/// Success, or `EXIT_TRUNCATED` when any document hit the reference limit.
fn exit_code(truncated: bool) -> ExitCode {
    if truncated {
        eprintln!("warning: reference limit reached, some references were left as text");
        return ExitCode::from(EXIT_TRUNCATED);
    }
    return ExitCode::SUCCESS;
}

/// HTML as-is, or the whole render result as JSON.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails.
fn format_output(rendered: &Rendered, json: bool) -> Result<String, Error> {
    if json {
        let mut out = serde_json::to_string_pretty(rendered)?;
        out.push('\n');
        return Ok(out);
    }
    return Ok(rendered.html.clone());
}

/// Collect `.html` files under `root`, sorted for stable output.
fn html_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file() && e.path().extension().is_some_and(|ext| return ext == "html"))
        .map(|e| return e.into_path())
        .collect();
    files.sort();
    return files;
}

/// Read an input file, reporting a missing file by path.
///
/// # Errors
///
/// Returns `Error::FileNotFound` or `Error::Io`.
fn read_input(path: &Path) -> Result<String, Error> {
    return match std::fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::FileNotFound { path: path.to_path_buf() }),
        Err(e) => Err(Error::Io(e)),
    };
}

/// Print the resolved references of one file as JSON.
///
/// # Errors
///
/// Returns config, store, read or JSON errors.
pub fn refs(file: &Path, config_path: Option<&Path>) -> Result<ExitCode, Error> {
    let mut session = Session::open(config_path)?;
    let rendered = session.render_file(file)?;
    println!("{}", serde_json::to_string_pretty(&rendered.references)?);
    return Ok(exit_code(rendered.truncated));
}

/// Render a file to stdout, or every `.html` file under a directory into
/// `out_dir`, sharing one record cache across the batch.
///
/// # Errors
///
/// Returns `Error::OutDirRequired` for a directory without `out_dir`, and
/// config, store, read, write or JSON errors.
pub fn render(path: &Path, json: bool, out_dir: Option<&Path>, config_path: Option<&Path>) -> Result<ExitCode, Error> {
    let mut session = Session::open(config_path)?;

    if !path.is_dir() {
        let rendered = session.render_file(path)?;
        let output = format_output(&rendered, json)?;
        match out_dir {
            Some(dir) => {
                let name = path.file_name().map_or_else(|| return PathBuf::from("out.html"), PathBuf::from);
                write_output(&dir.join(name), &output, json)?;
            },
            None => print!("{output}"),
        }
        return Ok(exit_code(rendered.truncated));
    }

    let out_dir = out_dir.ok_or_else(|| return Error::OutDirRequired { path: path.to_path_buf() })?;
    let files = html_files(path);
    let mut truncated = false;
    for file in &files {
        let rendered = session.render_file(file)?;
        truncated |= rendered.truncated;
        let relative = file.strip_prefix(path).unwrap_or(file);
        write_output(&out_dir.join(relative), &format_output(&rendered, json)?, json)?;
    }

    let stats = session.cache.stats();
    eprintln!(
        "Rendered {} files ({} cache hits, {} misses)",
        files.len(),
        stats.hits,
        stats.misses
    );
    return Ok(exit_code(truncated));
}

/// Write one output file, creating parent directories. JSON output gets a
/// `.json` extension.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be written.
fn write_output(path: &Path, content: &str, json: bool) -> Result<(), Error> {
    let path = if json { path.with_extension("json") } else { path.to_path_buf() };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, content)?;
    return Ok(());
}
