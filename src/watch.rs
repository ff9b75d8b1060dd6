//! File watcher: renders on startup, then re-renders when the input, the
//! config or the store fixture changes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use crate::commands;
use crate::config::{CONFIG_FILE, Config};
use crate::diagnostics;
use crate::error::Error;

/// Debounce delay between filesystem events and re-render.
const DEBOUNCE_MS: u64 = 100;

/// Exit code for a render that failed inside the watch loop.
const EXIT_RENDER_FAILED: u8 = 3;

/// `path` joined to the working directory when relative.
fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    return std::env::current_dir().map_or_else(|_| return path.to_path_buf(), |cwd| return cwd.join(path));
}

/// Create a filesystem watcher that sends the paths of relevant events on
/// the given channel.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be created.
fn create_watcher(tx: crossbeam_channel::Sender<Vec<PathBuf>>) -> Result<notify::RecommendedWatcher, Error> {
    let watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(event.paths);
        }
    })?;
    return Ok(watcher);
}

/// Render once and print the result. Errors are reported, not returned, so
/// the loop keeps running.
fn render_once(file: &Path, config_path: Option<&Path>) -> ExitCode {
    return match commands::render(file, false, None, config_path) {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(EXIT_RENDER_FAILED)
        },
    };
}

/// Entry point for the watch command.
///
/// Renders `file` once, then watches the directories holding it, the config
/// and the store fixture, and re-renders after each burst of changes.
///
/// # Errors
///
/// Returns `Error::Watch` if the watcher cannot be set up.
pub fn run(file: &Path, config_path: Option<&Path>) -> Result<ExitCode, Error> {
    tracing::info!(path = %file.display(), "watch: initial render");
    let mut last_code = render_once(file, config_path);

    let files = watched_files(file, config_path);
    let dirs: HashSet<PathBuf> = files.iter().filter_map(|f| return f.parent().map(Path::to_path_buf)).collect();

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;
    for dir in &dirs {
        if dir.exists() {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
        }
    }
    eprintln!("watch: monitoring {} files, press Ctrl+C to stop", files.len());

    while let Ok(paths) = rx.recv() {
        let mut relevant = paths.iter().any(|p| return files.contains(p));
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while let Ok(more) = rx.recv_timeout(debounce) {
            relevant |= more.iter().any(|p| return files.contains(p));
        }
        if !relevant {
            continue;
        }
        tracing::info!("watch: change detected, re-rendering");
        last_code = render_once(file, config_path);
    }

    return Ok(last_code);
}

/// Files whose changes trigger a re-render.
fn watched_files(file: &Path, config_path: Option<&Path>) -> HashSet<PathBuf> {
    let mut files = HashSet::from([absolute(file)]);
    files.insert(absolute(config_path.unwrap_or_else(|| return Path::new(CONFIG_FILE))));
    let config = match config_path {
        Some(path) => Config::load_file(path).ok(),
        None => Config::load(Path::new(".")).ok(),
    };
    if let Some(store) = config.and_then(|c| return c.store) {
        files.insert(absolute(&store));
    }
    return files;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_are_kept() {
        let path = Path::new("/tmp/doc.html");
        assert_eq!(absolute(path), PathBuf::from("/tmp/doc.html"));
    }

    #[test]
    fn relative_paths_join_the_working_directory() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolute(Path::new("doc.html")), cwd.join("doc.html"));
    }
}
