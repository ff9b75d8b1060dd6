use std::path::Path;

use crate::config::CONFIG_FILE;
use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// `project` -> `Project`.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    return match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
}

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where the user can
/// act on it, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::ConfigNotFound { path } => render_config_not_found(path),
        Error::InvalidConfig { key, reason } => render_invalid_config(key, reason),
        Error::OutDirRequired { path } => render_out_dir_required(path),
        Error::Pattern { kind, source } => render_pattern(kind, source),
        Error::StoreCorrupt { reason } => render_store_corrupt(reason),
        Error::UnknownContainer { kind, path } => render_unknown_container(kind, path),
        _ => render_generic(e),
    };
}

fn render_config_not_found(path: &Path) -> String {
    return format!(
        "\
# Error: Config Not Found

`{}` does not exist.

## Fix

Create it, or drop `--config` to use `{CONFIG_FILE}` in the working directory.
",
        path.display()
    );
}

fn render_generic(e: &Error) -> String {
    return match e {
        Error::FileNotFound { path } => format!(
            "\
# Error: File Not Found

`{}` does not exist.
",
            path.display()
        ),

        Error::Io(e) => format!(
            "\
# Error: I/O

{e}
"
        ),

        Error::Json(e) => format!(
            "\
# Error: JSON Serialization

{e}
"
        ),

        Error::TomlDe(e) => format!(
            "\
# Error: Invalid TOML

{e}
"
        ),

        Error::Watch(e) => format!(
            "\
# Error: Watch Failed

{e}
"
        ),

        // Handled in render_error, listed for an exhaustive match.
        _ => format!(
            "\
# Error

{e}
"
        ),
    };
}

fn render_invalid_config(key: &str, reason: &str) -> String {
    return format!(
        "\
# Error: Invalid Config

`{key}`: {reason}

## Fix

Correct `{key}` in `{CONFIG_FILE}`.
"
    );
}

fn render_out_dir_required(path: &Path) -> String {
    let dir = path.display();
    return format!(
        "\
# Error: Output Directory Required

`{dir}` is a directory. Rendering a directory writes one file per input.

## Fix

    reflink render {dir} --out-dir rendered
"
    );
}

fn render_pattern(kind: &str, source: &regex::Error) -> String {
    return format!(
        "\
# Error: Invalid Reference Pattern

The {kind} pattern did not compile:

{source}

## Fix

Check `base_url` in `{CONFIG_FILE}`.
"
    );
}

fn render_store_corrupt(reason: &str) -> String {
    return format!(
        "\
# Error: Store Corrupt

{reason}

## Fix

Give each project and each group a unique path in the store file.
"
    );
}

fn render_unknown_container(kind: &str, path: &str) -> String {
    return format!(
        "\
# Error: Unknown {}

`{path}` is not in the record store.

## Fix

Add it to the store file under `[[{kind}s]]`, or change `{kind}` in `{CONFIG_FILE}`.
",
        capitalize(kind)
    );
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn unknown_container_names_kind_and_path() {
        let md = render_error(&Error::UnknownContainer { kind: "project", path: "acme/gone".to_string() });

        assert!(md.starts_with("# Error: Unknown Project\n"));
        assert!(md.contains("`acme/gone`"));
        assert!(md.contains("[[projects]]"));
    }

    #[test]
    fn out_dir_required_shows_the_fixed_command() {
        let md = render_error(&Error::OutDirRequired { path: PathBuf::from("docs") });

        assert!(md.contains("    reflink render docs --out-dir rendered"));
    }

    #[test]
    fn invalid_config_points_at_the_key() {
        let md = render_error(&Error::InvalidConfig {
            key: "reference_limit".to_string(),
            reason: "must be at least 1".to_string(),
        });

        assert!(md.contains("`reference_limit`: must be at least 1"));
        assert!(md.contains(".reflink.toml"));
    }

    #[test]
    fn missing_file_has_no_fix_section() {
        let md = render_error(&Error::FileNotFound { path: PathBuf::from("a.html") });

        assert!(md.starts_with("# Error: File Not Found"));
        assert!(!md.contains("## Fix"));
    }

    #[test]
    fn every_block_is_a_markdown_document() {
        let errors = [
            Error::ConfigNotFound { path: PathBuf::from("x.toml") },
            Error::StoreCorrupt { reason: "duplicate project path `a/b`".to_string() },
            Error::Io(std::io::Error::other("disk full")),
        ];
        for e in &errors {
            assert!(render_error(e).starts_with("# Error"));
        }
    }
}
