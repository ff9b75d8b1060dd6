use std::path::Path;
use std::process::{Command, Output};

fn reflink_cmd(fixture: &str) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_reflink"));
    cmd.current_dir(Path::new("tests/fixtures").join(fixture));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn render_links_every_kind() {
    let output = reflink_cmd("site").args(["render", "doc.html"]).output().unwrap();
    assert!(output.status.success(), "render failed: {}", stderr(&output));

    let html = stdout(&output);
    assert!(html.contains(r#"href="https://git.example.com/acme/api/-/issues/12""#));
    assert!(html.contains(r#"href="https://git.example.com/acme/api/-/merge_requests/7""#));
    assert!(html.contains(r#"href="https://git.example.com/acme/web/-/issues/3""#));
    assert!(html.contains("gfm-label"));
    assert!(html.contains("gfm-milestone"));
    assert!(html.contains("<pre><code>#12 stays code</code></pre>"));
    assert!(html.contains("Unknown #999 stays text."));
}

#[test]
fn render_json_reports_references() {
    let output = reflink_cmd("site").args(["render", "doc.html", "--json"]).output().unwrap();
    assert!(output.status.success(), "render failed: {}", stderr(&output));

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert!(value["html"].as_str().unwrap().contains("gfm-issue"));
    assert_eq!(value["truncated"], false);
    assert_eq!(value["references"]["merge_request"][0]["id"], 200);
}

#[test]
fn refs_lists_resolved_records() {
    let output = reflink_cmd("site").args(["refs", "doc.html"]).output().unwrap();
    assert!(output.status.success(), "refs failed: {}", stderr(&output));

    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let issues: Vec<&str> = value["issue"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["reference"].as_str().unwrap())
        .collect();
    assert_eq!(issues, vec!["acme/api#12", "acme/web#3"]);
    assert_eq!(value["label"][0]["id"], 300);
}

#[test]
fn directory_without_out_dir_fails() {
    let output = reflink_cmd("site").args(["render", "docs"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Output Directory Required"));
}

#[test]
fn directory_renders_into_out_dir() {
    let out = tempfile::tempdir().unwrap();
    let output = reflink_cmd("site")
        .args(["render", "docs", "--out-dir"])
        .arg(out.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "render failed: {}", stderr(&output));

    let index = std::fs::read_to_string(out.path().join("index.html")).unwrap();
    let merge = std::fs::read_to_string(out.path().join("guides/merge.html")).unwrap();
    assert!(index.contains("gfm-issue"));
    assert!(merge.contains("gfm-merge_request"));
    assert!(!out.path().join("notes.txt").exists());
    assert!(stderr(&output).contains("Rendered 2 files"));
}

#[test]
fn reference_limit_exits_with_truncated_code() {
    let output = reflink_cmd("site")
        .args(["--config", "limited.toml", "render", "twice.html"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let html = stdout(&output);
    assert_eq!(html.matches("gfm-issue").count(), 1);
    assert!(html.contains("and again #12</p>"));
}

#[test]
fn unknown_project_is_reported() {
    let output = reflink_cmd("site")
        .args(["--config", "unknown.toml", "render", "doc.html"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Unknown Project"));
    assert!(stderr(&output).contains("`acme/gone`"));
}

#[test]
fn missing_input_is_reported() {
    let output = reflink_cmd("site").args(["render", "nope.html"]).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("File Not Found"));
}
