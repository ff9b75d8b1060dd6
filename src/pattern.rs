//! Reference recognizers and the matches they produce.
//!
//! Every kind supplies an inline pattern for bare text (`#42`) and, usually, a
//! link pattern for URLs (`https://host/acme/api/-/issues/42`). Both use the
//! same named groups so parent paths and decorations are read uniformly.

use std::collections::BTreeMap;
use std::ops::Range;

use regex::{Captures, Regex};

use crate::error::Error;
use crate::model::Parent;

/// One path segment of a project or group.
pub const PATH_SEGMENT: &str = r"[A-Za-z0-9_][A-Za-z0-9_.\-]*";

/// Optional `[/][namespace/]project` prefix shared by the inline patterns.
pub fn parent_prefix() -> String {
    return format!(
        r"(?:(?P<absolute_path>/)?(?:(?P<namespace>{PATH_SEGMENT}(?:/{PATH_SEGMENT})*)/)?(?P<project>{PATH_SEGMENT}))?"
    );
}

/// URL form of a project-scoped route under `base_url`.
///
/// `route` follows `/-/` and must capture the identifier itself, e.g.
/// `issues/(?P<issue>\d+)`. The whole URL is captured as `url`, an optional
/// `.json` or `.atom` suffix as `format` and a fragment as `anchor`.
pub fn project_link_pattern(base_url: &str, route: &str) -> String {
    let base = regex::escape(base_url.trim_end_matches('/'));
    return format!(
        r"(?P<url>{base}/(?P<namespace>{PATH_SEGMENT}(?:/{PATH_SEGMENT})*)/(?P<project>{PATH_SEGMENT})/-/{route}(?P<format>\.(?:json|atom))?(?:\#(?P<anchor>[A-Za-z0-9_\-]+))?)"
    );
}

/// Compiled inline and link recognizers of one kind, plus whole-string
/// variants used to test anchor targets.
#[derive(Debug, Clone)]
pub struct PatternSet {
    /// Bare-text pattern.
    inline: Regex,
    /// `inline` anchored at both ends.
    inline_exact: Regex,
    /// URL pattern and its anchored variant. `None` for kinds with no URL form.
    link: Option<(Regex, Regex)>,
}

impl PatternSet {
    /// Compile the pattern sources of `kind`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if either source is not a valid regex.
    pub fn new(kind: &'static str, inline: &str, link: Option<&str>) -> Result<Self, Error> {
        let compile = |source: &str| return Regex::new(source).map_err(|source| return Error::Pattern { kind, source });
        let link = match link {
            Some(source) => Some((compile(source)?, compile(&format!("^(?:{source})$"))?)),
            None => None,
        };
        return Ok(Self {
            inline: compile(inline)?,
            inline_exact: compile(&format!("^(?:{inline})$"))?,
            link,
        });
    }

    /// Bare-text pattern.
    pub const fn inline(&self) -> &Regex {
        return &self.inline;
    }

    /// Match `text` as a whole against the inline pattern.
    pub fn inline_exact(&self, text: &str, symbol_groups: &[&str]) -> Option<RefMatch> {
        let caps = self.inline_exact.captures(text)?;
        return Some(RefMatch::from_captures(&self.inline_exact, &caps, symbol_groups, false));
    }

    /// URL pattern, if the kind has one.
    pub fn link(&self) -> Option<&Regex> {
        return self.link.as_ref().map(|(link, _)| return link);
    }

    /// Match `text` as a whole against the link pattern.
    pub fn link_exact(&self, text: &str, symbol_groups: &[&str]) -> Option<RefMatch> {
        let (_, exact) = self.link.as_ref()?;
        let caps = exact.captures(text)?;
        return Some(RefMatch::from_captures(exact, &caps, symbol_groups, true));
    }

    /// All inline and link matches in `text`. Link matches come second; a
    /// reference found by both is reported twice and deduplicated by callers.
    pub fn scan_all(&self, text: &str, symbol_groups: &[&str]) -> Vec<RefMatch> {
        let mut out = scan(&self.inline, text, symbol_groups, false);
        if let Some(link) = self.link() {
            out.extend(scan(link, text, symbol_groups, true));
        }
        return out;
    }
}

/// Every non-overlapping match of `regex` in `text`.
pub fn scan(regex: &Regex, text: &str, symbol_groups: &[&str], from_link_pattern: bool) -> Vec<RefMatch> {
    return regex
        .captures_iter(text)
        .map(|caps| return RefMatch::from_captures(regex, &caps, symbol_groups, from_link_pattern))
        .collect();
}

/// The result of applying a pattern to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefMatch {
    /// Named groups that took part in the match, with their byte ranges in
    /// the scanned text.
    captures: BTreeMap<String, (Range<usize>, String)>,
    /// Whether the link pattern produced this match.
    pub from_link_pattern: bool,
    /// Byte range of the match in the scanned text.
    pub range: Range<usize>,
    /// Text of the first participating identifier group.
    pub symbol: Option<String>,
    /// Full matched text.
    pub text: String,
}

impl RefMatch {
    /// Fragment after `#`, e.g. `note_123`.
    pub fn anchor(&self) -> Option<&str> {
        return self.capture("anchor");
    }

    /// Text of a named group, if it took part in the match.
    pub fn capture(&self, name: &str) -> Option<&str> {
        return self.captures.get(name).map(|(_, text)| return text.as_str());
    }

    /// Copy a regex match into an owned `RefMatch`.
    fn from_captures(regex: &Regex, caps: &Captures<'_>, symbol_groups: &[&str], from_link_pattern: bool) -> Self {
        let captures: BTreeMap<String, (Range<usize>, String)> = regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                return caps
                    .name(name)
                    .map(|m| return (name.to_string(), (m.range(), m.as_str().to_string())));
            })
            .collect();
        let symbol = symbol_groups
            .iter()
            .find_map(|group| return captures.get(*group).map(|(_, text)| return text.clone()));
        let whole = caps.get(0);
        return Self {
            captures,
            from_link_pattern,
            range: whole.map_or(0..0, |m| return m.range()),
            symbol,
            text: whole.map_or_else(String::new, |m| return m.as_str().to_string()),
        };
    }

    /// Explicit URL captured by a link pattern, with any format suffix removed.
    ///
    /// The suffix is cut at its own position, so a path segment that happens
    /// to end in `.json` is left alone.
    pub fn url_without_format(&self) -> Option<String> {
        let (url_range, url) = self.captures.get("url")?;
        let Some((format_range, _)) = self.captures.get("format") else {
            return Some(url.clone());
        };
        let start = format_range.start.checked_sub(url_range.start)?;
        let end = format_range.end.checked_sub(url_range.start)?;
        let mut out = url.get(..start)?.to_string();
        out.push_str(url.get(end..)?);
        return Some(out);
    }
}

/// Where the parent of a reference lives, as written in the reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParentPath {
    /// Fully qualified (`acme/api`) or rooted (`/api`) path.
    Absolute(String),
    /// No prefix: the parent of the rendering context.
    Current,
    /// Bare path, relative to the rendering context's container.
    Relative(String),
}

impl ParentPath {
    /// Read the parent prefix captures of a match.
    pub fn from_match(m: &RefMatch) -> Self {
        let rooted = m.capture("absolute_path").is_some();
        return match (m.capture("namespace"), m.capture("project")) {
            (_, None) => ParentPath::Current,
            (Some(namespace), Some(project)) => ParentPath::Absolute(format!("{namespace}/{project}")),
            (None, Some(project)) if rooted => ParentPath::Absolute(project.to_string()),
            (None, Some(project)) => ParentPath::Relative(project.to_string()),
        };
    }

    /// Full path this reference names, given the context's parent.
    ///
    /// Relative paths join the container holding `current`: a project's
    /// namespace, or a group itself. `None` when the reference relies on a
    /// context parent that does not exist.
    pub fn full_path(&self, current: Option<&Parent>) -> Option<String> {
        return match self {
            ParentPath::Absolute(path) => Some(path.clone()),
            ParentPath::Current => current.map(|parent| return parent.full_path.clone()),
            ParentPath::Relative(path) => {
                let base = current.map_or("", |parent| {
                    return match parent.kind {
                        crate::model::ParentType::Group => parent.full_path.as_str(),
                        crate::model::ParentType::Project => parent.namespace_path(),
                    };
                });
                if base.is_empty() { Some(path.clone()) } else { Some(format!("{base}/{path}")) }
            },
        };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;
    use crate::model::ParentType;

    fn issue_patterns() -> PatternSet {
        let inline = format!(r"{}#(?P<issue>\d+)\b", parent_prefix());
        let link = project_link_pattern("https://example.com", r"issues/(?P<issue>\d+)\b");
        PatternSet::new("issue", &inline, Some(&link)).unwrap()
    }

    #[test]
    fn reads_parent_paths_from_prefixes() {
        let patterns = issue_patterns();
        let paths: Vec<ParentPath> = ["#1", "api#1", "acme/api#1", "/api#1"]
            .iter()
            .map(|text| ParentPath::from_match(&patterns.inline_exact(text, &["issue"]).unwrap()))
            .collect();

        assert_eq!(
            paths,
            vec![
                ParentPath::Current,
                ParentPath::Relative("api".to_string()),
                ParentPath::Absolute("acme/api".to_string()),
                ParentPath::Absolute("api".to_string()),
            ]
        );
    }

    #[test]
    fn relative_paths_join_the_context_namespace() {
        let current = Parent {
            full_name: "acme / web".to_string(),
            full_path: "acme/web".to_string(),
            id: 1,
            kind: ParentType::Project,
            name: "web".to_string(),
            namespace_id: None,
        };
        let path = ParentPath::Relative("api".to_string());

        assert_eq!(path.full_path(Some(&current)), Some("acme/api".to_string()));
        assert_eq!(ParentPath::Current.full_path(None), None);
    }

    #[test]
    fn link_matches_capture_url_and_decorations() {
        let patterns = issue_patterns();
        let m = patterns
            .link_exact("https://example.com/acme/api/-/issues/7.json#note_3", &["issue"])
            .unwrap();

        assert!(m.from_link_pattern);
        assert_eq!(m.symbol.as_deref(), Some("7"));
        assert_eq!(m.anchor(), Some("note_3"));
        assert_eq!(m.url_without_format().as_deref(), Some("https://example.com/acme/api/-/issues/7#note_3"));
    }

    #[test]
    fn format_suffix_is_cut_where_it_was_captured() {
        let patterns = issue_patterns();
        let m = patterns
            .link_exact("https://example.com/acme/api.json/-/issues/7.json#note_2", &["issue"])
            .unwrap();

        assert_eq!(
            m.url_without_format().as_deref(),
            Some("https://example.com/acme/api.json/-/issues/7#note_2")
        );
        let plain = patterns.link_exact("https://example.com/acme/api.json/-/issues/7", &["issue"]).unwrap();
        assert_eq!(plain.url_without_format().as_deref(), Some("https://example.com/acme/api.json/-/issues/7"));
    }

    #[test]
    fn scan_reports_byte_ranges() {
        let patterns = issue_patterns();
        let matches = scan(patterns.inline(), "See #4 and #5.", &["issue"], false);

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].range, 4..6);
        assert_eq!(matches[1].text, "#5");
    }
}
