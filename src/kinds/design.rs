//! Designs: `#12[homescreen.png]`, `#12["login form.png"]`, or a design URL.
//!
//! This pass must run before the issue pass, which would otherwise link the
//! `#12` part on its own.

use crate::context::RenderContext;
use crate::error::Error;
use crate::kind::ReferenceKind;
use crate::model::{Design, EntityId, Parent};
use crate::pattern::{PatternSet, RefMatch, parent_prefix, project_link_pattern};
use crate::store::RecordStore;
use crate::types::Identifier;

/// Design references.
#[derive(Debug, Clone)]
pub struct DesignKind {
    /// Compiled recognizers.
    patterns: PatternSet,
}

impl DesignKind {
    /// Compile the design patterns for links under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if a pattern fails to compile.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let inline = format!(
            r#"{}#(?P<issue>\d+)\[(?:(?P<filename>[^\]\s"]+)|"(?P<filename_quoted>[^"]+)")\]"#,
            parent_prefix()
        );
        let link = project_link_pattern(base_url, r"issues/(?P<issue>\d+)/designs/(?P<url_filename>[^/?\#\s]+)");
        return Ok(Self {
            patterns: PatternSet::new("design", &inline, Some(&link))?,
        });
    }
}

impl ReferenceKind for DesignKind {
    type Record = Design;

    fn batch_fetch(&self, store: &dyn RecordStore, parent: &Parent, identifiers: &[Identifier]) -> Vec<Design> {
        let keys: Vec<(u64, String)> = identifiers
            .iter()
            .filter_map(|identifier| {
                return match identifier {
                    Identifier::Design { filename, issue_iid } => Some((*issue_iid, filename.clone())),
                    Identifier::Keyed(_) | Identifier::Sequence(_) => None,
                };
            })
            .collect();
        return store.designs(parent, &keys);
    }

    fn build_href(&self, record: &Design, parent: &Parent, context: &RenderContext) -> String {
        return context.url_for(&format!(
            "/{}/-/issues/{}/designs/{}",
            parent.full_path,
            record.issue_iid,
            urlencoding::encode(&record.filename)
        ));
    }

    fn build_title(&self, record: &Design, _matched: &RefMatch) -> String {
        return record.filename.clone();
    }

    fn canonical_identifiers(&self, record: &Design) -> Vec<Identifier> {
        return vec![Identifier::Design {
            filename: record.filename.clone(),
            issue_iid: record.issue_iid,
        }];
    }

    fn css_class(&self) -> &'static str {
        return "gfm-design";
    }

    fn data_attributes(&self, record: &Design, _parent: &Parent) -> Vec<(&'static str, String)> {
        return vec![("issue-iid", record.issue_iid.to_string())];
    }

    fn identifier_groups(&self) -> &'static [&'static str] {
        return &["issue"];
    }

    fn link_text_decorations(&self, _record: &Design, matched: &RefMatch) -> Vec<String> {
        return super::note_decoration(matched).into_iter().collect();
    }

    fn name(&self) -> &'static str {
        return "design";
    }

    /// Combine the issue number with the file name, which URLs carry
    /// percent-encoded.
    fn parse_identifier(&self, raw_symbol: &str, matched: &RefMatch) -> Option<Identifier> {
        let issue_iid = raw_symbol.parse().ok()?;
        let filename = match matched.capture("url_filename") {
            Some(encoded) => urlencoding::decode(encoded).ok()?.into_owned(),
            None => super::name_from(matched, &["filename", "filename_quoted"])?,
        };
        return Some(Identifier::Design { filename, issue_iid });
    }

    fn patterns(&self) -> &PatternSet {
        return &self.patterns;
    }

    fn record_id(&self, record: &Design) -> EntityId {
        return record.id;
    }

    fn reference(&self, record: &Design, parent: &Parent, from: Option<&Parent>) -> String {
        let filename = super::quoted_name(&record.filename, |name| {
            return !name.chars().any(|c| return c.is_whitespace() || c == ']' || c == '"');
        });
        return format!("{}#{}[{filename}]", parent.reference_prefix(from), record.issue_iid);
    }
}
