//! Merge requests: `!12`, `acme/api!12`, or a merge request URL.

use crate::context::RenderContext;
use crate::error::Error;
use crate::kind::ReferenceKind;
use crate::model::{EntityId, MergeRequest, Parent};
use crate::pattern::{PatternSet, RefMatch, parent_prefix, project_link_pattern};
use crate::store::RecordStore;
use crate::types::Identifier;

/// Merge request references.
#[derive(Debug, Clone)]
pub struct MergeRequestKind {
    /// Compiled recognizers.
    patterns: PatternSet,
}

impl MergeRequestKind {
    /// Compile the merge request patterns for links under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if a pattern fails to compile.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let inline = format!(r"{}!(?P<merge_request>\d+)\b", parent_prefix());
        let link = project_link_pattern(
            base_url,
            r"merge_requests/(?P<merge_request>\d+)\b(?:/(?P<tab>diffs|commits|pipelines))?",
        );
        return Ok(Self {
            patterns: PatternSet::new("merge_request", &inline, Some(&link))?,
        });
    }
}

impl ReferenceKind for MergeRequestKind {
    type Record = MergeRequest;

    fn batch_fetch(&self, store: &dyn RecordStore, parent: &Parent, identifiers: &[Identifier]) -> Vec<MergeRequest> {
        return store.merge_requests(parent, &super::sequence_numbers(identifiers));
    }

    fn build_href(&self, record: &MergeRequest, parent: &Parent, context: &RenderContext) -> String {
        return context.url_for(&format!("/{}/-/merge_requests/{}", parent.full_path, record.iid));
    }

    fn build_title(&self, record: &MergeRequest, _matched: &RefMatch) -> String {
        return record.title.clone();
    }

    fn canonical_identifiers(&self, record: &MergeRequest) -> Vec<Identifier> {
        return vec![Identifier::Sequence(record.iid)];
    }

    fn css_class(&self) -> &'static str {
        return "gfm-merge_request";
    }

    fn data_attributes(&self, record: &MergeRequest, _parent: &Parent) -> Vec<(&'static str, String)> {
        return vec![("state", record.state.clone())];
    }

    fn identifier_groups(&self) -> &'static [&'static str] {
        return &["merge_request"];
    }

    /// The tab a link points at comes before any comment.
    fn link_text_decorations(&self, _record: &MergeRequest, matched: &RefMatch) -> Vec<String> {
        let mut decorations: Vec<String> = matched.capture("tab").map(str::to_string).into_iter().collect();
        decorations.extend(super::note_decoration(matched));
        return decorations;
    }

    fn name(&self) -> &'static str {
        return "merge_request";
    }

    fn parse_identifier(&self, raw_symbol: &str, _matched: &RefMatch) -> Option<Identifier> {
        return raw_symbol.parse().ok().map(Identifier::Sequence);
    }

    fn patterns(&self) -> &PatternSet {
        return &self.patterns;
    }

    fn record_id(&self, record: &MergeRequest) -> EntityId {
        return record.id;
    }

    fn reference(&self, record: &MergeRequest, parent: &Parent, from: Option<&Parent>) -> String {
        return format!("{}!{}", parent.reference_prefix(from), record.iid);
    }
}
