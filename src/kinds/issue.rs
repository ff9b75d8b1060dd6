//! Issues: `#12`, `acme/api#12`, or an issue URL.

use crate::context::RenderContext;
use crate::error::Error;
use crate::kind::ReferenceKind;
use crate::model::{EntityId, Issue, Parent};
use crate::pattern::{PatternSet, RefMatch, parent_prefix, project_link_pattern};
use crate::store::RecordStore;
use crate::types::Identifier;

/// Issue references.
#[derive(Debug, Clone)]
pub struct IssueKind {
    /// Compiled recognizers.
    patterns: PatternSet,
}

impl IssueKind {
    /// Compile the issue patterns for links under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if a pattern fails to compile.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let inline = format!(r"{}#(?P<issue>\d+)\b", parent_prefix());
        let link = project_link_pattern(base_url, r"(?:issues|work_items)/(?P<issue>\d+)\b");
        return Ok(Self {
            patterns: PatternSet::new("issue", &inline, Some(&link))?,
        });
    }
}

impl ReferenceKind for IssueKind {
    type Record = Issue;

    fn batch_fetch(&self, store: &dyn RecordStore, parent: &Parent, identifiers: &[Identifier]) -> Vec<Issue> {
        return store.issues(parent, &super::sequence_numbers(identifiers));
    }

    fn build_href(&self, record: &Issue, parent: &Parent, context: &RenderContext) -> String {
        return context.url_for(&format!("/{}/-/issues/{}", parent.full_path, record.iid));
    }

    fn build_title(&self, record: &Issue, _matched: &RefMatch) -> String {
        return record.title.clone();
    }

    fn canonical_identifiers(&self, record: &Issue) -> Vec<Identifier> {
        return vec![Identifier::Sequence(record.iid)];
    }

    fn css_class(&self) -> &'static str {
        return "gfm-issue";
    }

    fn data_attributes(&self, record: &Issue, _parent: &Parent) -> Vec<(&'static str, String)> {
        return vec![("state", record.state.clone())];
    }

    fn identifier_groups(&self) -> &'static [&'static str] {
        return &["issue"];
    }

    fn link_text_decorations(&self, _record: &Issue, matched: &RefMatch) -> Vec<String> {
        return super::note_decoration(matched).into_iter().collect();
    }

    fn name(&self) -> &'static str {
        return "issue";
    }

    fn parse_identifier(&self, raw_symbol: &str, _matched: &RefMatch) -> Option<Identifier> {
        return raw_symbol.parse().ok().map(Identifier::Sequence);
    }

    fn patterns(&self) -> &PatternSet {
        return &self.patterns;
    }

    fn record_id(&self, record: &Issue) -> EntityId {
        return record.id;
    }

    fn reference(&self, record: &Issue, parent: &Parent, from: Option<&Parent>) -> String {
        return format!("{}#{}", parent.reference_prefix(from), record.iid);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, reason = "tests")]
mod tests {
    use super::*;
    use crate::kinds::test_support::{BASE, context, links, render, store};

    fn issue(id: EntityId, iid: u64, project_id: EntityId) -> Issue {
        Issue {
            id,
            iid,
            project_id,
            state: "closed".to_string(),
            title: format!("Issue <{iid}>"),
        }
    }

    #[test]
    fn shortens_references_by_namespace() {
        let (mut store, api) = store();
        store.add_issue(issue(1, 1, 10));
        store.add_issue(issue(2, 2, 11));
        store.add_issue(issue(3, 3, 20));
        let kind = IssueKind::new(BASE).unwrap();

        let (doc, _) = render(&kind, "<p>#1, web#2, other/tools#3</p>", &store, &context(api));
        let texts: Vec<String> = links(&doc).into_iter().map(|(_, text)| text).collect();

        assert_eq!(texts, vec!["#1", "web#2", "other/tools#3"]);
    }

    #[test]
    fn carries_title_and_state() {
        let (mut store, api) = store();
        store.add_issue(issue(1, 1, 10));
        let kind = IssueKind::new(BASE).unwrap();

        let (doc, _) = render(&kind, "<p>#1</p>", &store, &context(api));
        let (link, _) = &links(&doc)[0];

        assert_eq!(link.attr("title"), Some("Issue <1>"));
        assert_eq!(link.attr("data-state"), Some("closed"));
        assert_eq!(link.attr("data-reference-type"), Some("issue"));
    }

    #[test]
    fn rooted_path_resolves_from_the_top() {
        let (mut store, api) = store();
        store.add_project(30, "web");
        store.add_issue(issue(1, 1, 30));
        store.add_issue(issue(2, 1, 11));
        let kind = IssueKind::new(BASE).unwrap();

        let (doc, _) = render(&kind, "<p>/web#1 web#1</p>", &store, &context(api));
        let ids: Vec<String> = links(&doc)
            .into_iter()
            .map(|(el, _)| el.attr("data-issue").unwrap().to_string())
            .collect();

        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(store.count_queries("find_parents"), 2);
    }

    #[test]
    fn only_path_drops_the_host() {
        let (mut store, api) = store();
        store.add_issue(issue(1, 1, 10));
        let kind = IssueKind::new(BASE).unwrap();
        let mut context = context(api);
        context.only_path = true;

        let (doc, _) = render(&kind, "<p>#1</p>", &store, &context);

        assert_eq!(links(&doc)[0].0.attr("href"), Some("/acme/platform/api/-/issues/1"));
    }
}
