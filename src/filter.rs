//! Scan-and-rewrite engine: one pass of one kind over one document.
//!
//! The pass first asks its [`ReferenceCache`] to resolve every reference in
//! the node list, then walks the list once and replaces each node holding a
//! resolved reference with the generated link HTML. Replaced nodes are swapped
//! for the live eligible nodes of their replacement, so the list stays usable
//! by the passes that follow.

use crate::cache::RecordCache;
use crate::context::RenderContext;
use crate::dom::{Document, IgnoreRules, NodeData, NodeId, escape_text};
use crate::kind::ReferenceKind;
use crate::link::LinkBuilder;
use crate::pattern::{RefMatch, scan};
use crate::reference_cache::ReferenceCache;
use crate::store::RecordStore;
use crate::types::ResolvedReference;

/// What one pass did to a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// Distinct records linked, in first-seen order.
    pub references: Vec<ResolvedReference>,
    /// Number of links created.
    pub rewritten: usize,
    /// Whether resolved references were left as text because of the limit.
    pub truncated: bool,
}

impl FilterOutcome {
    /// Count one link to `reference`.
    fn record(&mut self, reference: ResolvedReference) {
        self.rewritten = self.rewritten.saturating_add(1);
        if !self.references.contains(&reference) {
            self.references.push(reference);
        }
    }
}

/// One kind's rewrite pass.
pub struct ReferenceFilter<'a, K: ReferenceKind> {
    /// Rendering context.
    context: &'a RenderContext,
    /// Kind being linked.
    kind: &'a K,
}

impl<'a, K: ReferenceKind> ReferenceFilter<'a, K> {
    /// Resolve and rewrite every reference of this kind in `nodes`.
    ///
    /// `nodes` must hold the document's eligible nodes in document order. On
    /// return it holds them again, with every replaced node swapped for the
    /// eligible nodes of its replacement.
    pub fn call(
        &self,
        doc: &mut Document,
        nodes: &mut Vec<NodeId>,
        store: &dyn RecordStore,
        cache: &mut RecordCache,
    ) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        let mut references = ReferenceCache::new(self.kind, self.context);
        references.load(doc, nodes, store, cache);
        if references.is_empty() {
            return outcome;
        }

        let rules = self.context.ignore;
        let mut index = 0;
        while let Some(&node) = nodes.get(index) {
            let replacement = match doc.data(node) {
                NodeData::Text(text) => self.rewrite_text(text, &references, &mut outcome),
                NodeData::Element(_) => self.rewrite_anchor(doc, node, &references, &mut outcome),
                NodeData::Comment(_) | NodeData::Root => None,
            };
            let Some(html) = replacement else {
                index = index.saturating_add(1);
                continue;
            };
            let live = replace_node(doc, node, &html, rules);
            let count = live.len();
            nodes.splice(index..=index, live);
            index = index.saturating_add(count);
        }

        if outcome.truncated {
            tracing::warn!(
                kind = self.kind.name(),
                limit = self.context.reference_limit,
                "reference limit reached, remaining references left as text"
            );
        }
        tracing::debug!(kind = self.kind.name(), rewritten = outcome.rewritten, "rewrite pass done");
        return outcome;
    }

    /// Pass for `kind` within `context`.
    pub const fn new(kind: &'a K, context: &'a RenderContext) -> Self {
        return Self { context, kind };
    }

    /// Link HTML for one match, or `None` if it does not resolve or the limit
    /// has been reached.
    fn link_for(
        &self,
        matched: &RefMatch,
        content: Option<&str>,
        references: &ReferenceCache<'_, K>,
        outcome: &mut FilterOutcome,
    ) -> Option<String> {
        let (path, identifier) = references.identify(matched)?;
        let (parent, record) = references.find(&path, &identifier)?;
        if outcome.rewritten >= self.context.reference_limit {
            outcome.truncated = true;
            return None;
        }

        let html = LinkBuilder::new(self.kind, self.context).build(matched, parent, record, content);
        outcome.record(ResolvedReference {
            id: self.kind.record_id(record),
            parent: parent.full_path.clone(),
            reference: self.kind.reference(record, parent, None),
        });
        return Some(html);
    }

    /// Replacement HTML for an anchor, checked in order:
    /// the href is an inline reference, the text is the href and a link
    /// reference, or the href alone is a link reference.
    fn rewrite_anchor(
        &self,
        doc: &Document,
        node: NodeId,
        references: &ReferenceCache<'_, K>,
        outcome: &mut FilterOutcome,
    ) -> Option<String> {
        let href = doc.element(node)?.attr("href")?;
        let patterns = self.kind.patterns();
        let groups = self.kind.identifier_groups();

        if let Some(matched) = patterns.inline_exact(href, groups) {
            return self.link_for(&matched, Some(&doc.inner_html(node)), references, outcome);
        }
        let matched = patterns.link_exact(href, groups)?;
        if doc.text_content(node) == href {
            return self.link_for(&matched, None, references, outcome);
        }
        return self.link_for(&matched, Some(&doc.inner_html(node)), references, outcome);
    }

    /// Replacement HTML for a text node, or `None` if nothing in it resolves.
    fn rewrite_text(&self, text: &str, references: &ReferenceCache<'_, K>, outcome: &mut FilterOutcome) -> Option<String> {
        let mut html = String::new();
        let mut copied = 0;
        for matched in scan(self.kind.patterns().inline(), text, self.kind.identifier_groups(), false) {
            let Some(link) = self.link_for(&matched, None, references, outcome) else {
                if outcome.truncated {
                    break;
                }
                continue;
            };
            html.push_str(&escape_text(text.get(copied..matched.range.start).unwrap_or_default()));
            html.push_str(&link);
            copied = matched.range.end;
        }
        if html.is_empty() {
            return None;
        }
        html.push_str(&escape_text(text.get(copied..).unwrap_or_default()));
        return Some(html);
    }
}

/// Replace `node` with `html` and return the eligible nodes of what took its
/// place, in document order.
///
/// The fragment's nodes are found again from the recorded neighbours: from
/// the old previous sibling's new successor (or the parent's first child) up
/// to, but excluding, the old next sibling.
fn replace_node(doc: &mut Document, node: NodeId, html: &str, rules: IgnoreRules) -> Vec<NodeId> {
    let parent = doc.parent(node);
    let previous = doc.previous_sibling(node);
    let next = doc.next_sibling(node);

    doc.replace_with_html(node, html);

    let mut current = match previous {
        Some(previous) => doc.next_sibling(previous),
        None => parent.and_then(|parent| return doc.first_child(parent)),
    };
    let mut live = Vec::new();
    while let Some(id) = current {
        if Some(id) == next {
            break;
        }
        live.extend(doc.eligible_nodes(id, rules));
        current = doc.next_sibling(id);
    }
    return live;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, reason = "tests")]
mod tests {
    use super::*;
    use crate::kinds::IssueKind;
    use crate::model::Issue;
    use crate::store::MemoryStore;

    const BASE: &str = "https://example.com";

    fn fixture() -> (MemoryStore, RenderContext) {
        let mut store = MemoryStore::default();
        store.add_group(1, "acme");
        let project = store.add_project(10, "acme/api");
        for iid in [1, 42] {
            store.add_issue(Issue {
                id: 1000 + iid,
                iid,
                project_id: 10,
                state: "opened".to_string(),
                title: format!("Issue {iid}"),
            });
        }
        (store, RenderContext::new(BASE).with_project(project))
    }

    fn run(html: &str, store: &MemoryStore, context: &RenderContext) -> (Document, Vec<NodeId>, FilterOutcome) {
        let kind = IssueKind::new(BASE).unwrap();
        let mut doc = Document::parse(html);
        let mut nodes = doc.eligible_nodes(doc.root(), context.ignore);
        let mut cache = RecordCache::new();
        let outcome = ReferenceFilter::new(&kind, context).call(&mut doc, &mut nodes, store, &mut cache);
        (doc, nodes, outcome)
    }

    #[test]
    fn links_a_local_issue() {
        let (store, context) = fixture();
        let (doc, _, outcome) = run("<p>See #42</p>", &store, &context);
        let html = doc.to_html();

        assert!(html.starts_with(r#"<p>See <a href="https://example.com/acme/api/-/issues/42""#));
        assert!(html.contains(r#"data-issue="1042""#));
        assert!(html.contains(r#"data-project="10""#));
        assert!(html.contains(r##"data-original="#42""##));
        assert!(html.contains(r#"class="gfm gfm-issue has-tooltip""#));
        assert!(html.ends_with(">#42</a></p>"));
        assert_eq!(outcome.rewritten, 1);
        assert_eq!(outcome.references[0].reference, "acme/api#42");
    }

    #[test]
    fn missing_project_leaves_text_alone() {
        let (store, context) = fixture();
        let (doc, _, outcome) = run("<p>See other/proj#7</p>", &store, &context);

        assert_eq!(doc.to_html(), "<p>See other/proj#7</p>");
        assert_eq!(outcome, FilterOutcome::default());
    }

    #[test]
    fn missing_record_leaves_text_alone() {
        let (store, context) = fixture();
        let (doc, _, _) = run("<p>See #7 &amp; #8</p>", &store, &context);

        assert_eq!(doc.to_html(), "<p>See #7 &amp; #8</p>");
    }

    #[test]
    fn regenerates_anchor_whose_href_is_a_reference() {
        let (store, context) = fixture();
        let (doc, _, outcome) = run(r##"<a href="#42">#42</a>"##, &store, &context);
        let html = doc.to_html();

        assert!(html.starts_with(r#"<a href="https://example.com/acme/api/-/issues/42""#));
        assert!(html.contains(r#"data-link="true""#));
        assert!(html.contains(r#"class="gfm gfm-issue"#));
        assert_eq!(outcome.rewritten, 1);
    }

    #[test]
    fn expands_bare_url_anchor() {
        let (store, context) = fixture();
        let url = "https://example.com/acme/api/-/issues/42#note_5";
        let (doc, _, _) = run(&format!(r#"<a href="{url}">{url}</a>"#), &store, &context);
        let html = doc.to_html();

        assert!(html.contains(r#"data-link-reference="true""#));
        assert!(html.contains(r#"data-link="false""#));
        assert!(html.ends_with(">#42 (comment 5)</a>"));
    }

    #[test]
    fn url_anchor_with_custom_text_keeps_its_content() {
        let (store, context) = fixture();
        let (doc, _, _) = run(
            r#"<a href="https://example.com/acme/api/-/issues/42.json">the <b>bug</b></a>"#,
            &store,
            &context,
        );
        let html = doc.to_html();

        assert!(html.starts_with(r#"<a href="https://example.com/acme/api/-/issues/42""#));
        assert!(html.ends_with(">the <b>bug</b></a>"));
    }

    #[test]
    fn repeated_references_fetch_once() {
        let (store, context) = fixture();
        let html = format!("<p>{}</p>", "#1 ".repeat(500));
        let (doc, _, outcome) = run(&html, &store, &context);

        assert_eq!(store.count_queries("issues"), 1);
        assert_eq!(store.count_queries("find_parents"), 0);
        assert_eq!(outcome.rewritten, 500);
        assert_eq!(outcome.references.len(), 1);
        assert_eq!(doc.to_html().matches("gfm-issue").count(), 500);
    }

    #[test]
    fn rerunning_changes_nothing() {
        let (store, context) = fixture();
        let (doc, _, _) = run("<p>See #42 and #1</p>", &store, &context);
        let once = doc.to_html();
        let (again, _, outcome) = run(&once, &store, &context);

        assert_eq!(again.to_html(), once);
        assert_eq!(outcome.rewritten, 0);
    }

    #[test]
    fn node_list_tracks_the_live_document() {
        let (store, context) = fixture();
        let (doc, nodes, _) = run("<p>a #1 b <a href=\"/x\">x</a> #42 c</p><p>#9</p>", &store, &context);

        assert!(nodes.iter().all(|&id| doc.is_attached(id)));
        assert_eq!(nodes, doc.eligible_nodes(doc.root(), context.ignore));
        let texts: Vec<&str> = nodes.iter().filter_map(|&id| doc.text(id)).collect();
        assert_eq!(texts, vec!["a ", " b ", " ", " c", "#9"]);
    }

    #[test]
    fn limit_truncates_and_reports() {
        let (store, mut context) = fixture();
        context.reference_limit = 2;
        let (doc, _, outcome) = run("<p>#1 #1 #1</p>", &store, &context);

        assert_eq!(outcome.rewritten, 2);
        assert!(outcome.truncated);
        assert!(doc.to_html().ends_with("</a> #1</p>"));
    }

    #[test]
    fn code_spans_are_not_scanned() {
        let (store, context) = fixture();
        let (doc, _, outcome) = run("<p><code>#42</code></p>", &store, &context);

        assert_eq!(doc.to_html(), "<p><code>#42</code></p>");
        assert_eq!(outcome.rewritten, 0);
    }
}
