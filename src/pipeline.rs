//! Render orchestration: every reference pass over one shared document.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::RecordCache;
use crate::context::RenderContext;
use crate::dom::{Document, NodeId};
use crate::error::Error;
use crate::filter::{FilterOutcome, ReferenceFilter};
use crate::kind::ReferenceKind;
use crate::kinds::{DesignKind, IssueKind, LabelKind, MergeRequestKind, MilestoneKind};
use crate::store::RecordStore;
use crate::types::ResolvedReference;

/// One kind's pass, with the kind's record type erased.
pub trait ReferencePass {
    /// Kind name, used as the results map key.
    fn kind_name(&self) -> &'static str;

    /// Run the pass over `doc`, keeping `nodes` in step with it.
    fn run(
        &self,
        doc: &mut Document,
        nodes: &mut Vec<NodeId>,
        context: &RenderContext,
        store: &dyn RecordStore,
        cache: &mut RecordCache,
    ) -> FilterOutcome;
}

impl<K: ReferenceKind> ReferencePass for K {
    fn kind_name(&self) -> &'static str {
        return self.name();
    }

    fn run(
        &self,
        doc: &mut Document,
        nodes: &mut Vec<NodeId>,
        context: &RenderContext,
        store: &dyn RecordStore,
        cache: &mut RecordCache,
    ) -> FilterOutcome {
        return ReferenceFilter::new(self, context).call(doc, nodes, store, cache);
    }
}

/// Result of rendering one document.
#[derive(Debug, Clone, Serialize)]
pub struct Rendered {
    /// The rewritten document.
    pub html: String,
    /// Eligible nodes left after the last pass.
    pub node_count: usize,
    /// Records linked, per kind. Kinds that linked nothing are absent.
    pub references: BTreeMap<&'static str, Vec<ResolvedReference>>,
    /// Whether any pass hit the reference limit.
    pub truncated: bool,
}

/// An ordered list of passes.
pub struct Pipeline {
    /// Passes in run order.
    passes: Vec<Box<dyn ReferencePass>>,
}

impl Pipeline {
    /// The shipped kinds, in an order where no pass steals another's matches:
    /// designs before issues.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if a kind's pattern fails to compile for the
    /// context's base URL.
    pub fn default_kinds(context: &RenderContext) -> Result<Self, Error> {
        let base_url = context.base_url.as_str();
        let passes: Vec<Box<dyn ReferencePass>> = vec![
            Box::new(DesignKind::new(base_url)?),
            Box::new(IssueKind::new(base_url)?),
            Box::new(MergeRequestKind::new(base_url)?),
            Box::new(MilestoneKind::new(base_url)?),
            Box::new(LabelKind::new()?),
        ];
        return Ok(Self::new(passes));
    }

    /// Kind names in run order.
    pub fn kinds(&self) -> Vec<&'static str> {
        return self.passes.iter().map(|pass| return pass.kind_name()).collect();
    }

    /// A pipeline running `passes` in order.
    pub fn new(passes: Vec<Box<dyn ReferencePass>>) -> Self {
        return Self { passes };
    }

    /// Parse `html`, run every pass over it and serialize the result.
    ///
    /// `cache` may be shared across documents of one batch.
    pub fn render(
        &self,
        html: &str,
        context: &RenderContext,
        store: &dyn RecordStore,
        cache: &mut RecordCache,
    ) -> Rendered {
        let mut doc = Document::parse(html);
        let mut nodes = doc.eligible_nodes(doc.root(), context.ignore);
        let mut references = BTreeMap::new();
        let mut truncated = false;

        for pass in &self.passes {
            let outcome = pass.run(&mut doc, &mut nodes, context, store, cache);
            truncated |= outcome.truncated;
            if !outcome.references.is_empty() {
                references.insert(pass.kind_name(), outcome.references);
            }
        }

        return Rendered {
            html: doc.to_html(),
            node_count: nodes.len(),
            references,
            truncated,
        };
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;
    use crate::model::{Design, Issue, Label, MergeRequest, ParentType};
    use crate::store::MemoryStore;

    fn fixture() -> (MemoryStore, RenderContext) {
        let mut store = MemoryStore::default();
        store.add_group(1, "acme");
        let project = store.add_project(10, "acme/api");
        store.add_issue(Issue {
            id: 100,
            iid: 12,
            project_id: 10,
            state: "opened".to_string(),
            title: "Crash".to_string(),
        });
        store.add_merge_request(MergeRequest {
            id: 200,
            iid: 3,
            project_id: 10,
            state: "opened".to_string(),
            title: "Fix crash".to_string(),
        });
        store.add_design(Design {
            filename: "crash.png".to_string(),
            id: 300,
            issue_iid: 12,
            project_id: 10,
        });
        store.add_label(Label {
            color: "#ff0000".to_string(),
            description: "Something broke".to_string(),
            id: 400,
            name: "bug".to_string(),
            owner_id: 1,
            owner_type: ParentType::Group,
        });
        (store, RenderContext::new("https://example.com").with_project(project))
    }

    #[test]
    fn runs_every_kind_over_one_document() {
        let (store, context) = fixture();
        let pipeline = Pipeline::default_kinds(&context).unwrap();
        let mut cache = RecordCache::new();

        let rendered = pipeline.render(
            "<p>#12[crash.png] shows #12, fixed by !3 ~bug</p><pre>#12</pre>",
            &context,
            &store,
            &mut cache,
        );

        assert_eq!(rendered.html.matches("gfm-design").count(), 1);
        assert_eq!(rendered.html.matches("gfm-issue").count(), 1);
        assert_eq!(rendered.html.matches("gfm-merge_request").count(), 1);
        assert_eq!(rendered.html.matches("gfm-label").count(), 1);
        assert!(rendered.html.ends_with("<pre>#12</pre>"));
        assert_eq!(
            rendered.references.keys().copied().collect::<Vec<_>>(),
            vec!["design", "issue", "label", "merge_request"]
        );
        assert!(!rendered.truncated);
    }

    #[test]
    fn shared_cache_skips_repeat_lookups_across_documents() {
        let (store, context) = fixture();
        let pipeline = Pipeline::default_kinds(&context).unwrap();
        let mut cache = RecordCache::new();

        pipeline.render("<p>#12 other/gone#1</p>", &context, &store, &mut cache);
        pipeline.render("<p>#12 other/gone#1</p>", &context, &store, &mut cache);

        assert_eq!(store.count_queries("issues"), 1);
        assert_eq!(store.count_queries("find_parents"), 1);
        assert!(cache.stats().hits > 0);
    }

    #[test]
    fn node_count_matches_a_fresh_scan() {
        let (store, context) = fixture();
        let pipeline = Pipeline::default_kinds(&context).unwrap();
        let mut cache = RecordCache::new();

        let rendered = pipeline.render("<p>a #12 b !3 c ~bug d</p>", &context, &store, &mut cache);
        let reparsed = Document::parse(&rendered.html);

        assert_eq!(rendered.node_count, reparsed.eligible_nodes(reparsed.root(), context.ignore).len());
    }

    #[test]
    fn kinds_run_designs_first() {
        let context = RenderContext::new("https://example.com");
        let pipeline = Pipeline::default_kinds(&context).unwrap();

        assert_eq!(pipeline.kinds(), vec!["design", "issue", "merge_request", "milestone", "label"]);
    }
}
