//! Milestones: `%3`, `%v1.0`, `%"Sprint 4"`, or a milestone URL.
//!
//! A project sees its own milestones and, by title only, those of the groups
//! above it. Numeric references name the parent's own milestones.

use crate::context::RenderContext;
use crate::error::Error;
use crate::kind::ReferenceKind;
use crate::model::{EntityId, Milestone, Parent, ParentType};
use crate::pattern::{PatternSet, RefMatch, parent_prefix, project_link_pattern};
use crate::store::RecordStore;
use crate::types::{IdOrName, Identifier};

/// Milestone references.
#[derive(Debug, Clone)]
pub struct MilestoneKind {
    /// Compiled recognizers.
    patterns: PatternSet,
}

impl MilestoneKind {
    /// Compile the milestone patterns for links under `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if a pattern fails to compile.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let inline = format!(
            r#"{}%(?:(?P<milestone_iid>\d+)\b|(?P<milestone_name>[^"\s<]+\b)|"(?P<milestone_quoted>[^"]+)")"#,
            parent_prefix()
        );
        let link = project_link_pattern(base_url, r"milestones/(?P<milestone_iid>\d+)\b");
        return Ok(Self {
            patterns: PatternSet::new("milestone", &inline, Some(&link))?,
        });
    }
}

/// Whether `title` can be written without quotes.
fn is_simple_title(title: &str) -> bool {
    return !title.is_empty()
        && !title.chars().any(|c| return c == '"' || c == '<' || c.is_whitespace())
        && title.ends_with(|c: char| return c.is_alphanumeric() || c == '_');
}

impl ReferenceKind for MilestoneKind {
    type Record = Milestone;

    fn batch_fetch(&self, store: &dyn RecordStore, parent: &Parent, identifiers: &[Identifier]) -> Vec<Milestone> {
        let (iids, titles) = super::split_keyed(identifiers);
        return store.milestones(parent, &iids, &titles);
    }

    /// Milestone page of the owner, which may be a group above `parent`.
    fn build_href(&self, record: &Milestone, parent: &Parent, context: &RenderContext) -> String {
        let owner = if record.owner_path.is_empty() { parent.full_path.as_str() } else { record.owner_path.as_str() };
        return match record.owner_type {
            ParentType::Group => context.url_for(&format!("/groups/{owner}/-/milestones/{}", record.iid)),
            ParentType::Project => context.url_for(&format!("/{owner}/-/milestones/{}", record.iid)),
        };
    }

    fn build_title(&self, record: &Milestone, _matched: &RefMatch) -> String {
        return record.title.clone();
    }

    /// Group milestones are only reachable by title.
    fn canonical_identifiers(&self, record: &Milestone) -> Vec<Identifier> {
        let mut identifiers = vec![Identifier::Keyed(IdOrName::ByName(record.title.clone()))];
        if record.owner_type == ParentType::Project {
            identifiers.push(Identifier::Keyed(IdOrName::ById(record.iid)));
        }
        return identifiers;
    }

    fn css_class(&self) -> &'static str {
        return "gfm-milestone";
    }

    /// Names the owning group when it is not the parent itself.
    fn data_attributes(&self, record: &Milestone, parent: &Parent) -> Vec<(&'static str, String)> {
        if record.owner_type == ParentType::Group && parent.kind == ParentType::Project {
            return vec![("group", record.owner_id.to_string())];
        }
        return Vec::new();
    }

    fn group_parents(&self) -> bool {
        return true;
    }

    fn identifier_groups(&self) -> &'static [&'static str] {
        return &["milestone_iid", "milestone_name", "milestone_quoted"];
    }

    /// `%title`, followed by where it lives when that is not the context's
    /// parent.
    fn link_text(&self, record: &Milestone, parent: &Parent, context: &RenderContext) -> String {
        let prefix = parent.reference_prefix(context.current_parent());
        if prefix.is_empty() {
            return format!("%{}", record.title);
        }
        return format!("%{} in {prefix}", record.title);
    }

    fn name(&self) -> &'static str {
        return "milestone";
    }

    fn parent_type(&self, context: &RenderContext) -> ParentType {
        if context.project.is_some() {
            return ParentType::Project;
        }
        return ParentType::Group;
    }

    fn parse_identifier(&self, raw_symbol: &str, matched: &RefMatch) -> Option<Identifier> {
        if matched.capture("milestone_iid").is_some() {
            return raw_symbol.parse().ok().map(|iid| return Identifier::Keyed(IdOrName::ById(iid)));
        }
        let title = super::name_from(matched, &["milestone_name", "milestone_quoted"])?;
        return Some(Identifier::Keyed(IdOrName::ByName(title)));
    }

    fn patterns(&self) -> &PatternSet {
        return &self.patterns;
    }

    fn record_id(&self, record: &Milestone) -> EntityId {
        return record.id;
    }

    fn reference(&self, record: &Milestone, parent: &Parent, from: Option<&Parent>) -> String {
        let prefix = parent.reference_prefix(from);
        if record.owner_type == ParentType::Project {
            return format!("{prefix}%{}", record.iid);
        }
        return format!("{prefix}%{}", super::quoted_name(&record.title, is_simple_title));
    }
}
