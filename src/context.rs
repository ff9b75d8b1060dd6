/// Per-render settings: where the document lives and how links are built.
use crate::dom::IgnoreRules;
use crate::model::{Parent, ParentType};

/// Matches rewritten per pass before the rest are left as text.
pub const DEFAULT_REFERENCE_LIMIT: usize = 1000;

/// Page a label link opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelUrl {
    /// The context group's page filtered by the label. Falls back to
    /// `Issues` when the label's parent is a project.
    Group,
    /// The parent's issue list filtered by the label.
    #[default]
    Issues,
    /// The parent's merge request list filtered by the label.
    MergeRequests,
}

/// Everything a reference pass needs to know about the document being rendered.
/// Immutable for the duration of one render.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Scheme and host prepended to generated hrefs, e.g. `https://gitlab.example.com`.
    pub base_url: String,
    /// Group the document belongs to, for group-level pages.
    pub group: Option<Parent>,
    /// Which ancestors hide text from scanning.
    pub ignore: IgnoreRules,
    /// Page label links open.
    pub label_url: LabelUrl,
    /// Emit path-only hrefs instead of absolute URLs.
    pub only_path: bool,
    /// Project the document belongs to.
    pub project: Option<Parent>,
    /// Cap on links created by one pass over one document.
    pub reference_limit: usize,
}

impl RenderContext {
    /// The container relative references resolve against: the project, or the
    /// group when there is no project.
    pub fn current_parent(&self) -> Option<&Parent> {
        return self.project.as_ref().or(self.group.as_ref());
    }

    /// A context with no project or group and default limits.
    pub fn new(base_url: &str) -> Self {
        return Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            group: None,
            ignore: IgnoreRules::default(),
            label_url: LabelUrl::default(),
            only_path: false,
            project: None,
            reference_limit: DEFAULT_REFERENCE_LIMIT,
        };
    }

    /// The context's parent of the given type.
    pub fn parent_of(&self, kind: ParentType) -> Option<&Parent> {
        return match kind {
            ParentType::Group => self.group.as_ref(),
            ParentType::Project => self.project.as_ref(),
        };
    }

    /// Absolute or path-only URL for `path`, which must start with `/`.
    pub fn url_for(&self, path: &str) -> String {
        if self.only_path {
            return path.to_string();
        }
        return format!("{}{path}", self.base_url);
    }

    /// Set the group.
    #[must_use]
    pub fn with_group(mut self, group: Parent) -> Self {
        self.group = Some(group);
        return self;
    }

    /// Set the project.
    #[must_use]
    pub fn with_project(mut self, project: Parent) -> Self {
        self.project = Some(project);
        return self;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_for_honours_only_path() {
        let mut context = RenderContext::new("https://example.com/");
        assert_eq!(context.url_for("/acme"), "https://example.com/acme");

        context.only_path = true;
        assert_eq!(context.url_for("/acme"), "/acme");
    }
}
