/// Domain records that references resolve to.
use serde::{Deserialize, Serialize};

/// Database id of any record.
pub type EntityId = u64;

/// Which kind of container a parent is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentType {
    /// A group (namespace) holding projects and subgroups.
    Group,
    /// A project holding issues, merge requests and designs.
    Project,
}

impl ParentType {
    /// Lowercase name, used in data attributes and cache keys.
    pub const fn as_str(self) -> &'static str {
        return match self {
            ParentType::Group => "group",
            ParentType::Project => "project",
        };
    }
}

/// The container that scopes an identifier: a project or a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parent {
    /// Names of every container from the top group down, joined with ` / `,
    /// e.g. `GitLab.org / GitLab`.
    pub full_name: String,
    /// Full slash-separated path, e.g. `gitlab-org/gitlab`.
    pub full_path: String,
    /// Record id.
    pub id: EntityId,
    /// Project or group.
    pub kind: ParentType,
    /// Human-readable name.
    pub name: String,
    /// Owning group, if any. For a project this is its namespace.
    pub namespace_id: Option<EntityId>,
}

impl Parent {
    /// Path of the owning namespace: everything before the last `/`.
    pub fn namespace_path(&self) -> &str {
        return self.full_path.rsplit_once('/').map_or("", |(namespace, _)| return namespace);
    }

    /// Last path segment.
    pub fn path(&self) -> &str {
        return self.full_path.rsplit_once('/').map_or(self.full_path.as_str(), |(_, last)| return last);
    }

    /// Prefix used to name a record of this parent from inside `from`.
    ///
    /// Empty when `from` is this parent, the bare path when `from` shares the
    /// namespace, and the full path otherwise.
    pub fn reference_prefix(&self, from: Option<&Parent>) -> String {
        return match from {
            Some(from) if from.kind == self.kind && from.id == self.id => String::new(),
            Some(from) if self.kind == ParentType::Project && from.namespace_path() == self.namespace_path() => {
                self.path().to_string()
            },
            _ => self.full_path.clone(),
        };
    }
}

/// An issue. Identified within its project by `iid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Record id.
    pub id: EntityId,
    /// Project-scoped sequence number.
    pub iid: u64,
    /// Owning project.
    pub project_id: EntityId,
    /// `opened` or `closed`.
    #[serde(default = "default_state")]
    pub state: String,
    /// Issue title, shown as the link tooltip.
    pub title: String,
}

/// A merge request. Identified within its project by `iid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    /// Record id.
    pub id: EntityId,
    /// Project-scoped sequence number.
    pub iid: u64,
    /// Owning project.
    pub project_id: EntityId,
    /// `opened`, `merged` or `closed`.
    #[serde(default = "default_state")]
    pub state: String,
    /// Merge request title, shown as the link tooltip.
    pub title: String,
}

/// A label owned by a project or a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Background color as `#rrggbb`.
    #[serde(default = "default_label_color")]
    pub color: String,
    /// Optional description, shown as the link tooltip.
    #[serde(default)]
    pub description: String,
    /// Record id. Labels are referenced by global id, not a scoped sequence.
    pub id: EntityId,
    /// Display name. Unique within its owner.
    pub name: String,
    /// Owning project or group id.
    pub owner_id: EntityId,
    /// Whether `owner_id` names a project or a group.
    pub owner_type: ParentType,
}

/// A milestone owned by a project or a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Record id.
    pub id: EntityId,
    /// Owner-scoped sequence number.
    pub iid: u64,
    /// Owning project or group id.
    pub owner_id: EntityId,
    /// Full path of the owner. Filled in by the store.
    #[serde(default)]
    pub owner_path: String,
    /// Whether `owner_id` names a project or a group.
    pub owner_type: ParentType,
    /// Milestone title. Unique within its owner.
    pub title: String,
}

/// A design attached to an issue. Identified by `(issue_iid, filename)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Design {
    /// Uploaded file name, e.g. `homescreen.png`.
    pub filename: String,
    /// Record id.
    pub id: EntityId,
    /// `iid` of the issue the design belongs to.
    pub issue_iid: u64,
    /// Owning project.
    pub project_id: EntityId,
}

/// Default state for issuables loaded without one.
fn default_state() -> String {
    return "opened".to_string();
}

/// Default label background.
fn default_label_color() -> String {
    return "#6699cc".to_string();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: EntityId, full_path: &str) -> Parent {
        Parent {
            full_name: full_path.to_string(),
            full_path: full_path.to_string(),
            id,
            kind: ParentType::Project,
            name: full_path.to_string(),
            namespace_id: None,
        }
    }

    #[test]
    fn reference_prefix_shortens_within_namespace() {
        let here = project(1, "acme/web");
        let sibling = project(2, "acme/api");
        let elsewhere = project(3, "other/api");

        assert_eq!(here.reference_prefix(Some(&here)), "");
        assert_eq!(sibling.reference_prefix(Some(&here)), "api");
        assert_eq!(elsewhere.reference_prefix(Some(&here)), "other/api");
        assert_eq!(elsewhere.reference_prefix(None), "other/api");
    }
}
