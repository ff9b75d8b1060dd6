//! Record store: the batched lookups reference passes issue, and an in-memory
//! implementation loaded from a TOML fixture.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::error::Error;
use crate::model::{Design, EntityId, Issue, Label, MergeRequest, Milestone, Parent, ParentType};

/// Persistent record lookups. Every method is one batched query: callers pass
/// the whole key set for one parent and receive every record that exists.
/// Missing keys are simply absent from the result.
pub trait RecordStore {
    /// Designs of `project` named by `(issue_iid, filename)`.
    fn designs(&self, project: &Parent, keys: &[(u64, String)]) -> Vec<Design>;

    /// Projects or groups whose full path is in `full_paths`.
    fn find_parents(&self, kind: ParentType, full_paths: &[String]) -> Vec<Parent>;

    /// Issues of `project` with the given `iids`.
    fn issues(&self, project: &Parent, iids: &[u64]) -> Vec<Issue>;

    /// Labels visible from `parent` (its own and its ancestor groups')
    /// matching any of `ids` or `names`.
    fn labels(&self, parent: &Parent, ids: &[EntityId], names: &[String]) -> Vec<Label>;

    /// Merge requests of `project` with the given `iids`.
    fn merge_requests(&self, project: &Parent, iids: &[u64]) -> Vec<MergeRequest>;

    /// Milestones visible from `parent` matching any of `iids` or `titles`.
    fn milestones(&self, parent: &Parent, iids: &[u64], titles: &[String]) -> Vec<Milestone>;
}

/// One executed store query, recorded for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLogEntry {
    /// Store method name.
    pub operation: &'static str,
    /// Parent the query was scoped to, or the parent type for `find_parents`.
    pub scope: String,
}

/// Raw TOML structure of a store fixture.
#[derive(Debug, Default, Deserialize)]
struct StoreFixture {
    /// `[[designs]]` rows.
    #[serde(default)]
    designs: Vec<Design>,
    /// `[[groups]]` rows.
    #[serde(default)]
    groups: Vec<FixtureContainer>,
    /// `[[issues]]` rows.
    #[serde(default)]
    issues: Vec<Issue>,
    /// `[[labels]]` rows.
    #[serde(default)]
    labels: Vec<Label>,
    /// `[[merge_requests]]` rows.
    #[serde(default)]
    merge_requests: Vec<MergeRequest>,
    /// `[[milestones]]` rows.
    #[serde(default)]
    milestones: Vec<Milestone>,
    /// `[[projects]]` rows.
    #[serde(default)]
    projects: Vec<FixtureContainer>,
}

/// A project or group row in a fixture. The namespace is derived from the path.
#[derive(Debug, Deserialize)]
struct FixtureContainer {
    /// Record id.
    id: EntityId,
    /// Display name. Defaults to the last path segment.
    name: Option<String>,
    /// Full path.
    path: String,
}

/// In-memory store. Every query is appended to a log so callers can assert how
/// many round trips a render made.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Designs of every project.
    designs: Vec<Design>,
    /// Issues of every project.
    issues: Vec<Issue>,
    /// Project and group labels.
    labels: Vec<Label>,
    /// Merge requests of every project.
    merge_requests: Vec<MergeRequest>,
    /// Project and group milestones.
    milestones: Vec<Milestone>,
    /// Projects and groups.
    parents: Vec<Parent>,
    /// Queries executed so far.
    queries: RefCell<Vec<QueryLogEntry>>,
}

impl MemoryStore {
    /// Add a design.
    pub fn add_design(&mut self, design: Design) {
        self.designs.push(design);
    }

    /// Add a group. Its namespace is resolved from already-added groups.
    pub fn add_group(&mut self, id: EntityId, full_path: &str) -> Parent {
        return self.add_container(ParentType::Group, id, full_path, None);
    }

    /// Add an issue.
    pub fn add_issue(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// Add a label.
    pub fn add_label(&mut self, label: Label) {
        self.labels.push(label);
    }

    /// Add a merge request.
    pub fn add_merge_request(&mut self, merge_request: MergeRequest) {
        self.merge_requests.push(merge_request);
    }

    /// Add a milestone.
    pub fn add_milestone(&mut self, milestone: Milestone) {
        self.milestones.push(milestone);
    }

    /// Add a project. Its namespace is resolved from already-added groups.
    pub fn add_project(&mut self, id: EntityId, full_path: &str) -> Parent {
        return self.add_container(ParentType::Project, id, full_path, None);
    }

    /// Count of logged queries with the given operation name.
    pub fn count_queries(&self, operation: &str) -> usize {
        return self.queries.borrow().iter().filter(|q| return q.operation == operation).count();
    }

    /// Load a store from a TOML fixture file.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotFound` if the file is missing, `Error::TomlDe` if
    /// it is malformed, or `Error::StoreCorrupt` if two containers share a path.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = match std::fs::read_to_string(path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound { path: path.to_path_buf() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Find a project or group by exact full path, without logging a query.
    pub fn lookup(&self, kind: ParentType, full_path: &str) -> Option<&Parent> {
        return self.parents.iter().find(|p| return p.kind == kind && p.full_path == full_path);
    }

    /// Parse a store from TOML fixture content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the content is malformed, or
    /// `Error::StoreCorrupt` if two containers of one type share a path.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let fixture: StoreFixture = toml::from_str(content)?;
        let mut store = Self::default();

        let mut groups = fixture.groups;
        // Parents before children, so namespaces resolve while adding.
        groups.sort_by_key(|g| return g.path.matches('/').count());
        for group in groups {
            store.add_fixture_container(ParentType::Group, group)?;
        }
        for project in fixture.projects {
            store.add_fixture_container(ParentType::Project, project)?;
        }

        store.designs = fixture.designs;
        store.issues = fixture.issues;
        store.labels = fixture.labels;
        store.merge_requests = fixture.merge_requests;
        store.milestones = fixture.milestones;
        return Ok(store);
    }

    /// Every logged query, oldest first.
    pub fn queries(&self) -> Vec<QueryLogEntry> {
        return self.queries.borrow().clone();
    }

    /// Insert a container, linking it to its namespace group when known.
    fn add_container(&mut self, kind: ParentType, id: EntityId, full_path: &str, name: Option<String>) -> Parent {
        let namespace_path = full_path.rsplit_once('/').map(|(ns, _)| return ns);
        let namespace = namespace_path.and_then(|ns| return self.lookup(ParentType::Group, ns));
        let last = full_path.rsplit('/').next().unwrap_or(full_path);
        let name = name.unwrap_or_else(|| return last.to_string());
        let full_name = match namespace {
            Some(group) => format!("{} / {name}", group.full_name),
            None => name.clone(),
        };
        let parent = Parent {
            full_name,
            full_path: full_path.to_string(),
            id,
            kind,
            name,
            namespace_id: namespace.map(|group| return group.id),
        };
        self.parents.push(parent.clone());
        return parent;
    }

    /// Insert a fixture row, rejecting duplicate paths.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreCorrupt` if a container of this type already has the path.
    fn add_fixture_container(&mut self, kind: ParentType, row: FixtureContainer) -> Result<(), Error> {
        if self.lookup(kind, &row.path).is_some() {
            return Err(Error::StoreCorrupt {
                reason: format!("duplicate {} path `{}`", kind.as_str(), row.path),
            });
        }
        self.add_container(kind, row.id, &row.path, row.name);
        return Ok(());
    }

    /// Ids of `parent` and every group above it, nearest first.
    fn lineage(&self, parent: &Parent) -> Vec<(ParentType, EntityId)> {
        let mut out = vec![(parent.kind, parent.id)];
        let mut next = parent.namespace_id;
        while let Some(group_id) = next {
            out.push((ParentType::Group, group_id));
            next = self
                .parents
                .iter()
                .find(|p| return p.kind == ParentType::Group && p.id == group_id)
                .and_then(|p| return p.namespace_id);
        }
        return out;
    }

    /// Append a query to the log.
    fn log(&self, operation: &'static str, scope: &str) {
        self.queries.borrow_mut().push(QueryLogEntry { operation, scope: scope.to_string() });
    }
}

impl RecordStore for MemoryStore {
    fn designs(&self, project: &Parent, keys: &[(u64, String)]) -> Vec<Design> {
        self.log("designs", &project.full_path);
        return self
            .designs
            .iter()
            .filter(|d| {
                return d.project_id == project.id
                    && keys.iter().any(|(iid, filename)| return *iid == d.issue_iid && *filename == d.filename);
            })
            .cloned()
            .collect();
    }

    fn find_parents(&self, kind: ParentType, full_paths: &[String]) -> Vec<Parent> {
        self.log("find_parents", kind.as_str());
        let wanted: BTreeSet<&str> = full_paths.iter().map(String::as_str).collect();
        return self
            .parents
            .iter()
            .filter(|p| return p.kind == kind && wanted.contains(p.full_path.as_str()))
            .cloned()
            .collect();
    }

    fn issues(&self, project: &Parent, iids: &[u64]) -> Vec<Issue> {
        self.log("issues", &project.full_path);
        return self
            .issues
            .iter()
            .filter(|i| return i.project_id == project.id && iids.contains(&i.iid))
            .cloned()
            .collect();
    }

    fn labels(&self, parent: &Parent, ids: &[EntityId], names: &[String]) -> Vec<Label> {
        self.log("labels", &parent.full_path);
        let lineage = self.lineage(parent);
        // A name defined at several levels resolves to the nearest owner.
        let mut by_name: HashMap<&str, (usize, &Label)> = HashMap::new();
        let mut by_id = Vec::new();
        for label in &self.labels {
            let Some(depth) = lineage
                .iter()
                .position(|&(kind, id)| return kind == label.owner_type && id == label.owner_id)
            else {
                continue;
            };
            if ids.contains(&label.id) {
                by_id.push(label);
            }
            if names.contains(&label.name) {
                let nearer = by_name.get(label.name.as_str()).is_none_or(|(seen, _)| return depth < *seen);
                if nearer {
                    by_name.insert(label.name.as_str(), (depth, label));
                }
            }
        }
        // Name matches come first so callers indexing by name see the nearest owner.
        let mut out: Vec<Label> = by_name.into_values().map(|(_, label)| return label.clone()).collect();
        for label in by_id {
            if !out.iter().any(|l| return l.id == label.id) {
                out.push(label.clone());
            }
        }
        return out;
    }

    fn merge_requests(&self, project: &Parent, iids: &[u64]) -> Vec<MergeRequest> {
        self.log("merge_requests", &project.full_path);
        return self
            .merge_requests
            .iter()
            .filter(|mr| return mr.project_id == project.id && iids.contains(&mr.iid))
            .cloned()
            .collect();
    }

    fn milestones(&self, parent: &Parent, iids: &[u64], titles: &[String]) -> Vec<Milestone> {
        self.log("milestones", &parent.full_path);
        let lineage = self.lineage(parent);
        return self
            .milestones
            .iter()
            .filter(|m| {
                let visible = lineage.iter().any(|&(kind, id)| return kind == m.owner_type && id == m.owner_id);
                // Sequence numbers are only meaningful on the parent itself.
                let by_iid = m.owner_type == parent.kind && m.owner_id == parent.id && iids.contains(&m.iid);
                return visible && (by_iid || titles.contains(&m.title));
            })
            .map(|m| {
                let mut milestone = m.clone();
                milestone.owner_path = self
                    .parents
                    .iter()
                    .find(|p| return p.kind == m.owner_type && p.id == m.owner_id)
                    .map_or_else(String::new, |p| return p.full_path.clone());
                return milestone;
            })
            .collect();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    const FIXTURE: &str = r##"
[[groups]]
id = 1
path = "acme"

[[groups]]
id = 2
path = "acme/platform"

[[projects]]
id = 10
path = "acme/platform/api"
name = "API"

[[labels]]
id = 100
name = "bug"
owner_id = 1
owner_type = "group"

[[labels]]
id = 101
name = "bug"
owner_id = 10
owner_type = "project"
color = "#ff0000"
"##;

    #[test]
    fn fixture_links_namespaces() {
        let store = MemoryStore::parse(FIXTURE).unwrap();
        let project = store.lookup(ParentType::Project, "acme/platform/api").unwrap();

        assert_eq!(project.namespace_id, Some(2));
        assert_eq!(project.name, "API");
    }

    #[test]
    fn full_name_joins_the_namespace_names() {
        let store = MemoryStore::parse(FIXTURE).unwrap();

        assert_eq!(store.lookup(ParentType::Group, "acme").unwrap().full_name, "acme");
        assert_eq!(
            store.lookup(ParentType::Project, "acme/platform/api").unwrap().full_name,
            "acme / platform / API"
        );
    }

    #[test]
    fn labels_prefer_the_nearest_owner() {
        let store = MemoryStore::parse(FIXTURE).unwrap();
        let project = store.lookup(ParentType::Project, "acme/platform/api").unwrap().clone();

        let labels = store.labels(&project, &[], &["bug".to_string()]);

        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].id, 101);
        assert_eq!(store.count_queries("labels"), 1);
    }

    #[test]
    fn duplicate_paths_are_rejected() {
        let content = "[[projects]]\nid = 1\npath = \"a/b\"\n[[projects]]\nid = 2\npath = \"a/b\"\n";
        assert!(matches!(MemoryStore::parse(content), Err(Error::StoreCorrupt { .. })));
    }
}
