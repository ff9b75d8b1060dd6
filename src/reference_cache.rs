//! Batch resolution of every reference of one kind in one document.
//!
//! Loading runs in three steps: harvest `(parent path, identifier)` pairs from
//! the node list, resolve the distinct parent paths with one store query per
//! path group, then fetch records with one store query per parent. Results go
//! through the request's [`RecordCache`], so repeated documents in the same
//! request reuse earlier lookups.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::cache::{CacheKey, Cached, RecordCache};
use crate::context::RenderContext;
use crate::dom::{Document, NodeData, NodeId};
use crate::kind::ReferenceKind;
use crate::model::{EntityId, Parent, ParentType};
use crate::pattern::{ParentPath, RefMatch};
use crate::store::RecordStore;
use crate::types::Identifier;

/// Cache operation name for parent lookups. Shared by every kind.
const FIND_PARENT: &str = "find_parent";

/// Parents and records referenced by one document, for one kind.
pub struct ReferenceCache<'a, K: ReferenceKind> {
    /// Rendering context the document belongs to.
    context: &'a RenderContext,
    /// The kind being resolved.
    kind: &'a K,
    /// Resolved parent for each path that names one.
    parents: HashMap<ParentPath, Parent>,
    /// Records indexed by identifier, per resolved parent.
    records_per_parent: HashMap<(ParentType, EntityId), HashMap<Identifier, K::Record>>,
    /// Harvested identifiers per written parent path.
    references_per_parent: BTreeMap<ParentPath, BTreeSet<Identifier>>,
}

impl<'a, K: ReferenceKind> ReferenceCache<'a, K> {
    /// Look up the parent and record a match names. `None` leaves it unlinked.
    pub fn find(&self, path: &ParentPath, identifier: &Identifier) -> Option<(&Parent, &K::Record)> {
        let parent = self.parents.get(path)?;
        let record = self.records_per_parent.get(&(parent.kind, parent.id))?.get(identifier)?;
        return Some((parent, record));
    }

    /// Parse a match into its parent path and identifier, applying the kind's
    /// structural pre-check first.
    pub fn identify(&self, matched: &RefMatch) -> Option<(ParentPath, Identifier)> {
        let symbol = matched.symbol.as_deref()?;
        if !self.kind.reference_valid(symbol) {
            return None;
        }
        let identifier = self.kind.parse_identifier(symbol, matched)?;
        return Some((ParentPath::from_match(matched), identifier));
    }

    /// Whether the harvest found nothing to resolve.
    pub fn is_empty(&self) -> bool {
        return self.references_per_parent.is_empty();
    }

    /// Harvest references from `nodes` and resolve them in bulk.
    pub fn load(&mut self, doc: &Document, nodes: &[NodeId], store: &dyn RecordStore, cache: &mut RecordCache) {
        self.harvest(doc, nodes);
        if self.references_per_parent.is_empty() {
            return;
        }
        self.resolve_parents(store, cache);
        self.resolve_records(store, cache);

        tracing::debug!(
            kind = self.kind.name(),
            paths = self.references_per_parent.len(),
            parents = self.parents.len(),
            records = self.records_per_parent.values().map(HashMap::len).sum::<usize>(),
            "resolved references"
        );
    }

    /// Create an empty cache for one kind and one document.
    pub fn new(kind: &'a K, context: &'a RenderContext) -> Self {
        return Self {
            context,
            kind,
            parents: HashMap::new(),
            records_per_parent: HashMap::new(),
            references_per_parent: BTreeMap::new(),
        };
    }

    /// Scan every node once with both patterns and group identifiers by the
    /// parent path they were written against.
    fn harvest(&mut self, doc: &Document, nodes: &[NodeId]) {
        let groups = self.kind.identifier_groups();
        for &node in nodes {
            let haystack = match doc.data(node) {
                NodeData::Element(el) => el.attr("href"),
                NodeData::Text(text) => Some(text.as_str()),
                NodeData::Comment(_) | NodeData::Root => None,
            };
            let Some(haystack) = haystack else {
                continue;
            };
            for matched in self.kind.patterns().scan_all(haystack, groups) {
                let Some((path, identifier)) = self.identify(&matched) else {
                    continue;
                };
                self.references_per_parent.entry(path).or_default().insert(identifier);
            }
        }
    }

    /// Resolve one group of `(path, full path)` pairs with at most one store query.
    fn resolve_parent_group(
        &mut self,
        paths: Vec<(ParentPath, String)>,
        parent_type: ParentType,
        store: &dyn RecordStore,
        cache: &mut RecordCache,
    ) {
        if paths.is_empty() {
            return;
        }
        let key_for = |full_path: &str| return CacheKey::new(FIND_PARENT, parent_type.as_str(), full_path);

        let mut uncached: Vec<String> = Vec::new();
        for (_, full_path) in &paths {
            if !cache.contains(&key_for(full_path)) && !uncached.contains(full_path) {
                uncached.push(full_path.clone());
            }
        }

        if !uncached.is_empty() {
            let found = store.find_parents(parent_type, &uncached);
            for full_path in uncached {
                let parent = found.iter().find(|p| return p.full_path == full_path).cloned();
                if parent.is_none() {
                    tracing::debug!(
                        kind = self.kind.name(),
                        parent_type = parent_type.as_str(),
                        path = %full_path,
                        "parent not found"
                    );
                }
                cache.insert(key_for(&full_path), parent);
            }
        }

        for (path, full_path) in paths {
            if let Cached::Found(parent) = cache.get::<Parent>(&key_for(&full_path)) {
                self.parents.insert(path, parent.clone());
            }
        }
    }

    /// Map every harvested parent path to its container.
    ///
    /// The context's own container is reused without a lookup. Unqualified
    /// paths name the context's container and use the kind's parent type.
    /// Prefixed paths name projects and are split into absolute and relative
    /// groups, each resolved with one batched query through the record cache.
    /// Kinds that accept group owners retry the paths no project matched as
    /// groups, again one query per group.
    fn resolve_parents(&mut self, store: &dyn RecordStore, cache: &mut RecordCache) {
        let current = self.kind.resolve_parent_from_context(self.context);

        let mut absolute = Vec::new();
        let mut relative = Vec::new();
        let mut unqualified = Vec::new();
        for path in self.references_per_parent.keys() {
            let Some(full_path) = path.full_path(self.context.current_parent()) else {
                continue;
            };
            if let Some(current) = current.as_ref().filter(|c| return c.full_path == full_path) {
                self.parents.insert(path.clone(), current.clone());
                continue;
            }
            match path {
                ParentPath::Absolute(_) => absolute.push((path.clone(), full_path)),
                ParentPath::Current => unqualified.push((path.clone(), full_path)),
                ParentPath::Relative(_) => relative.push((path.clone(), full_path)),
            }
        }

        let context_type = self.kind.parent_type(self.context);
        self.resolve_parent_group(unqualified, context_type, store, cache);
        for group in [absolute, relative] {
            self.resolve_parent_group(group.clone(), ParentType::Project, store, cache);
            if !self.kind.group_parents() {
                continue;
            }
            let unmatched: Vec<(ParentPath, String)> =
                group.into_iter().filter(|(path, _)| return !self.parents.contains_key(path)).collect();
            self.resolve_parent_group(unmatched, ParentType::Group, store, cache);
        }
    }

    /// Fetch records with one batch call per resolved parent and index them by
    /// canonical identifier. Identifiers already known to the record cache are
    /// not fetched again.
    fn resolve_records(&mut self, store: &dyn RecordStore, cache: &mut RecordCache) {
        let mut wanted: BTreeMap<(ParentType, EntityId), (Parent, BTreeSet<Identifier>)> = BTreeMap::new();
        for (path, identifiers) in &self.references_per_parent {
            let Some(parent) = self.parents.get(path) else {
                continue;
            };
            wanted
                .entry((parent.kind, parent.id))
                .or_insert_with(|| return (parent.clone(), BTreeSet::new()))
                .1
                .extend(identifiers.iter().cloned());
        }

        let operation = self.kind.name();
        for (key, (parent, identifiers)) in wanted {
            let scope = format!("{}:{}", parent.kind.as_str(), parent.id);
            let key_for = |identifier: &Identifier| return CacheKey::new(operation, scope.clone(), identifier.to_string());

            let mut records: HashMap<Identifier, K::Record> = HashMap::new();
            let mut to_fetch: Vec<Identifier> = Vec::new();
            for identifier in identifiers {
                match cache.get::<K::Record>(&key_for(&identifier)) {
                    Cached::Found(record) => {
                        records.insert(identifier, record.clone());
                    },
                    Cached::Missing => to_fetch.push(identifier),
                    Cached::NotFound => {},
                }
            }

            if !to_fetch.is_empty() {
                let fetched = self.kind.batch_fetch(store, &parent, &to_fetch);
                let mut index: HashMap<Identifier, K::Record> = HashMap::new();
                for record in fetched {
                    for identifier in self.kind.canonical_identifiers(&record) {
                        index.entry(identifier).or_insert_with(|| return record.clone());
                    }
                }
                for identifier in to_fetch {
                    let record = index.get(&identifier).cloned();
                    cache.insert(key_for(&identifier), record.clone());
                    if let Some(record) = record {
                        records.insert(identifier, record);
                    }
                }
            }

            self.records_per_parent.insert(key, records);
        }
    }
}
