/// Core domain types shared by every reference kind: identifiers and the
/// summaries handed to downstream consumers.
use std::fmt;

use serde::Serialize;

use crate::model::EntityId;

/// A record named either by its numeric id or by its name, never both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdOrName {
    /// Numeric form, e.g. `~42` or `%3`.
    ById(u64),
    /// Name form, e.g. `~bug` or `~"needs review"`.
    ByName(String),
}

/// The key naming one record within its parent.
///
/// Parsing raw reference text and reading a resolved record must produce equal
/// values for the same record, so records can be indexed by identifier after a
/// batch fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identifier {
    /// Composite key of a design: the owning issue and the file name.
    Design {
        /// File name within the issue's design collection.
        filename: String,
        /// `iid` of the owning issue.
        issue_iid: u64,
    },
    /// Id-or-name key, used by labels and milestones.
    Keyed(IdOrName),
    /// Parent-scoped sequence number, used by issues and merge requests.
    Sequence(u64),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Identifier::Design { filename, issue_iid } => write!(f, "{issue_iid}[{filename}]"),
            Identifier::Keyed(IdOrName::ById(id)) => write!(f, "id:{id}"),
            Identifier::Keyed(IdOrName::ByName(name)) => write!(f, "name:{name}"),
            Identifier::Sequence(iid) => write!(f, "{iid}"),
        };
    }
}

/// One resolved reference, reported to callers so they can act on what a
/// document mentions without scanning it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedReference {
    /// Record id.
    pub id: EntityId,
    /// Full path of the record's parent.
    pub parent: String,
    /// Canonical reference text, e.g. `acme/api#42`.
    pub reference: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_and_name_forms_are_distinct_keys() {
        let by_id = Identifier::Keyed(IdOrName::ById(42));
        let by_name = Identifier::Keyed(IdOrName::ByName("42".to_string()));

        assert_ne!(by_id, by_name);
        assert_ne!(by_id.to_string(), by_name.to_string());
    }
}
