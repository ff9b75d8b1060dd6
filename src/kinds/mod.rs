//! The entity kinds shipped with reflink.

mod design;
mod issue;
mod label;
mod merge_request;
mod milestone;

pub use design::DesignKind;
pub use issue::IssueKind;
pub use label::LabelKind;
pub use merge_request::MergeRequestKind;
pub use milestone::MilestoneKind;

use crate::pattern::RefMatch;
use crate::types::{IdOrName, Identifier};

/// `comment 12` for a match whose anchor is `note_12`.
fn note_decoration(matched: &RefMatch) -> Option<String> {
    let note = matched.anchor()?.strip_prefix("note_")?;
    if note.is_empty() || !note.bytes().all(|b| return b.is_ascii_digit()) {
        return None;
    }
    return Some(format!("comment {note}"));
}

/// Parse the first participating group of `groups` as a name, after the
/// numeric group has been ruled out.
fn name_from(matched: &RefMatch, groups: &[&str]) -> Option<String> {
    return groups
        .iter()
        .find_map(|group| return matched.capture(group))
        .map(str::to_string)
        .filter(|name| return !name.trim().is_empty());
}

/// Name as written after a kind's prefix character: bare when `simple`
/// accepts it, double-quoted otherwise.
fn quoted_name(name: &str, simple: fn(&str) -> bool) -> String {
    if simple(name) {
        return name.to_string();
    }
    return format!("\"{name}\"");
}

/// Numeric sequence numbers among `identifiers`.
fn sequence_numbers(identifiers: &[Identifier]) -> Vec<u64> {
    return identifiers
        .iter()
        .filter_map(|identifier| {
            return match identifier {
                Identifier::Sequence(iid) => Some(*iid),
                Identifier::Design { .. } | Identifier::Keyed(_) => None,
            };
        })
        .collect();
}

/// Split id-or-name identifiers into their numeric and named halves.
fn split_keyed(identifiers: &[Identifier]) -> (Vec<u64>, Vec<String>) {
    let mut ids = Vec::new();
    let mut names = Vec::new();
    for identifier in identifiers {
        match identifier {
            Identifier::Keyed(IdOrName::ById(id)) => ids.push(*id),
            Identifier::Keyed(IdOrName::ByName(name)) => names.push(name.clone()),
            Identifier::Design { .. } | Identifier::Sequence(_) => {},
        }
    }
    return (ids, names);
}
