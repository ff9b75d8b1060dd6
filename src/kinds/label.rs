//! Labels: `~12`, `~bug`, `~"needs review"`, with an optional project prefix.
//!
//! Labels have no URL form. A project sees its own labels and those of every
//! group above it; when one name exists at several levels the nearest owner
//! wins. In a group context the group's own labels are used.

use crate::context::{LabelUrl, RenderContext};
use crate::dom::escape_attr;
use crate::error::Error;
use crate::kind::ReferenceKind;
use crate::model::{EntityId, Label, Parent, ParentType};
use crate::pattern::{PatternSet, RefMatch, parent_prefix};
use crate::store::RecordStore;
use crate::types::{IdOrName, Identifier};

/// Characters allowed in an unquoted label name.
const NAME_CHARS: &str = r"A-Za-z0-9_\-\?\.&";

/// Label references.
#[derive(Debug, Clone)]
pub struct LabelKind {
    /// Compiled recognizers.
    patterns: PatternSet,
}

impl LabelKind {
    /// Compile the label patterns.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if a pattern fails to compile.
    pub fn new() -> Result<Self, Error> {
        // An id must stand alone, so `~2fa` falls through to a name. Names may
        // not end in `.` or `?`, which leaves sentence punctuation outside.
        let inline = format!(
            r#"{}~(?:(?P<label_id>\d+)\b|(?P<label_name>[{NAME_CHARS}]*[A-Za-z0-9_\-&])|"(?P<label_quoted>[^"]+)")"#,
            parent_prefix()
        );
        return Ok(Self {
            patterns: PatternSet::new("label", &inline, None)?,
        });
    }
}

/// Whether `name` can be written without quotes.
fn is_simple_name(name: &str) -> bool {
    return !name.is_empty()
        && !name.ends_with(['.', '?'])
        && name.chars().all(|c| return c.is_ascii_alphanumeric() || "_-?.&".contains(c));
}

impl ReferenceKind for LabelKind {
    type Record = Label;

    fn batch_fetch(&self, store: &dyn RecordStore, parent: &Parent, identifiers: &[Identifier]) -> Vec<Label> {
        let (ids, names) = super::split_keyed(identifiers);
        return store.labels(parent, &ids, &names);
    }

    /// A list filtered by the label, chosen by `context.label_url`.
    ///
    /// The group page belongs to the context's group, which may be a subgroup
    /// of the label's owner. A project parent has no group page and gets its
    /// issue list instead.
    fn build_href(&self, record: &Label, parent: &Parent, context: &RenderContext) -> String {
        let name = urlencoding::encode(&record.name);
        let list = match context.label_url {
            LabelUrl::Group if parent.kind == ParentType::Group => {
                let group = context.group.as_ref().unwrap_or(parent);
                return context.url_for(&format!("/{}?label_name={name}", group.full_path));
            },
            LabelUrl::Group | LabelUrl::Issues => "issues",
            LabelUrl::MergeRequests => "merge_requests",
        };
        return match parent.kind {
            ParentType::Group => context.url_for(&format!("/groups/{}/-/{list}?label_name={name}", parent.full_path)),
            ParentType::Project => context.url_for(&format!("/{}/-/{list}?label_name={name}", parent.full_path)),
        };
    }

    fn build_title(&self, record: &Label, _matched: &RefMatch) -> String {
        return record.description.clone();
    }

    fn canonical_identifiers(&self, record: &Label) -> Vec<Identifier> {
        return vec![
            Identifier::Keyed(IdOrName::ById(record.id)),
            Identifier::Keyed(IdOrName::ByName(record.name.clone())),
        ];
    }

    fn css_class(&self) -> &'static str {
        return "gfm-label";
    }

    fn extra_classes(&self) -> &'static [&'static str] {
        return &["gl-link", "gl-label-link"];
    }

    fn group_parents(&self) -> bool {
        return true;
    }

    fn identifier_groups(&self) -> &'static [&'static str] {
        return &["label_id", "label_name", "label_quoted"];
    }

    /// The label name, followed by where it lives when that is not the
    /// context's project: `bug in web` or `bug in other / tools`.
    fn link_text(&self, record: &Label, parent: &Parent, context: &RenderContext) -> String {
        let prefix = parent.reference_prefix(context.current_parent());
        if prefix.is_empty() {
            return record.name.clone();
        }
        if prefix == parent.full_path {
            return format!("{} in {}", record.name, parent.full_name);
        }
        return format!("{} in {}", record.name, parent.name);
    }

    fn name(&self) -> &'static str {
        return "label";
    }

    fn parent_type(&self, context: &RenderContext) -> ParentType {
        if context.project.is_some() {
            return ParentType::Project;
        }
        return ParentType::Group;
    }

    fn parse_identifier(&self, raw_symbol: &str, matched: &RefMatch) -> Option<Identifier> {
        if matched.capture("label_id").is_some() {
            return raw_symbol.parse().ok().map(|id| return Identifier::Keyed(IdOrName::ById(id)));
        }
        let name = super::name_from(matched, &["label_name", "label_quoted"])?;
        return Some(Identifier::Keyed(IdOrName::ByName(name)));
    }

    fn patterns(&self) -> &PatternSet {
        return &self.patterns;
    }

    fn record_id(&self, record: &Label) -> EntityId {
        return record.id;
    }

    fn reference(&self, record: &Label, parent: &Parent, from: Option<&Parent>) -> String {
        return format!(
            "{}~{}",
            parent.reference_prefix(from),
            super::quoted_name(&record.name, is_simple_name)
        );
    }

    fn reference_valid(&self, raw_symbol: &str) -> bool {
        return !raw_symbol.trim().is_empty();
    }

    fn wrap_link_text(&self, record: &Label, text_html: String) -> String {
        return format!(
            r#"<span class="gl-label-text" style="background-color: {}">{text_html}</span>"#,
            escape_attr(&record.color)
        );
    }
}
