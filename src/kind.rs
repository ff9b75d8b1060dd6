//! The contract each entity kind implements to plug into the reference engine.

use crate::context::RenderContext;
use crate::model::{EntityId, Parent, ParentType};
use crate::pattern::{PatternSet, RefMatch};
use crate::store::RecordStore;
use crate::types::Identifier;

/// One kind of referenceable entity: how it is written, fetched and linked.
///
/// The engine owns scanning, batching, caching and node bookkeeping; a kind
/// only answers the questions below. For any record `r` and any raw text `t`
/// naming it, `parse_identifier(t)` must be one of `canonical_identifiers(r)`.
pub trait ReferenceKind {
    /// Record type returned by `batch_fetch`.
    type Record: Clone + 'static;

    /// Fetch every record of `parent` named by `identifiers` in one query.
    fn batch_fetch(&self, store: &dyn RecordStore, parent: &Parent, identifiers: &[Identifier]) -> Vec<Self::Record>;

    /// URL of `record` within `parent`.
    fn build_href(&self, record: &Self::Record, parent: &Parent, context: &RenderContext) -> String;

    /// Tooltip text. Empty when the kind has none.
    fn build_title(&self, _record: &Self::Record, _matched: &RefMatch) -> String {
        return String::new();
    }

    /// Every identifier that names `record`.
    fn canonical_identifiers(&self, record: &Self::Record) -> Vec<Identifier>;

    /// Kind-specific CSS marker, e.g. `gfm-issue`.
    fn css_class(&self) -> &'static str;

    /// Extra `data-*` attributes beyond the ones every link carries.
    fn data_attributes(&self, _record: &Self::Record, _parent: &Parent) -> Vec<(&'static str, String)> {
        return Vec::new();
    }

    /// Extra CSS classes appended after the shared ones.
    fn extra_classes(&self) -> &'static [&'static str] {
        return &[];
    }

    /// Whether a prefixed path that names no project may name a group.
    fn group_parents(&self) -> bool {
        return false;
    }

    /// Named groups that hold the raw identifier, in priority order.
    fn identifier_groups(&self) -> &'static [&'static str];

    /// Bracketed extras appended to the link text, e.g. `comment 12`.
    fn link_text_decorations(&self, _record: &Self::Record, _matched: &RefMatch) -> Vec<String> {
        return Vec::new();
    }

    /// Text of a generated link. Defaults to the reference shortened relative
    /// to the context's parent, e.g. `#42` or `api#42`.
    fn link_text(&self, record: &Self::Record, parent: &Parent, context: &RenderContext) -> String {
        return self.reference(record, parent, context.current_parent());
    }

    /// Kind name, used as `data-reference-type` and as the results map key.
    fn name(&self) -> &'static str;

    /// Which container type scopes this kind's identifiers in `context`.
    fn parent_type(&self, _context: &RenderContext) -> ParentType {
        return ParentType::Project;
    }

    /// Parse a raw identifier. `None` means "not a reference".
    fn parse_identifier(&self, raw_symbol: &str, matched: &RefMatch) -> Option<Identifier>;

    /// Inline and link recognizers.
    fn patterns(&self) -> &PatternSet;

    /// Record id written to the kind's own data attribute.
    fn record_id(&self, record: &Self::Record) -> EntityId;

    /// Reference text naming `record` from inside `from`. With `from` unset
    /// the reference is fully qualified, e.g. `acme/api#42`.
    fn reference(&self, record: &Self::Record, parent: &Parent, from: Option<&Parent>) -> String;

    /// Cheap structural check run before `parse_identifier`.
    fn reference_valid(&self, raw_symbol: &str) -> bool {
        return !raw_symbol.is_empty();
    }

    /// The parent unprefixed references resolve to, without any lookup.
    fn resolve_parent_from_context(&self, context: &RenderContext) -> Option<Parent> {
        return context.parent_of(self.parent_type(context)).cloned();
    }

    /// Whether links get the `has-tooltip` class.
    fn tooltip(&self) -> bool {
        return true;
    }

    /// Wrap the escaped link text in kind-specific markup.
    fn wrap_link_text(&self, _record: &Self::Record, text_html: String) -> String {
        return text_html;
    }
}
