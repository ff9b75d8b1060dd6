//! Builds the anchor that replaces a resolved reference.

use std::fmt::Write as _;

use crate::context::RenderContext;
use crate::dom::{PROCESSED_CLASS, escape_attr, escape_text};
use crate::kind::ReferenceKind;
use crate::model::Parent;
use crate::pattern::RefMatch;

/// Assembles link HTML for one kind.
pub struct LinkBuilder<'a, K: ReferenceKind> {
    /// Rendering context, for hrefs and link text.
    context: &'a RenderContext,
    /// Kind supplying the per-record pieces.
    kind: &'a K,
}

impl<'a, K: ReferenceKind> LinkBuilder<'a, K> {
    /// Anchor HTML for `record`.
    ///
    /// `content` is the inner HTML of an anchor being rewritten. It is kept as
    /// the link text and marks the result with `data-link="true"`. Without it
    /// the text is generated from the record and decorated from the match.
    pub fn build(&self, matched: &RefMatch, parent: &Parent, record: &K::Record, content: Option<&str>) -> String {
        let href = matched
            .url_without_format()
            .unwrap_or_else(|| return self.kind.build_href(record, parent, self.context));
        let title = self.kind.build_title(record, matched);

        let mut html = format!(r#"<a href="{}""#, escape_attr(&href));
        for (name, value) in self.data_attributes(matched, parent, record, content) {
            let _ = write!(html, r#" data-{name}="{}""#, escape_attr(&value));
        }
        let _ = write!(html, r#" title="{}" class="{}">"#, escape_attr(&title), self.classes());

        match content {
            Some(content) => html.push_str(content),
            None => html.push_str(&self.link_text(matched, parent, record)),
        }
        html.push_str("</a>");
        return html;
    }

    /// Builder for `kind` within `context`.
    pub const fn new(kind: &'a K, context: &'a RenderContext) -> Self {
        return Self { context, kind };
    }

    /// Marker class, kind class, tooltip class, then the kind's extras.
    fn classes(&self) -> String {
        let mut classes = vec![PROCESSED_CLASS, self.kind.css_class()];
        if self.kind.tooltip() {
            classes.push("has-tooltip");
        }
        classes.extend_from_slice(self.kind.extra_classes());
        return classes.join(" ");
    }

    /// Every `data-*` attribute, without the prefix. Values are unescaped.
    fn data_attributes(
        &self,
        matched: &RefMatch,
        parent: &Parent,
        record: &K::Record,
        content: Option<&str>,
    ) -> Vec<(String, String)> {
        let mut attrs = vec![
            ("reference-type".to_string(), self.kind.name().to_string()),
            ("original".to_string(), content.unwrap_or(&matched.text).to_string()),
            ("link".to_string(), content.is_some().to_string()),
            ("link-reference".to_string(), matched.from_link_pattern.to_string()),
            (parent.kind.as_str().to_string(), parent.id.to_string()),
            (self.kind.name().replace('_', "-"), self.kind.record_id(record).to_string()),
        ];
        attrs.extend(
            self.kind
                .data_attributes(record, parent)
                .into_iter()
                .map(|(name, value)| return (name.to_string(), value)),
        );
        if self.kind.tooltip() {
            attrs.push(("container".to_string(), "body".to_string()));
            attrs.push(("placement".to_string(), "top".to_string()));
        }
        return attrs;
    }

    /// Generated link text: the reference plus any decorations in parentheses.
    fn link_text(&self, matched: &RefMatch, parent: &Parent, record: &K::Record) -> String {
        let mut text = self.kind.link_text(record, parent, self.context);
        let decorations = self.kind.link_text_decorations(record, matched);
        if !decorations.is_empty() {
            let _ = write!(text, " ({})", decorations.join(", "));
        }
        return self.kind.wrap_link_text(record, escape_text(&text));
    }
}
