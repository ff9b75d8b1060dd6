//! HTML serialization and escaping.

use super::{Document, NodeData, NodeId, VOID_ELEMENTS};

/// Escape text for use inside an attribute value delimited by `"`.
pub fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    return out;
}

/// Escape text for use as element content.
pub fn escape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    return out;
}

impl Document {
    /// Serialized children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(child, &mut out);
        }
        return out;
    }

    /// Serialized `id` including its own tags.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        return out;
    }

    /// Serialize the whole document.
    pub fn to_html(&self) -> String {
        return self.inner_html(self.root());
    }

    /// Append the serialization of `id` to `out`.
    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.data(id) {
            NodeData::Comment(body) => {
                out.push_str("<!--");
                out.push_str(body);
                out.push_str("-->");
            },
            NodeData::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for (name, value) in &element.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.name.as_str()) {
                    return;
                }
                let raw = element.name == "script" || element.name == "style";
                for child in self.children(id) {
                    match (raw, self.text(child)) {
                        (true, Some(text)) => out.push_str(text),
                        _ => self.write_node(child, out),
                    }
                }
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            },
            NodeData::Root => {
                for child in self.children(id) {
                    self.write_node(child, out);
                }
            },
            NodeData::Text(text) => out.push_str(&escape_text(text)),
        }
    }
}
