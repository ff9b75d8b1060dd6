//! Arena-backed HTML document shared by every reference pass of one render.
//!
//! Nodes live in a `Vec` and are addressed by [`NodeId`]. Detached nodes stay
//! in the arena, so an id never dangles; [`Document::is_attached`] tells
//! whether a node is still reachable from the root.

mod parse;
mod serialize;

pub use serialize::{escape_attr, escape_text};

/// Elements whose descendants are never scanned for references.
const IGNORED_ANCESTORS: [&str; 4] = ["pre", "code", "a", "style"];

/// Elements that never have children or an end tag.
const VOID_ELEMENTS: [&str; 8] = ["br", "hr", "img", "input", "link", "meta", "source", "wbr"];

/// Marker class carried by every anchor a reference pass produced.
pub const PROCESSED_CLASS: &str = "gfm";

/// Index of a node in its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An element's tag name and attributes, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Attribute name/value pairs. Values are stored decoded.
    pub attrs: Vec<(String, String)>,
    /// Lowercased tag name.
    pub name: String,
}

impl Element {
    /// Value of the named attribute, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        return self
            .attrs
            .iter()
            .find(|(key, _)| return key == name)
            .map(|(_, value)| return value.as_str());
    }

    /// Whether the whitespace-separated `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        return self
            .attr("class")
            .is_some_and(|classes| return classes.split_whitespace().any(|c| return c == class));
    }
}

/// Payload of one arena node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// An HTML comment, without the `<!--` `-->` delimiters.
    Comment(String),
    /// An element with its attributes.
    Element(Element),
    /// The document root. Exactly one per document, at index 0.
    Root,
    /// Decoded character data.
    Text(String),
}

/// Which ancestors exclude a text node from scanning.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreRules {
    /// Also skip text inside `<blockquote>`.
    pub blockquotes: bool,
}

/// Tree links plus payload for one node.
#[derive(Debug, Clone)]
struct Node {
    /// The node's payload.
    data: NodeData,
    /// First child, if any.
    first_child: Option<NodeId>,
    /// Last child, if any.
    last_child: Option<NodeId>,
    /// Following sibling.
    next: Option<NodeId>,
    /// Containing node. `None` for the root and for detached nodes.
    parent: Option<NodeId>,
    /// Preceding sibling.
    prev: Option<NodeId>,
}

/// An HTML document held as an arena of nodes.
#[derive(Debug, Clone)]
pub struct Document {
    /// All nodes ever created, attached or not.
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        return Self::new();
    }
}

impl Document {
    /// Iterate over the ancestors of `id`, nearest first. Excludes `id` itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        return std::iter::successors(self.parent(id), |&current| return self.parent(current));
    }

    /// Append a detached node as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let last = self.node(parent).last_child;
        {
            let node = self.node_mut(child);
            node.parent = Some(parent);
            node.prev = last;
            node.next = None;
        }
        match last {
            Some(last) => self.node_mut(last).next = Some(child),
            None => self.node_mut(parent).first_child = Some(child),
        }
        self.node_mut(parent).last_child = Some(child);
    }

    /// Direct children of `id`, in order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        return std::iter::successors(self.first_child(id), |&current| return self.next_sibling(current))
            .collect();
    }

    /// Allocate a new detached node.
    pub fn create(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            first_child: None,
            last_child: None,
            next: None,
            parent: None,
            prev: None,
        });
        return id;
    }

    /// Payload of `id`.
    pub fn data(&self, id: NodeId) -> &NodeData {
        return &self.node(id).data;
    }

    /// `id` and all nodes below it, in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut children = self.children(current);
            children.reverse();
            stack.extend(children);
        }
        return out;
    }

    /// Unlink `id` from its parent and siblings. Its subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = self.node(id);
            (node.parent, node.prev, node.next)
        };
        match prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => {
                if let Some(parent) = parent {
                    self.node_mut(parent).first_child = next;
                }
            },
        }
        match next {
            Some(next) => self.node_mut(next).prev = prev,
            None => {
                if let Some(parent) = parent {
                    self.node_mut(parent).last_child = prev;
                }
            },
        }
        let node = self.node_mut(id);
        node.parent = None;
        node.prev = None;
        node.next = None;
    }

    /// Nodes under `start` (inclusive) that a reference pass may rewrite:
    /// text nodes outside ignored ancestors, and unprocessed anchors with a
    /// non-empty `href`. Returned in document order.
    pub fn eligible_nodes(&self, start: NodeId, rules: IgnoreRules) -> Vec<NodeId> {
        return self
            .descendants(start)
            .into_iter()
            .filter(|&id| return self.is_eligible(id, rules))
            .collect();
    }

    /// Element payload of `id`, if it is an element.
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        return match self.data(id) {
            NodeData::Element(element) => Some(element),
            NodeData::Comment(_) | NodeData::Root | NodeData::Text(_) => None,
        };
    }

    /// First child of `id`.
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        return self.node(id).first_child;
    }

    /// Insert a detached node immediately before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, child: NodeId) {
        self.detach(child);
        let (parent, prev) = {
            let node = self.node(sibling);
            (node.parent, node.prev)
        };
        {
            let node = self.node_mut(child);
            node.parent = parent;
            node.prev = prev;
            node.next = Some(sibling);
        }
        self.node_mut(sibling).prev = Some(child);
        match prev {
            Some(prev) => self.node_mut(prev).next = Some(child),
            None => {
                if let Some(parent) = parent {
                    self.node_mut(parent).first_child = Some(child);
                }
            },
        }
    }

    /// Whether `id` is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if id == self.root() {
            return true;
        }
        return self.ancestors(id).last() == Some(self.root());
    }

    /// Whether a single node passes the eligibility query.
    pub fn is_eligible(&self, id: NodeId, rules: IgnoreRules) -> bool {
        return match self.data(id) {
            NodeData::Text(_) => !self.ancestors(id).any(|ancestor| {
                return self.element(ancestor).is_some_and(|el| return is_ignored_ancestor(&el.name, rules));
            }),
            NodeData::Element(el) if el.name == "a" => {
                el.attr("href").is_some_and(|href| return !href.is_empty()) && !el.has_class(PROCESSED_CLASS)
            },
            NodeData::Comment(_) | NodeData::Element(_) | NodeData::Root => false,
        };
    }

    /// Create an empty document holding only the root.
    pub fn new() -> Self {
        let mut doc = Self { nodes: Vec::new() };
        doc.create(NodeData::Root);
        return doc;
    }

    /// Following sibling of `id`.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        return self.node(id).next;
    }

    /// Parent of `id`.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        return self.node(id).parent;
    }

    /// Parse an HTML fragment into a new document.
    pub fn parse(html: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root();
        parse::parse_into(&mut doc, root, html);
        return doc;
    }

    /// Preceding sibling of `id`.
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        return self.node(id).prev;
    }

    /// Replace `id` with the top-level nodes of the parsed `html` fragment.
    ///
    /// No handles to the inserted nodes are returned: callers that need them
    /// must re-derive them from the surrounding siblings.
    pub fn replace_with_html(&mut self, id: NodeId, html: &str) {
        let holder = self.create(NodeData::Root);
        parse::parse_into(self, holder, html);
        for child in self.children(holder) {
            self.insert_before(id, child);
        }
        self.detach(id);
    }

    /// The root node.
    pub const fn root(&self) -> NodeId {
        return NodeId(0);
    }

    /// Text payload of `id`, if it is a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        return match self.data(id) {
            NodeData::Text(text) => Some(text),
            NodeData::Comment(_) | NodeData::Element(_) | NodeData::Root => None,
        };
    }

    /// Concatenated text of all text nodes under `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        return self
            .descendants(id)
            .into_iter()
            .filter_map(|node| return self.text(node))
            .collect();
    }

    /// Look up a node. Ids are only minted by this arena, so the index is valid.
    #[allow(clippy::indexing_slicing, reason = "NodeId is only constructed by this arena")]
    fn node(&self, id: NodeId) -> &Node {
        return &self.nodes[id.0];
    }

    /// Mutable counterpart of [`Document::node`].
    #[allow(clippy::indexing_slicing, reason = "NodeId is only constructed by this arena")]
    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        return &mut self.nodes[id.0];
    }
}

/// Whether an element with this tag name hides its text from scanning.
fn is_ignored_ancestor(name: &str, rules: IgnoreRules) -> bool {
    return IGNORED_ANCESTORS.contains(&name) || (rules.blockquotes && name == "blockquote");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn eligible_nodes_skip_code_and_processed_links() {
        let doc = Document::parse(
            "<p>See <code>#1</code> and <a href=\"/x\">x</a> <a class=\"gfm\" href=\"/y\">y</a> <a href=\"\">z</a></p>",
        );
        let eligible = doc.eligible_nodes(doc.root(), IgnoreRules::default());
        let texts: Vec<&str> = eligible.iter().filter_map(|&id| doc.text(id)).collect();
        let anchors: Vec<&str> = eligible
            .iter()
            .filter_map(|&id| doc.element(id))
            .filter_map(|el| el.attr("href"))
            .collect();

        assert_eq!(texts, vec!["See ", " and ", " ", " "]);
        assert_eq!(anchors, vec!["/x"]);
    }

    #[test]
    fn blockquotes_are_ignored_only_on_request() {
        let doc = Document::parse("<blockquote>#1</blockquote>");
        let default = doc.eligible_nodes(doc.root(), IgnoreRules::default());
        let strict = doc.eligible_nodes(doc.root(), IgnoreRules { blockquotes: true });

        assert_eq!(default.len(), 1);
        assert!(strict.is_empty());
    }

    #[test]
    fn replace_with_html_splices_in_place() {
        let mut doc = Document::parse("<p>a<b>b</b>c</p>");
        let p = doc.first_child(doc.root()).unwrap();
        let bold = doc.children(p)[1];

        doc.replace_with_html(bold, "<i>x</i>y");

        assert_eq!(doc.to_html(), "<p>a<i>x</i>yc</p>");
        assert!(!doc.is_attached(bold));
        assert_eq!(doc.children(p).len(), 4);
    }

    #[test]
    fn replacing_first_child_updates_parent_links() {
        let mut doc = Document::parse("<p>a</p>");
        let p = doc.first_child(doc.root()).unwrap();
        let text = doc.first_child(p).unwrap();

        doc.replace_with_html(text, "b");

        let first = doc.first_child(p).unwrap();
        assert_eq!(doc.text(first), Some("b"));
        assert_eq!(doc.previous_sibling(first), None);
    }
}
