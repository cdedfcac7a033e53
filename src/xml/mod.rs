//! In-memory XML tree for package parts.
//!
//! Parts are parsed into an arena-backed tree: nodes live in a flat vector
//! and refer to each other by index, which gives every node a parent link
//! without reference counting. All mutation algorithms (search/replace,
//! property cascade, merge) operate on this tree and re-serialize through
//! [`codec`].
//!
//! Qualified names are stored in prefixed form (`w:p`, `a:blip`); the prefix
//! table lives in [`ns`] and is honored verbatim on serialization.

pub mod codec;
pub mod ns;

/// Index of a node within its owning [`XmlDoc`] arena.
///
/// A `NodeId` is only meaningful together with the document it was created
/// by; using it against another document is a logic error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Closed classification of WordprocessingML elements the editing
/// algorithms dispatch on.
///
/// Replaces scattered tag-string comparisons: a node is classified once and
/// ancestor walks, anchors and widening all match on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    /// A `w:p` element.
    Paragraph,
    /// A `w:r` element.
    Run,
    /// A `w:t` element (carries one text payload).
    TextFragment,
    /// Any other element or a text node.
    Other,
}

/// A single attribute with its prefixed name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        name: String,
        attrs: Vec<Attr>,
        children: Vec<NodeId>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    data: NodeData,
}

/// An XML document as a mutable arena tree.
///
/// Detaching a node leaves its arena slot in place (slots are never
/// reclaimed); a detached subtree simply becomes unreachable from the root.
#[derive(Debug, Clone)]
pub struct XmlDoc {
    nodes: Vec<Node>,
    root: NodeId,
}

impl XmlDoc {
    /// Create a document with a single root element of the given name.
    pub fn with_root(name: &str) -> Self {
        let root_node = Node {
            parent: None,
            data: NodeData::Element {
                name: name.to_string(),
                attrs: Vec::new(),
                children: Vec::new(),
            },
        };
        XmlDoc {
            nodes: vec![root_node],
            root: NodeId(0),
        }
    }

    /// The root element.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { parent: None, data });
        id
    }

    /// Create a detached element node.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.alloc(NodeData::Element {
            name: name.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        })
    }

    /// Create a detached element node with attributes.
    pub fn create_element_with(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(name);
        for (k, v) in attrs {
            self.set_attr(id, k, v);
        }
        id
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    /// The parent of a node, if attached.
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// The ordered children of an element (empty for text nodes).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id.0].data {
            NodeData::Element { children, .. } => children,
            NodeData::Text(_) => &[],
        }
    }

    /// The prefixed element name, or `None` for text nodes.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { name, .. } => Some(name),
            NodeData::Text(_) => None,
        }
    }

    /// Whether the node is an element with the given prefixed name.
    #[inline]
    pub fn is_named(&self, id: NodeId, name: &str) -> bool {
        self.name(id) == Some(name)
    }

    /// The payload of a text node, or `None` for elements.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Text(t) => Some(t),
            NodeData::Element { .. } => None,
        }
    }

    /// Classify an element into the closed variant set.
    pub fn class(&self, id: NodeId) -> NodeClass {
        match self.name(id) {
            Some("w:p") => NodeClass::Paragraph,
            Some("w:r") => NodeClass::Run,
            Some("w:t") => NodeClass::TextFragment,
            _ => NodeClass::Other,
        }
    }

    /// Attribute value by prefixed name.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.as_str()),
            NodeData::Text(_) => None,
        }
    }

    /// All attributes of an element (empty for text nodes).
    pub fn attrs(&self, id: NodeId) -> &[Attr] {
        match &self.nodes[id.0].data {
            NodeData::Element { attrs, .. } => attrs,
            NodeData::Text(_) => &[],
        }
    }

    /// Set (or replace) an attribute. Text nodes are ignored.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            if let Some(attr) = attrs.iter_mut().find(|a| a.name == name) {
                attr.value = value.to_string();
            } else {
                attrs.push(Attr {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
    }

    /// Remove an attribute if present.
    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            attrs.retain(|a| a.name != name);
        }
    }

    /// Append a child to an element.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        if let NodeData::Element { children, .. } = &mut self.nodes[parent.0].data {
            children.push(child);
            self.nodes[child.0].parent = Some(parent);
        }
    }

    /// Insert a child at the given index of an element's child list.
    ///
    /// An index past the end appends.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        if let NodeData::Element { children, .. } = &mut self.nodes[parent.0].data {
            let index = index.min(children.len());
            children.insert(index, child);
            self.nodes[child.0].parent = Some(parent);
        }
    }

    /// Insert a node immediately before an attached sibling.
    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) {
        if let Some(parent) = self.parent(sibling) {
            let idx = self
                .index_in_parent(sibling)
                .unwrap_or(self.children(parent).len());
            self.insert(parent, idx, node);
        }
    }

    /// Insert a node immediately after an attached sibling.
    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) {
        if let Some(parent) = self.parent(sibling) {
            let idx = self
                .index_in_parent(sibling)
                .map(|i| i + 1)
                .unwrap_or(self.children(parent).len());
            self.insert(parent, idx, node);
        }
    }

    /// Detach a node from its parent. No-op for detached nodes and the root.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent {
            if let NodeData::Element { children, .. } = &mut self.nodes[parent.0].data {
                children.retain(|&c| c != id);
            }
            self.nodes[id.0].parent = None;
        }
    }

    /// Position of a node within its parent's child list.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Root-to-node path of child indices, used for document-order
    /// comparisons between anchors.
    pub fn path(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut cur = id;
        while let Some(parent) = self.parent(cur) {
            if let Some(idx) = self.children(parent).iter().position(|&c| c == cur) {
                path.push(idx);
            }
            cur = parent;
        }
        path.reverse();
        path
    }

    /// Pre-order traversal of the subtree rooted at `id`, excluding `id`.
    ///
    /// Collected eagerly so callers may mutate while iterating the snapshot.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            for &child in self.children(node).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Pre-order descendant elements with the given prefixed name.
    pub fn descendants_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.is_named(n, name))
            .collect()
    }

    /// Direct children with the given prefixed name.
    pub fn children_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&n| self.is_named(n, name))
            .collect()
    }

    /// First direct child with the given prefixed name.
    pub fn first_child_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&n| self.is_named(n, name))
    }

    /// Walk ancestors (starting at the node itself) until one matches the
    /// requested class.
    pub fn ancestor_of_class(&self, id: NodeId, class: NodeClass) -> Option<NodeId> {
        let mut cur = Some(id);
        while let Some(node) = cur {
            if self.class(node) == class {
                return Some(node);
            }
            cur = self.parent(node);
        }
        None
    }

    /// Concatenated text of all text nodes in the subtree, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(t) = self.text(id) {
            return t.to_string();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(t) = self.text(node) {
                out.push_str(t);
            }
        }
        out
    }

    /// Replace an element's children with a single text node.
    pub fn set_text_content(&mut self, element: NodeId, text: &str) {
        for child in self.children(element).to_vec() {
            self.detach(child);
        }
        let t = self.create_text(text);
        self.append(element, t);
    }

    /// Overwrite the payload of an existing text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let NodeData::Text(t) = &mut self.nodes[id.0].data {
            *t = text.to_string();
        }
    }

    /// Deep-copy a subtree from another document into this arena.
    ///
    /// The copy is detached; attach it with [`XmlDoc::append`] or one of the
    /// insert methods.
    pub fn import(&mut self, other: &XmlDoc, id: NodeId) -> NodeId {
        match &other.nodes[id.0].data {
            NodeData::Text(t) => {
                let t = t.clone();
                self.create_text(&t)
            }
            NodeData::Element {
                name,
                attrs,
                children,
            } => {
                let (name, attrs, children) = (name.clone(), attrs.clone(), children.clone());
                let copy = self.create_element(&name);
                if let NodeData::Element { attrs: dst, .. } = &mut self.nodes[copy.0].data {
                    *dst = attrs;
                }
                for child in children {
                    let child_copy = self.import(other, child);
                    self.append(copy, child_copy);
                }
                copy
            }
        }
    }

    /// Structural equality of two subtrees: element names, attribute sets
    /// (order-insensitive) and ordered children must coincide.
    /// Whitespace-only text nodes are ignored on both sides.
    pub fn deep_eq(a: &XmlDoc, an: NodeId, b: &XmlDoc, bn: NodeId) -> bool {
        match (&a.nodes[an.0].data, &b.nodes[bn.0].data) {
            (NodeData::Text(x), NodeData::Text(y)) => x == y,
            (
                NodeData::Element {
                    name: na,
                    attrs: aa,
                    children: ca,
                },
                NodeData::Element {
                    name: nb,
                    attrs: ab,
                    children: cb,
                },
            ) => {
                if na != nb {
                    return false;
                }
                let mut sa: Vec<_> = aa.iter().collect();
                let mut sb: Vec<_> = ab.iter().collect();
                sa.sort_by(|x, y| x.name.cmp(&y.name));
                sb.sort_by(|x, y| x.name.cmp(&y.name));
                if sa != sb {
                    return false;
                }
                let fa: Vec<_> = ca
                    .iter()
                    .filter(|&&c| !a.is_blank_text(c))
                    .copied()
                    .collect();
                let fb: Vec<_> = cb
                    .iter()
                    .filter(|&&c| !b.is_blank_text(c))
                    .copied()
                    .collect();
                fa.len() == fb.len()
                    && fa
                        .iter()
                        .zip(fb.iter())
                        .all(|(&x, &y)| Self::deep_eq(a, x, b, y))
            }
            _ => false,
        }
    }

    fn is_blank_text(&self, id: NodeId) -> bool {
        self.text(id)
            .map(|t| t.chars().all(char::is_whitespace))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (XmlDoc, NodeId, NodeId, NodeId) {
        let mut doc = XmlDoc::with_root("w:document");
        let body = doc.create_element("w:body");
        let root = doc.root();
        doc.append(root, body);
        let p = doc.create_element("w:p");
        doc.append(body, p);
        let r = doc.create_element("w:r");
        doc.append(p, r);
        let t = doc.create_element("w:t");
        doc.append(r, t);
        doc.set_text_content(t, "Hello");
        (doc, p, r, t)
    }

    #[test]
    fn test_classification() {
        let (doc, p, r, t) = sample();
        assert_eq!(doc.class(p), NodeClass::Paragraph);
        assert_eq!(doc.class(r), NodeClass::Run);
        assert_eq!(doc.class(t), NodeClass::TextFragment);
        assert_eq!(doc.class(doc.root()), NodeClass::Other);
    }

    #[test]
    fn test_ancestor_walk() {
        let (doc, p, r, t) = sample();
        assert_eq!(doc.ancestor_of_class(t, NodeClass::Run), Some(r));
        assert_eq!(doc.ancestor_of_class(t, NodeClass::Paragraph), Some(p));
        assert_eq!(doc.ancestor_of_class(doc.root(), NodeClass::Run), None);
    }

    #[test]
    fn test_text_content() {
        let (doc, p, ..) = sample();
        assert_eq!(doc.text_content(p), "Hello");
    }

    #[test]
    fn test_detach_and_insert() {
        let (mut doc, p, r, _) = sample();
        doc.detach(r);
        assert!(doc.children(p).is_empty());
        assert_eq!(doc.parent(r), None);
        doc.insert(p, 0, r);
        assert_eq!(doc.children(p), &[r]);
    }

    #[test]
    fn test_path_ordering() {
        let (mut doc, p, ..) = sample();
        let body = doc.parent(p).unwrap();
        let p2 = doc.create_element("w:p");
        doc.append(body, p2);
        assert!(doc.path(p) < doc.path(p2));
    }

    #[test]
    fn test_import_deep_copy() {
        let (src, p, ..) = sample();
        let mut dst = XmlDoc::with_root("w:document");
        let copy = dst.import(&src, p);
        let root = dst.root();
        dst.append(root, copy);
        assert_eq!(dst.text_content(copy), "Hello");
        assert!(XmlDoc::deep_eq(&src, p, &dst, copy));
    }

    #[test]
    fn test_deep_eq_attr_order_insensitive() {
        let mut a = XmlDoc::with_root("w:p");
        let ra = a.root();
        a.set_attr(ra, "w:x", "1");
        a.set_attr(ra, "w:y", "2");
        let mut b = XmlDoc::with_root("w:p");
        let rb = b.root();
        b.set_attr(rb, "w:y", "2");
        b.set_attr(rb, "w:x", "1");
        assert!(XmlDoc::deep_eq(&a, ra, &b, rb));
    }
}
