//! Markup node model: an ordered forest of elements and text leaves.

use indexmap::IndexMap;

/// Attribute map of one element: attribute name → decoded value.
pub type AttributeMap = IndexMap<String, String>;

/// A parsed markup node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A decoded text run.
    Text(String),
    /// An element with attributes and children.
    Element(Element),
}

impl Node {
    /// Returns the element if this node is one.
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    /// Returns the text if this node is a text leaf.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(text) => Some(text),
            Node::Element(_) => None,
        }
    }
}

/// An element node: name, attributes, ordered children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    /// Tag name (the widget type to materialize).
    pub name: String,
    /// Attributes in source order, values entity-decoded.
    pub attributes: AttributeMap,
    /// Child nodes in source order.
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element with the given name and no attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Look up an attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Child elements, skipping text leaves.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }
}
