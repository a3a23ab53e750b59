//! Element tree built from a parsed Markdown document.
//!
//! Nodes carry just enough structure for link post-processing and HTML
//! output: tag name, attributes in insertion order and children.

use maud::{Markup, PreEscaped, Render};

/// Elements rendered without children or closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Plain text, escaped on output.
    Text(String),
    /// Pre-rendered HTML written verbatim. Contributes no text content.
    Raw(String),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn raw(html: impl Into<String>) -> Self {
        Self::Raw(html.into())
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

/// HTML element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`Element::set_attr`].
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder form of [`Element::push`].
    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.push(child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Sets attribute value. An existing attribute keeps its position.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn push(&mut self, child: impl Into<Node>) {
        self.children.push(child.into());
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Mutable iterator over child elements, skipping text and raw nodes.
    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Text(_) | Node::Raw(_) => None,
        })
    }

    /// Concatenates descendant text, ignoring element boundaries.
    ///
    /// Attribute values (an image's `alt` included) and raw HTML do not
    /// contribute.
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, buffer: &mut String) {
        for child in &self.children {
            match child {
                Node::Element(element) => element.collect_text(buffer),
                Node::Text(value) => buffer.push_str(value),
                Node::Raw(_) => {}
            }
        }
    }

    /// Renders element and descendants to HTML.
    pub fn to_html(&self) -> String {
        self.render().into_string()
    }

    fn is_void(&self) -> bool {
        VOID_TAGS.contains(&self.tag.as_str())
    }
}

impl Render for Element {
    fn render_to(&self, buffer: &mut String) {
        buffer.push('<');
        buffer.push_str(&self.tag);
        for (name, value) in &self.attrs {
            buffer.push(' ');
            buffer.push_str(name);
            buffer.push_str("=\"");
            value.as_str().render_to(buffer);
            buffer.push('"');
        }

        if self.is_void() {
            buffer.push_str(" />");
            return;
        }

        buffer.push('>');
        for child in &self.children {
            child.render_to(buffer);
        }
        buffer.push_str("</");
        buffer.push_str(&self.tag);
        buffer.push('>');
    }
}

impl Render for Node {
    fn render_to(&self, buffer: &mut String) {
        match self {
            Self::Element(element) => element.render_to(buffer),
            Self::Text(text) => text.as_str().render_to(buffer),
            Self::Raw(html) => buffer.push_str(html),
        }
    }
}

/// Renders a sequence of sibling nodes.
pub fn render_nodes(nodes: &[Node]) -> Markup {
    let mut buffer = String::new();
    for node in nodes {
        node.render_to(&mut buffer);
    }
    PreEscaped(buffer)
}
