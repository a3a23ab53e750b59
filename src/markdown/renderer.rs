//! Markdown rendering with GitHub Flavored Markdown support.

use anyhow::{Context, Result};
use comrak::nodes::{AstNode, ListType, NodeCodeBlock, NodeValue, TableAlignment};
use comrak::{Arena, Options};
use std::path::Path;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use tracing::debug;

use super::LinkAttrModifier;
use crate::dom::{Element, Node, render_nodes};
use crate::options::LinkAttrOptions;

/// Renders markdown to HTML with GitHub Flavored Markdown extensions.
///
/// Parses markdown with comrak, converts the syntax tree into an element
/// tree, rewrites link attributes on the finished tree and serializes it.
/// Fenced code blocks with a known language are highlighted with syntect
/// using CSS classes.
pub struct MarkdownRenderer<'a> {
    options: Options<'a>,
    syntax_set: SyntaxSet,
    modifier: LinkAttrModifier,
}

impl<'a> MarkdownRenderer<'a> {
    /// Creates renderer with GitHub Flavored Markdown options.
    ///
    /// Configures GFM extensions and rendering settings:
    /// - Tables, strikethrough, autolinks, task lists, footnotes,
    ///   description lists
    /// - Smart punctuation for quotes and dashes
    /// - Raw HTML passes through unchanged
    ///
    /// Links are left untouched. Use [`MarkdownRenderer::with_link_options`]
    /// to rewrite them.
    pub fn new() -> Self {
        let mut options = Options::default();

        // Extension options (GFM features)
        options.extension.strikethrough = true;
        options.extension.table = true;
        options.extension.autolink = true;
        options.extension.tasklist = true;
        options.extension.footnotes = true;
        options.extension.description_lists = true;

        // Parse options (smart punctuation)
        options.parse.smart = true;

        // Raw HTML is kept as opaque nodes in the element tree
        options.render.unsafe_ = true;

        Self {
            options,
            syntax_set: SyntaxSet::load_defaults_newlines(),
            modifier: LinkAttrModifier::default(),
        }
    }

    /// Creates renderer that rewrites link attributes with given options.
    ///
    /// # Arguments
    ///
    /// * `link_options`: Validated link attribute options
    pub fn with_link_options(link_options: LinkAttrOptions) -> Self {
        let mut renderer = Self::new();
        renderer.modifier = LinkAttrModifier::new(link_options);
        renderer
    }

    /// Returns link options applied by this renderer.
    pub fn link_options(&self) -> &LinkAttrOptions {
        self.modifier.options()
    }

    /// Renders markdown content to HTML string.
    ///
    /// # Arguments
    ///
    /// * `content`: Markdown content to render
    ///
    /// # Returns
    ///
    /// Rendered HTML fragment
    ///
    /// # Errors
    ///
    /// Returns error if syntax highlighting fails
    pub fn render(&self, content: &str) -> Result<String> {
        let tree = self.render_tree(content)?;
        Ok(render_nodes(tree.children()).into_string())
    }

    /// Renders markdown content to an element tree with rewritten links.
    ///
    /// The returned element is a `body` element holding the document's
    /// top level blocks.
    ///
    /// # Errors
    ///
    /// Returns error if syntax highlighting fails
    pub fn render_tree(&self, content: &str) -> Result<Element> {
        let arena = Arena::new();
        let root = comrak::parse_document(&arena, content, &self.options);

        let mut body = Element::new("body");
        let mut builder = TreeBuilder::new(&self.syntax_set);
        builder
            .append_children(root, &mut body)
            .context("Failed to build element tree")?;
        builder.finish(&mut body);

        if self.link_options().is_noop() {
            debug!("Rendered markdown document without link rewriting");
            return Ok(body);
        }

        // Links are final only once the whole tree exists
        let links = self.modifier.rewrite(&mut body);
        debug!(links, "Rendered markdown document");

        Ok(body)
    }

    /// Renders markdown file at given path.
    ///
    /// # Arguments
    ///
    /// * `path`: Path to markdown file
    ///
    /// # Returns
    ///
    /// Rendered HTML string
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or rendering fails
    pub fn render_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read markdown file: {}", path.display()))?;
        self.render(&content)
    }
}

impl<'a> Default for MarkdownRenderer<'a> {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts comrak syntax tree nodes into elements.
struct TreeBuilder<'s> {
    syntax_set: &'s SyntaxSet,
    /// Footnote names in order of first reference.
    footnote_refs: Vec<String>,
    /// Footnote list items, emitted after the document body.
    footnotes: Vec<Element>,
}

impl<'s> TreeBuilder<'s> {
    fn new(syntax_set: &'s SyntaxSet) -> Self {
        Self {
            syntax_set,
            footnote_refs: Vec::new(),
            footnotes: Vec::new(),
        }
    }

    /// Appends the footnotes section, if any footnote was defined.
    fn finish(self, body: &mut Element) {
        if self.footnotes.is_empty() {
            return;
        }

        let mut list = Element::new("ol");
        for item in self.footnotes {
            list.push(item);
        }
        body.push(
            Element::new("section")
                .with_attr("class", "footnotes")
                .with_attr("data-footnotes", "")
                .with_child(list),
        );
    }

    fn append_children<'a>(&mut self, node: &'a AstNode<'a>, parent: &mut Element) -> Result<()> {
        for child in node.children() {
            self.append(child, parent)?;
        }
        Ok(())
    }

    /// Appends the element for `node` to `parent`.
    ///
    /// Node kinds without an element of their own (document, description
    /// items, tight list paragraphs, extensions not handled here) hand their
    /// children to `parent` directly.
    fn append<'a>(&mut self, node: &'a AstNode<'a>, parent: &mut Element) -> Result<()> {
        let ast = node.data.borrow();

        let tag = match &ast.value {
            NodeValue::FrontMatter(_) => return Ok(()),
            NodeValue::Text(text) => {
                parent.push(Node::text(text.as_str()));
                return Ok(());
            }
            NodeValue::SoftBreak => {
                parent.push(Node::text("\n"));
                return Ok(());
            }
            NodeValue::LineBreak => {
                parent.push(Element::new("br"));
                parent.push(Node::text("\n"));
                return Ok(());
            }
            NodeValue::Code(code) => {
                parent.push(Element::new("code").with_child(Node::text(code.literal.as_str())));
                return Ok(());
            }
            NodeValue::HtmlInline(html) => {
                parent.push(Node::raw(html.as_str()));
                return Ok(());
            }
            NodeValue::HtmlBlock(block) => {
                parent.push(Node::raw(block.literal.as_str()));
                return Ok(());
            }
            NodeValue::ThematicBreak => {
                parent.push(Element::new("hr"));
                return Ok(());
            }
            NodeValue::CodeBlock(block) => {
                parent.push(self.code_block(block)?);
                return Ok(());
            }
            NodeValue::Table(table) => {
                parent.push(self.table(node, &table.alignments)?);
                return Ok(());
            }
            NodeValue::Image(image) => {
                let mut img = Element::new("img")
                    .with_attr("src", image.url.as_str())
                    .with_attr("alt", plain_text(node));
                if !image.title.is_empty() {
                    img.set_attr("title", image.title.as_str());
                }
                parent.push(img);
                return Ok(());
            }
            NodeValue::Link(link) => {
                let mut anchor = Element::new("a").with_attr("href", link.url.as_str());
                if !link.title.is_empty() {
                    anchor.set_attr("title", link.title.as_str());
                }
                self.append_children(node, &mut anchor)?;
                parent.push(anchor);
                return Ok(());
            }
            NodeValue::List(list) => {
                if matches!(list.list_type, ListType::Ordered) {
                    let mut ol = Element::new("ol");
                    if list.start != 1 {
                        ol.set_attr("start", list.start.to_string());
                    }
                    self.append_children(node, &mut ol)?;
                    parent.push(ol);
                    return Ok(());
                }
                "ul"
            }
            NodeValue::TaskItem(checked) => {
                let mut checkbox = Element::new("input")
                    .with_attr("type", "checkbox")
                    .with_attr("disabled", "");
                if checked.is_some() {
                    checkbox.set_attr("checked", "");
                }
                let mut li = Element::new("li").with_child(checkbox).with_child(Node::text(" "));
                self.append_children(node, &mut li)?;
                parent.push(li);
                return Ok(());
            }
            NodeValue::Heading(heading) => {
                let mut h = Element::new(format!("h{}", heading.level));
                self.append_children(node, &mut h)?;
                parent.push(h);
                return Ok(());
            }
            NodeValue::FootnoteReference(reference) => {
                parent.push(self.footnote_reference(&reference.name));
                return Ok(());
            }
            NodeValue::FootnoteDefinition(definition) => {
                let item = self.footnote_definition(node, &definition.name)?;
                self.footnotes.push(item);
                return Ok(());
            }
            NodeValue::Paragraph if in_tight_list(node) => {
                return self.append_children(node, parent);
            }
            NodeValue::Paragraph => "p",
            NodeValue::BlockQuote => "blockquote",
            NodeValue::Item(_) => "li",
            NodeValue::DescriptionList => "dl",
            NodeValue::DescriptionTerm => "dt",
            NodeValue::DescriptionDetails => "dd",
            NodeValue::Emph => "em",
            NodeValue::Strong => "strong",
            NodeValue::Strikethrough => "del",
            NodeValue::Superscript => "sup",
            _ => return self.append_children(node, parent),
        };

        let mut element = Element::new(tag);
        self.append_children(node, &mut element)?;
        parent.push(element);
        Ok(())
    }

    /// Builds `sup > a` pointing at the footnote, numbered by first reference.
    fn footnote_reference(&mut self, name: &str) -> Element {
        let number = match self.footnote_refs.iter().position(|known| known == name) {
            Some(index) => index + 1,
            None => {
                self.footnote_refs.push(name.to_string());
                self.footnote_refs.len()
            }
        };

        Element::new("sup").with_attr("class", "footnote-ref").with_child(
            Element::new("a")
                .with_attr("href", format!("#fn-{name}"))
                .with_attr("id", format!("fnref-{name}"))
                .with_attr("data-footnote-ref", "")
                .with_child(Node::text(number.to_string())),
        )
    }

    /// Builds the footnote list item with a link back to its reference.
    ///
    /// The back reference joins the last paragraph when the footnote ends
    /// with one.
    fn footnote_definition<'a>(&mut self, node: &'a AstNode<'a>, name: &str) -> Result<Element> {
        let mut item = Element::new("li").with_attr("id", format!("fn-{name}"));
        self.append_children(node, &mut item)?;

        let backref = Element::new("a")
            .with_attr("href", format!("#fnref-{name}"))
            .with_attr("class", "footnote-backref")
            .with_attr("data-footnote-backref", "")
            .with_child(Node::text("\u{21a9}"));

        let ends_with_paragraph =
            matches!(item.children().last(), Some(Node::Element(last)) if last.tag() == "p");
        let paragraph = if ends_with_paragraph {
            item.child_elements_mut().last()
        } else {
            None
        };
        match paragraph {
            Some(paragraph) => {
                paragraph.push(Node::text(" "));
                paragraph.push(backref);
            }
            None => item.push(backref),
        }

        Ok(item)
    }

    /// Builds a `pre`/`code` pair, highlighted when the language is known.
    fn code_block(&self, block: &NodeCodeBlock) -> Result<Element> {
        let language = block.info.split_whitespace().next().unwrap_or_default();
        let mut code = Element::new("code");

        if language.is_empty() {
            code.push(Node::text(block.literal.as_str()));
        } else {
            code.set_attr("class", format!("language-{language}"));
            match self
                .highlight_code(&block.literal, language)
                .context("Failed to highlight code block")?
            {
                Some(highlighted) => code.push(Node::raw(highlighted)),
                None => code.push(Node::text(block.literal.as_str())),
            }
        }

        Ok(Element::new("pre").with_child(code))
    }

    /// Highlights code with syntect using CSS classes.
    ///
    /// Uses ClassedHTMLGenerator with the "hljs-" class prefix to match
    /// highlight.js CSS conventions.
    ///
    /// # Returns
    ///
    /// Highlighted HTML, or `None` for empty code and unknown languages
    ///
    /// # Errors
    ///
    /// Returns error if syntax highlighting fails
    fn highlight_code(&self, code: &str, language: &str) -> Result<Option<String>> {
        if code.is_empty() {
            return Ok(None);
        }

        let syntax = self
            .syntax_set
            .find_syntax_by_token(language)
            .or_else(|| self.syntax_set.find_syntax_by_extension(language));

        let Some(syntax) = syntax else {
            return Ok(None);
        };

        let mut generator = ClassedHTMLGenerator::new_with_class_style(
            syntax,
            self.syntax_set,
            ClassStyle::SpacedPrefixed { prefix: "hljs-" },
        );

        for line in LinesWithEndings::from(code) {
            generator
                .parse_html_for_line_which_includes_newline(line)
                .context("Failed to parse line for syntax highlighting")?;
        }

        Ok(Some(generator.finalize()))
    }

    /// Builds a table with the header row in `thead` and the rest in `tbody`.
    ///
    /// Aligned columns carry an `align` attribute on every cell.
    fn table<'a>(
        &mut self,
        node: &'a AstNode<'a>,
        alignments: &[TableAlignment],
    ) -> Result<Element> {
        let mut table = Element::new("table");
        let mut body = Element::new("tbody");

        for row in node.children() {
            let header = matches!(row.data.borrow().value, NodeValue::TableRow(true));
            let mut tr = Element::new("tr");
            for (column, cell) in row.children().enumerate() {
                let mut cell_element = Element::new(if header { "th" } else { "td" });
                match alignments.get(column) {
                    Some(TableAlignment::Left) => cell_element.set_attr("align", "left"),
                    Some(TableAlignment::Center) => cell_element.set_attr("align", "center"),
                    Some(TableAlignment::Right) => cell_element.set_attr("align", "right"),
                    Some(TableAlignment::None) | None => {}
                }
                self.append_children(cell, &mut cell_element)?;
                tr.push(cell_element);
            }

            if header {
                table.push(Element::new("thead").with_child(tr));
            } else {
                body.push(tr);
            }
        }

        if !body.children().is_empty() {
            table.push(body);
        }

        Ok(table)
    }
}

/// Returns whether a paragraph sits directly in an item of a tight list.
fn in_tight_list<'a>(node: &'a AstNode<'a>) -> bool {
    node.parent()
        .and_then(|item| item.parent())
        .is_some_and(|list| matches!(&list.data.borrow().value, NodeValue::List(l) if l.tight))
}

/// Collects the plain text of a node, used for image alt text.
fn plain_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for descendant in node.descendants() {
        match &descendant.data.borrow().value {
            NodeValue::Text(value) => text.push_str(value),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            _ => {}
        }
    }
    text
}
