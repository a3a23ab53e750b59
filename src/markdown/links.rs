//! Link attribute rewriting for rendered documents.

use crate::dom::Element;
use crate::options::LinkAttrOptions;
use tracing::{debug, trace};

/// URL prefixes never opened in a new tab or stripped of referrer.
const SKIPPED_PREFIXES: &[&str] = &["#", "javascript:", "mailto:"];

/// Obfuscated `mailto:` prefixes produced by renderers that encode
/// auto-linked email addresses.
///
/// The first form is Python-Markdown's, where each character is a decimal
/// entity whose ampersand is still replaced by the `\x02amp\x03`
/// placeholder. The second is the same encoding after placeholders have
/// been restored.
const OBFUSCATED_MAILTO_PREFIXES: &[&str] = &[
    "\u{2}amp\u{3}#109;\u{2}amp\u{3}#97;\u{2}amp\u{3}#105;\u{2}amp\u{3}#108;\u{2}amp\u{3}#116;\u{2}amp\u{3}#111;\u{2}amp\u{3}#58;",
    "&#109;&#97;&#105;&#108;&#116;&#111;&#58;",
];

const EXTERNAL_PREFIXES: &[&str] = &["http://", "https://"];

/// Access the rewriter needs to a node of a host document tree.
pub trait LinkNode {
    fn tag(&self) -> &str;

    fn attr(&self, name: &str) -> Option<&str>;

    fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    fn set_attr(&mut self, name: &str, value: &str);

    /// Concatenated text of all descendants.
    fn text_content(&self) -> String;

    fn children_mut(&mut self) -> impl Iterator<Item = &mut Self>;
}

impl LinkNode for Element {
    fn tag(&self) -> &str {
        Element::tag(self)
    }

    fn attr(&self, name: &str) -> Option<&str> {
        Element::attr(self, name)
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        Element::set_attr(self, name, value);
    }

    fn text_content(&self) -> String {
        Element::text_content(self)
    }

    fn children_mut(&mut self) -> impl Iterator<Item = &mut Self> {
        self.child_elements_mut()
    }
}

/// How a link URL is treated by the tab and referrer policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkClass {
    /// Link may receive `target` and referrer attributes.
    pub eligible: bool,
    /// Link points to an `http://` or `https://` URL.
    pub external: bool,
}

impl LinkClass {
    /// Classifies a link by its `href` value.
    ///
    /// Empty URLs, fragment links, `javascript:` and `mailto:` links
    /// (obfuscated ones included) are not eligible. Matching ignores case.
    pub fn of(href: Option<&str>) -> Self {
        let url = href.unwrap_or_default().to_lowercase();

        let eligible = !url.is_empty()
            && !SKIPPED_PREFIXES
                .iter()
                .chain(OBFUSCATED_MAILTO_PREFIXES)
                .any(|prefix| url.starts_with(prefix));
        let external = EXTERNAL_PREFIXES.iter().any(|prefix| url.starts_with(prefix));

        Self { eligible, external }
    }
}

/// Rewrites `target`, `rel`, `referrerpolicy`, `title` and custom
/// attributes of every link in a tree.
///
/// For each `a` element, in document order:
///
/// 1. New tab policy: `target="_blank"` and `noopener` added to `rel`
/// 2. No referrer policy: `noreferrer` added to `rel` and
///    `referrerpolicy="no-referrer"`
/// 3. Automatic title from the link text when `title` is absent
/// 4. Custom attributes, overwriting anything set before
///
/// Policies only touch eligible links (see [`LinkClass`]). Titles and
/// custom attributes apply to every link. Rewriting a tree twice leaves it
/// as rewriting it once does.
#[derive(Debug, Clone, Default)]
pub struct LinkAttrModifier {
    options: LinkAttrOptions,
}

impl LinkAttrModifier {
    pub fn new(options: LinkAttrOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LinkAttrOptions {
        &self.options
    }

    /// Rewrites all links below and including `root`.
    ///
    /// # Returns
    ///
    /// Number of links visited
    pub fn rewrite<N: LinkNode>(&self, root: &mut N) -> usize {
        let mut visited = 0;
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            if node.tag().eq_ignore_ascii_case("a") {
                self.rewrite_link(node);
                visited += 1;
            }

            // Reversed so children pop in document order
            let children: Vec<&mut N> = node.children_mut().collect();
            stack.extend(children.into_iter().rev());
        }

        visited
    }

    /// Applies all rewrite steps to a single link.
    pub fn rewrite_link<N: LinkNode>(&self, link: &mut N) {
        let class = LinkClass::of(link.attr("href"));

        if class.eligible && self.options.new_tab().applies(class.external) {
            link.set_attr("target", "_blank");
            merge_rel_token(link, "noopener");
        }

        if class.eligible && self.options.no_referrer().applies(class.external) {
            merge_rel_token(link, "noreferrer");
            link.set_attr("referrerpolicy", "no-referrer");
        }

        if self.options.auto_title().is_on() && !link.has_attr("title") {
            let title = link.text_content();
            link.set_attr("title", &title);
        }

        for (name, value) in self.options.custom_attrs() {
            link.set_attr(name, value);
        }

        if class.eligible {
            debug!(
                href = link.attr("href").unwrap_or_default(),
                external = class.external,
                "Rewrote link"
            );
        } else {
            trace!(
                href = link.attr("href").unwrap_or_default(),
                "Link skipped by tab and referrer policies"
            );
        }
    }
}

/// Adds `token` to the link's `rel` attribute.
///
/// Existing tokens keep their first-occurrence order, duplicates collapse
/// and the token is appended only when missing.
pub fn merge_rel_token<N: LinkNode>(link: &mut N, token: &str) {
    let rel = merged_rel(link.attr("rel").unwrap_or_default(), token);
    link.set_attr("rel", &rel);
}

fn merged_rel(current: &str, token: &str) -> String {
    let mut tokens: Vec<&str> = Vec::new();
    for existing in current.split_whitespace().chain(std::iter::once(token)) {
        if !tokens.contains(&existing) {
            tokens.push(existing);
        }
    }
    tokens.join(" ")
}
