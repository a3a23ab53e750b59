//! Markdown rendering with link attribute rewriting.
//!
//! This module renders markdown with comrak and GFM extensions into an
//! element tree, then rewrites `target`, `rel`, `referrerpolicy`, `title`
//! and custom attributes of its links before serializing it.

mod links;
mod renderer;

pub use links::{LinkAttrModifier, LinkClass, LinkNode, merge_rel_token};
pub use renderer::MarkdownRenderer;
