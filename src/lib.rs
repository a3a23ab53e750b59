//! Link attribute rewriting for Markdown rendered to HTML.

mod config;
pub mod dom;
mod error;
mod markdown;
mod options;

pub use config::Config;
pub use error::ConfigError;
pub use markdown::{LinkAttrModifier, LinkClass, LinkNode, MarkdownRenderer, merge_rel_token};
pub use options::{LinkAttrOptions, Policy, Toggle};
