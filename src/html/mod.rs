//! HTML processing module
//!
//! Provides allow-list sanitization for user-authored rich-text content.
//! Uses lol_html for streaming HTML rewriting.

mod sanitize;

pub use sanitize::sanitize_html;
