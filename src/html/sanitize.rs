//! Allow-list HTML sanitizer
//!
//! Editor content is arbitrary HTML and must never reach a rendering
//! context unfiltered. Disallowed tags are stripped, not escaped-and-kept;
//! script-like tags lose their content entirely.

use lol_html::{doc_comments, element, rewrite_str, RewriteStrSettings};

/// Tags allowed through the sanitizer.
const ALLOWED_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "br", "strong", "em", "b", "i", "u", "s", "strike",
    "ul", "ol", "li", "blockquote", "code", "pre", "a", "hr", "img", "table", "thead", "tbody",
    "tfoot", "tr", "th", "td", "caption", "col", "colgroup",
];

/// Tags whose content is discarded along with the tag itself.
const DROP_CONTENT_TAGS: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "noscript", "textarea", "title",
];

/// Per-tag attribute allow-list; tags not listed here keep no attributes.
fn allowed_attributes(tag: &str) -> &'static [&'static str] {
    match tag {
        "img" => &["src", "alt", "width", "height"],
        "a" => &["href", "target", "rel"],
        "table" => &["border", "cellpadding", "cellspacing", "width"],
        "td" | "th" => &["colspan", "rowspan", "align", "valign"],
        "col" | "colgroup" => &["span", "width"],
        _ => &[],
    }
}

/// Sanitize user-authored HTML down to the allow-list.
///
/// Pure and infallible: empty input yields an empty string, and any rewrite
/// failure degrades to empty output rather than surfacing an error.
/// Idempotent: sanitized output passes through unchanged.
pub fn sanitize_html(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    rewrite_str(
        input,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                let tag = el.tag_name().to_lowercase();

                if DROP_CONTENT_TAGS.contains(&tag.as_str()) {
                    el.remove();
                    return Ok(());
                }

                if !ALLOWED_TAGS.contains(&tag.as_str()) {
                    el.remove_and_keep_content();
                    return Ok(());
                }

                let keep = allowed_attributes(&tag);
                let names: Vec<String> =
                    el.attributes().iter().map(|attr| attr.name()).collect();
                for name in names {
                    if !keep.contains(&name.as_str()) {
                        el.remove_attribute(&name);
                    }
                }

                // javascript: URLs are never allowed through.
                for url_attr in ["href", "src"] {
                    if let Some(value) = el.get_attribute(url_attr) {
                        if value.trim().to_lowercase().starts_with("javascript:") {
                            el.remove_attribute(url_attr);
                        }
                    }
                }

                Ok(())
            })],
            document_content_handlers: vec![doc_comments!(|c| {
                c.remove();
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_removed_paragraph_kept() {
        assert_eq!(sanitize_html("<script>a()</script><p>hi</p>"), "<p>hi</p>");
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert_eq!(sanitize_html(""), "");
    }

    #[test]
    fn test_unknown_tag_stripped_keeping_content() {
        assert_eq!(sanitize_html("<div><p>text</p></div>"), "<p>text</p>");
        assert_eq!(sanitize_html("<span>inline</span>"), "inline");
    }

    #[test]
    fn test_disallowed_attributes_stripped() {
        let out = sanitize_html(r#"<p onclick="alert(1)" class="x">hi</p>"#);
        assert_eq!(out, "<p>hi</p>");

        let out = sanitize_html(r#"<img src="a.png" alt="a" onerror="x()">"#);
        assert!(out.contains(r#"src="a.png""#));
        assert!(out.contains(r#"alt="a""#));
        assert!(!out.contains("onerror"));
    }

    #[test]
    fn test_javascript_urls_removed() {
        let out = sanitize_html(r#"<a href="javascript:alert(1)">x</a>"#);
        assert!(!out.contains("javascript:"));
        let out = sanitize_html(r#"<a href="https://example.com">x</a>"#);
        assert!(out.contains("https://example.com"));
    }

    #[test]
    fn test_table_markup_survives_with_structural_attributes() {
        let input = r#"<table border="1"><thead><tr><th colspan="2">h</th></tr></thead><tbody><tr><td align="left">a</td><td>b</td></tr></tbody></table>"#;
        let out = sanitize_html(input);
        assert!(out.contains(r#"<table border="1">"#));
        assert!(out.contains(r#"<th colspan="2">"#));
        assert!(out.contains(r#"<td align="left">"#));
    }

    #[test]
    fn test_style_content_discarded() {
        assert_eq!(sanitize_html("<style>p{color:red}</style><p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn test_comments_removed() {
        assert_eq!(sanitize_html("<!-- note --><p>x</p>"), "<p>x</p>");
    }

    #[test]
    fn test_idempotence() {
        let inputs = [
            "<script>a()</script><p>hi</p>",
            r#"<div><a href="javascript:x">link</a><table><tr><td>c</td></tr></table></div>"#,
            "plain text",
            "<h1>Title</h1><ul><li>one</li></ul>",
        ];
        for input in inputs {
            let once = sanitize_html(input);
            assert_eq!(sanitize_html(&once), once, "not idempotent for {:?}", input);
        }
    }
}
