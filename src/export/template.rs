//! Print document template
//!
//! Wraps sanitized document content in a fixed, self-contained HTML page
//! with print-oriented CSS. Both export formats start from this rendering,
//! so the output must be deterministic for a given input.

/// Print stylesheet shared by every exported document.
const PRINT_CSS: &str = r#"
    * { box-sizing: border-box; }
    body {
      font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
      font-size: 14px;
      line-height: 1.6;
      color: #1a1a1a;
      margin: 0;
      padding: 0;
    }
    h1 {
      font-size: 28px;
      font-weight: 700;
      margin: 0 0 8px 0;
      color: #111;
    }
    h2 { font-size: 22px; font-weight: 600; margin: 24px 0 12px 0; }
    h3 { font-size: 18px; font-weight: 600; margin: 20px 0 10px 0; }
    .subtitle {
      font-style: italic;
      color: #555;
      margin: 0 0 24px 0;
      padding-bottom: 16px;
      border-bottom: 1px solid #ddd;
    }
    p { margin: 0 0 12px 0; }
    ul, ol { margin: 0 0 12px 0; padding-left: 28px; }
    li { margin-bottom: 4px; }
    blockquote {
      margin: 12px 0;
      padding: 8px 16px;
      border-left: 3px solid #999;
      color: #444;
      background: #f7f7f7;
    }
    code {
      font-family: Consolas, Monaco, monospace;
      font-size: 13px;
      background: #f0f0f0;
      padding: 1px 4px;
      border-radius: 3px;
    }
    pre {
      background: #f5f5f5;
      padding: 12px;
      border-radius: 4px;
      overflow-x: auto;
      page-break-inside: avoid;
    }
    pre code { background: none; padding: 0; }
    table {
      border-collapse: collapse;
      width: 100%;
      margin: 12px 0;
      page-break-inside: avoid;
    }
    th, td {
      border: 1px solid #bbb;
      padding: 6px 10px;
      text-align: left;
      vertical-align: top;
    }
    th { background: #e8e8e8; font-weight: 600; }
    tr:nth-child(even) td { background: #fafafa; }
    img { max-width: 100%; height: auto; }
    hr { border: none; border-top: 1px solid #ccc; margin: 20px 0; }
    h1, h2, h3 { page-break-after: avoid; }
"#;

/// Render a complete printable HTML page.
///
/// `content` must already be sanitized; `title` and `description` are
/// treated as plain text and escaped here.
pub fn render_document_html(title: &str, description: &str, content: &str) -> String {
    let escaped_title = html_escape::encode_text(title);
    let subtitle = if description.is_empty() {
        String::new()
    } else {
        format!(
            "<p class=\"subtitle\">{}</p>\n",
            html_escape::encode_text(description)
        )
    };

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{css}</style>\n</head>\n<body>\n<h1>{title}</h1>\n{subtitle}<div class=\"content\">\n{content}\n</div>\n</body>\n</html>\n",
        title = escaped_title,
        css = PRINT_CSS,
        subtitle = subtitle,
        content = content,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_and_description_are_escaped() {
        let html = render_document_html("Bài <1> & 2", "intro <b>", "<p>x</p>");
        assert!(html.contains("Bài &lt;1&gt; &amp; 2"));
        assert!(html.contains("intro &lt;b&gt;"));
        // Content passes through untouched.
        assert!(html.contains("<p>x</p>"));
    }

    #[test]
    fn test_empty_description_omits_subtitle() {
        let html = render_document_html("T", "", "<p>x</p>");
        assert!(!html.contains("subtitle"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let a = render_document_html("T", "d", "<p>x</p>");
        let b = render_document_html("T", "d", "<p>x</p>");
        assert_eq!(a, b);
    }

    #[test]
    fn test_page_structure() {
        let html = render_document_html("Title", "Desc", "<p>body</p>");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("class=\"subtitle\""));
        assert!(html.contains("page-break-inside: avoid"));
    }
}
