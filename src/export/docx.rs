//! DOCX rendering
//!
//! Walks the sanitized document HTML and rebuilds it as OOXML paragraphs,
//! lists and tables. Table rows are pinned so they never split across a
//! page boundary, and every page carries a centered page-number footer.

use std::io::Cursor;

use docx_rs::{
    AbstractNumbering, AlignmentType, BreakType, Docx, Footer, IndentLevel, Level, LevelJc,
    LevelText, NumberFormat, Numbering, NumberingId, PageNum, Paragraph, Run, RunFonts, Start,
    Table, TableCell, TableRow,
};
use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node};

use crate::export::pdf::ExportError;

const BULLET_NUMBERING: usize = 1;
const DECIMAL_NUMBERING: usize = 2;

/// Half-point font size per heading level.
fn heading_size(level: u8) -> usize {
    match level {
        1 => 42,
        2 => 33,
        3 => 27,
        _ => 24,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RunStyle {
    bold: bool,
    italic: bool,
    underline: bool,
    strike: bool,
    code: bool,
}

/// Inline content flattened to styled text pieces and explicit breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String, RunStyle),
    Break,
}

enum Block {
    Para(Paragraph),
    Table(Table),
}

/// Render a complete DOCX document from sanitized content HTML.
pub fn render_docx(title: &str, description: &str, html: &str) -> Result<Vec<u8>, ExportError> {
    let mut docx = Docx::new()
        .add_abstract_numbering(AbstractNumbering::new(BULLET_NUMBERING).add_level(Level::new(
            0,
            Start::new(1),
            NumberFormat::new("bullet"),
            LevelText::new("•"),
            LevelJc::new("left"),
        )))
        .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING))
        .add_abstract_numbering(AbstractNumbering::new(DECIMAL_NUMBERING).add_level(Level::new(
            0,
            Start::new(1),
            NumberFormat::new("decimal"),
            LevelText::new("%1."),
            LevelJc::new("left"),
        )))
        .add_numbering(Numbering::new(DECIMAL_NUMBERING, DECIMAL_NUMBERING))
        .footer(
            Footer::new().add_paragraph(
                Paragraph::new()
                    .add_page_num(PageNum::new())
                    .align(AlignmentType::Center),
            ),
        );

    docx = docx.add_paragraph(
        Paragraph::new().add_run(Run::new().add_text(title).bold().size(heading_size(1))),
    );
    if !description.is_empty() {
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(description).italic()));
    }

    for block in blocks_from_html(html) {
        docx = match block {
            Block::Para(p) => docx.add_paragraph(p),
            Block::Table(t) => docx.add_table(t),
        };
    }

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| ExportError::Conversion(e.to_string()))?;
    Ok(cursor.into_inner())
}

fn blocks_from_html(html: &str) -> Vec<Block> {
    let fragment = Html::parse_fragment(html);
    let mut blocks = Vec::new();
    for child in fragment.root_element().children() {
        push_node(child, &mut blocks);
    }
    blocks
}

fn push_node(node: NodeRef<'_, Node>, blocks: &mut Vec<Block>) {
    match node.value() {
        Node::Text(text) => {
            // Bare text outside any block becomes its own paragraph.
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                blocks.push(Block::Para(
                    Paragraph::new().add_run(Run::new().add_text(trimmed)),
                ));
            }
        }
        Node::Element(_) => {
            if let Some(el) = ElementRef::wrap(node) {
                push_element(el, blocks);
            }
        }
        _ => {}
    }
}

fn push_element(el: ElementRef<'_>, blocks: &mut Vec<Block>) {
    let tag = el.value().name();
    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag.as_bytes()[1] - b'0';
            let mut para = Paragraph::new();
            for piece in collect_pieces(el) {
                para = add_piece(para, piece, Some(heading_size(level)), true);
            }
            blocks.push(Block::Para(para));
        }
        "p" => {
            let mut para = Paragraph::new();
            for piece in collect_pieces(el) {
                para = add_piece(para, piece, None, false);
            }
            blocks.push(Block::Para(para));
        }
        "ul" => push_list(el, BULLET_NUMBERING, 0, blocks),
        "ol" => push_list(el, DECIMAL_NUMBERING, 0, blocks),
        "blockquote" => {
            let mut para = Paragraph::new().indent(Some(720), None, None, None);
            for piece in collect_pieces(el) {
                para = add_piece(para, piece, None, false);
            }
            blocks.push(Block::Para(para));
        }
        "pre" => {
            let text: String = el.text().collect();
            let mut para = Paragraph::new();
            for (i, line) in text.trim_end().lines().enumerate() {
                if i > 0 {
                    para = para.add_run(Run::new().add_break(BreakType::TextWrapping));
                }
                para = para.add_run(
                    Run::new()
                        .add_text(line)
                        .fonts(RunFonts::new().ascii("Consolas"))
                        .size(20),
                );
            }
            blocks.push(Block::Para(para));
        }
        "table" => blocks.push(Block::Table(build_table(el))),
        "hr" => blocks.push(Block::Para(
            Paragraph::new().add_run(Run::new().add_text("")),
        )),
        "br" => blocks.push(Block::Para(Paragraph::new())),
        // Inline markup at block level is wrapped into a paragraph of its own.
        _ => {
            let mut para = Paragraph::new();
            let mut any = false;
            for piece in collect_pieces(el) {
                any = true;
                para = add_piece(para, piece, None, false);
            }
            if any {
                blocks.push(Block::Para(para));
            }
        }
    }
}

fn push_list(el: ElementRef<'_>, numbering: usize, depth: usize, blocks: &mut Vec<Block>) {
    for li in el.children().filter_map(ElementRef::wrap) {
        if li.value().name() != "li" {
            continue;
        }
        let mut para = Paragraph::new().numbering(
            NumberingId::new(numbering),
            IndentLevel::new(depth),
        );
        for piece in collect_inline_only(li) {
            para = add_piece(para, piece, None, false);
        }
        blocks.push(Block::Para(para));

        // Nested lists follow their parent item at the next indent level.
        for nested in li.children().filter_map(ElementRef::wrap) {
            match nested.value().name() {
                "ul" => push_list(nested, BULLET_NUMBERING, depth + 1, blocks),
                "ol" => push_list(nested, DECIMAL_NUMBERING, depth + 1, blocks),
                _ => {}
            }
        }
    }
}

fn build_table(el: ElementRef<'_>) -> Table {
    let mut rows = Vec::new();
    for tr in el
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "tr")
    {
        let mut cells = Vec::new();
        for cell_el in tr.children().filter_map(ElementRef::wrap) {
            let name = cell_el.value().name();
            if name != "td" && name != "th" {
                continue;
            }
            let mut para = Paragraph::new();
            for piece in collect_pieces(cell_el) {
                para = add_piece(para, piece, None, name == "th");
            }
            let mut cell = TableCell::new().add_paragraph(para);
            if let Some(span) = cell_el
                .value()
                .attr("colspan")
                .and_then(|v| v.parse::<usize>().ok())
            {
                if span > 1 {
                    cell = cell.grid_span(span);
                }
            }
            cells.push(cell);
        }
        if !cells.is_empty() {
            rows.push(TableRow::new(cells).cant_split());
        }
    }
    Table::new(rows)
}

/// Flatten an element's inline content, carrying formatting down the tree.
fn collect_pieces(el: ElementRef<'_>) -> Vec<Piece> {
    let mut out = Vec::new();
    collect_into(el, RunStyle::default(), false, &mut out);
    out
}

/// As `collect_pieces`, but skips nested list elements; used for `li` whose
/// sublists become separate numbered paragraphs.
fn collect_inline_only(el: ElementRef<'_>) -> Vec<Piece> {
    let mut out = Vec::new();
    collect_into(el, RunStyle::default(), true, &mut out);
    out
}

fn collect_into(el: ElementRef<'_>, style: RunStyle, skip_lists: bool, out: &mut Vec<Piece>) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => {
                let s = text.to_string();
                if !s.trim().is_empty() {
                    out.push(Piece::Text(s, style));
                }
            }
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                let tag = child_el.value().name();
                if skip_lists && (tag == "ul" || tag == "ol") {
                    continue;
                }
                let mut next = style;
                match tag {
                    "strong" | "b" => next.bold = true,
                    "em" | "i" => next.italic = true,
                    "u" => next.underline = true,
                    "s" | "strike" => next.strike = true,
                    "code" => next.code = true,
                    "br" => {
                        out.push(Piece::Break);
                        continue;
                    }
                    _ => {}
                }
                collect_into(child_el, next, skip_lists, out);
            }
            _ => {}
        }
    }
}

fn add_piece(para: Paragraph, piece: Piece, size: Option<usize>, bold: bool) -> Paragraph {
    match piece {
        Piece::Break => para.add_run(Run::new().add_break(BreakType::TextWrapping)),
        Piece::Text(text, style) => {
            let mut run = Run::new().add_text(text);
            if style.bold || bold {
                run = run.bold();
            }
            if style.italic {
                run = run.italic();
            }
            if style.underline {
                run = run.underline("single");
            }
            if style.strike {
                run = run.strike();
            }
            if style.code {
                run = run.fonts(RunFonts::new().ascii("Consolas"));
            }
            if let Some(sz) = size {
                run = run.size(sz);
            }
            para.add_run(run)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pieces(html: &str) -> Vec<Piece> {
        let fragment = Html::parse_fragment(html);
        collect_pieces(fragment.root_element())
    }

    #[test]
    fn test_inline_styles_carry_through_nesting() {
        let got = pieces("<p>plain <strong>bold <em>both</em></strong></p>");
        assert_eq!(
            got,
            vec![
                Piece::Text("plain ".to_string(), RunStyle::default()),
                Piece::Text(
                    "bold ".to_string(),
                    RunStyle {
                        bold: true,
                        ..Default::default()
                    }
                ),
                Piece::Text(
                    "both".to_string(),
                    RunStyle {
                        bold: true,
                        italic: true,
                        ..Default::default()
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_line_breaks_become_pieces() {
        let got = pieces("<p>a<br>b</p>");
        assert_eq!(
            got,
            vec![
                Piece::Text("a".to_string(), RunStyle::default()),
                Piece::Break,
                Piece::Text("b".to_string(), RunStyle::default()),
            ]
        );
    }

    #[test]
    fn test_list_items_skip_nested_sublists_inline() {
        let fragment = Html::parse_fragment("<li>item<ul><li>sub</li></ul></li>");
        let li = fragment
            .root_element()
            .children()
            .filter_map(ElementRef::wrap)
            .next()
            .unwrap();
        let got = {
            let mut out = Vec::new();
            collect_into(li, RunStyle::default(), true, &mut out);
            out
        };
        assert_eq!(
            got,
            vec![Piece::Text("item".to_string(), RunStyle::default())]
        );
    }

    #[test]
    fn test_block_structure_counts() {
        let blocks =
            blocks_from_html("<h2>A</h2><p>b</p><ul><li>1</li><li>2</li></ul><table><tr><td>c</td></tr></table>");
        let paras = blocks.iter().filter(|b| matches!(b, Block::Para(_))).count();
        let tables = blocks.iter().filter(|b| matches!(b, Block::Table(_))).count();
        assert_eq!(paras, 4);
        assert_eq!(tables, 1);
    }

    #[test]
    fn test_render_produces_zip_archive() {
        let bytes = render_docx(
            "Đề kiểm tra",
            "Lớp 9",
            "<h2>Phần 1</h2><p><strong>Câu 1.</strong> Tính.</p><table><tr><th colspan=\"2\">h</th></tr><tr><td>a</td><td>b</td></tr></table>",
        )
        .unwrap();
        // OOXML containers are zip archives.
        assert!(bytes.starts_with(b"PK"));
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn test_heading_sizes() {
        assert_eq!(heading_size(1), 42);
        assert_eq!(heading_size(2), 33);
        assert_eq!(heading_size(3), 27);
        assert_eq!(heading_size(6), 24);
    }
}
