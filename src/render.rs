//! Block renderer: turns a parsed block into a theme-resolved presentation
//! node. Nothing here measures or lays out; see `layout` for geometry.

use crate::block::{Block, BlockKind, ordered_marker_len, unordered_marker_len};
use crate::fonts::{Font, FontFamily};
use crate::inline::{RunKind, format_inline};
use crate::theme::Theme;

const HEADING_LINE_HEIGHT: f32 = 1.25;
const PARAGRAPH_MARGIN: f32 = 6.0;
const CODE_MARGIN: f32 = 8.0;
const CODE_PADDING: f32 = 10.0;
const TABLE_MARGIN: f32 = 12.0;
const TABLE_CELL_PADDING_X: f32 = 12.0;
const TABLE_CELL_PADDING_Y: f32 = 6.0;
const TABLE_RADIUS: f32 = 8.0;
const RULE_MARGIN: f32 = 16.0;
const QUOTE_MARGIN: f32 = 8.0;
const QUOTE_INSET: f32 = 12.0;
const QUOTE_PADDING_Y: f32 = 4.0;
const LIST_MARGIN: f32 = 8.0;
const LIST_ITEM_GAP: f32 = 2.0;
const LIST_MARKER_GAP: f32 = 8.0;
const BULLET_SIZE: f32 = 4.0;
const BULLET_OFFSET: f32 = 6.0;

/// A run of text in one font and colour. `highlight` paints a pill behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub font: Font,
    pub color: String,
    pub highlight: Option<String>,
}

/// One wrapped paragraph of spans.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub spans: Vec<Span>,
    pub line_height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    Number { label: Span, min_width: f32 },
    Bullet { color: String, size: f32, offset: f32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub marker: Marker,
    pub body: TextLine,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableNode {
    pub header: Vec<TextLine>,
    pub rows: Vec<Vec<TextLine>>,
    pub cell_padding_x: f32,
    pub cell_padding_y: f32,
    pub header_background: String,
    pub row_backgrounds: [String; 2],
    pub border: String,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Paragraphs and headings: each line is its own paragraph.
    Text(Vec<TextLine>),
    Code {
        lines: Vec<String>,
        font: Font,
        line_height: f32,
        padding: f32,
        color: String,
        background: String,
        accent: String,
    },
    Table(TableNode),
    Rule {
        color: String,
    },
    Quote {
        lines: Vec<TextLine>,
        border: String,
        background: String,
        inset: f32,
        padding_y: f32,
    },
    List {
        items: Vec<ListItem>,
        gap: f32,
        marker_gap: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub margin_top: f32,
    pub margin_bottom: f32,
    pub kind: NodeKind,
}

impl Node {
    fn new(margin: (f32, f32), kind: NodeKind) -> Self {
        Self {
            margin_top: margin.0,
            margin_bottom: margin.1,
            kind,
        }
    }
}

/// Header row and body rows of a table block, cell text trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCells {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Splits a table block. The second line is always treated as the
/// alignment row and dropped without being checked. Returns `None` when
/// there are fewer than two lines.
pub fn table_cells(lines: &[String]) -> Option<TableCells> {
    if lines.len() < 2 {
        return None;
    }
    Some(TableCells {
        header: split_row(&lines[0]),
        rows: lines[2..].iter().map(|l| split_row(l)).collect(),
    })
}

fn split_row(row: &str) -> Vec<String> {
    let row = row.trim();
    let row = row.strip_prefix('|').unwrap_or(row);
    let row = row.strip_suffix('|').unwrap_or(row);
    row.split('|').map(|cell| cell.trim().to_string()).collect()
}

/// Heading level (count of leading `#`) and the text after the marker.
pub fn heading_parts(line: &str) -> (usize, &str) {
    let line = line.trim_start();
    let level = line.chars().take_while(|c| *c == '#').count();
    let rest = &line[level..];
    match rest.chars().next() {
        Some(c) if c.is_whitespace() => (level, &rest[c.len_utf8()..]),
        _ => (level, line),
    }
}

/// Strips a leading `>` and at most one whitespace char after it.
pub fn strip_quote_marker(line: &str) -> &str {
    let line = line.trim_start();
    match line.strip_prefix('>') {
        Some(rest) => match rest.chars().next() {
            Some(c) if c.is_whitespace() => &rest[c.len_utf8()..],
            _ => rest,
        },
        None => line,
    }
}

/// Render a block under `theme`. `None` means the block draws nothing.
pub fn render(block: &Block, theme: &Theme) -> Option<Node> {
    let node = match block.kind {
        BlockKind::Code => Node::new(
            (CODE_MARGIN, CODE_MARGIN),
            NodeKind::Code {
                lines: block.content.clone(),
                font: Font::new(FontFamily::Mono, theme.font_size_small),
                line_height: theme.code_line_height,
                padding: CODE_PADDING,
                color: theme.code_text_color.clone(),
                background: theme.code_bg_color.clone(),
                accent: theme.accent_color.clone(),
            },
        ),
        BlockKind::Table => return render_table(block, theme),
        BlockKind::Separator => Node::new(
            (RULE_MARGIN, RULE_MARGIN),
            NodeKind::Rule {
                color: theme.line_color.clone(),
            },
        ),
        BlockKind::Header => render_heading(block, theme),
        BlockKind::Quote => {
            let base = Font::new(theme.font_body, theme.font_size_base).italic();
            let lines = block
                .content
                .iter()
                .map(|line| {
                    styled_line(
                        strip_quote_marker(line),
                        base,
                        &theme.quote_text_color,
                        theme,
                    )
                })
                .collect();
            Node::new(
                (QUOTE_MARGIN, QUOTE_MARGIN),
                NodeKind::Quote {
                    lines,
                    border: theme.quote_border_color.clone(),
                    background: theme.quote_bg_color.clone(),
                    inset: QUOTE_INSET,
                    padding_y: QUOTE_PADDING_Y,
                },
            )
        }
        BlockKind::List => {
            let items = block
                .content
                .iter()
                .map(|line| list_item(line, theme))
                .collect();
            Node::new(
                (LIST_MARGIN, LIST_MARGIN),
                NodeKind::List {
                    items,
                    gap: LIST_ITEM_GAP,
                    marker_gap: LIST_MARKER_GAP,
                },
            )
        }
        BlockKind::Paragraph => {
            let base = Font::new(theme.font_body, theme.font_size_base);
            let lines = block
                .content
                .iter()
                .map(|line| styled_line(line, base, &theme.text_color, theme))
                .collect();
            Node::new((PARAGRAPH_MARGIN, PARAGRAPH_MARGIN), NodeKind::Text(lines))
        }
    };
    Some(node)
}

fn render_heading(block: &Block, theme: &Theme) -> Node {
    let line = block.content.first().map(String::as_str).unwrap_or("");
    let (level, text) = heading_parts(line);
    let (size, margin) = match level {
        1 => (theme.font_size_base + 6.0, (12.0, 8.0)),
        2 => (theme.font_size_base + 4.0, (12.0, 8.0)),
        3 => (theme.font_size_base + 2.0, (8.0, 4.0)),
        _ => (theme.font_size_base + 2.0, (0.0, 0.0)),
    };
    let font = Font::new(theme.font_body, size).bold();
    // Heading text is drawn raw, without inline emphasis.
    let span = Span {
        text: text.to_string(),
        font,
        color: theme.heading_color.clone(),
        highlight: None,
    };
    Node::new(
        margin,
        NodeKind::Text(vec![TextLine {
            spans: vec![span],
            line_height: size * HEADING_LINE_HEIGHT,
        }]),
    )
}

fn render_table(block: &Block, theme: &Theme) -> Option<Node> {
    let cells = table_cells(&block.content)?;
    let base = Font::new(theme.font_body, theme.font_size_small);
    let header_font = base.bold();
    let cell_line = |text: &str, font: Font, color: &str| TextLine {
        line_height: font.size * 4.0 / 3.0,
        ..styled_line(text, font, color, theme)
    };

    let header = cells
        .header
        .iter()
        .map(|c| cell_line(c, header_font, &theme.heading_color))
        .collect();
    let rows = cells
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|c| cell_line(c, base, &theme.text_color))
                .collect()
        })
        .collect();

    Some(Node::new(
        (TABLE_MARGIN, TABLE_MARGIN),
        NodeKind::Table(TableNode {
            header,
            rows,
            cell_padding_x: TABLE_CELL_PADDING_X,
            cell_padding_y: TABLE_CELL_PADDING_Y,
            header_background: theme.table_header_bg_color.clone(),
            row_backgrounds: [
                theme.table_row_even_color.clone(),
                theme.table_row_odd_color.clone(),
            ],
            border: theme.table_border_color.clone(),
            radius: TABLE_RADIUS,
        }),
    ))
}

fn list_item(line: &str, theme: &Theme) -> ListItem {
    let base = Font::new(theme.font_body, theme.font_size_base);
    let trimmed = line.trim_start();

    if let Some(len) = ordered_marker_len(trimmed) {
        let numeral = &trimmed[..trimmed.find('.').unwrap_or(0)];
        return ListItem {
            marker: Marker::Number {
                label: Span {
                    text: format!("{}.", numeral),
                    font: base.bold(),
                    color: theme.accent_color.clone(),
                    highlight: None,
                },
                min_width: base.size * 1.2,
            },
            body: styled_line(&trimmed[len..], base, &theme.text_color, theme),
        };
    }

    let body = unordered_marker_len(trimmed).map_or(trimmed, |len| &trimmed[len..]);
    ListItem {
        marker: Marker::Bullet {
            color: theme.bullet_color.clone(),
            size: BULLET_SIZE,
            offset: BULLET_OFFSET,
        },
        body: styled_line(body, base, &theme.text_color, theme),
    }
}

/// Applies inline emphasis to one line of text.
fn styled_line(text: &str, base: Font, color: &str, theme: &Theme) -> TextLine {
    let spans = format_inline(text)
        .into_iter()
        .map(|run| match run.kind {
            RunKind::Plain => Span {
                text: run.text,
                font: base,
                color: color.to_string(),
                highlight: None,
            },
            RunKind::Bold => Span {
                text: run.text,
                font: base.bold(),
                color: theme.bold_color.clone(),
                highlight: None,
            },
            RunKind::Code => Span {
                text: run.text,
                font: Font::new(FontFamily::Mono, theme.font_size_small),
                color: theme.accent_color.clone(),
                highlight: Some(theme.inline_code_bg_color.clone()),
            },
        })
        .collect();
    TextLine {
        spans,
        line_height: base.size * theme.line_height,
    }
}
