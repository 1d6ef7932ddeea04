//! Geometry for rendered nodes.
//!
//! `layout_node` is the only place block heights come from: the measurer
//! reads `BlockLayout::height` and the card writer draws `primitives`, so
//! what is measured is exactly what gets painted.

use crate::fonts::{Font, TextMeasure};
use crate::render::{ListItem, Marker, Node, NodeKind, Span, TableNode, TextLine};

const CODE_BORDER: f32 = 2.0;
const QUOTE_BORDER: f32 = 2.0;
const CODE_RADIUS: f32 = 8.0;
const HIGHLIGHT_PAD: f32 = 3.0;
const TAB_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        fill: String,
        stroke: Option<String>,
    },
    /// `y` is the baseline.
    Text {
        x: f32,
        y: f32,
        text: String,
        font: Font,
        fill: String,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        stroke: String,
        width: f32,
        dashed: bool,
    },
    Circle {
        cx: f32,
        cy: f32,
        r: f32,
        fill: String,
    },
}

/// A node laid out at a fixed width, origin at its top-left margin edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockLayout {
    pub height: f32,
    pub primitives: Vec<Primitive>,
}

/// True for paints that draw something.
pub fn is_visible(color: &str) -> bool {
    let c = color.trim();
    !(c.is_empty() || c.eq_ignore_ascii_case("none") || c.eq_ignore_ascii_case("transparent"))
}

pub fn layout_node(node: &Node, width: f32, measure: &mut dyn TextMeasure) -> BlockLayout {
    let mut builder = Builder {
        measure,
        out: Vec::new(),
    };
    let top = node.margin_top;
    let content = match &node.kind {
        NodeKind::Text(lines) => builder.text_lines(lines, 0.0, width, top),
        NodeKind::Code {
            lines,
            font,
            line_height,
            padding,
            color,
            background,
            accent,
        } => builder.code(
            lines,
            *font,
            *line_height,
            *padding,
            (color, background, accent),
            width,
            top,
        ),
        NodeKind::Table(table) => builder.table(table, width, top),
        NodeKind::Rule { color } => {
            builder.out.push(Primitive::Line {
                x1: 0.0,
                y1: top + 0.5,
                x2: width,
                y2: top + 0.5,
                stroke: color.clone(),
                width: 1.0,
                dashed: true,
            });
            1.0
        }
        NodeKind::Quote {
            lines,
            border,
            background,
            inset,
            padding_y,
        } => builder.quote(lines, border, background, *inset, *padding_y, width, top),
        NodeKind::List {
            items,
            gap,
            marker_gap,
        } => builder.list(items, *gap, *marker_gap, width, top),
    };

    BlockLayout {
        height: node.margin_top + content + node.margin_bottom,
        primitives: builder.out,
    }
}

struct Builder<'m> {
    measure: &'m mut dyn TextMeasure,
    out: Vec<Primitive>,
}

impl Builder<'_> {
    fn width_of(&mut self, text: &str, font: &Font) -> f32 {
        self.measure.measure_text(text, font, None).0
    }

    fn text_lines(&mut self, lines: &[TextLine], left: f32, width: f32, top: f32) -> f32 {
        let mut y = top;
        for line in lines {
            y += self.flow(line, left, width, y);
        }
        y - top
    }

    /// Greedy word wrap of one paragraph. Returns the height used; a line
    /// with no visible text takes no space. Leading whitespace indents the
    /// first row only; wrapped rows start flush left.
    fn flow(&mut self, line: &TextLine, left: f32, width: f32, top: f32) -> f32 {
        let right = left + width;
        let lh = line.line_height;
        let mut x = left;
        let mut y = top;
        let mut at_line_start = true;
        let mut drew_anything = false;

        for span in &line.spans {
            for (token, is_whitespace) in split_tokens(&span.text) {
                let token_width = self.width_of(token, &span.font);

                if is_whitespace {
                    if at_line_start && y > top {
                        continue;
                    }
                    if x + token_width > right {
                        y += lh;
                        x = left;
                        at_line_start = true;
                    } else {
                        x += token_width;
                        at_line_start = false;
                    }
                    continue;
                }

                if !at_line_start && x + token_width > right {
                    y += lh;
                    x = left;
                }

                let pieces = if token_width > width {
                    self.break_word(token, &span.font, width)
                } else {
                    vec![(token.to_string(), token_width)]
                };

                let last = pieces.len().saturating_sub(1);
                for (idx, (piece, piece_width)) in pieces.into_iter().enumerate() {
                    self.draw_span_piece(span, piece, x, y, piece_width, lh);
                    if idx < last {
                        y += lh;
                        x = left;
                    } else {
                        x += piece_width;
                    }
                }
                at_line_start = false;
                drew_anything = true;
            }
        }

        if drew_anything { y + lh - top } else { 0.0 }
    }

    fn draw_span_piece(&mut self, span: &Span, text: String, x: f32, top: f32, w: f32, lh: f32) {
        if let Some(bg) = span.highlight.as_ref().filter(|c| is_visible(c)) {
            self.out.push(Primitive::Rect {
                x: x - HIGHLIGHT_PAD,
                y: top + (lh - span.font.size) / 2.0 - 2.0,
                width: w + HIGHLIGHT_PAD * 2.0,
                height: span.font.size + 4.0,
                radius: 3.0,
                fill: bg.clone(),
                stroke: None,
            });
        }
        self.out.push(Primitive::Text {
            x,
            y: baseline(top, lh, span.font.size),
            text,
            font: span.font,
            fill: span.color.clone(),
        });
    }

    /// Splits a word that cannot fit on any line, one char at a time.
    fn break_word(&mut self, word: &str, font: &Font, max_width: f32) -> Vec<(String, f32)> {
        let mut out = Vec::new();
        let mut current = String::new();
        let mut current_width = 0.0;
        for ch in word.chars() {
            let mut candidate = current.clone();
            candidate.push(ch);
            let candidate_width = self.width_of(&candidate, font);
            if candidate_width > max_width && !current.is_empty() {
                out.push((std::mem::take(&mut current), current_width));
                current.push(ch);
                current_width = self.width_of(&current, font);
            } else {
                current = candidate;
                current_width = candidate_width;
            }
        }
        out.push((current, current_width));
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn code(
        &mut self,
        lines: &[String],
        font: Font,
        line_height: f32,
        padding: f32,
        (color, background, accent): (&String, &String, &String),
        width: f32,
        top: f32,
    ) -> f32 {
        let text_left = CODE_BORDER + padding;
        let max_width = (width - text_left - padding).max(font.size);

        let mut wrapped = Vec::new();
        for line in lines {
            let expanded = line.replace('\t', &" ".repeat(TAB_WIDTH));
            self.wrap_code_line(&expanded, &font, max_width, &mut wrapped);
        }

        let height = wrapped.len() as f32 * line_height + padding * 2.0;
        if is_visible(background) {
            self.out.push(Primitive::Rect {
                x: 0.0,
                y: top,
                width,
                height,
                radius: CODE_RADIUS,
                fill: background.clone(),
                stroke: None,
            });
        }
        self.out.push(Primitive::Line {
            x1: CODE_BORDER / 2.0,
            y1: top,
            x2: CODE_BORDER / 2.0,
            y2: top + height,
            stroke: accent.clone(),
            width: CODE_BORDER,
            dashed: false,
        });

        for (idx, text) in wrapped.into_iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let line_top = top + padding + idx as f32 * line_height;
            self.out.push(Primitive::Text {
                x: text_left,
                y: baseline(line_top, line_height, font.size),
                text,
                font,
                fill: color.clone(),
            });
        }

        height
    }

    fn wrap_code_line(&mut self, line: &str, font: &Font, max_width: f32, out: &mut Vec<String>) {
        if line.is_empty() {
            out.push(String::new());
            return;
        }
        if self.width_of(line, font) <= max_width {
            out.push(line.to_string());
            return;
        }
        out.extend(
            self.break_word(line, font, max_width)
                .into_iter()
                .map(|(piece, _)| piece),
        );
    }

    fn table(&mut self, table: &TableNode, width: f32, top: f32) -> f32 {
        let columns = table
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(table.header.len()))
            .max()
            .unwrap_or(1)
            .max(1);
        let column_width = width / columns as f32;
        let inner_width = (column_width - table.cell_padding_x * 2.0).max(1.0);

        let mut y = top;
        let all_rows = std::iter::once((&table.header, &table.header_background)).chain(
            table
                .rows
                .iter()
                .enumerate()
                .map(|(i, row)| (row, &table.row_backgrounds[i % 2])),
        );
        let row_count = table.rows.len() + 1;

        for (row_index, (cells, background)) in all_rows.enumerate() {
            let mark = self.out.len();
            let mut content_height: f32 = 0.0;
            for (col, cell) in cells.iter().enumerate() {
                let x = col as f32 * column_width + table.cell_padding_x;
                let h = self.flow(cell, x, inner_width, y + table.cell_padding_y);
                content_height = content_height.max(h);
            }
            let min_line = cells.first().map_or(0.0, |c| c.line_height);
            let row_height = content_height.max(min_line) + table.cell_padding_y * 2.0;

            if is_visible(background) {
                self.out.insert(
                    mark,
                    Primitive::Rect {
                        x: 0.0,
                        y,
                        width,
                        height: row_height,
                        radius: 0.0,
                        fill: background.clone(),
                        stroke: None,
                    },
                );
            }
            y += row_height;
            if row_index + 1 < row_count {
                self.out.push(Primitive::Line {
                    x1: 0.0,
                    y1: y,
                    x2: width,
                    y2: y,
                    stroke: table.border.clone(),
                    width: 1.0,
                    dashed: false,
                });
            }
        }

        self.out.push(Primitive::Rect {
            x: 0.0,
            y: top,
            width,
            height: y - top,
            radius: table.radius,
            fill: "none".to_string(),
            stroke: Some(table.border.clone()),
        });
        y - top
    }

    #[allow(clippy::too_many_arguments)]
    fn quote(
        &mut self,
        lines: &[TextLine],
        border: &str,
        background: &str,
        inset: f32,
        padding_y: f32,
        width: f32,
        top: f32,
    ) -> f32 {
        let mark = self.out.len();
        let text_left = QUOTE_BORDER + inset;
        let body = self.text_lines(lines, text_left, width - text_left, top + padding_y);
        let height = body + padding_y * 2.0;

        let mut frame = Vec::with_capacity(2);
        if is_visible(background) {
            frame.push(Primitive::Rect {
                x: 0.0,
                y: top,
                width,
                height,
                radius: 4.0,
                fill: background.to_string(),
                stroke: None,
            });
        }
        frame.push(Primitive::Line {
            x1: QUOTE_BORDER / 2.0,
            y1: top,
            x2: QUOTE_BORDER / 2.0,
            y2: top + height,
            stroke: border.to_string(),
            width: QUOTE_BORDER,
            dashed: false,
        });
        self.out.splice(mark..mark, frame);
        height
    }

    fn list(
        &mut self,
        items: &[ListItem],
        gap: f32,
        marker_gap: f32,
        width: f32,
        top: f32,
    ) -> f32 {
        let mut y = top;
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                y += gap;
            }
            let lh = item.body.line_height;
            let marker_width = match &item.marker {
                Marker::Number { label, min_width } => {
                    let w = self.width_of(&label.text, &label.font);
                    self.out.push(Primitive::Text {
                        x: 0.0,
                        y: baseline(y, lh, label.font.size),
                        text: label.text.clone(),
                        font: label.font,
                        fill: label.color.clone(),
                    });
                    w.max(*min_width)
                }
                Marker::Bullet {
                    color,
                    size,
                    offset,
                } => {
                    self.out.push(Primitive::Circle {
                        cx: size / 2.0,
                        cy: y + offset + size / 2.0,
                        r: size / 2.0,
                        fill: color.clone(),
                    });
                    *size
                }
            };
            let body_left = marker_width + marker_gap;
            let body = self.flow(&item.body, body_left, width - body_left, y);
            y += body.max(lh);
        }
        y - top
    }
}

/// Baseline that vertically centres a glyph of `size` in a line box.
fn baseline(top: f32, line_height: f32, size: f32) -> f32 {
    top + (line_height - size) / 2.0 + size * 0.8
}

/// Splits text into alternating whitespace and non-whitespace tokens.
fn split_tokens(text: &str) -> Vec<(&str, bool)> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices();
    let Some((_, first)) = chars.next() else {
        return tokens;
    };
    let mut start = 0;
    let mut in_whitespace = first.is_whitespace();

    for (idx, ch) in chars {
        if ch.is_whitespace() != in_whitespace {
            tokens.push((&text[start..idx], in_whitespace));
            start = idx;
            in_whitespace = ch.is_whitespace();
        }
    }
    tokens.push((&text[start..], in_whitespace));
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::parse_blocks;
    use crate::fonts::FixedMeasure;
    use crate::render::render;
    use crate::theme::Theme;

    fn layout(text: &str, width: f32) -> BlockLayout {
        let block = parse_blocks(text).remove(0);
        let node = render(&block, &Theme::default()).expect("renders");
        layout_node(&node, width, &mut FixedMeasure)
    }

    fn text_rows(layout: &BlockLayout) -> Vec<f32> {
        let mut ys: Vec<f32> = layout
            .primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Text { y, .. } => Some(*y),
                _ => None,
            })
            .collect();
        ys.dedup();
        ys
    }

    #[test]
    fn tokens_alternate() {
        assert_eq!(
            split_tokens("a  bc d"),
            vec![("a", false), ("  ", true), ("bc", false), (" ", true), ("d", false)]
        );
        assert!(split_tokens("").is_empty());
    }

    #[test]
    fn short_paragraph_is_one_line() {
        let theme = Theme::default();
        let out = layout("hello world", 400.0);
        let line = theme.font_size_base * theme.line_height;
        assert_eq!(out.height, 6.0 + line + 6.0);
    }

    #[test]
    fn narrow_width_wraps_words() {
        // each char is 7px wide at 14px
        let wide = layout("aaaa bbbb cccc", 400.0);
        let narrow = layout("aaaa bbbb cccc", 50.0);
        assert_eq!(text_rows(&wide).len(), 1);
        assert_eq!(text_rows(&narrow).len(), 3);
        assert!(narrow.height > wide.height);
    }

    #[test]
    fn leading_spaces_indent_only_the_first_row() {
        let xs = |layout: &BlockLayout| -> Vec<f32> {
            layout
                .primitives
                .iter()
                .filter_map(|p| match p {
                    Primitive::Text { x, .. } => Some(*x),
                    _ => None,
                })
                .collect()
        };
        // two spaces are 14px; "aaaa" fits after them, the rest wraps
        let out = layout("  aaaa bbbb cccc", 50.0);
        assert_eq!(xs(&out), vec![14.0, 0.0, 0.0]);
        assert_eq!(text_rows(&out).len(), 3);

        let flush = layout("aaaa", 400.0);
        assert_eq!(xs(&flush), vec![0.0]);
    }

    #[test]
    fn long_words_break_by_char() {
        let out = layout("abcdefghijkl", 42.0);
        assert_eq!(text_rows(&out).len(), 2);
    }

    #[test]
    fn code_height_counts_lines_and_padding() {
        let theme = Theme::default();
        let out = layout("```\na\n\nb\n```", 400.0);
        assert_eq!(out.height, 8.0 + 3.0 * theme.code_line_height + 20.0 + 8.0);
    }

    #[test]
    fn empty_code_block_is_just_padding() {
        let out = layout("```\n```", 400.0);
        assert_eq!(out.height, 8.0 + 20.0 + 8.0);
    }

    #[test]
    fn table_rows_stack() {
        let one = layout("|A|B|\n|-|-|\n|1|2|", 400.0);
        let two = layout("|A|B|\n|-|-|\n|1|2|\n|3|4|", 400.0);
        assert!(two.height > one.height);
        let borders = two
            .primitives
            .iter()
            .filter(|p| matches!(p, Primitive::Rect { stroke: Some(_), .. }))
            .count();
        assert_eq!(borders, 1);
    }

    #[test]
    fn separator_is_thin() {
        assert_eq!(layout("---", 400.0).height, 33.0);
    }

    #[test]
    fn quote_frame_is_drawn_first() {
        let out = layout("> quoted", 400.0);
        assert!(matches!(out.primitives[0], Primitive::Line { .. }));
        assert!(matches!(out.primitives.last(), Some(Primitive::Text { .. })));
    }

    #[test]
    fn list_items_get_markers() {
        let out = layout("- a\n2. b", 400.0);
        assert!(out
            .primitives
            .iter()
            .any(|p| matches!(p, Primitive::Circle { .. })));
        assert!(out
            .primitives
            .iter()
            .any(|p| matches!(p, Primitive::Text { text, .. } if text == "2.")));
    }

    #[test]
    fn invisible_paints_are_detected() {
        assert!(!is_visible("none"));
        assert!(!is_visible(" Transparent "));
        assert!(is_visible("#fff"));
    }
}
