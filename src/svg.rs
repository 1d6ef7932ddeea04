use std::fmt::Write;

use crate::layout::{Primitive, is_visible};

/// XML 1.0 valid char ranges:
/// - 0x09, 0x0A, 0x0D
/// - 0x20..=0xD7FF
/// - 0xE000..=0xFFFD
/// - 0x10000..=0x10FFFF
fn is_valid_xml_char(c: char) -> bool {
    matches!(
        c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF
    )
}

pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if !is_valid_xml_char(c) {
            continue;
        }
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Accumulates SVG markup for one card.
pub struct SvgWriter {
    width: f32,
    height: f32,
    defs: String,
    body: String,
}

impl SvgWriter {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            defs: String::new(),
            body: String::new(),
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Raw markup for the `<defs>` section (gradients, filters, patterns).
    pub fn def(&mut self, markup: &str) {
        self.defs.push_str(markup);
    }

    /// Raw markup appended to the body.
    pub fn raw(&mut self, markup: &str) {
        self.body.push_str(markup);
    }

    /// Draw primitives shifted by `(dx, dy)`.
    pub fn primitives(&mut self, dx: f32, dy: f32, primitives: &[Primitive]) {
        if primitives.is_empty() {
            return;
        }
        let _ = write!(
            self.body,
            r#"<g transform="translate({:.2},{:.2})">"#,
            dx, dy
        );
        for primitive in primitives {
            self.primitive(primitive);
        }
        self.body.push_str("</g>");
    }

    pub fn primitive(&mut self, primitive: &Primitive) {
        match primitive {
            Primitive::Rect {
                x,
                y,
                width,
                height,
                radius,
                fill,
                stroke,
            } => {
                let fill = if is_visible(fill) { escape_xml(fill) } else { "none".to_string() };
                let stroke_attr = stroke
                    .as_ref()
                    .filter(|s| is_visible(s))
                    .map(|s| format!(r#" stroke="{}" stroke-width="1""#, escape_xml(s)))
                    .unwrap_or_default();
                let _ = write!(
                    self.body,
                    r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" fill="{}"{} />"#,
                    x, y, width, height, radius, fill, stroke_attr,
                );
            }
            Primitive::Text {
                x,
                y,
                text,
                font,
                fill,
            } => {
                let weight_attr = if font.bold { " font-weight=\"700\"" } else { "" };
                let style_attr = if font.italic { " font-style=\"italic\"" } else { "" };
                let _ = write!(
                    self.body,
                    r#"<text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.2}" fill="{}" xml:space="preserve"{}{}>{}</text>"#,
                    x,
                    y,
                    font.family.css_name(),
                    font.size,
                    escape_xml(fill),
                    weight_attr,
                    style_attr,
                    escape_xml(text),
                );
            }
            Primitive::Line {
                x1,
                y1,
                x2,
                y2,
                stroke,
                width,
                dashed,
            } => {
                let dash_attr = if *dashed { r#" stroke-dasharray="4 3""# } else { "" };
                let _ = write!(
                    self.body,
                    r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="{:.2}"{} />"#,
                    x1,
                    y1,
                    x2,
                    y2,
                    escape_xml(stroke),
                    width,
                    dash_attr,
                );
            }
            Primitive::Circle { cx, cy, r, fill } => {
                let _ = write!(
                    self.body,
                    r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}" />"#,
                    cx,
                    cy,
                    r,
                    escape_xml(fill),
                );
            }
        }
    }

    pub fn finish(self) -> String {
        let defs = if self.defs.is_empty() {
            String::new()
        } else {
            format!("<defs>{}</defs>", self.defs)
        };
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}" width="{w}" height="{h}">{}{}</svg>"#,
            defs,
            self.body,
            w = self.width,
            h = self.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::{Font, FontFamily};

    #[test]
    fn remove_invalid_control_chars() {
        assert_eq!(escape_xml("A\u{0007}B\u{000C}C"), "ABC");
        assert_eq!(escape_xml("a\tb\nc"), "a\tb\nc");
    }

    #[test]
    fn escape_special_xml_chars() {
        assert_eq!(
            escape_xml(r#"<tag attr="x&y">'z'"#),
            "&lt;tag attr=&quot;x&amp;y&quot;&gt;&apos;z&apos;"
        );
    }

    #[test]
    fn text_carries_font_attributes() {
        let mut svg = SvgWriter::new(100.0, 50.0);
        svg.primitives(
            5.0,
            10.0,
            &[Primitive::Text {
                x: 0.0,
                y: 12.0,
                text: "a < b".to_string(),
                font: Font::new(FontFamily::Mono, 12.0).bold(),
                fill: "#000".to_string(),
            }],
        );
        let out = svg.finish();
        assert!(out.starts_with("<svg"));
        assert!(out.contains(r#"translate(5.00,10.00)"#));
        assert!(out.contains(r#"font-family="monospace""#));
        assert!(out.contains(r#"font-weight="700""#));
        assert!(out.contains("a &lt; b"));
        assert!(!out.contains("<defs>"));
    }

    #[test]
    fn paint_values_are_escaped() {
        let mut svg = SvgWriter::new(10.0, 10.0);
        svg.primitive(&Primitive::Circle {
            cx: 1.0,
            cy: 1.0,
            r: 1.0,
            fill: r#"#000" x="y"#.to_string(),
        });
        svg.primitive(&Primitive::Line {
            x1: 0.0,
            y1: 0.0,
            x2: 1.0,
            y2: 1.0,
            stroke: "<red>".to_string(),
            width: 1.0,
            dashed: false,
        });
        let out = svg.finish();
        assert!(out.contains(r##"fill="#000&quot; x=&quot;y""##));
        assert!(out.contains(r#"stroke="&lt;red&gt;""#));
    }

    #[test]
    fn invisible_fill_becomes_none() {
        let mut svg = SvgWriter::new(10.0, 10.0);
        svg.primitive(&Primitive::Rect {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
            radius: 0.0,
            fill: "transparent".to_string(),
            stroke: Some("#ccc".to_string()),
        });
        let out = svg.finish();
        assert!(out.contains(r#"fill="none""#));
        assert!(out.contains(r##"stroke="#ccc""##));
    }
}
