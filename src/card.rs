//! Card composition: one SVG document per page.

use crate::block::Block;
use crate::canvas::CanvasSize;
use crate::fonts::{Font, FontFamily, TextMeasure};
use crate::layout::{BlockLayout, Primitive, is_visible, layout_node};
use crate::measure::content_width;
use crate::paginate::CHROME_ALLOWANCE;
use crate::render::render;
use crate::svg::{SvgWriter, escape_xml};
use crate::theme::{Decoration, Theme};

/// Auto-height cards never get shorter than this.
pub const MIN_AUTO_HEIGHT: f32 = 500.0;

const CONTAINER_RADIUS: f32 = 16.0;
const AVATAR_RADIUS: f32 = 16.0;
const FOOTER_RULE_OFFSET: f32 = 16.0;
const GLASS_ORB_RADIUS: f32 = 128.0;
const GLASS_ORBS: [&str; 3] = ["#a855f7", "#06b6d4", "#ec4899"];
const TEXTURE_TILE: f32 = 60.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CardOptions {
    pub author: String,
    pub show_author: bool,
    /// Small caps label at the right of the footer.
    pub brand: String,
}

impl Default for CardOptions {
    fn default() -> Self {
        Self {
            author: "AI Assistant".to_string(),
            show_author: true,
            brand: "SNAPCARD".to_string(),
        }
    }
}

/// Everything needed to draw one card.
pub struct CardContext<'a> {
    pub theme: &'a Theme,
    pub canvas: &'a CanvasSize,
    pub options: &'a CardOptions,
}

/// Card height: the canvas height, or in auto mode enough for the content.
pub fn card_height(canvas: &CanvasSize, theme: &Theme, content_height: f32) -> f32 {
    canvas.height.unwrap_or_else(|| {
        (theme.padding * 2.0 + content_height + CHROME_ALLOWANCE).max(MIN_AUTO_HEIGHT)
    })
}

/// Draw the blocks of one page (`page_index` is zero-based) as an SVG card.
pub fn render_card(
    ctx: &CardContext<'_>,
    blocks: &[Block],
    page_index: usize,
    page_count: usize,
    text: &mut dyn TextMeasure,
) -> String {
    let theme = ctx.theme;
    let inner_width = content_width(ctx.canvas, theme);

    let mut layouts: Vec<Option<BlockLayout>> = Vec::with_capacity(blocks.len());
    for block in blocks {
        layouts.push(render(block, theme).map(|node| layout_node(&node, inner_width, &mut *text)));
    }
    let content_height: f32 = layouts
        .iter()
        .map(|l| l.as_ref().map_or(0.0, |l| l.height) + theme.block_gap)
        .sum();

    let width = ctx.canvas.width;
    let height = card_height(ctx.canvas, theme, content_height);
    let mut svg = SvgWriter::new(width, height);

    paint_background(&mut svg, theme);
    paint_decoration(&mut svg, theme);
    paint_container(&mut svg, theme);

    let pad = theme.padding;
    let clip_height = (height - pad * 2.0 - CHROME_ALLOWANCE).max(0.0);
    svg.def(&format!(
        r#"<clipPath id="content"><rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" /></clipPath>"#,
        pad, pad, inner_width, clip_height
    ));
    svg.raw(r#"<g clip-path="url(#content)">"#);
    let mut y = pad;
    for layout in &layouts {
        if let Some(layout) = layout {
            svg.primitives(pad, y, &layout.primitives);
            y += layout.height;
        }
        y += theme.block_gap;
    }
    svg.raw("</g>");

    if ctx.options.show_author {
        paint_footer(&mut svg, ctx, page_index, page_count, text);
    }

    svg.finish()
}

fn paint_background(svg: &mut SvgWriter, theme: &Theme) {
    if let [from, via, to] = theme.background_gradient.as_slice() {
        svg.def(&format!(
            r#"<linearGradient id="background" x1="0" y1="0" x2="1" y2="1"><stop offset="0" stop-color="{}" /><stop offset="0.5" stop-color="{}" /><stop offset="1" stop-color="{}" /></linearGradient>"#,
            escape_xml(from),
            escape_xml(via),
            escape_xml(to)
        ));
        svg.raw(r#"<rect width="100%" height="100%" fill="url(#background)" />"#);
    } else {
        svg.raw(&format!(
            r#"<rect width="100%" height="100%" fill="{}" />"#,
            escape_xml(&theme.background_color)
        ));
    }
}

fn paint_decoration(svg: &mut SvgWriter, theme: &Theme) {
    let (w, h) = (svg.width(), svg.height());
    match theme.decoration {
        Decoration::None | Decoration::Gradient => {}
        Decoration::Glass => {
            svg.def(r#"<filter id="blur" x="-50%" y="-50%" width="200%" height="200%"><feGaussianBlur stdDeviation="40" /></filter>"#);
            let centers = [
                (0.0, 0.0),
                (w, 0.0),
                (80.0 + GLASS_ORB_RADIUS, h + 32.0 - GLASS_ORB_RADIUS),
            ];
            svg.raw(r#"<g filter="url(#blur)" opacity="0.2">"#);
            for ((cx, cy), color) in centers.into_iter().zip(GLASS_ORBS) {
                svg.primitive(&Primitive::Circle {
                    cx,
                    cy,
                    r: GLASS_ORB_RADIUS,
                    fill: color.to_string(),
                });
            }
            svg.raw("</g>");
        }
        Decoration::Texture => {
            svg.def(&format!(
                r##"<pattern id="texture" width="{t}" height="{t}" patternUnits="userSpaceOnUse"><path d="M6 0h2v6h6v2H8v6H6V8H0V6h6z M36 30h2v6h6v2h-6v6h-2v-6h-6v-2h6z" fill="#000000" /></pattern>"##,
                t = TEXTURE_TILE
            ));
            svg.raw(r#"<rect width="100%" height="100%" fill="url(#texture)" opacity="0.03" />"#);
        }
    }
}

fn paint_container(svg: &mut SvgWriter, theme: &Theme) {
    let inset = theme.padding / 2.0;
    let (w, h) = (svg.width(), svg.height());
    let stroke = Some(theme.container_border_color.clone()).filter(|c| is_visible(c));
    svg.primitive(&Primitive::Rect {
        x: inset,
        y: inset,
        width: w - inset * 2.0,
        height: h - inset * 2.0,
        radius: CONTAINER_RADIUS,
        fill: theme.container_color.clone(),
        stroke,
    });
}

fn paint_footer(
    svg: &mut SvgWriter,
    ctx: &CardContext<'_>,
    page_index: usize,
    page_count: usize,
    text: &mut dyn TextMeasure,
) {
    let theme = ctx.theme;
    let pad = theme.padding;
    let (w, h) = (svg.width(), svg.height());
    let top = h - pad - CHROME_ALLOWANCE;
    let rule_y = top + FOOTER_RULE_OFFSET;
    let center_y = rule_y + (CHROME_ALLOWANCE - FOOTER_RULE_OFFSET) / 2.0;

    svg.primitive(&Primitive::Line {
        x1: pad,
        y1: rule_y,
        x2: w - pad,
        y2: rule_y,
        stroke: theme.footer_line_color.clone(),
        width: 1.0,
        dashed: false,
    });
    svg.primitive(&Primitive::Circle {
        cx: pad + AVATAR_RADIUS,
        cy: center_y,
        r: AVATAR_RADIUS,
        fill: theme.avatar_color.clone(),
    });
    svg.primitive(&Primitive::Circle {
        cx: pad + AVATAR_RADIUS,
        cy: center_y,
        r: 4.0,
        fill: theme.heading_color.clone(),
    });

    let name_font = Font::new(theme.font_body, theme.font_size_base);
    svg.primitive(&Primitive::Text {
        x: pad + AVATAR_RADIUS * 2.0 + 8.0,
        y: center_y + name_font.size * 0.35,
        text: ctx.options.author.clone(),
        font: name_font,
        fill: theme.heading_color.clone(),
    });

    let meta_font = Font::new(FontFamily::Mono, theme.font_size_small);
    let mut right = w - pad;
    let mut labels = vec![ctx.options.brand.clone()];
    if page_count > 1 {
        labels.push(format!("{}/{}", page_index + 1, page_count));
    }
    svg.raw(r#"<g opacity="0.5">"#);
    for label in labels {
        let (label_width, _) = text.measure_text(&label, &meta_font, None);
        right -= label_width;
        svg.primitive(&Primitive::Text {
            x: right,
            y: center_y + meta_font.size * 0.35,
            text: label,
            font: meta_font,
            fill: theme.text_color.clone(),
        });
        right -= 8.0;
    }
    svg.raw("</g>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::parse_blocks;
    use crate::fonts::FixedMeasure;

    fn card(theme: &Theme, canvas: CanvasSize, options: CardOptions, text: &str) -> String {
        let blocks = parse_blocks(text);
        let ctx = CardContext {
            theme,
            canvas: &canvas,
            options: &options,
        };
        render_card(&ctx, &blocks, 0, 2, &mut FixedMeasure)
    }

    #[test]
    fn fixed_canvas_keeps_its_size() {
        let svg = card(
            &Theme::default(),
            CanvasSize::fixed(450.0, 450.0),
            CardOptions::default(),
            "# hi",
        );
        assert!(svg.contains(r#"viewBox="0 0 450 450""#));
        assert!(svg.contains("AI Assistant"));
        assert!(svg.contains("1/2"));
    }

    #[test]
    fn auto_canvas_has_a_minimum_height() {
        assert_eq!(
            card_height(&CanvasSize::auto(450.0), &Theme::default(), 10.0),
            MIN_AUTO_HEIGHT
        );
        assert_eq!(
            card_height(&CanvasSize::auto(450.0), &Theme::default(), 1000.0),
            48.0 + 1000.0 + CHROME_ALLOWANCE
        );
        assert_eq!(
            card_height(&CanvasSize::fixed(450.0, 300.0), &Theme::default(), 1000.0),
            300.0
        );
    }

    #[test]
    fn hidden_author_drops_the_footer() {
        let options = CardOptions {
            show_author: false,
            ..CardOptions::default()
        };
        let svg = card(&Theme::default(), CanvasSize::default(), options, "text");
        assert!(!svg.contains("AI Assistant"));
        assert!(!svg.contains("SNAPCARD"));
    }

    #[test]
    fn decorations_add_their_defs() {
        let glass = Theme::from_builtin("glass").unwrap();
        let paper = Theme::from_builtin("paper").unwrap();
        let gradient = Theme::from_builtin("gradient").unwrap();
        let opts = CardOptions::default;
        assert!(card(&glass, CanvasSize::default(), opts(), "x").contains("feGaussianBlur"));
        assert!(card(&paper, CanvasSize::default(), opts(), "x").contains(r#"id="texture""#));
        assert!(card(&gradient, CanvasSize::default(), opts(), "x").contains("linearGradient"));
    }

    #[test]
    fn theme_paints_are_escaped() {
        let solid = Theme {
            background_color: r#"red" onload="x"#.to_string(),
            ..Theme::default()
        };
        let svg = card(&solid, CanvasSize::default(), CardOptions::default(), "x");
        assert!(svg.contains(r#"fill="red&quot; onload=&quot;x""#));
        assert!(!svg.contains(r#"onload="x""#));

        let gradient = Theme {
            background_gradient: vec!["<a>".to_string(), "#fff".to_string(), "#000".to_string()],
            ..Theme::default()
        };
        let svg = card(&gradient, CanvasSize::default(), CardOptions::default(), "x");
        assert!(svg.contains(r#"stop-color="&lt;a&gt;""#));
    }

    #[test]
    fn author_name_is_escaped() {
        let options = CardOptions {
            author: "Tom & Jerry".to_string(),
            ..CardOptions::default()
        };
        let svg = card(&Theme::default(), CanvasSize::default(), options, "x");
        assert!(svg.contains("Tom &amp; Jerry"));
    }
}
