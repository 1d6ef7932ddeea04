//! The parse → measure → paginate pipeline, kept current as inputs change.

use serde::Serialize;

use crate::block::{Block, BlockId, BlockKind, parse_blocks};
use crate::canvas::CanvasSize;
use crate::card::{CardContext, CardOptions, render_card};
use crate::fonts::TextMeasure;
use crate::measure::{HeightMap, LayoutMeasure, content_width, measure_blocks};
use crate::paginate::{Page, paginate, safe_height};
use crate::theme::Theme;

/// Inputs pagination depends on. Equal keys give equal pages.
#[derive(Debug, Clone, PartialEq)]
struct PaginationKey {
    ids: Vec<BlockId>,
    heights: Vec<u32>,
    canvas: CanvasSize,
    safe_height: Option<u32>,
}

/// One document being turned into cards.
///
/// Text changes re-parse at once. Heights and pages catch up on the next
/// [`Session::settle`], which every accessor that needs them calls.
pub struct Session<M: TextMeasure> {
    text: String,
    theme: Theme,
    canvas: CanvasSize,
    options: CardOptions,
    measure: LayoutMeasure<M>,
    blocks: Vec<Block>,
    heights: HeightMap,
    heights_stale: bool,
    pages: Vec<Page>,
    paginated_for: Option<PaginationKey>,
}

impl<M: TextMeasure> Session<M> {
    pub fn new(text_measure: M) -> Self {
        Self {
            text: String::new(),
            theme: Theme::default(),
            canvas: CanvasSize::default(),
            options: CardOptions::default(),
            measure: LayoutMeasure::new(text_measure),
            blocks: Vec::new(),
            heights: HeightMap::new(),
            heights_stale: true,
            pages: Vec::new(),
            paginated_for: None,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn canvas(&self) -> &CanvasSize {
        &self.canvas
    }

    pub fn options(&self) -> &CardOptions {
        &self.options
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Heights as of the last settle; may lag behind the blocks.
    pub fn heights(&self) -> &HeightMap {
        &self.heights
    }

    pub fn text_measure_mut(&mut self) -> &mut M {
        self.measure.text_mut()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.blocks = parse_blocks(&self.text);
        self.heights_stale = true;
        log::debug!("parsed {} blocks", self.blocks.len());
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.heights_stale = true;
    }

    pub fn set_canvas(&mut self, canvas: CanvasSize) {
        self.canvas = canvas;
        self.heights_stale = true;
    }

    /// Author and footer settings only affect drawing, never layout.
    pub fn set_options(&mut self, options: CardOptions) {
        self.options = options;
    }

    /// Bring heights and pages up to date. Returns whether pagination was
    /// recomputed.
    pub fn settle(&mut self) -> bool {
        if self.heights_stale {
            let width = content_width(&self.canvas, &self.theme);
            self.heights = measure_blocks(&self.blocks, &self.theme, width, &mut self.measure);
            self.heights_stale = false;
        }

        let key = PaginationKey {
            ids: self.blocks.iter().map(|b| b.id).collect(),
            heights: self
                .blocks
                .iter()
                .map(|b| self.heights.get(b.id).to_bits())
                .collect(),
            canvas: self.canvas,
            safe_height: safe_height(&self.canvas, &self.theme).map(f32::to_bits),
        };
        if self.paginated_for.as_ref() == Some(&key) {
            log::debug!("pagination unchanged, reusing {} pages", self.pages.len());
            return false;
        }

        let safe = safe_height(&self.canvas, &self.theme);
        self.pages = paginate(&self.blocks, &self.heights, safe);
        self.paginated_for = Some(key);
        log::debug!(
            "paginated {} blocks into {} pages (safe height {:?})",
            self.blocks.len(),
            self.pages.len(),
            safe
        );
        true
    }

    pub fn pages(&mut self) -> &[Page] {
        self.settle();
        &self.pages
    }

    /// One SVG document per page, in order.
    pub fn render_pages(&mut self) -> Vec<String> {
        self.settle();
        let ctx = CardContext {
            theme: &self.theme,
            canvas: &self.canvas,
            options: &self.options,
        };
        let count = self.pages.len();
        let text = self.measure.text_mut();
        self.pages
            .iter()
            .enumerate()
            .map(|(i, page)| render_card(&ctx, page.blocks(&self.blocks), i, count, &mut *text))
            .collect()
    }

    /// Settled pagination in a serializable form.
    pub fn report(&mut self) -> PaginationReport {
        self.settle();
        PaginationReport {
            theme: self.theme.name.clone(),
            canvas: self.canvas,
            safe_height: safe_height(&self.canvas, &self.theme),
            pages: self
                .pages
                .iter()
                .map(|page| {
                    let blocks: Vec<BlockReport> = page
                        .blocks(&self.blocks)
                        .iter()
                        .map(|b| BlockReport {
                            id: b.id,
                            kind: b.kind,
                            height: self.heights.get(b.id),
                            first_line: b.content.first().cloned().unwrap_or_default(),
                        })
                        .collect();
                    PageReport {
                        start: page.range().start,
                        end: page.range().end,
                        height: blocks.iter().map(|b| b.height).sum(),
                        blocks,
                    }
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationReport {
    pub theme: String,
    pub canvas: CanvasSize,
    pub safe_height: Option<f32>,
    pub pages: Vec<PageReport>,
}

#[derive(Debug, Serialize)]
pub struct PageReport {
    pub start: usize,
    pub end: usize,
    pub height: f32,
    pub blocks: Vec<BlockReport>,
}

#[derive(Debug, Serialize)]
pub struct BlockReport {
    pub id: BlockId,
    pub kind: BlockKind,
    pub height: f32,
    pub first_line: String,
}
