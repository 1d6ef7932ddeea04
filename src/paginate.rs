//! Greedy pagination of measured blocks into fixed-height cards.

use std::ops::Range;

use serde::Serialize;

use crate::block::Block;
use crate::canvas::CanvasSize;
use crate::measure::HeightMap;
use crate::theme::Theme;

/// Space reserved on every card for the footer row (avatar, author, page
/// number). Deducted as a constant; it is not measured.
pub const CHROME_ALLOWANCE: f32 = 60.0;

/// A contiguous run of blocks destined for one card. Pages own no content;
/// they index into the block sequence they were computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    range: Range<usize>,
}

impl Page {
    fn new(range: Range<usize>) -> Self {
        Self { range }
    }

    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn blocks<'a>(&self, all: &'a [Block]) -> &'a [Block] {
        &all[self.range.clone()]
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// Vertical budget for blocks on one card, or `None` when the canvas is
/// unbounded.
pub fn safe_height(canvas: &CanvasSize, theme: &Theme) -> Option<f32> {
    canvas
        .height
        .map(|h| h - theme.padding * 2.0 - CHROME_ALLOWANCE)
}

/// Partition `blocks` into pages whose summed heights stay within
/// `safe_height`.
///
/// - `None` puts everything on one page.
/// - A block taller than the budget gets a page to itself.
/// - Otherwise a block that would overflow a non-empty page starts a new one.
///
/// Blocks are never reordered or split, and a closed page is never
/// reopened. At least one page is always returned.
pub fn paginate(blocks: &[Block], heights: &HeightMap, safe_height: Option<f32>) -> Vec<Page> {
    let Some(safe) = safe_height else {
        return vec![Page::new(0..blocks.len())];
    };

    let mut pages = Vec::new();
    let mut start = 0;
    let mut current_height = 0.0;

    for (i, block) in blocks.iter().enumerate() {
        let h = heights.get(block.id);

        if h > safe {
            if start < i {
                pages.push(Page::new(start..i));
            }
            pages.push(Page::new(i..i + 1));
            start = i + 1;
            current_height = 0.0;
            continue;
        }

        if current_height + h > safe && start < i {
            pages.push(Page::new(start..i));
            start = i;
            current_height = h;
        } else {
            current_height += h;
        }
    }

    if start < blocks.len() {
        pages.push(Page::new(start..blocks.len()));
    }
    if pages.is_empty() {
        pages.push(Page::new(0..0));
    }
    pages
}
