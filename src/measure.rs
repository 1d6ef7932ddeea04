//! Height measurement: lays out every block off-screen at the real content
//! width and records the space it occupies.

use std::collections::HashMap;

use crate::block::{Block, BlockId};
use crate::canvas::CanvasSize;
use crate::fonts::TextMeasure;
use crate::layout::layout_node;
use crate::render::{Node, render};
use crate::theme::Theme;

/// Port for the one impure step of the pipeline: how tall a rendered node
/// is at a given width.
pub trait Measure {
    fn measure(&mut self, node: &Node, width: f32) -> f32;
}

/// Measures by running the real layout with a text backend.
pub struct LayoutMeasure<M> {
    text: M,
}

impl<M: TextMeasure> LayoutMeasure<M> {
    pub fn new(text: M) -> Self {
        Self { text }
    }

    /// The text backend, for drawing with the same metrics that measured.
    pub fn text_mut(&mut self) -> &mut M {
        &mut self.text
    }
}

impl<M: TextMeasure> Measure for LayoutMeasure<M> {
    fn measure(&mut self, node: &Node, width: f32) -> f32 {
        layout_node(node, width, &mut self.text).height
    }
}

/// Rendered height per block id, valid for one (blocks, theme, width).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeightMap {
    heights: HashMap<BlockId, f32>,
}

impl HeightMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Measured height, or 0 for a block that has not been measured yet.
    pub fn get(&self, id: BlockId) -> f32 {
        self.heights.get(&id).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.heights.contains_key(&id)
    }

    pub fn insert(&mut self, id: BlockId, height: f32) {
        self.heights.insert(id, height);
    }

    pub fn len(&self) -> usize {
        self.heights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heights.is_empty()
    }
}

impl FromIterator<(BlockId, f32)> for HeightMap {
    fn from_iter<I: IntoIterator<Item = (BlockId, f32)>>(iter: I) -> Self {
        Self {
            heights: iter.into_iter().collect(),
        }
    }
}

/// Width available to blocks: the canvas minus the theme padding on both sides.
pub fn content_width(canvas: &CanvasSize, theme: &Theme) -> f32 {
    (canvas.width - theme.padding * 2.0).max(0.0)
}

/// Height a block occupies in a card stack, including the trailing gap.
pub fn block_height(block: &Block, theme: &Theme, width: f32, measure: &mut dyn Measure) -> f32 {
    let body = render(block, theme).map_or(0.0, |node| measure.measure(&node, width));
    body + theme.block_gap
}

/// Measure every block. The result replaces any previous map wholesale.
pub fn measure_blocks(
    blocks: &[Block],
    theme: &Theme,
    width: f32,
    measure: &mut dyn Measure,
) -> HeightMap {
    let heights: HeightMap = blocks
        .iter()
        .map(|block| (block.id, block_height(block, theme, width, measure)))
        .collect();
    log::debug!(
        "measured {} blocks at width {:.1} under theme '{}'",
        heights.len(),
        width,
        theme.name
    );
    heights
}
