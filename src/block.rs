//! Line-oriented markdown blockifier.
//!
//! Splits raw markdown into a flat sequence of typed blocks. The parser is a
//! single forward pass with one open accumulator; it never fails and never
//! backtracks.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

const FENCE: &str = "```";
const SEPARATOR: &str = "---";

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a block within one parse. Ids are never reused, so a height
/// measured for a previous parse can never be mistaken for a current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockId(u64);

impl BlockId {
    fn next() -> Self {
        BlockId(NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Paragraph,
    Header,
    Code,
    Table,
    Quote,
    List,
    Separator,
}

/// A parsed unit of markdown content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Raw source lines. Fence markers and blank separator lines are not kept.
    pub content: Vec<String>,
}

impl Block {
    fn new(kind: BlockKind, content: Vec<String>) -> Self {
        Self {
            id: BlockId::next(),
            kind,
            content,
        }
    }

    /// True when `other` has the same kind and content, ignoring identity.
    pub fn same_content(&self, other: &Block) -> bool {
        self.kind == other.kind && self.content == other.content
    }
}

struct Accumulator {
    kind: BlockKind,
    lines: Vec<String>,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            kind: BlockKind::Paragraph,
            lines: Vec::new(),
        }
    }

    fn flush(&mut self, out: &mut Vec<Block>) {
        if !self.lines.is_empty() {
            out.push(Block::new(self.kind, std::mem::take(&mut self.lines)));
        }
        self.kind = BlockKind::Paragraph;
    }

    fn push(&mut self, kind: BlockKind, line: &str) {
        self.kind = kind;
        self.lines.push(line.to_string());
    }
}

/// Parse markdown text into ordered blocks.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut blocks = Vec::new();
    let mut open = Accumulator::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if trimmed.starts_with(FENCE) {
            open.flush(&mut blocks);
            i += 1;
            let start = i;
            while i < lines.len() && !lines[i].trim().starts_with(FENCE) {
                i += 1;
            }
            let code = lines[start..i].iter().map(|l| l.to_string()).collect();
            blocks.push(Block::new(BlockKind::Code, code));
            // skip the closing fence; an unterminated fence simply runs to the end
            i += 1;
            continue;
        }

        if trimmed.starts_with('|') {
            open.flush(&mut blocks);
            let start = i;
            while i < lines.len() && lines[i].trim().starts_with('|') {
                i += 1;
            }
            let rows = lines[start..i].iter().map(|l| l.to_string()).collect();
            blocks.push(Block::new(BlockKind::Table, rows));
            continue;
        }

        if trimmed == SEPARATOR {
            open.flush(&mut blocks);
            blocks.push(Block::new(BlockKind::Separator, vec![SEPARATOR.to_string()]));
            i += 1;
            continue;
        }

        if trimmed.starts_with('#') {
            open.flush(&mut blocks);
            blocks.push(Block::new(BlockKind::Header, vec![line.to_string()]));
            i += 1;
            continue;
        }

        if trimmed.starts_with('>') {
            if open.kind != BlockKind::Quote {
                open.flush(&mut blocks);
            }
            open.push(BlockKind::Quote, line);
            i += 1;
            continue;
        }

        if is_list_line(trimmed) {
            if open.kind != BlockKind::List {
                open.flush(&mut blocks);
            }
            open.push(BlockKind::List, line);
            i += 1;
            continue;
        }

        if trimmed.is_empty() {
            open.flush(&mut blocks);
            i += 1;
            continue;
        }

        // Plain text continues an open list or quote, turning it into a paragraph.
        if !matches!(
            open.kind,
            BlockKind::Paragraph | BlockKind::List | BlockKind::Quote
        ) {
            open.flush(&mut blocks);
        }
        open.push(BlockKind::Paragraph, line);
        i += 1;
    }

    open.flush(&mut blocks);
    blocks
}

fn is_list_line(trimmed: &str) -> bool {
    unordered_marker_len(trimmed).is_some() || ordered_marker_len(trimmed).is_some()
}

/// Byte length of a leading `- ` / `* ` marker including its whitespace char.
pub(crate) fn unordered_marker_len(line: &str) -> Option<usize> {
    let mut chars = line.chars();
    match chars.next() {
        Some('-' | '*') => {}
        _ => return None,
    }
    let ws = chars.next().filter(|c| c.is_whitespace())?;
    Some(1 + ws.len_utf8())
}

/// Byte length of a leading `12. ` marker including its whitespace char.
pub(crate) fn ordered_marker_len(line: &str) -> Option<usize> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || line.as_bytes().get(digits) != Some(&b'.') {
        return None;
    }
    let ws = line[digits + 1..]
        .chars()
        .next()
        .filter(|c| c.is_whitespace())?;
    Some(digits + 1 + ws.len_utf8())
}
