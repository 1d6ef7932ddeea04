//! Turn Markdown into a paginated series of fixed-size image cards.
//!
//! Text is split into [`Block`]s, each block is laid out under the active
//! [`Theme`] to learn its height, and the heights are packed greedily into
//! pages that fit the chosen [`CanvasSize`]. [`Session`] keeps those stages
//! current; [`Exporter`] writes the resulting cards to disk.

pub mod block;
pub mod canvas;
pub mod card;
pub mod error;
pub mod export;
pub mod fonts;
pub mod inline;
pub mod layout;
pub mod measure;
pub mod paginate;
pub mod pipeline;
pub mod render;
pub mod svg;
pub mod theme;

pub use block::{Block, BlockId, BlockKind, parse_blocks};
pub use canvas::CanvasSize;
pub use card::CardOptions;
pub use error::{Error, Result};
pub use export::{ExportOptions, Exporter, ImageFormat, ResvgBackend};
pub use fonts::{CosmicTextMeasure, TextMeasure};
pub use inline::{InlineRun, RunKind, format_inline};
pub use measure::{HeightMap, Measure};
pub use paginate::{Page, paginate, safe_height};
pub use pipeline::Session;
pub use theme::Theme;
