use std::num::NonZeroUsize;

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Style, Weight};
use lru::LruCache;
use serde::{Deserialize, Serialize};

const MEASURE_CACHE_CAPACITY: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Sans,
    Serif,
    Mono,
}

impl FontFamily {
    /// Generic CSS family name used in emitted SVG.
    pub fn css_name(self) -> &'static str {
        match self {
            FontFamily::Sans => "sans-serif",
            FontFamily::Serif => "serif",
            FontFamily::Mono => "monospace",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub family: FontFamily,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
}

impl Font {
    pub fn new(family: FontFamily, size: f32) -> Self {
        Self {
            family,
            size,
            bold: false,
            italic: false,
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

#[derive(Hash, PartialEq, Eq, Clone)]
struct MeasureKey {
    text: String,
    family: FontFamily,
    font_size_bits: u32,
    is_bold: bool,
    is_italic: bool,
    max_width_bits: Option<u32>,
}

pub trait TextMeasure {
    /// Returns `(width, height)` of `text` set in `font`, wrapped at `max_width` if given.
    fn measure_text(&mut self, text: &str, font: &Font, max_width: Option<f32>) -> (f32, f32);
}

/// Shapes text with the system fonts. This is the single authority for
/// block heights, so the same instance should measure and draw.
pub struct CosmicTextMeasure {
    font_system: FontSystem,
    cache: LruCache<MeasureKey, (f32, f32)>,
}

impl CosmicTextMeasure {
    pub fn new() -> Self {
        Self {
            font_system: FontSystem::new(),
            cache: LruCache::new(
                NonZeroUsize::new(MEASURE_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            ),
        }
    }
}

impl Default for CosmicTextMeasure {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasure for CosmicTextMeasure {
    fn measure_text(&mut self, text: &str, font: &Font, max_width: Option<f32>) -> (f32, f32) {
        let key = MeasureKey {
            text: text.to_string(),
            family: font.family,
            font_size_bits: font.size.to_bits(),
            is_bold: font.bold,
            is_italic: font.italic,
            max_width_bits: max_width.map(f32::to_bits),
        };

        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let line_height = font.size * 1.2;
        let mut buffer = Buffer::new(
            &mut self.font_system,
            Metrics {
                font_size: font.size,
                line_height,
            },
        );

        buffer.set_size(&mut self.font_system, max_width, None);

        let attrs = Attrs::new()
            .family(match font.family {
                FontFamily::Sans => Family::SansSerif,
                FontFamily::Serif => Family::Serif,
                FontFamily::Mono => Family::Monospace,
            })
            .weight(if font.bold {
                Weight::BOLD
            } else {
                Weight::NORMAL
            })
            .style(if font.italic {
                Style::Italic
            } else {
                Style::Normal
            });

        buffer.set_text(&mut self.font_system, text, &attrs, Shaping::Advanced, None);

        let mut total_width: f32 = 0.0;
        let mut total_height: f32 = 0.0;

        for run in buffer.layout_runs() {
            total_width = total_width.max(run.line_w);
            total_height += run.line_height;
        }

        let measured = (total_width, total_height);
        self.cache.put(key, measured);
        measured
    }
}

/// Fixed-advance metrics for tests: every char is half the font size wide.
#[cfg(test)]
pub(crate) struct FixedMeasure;

#[cfg(test)]
impl TextMeasure for FixedMeasure {
    fn measure_text(&mut self, text: &str, font: &Font, _max_width: Option<f32>) -> (f32, f32) {
        (text.chars().count() as f32 * font.size * 0.5, font.size * 1.2)
    }
}
