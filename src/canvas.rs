use serde::Serialize;

use crate::error::{Error, Result};

/// Output card dimensions in CSS pixels. `height == None` means a single
/// card that grows with its content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CanvasSize {
    pub width: f32,
    pub height: Option<f32>,
}

const BUILTIN_CANVASES: &[(&str, CanvasSize)] = &[
    (
        "auto",
        CanvasSize {
            width: 450.0,
            height: None,
        },
    ),
    (
        "square",
        CanvasSize {
            width: 450.0,
            height: Some(450.0),
        },
    ),
    (
        "landscape",
        CanvasSize {
            width: 800.0,
            height: Some(450.0),
        },
    ),
];

impl Default for CanvasSize {
    fn default() -> Self {
        BUILTIN_CANVASES[0].1
    }
}

impl CanvasSize {
    pub fn fixed(width: f32, height: f32) -> Self {
        Self {
            width,
            height: Some(height),
        }
    }

    pub fn auto(width: f32) -> Self {
        Self {
            width,
            height: None,
        }
    }

    pub fn is_auto(&self) -> bool {
        self.height.is_none()
    }

    pub fn list_builtins() -> Vec<&'static str> {
        BUILTIN_CANVASES.iter().map(|(n, _)| *n).collect()
    }

    /// Accepts a built-in name, `WIDTHxHEIGHT`, or `WIDTHxauto`.
    pub fn parse(spec: &str) -> Result<Self> {
        let normalized = spec.trim().to_ascii_lowercase();
        if let Some((_, size)) = BUILTIN_CANVASES.iter().find(|(n, _)| *n == normalized) {
            return Ok(*size);
        }

        let invalid = || Error::InvalidCanvas(spec.to_string());
        let (w, h) = normalized.split_once('x').ok_or_else(invalid)?;
        let width = parse_dimension(w).ok_or_else(invalid)?;
        if h.trim() == "auto" {
            return Ok(Self::auto(width));
        }
        let height = parse_dimension(h).ok_or_else(invalid)?;
        Ok(Self::fixed(width, height))
    }
}

fn parse_dimension(value: &str) -> Option<f32> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}
