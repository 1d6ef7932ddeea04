use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fonts::FontFamily;

const BUILTIN_THEMES: &[(&str, &str)] = &[
    ("minimal", include_str!("../themes/minimal.toml")),
    ("dark", include_str!("../themes/dark.toml")),
    ("gradient", include_str!("../themes/gradient.toml")),
    ("glass", include_str!("../themes/glass.toml")),
    ("paper", include_str!("../themes/paper.toml")),
];

const FONT_SIZE_BASE: f32 = 14.0;
const FONT_SIZE_SMALL: f32 = 12.0;
const LINE_HEIGHT: f32 = 1.625;
const CODE_LINE_HEIGHT: f32 = 20.0;
const PADDING: f32 = 24.0;
const BLOCK_GAP: f32 = 12.0;

/// Background ornament painted behind the content panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decoration {
    #[default]
    None,
    Gradient,
    Glass,
    Texture,
}

/// A named, immutable bundle of card styling.
///
/// Colors are any SVG paint value (`#rrggbb`, `rgba(..)` or `none`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub decoration: Decoration,
    #[serde(default)]
    pub font_body: FontFamily,
    /// Inset between the card edge and the content, on every side.
    #[serde(default = "default_padding")]
    pub padding: f32,

    pub background_color: String,
    /// Three stops for a diagonal background gradient; solid when empty.
    #[serde(default)]
    pub background_gradient: Vec<String>,
    pub container_color: String,
    #[serde(default = "default_none")]
    pub container_border_color: String,
    pub text_color: String,
    pub heading_color: String,
    pub bold_color: String,
    pub code_bg_color: String,
    pub code_text_color: String,
    pub inline_code_bg_color: String,
    pub quote_border_color: String,
    #[serde(default = "default_none")]
    pub quote_bg_color: String,
    pub quote_text_color: String,
    pub accent_color: String,
    pub bullet_color: String,
    pub line_color: String,
    pub table_header_bg_color: String,
    pub table_row_even_color: String,
    #[serde(default = "default_none")]
    pub table_row_odd_color: String,
    pub table_border_color: String,
    pub footer_line_color: String,
    pub avatar_color: String,

    #[serde(default = "default_font_size_base")]
    pub font_size_base: f32,
    #[serde(default = "default_font_size_small")]
    pub font_size_small: f32,
    #[serde(default = "default_line_height")]
    pub line_height: f32,
    #[serde(default = "default_code_line_height")]
    pub code_line_height: f32,
    /// Vertical space after every block, both when measuring and drawing.
    #[serde(default = "default_block_gap")]
    pub block_gap: f32,
}

fn default_none() -> String {
    "none".to_string()
}
fn default_padding() -> f32 {
    PADDING
}
fn default_font_size_base() -> f32 {
    FONT_SIZE_BASE
}
fn default_font_size_small() -> f32 {
    FONT_SIZE_SMALL
}
fn default_line_height() -> f32 {
    LINE_HEIGHT
}
fn default_code_line_height() -> f32 {
    CODE_LINE_HEIGHT
}
fn default_block_gap() -> f32 {
    BLOCK_GAP
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_builtin("minimal").expect("built-in minimal theme must parse")
    }
}

impl Theme {
    pub fn from_builtin(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        let content = BUILTIN_THEMES
            .iter()
            .find(|(n, _)| *n == normalized)
            .map(|(_, c)| *c)
            .ok_or_else(|| Error::UnknownTheme {
                name: name.to_string(),
                available: Self::list_builtins().join(", "),
            })?;
        Self::from_toml(content)
    }

    /// Human-readable name, or the catalog key when the file has no label.
    pub fn display_name(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    pub fn list_builtins() -> Vec<&'static str> {
        BUILTIN_THEMES.iter().map(|(n, _)| *n).collect()
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ThemeParse(format!("TOML: {}", e)))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ThemeParse(format!("YAML: {}", e)))
    }

    /// Parse a user theme file, trying TOML first and then YAML.
    pub fn from_file_contents(content: &str) -> Result<Self> {
        match Self::from_toml(content) {
            Ok(theme) => Ok(theme),
            Err(toml_err) => Self::from_yaml(content).map_err(|yaml_err| {
                Error::ThemeParse(format!("not TOML or YAML ({}; {})", toml_err, yaml_err))
            }),
        }
    }

    /// Resolve a `--theme` argument: an existing file path, else a built-in name.
    pub fn load(spec: &str) -> Result<Self> {
        let path = std::path::Path::new(spec);
        if path.is_file() {
            let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_file_contents(&content)
        } else {
            Self::from_builtin(spec)
        }
    }
}
