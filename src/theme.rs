use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const BUILTIN_THEMES: &[(&str, &str)] = &[
    ("light", include_str!("../themes/light.toml")),
    ("dark", include_str!("../themes/dark.toml")),
];

const CANVAS_BACKGROUND: &str = "#f8fafc";
const COMPONENT_FILL: &str = "#ffffff";
const COMPONENT_STROKE: &str = "#cbd5e1";
const COMPONENT_TEXT: &str = "#1e293b";
const COST_TEXT: &str = "#059669";
const CONNECTION_STROKE: &str = "#3b82f6";
const HOVER_STROKE: &str = "#22c55e";
const SELECTED_STROKE: &str = "#f59e0b";
const CONNECT_MODE_STROKE: &str = "#3b82f6";
const FONT_FAMILY: &str = "sans-serif";
const FONT_SIZE: f32 = 14.0;

/// Colours and type used when projecting the diagram to SVG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default = "default_canvas_background")]
    pub canvas_background: String,
    #[serde(default = "default_component_fill")]
    pub component_fill: String,
    #[serde(default = "default_component_stroke")]
    pub component_stroke: String,
    #[serde(default = "default_component_text")]
    pub component_text: String,
    #[serde(default = "default_cost_text")]
    pub cost_text: String,
    #[serde(default = "default_connection_stroke")]
    pub connection_stroke: String,
    #[serde(default = "default_hover_stroke")]
    pub hover_stroke: String,
    #[serde(default = "default_selected_stroke")]
    pub selected_stroke: String,
    /// Outline of the component in connect mode, its anchors and the snap indicator
    #[serde(default = "default_connect_mode_stroke")]
    pub connect_mode_stroke: String,

    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

fn default_canvas_background() -> String {
    CANVAS_BACKGROUND.to_string()
}
fn default_component_fill() -> String {
    COMPONENT_FILL.to_string()
}
fn default_component_stroke() -> String {
    COMPONENT_STROKE.to_string()
}
fn default_component_text() -> String {
    COMPONENT_TEXT.to_string()
}
fn default_cost_text() -> String {
    COST_TEXT.to_string()
}
fn default_connection_stroke() -> String {
    CONNECTION_STROKE.to_string()
}
fn default_hover_stroke() -> String {
    HOVER_STROKE.to_string()
}
fn default_selected_stroke() -> String {
    SELECTED_STROKE.to_string()
}
fn default_connect_mode_stroke() -> String {
    CONNECT_MODE_STROKE.to_string()
}
fn default_font_family() -> String {
    FONT_FAMILY.to_string()
}
fn default_font_size() -> f32 {
    FONT_SIZE
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            canvas_background: default_canvas_background(),
            component_fill: default_component_fill(),
            component_stroke: default_component_stroke(),
            component_text: default_component_text(),
            cost_text: default_cost_text(),
            connection_stroke: default_connection_stroke(),
            hover_stroke: default_hover_stroke(),
            selected_stroke: default_selected_stroke(),
            connect_mode_stroke: default_connect_mode_stroke(),
            font_family: default_font_family(),
            font_size: default_font_size(),
        }
    }
}

impl Theme {
    pub fn from_builtin(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        let content = BUILTIN_THEMES
            .iter()
            .find(|(n, _)| *n == normalized)
            .map(|(_, c)| *c)
            .ok_or_else(|| Error::Config {
                message: format!(
                    "Unknown built-in theme '{}'. Available: {}",
                    name,
                    Self::list_builtins().join(", ")
                ),
            })?;
        Self::from_toml(content)
    }

    pub fn list_builtins() -> Vec<&'static str> {
        BUILTIN_THEMES.iter().map(|(n, _)| *n).collect()
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config {
            message: format!("Failed to parse theme TOML: {}", e),
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::Config {
            message: format!("Failed to parse theme YAML: {}", e),
        })
    }
}
