use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diagram::footprint::{
    COMPONENT_HEIGHT, COMPONENT_WIDTH, FixedFootprint, Footprint, MeasuredFootprint,
};
use crate::diagram::geometry::Size;
use crate::error::{Error, Result};
use crate::fonts::CosmicTextMeasure;
use crate::theme::Theme;

pub const AUTOSAVE_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_canvas_width")]
    pub width: f64,
    #[serde(default = "default_canvas_height")]
    pub height: f64,
}

fn default_canvas_width() -> f64 {
    1200.0
}
fn default_canvas_height() -> f64 {
    800.0
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: default_canvas_width(),
            height: default_canvas_height(),
        }
    }
}

impl CanvasConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootprintConfig {
    #[serde(default = "default_footprint_width")]
    pub width: f64,
    #[serde(default = "default_footprint_height")]
    pub height: f64,
    /// Widen boxes to fit their display name using the system fonts
    #[serde(default)]
    pub measure_text: bool,
}

fn default_footprint_width() -> f64 {
    COMPONENT_WIDTH
}
fn default_footprint_height() -> f64 {
    COMPONENT_HEIGHT
}

impl Default for FootprintConfig {
    fn default() -> Self {
        Self {
            width: default_footprint_width(),
            height: default_footprint_height(),
            measure_text: false,
        }
    }
}

impl FootprintConfig {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn build(&self, font_size: f32) -> Box<dyn Footprint> {
        if self.measure_text {
            Box::new(MeasuredFootprint::new(
                CosmicTextMeasure::new(),
                self.size(),
                font_size,
            ))
        } else {
            Box::new(FixedFootprint(self.size()))
        }
    }
}

fn default_autosave_secs() -> u64 {
    AUTOSAVE_SECS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Name of a built-in theme; ignored when `theme` is given inline
    #[serde(default)]
    pub theme_name: Option<String>,
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub footprint: FootprintConfig,
    #[serde(default = "default_autosave_secs")]
    pub autosave_secs: u64,
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme_name: None,
            theme: None,
            canvas: CanvasConfig::default(),
            footprint: FootprintConfig::default(),
            autosave_secs: AUTOSAVE_SECS,
            storage_path: None,
        }
    }
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config {
            message: format!("Failed to parse config TOML: {}", e),
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::Config {
            message: format!("Failed to parse config YAML: {}", e),
        })
    }

    /// Load from a file, choosing the format by extension. Unknown extensions
    /// try TOML first, then YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let config = match ext.as_deref() {
            Some("toml") => Self::from_toml(&content)?,
            Some("yaml") | Some("yml") => Self::from_yaml(&content)?,
            _ => Self::from_toml(&content).or_else(|_| Self::from_yaml(&content))?,
        };
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn resolve_theme(&self) -> Result<Theme> {
        match (&self.theme, &self.theme_name) {
            (Some(theme), _) => Ok(theme.clone()),
            (None, Some(name)) => Theme::from_builtin(name),
            (None, None) => Ok(Theme::default()),
        }
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_secs.max(1))
    }

    /// Configured snapshot path, or `<data dir>/archsketch/diagram.json`.
    pub fn storage_path(&self) -> PathBuf {
        self.storage_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("archsketch")
                .join("diagram.json")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.autosave_interval(), Duration::from_secs(30));
        assert_eq!(config.resolve_theme().unwrap(), Theme::default());
        assert!(config.storage_path().ends_with("archsketch/diagram.json"));
    }

    #[test]
    fn toml_and_yaml_describe_the_same_config() {
        let toml = r#"
theme_name = "dark"
autosave_secs = 10

[canvas]
width = 1600.0

[footprint]
height = 96.0
"#;
        let yaml = r#"
theme_name: dark
autosave_secs: 10
canvas:
  width: 1600.0
footprint:
  height: 96.0
"#;
        let a = Config::from_toml(toml).unwrap();
        let b = Config::from_yaml(yaml).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.canvas.height, 800.0);
        assert_eq!(a.footprint.size(), Size::new(120.0, 96.0));
        assert_eq!(
            a.resolve_theme().unwrap(),
            Theme::from_builtin("dark").unwrap()
        );
    }

    #[test]
    fn load_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sketch.yml");
        std::fs::write(&path, "canvas:\n  height: 640.0\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.canvas.height, 640.0);

        let bad = dir.path().join("sketch.conf");
        std::fs::write(&bad, "canvas = [").unwrap();
        assert!(matches!(Config::load(&bad), Err(Error::Config { .. })));
    }
}
