use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::geometry::{Point, Side};
use crate::error::{Error, Result};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a placed component, unique for the session.
    ComponentId
);
string_id!(
    /// Identifier of a connection, unique for the session.
    ConnectionId
);

/// Component kinds offered by the palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Cloud,
    Service,
    Database,
    Queue,
    Monitoring,
    Security,
    Cdn,
    Storage,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 8] = [
        ComponentKind::Cloud,
        ComponentKind::Service,
        ComponentKind::Database,
        ComponentKind::Queue,
        ComponentKind::Monitoring,
        ComponentKind::Security,
        ComponentKind::Cdn,
        ComponentKind::Storage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Cloud => "cloud",
            ComponentKind::Service => "service",
            ComponentKind::Database => "database",
            ComponentKind::Queue => "queue",
            ComponentKind::Monitoring => "monitoring",
            ComponentKind::Security => "security",
            ComponentKind::Cdn => "cdn",
            ComponentKind::Storage => "storage",
        }
    }

    /// Icon class used by the palette
    pub fn icon_ref(&self) -> &'static str {
        match self {
            ComponentKind::Cloud => "fas fa-cloud",
            ComponentKind::Service => "fas fa-cogs",
            ComponentKind::Database => "fas fa-database",
            ComponentKind::Queue => "fas fa-stream",
            ComponentKind::Monitoring => "fas fa-chart-line",
            ComponentKind::Security => "fas fa-shield-alt",
            ComponentKind::Cdn => "fas fa-globe",
            ComponentKind::Storage => "fas fa-hdd",
        }
    }

    /// Short text badge drawn in place of the icon font
    pub fn badge(&self) -> &'static str {
        match self {
            ComponentKind::Cloud => "CLD",
            ComponentKind::Service => "SVC",
            ComponentKind::Database => "DB",
            ComponentKind::Queue => "MQ",
            ComponentKind::Monitoring => "MON",
            ComponentKind::Security => "SEC",
            ComponentKind::Cdn => "CDN",
            ComponentKind::Storage => "STO",
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the palette hands over when a component is dropped onto the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(alias = "type")]
    pub kind: ComponentKind,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(alias = "cost", deserialize_with = "cost_from_number_or_string")]
    pub monthly_cost: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "icon", skip_serializing_if = "Option::is_none")]
    pub icon_ref: Option<String>,
}

impl ComponentSpec {
    pub fn new(kind: ComponentKind, display_name: impl Into<String>, monthly_cost: u64) -> Self {
        Self {
            kind,
            display_name: display_name.into(),
            monthly_cost,
            description: String::new(),
            icon_ref: None,
        }
    }

    /// Parse the JSON drag payload produced by the palette.
    pub fn from_payload(payload: &str) -> Result<Self> {
        serde_json::from_str(payload).map_err(|e| Error::InvalidPayload {
            message: e.to_string(),
        })
    }
}

fn cost_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Cost {
        Number(u64),
        Text(String),
    }

    match Cost::deserialize(deserializer)? {
        Cost::Number(n) => Ok(n),
        Cost::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// A component placed on the canvas. `position` is in logical canvas space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedComponent {
    pub id: ComponentId,
    pub kind: ComponentKind,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub monthly_cost: u64,
    #[serde(default)]
    pub description: String,
    pub position: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_ref: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl StrokeStyle {
    /// SVG `stroke-dasharray` value, if any
    pub fn dash_array(&self) -> Option<&'static str> {
        match self {
            StrokeStyle::Solid => None,
            StrokeStyle::Dashed => Some("8,4"),
            StrokeStyle::Dotted => Some("2,2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrowTopology {
    #[default]
    Straight,
    Curved,
    RightAngled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowheadShape {
    #[default]
    Triangle,
    Circle,
    Diamond,
}

pub const DEFAULT_STROKE_WIDTH: u32 = 3;

fn default_stroke_width() -> u32 {
    DEFAULT_STROKE_WIDTH
}

/// Visual style of a connection. Every connection owns its own copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStyle {
    #[serde(default = "default_stroke_width")]
    pub stroke_width: u32,
    #[serde(default)]
    pub stroke_style: StrokeStyle,
    #[serde(default)]
    pub roughness: u32,
    #[serde(default)]
    pub arrow_topology: ArrowTopology,
    #[serde(default)]
    pub arrowhead_shape: ArrowheadShape,
}

impl Default for ConnectionStyle {
    fn default() -> Self {
        Self {
            stroke_width: DEFAULT_STROKE_WIDTH,
            stroke_style: StrokeStyle::Solid,
            roughness: 0,
            arrow_topology: ArrowTopology::Straight,
            arrowhead_shape: ArrowheadShape::Triangle,
        }
    }
}

impl ConnectionStyle {
    /// Stroke width is kept strictly positive.
    pub fn normalized(mut self) -> Self {
        self.stroke_width = self.stroke_width.max(1);
        self
    }

    pub fn apply(&mut self, edit: StyleEdit) {
        match edit {
            StyleEdit::StrokeWidth(width) => self.stroke_width = width.max(1),
            StyleEdit::StrokeStyle(style) => self.stroke_style = style,
            StyleEdit::Roughness(roughness) => self.roughness = roughness,
            StyleEdit::ArrowTopology(topology) => self.arrow_topology = topology,
            StyleEdit::ArrowheadShape(shape) => self.arrowhead_shape = shape,
        }
    }
}

/// One option picked in a styling panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "option", content = "value", rename_all = "camelCase")]
pub enum StyleEdit {
    StrokeWidth(u32),
    StrokeStyle(StrokeStyle),
    Roughness(u32),
    ArrowTopology(ArrowTopology),
    ArrowheadShape(ArrowheadShape),
}

fn default_connection_kind() -> String {
    "data".to_string()
}

/// A directed connection between two anchor sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub from_component_id: ComponentId,
    pub to_component_id: ComponentId,
    pub from_side: Side,
    pub to_side: Side,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_connection_kind")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub style: ConnectionStyle,
}

impl Connection {
    pub fn references(&self, component: &ComponentId) -> bool {
        &self.from_component_id == component || &self.to_component_id == component
    }
}
