pub mod connection;
pub mod entity;
pub mod footprint;
pub mod geometry;
pub mod render;
pub mod store;
pub mod types;
pub mod viewport;

pub use connection::{Anchor, ConnectionEngine, Preview, SnapTarget, StyleEditor};
pub use entity::{ComponentEntityManager, DragOutcome};
pub use footprint::{BoundsMap, FixedFootprint, Footprint, MeasuredFootprint};
pub use geometry::{Point, Rect, Side, Size};
pub use render::{RenderContext, Scene};
pub use store::{DiagramStore, Snapshot};
pub use types::{
    ArrowTopology, ArrowheadShape, ComponentId, ComponentKind, ComponentSpec, Connection,
    ConnectionId, ConnectionStyle, PlacedComponent, StrokeStyle, StyleEdit,
};
pub use viewport::{PanGesture, Viewport};
