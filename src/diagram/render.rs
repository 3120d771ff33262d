//! SVG projection of the diagram.
//!
//! Fragments are produced from the store and never read back. [`Scene`] keeps
//! one fragment per id and swaps a re-rendered fragment into the same slot,
//! so a redraw never shows a connection twice or leaves a gap.

use std::collections::BTreeSet;
use std::f64::consts::{FRAC_PI_2, PI};

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::connection::Preview;
use super::footprint::BoundsMap;
use super::geometry::{Point, Rect, Side, Size, arrow_vector, quadratic_end_angle};
use super::store::DiagramStore;
use super::types::{
    ArrowTopology, ArrowheadShape, ComponentId, Connection, ConnectionId, ConnectionStyle,
    PlacedComponent,
};
use super::viewport::Viewport;
use crate::svg::{dash_attr, document, escape};
use crate::theme::Theme;

/// Largest offset of a curve's control point from the chord midpoint, per axis.
pub const CURVE_JITTER: f64 = 25.0;
const HOVER_EXTRA_WIDTH: u32 = 2;
const ROUGH_OPACITY: f64 = 0.9;
const ANCHOR_RADIUS: f64 = 6.0;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Control point of a curved connection. The jitter is seeded from the
/// connection id, so the same connection always bends the same way.
pub fn curve_control(id: &ConnectionId, from: Point, to: Point) -> Point {
    let mut rng = StdRng::seed_from_u64(fnv1a(id.as_str().as_bytes()));
    let jx: f64 = rng.gen_range(-CURVE_JITTER..=CURVE_JITTER);
    let jy: f64 = rng.gen_range(-CURVE_JITTER..=CURVE_JITTER);
    Point::new((from.x + to.x) / 2.0 + jx, (from.y + to.y) / 2.0 + jy)
}

fn rough_filter_id(roughness: u32) -> String {
    format!("rough-{}", roughness)
}

fn rough_filter(roughness: u32) -> String {
    format!(
        r#"<filter id="{}"><feGaussianBlur stdDeviation="{:.1}"/></filter>"#,
        rough_filter_id(roughness),
        f64::from(roughness) * 0.5
    )
}

fn arrowhead(shape: ArrowheadShape, tip: Point, angle: f64, color: &str) -> String {
    let (sin, cos) = angle.sin_cos();
    // `along` runs back from the tip, `across` is perpendicular to it
    let at = |along: f64, across: f64| {
        Point::new(
            tip.x - cos * along - sin * across,
            tip.y - sin * along + cos * across,
        )
    };

    match shape {
        ArrowheadShape::Triangle => {
            let p1 = at(10.0, 5.0);
            let p2 = at(10.0, -5.0);
            format!(
                r#"<polygon class="arrowhead" points="{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}" fill="{}"/>"#,
                tip.x, tip.y, p1.x, p1.y, p2.x, p2.y, color
            )
        }
        ArrowheadShape::Circle => {
            let c = at(ANCHOR_RADIUS, 0.0);
            format!(
                r#"<circle class="arrowhead" cx="{:.2}" cy="{:.2}" r="{}" fill="{}"/>"#,
                c.x, c.y, ANCHOR_RADIUS, color
            )
        }
        ArrowheadShape::Diamond => {
            let p1 = at(8.0, 5.0);
            let back = at(16.0, 0.0);
            let p2 = at(8.0, -5.0);
            format!(
                r#"<polygon class="arrowhead" points="{:.2},{:.2} {:.2},{:.2} {:.2},{:.2} {:.2},{:.2}" fill="{}"/>"#,
                tip.x, tip.y, p1.x, p1.y, back.x, back.y, p2.x, p2.y, color
            )
        }
    }
}

/// Path and arrowhead for one topology, in canvas coordinates.
fn connection_body(
    id: &ConnectionId,
    from: Point,
    to: Point,
    style: &ConnectionStyle,
    color: &str,
    width: u32,
) -> String {
    let dash = dash_attr(style.stroke_style.dash_array());
    let stroke = format!(
        r#"stroke="{}" stroke-width="{}"{} stroke-linecap="round" fill="none""#,
        color, width, dash
    );

    match style.arrow_topology {
        ArrowTopology::Straight => {
            let v = arrow_vector(from, to);
            format!(
                r#"<g transform="translate({:.2},{:.2}) rotate({:.4})"><line x1="0" y1="0" x2="{:.2}" y2="0" {}/>{}</g>"#,
                from.x,
                from.y,
                v.angle_degrees,
                v.distance,
                stroke,
                arrowhead(style.arrowhead_shape, Point::new(v.distance, 0.0), 0.0, color)
            )
        }
        ArrowTopology::Curved => {
            let control = curve_control(id, from, to);
            format!(
                r#"<path d="M {:.2} {:.2} Q {:.2} {:.2} {:.2} {:.2}" {}/>{}"#,
                from.x,
                from.y,
                control.x,
                control.y,
                to.x,
                to.y,
                stroke,
                arrowhead(
                    style.arrowhead_shape,
                    to,
                    quadratic_end_angle(control, to),
                    color
                )
            )
        }
        ArrowTopology::RightAngled => {
            // horizontal stub, vertical run through the midpoint, horizontal stub
            let mid_x = (from.x + to.x) / 2.0;
            let angle = if to.x > from.x {
                0.0
            } else if to.x < from.x {
                PI
            } else if to.y > from.y {
                FRAC_PI_2
            } else if to.y < from.y {
                -FRAC_PI_2
            } else {
                0.0
            };
            format!(
                r#"<path d="M {:.2} {:.2} L {:.2} {:.2} L {:.2} {:.2} L {:.2} {:.2}" {}/>{}"#,
                from.x,
                from.y,
                mid_x,
                from.y,
                mid_x,
                to.y,
                to.x,
                to.y,
                stroke,
                arrowhead(style.arrowhead_shape, to, angle, color)
            )
        }
    }
}

pub fn render_component(component: &PlacedComponent, rect: &Rect, theme: &Theme, connecting: bool) -> String {
    let (outline, outline_width) = if connecting {
        (theme.connect_mode_stroke.as_str(), 3)
    } else {
        (theme.component_stroke.as_str(), 2)
    };
    let cx = rect.width / 2.0;

    format!(
        r#"<g class="component" data-id="{id}" data-kind="{kind}" transform="translate({x:.2},{y:.2})"><rect width="{w:.2}" height="{h:.2}" rx="8" fill="{fill}" stroke="{outline}" stroke-width="{outline_width}"/><text x="{cx:.2}" y="20" text-anchor="middle" font-family="{font}" font-size="{badge_size:.1}" font-weight="bold" fill="{badge_color}">{badge}</text><text x="{cx:.2}" y="{name_y:.2}" text-anchor="middle" font-family="{font}" font-size="{font_size:.1}" font-weight="600" fill="{text}">{name}</text><text x="{cx:.2}" y="{cost_y:.2}" text-anchor="middle" font-family="{font}" font-size="{cost_size:.1}" fill="{cost_color}">${cost}/mo</text></g>"#,
        id = escape(component.id.as_str()),
        kind = component.kind,
        x = rect.x,
        y = rect.y,
        w = rect.width,
        h = rect.height,
        fill = theme.component_fill,
        outline = outline,
        outline_width = outline_width,
        cx = cx,
        font = escape(&theme.font_family),
        badge_size = theme.font_size * 0.8,
        badge_color = theme.connection_stroke,
        badge = component.kind.badge(),
        name_y = rect.height / 2.0 + 5.0,
        font_size = theme.font_size,
        text = theme.component_text,
        name = escape(&component.display_name),
        cost_y = rect.height - 12.0,
        cost_size = theme.font_size * 0.85,
        cost_color = theme.cost_text,
        cost = component.monthly_cost,
    )
}

/// How a connection is currently shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Highlight {
    pub hovered: bool,
    pub selected: bool,
}

/// Renders one connection, or `None` when an endpoint has no bounds.
pub fn render_connection(
    connection: &Connection,
    bounds: &BoundsMap,
    theme: &Theme,
    highlight: Highlight,
) -> Option<String> {
    let from = bounds.anchor(&connection.from_component_id, connection.from_side)?;
    let to = bounds.anchor(&connection.to_component_id, connection.to_side)?;
    let style = connection.style.normalized();

    let color = if highlight.hovered {
        theme.hover_stroke.as_str()
    } else if highlight.selected {
        theme.selected_stroke.as_str()
    } else {
        theme.connection_stroke.as_str()
    };
    let width = if highlight.hovered {
        style.stroke_width + HOVER_EXTRA_WIDTH
    } else {
        style.stroke_width
    };

    let class = if highlight.selected {
        "connection selected"
    } else {
        "connection"
    };
    let rough = if style.roughness > 0 {
        format!(
            r#" filter="url(#{})" opacity="{}""#,
            rough_filter_id(style.roughness),
            ROUGH_OPACITY
        )
    } else {
        String::new()
    };

    Some(format!(
        r#"<g class="{}" data-id="{}" data-topology="{}"{}>{}</g>"#,
        class,
        escape(connection.id.as_str()),
        topology_name(style.arrow_topology),
        rough,
        connection_body(&connection.id, from, to, &style, color, width)
    ))
}

fn topology_name(topology: ArrowTopology) -> &'static str {
    match topology {
        ArrowTopology::Straight => "straight",
        ArrowTopology::Curved => "curved",
        ArrowTopology::RightAngled => "right-angled",
    }
}

/// Dashed line from the anchor to the pointer, plus the snap indicator.
pub fn render_preview(preview: &Preview, theme: &Theme) -> String {
    let mut svg = format!(
        r#"<line class="connection-preview" x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-width="3" stroke-dasharray="8,4" pointer-events="none"/>"#,
        preview.from.x, preview.from.y, preview.to.x, preview.to.y, theme.connection_stroke
    );
    if let Some(snap) = &preview.snap {
        svg.push_str(&format!(
            r#"<circle class="snap-indicator" data-side="{}" cx="{:.2}" cy="{:.2}" r="10" fill="none" stroke="{}" stroke-width="3"/>"#,
            snap.side, snap.point.x, snap.point.y, theme.hover_stroke
        ));
    }
    svg
}

/// The four anchor dots of the component in connect mode.
pub fn render_connection_points(points: &[(Side, Point)], theme: &Theme) -> String {
    points
        .iter()
        .map(|(side, p)| {
            format!(
                r#"<circle class="connection-point" data-side="{}" cx="{:.2}" cy="{:.2}" r="{}" fill="{}" stroke="{}" stroke-width="2"/>"#,
                side, p.x, p.y, ANCHOR_RADIUS, theme.component_fill, theme.connect_mode_stroke
            )
        })
        .collect()
}

/// Everything a fragment depends on besides the store entry itself.
pub struct RenderContext<'a> {
    pub store: &'a DiagramStore,
    pub bounds: &'a BoundsMap,
    pub theme: &'a Theme,
    pub hovered: Option<&'a ConnectionId>,
    pub selected: Option<&'a ConnectionId>,
    pub connect_mode: Option<&'a ComponentId>,
}

impl<'a> RenderContext<'a> {
    pub fn new(store: &'a DiagramStore, bounds: &'a BoundsMap, theme: &'a Theme) -> Self {
        Self {
            store,
            bounds,
            theme,
            hovered: None,
            selected: None,
            connect_mode: None,
        }
    }

    fn component(&self, id: &ComponentId) -> Option<String> {
        let component = self.store.component(id)?;
        let rect = self.bounds.get(id)?;
        Some(render_component(
            component,
            rect,
            self.theme,
            self.connect_mode == Some(id),
        ))
    }

    fn connection(&self, id: &ConnectionId) -> Option<(String, u32)> {
        let connection = self.store.connection(id)?;
        let highlight = Highlight {
            hovered: self.hovered == Some(id),
            selected: self.selected == Some(id),
        };
        render_connection(connection, self.bounds, self.theme, highlight)
            .map(|markup| (markup, connection.style.roughness))
    }
}

#[derive(Debug, Clone)]
struct ConnectionFragment {
    markup: String,
    roughness: u32,
}

/// Cached SVG fragments, one per component and connection, in store order.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    components: IndexMap<ComponentId, String>,
    connections: IndexMap<ConnectionId, ConnectionFragment>,
    overlay: String,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-renders everything from scratch.
    pub fn rebuild(&mut self, ctx: &RenderContext<'_>) {
        self.components.clear();
        self.connections.clear();
        for component in ctx.store.components() {
            self.refresh_component_only(ctx, &component.id);
        }
        for connection in ctx.store.connections() {
            self.refresh_connection(ctx, &connection.id);
        }
        debug!(
            components = self.components.len(),
            connections = self.connections.len(),
            "scene rebuilt"
        );
    }

    fn refresh_component_only(&mut self, ctx: &RenderContext<'_>, id: &ComponentId) {
        match ctx.component(id) {
            Some(markup) => {
                self.components.insert(id.clone(), markup);
            }
            None => {
                self.components.shift_remove(id);
            }
        }
    }

    /// Re-renders a component and every connection attached to it. A
    /// component that is no longer in the store is removed with its connections.
    pub fn refresh_component(&mut self, ctx: &RenderContext<'_>, id: &ComponentId) {
        self.refresh_component_only(ctx, id);

        let attached: Vec<ConnectionId> = ctx
            .store
            .connections()
            .filter(|c| c.references(id))
            .map(|c| c.id.clone())
            .collect();
        for connection in &attached {
            self.refresh_connection(ctx, connection);
        }
        if !self.components.contains_key(id) {
            // cascaded connections are gone from the store already
            let stale: Vec<ConnectionId> = self
                .connections
                .keys()
                .filter(|c| ctx.store.connection(c).is_none())
                .cloned()
                .collect();
            for connection in stale {
                self.connections.shift_remove(&connection);
            }
        }
    }

    /// Swaps in a fresh fragment for the connection, or drops it when the
    /// connection is gone or cannot be drawn.
    pub fn refresh_connection(&mut self, ctx: &RenderContext<'_>, id: &ConnectionId) {
        match ctx.connection(id) {
            Some((markup, roughness)) => {
                self.connections
                    .insert(id.clone(), ConnectionFragment { markup, roughness });
            }
            None => {
                self.connections.shift_remove(id);
            }
        }
    }

    pub fn set_overlay(&mut self, overlay: String) {
        self.overlay = overlay;
    }

    pub fn component_fragment(&self, id: &ComponentId) -> Option<&str> {
        self.components.get(id).map(String::as_str)
    }

    pub fn connection_fragment(&self, id: &ConnectionId) -> Option<&str> {
        self.connections.get(id).map(|f| f.markup.as_str())
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn to_svg(&self, viewport: &Viewport, canvas: Size, theme: &Theme) -> String {
        let filters: BTreeSet<u32> = self
            .connections
            .values()
            .map(|f| f.roughness)
            .filter(|r| *r > 0)
            .collect();
        let defs: String = filters.into_iter().map(rough_filter).collect();

        let mut body = format!(r#"<g class="canvas" transform="{}">"#, viewport.transform());
        for markup in self.components.values() {
            body.push_str(markup);
        }
        for fragment in self.connections.values() {
            body.push_str(&fragment.markup);
        }
        body.push_str(&self.overlay);
        body.push_str("</g>");

        document(
            canvas.width,
            canvas.height,
            &theme.canvas_background,
            &defs,
            &body,
        )
    }
}
