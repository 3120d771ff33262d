use indexmap::IndexMap;

use super::geometry::{Point, Rect, Side, Size, connection_point};
use super::store::DiagramStore;
use super::types::{ComponentId, PlacedComponent};
use crate::fonts::TextMeasure;

pub const COMPONENT_WIDTH: f64 = 120.0;
pub const COMPONENT_HEIGHT: f64 = 80.0;

/// Rendered size of a component box.
pub trait Footprint {
    fn size_of(&mut self, component: &PlacedComponent) -> Size;
}

#[derive(Debug, Clone, Copy)]
pub struct FixedFootprint(pub Size);

impl Default for FixedFootprint {
    fn default() -> Self {
        Self(Size::new(COMPONENT_WIDTH, COMPONENT_HEIGHT))
    }
}

impl Footprint for FixedFootprint {
    fn size_of(&mut self, _component: &PlacedComponent) -> Size {
        self.0
    }
}

/// Grows the box horizontally when the display name does not fit.
pub struct MeasuredFootprint<T: TextMeasure> {
    measure: T,
    min: Size,
    font_size: f32,
    padding_x: f64,
}

impl<T: TextMeasure> MeasuredFootprint<T> {
    pub fn new(measure: T, min: Size, font_size: f32) -> Self {
        Self {
            measure,
            min,
            font_size,
            padding_x: 16.0,
        }
    }
}

impl<T: TextMeasure> Footprint for MeasuredFootprint<T> {
    fn size_of(&mut self, component: &PlacedComponent) -> Size {
        let cleaned = crate::svg::sanitize_text(&component.display_name);
        let (text_width, _) = self.measure.measure_text(&cleaned, self.font_size, true);
        let width = (text_width as f64 + self.padding_x * 2.0).max(self.min.width);
        Size::new(width.ceil(), self.min.height)
    }
}

/// Bounding boxes of every component, in store order.
#[derive(Debug, Clone, Default)]
pub struct BoundsMap {
    rects: IndexMap<ComponentId, Rect>,
}

impl BoundsMap {
    pub fn compute(store: &DiagramStore, footprint: &mut dyn Footprint) -> Self {
        let rects = store
            .components()
            .map(|c| (c.id.clone(), Rect::at(c.position, footprint.size_of(c))))
            .collect();
        Self { rects }
    }

    pub fn get(&self, id: &ComponentId) -> Option<&Rect> {
        self.rects.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ComponentId, &Rect)> {
        self.rects.iter()
    }

    /// Anchor coordinates of `side` on component `id`.
    pub fn anchor(&self, id: &ComponentId, side: Side) -> Option<Point> {
        self.rects.get(id).map(|r| connection_point(r, side))
    }
}
