use tracing::debug;

use super::geometry::{Point, Rect, Size};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 5.0;
const ZOOM_STEP: f64 = 1.2;
const WHEEL_OUT: f64 = 0.9;
const WHEEL_IN: f64 = 1.1;
/// Margin kept around the diagram by fit-to-bounds, in logical pixels.
pub const FIT_PADDING: f64 = 50.0;

fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        1.0
    }
}

/// Pan/zoom transform from canvas space to screen space:
/// `screen = canvas * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    zoom: f64,
    pan: Point,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Point::ORIGIN,
        }
    }
}

impl Viewport {
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> Point {
        self.pan
    }

    /// Clamped to `[MIN_ZOOM, MAX_ZOOM]`; non-finite input resets to 1.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = clamp_zoom(zoom);
    }

    pub fn set_pan(&mut self, pan: Point) {
        self.pan = pan;
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / ZOOM_STEP);
    }

    /// Positive `delta_y` (scrolling down) zooms out, negative zooms in.
    /// A zero delta (horizontal-only scroll) leaves the zoom alone.
    pub fn wheel(&mut self, delta_y: f64) {
        if delta_y > 0.0 {
            self.set_zoom(self.zoom * WHEEL_OUT);
        } else if delta_y < 0.0 {
            self.set_zoom(self.zoom * WHEEL_IN);
        }
    }

    pub fn reset(&mut self) {
        *self = Viewport::default();
    }

    /// Translate by a raw screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan = self.pan.offset(dx, dy);
    }

    pub fn screen_to_canvas(&self, p: Point) -> Point {
        Point::new((p.x - self.pan.x) / self.zoom, (p.y - self.pan.y) / self.zoom)
    }

    pub fn canvas_to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.zoom + self.pan.x, p.y * self.zoom + self.pan.y)
    }

    /// SVG transform attribute for the canvas group
    pub fn transform(&self) -> String {
        format!(
            "translate({:.2},{:.2}) scale({:.4})",
            self.pan.x, self.pan.y, self.zoom
        )
    }

    /// Scale and centre the diagram inside `canvas`.
    ///
    /// Every component counts with the same `footprint` from its position.
    /// The scale never exceeds 1.0. With no components this is a reset.
    pub fn fit_to_bounds<I>(&mut self, positions: I, footprint: Size, canvas: Size)
    where
        I: IntoIterator<Item = Point>,
    {
        let bounds = positions
            .into_iter()
            .map(|p| Rect::at(p, footprint))
            .reduce(|acc, r| acc.union(&r));

        let Some(bounds) = bounds else {
            self.reset();
            return;
        };

        let padded = bounds.with_padding(FIT_PADDING);
        let scale = (canvas.width / padded.width)
            .min(canvas.height / padded.height)
            .min(1.0);
        self.set_zoom(scale);

        let zoom = self.zoom;
        self.pan = Point::new(
            (canvas.width - padded.width * zoom) / 2.0 - padded.x * zoom,
            (canvas.height - padded.height * zoom) / 2.0 - padded.y * zoom,
        );
        debug!(zoom, pan_x = self.pan.x, pan_y = self.pan.y, "fit to bounds");
    }
}

/// Hand-mode pan gesture. Pan deltas are screen pixels and are not divided by zoom.
#[derive(Debug, Clone, Default)]
pub struct PanGesture {
    last: Option<Point>,
}

impl PanGesture {
    pub fn is_active(&self) -> bool {
        self.last.is_some()
    }

    pub fn begin(&mut self, pointer: Point) {
        self.last = Some(pointer);
    }

    pub fn update(&mut self, viewport: &mut Viewport, pointer: Point) {
        if let Some(last) = self.last {
            viewport.pan_by(pointer.x - last.x, pointer.y - last.y);
            self.last = Some(pointer);
        }
    }

    pub fn end(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zoom_steps_multiply_by_one_point_two() {
        let mut v = Viewport::default();
        v.zoom_in();
        assert!((v.zoom() - 1.2).abs() < 1e-12);
        v.zoom_out();
        v.zoom_out();
        assert!((v.zoom() - 1.0 / 1.2).abs() < 1e-12);
    }

    #[test]
    fn wheel_direction_and_zero_delta() {
        let mut v = Viewport::default();
        v.wheel(120.0);
        assert!((v.zoom() - 0.9).abs() < 1e-12);
        v.wheel(-120.0);
        assert!((v.zoom() - 0.99).abs() < 1e-12);
        v.wheel(0.0);
        assert!((v.zoom() - 0.99).abs() < 1e-12);
    }

    #[test]
    fn reset_restores_identity() {
        let mut v = Viewport::default();
        v.zoom_in();
        v.pan_by(30.0, -12.0);
        v.reset();
        assert_eq!(v, Viewport::default());
    }

    #[test]
    fn screen_and_canvas_mapping_are_inverse() {
        let mut v = Viewport::default();
        v.set_zoom(2.0);
        v.set_pan(Point::new(40.0, -10.0));
        let canvas = Point::new(100.0, 50.0);
        let screen = v.canvas_to_screen(canvas);
        assert_eq!(screen, Point::new(240.0, 90.0));
        assert_eq!(v.screen_to_canvas(screen), canvas);
    }

    #[test]
    fn fit_centres_and_caps_scale_at_one() {
        let mut v = Viewport::default();
        v.fit_to_bounds(
            [Point::new(100.0, 100.0)],
            Size::new(120.0, 80.0),
            Size::new(1000.0, 800.0),
        );
        assert_eq!(v.zoom(), 1.0);
        // padded box is 220 x 180 at (50, 50)
        let centre = v.canvas_to_screen(Point::new(160.0, 140.0));
        assert!((centre.x - 500.0).abs() < 1e-9);
        assert!((centre.y - 400.0).abs() < 1e-9);
    }

    #[test]
    fn fit_shrinks_wide_diagrams() {
        let mut v = Viewport::default();
        v.fit_to_bounds(
            [Point::new(0.0, 0.0), Point::new(1880.0, 0.0)],
            Size::new(120.0, 80.0),
            Size::new(1050.0, 600.0),
        );
        // padded width is 2100
        assert!((v.zoom() - 0.5).abs() < 1e-12);
        let left = v.canvas_to_screen(Point::new(-FIT_PADDING, 0.0));
        assert!(left.x.abs() < 1e-9);
    }

    #[test]
    fn fit_with_nothing_resets() {
        let mut v = Viewport::default();
        v.set_zoom(3.0);
        v.fit_to_bounds(std::iter::empty(), Size::new(120.0, 80.0), Size::new(800.0, 600.0));
        assert_eq!(v, Viewport::default());
    }

    #[test]
    fn fit_respects_minimum_zoom() {
        let mut v = Viewport::default();
        v.fit_to_bounds(
            [Point::new(0.0, 0.0), Point::new(1.0e6, 1.0e6)],
            Size::new(120.0, 80.0),
            Size::new(800.0, 600.0),
        );
        assert_eq!(v.zoom(), MIN_ZOOM);
    }

    #[test]
    fn pan_uses_raw_screen_delta() {
        let mut v = Viewport::default();
        v.set_zoom(2.5);
        let mut pan = PanGesture::default();
        pan.begin(Point::new(10.0, 10.0));
        pan.update(&mut v, Point::new(30.0, 5.0));
        pan.update(&mut v, Point::new(35.0, 5.0));
        pan.end();
        pan.update(&mut v, Point::new(500.0, 500.0));
        assert_eq!(v.pan(), Point::new(25.0, -5.0));
    }

    #[derive(Debug, Clone)]
    enum ZoomOp {
        In,
        Out,
        Wheel(f64),
    }

    proptest! {
        #[test]
        fn zoom_stays_in_range(ops in prop::collection::vec(
            prop_oneof![
                Just(ZoomOp::In),
                Just(ZoomOp::Out),
                (-500.0f64..500.0).prop_map(ZoomOp::Wheel),
            ],
            0..200,
        )) {
            let mut v = Viewport::default();
            for op in ops {
                match op {
                    ZoomOp::In => v.zoom_in(),
                    ZoomOp::Out => v.zoom_out(),
                    ZoomOp::Wheel(d) => v.wheel(d),
                }
                prop_assert!(v.zoom() >= MIN_ZOOM && v.zoom() <= MAX_ZOOM);
            }
        }
    }
}
