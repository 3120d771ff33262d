use tracing::debug;

use super::footprint::BoundsMap;
use super::geometry::{Point, Side};
use super::store::DiagramStore;
use super::types::ComponentId;
use crate::error::Result;

/// Pointer travel, in screen pixels per axis, below which a drag counts as a click.
pub const DRAG_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone)]
struct DragState {
    component: ComponentId,
    pointer_start: Point,
    origin: Point,
    moved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    /// Released within the threshold; the component did not move.
    Click(ComponentId),
    Moved(ComponentId),
}

/// Drag tracking, connect mode and hand mode for placed components.
#[derive(Debug, Clone, Default)]
pub struct ComponentEntityManager {
    drag: Option<DragState>,
    connect_mode: Option<ComponentId>,
    hand_mode: bool,
}

impl ComponentEntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a drag. Ignored in hand mode or for unknown components.
    pub fn begin_drag(&mut self, store: &DiagramStore, id: &ComponentId, pointer: Point) -> bool {
        if self.hand_mode {
            return false;
        }
        let Some(component) = store.component(id) else {
            return false;
        };
        self.drag = Some(DragState {
            component: id.clone(),
            pointer_start: pointer,
            origin: component.position,
            moved: false,
        });
        debug!(id = %id, "drag started");
        true
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn dragged(&self) -> Option<&ComponentId> {
        self.drag.as_ref().map(|d| &d.component)
    }

    /// Moves the dragged component by the screen delta divided by `zoom`.
    /// Returns `true` when the store was changed.
    pub fn update_drag(&mut self, store: &mut DiagramStore, pointer: Point, zoom: f64) -> Result<bool> {
        let Some(drag) = self.drag.as_mut() else {
            return Ok(false);
        };

        let dx = pointer.x - drag.pointer_start.x;
        let dy = pointer.y - drag.pointer_start.y;
        if !drag.moved && dx.abs() <= DRAG_THRESHOLD && dy.abs() <= DRAG_THRESHOLD {
            return Ok(false);
        }
        drag.moved = true;

        let position = drag.origin.offset(dx / zoom, dy / zoom);
        if let Err(e) = store.move_component(&drag.component, position) {
            self.drag = None;
            return Err(e);
        }
        Ok(true)
    }

    pub fn end_drag(&mut self) -> Option<DragOutcome> {
        let drag = self.drag.take()?;
        let outcome = if drag.moved {
            DragOutcome::Moved(drag.component)
        } else {
            DragOutcome::Click(drag.component)
        };
        debug!(?outcome, "drag ended");
        Some(outcome)
    }

    /// Same component turns connect mode off, another one moves it there.
    /// Returns the component now in connect mode.
    pub fn toggle_connect_mode(&mut self, id: &ComponentId) -> Option<&ComponentId> {
        if self.hand_mode {
            return None;
        }
        if self.connect_mode.as_ref() == Some(id) {
            self.connect_mode = None;
        } else {
            self.connect_mode = Some(id.clone());
        }
        self.connect_mode.as_ref()
    }

    pub fn connect_mode(&self) -> Option<&ComponentId> {
        self.connect_mode.as_ref()
    }

    pub fn clear_connect_mode(&mut self) {
        self.connect_mode = None;
    }

    /// The four anchors of the component in connect mode.
    pub fn connection_points(&self, bounds: &BoundsMap) -> Vec<(Side, Point)> {
        let Some(id) = self.connect_mode.as_ref() else {
            return Vec::new();
        };
        Side::ALL
            .iter()
            .filter_map(|&side| bounds.anchor(id, side).map(|p| (side, p)))
            .collect()
    }

    pub fn hand_mode(&self) -> bool {
        self.hand_mode
    }

    /// Entering hand mode drops connect mode and any drag in progress.
    pub fn toggle_hand_mode(&mut self) -> bool {
        self.hand_mode = !self.hand_mode;
        if self.hand_mode {
            self.connect_mode = None;
            self.drag = None;
        }
        self.hand_mode
    }

    /// Drops any state that refers to a removed component.
    pub fn forget(&mut self, id: &ComponentId) {
        if self.connect_mode.as_ref() == Some(id) {
            self.connect_mode = None;
        }
        if self.drag.as_ref().is_some_and(|d| &d.component == id) {
            self.drag = None;
        }
    }

    pub fn reset(&mut self) {
        self.drag = None;
        self.connect_mode = None;
    }
}
