use tracing::{debug, info};

use super::footprint::BoundsMap;
use super::geometry::{Point, Side, Size, connection_point, nearest_side};
use super::store::DiagramStore;
use super::types::{ComponentId, Connection, ConnectionId, StyleEdit};
use crate::error::{Error, Result};

pub const EDITOR_WIDTH: f64 = 200.0;
pub const EDITOR_HEIGHT: f64 = 280.0;
const EDITOR_GAP: f64 = 20.0;

/// A component side a gesture starts from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub component: ComponentId,
    pub side: Side,
}

impl Anchor {
    pub fn new(component: ComponentId, side: Side) -> Self {
        Self { component, side }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapTarget {
    pub component: ComponentId,
    pub side: Side,
    /// Midpoint of `side`, where the indicator is drawn
    pub point: Point,
}

/// Live line from the source anchor to the pointer while dragging.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub from: Point,
    pub to: Point,
    pub snap: Option<SnapTarget>,
}

#[derive(Debug, Clone, Default)]
enum Gesture {
    #[default]
    Idle,
    PointerDown {
        anchor: Anchor,
    },
    Dragging {
        anchor: Anchor,
        preview: Preview,
    },
}

/// Per-connection style editor, placed next to the click that opened it.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleEditor {
    pub connection: ConnectionId,
    pub position: Point,
}

/// Snap target for `pointer`: the first component other than `source`, in
/// store order, whose box contains the pointer.
pub fn find_snap_target(
    pointer: Point,
    source: &ComponentId,
    bounds: &BoundsMap,
) -> Option<SnapTarget> {
    bounds
        .iter()
        .filter(|(id, _)| *id != source)
        .find(|(_, rect)| rect.contains(pointer))
        .map(|(id, rect)| {
            let side = nearest_side(rect, pointer);
            SnapTarget {
                component: id.clone(),
                side,
                point: connection_point(rect, side),
            }
        })
}

/// Top-left corner of the style editor for a click at `click`.
///
/// The panel sits to the right of the click, or to the left when it would
/// overflow, and is kept inside the canvas vertically.
pub fn editor_position(click: Point, canvas: Size) -> Point {
    let mut x = click.x + EDITOR_GAP;
    if x + EDITOR_WIDTH > canvas.width {
        x = click.x - EDITOR_WIDTH - EDITOR_GAP;
    }

    let mut y = click.y - EDITOR_HEIGHT / 2.0;
    if y < 0.0 {
        y = EDITOR_GAP;
    }
    if y + EDITOR_HEIGHT > canvas.height {
        y = canvas.height - EDITOR_HEIGHT - EDITOR_GAP;
    }

    Point::new(x.max(0.0), y.max(0.0))
}

/// Connection drawing gestures plus hover, selection and the style editor.
#[derive(Debug, Clone, Default)]
pub struct ConnectionEngine {
    gesture: Gesture,
    hovered: Option<ConnectionId>,
    selected: Option<ConnectionId>,
    editor: Option<StyleEditor>,
}

impl ConnectionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer_down_on_anchor(&mut self, anchor: Anchor) {
        debug!(component = %anchor.component, side = %anchor.side, "connection gesture started");
        self.gesture = Gesture::PointerDown { anchor };
    }

    pub fn is_gesture_active(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    /// Recomputes the preview and snap target. The gesture is dropped if its
    /// source component no longer exists.
    pub fn pointer_move(&mut self, pointer: Point, bounds: &BoundsMap) {
        let anchor = match std::mem::take(&mut self.gesture) {
            Gesture::Idle => return,
            Gesture::PointerDown { anchor } | Gesture::Dragging { anchor, .. } => anchor,
        };

        let Some(from) = bounds.anchor(&anchor.component, anchor.side) else {
            debug!(component = %anchor.component, "gesture source vanished");
            return;
        };

        let preview = Preview {
            from,
            to: pointer,
            snap: find_snap_target(pointer, &anchor.component, bounds),
        };
        self.gesture = Gesture::Dragging { anchor, preview };
    }

    pub fn preview(&self) -> Option<&Preview> {
        match &self.gesture {
            Gesture::Dragging { preview, .. } => Some(preview),
            _ => None,
        }
    }

    /// Ends the gesture. A snap target at `pointer` becomes a new connection;
    /// anything else is [`Error::NoSnapTarget`]. The preview is gone either way.
    pub fn release(
        &mut self,
        pointer: Point,
        store: &mut DiagramStore,
        bounds: &BoundsMap,
    ) -> Result<ConnectionId> {
        let anchor = match std::mem::take(&mut self.gesture) {
            Gesture::Idle => return Err(Error::NoSnapTarget),
            Gesture::PointerDown { anchor } | Gesture::Dragging { anchor, .. } => anchor,
        };

        let target = find_snap_target(pointer, &anchor.component, bounds).ok_or_else(|| {
            debug!(component = %anchor.component, "released over empty canvas");
            Error::NoSnapTarget
        })?;

        let connection =
            store.add_connection(&anchor.component, anchor.side, &target.component, target.side)?;
        Ok(connection.id.clone())
    }

    pub fn hover_enter(&mut self, id: &ConnectionId) {
        self.hovered = Some(id.clone());
    }

    /// Only clears the hover if `id` is the hovered connection.
    pub fn hover_leave(&mut self, id: &ConnectionId) {
        if self.hovered.as_ref() == Some(id) {
            self.hovered = None;
        }
    }

    pub fn hovered(&self) -> Option<&ConnectionId> {
        self.hovered.as_ref()
    }

    /// Selects `id` and deselects every other connection. Returns the
    /// previous selection.
    pub fn select(&mut self, id: &ConnectionId) -> Option<ConnectionId> {
        self.selected.replace(id.clone())
    }

    pub fn deselect(&mut self) -> Option<ConnectionId> {
        self.selected.take()
    }

    pub fn selected(&self) -> Option<&ConnectionId> {
        self.selected.as_ref()
    }

    /// Selects the connection and opens its editor near `click` (screen space).
    pub fn open_editor(&mut self, id: &ConnectionId, click: Point, canvas: Size) -> &StyleEditor {
        self.select(id);
        let editor = self.editor.insert(StyleEditor {
            connection: id.clone(),
            position: editor_position(click, canvas),
        });
        debug!(id = %id, x = editor.position.x, y = editor.position.y, "style editor opened");
        editor
    }

    pub fn close_editor(&mut self) {
        self.editor = None;
    }

    pub fn editor(&self) -> Option<&StyleEditor> {
        self.editor.as_ref()
    }

    /// Applies the edit to the connection open in the editor, or to the
    /// global style when none is open. Returns the edited connection.
    pub fn apply_style_edit(
        &self,
        store: &mut DiagramStore,
        edit: StyleEdit,
    ) -> Result<Option<ConnectionId>> {
        match &self.editor {
            Some(editor) => {
                store.connection_style_mut(&editor.connection)?.apply(edit);
                debug!(id = %editor.connection, ?edit, "connection style edited");
                Ok(Some(editor.connection.clone()))
            }
            None => {
                let mut global = *store.global_style();
                global.apply(edit);
                store.set_global_style(global);
                debug!(?edit, "global style edited");
                Ok(None)
            }
        }
    }

    /// Copies the current global style onto the connection.
    pub fn reset_to_global(&self, store: &mut DiagramStore, id: &ConnectionId) -> Result<()> {
        let global = *store.global_style();
        store.set_connection_style(id, global)?;
        info!(id = %id, "connection style reset to global");
        Ok(())
    }

    pub fn delete_connection(
        &mut self,
        store: &mut DiagramStore,
        id: &ConnectionId,
    ) -> Option<Connection> {
        let removed = store.remove_connection(id);
        self.forget(id);
        removed
    }

    /// Drops hover, selection and editor state for a connection that is gone.
    pub fn forget(&mut self, id: &ConnectionId) {
        if self.editor.as_ref().is_some_and(|e| &e.connection == id) {
            self.editor = None;
        }
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        if self.hovered.as_ref() == Some(id) {
            self.hovered = None;
        }
    }

    pub fn escape(&mut self) {
        self.gesture = Gesture::Idle;
        self.editor = None;
        self.selected = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
