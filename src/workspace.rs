//! The editing session: one object that owns the store and every piece of
//! interaction state, and turns canvas events into store mutations.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::diagram::connection::{Anchor, ConnectionEngine};
use crate::diagram::entity::{ComponentEntityManager, DragOutcome};
use crate::diagram::footprint::{BoundsMap, Footprint};
use crate::diagram::geometry::{Point, Side, Size};
use crate::diagram::render::{RenderContext, Scene, render_connection_points, render_preview};
use crate::diagram::store::DiagramStore;
use crate::diagram::types::{ComponentId, ComponentSpec, ConnectionId, StyleEdit};
use crate::diagram::viewport::PanGesture;
use crate::error::{Error, Result};
use crate::export::ExportDocument;
use crate::notify::{Notifier, Severity};
use crate::persist::{Autosave, SnapshotStorage};
use crate::theme::Theme;

/// What a pointer-down landed on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PointerTarget {
    Canvas,
    Component { id: ComponentId },
    Anchor { id: ComponentId, side: Side },
}

/// Input from the host UI. Coordinates are screen pixels relative to the canvas.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum CanvasEvent {
    DropComponent {
        component: ComponentSpec,
        x: f64,
        y: f64,
    },
    PointerDown {
        target: PointerTarget,
        x: f64,
        y: f64,
    },
    PointerMove {
        x: f64,
        y: f64,
    },
    PointerUp {
        x: f64,
        y: f64,
    },
    ToggleConnectMode {
        id: ComponentId,
    },
    ClickConnection {
        id: ConnectionId,
        x: f64,
        y: f64,
    },
    HoverConnection {
        id: ConnectionId,
    },
    LeaveConnection {
        id: ConnectionId,
    },
    EditStyle {
        edit: StyleEdit,
    },
    /// Without an id, resets the connection open in the editor.
    ResetToGlobal {
        #[serde(default)]
        id: Option<ConnectionId>,
    },
    DeleteConnection {
        id: ConnectionId,
    },
    DeleteComponent {
        id: ComponentId,
    },
    CloseEditor,
    Clear,
    ZoomIn,
    ZoomOut,
    Wheel {
        #[serde(rename = "deltaY")]
        delta_y: f64,
    },
    ResetZoom,
    FitToBounds,
    ToggleHandMode,
    Escape,
}

pub struct Workspace<S: SnapshotStorage, N: Notifier> {
    store: DiagramStore,
    bounds: BoundsMap,
    footprint: Box<dyn Footprint>,
    scene: Scene,
    entities: ComponentEntityManager,
    connections: ConnectionEngine,
    pan: PanGesture,
    theme: Theme,
    canvas: Size,
    fit_footprint: Size,
    storage: S,
    notifier: N,
    autosave: Autosave,
}

impl<S: SnapshotStorage, N: Notifier> Workspace<S, N> {
    /// Loads whatever `storage` holds. A missing, unreadable or damaged
    /// snapshot never prevents startup; the problems are reported instead.
    pub fn open(config: &Config, storage: S, mut notifier: N, now: Instant) -> Result<Self> {
        let theme = config.resolve_theme()?;
        let footprint = config.footprint.build(theme.font_size);

        let (store, clean) = match storage.load() {
            Ok(None) => (DiagramStore::new(), true),
            Ok(Some(text)) => {
                let (store, issues) = DiagramStore::from_json(&text);
                if !issues.is_empty() {
                    notifier.notify(
                        &format!(
                            "Saved diagram was partly damaged; {} item(s) could not be restored",
                            issues.len()
                        ),
                        Severity::Warning,
                    );
                }
                let clean = issues.is_empty();
                (store, clean)
            }
            Err(e) => {
                warn!("failed to read saved diagram: {}", e);
                notifier.notify("Could not read the saved diagram", Severity::Warning);
                (DiagramStore::new(), true)
            }
        };

        let autosave = Autosave::new(config.autosave_interval(), now);
        let autosave = if clean {
            autosave.synced(store.revision())
        } else {
            autosave
        };

        let mut workspace = Self {
            store,
            bounds: BoundsMap::default(),
            footprint,
            scene: Scene::new(),
            entities: ComponentEntityManager::new(),
            connections: ConnectionEngine::new(),
            pan: PanGesture::default(),
            theme,
            canvas: config.canvas.size(),
            fit_footprint: config.footprint.size(),
            storage,
            notifier,
            autosave,
        };
        workspace.refresh_bounds();
        workspace.redraw_all();
        info!(
            components = workspace.store.component_count(),
            connections = workspace.store.connection_count(),
            "workspace opened"
        );
        Ok(workspace)
    }

    pub fn store(&self) -> &DiagramStore {
        &self.store
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn bounds(&self) -> &BoundsMap {
        &self.bounds
    }

    pub fn entities(&self) -> &ComponentEntityManager {
        &self.entities
    }

    pub fn connections(&self) -> &ConnectionEngine {
        &self.connections
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    pub fn canvas(&self) -> Size {
        self.canvas
    }

    pub fn handle(&mut self, event: CanvasEvent) -> Result<()> {
        debug!(?event, "canvas event");
        match event {
            CanvasEvent::DropComponent { component, x, y } => {
                self.drop_component(component, Point::new(x, y));
            }
            CanvasEvent::PointerDown { target, x, y } => self.pointer_down(target, Point::new(x, y)),
            CanvasEvent::PointerMove { x, y } => self.pointer_move(Point::new(x, y)),
            CanvasEvent::PointerUp { x, y } => self.pointer_up(Point::new(x, y)),
            CanvasEvent::ToggleConnectMode { id } => {
                self.toggle_connect_mode(&id)?;
            }
            CanvasEvent::ClickConnection { id, x, y } => self.click_connection(&id, Point::new(x, y))?,
            CanvasEvent::HoverConnection { id } => self.hover_connection(&id),
            CanvasEvent::LeaveConnection { id } => self.leave_connection(&id),
            CanvasEvent::EditStyle { edit } => self.apply_style_edit(edit)?,
            CanvasEvent::ResetToGlobal { id } => {
                let target =
                    id.or_else(|| self.connections.editor().map(|e| e.connection.clone()));
                match target {
                    Some(id) => self.reset_to_global(&id)?,
                    None => debug!("reset to global with no connection open"),
                }
            }
            CanvasEvent::DeleteConnection { id } => {
                self.delete_connection(&id);
            }
            CanvasEvent::DeleteComponent { id } => {
                self.delete_component(&id);
            }
            CanvasEvent::CloseEditor => self.close_editor(),
            CanvasEvent::Clear => self.clear(),
            CanvasEvent::ZoomIn => self.store.viewport_mut().zoom_in(),
            CanvasEvent::ZoomOut => self.store.viewport_mut().zoom_out(),
            CanvasEvent::Wheel { delta_y } => self.wheel(delta_y),
            CanvasEvent::ResetZoom => self.store.viewport_mut().reset(),
            CanvasEvent::FitToBounds => self.fit_to_bounds(),
            CanvasEvent::ToggleHandMode => {
                self.toggle_hand_mode();
            }
            CanvasEvent::Escape => self.escape(),
        }
        Ok(())
    }

    /// Places a palette component at a screen position.
    pub fn drop_component(&mut self, spec: ComponentSpec, at: Point) -> ComponentId {
        let position = self.store.viewport().screen_to_canvas(at);
        let component = self.store.add_component(spec, position);
        let id = component.id.clone();
        let message = format!("Added {}", component.display_name);

        self.refresh_bounds();
        self.redraw_component(&id);
        self.notifier.notify(&message, Severity::Success);
        self.persist();
        id
    }

    /// Same as [`Workspace::drop_component`] for a raw JSON drag payload.
    pub fn drop_payload(&mut self, payload: &str, at: Point) -> Result<ComponentId> {
        match ComponentSpec::from_payload(payload) {
            Ok(spec) => Ok(self.drop_component(spec, at)),
            Err(e) => {
                self.notifier.notify(&e.to_string(), Severity::Error);
                Err(e)
            }
        }
    }

    pub fn pointer_down(&mut self, target: PointerTarget, at: Point) {
        if self.entities.hand_mode() {
            self.pan.begin(at);
            return;
        }
        match target {
            PointerTarget::Canvas => {}
            PointerTarget::Component { id } => {
                self.entities.begin_drag(&self.store, &id, at);
            }
            PointerTarget::Anchor { id, side } => {
                if self.store.component(&id).is_some() {
                    self.connections.pointer_down_on_anchor(Anchor::new(id, side));
                }
            }
        }
    }

    pub fn pointer_move(&mut self, at: Point) {
        if self.pan.is_active() {
            self.pan.update(self.store.viewport_mut(), at);
            return;
        }

        if self.entities.is_dragging() {
            let zoom = self.store.viewport().zoom();
            match self.entities.update_drag(&mut self.store, at, zoom) {
                Ok(true) => {
                    if let Some(id) = self.entities.dragged().cloned() {
                        self.refresh_bounds();
                        self.redraw_component(&id);
                        self.redraw_overlay();
                    }
                }
                Ok(false) => {}
                Err(e) => warn!("drag aborted: {}", e),
            }
            return;
        }

        if self.connections.is_gesture_active() {
            let canvas_point = self.store.viewport().screen_to_canvas(at);
            self.connections.pointer_move(canvas_point, &self.bounds);
            self.redraw_overlay();
        }
    }

    pub fn pointer_up(&mut self, at: Point) {
        if self.pan.is_active() {
            self.pan.end();
            return;
        }

        if let Some(outcome) = self.entities.end_drag() {
            match outcome {
                DragOutcome::Click(id) => {
                    if let Err(e) = self.toggle_connect_mode(&id) {
                        debug!("click on vanished component: {}", e);
                    }
                }
                DragOutcome::Moved(_) => self.persist(),
            }
            return;
        }

        if self.connections.is_gesture_active() {
            let canvas_point = self.store.viewport().screen_to_canvas(at);
            let result = self
                .connections
                .release(canvas_point, &mut self.store, &self.bounds);
            match result {
                Ok(id) => {
                    self.clear_connect_mode();
                    self.redraw_connection(&id);
                    self.notifier.notify("Connection created", Severity::Success);
                    self.persist();
                }
                Err(Error::NoSnapTarget) => {}
                Err(e) => {
                    warn!("connection rejected: {}", e);
                    self.notifier.notify(&e.to_string(), Severity::Error);
                }
            }
            self.redraw_overlay();
        }
    }

    /// Returns the component now in connect mode, if any.
    pub fn toggle_connect_mode(&mut self, id: &ComponentId) -> Result<Option<ComponentId>> {
        if self.store.component(id).is_none() {
            return Err(Error::UnknownComponent { id: id.to_string() });
        }
        let previous = self.entities.connect_mode().cloned();
        let current = self.entities.toggle_connect_mode(id).cloned();

        if let Some(previous) = previous.filter(|p| p != id) {
            self.redraw_component(&previous);
        }
        self.redraw_component(id);
        self.redraw_overlay();
        Ok(current)
    }

    fn clear_connect_mode(&mut self) {
        if let Some(previous) = self.entities.connect_mode().cloned() {
            self.entities.clear_connect_mode();
            self.redraw_component(&previous);
        }
    }

    /// Selects the connection and opens its style editor next to the click.
    pub fn click_connection(&mut self, id: &ConnectionId, at: Point) -> Result<()> {
        if self.store.connection(id).is_none() {
            return Err(Error::UnknownConnection { id: id.to_string() });
        }
        let previous = self.connections.selected().cloned();
        self.connections.open_editor(id, at, self.canvas);
        if let Some(previous) = previous.filter(|p| p != id) {
            self.redraw_connection(&previous);
        }
        self.redraw_connection(id);
        Ok(())
    }

    pub fn close_editor(&mut self) {
        self.connections.close_editor();
        if let Some(previous) = self.connections.deselect() {
            self.redraw_connection(&previous);
        }
    }

    pub fn hover_connection(&mut self, id: &ConnectionId) {
        let previous = self.connections.hovered().cloned();
        self.connections.hover_enter(id);
        if let Some(previous) = previous.filter(|p| p != id) {
            self.redraw_connection(&previous);
        }
        self.redraw_connection(id);
    }

    pub fn leave_connection(&mut self, id: &ConnectionId) {
        self.connections.hover_leave(id);
        self.redraw_connection(id);
    }

    /// Edits the connection open in the editor, or the global style.
    pub fn apply_style_edit(&mut self, edit: StyleEdit) -> Result<()> {
        if let Some(id) = self.connections.apply_style_edit(&mut self.store, edit)? {
            self.redraw_connection(&id);
        }
        self.persist();
        Ok(())
    }

    pub fn reset_to_global(&mut self, id: &ConnectionId) -> Result<()> {
        self.connections.reset_to_global(&mut self.store, id)?;
        self.redraw_connection(id);
        self.persist();
        Ok(())
    }

    pub fn delete_connection(&mut self, id: &ConnectionId) -> bool {
        if self.connections.delete_connection(&mut self.store, id).is_none() {
            return false;
        }
        self.redraw_connection(id);
        self.notifier.notify("Connection deleted", Severity::Info);
        self.persist();
        true
    }

    /// Removes the component and its connections. Unknown ids are ignored.
    pub fn delete_component(&mut self, id: &ComponentId) -> bool {
        let Some(name) = self.store.component(id).map(|c| c.display_name.clone()) else {
            return false;
        };

        let cascaded = self.store.remove_component(id);
        self.entities.forget(id);
        for connection in &cascaded {
            self.connections.forget(connection);
        }

        self.refresh_bounds();
        self.redraw_component(id);
        self.redraw_overlay();
        self.notifier.notify(&format!("Removed {}", name), Severity::Info);
        self.persist();
        true
    }

    pub fn clear(&mut self) {
        self.store.clear();
        self.entities.reset();
        self.connections.reset();
        self.refresh_bounds();
        self.redraw_all();
        self.notifier.notify("Canvas cleared", Severity::Info);
        self.persist();
    }

    pub fn wheel(&mut self, delta_y: f64) {
        if delta_y != 0.0 {
            self.store.viewport_mut().wheel(delta_y);
        }
    }

    pub fn fit_to_bounds(&mut self) {
        let positions: Vec<Point> = self.store.components().map(|c| c.position).collect();
        let (footprint, canvas) = (self.fit_footprint, self.canvas);
        self.store
            .viewport_mut()
            .fit_to_bounds(positions, footprint, canvas);
    }

    /// Returns whether hand mode is now on.
    pub fn toggle_hand_mode(&mut self) -> bool {
        let previous = self.entities.connect_mode().cloned();
        let on = self.entities.toggle_hand_mode();
        if !on {
            self.pan.end();
        }
        if let Some(previous) = previous {
            self.redraw_component(&previous);
        }
        self.redraw_overlay();
        debug!(on, "hand mode");
        on
    }

    /// Closes the editor and drops selection, connect mode and any gesture.
    pub fn escape(&mut self) {
        let selected = self.connections.selected().cloned();
        self.connections.escape();
        if let Some(selected) = selected {
            self.redraw_connection(&selected);
        }
        self.clear_connect_mode();
        self.redraw_overlay();
    }

    /// Writes the snapshot if the autosave interval has passed and something
    /// changed since the last write. Returns whether a write was attempted.
    pub fn tick(&mut self, now: Instant) -> bool {
        if !self.autosave.due(now, self.store.revision()) {
            return false;
        }
        self.persist_at(now);
        true
    }

    /// Writes the snapshot now if it changed since the last write.
    pub fn flush(&mut self) {
        self.persist();
    }

    /// Builds the export document, or warns when there is nothing to export.
    pub fn export(&mut self, now: DateTime<Utc>) -> Option<ExportDocument> {
        match ExportDocument::from_store(&self.store, now) {
            Some(document) => {
                self.notifier
                    .notify("Architecture exported successfully!", Severity::Success);
                Some(document)
            }
            None => {
                self.notifier.notify("No components to export", Severity::Warning);
                None
            }
        }
    }

    pub fn svg(&self) -> String {
        self.scene
            .to_svg(self.store.viewport(), self.canvas, &self.theme)
    }

    fn persist(&mut self) {
        self.persist_at(Instant::now());
    }

    fn persist_at(&mut self, now: Instant) {
        let revision = self.store.revision();
        if !self.autosave.is_dirty(revision) {
            return;
        }
        let written = self
            .store
            .serialize()
            .to_json()
            .and_then(|json| self.storage.save(&json));
        match written {
            Ok(()) => self.autosave.mark_saved(revision, now),
            Err(e) => {
                warn!("failed to save diagram: {}", e);
                self.autosave.defer(now);
            }
        }
    }

    fn refresh_bounds(&mut self) {
        self.bounds = BoundsMap::compute(&self.store, self.footprint.as_mut());
    }

    fn redraw_component(&mut self, id: &ComponentId) {
        let ctx = RenderContext {
            hovered: self.connections.hovered(),
            selected: self.connections.selected(),
            connect_mode: self.entities.connect_mode(),
            ..RenderContext::new(&self.store, &self.bounds, &self.theme)
        };
        self.scene.refresh_component(&ctx, id);
    }

    fn redraw_connection(&mut self, id: &ConnectionId) {
        let ctx = RenderContext {
            hovered: self.connections.hovered(),
            selected: self.connections.selected(),
            connect_mode: self.entities.connect_mode(),
            ..RenderContext::new(&self.store, &self.bounds, &self.theme)
        };
        self.scene.refresh_connection(&ctx, id);
    }

    fn redraw_all(&mut self) {
        let ctx = RenderContext {
            hovered: self.connections.hovered(),
            selected: self.connections.selected(),
            connect_mode: self.entities.connect_mode(),
            ..RenderContext::new(&self.store, &self.bounds, &self.theme)
        };
        self.scene.rebuild(&ctx);
        self.redraw_overlay();
    }

    fn redraw_overlay(&mut self) {
        let mut overlay = render_connection_points(
            &self.entities.connection_points(&self.bounds),
            &self.theme,
        );
        if let Some(preview) = self.connections.preview() {
            overlay.push_str(&render_preview(preview, &self.theme));
        }
        self.scene.set_overlay(overlay);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::diagram::types::{ComponentKind, StrokeStyle};
    use crate::notify::RecordingNotifier;
    use crate::persist::MemoryStorage;

    type TestWorkspace = Workspace<MemoryStorage, RecordingNotifier>;

    fn open_with(storage: MemoryStorage) -> TestWorkspace {
        Workspace::open(
            &Config::default(),
            storage,
            RecordingNotifier::default(),
            Instant::now(),
        )
        .unwrap()
    }

    fn open() -> TestWorkspace {
        open_with(MemoryStorage::default())
    }

    /// Two components, A at (100,100) and B at (400,100).
    fn with_two(ws: &mut TestWorkspace) -> (ComponentId, ComponentId) {
        let a = ws.drop_component(
            ComponentSpec::new(ComponentKind::Service, "API", 30),
            Point::new(100.0, 100.0),
        );
        let b = ws.drop_component(
            ComponentSpec::new(ComponentKind::Database, "DB", 45),
            Point::new(400.0, 100.0),
        );
        (a, b)
    }

    fn connect(ws: &mut TestWorkspace, a: &ComponentId) -> ConnectionId {
        ws.pointer_down(
            PointerTarget::Anchor {
                id: a.clone(),
                side: Side::Right,
            },
            Point::new(220.0, 140.0),
        );
        ws.pointer_move(Point::new(410.0, 140.0));
        ws.pointer_up(Point::new(410.0, 140.0));
        ws.store().connections().last().unwrap().id.clone()
    }

    #[test]
    fn drop_places_component_in_canvas_space_and_saves() {
        let mut ws = open();
        ws.store.viewport_mut().set_zoom(2.0);
        ws.store.viewport_mut().set_pan(Point::new(20.0, 20.0));
        let id = ws.drop_component(
            ComponentSpec::new(ComponentKind::Cloud, "VPC", 0),
            Point::new(220.0, 120.0),
        );
        assert_eq!(ws.store().component(&id).unwrap().position, Point::new(100.0, 50.0));
        assert_eq!(ws.storage().writes, 1);
        assert!(ws.scene().component_fragment(&id).is_some());
        assert_eq!(ws.notifier().last().unwrap().1, Severity::Success);
    }

    #[test]
    fn bad_payload_is_reported() {
        let mut ws = open();
        assert!(ws.drop_payload("{\"kind\":\"nope\"}", Point::ORIGIN).is_err());
        assert_eq!(ws.notifier().count(Severity::Error), 1);
        assert!(ws.store().is_empty());

        let id = ws
            .drop_payload(
                r#"{"type":"queue","name":"Jobs","cost":"12"}"#,
                Point::new(5.0, 5.0),
            )
            .unwrap();
        assert_eq!(ws.store().component(&id).unwrap().monthly_cost, 12);
    }

    #[test]
    fn click_toggles_connect_mode_and_drag_moves() {
        let mut ws = open();
        let (a, _) = with_two(&mut ws);

        ws.pointer_down(PointerTarget::Component { id: a.clone() }, Point::new(150.0, 140.0));
        ws.pointer_move(Point::new(152.0, 141.0));
        ws.pointer_up(Point::new(152.0, 141.0));
        assert_eq!(ws.entities().connect_mode(), Some(&a));
        assert!(ws.svg().contains("connection-point"));

        let writes = ws.storage().writes;
        ws.pointer_down(PointerTarget::Component { id: a.clone() }, Point::new(150.0, 140.0));
        ws.pointer_move(Point::new(180.0, 160.0));
        ws.pointer_up(Point::new(180.0, 160.0));
        assert_eq!(ws.store().component(&a).unwrap().position, Point::new(130.0, 120.0));
        assert_eq!(ws.storage().writes, writes + 1);
    }

    #[test]
    fn drawing_a_connection_end_to_end() {
        let mut ws = open();
        let (a, b) = with_two(&mut ws);
        ws.toggle_connect_mode(&a).unwrap();

        let id = connect(&mut ws, &a);
        let conn = ws.store().connection(&id).unwrap();
        assert_eq!(conn.to_component_id, b);
        assert_eq!(conn.to_side, Side::Left);
        assert!(ws.entities().connect_mode().is_none());
        assert!(ws.connections().preview().is_none());
        assert!(ws.scene().connection_fragment(&id).is_some());
        assert!(!ws.svg().contains("connection-preview"));
    }

    #[test]
    fn release_over_nothing_is_silent() {
        let mut ws = open();
        let (a, _) = with_two(&mut ws);
        let messages = ws.notifier().messages.len();
        let writes = ws.storage().writes;

        ws.pointer_down(
            PointerTarget::Anchor {
                id: a,
                side: Side::Bottom,
            },
            Point::new(160.0, 180.0),
        );
        ws.pointer_move(Point::new(300.0, 500.0));
        assert!(ws.svg().contains("connection-preview"));
        ws.pointer_up(Point::new(300.0, 500.0));

        assert_eq!(ws.store().connection_count(), 0);
        assert_eq!(ws.notifier().messages.len(), messages);
        assert_eq!(ws.storage().writes, writes);
        assert!(!ws.svg().contains("connection-preview"));
    }

    #[test]
    fn editing_and_resetting_through_events() {
        let mut ws = open();
        let (a, _) = with_two(&mut ws);
        let id = connect(&mut ws, &a);

        let events: Vec<CanvasEvent> = serde_json::from_str(&format!(
            r#"[
                {{"event":"clickConnection","id":"{id}","x":300,"y":140}},
                {{"event":"editStyle","edit":{{"option":"strokeWidth","value":5}}}},
                {{"event":"editStyle","edit":{{"option":"strokeStyle","value":"dashed"}}}},
                {{"event":"closeEditor"}},
                {{"event":"editStyle","edit":{{"option":"strokeWidth","value":8}}}}
            ]"#,
            id = id
        ))
        .unwrap();
        for event in events {
            ws.handle(event).unwrap();
        }

        let style = ws.store().connection(&id).unwrap().style;
        assert_eq!(style.stroke_width, 5);
        assert_eq!(style.stroke_style, StrokeStyle::Dashed);
        assert_eq!(ws.store().global_style().stroke_width, 8);

        ws.handle(CanvasEvent::ResetToGlobal { id: Some(id.clone()) }).unwrap();
        assert_eq!(ws.store().connection(&id).unwrap().style.stroke_width, 8);
        assert!(!ws.scene().connection_fragment(&id).unwrap().contains("stroke-dasharray"));
    }

    #[test]
    fn hover_and_selection_are_reflected_in_the_scene() {
        let mut ws = open();
        let (a, _) = with_two(&mut ws);
        let id = connect(&mut ws, &a);
        let hover = ws.theme().hover_stroke.clone();

        ws.hover_connection(&id);
        assert!(ws.scene().connection_fragment(&id).unwrap().contains(&hover));
        ws.leave_connection(&id);
        assert!(!ws.scene().connection_fragment(&id).unwrap().contains(&hover));

        ws.click_connection(&id, Point::new(300.0, 140.0)).unwrap();
        assert!(ws.scene().connection_fragment(&id).unwrap().contains("selected"));
        ws.escape();
        assert!(ws.connections().editor().is_none());
        assert!(!ws.scene().connection_fragment(&id).unwrap().contains("selected"));
    }

    #[test]
    fn deleting_a_component_cascades_everywhere() {
        let mut ws = open();
        let (a, b) = with_two(&mut ws);
        let id = connect(&mut ws, &a);
        ws.click_connection(&id, Point::new(300.0, 140.0)).unwrap();

        assert!(ws.delete_component(&b));
        assert_eq!(ws.store().connection_count(), 0);
        assert!(ws.scene().connection_fragment(&id).is_none());
        assert!(ws.scene().component_fragment(&b).is_none());
        assert!(ws.connections().editor().is_none());
        assert!(!ws.delete_component(&b));
    }

    #[test]
    fn deleting_the_edited_connection_closes_the_editor() {
        let mut ws = open();
        let (a, _) = with_two(&mut ws);
        let id = connect(&mut ws, &a);
        ws.click_connection(&id, Point::new(300.0, 140.0)).unwrap();

        ws.handle(CanvasEvent::DeleteConnection { id: id.clone() }).unwrap();
        assert!(ws.connections().editor().is_none());
        assert_eq!(ws.scene().connection_count(), 0);
        assert!(!ws.delete_connection(&id));
    }

    #[test]
    fn hand_mode_pans_instead_of_dragging() {
        let mut ws = open();
        let (a, _) = with_two(&mut ws);
        ws.store.viewport_mut().set_zoom(2.0);
        assert!(ws.toggle_hand_mode());

        ws.pointer_down(PointerTarget::Component { id: a.clone() }, Point::new(10.0, 10.0));
        ws.pointer_move(Point::new(40.0, 30.0));
        ws.pointer_up(Point::new(40.0, 30.0));

        assert_eq!(ws.store().viewport().pan(), Point::new(30.0, 20.0));
        assert_eq!(ws.store().component(&a).unwrap().position, Point::new(100.0, 100.0));
    }

    #[test]
    fn viewport_changes_are_saved_by_the_interval_tick() {
        let start = Instant::now();
        let mut ws = Workspace::open(
            &Config::default(),
            MemoryStorage::default(),
            RecordingNotifier::default(),
            start,
        )
        .unwrap();

        ws.handle(CanvasEvent::ZoomIn).unwrap();
        ws.handle(CanvasEvent::Wheel { delta_y: 0.0 }).unwrap();
        assert_eq!(ws.storage().writes, 0);
        assert!(!ws.tick(start + Duration::from_secs(5)));
        assert!(ws.tick(start + Duration::from_secs(31)));
        assert_eq!(ws.storage().writes, 1);
        // nothing changed since
        assert!(!ws.tick(start + Duration::from_secs(90)));
    }

    /// Storage whose writes fail until `failing` is cleared.
    #[derive(Debug, Default)]
    struct FlakyStorage {
        failing: bool,
        content: Option<String>,
        writes: usize,
    }

    impl SnapshotStorage for FlakyStorage {
        fn load(&self) -> Result<Option<String>> {
            Ok(None)
        }

        fn save(&mut self, snapshot: &str) -> Result<()> {
            if self.failing {
                return Err(std::io::Error::other("disk full").into());
            }
            self.content = Some(snapshot.to_string());
            self.writes += 1;
            Ok(())
        }
    }

    #[test]
    fn failed_writes_keep_the_session_going_and_retry_on_tick() {
        let start = Instant::now();
        let storage = FlakyStorage {
            failing: true,
            ..FlakyStorage::default()
        };
        let mut ws = Workspace::open(&Config::default(), storage, RecordingNotifier::default(), start)
            .unwrap();

        let id = ws.drop_component(
            ComponentSpec::new(ComponentKind::Monitoring, "Metrics", 15),
            Point::new(50.0, 50.0),
        );
        assert!(ws.store().component(&id).is_some());
        assert!(ws.scene().component_fragment(&id).is_some());
        assert_eq!(ws.storage().writes, 0);
        assert!(ws.autosave.is_dirty(ws.store().revision()));
        assert_eq!(ws.notifier().count(Severity::Error), 0);

        ws.storage.failing = false;
        assert!(!ws.tick(start + Duration::from_secs(5)));
        assert_eq!(ws.storage().writes, 0);

        assert!(ws.tick(start + Duration::from_secs(31)));
        assert_eq!(ws.storage().writes, 1);
        assert!(!ws.autosave.is_dirty(ws.store().revision()));
        let (saved, issues) = DiagramStore::from_json(ws.storage().content.as_deref().unwrap());
        assert!(issues.is_empty());
        assert_eq!(&saved, ws.store());
    }

    #[test]
    fn reopening_restores_the_diagram() {
        let mut ws = open();
        let (a, _) = with_two(&mut ws);
        connect(&mut ws, &a);
        ws.fit_to_bounds();
        ws.flush();
        let saved = ws.storage().content.clone().unwrap();

        let reopened = open_with(MemoryStorage::with_content(saved));
        assert_eq!(reopened.store(), ws.store());
        assert_eq!(reopened.scene().connection_count(), 1);
        assert!(reopened.notifier().messages.is_empty());
    }

    #[test]
    fn damaged_snapshot_still_opens() {
        let ws = open_with(MemoryStorage::with_content(
            r#"{"components":[{"id":"comp_1"}],"zoomFactor":"big"}"#,
        ));
        assert!(ws.store().is_empty());
        assert_eq!(ws.notifier().count(Severity::Warning), 1);
    }

    #[test]
    fn export_and_clear() {
        let mut ws = open();
        assert!(ws.export(Utc::now()).is_none());
        assert_eq!(ws.notifier().last().unwrap().1, Severity::Warning);

        with_two(&mut ws);
        let doc = ws.export(Utc::now()).unwrap();
        assert_eq!(doc.metadata.total_monthly_cost, 75);

        ws.handle(CanvasEvent::Clear).unwrap();
        assert!(ws.store().is_empty());
        assert_eq!(ws.scene().component_count(), 0);
    }
}
