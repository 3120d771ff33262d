use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::geometry::{Point, Side};
use super::types::{
    ComponentId, ComponentSpec, Connection, ConnectionId, ConnectionStyle, PlacedComponent,
};
use super::viewport::Viewport;
use crate::error::{Error, Result};

/// Hands out `<prefix>_<n>` ids with `n` strictly increasing. Loaded ids
/// carry `u64` suffixes; the wider counter keeps a maximal one from wrapping.
#[derive(Debug, Clone, PartialEq)]
struct IdSequence {
    prefix: &'static str,
    last: u128,
}

impl IdSequence {
    fn new(prefix: &'static str) -> Self {
        Self { prefix, last: 0 }
    }

    fn next(&mut self) -> (u128, String) {
        self.last = self.last.saturating_add(1);
        (self.last, format!("{}_{}", self.prefix, self.last))
    }

    /// Move past the numeric suffix of an id loaded from elsewhere.
    fn observe(&mut self, id: &str) {
        let suffix = id
            .strip_prefix(self.prefix)
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|n| n.parse::<u64>().ok());
        if let Some(n) = suffix {
            self.last = self.last.max(u128::from(n));
        }
    }
}

/// Persisted form of the whole diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub components: Vec<PlacedComponent>,
    pub connections: Vec<Connection>,
    pub zoom_factor: f64,
    pub pan_offset: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_style: Option<ConnectionStyle>,
    pub timestamp: String,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Authoritative diagram state. Rendering reads from here and never writes back.
#[derive(Debug, Clone)]
pub struct DiagramStore {
    components: IndexMap<ComponentId, PlacedComponent>,
    connections: IndexMap<ConnectionId, Connection>,
    viewport: Viewport,
    global_style: ConnectionStyle,
    component_ids: IdSequence,
    connection_ids: IdSequence,
    revision: u64,
}

impl Default for DiagramStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Equality covers diagram content only; id counters and revision are session bookkeeping.
impl PartialEq for DiagramStore {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
            && self.connections == other.connections
            && self.viewport == other.viewport
            && self.global_style == other.global_style
    }
}

impl DiagramStore {
    pub fn new() -> Self {
        Self {
            components: IndexMap::new(),
            connections: IndexMap::new(),
            viewport: Viewport::default(),
            global_style: ConnectionStyle::default(),
            component_ids: IdSequence::new("comp"),
            connection_ids: IdSequence::new("conn"),
            revision: 0,
        }
    }

    /// Bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    pub fn components(&self) -> impl Iterator<Item = &PlacedComponent> {
        self.components.values()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn component(&self, id: &ComponentId) -> Option<&PlacedComponent> {
        self.components.get(id)
    }

    pub fn connection(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        self.touch();
        &mut self.viewport
    }

    pub fn global_style(&self) -> &ConnectionStyle {
        &self.global_style
    }

    pub fn set_global_style(&mut self, style: ConnectionStyle) {
        self.global_style = style.normalized();
        self.touch();
    }

    pub fn add_component(&mut self, spec: ComponentSpec, position: Point) -> &PlacedComponent {
        let id = loop {
            let (_, candidate) = self.component_ids.next();
            let candidate = ComponentId::new(candidate);
            if !self.components.contains_key(&candidate) {
                break candidate;
            }
        };

        let component = PlacedComponent {
            id: id.clone(),
            kind: spec.kind,
            display_name: spec.display_name,
            monthly_cost: spec.monthly_cost,
            description: spec.description,
            position,
            icon_ref: spec.icon_ref,
        };
        info!(id = %id, kind = %component.kind, "component added");

        self.touch();
        self.components.entry(id).or_insert(component)
    }

    pub fn move_component(&mut self, id: &ComponentId, position: Point) -> Result<()> {
        let component = self
            .components
            .get_mut(id)
            .ok_or_else(|| Error::UnknownComponent { id: id.to_string() })?;
        component.position = position;
        self.touch();
        Ok(())
    }

    /// Removes the component and every connection touching it in one step.
    /// Unknown ids are a no-op. Returns the ids of the cascaded connections.
    pub fn remove_component(&mut self, id: &ComponentId) -> Vec<ConnectionId> {
        if self.components.shift_remove(id).is_none() {
            debug!(id = %id, "remove_component: unknown id ignored");
            return Vec::new();
        }

        let cascaded: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.references(id))
            .map(|c| c.id.clone())
            .collect();
        self.connections.retain(|_, c| !c.references(id));
        self.touch();

        info!(id = %id, cascaded = cascaded.len(), "component removed");
        cascaded
    }

    /// New connection styled with a copy of the current global style.
    pub fn add_connection(
        &mut self,
        from: &ComponentId,
        from_side: Side,
        to: &ComponentId,
        to_side: Side,
    ) -> Result<&Connection> {
        for endpoint in [from, to] {
            if !self.components.contains_key(endpoint) {
                return Err(Error::InvalidReference {
                    id: endpoint.to_string(),
                });
            }
        }

        let (seq, id) = loop {
            let (seq, candidate) = self.connection_ids.next();
            let candidate = ConnectionId::new(candidate);
            if !self.connections.contains_key(&candidate) {
                break (seq, candidate);
            }
        };

        let connection = Connection {
            id: id.clone(),
            from_component_id: from.clone(),
            to_component_id: to.clone(),
            from_side,
            to_side,
            label: format!("Connection {}", seq),
            kind: "data".to_string(),
            description: String::new(),
            created_at: Utc::now(),
            style: self.global_style,
        };
        info!(id = %id, from = %from, to = %to, "connection added");

        self.touch();
        Ok(self.connections.entry(id).or_insert(connection))
    }

    /// Unknown ids are a no-op.
    pub fn remove_connection(&mut self, id: &ConnectionId) -> Option<Connection> {
        let removed = self.connections.shift_remove(id);
        if removed.is_some() {
            self.touch();
            info!(id = %id, "connection removed");
        }
        removed
    }

    pub fn connection_style_mut(&mut self, id: &ConnectionId) -> Result<&mut ConnectionStyle> {
        match self.connections.get_mut(id) {
            Some(connection) => {
                self.revision += 1;
                Ok(&mut connection.style)
            }
            None => Err(Error::UnknownConnection { id: id.to_string() }),
        }
    }

    pub fn set_connection_style(&mut self, id: &ConnectionId, style: ConnectionStyle) -> Result<()> {
        *self.connection_style_mut(id)? = style.normalized();
        Ok(())
    }

    /// Drops every component and connection. Viewport and global style stay.
    pub fn clear(&mut self) {
        self.components.clear();
        self.connections.clear();
        self.touch();
        info!("diagram cleared");
    }

    pub fn total_monthly_cost(&self) -> u64 {
        self.components
            .values()
            .fold(0u64, |total, c| total.saturating_add(c.monthly_cost))
    }

    pub fn serialize(&self) -> Snapshot {
        Snapshot {
            components: self.components.values().cloned().collect(),
            connections: self.connections.values().cloned().collect(),
            zoom_factor: self.viewport.zoom(),
            pan_offset: self.viewport.pan(),
            global_style: Some(self.global_style),
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    /// Replace the store contents with `snapshot`, salvaging whatever is usable.
    ///
    /// Never fails: absent collections load as empty, absent viewport fields as
    /// defaults, and each unusable entry is skipped and reported back as a
    /// [`Error::MalformedSnapshot`] issue.
    pub fn deserialize(&mut self, snapshot: &Value) -> Vec<Error> {
        let mut issues = Vec::new();
        let mut fresh = DiagramStore::new();

        let Some(root) = snapshot.as_object() else {
            issues.push(Error::malformed("snapshot is not a JSON object"));
            fresh.revision = self.revision + 1;
            *self = fresh;
            return issues;
        };

        for (index, entry) in array_field(root, "components", &mut issues).iter().enumerate() {
            match serde_json::from_value::<PlacedComponent>(entry.clone()) {
                Ok(component) if fresh.components.contains_key(&component.id) => {
                    issues.push(Error::malformed(format!(
                        "duplicate component id {}",
                        component.id
                    )));
                }
                Ok(component) => {
                    fresh.component_ids.observe(component.id.as_str());
                    fresh.components.insert(component.id.clone(), component);
                }
                Err(e) => issues.push(Error::malformed(format!("components[{}]: {}", index, e))),
            }
        }

        for (index, entry) in array_field(root, "connections", &mut issues).iter().enumerate() {
            match serde_json::from_value::<Connection>(entry.clone()) {
                Ok(connection) if fresh.connections.contains_key(&connection.id) => {
                    issues.push(Error::malformed(format!(
                        "duplicate connection id {}",
                        connection.id
                    )));
                }
                Ok(connection) => {
                    let dangling = [&connection.from_component_id, &connection.to_component_id]
                        .into_iter()
                        .find(|id| !fresh.components.contains_key(*id));
                    if let Some(id) = dangling {
                        issues.push(Error::malformed(format!(
                            "connection {} references missing component {}",
                            connection.id, id
                        )));
                        continue;
                    }
                    let mut connection = connection;
                    connection.style = connection.style.normalized();
                    fresh.connection_ids.observe(connection.id.as_str());
                    fresh.connections.insert(connection.id.clone(), connection);
                }
                Err(e) => issues.push(Error::malformed(format!("connections[{}]: {}", index, e))),
            }
        }

        let zoom = match root.get("zoomFactor") {
            None | Some(Value::Null) => 1.0,
            Some(value) => value.as_f64().unwrap_or_else(|| {
                issues.push(Error::malformed("zoomFactor is not a number"));
                1.0
            }),
        };
        fresh.viewport.set_zoom(zoom);

        if let Some(value) = root.get("panOffset").filter(|v| !v.is_null()) {
            match serde_json::from_value::<Point>(value.clone()) {
                Ok(pan) => fresh.viewport.set_pan(pan),
                Err(e) => issues.push(Error::malformed(format!("panOffset: {}", e))),
            }
        }

        if let Some(value) = root.get("globalStyle").filter(|v| !v.is_null()) {
            match serde_json::from_value::<ConnectionStyle>(value.clone()) {
                Ok(style) => fresh.global_style = style.normalized(),
                Err(e) => issues.push(Error::malformed(format!("globalStyle: {}", e))),
            }
        }

        for issue in &issues {
            warn!("{}", issue);
        }
        info!(
            components = fresh.components.len(),
            connections = fresh.connections.len(),
            issues = issues.len(),
            "snapshot loaded"
        );

        fresh.revision = self.revision + 1;
        *self = fresh;
        issues
    }

    pub fn from_snapshot(snapshot: &Value) -> (Self, Vec<Error>) {
        let mut store = Self::new();
        let issues = store.deserialize(snapshot);
        (store, issues)
    }

    /// Parse and load snapshot text. Text that is not JSON at all loads as an empty store.
    pub fn from_json(text: &str) -> (Self, Vec<Error>) {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_snapshot(&value),
            Err(e) => {
                warn!("snapshot is not valid JSON: {}", e);
                (Self::new(), vec![Error::malformed(e.to_string())])
            }
        }
    }
}

fn array_field<'a>(
    root: &'a serde_json::Map<String, Value>,
    name: &str,
    issues: &mut Vec<Error>,
) -> &'a [Value] {
    match root.get(name) {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(_) => {
            issues.push(Error::malformed(format!("{} is not an array", name)));
            &[]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::types::{
        ArrowTopology, ArrowheadShape, ComponentKind, StrokeStyle,
    };
    use proptest::prelude::*;
    use serde_json::json;

    fn spec(name: &str) -> ComponentSpec {
        ComponentSpec::new(ComponentKind::Service, name, 30)
    }

    fn two_components(store: &mut DiagramStore) -> (ComponentId, ComponentId) {
        let a = store.add_component(spec("A"), Point::new(100.0, 100.0)).id.clone();
        let b = store.add_component(spec("B"), Point::new(400.0, 100.0)).id.clone();
        (a, b)
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut store = DiagramStore::new();
        let (a, b) = two_components(&mut store);
        assert_eq!(a.as_str(), "comp_1");
        assert_eq!(b.as_str(), "comp_2");

        let c1 = store.add_connection(&a, Side::Right, &b, Side::Left).unwrap().id.clone();
        let c2 = store.add_connection(&b, Side::Bottom, &a, Side::Top).unwrap().id.clone();
        assert_eq!(c1.as_str(), "conn_1");
        assert_eq!(c2.as_str(), "conn_2");
        assert_eq!(store.connection(&c2).unwrap().label, "Connection 2");
    }

    #[test]
    fn add_connection_rejects_unknown_endpoints() {
        let mut store = DiagramStore::new();
        let (a, _) = two_components(&mut store);
        let before = store.revision();

        let err = store
            .add_connection(&a, Side::Right, &ComponentId::from("comp_99"), Side::Left)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidReference { ref id } if id == "comp_99"));
        assert_eq!(store.connection_count(), 0);
        assert_eq!(store.revision(), before);
    }

    #[test]
    fn removing_a_component_cascades_to_its_connections() {
        let mut store = DiagramStore::new();
        let (a, b) = two_components(&mut store);
        let c = store.add_component(spec("C"), Point::new(700.0, 100.0)).id.clone();
        store.add_connection(&a, Side::Right, &b, Side::Left).unwrap();
        store.add_connection(&c, Side::Left, &a, Side::Bottom).unwrap();
        let keep = store.add_connection(&b, Side::Right, &c, Side::Left).unwrap().id.clone();

        let removed = store.remove_component(&a);
        assert_eq!(removed.len(), 2);
        assert!(store.connections().all(|conn| !conn.references(&a)));
        assert_eq!(store.connections().map(|c| c.id.clone()).collect::<Vec<_>>(), vec![keep]);
    }

    #[test]
    fn removals_of_unknown_ids_are_noops() {
        let mut store = DiagramStore::new();
        two_components(&mut store);
        let revision = store.revision();

        assert!(store.remove_component(&ComponentId::from("nope")).is_empty());
        assert!(store.remove_connection(&ConnectionId::from("nope")).is_none());
        assert_eq!(store.revision(), revision);
        assert_eq!(store.component_count(), 2);
    }

    #[test]
    fn connection_style_is_a_copy_of_the_global_style() {
        let mut store = DiagramStore::new();
        let (a, b) = two_components(&mut store);
        let id = store.add_connection(&a, Side::Right, &b, Side::Left).unwrap().id.clone();

        let mut global = *store.global_style();
        global.stroke_width = 9;
        global.arrow_topology = ArrowTopology::Curved;
        store.set_global_style(global);

        let style = store.connection(&id).unwrap().style;
        assert_eq!(style, ConnectionStyle::default());
    }

    #[test]
    fn empty_object_deserializes_to_defaults() {
        let (store, issues) = DiagramStore::from_snapshot(&json!({}));
        assert!(issues.is_empty());
        assert_eq!(store.component_count(), 0);
        assert_eq!(store.connection_count(), 0);
        assert_eq!(store.viewport().zoom(), 1.0);
        assert_eq!(store.viewport().pan(), Point::ORIGIN);
    }

    #[test]
    fn non_object_snapshot_loads_empty() {
        let (store, issues) = DiagramStore::from_snapshot(&json!([1, 2, 3]));
        assert_eq!(issues.len(), 1);
        assert!(store.is_empty());

        let (store, issues) = DiagramStore::from_json("{not json");
        assert_eq!(issues.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_entries_are_skipped_and_dangling_connections_dropped() {
        let snapshot = json!({
            "components": [
                {"id": "comp_1", "kind": "service", "displayName": "API", "monthlyCost": 30,
                 "description": "", "position": {"x": 10.0, "y": 20.0}},
                {"id": "comp_2", "kind": "not-a-kind", "position": {"x": 0.0, "y": 0.0}},
                {"displayName": "no id"},
                {"id": "comp_7", "kind": "database", "position": {"x": 300.0, "y": 20.0}}
            ],
            "connections": [
                {"id": "conn_4", "fromComponentId": "comp_1", "toComponentId": "comp_7",
                 "fromSide": "right", "toSide": "left"},
                {"id": "conn_5", "fromComponentId": "comp_1", "toComponentId": "comp_2",
                 "fromSide": "right", "toSide": "left"}
            ],
            "zoomFactor": 12.0,
            "panOffset": "sideways"
        });

        let (mut store, issues) = DiagramStore::from_snapshot(&snapshot);
        assert_eq!(issues.len(), 4);
        assert!(issues.iter().all(|e| matches!(e, Error::MalformedSnapshot { .. })));
        assert_eq!(store.component_count(), 2);
        assert_eq!(store.connection_count(), 1);
        assert_eq!(store.viewport().zoom(), 5.0);
        assert_eq!(store.viewport().pan(), Point::ORIGIN);

        let conn = store.connection(&ConnectionId::from("conn_4")).unwrap();
        assert_eq!(conn.kind, "data");
        assert_eq!(conn.style, ConnectionStyle::default());

        // counters continue past loaded ids
        let new_comp = store.add_component(spec("D"), Point::ORIGIN).id.clone();
        assert_eq!(new_comp.as_str(), "comp_8");
        let a = ComponentId::from("comp_1");
        let new_conn = store
            .add_connection(&a, Side::Top, &new_comp, Side::Bottom)
            .unwrap()
            .id
            .clone();
        assert_eq!(new_conn.as_str(), "conn_5");
    }

    #[test]
    fn ids_keep_increasing_past_the_largest_loaded_suffix() {
        let (mut store, issues) = DiagramStore::from_snapshot(&json!({
            "components": [
                {"id": "comp_18446744073709551615", "kind": "queue", "position": {"x": 0.0, "y": 0.0}}
            ],
            "connections": [
                {"id": "conn_18446744073709551615", "fromComponentId": "comp_18446744073709551615",
                 "toComponentId": "comp_18446744073709551615", "fromSide": "top", "toSide": "left"}
            ]
        }));
        assert!(issues.is_empty());

        let added = store.add_component(spec("Next"), Point::ORIGIN).id.clone();
        assert_eq!(added.as_str(), "comp_18446744073709551616");
        let loaded = ComponentId::from("comp_18446744073709551615");
        let conn = store.add_connection(&loaded, Side::Right, &added, Side::Left).unwrap();
        assert_eq!(conn.id.as_str(), "conn_18446744073709551616");
        assert_eq!(conn.label, "Connection 18446744073709551616");
    }

    #[test]
    fn total_cost_saturates_instead_of_overflowing() {
        let (store, issues) = DiagramStore::from_snapshot(&json!({
            "components": [
                {"id": "comp_1", "kind": "storage", "monthlyCost": u64::MAX, "position": {"x": 0.0, "y": 0.0}},
                {"id": "comp_2", "kind": "storage", "monthlyCost": 1, "position": {"x": 0.0, "y": 0.0}}
            ]
        }));
        assert!(issues.is_empty());
        assert_eq!(store.total_monthly_cost(), u64::MAX);
    }

    #[test]
    fn round_trip_reproduces_an_equal_store() {
        let mut store = DiagramStore::new();
        let (a, b) = two_components(&mut store);
        let id = store.add_connection(&a, Side::Right, &b, Side::Left).unwrap().id.clone();
        store
            .set_connection_style(
                &id,
                ConnectionStyle {
                    stroke_width: 5,
                    stroke_style: StrokeStyle::Dashed,
                    roughness: 2,
                    arrow_topology: ArrowTopology::Curved,
                    arrowhead_shape: ArrowheadShape::Circle,
                },
            )
            .unwrap();
        store.viewport_mut().set_zoom(1.44);
        store.viewport_mut().set_pan(Point::new(-35.5, 12.25));

        let json = store.serialize().to_json().unwrap();
        let (loaded, issues) = DiagramStore::from_json(&json);
        assert!(issues.is_empty());
        assert_eq!(loaded, store);
    }

    fn arb_style() -> impl Strategy<Value = ConnectionStyle> {
        (
            1u32..12,
            prop_oneof![
                Just(StrokeStyle::Solid),
                Just(StrokeStyle::Dashed),
                Just(StrokeStyle::Dotted)
            ],
            0u32..4,
            prop_oneof![
                Just(ArrowTopology::Straight),
                Just(ArrowTopology::Curved),
                Just(ArrowTopology::RightAngled)
            ],
            prop_oneof![
                Just(ArrowheadShape::Triangle),
                Just(ArrowheadShape::Circle),
                Just(ArrowheadShape::Diamond)
            ],
        )
            .prop_map(|(stroke_width, stroke_style, roughness, arrow_topology, arrowhead_shape)| {
                ConnectionStyle {
                    stroke_width,
                    stroke_style,
                    roughness,
                    arrow_topology,
                    arrowhead_shape,
                }
            })
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize, f64, f64),
        Remove(usize),
        Connect(usize, usize, usize, usize),
        Disconnect(usize),
        Restyle(usize, ConnectionStyle),
        Move(usize, f64, f64),
        Zoom(f64),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..8, -500.0f64..500.0, -500.0f64..500.0).prop_map(|(k, x, y)| Op::Add(k, x, y)),
            (0usize..16).prop_map(Op::Remove),
            (0usize..16, 0usize..4, 0usize..16, 0usize..4)
                .prop_map(|(a, s, b, t)| Op::Connect(a, s, b, t)),
            (0usize..16).prop_map(Op::Disconnect),
            (0usize..16, arb_style()).prop_map(|(i, s)| Op::Restyle(i, s)),
            (0usize..16, -500.0f64..500.0, -500.0f64..500.0).prop_map(|(i, x, y)| Op::Move(i, x, y)),
            (0.01f64..10.0).prop_map(Op::Zoom),
        ]
    }

    fn apply(store: &mut DiagramStore, op: Op) {
        let component_ids: Vec<ComponentId> = store.components().map(|c| c.id.clone()).collect();
        let connection_ids: Vec<ConnectionId> = store.connections().map(|c| c.id.clone()).collect();
        let pick_component = |i: usize| component_ids.get(i % component_ids.len().max(1)).cloned();
        let pick_connection = |i: usize| connection_ids.get(i % connection_ids.len().max(1)).cloned();

        match op {
            Op::Add(kind, x, y) => {
                let kind = ComponentKind::ALL[kind % ComponentKind::ALL.len()];
                store.add_component(ComponentSpec::new(kind, "n", 10), Point::new(x, y));
            }
            Op::Remove(i) => {
                if let Some(id) = pick_component(i) {
                    store.remove_component(&id);
                }
            }
            Op::Connect(a, s, b, t) => {
                if let (Some(from), Some(to)) = (pick_component(a), pick_component(b)) {
                    store
                        .add_connection(&from, Side::ALL[s], &to, Side::ALL[t])
                        .unwrap();
                }
            }
            Op::Disconnect(i) => {
                if let Some(id) = pick_connection(i) {
                    store.remove_connection(&id);
                }
            }
            Op::Restyle(i, style) => {
                if let Some(id) = pick_connection(i) {
                    store.set_connection_style(&id, style).unwrap();
                }
            }
            Op::Move(i, x, y) => {
                if let Some(id) = pick_component(i) {
                    store.move_component(&id, Point::new(x, y)).unwrap();
                }
            }
            Op::Zoom(z) => store.viewport_mut().set_zoom(z),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn snapshot_round_trip_holds_for_reachable_states(ops in prop::collection::vec(arb_op(), 0..40)) {
            let mut store = DiagramStore::new();
            for op in ops {
                apply(&mut store, op);
            }

            let json = store.serialize().to_json().unwrap();
            let (loaded, issues) = DiagramStore::from_json(&json);
            prop_assert!(issues.is_empty());
            prop_assert_eq!(loaded, store);
        }

        #[test]
        fn no_connection_survives_its_component(ops in prop::collection::vec(arb_op(), 0..40), victim in 0usize..16) {
            let mut store = DiagramStore::new();
            for op in ops {
                apply(&mut store, op);
            }
            let ids: Vec<ComponentId> = store.components().map(|c| c.id.clone()).collect();
            if let Some(id) = ids.get(victim % ids.len().max(1)) {
                store.remove_component(id);
                prop_assert!(store.connections().all(|c| !c.references(id)));
            }
        }
    }
}
