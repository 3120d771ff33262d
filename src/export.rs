use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::diagram::store::DiagramStore;
use crate::diagram::types::{Connection, PlacedComponent};
use crate::error::Result;

pub const EXPORT_VERSION: &str = "1.0.0";
pub const EXPORT_FILE_NAME: &str = "architecture-export.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMetadata {
    pub total_monthly_cost: u64,
    pub component_count: usize,
    pub connection_count: usize,
    /// Monthly cost summed per component kind
    pub cost_by_kind: BTreeMap<String, u64>,
    pub exported_at: DateTime<Utc>,
    pub version: String,
}

/// Shareable artifact: the diagram plus metrics derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub components: Vec<PlacedComponent>,
    pub connections: Vec<Connection>,
    pub metadata: ExportMetadata,
}

impl ExportDocument {
    /// `None` for an empty diagram; there is nothing to export.
    pub fn from_store(store: &DiagramStore, exported_at: DateTime<Utc>) -> Option<Self> {
        if store.is_empty() {
            return None;
        }

        let mut cost_by_kind = BTreeMap::new();
        for component in store.components() {
            let cost = cost_by_kind
                .entry(component.kind.as_str().to_string())
                .or_insert(0u64);
            *cost = cost.saturating_add(component.monthly_cost);
        }

        Some(Self {
            components: store.components().cloned().collect(),
            connections: store.connections().cloned().collect(),
            metadata: ExportMetadata {
                total_monthly_cost: store.total_monthly_cost(),
                component_count: store.component_count(),
                connection_count: store.connection_count(),
                cost_by_kind,
                exported_at,
                version: EXPORT_VERSION.to_string(),
            },
        })
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
