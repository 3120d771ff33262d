//! Headless engine for sketching cloud architecture diagrams.
//!
//! [`diagram::DiagramStore`] holds the diagram. [`workspace::Workspace`] turns
//! canvas events into store mutations, keeps the SVG [`diagram::Scene`] in step
//! and saves snapshots through a [`persist::SnapshotStorage`].

pub mod config;
pub mod diagram;
pub mod error;
pub mod export;
pub mod fonts;
pub mod notify;
pub mod persist;
pub mod svg;
pub mod theme;
pub mod workspace;

pub use error::{Error, Result};
