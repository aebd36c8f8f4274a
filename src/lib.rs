//! Predicate lineage graphs: validation, layered layout, search, and a
//! filtered view synchronized with query and selection.
//!
//! Records go in through [`lineage::build`]; a [`view::ViewState`] built over
//! the resulting graph hands renderers immutable [`view::Snapshot`]s.

pub mod config;
pub mod error;
pub mod layout;
pub mod lineage;
pub mod search;
pub mod view;

pub use config::ViewConfig;
pub use error::{LineageError, Result};
pub use layout::{LayoutConfig, LayoutKind, LayoutResult, Position, layout};
pub use lineage::{DeviceNode, DeviceRecord, Graph, PredicateEdge, build};
pub use search::{SearchConfig, SearchIndex};
pub use view::{FallbackStrategy, FilterPolicy, Snapshot, SnapshotEdge, SnapshotNode, ViewState};
