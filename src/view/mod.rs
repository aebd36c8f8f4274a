//! Query and selection state over one predicate graph.
//!
//! `ViewState` owns the only mutable state in the crate. Every mutation takes
//! `&mut self` and finishes recomputing the visible subgraph, its layout and
//! the snapshot before it returns, so a renderer holding an `Arc<Snapshot>`
//! never sees a half-applied change. Failed mutations leave the previous state
//! in place.

mod highlight;
mod snapshot;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ViewConfig;
use crate::error::{LineageError, Result};
use crate::layout::{self, LayoutResult, force_layout};
use crate::lineage::Graph;
use crate::search::SearchIndex;

use self::highlight::selection_context;
use self::snapshot::{SnapshotInput, build_snapshot};
pub use self::snapshot::{Snapshot, SnapshotEdge, SnapshotNode};

/// Which nodes stay visible while a query is active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterPolicy {
    /// Only devices that match; a match's unmatched predicates are hidden.
    #[default]
    ExactMatches,
    /// Matches plus every transitive predicate, for lineage context.
    WithAncestors,
}

/// What to do when the layered engine refuses a graph as too large.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FallbackStrategy {
    #[default]
    ForceDirected,
    Fail,
}

struct Derived {
    matched: BTreeSet<String>,
    visible: Graph,
    layout: LayoutResult,
}

pub struct ViewState {
    graph: Arc<Graph>,
    index: SearchIndex,
    config: ViewConfig,
    query: String,
    selected: Option<String>,
    matched: BTreeSet<String>,
    visible: Graph,
    layout: Arc<LayoutResult>,
    snapshot: Arc<Snapshot>,
}

impl ViewState {
    pub fn new(graph: Arc<Graph>, config: ViewConfig) -> Result<Self> {
        let index = SearchIndex::build(&graph, &config.search);
        let derived = derive(&graph, &index, &config, "")?;

        let layout = Arc::new(derived.layout);
        let snapshot = Arc::new(compose_snapshot(
            &graph,
            &derived.visible,
            &layout,
            &config,
            &derived.matched,
            None,
        ));

        Ok(Self {
            graph,
            index,
            config,
            query: String::new(),
            selected: None,
            matched: derived.matched,
            visible: derived.visible,
            layout,
            snapshot,
        })
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn matched_ids(&self) -> &BTreeSet<String> {
        &self.matched
    }

    pub fn visible_graph(&self) -> &Graph {
        &self.visible
    }

    pub fn layout(&self) -> Arc<LayoutResult> {
        Arc::clone(&self.layout)
    }

    /// Matches ordered for a result list, best fuzzy score first.
    pub fn ranked_matches(&self) -> Vec<&str> {
        self.index
            .ranked(&self.query)
            .into_iter()
            .map(|index| self.graph.nodes()[index].id.as_str())
            .collect()
    }

    /// Recomputes matches, the visible subgraph and its layout.
    ///
    /// Fails with `LayoutTooLarge` under `FallbackStrategy::Fail`, or when the
    /// visible graph is above `force_max_nodes` as well. The previous query and
    /// snapshot then stay current.
    pub fn set_query(&mut self, text: &str) -> Result<()> {
        if text == self.query {
            return Ok(());
        }

        let derived = derive(&self.graph, &self.index, &self.config, text)?;
        self.query = text.to_owned();
        self.apply(derived);
        Ok(())
    }

    /// Selects a device, or clears the selection with `None`.
    ///
    /// Ids outside the current graph are ignored: during fast filtering the
    /// renderer may still hold a stale id.
    pub fn set_selected(&mut self, id: Option<&str>) {
        if let Err(error) = self.try_select(id) {
            debug!(%error, "ignoring selection");
        }
    }

    /// Like [`Self::set_selected`] but reports `UnknownSelection`.
    pub fn try_select(&mut self, id: Option<&str>) -> Result<()> {
        match id {
            None => {
                if self.selected.take().is_some() {
                    self.refresh_snapshot();
                }
                Ok(())
            }
            Some(id) if !self.graph.contains(id) => Err(LineageError::UnknownSelection {
                id: id.to_owned(),
            }),
            Some(id) => {
                if self.selected.as_deref() != Some(id) {
                    self.selected = Some(id.to_owned());
                    self.refresh_snapshot();
                }
                Ok(())
            }
        }
    }

    /// Swaps in a rebuilt graph. The query survives; a selection that no
    /// longer exists is dropped.
    pub fn replace_graph(&mut self, graph: Arc<Graph>) -> Result<()> {
        let index = SearchIndex::build(&graph, &self.config.search);
        let derived = derive(&graph, &index, &self.config, &self.query)?;

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "replaced lineage graph"
        );
        if let Some(selected) = &self.selected
            && !graph.contains(selected)
        {
            self.selected = None;
        }
        self.graph = graph;
        self.index = index;
        self.apply(derived);
        Ok(())
    }

    /// The current snapshot. Identical until the next state change.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    fn apply(&mut self, derived: Derived) {
        self.matched = derived.matched;
        self.visible = derived.visible;
        self.layout = Arc::new(derived.layout);
        self.refresh_snapshot();
    }

    fn refresh_snapshot(&mut self) {
        self.snapshot = Arc::new(compose_snapshot(
            &self.graph,
            &self.visible,
            &self.layout,
            &self.config,
            &self.matched,
            self.selected.as_deref(),
        ));
    }
}

fn compose_snapshot(
    graph: &Graph,
    visible: &Graph,
    layout: &LayoutResult,
    config: &ViewConfig,
    matched: &BTreeSet<String>,
    selected_id: Option<&str>,
) -> Snapshot {
    let selection = selected_id.and_then(|id| selection_context(graph, id));

    build_snapshot(SnapshotInput {
        visible,
        layout,
        box_config: &config.layout,
        matched,
        selected_id,
        selection: selection.as_ref(),
    })
}

fn derive(graph: &Graph, index: &SearchIndex, config: &ViewConfig, query: &str) -> Result<Derived> {
    let matched_indices = index.query_indices(query);

    let keep = match config.filter {
        FilterPolicy::ExactMatches => matched_indices.clone(),
        FilterPolicy::WithAncestors => {
            let mut keep = matched_indices.clone();
            for &index in &matched_indices {
                keep.extend(graph.ancestors(index));
            }
            keep
        }
    };

    let visible = graph.subgraph(&keep);
    let layout = match layout::layout(&visible, &config.layout) {
        Ok(result) => result,
        Err(LineageError::LayoutTooLarge { node_count, limit })
            if config.fallback == FallbackStrategy::ForceDirected =>
        {
            warn!(
                nodes = node_count,
                limit, "falling back to force-directed layout"
            );
            force_layout(&visible, &config.layout)?
        }
        Err(error) => return Err(error),
    };

    debug!(
        query,
        matched = matched_indices.len(),
        visible = visible.node_count(),
        edges = visible.edge_count(),
        "derived visible subgraph"
    );

    Ok(Derived {
        matched: matched_indices
            .into_iter()
            .map(|index| graph.nodes()[index].id.clone())
            .collect(),
        visible,
        layout,
    })
}

#[cfg(test)]
mod tests {
    use crate::layout::{LayoutConfig, LayoutKind};
    use crate::lineage::{DeviceRecord, build};

    use super::*;

    fn lineage() -> Arc<Graph> {
        Arc::new(
            build(&[
                DeviceRecord::new("K861712", "Root device"),
                DeviceRecord::new("K921156", "Child device").with_predicates(["K861712"]),
                DeviceRecord::new("K021234", "Grandchild device")
                    .with_predicates(["K921156", "K861712"]),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn starts_with_everything_visible() {
        let state = ViewState::new(lineage(), ViewConfig::default()).unwrap();
        let snapshot = state.snapshot();
        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(snapshot.edges.len(), 3);
        assert_eq!(snapshot.match_count, 3);
        assert!(snapshot.nodes.iter().all(|node| node.is_matched));
        assert_eq!(snapshot.selected_id, None);
    }

    #[test]
    fn query_drops_unmatched_predicates() {
        let mut state = ViewState::new(lineage(), ViewConfig::default()).unwrap();
        state.set_query("K92").unwrap();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.matched_ids, BTreeSet::from(["K921156".to_owned()]));
        assert_eq!(snapshot.visible_ids(), BTreeSet::from(["K921156"]));
        assert!(snapshot.edges.is_empty());
        assert_eq!(state.query(), "K92");
    }

    #[test]
    fn ancestor_policy_keeps_predicate_chain() {
        let config = ViewConfig {
            filter: FilterPolicy::WithAncestors,
            ..ViewConfig::default()
        };
        let mut state = ViewState::new(lineage(), config).unwrap();
        state.set_query("K92").unwrap();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.match_count, 1);
        assert_eq!(snapshot.visible_ids(), BTreeSet::from(["K861712", "K921156"]));
        assert_eq!(snapshot.edges.len(), 1);
        assert!(!snapshot.node("K861712").unwrap().is_matched);
        assert!(snapshot.node("K921156").unwrap().is_matched);
    }

    #[test]
    fn unknown_selection_is_ignored() {
        let mut state = ViewState::new(lineage(), ViewConfig::default()).unwrap();
        state.set_selected(Some("K921156"));
        let before = state.snapshot();

        state.set_selected(Some("nonexistent-id"));
        assert_eq!(state.selected_id(), Some("K921156"));
        assert!(Arc::ptr_eq(&before, &state.snapshot()));

        assert_eq!(
            state.try_select(Some("nonexistent-id")),
            Err(LineageError::UnknownSelection {
                id: "nonexistent-id".to_owned()
            })
        );
    }

    #[test]
    fn selection_marks_node_and_neighbours() {
        let mut state = ViewState::new(lineage(), ViewConfig::default()).unwrap();
        state.set_selected(Some("K921156"));

        let snapshot = state.snapshot();
        assert_eq!(snapshot.selected_id.as_deref(), Some("K921156"));
        assert!(snapshot.node("K921156").unwrap().is_selected);
        assert!(snapshot.node("K861712").unwrap().is_related);
        assert!(snapshot.node("K021234").unwrap().is_related);
        assert_eq!(snapshot.lineage_path, vec!["K861712", "K921156"]);

        state.set_selected(None);
        assert_eq!(state.snapshot().selected_id, None);
        assert!(state.snapshot().nodes.iter().all(|node| !node.is_selected));
    }

    #[test]
    fn selection_survives_filtering_it_out() {
        let mut state = ViewState::new(lineage(), ViewConfig::default()).unwrap();
        state.set_selected(Some("K861712"));
        state.set_query("K92").unwrap();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.selected_id.as_deref(), Some("K861712"));
        assert!(snapshot.node("K861712").is_none());
    }

    #[test]
    fn snapshot_is_stable_without_mutation() {
        let mut state = ViewState::new(lineage(), ViewConfig::default()).unwrap();
        state.set_query("device").unwrap();
        let first = state.snapshot();
        let second = state.snapshot();
        assert_eq!(*first, *second);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn too_large_falls_back_to_force_layout() {
        let config = ViewConfig {
            layout: LayoutConfig {
                max_nodes: 2,
                ..LayoutConfig::default()
            },
            ..ViewConfig::default()
        };
        let mut state = ViewState::new(lineage(), config).unwrap();
        assert_eq!(state.snapshot().layout_kind, LayoutKind::ForceDirected);

        state.set_query("K92").unwrap();
        assert_eq!(state.snapshot().layout_kind, LayoutKind::Layered);
    }

    #[test]
    fn too_large_with_fail_strategy_keeps_previous_state() {
        let config = ViewConfig {
            layout: LayoutConfig {
                max_nodes: 2,
                ..LayoutConfig::default()
            },
            fallback: FallbackStrategy::Fail,
            ..ViewConfig::default()
        };
        let small = Arc::new(build(&[DeviceRecord::new("K1", "Only")]).unwrap());
        let mut state = ViewState::new(small, config).unwrap();
        let before = state.snapshot();

        let error = state.replace_graph(lineage()).unwrap_err();
        assert_eq!(
            error,
            LineageError::LayoutTooLarge {
                node_count: 3,
                limit: 2
            }
        );
        assert_eq!(state.graph().node_count(), 1);
        assert!(Arc::ptr_eq(&before, &state.snapshot()));
    }

    #[test]
    fn force_fallback_has_its_own_ceiling() {
        let config = ViewConfig {
            layout: LayoutConfig {
                max_nodes: 1,
                force_max_nodes: 2,
                ..LayoutConfig::default()
            },
            ..ViewConfig::default()
        };
        assert_eq!(
            ViewState::new(lineage(), config.clone()).err(),
            Some(LineageError::LayoutTooLarge {
                node_count: 3,
                limit: 2
            })
        );

        let small = Arc::new(
            build(&[
                DeviceRecord::new("K861712", "Root device"),
                DeviceRecord::new("K921156", "Child device").with_predicates(["K861712"]),
            ])
            .unwrap(),
        );
        let mut state = ViewState::new(small, config).unwrap();
        assert_eq!(state.snapshot().layout_kind, LayoutKind::ForceDirected);
        let before = state.snapshot();

        assert!(state.replace_graph(lineage()).is_err());
        assert_eq!(state.graph().node_count(), 2);
        assert!(Arc::ptr_eq(&before, &state.snapshot()));
    }

    #[test]
    fn replace_graph_drops_vanished_selection() {
        let mut state = ViewState::new(lineage(), ViewConfig::default()).unwrap();
        state.set_selected(Some("K021234"));
        state.set_query("device").unwrap();

        let smaller = Arc::new(
            build(&[
                DeviceRecord::new("K861712", "Root device"),
                DeviceRecord::new("K921156", "Child device").with_predicates(["K861712"]),
            ])
            .unwrap(),
        );
        state.replace_graph(smaller).unwrap();

        assert_eq!(state.selected_id(), None);
        assert_eq!(state.query(), "device");
        assert_eq!(state.snapshot().match_count, 2);
    }

    #[test]
    fn ranked_matches_follow_query() {
        let mut state = ViewState::new(lineage(), ViewConfig::default()).unwrap();
        state.set_query("child").unwrap();
        let ranked = state.ranked_matches();
        assert_eq!(ranked.len(), 2);
        assert!(ranked.contains(&"K921156"));
        assert!(ranked.contains(&"K021234"));
    }
}
