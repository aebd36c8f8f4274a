use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::layout::{LayoutConfig, LayoutKind, LayoutResult};
use crate::lineage::Graph;

use super::highlight::SelectionContext;

/// Immutable view handed to the renderer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub nodes: Vec<SnapshotNode>,
    pub edges: Vec<SnapshotEdge>,
    pub selected_id: Option<String>,
    pub matched_ids: BTreeSet<String>,
    pub match_count: usize,
    pub layout_kind: LayoutKind,
    pub width: f32,
    pub height: f32,
    /// Shortest predicate chain from a root to the selection, root first.
    pub lineage_path: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotNode {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub label: String,
    pub attributes: BTreeMap<String, String>,
    pub is_selected: bool,
    pub is_matched: bool,
    /// Direct predicate or dependent of the selection.
    pub is_related: bool,
}

/// `source_id` is the predicate, `target_id` the dependent citing it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEdge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
}

impl Snapshot {
    pub fn node(&self, id: &str) -> Option<&SnapshotNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn visible_ids(&self) -> BTreeSet<&str> {
        self.nodes.iter().map(|node| node.id.as_str()).collect()
    }
}

pub(super) struct SnapshotInput<'a> {
    pub(super) visible: &'a Graph,
    pub(super) layout: &'a LayoutResult,
    pub(super) box_config: &'a LayoutConfig,
    pub(super) matched: &'a BTreeSet<String>,
    pub(super) selected_id: Option<&'a str>,
    pub(super) selection: Option<&'a SelectionContext>,
}

pub(super) fn build_snapshot(input: SnapshotInput<'_>) -> Snapshot {
    let SnapshotInput {
        visible,
        layout,
        box_config,
        matched,
        selected_id,
        selection,
    } = input;

    let nodes = visible
        .nodes()
        .iter()
        .map(|node| {
            let position = layout.position(&node.id).unwrap_or_default();
            SnapshotNode {
                id: node.id.clone(),
                x: position.x,
                y: position.y,
                width: box_config.node_width,
                height: box_config.node_height,
                label: node.label.clone(),
                attributes: node.attributes.clone(),
                is_selected: selected_id == Some(node.id.as_str()),
                is_matched: matched.contains(&node.id),
                is_related: selection.is_some_and(|context| context.related.contains(&node.id)),
            }
        })
        .collect();

    let edges = visible
        .edges()
        .iter()
        .map(|edge| SnapshotEdge {
            id: edge.id(),
            source_id: edge.predicate_id.clone(),
            target_id: edge.dependent_id.clone(),
        })
        .collect();

    Snapshot {
        nodes,
        edges,
        selected_id: selected_id.map(str::to_owned),
        matched_ids: matched.clone(),
        match_count: matched.len(),
        layout_kind: layout.kind(),
        width: layout.width(),
        height: layout.height(),
        lineage_path: selection
            .map(|context| context.lineage_path.clone())
            .unwrap_or_default(),
    }
}
