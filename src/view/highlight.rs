use std::collections::BTreeSet;

use crate::lineage::Graph;

/// What the renderer emphasises around the selected device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(super) struct SelectionContext {
    pub(super) related: BTreeSet<String>,
    pub(super) lineage_path: Vec<String>,
}

pub(super) fn selection_context(graph: &Graph, selected_id: &str) -> Option<SelectionContext> {
    let selected = graph.index_of(selected_id)?;

    let related = graph
        .predicates_of(selected)
        .iter()
        .chain(graph.dependents_of(selected))
        .map(|&index| graph.nodes()[index].id.clone())
        .collect();

    Some(SelectionContext {
        related,
        lineage_path: graph.shortest_path_from_root(selected_id).unwrap_or_default(),
    })
}
