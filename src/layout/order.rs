use std::collections::BTreeMap;

use crate::lineage::Graph;

/// Orders every rank to reduce edge crossings.
///
/// Even passes sweep downward and place each node at the mean slot of its
/// predicates; odd passes sweep upward using dependents. A node without
/// neighbours on the reference side keeps its current slot. Ties fall back to
/// input order. The ordering with the fewest crossings seen is returned along
/// with that count.
pub(super) fn order_ranks(
    graph: &Graph,
    ranks: &[usize],
    passes: usize,
) -> (Vec<Vec<usize>>, usize) {
    let rank_count = ranks.iter().copied().max().map_or(0, |deepest| deepest + 1);
    let mut layers = vec![Vec::new(); rank_count];
    for (index, &rank) in ranks.iter().enumerate() {
        layers[rank].push(index);
    }

    let mut slots = vec![0.0f32; ranks.len()];
    for layer in &layers {
        assign_slots(layer, &mut slots);
    }

    let mut best_crossings = count_crossings(graph, ranks, &slots);
    let mut best_layers = layers.clone();

    for pass in 0..passes {
        if best_crossings == 0 {
            break;
        }

        if pass % 2 == 0 {
            for layer in layers.iter_mut().skip(1) {
                sort_by_barycenter(graph, layer, &mut slots, true);
            }
        } else {
            for layer in layers.iter_mut().rev().skip(1) {
                sort_by_barycenter(graph, layer, &mut slots, false);
            }
        }

        let crossings = count_crossings(graph, ranks, &slots);
        if crossings < best_crossings {
            best_crossings = crossings;
            best_layers = layers.clone();
        }
    }

    (best_layers, best_crossings)
}

/// Slots are centred on zero so ranks of different widths line up.
fn assign_slots(layer: &[usize], slots: &mut [f32]) {
    let center = layer.len().saturating_sub(1) as f32 / 2.0;
    for (position, &node) in layer.iter().enumerate() {
        slots[node] = position as f32 - center;
    }
}

fn sort_by_barycenter(graph: &Graph, layer: &mut [usize], slots: &mut [f32], downward: bool) {
    let mut keyed = layer
        .iter()
        .map(|&node| {
            let neighbors = if downward {
                graph.predicates_of(node)
            } else {
                graph.dependents_of(node)
            };

            let barycenter = if neighbors.is_empty() {
                slots[node]
            } else {
                neighbors.iter().map(|&other| slots[other]).sum::<f32>() / neighbors.len() as f32
            };
            (barycenter, node)
        })
        .collect::<Vec<_>>();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    for (slot, (_, node)) in layer.iter_mut().zip(keyed) {
        *slot = node;
    }
    assign_slots(layer, slots);
}

/// Counts crossings between edges joining the same pair of ranks.
fn count_crossings(graph: &Graph, ranks: &[usize], slots: &[f32]) -> usize {
    let mut bands: BTreeMap<(usize, usize), Vec<(f32, f32)>> = BTreeMap::new();
    for edge in graph.edges() {
        let (predicate, dependent) = edge.endpoints();
        bands
            .entry((ranks[predicate], ranks[dependent]))
            .or_default()
            .push((slots[predicate], slots[dependent]));
    }

    let mut crossings = 0;
    for pairs in bands.values() {
        for (offset, &(top_a, bottom_a)) in pairs.iter().enumerate() {
            for &(top_b, bottom_b) in &pairs[offset + 1..] {
                if (top_a < top_b && bottom_a > bottom_b) || (top_a > top_b && bottom_a < bottom_b) {
                    crossings += 1;
                }
            }
        }
    }
    crossings
}
