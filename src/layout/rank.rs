use crate::lineage::Graph;

/// Longest-path layering: roots sit at rank 0, every other device one rank
/// below its deepest predicate. Indexed by node index.
pub fn assign_ranks(graph: &Graph) -> Vec<usize> {
    let mut ranks = vec![0usize; graph.node_count()];

    for &index in graph.topo_order() {
        ranks[index] = graph
            .predicates_of(index)
            .iter()
            .map(|&predicate| ranks[predicate] + 1)
            .max()
            .unwrap_or(0);
    }

    ranks
}

#[cfg(test)]
mod tests {
    use crate::lineage::{DeviceRecord, build};

    use super::*;

    #[test]
    fn long_citation_does_not_pull_rank_up() {
        // D cites both the root and the deepest node; it must sit below the deepest.
        let graph = build(&[
            DeviceRecord::new("A", "A"),
            DeviceRecord::new("B", "B").with_predicates(["A"]),
            DeviceRecord::new("C", "C").with_predicates(["B"]),
            DeviceRecord::new("D", "D").with_predicates(["A", "C"]),
        ])
        .unwrap();

        assert_eq!(assign_ranks(&graph), vec![0, 1, 2, 3]);
    }

    #[test]
    fn rank_follows_topological_order_not_input_order() {
        let graph = build(&[
            DeviceRecord::new("Child", "Child").with_predicates(["Root"]),
            DeviceRecord::new("Root", "Root"),
        ])
        .unwrap();

        assert_eq!(assign_ranks(&graph), vec![1, 0]);
    }
}
