use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{info, warn};

use crate::error::{LineageError, Result};

use super::graph::{DeviceNode, Graph};
use super::record::DeviceRecord;

/// Normalizes raw records into a validated graph.
///
/// Checks run in a fixed order: duplicate ids, then dangling predicate
/// references, then cycles. The first failure wins and nothing is dropped or
/// repaired; a bad record set must be fixed upstream.
pub fn build(records: &[DeviceRecord]) -> Result<Graph> {
    let index_by_id = index_records(records)?;
    let edge_pairs = collect_edges(records, &index_by_id)?;
    let topo_order = topological_order(records, &edge_pairs)?;

    let nodes = records
        .iter()
        .map(|record| DeviceNode {
            id: record.id.clone(),
            label: if record.display_name.is_empty() {
                record.id.clone()
            } else {
                record.display_name.clone()
            },
            attributes: record.attributes.clone(),
        })
        .collect::<Vec<_>>();

    let graph = Graph::from_validated(nodes, edge_pairs, topo_order);
    info!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built predicate graph"
    );
    Ok(graph)
}

fn index_records(records: &[DeviceRecord]) -> Result<HashMap<&str, usize>> {
    let mut index_by_id = HashMap::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        if index_by_id.insert(record.id.as_str(), index).is_some() {
            warn!(id = %record.id, "duplicate device id");
            return Err(LineageError::DuplicateNode {
                id: record.id.clone(),
            });
        }
    }
    Ok(index_by_id)
}

fn collect_edges(
    records: &[DeviceRecord],
    index_by_id: &HashMap<&str, usize>,
) -> Result<Vec<(usize, usize)>> {
    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for (dependent, record) in records.iter().enumerate() {
        for predicate_id in &record.predicate_ids {
            let Some(&predicate) = index_by_id.get(predicate_id.as_str()) else {
                warn!(
                    dependent = %record.id,
                    predicate = %predicate_id,
                    "predicate missing from record set"
                );
                return Err(LineageError::DanglingReference {
                    dependent_id: record.id.clone(),
                    missing_predicate_id: predicate_id.clone(),
                });
            };

            if seen.insert((predicate, dependent)) {
                edges.push((predicate, dependent));
            }
        }
    }

    Ok(edges)
}

/// Kahn's algorithm. Roots are seeded in input order, so the result is stable.
fn topological_order(records: &[DeviceRecord], edges: &[(usize, usize)]) -> Result<Vec<usize>> {
    let count = records.len();
    let mut in_degree = vec![0usize; count];
    let mut dependents = vec![Vec::new(); count];
    let mut predicates = vec![Vec::new(); count];
    for &(predicate, dependent) in edges {
        in_degree[dependent] += 1;
        dependents[predicate].push(dependent);
        predicates[dependent].push(predicate);
    }

    let mut queue = (0..count)
        .filter(|&index| in_degree[index] == 0)
        .collect::<VecDeque<_>>();
    let mut order = Vec::with_capacity(count);
    let mut placed = vec![false; count];

    while let Some(current) = queue.pop_front() {
        order.push(current);
        placed[current] = true;
        for &next in &dependents[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() == count {
        return Ok(order);
    }

    let cycle = find_cycle(&placed, &predicates)
        .into_iter()
        .map(|index| records[index].id.clone())
        .collect::<Vec<_>>();
    let node_id = cycle.first().cloned().unwrap_or_default();
    warn!(node = %node_id, "predicate cycle detected");
    Err(LineageError::CyclicGraph { node_id, cycle })
}

/// Every unplaced node still has an unplaced predicate, so walking predicates
/// from any of them must revisit a node. The revisited stretch is the cycle.
fn find_cycle(placed: &[bool], predicates: &[Vec<usize>]) -> Vec<usize> {
    let Some(start) = placed.iter().position(|&done| !done) else {
        return Vec::new();
    };

    let mut step_of = vec![usize::MAX; placed.len()];
    let mut walk = Vec::new();
    let mut cursor = start;

    loop {
        if step_of[cursor] != usize::MAX {
            let mut cycle = walk[step_of[cursor]..].to_vec();
            cycle.push(cursor);
            cycle.reverse();
            return cycle;
        }

        step_of[cursor] = walk.len();
        walk.push(cursor);

        match predicates[cursor].iter().find(|&&next| !placed[next]) {
            Some(&next) => cursor = next,
            None => return walk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, predicates: &[&str]) -> DeviceRecord {
        DeviceRecord::new(id, id).with_predicates(predicates.iter().copied())
    }

    #[test]
    fn builds_three_generation_lineage() {
        let graph = build(&[
            device("K021234", &["K921156", "K861712"]),
            device("K921156", &["K861712"]),
            device("K861712", &[]),
        ])
        .unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        // K861712 is the only root, so it leads even though it came last.
        assert_eq!(graph.topo_order(), &[2, 1, 0]);
    }

    #[test]
    fn empty_record_set_is_an_empty_graph() {
        let graph = build(&[]).unwrap();
        assert!(graph.is_empty());
        assert!(graph.topo_order().is_empty());
    }

    #[test]
    fn duplicate_ids_are_rejected_first() {
        // Also dangling, but duplicate detection runs before reference checks.
        let error = build(&[device("A", &["Z"]), device("A", &[])]).unwrap_err();
        assert_eq!(error, LineageError::DuplicateNode { id: "A".to_owned() });
    }

    #[test]
    fn dangling_predicate_reports_dependent() {
        let error = build(&[device("A", &[]), device("B", &["A", "MISSING"])]).unwrap_err();
        assert_eq!(
            error,
            LineageError::DanglingReference {
                dependent_id: "B".to_owned(),
                missing_predicate_id: "MISSING".to_owned(),
            }
        );
    }

    #[test]
    fn two_cycle_is_rejected() {
        let error = build(&[device("A", &["B"]), device("B", &["A"])]).unwrap_err();
        let LineageError::CyclicGraph { node_id, cycle } = error else {
            panic!("expected a cycle error, got {error:?}");
        };
        assert!(node_id == "A" || node_id == "B");
        assert_eq!(cycle.len(), 3);
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn cycle_exemplar_is_on_the_cycle() {
        // D hangs below the B <-> C cycle but is not part of it.
        let error = build(&[
            device("A", &[]),
            device("D", &["C"]),
            device("B", &["A", "C"]),
            device("C", &["B"]),
        ])
        .unwrap_err();
        let LineageError::CyclicGraph { node_id, .. } = error else {
            panic!("expected a cycle error, got {error:?}");
        };
        assert!(node_id == "B" || node_id == "C", "got {node_id}");
    }

    #[test]
    fn self_citation_is_a_cycle() {
        let error = build(&[device("A", &["A"])]).unwrap_err();
        assert_eq!(
            error,
            LineageError::CyclicGraph {
                node_id: "A".to_owned(),
                cycle: vec!["A".to_owned(), "A".to_owned()],
            }
        );
    }

    #[test]
    fn repeated_citation_collapses_to_one_edge() {
        let graph = build(&[device("A", &[]), device("B", &["A", "A"])]).unwrap();
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn label_falls_back_to_id() {
        let graph = build(&[DeviceRecord::new("K1", "")]).unwrap();
        assert_eq!(graph.nodes()[0].label, "K1");
    }
}
