use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// A device in the lineage. Immutable once the graph is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceNode {
    pub id: String,
    pub label: String,
    pub attributes: BTreeMap<String, String>,
}

/// `dependent` cites `predicate` as its basis of substantial equivalence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredicateEdge {
    pub predicate_id: String,
    pub dependent_id: String,
    pub(crate) predicate: usize,
    pub(crate) dependent: usize,
}

impl PredicateEdge {
    pub fn id(&self) -> String {
        format!("{}->{}", self.predicate_id, self.dependent_id)
    }

    pub fn endpoints(&self) -> (usize, usize) {
        (self.predicate, self.dependent)
    }
}

/// Validated, acyclic predicate graph. Node indices follow record input order.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<DeviceNode>,
    edges: Vec<PredicateEdge>,
    index_by_id: HashMap<String, usize>,
    predicates: Vec<Vec<usize>>,
    dependents: Vec<Vec<usize>>,
    topo_order: Vec<usize>,
}

impl Graph {
    /// Assembles a graph from parts that the caller has already validated.
    pub(super) fn from_validated(
        nodes: Vec<DeviceNode>,
        edge_pairs: Vec<(usize, usize)>,
        topo_order: Vec<usize>,
    ) -> Self {
        let index_by_id = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect::<HashMap<_, _>>();

        let mut predicates = vec![Vec::new(); nodes.len()];
        let mut dependents = vec![Vec::new(); nodes.len()];
        let edges = edge_pairs
            .into_iter()
            .map(|(predicate, dependent)| {
                dependents[predicate].push(dependent);
                predicates[dependent].push(predicate);
                PredicateEdge {
                    predicate_id: nodes[predicate].id.clone(),
                    dependent_id: nodes[dependent].id.clone(),
                    predicate,
                    dependent,
                }
            })
            .collect();

        Self {
            nodes,
            edges,
            index_by_id,
            predicates,
            dependents,
            topo_order,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[DeviceNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[PredicateEdge] {
        &self.edges
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_by_id.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&DeviceNode> {
        self.index_of(id).map(|index| &self.nodes[index])
    }

    /// Devices that `index` cites as predicates.
    pub fn predicates_of(&self, index: usize) -> &[usize] {
        self.predicates.get(index).map(Vec::as_slice).unwrap_or_default()
    }

    /// Devices that cite `index` as a predicate.
    pub fn dependents_of(&self, index: usize) -> &[usize] {
        self.dependents.get(index).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every predicate precedes its dependents; ties keep input order.
    pub fn topo_order(&self) -> &[usize] {
        &self.topo_order
    }

    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.nodes.len()).filter(|&index| self.predicates[index].is_empty())
    }

    /// All transitive predicates of `index`, excluding `index` itself.
    pub fn ancestors(&self, index: usize) -> BTreeSet<usize> {
        self.reachable(index, &self.predicates)
    }

    /// All transitive dependents of `index`, excluding `index` itself.
    pub fn descendants(&self, index: usize) -> BTreeSet<usize> {
        self.reachable(index, &self.dependents)
    }

    fn reachable(&self, start: usize, adjacency: &[Vec<usize>]) -> BTreeSet<usize> {
        let mut seen = BTreeSet::new();
        if start >= self.nodes.len() {
            return seen;
        }

        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for &next in &adjacency[current] {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Shortest predicate chain from any root down to `target`, root first.
    pub fn shortest_path_from_root(&self, target: &str) -> Option<Vec<String>> {
        let target_index = self.index_of(target)?;

        let mut queue = VecDeque::from([target_index]);
        let mut visited = vec![false; self.nodes.len()];
        let mut child = vec![usize::MAX; self.nodes.len()];
        visited[target_index] = true;

        let mut root = None;
        while let Some(current) = queue.pop_front() {
            if self.predicates[current].is_empty() {
                root = Some(current);
                break;
            }

            for &next in &self.predicates[current] {
                if !visited[next] {
                    visited[next] = true;
                    child[next] = current;
                    queue.push_back(next);
                }
            }
        }

        let mut cursor = root?;
        let mut path = vec![self.nodes[cursor].id.clone()];
        while cursor != target_index {
            cursor = child[cursor];
            if cursor == usize::MAX {
                return None;
            }
            path.push(self.nodes[cursor].id.clone());
        }

        Some(path)
    }

    /// Induced subgraph over `keep`. Relative input and topological order survive.
    pub fn subgraph(&self, keep: &BTreeSet<usize>) -> Graph {
        let mut remap = vec![usize::MAX; self.nodes.len()];
        let mut nodes = Vec::with_capacity(keep.len());
        for &index in keep {
            if let Some(node) = self.nodes.get(index) {
                remap[index] = nodes.len();
                nodes.push(node.clone());
            }
        }

        let edge_pairs = self
            .edges
            .iter()
            .filter_map(|edge| {
                let predicate = remap[edge.predicate];
                let dependent = remap[edge.dependent];
                (predicate != usize::MAX && dependent != usize::MAX)
                    .then_some((predicate, dependent))
            })
            .collect();

        let topo_order = self
            .topo_order
            .iter()
            .map(|&index| remap[index])
            .filter(|&index| index != usize::MAX)
            .collect();

        Graph::from_validated(nodes, edge_pairs, topo_order)
    }
}
