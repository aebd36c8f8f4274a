use std::f32::consts::TAU;

use tracing::{debug, warn};

use crate::error::{LineageError, Result};
use crate::lineage::Graph;

use super::quadtree::QuadNode;
use super::{LayoutConfig, LayoutKind, LayoutResult, Position};

/// Opening angle for the Barnes-Hut approximation. Cells that look smaller
/// than this from a node are treated as one mass at their centre.
const THETA: f32 = 0.9;

/// Fallback for graphs above the layered limit. Fruchterman-Reingold style
/// with a cooling schedule, seeded on a circle jittered by id hash, so it is
/// deterministic without a random source. Repulsion goes through a quadtree,
/// so one iteration is O(n log n). Graphs above `force_max_nodes` are refused.
pub fn force_layout(graph: &Graph, config: &LayoutConfig) -> Result<LayoutResult> {
    let n = graph.node_count();
    if n > config.force_max_nodes {
        warn!(
            nodes = n,
            limit = config.force_max_nodes,
            "graph exceeds force-directed layout limit"
        );
        return Err(LineageError::LayoutTooLarge {
            node_count: n,
            limit: config.force_max_nodes,
        });
    }
    if n == 0 {
        return Ok(LayoutResult::empty(LayoutKind::ForceDirected));
    }

    let radius = config.node_width.max(config.node_height) * 0.5;
    let base_radius = (n as f32).sqrt() * radius * 2.0;
    let mut centers = graph
        .nodes()
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let angle = (index as f32 / n as f32) * TAU;
            let (jx, jy) = stable_pair(&node.id);
            let jitter = Position::new(jx, jy) * (radius * 0.9);
            let radial = Position::new(angle.cos(), angle.sin()) * base_radius;
            radial + jitter
        })
        .collect::<Vec<_>>();

    if n > 1 {
        relax(graph, &mut centers, radius, base_radius, config.force_iterations);
    }

    // Treating each center as its box's top-left corner and shifting by the
    // minimum puts the drawing at the origin without changing spacing.
    let min_x = centers.iter().map(|c| c.x).fold(f32::INFINITY, f32::min);
    let min_y = centers.iter().map(|c| c.y).fold(f32::INFINITY, f32::min);
    let max_x = centers.iter().map(|c| c.x).fold(f32::NEG_INFINITY, f32::max);
    let max_y = centers.iter().map(|c| c.y).fold(f32::NEG_INFINITY, f32::max);
    let origin = Position::new(min_x, min_y);

    debug!(nodes = n, "force-directed layout complete");

    Ok(LayoutResult {
        kind: LayoutKind::ForceDirected,
        positions: graph
            .nodes()
            .iter()
            .zip(&centers)
            .map(|(node, center)| (node.id.clone(), *center - origin))
            .collect(),
        ranks: Default::default(),
        width: max_x - min_x + config.node_width,
        height: max_y - min_y + config.node_height,
        crossings: 0,
    })
}

#[derive(Clone, Copy)]
struct Repulsion {
    k_sq: f32,
    min_distance: f32,
}

impl Repulsion {
    /// Push on a point `delta` away from `mass` units. Overlap correction only
    /// applies between single nodes.
    fn force(self, delta: Position, mass: f32, exact: bool) -> Position {
        let distance = delta.length().max(0.5);
        let direction = delta / distance;
        let mut magnitude = mass * self.k_sq / distance;
        if exact && distance < self.min_distance {
            magnitude += (self.min_distance - distance) * 2.4;
        }
        direction * magnitude
    }
}

fn accumulate_repulsion(
    node: &QuadNode,
    index: usize,
    positions: &[Position],
    repulsion: Repulsion,
    force: &mut Position,
) {
    if node.mass <= 0.0 {
        return;
    }

    let point = positions[index];

    if node.is_leaf() {
        for &other in &node.indices {
            if other != index {
                *force += repulsion.force(point - positions[other], 1.0, true);
            }
        }
        return;
    }

    let delta = point - node.center_of_mass;
    let distance = delta.length().max(0.01);
    let can_approximate = !node.bounds.contains(point)
        && node.bounds.side_length() / distance < THETA
        && node.mass > 1.0;

    if can_approximate {
        *force += repulsion.force(delta, node.mass, false);
        return;
    }

    for child in node.children.iter().flatten() {
        accumulate_repulsion(child, index, positions, repulsion, force);
    }
}

fn relax(
    graph: &Graph,
    positions: &mut [Position],
    radius: f32,
    base_radius: f32,
    iterations: usize,
) {
    let n = positions.len();
    let area = (base_radius * 2.4).powi(2);
    let k = (area / n as f32).sqrt().max(radius);
    let repulsion = Repulsion {
        k_sq: k * k,
        min_distance: radius * 2.2,
    };
    let mut temperature = (k * 5.5).max(140.0);

    for _ in 0..iterations {
        let current = &*positions;
        let Some(tree) = QuadNode::build(current) else {
            break;
        };

        let mut disp = (0..n)
            .map(|index| {
                let mut force = Position::ZERO;
                accumulate_repulsion(&tree, index, current, repulsion, &mut force);
                force
            })
            .collect::<Vec<_>>();

        for edge in graph.edges() {
            let (from, to) = edge.endpoints();
            let delta = positions[from] - positions[to];
            let distance = delta.length().max(0.5);
            let direction = delta / distance;
            let force = (distance - k) * 0.18;

            disp[from] -= direction * force;
            disp[to] += direction * force;
        }

        for (shift, position) in disp.iter_mut().zip(positions.iter()) {
            *shift -= *position * 0.0012;
        }

        for (position, shift) in positions.iter_mut().zip(&disp) {
            let length = shift.length();
            if length > 0.0 {
                *position += *shift / length * length.min(temperature) * 0.92;
            }
        }

        temperature *= 0.965;
        if temperature < 0.55 {
            break;
        }
    }
}

/// Two values in [-1, 1] derived from the id. BLAKE3 keeps them identical
/// across runs, platforms and toolchains.
fn stable_pair(id: &str) -> (f32, f32) {
    let hash = blake3::hash(id.as_bytes());
    let bytes = hash.as_bytes();
    let low = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let high = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

    let x = (low as f64 / u32::MAX as f64) as f32;
    let y = (high as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}
