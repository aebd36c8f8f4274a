//! Layered (Sugiyama-style) layout of a predicate graph.
//!
//! Three stages run in sequence: longest-path ranking over the graph's
//! topological order, barycenter ordering within each rank, and coordinate
//! assignment on a fixed grid. For a fixed graph and configuration the output
//! is bit-identical across runs.

mod coords;
mod force;
mod order;
mod quadtree;
mod rank;

use std::collections::BTreeMap;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LineageError, Result};
use crate::lineage::Graph;

pub use force::force_layout;
pub use rank::assign_ranks;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub node_width: f32,
    pub node_height: f32,
    /// Gap between the bottom of one rank and the top of the next.
    pub rank_spacing: f32,
    /// Gap between neighbouring boxes in the same rank.
    pub node_spacing: f32,
    pub ordering_passes: usize,
    pub center_ranks: bool,
    /// Above this node count the layered engine refuses with `LayoutTooLarge`.
    pub max_nodes: usize,
    pub force_iterations: usize,
    /// Hard ceiling for the force-directed fallback; above it even the
    /// fallback refuses with `LayoutTooLarge`.
    pub force_max_nodes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 180.0,
            node_height: 48.0,
            rank_spacing: 72.0,
            node_spacing: 24.0,
            ordering_passes: 4,
            center_ranks: true,
            max_nodes: 1500,
            force_iterations: 120,
            force_max_nodes: 20_000,
        }
    }
}

/// Top-left corner of a node box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl Add for Position {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Position {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Position {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl AddAssign for Position {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Position {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutKind {
    Layered,
    ForceDirected,
}

/// Positions for one graph. Each recomputation produces a fresh value.
#[derive(Clone, Debug, PartialEq)]
pub struct LayoutResult {
    kind: LayoutKind,
    positions: BTreeMap<String, Position>,
    ranks: BTreeMap<String, usize>,
    width: f32,
    height: f32,
    crossings: usize,
}

impl LayoutResult {
    pub fn empty(kind: LayoutKind) -> Self {
        Self {
            kind,
            positions: BTreeMap::new(),
            ranks: BTreeMap::new(),
            width: 0.0,
            height: 0.0,
            crossings: 0,
        }
    }

    pub fn kind(&self) -> LayoutKind {
        self.kind
    }

    pub fn position(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    /// Layer index, only present for layered layouts.
    pub fn rank(&self, id: &str) -> Option<usize> {
        self.ranks.get(id).copied()
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Crossings left between edges that join the same pair of ranks.
    pub fn crossings(&self) -> usize {
        self.crossings
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Computes the layered layout, or refuses graphs above `config.max_nodes`.
pub fn layout(graph: &Graph, config: &LayoutConfig) -> Result<LayoutResult> {
    let node_count = graph.node_count();
    if node_count > config.max_nodes {
        warn!(
            nodes = node_count,
            limit = config.max_nodes,
            "graph exceeds layered layout limit"
        );
        return Err(LineageError::LayoutTooLarge {
            node_count,
            limit: config.max_nodes,
        });
    }

    if graph.is_empty() {
        return Ok(LayoutResult::empty(LayoutKind::Layered));
    }

    let ranks = assign_ranks(graph);
    let (layers, crossings) = order::order_ranks(graph, &ranks, config.ordering_passes);
    let grid = coords::assign_coordinates(&layers, node_count, config);
    debug!(
        nodes = node_count,
        ranks = layers.len(),
        crossings,
        "layered layout complete"
    );

    let nodes = graph.nodes();
    Ok(LayoutResult {
        kind: LayoutKind::Layered,
        positions: nodes
            .iter()
            .zip(&grid.positions)
            .map(|(node, position)| (node.id.clone(), *position))
            .collect(),
        ranks: nodes
            .iter()
            .zip(&ranks)
            .map(|(node, rank)| (node.id.clone(), *rank))
            .collect(),
        width: grid.width,
        height: grid.height,
        crossings,
    })
}
