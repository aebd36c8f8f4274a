use super::{LayoutConfig, Position};

pub(super) struct Grid {
    pub(super) positions: Vec<Position>,
    pub(super) width: f32,
    pub(super) height: f32,
}

/// Rank index maps to y, slot within the rank to x. Positions are box top-left
/// corners and the drawing starts at the origin.
pub(super) fn assign_coordinates(
    layers: &[Vec<usize>],
    node_count: usize,
    config: &LayoutConfig,
) -> Grid {
    let column_step = config.node_width + config.node_spacing;
    let row_step = config.node_height + config.rank_spacing;
    let rank_width = |len: usize| {
        if len == 0 {
            0.0
        } else {
            len as f32 * config.node_width + (len - 1) as f32 * config.node_spacing
        }
    };

    let widest = layers.iter().map(Vec::len).max().unwrap_or(0);
    let width = rank_width(widest);
    let height = if layers.is_empty() {
        0.0
    } else {
        layers.len() as f32 * config.node_height
            + (layers.len() - 1) as f32 * config.rank_spacing
    };

    let mut positions = vec![Position::ZERO; node_count];
    for (rank, layer) in layers.iter().enumerate() {
        let offset = if config.center_ranks {
            (width - rank_width(layer.len())) / 2.0
        } else {
            0.0
        };
        let y = rank as f32 * row_step;

        for (slot, &node) in layer.iter().enumerate() {
            positions[node] = Position::new(offset + slot as f32 * column_step, y);
        }
    }

    Grid {
        positions,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(center_ranks: bool) -> LayoutConfig {
        LayoutConfig {
            node_width: 100.0,
            node_height: 40.0,
            rank_spacing: 60.0,
            node_spacing: 20.0,
            center_ranks,
            ..LayoutConfig::default()
        }
    }

    #[test]
    fn narrow_rank_is_centred_under_wide_one() {
        let grid = assign_coordinates(&[vec![0, 1, 2], vec![3]], 4, &config(true));

        assert_eq!(grid.width, 340.0);
        assert_eq!(grid.height, 140.0);
        assert_eq!(grid.positions[0], Position::new(0.0, 0.0));
        assert_eq!(grid.positions[2], Position::new(240.0, 0.0));
        assert_eq!(grid.positions[3], Position::new(120.0, 100.0));
    }

    #[test]
    fn left_aligned_when_centering_is_off() {
        let grid = assign_coordinates(&[vec![0, 1], vec![2]], 3, &config(false));
        assert_eq!(grid.positions[2], Position::new(0.0, 100.0));
    }

    #[test]
    fn boxes_in_a_rank_never_overlap() {
        let grid = assign_coordinates(&[vec![4, 2, 0, 1, 3]], 5, &config(true));
        let mut xs = grid.positions.iter().map(|p| p.x).collect::<Vec<_>>();
        xs.sort_by(f32::total_cmp);
        for pair in xs.windows(2) {
            assert!(pair[1] - pair[0] >= 100.0);
        }
    }
}
