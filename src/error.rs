use thiserror::Error;

/// Failures raised while building, laying out or selecting within a lineage graph.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LineageError {
    #[error("device id {id} appears more than once in the record set")]
    DuplicateNode { id: String },

    #[error("device {dependent_id} cites unknown predicate {missing_predicate_id}")]
    DanglingReference {
        dependent_id: String,
        missing_predicate_id: String,
    },

    #[error("cyclic predicate chain through {node_id}: {}", .cycle.join(" -> "))]
    CyclicGraph { node_id: String, cycle: Vec<String> },

    #[error("layered layout refused {node_count} nodes (limit {limit})")]
    LayoutTooLarge { node_count: usize, limit: usize },

    #[error("selection {id} is not a device in the current graph")]
    UnknownSelection { id: String },
}

impl LineageError {
    /// The record id a user should look at to fix the input, when there is one.
    pub fn offending_id(&self) -> Option<&str> {
        match self {
            Self::DuplicateNode { id } | Self::UnknownSelection { id } => Some(id),
            Self::DanglingReference { dependent_id, .. } => Some(dependent_id),
            Self::CyclicGraph { node_id, .. } => Some(node_id),
            Self::LayoutTooLarge { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LineageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_chain() {
        let error = LineageError::CyclicGraph {
            node_id: "A".to_owned(),
            cycle: vec!["A".to_owned(), "B".to_owned(), "A".to_owned()],
        };
        assert_eq!(error.to_string(), "cyclic predicate chain through A: A -> B -> A");
        assert_eq!(error.offending_id(), Some("A"));
    }

    #[test]
    fn dangling_reference_points_at_dependent() {
        let error = LineageError::DanglingReference {
            dependent_id: "K2".to_owned(),
            missing_predicate_id: "K9".to_owned(),
        };
        assert_eq!(error.offending_id(), Some("K2"));
        assert!(error.to_string().contains("K9"));
    }
}
