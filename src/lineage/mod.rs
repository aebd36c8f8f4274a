mod build;
mod graph;
mod record;

pub use build::build;
pub use graph::{DeviceNode, Graph, PredicateEdge};
pub use record::{DeviceRecord, load_records, parse_records};
