//! Street network model

pub mod components;
pub mod network;
pub mod speed;

pub use components::{StreetEdge, StreetNode, WeightMode};
pub use network::StreetGraph;
pub use speed::StreetType;
