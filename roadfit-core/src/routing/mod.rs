//! Shortest paths over the street graph

mod batch;
mod budget;
mod cache;
mod config;
pub mod dijkstra;
mod path;

pub use batch::{BatchResult, route_pairs};
pub use budget::SearchBudget;
pub use cache::PathCache;
pub use config::RoutingConfig;
pub use dijkstra::{shortest_path, shortest_path_cached, shortest_paths_from};
pub use path::Path;
