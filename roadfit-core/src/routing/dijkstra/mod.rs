mod search;
mod state;

pub use search::{shortest_path, shortest_path_cached, shortest_paths_from};
