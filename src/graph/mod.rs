//! Citation graph construction and community detection.
//!
//! - `author_graph`: builds the undirected author-level citation graph from
//!   the entity database, with time-window and topic filtering
//! - `partition`: modularity-greedy partitioning, recursive sub-partitioning,
//!   induced community graphs

pub mod author_graph;
pub mod partition;

pub use author_graph::{build_author_graph, build_restricted_subgraph, AuthorGraph};
pub use partition::{
    induced_graph, partition, partition_tree, PartitionError, PartitionResult, PartitionTree,
    RecursionPolicy, SeedPolicy,
};

#[cfg(test)]
pub mod tests;
