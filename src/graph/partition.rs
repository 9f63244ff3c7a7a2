//! Modularity-greedy community detection (Louvain local-move + aggregation)
//! and recursive sub-partitioning.
//!
//! The algorithm repeats two phases until modularity stops improving: a local
//! moving phase shifting nodes between communities along the best modularity
//! gain, and an aggregation phase collapsing each community into a super-node
//! of an induced weighted graph. Community ids in the returned mapping are
//! dense starting at 0, so `max(id) + 1` is the community count.

use super::author_graph::{build_restricted_subgraph, AuthorGraph};
use crate::db::entities::AuthorId;
use crate::db::Database;
use crate::logger;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Fixed seed used by [`SeedPolicy::Default`]; reproducible across runs.
const DEFAULT_SEED: u64 = 1805;
/// Minimum modularity improvement to keep iterating.
const MIN_IMPROVEMENT: f64 = 1e-7;
/// Safety bound on local-move sweeps per level.
const MAX_SWEEPS: usize = 100;

/// How the node-visiting order is randomized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedPolicy {
    /// Implementation-default seed; reproducible.
    Default,
    /// Explicit seed; fully reproducible.
    Seed(u64),
    /// True randomization; the drawn seed is reported in the result.
    Random,
}

impl SeedPolicy {
    fn draw(self) -> u64 {
        match self {
            SeedPolicy::Default => DEFAULT_SEED,
            SeedPolicy::Seed(seed) => seed,
            SeedPolicy::Random => rand::thread_rng().gen(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("partition modularity {modularity:.4} is below the configured threshold {threshold:.4}")]
    BelowThreshold { modularity: f64, threshold: f64 },
}

/// A completed partition run over one graph.
#[derive(Debug, Clone)]
pub struct PartitionResult {
    /// Total mapping from author id to dense community id.
    pub assignment: HashMap<AuthorId, usize>,
    pub modularity: f64,
    /// The seed the run actually used.
    pub seed: u64,
    pub community_count: usize,
}

impl PartitionResult {
    /// Member author ids per community, indexed by community id.
    pub fn community_members(&self) -> Vec<Vec<AuthorId>> {
        let mut members: Vec<Vec<AuthorId>> = vec![Vec::new(); self.community_count];
        for (auid, &community) in &self.assignment {
            members[community].push(auid.clone());
        }
        for group in &mut members {
            group.sort();
        }
        members
    }
}

/// Runs community detection over `graph`.
///
/// With a configured `modularity_threshold`, a main partition whose Q falls
/// short is reported as a structured failure and no communities are derived;
/// the caller is expected to abort the analysis run rather than retry.
pub fn partition(
    graph: &AuthorGraph,
    seed_policy: SeedPolicy,
    modularity_threshold: Option<f64>,
) -> Result<PartitionResult, PartitionError> {
    let seed = seed_policy.draw();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let adjacency = graph.adjacency();
    let n = adjacency.len();

    let assignment_indices = if n == 0 {
        Vec::new()
    } else if total_weight(adjacency) == 0.0 {
        // Zero-edge graph: every node is its own community, deterministically.
        (0..n).collect()
    } else {
        louvain(adjacency, &mut rng)
    };

    let modularity = modularity_of(adjacency, &assignment_indices);
    if let Some(threshold) = modularity_threshold {
        if modularity < threshold {
            logger::warn(&format!(
                "Partition modularity {:.4} is below threshold {:.4}; aborting",
                modularity, threshold
            ));
            return Err(PartitionError::BelowThreshold {
                modularity,
                threshold,
            });
        }
    }

    let community_count = assignment_indices.iter().copied().max().map_or(0, |m| m + 1);
    let assignment = graph
        .nodes()
        .iter()
        .cloned()
        .zip(assignment_indices.iter().copied())
        .collect();
    Ok(PartitionResult {
        assignment,
        modularity,
        seed,
        community_count,
    })
}

fn total_weight(adjacency: &[BTreeMap<usize, f64>]) -> f64 {
    // Ordered-pair sum over a symmetric structure; halve for the edge total.
    adjacency
        .iter()
        .map(|row| row.values().sum::<f64>())
        .sum::<f64>()
        / 2.0
}

fn degrees(adjacency: &[BTreeMap<usize, f64>]) -> Vec<f64> {
    adjacency.iter().map(|row| row.values().sum()).collect()
}

/// Network modularity Q of an assignment, community-sum formulation.
pub fn modularity_of(adjacency: &[BTreeMap<usize, f64>], assignment: &[usize]) -> f64 {
    let m = total_weight(adjacency);
    if m == 0.0 {
        return 0.0;
    }
    let k = degrees(adjacency);
    let community_count = assignment.iter().copied().max().map_or(0, |c| c + 1);
    let mut internal = vec![0.0; community_count];
    let mut totals = vec![0.0; community_count];
    for (i, row) in adjacency.iter().enumerate() {
        totals[assignment[i]] += k[i];
        for (&j, &weight) in row {
            if assignment[i] == assignment[j] {
                internal[assignment[i]] += weight;
            }
        }
    }
    (0..community_count)
        .map(|c| internal[c] / (2.0 * m) - (totals[c] / (2.0 * m)).powi(2))
        .sum()
}

/// Full Louvain: local move, aggregate, repeat.
fn louvain(adjacency: &[BTreeMap<usize, f64>], rng: &mut rand::rngs::StdRng) -> Vec<usize> {
    let n = adjacency.len();
    // Mapping from the original nodes into the current meta-graph's communities.
    let mut node_to_community: Vec<usize> = (0..n).collect();
    let mut current: Vec<BTreeMap<usize, f64>> = adjacency.to_vec();
    let mut current_modularity = modularity_of(adjacency, &node_to_community);

    loop {
        let local = local_move(&current, rng);
        let (renumbered, community_count) = renumber(&local);
        node_to_community = node_to_community
            .iter()
            .map(|&meta| renumbered[meta])
            .collect();

        let new_modularity = modularity_of(adjacency, &node_to_community);
        if new_modularity - current_modularity < MIN_IMPROVEMENT
            || community_count == current.len()
        {
            break;
        }
        current_modularity = new_modularity;
        current = aggregate(&current, &renumbered, community_count);
    }
    renumber(&node_to_community).0
}

/// One level of local moving: starts from singletons and greedily shifts
/// nodes to the neighboring community with the best modularity gain, visiting
/// nodes in seeded-random order until a full sweep makes no move.
fn local_move(adjacency: &[BTreeMap<usize, f64>], rng: &mut rand::rngs::StdRng) -> Vec<usize> {
    let n = adjacency.len();
    let k = degrees(adjacency);
    let m = total_weight(adjacency);
    let mut community: Vec<usize> = (0..n).collect();
    let mut community_total: Vec<f64> = k.clone();

    let mut order: Vec<usize> = (0..n).collect();
    for _ in 0..MAX_SWEEPS {
        order.shuffle(rng);
        let mut moved = false;
        for &node in &order {
            let home = community[node];
            // Edge weight from this node into each neighboring community.
            let mut neighbor_weights: BTreeMap<usize, f64> = BTreeMap::new();
            for (&neighbor, &weight) in &adjacency[node] {
                if neighbor != node {
                    *neighbor_weights.entry(community[neighbor]).or_default() += weight;
                }
            }
            community_total[home] -= k[node];
            let stay_weight = neighbor_weights.get(&home).copied().unwrap_or(0.0);
            let mut best = home;
            let mut best_gain = stay_weight - community_total[home] * k[node] / (2.0 * m);
            for (&candidate, &weight) in &neighbor_weights {
                if candidate == home {
                    continue;
                }
                let gain = weight - community_total[candidate] * k[node] / (2.0 * m);
                if gain > best_gain + f64::EPSILON {
                    best_gain = gain;
                    best = candidate;
                }
            }
            community_total[best] += k[node];
            if best != home {
                community[node] = best;
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
    community
}

/// Renumbers community labels to be dense from zero.
fn renumber(assignment: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    let mut next = 0usize;
    let renumbered = assignment
        .iter()
        .map(|&label| {
            *mapping.entry(label).or_insert_with(|| {
                let id = next;
                next += 1;
                id
            })
        })
        .collect();
    (renumbered, next)
}

/// Collapses communities into super-nodes; intra-community weight lands on
/// the diagonal.
fn aggregate(
    adjacency: &[BTreeMap<usize, f64>],
    assignment: &[usize],
    community_count: usize,
) -> Vec<BTreeMap<usize, f64>> {
    let mut meta: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); community_count];
    for (i, row) in adjacency.iter().enumerate() {
        for (&j, &weight) in row {
            *meta[assignment[i]].entry(assignment[j]).or_default() += weight;
        }
    }
    meta
}

/// The induced community graph: one node per community, edge weights equal to
/// the aggregate inter-community edge counts of the underlying graph.
pub fn induced_graph(graph: &AuthorGraph, result: &PartitionResult) -> Vec<BTreeMap<usize, f64>> {
    let nodes = graph.nodes();
    let assignment: Vec<usize> = nodes
        .iter()
        .map(|auid| result.assignment.get(auid).copied().unwrap_or(0))
        .collect();
    aggregate(graph.adjacency(), &assignment, result.community_count)
}

/// Per-level size threshold: the base threshold divided by `divider` once per
/// level below the main partition.
pub fn level_size_threshold(base: usize, divider: usize, level: usize) -> usize {
    let mut threshold = base as f64;
    for _ in 0..level {
        threshold /= divider.max(1) as f64;
    }
    threshold as usize
}

/// Recursive partition of a graph and the qualifying communities below it.
#[derive(Debug)]
pub struct PartitionTree {
    pub level: usize,
    pub result: PartitionResult,
    /// Member author ids per community id.
    pub members: Vec<Vec<AuthorId>>,
    /// Sub-partitions, keyed by the community id they refine.
    pub children: HashMap<usize, PartitionTree>,
}

/// Parameters for recursive sub-partitioning.
#[derive(Debug, Clone, Copy)]
pub struct RecursionPolicy {
    pub max_depth: usize,
    pub base_size_threshold: usize,
    pub size_threshold_divider: usize,
}

/// Partitions `graph`, then recursively re-partitions every community whose
/// member count meets the per-level threshold, down to `max_depth` levels
/// below the main partition. The modularity threshold applies to the main
/// partition only.
pub fn partition_tree(
    db: &Database,
    graph: &AuthorGraph,
    seed_policy: SeedPolicy,
    modularity_threshold: Option<f64>,
    policy: RecursionPolicy,
) -> Result<PartitionTree, PartitionError> {
    partition_level(db, graph, seed_policy, modularity_threshold, policy, 0)
}

fn partition_level(
    db: &Database,
    graph: &AuthorGraph,
    seed_policy: SeedPolicy,
    modularity_threshold: Option<f64>,
    policy: RecursionPolicy,
    level: usize,
) -> Result<PartitionTree, PartitionError> {
    let result = partition(graph, seed_policy, modularity_threshold)?;
    logger::info(&format!(
        "Level {} partition: {} communities, modularity {:.4}, seed {}",
        level, result.community_count, result.modularity, result.seed
    ));
    let members = result.community_members();
    let mut children = HashMap::new();
    if level < policy.max_depth {
        let recurse_threshold = level_size_threshold(
            policy.base_size_threshold,
            policy.size_threshold_divider,
            level,
        );
        for (community_id, group) in members.iter().enumerate() {
            if group.len() >= recurse_threshold.max(1) {
                let sub_graph = build_restricted_subgraph(db, group);
                // Sub-partitions never re-check the modularity threshold.
                let child =
                    partition_level(db, &sub_graph, seed_policy, None, policy, level + 1)?;
                children.insert(community_id, child);
            }
        }
    }
    Ok(PartitionTree {
        level,
        result,
        members,
        children,
    })
}
