//! Subset selection for size-bounded sync interests.
//!
//! When a full vector does not fit the transport budget, a node advertises
//! a subset instead. Two policies are offered:
//!
//! - **Recent + random**: the most recently updated entries, plus a uniform
//!   sample of the rest. Over repeated rounds every entry is advertised in
//!   expectation, so rarely updated nodes are not starved.
//! - **Recent + bucket**: the most recently updated entries, plus the next
//!   `bucket_size` entries of a rotating cursor over the rest. Every entry
//!   is advertised within `ceil(remaining / bucket_size)` calls.
//!
//! The bucket cursor is local state. Sorting candidates by [`NodeId`] gives
//! every node the same logical order, but nothing aligns cursors across
//! nodes.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

use svsync_core::{NodeId, VersionVector};

/// Reduces a version vector to a bounded-size advertisement.
#[derive(Debug, Clone)]
pub struct SubsetSelector {
    recent: usize,
    random: usize,
    bucket_size: usize,
    cursor: usize,
    rng: StdRng,
}

impl SubsetSelector {
    /// Create a selector seeded from entropy.
    pub fn new(recent: usize, random: usize, bucket_size: usize) -> Self {
        Self {
            recent,
            random,
            bucket_size,
            cursor: 0,
            rng: StdRng::from_entropy(),
        }
    }

    /// Replace the sampling RNG with a seeded one.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn set_recent(&mut self, recent: usize) {
        self.recent = recent;
    }

    pub fn set_random(&mut self, random: usize) {
        self.random = random;
    }

    pub fn set_bucket_size(&mut self, bucket_size: usize) {
        self.bucket_size = bucket_size;
    }

    /// Position of the bucket cursor within the candidate list.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Recent entries plus a uniform sample of the remainder.
    pub fn select_recent_and_random(&mut self, vv: &VersionVector) -> VersionVector {
        let (mut selected, candidates) = self.split_recent(vv);

        let amount = self.random.min(candidates.len());
        if amount > 0 {
            for idx in rand::seq::index::sample(&mut self.rng, candidates.len(), amount) {
                selected.insert(candidates[idx].clone());
            }
        }

        project(vv, &selected)
    }

    /// Recent entries plus the next bucket of the remainder.
    pub fn select_bucket(&mut self, vv: &VersionVector, globally_ordered: bool) -> VersionVector {
        let (mut selected, mut candidates) = self.split_recent(vv);
        if globally_ordered {
            candidates.sort();
        }

        let n = candidates.len();
        if self.bucket_size == 0 || n == 0 {
            self.cursor = 0;
            return project(vv, &selected);
        }
        if self.cursor >= n {
            self.cursor = 0;
        }

        let take = self.bucket_size.min(n);
        for i in 0..take {
            selected.insert(candidates[(self.cursor + i) % n].clone());
        }
        self.cursor = (self.cursor + take) % n;

        project(vv, &selected)
    }

    /// Split into the recent set and the remaining candidates.
    ///
    /// Candidates keep recency order (most recent first).
    fn split_recent(&self, vv: &VersionVector) -> (HashSet<NodeId>, Vec<NodeId>) {
        let mut order = vv.recency_order();
        let rest = order.split_off(self.recent.min(order.len()));
        (order.into_iter().collect(), rest)
    }
}

fn project(vv: &VersionVector, selected: &HashSet<NodeId>) -> VersionVector {
    vv.iter()
        .filter(|(node, _)| selected.contains(*node))
        .map(|(node, seq)| (node.clone(), seq))
        .collect()
}
