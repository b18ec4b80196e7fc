//! The cluster table: binds contiguous session GenCount runs to contiguous
//! FinalId runs, indexed two ways (C4).

use std::collections::HashMap;

use crate::types::SessionIndex;

/// A contiguous run of one session's GenCounts mapped to a contiguous run of
/// FinalIds. `count <= capacity` always; the slack between them is reserved
/// final-space that may later be filled in place by [`crate::finalizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cluster {
    /// The session this cluster belongs to.
    pub session: SessionIndex,
    /// First GenCount this cluster covers.
    pub first_gen_count: u64,
    /// Reserved width in final space.
    pub capacity: u32,
    /// Number of GenCounts actually finalized so far (`<= capacity`).
    pub count: u32,
    /// First FinalId this cluster covers.
    pub base_final: u64,
}

impl Cluster {
    /// True if `g` falls within the *finalized* (not merely reserved) range.
    pub fn covers_gen_count(&self, g: u64) -> bool {
        g >= self.first_gen_count && g < self.first_gen_count + self.count as u64
    }

    /// True if `f` falls within the *finalized* (not merely reserved) range.
    pub fn covers_final(&self, f: u64) -> bool {
        f >= self.base_final && f < self.base_final + self.count as u64
    }

    /// The FinalId a covered GenCount maps to.
    pub fn final_for_gen_count(&self, g: u64) -> u64 {
        self.base_final + (g - self.first_gen_count)
    }

    /// The GenCount a covered FinalId maps to.
    pub fn gen_count_for_final(&self, f: u64) -> u64 {
        self.first_gen_count + (f - self.base_final)
    }

    /// Exclusive end of this cluster's *reserved* final-space range.
    pub fn reserved_end(&self) -> u64 {
        self.base_final + self.capacity as u64
    }
}

/// Ordered collection of clusters with two lookup indexes sharing one vector.
#[derive(Debug, Clone, Default)]
pub struct ClusterTable {
    /// Sorted by `base_final`; append-only, so this is also insertion order.
    clusters: Vec<Cluster>,
    /// Per-session cluster indices, sorted by `first_gen_count` (append order
    /// within a session matches that too).
    by_session: HashMap<SessionIndex, Vec<usize>>,
    next_final: u64,
}

impl ClusterTable {
    /// Creates an empty table with `next_final` starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a table from a flat, `base_final`-ordered cluster list and an
    /// explicit `next_final`, as produced by deserialization.
    pub fn from_parts(clusters: Vec<Cluster>, next_final: u64) -> Self {
        let mut by_session: HashMap<SessionIndex, Vec<usize>> = HashMap::new();
        for (i, c) in clusters.iter().enumerate() {
            by_session.entry(c.session).or_default().push(i);
        }
        Self {
            clusters,
            by_session,
            next_final,
        }
    }

    /// The next FinalId that will be assigned by a freshly allocated cluster.
    pub fn next_final(&self) -> u64 {
        self.next_final
    }

    /// All clusters in `base_final` order, for serialization.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// The most recently allocated cluster for `session`, if any.
    pub fn active_cluster(&self, session: SessionIndex) -> Option<&Cluster> {
        self.by_session
            .get(&session)
            .and_then(|indices| indices.last())
            .map(|&i| &self.clusters[i])
    }

    /// Rightmost cluster with `base_final <= f`, confirmed to actually cover
    /// `f` (not merely reserve space for it).
    pub fn find_by_final(&self, f: u64) -> Option<&Cluster> {
        let pos = self.clusters.partition_point(|c| c.base_final <= f);
        if pos == 0 {
            return None;
        }
        let candidate = &self.clusters[pos - 1];
        candidate.covers_final(f).then_some(candidate)
    }

    /// Rightmost cluster of `session` with `first_gen_count <= g`, confirmed
    /// to actually cover `g`.
    pub fn find_by_session_gen(&self, session: SessionIndex, g: u64) -> Option<&Cluster> {
        let indices = self.by_session.get(&session)?;
        let pos = indices.partition_point(|&i| self.clusters[i].first_gen_count <= g);
        if pos == 0 {
            return None;
        }
        let candidate = &self.clusters[indices[pos - 1]];
        candidate.covers_gen_count(g).then_some(candidate)
    }

    /// Sum of `count` across every cluster finalized for `session`: the
    /// highest GenCount known to be finalized for a remote session.
    pub fn total_finalized_gen_count(&self, session: SessionIndex) -> u64 {
        self.by_session
            .get(&session)
            .map(|indices| {
                indices
                    .iter()
                    .map(|&i| self.clusters[i].count as u64)
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Extends the active cluster of `session` in place by `additional`
    /// GenCounts. Caller must have already verified this is legal (capacity
    /// headroom and frontier position); panics on a logic error since this is
    /// an internal invariant, never a caller-triggerable condition.
    pub(crate) fn extend_active(&mut self, session: SessionIndex, additional: u32) {
        let idx = *self
            .by_session
            .get(&session)
            .and_then(|v| v.last())
            .expect("extend_active called with no active cluster");
        self.clusters[idx].count += additional;
    }

    /// Appends a newly allocated cluster. Caller must ensure `cluster.base_final
    /// == self.next_final()`; this is what keeps the by-final index sorted
    /// without a real insertion.
    pub(crate) fn allocate_cluster(&mut self, cluster: Cluster) {
        debug_assert_eq!(cluster.base_final, self.next_final);
        let idx = self.clusters.len();
        self.next_final = cluster.reserved_end();
        self.by_session.entry(cluster.session).or_default().push(idx);
        self.clusters.push(cluster);
    }
}
