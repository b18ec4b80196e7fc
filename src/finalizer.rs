//! Applies one totally-ordered finalization range to the cluster table (C5).

use crate::cluster::{Cluster, ClusterTable};
use crate::error::{Error, Result};
use crate::types::{SessionIndex, MAX_SAFE_INTEGER};

/// One `(session, first_gen_count, count)` announcement, already resolved to
/// an interned [`SessionIndex`].
#[derive(Debug, Clone, Copy)]
pub struct FinalizationRange {
    /// The session the finalized GenCounts belong to.
    pub session: SessionIndex,
    /// First GenCount this range finalizes.
    pub first_gen_count: u64,
    /// Number of GenCounts this range finalizes; must be nonzero.
    pub count: u64,
}

/// Applies `range` to `table`, either extending the session's active cluster
/// in place or allocating a new one, per §4.5.
pub fn finalize_range(
    table: &mut ClusterTable,
    cluster_capacity_policy: u32,
    range: FinalizationRange,
) -> Result<()> {
    if range.count == 0 {
        return Err(Error::protocol("finalization range must cover at least one id"));
    }

    if let Some(active) = table.active_cluster(range.session).copied() {
        let active_end = active.first_gen_count + active.count as u64;
        if active_end != range.first_gen_count {
            return Err(Error::protocol(format!(
                "non-contiguous finalization range for {}: expected first_gen_count {}, got {}",
                range.session, active_end, range.first_gen_count
            )));
        }

        let fits_capacity = active.count as u64 + range.count <= active.capacity as u64;
        let still_at_frontier = active.reserved_end() == table.next_final();
        if fits_capacity && still_at_frontier {
            let additional = range.count as u32;
            log::debug!(
                "extending active cluster of {} in place by {} ids",
                range.session,
                additional
            );
            table.extend_active(range.session, additional);
            return Ok(());
        }
    } else if range.first_gen_count != 1 {
        return Err(Error::protocol(format!(
            "non-contiguous finalization range for {}: expected first_gen_count 1, got {}",
            range.session, range.first_gen_count
        )));
    }

    let count = u32::try_from(range.count)
        .map_err(|_| Error::overflow("finalization range count does not fit in u32"))?;
    let capacity = cluster_capacity_policy.max(count);
    let base_final = table.next_final();
    if base_final
        .checked_add(capacity as u64)
        .map_or(true, |end| end > MAX_SAFE_INTEGER)
    {
        return Err(Error::overflow("final id space exhausted"));
    }

    log::debug!(
        "allocating new cluster for {} at base_final={} capacity={} count={}",
        range.session,
        base_final,
        capacity,
        count
    );
    table.allocate_cluster(Cluster {
        session: range.session,
        first_gen_count: range.first_gen_count,
        capacity,
        count,
        base_final,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(session: u32, first_gen_count: u64, count: u64) -> FinalizationRange {
        FinalizationRange {
            session: SessionIndex(session),
            first_gen_count,
            count,
        }
    }

    #[test]
    fn zero_count_is_rejected() {
        let mut table = ClusterTable::new();
        assert!(matches!(
            finalize_range(&mut table, 5, range(0, 1, 0)),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn first_range_allocates_with_policy_capacity() {
        let mut table = ClusterTable::new();
        finalize_range(&mut table, 5, range(0, 1, 2)).unwrap();
        let c = table.active_cluster(SessionIndex(0)).unwrap();
        assert_eq!(c.base_final, 0);
        assert_eq!(c.capacity, 5);
        assert_eq!(c.count, 2);
        assert_eq!(table.next_final(), 5);
    }

    #[test]
    fn capacity_grows_to_fit_a_large_range() {
        let mut table = ClusterTable::new();
        finalize_range(&mut table, 2, range(0, 1, 7)).unwrap();
        let c = table.active_cluster(SessionIndex(0)).unwrap();
        assert_eq!(c.capacity, 7);
    }

    #[test]
    fn extends_in_place_when_still_at_frontier() {
        let mut table = ClusterTable::new();
        finalize_range(&mut table, 5, range(0, 1, 2)).unwrap();
        finalize_range(&mut table, 5, range(0, 3, 1)).unwrap();
        let c = table.active_cluster(SessionIndex(0)).unwrap();
        assert_eq!(c.count, 3);
        assert_eq!(c.base_final, 0);
        assert_eq!(table.next_final(), 5);
    }

    #[test]
    fn allocates_new_cluster_when_another_session_intervened() {
        let mut table = ClusterTable::new();
        finalize_range(&mut table, 5, range(0, 1, 2)).unwrap(); // A: base=0 cap=5 count=2
        finalize_range(&mut table, 5, range(1, 1, 3)).unwrap(); // B: base=5 cap=5 count=3
        finalize_range(&mut table, 5, range(0, 3, 2)).unwrap(); // A cannot extend, slack abandoned
        let a = table.active_cluster(SessionIndex(0)).unwrap();
        assert_eq!(a.base_final, 10);
        assert_eq!(a.count, 2);
        let b = table.active_cluster(SessionIndex(1)).unwrap();
        assert_eq!(b.count, 3);
        assert_eq!(table.next_final(), 15);
    }

    #[test]
    fn non_contiguous_range_is_rejected() {
        let mut table = ClusterTable::new();
        finalize_range(&mut table, 5, range(0, 1, 2)).unwrap();
        assert!(matches!(
            finalize_range(&mut table, 5, range(0, 4, 1)),
            Err(Error::Protocol(_))
        ));
    }
}
