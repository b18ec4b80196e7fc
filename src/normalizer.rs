//! Translates identifiers between session space, op space, stable ids, and
//! between any two sessions (C6).

use crate::cluster::ClusterTable;
use crate::error::{Error, Result};
use crate::numeric_uuid;
use crate::session::SessionRegistry;
use crate::types::{OpSpaceId, SessionId, SessionIndex, SessionSpaceId, StableId};

/// Converts a session-space id into its op-space (wire) form.
///
/// Infallible: an already-final id is returned as-is, and an unfinalized
/// local id is returned as-is too (the recipient resolves it using the
/// accompanying session id).
pub fn to_op_space(clusters: &ClusterTable, local_session: SessionIndex, id: SessionSpaceId) -> OpSpaceId {
    let Some(g) = id.local_gen_count() else {
        return OpSpaceId(id.0);
    };
    match clusters.find_by_session_gen(local_session, g) {
        Some(c) => OpSpaceId(c.final_for_gen_count(g) as i64),
        None => OpSpaceId(id.0),
    }
}

/// Converts an op-space id originating at `origin_session` into its
/// session-space form in the local compressor.
pub fn to_session_space(
    clusters: &ClusterTable,
    sessions: &SessionRegistry,
    local_session: SessionIndex,
    id: OpSpaceId,
    origin_session: SessionId,
) -> Result<SessionSpaceId> {
    if let Some(f) = id.as_final() {
        clusters.find_by_final(f).ok_or(Error::UnknownId)?;
        return Ok(SessionSpaceId(id.0));
    }

    let g = id.local_gen_count().expect("non-final id must be local");
    let origin_index = sessions.index_of(origin_session).ok_or(Error::UnknownId)?;
    if let Some(c) = clusters.find_by_session_gen(origin_index, g) {
        return Ok(SessionSpaceId(c.final_for_gen_count(g) as i64));
    }
    if origin_index == local_session {
        Ok(SessionSpaceId(id.0))
    } else {
        Err(Error::UnfinalizedForeignId)
    }
}

/// Expands a session-space id into its underlying stable UUID.
pub fn decompress(
    clusters: &ClusterTable,
    sessions: &SessionRegistry,
    local_session: SessionIndex,
    id: SessionSpaceId,
) -> Result<StableId> {
    if let Some(g) = id.local_gen_count() {
        let base = sessions.session_base(local_session);
        return numeric_uuid::add(base, g - 1);
    }
    let f = id.as_final().expect("id is either local or final");
    let cluster = clusters.find_by_final(f).ok_or(Error::UnknownId)?;
    let base = sessions.session_base(cluster.session);
    numeric_uuid::add(base, cluster.gen_count_for_final(f) - 1)
}

/// Finds the compact session-space form of a stable UUID previously produced
/// by this document (locally minted or seen via a finalized remote cluster).
pub fn recompress(
    clusters: &ClusterTable,
    sessions: &SessionRegistry,
    local_session: SessionIndex,
    local_next_gen_count: u64,
    stable: StableId,
) -> Result<SessionSpaceId> {
    let (owner, base) = sessions.predecessor_by_base(stable).ok_or(Error::UnknownId)?;
    let offset = numeric_uuid::subtract(stable, base);
    if offset < 0 {
        return Err(Error::UnknownId);
    }
    let g = offset as u64 + 1;

    let max_known_gen_count = if owner == local_session {
        local_next_gen_count
    } else {
        clusters.total_finalized_gen_count(owner)
    };
    if g > max_known_gen_count {
        return Err(Error::UnknownId);
    }

    if owner == local_session {
        return Ok(match clusters.find_by_session_gen(owner, g) {
            Some(c) => SessionSpaceId(c.final_for_gen_count(g) as i64),
            None => SessionSpaceId(-(g as i64)),
        });
    }

    clusters
        .find_by_session_gen(owner, g)
        .map(|c| SessionSpaceId(c.final_for_gen_count(g) as i64))
        .ok_or(Error::UnknownId)
}
