//! The public facade tying C1-C8 together (C11).

use uuid::Uuid;

use crate::cluster::ClusterTable;
use crate::error::{Error, Result};
use crate::finalizer::{self, FinalizationRange};
use crate::normalizer;
use crate::range_buffer::RangeBuffer;
use crate::serialize::{self, SerializedSessionState, SerializedState};
use crate::session::SessionRegistry;
use crate::types::{IdCreationRange, OpSpaceId, SessionId, SessionIndex, SessionSpaceId, StableId};

/// Largest legal value for `cluster_capacity_policy`.
pub const MAX_CLUSTER_CAPACITY: u32 = 1 << 20;

/// Default `cluster_capacity_policy` for a freshly constructed compressor.
pub const DEFAULT_CLUSTER_CAPACITY: u32 = 512;

/// Construction options for [`Compressor::new`].
#[derive(Debug, Clone)]
pub struct CompressorOptions {
    /// The session identity to resume or create. `None` mints a fresh
    /// random v4 UUID.
    pub session_id: Option<SessionId>,
    /// Initial capacity reserved for each newly allocated cluster.
    pub cluster_capacity_policy: u32,
}

impl Default for CompressorOptions {
    fn default() -> Self {
        Self {
            session_id: None,
            cluster_capacity_policy: DEFAULT_CLUSTER_CAPACITY,
        }
    }
}

/// A single-threaded, non-reentrant id compressor. See the crate-level docs
/// for the model this implements.
#[derive(Debug, Clone)]
pub struct Compressor {
    sessions: SessionRegistry,
    clusters: ClusterTable,
    range_buffer: RangeBuffer,
    local_session: SessionIndex,
    cluster_capacity_policy: u32,
}

impl Compressor {
    /// Creates a new compressor, interning (and if absent, minting) its local
    /// session id.
    pub fn new(options: CompressorOptions) -> Result<Self> {
        if options.cluster_capacity_policy == 0 || options.cluster_capacity_policy > MAX_CLUSTER_CAPACITY {
            return Err(Error::invalid_argument(format!(
                "cluster capacity {} out of range [1, {MAX_CLUSTER_CAPACITY}]",
                options.cluster_capacity_policy
            )));
        }
        let mut sessions = SessionRegistry::new();
        let session_id = options.session_id.unwrap_or_else(Uuid::new_v4);
        let local_session = sessions.intern(session_id);
        log::debug!("created id compressor for session {session_id}");
        Ok(Self {
            sessions,
            clusters: ClusterTable::new(),
            range_buffer: RangeBuffer::new(),
            local_session,
            cluster_capacity_policy: options.cluster_capacity_policy,
        })
    }

    /// The local session's identity.
    pub fn session_id(&self) -> SessionId {
        self.sessions.session_id(self.local_session)
    }

    /// Changes the capacity reserved for clusters allocated from now on.
    /// Does not affect clusters already allocated.
    pub fn set_cluster_capacity(&mut self, capacity: u32) -> Result<()> {
        if capacity == 0 || capacity > MAX_CLUSTER_CAPACITY {
            return Err(Error::invalid_argument(format!(
                "cluster capacity {capacity} out of range [1, {MAX_CLUSTER_CAPACITY}]"
            )));
        }
        self.cluster_capacity_policy = capacity;
        Ok(())
    }

    /// Mints the next compressed id for the local session, in session space.
    pub fn generate_compressed_id(&mut self) -> Result<SessionSpaceId> {
        let g = self.range_buffer.mint()?;
        let id = match self.clusters.find_by_session_gen(self.local_session, g) {
            Some(c) => SessionSpaceId(c.final_for_gen_count(g) as i64),
            None => SessionSpaceId(-(g as i64)),
        };
        log::trace!("generated id {} (gen count {g})", id.0);
        Ok(id)
    }

    /// Drains the not-yet-broadcast local GenCount range, if any.
    pub fn take_next_creation_range(&mut self) -> IdCreationRange {
        let ids = self.range_buffer.take_next_range();
        IdCreationRange {
            session_id: self.session_id(),
            ids,
        }
    }

    /// Applies a finalization range delivered by the total-order broadcast.
    pub fn finalize_creation_range(&mut self, range: &IdCreationRange) -> Result<()> {
        let Some(ids) = &range.ids else {
            log::trace!("ignoring empty creation range for session {}", range.session_id);
            return Ok(());
        };
        if ids.first_gen_count == 0 || ids.last_gen_count < ids.first_gen_count {
            return Err(Error::invalid_argument(format!(
                "invalid gen count range [{}, {}]",
                ids.first_gen_count, ids.last_gen_count
            )));
        }

        let session_index = self.sessions.intern(range.session_id);
        let count = ids.last_gen_count - ids.first_gen_count + 1;
        finalizer::finalize_range(
            &mut self.clusters,
            self.cluster_capacity_policy,
            FinalizationRange {
                session: session_index,
                first_gen_count: ids.first_gen_count,
                count,
            },
        )?;
        log::trace!(
            "finalized {count} ids for session {} starting at gen count {}",
            range.session_id,
            ids.first_gen_count
        );
        Ok(())
    }

    /// Converts a session-space id to its op-space (wire) form. Infallible.
    pub fn normalize_to_op_space(&self, id: SessionSpaceId) -> OpSpaceId {
        normalizer::to_op_space(&self.clusters, self.local_session, id)
    }

    /// Converts an op-space id, tagged with the session it originated from,
    /// to its session-space form in this compressor.
    pub fn normalize_to_session_space(&self, id: OpSpaceId, origin_session: SessionId) -> Result<SessionSpaceId> {
        normalizer::to_session_space(&self.clusters, &self.sessions, self.local_session, id, origin_session)
    }

    /// Expands a session-space id into the stable UUID it stands for.
    pub fn decompress(&self, id: SessionSpaceId) -> Result<StableId> {
        normalizer::decompress(&self.clusters, &self.sessions, self.local_session, id)
    }

    /// Like [`Compressor::decompress`], but returns `None` instead of
    /// [`Error::UnknownId`].
    pub fn try_decompress(&self, id: SessionSpaceId) -> Option<StableId> {
        self.decompress(id).ok()
    }

    /// Finds the compact session-space form of a previously seen stable UUID.
    pub fn recompress(&self, id: StableId) -> Result<SessionSpaceId> {
        normalizer::recompress(
            &self.clusters,
            &self.sessions,
            self.local_session,
            self.range_buffer.next_local_gen_count(),
            id,
        )
    }

    /// Like [`Compressor::recompress`], but returns `None` instead of
    /// [`Error::UnknownId`].
    pub fn try_recompress(&self, id: StableId) -> Option<SessionSpaceId> {
        self.recompress(id).ok()
    }

    /// Serializes this compressor's entire state. When `with_session` is
    /// true, the local session identity and its pending-generation counters
    /// are included too, allowing a byte-identical resume via
    /// [`Compressor::deserialize`] with no extra session id needed.
    pub fn serialize(&self, with_session: bool) -> Vec<u8> {
        let state = SerializedState {
            cluster_capacity_policy: self.cluster_capacity_policy,
            sessions: self.sessions.iter().map(|(_, id)| id).collect(),
            clusters: self.clusters.clusters().to_vec(),
            next_final: self.clusters.next_final(),
            session_state: with_session.then(|| SerializedSessionState {
                local_session_index: self.local_session.0,
                next_local_gen_count: self.range_buffer.next_local_gen_count(),
                last_taken_gen_count: self.range_buffer.last_taken_gen_count(),
            }),
        };
        let mut bytes = Vec::new();
        serialize::write(&state, &mut bytes);
        bytes
    }

    /// Rebuilds a compressor from bytes produced by [`Compressor::serialize`].
    ///
    /// If the blob was written with `with_session=false`, `new_session_id`
    /// must supply a session id that does not collide with any session
    /// already recorded in the blob.
    pub fn deserialize(bytes: &[u8], new_session_id: Option<SessionId>) -> Result<Self> {
        let state = serialize::read(bytes)?;
        let sessions = SessionRegistry::from_ordered_bases(state.sessions.clone());
        let clusters = ClusterTable::from_parts(state.clusters, state.next_final);

        let (local_session, range_buffer) = match state.session_state {
            Some(session_state) => {
                if new_session_id.is_some() {
                    log::warn!("ignoring new_session_id: blob already carries a local session");
                }
                (
                    SessionIndex(session_state.local_session_index),
                    RangeBuffer::from_parts(
                        session_state.next_local_gen_count,
                        session_state.last_taken_gen_count,
                    ),
                )
            }
            None => {
                let new_id = new_session_id
                    .ok_or_else(|| Error::protocol("deserializing a session-less blob requires new_session_id"))?;
                if sessions.index_of(new_id).is_some() {
                    return Err(Error::protocol(format!(
                        "new_session_id {new_id} collides with a session already recorded in the blob"
                    )));
                }
                let mut sessions = sessions;
                let idx = sessions.intern(new_id);
                return Ok(Self {
                    sessions,
                    clusters,
                    range_buffer: RangeBuffer::new(),
                    local_session: idx,
                    cluster_capacity_policy: state.cluster_capacity_policy,
                });
            }
        };

        Ok(Self {
            sessions,
            clusters,
            range_buffer,
            local_session,
            cluster_capacity_policy: state.cluster_capacity_policy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compressor_with_capacity(capacity: u32) -> Compressor {
        Compressor::new(CompressorOptions {
            session_id: None,
            cluster_capacity_policy: capacity,
        })
        .unwrap()
    }

    #[test]
    fn generate_returns_decreasing_local_ids() {
        let mut c = compressor_with_capacity(5);
        assert_eq!(c.generate_compressed_id().unwrap().0, -1);
        assert_eq!(c.generate_compressed_id().unwrap().0, -2);
        assert_eq!(c.generate_compressed_id().unwrap().0, -3);
    }

    #[test]
    fn set_cluster_capacity_rejects_out_of_range() {
        let mut c = compressor_with_capacity(5);
        assert!(c.set_cluster_capacity(0).is_err());
        assert!(c.set_cluster_capacity(MAX_CLUSTER_CAPACITY + 1).is_err());
        assert!(c.set_cluster_capacity(1).is_ok());
    }

    #[test]
    fn new_rejects_invalid_capacity() {
        assert!(Compressor::new(CompressorOptions {
            session_id: None,
            cluster_capacity_policy: 0,
        })
        .is_err());
    }

    #[test]
    fn self_finalization_makes_local_ids_final() {
        let mut c = compressor_with_capacity(5);
        c.generate_compressed_id().unwrap();
        c.generate_compressed_id().unwrap();
        c.generate_compressed_id().unwrap();
        let range = c.take_next_creation_range();
        c.finalize_creation_range(&range).unwrap();

        assert_eq!(c.generate_compressed_id().unwrap().0, 3);
        assert_eq!(c.normalize_to_op_space(SessionSpaceId(-2)).0, 1);
    }
}
