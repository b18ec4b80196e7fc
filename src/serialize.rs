//! Deterministic, versioned binary layout for checkpoint and resume (C8).

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use uuid::Uuid;

use crate::cluster::Cluster;
use crate::error::{Error, Result};
use crate::types::{SessionId, SessionIndex};

/// The only serialized format version this build understands.
pub const CURRENT_WRITTEN_VERSION: u32 = 1;

/// The local-session-specific tail of a serialized blob, present only when
/// `with_session` was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedSessionState {
    /// Index of the local session within `SerializedState::sessions`.
    pub local_session_index: u32,
    /// Highest GenCount minted locally.
    pub next_local_gen_count: u64,
    /// Highest GenCount already taken for broadcast.
    pub last_taken_gen_count: u64,
}

/// A fully decoded serialized blob, independent of any particular
/// `Compressor`'s in-memory representation.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedState {
    /// `cluster_capacity_policy` in effect at serialization time.
    pub cluster_capacity_policy: u32,
    /// Session bases, in interning (index) order.
    pub sessions: Vec<SessionId>,
    /// Clusters in `base_final` order.
    pub clusters: Vec<Cluster>,
    /// Next FinalId to be assigned.
    pub next_final: u64,
    /// Present iff `with_session=true` was passed to `serialize`.
    pub session_state: Option<SerializedSessionState>,
}

/// Writes `state` in the layout documented in the crate's external
/// interfaces, appending to `out`.
pub fn write(state: &SerializedState, out: &mut Vec<u8>) {
    const CANNOT_FAIL: &str = "writing to a Vec<u8> cannot fail";

    out.write_u32::<LittleEndian>(CURRENT_WRITTEN_VERSION).expect(CANNOT_FAIL);
    out.write_u32::<LittleEndian>(state.cluster_capacity_policy).expect(CANNOT_FAIL);
    out.write_u8(state.session_state.is_some() as u8).expect(CANNOT_FAIL);

    out.write_u32::<LittleEndian>(state.sessions.len() as u32).expect(CANNOT_FAIL);
    for session in &state.sessions {
        out.write_u128::<LittleEndian>(session.as_u128()).expect(CANNOT_FAIL);
    }

    out.write_u32::<LittleEndian>(state.clusters.len() as u32).expect(CANNOT_FAIL);
    for cluster in &state.clusters {
        out.write_u32::<LittleEndian>(cluster.session.0).expect(CANNOT_FAIL);
        out.write_u64::<LittleEndian>(cluster.first_gen_count).expect(CANNOT_FAIL);
        out.write_u32::<LittleEndian>(cluster.capacity).expect(CANNOT_FAIL);
        out.write_u32::<LittleEndian>(cluster.count).expect(CANNOT_FAIL);
        out.write_u64::<LittleEndian>(cluster.base_final).expect(CANNOT_FAIL);
    }

    out.write_u64::<LittleEndian>(state.next_final).expect(CANNOT_FAIL);

    if let Some(session_state) = &state.session_state {
        out.write_u32::<LittleEndian>(session_state.local_session_index).expect(CANNOT_FAIL);
        out.write_u64::<LittleEndian>(session_state.next_local_gen_count).expect(CANNOT_FAIL);
        out.write_u64::<LittleEndian>(session_state.last_taken_gen_count).expect(CANNOT_FAIL);
    }
}

/// Parses a blob written by [`write`]. Fails with [`Error::VersionMismatch`]
/// on an unrecognized version tag, or [`Error::Protocol`] on a truncated blob.
pub fn read(bytes: &[u8]) -> Result<SerializedState> {
    let mut cursor = Cursor::new(bytes);

    let version = read_u32(&mut cursor)?;
    if version != CURRENT_WRITTEN_VERSION {
        return Err(Error::VersionMismatch {
            found: version,
            expected: CURRENT_WRITTEN_VERSION,
        });
    }

    let cluster_capacity_policy = read_u32(&mut cursor)?;
    let has_session = read_u8(&mut cursor)? != 0;

    let session_count = read_u32(&mut cursor)?;
    let mut sessions = Vec::with_capacity(session_count as usize);
    for _ in 0..session_count {
        sessions.push(Uuid::from_u128(read_u128(&mut cursor)?));
    }

    let cluster_count = read_u32(&mut cursor)?;
    let mut clusters = Vec::with_capacity(cluster_count as usize);
    for _ in 0..cluster_count {
        clusters.push(Cluster {
            session: SessionIndex(read_u32(&mut cursor)?),
            first_gen_count: read_u64(&mut cursor)?,
            capacity: read_u32(&mut cursor)?,
            count: read_u32(&mut cursor)?,
            base_final: read_u64(&mut cursor)?,
        });
    }

    let next_final = read_u64(&mut cursor)?;

    let session_state = if has_session {
        Some(SerializedSessionState {
            local_session_index: read_u32(&mut cursor)?,
            next_local_gen_count: read_u64(&mut cursor)?,
            last_taken_gen_count: read_u64(&mut cursor)?,
        })
    } else {
        None
    };

    Ok(SerializedState {
        cluster_capacity_policy,
        sessions,
        clusters,
        next_final,
        session_state,
    })
}

fn truncated() -> Error {
    Error::protocol("truncated serialized id compressor state")
}

fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8> {
    cursor.read_u8().map_err(|_| truncated())
}

fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32> {
    cursor.read_u32::<LittleEndian>().map_err(|_| truncated())
}

fn read_u64(cursor: &mut Cursor<&[u8]>) -> Result<u64> {
    cursor.read_u64::<LittleEndian>().map_err(|_| truncated())
}

fn read_u128(cursor: &mut Cursor<&[u8]>) -> Result<u128> {
    cursor.read_u128::<LittleEndian>().map_err(|_| truncated())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_session_state() {
        let state = SerializedState {
            cluster_capacity_policy: 512,
            sessions: vec![Uuid::new_v4(), Uuid::new_v4()],
            clusters: vec![Cluster {
                session: SessionIndex(0),
                first_gen_count: 1,
                capacity: 5,
                count: 3,
                base_final: 0,
            }],
            next_final: 5,
            session_state: Some(SerializedSessionState {
                local_session_index: 0,
                next_local_gen_count: 3,
                last_taken_gen_count: 3,
            }),
        };

        let mut bytes = Vec::new();
        write(&state, &mut bytes);
        let parsed = read(&bytes).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn round_trips_without_session_state() {
        let state = SerializedState {
            cluster_capacity_policy: 10,
            sessions: vec![Uuid::new_v4()],
            clusters: vec![],
            next_final: 0,
            session_state: None,
        };
        let mut bytes = Vec::new();
        write(&state, &mut bytes);
        let parsed = read(&bytes).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = Vec::new();
        bytes.write_u32::<LittleEndian>(9999).unwrap();
        assert!(matches!(
            read(&bytes),
            Err(Error::VersionMismatch { found: 9999, expected: CURRENT_WRITTEN_VERSION })
        ));
    }

    #[test]
    fn rejects_truncated_blob() {
        let bytes = vec![1, 0, 0, 0];
        assert!(matches!(read(&bytes), Err(Error::Protocol(_))));
    }
}
