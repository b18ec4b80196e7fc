//! Wire-visible value types shared across the public API.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A v4/variant-1 UUID, rendered lowercase with dashes at the canonical
/// positions. Backed directly by [`uuid::Uuid`].
pub type StableId = Uuid;

/// A [`StableId`] designating a session. Globally unique by assumption.
pub type SessionId = Uuid;

/// Largest integer value this crate will allow a counter to reach, mirroring
/// the `Number.MAX_SAFE_INTEGER` bound of the original protocol.
pub const MAX_SAFE_INTEGER: u64 = (1u64 << 53) - 1;

/// Interns a [`SessionId`] within one compressor's [`crate::session::SessionRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionIndex(pub(crate) u32);

impl fmt::Display for SessionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// A compressed id as seen by the session that owns it: non-negative means
/// already final, negative means a local GenCount (`-gen_count`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionSpaceId(pub i64);

/// A compressed id suitable for the wire: non-negative means final, negative
/// means a local GenCount of the *accompanying* session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpSpaceId(pub i64);

macro_rules! impl_space_id {
    ($ty:ident) => {
        impl $ty {
            /// Builds the LocalId form `-gen_count`.
            pub fn local(gen_count: u64) -> Result<Self> {
                if gen_count == 0 || gen_count > MAX_SAFE_INTEGER {
                    return Err(Error::overflow(format!(
                        "gen count {gen_count} out of representable range"
                    )));
                }
                Ok(Self(-(gen_count as i64)))
            }

            /// Builds the already-final form.
            pub fn final_id(final_id: u64) -> Result<Self> {
                if final_id > MAX_SAFE_INTEGER {
                    return Err(Error::overflow(format!(
                        "final id {final_id} out of representable range"
                    )));
                }
                Ok(Self(final_id as i64))
            }

            /// True if this id is a session-local GenCount rather than a FinalId.
            pub fn is_local(&self) -> bool {
                self.0 < 0
            }

            /// The GenCount this id encodes, if it is a LocalId.
            pub fn local_gen_count(&self) -> Option<u64> {
                self.is_local().then(|| (-self.0) as u64)
            }

            /// The FinalId this id encodes, if it is already final.
            pub fn as_final(&self) -> Option<u64> {
                (!self.is_local()).then_some(self.0 as u64)
            }
        }
    };
}

impl_space_id!(SessionSpaceId);
impl_space_id!(OpSpaceId);

/// One contiguous run of a session's GenCounts, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    /// First GenCount in the run (1-based).
    pub first_gen_count: u64,
    /// Last GenCount in the run, inclusive; always `>= first_gen_count`.
    pub last_gen_count: u64,
}

impl IdRange {
    /// Number of ids this range covers.
    pub fn count(&self) -> u64 {
        self.last_gen_count - self.first_gen_count + 1
    }
}

/// The unit of work handed to (and received from) the external broadcast
/// service: a session's not-yet-finalized GenCount run, or `None` when the
/// session has nothing pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdCreationRange {
    /// The session that minted these ids.
    pub session_id: SessionId,
    /// The run of GenCounts being announced, or `None` if there is nothing
    /// new to broadcast.
    pub ids: Option<IdRange>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_and_final_round_trip() {
        let local = SessionSpaceId::local(7).unwrap();
        assert!(local.is_local());
        assert_eq!(local.local_gen_count(), Some(7));
        assert_eq!(local.as_final(), None);

        let final_id = SessionSpaceId::final_id(3).unwrap();
        assert!(!final_id.is_local());
        assert_eq!(final_id.as_final(), Some(3));
    }

    #[test]
    fn id_range_counts_inclusive() {
        let range = IdRange {
            first_gen_count: 4,
            last_gen_count: 6,
        };
        assert_eq!(range.count(), 3);
    }

    #[test]
    fn op_space_id_local_and_final_round_trip() {
        let local = OpSpaceId::local(7).unwrap();
        assert!(local.is_local());
        assert_eq!(local.local_gen_count(), Some(7));
        assert_eq!(local.as_final(), None);

        let final_id = OpSpaceId::final_id(3).unwrap();
        assert!(!final_id.is_local());
        assert_eq!(final_id.as_final(), Some(3));

        assert!(OpSpaceId::local(0).is_err());
        assert!(OpSpaceId::final_id(MAX_SAFE_INTEGER + 1).is_err());
    }

    #[test]
    fn id_creation_range_round_trips_through_json() {
        let range = IdCreationRange {
            session_id: Uuid::new_v4(),
            ids: Some(IdRange {
                first_gen_count: 1,
                last_gen_count: 3,
            }),
        };
        let json = serde_json::to_string(&range).unwrap();
        let parsed: IdCreationRange = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, range);
    }
}
