//! Interns [`SessionId`]s into small [`SessionIndex`]es and supports the
//! sorted-by-base lookup `recompress` needs.

use std::collections::{BTreeMap, HashMap};

use crate::types::{SessionId, SessionIndex, StableId};

/// Maps `SessionId -> SessionIndex` and back, and keeps a secondary
/// sorted-by-base view for recompressing an arbitrary [`StableId`].
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    by_id: HashMap<SessionId, SessionIndex>,
    /// `SessionIndex(i).0 as usize` indexes into this vector.
    entries: Vec<SessionId>,
    /// Sorted by `session_base` for `predecessor_by_base`.
    sorted_by_base: BTreeMap<SessionId, SessionIndex>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `id`, returning its existing index or assigning the next free
    /// one. Never fails; duplicate ids collapse to the same index.
    pub fn intern(&mut self, id: SessionId) -> SessionIndex {
        if let Some(&idx) = self.by_id.get(&id) {
            return idx;
        }
        let idx = SessionIndex(self.entries.len() as u32);
        self.entries.push(id);
        self.by_id.insert(id, idx);
        self.sorted_by_base.insert(id, idx);
        log::trace!("interned session {id} as {idx}");
        idx
    }

    /// The base [`StableId`] a session was created with.
    pub fn session_base(&self, idx: SessionIndex) -> StableId {
        self.entries[idx.0 as usize]
    }

    /// Alias for [`SessionRegistry::session_base`]: a session's identity
    /// doubles as the first stable id its own GenCount axis is anchored on.
    pub fn session_id(&self, idx: SessionIndex) -> SessionId {
        self.session_base(idx)
    }

    /// Looks up the index a session id was interned under, if any.
    pub fn index_of(&self, id: SessionId) -> Option<SessionIndex> {
        self.by_id.get(&id).copied()
    }

    /// Number of distinct sessions interned so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no session has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates all interned sessions in index order (stable across
    /// `serialize`/`deserialize`).
    pub fn iter(&self) -> impl Iterator<Item = (SessionIndex, SessionId)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, &id)| (SessionIndex(i as u32), id))
    }

    /// Finds the interned session with the greatest `session_base <= stable`,
    /// the candidate owner of `stable` under `recompress`'s search rule.
    pub fn predecessor_by_base(&self, stable: StableId) -> Option<(SessionIndex, StableId)> {
        self.sorted_by_base
            .range(..=stable)
            .next_back()
            .map(|(&base, &idx)| (idx, base))
    }

    /// Rebuilds a registry from an ordered list of session bases, as produced
    /// by deserialization (index order is preserved).
    pub fn from_ordered_bases(bases: Vec<SessionId>) -> Self {
        let mut registry = Self::new();
        for base in bases {
            registry.intern(base);
        }
        registry
    }
}
