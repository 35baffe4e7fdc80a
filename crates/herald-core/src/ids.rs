//! Actor id allocation.
//!
//! Each [`ActorKind`] owns a disjoint id range, so any id can be classified
//! with [`ActorKind::classify`] without a registry lookup. The allocator is
//! owned by the director; ids are never reused within a run.

use std::collections::BTreeMap;

use herald_types::{ActorId, ActorKind};

use crate::error::DirectorError;

/// Hands out actor ids from per-kind ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next: BTreeMap<ActorKind, u32>,
}

impl IdAllocator {
    /// A fresh allocator positioned at the start of every range.
    pub fn new() -> Self {
        Self {
            next: ActorKind::ALL
                .iter()
                .map(|kind| (*kind, kind.range_start()))
                .collect(),
        }
    }

    /// Allocate the next id for `kind`.
    pub fn allocate(&mut self, kind: ActorKind) -> Result<ActorId, DirectorError> {
        let next = self.next.entry(kind).or_insert_with(|| kind.range_start());
        if *next >= kind.range_end() {
            return Err(DirectorError::IdRangeExhausted(kind));
        }
        let id = ActorId(*next);
        *next = next.saturating_add(1);
        Ok(id)
    }

    /// Ids handed out so far for `kind`.
    pub fn allocated(&self, kind: ActorKind) -> u32 {
        self.next
            .get(&kind)
            .map_or(0, |next| next.saturating_sub(kind.range_start()))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
