//! Entity, part and player identities.
//!
//! Entities and parts compare by identity alone. Hand-placed entities take
//! their identity from a process-wide counter; units spawned during
//! resolution derive theirs from the producing part so that every client
//! resolving the same turn agrees on the new identities.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

/// Player number, assigned sequentially on registration.
pub type PlayerNumber = u32;

/// Team number.
pub type TeamNumber = u32;

/// Stable identity of an entity on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Stable identity of a unit part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartId(pub u64);

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part#{}", self.0)
    }
}

/// Derived identities always carry this bit; counter identities never
/// reach it, so the two spaces cannot collide.
const DERIVED_BIT: u64 = 1 << 63;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_raw() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Source of fresh identities for newly created entities and parts.
pub trait IdSource {
    /// Identity for a new entity.
    fn next_entity_id(&mut self) -> EntityId;
    /// Identity for a new part.
    fn next_part_id(&mut self) -> PartId;
}

/// Process-wide unique identities from a shared atomic counter.
///
/// Used for initial placement, where the resulting state is shipped to
/// every peer rather than re-derived.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessIds;

impl IdSource for ProcessIds {
    fn next_entity_id(&mut self) -> EntityId {
        EntityId(next_raw())
    }

    fn next_part_id(&mut self) -> PartId {
        PartId(next_raw())
    }
}

fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Deterministic identity stream keyed by a producing part and its spawn
/// counter.
///
/// The same `(producer, counter)` pair always yields the same sequence.
/// A producer increments its counter after every spawn, so a seed is
/// never reused.
#[derive(Debug, Clone)]
pub struct DerivedIds {
    rng: Pcg64Mcg,
}

impl DerivedIds {
    /// Create the identity stream for one spawn of `producer`.
    #[must_use]
    pub fn for_spawn(producer: PartId, counter: u64) -> Self {
        let seed = splitmix64(producer.0 ^ splitmix64(counter ^ 0xC001_CAFE_D00D_0000));
        Self {
            rng: Pcg64Mcg::seed_from_u64(seed),
        }
    }

    fn next_derived(&mut self) -> u64 {
        self.rng.next_u64() | DERIVED_BIT
    }
}

impl IdSource for DerivedIds {
    fn next_entity_id(&mut self) -> EntityId {
        EntityId(self.next_derived())
    }

    fn next_part_id(&mut self) -> PartId {
        PartId(self.next_derived())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_ids_are_unique() {
        let mut ids = ProcessIds;
        let a = ids.next_entity_id();
        let b = ids.next_entity_id();
        let c = ids.next_part_id();
        assert_ne!(a, b);
        assert_ne!(a.0, c.0);
        assert_eq!(a.0 & DERIVED_BIT, 0);
    }

    #[test]
    fn test_derived_ids_are_reproducible() {
        let mut first = DerivedIds::for_spawn(PartId(42), 0);
        let mut second = DerivedIds::for_spawn(PartId(42), 0);
        for _ in 0..4 {
            assert_eq!(first.next_entity_id(), second.next_entity_id());
            assert_eq!(first.next_part_id(), second.next_part_id());
        }
    }

    #[test]
    fn test_derived_ids_differ_by_counter_and_producer() {
        let a = DerivedIds::for_spawn(PartId(42), 0).next_entity_id();
        let b = DerivedIds::for_spawn(PartId(42), 1).next_entity_id();
        let c = DerivedIds::for_spawn(PartId(43), 0).next_entity_id();
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a.0 & DERIVED_BIT, 0);
    }
}
