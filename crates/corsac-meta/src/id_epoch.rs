//! Monotonic id and epoch counters, keyed by kind.
//!
//! The leader runs an [`IdEpochGenerator`] as a preview of the replicated
//! counters: `next` bumps the leader-local value and appends the matching
//! add-one entry to the meta-increment, so the applied counter agrees with
//! the previewed value as long as proposers are serialized through the
//! leader.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::increment::{Change, ChangeOp, MetaIncrement};
use crate::types::reserved;

/// The finite set of replicated counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdEpochKind {
    /// Next schema id.
    IdNextSchema,
    /// Next table id. Indexes draw from this counter too: tables and indexes
    /// share one id space.
    IdNextTable,
    /// Epoch of the schema map.
    EpochSchema,
    /// Epoch of the table map.
    EpochTable,
    /// Epoch of the index map.
    EpochIndex,
    /// Epoch of the region map.
    EpochRegion,
    /// Epoch of the store map.
    EpochStore,
}

impl IdEpochKind {
    /// All counter kinds, in replicated-map order.
    pub const ALL: [IdEpochKind; 7] = [
        IdEpochKind::IdNextSchema,
        IdEpochKind::IdNextTable,
        IdEpochKind::EpochSchema,
        IdEpochKind::EpochTable,
        IdEpochKind::EpochIndex,
        IdEpochKind::EpochRegion,
        IdEpochKind::EpochStore,
    ];

    /// Bootstrap value of the counter. Id counters start at the reserved
    /// ceiling so reserved ids are never handed out; epochs start at zero.
    pub fn seed(self) -> u64 {
        match self {
            IdEpochKind::IdNextSchema | IdEpochKind::IdNextTable => reserved::ID_FLOOR,
            _ => 0,
        }
    }
}

/// One replicated counter entry, as carried inside a meta-increment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdEpoch {
    /// Counter kind.
    pub kind: IdEpochKind,
    /// Previewed counter value after the add. Apply performs the add-one and
    /// cross-checks against this value.
    pub value: u64,
}

/// Leader-local preview of the replicated counters.
#[derive(Debug)]
pub struct IdEpochGenerator {
    counters: Mutex<HashMap<IdEpochKind, u64>>,
}

impl IdEpochGenerator {
    /// Start all counters from their bootstrap seeds.
    pub fn new() -> Self {
        let counters = IdEpochKind::ALL
            .iter()
            .map(|kind| (*kind, kind.seed()))
            .collect();
        Self {
            counters: Mutex::new(counters),
        }
    }

    /// Issue the next value of `kind` and append the matching add-one entry
    /// to `increment`.
    ///
    /// For id kinds the returned value is the allocated id. Values issued
    /// against increments that are later discarded leave gaps; monotonicity
    /// is preserved either way.
    pub fn next(&self, kind: IdEpochKind, increment: &mut MetaIncrement) -> u64 {
        let mut counters = self.counters.lock().unwrap();
        let slot = counters.entry(kind).or_insert_with(|| kind.seed());
        let issued = *slot;
        *slot += 1;
        increment.id_epochs.push(Change {
            id: issued,
            op: ChangeOp::Update,
            schema_id: None,
            payload: IdEpoch {
                kind,
                value: issued + 1,
            },
        });
        issued
    }

    /// Leader-local snapshot of `kind` without issuing a value.
    pub fn preview(&self, kind: IdEpochKind) -> u64 {
        let counters = self.counters.lock().unwrap();
        counters.get(&kind).copied().unwrap_or_else(|| kind.seed())
    }

    /// Reset a counter from the applied state. Used when rebuilding the
    /// leader-local preview on leadership acquisition; never moves a counter
    /// backwards.
    pub fn restore(&self, kind: IdEpochKind, value: u64) {
        let mut counters = self.counters.lock().unwrap();
        let slot = counters.entry(kind).or_insert_with(|| kind.seed());
        if value > *slot {
            *slot = value;
        }
    }
}

impl Default for IdEpochGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_the_reserved_ceiling() {
        let generator = IdEpochGenerator::new();
        let mut increment = MetaIncrement::default();
        assert_eq!(
            generator.next(IdEpochKind::IdNextSchema, &mut increment),
            reserved::ID_FLOOR
        );
        assert_eq!(
            generator.next(IdEpochKind::IdNextSchema, &mut increment),
            reserved::ID_FLOOR + 1
        );
    }

    #[test]
    fn next_appends_an_add_one_entry() {
        let generator = IdEpochGenerator::new();
        let mut increment = MetaIncrement::default();
        let issued = generator.next(IdEpochKind::EpochTable, &mut increment);
        assert_eq!(issued, 0);
        assert_eq!(increment.id_epochs.len(), 1);
        let entry = &increment.id_epochs[0];
        assert_eq!(entry.payload.kind, IdEpochKind::EpochTable);
        assert_eq!(entry.payload.value, 1);
    }

    #[test]
    fn discarded_increments_leave_gaps_but_stay_monotonic() {
        let generator = IdEpochGenerator::new();
        let mut discarded = MetaIncrement::default();
        let first = generator.next(IdEpochKind::IdNextTable, &mut discarded);
        drop(discarded);
        let mut kept = MetaIncrement::default();
        let second = generator.next(IdEpochKind::IdNextTable, &mut kept);
        assert!(second > first);
    }

    #[test]
    fn restore_never_moves_backwards() {
        let generator = IdEpochGenerator::new();
        generator.restore(IdEpochKind::IdNextTable, 5000);
        assert_eq!(generator.preview(IdEpochKind::IdNextTable), 5000);
        generator.restore(IdEpochKind::IdNextTable, 10);
        assert_eq!(generator.preview(IdEpochKind::IdNextTable), 5000);
    }
}
