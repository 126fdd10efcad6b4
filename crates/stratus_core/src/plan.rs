//! Planner/scheduler.
//!
//! Orders a changeset into waves. Entries within a wave have no
//! unresolved dependencies among the pending changes and may execute
//! concurrently; waves execute strictly in sequence. Create/Update/
//! Replace entries order along desired-graph edges; Delete entries
//! order along *reversed* prior-state edges, so dependents are
//! destroyed (or updated away) before what they depended on.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use stratus_state::StateRecord;

use crate::diff::{ChangeEntry, ChangeOp, Changeset};
use crate::error::{CoreError, CoreResult};

/// A change entry with its scheduling constraints resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedEntry {
    pub change: ChangeEntry,
    /// Logical names of entries that must reach success before this
    /// one may start.
    pub waits_for: Vec<String>,
}

/// Entries safe to execute concurrently, sorted by logical name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wave {
    pub entries: Vec<PlannedEntry>,
}

/// The full execution plan: waves in order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub waves: Vec<Wave>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.waves.is_empty()
    }

    /// Total number of entries across all waves.
    pub fn entry_count(&self) -> usize {
        self.waves.iter().map(|w| w.entries.len()).sum()
    }

    /// Wave index of a logical name, if planned.
    pub fn wave_of(&self, name: &str) -> Option<usize> {
        self.waves
            .iter()
            .position(|w| w.entries.iter().any(|e| e.change.name == name))
    }
}

/// Orders changesets into execution plans.
pub struct Planner;

impl Planner {
    /// Plan the changeset. Fails fatally if the augmented dependency
    /// graph (desired edges plus reversed destroy edges) has a cycle.
    pub fn plan(prior: &HashMap<String, StateRecord>, changeset: Changeset) -> CoreResult<Plan> {
        // BTreeMap keeps every iteration below deterministic.
        let mut pending: BTreeMap<String, PlannedEntry> = BTreeMap::new();
        let is_planned: HashSet<String> =
            changeset.entries.iter().map(|e| e.name.clone()).collect();

        for entry in changeset.entries {
            let waits_for = match entry.op {
                ChangeOp::Delete => Self::destroy_constraints(&entry, prior, &is_planned),
                _ => entry
                    .depends_on
                    .iter()
                    .filter(|d| is_planned.contains(*d))
                    .cloned()
                    .collect(),
            };
            pending.insert(
                entry.name.clone(),
                PlannedEntry {
                    change: entry,
                    waits_for,
                },
            );
        }

        let mut waves = Vec::new();
        let mut done: HashSet<String> = HashSet::new();

        while !pending.is_empty() {
            let ready: Vec<String> = pending
                .iter()
                .filter(|(_, e)| e.waits_for.iter().all(|d| done.contains(d)))
                .map(|(name, _)| name.clone())
                .collect();

            if ready.is_empty() {
                return Err(CoreError::Cycle(pending.into_keys().collect()));
            }

            let mut entries = Vec::with_capacity(ready.len());
            for name in ready {
                if let Some(entry) = pending.remove(&name) {
                    done.insert(name);
                    entries.push(entry);
                }
            }
            waves.push(Wave { entries });
        }

        debug!(
            "Planned {} entries into {} waves",
            done.len(),
            waves.len()
        );
        Ok(Plan { waves })
    }

    /// Reversed ordering for a destroy: wait for every pending entry
    /// whose *prior* record depended on this name — other destroys
    /// higher up the old graph, and former dependents that are being
    /// updated away from it.
    fn destroy_constraints(
        entry: &ChangeEntry,
        prior: &HashMap<String, StateRecord>,
        is_planned: &HashSet<String>,
    ) -> Vec<String> {
        let mut waits: Vec<String> = prior
            .values()
            .filter(|r| r.name != entry.name && r.depends_on.contains(&entry.name))
            .filter(|r| is_planned.contains(&r.name))
            .map(|r| r.name.clone())
            .collect();
        waits.sort();
        waits
    }
}
