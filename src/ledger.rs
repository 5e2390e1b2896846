//! Counter totals plus the ordered log of deltas that produced them.
//!
//! The ledger keeps `stats == sum(delta for entry in log)` at all times.
//! `apply` adds a delta and logs it, `undo` subtracts the logged delta and
//! drops the entry. Addition over independent integer counters commutes, so
//! entries can be undone in any order and the remaining total is exact.
//!
//! A delta is refused when the summed magnitudes of the logged deltas would
//! leave the `i64` range. Every subset of the log then sums without overflow,
//! which keeps undo and rebuild total.

use crate::action::Action;
use crate::models::{LogEntry, Stats};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("delta would push a counter out of range")]
pub struct CounterOverflow;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatLedger {
    #[serde(default)]
    stats: Stats,
    /// Most recent entry first.
    #[serde(default)]
    log: VecDeque<LogEntry>,
}

impl StatLedger {
    /// Builds a ledger whose counters are the sum of `log`. Order does not matter.
    ///
    /// Entries that would push the counters out of range are left out, so the
    /// result may hold fewer entries than `log`.
    pub fn rebuild(log: impl IntoIterator<Item = LogEntry>) -> Self {
        let mut ledger = Self::default();
        for entry in log {
            if ledger.admits(&entry.delta) {
                ledger.stats += entry.delta;
                ledger.log.push_back(entry);
            }
        }
        ledger
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn log(&self) -> &VecDeque<LogEntry> {
        &self.log
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Oldest entry first.
    pub fn chronological(&self) -> impl Iterator<Item = &LogEntry> {
        self.log.iter().rev()
    }

    pub fn record(&mut self, action: Action) -> Result<LogEntry, CounterOverflow> {
        self.apply(action.label(), action.delta())
    }

    pub fn apply(
        &mut self,
        action_text: impl Into<String>,
        delta: Stats,
    ) -> Result<LogEntry, CounterOverflow> {
        self.apply_at(action_text, delta, display_time())
    }

    pub fn apply_at(
        &mut self,
        action_text: impl Into<String>,
        delta: Stats,
        timestamp: impl Into<String>,
    ) -> Result<LogEntry, CounterOverflow> {
        if !self.admits(&delta) {
            return Err(CounterOverflow);
        }
        let entry = LogEntry {
            id: Uuid::new_v4(),
            timestamp: timestamp.into(),
            action_text: action_text.into(),
            delta,
        };
        self.stats += delta;
        self.log.push_front(entry.clone());
        Ok(entry)
    }

    /// Reverses and removes the entry. `None` means no such entry; nothing changes.
    pub fn undo(&mut self, entry_id: Uuid) -> Option<LogEntry> {
        let index = self.log.iter().position(|entry| entry.id == entry_id)?;
        let entry = self.log.remove(index)?;
        self.stats -= entry.delta;
        Some(entry)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Counters equal the sum of the log and the log stays within range.
    pub fn is_consistent(&self) -> bool {
        checked_total(self.log.iter().map(|entry| &entry.delta)) == Some(self.stats)
    }

    fn admits(&self, delta: &Stats) -> bool {
        checked_total(self.log.iter().map(|entry| &entry.delta).chain([delta])).is_some()
    }
}

/// Sum of `deltas`, or `None` once the sum of their magnitudes overflows.
fn checked_total<'a>(deltas: impl IntoIterator<Item = &'a Stats>) -> Option<Stats> {
    let mut total = Stats::default();
    let mut magnitude = Stats::default();
    for delta in deltas {
        magnitude = magnitude.checked_add(delta.checked_abs()?)?;
        total = total.checked_add(*delta)?;
    }
    Some(total)
}

fn display_time() -> String {
    Local::now().format("%-I:%M:%S %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(fgm: i64, fga: i64, ast: i64) -> Stats {
        Stats {
            fgm,
            fga,
            ast,
            ..Stats::default()
        }
    }

    fn log_sum(ledger: &StatLedger) -> Stats {
        ledger.log().iter().map(|entry| &entry.delta).sum()
    }

    #[test]
    fn apply_adds_delta_and_prepends_entry() {
        let mut ledger = StatLedger::default();
        let first = ledger.apply_at("2-Point Shot Made", delta(1, 1, 0), "7:00:00 PM").unwrap();
        let second = ledger.apply_at("Assist", delta(0, 0, 1), "7:00:05 PM").unwrap();

        assert_eq!(*ledger.stats(), delta(1, 1, 1));
        assert_eq!(ledger.log()[0].id, second.id);
        assert_eq!(ledger.log()[1].id, first.id);
        assert_eq!(ledger.log()[1].timestamp, "7:00:00 PM");

        let order: Vec<_> = ledger.chronological().map(|entry| entry.id).collect();
        assert_eq!(order, vec![first.id, second.id]);
    }

    #[test]
    fn undo_right_after_apply_restores_counters() {
        let mut ledger = StatLedger::default();
        ledger.record(Action::Steal).unwrap();
        let before = ledger.clone();

        let compound = Stats {
            fgm: 2,
            fga: 3,
            tpm: 1,
            tpa: 2,
            pf: -1,
            ..Stats::default()
        };
        let entry = ledger.apply("Compound", compound).unwrap();
        let removed = ledger.undo(entry.id).expect("entry present");

        assert_eq!(removed, entry);
        assert_eq!(ledger, before);
    }

    #[test]
    fn undo_order_does_not_matter() {
        let build = || {
            let mut ledger = StatLedger::default();
            let e1 = ledger.record(Action::ThreeMade).unwrap();
            let e2 = ledger.record(Action::FreeThrowMissed).unwrap();
            let e3 = ledger.record(Action::DefensiveRebound).unwrap();
            (ledger, e1, e2, e3)
        };

        let (mut a, e1, e2, e3) = build();
        assert!(a.undo(e2.id).is_some());
        assert!(a.undo(e1.id).is_some());

        let (mut b, f1, f2, _) = build();
        assert!(b.undo(f1.id).is_some());
        assert!(b.undo(f2.id).is_some());

        assert_eq!(*a.stats(), e3.delta);
        assert_eq!(a.stats(), b.stats());
        assert_eq!(a.log().len(), 1);
        assert_eq!(a.log()[0].id, e3.id);
    }

    #[test]
    fn undo_unknown_entry_changes_nothing() {
        let mut ledger = StatLedger::default();
        ledger.record(Action::Block).unwrap();
        let before = ledger.clone();

        assert!(ledger.undo(Uuid::new_v4()).is_none());
        assert_eq!(ledger, before);
    }

    #[test]
    fn totals_always_match_surviving_log() {
        let mut ledger = StatLedger::default();
        let mut ids = Vec::new();
        for (i, action) in Action::ALL.iter().cycle().take(40).enumerate() {
            let entry = ledger.record(*action).unwrap();
            if i % 3 == 0 {
                ids.push(entry.id);
            }
        }
        for (i, id) in ids.into_iter().enumerate() {
            if i % 2 == 0 {
                ledger.undo(id);
            }
            assert_eq!(*ledger.stats(), log_sum(&ledger));
        }
        assert!(ledger.is_consistent());
    }

    #[test]
    fn reset_clears_counters_and_log() {
        let mut ledger = StatLedger::default();
        ledger.record(Action::TwoMade).unwrap();
        ledger.record(Action::Turnover).unwrap();

        ledger.reset();

        assert!(ledger.stats().is_zero());
        assert!(ledger.is_empty());
    }

    #[test]
    fn rebuild_sums_the_log() {
        let mut source = StatLedger::default();
        source.record(Action::ThreeMade).unwrap();
        source.record(Action::Assist).unwrap();
        source.record(Action::TwoMissed).unwrap();

        let reversed: Vec<_> = source.chronological().cloned().collect();
        let rebuilt = StatLedger::rebuild(reversed);

        assert_eq!(rebuilt.stats(), source.stats());
        assert!(rebuilt.is_consistent());
    }

    #[test]
    fn delta_that_would_overflow_is_refused() {
        let mut ledger = StatLedger::default();
        ledger.apply("Huge", delta(0, 0, i64::MAX)).unwrap();
        let before = ledger.clone();

        assert_eq!(ledger.record(Action::Assist), Err(CounterOverflow));
        assert_eq!(ledger, before);
        assert!(ledger.record(Action::Steal).is_ok());
    }

    #[test]
    fn offsetting_deltas_cannot_set_up_an_undo_overflow() {
        let mut ledger = StatLedger::default();
        ledger.apply("Up", delta(0, 0, i64::MAX - 1)).unwrap();
        let down = ledger.apply("Down", delta(0, 0, -1)).unwrap();

        // The total would fit, but undoing "Down" afterwards would need MAX + 1.
        assert_eq!(ledger.apply("Up again", delta(0, 0, 2)), Err(CounterOverflow));
        assert!(ledger.undo(down.id).is_some());
        assert_eq!(ledger.stats().ast, i64::MAX - 1);
    }

    #[test]
    fn rebuild_skips_entries_out_of_range() {
        let mut source = StatLedger::default();
        let kept = source.apply("Huge", delta(0, 0, i64::MAX)).unwrap();
        let mut log: Vec<_> = source.log().iter().cloned().collect();
        let mut extra = kept.clone();
        extra.id = Uuid::new_v4();
        extra.delta = delta(0, 0, 1);
        log.push(extra);

        let rebuilt = StatLedger::rebuild(log);

        assert_eq!(rebuilt.log().len(), 1);
        assert_eq!(rebuilt.stats().ast, i64::MAX);
        assert!(rebuilt.is_consistent());
    }
}
