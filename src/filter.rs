//! Run acceptance predicate.
//!
//! Evaluated per run before any aggregation. Pure over its inputs: the
//! filter owns its configuration but holds no per-run state, and the
//! anomaly scan uses its own previous-value tracker, reset at entry,
//! independent of the similar tracker the aggregation pass runs later.

use crate::config::{AnomalyThresholds, FilterConfig};
use crate::model::Run;
use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

/// Why a run was dropped. `Anomalous` is a distinct, counted category —
/// it marks data corruption rather than an out-of-scope run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RejectReason {
    NotCompleted,
    ExcludedPlayer,
    MissingCharacter,
    VersionMismatch,
    NoStations,
    Anomalous,
}

pub struct RunFilter {
    config: FilterConfig,
    thresholds: AnomalyThresholds,
    success_marker: String,
    fail_marker: String,
}

impl RunFilter {
    pub fn new(config: FilterConfig, thresholds: AnomalyThresholds) -> Self {
        let success_marker = config.success_marker();
        let fail_marker = config.fail_marker();
        Self {
            config,
            thresholds,
            success_marker,
            fail_marker,
        }
    }

    pub fn evaluate(&self, run_id: &str, run: &Run) -> Verdict {
        // 1. Completion markers (both derived from the terminal-level tag).
        if !run_id.contains(&self.success_marker) || run_id.contains(&self.fail_marker) {
            return Verdict::Rejected(RejectReason::NotCompleted);
        }

        // 2. Player exclusion, substring match.
        if let Some(player) = run.player.as_deref() {
            if !player.is_empty()
                && self.config.skip_players.iter().any(|skip| player.contains(skip))
            {
                return Verdict::Rejected(RejectReason::ExcludedPlayer);
            }
        }

        // 3. Character must be present and configured; version allow-list
        //    is a substring match per character.
        let Some(character) = run.character.as_deref() else {
            return Verdict::Rejected(RejectReason::MissingCharacter);
        };
        let Some(rule) = self.config.characters.get(character) else {
            return Verdict::Rejected(RejectReason::VersionMismatch);
        };
        if run.version.is_empty() || !rule.versions.iter().any(|v| run.version.contains(v)) {
            return Verdict::Rejected(RejectReason::VersionMismatch);
        }

        // 4. An empty station list means the record carries no usable data.
        if run.stations.is_empty() {
            return Verdict::Rejected(RejectReason::NoStations);
        }

        // 5. Anomaly scan.
        if self.is_anomalous(run) {
            return Verdict::Rejected(RejectReason::Anomalous);
        }

        Verdict::Accepted
    }

    /// Walks the full station sequence tracking previous Hp/Power/Money
    /// (seeded from the first station). Any single-step gain at or above a
    /// threshold marks the whole run as a corruption/cheat artifact.
    fn is_anomalous(&self, run: &Run) -> bool {
        let first = &run.stations[0].status;
        let mut prev_hp = first.hp;
        let mut prev_power = first.power;
        let mut prev_money = first.money;
        let mut anomalous = false;

        for station in &run.stations {
            let status = &station.status;
            if status.hp - prev_hp >= self.thresholds.hp_gain_threshold
                || status.power - prev_power >= self.thresholds.power_gain_threshold
                || status.money - prev_money >= self.thresholds.money_gain_threshold
            {
                anomalous = true;
            }
            prev_hp = status.hp;
            prev_power = status.power;
            prev_money = status.money;
        }

        anomalous
    }
}
