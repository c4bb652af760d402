//! Pass orchestration: one streaming pass over the archive (filter, deck
//! reconstruction, aggregation), then the in-memory scoring and assembly
//! pass over the collected tables.

use crate::aggregate::Aggregator;
use crate::assemble::{AnalysisReport, TableAssembler};
use crate::catalog::Catalogs;
use crate::config::{AnalysisParams, AnomalyThresholds, FilterConfig};
use crate::deck::reconstruct_decks;
use crate::error::RfResult;
use crate::filter::{RejectReason, RunFilter, Verdict};
use crate::score::score_outcomes;
use crate::source::stream_runs;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Per-reason accounting for one pass over the archive.
#[derive(Debug, Clone, Default)]
pub struct RunTally {
    pub processed: u64,
    pub accepted: u64,
    pub rejections: HashMap<RejectReason, u64>,
    /// Records the source skipped because their shape did not parse.
    pub parse_skipped: u64,
}

impl RunTally {
    fn reject(&mut self, reason: RejectReason) {
        *self.rejections.entry(reason).or_default() += 1;
    }

    /// Runs excluded as corruption/cheat artifacts. A distinct category:
    /// counted and surfaced once, never logged per occurrence.
    pub fn anomalous(&self) -> u64 {
        self.rejections
            .get(&RejectReason::Anomalous)
            .copied()
            .unwrap_or(0)
    }
}

pub struct Analysis {
    pub report: AnalysisReport,
    pub tally: RunTally,
}

/// Runs the full pipeline against the archive at `path`.
///
/// The streaming pass holds one run's working state at a time; accumulator
/// tables grow with key cardinality, not run count. A second call reopens
/// the source — the stream itself is single-traversal.
pub fn run_analysis<P: AsRef<Path>>(
    path: P,
    catalogs: &Catalogs,
    filter_config: FilterConfig,
    params: &AnalysisParams,
) -> RfResult<Analysis> {
    let filter = RunFilter::new(filter_config, params.thresholds.clone());
    let mut aggregator = Aggregator::new(catalogs);
    let mut tally = RunTally::default();

    let stats = stream_runs(path, |run_id, run| {
        tally.processed += 1;
        match filter.evaluate(&run_id, &run) {
            Verdict::Rejected(reason) => tally.reject(reason),
            Verdict::Accepted => {
                tally.accepted += 1;
                let decks = reconstruct_decks(run.stations.len(), &run.cards_log, catalogs);
                aggregator.observe_run(&run, &decks);
            }
        }
    })?;
    tally.parse_skipped = stats.skipped;

    info!(
        "Streamed {} runs: {} accepted, {} anomalous, {} unparseable",
        tally.processed,
        tally.accepted,
        tally.anomalous(),
        tally.parse_skipped
    );

    let scored = score_outcomes(&aggregator.outcomes, &params.samples, catalogs);
    let report = TableAssembler::new(catalogs, &params.weights).assemble(aggregator, scored);

    Ok(Analysis { report, tally })
}

/// Filter-only pass: streams the archive and tallies verdicts without
/// building any tables. Used by the CLI `audit` mode.
pub fn audit_runs<P: AsRef<Path>>(
    path: P,
    filter_config: FilterConfig,
    thresholds: AnomalyThresholds,
) -> RfResult<RunTally> {
    let filter = RunFilter::new(filter_config, thresholds);
    let mut tally = RunTally::default();

    let stats = stream_runs(path, |run_id, run| {
        tally.processed += 1;
        match filter.evaluate(&run_id, &run) {
            Verdict::Rejected(reason) => tally.reject(reason),
            Verdict::Accepted => tally.accepted += 1,
        }
    })?;
    tally.parse_skipped = stats.skipped;

    Ok(tally)
}
