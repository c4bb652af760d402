use crate::cmd::DataPaths;
use crate::reports;
use clap::Args;
use runforge::config::AnomalyThresholds;
use runforge::error::RfResult;
use runforge::pipeline::audit_runs;

/// Filter-only pass: stream the archive, tally accept/reject verdicts per
/// reason, and print them. Builds no tables.
#[derive(Args, Debug, Clone)]
pub struct AuditArgs {
    #[command(flatten)]
    pub paths: DataPaths,

    #[command(flatten)]
    pub thresholds: AnomalyThresholds,
}

pub fn run(args: AuditArgs) -> RfResult<()> {
    let filter_config = args.paths.load_filter_config();
    let tally = audit_runs(&args.paths.runs, filter_config, args.thresholds)?;

    println!("\n🔎 === FILTER AUDIT === 🔎");
    reports::print_run_tally(&tally);
    println!("\n(Skipped {} runs due to anomalous stat gains.)", tally.anomalous());

    Ok(())
}
