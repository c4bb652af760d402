use crate::cmd::DataPaths;
use crate::reports;
use clap::Args;
use runforge::assemble::{AnalysisReport, NodeDetailSummary};
use runforge::config::AnalysisParams;
use runforge::error::RfResult;
use runforge::pipeline::{run_analysis, Analysis};
use serde_json::{json, Map, Value};
use std::fs;
use std::io::BufWriter;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub paths: DataPaths,

    #[command(flatten)]
    pub params: AnalysisParams,

    /// Output directory for the per-character JSON documents.
    #[arg(short, long, default_value = "reports/data")]
    pub out: PathBuf,

    /// Print tables only; write nothing.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

pub fn run(args: AnalyzeArgs) -> RfResult<()> {
    let catalogs = args.paths.load_catalogs();
    let filter_config = args.paths.load_filter_config();

    let Analysis { report, tally } =
        run_analysis(&args.paths.runs, &catalogs, filter_config, &args.params)?;

    println!("\n📊 === RUN FILTER TALLY === 📊");
    reports::print_run_tally(&tally);
    println!("\n(Skipped {} runs due to anomalous stat gains.)", tally.anomalous());

    println!("\n🧭 === CHARACTER OVERVIEW === 🧭");
    reports::print_character_overview(&report);

    println!("\n🃏 === TOP CARDS BY WEIGHTED TURN DEVIATION === 🃏");
    reports::print_top_cards(&report, 15);

    if args.dry_run {
        println!("\n(dry run: no files written)");
        return Ok(());
    }

    fs::create_dir_all(&args.out)?;
    let characters = report.characters();
    for character in &characters {
        let doc = character_document(&report, character, &characters, &catalogs);
        let path = args.out.join(format!("{}_data.json", character));
        let file = fs::File::create(&path)?;
        // Compact encoding; these documents get large.
        serde_json::to_writer(BufWriter::new(file), &doc)?;
        println!("  -> Saved {}", path.display());
    }

    Ok(())
}

/// Shapes one character's slice of the report for the presentation layer.
/// Structured keys become strings here: `"act,level"` for map positions and
/// `"act,level,Type"` for node details.
fn character_document(
    report: &AnalysisReport,
    character: &str,
    all_characters: &[String],
    catalogs: &runforge::catalog::Catalogs,
) -> Value {
    let agg: Vec<_> = report
        .aggregated
        .iter()
        .filter(|r| r.character == character)
        .collect();
    let sit: Vec<_> = report
        .situational
        .iter()
        .filter(|r| r.scored.character == character)
        .collect();
    let exhibits: Vec<_> = report
        .exhibits
        .iter()
        .filter(|r| r.character == character)
        .collect();
    let enemies: Vec<_> = report
        .enemy_summary
        .iter()
        .filter(|r| r.character == character)
        .collect();

    let mut node_selection = Map::new();
    for (key, sel) in &report.route_events.node_selection {
        if key.character != character {
            continue;
        }
        let mut counts = Map::new();
        for (stype, count) in &sel.by_type {
            counts.insert(stype.to_string(), json!(count));
        }
        counts.insert("total".to_string(), json!(sel.total));
        node_selection.insert(format!("{},{}", key.act, key.level), Value::Object(counts));
    }

    let mut event_actions = Map::new();
    for (key, events) in &report.route_events.event_actions {
        if key.character != character {
            continue;
        }
        event_actions.insert(
            format!("{},{},{}", key.act, key.level, key.station_type),
            json!(events),
        );
    }

    let mut node_details = Map::new();
    for (key, summary) in &report.route_events.node_details {
        if key.character != character {
            continue;
        }
        let value = match serde_json::to_value::<&NodeDetailSummary>(summary) {
            Ok(v) => v,
            Err(_) => continue,
        };
        node_details.insert(
            format!("{},{},{}", key.act, key.level, key.station_type),
            value,
        );
    }

    let total_runs = report
        .route_events
        .total_runs
        .get(character)
        .copied()
        .unwrap_or(0);

    // (act, combat type) pairs with scored data, in display order.
    let mut situations: Vec<(u32, String)> = sit
        .iter()
        .map(|r| (r.scored.act, r.scored.combat.to_string()))
        .collect();
    situations.sort();
    situations.dedup();

    json!({
        "agg_data_for_graph": &agg,
        "agg_data_full": &agg,
        "sit_data": &sit,
        "exhibit_data": &exhibits,
        "enemy_data": &enemies,
        "route_data": {
            "node_selection": node_selection,
            "event_actions": event_actions,
            "node_details": node_details,
            "total_runs": total_runs,
        },
        "metadata": {
            "character": character,
            "version": env!("CARGO_PKG_VERSION"),
            "ordered_situations": situations,
        },
        "all_available_characters": all_characters,
        "lookup_tables": {
            "cards": &catalogs.cards,
            "exhibits": &catalogs.exhibits,
        },
    })
}
