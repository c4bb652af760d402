use comfy_table::presets::ASCII_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use runforge::assemble::AnalysisReport;
use runforge::filter::RejectReason;
use runforge::pipeline::RunTally;
use strum::IntoEnumIterator;

pub fn print_run_tally(tally: &RunTally) {
    let mut table = Table::new();
    table.load_preset(ASCII_FULL);

    table.add_row(vec![
        Cell::new("Verdict").add_attribute(Attribute::Bold),
        Cell::new("Runs").add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Accepted").fg(Color::Green),
        Cell::new(tally.accepted).set_alignment(CellAlignment::Right),
    ]);
    for reason in RejectReason::iter() {
        let count = tally.rejections.get(&reason).copied().unwrap_or(0);
        table.add_row(vec![
            Cell::new(format!("Rejected: {}", reason)),
            Cell::new(count).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("Unparseable (skipped)"),
        Cell::new(tally.parse_skipped).set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new("Total streamed").add_attribute(Attribute::Bold),
        Cell::new(tally.processed)
            .set_alignment(CellAlignment::Right)
            .add_attribute(Attribute::Bold),
    ]);

    println!("{}", table);
}

pub fn print_character_overview(report: &AnalysisReport) {
    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec![
        Cell::new("Character").add_attribute(Attribute::Bold),
        Cell::new("Runs").fg(Color::Cyan),
        Cell::new("Scored Cards"),
        Cell::new("Enemy Summaries"),
    ]);

    for character in report.characters() {
        let runs = report
            .route_events
            .total_runs
            .get(&character)
            .copied()
            .unwrap_or(0);
        let cards = report
            .aggregated
            .iter()
            .filter(|r| r.character == character)
            .count();
        let enemies = report
            .enemy_summary
            .iter()
            .filter(|r| r.character == character)
            .count();
        table.add_row(vec![
            Cell::new(character),
            Cell::new(runs).set_alignment(CellAlignment::Right),
            Cell::new(cards).set_alignment(CellAlignment::Right),
            Cell::new(enemies).set_alignment(CellAlignment::Right),
        ]);
    }

    println!("{}", table);
}

/// Highest weighted turn-deviation cards across all characters, as a quick
/// sanity check of the assembled tables.
pub fn print_top_cards(report: &AnalysisReport, limit: usize) {
    let mut rows: Vec<_> = report.aggregated.iter().collect();
    rows.sort_by(|a, b| {
        b.weighted_avg_turn_deviation
            .partial_cmp(&a.weighted_avg_turn_deviation)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut table = Table::new();
    table
        .load_preset(ASCII_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec![
        Cell::new("Character").add_attribute(Attribute::Bold),
        Cell::new("Card").add_attribute(Attribute::Bold),
        Cell::new("Turn Dev").fg(Color::Cyan),
        Cell::new("HP Dev"),
        Cell::new("Stability"),
        Cell::new("Adoption"),
    ]);
    for row in rows.into_iter().take(limit) {
        table.add_row(vec![
            Cell::new(&row.character),
            Cell::new(&row.card_name),
            Cell::new(format!("{:.1}", row.weighted_avg_turn_deviation))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", row.weighted_avg_hp_deviation))
                .set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", row.stability_score)).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}%", row.adoption_rate * 100.0))
                .set_alignment(CellAlignment::Right),
        ]);
    }

    println!("{}", table);
}
