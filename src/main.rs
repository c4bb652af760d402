use clap::{Parser, Subcommand};
use std::process;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run-log analytics for a roguelike deckbuilder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Full pipeline: stream, aggregate, score, assemble, write reports.
    Analyze(cmd::analyze::AnalyzeArgs),
    /// Filter-only pass over the archive: verdict tally, no tables.
    Audit(cmd::audit::AuditArgs),
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    println!("\n🚀 Initializing RunForge...");

    let result = match cli.command {
        Commands::Analyze(args) => cmd::analyze::run(args),
        Commands::Audit(args) => cmd::audit::run(args),
    };

    if let Err(e) = result {
        eprintln!("\n❌ FATAL ERROR:");
        eprintln!("   {}", e);
        process::exit(1);
    }
}
