pub mod analyze;
pub mod audit;

use clap::Args;
use runforge::catalog::{CatalogPaths, Catalogs};
use runforge::config::FilterConfig;
use std::path::PathBuf;

/// Input file locations, shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct DataPaths {
    /// Run archive: a JSON object of run id -> run record, gzip or plain.
    #[arg(long, default_value = "data/all_run.gz")]
    pub runs: PathBuf,

    #[arg(long, default_value = "data/cards.json")]
    pub cards: PathBuf,

    #[arg(long, default_value = "data/exhibits.json")]
    pub exhibits: PathBuf,

    #[arg(long, default_value = "data/ExhibitConfig.txt")]
    pub exhibit_config: PathBuf,

    #[arg(long, default_value = "data/exhibits_data.json")]
    pub exhibit_data: PathBuf,

    #[arg(long, default_value = "data/enemy_groups.json")]
    pub enemy_groups: PathBuf,

    #[arg(long, default_value = "data/unit_names.json")]
    pub unit_names: PathBuf,

    #[arg(long, default_value = "data/card_aliases.csv")]
    pub aliases: PathBuf,

    /// Optional filter config JSON; embedded defaults are used without it.
    #[arg(long)]
    pub filter_config: Option<PathBuf>,
}

impl DataPaths {
    pub fn load_catalogs(&self) -> Catalogs {
        Catalogs::load(&CatalogPaths {
            cards: &self.cards,
            exhibits: &self.exhibits,
            exhibit_config: &self.exhibit_config,
            exhibit_data: &self.exhibit_data,
            enemy_groups: &self.enemy_groups,
            unit_names: &self.unit_names,
            aliases: &self.aliases,
        })
    }

    pub fn load_filter_config(&self) -> FilterConfig {
        match &self.filter_config {
            Some(path) => FilterConfig::load_from_file(path),
            None => FilterConfig::default(),
        }
    }
}
