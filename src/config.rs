use crate::model::StationType;
use clap::Args;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::warn;

/// All tunables the analysis core consumes. Loaded by the CLI and passed in;
/// the engine itself never reads files or globals.
#[derive(Args, Debug, Clone, Default)]
pub struct AnalysisParams {
    #[command(flatten)]
    pub thresholds: AnomalyThresholds,
    #[command(flatten)]
    pub samples: SamplePolicy,
    #[command(flatten)]
    pub weights: ScoreWeights,
}

/// Single-step stat-gain limits beyond which a run is treated as corrupted.
#[derive(Args, Debug, Clone)]
pub struct AnomalyThresholds {
    #[arg(long, default_value_t = 100)]
    pub hp_gain_threshold: i64,
    #[arg(long, default_value_t = 500)]
    pub power_gain_threshold: i64,
    #[arg(long, default_value_t = 900)]
    pub money_gain_threshold: i64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            hp_gain_threshold: 100,
            power_gain_threshold: 500,
            money_gain_threshold: 900,
        }
    }
}

/// Minimum with/without sample counts per combat type before a card scores.
#[derive(Args, Debug, Clone)]
pub struct SamplePolicy {
    #[arg(long, default_value_t = 22)]
    pub min_fights_enemy: usize,
    #[arg(long, default_value_t = 8)]
    pub min_fights_elite: usize,
    #[arg(long, default_value_t = 6)]
    pub min_fights_boss: usize,
    #[arg(long, default_value_t = 30)]
    pub min_fights_default: usize,
}

impl Default for SamplePolicy {
    fn default() -> Self {
        Self {
            min_fights_enemy: 22,
            min_fights_elite: 8,
            min_fights_boss: 6,
            min_fights_default: 30,
        }
    }
}

impl SamplePolicy {
    pub fn min_for(&self, combat: StationType) -> usize {
        match combat {
            StationType::Enemy => self.min_fights_enemy,
            StationType::EliteEnemy => self.min_fights_elite,
            StationType::Boss => self.min_fights_boss,
            _ => self.min_fights_default,
        }
    }
}

/// Weighting and list-size knobs for the assembled tables.
#[derive(Args, Debug, Clone)]
pub struct ScoreWeights {
    /// Per-act weights for acts 1..=4.
    #[arg(long, default_value = "1.0,1.2,1.5,2.0")]
    pub act_weights: String,

    /// Weights for Enemy, EliteEnemy, Boss.
    #[arg(long, default_value = "1.0,1.5,2.0")]
    pub combat_weights: String,

    #[arg(long, default_value_t = 20)]
    pub co_occurrence_top: usize,

    #[arg(long, default_value_t = 10)]
    pub event_action_top: usize,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            act_weights: "1.0,1.2,1.5,2.0".to_string(),
            combat_weights: "1.0,1.5,2.0".to_string(),
            co_occurrence_top: 20,
            event_action_top: 10,
        }
    }
}

impl ScoreWeights {
    pub fn get_act_weights(&self) -> [f64; 4] {
        parse_f64_array::<4>(&self.act_weights, "act_weights")
    }

    pub fn get_combat_weights(&self) -> [f64; 3] {
        parse_f64_array::<3>(&self.combat_weights, "combat_weights")
    }

    /// Weight for an act number; acts outside 1..=4 fall back to 1.0.
    pub fn act_weight(&self, act: u32) -> f64 {
        let table = self.get_act_weights();
        match act {
            1..=4 => table[(act - 1) as usize],
            _ => 1.0,
        }
    }

    pub fn combat_weight(&self, combat: StationType) -> f64 {
        let table = self.get_combat_weights();
        match combat {
            StationType::Enemy => table[0],
            StationType::EliteEnemy => table[1],
            StationType::Boss => table[2],
            _ => 1.0,
        }
    }
}

fn parse_f64_array<const N: usize>(s: &str, name: &str) -> [f64; N] {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != N {
        panic!("--{} requires {} values", name, N);
    }
    let mut arr = [0.0; N];
    for (i, p) in parts.iter().enumerate() {
        arr[i] = p
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("Invalid number in {}", name));
    }
    arr
}

/// Run-acceptance configuration: which characters/versions qualify, which
/// players to drop, and the completion tag the run id must carry.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub completion_tag: String,
    pub skip_players: HashSet<String>,
    /// Character name -> acceptable version substrings. Runs for characters
    /// not listed here are dropped.
    pub characters: BTreeMap<String, CharacterRule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CharacterRule {
    pub versions: Vec<String>,
}

const DEFAULT_VERSIONS: [&str; 5] = ["1.6.0", "1.6.1", "1.7.0", "1.7.1", "1.7.2"];

impl Default for FilterConfig {
    fn default() -> Self {
        let all: Vec<String> = DEFAULT_VERSIONS.iter().map(|v| v.to_string()).collect();
        let mut characters = BTreeMap::new();
        for name in ["Reimu", "Marisa", "Sakuya", "Cirno"] {
            characters.insert(name.to_string(), CharacterRule { versions: all.clone() });
        }
        // Koishi shipped one patch later than the other characters.
        characters.insert(
            "Koishi".to_string(),
            CharacterRule {
                versions: all[1..].to_vec(),
            },
        );
        Self {
            completion_tag: "L7_TrueEnd".to_string(),
            skip_players: HashSet::new(),
            characters,
        }
    }
}

impl FilterConfig {
    /// Substring a qualifying run id must contain.
    pub fn success_marker(&self) -> String {
        format!("_{}", self.completion_tag)
    }

    /// Substring that marks a failed attempt at the same terminal level.
    pub fn fail_marker(&self) -> String {
        format!("_{}Fail", self.completion_tag)
    }

    /// Loads a JSON filter config, falling back to the embedded defaults on
    /// any failure. The analysis can always proceed; the fallback is logged.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!("Could not parse filter config {:?}: {}. Using defaults.", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Could not read filter config {:?}: {}. Using defaults.", path, e);
                Self::default()
            }
        }
    }
}
