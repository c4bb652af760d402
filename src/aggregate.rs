//! The streaming accumulator: one pass over accepted runs, folding every
//! qualifying station into flat, explicitly-keyed frequency and sample
//! tables. Tables grow with key cardinality (character x act x combat x
//! card, character x enemy), never with run count; per-run working state is
//! dropped as soon as a run is folded in.

use crate::catalog::Catalogs;
use crate::model::{MutationOp, Run, StationType};
use std::collections::{HashMap, HashSet};
use strum_macros::Display;

/// Outcome-table group: every card's with/without samples live under one of
/// these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub character: String,
    pub act: u32,
    pub combat: StationType,
}

/// Node-selection key: one map position on a character's route.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub character: String,
    pub act: u32,
    pub level: u32,
}

/// Node-detail / event-action key: a map position plus the station kind
/// observed there.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DetailKey {
    pub character: String,
    pub act: u32,
    pub level: u32,
    pub station_type: StationType,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnemyKey {
    pub character: String,
    pub act: u32,
    pub enemy: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ItemKind {
    Card,
    Exhibit,
}

/// Mutation-event classification: operation x item kind, e.g. `Add_Card`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub op: MutationOp,
    pub kind: ItemKind,
}

impl EventKey {
    pub fn label(&self) -> String {
        format!("{}_{}", self.op, self.kind)
    }
}

/// Raw (turns, hp-loss) observations for one side of the with/without split.
#[derive(Debug, Clone, Default)]
pub struct SampleList {
    pub turns: Vec<f64>,
    pub hp_loss: Vec<f64>,
}

impl SampleList {
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Every fight sample for one card in one group lands in exactly one of the
/// two buckets, decided by snapshot membership.
#[derive(Debug, Clone, Default)]
pub struct OutcomeSamples {
    pub with_card: SampleList,
    pub without_card: SampleList,
}

/// Symmetric co-occurrence counter. `first_seen` is a global insertion
/// sequence number, kept so top-N ties break in encounter order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoCount {
    pub count: u64,
    pub first_seen: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CardAdoption {
    pub runs_with_card: u64,
    pub total_copies: u64,
    pub upgraded_copies: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExhibitAdoption {
    pub runs_with_exhibit: u64,
}

#[derive(Debug, Clone, Default)]
pub struct NodeSelection {
    pub by_type: HashMap<StationType, u64>,
    pub total: u64,
}

/// Per-enemy fight observations at one node or in one (character, act).
#[derive(Debug, Clone, Default)]
pub struct EncounterSamples {
    pub turns: Vec<f64>,
    pub hp_loss: Vec<f64>,
    pub power_change: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct EnemyEncounter {
    pub samples: EncounterSamples,
    pub station_type: StationType,
    /// Lowest level this enemy was met at, for ordering in the summary.
    pub min_level: Option<u32>,
}

/// Type-specific payload collected per (act, level, station type).
#[derive(Debug, Clone)]
pub enum NodeDetail {
    Combat {
        enemies: HashMap<String, EncounterSamples>,
    },
    Gap {
        choices: HashMap<String, u64>,
    },
    Shop {
        /// Money held *entering* the shop, one sample per visit.
        money: Vec<f64>,
        remove_card_runs: u64,
        upgrade_card_runs: u64,
    },
}

impl NodeDetail {
    fn combat() -> Self {
        NodeDetail::Combat {
            enemies: HashMap::new(),
        }
    }

    fn gap() -> Self {
        NodeDetail::Gap {
            choices: HashMap::new(),
        }
    }

    fn shop() -> Self {
        NodeDetail::Shop {
            money: Vec::new(),
            remove_card_runs: 0,
            upgrade_card_runs: 0,
        }
    }
}

pub type OutcomeTable = HashMap<GroupKey, HashMap<String, OutcomeSamples>>;

/// The single-pass accumulator. Construct once with the (injected) static
/// catalogs, fold every accepted run in with [`Aggregator::observe_run`],
/// then hand the tables to the scorer and assembler.
pub struct Aggregator<'a> {
    catalogs: &'a Catalogs,
    /// Catalog id list computed once; the with/without classification walks
    /// it for every qualifying combat station, which is the dominant cost.
    catalog_ids: Vec<String>,

    pub outcomes: OutcomeTable,
    pub co_global: HashMap<(String, String, String), CoCount>,
    pub fights_global: HashMap<(String, String), u64>,
    pub co_situational: HashMap<(GroupKey, String, String), CoCount>,
    pub fights_situational: HashMap<(GroupKey, String), u64>,
    pub card_adoption: HashMap<(String, String), CardAdoption>,
    pub exhibit_adoption: HashMap<(String, String), ExhibitAdoption>,
    pub node_selection: HashMap<NodeKey, NodeSelection>,
    pub node_details: HashMap<DetailKey, NodeDetail>,
    pub event_actions: HashMap<(DetailKey, EventKey, String), u64>,
    pub enemy_encounters: HashMap<EnemyKey, EnemyEncounter>,
    pub total_runs: HashMap<String, u64>,

    co_seq: u64,
}

fn bump<K: Eq + std::hash::Hash>(map: &mut HashMap<K, CoCount>, key: K, seq: &mut u64) {
    let slot = map.entry(key).or_insert_with(|| {
        *seq += 1;
        CoCount {
            count: 0,
            first_seen: *seq,
        }
    });
    slot.count += 1;
}

impl<'a> Aggregator<'a> {
    pub fn new(catalogs: &'a Catalogs) -> Self {
        let mut catalog_ids: Vec<String> = catalogs.cards.keys().cloned().collect();
        catalog_ids.sort();
        Self {
            catalogs,
            catalog_ids,
            outcomes: HashMap::new(),
            co_global: HashMap::new(),
            fights_global: HashMap::new(),
            co_situational: HashMap::new(),
            fights_situational: HashMap::new(),
            card_adoption: HashMap::new(),
            exhibit_adoption: HashMap::new(),
            node_selection: HashMap::new(),
            node_details: HashMap::new(),
            event_actions: HashMap::new(),
            enemy_encounters: HashMap::new(),
            total_runs: HashMap::new(),
            co_seq: 0,
        }
    }

    /// Folds one accepted run into the tables. `decks` is the snapshot
    /// array from [`crate::deck::reconstruct_decks`] for this run.
    pub fn observe_run(&mut self, run: &Run, decks: &[HashSet<String>]) {
        let catalogs = self.catalogs;
        let Some(character) = run.character_key() else {
            return;
        };
        if run.stations.is_empty() {
            return;
        }

        *self.total_runs.entry(character.clone()).or_default() += 1;
        self.record_terminal_adoption(&character, run);

        // Running previous-value tracker, seeded from the first station.
        // Independent of the filter's anomaly tracker by design; this one
        // feeds hp_loss/power_change deltas, not exclusion.
        let first = &run.stations[0].status;
        let mut prev_hp = first.hp;
        let mut prev_power = first.power;
        let mut prev_money = first.money;

        // (act, level) pairs already counted for node selection in this run.
        let mut seen_levels: HashSet<(u32, u32)> = HashSet::new();

        for (i, station) in run.stations.iter().enumerate() {
            let status = &station.status;
            let stype = station.station_type;
            let act = station.node.act;
            let level = station.node.level;

            if stype.is_combat() {
                if let Some(act) = act {
                    let deck = &decks[i];
                    let group = GroupKey {
                        character: character.clone(),
                        act,
                        combat: stype,
                    };
                    let turns = station.data.rounds.unwrap_or(0) as f64;
                    let hp_loss = (prev_hp - status.hp) as f64;
                    let power_change = (status.power - prev_power) as f64;

                    if let Some(enemy_id) = station.enemy_id.as_deref() {
                        let rec = self
                            .enemy_encounters
                            .entry(EnemyKey {
                                character: character.clone(),
                                act,
                                enemy: enemy_id.to_string(),
                            })
                            .or_default();
                        rec.samples.turns.push(turns);
                        rec.samples.hp_loss.push(hp_loss);
                        rec.samples.power_change.push(power_change);
                        rec.station_type = stype;
                        if let Some(level) = level {
                            rec.min_level = Some(rec.min_level.map_or(level, |m| m.min(level)));
                        }
                    }

                    for card in deck {
                        *self
                            .fights_global
                            .entry((character.clone(), card.clone()))
                            .or_default() += 1;
                        *self
                            .fights_situational
                            .entry((group.clone(), card.clone()))
                            .or_default() += 1;
                    }

                    let deck_list: Vec<&String> = deck.iter().collect();
                    for j in 0..deck_list.len() {
                        for k in (j + 1)..deck_list.len() {
                            let (a, b) = (deck_list[j], deck_list[k]);
                            bump(
                                &mut self.co_global,
                                (character.clone(), a.clone(), b.clone()),
                                &mut self.co_seq,
                            );
                            bump(
                                &mut self.co_global,
                                (character.clone(), b.clone(), a.clone()),
                                &mut self.co_seq,
                            );
                            bump(
                                &mut self.co_situational,
                                (group.clone(), a.clone(), b.clone()),
                                &mut self.co_seq,
                            );
                            bump(
                                &mut self.co_situational,
                                (group.clone(), b.clone(), a.clone()),
                                &mut self.co_seq,
                            );
                        }
                    }

                    // Every known card gets a data point, present or not.
                    let catalog_ids = &self.catalog_ids;
                    let group_map = self.outcomes.entry(group).or_insert_with(|| {
                        catalog_ids
                            .iter()
                            .map(|id| (id.clone(), OutcomeSamples::default()))
                            .collect()
                    });
                    for id in catalog_ids {
                        if let Some(rec) = group_map.get_mut(id) {
                            let bucket = if deck.contains(id) {
                                &mut rec.with_card
                            } else {
                                &mut rec.without_card
                            };
                            bucket.turns.push(turns);
                            bucket.hp_loss.push(hp_loss);
                        }
                    }
                }
            }

            if let (Some(act), Some(level)) = (act, level) {
                // Count each map position once per run, revisits included.
                if seen_levels.insert((act, level)) {
                    let sel = self
                        .node_selection
                        .entry(NodeKey {
                            character: character.clone(),
                            act,
                            level,
                        })
                        .or_default();
                    *sel.by_type.entry(stype).or_default() += 1;
                    sel.total += 1;
                }

                let dkey = DetailKey {
                    character: character.clone(),
                    act,
                    level,
                    station_type: stype,
                };
                match stype {
                    s if s.is_combat() => {
                        if let Some(enemy_id) = station.enemy_id.as_deref() {
                            let detail = self
                                .node_details
                                .entry(dkey.clone())
                                .or_insert_with(NodeDetail::combat);
                            if let NodeDetail::Combat { enemies } = detail {
                                let rec = enemies.entry(enemy_id.to_string()).or_default();
                                rec.turns.push(station.data.rounds.unwrap_or(0) as f64);
                                rec.hp_loss.push((prev_hp - status.hp) as f64);
                                rec.power_change.push((status.power - prev_power) as f64);
                            }
                        }
                    }
                    StationType::Gap => {
                        if let Some(choice) = station.data.choice.as_deref() {
                            let detail = self
                                .node_details
                                .entry(dkey.clone())
                                .or_insert_with(NodeDetail::gap);
                            if let NodeDetail::Gap { choices } = detail {
                                *choices.entry(choice.to_string()).or_default() += 1;
                            }
                        }
                    }
                    StationType::Shop => {
                        let detail = self
                            .node_details
                            .entry(dkey.clone())
                            .or_insert_with(NodeDetail::shop);
                        if let NodeDetail::Shop {
                            money,
                            remove_card_runs,
                            upgrade_card_runs,
                        } = detail
                        {
                            money.push(prev_money as f64);
                            let idx = i as i64;
                            if run
                                .cards_log
                                .iter()
                                .any(|e| e.station == Some(idx) && e.op == MutationOp::Remove)
                            {
                                *remove_card_runs += 1;
                            }
                            if run
                                .cards_log
                                .iter()
                                .any(|e| e.station == Some(idx) && e.op == MutationOp::Upgrade)
                            {
                                *upgrade_card_runs += 1;
                            }
                        }
                    }
                    _ => {}
                }

                if stype.is_mutation_site() {
                    let idx = i as i64;
                    for event in run.cards_log.iter().filter(|e| e.station == Some(idx)) {
                        if event.op == MutationOp::Unknown {
                            continue;
                        }
                        let id = catalogs.normalize_card_id(&event.id);
                        if id.is_empty() {
                            continue;
                        }
                        *self
                            .event_actions
                            .entry((
                                dkey.clone(),
                                EventKey {
                                    op: event.op,
                                    kind: ItemKind::Card,
                                },
                                id.to_string(),
                            ))
                            .or_default() += 1;
                    }
                    for event in run.exhibits_log.iter().filter(|e| e.station == Some(idx)) {
                        if event.op == MutationOp::Unknown || event.id.is_empty() {
                            continue;
                        }
                        *self
                            .event_actions
                            .entry((
                                dkey.clone(),
                                EventKey {
                                    op: event.op,
                                    kind: ItemKind::Exhibit,
                                },
                                event.id.clone(),
                            ))
                            .or_default() += 1;
                    }
                }
            }

            prev_hp = status.hp;
            prev_power = status.power;
            prev_money = status.money;
        }
    }

    /// Once per run: terminal deck and exhibit adoption.
    fn record_terminal_adoption(&mut self, character: &str, run: &Run) {
        let catalogs = self.catalogs;

        let final_ids: HashSet<&str> = run
            .outcome
            .cards
            .iter()
            .map(|c| catalogs.normalize_card_id(&c.id))
            .collect();
        for id in &final_ids {
            self.card_adoption
                .entry((character.to_string(), id.to_string()))
                .or_default()
                .runs_with_card += 1;
        }
        for card in &run.outcome.cards {
            let id = catalogs.normalize_card_id(&card.id);
            let rec = self
                .card_adoption
                .entry((character.to_string(), id.to_string()))
                .or_default();
            rec.total_copies += 1;
            if card.is_upgraded {
                rec.upgraded_copies += 1;
            }
        }

        let final_exhibits: HashSet<&str> =
            run.outcome.exhibits.iter().map(String::as_str).collect();
        for id in &final_exhibits {
            self.exhibit_adoption
                .entry((character.to_string(), id.to_string()))
                .or_default()
                .runs_with_exhibit += 1;
        }
    }
}
