//! Table assembly: the second in-memory pass that joins accumulator tables
//! and deviation scores into the five result tables the consumer receives.
//!
//! Keys stay structured here; rendering tuple keys as strings is the
//! serializing consumer's job (the CLI does it for the JSON documents).

use crate::aggregate::{
    Aggregator, CoCount, DetailKey, GroupKey, NodeDetail, NodeKey, NodeSelection,
};
use crate::catalog::{Catalogs, ExhibitProps};
use crate::config::ScoreWeights;
use crate::model::StationType;
use crate::score::ScoredCard;
use crate::stats::{five_number_summary, mean, percentile, population_std, sample_std, FiveNumber};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use strum_macros::Display;
use tracing::info;

/// Per-(character, card) joined performance row.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedCardRow {
    #[serde(rename = "Character")]
    pub character: String,
    #[serde(rename = "Card_Name")]
    pub card_name: String,
    #[serde(rename = "Weighted_Avg_Turn_Deviation")]
    pub weighted_avg_turn_deviation: f64,
    #[serde(rename = "Weighted_Avg_HP_Deviation")]
    pub weighted_avg_hp_deviation: f64,
    /// 100 - stddev of overall deviation across groups: consistency, not
    /// strength.
    #[serde(rename = "Stability_Score")]
    pub stability_score: f64,
    #[serde(rename = "Standard_Deviation")]
    pub standard_deviation: f64,
    #[serde(rename = "Rarity")]
    pub rarity: String,
    #[serde(rename = "Type")]
    pub card_type: String,
    #[serde(rename = "Total_Fights_With")]
    pub total_fights_with: u64,
    #[serde(rename = "Turn_Min")]
    pub turn_min: f64,
    #[serde(rename = "Turn_Q1")]
    pub turn_q1: f64,
    #[serde(rename = "Turn_Median")]
    pub turn_median: f64,
    #[serde(rename = "Turn_Q3")]
    pub turn_q3: f64,
    #[serde(rename = "Turn_Max")]
    pub turn_max: f64,
    #[serde(rename = "Std_Dev_Turn")]
    pub std_dev_turn: f64,
    #[serde(rename = "HP_Min")]
    pub hp_min: f64,
    #[serde(rename = "HP_Q1")]
    pub hp_q1: f64,
    #[serde(rename = "HP_Median")]
    pub hp_median: f64,
    #[serde(rename = "HP_Q3")]
    pub hp_q3: f64,
    #[serde(rename = "HP_Max")]
    pub hp_max: f64,
    #[serde(rename = "Std_Dev_HP")]
    pub std_dev_hp: f64,
    #[serde(rename = "Turn_Act_1")]
    pub turn_act_1: f64,
    #[serde(rename = "Turn_Act_2")]
    pub turn_act_2: f64,
    #[serde(rename = "Turn_Act_3")]
    pub turn_act_3: f64,
    #[serde(rename = "Turn_Act_4")]
    pub turn_act_4: f64,
    #[serde(rename = "HP_Act_1")]
    pub hp_act_1: f64,
    #[serde(rename = "HP_Act_2")]
    pub hp_act_2: f64,
    #[serde(rename = "HP_Act_3")]
    pub hp_act_3: f64,
    #[serde(rename = "HP_Act_4")]
    pub hp_act_4: f64,
    #[serde(rename = "Adoption_Rate")]
    pub adoption_rate: f64,
    #[serde(rename = "Avg_Upgrade_Rate")]
    pub avg_upgrade_rate: f64,
    #[serde(rename = "Avg_Copies")]
    pub avg_copies: f64,
    #[serde(rename = "Top_20_Co_occurrence")]
    pub top_co_occurrence: String,
    #[serde(rename = "Turn_Tendency")]
    pub turn_tendency: f64,
    #[serde(rename = "HP_Tendency")]
    pub hp_tendency: f64,
}

/// One scored group entry joined with cross-group context.
#[derive(Debug, Clone, Serialize)]
pub struct SituationalCardRow {
    #[serde(flatten)]
    pub scored: ScoredCard,
    #[serde(rename = "Stability_Score")]
    pub stability_score: f64,
    #[serde(rename = "Standard_Deviation")]
    pub standard_deviation: f64,
    #[serde(rename = "Rarity")]
    pub rarity: String,
    #[serde(rename = "Type")]
    pub card_type: String,
    #[serde(rename = "Top_20_Co_occurrence")]
    pub top_co_occurrence: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum DisplayCategory {
    Shining,
    Shop,
    Event,
    GeneralRare,
    GeneralUncommon,
    GeneralCommon,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExhibitRow {
    #[serde(rename = "Character")]
    pub character: String,
    #[serde(rename = "Exhibit_ID")]
    pub exhibit_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Rarity")]
    pub rarity: String,
    #[serde(rename = "Display_Category")]
    pub display_category: DisplayCategory,
    #[serde(rename = "Adoption_Rate")]
    pub adoption_rate: f64,
}

/// Act-wide min/max envelopes for combat metrics, used by the consumer to
/// scale node-detail charts consistently within an act.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ActScales {
    pub turns_min: f64,
    pub turns_max: f64,
    pub hp_loss_min: f64,
    pub hp_loss_max: f64,
    pub p_change_min: f64,
    pub p_change_max: f64,
}

impl Default for ActScales {
    fn default() -> Self {
        // Empty envelope: [0, 1] keeps downstream scale math well-defined.
        Self {
            turns_min: 0.0,
            turns_max: 1.0,
            hp_loss_min: 0.0,
            hp_loss_max: 1.0,
            p_change_min: 0.0,
            p_change_max: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnemyNodeSummary {
    pub name: String,
    pub rate: f64,
    pub avg_turns: f64,
    pub avg_hp_loss: f64,
    pub avg_p_change: f64,
    pub turns_boxplot: Option<FiveNumber>,
    pub hp_loss_boxplot: Option<FiveNumber>,
    pub p_change_boxplot: Option<FiveNumber>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ChoiceRate {
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MoneyStats {
    pub mean: f64,
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

/// Processed per-node payload, shaped per station kind.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum NodeDetailSummary {
    Combat {
        enemies: HashMap<String, EnemyNodeSummary>,
        scales: ActScales,
    },
    Gap {
        choices: HashMap<String, ChoiceRate>,
    },
    Shop {
        remove_card_rate: f64,
        upgrade_card_rate: f64,
        money_stats: Option<MoneyStats>,
    },
}

/// Route/node/event statistics, tuple-keyed; the consumer renders keys.
#[derive(Debug, Clone, Default)]
pub struct RouteEventData {
    pub node_selection: HashMap<NodeKey, NodeSelection>,
    /// Per node, per event label (`Add_Card`, ...): top-N (item id, count).
    pub event_actions: HashMap<DetailKey, HashMap<String, Vec<(String, u64)>>>,
    pub node_details: HashMap<DetailKey, NodeDetailSummary>,
    pub total_runs: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnemySummaryRow {
    #[serde(rename = "Character")]
    pub character: String,
    #[serde(rename = "Act")]
    pub act: u32,
    #[serde(rename = "EnemyId")]
    pub enemy_id: String,
    #[serde(rename = "Type")]
    pub station_type: StationType,
    #[serde(rename = "MinLevel")]
    pub min_level: u32,
    #[serde(rename = "EnemyName")]
    pub enemy_name: String,
    #[serde(rename = "Encounters")]
    pub encounters: usize,
    #[serde(rename = "Avg_Turns")]
    pub avg_turns: f64,
    #[serde(rename = "Avg_HP_Loss")]
    pub avg_hp_loss: f64,
    #[serde(rename = "Avg_P_Change")]
    pub avg_p_change: f64,
    #[serde(rename = "TurnsBoxplot")]
    pub turns_boxplot: Option<FiveNumber>,
    #[serde(rename = "HpLossBoxplot")]
    pub hp_loss_boxplot: Option<FiveNumber>,
    #[serde(rename = "PChangeBoxplot")]
    pub p_change_boxplot: Option<FiveNumber>,
}

/// The five tables the core exposes to its consumer.
#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    pub aggregated: Vec<AggregatedCardRow>,
    pub situational: Vec<SituationalCardRow>,
    pub exhibits: Vec<ExhibitRow>,
    pub route_events: RouteEventData,
    pub enemy_summary: Vec<EnemySummaryRow>,
}

impl AnalysisReport {
    /// Characters with at least one accepted run, sorted.
    pub fn characters(&self) -> Vec<String> {
        let mut chars: Vec<String> = self.route_events.total_runs.keys().cloned().collect();
        chars.sort();
        chars
    }
}

pub struct TableAssembler<'a> {
    catalogs: &'a Catalogs,
    weights: &'a ScoreWeights,
}

impl<'a> TableAssembler<'a> {
    pub fn new(catalogs: &'a Catalogs, weights: &'a ScoreWeights) -> Self {
        Self { catalogs, weights }
    }

    pub fn assemble(&self, agg: Aggregator, scored: Vec<ScoredCard>) -> AnalysisReport {
        let partners_global = group_global_partners(&agg.co_global);
        let partners_situational = group_situational_partners(&agg.co_situational);

        // Scored rows grouped per (character, card name); the name is the
        // join axis for everything card-level downstream.
        let mut by_card: BTreeMap<(String, String), CardGroup> = BTreeMap::new();
        for row in &scored {
            let entry = by_card
                .entry((row.character.clone(), row.card_name.clone()))
                .or_default();
            entry.card_id = row.card_id.clone();
            entry.rows.push(row.clone());
        }

        let aggregated = self.build_aggregated(&agg, &by_card, &partners_global);
        let situational = self.build_situational(&scored, &by_card, &partners_situational, &agg);
        let exhibits = self.build_exhibits(&agg);
        let enemy_summary = self.build_enemy_summary(&agg);
        let route_events = self.build_route_events(agg);

        info!(
            "Assembled {} aggregated rows, {} situational rows, {} enemy summaries",
            aggregated.len(),
            situational.len(),
            enemy_summary.len()
        );

        AnalysisReport {
            aggregated,
            situational,
            exhibits,
            route_events,
            enemy_summary,
        }
    }

    fn build_aggregated(
        &self,
        agg: &Aggregator,
        by_card: &BTreeMap<(String, String), CardGroup>,
        partners_global: &HashMap<(String, String), Vec<(String, CoCount)>>,
    ) -> Vec<AggregatedCardRow> {
        let mut out = Vec::with_capacity(by_card.len());

        for ((character, card_name), group) in by_card {
            let rows = &group.rows;

            // Act-weighted x combat-type-weighted averages.
            let mut w_turn = 0.0;
            let mut w_hp = 0.0;
            let mut w_sum = 0.0;
            for r in rows {
                let w = self.weights.act_weight(r.act) * self.weights.combat_weight(r.combat);
                w_turn += r.turn_deviation * w;
                w_hp += r.hp_deviation * w;
                w_sum += w;
            }
            if w_sum == 0.0 {
                continue;
            }
            let weighted_turn = w_turn / w_sum;
            let weighted_hp = w_hp / w_sum;

            let overall: Vec<f64> = rows.iter().map(|r| r.overall_deviation).collect();
            let standard_deviation = population_std(&overall);
            let stability_score = 100.0 - standard_deviation;

            let turn_devs: Vec<f64> = rows.iter().map(|r| r.turn_deviation).collect();
            let hp_devs: Vec<f64> = rows.iter().map(|r| r.hp_deviation).collect();

            let card_info = self.catalogs.cards.get(&group.card_id);
            let rarity = card_info
                .map(|c| c.rarity.clone())
                .filter(|r| !r.is_empty())
                .unwrap_or_else(|| "Unknown".to_string());
            let card_type = card_info
                .map(|c| c.card_type.clone())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Unknown".to_string());

            let mut act_turn = [0.0; 4];
            let mut act_hp = [0.0; 4];
            for act in 1..=4u32 {
                let turns: Vec<f64> = rows
                    .iter()
                    .filter(|r| r.act == act)
                    .map(|r| r.turn_deviation)
                    .collect();
                if !turns.is_empty() {
                    act_turn[(act - 1) as usize] = mean(&turns);
                    let hps: Vec<f64> = rows
                        .iter()
                        .filter(|r| r.act == act)
                        .map(|r| r.hp_deviation)
                        .collect();
                    act_hp[(act - 1) as usize] = mean(&hps);
                }
            }

            let total_runs = agg.total_runs.get(character).copied().unwrap_or(0);
            let adoption = agg
                .card_adoption
                .get(&(character.clone(), group.card_id.clone()))
                .copied()
                .unwrap_or_default();
            let adoption_rate = if total_runs > 0 {
                adoption.runs_with_card as f64 / total_runs as f64
            } else {
                0.0
            };
            let avg_upgrade_rate = if adoption.total_copies > 0 {
                adoption.upgraded_copies as f64 / adoption.total_copies as f64
            } else {
                0.0
            };
            let avg_copies = if adoption.runs_with_card > 0 {
                adoption.total_copies as f64 / adoption.runs_with_card as f64
            } else {
                0.0
            };

            let top_co_occurrence = self.render_top_partners(
                partners_global.get(&(character.clone(), group.card_id.clone())),
                agg.fights_global
                    .get(&(character.clone(), group.card_id.clone()))
                    .copied()
                    .unwrap_or(0),
            );

            let turn_median = percentile(&turn_devs, 0.50);
            let hp_median = percentile(&hp_devs, 0.50);
            let std_dev_turn = sample_std(&turn_devs);
            let std_dev_hp = sample_std(&hp_devs);

            out.push(AggregatedCardRow {
                character: character.clone(),
                card_name: card_name.clone(),
                weighted_avg_turn_deviation: weighted_turn,
                weighted_avg_hp_deviation: weighted_hp,
                stability_score,
                standard_deviation,
                rarity,
                card_type,
                total_fights_with: rows.iter().map(|r| r.fights_with as u64).sum(),
                turn_min: turn_devs.iter().copied().fold(f64::INFINITY, f64::min),
                turn_q1: percentile(&turn_devs, 0.25),
                turn_median,
                turn_q3: percentile(&turn_devs, 0.75),
                turn_max: turn_devs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                std_dev_turn,
                hp_min: hp_devs.iter().copied().fold(f64::INFINITY, f64::min),
                hp_q1: percentile(&hp_devs, 0.25),
                hp_median,
                hp_q3: percentile(&hp_devs, 0.75),
                hp_max: hp_devs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                std_dev_hp,
                turn_act_1: act_turn[0],
                turn_act_2: act_turn[1],
                turn_act_3: act_turn[2],
                turn_act_4: act_turn[3],
                hp_act_1: act_hp[0],
                hp_act_2: act_hp[1],
                hp_act_3: act_hp[2],
                hp_act_4: act_hp[3],
                adoption_rate,
                avg_upgrade_rate,
                avg_copies,
                top_co_occurrence,
                turn_tendency: tendency(weighted_turn, turn_median, std_dev_turn),
                hp_tendency: tendency(weighted_hp, hp_median, std_dev_hp),
            });
        }

        out
    }

    fn build_situational(
        &self,
        scored: &[ScoredCard],
        by_card: &BTreeMap<(String, String), CardGroup>,
        partners_situational: &HashMap<(GroupKey, String), Vec<(String, CoCount)>>,
        agg: &Aggregator,
    ) -> Vec<SituationalCardRow> {
        scored
            .iter()
            .map(|row| {
                let group_key = GroupKey {
                    character: row.character.clone(),
                    act: row.act,
                    combat: row.combat,
                };
                let top_co_occurrence = self.render_top_partners(
                    partners_situational.get(&(group_key.clone(), row.card_id.clone())),
                    agg.fights_situational
                        .get(&(group_key, row.card_id.clone()))
                        .copied()
                        .unwrap_or(0),
                );

                let card_rows = by_card.get(&(row.character.clone(), row.card_name.clone()));
                let (stability_score, standard_deviation) = card_rows
                    .map(|g| {
                        let overall: Vec<f64> =
                            g.rows.iter().map(|r| r.overall_deviation).collect();
                        let std = population_std(&overall);
                        (100.0 - std, std)
                    })
                    .unwrap_or((100.0, 0.0));

                let card_info = self.catalogs.cards.get(&row.card_id);
                SituationalCardRow {
                    stability_score,
                    standard_deviation,
                    rarity: card_info
                        .map(|c| c.rarity.clone())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    card_type: card_info
                        .map(|c| c.card_type.clone())
                        .filter(|t| !t.is_empty())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    top_co_occurrence,
                    scored: row.clone(),
                }
            })
            .collect()
    }

    /// `"name (rate%)"` lines, count-descending with encounter-order ties,
    /// joined by `<br>`. Empty when the card has no recorded fights.
    fn render_top_partners(
        &self,
        partners: Option<&Vec<(String, CoCount)>>,
        total_fights: u64,
    ) -> String {
        let Some(partners) = partners else {
            return String::new();
        };
        if total_fights == 0 {
            return String::new();
        }

        let mut ranked: Vec<&(String, CoCount)> = partners.iter().collect();
        ranked.sort_by(|a, b| {
            b.1.count
                .cmp(&a.1.count)
                .then(a.1.first_seen.cmp(&b.1.first_seen))
        });

        ranked
            .iter()
            .take(self.weights.co_occurrence_top)
            .map(|(partner, co)| {
                let rate = co.count as f64 / total_fights as f64 * 100.0;
                format!("{} ({:.1}%)", self.catalogs.card_name(partner), rate)
            })
            .collect::<Vec<_>>()
            .join("<br>")
    }

    fn build_exhibits(&self, agg: &Aggregator) -> Vec<ExhibitRow> {
        let mut characters: Vec<&String> = agg.total_runs.keys().collect();
        characters.sort();

        let mut exhibit_ids: Vec<&String> = self
            .catalogs
            .exhibits
            .iter()
            .filter(|(_, info)| info.category != "Treasure")
            .map(|(id, _)| id)
            .collect();
        exhibit_ids.sort();

        let mut out = Vec::new();
        for character in characters {
            let total_runs = agg.total_runs.get(character).copied().unwrap_or(0).max(1);
            for id in &exhibit_ids {
                let rarity = self.catalogs.exhibit_rarity_for(id).unwrap_or("").to_string();
                let props = self.catalogs.exhibit_props.get(*id);
                let taken = agg
                    .exhibit_adoption
                    .get(&(character.clone(), (*id).clone()))
                    .map(|a| a.runs_with_exhibit)
                    .unwrap_or(0);
                out.push(ExhibitRow {
                    character: character.clone(),
                    exhibit_id: (*id).clone(),
                    name: self.catalogs.exhibit_name(id),
                    display_category: display_category(&rarity, props),
                    rarity,
                    adoption_rate: taken as f64 / total_runs as f64,
                });
            }
        }
        out
    }

    fn build_enemy_summary(&self, agg: &Aggregator) -> Vec<EnemySummaryRow> {
        let mut keys: Vec<_> = agg.enemy_encounters.keys().collect();
        keys.sort_by(|a, b| {
            (&a.character, a.act, &a.enemy).cmp(&(&b.character, b.act, &b.enemy))
        });

        let mut out = Vec::new();
        for key in keys {
            let rec = &agg.enemy_encounters[key];
            let encounters = rec.samples.turns.len();
            if encounters == 0 {
                continue;
            }
            out.push(EnemySummaryRow {
                character: key.character.clone(),
                act: key.act,
                enemy_id: key.enemy.clone(),
                station_type: rec.station_type,
                min_level: rec.min_level.unwrap_or(99),
                enemy_name: self.catalogs.enemy_name(&key.enemy),
                encounters,
                avg_turns: mean(&rec.samples.turns),
                avg_hp_loss: mean(&rec.samples.hp_loss),
                avg_p_change: mean(&rec.samples.power_change),
                turns_boxplot: five_number_summary(&rec.samples.turns),
                hp_loss_boxplot: five_number_summary(&rec.samples.hp_loss),
                p_change_boxplot: five_number_summary(&rec.samples.power_change),
            });
        }
        out
    }

    fn build_route_events(&self, agg: Aggregator) -> RouteEventData {
        // Act-wide envelopes across every combat node of a (character, act).
        let mut act_samples: HashMap<(String, u32), (Vec<f64>, Vec<f64>, Vec<f64>)> =
            HashMap::new();
        for (key, detail) in &agg.node_details {
            if let NodeDetail::Combat { enemies } = detail {
                let slot = act_samples
                    .entry((key.character.clone(), key.act))
                    .or_default();
                for samples in enemies.values() {
                    slot.0.extend_from_slice(&samples.turns);
                    slot.1.extend_from_slice(&samples.hp_loss);
                    slot.2.extend_from_slice(&samples.power_change);
                }
            }
        }
        let act_scales: HashMap<(String, u32), ActScales> = act_samples
            .into_iter()
            .map(|(key, (turns, hp_loss, p_change))| {
                (
                    key,
                    ActScales {
                        turns_min: min_or(&turns, 0.0),
                        turns_max: max_or(&turns, 1.0),
                        hp_loss_min: min_or(&hp_loss, 0.0),
                        hp_loss_max: max_or(&hp_loss, 1.0),
                        p_change_min: min_or(&p_change, 0.0),
                        p_change_max: max_or(&p_change, 1.0),
                    },
                )
            })
            .collect();

        let mut node_details = HashMap::new();
        for (key, detail) in &agg.node_details {
            let total_visits = agg
                .node_selection
                .get(&NodeKey {
                    character: key.character.clone(),
                    act: key.act,
                    level: key.level,
                })
                .and_then(|sel| sel.by_type.get(&key.station_type))
                .copied()
                .unwrap_or(1) as f64;

            let summary = match detail {
                NodeDetail::Combat { enemies } => NodeDetailSummary::Combat {
                    enemies: enemies
                        .iter()
                        .map(|(enemy_id, samples)| {
                            (
                                enemy_id.clone(),
                                EnemyNodeSummary {
                                    name: self.catalogs.enemy_name(enemy_id),
                                    rate: samples.turns.len() as f64 / total_visits,
                                    avg_turns: mean(&samples.turns),
                                    avg_hp_loss: mean(&samples.hp_loss),
                                    avg_p_change: mean(&samples.power_change),
                                    turns_boxplot: five_number_summary(&samples.turns),
                                    hp_loss_boxplot: five_number_summary(&samples.hp_loss),
                                    p_change_boxplot: five_number_summary(&samples.power_change),
                                },
                            )
                        })
                        .collect(),
                    scales: act_scales
                        .get(&(key.character.clone(), key.act))
                        .copied()
                        .unwrap_or_default(),
                },
                NodeDetail::Gap { choices } => NodeDetailSummary::Gap {
                    choices: choices
                        .iter()
                        .map(|(choice, &count)| {
                            (
                                choice.clone(),
                                ChoiceRate {
                                    rate: count as f64 / total_visits,
                                },
                            )
                        })
                        .collect(),
                },
                NodeDetail::Shop {
                    money,
                    remove_card_runs,
                    upgrade_card_runs,
                } => NodeDetailSummary::Shop {
                    remove_card_rate: *remove_card_runs as f64 / total_visits,
                    upgrade_card_rate: *upgrade_card_runs as f64 / total_visits,
                    money_stats: if money.is_empty() {
                        None
                    } else {
                        Some(MoneyStats {
                            mean: mean(money),
                            q1: percentile(money, 0.25),
                            q2: percentile(money, 0.50),
                            q3: percentile(money, 0.75),
                        })
                    },
                },
            };
            node_details.insert(key.clone(), summary);
        }

        // Flat event counters regrouped per node, ranked and truncated.
        let mut event_actions: HashMap<DetailKey, HashMap<String, Vec<(String, u64)>>> =
            HashMap::new();
        for ((dkey, ekey, item), count) in &agg.event_actions {
            event_actions
                .entry(dkey.clone())
                .or_default()
                .entry(ekey.label())
                .or_default()
                .push((item.clone(), *count));
        }
        for events in event_actions.values_mut() {
            for items in events.values_mut() {
                items.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
                items.truncate(self.weights.event_action_top);
            }
        }

        RouteEventData {
            node_selection: agg.node_selection,
            event_actions,
            node_details,
            total_runs: agg.total_runs,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CardGroup {
    card_id: String,
    rows: Vec<ScoredCard>,
}

/// Regroups the flat global pair table into per-(character, card) partner
/// lists.
fn group_global_partners(
    pairs: &HashMap<(String, String, String), CoCount>,
) -> HashMap<(String, String), Vec<(String, CoCount)>> {
    let mut grouped: HashMap<(String, String), Vec<(String, CoCount)>> = HashMap::new();
    for ((character, card, partner), co) in pairs {
        grouped
            .entry((character.clone(), card.clone()))
            .or_default()
            .push((partner.clone(), *co));
    }
    grouped
}

/// Regroups the flat situational pair table into per-(group, card) partner
/// lists.
fn group_situational_partners(
    pairs: &HashMap<(GroupKey, String, String), CoCount>,
) -> HashMap<(GroupKey, String), Vec<(String, CoCount)>> {
    let mut grouped: HashMap<(GroupKey, String), Vec<(String, CoCount)>> = HashMap::new();
    for ((group, card, partner), co) in pairs {
        grouped
            .entry((group.clone(), card.clone()))
            .or_default()
            .push((partner.clone(), *co));
    }
    grouped
}

/// `3 * (weighted - median) / stddev`, flushed to 0 when the spread is zero.
fn tendency(weighted: f64, median: f64, std_dev: f64) -> f64 {
    if std_dev > 0.0 {
        let t = 3.0 * (weighted - median) / std_dev;
        if t.is_finite() {
            t
        } else {
            0.0
        }
    } else {
        0.0
    }
}

fn min_or(values: &[f64], default: f64) -> f64 {
    if values.is_empty() {
        return default;
    }
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max_or(values: &[f64], default: f64) -> f64 {
    if values.is_empty() {
        return default;
    }
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Derives the presentation bucket for an exhibit from its rarity and
/// pool/appearance flags.
fn display_category(rarity: &str, props: Option<&ExhibitProps>) -> DisplayCategory {
    let rarity = capitalize(rarity);
    let appearance = props.and_then(|p| p.appearance.as_deref()).unwrap_or("");
    let is_pooled = props.and_then(|p| p.is_pooled);

    if rarity == "Shining" {
        return DisplayCategory::Shining;
    }
    if appearance == "ShopOnly" {
        return DisplayCategory::Shop;
    }
    if is_pooled == Some(false) {
        return DisplayCategory::Event;
    }
    if appearance == "Anywhere" && is_pooled == Some(true) {
        return match rarity.as_str() {
            "Rare" => DisplayCategory::GeneralRare,
            "Uncommon" => DisplayCategory::GeneralUncommon,
            "Common" => DisplayCategory::GeneralCommon,
            _ => DisplayCategory::Event,
        };
    }
    DisplayCategory::Event
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_category_prefers_shining_then_shop() {
        let props = ExhibitProps {
            is_pooled: Some(true),
            appearance: Some("ShopOnly".to_string()),
            rarity: None,
        };
        assert_eq!(display_category("shining", Some(&props)), DisplayCategory::Shining);
        assert_eq!(display_category("rare", Some(&props)), DisplayCategory::Shop);
    }

    #[test]
    fn pooled_anywhere_maps_rarity_buckets() {
        let props = ExhibitProps {
            is_pooled: Some(true),
            appearance: Some("Anywhere".to_string()),
            rarity: None,
        };
        assert_eq!(display_category("rare", Some(&props)), DisplayCategory::GeneralRare);
        assert_eq!(display_category("common", Some(&props)), DisplayCategory::GeneralCommon);
        assert_eq!(display_category("weird", Some(&props)), DisplayCategory::Event);
    }

    #[test]
    fn unpooled_exhibits_are_event_rewards() {
        let props = ExhibitProps {
            is_pooled: Some(false),
            appearance: Some("Anywhere".to_string()),
            rarity: None,
        };
        assert_eq!(display_category("rare", Some(&props)), DisplayCategory::Event);
    }

    #[test]
    fn tendency_is_zero_on_zero_spread() {
        assert_eq!(tendency(55.0, 50.0, 0.0), 0.0);
        assert!(tendency(55.0, 50.0, 5.0) > 0.0);
    }
}
