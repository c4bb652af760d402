//! Deviation scoring: the in-memory post-pass that turns raw with/without
//! outcome samples into group-relative, z-score-normalized performance
//! scores centered at 50.

use crate::aggregate::{GroupKey, OutcomeTable};
use crate::catalog::Catalogs;
use crate::config::SamplePolicy;
use crate::model::StationType;
use crate::stats::{mean, sample_std};
use serde::Serialize;
use tracing::debug;

/// One scored (character, act, combat type, card) entry.
///
/// Scores are a relative ranking within the group, not an absolute unit:
/// 50 is the group mean by construction and 10 points is one group
/// standard deviation.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCard {
    #[serde(rename = "Character")]
    pub character: String,
    #[serde(rename = "Act")]
    pub act: u32,
    #[serde(rename = "Combat_Type")]
    pub combat: StationType,
    #[serde(rename = "Card_ID")]
    pub card_id: String,
    #[serde(rename = "Card_Name")]
    pub card_name: String,
    #[serde(rename = "Turn_Impact")]
    pub turn_impact: f64,
    #[serde(rename = "HP_Loss_Impact")]
    pub hp_loss_impact: f64,
    #[serde(rename = "Turn_Deviation")]
    pub turn_deviation: f64,
    #[serde(rename = "HP_Deviation")]
    pub hp_deviation: f64,
    #[serde(rename = "Overall_Deviation")]
    pub overall_deviation: f64,
    #[serde(rename = "Fights_With")]
    pub fights_with: usize,
    #[serde(rename = "Fights_Without")]
    pub fights_without: usize,
}

struct ImpactRow {
    card_id: String,
    turn_impact: f64,
    hp_loss_impact: f64,
    fights_with: usize,
    fights_without: usize,
}

/// Scores every group in the outcome table. Cards qualify only when BOTH
/// buckets meet the per-combat-type minimum sample count. Output is sorted
/// by (character, act, combat, card) so downstream tables are stable.
pub fn score_outcomes(
    outcomes: &OutcomeTable,
    policy: &SamplePolicy,
    catalogs: &Catalogs,
) -> Vec<ScoredCard> {
    let mut group_keys: Vec<&GroupKey> = outcomes.keys().collect();
    group_keys.sort_by(|a, b| {
        (&a.character, a.act, a.combat.to_string()).cmp(&(&b.character, b.act, b.combat.to_string()))
    });

    let mut scored = Vec::new();
    for key in group_keys {
        let cards = &outcomes[key];
        let min_count = policy.min_for(key.combat);

        let mut impacts: Vec<ImpactRow> = Vec::new();
        let mut card_ids: Vec<&String> = cards.keys().collect();
        card_ids.sort();
        for card_id in card_ids {
            let samples = &cards[card_id];
            let with = &samples.with_card;
            let without = &samples.without_card;
            if with.len() < min_count || without.len() < min_count {
                continue;
            }
            impacts.push(ImpactRow {
                card_id: card_id.clone(),
                // Positive impact: the card's presence shortened fights /
                // reduced HP loss.
                turn_impact: mean(&without.turns) - mean(&with.turns),
                hp_loss_impact: mean(&without.hp_loss) - mean(&with.hp_loss),
                fights_with: with.len(),
                fights_without: without.len(),
            });
        }

        if impacts.is_empty() {
            continue;
        }

        let turn_impacts: Vec<f64> = impacts.iter().map(|r| r.turn_impact).collect();
        let hp_impacts: Vec<f64> = impacts.iter().map(|r| r.hp_loss_impact).collect();
        let (turn_mean, turn_std) = (mean(&turn_impacts), sample_std(&turn_impacts));
        let (hp_mean, hp_std) = (mean(&hp_impacts), sample_std(&hp_impacts));

        debug!(
            "Scoring {}/act{}/{}: {} cards above min sample count {}",
            key.character,
            key.act,
            key.combat,
            impacts.len(),
            min_count
        );

        for row in impacts {
            let turn_deviation = deviation(row.turn_impact, turn_mean, turn_std);
            let hp_deviation = deviation(row.hp_loss_impact, hp_mean, hp_std);
            scored.push(ScoredCard {
                character: key.character.clone(),
                act: key.act,
                combat: key.combat,
                card_name: catalogs.card_name(&row.card_id),
                card_id: row.card_id,
                turn_impact: row.turn_impact,
                hp_loss_impact: row.hp_loss_impact,
                turn_deviation,
                hp_deviation,
                overall_deviation: (turn_deviation + hp_deviation) / 2.0,
                fights_with: row.fights_with,
                fights_without: row.fights_without,
            });
        }
    }

    scored
}

/// 50 +/- 10 per group standard deviation. Zero spread (a single comparable
/// card, or no variance) is the defined neutral case: exactly 50.
fn deviation(impact: f64, group_mean: f64, group_std: f64) -> f64 {
    if group_std > 0.0 {
        50.0 + 10.0 * (impact - group_mean) / group_std
    } else {
        50.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::OutcomeSamples;
    use std::collections::HashMap;

    fn samples(with: &[(f64, f64)], without: &[(f64, f64)]) -> OutcomeSamples {
        let mut rec = OutcomeSamples::default();
        for &(t, h) in with {
            rec.with_card.turns.push(t);
            rec.with_card.hp_loss.push(h);
        }
        for &(t, h) in without {
            rec.without_card.turns.push(t);
            rec.without_card.hp_loss.push(h);
        }
        rec
    }

    #[test]
    fn below_minimum_sample_count_is_not_scored() {
        let mut outcomes: OutcomeTable = HashMap::new();
        let key = GroupKey {
            character: "ReimuTypeA".to_string(),
            act: 1,
            combat: StationType::Boss,
        };
        // 5 samples each: below the Boss minimum of 6.
        let five: Vec<(f64, f64)> = (0..5).map(|_| (3.0, 10.0)).collect();
        outcomes.insert(key, HashMap::from([("C".to_string(), samples(&five, &five))]));

        let scored = score_outcomes(&outcomes, &SamplePolicy::default(), &Catalogs::empty());
        assert!(scored.is_empty());
    }

    #[test]
    fn single_card_group_scores_exactly_fifty() {
        let mut outcomes: OutcomeTable = HashMap::new();
        let key = GroupKey {
            character: "ReimuTypeA".to_string(),
            act: 1,
            combat: StationType::Boss,
        };
        let with: Vec<(f64, f64)> = (0..6).map(|_| (3.0, 10.0)).collect();
        let without: Vec<(f64, f64)> = (0..6).map(|_| (5.0, 18.0)).collect();
        outcomes.insert(key, HashMap::from([("C".to_string(), samples(&with, &without))]));

        let scored = score_outcomes(&outcomes, &SamplePolicy::default(), &Catalogs::empty());
        assert_eq!(scored.len(), 1);
        assert_eq!(scored[0].turn_impact, 2.0);
        assert_eq!(scored[0].hp_loss_impact, 8.0);
        assert_eq!(scored[0].turn_deviation, 50.0);
        assert_eq!(scored[0].overall_deviation, 50.0);
    }
}
