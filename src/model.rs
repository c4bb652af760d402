//! Serde data model for the run-log archive.
//!
//! The archive is untrusted community-contributed data: every field is
//! defaulted so a record missing optional parts still deserializes, and the
//! filter rejects records missing the parts that matter.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Kind of node visited during a run.
///
/// `Unknown` absorbs node kinds this tool does not model; they still
/// participate in the per-station stat tracker but produce no table rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString)]
pub enum StationType {
    Enemy,
    EliteEnemy,
    Boss,
    Shop,
    Gap,
    Adventure,
    Supply,
    Trade,
    Entry,
    Select,
    #[default]
    Unknown,
}

impl StationType {
    pub fn is_combat(self) -> bool {
        matches!(self, Self::Enemy | Self::EliteEnemy | Self::Boss)
    }

    /// Station kinds where card/exhibit mutation events are meaningful.
    pub fn is_mutation_site(self) -> bool {
        matches!(
            self,
            Self::Shop
                | Self::Gap
                | Self::Adventure
                | Self::Supply
                | Self::Boss
                | Self::Enemy
                | Self::EliteEnemy
                | Self::Trade
                | Self::Entry
        )
    }
}

impl<'de> Deserialize<'de> for StationType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or(StationType::Unknown))
    }
}

impl Serialize for StationType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Deck/exhibit mutation operation. `Unknown` operations are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString)]
pub enum MutationOp {
    Add,
    Remove,
    Upgrade,
    #[default]
    Unknown,
}

impl<'de> Deserialize<'de> for MutationOp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or(MutationOp::Unknown))
    }
}

impl Serialize for MutationOp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One complete playthrough record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Run {
    #[serde(rename = "Name")]
    pub player: Option<String>,
    #[serde(rename = "Character")]
    pub character: Option<String>,
    #[serde(rename = "PlayerType")]
    pub player_type: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Stations")]
    pub stations: Vec<Station>,
    #[serde(rename = "Result")]
    pub outcome: RunOutcome,
    #[serde(rename = "Cards_log")]
    pub cards_log: Vec<MutationEvent>,
    #[serde(rename = "Exhibits_log")]
    pub exhibits_log: Vec<MutationEvent>,
}

impl Run {
    /// Aggregation key: character name with the player-type tag appended
    /// (e.g. `SakuyaTypeA`). `None` when the character field is missing.
    pub fn character_key(&self) -> Option<String> {
        self.character
            .as_ref()
            .map(|c| format!("{}{}", c, self.player_type))
    }
}

/// Terminal state of a run: the final deck and exhibit lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunOutcome {
    #[serde(rename = "Cards")]
    pub cards: Vec<OwnedCard>,
    #[serde(rename = "Exhibits")]
    pub exhibits: Vec<String>,
}

/// One physical card copy in the terminal deck.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OwnedCard {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "IsUpgraded")]
    pub is_upgraded: bool,
}

/// One visited node, in visitation order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Station {
    #[serde(rename = "Type")]
    pub station_type: StationType,
    #[serde(rename = "Node")]
    pub node: NodeRef,
    #[serde(rename = "Status")]
    pub status: Status,
    #[serde(rename = "Data")]
    pub data: StationData,
    /// Enemy group id, present on combat stations.
    #[serde(rename = "Id")]
    pub enemy_id: Option<String>,
}

/// Map coordinates of a station: act 1-4 and level within the act.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct NodeRef {
    #[serde(rename = "Act")]
    pub act: Option<u32>,
    #[serde(rename = "Level")]
    pub level: Option<u32>,
}

/// Player state snapshot at a station. Missing fields read as zero.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct Status {
    #[serde(rename = "Hp")]
    pub hp: i64,
    #[serde(rename = "Power")]
    pub power: i64,
    #[serde(rename = "Money")]
    pub money: i64,
}

/// Station-type-specific payload. Only the fields this tool reads are kept.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StationData {
    #[serde(rename = "Rounds")]
    pub rounds: Option<i64>,
    #[serde(rename = "Choice")]
    pub choice: Option<String>,
}

/// One deck/exhibit mutation, anchored to the station index it happened at.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MutationEvent {
    #[serde(rename = "Station")]
    pub station: Option<i64>,
    #[serde(rename = "Type")]
    pub op: MutationOp,
    #[serde(rename = "Id")]
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_station_type_does_not_fail_parsing() {
        let s: Station = serde_json::from_str(r#"{"Type":"SomeFutureNode"}"#).unwrap();
        assert_eq!(s.station_type, StationType::Unknown);
    }

    #[test]
    fn run_parses_with_missing_fields() {
        let run: Run = serde_json::from_str(r#"{"Character":"Sakuya"}"#).unwrap();
        assert_eq!(run.character_key().unwrap(), "Sakuya");
        assert!(run.stations.is_empty());
    }

    #[test]
    fn character_key_appends_player_type() {
        let run: Run =
            serde_json::from_str(r#"{"Character":"Cirno","PlayerType":"TypeB"}"#).unwrap();
        assert_eq!(run.character_key().unwrap(), "CirnoTypeB");
    }
}
