//! Shared builders for synthetic runs and catalogs.
#![allow(dead_code)]

use runforge::catalog::{CardInfo, Catalogs};
use runforge::model::{
    MutationEvent, MutationOp, NodeRef, OwnedCard, Run, Station, StationData, StationType, Status,
};

pub fn catalogs_with_cards(ids: &[&str]) -> Catalogs {
    let mut catalogs = Catalogs::empty();
    for id in ids {
        catalogs.cards.insert(id.to_string(), CardInfo::default());
    }
    catalogs
}

pub fn status(hp: i64, power: i64, money: i64) -> Status {
    Status { hp, power, money }
}

pub fn station(stype: StationType, act: u32, level: u32, hp: i64) -> Station {
    Station {
        station_type: stype,
        node: NodeRef {
            act: Some(act),
            level: Some(level),
        },
        status: status(hp, 0, 0),
        ..Station::default()
    }
}

pub fn combat_station(
    stype: StationType,
    act: u32,
    level: u32,
    enemy: &str,
    rounds: i64,
    hp: i64,
) -> Station {
    Station {
        station_type: stype,
        node: NodeRef {
            act: Some(act),
            level: Some(level),
        },
        status: status(hp, 0, 0),
        data: StationData {
            rounds: Some(rounds),
            choice: None,
        },
        enemy_id: Some(enemy.to_string()),
        ..Station::default()
    }
}

pub fn event(station: i64, op: MutationOp, id: &str) -> MutationEvent {
    MutationEvent {
        station: Some(station),
        op,
        id: id.to_string(),
    }
}

pub fn owned_card(id: &str, upgraded: bool) -> OwnedCard {
    OwnedCard {
        id: id.to_string(),
        is_upgraded: upgraded,
    }
}

/// A run that passes the default filter for Reimu on 1.7.2.
pub fn reimu_run(stations: Vec<Station>) -> Run {
    Run {
        character: Some("Reimu".to_string()),
        version: "1.7.2".to_string(),
        stations,
        ..Run::default()
    }
}
