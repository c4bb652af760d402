//! Per-run deck snapshot reconstruction.
//!
//! Replays the ordered card mutation log into an array of deck compositions:
//! `snapshots[i]` is the deck as it stood *entering* station `i`, so a
//! combat outcome at station `i` is attributed to `snapshots[i]`.

use crate::catalog::Catalogs;
use crate::model::{MutationEvent, MutationOp};
use std::collections::HashSet;

/// Builds `station_count + 1` snapshots. `snapshots[0]` is empty;
/// `snapshots[i]` applies every Add/Remove logged at station index `i - 1`
/// on top of `snapshots[i - 1]`. Card ids are normalized before insertion
/// or removal; removing an id that is not present is a no-op, and Upgrade
/// does not change membership.
pub fn reconstruct_decks(
    station_count: usize,
    cards_log: &[MutationEvent],
    catalogs: &Catalogs,
) -> Vec<HashSet<String>> {
    let mut snapshots: Vec<HashSet<String>> = Vec::with_capacity(station_count + 1);
    snapshots.push(HashSet::new());

    for i in 1..=station_count {
        let mut deck = snapshots[i - 1].clone();
        let station_index = (i - 1) as i64;
        for event in cards_log.iter().filter(|e| e.station == Some(station_index)) {
            let id = catalogs.normalize_card_id(&event.id);
            match event.op {
                MutationOp::Add => {
                    deck.insert(id.to_string());
                }
                MutationOp::Remove => {
                    deck.remove(id);
                }
                MutationOp::Upgrade | MutationOp::Unknown => {}
            }
        }
        snapshots.push(deck);
    }

    snapshots
}
