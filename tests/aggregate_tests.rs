mod common;

use common::*;
use runforge::aggregate::{Aggregator, GroupKey, NodeDetail, NodeKey};
use runforge::deck::reconstruct_decks;
use runforge::model::{MutationOp, StationData, StationType};

fn observe(aggregator: &mut Aggregator, run: &runforge::model::Run) {
    let catalogs = catalogs_with_cards(&[]);
    let decks = reconstruct_decks(run.stations.len(), &run.cards_log, &catalogs);
    aggregator.observe_run(run, &decks);
}

// --- CO-OCCURRENCE ---

#[test]
fn co_occurrence_counts_are_symmetric() {
    let catalogs = catalogs_with_cards(&["A", "B", "C"]);
    let mut agg = Aggregator::new(&catalogs);

    let mut run = reimu_run(vec![
        station(StationType::Entry, 1, 0, 60),
        combat_station(StationType::Enemy, 1, 1, "Slime", 4, 50),
    ]);
    run.cards_log = vec![
        event(0, MutationOp::Add, "A"),
        event(0, MutationOp::Add, "B"),
        event(0, MutationOp::Add, "C"),
    ];
    observe(&mut agg, &run);

    let c = |a: &str, b: &str| {
        agg.co_global
            .get(&("Reimu".to_string(), a.to_string(), b.to_string()))
            .map(|co| co.count)
            .unwrap_or(0)
    };
    for (a, b) in [("A", "B"), ("A", "C"), ("B", "C")] {
        assert_eq!(c(a, b), 1, "{}->{}", a, b);
        assert_eq!(c(a, b), c(b, a), "asymmetric pair {} {}", a, b);
    }
    // No self-pairs.
    assert_eq!(c("A", "A"), 0);
}

#[test]
fn situational_co_occurrence_is_keyed_by_group() {
    let catalogs = catalogs_with_cards(&["A", "B"]);
    let mut agg = Aggregator::new(&catalogs);

    let mut run = reimu_run(vec![
        station(StationType::Entry, 1, 0, 60),
        combat_station(StationType::Enemy, 1, 1, "Slime", 4, 50),
        combat_station(StationType::Boss, 1, 9, "Lord", 8, 30),
    ]);
    run.cards_log = vec![
        event(0, MutationOp::Add, "A"),
        event(0, MutationOp::Add, "B"),
    ];
    observe(&mut agg, &run);

    let enemy_group = GroupKey {
        character: "Reimu".to_string(),
        act: 1,
        combat: StationType::Enemy,
    };
    let boss_group = GroupKey {
        character: "Reimu".to_string(),
        act: 1,
        combat: StationType::Boss,
    };
    let get = |g: &GroupKey| {
        agg.co_situational
            .get(&(g.clone(), "A".to_string(), "B".to_string()))
            .map(|co| co.count)
            .unwrap_or(0)
    };
    assert_eq!(get(&enemy_group), 1);
    assert_eq!(get(&boss_group), 1);

    assert_eq!(
        agg.fights_situational[&(enemy_group, "A".to_string())],
        1
    );
    assert_eq!(agg.fights_global[&("Reimu".to_string(), "A".to_string())], 2);
}

// --- WITH/WITHOUT CLASSIFICATION ---

#[test]
fn every_catalog_card_lands_in_exactly_one_bucket_per_fight() {
    let catalogs = catalogs_with_cards(&["Present", "Absent"]);
    let mut agg = Aggregator::new(&catalogs);

    let mut run = reimu_run(vec![
        station(StationType::Entry, 1, 0, 60),
        combat_station(StationType::Enemy, 1, 1, "Slime", 4, 48),
    ]);
    run.cards_log = vec![event(0, MutationOp::Add, "Present")];
    observe(&mut agg, &run);

    let group = &agg.outcomes[&GroupKey {
        character: "Reimu".to_string(),
        act: 1,
        combat: StationType::Enemy,
    }];

    let present = &group["Present"];
    assert_eq!(present.with_card.len(), 1);
    assert_eq!(present.without_card.len(), 0);
    assert_eq!(present.with_card.turns, vec![4.0]);
    // HP loss relative to the previous station: 60 - 48.
    assert_eq!(present.with_card.hp_loss, vec![12.0]);

    let absent = &group["Absent"];
    assert_eq!(absent.with_card.len(), 0);
    assert_eq!(absent.without_card.len(), 1);
}

#[test]
fn combat_without_act_is_not_classified() {
    let catalogs = catalogs_with_cards(&["A"]);
    let mut agg = Aggregator::new(&catalogs);

    let mut fight = combat_station(StationType::Enemy, 1, 1, "Slime", 4, 50);
    fight.node.act = None;
    let run = reimu_run(vec![station(StationType::Entry, 1, 0, 60), fight]);
    observe(&mut agg, &run);

    assert!(agg.outcomes.is_empty());
    assert!(agg.enemy_encounters.is_empty());
}

#[test]
fn first_station_fight_has_zero_hp_loss() {
    let catalogs = catalogs_with_cards(&["A"]);
    let mut agg = Aggregator::new(&catalogs);

    let run = reimu_run(vec![combat_station(StationType::Enemy, 1, 0, "Slime", 3, 60)]);
    observe(&mut agg, &run);

    let group = &agg.outcomes[&GroupKey {
        character: "Reimu".to_string(),
        act: 1,
        combat: StationType::Enemy,
    }];
    assert_eq!(group["A"].without_card.hp_loss, vec![0.0]);
}

// --- NODE SELECTION ---

#[test]
fn node_selection_counts_each_level_once_per_run() {
    let catalogs = catalogs_with_cards(&[]);
    let mut agg = Aggregator::new(&catalogs);

    // (act 1, level 3) visited twice in the same run.
    let run = reimu_run(vec![
        station(StationType::Gap, 1, 3, 60),
        station(StationType::Gap, 1, 3, 60),
        station(StationType::Shop, 1, 4, 60),
    ]);
    observe(&mut agg, &run);

    let key = NodeKey {
        character: "Reimu".to_string(),
        act: 1,
        level: 3,
    };
    assert_eq!(agg.node_selection[&key].total, 1);
    assert_eq!(agg.node_selection[&key].by_type[&StationType::Gap], 1);

    // A second run through the same level counts again.
    let run2 = reimu_run(vec![station(StationType::Gap, 1, 3, 60)]);
    observe(&mut agg, &run2);
    assert_eq!(agg.node_selection[&key].total, 2);
}

// --- NODE DETAILS ---

#[test]
fn shop_details_use_pre_station_money_and_mutation_flags() {
    let catalogs = catalogs_with_cards(&[]);
    let mut agg = Aggregator::new(&catalogs);

    let mut entry = station(StationType::Entry, 1, 0, 60);
    entry.status.money = 100;
    let mut shop = station(StationType::Shop, 1, 2, 60);
    shop.status.money = 40;

    let mut run = reimu_run(vec![entry, shop]);
    run.cards_log = vec![
        event(1, MutationOp::Remove, "Strike"),
        event(1, MutationOp::Add, "Bargain"),
    ];
    observe(&mut agg, &run);

    let key = runforge::aggregate::DetailKey {
        character: "Reimu".to_string(),
        act: 1,
        level: 2,
        station_type: StationType::Shop,
    };
    let NodeDetail::Shop {
        money,
        remove_card_runs,
        upgrade_card_runs,
    } = &agg.node_details[&key]
    else {
        panic!("expected shop detail");
    };
    // Money entering the shop is the previous station's value.
    assert_eq!(money, &vec![100.0]);
    assert_eq!(*remove_card_runs, 1);
    assert_eq!(*upgrade_card_runs, 0);
}

#[test]
fn gap_choices_are_counted() {
    let catalogs = catalogs_with_cards(&[]);
    let mut agg = Aggregator::new(&catalogs);

    let mut gap = station(StationType::Gap, 2, 5, 60);
    gap.data = StationData {
        rounds: None,
        choice: Some("Rest".to_string()),
    };
    observe(&mut agg, &reimu_run(vec![gap]));

    let key = runforge::aggregate::DetailKey {
        character: "Reimu".to_string(),
        act: 2,
        level: 5,
        station_type: StationType::Gap,
    };
    let NodeDetail::Gap { choices } = &agg.node_details[&key] else {
        panic!("expected gap detail");
    };
    assert_eq!(choices["Rest"], 1);
}

#[test]
fn enemy_encounters_fold_min_level_and_type() {
    let catalogs = catalogs_with_cards(&[]);
    let mut agg = Aggregator::new(&catalogs);

    let run = reimu_run(vec![
        combat_station(StationType::EliteEnemy, 2, 7, "Knight", 6, 60),
        combat_station(StationType::EliteEnemy, 2, 3, "Knight", 5, 50),
    ]);
    observe(&mut agg, &run);

    let rec = &agg.enemy_encounters[&runforge::aggregate::EnemyKey {
        character: "Reimu".to_string(),
        act: 2,
        enemy: "Knight".to_string(),
    }];
    assert_eq!(rec.samples.turns, vec![6.0, 5.0]);
    assert_eq!(rec.min_level, Some(3));
    assert_eq!(rec.station_type, StationType::EliteEnemy);
}

// --- EVENT ACTIONS ---

#[test]
fn event_actions_require_the_exact_station_index() {
    let catalogs = catalogs_with_cards(&[]);
    let mut agg = Aggregator::new(&catalogs);

    let mut run = reimu_run(vec![
        station(StationType::Entry, 1, 0, 60),
        station(StationType::Adventure, 1, 1, 60),
    ]);
    run.cards_log = vec![
        event(1, MutationOp::Add, "Prize"),
        event(5, MutationOp::Add, "Elsewhere"),
    ];
    observe(&mut agg, &run);

    let counted: Vec<_> = agg
        .event_actions
        .iter()
        .map(|((_, ekey, item), count)| (ekey.label(), item.clone(), *count))
        .collect();
    assert!(counted.contains(&("Add_Card".to_string(), "Prize".to_string(), 1)));
    assert!(!counted.iter().any(|(_, item, _)| item == "Elsewhere"));
}

#[test]
fn card_event_ids_are_normalized_but_exhibit_ids_are_not() {
    let catalogs = catalogs_with_cards(&[]);
    let mut agg = Aggregator::new(&catalogs);

    let mut run = reimu_run(vec![station(StationType::Supply, 1, 1, 60)]);
    run.cards_log = vec![event(0, MutationOp::Add, "ShinningPotion")];
    run.exhibits_log = vec![event(0, MutationOp::Add, "ShinningPotion")];
    observe(&mut agg, &run);

    let items: Vec<_> = agg
        .event_actions
        .keys()
        .map(|(_, ekey, item)| (ekey.label(), item.clone()))
        .collect();
    assert!(items.contains(&("Add_Card".to_string(), "ShiningPotion".to_string())));
    assert!(items.contains(&("Add_Exhibit".to_string(), "ShinningPotion".to_string())));
}

// --- TERMINAL ADOPTION ---

#[test]
fn terminal_adoption_counts_runs_copies_and_upgrades() {
    let catalogs = catalogs_with_cards(&[]);
    let mut agg = Aggregator::new(&catalogs);

    let mut run = reimu_run(vec![station(StationType::Entry, 1, 0, 60)]);
    run.outcome.cards = vec![
        owned_card("A", false),
        owned_card("A", true),
        owned_card("B", false),
    ];
    run.outcome.exhibits = vec!["Orb".to_string(), "Orb".to_string()];
    observe(&mut agg, &run);

    let a = &agg.card_adoption[&("Reimu".to_string(), "A".to_string())];
    assert_eq!(a.runs_with_card, 1);
    assert_eq!(a.total_copies, 2);
    assert_eq!(a.upgraded_copies, 1);

    let b = &agg.card_adoption[&("Reimu".to_string(), "B".to_string())];
    assert_eq!(b.runs_with_card, 1);
    assert_eq!(b.total_copies, 1);

    // Duplicate exhibit entries still count one run.
    let orb = &agg.exhibit_adoption[&("Reimu".to_string(), "Orb".to_string())];
    assert_eq!(orb.runs_with_exhibit, 1);

    assert_eq!(agg.total_runs["Reimu"], 1);
}

#[test]
fn terminal_deck_aliases_merge_into_one_card() {
    let catalogs = catalogs_with_cards(&[]);
    let mut agg = Aggregator::new(&catalogs);

    let mut run = reimu_run(vec![station(StationType::Entry, 1, 0, 60)]);
    run.outcome.cards = vec![
        owned_card("ShinningPotion", false),
        owned_card("ShiningPotion", false),
    ];
    observe(&mut agg, &run);

    let rec = &agg.card_adoption[&("Reimu".to_string(), "ShiningPotion".to_string())];
    assert_eq!(rec.runs_with_card, 1);
    assert_eq!(rec.total_copies, 2);
    assert!(!agg
        .card_adoption
        .contains_key(&("Reimu".to_string(), "ShinningPotion".to_string())));
}

#[test]
fn player_type_tag_separates_characters() {
    let catalogs = catalogs_with_cards(&[]);
    let mut agg = Aggregator::new(&catalogs);

    let mut run = reimu_run(vec![station(StationType::Entry, 1, 0, 60)]);
    run.player_type = "TypeB".to_string();
    observe(&mut agg, &run);

    assert_eq!(agg.total_runs["ReimuTypeB"], 1);
    assert!(!agg.total_runs.contains_key("Reimu"));
}
