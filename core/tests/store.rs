//! SQLite persistence tests: player documents, sessions, event log.

use bioclash_core::{
    channel::Channel,
    config::{CoreConfig, LedgerConfig},
    coordinator::ProgressionCoordinator,
    event::CoreEvent,
    grid::GridStore,
    ledger::ChannelLedger,
    planner::PlacementTarget,
    rules::StructureType,
    store::{open_session, save_session, PlayerStore, SqliteStore},
    types::Timestamp,
};
use chrono::{NaiveDate, TimeZone, Utc};

fn store() -> SqliteStore {
    let store = SqliteStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

fn now() -> Timestamp {
    Utc.with_ymd_and_hms(2024, 2, 10, 7, 0, 0).unwrap()
}

#[test]
fn migrate_is_repeatable() {
    let store = store();
    store.migrate().expect("second migration must be a no-op");
}

#[test]
fn unknown_players_load_as_none() {
    let store = store();
    assert!(store.load_ledger("nobody").unwrap().is_none());
    assert!(store.load_grid("nobody").unwrap().is_none());
}

#[test]
fn ledger_round_trips() {
    let store = store();
    let config = LedgerConfig::default();
    let mut ledger = ChannelLedger::new(&config);
    let day = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
    ledger.log_set(Channel::Shoulders, 40.0, 10, 3, day, &config).unwrap();
    ledger.log_effort(Channel::Endurance, 45.0, day, &config).unwrap();

    store.save_ledger("p1", &ledger).unwrap();
    assert_eq!(store.load_ledger("p1").unwrap(), Some(ledger.clone()));

    // Saving again replaces the row.
    ledger.log_effort(Channel::Core, 30.0, day, &config).unwrap();
    store.save_ledger("p1", &ledger).unwrap();
    assert_eq!(store.load_ledger("p1").unwrap(), Some(ledger));
}

#[test]
fn grid_round_trips_with_a_rebuilt_index() {
    let store = store();
    let mut session = ProgressionCoordinator::fresh("p1".into(), CoreConfig::default_test());
    for t in [StructureType::TownHall, StructureType::Cannon, StructureType::Wall, StructureType::Wall] {
        session.place(t, PlacementTarget::Auto, now()).unwrap();
    }
    store.save_grid("p1", session.grid()).unwrap();

    let loaded: GridStore = store.load_grid("p1").unwrap().expect("saved grid");
    assert!(loaded.verify());
    assert_eq!(loaded.len(), 4);
    assert_eq!(loaded.occupied_cell_count(), session.grid().occupied_cell_count());
    let original: Vec<_> = session.grid().instances().cloned().collect();
    let restored: Vec<_> = loaded.instances().cloned().collect();
    assert_eq!(original, restored);
}

#[test]
fn sessions_resume_where_they_left_off() {
    let store = store();
    let config = CoreConfig::default_test();

    let mut first = open_session(&store, "p1", config.clone()).unwrap();
    assert!(first.grid().is_empty(), "new player starts empty");
    first.log_effort(Channel::Back, 800.0, now()).unwrap();
    let id = first.place(StructureType::Cannon, PlacementTarget::Auto, now()).unwrap().instance.id;
    save_session(&store, &first).unwrap();

    let resumed = open_session(&store, "p1", config).unwrap();
    assert_eq!(resumed.ledger(), first.ledger());
    assert_eq!(resumed.grid().get(&id), first.grid().get(&id));
    assert_eq!(store.player_ids().unwrap(), vec!["p1".to_string()]);
}

#[test]
fn events_are_appended_and_replayed_in_order() {
    let mut store = store();
    let mut session = ProgressionCoordinator::fresh("p1".into(), CoreConfig::default_test());
    session.log_effort(Channel::Chest, 100.0, now()).unwrap();
    session.place(StructureType::Wall, PlacementTarget::Auto, now()).unwrap();
    let events = session.drain_events();

    store.append_events("p1", &events).unwrap();
    store
        .append_event("p2", &CoreEvent::StructureDemolished { structure_id: "x".into() })
        .unwrap();

    let entries = store.events_for_player("p1").unwrap();
    assert_eq!(entries.len(), events.len());
    assert_eq!(entries[0].event_type, "day_rolled_over");
    assert!(entries.windows(2).all(|w| w[0].id < w[1].id), "ids must ascend");

    assert_eq!(store.replay_events("p1").unwrap(), events);
    assert_eq!(store.events_for_player("p2").unwrap().len(), 1);
}
