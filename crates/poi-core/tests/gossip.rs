mod support;

use poi_core::{AllyInfo, FactRef, Phase, PoiState, ProtocolConfig, RuinSighting};
use poi_protocol::{
    decode_unit, encode_symmetry_claim, pack, pack_single, unpack, AgentId, Cell, MapSize, Role,
    Side, Structure, Symmetry, SymmetrySet, TowerKind, WireUnit, RELAY_FLAG,
};
use support::FakeWorld;

const HUB: Cell = Cell::new(10, 10);

fn size() -> MapSize {
    MapSize::new(40, 40)
}

fn state() -> PoiState {
    PoiState::new(ProtocolConfig::default(), size(), Side::A).unwrap()
}

fn ruin(cell: Cell) -> RuinSighting {
    RuinSighting {
        cell,
        occupant: None,
    }
}

/// A paint tower at `HUB` that can see three neutral ruins in distinct blocks.
fn hub_world() -> FakeWorld {
    let mut world = FakeWorld::new(100, Role::Infrastructure, HUB, size());
    world.ruins = vec![
        RuinSighting {
            cell: HUB,
            occupant: Some((Side::A, TowerKind::Paint)),
        },
        ruin(Cell::new(7, 10)),
        ruin(Cell::new(10, 7)),
        ruin(Cell::new(7, 7)),
    ];
    world
}

fn mobile(id: u32, cell: Cell) -> AllyInfo {
    AllyInfo {
        id: AgentId(id),
        cell,
        role: Role::Mobile,
    }
}

fn relay_unit(x: u8, y: u8) -> u16 {
    WireUnit::Tower {
        cell: Cell::new(x, y),
        structure: Structure::Tower {
            side: Side::A,
            kind: TowerKind::Money,
        },
        relay: true,
    }
    .encode()
}

#[test]
fn relay_window_allows_one_broadcast_per_cooldown() {
    let mut world = hub_world();
    world.ruins.truncate(1);
    let mut state = state();

    // First tick: the hub learns its own slot; nothing to relay yet.
    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.ingest.relay_broadcasts, 0);
    assert!(world.broadcasts.is_empty());

    // Five relay-flagged facts arrive in one window.
    world.round = 2;
    for i in 0..5u8 {
        world.deliver(7, pack_single(relay_unit(12 + i * 5, 30)));
    }
    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.ingest.units_applied, 5);
    assert_eq!(report.ingest.relay_broadcasts, 1);
    assert_eq!(world.broadcasts.len(), 1);
    assert_eq!(state.store().fact_count(), 6);

    let (first, second) = unpack(world.broadcasts[0]);
    assert_eq!(first, own_announcement());
    assert_eq!(second, Some(relay_unit(12, 30)));

    // More news inside the cooldown: applied, not relayed.
    world.round = 50;
    for i in 0..5u8 {
        world.deliver(7, pack_single(relay_unit(12 + i * 5, 35)));
    }
    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.ingest.units_applied, 5);
    assert_eq!(report.ingest.relay_broadcasts, 0);
    assert_eq!(world.broadcasts.len(), 1);

    // Window reopens; the self-announcement alone is flushed at the end of ingest.
    world.round = 102;
    state.update_round(&mut world).unwrap();
    assert_eq!(world.broadcasts.len(), 2);
    assert_eq!(unpack(world.broadcasts[1]).1, None);
}

fn own_announcement() -> u16 {
    WireUnit::Tower {
        cell: HUB,
        structure: Structure::Tower {
            side: Side::A,
            kind: TowerKind::Paint,
        },
        relay: true,
    }
    .encode()
}

#[test]
fn single_unit_relay_window_sends_the_announcement_alone() {
    let mut world = hub_world();
    world.ruins.truncate(1);
    let config = ProtocolConfig {
        relay_buffer_units: 1,
        ..ProtocolConfig::default()
    };
    let mut state = PoiState::new(config, size(), Side::A).unwrap();
    state.update_round(&mut world).unwrap();

    world.round = 2;
    world.deliver(7, pack_single(relay_unit(30, 30)));
    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.ingest.units_applied, 1);
    assert_eq!(report.ingest.relay_broadcasts, 1);
    assert_eq!(report.ingest.relayed_units, 0);
    assert_eq!(world.broadcasts, vec![pack_single(own_announcement())]);
    assert_eq!(state.store().fact_count(), 2);
}

#[test]
fn single_unit_relay_window_without_announcement() {
    let mut world = hub_world();
    world.ruins.truncate(1);
    let config = ProtocolConfig {
        relay_buffer_units: 1,
        announce_self: false,
        ..ProtocolConfig::default()
    };
    let mut state = PoiState::new(config, size(), Side::A).unwrap();
    state.update_round(&mut world).unwrap();

    world.round = 2;
    world.deliver(7, pack_single(relay_unit(12, 30)));
    world.deliver(7, pack_single(relay_unit(17, 30)));
    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.ingest.units_applied, 2);
    assert_eq!(report.ingest.relayed_units, 1);
    assert_eq!(world.broadcasts, vec![pack_single(relay_unit(12, 30))]);
}

#[test]
fn known_facts_are_not_relayed_again() {
    let mut world = hub_world();
    world.ruins.truncate(1);
    let config = ProtocolConfig {
        announce_self: false,
        ..ProtocolConfig::default()
    };
    let mut state = PoiState::new(config, size(), Side::A).unwrap();
    state.update_round(&mut world).unwrap();

    // Already known through the hub's own sighting.
    world.round = 2;
    let own = WireUnit::Tower {
        cell: HUB,
        structure: Structure::Tower {
            side: Side::A,
            kind: TowerKind::Paint,
        },
        relay: true,
    };
    world.deliver(7, pack_single(own.encode()));
    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.ingest.relayed_units, 0);
    assert!(world.broadcasts.is_empty());

    // The window was not used up, so fresh news still goes out this round.
    world.round = 3;
    world.deliver(7, pack_single(relay_unit(30, 30)));
    state.update_round(&mut world).unwrap();
    assert_eq!(world.broadcasts, vec![pack_single(relay_unit(30, 30))]);
}

#[test]
fn mobile_agents_never_relay() {
    let mut world = FakeWorld::new(3, Role::Mobile, Cell::new(30, 30), size());
    let mut state = state();
    world.deliver(7, pack(relay_unit(5, 5), relay_unit(15, 5)));
    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.ingest.units_applied, 2);
    assert_eq!(report.ingest.relayed_units, 0);
    assert!(world.broadcasts.is_empty());
}

#[test]
fn symmetry_claims_invalidate_zero_bits() {
    let mut world = FakeWorld::new(3, Role::Mobile, Cell::new(30, 30), size());
    let mut state = state();
    let claim = encode_symmetry_claim(SymmetrySet::from_bits(0b001));
    world.deliver(8, pack_single(claim));
    state.update_round(&mut world).unwrap();

    let symmetry = state.store().symmetry();
    assert_eq!(symmetry.valid.resolved(), Some(Symmetry::Horizontal));
    assert!(!symmetry.critical);
    assert!(state.store().knows(FactRef::Symmetry, AgentId(8)));
}

#[test]
fn hub_pushes_unknown_facts_two_per_message() {
    let mut world = hub_world();
    world.allies = vec![mobile(1, Cell::new(11, 11)), mobile(2, Cell::new(30, 30))];
    let mut state = state();

    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.structures_seen, 4);
    // Four facts to the ally in range; the far one is skipped.
    assert_eq!(report.send.messages_sent, 2);
    assert_eq!(report.send.units_sent, 4);
    assert!(world.sent.iter().all(|(to, _)| *to == Cell::new(11, 11)));
    for slot in 0..4 {
        assert!(state.store().knows(FactRef::Tower(slot), AgentId(1)));
        assert!(!state.store().knows(FactRef::Tower(slot), AgentId(2)));
    }

    // Nothing new the next tick.
    world.round = 2;
    world.sent.clear();
    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.send.messages_sent, 0);
    assert!(world.sent.is_empty());
}

#[test]
fn hub_pushes_to_allied_towers_in_range() {
    let mut world = hub_world();
    world.allies = vec![AllyInfo {
        id: AgentId(60),
        cell: Cell::new(14, 10),
        role: Role::Infrastructure,
    }];
    let mut state = state();

    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.send.messages_sent, 2);
    assert_eq!(report.send.units_sent, 4);
    assert!(world.sent.iter().all(|(to, _)| *to == Cell::new(14, 10)));
    for slot in 0..4 {
        assert!(state.store().knows(FactRef::Tower(slot), AgentId(60)));
    }
}

#[test]
fn hub_does_not_tell_a_tower_about_itself() {
    let here = Cell::new(12, 12);
    let neighbour = Cell::new(15, 12);
    let mut world = FakeWorld::new(100, Role::Infrastructure, here, size());
    world.ruins = vec![
        RuinSighting {
            cell: here,
            occupant: Some((Side::A, TowerKind::Paint)),
        },
        RuinSighting {
            cell: neighbour,
            occupant: Some((Side::A, TowerKind::Money)),
        },
    ];
    world.allies = vec![AllyInfo {
        id: AgentId(61),
        cell: neighbour,
        role: Role::Infrastructure,
    }];
    let mut state = state();

    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.send.messages_sent, 1);
    assert_eq!(report.send.units_sent, 1);
    let (unit, second) = unpack(world.sent[0].1);
    assert_eq!(second, None);
    assert!(matches!(decode_unit(unit), WireUnit::Tower { cell, .. } if cell == here));
    assert!(!state.store().knows(FactRef::Tower(1), AgentId(61)));
}

#[test]
fn hub_respects_the_message_quota() {
    let mut world = hub_world();
    world.allies = (0..30).map(|i| mobile(i, Cell::new(11, 11))).collect();
    let mut state = state();

    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.send.messages_sent, 20);
    assert_eq!(world.sent.len(), 20);
    assert_eq!(report.truncated, None);
}

#[test]
fn hub_stops_at_the_budget_floor() {
    // Three metered calls happen before the first send.
    let mut world = hub_world().with_budget(3_800, 100);
    world.allies = (0..30).map(|i| mobile(i, Cell::new(11, 11))).collect();
    let mut state = state();

    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.send.messages_sent, 6);
    assert!(report.send.truncated);
    assert_eq!(report.truncated, Some(Phase::Disseminate));
}

#[test]
fn ingest_below_floor_reads_nothing() {
    let mut world =
        FakeWorld::new(3, Role::Mobile, Cell::new(30, 30), size()).with_budget(10_050, 100);
    world.deliver(8, pack_single(relay_unit(5, 5)));
    let mut state = state();

    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.ingest.messages_read, 0);
    assert_eq!(report.truncated, Some(Phase::Ingest));
    assert_eq!(state.store().fact_count(), 0);
}

#[test]
fn mobile_sends_one_message_to_the_nearest_hub() {
    let mut world = FakeWorld::new(3, Role::Mobile, Cell::new(12, 12), size());
    world.ruins = vec![ruin(Cell::new(14, 14)), ruin(Cell::new(9, 12))];
    world.allies = vec![
        AllyInfo {
            id: AgentId(50),
            cell: Cell::new(15, 15),
            role: Role::Infrastructure,
        },
        AllyInfo {
            id: AgentId(51),
            cell: Cell::new(12, 14),
            role: Role::Infrastructure,
        },
        mobile(4, Cell::new(12, 13)),
    ];
    let mut state = state();

    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.send.messages_sent, 1);
    assert_eq!(world.sent.len(), 1);
    assert_eq!(world.sent[0].0, Cell::new(12, 14));
    assert!(state.store().knows(FactRef::Tower(0), AgentId(51)));
    assert!(state.store().knows(FactRef::Tower(1), AgentId(51)));
    assert!(!state.store().fact(0).unwrap().critical);
}

#[test]
fn refused_sends_leave_recipients_untouched() {
    let mut world = FakeWorld::new(3, Role::Mobile, Cell::new(12, 12), size());
    world.ruins = vec![ruin(Cell::new(14, 14))];
    world.allies = vec![AllyInfo {
        id: AgentId(51),
        cell: Cell::new(12, 14),
        role: Role::Infrastructure,
    }];
    world.refuse_sends = true;
    let mut state = state();

    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.send.refused, 1);
    assert!(!state.store().knows(FactRef::Tower(0), AgentId(51)));
    assert!(state.store().fact(0).unwrap().critical);

    // Retried on the next tick once the channel accepts it.
    world.refuse_sends = false;
    world.round = 2;
    let report = state.update_round(&mut world).unwrap();
    assert_eq!(report.send.messages_sent, 1);
    assert!(state.store().knows(FactRef::Tower(0), AgentId(51)));
}

#[test]
fn relay_flag_is_stripped_from_direct_sends() {
    let mut world = hub_world();
    world.allies = vec![mobile(1, Cell::new(11, 11))];
    let mut state = state();
    state.update_round(&mut world).unwrap();
    for (_, message) in &world.sent {
        let (a, b) = unpack(*message);
        assert_eq!(a & RELAY_FLAG, 0);
        assert_eq!(b.unwrap_or(0) & RELAY_FLAG, 0);
    }
}
