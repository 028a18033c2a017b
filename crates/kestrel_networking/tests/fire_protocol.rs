//! # Optimistic Fire Protocol
//!
//! The controlling client launches immediately; the server confirms against
//! its own rocket count or sends a rollback. These tests run the real
//! message flow between a server, the firing client and an observer.
//!
//! Run with: cargo test --test fire_protocol -- --nocapture

use kestrel_networking::{
    AmmoHolder, ArenaWorld, Damageable, FireRejection, LoopbackNetwork, NetworkConditions, Peer,
    PeerError, PeerId, PickupKind, Session, SlotIndex,
};
use kestrel_shared::{CosmeticEvent, EntityId, GameConfig, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DT: f32 = 1.0 / 60.0;
const CRAFT: EntityId = EntityId(1);

/// Server, firing client and observer, each with its own configuration.
struct Rig {
    network: LoopbackNetwork,
    server: Peer,
    owner: Peer,
    observer: Peer,
}

impl Rig {
    fn new(server_config: GameConfig, client_config: GameConfig, conditions: NetworkConditions) -> Self {
        let network = LoopbackNetwork::new(conditions, 17);
        let mut server = Peer::new(network.connect(), ArenaWorld::default(), server_config);
        let mut owner = Peer::new(network.connect(), ArenaWorld::default(), client_config);
        let mut observer = Peer::new(network.connect(), ArenaWorld::default(), client_config);
        let owner_id = owner.id();
        for peer in [&mut server, &mut owner, &mut observer] {
            peer.spawn_craft(CRAFT, owner_id, Vec3::ZERO, 0.0);
        }
        Self {
            network,
            server,
            owner,
            observer,
        }
    }

    fn run(&mut self, seconds: f32) {
        for _ in 0..(seconds / DT).round() as u32 {
            self.network.advance(DT);
            self.server.step(DT);
            self.owner.step(DT);
            self.observer.step(DT);
        }
    }
}

fn config(starting_ammo: u32, cooldown: f32) -> GameConfig {
    let mut config = GameConfig::default();
    config.projectile.starting_ammo = starting_ammo;
    config.movement.fire_cooldown = cooldown;
    config
}

fn launches(events: &[CosmeticEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, CosmeticEvent::RocketLaunched { .. }))
        .count()
}

// ============================================================================
// AUTHORITY
// ============================================================================

#[test]
fn test_one_rocket_two_requests_one_confirmed() {
    let mut rig = Rig::new(config(1, 0.0), config(2, 0.0), NetworkConditions::PERFECT);

    assert_eq!(rig.owner.fire_rocket(CRAFT), Ok(SlotIndex(0)));
    assert_eq!(rig.owner.fire_rocket(CRAFT), Ok(SlotIndex(1)));
    rig.run(0.1);

    let server = rig.server.craft(CRAFT).expect("server replica");
    assert_eq!(server.authority().confirmed(), 1);
    assert_eq!(server.authority().rejected(), 1);
    assert_eq!(server.server_ammo(), 0);
    assert_eq!(server.pool().in_flight(), 1);

    let owner = rig.owner.craft(CRAFT).expect("owner replica");
    assert_eq!(owner.shooter().rollbacks(), 1);
    assert!(!owner.pool().is_free(SlotIndex(0)));
    assert!(owner.pool().is_free(SlotIndex(1)));

    let observer = rig.observer.craft(CRAFT).expect("observer replica");
    assert_eq!(observer.pool().in_flight(), 1);
    assert!(!observer.pool().is_free(SlotIndex(0)));
    assert_eq!(launches(&rig.observer.drain_events()), 1);
}

#[test]
fn test_rejected_fire_never_launches_anywhere() {
    let mut rig = Rig::new(config(0, 0.0), config(1, 0.0), NetworkConditions::GOOD);

    assert_eq!(rig.owner.fire_rocket(CRAFT), Ok(SlotIndex(0)));
    assert_eq!(rig.owner.craft(CRAFT).map(|c| c.pool().in_flight()), Some(1));
    assert_eq!(rig.owner.craft(CRAFT).map(AmmoHolder::predicted_ammo), Some(0));

    let mut server_launched = 0;
    for _ in 0..30 {
        rig.run(DT);
        server_launched += launches(&rig.server.drain_events());
    }

    let owner = rig.owner.craft(CRAFT).expect("owner replica");
    assert!(owner.pool().is_free(SlotIndex(0)));
    assert_eq!(owner.shooter().rollbacks(), 1);
    assert_eq!(owner.predicted_ammo(), 1);

    let server = rig.server.craft(CRAFT).expect("server replica");
    assert_eq!(server.authority().confirmed(), 0);
    assert_eq!(server.pool().in_flight(), 0);
    assert_eq!(server_launched, 0);

    assert_eq!(launches(&rig.observer.drain_events()), 0);
    assert_eq!(rig.observer.craft(CRAFT).map(|c| c.pool().in_flight()), Some(0));
}

#[test]
fn test_unlimited_mode_confirms_without_stock() {
    let mut unlimited = config(0, 0.0);
    unlimited.projectile.unlimited = true;
    let mut rig = Rig::new(unlimited, unlimited, NetworkConditions::PERFECT);

    assert!(rig.owner.fire_rocket(CRAFT).is_ok());
    rig.run(0.1);

    let server = rig.server.craft(CRAFT).expect("server replica");
    assert_eq!(server.authority().confirmed(), 1);
    assert_eq!(rig.observer.craft(CRAFT).map(|c| c.pool().in_flight()), Some(1));
}

#[test]
fn test_cooldown_refuses_locally() {
    let mut rig = Rig::new(config(5, 0.45), config(5, 0.45), NetworkConditions::PERFECT);

    assert!(rig.owner.fire_rocket(CRAFT).is_ok());
    assert_eq!(
        rig.owner.fire_rocket(CRAFT),
        Err(PeerError::Fire(FireRejection::CoolingDown))
    );
    rig.run(0.5);
    assert!(rig.owner.fire_rocket(CRAFT).is_ok());
}

#[test]
fn test_observer_cannot_fire() {
    let mut rig = Rig::new(config(5, 0.0), config(5, 0.0), NetworkConditions::PERFECT);
    assert_eq!(
        rig.observer.fire_rocket(CRAFT),
        Err(PeerError::Fire(FireRejection::NotControlled))
    );
}

#[test]
fn test_late_rollback_spares_newer_rocket() {
    let slow = NetworkConditions {
        min_latency_ms: 1500,
        max_latency_ms: 1500,
        packet_loss_percent: 0,
        duplicate_percent: 0,
    };
    let mut rig = Rig::new(config(0, 0.0), config(2, 0.0), slow);

    assert_eq!(rig.owner.fire_rocket(CRAFT), Ok(SlotIndex(0)));
    // The rocket burns out long before the server's answer comes back.
    rig.run(2.2);
    assert!(rig.owner.craft(CRAFT).is_some_and(|c| c.pool().is_free(SlotIndex(0))));

    assert_eq!(rig.owner.fire_rocket(CRAFT), Ok(SlotIndex(1)));
    rig.run(1.0);

    let owner = rig.owner.craft(CRAFT).expect("owner replica");
    assert_eq!(owner.shooter().rollbacks(), 1);
    assert!(!owner.pool().is_free(SlotIndex(1)));
    assert!(owner.shooter().is_awaiting(SlotIndex(1)));
    assert!(!owner.shooter().is_awaiting(SlotIndex(0)));
    assert_eq!(owner.predicted_ammo(), 1);

    rig.run(3.0);
    let owner = rig.owner.craft(CRAFT).expect("owner replica");
    assert_eq!(owner.shooter().rollbacks(), 2);
    assert_eq!(owner.predicted_ammo(), 2);
}

// ============================================================================
// CONSERVATION
// ============================================================================

#[test]
fn test_confirmed_never_exceeds_granted() {
    let mut rig = Rig::new(config(3, 0.2), config(3, 0.2), NetworkConditions::POOR);
    for peer in [&mut rig.server, &mut rig.owner, &mut rig.observer] {
        peer.add_pickup(PickupKind::Rockets, Vec3::ZERO);
    }

    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..(20.0 / DT) as u32 {
        if rng.gen_bool(0.1) {
            let _ = rig.owner.fire_rocket(CRAFT);
        }
        rig.run(DT);

        let server = rig.server.craft(CRAFT).expect("server replica");
        assert!(server.authority().confirmed() <= server.ledger().granted_total());
    }
    rig.run(3.0);

    let server = rig.server.craft(CRAFT).expect("server replica");
    let owner = rig.owner.craft(CRAFT).expect("owner replica");
    assert!(server.authority().confirmed() > 0);
    assert!(server.ledger().granted_total() > 3);
    assert_eq!(owner.predicted_ammo(), server.server_ammo());
}

#[test]
fn test_rocket_pickup_reaches_controlling_peer() {
    let mut rig = Rig::new(config(0, 0.0), config(0, 0.0), NetworkConditions::GOOD);
    for peer in [&mut rig.server, &mut rig.owner, &mut rig.observer] {
        peer.add_pickup(PickupKind::Rockets, Vec3::ZERO);
    }
    assert_eq!(
        rig.owner.fire_rocket(CRAFT),
        Err(PeerError::Fire(FireRejection::OutOfAmmo))
    );

    rig.run(0.5);

    let granted = rig.server.config().pickup.rocket_amount;
    assert_eq!(rig.server.craft(CRAFT).map(AmmoHolder::server_ammo), Some(granted));
    assert_eq!(rig.owner.craft(CRAFT).map(AmmoHolder::predicted_ammo), Some(granted));
    assert!(rig.owner.fire_rocket(CRAFT).is_ok());
}

// ============================================================================
// LISTEN SERVER
// ============================================================================

#[test]
fn test_listen_server_fires_through_authority() {
    let mut session = Session::new(config(1, 0.0), NetworkConditions::PERFECT, 3, 1);
    let craft = session.spawn_craft(PeerId(0), Vec3::ZERO, 0.0);

    let server = session.peer_mut(PeerId(0)).expect("server");
    assert_eq!(server.fire_rocket(craft), Ok(SlotIndex(0)));
    assert_eq!(server.craft(craft).map(|c| c.pool().in_flight()), Some(1));
    assert_eq!(server.craft(craft).map(|c| c.authority().confirmed()), Some(1));
    assert_eq!(
        server.fire_rocket(craft),
        Err(PeerError::Fire(FireRejection::OutOfAmmo))
    );

    session.run_for(0.1, DT);
    let client = session.peer(PeerId(1)).expect("client");
    assert_eq!(client.craft(craft).map(|c| c.pool().in_flight()), Some(1));
}

// ============================================================================
// DAMAGE
// ============================================================================

#[test]
fn test_hit_is_applied_by_server_and_replicated() {
    let mut session = Session::new(config(1, 0.0), NetworkConditions::GOOD, 8, 2);
    let shooter = session.spawn_craft(PeerId(1), Vec3::ZERO, 0.0);
    let target = session.spawn_craft(PeerId(2), Vec3::new(600.0, 0.0, 0.0), 180.0);

    session
        .peer_mut(PeerId(1))
        .expect("shooter peer")
        .fire_rocket(shooter)
        .expect("one rocket in stock");
    session.run_for(1.5, DT);

    let config = *session.server().config();
    let expected = config.movement.max_health - config.projectile.damage;
    for peer in session.peers() {
        let health = peer.craft(target).map(|c| c.health().current());
        assert_eq!(health, Some(expected), "on {}", peer.id());
    }

    let events = session
        .peer(PeerId(2))
        .expect("target peer")
        .drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        CosmeticEvent::HealthChanged { entity, .. } if *entity == target
    )));
}
