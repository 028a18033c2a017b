//! # Duel Simulation
//!
//! Two clients fly toward each other and trade rockets through a server,
//! over a simulated network. Prints what every peer ended up believing.
//!
//! Usage: `duel_simulation [perfect|good|average|poor|hostile] [config.toml]`

use kestrel_networking::{
    CraftInput, DebugObservable, Movable, NetworkConditions, PeerId, PickupKind,
    Session,
};
use kestrel_shared::{EntityId, GameConfig, Vec3};

/// Time step per tick (60 Hz).
const DT: f32 = 1.0 / 60.0;
/// Simulated duration in seconds.
const DURATION: f32 = 12.0;
/// Seconds between trigger pulls.
const FIRE_INTERVAL: f32 = 0.75;
/// Network seed.
const SEED: u64 = 0x4b45_5354;

fn conditions_from_name(name: &str) -> Option<NetworkConditions> {
    match name {
        "perfect" => Some(NetworkConditions::PERFECT),
        "good" => Some(NetworkConditions::GOOD),
        "average" => Some(NetworkConditions::AVERAGE),
        "poor" => Some(NetworkConditions::POOR),
        "hostile" => Some(NetworkConditions::HOSTILE),
        _ => None,
    }
}

fn main() {
    let mut args = std::env::args().skip(1);
    let preset = args.next().unwrap_or_else(|| "average".to_owned());
    let Some(conditions) = conditions_from_name(&preset) else {
        eprintln!("unknown network preset '{preset}'");
        std::process::exit(2);
    };
    let config = match args.next() {
        Some(path) => match GameConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load {path}: {e}");
                std::process::exit(2);
            }
        },
        None => GameConfig::default(),
    };

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                 KESTREL - DUEL SIMULATION                        ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Network:       {preset}");
    println!(
        "  Latency:       {}-{}ms one-way",
        conditions.min_latency_ms, conditions.max_latency_ms
    );
    println!("  Packet Loss:   {}%", conditions.packet_loss_percent);
    println!("  Duplication:   {}%", conditions.duplicate_percent);
    println!("  Duration:      {DURATION}s");
    println!();

    let mut session = Session::new(config, conditions, SEED, 2);
    let red = session.spawn_craft(PeerId(1), Vec3::new(-1500.0, -200.0, 0.0), 0.0);
    let blue = session.spawn_craft(PeerId(2), Vec3::new(1500.0, 200.0, 0.0), 180.0);
    session.add_pickup(PickupKind::Rockets, Vec3::new(-1500.0, -200.0, 0.0));
    session.add_pickup(PickupKind::Rockets, Vec3::new(1500.0, 200.0, 0.0));

    let pilots = [(PeerId(1), red, 0.2_f32), (PeerId(2), blue, -0.1_f32)];
    let mut fired = 0_u32;
    let mut refused = 0_u32;
    let mut next_fire = FIRE_INTERVAL;

    let steps = (DURATION / DT).round() as u32;
    for step in 0..steps {
        let t = step as f32 * DT;
        for &(peer, craft, turn) in &pilots {
            let Some(peer) = session.peer_mut(peer) else {
                continue;
            };
            let forward = if t < DURATION * 0.6 { 1.0 } else { -0.2 };
            let _ = peer.set_input(craft, CraftInput::new(forward, turn, false));
            if t >= next_fire {
                match peer.fire_rocket(craft) {
                    Ok(_) => fired += 1,
                    Err(_) => refused += 1,
                }
            }
        }
        if t >= next_fire {
            next_fire += FIRE_INTERVAL;
        }
        session.step(DT);
    }
    session.run_for(1.0, DT);

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                    FINAL RESULTS                                 ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Rockets fired:     {fired}");
    println!("  Triggers refused:  {refused}");
    println!("  Datagrams dropped: {}", session.network().dropped());
    println!("  Duplicated:        {}", session.network().duplicated());
    println!();

    for peer in session.peers() {
        let title = if peer.is_server() { "server" } else { "client" };
        println!("┌─ {} ({title}) ──────────────────────────────────────────", peer.id());
        for craft in peer.crafts() {
            let stats = craft.debug_stats(peer.transport());
            println!(
                "│ {:10} {:?}: at ({:8.1}, {:8.1}) yaw {:3} hp {:4.1} ammo {}/{} rockets {} corrections {}",
                stats.entity.to_string(),
                stats.role,
                stats.location.x,
                stats.location.y,
                stats.yaw_byte,
                stats.health,
                stats.predicted_ammo,
                stats.server_ammo,
                stats.rockets_in_flight,
                stats.corrections,
            );
        }
        println!("└──────────────────────────────────────────────────────────────────");
    }
    println!();

    let spread = position_spread(&session, red).max(position_spread(&session, blue));
    println!("  Largest disagreement between replicas: {spread:.2} units");
}

/// Largest distance between any replica of `craft` and the server's.
fn position_spread(session: &Session, craft: EntityId) -> f32 {
    let Some(truth) = session.server().craft(craft).map(Movable::location) else {
        return 0.0;
    };
    session
        .peers()
        .iter()
        .filter_map(|p| p.craft(craft))
        .map(|c| c.location().distance(truth))
        .fold(0.0, f32::max)
}

