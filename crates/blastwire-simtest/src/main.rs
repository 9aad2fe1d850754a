//! Blastwire Headless Scenario Harness
//!
//! Builds small maps in-process and checks the detonation network end to
//! end. No game, no rendering.
//!
//! Usage:
//!   cargo run -p blastwire-simtest
//!   cargo run -p blastwire-simtest -- --verbose
//!   cargo run -p blastwire-simtest -- path/to/settings.json
//!
//! Logging follows `RUST_LOG` (default `info`).

use blastwire_core::prelude::*;
use blastwire_core::systems::SignalReport;
use hecs::Entity;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let verbose = std::env::args().any(|a| a == "--verbose");
    let settings_path = std::env::args().skip(1).find(|a| !a.starts_with("--"));
    println!("=== Blastwire Scenario Harness ===\n");

    let mut results = Vec::new();

    // 1. Settings
    let settings = match load_settings(settings_path.as_deref(), &mut results) {
        Some(s) => s,
        None => NetworkSettings::default(),
    };

    // 2. Wired flood fill
    results.extend(validate_wired(&settings, verbose));

    // 3. Wireless node graph
    results.extend(validate_wireless(&settings, verbose));

    // 4. Channel routing and delivery order
    results.extend(validate_channels(&settings, verbose));

    // 5. Scheduler, wicks and removal
    results.extend(validate_lifecycle(&settings, verbose));

    // 6. Save/load
    results.extend(validate_persistence(&settings, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn engine(settings: &NetworkSettings, size: i32) -> NetworkEngine {
    NetworkEngine::with_seed(size, size, settings.clone(), 0xB1A5)
}

fn wired_report(outcome: Result<FireOutcome, NetworkError>) -> Option<SignalReport> {
    match outcome {
        Ok(FireOutcome::Wired(report)) => Some(report),
        _ => None,
    }
}

fn scheduled_count(outcome: Result<FireOutcome, NetworkError>) -> Option<usize> {
    outcome.ok().map(|o| o.target_count())
}

// ── 1. Settings ─────────────────────────────────────────────────────────

fn load_settings(path: Option<&str>, results: &mut Vec<TestResult>) -> Option<NetworkSettings> {
    println!("--- Settings ---");

    let defaults = NetworkSettings::default();
    results.push(check(
        "settings_defaults_valid",
        defaults.clone().validated() == defaults,
        "defaults survive validation unchanged",
    ));

    let roundtrip = defaults
        .to_json_string()
        .ok()
        .and_then(|json| NetworkSettings::from_json_str(&json).ok());
    results.push(check(
        "settings_json_roundtrip",
        roundtrip.as_ref() == Some(&defaults),
        "defaults → JSON → defaults",
    ));

    let path = path?;
    let loaded = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|json| NetworkSettings::from_json_str(&json).map_err(|e| e.to_string()));
    match loaded {
        Ok(settings) => {
            log::info!("using settings from {}", path);
            results.push(check("settings_file", true, format!("loaded {}", path)));
            Some(settings)
        }
        Err(e) => {
            results.push(check(
                "settings_file",
                false,
                format!("{}: {}, falling back to defaults", path, e),
            ));
            None
        }
    }
}

// ── 2. Wired ────────────────────────────────────────────────────────────

fn lay_run(e: &mut NetworkEngine, z: i32, len: i32) -> Option<Entity> {
    let lever = e.place_detonator(Cell::new(0, z)).ok()?;
    for x in 0..len {
        e.place_wire(Cell::new(x, z)).ok()?;
    }
    Some(lever)
}

fn validate_wired(settings: &NetworkSettings, verbose: bool) -> Vec<TestResult> {
    println!("--- Wired Network ---");
    let mut results = Vec::new();

    // Four tiles with the sender on the first → 3 hops
    let mut e = engine(settings, 16);
    let lever = lay_run(&mut e, 0, 3);
    let charge = e.place_wired_charge(Cell::new(3, 0), 1).ok();
    let report = lever.and_then(|l| wired_report(e.fire(l)));
    let expected = (3.0 * settings.wired_delay_per_step).round() as u64;
    let delay = report
        .as_ref()
        .and_then(|r| r.arm_requests.first())
        .filter(|a| Some(a.receiver) == charge)
        .map(|a| a.delay);
    results.push(check(
        "wired_straight_run_delay",
        delay == Some(expected),
        format!("delay {:?}, expected {}", delay, expected),
    ));

    // Fully wired sheet, every tile has four neighbours in a cycle
    let mut e = engine(settings, 32);
    let lever = e.place_detonator(Cell::new(0, 0)).ok();
    for x in 0..32 {
        for z in 0..32 {
            let _ = e.place_wire(Cell::new(x, z));
        }
    }
    let _ = e.place_wired_charge(Cell::new(31, 31), 1);
    let report = lever.and_then(|l| wired_report(e.fire(l)));
    let (reached, armed) = report
        .as_ref()
        .map(|r| (r.conductors_reached, r.arm_requests.len()))
        .unwrap_or_default();
    if verbose {
        println!("  sheet flood reached {} conductors", reached);
    }
    results.push(check(
        "wired_cycles_terminate",
        reached == 32 * 32 + 1 && armed == 1,
        format!("{} conductors, {} armed", reached, armed),
    ));

    // Crossing: east-west and north-south runs stay apart
    let mut e = engine(settings, 16);
    for i in 0..5 {
        if i != 2 {
            let _ = e.place_wire(Cell::new(i, 2));
            let _ = e.place_wire(Cell::new(2, i));
        }
    }
    let _ = e.place_crossing(Cell::new(2, 2));
    let lever = e.place_detonator(Cell::new(0, 2)).ok();
    let east = e.place_wired_charge(Cell::new(5, 2), 1).ok();
    let _north = e.place_wired_charge(Cell::new(2, 5), 1);
    let armed: Vec<Entity> = lever
        .and_then(|l| wired_report(e.fire(l)))
        .map(|r| r.arm_requests.iter().map(|a| a.receiver).collect())
        .unwrap_or_default();
    results.push(check(
        "wired_crossing_independent",
        armed.len() == 1 && east == armed.first().copied(),
        format!("{} receivers armed from the east-west run", armed.len()),
    ));

    // Soaked wire always shorts out when the chance is 1
    let mut wet = settings.clone();
    wet.wet_failure_chance = 1.0;
    let mut e = engine(&wet, 16);
    let lever = lay_run(&mut e, 0, 2);
    let soaked = e.place_wire(Cell::new(2, 0)).ok();
    if let Some(s) = soaked {
        let _ = e.set_wetness(s, 1.0);
    }
    let _ = e.place_wired_charge(Cell::new(3, 0), 1);
    let report = lever.and_then(|l| wired_report(e.fire(l)));
    let shorted = report
        .map(|r| r.arm_requests.is_empty() && r.failed.len() == 1)
        .unwrap_or(false);
    let destroyed = soaked.map(|s| !e.world.contains(s)).unwrap_or(false);
    results.push(check(
        "wired_wet_failure",
        shorted && destroyed,
        format!("{} events raised", e.events().len()),
    ));

    results
}

// ── 3. Wireless ─────────────────────────────────────────────────────────

fn validate_wireless(settings: &NetworkSettings, verbose: bool) -> Vec<TestResult> {
    println!("--- Wireless Graph ---");
    let mut results = Vec::new();

    // Five relays, each reaching only its neighbours
    let mut e = engine(settings, 64);
    let nodes: Vec<Entity> = (0..5)
        .filter_map(|i| {
            e.place_node(Cell::new(i * 5, 0), WirelessNodeDef::relay(5.0))
                .ok()
        })
        .collect();
    let reached = e.get_reachable_nodes(nodes[0]).unwrap_or_default();
    results.push(check(
        "wireless_line_all_reachable",
        reached == nodes,
        format!("{}/5 nodes reached", reached.len()),
    ));

    let _ = e.set_powered(nodes[2], false);
    let reached = e.get_reachable_nodes(nodes[0]).unwrap_or_default();
    results.push(check(
        "wireless_power_cut",
        reached == nodes[..2],
        format!("{} nodes reached with node 2 unpowered", reached.len()),
    ));

    let links = e.get_all_links(nodes[0]).unwrap_or_default();
    let dead = links.iter().filter(|l| !l.can_traverse).count();
    if verbose {
        for link in &links {
            println!(
                "  link {:?} - {:?} traversable={}",
                link.a, link.b, link.can_traverse
            );
        }
    }
    results.push(check(
        "wireless_links_reported",
        links.len() == 4 && dead == 2,
        format!("{} links, {} not traversable", links.len(), dead),
    ));

    // Endpoint - relay - endpoint
    let mut e = engine(settings, 64);
    let a = e.place_portable(Cell::new(0, 0), 10.0, 1).ok();
    let b = e.place_node(Cell::new(5, 0), WirelessNodeDef::relay(10.0)).ok();
    let c = e.place_portable(Cell::new(10, 0), 10.0, 1).ok();
    let adjacent = a
        .and_then(|a| e.get_adjacent_nodes(a).ok())
        .unwrap_or_default();
    let reached = a
        .and_then(|a| e.get_reachable_nodes(a).ok())
        .unwrap_or_default();
    results.push(check(
        "wireless_endpoint_not_adjacent",
        b.is_some() && adjacent == b.into_iter().collect::<Vec<_>>(),
        "endpoint pair never links directly",
    ));
    results.push(check(
        "wireless_endpoint_reaches_through_relay",
        c.map(|c| reached.contains(&c)).unwrap_or(false),
        format!("{} nodes reached from endpoint", reached.len()),
    ));

    results
}

// ── 4. Channels ─────────────────────────────────────────────────────────

fn validate_channels(settings: &NetworkSettings, _verbose: bool) -> Vec<TestResult> {
    println!("--- Channels ---");
    let mut results = Vec::new();

    let mut e = engine(settings, 32);
    let table = e
        .place_table(Cell::new(0, 0), WirelessNodeDef::relay(10.0), 1)
        .ok();
    for (x, channel) in [(1, 1), (2, 1), (3, 2), (4, 3)] {
        let _ = e.place_charge(Cell::new(x, 0), channel.min(settings.channel_count));
    }
    let count = table.and_then(|t| scheduled_count(e.fire(t)));
    results.push(check(
        "channel_filtering",
        count == Some(2) && e.scheduler().len() == 2,
        format!("{:?} deliveries on channel 1", count),
    ));

    let step = settings.wireless_step_delay_ticks;
    let dues: Vec<u64> = e.scheduler().pending().map(|(id, _)| id.due).collect();
    results.push(check(
        "channel_sequenced_delivery",
        dues == vec![0, step],
        format!("due ticks {:?}", dues),
    ));

    let summary = table
        .and_then(|t| e.channel_summary(t).ok())
        .unwrap_or_default();
    results.push(check(
        "channel_summary",
        summary.first().map(String::as_str) == Some("Channel 1: remote charge x2"),
        summary.join(" | "),
    ));

    let mut e = engine(settings, 32);
    let table = e.place_table(Cell::new(0, 0), WirelessNodeDef::relay(10.0), 1);
    let count = table.ok().and_then(|t| scheduled_count(e.fire(t)));
    let messages: Vec<String> = e.events().iter().map(|ev| ev.message()).collect();
    results.push(check(
        "channel_no_targets_message",
        count == Some(0) && messages.len() == 1,
        messages.join(" | "),
    ));

    results
}

// ── 5. Lifecycle ────────────────────────────────────────────────────────

fn validate_lifecycle(settings: &NetworkSettings, _verbose: bool) -> Vec<TestResult> {
    println!("--- Scheduler & Wicks ---");
    let mut results = Vec::new();

    // Removing the sender cancels what it queued
    let mut e = engine(settings, 32);
    let table = e.place_table(Cell::new(0, 0), WirelessNodeDef::relay(10.0), 1);
    let switches: Vec<Entity> = (1..=3)
        .filter_map(|x| e.place_switch(Cell::new(x, 0), 1, false).ok())
        .collect();
    if let Ok(t) = table {
        let _ = e.fire(t);
        e.update();
        let _ = e.remove(t);
    }
    e.run_ticks(settings.wireless_step_delay_ticks * 4);
    let on: Vec<bool> = switches
        .iter()
        .map(|s| e.world.get::<&RemoteSwitch>(*s).map(|s| s.on).unwrap_or(false))
        .collect();
    results.push(check(
        "removed_sender_cancels",
        on == vec![true, false, false] && e.scheduler().is_empty(),
        format!("switch states {:?}", on),
    ));

    // Wick burns down and the charge goes off
    let mut e = engine(settings, 32);
    let table = e.place_table(Cell::new(0, 0), WirelessNodeDef::relay(10.0), 1);
    let charge = e.place_charge(Cell::new(2, 0), 1).ok();
    if let Ok(t) = table {
        let _ = e.fire(t);
    }
    e.run_ticks(settings.wick_ticks + 1);
    let detonated = e
        .drain_events()
        .iter()
        .any(|ev| matches!(ev, NetworkEvent::Detonated { charge: c, .. } if Some(*c) == charge));
    results.push(check(
        "wick_detonates",
        detonated && charge.map(|c| !e.world.contains(c)).unwrap_or(false),
        format!("detonated after {} ticks", e.tick()),
    ));

    results
}

// ── 6. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(settings: &NetworkSettings, verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let mut e = engine(settings, 32);
    let table = e.place_table(Cell::new(0, 0), WirelessNodeDef::relay(10.0), 1);
    for x in 1..=3 {
        let _ = e.place_switch(Cell::new(x, 0), 1, false);
    }
    if let Ok(t) = table {
        let _ = e.fire(t);
    }
    e.update();

    let mut buffer = Vec::new();
    let saved = e.save(&mut buffer);
    if verbose {
        println!("  save size: {} bytes", buffer.len());
    }
    let mut loaded = NetworkEngine::with_settings(1, 1, NetworkSettings::default());
    let restored = saved.is_ok() && loaded.load(&buffer[..]).is_ok();
    results.push(check(
        "save_load_roundtrip",
        restored
            && loaded.device_count() == e.device_count()
            && loaded.scheduler().len() == e.scheduler().len()
            && loaded.settings() == e.settings(),
        format!(
            "{} devices, {} pending deliveries",
            loaded.device_count(),
            loaded.scheduler().len()
        ),
    ));

    loaded.run_ticks(settings.wireless_step_delay_ticks * 3);
    let all_on = loaded
        .world
        .query::<&RemoteSwitch>()
        .iter()
        .all(|(_, s)| s.on);
    results.push(check(
        "save_load_resumes_deliveries",
        all_on,
        "queued deliveries run after load",
    ));

    results
}
