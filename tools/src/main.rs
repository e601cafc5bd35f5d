//! bioclash-runner: headless driver for the progression core.
//!
//! Usage:
//!   bioclash-runner --seed 12345 --days 60 --db player.db --player p1
//!   bioclash-runner --player p1 --db player.db --ipc-mode
//!
//! In IPC mode the runner stands in for the transport: one JSON command per
//! stdin line, one JSON reply per stdout line.

use anyhow::Result;
use bioclash_core::{
    channel::Channel,
    command::Request,
    config::CoreConfig,
    coordinator::ProgressionCoordinator,
    scenario::Scenario,
    snapshot::AuthoritativeSnapshot,
    store::{open_session, save_session, SqliteStore},
};
use chrono::{TimeZone, Utc};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    Request { request: Request },
    Acknowledge { token: String, accepted: bool },
    Reconcile { snapshot: AuthoritativeSnapshot },
    CompleteDue,
    GetState,
    ChannelReport { channel: Channel },
    Save,
    Quit,
}

#[derive(serde::Serialize)]
struct UiState<'a> {
    player_id:      &'a str,
    streak_days:    u32,
    recovery_score: u8,
    currency:       bioclash_core::rules::Currency,
    attack_power:   f64,
    defense_power:  f64,
    workers_busy:   usize,
    workers_total:  usize,
    pending:        usize,
    structures:     Vec<&'a bioclash_core::grid::StructureInstance>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let days = parse_arg(&args, "--days", 30u32);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let player = str_arg(&args, "--player").unwrap_or("player-1");
    let config = match str_arg(&args, "--config") {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };

    if !ipc_mode {
        println!("BioClash: progression runner");
        println!("  seed:    {seed}");
        println!("  days:    {days}");
        println!("  db:      {db}");
        println!("  player:  {player}");
        println!();
    }

    let mut store = if db == ":memory:" { SqliteStore::in_memory()? } else { SqliteStore::open(db)? };
    store.migrate()?;
    let session = open_session(&store, player, config)?;
    log::info!("session for {player} opened from {db}");

    if ipc_mode {
        run_ipc_loop(&mut store, session)?;
    } else {
        run_simulation(&mut store, session, seed, days)?;
    }
    Ok(())
}

fn run_simulation(store: &mut SqliteStore, session: ProgressionCoordinator, seed: u64, days: u32) -> Result<()> {
    // Fixed start keeps a seed reproducible.
    let start = Utc
        .with_ymd_and_hms(2024, 1, 1, 8, 0, 0)
        .single()
        .ok_or_else(|| anyhow::anyhow!("invalid start time"))?;
    let mut scenario = Scenario::new(seed, session, start);

    let mut summaries = Vec::with_capacity(days as usize);
    for _ in 0..days {
        summaries.push(scenario.run_day()?);
        let events = scenario.session_mut().drain_events();
        let player_id = scenario.session().player_id().to_string();
        store.append_events(&player_id, &events)?;
    }
    save_session(&*store, scenario.session())?;
    log::info!("simulated {days} days for seed {seed}");

    let session = scenario.session();
    let requests: usize = summaries.iter().map(|s| s.requests).sum();
    let accepted: usize = summaries.iter().map(|s| s.accepted).sum();
    let currency = session.currency();

    println!("=== RUN SUMMARY ===");
    println!("  days run:       {days}");
    println!("  requests:       {requests} ({accepted} accepted)");
    println!("  streak:         {} days", session.ledger().streak_days());
    println!("  recovery:       {}", session.ledger().recovery_score());
    println!("  structures:     {}", session.grid().len());
    println!("  gold/elixir/gem {}/{}/{}", currency.primary, currency.secondary, currency.premium);
    println!("  attack/defense  {:.0}/{:.0}", session.attack_power(), session.defense_power());
    println!("  events logged:  {}", store.events_for_player(session.player_id())?.len());

    println!();
    println!("=== LAST 7 DAYS ===");
    for s in summaries.iter().rev().take(7).rev() {
        println!(
            "  day {:>3} | {:>2}/{:<2} accepted | streak {:>3} | recovery {:>3} | levels {}",
            s.day, s.accepted, s.requests, s.streak_days, s.recovery_score, s.total_levels
        );
    }
    Ok(())
}

fn run_ipc_loop(store: &mut SqliteStore, mut session: ProgressionCoordinator) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("unparseable IPC command: {e}");
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let now = Utc::now();
        let reply = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Request { request } => serde_json::to_value(session.handle(request, now))?,
            IpcCommand::Acknowledge { token, accepted } => match session.acknowledge(&token, accepted) {
                Ok(()) => ui_state(&session)?,
                Err(e) => error_reply(e.reason_code(), &e.to_string()),
            },
            IpcCommand::Reconcile { snapshot } => match session.reconcile(snapshot) {
                Ok(report) => serde_json::to_value(report)?,
                Err(e) => error_reply(e.reason_code(), &e.to_string()),
            },
            IpcCommand::CompleteDue => {
                session.complete_due(now)?;
                ui_state(&session)?
            }
            IpcCommand::GetState => ui_state(&session)?,
            IpcCommand::ChannelReport { channel } => serde_json::to_value(session.channel_report(channel, now))?,
            IpcCommand::Save => {
                save_session(&*store, &session)?;
                log::info!("saved {}", session.player_id());
                serde_json::json!({ "saved": true })
            }
        };
        let events = session.drain_events();
        store.append_events(session.player_id(), &events)?;
        writeln!(stdout, "{reply}")?;
        stdout.flush()?;
    }

    save_session(&*store, &session)?;
    log::info!("IPC loop closed, {} saved", session.player_id());
    Ok(())
}

fn ui_state(session: &ProgressionCoordinator) -> Result<serde_json::Value> {
    let state = UiState {
        player_id:      session.player_id(),
        streak_days:    session.ledger().streak_days(),
        recovery_score: session.ledger().recovery_score(),
        currency:       session.currency(),
        attack_power:   session.attack_power(),
        defense_power:  session.defense_power(),
        workers_busy:   session.busy_workers(),
        workers_total:  session.worker_capacity(),
        pending:        session.pending_tokens().count(),
        structures:     session.grid().instances().collect(),
    };
    Ok(serde_json::to_value(state)?)
}

fn error_reply(reason: &str, message: &str) -> serde_json::Value {
    serde_json::json!({ "error": message, "reason": reason })
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
