//! # Citadel Server
//!
//! Hosts the command tick. Transports attach through
//! [`CommandServer::commands`] and read [`CommandServer::outbound`].
//!
//! ## Usage
//!
//! ```bash
//! citadel_server --config citadel.toml --tick-rate 20 --duration 60
//! ```
//!
//! Log level comes from `RUST_LOG` (default `info`).

use std::process::ExitCode;
use std::time::{Duration, Instant};

use citadel_networking::server::{CommandServer, Outbound, TickLoop};
use citadel_networking::CitadelConfig;

struct Args {
    config: Option<String>,
    tick_rate: Option<u32>,
    duration_secs: Option<u64>,
}

fn parse_args() -> Option<Args> {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = Args {
        config: None,
        tick_rate: None,
        duration_secs: None,
    };

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--config" | "-c" => {
                parsed.config = value.cloned();
                i += 1;
            }
            "--tick-rate" | "-t" => {
                parsed.tick_rate = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "--duration" | "-d" => {
                parsed.duration_secs = value.and_then(|v| v.parse().ok());
                i += 1;
            }
            "--help" | "-h" => {
                println!("Usage: citadel_server [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>        TOML config (default: built-in defaults)");
                println!("  -t, --tick-rate <RATE>     Tick rate in Hz (overrides config)");
                println!("  -d, --duration <SECS>      Run for N seconds then exit");
                println!("  -h, --help                 Show this help");
                return None;
            }
            other => tracing::warn!("Ignoring unknown argument {}", other),
        }
        i += 1;
    }
    Some(parsed)
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn main() -> ExitCode {
    init_tracing();
    let Some(args) = parse_args() else {
        return ExitCode::SUCCESS;
    };

    let mut config = match &args.config {
        Some(path) => match CitadelConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => CitadelConfig::default(),
    };
    if let Some(rate) = args.tick_rate {
        config.server.tick_rate = rate;
    }

    let mut server = match CommandServer::from_config(&config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let inbox = server.commands();
    let outbound = server.outbound();
    let mut tick_loop = TickLoop::new(config.server.tick_rate);

    tracing::info!(
        "Citadel server up: {} Hz, queue {} ({} /s/client, {} /tick/client)",
        config.server.tick_rate,
        config.queue.max_queue_size,
        config.queue.max_packets_per_second,
        config.queue.max_commands_per_tick_per_client
    );

    let start = Instant::now();
    let stats_interval = u64::from(config.server.tick_rate.max(1)) * 5;
    let mut last_stats_tick = 0u64;

    loop {
        if let Some(limit) = args.duration_secs {
            if start.elapsed() >= Duration::from_secs(limit) {
                break;
            }
        }

        tick_loop.wait_for_next_tick();
        while tick_loop.should_tick() {
            let tick_start = tick_loop.begin_tick();
            let report = server.tick();
            tick_loop.end_tick(tick_start);

            if report.failed > 0 {
                tracing::debug!("Tick {}: {} of {} commands failed", server.current_tick(), report.failed, report.commands);
            }

            // No transport is attached here; drain so the channel never fills.
            for message in outbound.try_iter() {
                if let Outbound::Update(update) = message {
                    tracing::debug!(
                        "Update for {}: {} containers",
                        update.character_id,
                        update.outcome.updated.len()
                    );
                }
            }

            let current = tick_loop.tick_count();
            if current - last_stats_tick >= stats_interval {
                last_stats_tick = current;
                let stats = tick_loop.stats();
                let queue = inbox.stats();
                tracing::info!(
                    "Tick {}: avg {} us, late {}, received {}, dropped {}, processed {}",
                    current,
                    stats.avg_tick_us,
                    stats.late_ticks,
                    queue.received,
                    queue.dropped,
                    queue.processed
                );
            }
        }
    }

    let stats = tick_loop.stats();
    tracing::info!(
        "Shutdown after {} ticks (avg {} us, min {} us, max {} us, late {})",
        stats.total_ticks,
        stats.avg_tick_us,
        stats.min_tick_us,
        stats.max_tick_us,
        stats.late_ticks
    );
    ExitCode::SUCCESS
}
