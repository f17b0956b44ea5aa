mod config;

use clap::{Parser, Subcommand};
use glam::Vec3;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use twinsim_common::BodyId;
use twinsim_input::KeyboardController;
use twinsim_kernel::BodyOptions;
use twinsim_net::NetworkClient;
use twinsim_router::{Mode, Router};
use twinsim_scheduler::FixedStepScheduler;
use twinsim_tools::SimulationInspector;

use crate::config::SimConfig;

#[derive(Parser)]
#[command(name = "twinsim-cli", about = "Headless host for the twinsim physics core")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and default configuration
    Info,
    /// Run a headless simulation on a simulated 60 Hz frame clock
    Run {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Stepping backend: light or native
        #[arg(short, long)]
        mode: Option<Mode>,
        /// Number of bodies to drop
        #[arg(short, long, default_value = "3")]
        bodies: usize,
        /// Simulated seconds to run
        #[arg(short, long, default_value = "5")]
        seconds: f64,
        /// Seconds of forward throttle on the lead body
        #[arg(long, default_value = "1")]
        throttle: f64,
        /// Authoritative server websocket URL (implies connecting)
        #[arg(long)]
        server: Option<String>,
        /// Authoritative server health URL
        #[arg(long)]
        health: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            let defaults = SimConfig::default();
            println!("twinsim-cli v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "router: mode={} gravity={} contact_radius={}",
                defaults.router.mode,
                defaults.router.integrator.gravity,
                defaults.router.integrator.contact_radius
            );
            println!(
                "native: substeps<={} substep_dt={:.4} init_timeout={}ms",
                defaults.router.native.max_substeps,
                defaults.router.native.substep_dt,
                defaults.router.native.init_timeout_ms
            );
            println!(
                "scheduler: fixed_dt={:.4} max_frame_delta={}",
                defaults.scheduler.fixed_dt, defaults.scheduler.max_frame_delta
            );
            println!(
                "network: url={} health={}",
                defaults.network.url, defaults.network.health_url
            );
        }
        Commands::Run {
            config,
            mode,
            bodies,
            seconds,
            throttle,
            server,
            health,
        } => {
            let mut sim = match config {
                Some(path) => SimConfig::load(&path)?,
                None => SimConfig::default(),
            };
            if let Some(mode) = mode {
                sim.router.mode = mode;
            }
            if let Some(url) = server {
                sim.network.url = url;
                sim.connect = true;
            }
            if let Some(url) = health {
                sim.network.health_url = url;
            }
            run(sim, bodies, seconds, throttle).await?;
        }
    }

    Ok(())
}

async fn run(sim: SimConfig, bodies: usize, seconds: f64, throttle: f64) -> anyhow::Result<()> {
    let mut router = Router::new(sim.router);
    let mut scheduler = FixedStepScheduler::new(sim.scheduler)?;

    for i in 0..bodies {
        let position = Vec3::new(i as f32 * 3.0, 0.0, 5.0 + i as f32);
        router.register_body(format!("body-{i}"), position, BodyOptions::default())?;
    }
    let lead = BodyId::from("body-0");
    let controller = KeyboardController::new(lead.clone(), sim.controller);

    if sim.router.mode == Mode::Native {
        let status = router.wait_native().resolved().await;
        router.poll_native();
        tracing::info!(%status, mode = %router.mode(), "native initialization settled");
    }

    let mut client = NetworkClient::new(sim.network.clone());
    if sim.connect {
        client.connect();
    }

    let frame = Duration::from_secs_f64(1.0 / 60.0);
    let frames = (seconds * 60.0).round() as u64;
    let throttle_frames = (throttle * 60.0).round() as u64;
    let mut positions: BTreeMap<BodyId, Vec3> = BTreeMap::new();

    for n in 0..frames {
        if n < throttle_frames {
            if let Some(event) = controller.press("w", &mut router) {
                client.send_input(event);
            }
        }
        let snapshot = client.drain_snapshots();
        if !snapshot.is_empty() {
            router.apply_snapshot(&snapshot);
        }
        scheduler.advance(frame, &mut router, &mut positions);
        // Let the link and native init tasks make progress between frames.
        tokio::task::yield_now().await;
    }
    client.close();

    println!("{}", SimulationInspector::summary(&router));
    if let Some(diag) = scheduler.diagnostics() {
        println!("{diag}");
    }
    for id in SimulationInspector::list_bodies(&router) {
        if let Some(info) = SimulationInspector::inspect_body(&router, &id) {
            println!("{info}");
        }
    }
    if scheduler.faults() > 0 {
        tracing::warn!(faults = scheduler.faults(), "bodies were skipped during the run");
    }
    Ok(())
}
