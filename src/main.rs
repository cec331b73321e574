//! Dimple CLI.
//!
//! Run one simulation process over UDP, or a whole local mesh in one OS
//! process.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dimple::{LocalHub, PassiveEngine, PeerConfig, Process, ProcessConfig, Role, Simulation, Transport, UdpTransport};

#[derive(Parser)]
#[command(name = "dimple")]
#[command(about = "Message-synchronized simulation processes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Stop after this many seconds instead of at end of stdin
    #[arg(long, global = true)]
    duration_secs: Option<u64>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one process.
    Node {
        /// JSON configuration file; flags below override it
        #[arg(long, env = "DIMPLE_CONFIG")]
        config: Option<PathBuf>,
        /// Role: physics, haptics, visual, interface
        #[arg(long)]
        role: Option<Role>,
        /// Local UDP address, e.g. 127.0.0.1:7771
        #[arg(long)]
        listen: Option<String>,
        /// Peer as ROLE=ADDR or ROLE=ADDR@TICK_MS, repeatable
        #[arg(long = "peer", value_parser = parse_peer)]
        peers: Vec<PeerConfig>,
        /// Tick length in milliseconds
        #[arg(long)]
        tick_ms: Option<f64>,
    },

    /// Run physics, haptics, visual and interface on consecutive ports.
    Local {
        /// Port of the physics process; the others follow
        #[arg(long, default_value = "7771")]
        base_port: u16,
        /// Host to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// External observer registered on every process
        #[arg(long)]
        client: Option<String>,
        /// Connect the processes through in-memory queues instead of UDP
        #[arg(long)]
        in_process: bool,
    },
}

fn parse_peer(s: &str) -> Result<PeerConfig, String> {
    let (role, rest) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ROLE=ADDR, got '{s}'"))?;
    let role: Role = role.parse().map_err(|e| format!("{e}"))?;
    let (address, tick_ms) = match rest.split_once('@') {
        Some((address, tick)) => {
            let tick: f64 = tick.parse().map_err(|_| format!("invalid tick '{tick}'"))?;
            (address, Some(tick))
        }
        None => (rest, None),
    };
    let mut peer = PeerConfig::new(role, address);
    peer.tick_ms = tick_ms;
    Ok(peer)
}

fn node_config(
    config: Option<PathBuf>,
    role: Option<Role>,
    listen: Option<String>,
    peers: Vec<PeerConfig>,
    tick_ms: Option<f64>,
) -> Result<ProcessConfig> {
    let mut cfg = match (config, role, listen.clone()) {
        (Some(path), _, _) => ProcessConfig::load(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        (None, Some(role), Some(listen)) => ProcessConfig::new(role, listen),
        (None, _, _) => bail!("either --config or both --role and --listen are required"),
    };
    if let Some(role) = role {
        cfg.role = role;
    }
    if let Some(listen) = listen {
        cfg.address = listen.into();
    }
    if tick_ms.is_some() {
        cfg.tick_ms = tick_ms;
    }
    cfg.peers.extend(peers);
    cfg.validate()?;
    Ok(cfg)
}

fn local_configs(base_port: u16, host: &str, client: Option<&str>) -> Vec<ProcessConfig> {
    let addresses: Vec<(Role, String)> = Role::SIMULATIONS
        .iter()
        .zip(base_port..)
        .map(|(role, port)| (*role, format!("{host}:{port}")))
        .collect();

    addresses
        .iter()
        .map(|(role, address)| {
            let mut cfg = ProcessConfig::new(*role, address.as_str());
            for (peer_role, peer_address) in addresses.iter().filter(|(r, _)| r != role) {
                cfg = cfg.with_peer(*peer_role, peer_address.as_str());
            }
            if let Some(client) = client {
                cfg = cfg.with_peer(Role::Client, client);
            }
            cfg
        })
        .collect()
}

/// Block until the deadline passes or stdin closes, ticking degraded
/// processes meanwhile.
fn wait<T: Transport>(duration: Option<Duration>, processes: &mut [Process<PassiveEngine, T>]) {
    let stdin_closed = Arc::new(AtomicBool::new(false));
    if duration.is_none() {
        let flag = Arc::clone(&stdin_closed);
        let reader = thread::Builder::new()
            .name("dimple-stdin".to_string())
            .spawn(move || {
                let stdin = io::stdin();
                for line in stdin.lock().lines() {
                    if line.is_err() {
                        break;
                    }
                }
                flag.store(true, Ordering::Relaxed);
            });
        if let Err(e) = reader {
            warn!(error = %e, "cannot watch stdin, stopping now");
            return;
        }
        info!("running until stdin closes");
    }

    let start = Instant::now();
    loop {
        if stdin_closed.load(Ordering::Relaxed) {
            break;
        }
        if duration.is_some_and(|d| start.elapsed() >= d) {
            break;
        }
        let mut ticked = false;
        for process in processes.iter_mut() {
            ticked |= process.tick_once();
        }
        if !ticked {
            thread::sleep(Duration::from_millis(10));
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let duration = cli.duration_secs.map(Duration::from_secs);
    match cli.command {
        Commands::Node {
            config,
            role,
            listen,
            peers,
            tick_ms,
        } => {
            let config = node_config(config, role, listen, peers, tick_ms)?;
            run_udp(vec![config], duration)
        }
        Commands::Local {
            base_port,
            host,
            client,
            in_process,
        } => {
            let configs = local_configs(base_port, &host, client.as_deref());
            if in_process {
                run_in_process(configs, duration)
            } else {
                run_udp(configs, duration)
            }
        }
    }
}

fn run_udp(configs: Vec<ProcessConfig>, duration: Option<Duration>) -> Result<()> {
    let mut processes = Vec::with_capacity(configs.len());
    for config in configs {
        let transport = UdpTransport::bind(config.address.host_port())
            .with_context(|| format!("binding {}", config.address))?;
        let sim = Simulation::new(config, PassiveEngine::new(), transport)?;
        processes.push(Process::spawn(sim)?);
    }
    run(processes, duration);
    Ok(())
}

fn run_in_process(configs: Vec<ProcessConfig>, duration: Option<Duration>) -> Result<()> {
    let capacity = configs.iter().map(|c| c.queue_capacity).max().unwrap_or_default();
    let hub = LocalHub::new(capacity);
    let mut processes = Vec::with_capacity(configs.len());
    for config in configs {
        let transport = hub
            .bind(config.address.clone())
            .with_context(|| format!("binding {}", config.address))?;
        let sim = Simulation::new(config, PassiveEngine::new(), transport)?;
        processes.push(Process::spawn(sim)?);
    }
    run(processes, duration);
    Ok(())
}

fn run<T: Transport>(mut processes: Vec<Process<PassiveEngine, T>>, duration: Option<Duration>) {
    wait(duration, &mut processes);

    for process in processes {
        let role = process.role();
        if let Some(sim) = process.stop() {
            let stats = sim.stats();
            info!(
                role = %role,
                ticks = stats.ticks,
                messages = stats.messages,
                rejected = stats.rejected,
                overruns = stats.overruns,
                objects = sim.scene().object_count(),
                "process stopped"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_peer() {
        let peer = parse_peer("haptics=127.0.0.1:7772@1").unwrap();
        assert_eq!(peer.role, Role::Haptics);
        assert_eq!(peer.address.as_str(), "127.0.0.1:7772");
        assert_eq!(peer.tick(), Duration::from_millis(1));

        assert!(parse_peer("visual").is_err());
        assert!(parse_peer("audio=x").is_err());
        assert!(parse_peer("visual=x@fast").is_err());
    }

    #[test]
    fn test_local_mesh_is_fully_connected() {
        let configs = local_configs(9000, "127.0.0.1", Some("127.0.0.1:9999"));
        assert_eq!(configs.len(), 4);
        assert_eq!(configs[2].address.as_str(), "127.0.0.1:9002");
        for cfg in &configs {
            assert_eq!(cfg.peers.len(), 4);
            assert!(cfg.peers.iter().all(|p| p.address != cfg.address));
            cfg.validate().unwrap();
        }
    }
}
