//! condor-listener: capture CLI for Condor UDP telemetry.
//!
//! Subcommands:
//! - `listen`:  bind a UDP socket and decode live traffic
//! - `replay`:  run a hex dump file (one datagram per line) through the
//!   same decode path
//! - `convert`: one-shot landscape x/y to lon/lat via the helper
//! - `config`:  show the effective configuration, optionally writing it
//!   out as the config file

use std::io::{self, BufWriter, Write};
use std::net::UdpSocket;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use serde_json::json;

use condor_core::config::{config_file, load_config, save_config, Config};
use condor_core::{hex_decode, CachedConverter, Engine, EngineEvent, TelemetryRecord};

mod navicon;
mod store;

use navicon::NaviconBridge;
use store::IdentityMapWriter;

/// Interval between periodic stats lines on stderr.
const STATS_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(
    name = "condor-listener",
    version,
    about = "Condor UDP telemetry capture and flight-plan extraction"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for live UDP telemetry
    Listen {
        /// UDP port to bind
        #[arg(long, env = "CONDOR_UDP_PORT")]
        port: Option<u16>,

        /// Bind address
        #[arg(long)]
        host: Option<String>,

        #[command(flatten)]
        decode: DecodeArgs,
    },
    /// Replay a hex dump file (one datagram per line)
    Replay {
        /// Path to the dump file
        file: PathBuf,

        #[command(flatten)]
        decode: DecodeArgs,
    },
    /// Convert one landscape x/y to lon/lat via the helper
    Convert {
        x: f32,
        y: f32,

        /// Path to the coordinate helper executable
        #[arg(long, env = "CONDOR_HELPER")]
        helper: Option<PathBuf>,

        /// Landscape name passed to the helper
        #[arg(long)]
        landscape: Option<String>,
    },
    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

/// Options shared by `listen` and `replay`.
#[derive(clap::Args)]
struct DecodeArgs {
    /// Path to the coordinate helper executable
    #[arg(long, env = "CONDOR_HELPER")]
    helper: Option<PathBuf>,

    /// Landscape name passed to the helper
    #[arg(long)]
    landscape: Option<String>,

    /// Output directory for flight plans and the identity map
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Append decoded positions as JSON lines to this file
    #[arg(long)]
    positions: Option<PathBuf>,

    /// Print every decoded position
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    let config = load_config();

    match cli.command {
        Commands::Listen { port, host, decode } => cmd_listen(config, port, host, decode),
        Commands::Replay { file, decode } => cmd_replay(config, file, decode),
        Commands::Convert {
            x,
            y,
            helper,
            landscape,
        } => cmd_convert(config, x, y, helper, landscape),
        Commands::Config { init } => cmd_config(config, init),
    }
}

// ---------------------------------------------------------------------------
// Position sinks
// ---------------------------------------------------------------------------

trait PositionSink {
    fn write_position(&mut self, ts: f64, rec: &TelemetryRecord) -> io::Result<()>;
}

/// One JSON object per line, timestamp wrapped around the record.
struct JsonLinesSink {
    out: BufWriter<std::fs::File>,
}

impl JsonLinesSink {
    fn open(path: &PathBuf) -> io::Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(JsonLinesSink {
            out: BufWriter::new(file),
        })
    }
}

impl PositionSink for JsonLinesSink {
    fn write_position(&mut self, ts: f64, rec: &TelemetryRecord) -> io::Result<()> {
        let line = json!({ "ts": ts, "position": rec });
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }
}

// ---------------------------------------------------------------------------
// Shared decode plumbing
// ---------------------------------------------------------------------------

type ListenerEngine = Engine<CachedConverter<NaviconBridge>>;

struct Outputs {
    sink: Option<Box<dyn PositionSink>>,
    identity: IdentityMapWriter,
    out_dir: PathBuf,
    verbose: bool,
}

impl Outputs {
    /// Build engine + outputs from merged config and CLI args.
    /// Exits on helper startup failure.
    fn build(config: &Config, args: &DecodeArgs) -> (ListenerEngine, Outputs) {
        let helper_path = args
            .helper
            .clone()
            .or_else(|| config.helper.path.clone().map(PathBuf::from));
        let landscape = args
            .landscape
            .clone()
            .or_else(|| config.helper.landscape.clone());

        let converter = match helper_path {
            Some(path) => {
                let timeout = Duration::from_secs_f64(config.helper.timeout_secs);
                match NaviconBridge::new(path, landscape, timeout) {
                    Ok(bridge) => Some(CachedConverter::new(bridge)),
                    Err(e) => {
                        eprintln!("Error: {e}");
                        std::process::exit(1);
                    }
                }
            }
            None => {
                eprintln!("No coordinate helper configured; positions stay in landscape x/y");
                None
            }
        };

        let out_dir = args
            .out_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(&config.output.dir));
        let identity = IdentityMapWriter::new(out_dir.join(&config.output.identity_map));

        let sink: Option<Box<dyn PositionSink>> = match &args.positions {
            Some(path) => match JsonLinesSink::open(path) {
                Ok(s) => Some(Box::new(s)),
                Err(e) => {
                    eprintln!("Error: cannot open {}: {e}", path.display());
                    std::process::exit(1);
                }
            },
            None => None,
        };

        (
            Engine::new(converter),
            Outputs {
                sink,
                identity,
                out_dir,
                verbose: args.verbose,
            },
        )
    }
}

fn now_ts() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Apply one batch of engine events to the sinks.
fn handle_events(engine: &ListenerEngine, events: Vec<EngineEvent>, outputs: &mut Outputs) {
    for event in events {
        match event {
            EngineEvent::Position(rec) => {
                if outputs.verbose {
                    println!(
                        "{} alt={:.0}ft spd={:.1}kt hdg={:03.0} vario={:+.1}kt g={:.2}",
                        condor_core::cookie_to_string(rec.cookie),
                        rec.altitude_ft,
                        rec.speed_kt,
                        rec.heading_deg,
                        rec.vario_kt,
                        rec.g_force,
                    );
                }
                if let Some(sink) = outputs.sink.as_mut() {
                    if let Err(e) = sink.write_position(now_ts(), &rec) {
                        eprintln!("position sink error: {e}");
                    }
                }
            }
            EngineEvent::IdentityUpdated { cookie } => {
                if let Some(ident) = engine.identities.lookup(cookie) {
                    eprintln!(
                        "identity {}: {}",
                        condor_core::cookie_to_string(cookie),
                        ident.display_line()
                    );
                }
                if let Err(e) = outputs.identity.maybe_write(&engine.identities) {
                    eprintln!("identity map write error: {e}");
                }
            }
            EngineEvent::FlightPlanReady(doc) => {
                match store::write_flight_plan(&outputs.out_dir, &doc) {
                    Ok(path) => eprintln!(
                        "flight plan complete: {} ({} turnpoints, {} disabled airspaces) -> {}",
                        doc.landscape,
                        doc.turnpoints.len(),
                        doc.disabled_airspaces.len(),
                        path.display()
                    ),
                    Err(e) => eprintln!("flight plan write error: {e}"),
                }
            }
        }
    }
}

fn print_stats(label: &str, engine: &ListenerEngine) {
    eprintln!(
        "{label}{} packets, {} decoded, {} errors, {} unknown, {} conversion errors, \
         {} pilots, session {:?}",
        engine.packets_total,
        engine.packets_decoded,
        engine.decode_errors,
        engine.unknown_packets,
        engine.conversion_errors,
        engine.identities.len(),
        engine.session.phase(),
    );
}

/// Shutdown: flush the identity map and stop the helper.
fn finish(mut engine: ListenerEngine, outputs: &mut Outputs, label: &str) {
    if let Err(e) = outputs.identity.flush(&engine.identities) {
        eprintln!("identity map flush error: {e}");
    }
    if let Some(e) = engine.last_error.take() {
        eprintln!("last decode error: {e}");
    }
    print_stats(label, &engine);
    if let Some(converter) = engine.into_converter() {
        converter.into_inner().shutdown();
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_listen(config: Config, port: Option<u16>, host: Option<String>, args: DecodeArgs) {
    let host = host.unwrap_or_else(|| config.listener.host.clone());
    let port = port.unwrap_or(config.listener.port);
    let label = match &config.listener.label {
        Some(l) => format!("[{l}] "),
        None => String::new(),
    };

    let (mut engine, mut outputs) = Outputs::build(&config, &args);

    let socket = match UdpSocket::bind((host.as_str(), port)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: cannot bind {host}:{port}: {e}");
            std::process::exit(1);
        }
    };
    // Short read timeout so the shutdown flag is polled.
    if let Err(e) = socket.set_read_timeout(Some(Duration::from_millis(500))) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            eprintln!("Error: cannot install signal handler: {e}");
            std::process::exit(1);
        }
    }

    eprintln!("{label}listening on {host}:{port}");

    let mut buf = [0u8; 2048];
    let mut last_stats = Instant::now();

    while running.load(Ordering::SeqCst) {
        match socket.recv_from(&mut buf) {
            Ok((len, _peer)) => {
                let (packet, events) = engine.ingest(&buf[..len]);
                if packet.is_none() {
                    if let Some(e) = engine.last_error.take() {
                        eprintln!("decode error: {e}");
                    }
                }
                handle_events(&engine, events, &mut outputs);
            }
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
            {
                // recv timeout: just re-check the shutdown flag
            }
            Err(e) => {
                eprintln!("socket error: {e}");
                break;
            }
        }

        if last_stats.elapsed() >= STATS_INTERVAL {
            print_stats(&label, &engine);
            last_stats = Instant::now();
        }
    }

    eprintln!("{label}shutting down");
    finish(engine, &mut outputs, &label);
}

fn cmd_replay(config: Config, file: PathBuf, args: DecodeArgs) {
    let (mut engine, mut outputs) = Outputs::build(&config, &args);

    let content = match std::fs::read_to_string(&file) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: cannot read {}: {e}", file.display());
            std::process::exit(1);
        }
    };

    let mut skipped_lines = 0u64;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match hex_decode(line) {
            Some(data) => {
                let (packet, events) = engine.ingest(&data);
                if packet.is_none() {
                    if let Some(e) = engine.last_error.take() {
                        eprintln!("decode error: {e}");
                    }
                }
                handle_events(&engine, events, &mut outputs);
            }
            None => skipped_lines += 1,
        }
    }

    if skipped_lines > 0 {
        eprintln!("{skipped_lines} non-hex lines skipped");
    }
    finish(engine, &mut outputs, "");
}

fn cmd_convert(
    config: Config,
    x: f32,
    y: f32,
    helper: Option<PathBuf>,
    landscape: Option<String>,
) {
    let helper_path = helper
        .or_else(|| config.helper.path.clone().map(PathBuf::from))
        .unwrap_or_else(|| {
            eprintln!("Error: no coordinate helper configured (--helper or config)");
            std::process::exit(1);
        });
    let landscape = landscape.or_else(|| config.helper.landscape.clone());
    let timeout = Duration::from_secs_f64(config.helper.timeout_secs);

    let mut bridge = match NaviconBridge::new(helper_path, landscape, timeout) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    use condor_core::CoordinateConverter;
    match bridge.xy_to_lon_lat(x, y) {
        Ok((lon, lat)) => println!("{lon:.8},{lat:.8}"),
        Err(e) => {
            eprintln!("Error: {e}");
            bridge.shutdown();
            std::process::exit(1);
        }
    }
    bridge.shutdown();
}

fn cmd_config(config: Config, init: bool) {
    if init {
        match save_config(&config) {
            Ok(path) => eprintln!("wrote {}", path.display()),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }

    println!("config file: {}", config_file().display());
    println!("listener: {}:{}", config.listener.host, config.listener.port);
    if let Some(label) = &config.listener.label {
        println!("label: {label}");
    }
    match &config.helper.path {
        Some(p) => println!(
            "helper: {p} (timeout {}s)",
            config.helper.timeout_secs
        ),
        None => println!("helper: none"),
    }
    if let Some(l) = &config.helper.landscape {
        println!("landscape: {l}");
    }
    println!("output dir: {}", config.output.dir);
}
