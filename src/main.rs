//! Lullaby node entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SerialTransport   ChannelTransport   JsonConfigFile           │
//! │  (UART ring)       (threaded bench)   (ConfigPort)             │
//! │  BenchHardware     LogEventSink       MonotonicClock           │
//! │  (Sensor+Actuator) (EventSink)        (ClockPort)              │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  ControllerService · PeripheralNode (pure logic)       │    │
//! │  │  RingNode · QueryClient · AnchorSearch · Safety        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Subcommands:
//! - `node`: run one node of the physical ring on a UART
//! - `bench`: run all four nodes as threads over an in-process ring
//! - `simulate`: drive the controller against the offline plant
//! - `ports`: list the serial ports the OS reports

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use lullaby::adapters::channel::{self, ChannelTransport};
use lullaby::adapters::config_file::JsonConfigFile;
use lullaby::adapters::hardware::{BenchHardware, Rig};
use lullaby::adapters::log_sink::LogEventSink;
use lullaby::adapters::pwm::{PwmRocker, SysfsPwm};
use lullaby::adapters::serial::SerialTransport;
use lullaby::adapters::time::MonotonicClock;
use lullaby::app::peripheral::{PeripheralNode, Role};
use lullaby::app::ports::{ActuatorPort, ClockPort, ConfigError, ConfigPort, SensorPort};
use lullaby::app::service::ControllerService;
use lullaby::bus::client::SensorQueryClient;
use lullaby::bus::codec::NodeId;
use lullaby::bus::ring::RingNode;
use lullaby::bus::transport::Transport;
use lullaby::config::SystemConfig;
use lullaby::sim::SimConfig;
use lullaby::sim::harness::SimHarness;
use lullaby::sim::plant::Plant;

#[derive(Parser)]
#[command(name = "lullaby", version, about = "Infant soothing controller and serial ring nodes")]
struct Cli {
    /// JSON config file. Defaults are used when absent.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run one node of the ring on a serial port.
    Node {
        #[arg(long, value_enum)]
        role: RoleArg,
        /// Serial device, e.g. /dev/ttyUSB0.
        #[arg(long)]
        port: String,
        /// Overrides bus.baud_rate.
        #[arg(long)]
        baud: Option<u32>,
        /// Master only: query every node in random order after the boot ping.
        #[arg(long)]
        comm_check: bool,
        /// Bench heart rate served by a heartbeat node.
        #[arg(long, default_value_t = 120)]
        heartbeat: u8,
        /// Bench crying level served by a crying node.
        #[arg(long, default_value_t = 40)]
        crying: u8,
        /// Motor only: sysfs PWM chip whose channels 0 (amplitude) and
        /// 1 (rate) drive the rocker, e.g. /sys/class/pwm/pwmchip0.
        #[arg(long)]
        pwm_chip: Option<PathBuf>,
    },
    /// Run all four nodes as threads over an in-process ring.
    Bench {
        /// Controller cycles before shutting down.
        #[arg(long, default_value_t = 5)]
        cycles: u32,
        #[arg(long, default_value_t = 120)]
        heartbeat: u8,
        #[arg(long, default_value_t = 40)]
        crying: u8,
    },
    /// Drive the controller against the offline delay-line plant.
    Simulate {
        /// Plant generation seed. Random when omitted.
        #[arg(long)]
        seed: Option<u64>,
        /// Overrides sim.max_steps.
        #[arg(long)]
        steps: Option<u32>,
    },
    /// List the serial ports the OS reports.
    Ports,
}

/// Rocker PWM period (1 kHz).
const PWM_PERIOD: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    #[value(alias = "controller")]
    Master,
    Heartbeat,
    Crying,
    Motor,
}

impl RoleArg {
    fn peripheral(self) -> Option<Role> {
        match self {
            Self::Master => None,
            Self::Heartbeat => Some(Role::Heartbeat),
            Self::Crying => Some(Role::Crying),
            Self::Motor => Some(Role::Motor),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    info!("lullaby v{}", env!("CARGO_PKG_VERSION"));

    let file = cli.config.as_ref().map(JsonConfigFile::new);
    let config = load_config(file.as_ref())?;

    match cli.command {
        Cmd::Node {
            role,
            port,
            baud,
            comm_check,
            heartbeat,
            crying,
            pwm_chip,
        } => {
            let baud = baud.unwrap_or(config.bus.baud_rate);
            let link = SerialTransport::open(&port, baud, config.bus.poll_interval())
                .with_context(|| format!("opening {port}"))?;
            let stop = AtomicBool::new(false);
            let mut bench = BenchHardware::new(heartbeat, crying);
            match (role.peripheral(), pwm_chip) {
                (None, _) => run_master(link, &config, comm_check, &stop),
                (Some(Role::Motor), Some(chip)) => {
                    let amplitude = SysfsPwm::open(&chip, 0, PWM_PERIOD)
                        .with_context(|| format!("amplitude channel of {}", chip.display()))?;
                    let rate = SysfsPwm::open(&chip, 1, PWM_PERIOD)
                        .with_context(|| format!("rate channel of {}", chip.display()))?;
                    let mut rig = Rig::new(bench, PwmRocker::new(amplitude, rate));
                    run_peripheral(Role::Motor, link, &config, &mut rig, &stop);
                }
                (Some(role), chip) => {
                    if chip.is_some() {
                        warn!("--pwm-chip only applies to the motor role");
                    }
                    run_peripheral(role, link, &config, &mut bench, &stop);
                }
            }
            Ok(())
        }
        Cmd::Bench {
            cycles,
            heartbeat,
            crying,
        } => run_bench(&config, cycles, heartbeat, crying),
        Cmd::Simulate { seed, steps } => {
            let mut sim = match file.as_ref() {
                Some(f) => f.load_sim().context("loading sim section")?,
                None => SimConfig::default(),
            };
            if let Some(steps) = steps {
                sim.max_steps = steps;
            }
            run_simulation(&config, &sim, seed);
            Ok(())
        }
        Cmd::Ports => {
            for port in SerialTransport::available_ports().context("listing serial ports")? {
                println!("{port}");
            }
            Ok(())
        }
    }
}

fn load_config(file: Option<&JsonConfigFile>) -> Result<SystemConfig> {
    let Some(file) = file else {
        return Ok(SystemConfig::default());
    };
    match file.load() {
        Ok(config) => Ok(config),
        Err(ConfigError::NotFound) => {
            warn!("{} not found, using defaults", file.path().display());
            Ok(SystemConfig::default())
        }
        Err(e) => bail!("config {}: {e}", file.path().display()),
    }
}

fn run_master<T: Transport>(link: T, config: &SystemConfig, comm_check: bool, stop: &AtomicBool) {
    let node = RingNode::new(NodeId::Master, link, MonotonicClock::new(), &config.bus);
    let client = SensorQueryClient::new(node, config.bus.query_timeout());
    let mut service = ControllerService::new(client, config);
    let mut sink = LogEventSink::new();

    let boot = service.boot(&mut sink);
    if !boot.all_alive() {
        warn!("starting with missing nodes: {boot:?}");
    }
    if comm_check {
        service.comm_check(&mut StdRng::from_entropy(), &mut sink);
    }
    service.run(&mut sink, stop);
}

fn run_peripheral<T: Transport>(
    role: Role,
    link: T,
    config: &SystemConfig,
    hw: &mut (impl SensorPort + ActuatorPort),
    stop: &AtomicBool,
) {
    let node = RingNode::new(role.node_id(), link, MonotonicClock::new(), &config.bus);
    let mut peripheral = PeripheralNode::new(role, node);
    peripheral.run(hw, &mut LogEventSink::new(), stop);
}

fn run_bench(config: &SystemConfig, cycles: u32, heartbeat: u8, crying: u8) -> Result<()> {
    let mut links = channel::ring(NodeId::ALL.len());
    let stop = Arc::new(AtomicBool::new(false));

    // Node i owns link i; drain from the back so indices stay valid.
    let mut handles = Vec::new();
    for role in [Role::Motor, Role::Crying, Role::Heartbeat] {
        let link: ChannelTransport = links.pop().context("ring too short")?;
        let config = config.clone();
        let stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(format!("{role:?}"))
            .spawn(move || {
                let mut hw = BenchHardware::new(heartbeat, crying);
                run_peripheral(role, link, &config, &mut hw, &stop);
                hw
            })
            .context("spawning peripheral thread")?;
        handles.push(handle);
    }
    let master_link = links.pop().context("ring too short")?;

    let clock = MonotonicClock::new();
    let node = RingNode::new(NodeId::Master, master_link, clock, &config.bus);
    let client = SensorQueryClient::new(node, config.bus.query_timeout());
    let mut service = ControllerService::new(client, config);
    let mut sink = LogEventSink::new();

    service.boot(&mut sink);
    service.comm_check(&mut StdRng::from_entropy(), &mut sink);
    for _ in 0..cycles {
        let report = service.cycle(&mut sink);
        clock.sleep(report.dwell.min(config.cadence.crying_dwell()));
    }

    stop.store(true, Ordering::Relaxed);
    for handle in handles {
        match handle.join() {
            Ok(hw) => {
                if let Some(cell) = hw.last_actuation() {
                    info!("bench: rocker finished at {cell}");
                }
            }
            Err(_) => bail!("peripheral thread panicked"),
        }
    }
    info!(
        "bench: {} cycles, {} stale, panic={}",
        service.cycles(),
        service.stale_cycles(),
        service.search().is_panicked()
    );
    Ok(())
}

fn run_simulation(config: &SystemConfig, sim: &SimConfig, seed: Option<u64>) {
    let seed = seed.unwrap_or_else(rand::random);
    info!("simulate: seed {seed}");
    let mut rng = StdRng::seed_from_u64(seed);
    let plant = Plant::generate(&mut rng, sim);
    info!("simulate: level matrix\n{}", plant.matrix());

    let report = SimHarness::new(plant, config, sim).run();
    for t in &report.trace {
        println!(
            "{:>3} t={:>7.1}s bpm={:>3} cry={:>3} {:<28} -> {} K{} S={:.1}",
            t.step,
            t.time,
            t.bpm,
            t.cry,
            format!("{:?}", t.decision.action),
            t.cell,
            t.level,
            t.stress,
        );
    }
    println!(
        "rest={} controller_panic={} plant_panic={} final={} K{} S={:.1} elapsed={:.1}s",
        report.reached_rest,
        report.controller_panicked,
        report.plant_panicked,
        report.final_cell,
        report.final_level,
        report.final_stress,
        report.elapsed,
    );
}
