//! slabsim - Slab Allocator Simulator
//!
//! Command-line front end for the slab engine:
//! - Interactive menu (allocate, deallocate last, status, one cycle, exit)
//! - Non-interactive simulation runs
//! - Effective configuration and metrics dumps
//!
//! # Examples
//!
//! ```bash
//! # Interactive menu for 64-byte objects
//! slabsim interactive --size 64
//!
//! # Hold 3 objects, then run 10 allocate/deallocate cycles
//! slabsim simulate --size 32 --hold 3 --cycles 10
//!
//! # Show effective configuration
//! slabsim --config slabsim.toml config
//! ```

use clap::{Args, Parser, Subcommand};
use slabsim::config::SimulatorConfig;
use slabsim::error::Error;
use slabsim::metrics;
use slabsim::slab::{SizeClass, SlabStatus};
use slabsim::Session;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const BOLD: &str = "\x1b[1m";

/// slabsim - Slab Allocator Simulator
#[derive(Parser, Debug)]
#[command(name = "slabsim")]
#[command(version = slabsim::VERSION)]
#[command(about = "Slab Allocator Simulator", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(long, global = true, env = "SLABSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Log directory path
    #[arg(long, global = true, env = "SLABSIM_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive allocation menu
    Interactive {
        /// Object size in bytes (prompted for if omitted)
        #[arg(short, long)]
        size: Option<usize>,
    },

    /// Run a scripted allocation workload
    Simulate(SimulateArgs),

    /// Print the effective configuration
    Config,

    /// Print Prometheus metrics
    Metrics,

    /// Show version
    Version,
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Object size in bytes (defaults to the configured size)
    #[arg(short, long)]
    size: Option<usize>,

    /// Objects to allocate and keep before cycling
    #[arg(long, default_value = "0")]
    hold: usize,

    /// Allocate + deallocate cycles to run
    #[arg(short, long, default_value = "1")]
    cycles: usize,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    metrics: bool,
}

/// Console styling
#[derive(Debug, Clone, Copy)]
struct Style {
    color: bool,
}

impl Style {
    fn paint(&self, code: &str, text: impl std::fmt::Display) -> String {
        if self.color {
            format!("{}{}{}", code, text, RESET)
        } else {
            text.to_string()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = SimulatorConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.log_dir {
        config.log_dir = dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.no_color |= cli.no_color;

    // Setup logging
    setup_logging(&config)?;
    metrics::init_metrics();

    let style = Style {
        color: !config.no_color,
    };

    match cli.command {
        Commands::Interactive { size } => interactive_command(&config, size, style),
        Commands::Simulate(args) => simulate_command(&config, args, style),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Metrics => {
            print!("{}", metrics::export_metrics());
            Ok(())
        }
        Commands::Version => {
            println!("slabsim {}", slabsim::VERSION);
            Ok(())
        }
    }
}

/// Setup logging with a rolling file; the console only shows warnings so the
/// menu stays readable
fn setup_logging(config: &SimulatorConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "slabsim.log");

    let log_level = config
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!config.no_color)
                .with_filter(tracing_subscriber::filter::LevelFilter::WARN),
        )
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

/// Interactive menu loop
fn interactive_command(
    config: &SimulatorConfig,
    size: Option<usize>,
    style: Style,
) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();

    let size_class = match size {
        Some(bytes) => SizeClass::new(bytes)?,
        None => prompt_size(&mut input, config, style)?,
    };

    info!(%size_class, "Starting interactive session");
    let mut session = Session::new(size_class);

    loop {
        print_menu(style);
        let Some(line) = read_line(&mut input)? else {
            break;
        };

        match line.trim() {
            "1" => {
                let address = session.allocate();
                println!(
                    "{}",
                    style.paint(GREEN, format!("Object allocated at address: {}", address))
                );
            }
            "2" => match session.deallocate_last() {
                Ok(dealloc) => {
                    if let Err(e) = &dealloc.outcome {
                        println!("{}", style.paint(YELLOW, format!("Warning: {}", e)));
                    }
                    println!(
                        "{}",
                        style.paint(
                            GREEN,
                            format!("Object deallocated at address: {}", dealloc.address)
                        )
                    );
                }
                Err(Error::NothingToDeallocate) => {
                    println!("{}", style.paint(YELLOW, "No objects to deallocate."));
                    print_error_theory("Deallocation attempted with no active objects", style);
                }
                Err(e) => return Err(e.into()),
            },
            "3" => print_status(&session, style),
            "4" => simulate_one_cycle(&mut session, style)?,
            "5" => {
                println!("{}", style.paint(BLUE, "Exiting. Thank you!"));
                break;
            }
            other => {
                warn!(choice = other, "Invalid menu choice");
                println!("{}", style.paint(RED, "Invalid choice. Please try again."));
                print_error_theory("Invalid menu choice entered", style);
            }
        }
    }

    let report = session.finish();
    info!(
        blocks = report.blocks_released,
        bytes = report.bytes_released,
        "Interactive session finished"
    );
    Ok(())
}

/// Scripted workload
fn simulate_command(config: &SimulatorConfig, args: SimulateArgs, style: Style) -> anyhow::Result<()> {
    let size_class = match args.size {
        Some(bytes) => SizeClass::new(bytes)?,
        None => config.size_class()?,
    };

    info!(%size_class, hold = args.hold, cycles = args.cycles, "Running simulation");
    let mut session = Session::new(size_class);

    for _ in 0..args.hold {
        session.allocate();
    }

    let mut reports = Vec::with_capacity(args.cycles);
    for _ in 0..args.cycles {
        reports.push(session.simulate_cycle()?);
    }

    if args.json {
        let out = serde_json::json!({
            "size_class": size_class,
            "held": session.live(),
            "cycles": reports,
            "stats": session.registry().stats(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for (i, report) in reports.iter().enumerate() {
            println!(
                "Cycle {}: allocated {} → deallocated {}{}",
                i + 1,
                report.allocated,
                report.deallocated,
                if report.recycled { "" } else { " (rejected)" }
            );
        }
        print_status(&session, style);
    }

    if args.metrics || config.metrics {
        print!("{}", metrics::export_metrics());
    }

    session.finish();
    Ok(())
}

fn prompt_size(
    input: &mut impl BufRead,
    config: &SimulatorConfig,
    style: Style,
) -> anyhow::Result<SizeClass> {
    loop {
        print!(
            "{}",
            style.paint(
                GREEN,
                format!(
                    "Enter object size for the slab allocator (in bytes) [{}]: ",
                    config.object_size
                )
            )
        );
        io::stdout().flush()?;

        let Some(line) = read_line(input)? else {
            return Ok(config.size_class()?);
        };
        let line = line.trim();
        if line.is_empty() {
            return Ok(config.size_class()?);
        }

        match line.parse::<usize>() {
            Ok(bytes) => match SizeClass::new(bytes) {
                Ok(sc) => return Ok(sc),
                Err(e) => println!("{}", style.paint(RED, e)),
            },
            Err(_) => println!("{}", style.paint(RED, format!("'{}' is not a size", line))),
        }
    }
}

fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    match input.read_line(&mut line)? {
        0 => Ok(None),
        _ => Ok(Some(line)),
    }
}

fn print_menu(style: Style) {
    println!();
    println!("{}", style.paint(BOLD, style.paint(BLUE, "Slab Allocator Simulation Menu")));
    println!("=================================");
    println!("1. Allocate Object");
    println!("2. Deallocate Last Allocated Object");
    println!("3. Print Slab Status");
    println!("4. Simulate One Allocation + Deallocation Cycle");
    println!("5. Exit");
    print!("Enter your choice: ");
    io::stdout().flush().ok();
}

fn print_status(session: &Session, style: Style) {
    let size_class = session.size_class();
    match session.status() {
        Ok(status) => render_status(size_class, status, style),
        Err(_) => println!(
            "{}",
            style.paint(
                BLUE,
                format!("No slabs allocated yet for this size ({} bytes).", size_class.bytes())
            )
        ),
    }
}

fn render_status(size_class: SizeClass, status: SlabStatus, style: Style) {
    println!();
    println!(
        "{}",
        style.paint(BOLD, format!("Slab Status for Size: {} bytes", size_class.bytes()))
    );
    println!("-------------------------------");
    println!("Allocated objects: {}", status.allocated);
    println!("Free objects:      {}", status.free);
    println!("-------------------------------");
    println!();
    println!("In real memory management systems, slab allocators help efficiently manage");
    println!("fixed-size memory chunks, reducing fragmentation and speeding up allocations.");
}

fn simulate_one_cycle(session: &mut Session, style: Style) -> anyhow::Result<()> {
    println!();
    println!("{}", style.paint(BLUE, "Simulating Kernel Memory Operation (1 Cycle)..."));
    println!("-------------------------------------------------");

    let report = session.simulate_cycle()?;
    println!("{}", style.paint(GREEN, "Allocating memory..."));
    println!("{}", style.paint(GREEN, format!("Allocated at address: {}", report.allocated)));
    println!();
    println!("{}", style.paint(RED, "Deallocating memory..."));
    println!("{}", style.paint(RED, format!("Deallocated address: {}", report.deallocated)));

    render_status(session.size_class(), report.status, style);
    Ok(())
}

fn print_error_theory(message: &str, style: Style) {
    println!();
    println!("{}", style.paint(RED, format!("Error Theory: {}", message)));
    println!("-------------------------------------------------");
    println!("In memory management, errors like this often happen when:");
    println!("- Trying to free memory not allocated by the allocator");
    println!("- Accessing invalid or already freed memory");
    println!("- Using incorrect object size during deallocation");
    println!("Such mistakes can cause system crashes, leaks, or instability.");
}
