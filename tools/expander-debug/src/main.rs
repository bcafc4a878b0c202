//! Expander Debug Tools
//!
//! Bring-up and debugging tool for MCP23017 I/O expanders hanging off a
//! Raspberry Pi I2C bus.
//!
//! # Features
//!
//! - **Register Map**: Print the chip's 22 registers with names and reset values
//! - **Register Dump**: Read every register of a live (or simulated) chip
//! - **Pin Control**: Read, drive, toggle and configure single pins
//! - **Setup Files**: Apply a TOML description of a whole board's pins
//!
//! Talking to real hardware requires the `linux` feature. Every command that
//! needs a chip also runs against an in-memory one with `--simulate`.
//!
//! The driver resets the chip when it attaches and again when it detaches,
//! so each invocation starts from and leaves behind the reset state.
//!
//! # Usage
//!
//! ```bash
//! # Print the register map
//! expander-debug registers
//!
//! # Dump all registers of the chip at 0x21 on /dev/i2c-1
//! expander-debug --address 0x21 dump
//!
//! # Read pin A0 of the chip at the default address
//! expander-debug pin read A0
//!
//! # Make A7 an input with its pull-up enabled
//! expander-debug pin input A7 --pull-up
//!
//! # Apply a board setup without hardware
//! expander-debug --simulate apply board.toml
//! ```

mod setup;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use log::info;
use rpi4_mcp23017::{
    Level, Mcp23017, PinId, Port, Register, SimulatedChip, Transport, ADDRESS_MAX, ADDRESS_MIN,
};
use std::path::{Path, PathBuf};

use setup::PinSetup;

/// Expander Debug Tools
///
/// Bring-up and debugging toolkit for MCP23017 I/O expanders
#[derive(Parser)]
#[command(name = "expander-debug")]
#[command(author = "Prasanna Gautam")]
#[command(version = "0.1.0")]
#[command(about = "Bring-up and debugging tool for MCP23017 I/O expanders")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// I2C bus number (/dev/i2c-N)
    #[arg(short, long, global = true, default_value_t = 1)]
    bus: u8,

    /// Device address, decimal or 0x-prefixed hex
    #[arg(short, long, global = true, default_value = "0x20", value_parser = parse_address)]
    address: u8,

    /// Use an in-memory chip instead of the I2C bus
    #[arg(long, global = true)]
    simulate: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the register map
    Registers,

    /// Read and print every register
    Dump,

    /// Single pin operations
    #[command(subcommand)]
    Pin(PinCommands),

    /// Apply a pin setup file
    Apply {
        /// Path to the setup file (TOML)
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum PinCommands {
    /// Read a pin's level
    Read {
        /// Pin name (A0..A7, B0..B7)
        pin: PinId,
    },

    /// Drive a pin
    Write {
        /// Pin name (A0..A7, B0..B7)
        pin: PinId,

        /// Level: 0, 1, low or high
        level: Level,
    },

    /// Invert a pin's level
    Toggle {
        /// Pin name (A0..A7, B0..B7)
        pin: PinId,
    },

    /// Make a pin an input
    Input {
        /// Pin name (A0..A7, B0..B7)
        pin: PinId,

        /// Enable the internal 100k pull-up
        #[arg(long)]
        pull_up: bool,
    },

    /// Make a pin an output
    Output {
        /// Pin name (A0..A7, B0..B7)
        pin: PinId,
    },
}

/// Bus and address the command runs against
#[derive(Debug, Clone, Copy)]
struct Target {
    bus: u8,
    address: u8,
    simulate: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let target = Target {
        bus: cli.bus,
        address: cli.address,
        simulate: cli.simulate,
    };

    match cli.command {
        Commands::Registers => {
            print_register_map();
            Ok(())
        }
        Commands::Dump => with_device(target, |device| {
            let registers = device.dump()?;
            print_dump(device.address(), &registers);
            Ok(())
        }),
        Commands::Pin(cmd) => with_device(target, |device| handle_pin(device, &cmd)),
        Commands::Apply { path } => handle_apply(target, &path),
    }
}

/// Parse a 7-bit device address given as decimal or `0x` hex
fn parse_address(s: &str) -> std::result::Result<u8, String> {
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    }
    .map_err(|e| format!("invalid address `{}`: {}", s, e))?;

    if value > 0x7F {
        return Err(format!("address {:#04x} does not fit in 7 bits", value));
    }
    Ok(value)
}

/// Attach to the chip, run `f`, then detach (reset + release).
///
/// The detach error is reported only if `f` succeeded.
fn with_device<F>(target: Target, f: F) -> Result<()>
where
    F: FnOnce(&Mcp23017<Box<dyn Transport>>) -> Result<()>,
{
    if !(ADDRESS_MIN..=ADDRESS_MAX).contains(&target.address) {
        eprintln!(
            "{} Address {:#04x} is outside the MCP23017 range {:#04x}..={:#04x}",
            "[WARNING]".yellow().bold(),
            target.address,
            ADDRESS_MIN,
            ADDRESS_MAX
        );
    }

    let transport = open_transport(target)?;
    let mut device = Mcp23017::new(transport, target.address)
        .with_context(|| format!("Failed to initialize MCP23017 at {:#04x}", target.address))?;

    let result = f(&device);
    let closed = device
        .close()
        .with_context(|| format!("Failed to reset MCP23017 at {:#04x}", target.address));

    result.and(closed)
}

fn open_transport(target: Target) -> Result<Box<dyn Transport>> {
    if target.simulate {
        info!("Using simulated MCP23017 at {:#04x}", target.address);
        return Ok(Box::new(SimulatedChip::new(target.address)));
    }
    open_bus(target.bus)
}

#[cfg(feature = "linux")]
fn open_bus(bus: u8) -> Result<Box<dyn Transport>> {
    info!("Opening /dev/i2c-{}", bus);
    let transport = rpi4_mcp23017::LinuxBus::open(bus)?;
    Ok(Box::new(transport))
}

#[cfg(not(feature = "linux"))]
fn open_bus(bus: u8) -> Result<Box<dyn Transport>> {
    anyhow::bail!(
        "I2C bus {} unavailable: built without the `linux` feature (use --simulate)",
        bus
    )
}

fn handle_pin<T: Transport>(device: &Mcp23017<T>, cmd: &PinCommands) -> Result<()> {
    match *cmd {
        PinCommands::Read { pin } => {
            let level = device.pin(pin).read()?;
            println!("{} {} = {}", "[RX]".cyan().bold(), pin, level_text(level));
        }

        PinCommands::Write { pin, level } => {
            device.pin(pin).write(level)?;
            println!("{} {} <- {}", "[TX]".cyan().bold(), pin, level_text(level));
        }

        PinCommands::Toggle { pin } => {
            let p = device.pin(pin);
            p.toggle()?;
            println!("{} {} toggled, now {}", "[OK]".green().bold(), pin, level_text(p.read()?));
        }

        PinCommands::Input { pin, pull_up } => {
            device.pin(pin).set_input(pull_up)?;
            let suffix = if pull_up { " with pull-up" } else { "" };
            println!("{} {} is an input{}", "[OK]".green().bold(), pin, suffix);
        }

        PinCommands::Output { pin } => {
            device.pin(pin).set_output()?;
            println!("{} {} is an output", "[OK]".green().bold(), pin);
        }
    }

    Ok(())
}

fn handle_apply(target: Target, path: &Path) -> Result<()> {
    let setup = PinSetup::load(path)?;

    let target = Target {
        bus: setup.bus.unwrap_or(target.bus),
        address: setup.address.unwrap_or(target.address),
        ..target
    };

    println!(
        "{} Applying {} ({} pins) to {:#04x}",
        "[*]".cyan().bold(),
        path.display(),
        setup.pins.len(),
        target.address
    );

    with_device(target, |device| {
        setup.apply(device)?;
        print_port_summary(device)?;
        println!("\n{} Setup applied", "[OK]".green().bold());
        Ok(())
    })
}

fn level_text(level: Level) -> colored::ColoredString {
    match level {
        Level::High => "1 (high)".green(),
        Level::Low => "0 (low)".dimmed(),
    }
}

fn print_register_map() {
    println!("{}", "=".repeat(60));
    println!("{}", "MCP23017 Register Map (IOCON.BANK = 0)".cyan().bold());
    println!("{}", "=".repeat(60));

    println!(
        "\n  {:<6} {:<10} {:<20} {}",
        "Addr".white().bold(),
        "Name".white().bold(),
        "Mode".white().bold(),
        "Reset".white().bold()
    );
    for register in Register::all() {
        println!(
            "  {:<6} {:<10} {:<20} {:#04x}",
            format!("{:#04x}", register.address()),
            register.to_string(),
            register.mode().to_string(),
            register.reset_value()
        );
    }

    println!("\n{}", "=".repeat(60));
}

fn print_dump(address: u8, registers: &[u8]) {
    println!("{}", "=".repeat(60));
    println!("{}", format!("Register Dump: {:#04x}", address).cyan().bold());
    println!("{}", "=".repeat(60));

    for (register, value) in Register::all().zip(registers) {
        let value_text = format!("{:#04x}  {:08b}", value, value);
        let value_text = if *value == register.reset_value() {
            value_text.dimmed()
        } else {
            value_text.yellow()
        };
        println!(
            "  {:#04x} {:<10} {}",
            register.address(),
            register.to_string(),
            value_text
        );
    }

    println!("\n{}", "=".repeat(60));
}

fn print_port_summary<T: Transport>(device: &Mcp23017<T>) -> Result<()> {
    println!("\n{}", "Pin State:".white().bold());
    for port in Port::ALL {
        for pin in device.port(port) {
            let direction = if pin.is_output()? {
                "output".yellow()
            } else {
                "input".cyan()
            };
            println!("  {} {:<7} {}", pin.id(), direction, level_text(pin.read()?));
        }
    }
    Ok(())
}
