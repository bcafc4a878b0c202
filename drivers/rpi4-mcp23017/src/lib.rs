//! # MCP23017 I/O Expander Driver for Raspberry Pi
//!
//! Driver for the Microchip MCP23017 16-bit I/O expander on the I2C bus.
//! The chip exposes two 8-bit GPIO ports (A and B); every line can be
//! switched between input and output, given a weak pull-up, and driven or
//! sampled individually.
//!
//! ## Hardware Configuration
//!
//! | MCP23017 Pin | RPi GPIO | Function  |
//! |--------------|----------|-----------|
//! | SCL (12)     | GPIO 3   | I2C1_SCL  |
//! | SDA (13)     | GPIO 2   | I2C1_SDA  |
//! | A0-A2        | -        | Address   |
//! | RESET (18)   | 3V3      | Tied high |
//!
//! The device address is `0x20 | A2 << 2 | A1 << 1 | A0`, so up to eight
//! expanders share one bus (0x20..=0x27).
//!
//! ## Register Model
//!
//! With `IOCON.BANK = 0` (the power-on layout) the 22 registers interleave
//! the two ports: each register family sits at an even address for port A
//! and the following odd address for port B.
//!
//! ```text
//! 0x00 IODIRA   0x01 IODIRB     direction, 1 = input
//! 0x0C GPPUA    0x0D GPPUB      pull-up enable
//! 0x12 GPIOA    0x13 GPIOB      port level
//! ...
//! ```
//!
//! No pin state is cached on the host. Every pin operation is a read of the
//! owning register followed by a write of the edited byte, so two callers
//! touching the same port from different threads must serialize access
//! themselves. `Mcp23017` is `!Send` for exactly that reason.
//!
//! ## Example
//!
//! ```no_run
//! # #[cfg(feature = "linux")]
//! # fn main() -> rpi4_mcp23017::Result<()> {
//! use rpi4_mcp23017::{Level, Mcp23017, Port};
//!
//! let mut expander = Mcp23017::open(1, 0x20)?;
//! let led = &expander.port(Port::B)[3];
//! led.set_output()?;
//! led.write(Level::High)?;
//! expander.close()?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "linux"))]
//! # fn main() {}
//! ```

pub mod bits;
pub mod bus;
pub mod device;
pub mod pin;
pub mod port;
pub mod register;
pub mod sim;

// Re-exports
pub use bus::{I2cTransport, Transport, TransportError};
pub use device::{address_from_pins, Mcp23017};
pub use pin::{Level, Pin, PinId};
pub use port::{Pins, PINS_PER_PORT};
pub use register::{resolve, Mode, Port, Register, REGISTER_COUNT};
pub use sim::{BusOp, SimulatedChip};

#[cfg(feature = "linux")]
pub use bus::LinuxBus;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Lowest address selectable with the A0-A2 strap pins
pub const ADDRESS_MIN: u8 = 0x20;

/// Highest address selectable with the A0-A2 strap pins
pub const ADDRESS_MAX: u8 = 0x27;

/// Driver errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The I2C bus could not be opened
    #[error("failed to open I2C bus {bus}: {reason}")]
    BusOpen { bus: u8, reason: String },

    /// A register read did not complete
    #[error("failed to read register {register:#04x} from device {address:#04x}")]
    BusRead {
        address: u8,
        register: u8,
        #[source]
        source: TransportError,
    },

    /// A register write did not complete
    #[error("failed to write register {register:#04x} on device {address:#04x}")]
    BusWrite {
        address: u8,
        register: u8,
        #[source]
        source: TransportError,
    },

    /// The device was closed and its bus handle released
    #[error("bus handle has been released")]
    BusClosed,

    /// Text that does not name a port
    #[error("invalid port `{0}`, expected A or B")]
    InvalidPort(String),

    /// Text that does not name a pin
    #[error("invalid pin `{0}`, expected A0..A7 or B0..B7")]
    InvalidPin(String),

    /// Text that does not name a logic level
    #[error("invalid level `{0}`, expected 0, 1, low or high")]
    InvalidLevel(String),
}

/// Result type for driver operations
pub type Result<T> = core::result::Result<T, Error>;
