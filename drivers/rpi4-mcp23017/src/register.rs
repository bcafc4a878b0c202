//! MCP23017 register map
//!
//! Eleven register families, each present once per port. Port A uses the
//! family's base address and port B the address directly after it
//! (`IOCON.BANK = 0`).

use core::fmt;
use core::str::FromStr;

use crate::Error;

/// Number of addressable registers (11 families x 2 ports)
pub const REGISTER_COUNT: usize = 22;

/// Register family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mode {
    /// IODIR: 1 = input, 0 = output
    Direction = 0x00,
    /// IPOL: 1 = GPIO reads the inverted pin level
    InputPolarity = 0x02,
    /// GPINTEN: interrupt-on-change enable
    InterruptEnable = 0x04,
    /// DEFVAL: compare value for interrupt-on-change
    DefaultValue = 0x06,
    /// INTCON: 1 = compare against DEFVAL, 0 = against previous value
    InterruptControl = 0x08,
    /// IOCON: chip configuration
    Configuration = 0x0A,
    /// GPPU: 100k pull-up enable
    PullUp = 0x0C,
    /// INTF: interrupt flags (read-only)
    InterruptFlag = 0x0E,
    /// INTCAP: port value captured at interrupt (read-only)
    InterruptCaptured = 0x10,
    /// GPIO: port level
    Gpio = 0x12,
    /// OLAT: output latches
    OutputLatch = 0x14,
}

impl Mode {
    /// All families in address order
    pub const ALL: [Mode; 11] = [
        Mode::Direction,
        Mode::InputPolarity,
        Mode::InterruptEnable,
        Mode::DefaultValue,
        Mode::InterruptControl,
        Mode::Configuration,
        Mode::PullUp,
        Mode::InterruptFlag,
        Mode::InterruptCaptured,
        Mode::Gpio,
        Mode::OutputLatch,
    ];

    /// Port A address of this family
    pub const fn base(self) -> u8 {
        self as u8
    }

    /// Datasheet name without the port suffix
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Mode::Direction => "IODIR",
            Mode::InputPolarity => "IPOL",
            Mode::InterruptEnable => "GPINTEN",
            Mode::DefaultValue => "DEFVAL",
            Mode::InterruptControl => "INTCON",
            Mode::Configuration => "IOCON",
            Mode::PullUp => "GPPU",
            Mode::InterruptFlag => "INTF",
            Mode::InterruptCaptured => "INTCAP",
            Mode::Gpio => "GPIO",
            Mode::OutputLatch => "OLAT",
        }
    }

    /// Value the driver writes on reset.
    ///
    /// Direction resets to all inputs; everything else to zero.
    pub const fn reset_value(self) -> u8 {
        match self {
            Mode::Direction => 0xFF,
            _ => 0x00,
        }
    }

    /// The register of this family on `port`
    pub const fn register(self, port: Port) -> Register {
        Register::new(self, port)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Direction => "direction",
            Mode::InputPolarity => "input polarity",
            Mode::InterruptEnable => "interrupt enable",
            Mode::DefaultValue => "default value",
            Mode::InterruptControl => "interrupt control",
            Mode::Configuration => "configuration",
            Mode::PullUp => "pull-up",
            Mode::InterruptFlag => "interrupt flag",
            Mode::InterruptCaptured => "interrupt captured",
            Mode::Gpio => "gpio",
            Mode::OutputLatch => "output latch",
        };
        f.write_str(name)
    }
}

/// GPIO port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    A,
    B,
}

impl Port {
    pub const ALL: [Port; 2] = [Port::A, Port::B];

    /// Offset added to a family's base address
    pub const fn offset(self) -> u8 {
        match self {
            Port::A => 0,
            Port::B => 1,
        }
    }

    pub const fn letter(self) -> char {
        match self {
            Port::A => 'A',
            Port::B => 'B',
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for Port {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" | "a" => Ok(Port::A),
            "B" | "b" => Ok(Port::B),
            _ => Err(Error::InvalidPort(s.to_string())),
        }
    }
}

/// Register address of `mode` on `port`
pub const fn resolve(mode: Mode, port: Port) -> u8 {
    mode.base() + port.offset()
}

/// One physical register, named by family and port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register {
    mode: Mode,
    port: Port,
}

impl Register {
    pub const fn new(mode: Mode, port: Port) -> Self {
        Self { mode, port }
    }

    /// Look up the register at a bus address (0..=21)
    pub fn from_address(address: u8) -> Option<Self> {
        let family = Mode::ALL.get(usize::from(address / 2))?;
        let port = if address & 1 == 0 { Port::A } else { Port::B };
        Some(Self::new(*family, port))
    }

    /// All registers in address order
    pub fn all() -> impl Iterator<Item = Register> {
        (0..REGISTER_COUNT as u8).filter_map(Register::from_address)
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    pub const fn port(&self) -> Port {
        self.port
    }

    pub const fn address(&self) -> u8 {
        resolve(self.mode, self.port)
    }

    pub const fn reset_value(&self) -> u8 {
        self.mode.reset_value()
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.mode.mnemonic(), self.port)
    }
}
