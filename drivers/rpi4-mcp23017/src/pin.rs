//! Individual GPIO lines
//!
//! A [`Pin`] is only an identity plus a weak handle to the device's bus.
//! Direction, level and pull-up live in the chip and are read fresh on every
//! call. Each mutating call is one register read and one register write:
//!
//! ```text
//! Pin ──resolve(mode, port)──> register ──read──> byte ──set_bit──> byte' ──write──>
//! ```
//!
//! The pair is not atomic. Two pins of the same port updated from different
//! threads can lose each other's edit; callers that share a device across
//! threads must hold one lock around it.

use core::fmt;
use core::str::FromStr;
use std::rc::{Rc, Weak};

use crate::bits::{bit_is_set, set_bit};
use crate::bus::{SharedBus, Transport};
use crate::register::{resolve, Mode, Port};
use crate::{Error, Result};

/// Logic level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Level {
    Low = 0,
    High = 1,
}

impl Level {
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    pub const fn inverted(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

impl From<Level> for bool {
    fn from(level: Level) -> Self {
        level.is_high()
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level as u8
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "0" | "low" | "off" => Ok(Level::Low),
            "1" | "high" | "on" => Ok(Level::High),
            _ => Err(Error::InvalidLevel(s.to_string())),
        }
    }
}

/// Pin identity: port and bit index 0..=7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PinId {
    port: Port,
    index: u8,
}

impl PinId {
    /// `None` if `index` is above 7
    pub const fn new(port: Port, index: u8) -> Option<Self> {
        if index < 8 {
            Some(Self { port, index })
        } else {
            None
        }
    }

    pub const fn port(&self) -> Port {
        self.port
    }

    pub const fn index(&self) -> u8 {
        self.index
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.port, self.index)
    }
}

impl FromStr for PinId {
    type Err = Error;

    /// Parses `A0`..`A7` and `B0`..`B7` (port letter in either case)
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let invalid = || Error::InvalidPin(s.to_string());
        if !s.is_ascii() || s.len() != 2 {
            return Err(invalid());
        }
        let (port, index) = s.split_at(1);
        let port: Port = port.parse().map_err(|_| invalid())?;
        let index: u8 = index.parse().map_err(|_| invalid())?;
        PinId::new(port, index).ok_or_else(invalid)
    }
}

/// One GPIO line of the expander
pub struct Pin<T> {
    id: PinId,
    bus: Weak<SharedBus<T>>,
}

impl<T> Pin<T> {
    pub(crate) fn new(id: PinId, bus: Weak<SharedBus<T>>) -> Self {
        Self { id, bus }
    }

    pub fn id(&self) -> PinId {
        self.id
    }

    pub fn port(&self) -> Port {
        self.id.port
    }

    pub fn index(&self) -> u8 {
        self.id.index
    }
}

impl<T: Transport> Pin<T> {
    fn bus(&self) -> Result<Rc<SharedBus<T>>> {
        self.bus.upgrade().ok_or(Error::BusClosed)
    }

    fn register(&self, mode: Mode) -> u8 {
        resolve(mode, self.id.port)
    }

    /// Read-edit-write this pin's bit in `mode`'s register
    fn edit(&self, mode: Mode, value: bool) -> Result<()> {
        let index = self.id.index;
        self.bus()?
            .modify(self.register(mode), |byte| set_bit(byte, index, value))
    }

    fn sample(&self, mode: Mode) -> Result<bool> {
        let byte = self.bus()?.read(self.register(mode))?;
        Ok(bit_is_set(byte, self.id.index))
    }

    // ------------------------------------------------------------------------
    // Level
    // ------------------------------------------------------------------------

    /// Sample the pin from the port's GPIO register
    pub fn read(&self) -> Result<Level> {
        self.sample(Mode::Gpio).map(Level::from)
    }

    /// Drive the pin. Only has an electrical effect on outputs.
    pub fn write(&self, level: Level) -> Result<()> {
        self.edit(Mode::Gpio, level.is_high())
    }

    /// Invert the pin's GPIO bit
    pub fn toggle(&self) -> Result<()> {
        let index = self.id.index;
        self.bus()?.modify(self.register(Mode::Gpio), |byte| {
            set_bit(byte, index, !bit_is_set(byte, index))
        })
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Set the IODIR bit. The chip uses 0 for output and 1 for input.
    pub fn set_direction(&self, output: bool) -> Result<()> {
        self.edit(Mode::Direction, !output)
    }

    /// Make the pin an input, optionally enabling the 100k pull-up.
    ///
    /// `pull_up = false` leaves GPPU as it is.
    pub fn set_input(&self, pull_up: bool) -> Result<()> {
        self.set_direction(false)?;
        if pull_up {
            self.set_pull_up(true)?;
        }
        Ok(())
    }

    pub fn set_output(&self) -> Result<()> {
        self.set_direction(true)
    }

    pub fn set_pull_up(&self, enabled: bool) -> Result<()> {
        self.edit(Mode::PullUp, enabled)
    }

    /// Set IPOL so that GPIO reads return the inverted pin level
    pub fn set_inverted(&self, inverted: bool) -> Result<()> {
        self.edit(Mode::InputPolarity, inverted)
    }

    pub fn is_output(&self) -> Result<bool> {
        self.sample(Mode::Direction).map(|input| !input)
    }
}

impl<T> fmt::Debug for Pin<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pin")
            .field("id", &self.id)
            .field("attached", &(self.bus.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{BusOp, SimulatedChip};

    const ADDR: u8 = 0x20;

    fn pin(bus: &Rc<SharedBus<SimulatedChip>>, name: &str) -> Pin<SimulatedChip> {
        Pin::new(name.parse().unwrap(), Rc::downgrade(bus))
    }

    fn setup() -> (SimulatedChip, Rc<SharedBus<SimulatedChip>>) {
        let chip = SimulatedChip::new(ADDR);
        let bus = Rc::new(SharedBus::new(chip.clone(), ADDR));
        (chip, bus)
    }

    #[test]
    fn test_pin_id_parse() {
        let id: PinId = "B3".parse().unwrap();
        assert_eq!(id.port(), Port::B);
        assert_eq!(id.index(), 3);
        assert_eq!(id.to_string(), "B3");

        assert_eq!("a7".parse::<PinId>().unwrap(), PinId::new(Port::A, 7).unwrap());
        assert!("A8".parse::<PinId>().is_err());
        assert!("C0".parse::<PinId>().is_err());
        assert!("B".parse::<PinId>().is_err());
        assert!("B10".parse::<PinId>().is_err());
        assert!(PinId::new(Port::A, 8).is_none());
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("1".parse::<Level>().unwrap(), Level::High);
        assert_eq!("LOW".parse::<Level>().unwrap(), Level::Low);
        assert!("2".parse::<Level>().is_err());
        assert_eq!(u8::from(Level::High), 1);
        assert_eq!(Level::Low.inverted(), Level::High);
    }

    #[test]
    fn test_write_is_read_then_write() {
        let (chip, bus) = setup();
        chip.set_register(0x13, 0b1000_0001);

        pin(&bus, "B3").write(Level::High).unwrap();

        assert_eq!(
            chip.transactions(),
            vec![
                BusOp::Read { register: 0x13, value: 0b1000_0001 },
                BusOp::Write { register: 0x13, value: 0b1000_1001 },
            ]
        );
    }

    #[test]
    fn test_read_reports_own_bit() {
        let (chip, bus) = setup();
        chip.set_register(0x12, 0b0100_0000);

        assert_eq!(pin(&bus, "A6").read().unwrap(), Level::High);
        assert_eq!(pin(&bus, "A5").read().unwrap(), Level::Low);
        assert_eq!(pin(&bus, "B6").read().unwrap(), Level::Low);
    }

    #[test]
    fn test_direction_polarity() {
        let (chip, bus) = setup();
        let p = pin(&bus, "A2");

        p.set_output().unwrap();
        assert_eq!(chip.register(0x00), 0b1111_1011);
        assert!(p.is_output().unwrap());

        p.set_direction(false).unwrap();
        assert_eq!(chip.register(0x00), 0xFF);
        assert!(!p.is_output().unwrap());
    }

    #[test]
    fn test_input_with_pull_up() {
        let (chip, bus) = setup();
        let p = pin(&bus, "A7");
        p.set_output().unwrap();

        p.set_input(true).unwrap();

        assert_eq!(chip.register(0x00) & 0x80, 0x80);
        assert_eq!(chip.register(12), 0x80);
    }

    #[test]
    fn test_input_without_pull_up_leaves_gppu() {
        let (chip, bus) = setup();
        chip.set_register(0x0D, 0x10);
        chip.clear_log();

        pin(&bus, "B4").set_input(false).unwrap();

        assert_eq!(chip.register(0x0D), 0x10);
        assert!(chip
            .transactions()
            .iter()
            .all(|op| op.register() == 0x01));
    }

    #[test]
    fn test_toggle() {
        let (chip, bus) = setup();
        let p = pin(&bus, "B0");

        p.toggle().unwrap();
        assert_eq!(chip.register(0x13), 0x01);
        p.toggle().unwrap();
        assert_eq!(chip.register(0x13), 0x00);
    }

    #[test]
    fn test_inverted_sets_ipol() {
        let (chip, bus) = setup();
        pin(&bus, "B5").set_inverted(true).unwrap();
        assert_eq!(chip.register(0x03), 0x20);
        assert_eq!(chip.register(0x02), 0x00);
    }

    #[test]
    fn test_failed_write_leaves_register() {
        let (chip, bus) = setup();
        chip.set_register(0x12, 0x0F);
        chip.fail_next_write();

        let result = pin(&bus, "A7").write(Level::High);

        assert!(matches!(result, Err(Error::BusWrite { register: 0x12, .. })));
        assert_eq!(chip.register(0x12), 0x0F);
    }

    #[test]
    fn test_failed_read_skips_write() {
        let (chip, bus) = setup();
        chip.fail_next_read();

        let result = pin(&bus, "A0").set_output();

        assert!(matches!(result, Err(Error::BusRead { register: 0x00, .. })));
        assert!(chip.transactions().is_empty());
    }

    #[test]
    fn test_detached_pin() {
        let (chip, bus) = setup();
        let p = pin(&bus, "A0");
        drop(bus);

        assert!(matches!(p.read(), Err(Error::BusClosed)));
        assert!(chip.transactions().is_empty());
    }
}
