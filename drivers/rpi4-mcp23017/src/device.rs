//! MCP23017 device lifecycle
//!
//! ```text
//!            new()/open()                 close() or drop
//! Uninitialized ──reset──register──> Ready ──reset──release──> Closed
//! ```
//!
//! Reset writes 0xFF to IODIRA/IODIRB (all sixteen lines inputs) and 0x00 to
//! the other twenty registers, in address order. A failed write stops the
//! sequence there.

use std::rc::Rc;

use log::{debug, warn};

use crate::bus::{SharedBus, Transport};
use crate::pin::{Pin, PinId};
use crate::port::{Pins, PINS_PER_PORT};
use crate::register::{Port, Register, REGISTER_COUNT};
use crate::Result;

/// Device address for the given A0-A2 strap levels
pub const fn address_from_pins(a0: bool, a1: bool, a2: bool) -> u8 {
    crate::ADDRESS_MIN | ((a2 as u8) << 2) | ((a1 as u8) << 1) | (a0 as u8)
}

/// One MCP23017 on the bus
pub struct Mcp23017<T: Transport> {
    bus: Rc<SharedBus<T>>,
    a: Pins<T>,
    b: Pins<T>,
}

impl<T: Transport> Mcp23017<T> {
    /// Take ownership of `transport`, reset the chip at `address` and
    /// register all sixteen pins.
    ///
    /// The address is not range-checked; a wrong one shows up as a bus error
    /// from the first reset write. On failure the transport is closed.
    pub fn new(transport: T, address: u8) -> Result<Self> {
        debug!("initializing MCP23017 at {:#04x}", address);
        let bus = Rc::new(SharedBus::new(transport, address));

        if let Err(e) = reset_registers(&bus) {
            bus.release();
            return Err(e);
        }

        let mut device = Self {
            a: Pins::new(Port::A, Rc::downgrade(&bus)),
            b: Pins::new(Port::B, Rc::downgrade(&bus)),
            bus,
        };
        device.register_pins();
        Ok(device)
    }

    fn register_pins(&mut self) {
        for port in Port::ALL {
            let pins = self.port_mut(port);
            for index in 0..PINS_PER_PORT as u8 {
                pins.append(index);
            }
        }
    }

    pub fn address(&self) -> u8 {
        self.bus.address()
    }

    pub fn is_closed(&self) -> bool {
        !self.bus.is_live()
    }

    pub fn port(&self, port: Port) -> &Pins<T> {
        match port {
            Port::A => &self.a,
            Port::B => &self.b,
        }
    }

    pub fn port_mut(&mut self, port: Port) -> &mut Pins<T> {
        match port {
            Port::A => &mut self.a,
            Port::B => &mut self.b,
        }
    }

    pub fn pin(&self, id: PinId) -> &Pin<T> {
        &self.port(id.port())[usize::from(id.index())]
    }

    /// Put every register back to its reset value
    pub fn reset(&self) -> Result<()> {
        reset_registers(&self.bus)
    }

    /// Raw register read
    pub fn read_register(&self, register: u8) -> Result<u8> {
        self.bus.read(register)
    }

    /// Raw register write
    pub fn write_register(&self, register: u8, value: u8) -> Result<()> {
        self.bus.write(register, value)
    }

    /// Read all 22 registers in address order
    pub fn dump(&self) -> Result<[u8; REGISTER_COUNT]> {
        let mut registers = [0u8; REGISTER_COUNT];
        for (address, value) in registers.iter_mut().enumerate() {
            *value = self.bus.read(address as u8)?;
        }
        Ok(registers)
    }

    /// Reset the chip and release the bus.
    ///
    /// The bus is released even when the reset fails, and the reset error is
    /// returned. Calling this again is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if !self.bus.is_live() {
            return Ok(());
        }
        debug!("closing MCP23017 at {:#04x}", self.address());
        let reset = reset_registers(&self.bus);
        self.bus.release();
        reset
    }
}

#[cfg(feature = "linux")]
impl Mcp23017<crate::bus::LinuxBus> {
    /// Open `/dev/i2c-<bus>` and initialize the chip at `address`
    pub fn open(bus: u8, address: u8) -> Result<Self> {
        Self::new(crate::bus::LinuxBus::open(bus)?, address)
    }
}

impl<T: Transport> Drop for Mcp23017<T> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("MCP23017 at {:#04x} did not reset cleanly: {}", self.address(), e);
        }
    }
}

impl<T: Transport> core::fmt::Debug for Mcp23017<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Mcp23017")
            .field("address", &self.address())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn reset_registers<T: Transport>(bus: &SharedBus<T>) -> Result<()> {
    debug!("resetting registers of {:#04x}", bus.address());
    for register in Register::all() {
        bus.write(register.address(), register.reset_value())?;
    }
    Ok(())
}
