//! In-memory MCP23017
//!
//! Register-level model of the chip for running the driver without
//! hardware. Clones share the same register file, so a test (or the debug
//! tool) can keep a handle to the chip after moving one into a device.
//!
//! Differences from silicon: GPIO reads return the last value written to
//! GPIO or set with [`SimulatedChip::set_register`]; no pin is ever driven
//! externally. A write to GPIO also lands in OLAT, as on the real part.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bus::{Transport, TransportError};
use crate::register::{resolve, Mode, Port, Register, REGISTER_COUNT};

/// A completed bus transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    Read { register: u8, value: u8 },
    Write { register: u8, value: u8 },
}

impl BusOp {
    pub fn register(&self) -> u8 {
        match *self {
            BusOp::Read { register, .. } | BusOp::Write { register, .. } => register,
        }
    }
}

#[derive(Debug)]
struct ChipState {
    registers: [u8; REGISTER_COUNT],
    log: Vec<BusOp>,
    fail_next_read: bool,
    fail_next_write: bool,
    closes: usize,
}

/// Simulated chip answering at one device address
#[derive(Debug, Clone)]
pub struct SimulatedChip {
    address: u8,
    state: Rc<RefCell<ChipState>>,
}

impl SimulatedChip {
    /// A chip in its power-on state
    pub fn new(address: u8) -> Self {
        let mut registers = [0u8; REGISTER_COUNT];
        for reg in Register::all() {
            registers[usize::from(reg.address())] = reg.reset_value();
        }
        Self {
            address,
            state: Rc::new(RefCell::new(ChipState {
                registers,
                log: Vec::new(),
                fail_next_read: false,
                fail_next_write: false,
                closes: 0,
            })),
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Current register value, without a bus transaction
    ///
    /// # Panics
    ///
    /// If `register` is 22 or above.
    pub fn register(&self, register: u8) -> u8 {
        self.state.borrow().registers[usize::from(register)]
    }

    pub fn registers(&self) -> [u8; REGISTER_COUNT] {
        self.state.borrow().registers
    }

    /// Overwrite a register, without a bus transaction
    ///
    /// # Panics
    ///
    /// If `register` is 22 or above.
    pub fn set_register(&self, register: u8, value: u8) {
        self.state.borrow_mut().registers[usize::from(register)] = value;
    }

    /// Make the next read fail with [`TransportError::NoResponse`]
    pub fn fail_next_read(&self) {
        self.state.borrow_mut().fail_next_read = true;
    }

    /// Make the next write fail with [`TransportError::NoResponse`]
    pub fn fail_next_write(&self) {
        self.state.borrow_mut().fail_next_write = true;
    }

    /// Completed transactions, oldest first
    pub fn transactions(&self) -> Vec<BusOp> {
        self.state.borrow().log.clone()
    }

    pub fn clear_log(&self) {
        self.state.borrow_mut().log.clear();
    }

    /// How many times a handle to this chip has been closed
    pub fn close_count(&self) -> usize {
        self.state.borrow().closes
    }

    fn check(&self, address: u8, register: u8) -> Result<usize, TransportError> {
        if address != self.address {
            return Err(TransportError::NoResponse);
        }
        let index = usize::from(register);
        if index >= REGISTER_COUNT {
            return Err(TransportError::InvalidRegister(register));
        }
        Ok(index)
    }
}

impl Transport for SimulatedChip {
    fn read_byte(&mut self, address: u8, register: u8) -> Result<u8, TransportError> {
        let index = self.check(address, register)?;
        let mut state = self.state.borrow_mut();
        if std::mem::take(&mut state.fail_next_read) {
            return Err(TransportError::NoResponse);
        }
        let value = state.registers[index];
        state.log.push(BusOp::Read { register, value });
        Ok(value)
    }

    fn write_byte(&mut self, address: u8, register: u8, value: u8) -> Result<(), TransportError> {
        let index = self.check(address, register)?;
        let mut state = self.state.borrow_mut();
        if std::mem::take(&mut state.fail_next_write) {
            return Err(TransportError::NoResponse);
        }
        state.registers[index] = value;
        if let Some(reg) = Register::from_address(register) {
            if reg.mode() == Mode::Gpio {
                let latch = resolve(Mode::OutputLatch, reg.port());
                state.registers[usize::from(latch)] = value;
            }
        }
        state.log.push(BusOp::Write { register, value });
        Ok(())
    }

    fn close(&mut self) {
        self.state.borrow_mut().closes += 1;
    }
}

/// Port A GPIO address, handy in tests
pub const GPIOA: u8 = resolve(Mode::Gpio, Port::A);
/// Port B GPIO address, handy in tests
pub const GPIOB: u8 = resolve(Mode::Gpio, Port::B);
