//! I2C transport for register access
//!
//! The driver only ever needs two transactions:
//!
//! | Operation | Bytes on the wire                       |
//! |-----------|-----------------------------------------|
//! | read      | `S addr+W reg Sr addr+R [data] P`       |
//! | write     | `S addr+W reg data P`                   |
//!
//! `Transport` captures exactly that, so the chip logic can run over a real
//! bus, a mock, or the in-memory [`SimulatedChip`](crate::SimulatedChip).

use core::cell::RefCell;

use embedded_hal::i2c::{ErrorKind, I2c};
use log::trace;

use crate::{Error, Result};

/// Failure of a single bus transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Nothing acknowledged the address, or no data came back
    #[error("device did not respond")]
    NoResponse,

    /// The device answered but has no register at that address
    #[error("no register at address {0:#04x}")]
    InvalidRegister(u8),

    /// Any other I2C controller error
    #[error("I2C transfer failed: {0:?}")]
    I2c(ErrorKind),
}

impl TransportError {
    fn from_i2c<E: embedded_hal::i2c::Error>(error: E) -> Self {
        match error.kind() {
            ErrorKind::NoAcknowledge(_) => TransportError::NoResponse,
            kind => TransportError::I2c(kind),
        }
    }
}

/// Single-byte register access on a two-wire bus
pub trait Transport {
    /// Read one register of the device at `address`
    fn read_byte(&mut self, address: u8, register: u8) -> core::result::Result<u8, TransportError>;

    /// Write one register of the device at `address`
    fn write_byte(
        &mut self,
        address: u8,
        register: u8,
        value: u8,
    ) -> core::result::Result<(), TransportError>;

    /// Release the bus handle. Called once, right before the transport is dropped.
    fn close(&mut self) {}
}

/// Lets callers pick the transport at runtime (`Box<dyn Transport>`)
impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read_byte(&mut self, address: u8, register: u8) -> core::result::Result<u8, TransportError> {
        (**self).read_byte(address, register)
    }

    fn write_byte(
        &mut self,
        address: u8,
        register: u8,
        value: u8,
    ) -> core::result::Result<(), TransportError> {
        (**self).write_byte(address, register, value)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

// ============================================================================
// EMBEDDED-HAL ADAPTER
// ============================================================================

/// [`Transport`] over any `embedded-hal` I2C bus
pub struct I2cTransport<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> I2cTransport<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Give the underlying bus back
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> Transport for I2cTransport<I2C> {
    fn read_byte(&mut self, address: u8, register: u8) -> core::result::Result<u8, TransportError> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(address, &[register], &mut buffer)
            .map_err(TransportError::from_i2c)?;
        Ok(buffer[0])
    }

    fn write_byte(
        &mut self,
        address: u8,
        register: u8,
        value: u8,
    ) -> core::result::Result<(), TransportError> {
        self.i2c
            .write(address, &[register, value])
            .map_err(TransportError::from_i2c)
    }
}

/// Linux `/dev/i2c-N` bus
#[cfg(feature = "linux")]
pub type LinuxBus = I2cTransport<linux_embedded_hal::I2cdev>;

#[cfg(feature = "linux")]
impl I2cTransport<linux_embedded_hal::I2cdev> {
    /// Open `/dev/i2c-<bus>`
    pub fn open(bus: u8) -> Result<Self> {
        let path = format!("/dev/i2c-{}", bus);
        let i2c = linux_embedded_hal::I2cdev::new(&path).map_err(|e| Error::BusOpen {
            bus,
            reason: e.to_string(),
        })?;
        log::debug!("opened {}", path);
        Ok(Self::new(i2c))
    }
}

// ============================================================================
// SHARED HANDLE
// ============================================================================

/// Bus handle owned by a device and borrowed by its pins.
///
/// `None` once the handle has been released.
pub(crate) struct SharedBus<T> {
    address: u8,
    transport: RefCell<Option<T>>,
}

impl<T: Transport> SharedBus<T> {
    pub(crate) fn new(transport: T, address: u8) -> Self {
        Self {
            address,
            transport: RefCell::new(Some(transport)),
        }
    }

    pub(crate) fn address(&self) -> u8 {
        self.address
    }

    pub(crate) fn is_live(&self) -> bool {
        self.transport.borrow().is_some()
    }

    pub(crate) fn read(&self, register: u8) -> Result<u8> {
        let mut slot = self.transport.borrow_mut();
        let transport = slot.as_mut().ok_or(Error::BusClosed)?;
        let value = transport
            .read_byte(self.address, register)
            .map_err(|source| Error::BusRead {
                address: self.address,
                register,
                source,
            })?;
        trace!("[{:#04x}] read  {:#04x} -> {:#04x}", self.address, register, value);
        Ok(value)
    }

    pub(crate) fn write(&self, register: u8, value: u8) -> Result<()> {
        let mut slot = self.transport.borrow_mut();
        let transport = slot.as_mut().ok_or(Error::BusClosed)?;
        transport
            .write_byte(self.address, register, value)
            .map_err(|source| Error::BusWrite {
                address: self.address,
                register,
                source,
            })?;
        trace!("[{:#04x}] write {:#04x} <- {:#04x}", self.address, register, value);
        Ok(())
    }

    /// Read `register`, pass it through `edit`, write the result back
    pub(crate) fn modify(&self, register: u8, edit: impl FnOnce(u8) -> u8) -> Result<()> {
        let current = self.read(register)?;
        self.write(register, edit(current))
    }

    /// Take the handle out and close it. Returns false if already released.
    pub(crate) fn release(&self) -> bool {
        let taken = self.transport.borrow_mut().take();
        match taken {
            Some(mut transport) => {
                transport.close();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::NoAcknowledgeSource;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    #[test]
    fn test_read_byte_uses_write_read() {
        let expectations = [I2cTransaction::write_read(0x20, vec![0x12], vec![0xA5])];
        let mut i2c = I2cMock::new(&expectations);

        let mut transport = I2cTransport::new(i2c.clone());
        assert_eq!(transport.read_byte(0x20, 0x12).unwrap(), 0xA5);

        i2c.done();
    }

    #[test]
    fn test_write_byte_sends_register_then_value() {
        let expectations = [I2cTransaction::write(0x21, vec![0x01, 0xFE])];
        let mut i2c = I2cMock::new(&expectations);

        let mut transport = I2cTransport::new(i2c.clone());
        transport.write_byte(0x21, 0x01, 0xFE).unwrap();

        i2c.done();
    }

    #[test]
    fn test_nack_maps_to_no_response() {
        let expectations = [I2cTransaction::write_read(0x20, vec![0x00], vec![0x00])
            .with_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))];
        let mut i2c = I2cMock::new(&expectations);

        let mut transport = I2cTransport::new(i2c.clone());
        assert_eq!(transport.read_byte(0x20, 0x00), Err(TransportError::NoResponse));

        i2c.done();
    }

    #[test]
    fn test_other_errors_keep_kind() {
        let expectations =
            [I2cTransaction::write(0x20, vec![0x12, 0x01]).with_error(ErrorKind::ArbitrationLoss)];
        let mut i2c = I2cMock::new(&expectations);

        let mut transport = I2cTransport::new(i2c.clone());
        assert_eq!(
            transport.write_byte(0x20, 0x12, 0x01),
            Err(TransportError::I2c(ErrorKind::ArbitrationLoss))
        );

        i2c.done();
    }

    #[test]
    fn test_shared_bus_wraps_errors_with_register() {
        let expectations =
            [I2cTransaction::write_read(0x20, vec![0x13], vec![0x00]).with_error(ErrorKind::Bus)];
        let mut i2c = I2cMock::new(&expectations);

        let bus = SharedBus::new(I2cTransport::new(i2c.clone()), 0x20);
        match bus.read(0x13) {
            Err(Error::BusRead { address, register, source }) => {
                assert_eq!(address, 0x20);
                assert_eq!(register, 0x13);
                assert_eq!(source, TransportError::I2c(ErrorKind::Bus));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        i2c.done();
    }

    #[test]
    fn test_release_once() {
        let expectations: [I2cTransaction; 0] = [];
        let mut i2c = I2cMock::new(&expectations);
        let bus = SharedBus::new(I2cTransport::new(i2c.clone()), 0x20);

        assert!(bus.is_live());
        assert!(bus.release());
        assert!(!bus.is_live());
        assert!(!bus.release());
        assert!(matches!(bus.read(0x00), Err(Error::BusClosed)));
        assert!(matches!(bus.write(0x00, 0xFF), Err(Error::BusClosed)));

        i2c.done();
    }
}
