//! Per-port pin collections

use core::ops::Index;
use std::rc::Weak;

use heapless::Vec;
use log::warn;

use crate::bus::{SharedBus, Transport};
use crate::pin::{Pin, PinId};
use crate::register::{resolve, Mode, Port};
use crate::{Error, Result};

/// Lines per port
pub const PINS_PER_PORT: usize = 8;

/// The pins of one port, in registration order
pub struct Pins<T> {
    port: Port,
    bus: Weak<SharedBus<T>>,
    pins: Vec<Pin<T>, PINS_PER_PORT>,
}

impl<T> Pins<T> {
    pub(crate) fn new(port: Port, bus: Weak<SharedBus<T>>) -> Self {
        Self {
            port,
            bus,
            pins: Vec::new(),
        }
    }

    /// Register pin `index` of this port.
    ///
    /// Once eight pins are held further calls are ignored and return
    /// `false`, as are indices above 7.
    pub fn append(&mut self, index: u8) -> bool {
        if self.pins.is_full() {
            warn!("port {} already holds {} pins, ignoring {}", self.port, PINS_PER_PORT, index);
            return false;
        }
        let Some(id) = PinId::new(self.port, index) else {
            warn!("port {} has no pin {}", self.port, index);
            return false;
        };
        self.pins.push(Pin::new(id, self.bus.clone())).is_ok()
    }

    pub fn port(&self) -> Port {
        self.port
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Pin<T>> {
        self.pins.get(position)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Pin<T>> {
        self.pins.iter()
    }
}

impl<T: Transport> Pins<T> {
    fn bus(&self) -> Result<std::rc::Rc<SharedBus<T>>> {
        self.bus.upgrade().ok_or(Error::BusClosed)
    }

    /// Whole-port GPIO read, bit n = pin n
    pub fn read_all(&self) -> Result<u8> {
        self.bus()?.read(resolve(Mode::Gpio, self.port))
    }

    /// Whole-port GPIO write in a single transaction
    pub fn write_all(&self, value: u8) -> Result<()> {
        self.bus()?.write(resolve(Mode::Gpio, self.port), value)
    }
}

impl<T> Index<usize> for Pins<T> {
    type Output = Pin<T>;

    fn index(&self, position: usize) -> &Pin<T> {
        &self.pins[position]
    }
}

impl<'a, T> IntoIterator for &'a Pins<T> {
    type Item = &'a Pin<T>;
    type IntoIter = core::slice::Iter<'a, Pin<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.pins.iter()
    }
}

impl<T> core::fmt::Debug for Pins<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pins")
            .field("port", &self.port)
            .field("pins", &self.pins.as_slice())
            .finish()
    }
}
