//! Pin setup files
//!
//! A setup file lists pins and how they should be configured. It is applied
//! in file order after the device has been reset.
//!
//! ```toml
//! address = 0x20
//! bus = 1
//!
//! [[pin]]
//! name = "B3"
//! direction = "output"
//! value = 1
//!
//! [[pin]]
//! name = "A7"
//! direction = "input"
//! pull_up = true
//! ```

use anyhow::{bail, Context, Result};
use log::debug;
use rpi4_mcp23017::{Level, Mcp23017, PinId, Transport};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Pin direction as written in setup files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
}

/// One `[[pin]]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinEntry {
    /// Pin name, e.g. "A0" or "b7"
    pub name: String,
    pub direction: Direction,
    /// Enable the internal pull-up (inputs only)
    #[serde(default)]
    pub pull_up: bool,
    /// Invert the GPIO reading (inputs only)
    #[serde(default)]
    pub inverted: bool,
    /// Initial level, 0 or 1 (outputs only)
    pub value: Option<u8>,
}

/// A parsed and validated setup file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinSetup {
    /// Overrides `--address`
    pub address: Option<u8>,
    /// Overrides `--bus`
    pub bus: Option<u8>,
    #[serde(default, rename = "pin")]
    pub pins: Vec<PinEntry>,
}

/// A setup step resolved to a concrete pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Input { pin: PinId, pull_up: bool, inverted: bool },
    Output { pin: PinId, value: Option<Level> },
}

impl PinSetup {
    /// Load and validate a setup file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read setup file: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Invalid setup file: {}", path.display()))
    }

    /// Parse setup file content
    pub fn parse(content: &str) -> Result<Self> {
        let setup: PinSetup = toml::from_str(content)?;
        setup.steps()?;
        Ok(setup)
    }

    /// Resolve every entry to a step, rejecting contradictory settings
    pub fn steps(&self) -> Result<Vec<Step>> {
        let mut steps = Vec::with_capacity(self.pins.len());
        let mut seen: Vec<PinId> = Vec::new();

        if let Some(address) = self.address {
            if address > 0x7F {
                bail!("address {:#04x} does not fit in 7 bits", address);
            }
        }

        for entry in &self.pins {
            let pin: PinId = entry.name.parse()?;
            if seen.contains(&pin) {
                bail!("pin {} is listed more than once", pin);
            }
            seen.push(pin);

            let step = match entry.direction {
                Direction::Input => {
                    if entry.value.is_some() {
                        bail!("pin {}: `value` only applies to outputs", pin);
                    }
                    Step::Input {
                        pin,
                        pull_up: entry.pull_up,
                        inverted: entry.inverted,
                    }
                }
                Direction::Output => {
                    if entry.pull_up || entry.inverted {
                        bail!("pin {}: `pull_up` and `inverted` only apply to inputs", pin);
                    }
                    let value = match entry.value {
                        None => None,
                        Some(0) => Some(Level::Low),
                        Some(1) => Some(Level::High),
                        Some(other) => bail!("pin {}: value must be 0 or 1, got {}", pin, other),
                    };
                    Step::Output { pin, value }
                }
            };
            steps.push(step);
        }

        Ok(steps)
    }

    /// Configure the device pin by pin
    pub fn apply<T: Transport>(&self, device: &Mcp23017<T>) -> Result<()> {
        for step in self.steps()? {
            debug!("applying {:?}", step);
            match step {
                Step::Input { pin, pull_up, inverted } => {
                    let p = device.pin(pin);
                    p.set_input(pull_up)
                        .with_context(|| format!("Failed to make {} an input", pin))?;
                    if inverted {
                        p.set_inverted(true)
                            .with_context(|| format!("Failed to invert {}", pin))?;
                    }
                }
                Step::Output { pin, value } => {
                    let p = device.pin(pin);
                    // latch the level first so the line never glitches
                    if let Some(level) = value {
                        p.write(level)
                            .with_context(|| format!("Failed to drive {}", pin))?;
                    }
                    p.set_output()
                        .with_context(|| format!("Failed to make {} an output", pin))?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpi4_mcp23017::{Port, SimulatedChip};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
address = 0x21
bus = 0

[[pin]]
name = "B3"
direction = "output"
value = 1

[[pin]]
name = "a7"
direction = "input"
pull_up = true
"#;

    #[test]
    fn test_parse_sample() {
        let setup = PinSetup::parse(SAMPLE).unwrap();
        assert_eq!(setup.address, Some(0x21));
        assert_eq!(setup.bus, Some(0));

        let steps = setup.steps().unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Output {
                    pin: PinId::new(Port::B, 3).unwrap(),
                    value: Some(Level::High),
                },
                Step::Input {
                    pin: PinId::new(Port::A, 7).unwrap(),
                    pull_up: true,
                    inverted: false,
                },
            ]
        );
    }

    #[test]
    fn test_empty_setup() {
        let setup = PinSetup::parse("").unwrap();
        assert!(setup.address.is_none());
        assert!(setup.pins.is_empty());
    }

    #[test]
    fn test_rejects_bad_entries() {
        let bad_name = "[[pin]]\nname = \"C1\"\ndirection = \"input\"\n";
        assert!(PinSetup::parse(bad_name).is_err());

        let bad_direction = "[[pin]]\nname = \"A1\"\ndirection = \"sideways\"\n";
        assert!(PinSetup::parse(bad_direction).is_err());

        let value_on_input = "[[pin]]\nname = \"A1\"\ndirection = \"input\"\nvalue = 1\n";
        assert!(PinSetup::parse(value_on_input).is_err());

        let pull_up_on_output = "[[pin]]\nname = \"A1\"\ndirection = \"output\"\npull_up = true\n";
        assert!(PinSetup::parse(pull_up_on_output).is_err());

        let bad_value = "[[pin]]\nname = \"A1\"\ndirection = \"output\"\nvalue = 2\n";
        assert!(PinSetup::parse(bad_value).is_err());

        let duplicate = "[[pin]]\nname = \"A1\"\ndirection = \"output\"\n\n[[pin]]\nname = \"a1\"\ndirection = \"input\"\n";
        assert!(PinSetup::parse(duplicate).is_err());

        let wide_address = "address = 0x80\n";
        assert!(PinSetup::parse(wide_address).is_err());
        assert!(PinSetup::parse("address = 0x7F\n").is_ok());

        let unknown_key = "speed = 400000\n";
        assert!(PinSetup::parse(unknown_key).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let setup = PinSetup::load(file.path()).unwrap();
        assert_eq!(setup.pins.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(PinSetup::load(Path::new("/nonexistent/setup.toml")).is_err());
    }

    #[test]
    fn test_apply_to_simulated_chip() {
        let chip = SimulatedChip::new(0x20);
        let device = Mcp23017::new(chip.clone(), 0x20).unwrap();

        let setup = PinSetup::parse(
            "[[pin]]\nname = \"B3\"\ndirection = \"output\"\nvalue = 1\n\n\
             [[pin]]\nname = \"A7\"\ndirection = \"input\"\npull_up = true\ninverted = true\n",
        )
        .unwrap();
        setup.apply(&device).unwrap();

        // IODIRB, GPIOB
        assert_eq!(chip.register(0x01), 0b1111_0111);
        assert_eq!(chip.register(0x13), 0b0000_1000);
        // IODIRA, IPOLA, GPPUA
        assert_eq!(chip.register(0x00), 0xFF);
        assert_eq!(chip.register(0x02), 0x80);
        assert_eq!(chip.register(0x0C), 0x80);
    }
}
