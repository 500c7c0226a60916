//! The four host commands and what the keyboard says back.

use core::fmt;

use log::{info, warn};

use crate::error::Error;
use crate::transport::Port;

/// One-byte host commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// Ask for a key event. The keyboard may sit on it for up to ~500ms
    /// before answering, with [`event::NULL`](crate::event::NULL) if nothing
    /// happened.
    Inquiry = 0x10,
    /// Ask for a key event and answer right away.
    Instant = 0x12,
    /// Ask for the model byte.
    Model = 0x14,
    /// Self test, answered with ACK or NAK.
    Test = 0x16,
}

/// Self-test passed.
pub const ACK: u8 = 0x7D;
/// Self-test failed.
pub const NAK: u8 = 0x77;

/// Decoded model byte.
///
/// ```text
/// bit 7    another device is chained behind the keyboard
/// bit 4-6  model number of that device
/// bit 1-3  keyboard model number
/// bit 0    always 1
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Model(u8);

impl Model {
    pub const M0110: Model = Model(0x09);
    pub const M0110A: Model = Model(0x0B);

    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    pub const fn byte(self) -> u8 {
        self.0
    }

    /// Bit 0 is set on every well-formed model byte.
    pub const fn is_valid(self) -> bool {
        self.0 & 0x01 != 0
    }

    pub const fn keyboard(self) -> u8 {
        (self.0 >> 1) & 0x07
    }

    pub const fn next_device(self) -> u8 {
        (self.0 >> 4) & 0x07
    }

    pub const fn chained(self) -> bool {
        self.0 & 0x80 != 0
    }

    pub fn name(self) -> Option<&'static str> {
        match self {
            Model::M0110 => Some("M0110"),
            Model::M0110A => Some("M0110A"),
            _ => None,
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Model({:02X}", self.0)?;
        if let Some(name) = self.name() {
            write!(f, " {name}")?;
        }
        write!(f, " kbd={} next={}", self.keyboard(), self.next_device())?;
        if self.chained() {
            write!(f, " chained")?;
        }
        write!(f, ")")
    }
}

/// Answer to [`Command::Test`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTest {
    Ack,
    Nak,
    Unknown(u8),
}

impl From<u8> for SelfTest {
    fn from(byte: u8) -> Self {
        match byte {
            ACK => SelfTest::Ack,
            NAK => SelfTest::Nak,
            other => SelfTest::Unknown(other),
        }
    }
}

/// A keyboard at the other end of a [`Port`].
pub struct Keyboard<P> {
    port: P,
}

impl<P: Port> Keyboard<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn into_port(self) -> P {
        self.port
    }

    /// Let the keyboard power up before talking to it.
    pub fn power_up(&mut self) {
        self.port.power_up();
    }

    /// Send `command` and read the reply. If the command never got through
    /// there is nothing to read, so the receive is skipped.
    pub fn query(&mut self, command: Command) -> Result<u8, Error> {
        self.port.send(command as u8)?;
        self.port.receive()
    }

    /// Instant receive: the reply to [`Command::Instant`].
    pub fn inst_recv(&mut self) -> Result<u8, Error> {
        self.query(Command::Instant)
    }

    /// Read and log the model byte.
    pub fn model(&mut self) -> Result<Model, Error> {
        let model = Model::from_byte(self.query(Command::Model)?);
        if model.is_valid() {
            info!("m0110 model: {model:?}");
        } else {
            warn!("m0110 model: malformed byte {:02X}", model.byte());
        }
        Ok(model)
    }

    /// Run and log the self test.
    pub fn self_test(&mut self) -> Result<SelfTest, Error> {
        let result = SelfTest::from(self.query(Command::Test)?);
        match result {
            SelfTest::Ack => info!("m0110 test: ACK"),
            SelfTest::Nak => warn!("m0110 test: NAK"),
            SelfTest::Unknown(byte) => warn!("m0110 test: unexpected {byte:02X}"),
        }
        Ok(result)
    }
}
