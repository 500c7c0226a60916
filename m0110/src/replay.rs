//! A [`Port`] that plays back recorded keyboard responses.
//!
//! Key event commands (Inquiry, Instant) consume the recording one byte per
//! reply and get [`NULL`](crate::event::NULL) once it runs out. Model and
//! Test are answered from fixed values, as a healthy M0110A would.

use heapless::HistoryBuffer;

use crate::command::{Command, Model, ACK};
use crate::error::Error;
use crate::event::NULL;
use crate::transport::Port;

pub struct ReplayPort<'a> {
    responses: &'a [u8],
    pos: usize,
    model: Model,
    pending: Option<u8>,
    sent: HistoryBuffer<u8, 16>,
}

impl<'a> ReplayPort<'a> {
    pub fn new(responses: &'a [u8]) -> Self {
        Self {
            responses,
            pos: 0,
            model: Model::M0110A,
            pending: None,
            sent: HistoryBuffer::new(),
        }
    }

    /// Answer Model queries with `model` instead of the M0110A default.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// All recorded key event bytes have been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.responses.len()
    }

    /// Number of recorded bytes handed out so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The most recent commands, oldest first.
    pub fn recent_commands(&self) -> impl Iterator<Item = u8> + '_ {
        self.sent.oldest_ordered().copied()
    }

    fn next_event(&mut self) -> u8 {
        match self.responses.get(self.pos) {
            Some(&byte) => {
                self.pos += 1;
                byte
            }
            None => NULL,
        }
    }
}

impl Port for ReplayPort<'_> {
    fn send(&mut self, byte: u8) -> Result<(), Error> {
        self.sent.write(byte);
        self.pending = Some(byte);
        Ok(())
    }

    fn receive(&mut self) -> Result<u8, Error> {
        let command = self.pending.take().ok_or(Error::ReceiveStart)?;
        Ok(match command {
            c if c == Command::Inquiry as u8 || c == Command::Instant as u8 => self.next_event(),
            c if c == Command::Model as u8 => self.model.byte(),
            c if c == Command::Test as u8 => ACK,
            _ => NULL,
        })
    }
}
