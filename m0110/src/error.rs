//! Transport error types

use thiserror::Error;

/// A line did not reach the expected level in time.
///
/// One variant per wait site. [`Error::code`] gives the numeric code the
/// converter has always reported for each site, which is what shows up in
/// logs.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("send: keyboard did not answer the request to send")]
    SendStart,

    #[error("send: clock stayed high before bit {bit}")]
    SendClockLow { bit: u8 },

    #[error("send: clock stayed low after bit {bit}")]
    SendClockHigh { bit: u8 },

    #[error("receive: keyboard did not start clocking")]
    ReceiveStart,

    #[error("receive: clock stayed high before bit {bit}")]
    ReceiveClockLow { bit: u8 },

    #[error("receive: clock stayed low during bit {bit}")]
    ReceiveClockHigh { bit: u8 },
}

impl Error {
    /// Diagnostic code of the wait site.
    pub fn code(&self) -> u8 {
        match self {
            Error::SendStart | Error::ReceiveStart => 1,
            Error::ReceiveClockLow { .. } => 2,
            Error::SendClockLow { .. } | Error::ReceiveClockHigh { .. } => 3,
            Error::SendClockHigh { .. } => 4,
        }
    }
}
