#[cfg(test)]
#[macro_use]
extern crate assert_matches;
extern crate byteorder;
#[macro_use]
extern crate log;

pub mod core;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// Indicates an error where a buffer is too small or too large.
    Exhausted,
    /// Indicates an error where a packet or frame is malformed.
    Malformed,
    /// Indicates an error where a checksum is invalid.
    Checksum,
    /// Indicates well formed input that was deliberately not acted upon.
    Ignored,
}

pub type Result<T> = std::result::Result<T, Error>;
