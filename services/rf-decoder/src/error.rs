//! Rejection reasons and input notation errors

use thiserror::Error;

/// Why a decoder turned a packet down.
///
/// These are routine outcomes, not failures of the program: radio data is
/// noisy and most packets offered to a decoder belong to some other device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Rejection {
    /// Structurally wrong packet (row count, missing repeats)
    #[error("wrong number of rows or no repeated row")]
    AbortEarly,

    /// Row too short or of the wrong bit length
    #[error("wrong bit length")]
    AbortLength,

    /// Preamble or sync pattern not present in the row
    #[error("pattern not found")]
    PatternNotFound,

    /// A fixed field or framing invariant did not hold
    #[error("sanity check failed")]
    FailSanity,

    /// Checksum or CRC mismatch
    #[error("integrity check failed")]
    FailIntegrity,
}

impl Rejection {
    /// Integer status code in the conventional decoder numbering
    pub fn code(self) -> i32 {
        match self {
            Self::AbortLength => -1,
            Self::AbortEarly | Self::PatternNotFound => -2,
            Self::FailIntegrity => -3,
            Self::FailSanity => -4,
        }
    }
}

/// Errors parsing the `{bits}hex` row notation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BitRowParseError {
    #[error("unterminated bit length prefix")]
    UnterminatedLength,

    #[error("invalid bit length: {0}")]
    InvalidLength(String),

    #[error("invalid hex digits: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("row declares {declared} bits but carries only {available}")]
    TooShort { declared: usize, available: usize },

    #[error("empty packet")]
    EmptyPacket,
}
