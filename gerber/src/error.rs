//! Error types returned by the core interpreter and serializer.

use thiserror::Error;

/// Errors produced while parsing a Gerber stream or serializing a
/// [`crate::processor::Processor`].
///
/// Every variant carries the 1-based source line number of the offending
/// block, per the error contract in the specification: errors are fatal to
/// the current call and the interpreter does not attempt local recovery.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GerberError {
    /// The lexer/parser could not form a valid block, or a numeric field
    /// could not be parsed.
    #[error("line {line}: malformed input: {message}")]
    MalformedInput {
        /// 1-based source line number of the offending block.
        line: usize,
        /// Human readable detail.
        message: String,
    },

    /// A `Dnn` command referenced an aperture that has not been defined.
    #[error("line {line}: undefined aperture D{code}")]
    UndefinedAperture {
        /// 1-based source line number of the offending block.
        line: usize,
        /// The D-code that was referenced.
        code: i32,
    },

    /// A block was well-formed but invalid given the current graphics
    /// state (coordinate data before `FS`/`MO`, `D03` inside a region, a
    /// region with fewer than 3 edges, an arc endpoint inconsistent with
    /// `I`/`J`, and so on).
    #[error("line {line}: invalid state: {message}")]
    InvalidState {
        /// 1-based source line number of the offending block.
        line: usize,
        /// Human readable detail.
        message: String,
    },

    /// A construct outside the supported subset (aperture macros,
    /// step-and-repeat, block apertures with rotation/mirroring).
    #[error("line {line}: unsupported: {message}")]
    Unsupported {
        /// 1-based source line number of the offending block.
        line: usize,
        /// Human readable detail.
        message: String,
    },

    /// Failure reading from the input stream or writing to the output
    /// stream. Carries no line number since it is not tied to a block.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for GerberError {
    fn from(err: std::io::Error) -> Self {
        GerberError::Io(err.to_string())
    }
}
