//! Error types for the Art-Net codec
use thiserror::Error;

/// Codec errors
#[derive(Error, Debug)]
pub enum ProtoError {
    /// Packet does not start with the "Art-Net\0" header
    #[error("not an Art-Net packet, header is {0:?}")]
    InvalidHeader(Vec<u8>),

    /// Packet carries a different opcode than the decoder expects
    #[error("expected opcode {expected:#06x}, but packet has {actual:#06x}")]
    OpCodeMismatch {
        /// Opcode the decoder was invoked for
        expected: u16,
        /// Opcode found in the packet
        actual: u16,
    },

    /// Packet ended before all fields could be read
    #[error("packet truncated: needed {needed} more bytes at offset {offset}")]
    Truncated {
        /// Byte offset where reading stopped
        offset: usize,
        /// Bytes still required
        needed: usize,
    },

    /// A field carries a value outside its legal range
    #[error("invalid field value: {0}")]
    InvalidValue(String),
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, ProtoError>;
