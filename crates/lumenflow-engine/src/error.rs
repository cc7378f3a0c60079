//! Error types for the engine
use lumenflow_proto::PortAddress;
use thiserror::Error;

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Packet encode/decode error
    #[error("codec error: {0}")]
    Proto(#[from] lumenflow_proto::ProtoError),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Operation on a port address that was never registered
    #[error("port address {0} is not registered")]
    UnknownPort(PortAddress),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
