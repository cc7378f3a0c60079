//! LumenFlow Proto - Art-Net 4 Packet Codec
//!
//! Bit-exact serialization for the Art-Net lighting-control protocol:
//! - **Packets**: ArtPoll, ArtPollReply, ArtDmx, ArtDiagData, ArtCommand,
//!   ArtTrigger, ArtTimeCode, plus an opaque ArtIpProgReply stub
//! - **Value types**: [`PortAddress`] and the status bitfields nodes report
//! - **Dispatch**: [`peek_opcode`] classifies a datagram by header and
//!   opcode without fully decoding it
//!
//! Every packet starts with the 8-byte `"Art-Net\0"` header followed by a
//! little-endian opcode. Decoders fail with a typed [`ProtoError`] on
//! header or opcode mismatch; unknown opcodes are a `None` from
//! [`peek_opcode`], not an error, so foreign traffic can be ignored
//! silently.

/// Port address value type
pub mod address;
/// Error types
pub mod error;
/// Opcode table
pub mod opcode;
/// Message encode/decode
pub mod packets;
/// Status bitfields and wire enums
pub mod status;
/// Byte-level primitives and constants
pub mod wire;

pub use address::PortAddress;
pub use error::{ProtoError, Result};
pub use opcode::OpCode;
pub use packets::{
    ArtCommand, ArtDiagData, ArtDmx, ArtIpProgReply, ArtPoll, ArtPollReply, ArtTimeCode,
    ArtTrigger, TimeCodeType,
};
pub use status::{
    BootProcess, DiagnosticsMode, DiagnosticsPriority, FailsafeState, GoodInput, GoodOutputA,
    GoodOutputB, IndicatorState, NodeReportCode, Port, PortType, ProgrammingAuthority, StyleCode,
};
pub use wire::{peek_opcode, ARTNET_HEADER, ARTNET_PORT, PROTOCOL_VERSION};
