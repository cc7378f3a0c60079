//! Per-message encode/decode
//!
//! Every message begins with the shared `"Art-Net\0"` header and a
//! little-endian opcode; decoding a buffer as the wrong message type fails
//! with a typed error. Reserved and padding bytes are written as zeros and
//! skipped on read, so `decode(encode(x))` reproduces every field a caller
//! can observe without being byte-identical on padding.

pub mod dmx;
pub mod misc;
pub mod poll;
pub mod poll_reply;

pub use dmx::ArtDmx;
pub use misc::{ArtCommand, ArtDiagData, ArtIpProgReply, ArtTimeCode, ArtTrigger, TimeCodeType};
pub use poll::ArtPoll;
pub use poll_reply::ArtPollReply;
