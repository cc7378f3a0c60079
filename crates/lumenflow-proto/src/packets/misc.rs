//! Smaller message types: diagnostics, commands, triggers, timecode, and
//! the ArtIpProgReply stub.

use crate::opcode::OpCode;
use crate::status::DiagnosticsPriority;
use crate::wire::{Reader, Writer, PROTOCOL_VERSION};
use crate::{error::ProtoError, Result};

/// Longest text payload in ArtDiagData and ArtCommand, including the NUL.
const MAX_TEXT: usize = 512;

/// Diagnostics text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtDiagData {
    pub priority: DiagnosticsPriority,
    /// 0 means "the whole device", 1.. address a single logical port
    pub logical_port: u8,
    pub text: String,
}

impl ArtDiagData {
    pub fn new(priority: DiagnosticsPriority, logical_port: u8, text: impl Into<String>) -> Self {
        Self {
            priority,
            logical_port,
            text: text.into(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let text = text_bytes(&self.text);
        let mut w = Writer::packet(OpCode::DiagData);
        w.u16_msb(PROTOCOL_VERSION);
        w.u8(0); // filler
        w.u8(self.priority as u8);
        w.u8(self.logical_port);
        w.u8(0); // filler
        w.u16_msb(text.len() as u16);
        w.raw(&text);
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut r = Reader::packet(buf, OpCode::DiagData)?;
        let _protocol_version = r.u16_msb()?;
        r.skip(1)?;
        let priority = DiagnosticsPriority::from_byte(r.u8()?)?;
        let logical_port = r.u8()?;
        r.skip(1)?;
        let text = read_text(&mut r)?;
        Ok(Self {
            priority,
            logical_port,
            text,
        })
    }
}

/// Free-text command, scoped by an ESTA manufacturer code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtCommand {
    pub esta: u16,
    pub command: String,
}

impl ArtCommand {
    pub fn encode(&self) -> Vec<u8> {
        let text = text_bytes(&self.command);
        let mut w = Writer::packet(OpCode::Command);
        w.u16_msb(PROTOCOL_VERSION);
        w.u16_msb(self.esta);
        w.u16_msb(text.len() as u16);
        w.raw(&text);
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut r = Reader::packet(buf, OpCode::Command)?;
        let _protocol_version = r.u16_msb()?;
        let esta = r.u16_msb()?;
        let command = read_text(&mut r)?;
        Ok(Self { esta, command })
    }
}

/// Show-control trigger keyed by OEM code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtTrigger {
    pub oem: u16,
    pub key: u8,
    pub sub_key: u8,
    /// Key-specific payload, up to 512 bytes
    pub payload: Vec<u8>,
}

impl ArtTrigger {
    pub fn encode(&self) -> Vec<u8> {
        let len = self.payload.len().min(512);
        let mut w = Writer::packet(OpCode::Trigger);
        w.u16_msb(PROTOCOL_VERSION);
        w.zeros(2); // filler
        w.u16_msb(self.oem);
        w.u8(self.key);
        w.u8(self.sub_key);
        w.raw(&self.payload[..len]);
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut r = Reader::packet(buf, OpCode::Trigger)?;
        let _protocol_version = r.u16_msb()?;
        r.skip(2)?;
        let oem = r.u16_msb()?;
        let key = r.u8()?;
        let sub_key = r.u8()?;
        let payload = r.remaining().to_vec();
        Ok(Self {
            oem,
            key,
            sub_key,
            payload,
        })
    }
}

/// Timecode flavour carried in ArtTimeCode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeCodeType {
    /// 24 fps
    Film = 0,
    /// 25 fps
    Ebu = 1,
    /// 29.97 fps drop-frame
    DropFrame = 2,
    /// 30 fps
    #[default]
    Smpte = 3,
}

/// SMPTE-style timecode broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArtTimeCode {
    pub frames: u8,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub kind: TimeCodeType,
}

impl ArtTimeCode {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::packet(OpCode::TimeCode);
        w.u16_msb(PROTOCOL_VERSION);
        w.zeros(2); // filler
        w.u8(self.frames);
        w.u8(self.seconds);
        w.u8(self.minutes);
        w.u8(self.hours);
        w.u8(self.kind as u8);
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut r = Reader::packet(buf, OpCode::TimeCode)?;
        let _protocol_version = r.u16_msb()?;
        r.skip(2)?;
        let frames = r.u8()?;
        let seconds = r.u8()?;
        let minutes = r.u8()?;
        let hours = r.u8()?;
        let kind = match r.u8()? {
            0 => TimeCodeType::Film,
            1 => TimeCodeType::Ebu,
            2 => TimeCodeType::DropFrame,
            3 => TimeCodeType::Smpte,
            other => {
                return Err(ProtoError::InvalidValue(format!(
                    "unknown timecode type {}",
                    other
                )))
            }
        };
        Ok(Self {
            frames,
            seconds,
            minutes,
            hours,
            kind,
        })
    }
}

/// ArtIpProgReply is recognized but not interpreted; node IP programming is
/// out of this engine's scope. The payload is kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArtIpProgReply {
    pub payload: Vec<u8>,
}

impl ArtIpProgReply {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::packet(OpCode::IpProgReply);
        w.raw(&self.payload);
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut r = Reader::packet(buf, OpCode::IpProgReply)?;
        Ok(Self {
            payload: r.remaining().to_vec(),
        })
    }
}

fn text_bytes(text: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = text.bytes().take(MAX_TEXT - 1).collect();
    bytes.push(0);
    bytes
}

fn read_text(r: &mut Reader<'_>) -> Result<String> {
    let length = (r.u16_msb()? as usize).min(MAX_TEXT);
    let bytes = r.bytes(length)?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}
