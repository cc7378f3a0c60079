//! ArtDmx: one universe's channel data

use crate::address::PortAddress;
use crate::opcode::OpCode;
use crate::wire::{Reader, Writer, PROTOCOL_VERSION};
use crate::{error::ProtoError, Result};

/// Maximum channels in one DMX universe
pub const DMX_UNIVERSE_SIZE: usize = 512;

/// One frame of channel data for a single port address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtDmx {
    /// 1-255 when sequencing is enabled; 0 means "sequencing disabled"
    pub sequence: u8,
    /// Physical input port the data originated from
    pub physical: u8,
    pub port_address: PortAddress,
    /// Channel values, up to 512 bytes
    pub data: Vec<u8>,
}

impl ArtDmx {
    pub fn new(sequence: u8, port_address: PortAddress, data: Vec<u8>) -> Self {
        Self {
            sequence,
            physical: 0,
            port_address,
            data,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let len = self.data.len().min(DMX_UNIVERSE_SIZE);
        let mut w = Writer::packet(OpCode::Dmx);
        w.u16_msb(PROTOCOL_VERSION);
        w.u8(self.sequence);
        w.u8(self.physical);
        w.u16_lsb(self.port_address.to_wire());
        w.u16_msb(len as u16);
        w.raw(&self.data[..len]);
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut r = Reader::packet(buf, OpCode::Dmx)?;
        let _protocol_version = r.u16_msb()?;
        let sequence = r.u8()?;
        let physical = r.u8()?;
        let port_address = PortAddress::from_wire(r.u16_lsb()?);
        let length = r.u16_msb()? as usize;
        if length > DMX_UNIVERSE_SIZE {
            return Err(ProtoError::InvalidValue(format!(
                "DMX length {} exceeds {}",
                length, DMX_UNIVERSE_SIZE
            )));
        }
        let data = r.bytes(length)?.to_vec();
        Ok(Self {
            sequence,
            physical,
            port_address,
            data,
        })
    }
}
