//! ArtPollReply: node capability advertisement

use std::net::Ipv4Addr;

use crate::opcode::OpCode;
use crate::status::{
    BootProcess, FailsafeState, GoodInput, GoodOutputA, GoodOutputB, IndicatorState, Port,
    ProgrammingAuthority, StyleCode,
};
use crate::wire::{Reader, Writer, ARTNET_PORT};
use crate::Result;

/// Discovery response describing a node and its active ports.
///
/// At most 4 ports fit one reply; nodes with more send several replies with
/// incrementing bind indexes. The three packed status bytes are assembled
/// from the individual flag fields on encode and split back on decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtPollReply {
    pub source_ip: Ipv4Addr,
    /// Always 0x1936; nodes echo it so sniffers can spot misconfiguration
    pub port: u16,
    pub firmware_version: u16,
    pub net_switch: u8,
    pub sub_switch: u8,
    pub oem: u16,
    /// UBEA firmware version, when a UBEA is present
    pub ubea: Option<u8>,
    pub indicator_state: IndicatorState,
    pub programming_authority: ProgrammingAuthority,
    pub boot_process: BootProcess,
    pub supports_rdm: bool,
    pub esta: u16,
    pub short_name: String,
    pub long_name: String,
    pub node_report: String,
    /// Up to 4 port descriptors
    pub ports: Vec<Port>,
    pub acn_priority: u8,
    pub sw_macro: u8,
    pub sw_remote: u8,
    pub style: StyleCode,
    pub mac: [u8; 6],
    pub bind_ip: Ipv4Addr,
    pub bind_index: u8,
    pub supports_web_config: bool,
    pub dhcp_configured: bool,
    pub dhcp_capable: bool,
    pub supports_15_bit_address: bool,
    pub supports_sacn_switch: bool,
    pub squawking: bool,
    pub supports_output_style_switch: bool,
    pub supports_rdm_via_artnet: bool,
    pub failsafe_state: FailsafeState,
    pub supports_failover: bool,
    pub supports_llrp: bool,
    pub supports_port_dir_switch: bool,
    pub default_responder_uid: [u8; 6],
}

impl Default for ArtPollReply {
    fn default() -> Self {
        Self {
            source_ip: Ipv4Addr::UNSPECIFIED,
            port: ARTNET_PORT,
            firmware_version: 0,
            net_switch: 0,
            sub_switch: 0,
            oem: 0,
            ubea: None,
            indicator_state: IndicatorState::Unknown,
            programming_authority: ProgrammingAuthority::Unknown,
            boot_process: BootProcess::Rom,
            supports_rdm: false,
            esta: 0,
            short_name: String::new(),
            long_name: String::new(),
            node_report: String::new(),
            ports: Vec::new(),
            acn_priority: 100,
            sw_macro: 0,
            sw_remote: 0,
            style: StyleCode::Node,
            mac: [0; 6],
            bind_ip: Ipv4Addr::UNSPECIFIED,
            bind_index: 1,
            supports_web_config: false,
            dhcp_configured: false,
            dhcp_capable: false,
            supports_15_bit_address: false,
            supports_sacn_switch: false,
            squawking: false,
            supports_output_style_switch: false,
            supports_rdm_via_artnet: false,
            failsafe_state: FailsafeState::HoldLastState,
            supports_failover: false,
            supports_llrp: false,
            supports_port_dir_switch: false,
            default_responder_uid: [0; 6],
        }
    }
}

impl ArtPollReply {
    fn status1(&self) -> u8 {
        (self.indicator_state as u8) << 6
            | (self.programming_authority as u8) << 4
            | ((self.boot_process == BootProcess::Rom) as u8) << 2
            | (self.supports_rdm as u8) << 1
            | self.ubea.is_some() as u8
    }

    fn status2(&self) -> u8 {
        self.supports_web_config as u8
            | (self.dhcp_configured as u8) << 1
            | (self.dhcp_capable as u8) << 2
            | (self.supports_15_bit_address as u8) << 3
            | (self.supports_sacn_switch as u8) << 4
            | (self.squawking as u8) << 5
            | (self.supports_output_style_switch as u8) << 6
            | (self.supports_rdm_via_artnet as u8) << 7
    }

    fn status3(&self) -> u8 {
        (self.failsafe_state as u8) << 6
            | (self.supports_failover as u8) << 5
            | (self.supports_llrp as u8) << 4
            | (self.supports_port_dir_switch as u8) << 3
    }

    /// The 4 wire port slots: declared ports followed by empty padding.
    fn port_slots(&self) -> [Port; 4] {
        let mut slots = [Port::default(); 4];
        for (slot, port) in slots.iter_mut().zip(self.ports.iter()) {
            *slot = *port;
        }
        slots
    }

    pub fn encode(&self) -> Vec<u8> {
        let slots = self.port_slots();
        let mut w = Writer::packet(OpCode::PollReply);
        w.raw(&self.source_ip.octets());
        w.u16_lsb(self.port);
        w.u16_msb(self.firmware_version);
        w.u8(self.net_switch);
        w.u8(self.sub_switch);
        w.u16_msb(self.oem);
        w.u8(self.ubea.unwrap_or(0));
        w.u8(self.status1());
        w.u16_lsb(self.esta);
        w.str_fixed(&self.short_name, 18);
        w.str_fixed(&self.long_name, 64);
        w.str_fixed(&self.node_report, 64);

        w.u16_msb(self.ports.len().min(4) as u16);
        for slot in &slots {
            w.u8(slot.types_byte());
        }
        for slot in &slots {
            w.u8(slot.good_input.to_byte());
        }
        for slot in &slots {
            w.u8(slot.good_output.to_byte());
        }
        for slot in &slots {
            w.u8(slot.sw_in);
        }
        for slot in &slots {
            w.u8(slot.sw_out);
        }

        w.u8(self.acn_priority);
        w.u8(self.sw_macro);
        w.u8(self.sw_remote);
        w.zeros(3); // spare
        w.u8(self.style as u8);
        w.raw(&self.mac);
        w.raw(&self.bind_ip.octets());
        w.u8(self.bind_index);
        w.u8(self.status2());
        for slot in &slots {
            w.u8(slot.good_output_b.to_byte());
        }
        w.u8(self.status3());
        w.raw(&self.default_responder_uid);
        w.zeros(15); // filler
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut r = Reader::packet(buf, OpCode::PollReply)?;
        let mut reply = Self::default();

        let ip: [u8; 4] = r.bytes(4)?.try_into().expect("4-byte read");
        reply.source_ip = Ipv4Addr::from(ip);
        reply.port = r.u16_lsb()?;
        reply.firmware_version = r.u16_msb()?;
        reply.net_switch = r.u8()?;
        reply.sub_switch = r.u8()?;
        reply.oem = r.u16_msb()?;
        let ubea_version = r.u8()?;

        let status1 = r.u8()?;
        reply.indicator_state = IndicatorState::from_bits(status1 >> 6);
        reply.programming_authority = ProgrammingAuthority::from_bits(status1 >> 4);
        reply.boot_process = if status1 >> 2 & 1 == 1 {
            BootProcess::Rom
        } else {
            BootProcess::Flash
        };
        reply.supports_rdm = status1 >> 1 & 1 == 1;
        reply.ubea = (status1 & 1 == 1).then_some(ubea_version);

        reply.esta = r.u16_lsb()?;
        reply.short_name = r.str_fixed(18)?;
        reply.long_name = r.str_fixed(64)?;
        reply.node_report = r.str_fixed(64)?;

        let num_ports = r.u16_msb()?.min(4) as usize;
        let mut slots = [Port::default(); 4];
        let types: [u8; 4] = r.bytes(4)?.try_into().expect("4-byte read");
        let good_input: [u8; 4] = r.bytes(4)?.try_into().expect("4-byte read");
        let good_output: [u8; 4] = r.bytes(4)?.try_into().expect("4-byte read");
        let sw_in: [u8; 4] = r.bytes(4)?.try_into().expect("4-byte read");
        let sw_out: [u8; 4] = r.bytes(4)?.try_into().expect("4-byte read");
        for (i, slot) in slots.iter_mut().enumerate() {
            slot.apply_types_byte(types[i])?;
            slot.good_input = GoodInput::from_byte(good_input[i]);
            slot.good_output = GoodOutputA::from_byte(good_output[i]);
            slot.sw_in = sw_in[i];
            slot.sw_out = sw_out[i];
        }

        reply.acn_priority = r.u8()?;
        reply.sw_macro = r.u8()?;
        reply.sw_remote = r.u8()?;
        r.skip(3)?; // spare
        reply.style = StyleCode::from_byte(r.u8()?)?;
        reply.mac = r.bytes(6)?.try_into().expect("6-byte read");
        let bind_ip: [u8; 4] = r.bytes(4)?.try_into().expect("4-byte read");
        reply.bind_ip = Ipv4Addr::from(bind_ip);
        reply.bind_index = r.u8()?;

        let status2 = r.u8()?;
        reply.supports_web_config = status2 & 1 == 1;
        reply.dhcp_configured = status2 >> 1 & 1 == 1;
        reply.dhcp_capable = status2 >> 2 & 1 == 1;
        reply.supports_15_bit_address = status2 >> 3 & 1 == 1;
        reply.supports_sacn_switch = status2 >> 4 & 1 == 1;
        reply.squawking = status2 >> 5 & 1 == 1;
        reply.supports_output_style_switch = status2 >> 6 & 1 == 1;
        reply.supports_rdm_via_artnet = status2 >> 7 & 1 == 1;

        // Older nodes end the packet here; the remaining fields keep their
        // defaults when absent.
        if let Ok(good_output_b) = r.bytes(4) {
            let good_output_b: [u8; 4] = good_output_b.try_into().expect("4-byte read");
            for (slot, byte) in slots.iter_mut().zip(good_output_b) {
                slot.good_output_b = GoodOutputB::from_byte(byte);
            }
            if let Ok(status3) = r.u8() {
                reply.failsafe_state = FailsafeState::from_bits(status3 >> 6);
                reply.supports_failover = status3 >> 5 & 1 == 1;
                reply.supports_llrp = status3 >> 4 & 1 == 1;
                reply.supports_port_dir_switch = status3 >> 3 & 1 == 1;
            }
            if let Ok(uid) = r.bytes(6) {
                reply.default_responder_uid = uid.try_into().expect("6-byte read");
            }
        }

        reply.ports = slots[..num_ports].to_vec();
        Ok(reply)
    }
}
