//! ArtPoll: discovery request

use crate::address::PortAddress;
use crate::opcode::OpCode;
use crate::status::{DiagnosticsMode, DiagnosticsPriority};
use crate::wire::{Reader, Writer, PROTOCOL_VERSION};
use crate::Result;

/// Discovery request, broadcast by controllers.
///
/// The flags byte asks responders for unsolicited replies on change and for
/// diagnostics traffic; targeted mode narrows which port addresses should
/// answer at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtPoll {
    pub protocol_version: u16,
    /// Ask responders to send an unsolicited ArtPollReply when their
    /// configuration or status changes
    pub notify_on_change: bool,
    pub enable_diagnostics: bool,
    pub diag_mode: DiagnosticsMode,
    pub diag_priority: DiagnosticsPriority,
    pub enable_vlc: bool,
    /// Only nodes whose port addresses overlap the target range reply
    pub targeted_mode: bool,
    pub target_bottom: PortAddress,
    pub target_top: PortAddress,
}

impl Default for ArtPoll {
    fn default() -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            notify_on_change: false,
            enable_diagnostics: false,
            diag_mode: DiagnosticsMode::Broadcast,
            diag_priority: DiagnosticsPriority::Low,
            enable_vlc: false,
            targeted_mode: false,
            target_bottom: PortAddress::from_packed(0),
            // the widest range the 2-byte wire field can carry
            target_top: PortAddress::from_packed(0xFFFF),
        }
    }
}

impl ArtPoll {
    /// Request diagnostics at the given mode and priority.
    pub fn with_diagnostics(mut self, mode: DiagnosticsMode, priority: DiagnosticsPriority) -> Self {
        self.enable_diagnostics = true;
        self.diag_mode = mode;
        self.diag_priority = priority;
        self
    }

    /// Restrict the poll to the given port-address range.
    pub fn with_targets(mut self, bottom: PortAddress, top: PortAddress) -> Self {
        self.targeted_mode = true;
        self.target_bottom = bottom;
        self.target_top = top;
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::packet(OpCode::Poll);
        w.u16_msb(self.protocol_version);

        let flags = (self.targeted_mode as u8) << 5
            | (self.enable_vlc as u8) << 4
            | ((self.diag_mode == DiagnosticsMode::Unicast) as u8) << 3
            | (self.enable_diagnostics as u8) << 2
            | (self.notify_on_change as u8) << 1;
        w.u8(flags);
        w.u8(self.diag_priority as u8);

        w.u16_msb(self.target_top.to_wire());
        w.u16_msb(self.target_bottom.to_wire());
        w.finish()
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut r = Reader::packet(buf, OpCode::Poll)?;
        let mut poll = Self {
            protocol_version: r.u16_msb()?,
            ..Default::default()
        };

        let flags = r.u8()?;
        poll.targeted_mode = flags >> 5 & 1 == 1;
        poll.enable_vlc = flags >> 4 & 1 == 1;
        poll.diag_mode = if flags >> 3 & 1 == 1 {
            DiagnosticsMode::Unicast
        } else {
            DiagnosticsMode::Broadcast
        };
        poll.enable_diagnostics = flags >> 2 & 1 == 1;
        poll.notify_on_change = flags >> 1 & 1 == 1;

        // Pollers that don't request diagnostics often leave the priority
        // byte zeroed; only insist on a table value when it matters.
        let raw_priority = r.u8()?;
        match DiagnosticsPriority::from_byte(raw_priority) {
            Ok(priority) => poll.diag_priority = priority,
            Err(e) if poll.enable_diagnostics => return Err(e),
            Err(_) => {}
        }

        // The target range may be absent entirely (short ArtPoll packets
        // from pre-targeted-mode controllers).
        if let Ok(top) = r.u16_msb() {
            poll.target_top = PortAddress::from_wire(top);
            poll.target_bottom = PortAddress::from_wire(r.u16_msb()?);
        }
        Ok(poll)
    }
}
