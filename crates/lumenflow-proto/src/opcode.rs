//! Art-Net opcode table

/// Opcode carried in the packet header, identifying the message type.
///
/// The full Art-Net 4 table is listed so foreign traffic classifies as a
/// known-but-unhandled message instead of an error; the engine only acts on
/// a handful of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum OpCode {
    Poll = 0x2000,
    PollReply = 0x2100,
    DiagData = 0x2300,
    Command = 0x2400,
    Dmx = 0x5000,
    Nzs = 0x5100,
    Sync = 0x5200,
    Address = 0x6000,
    Input = 0x7000,
    TodRequest = 0x8000,
    TodData = 0x8100,
    TodControl = 0x8200,
    Rdm = 0x8300,
    RdmSub = 0x8400,
    Media = 0x9000,
    MediaPatch = 0x9100,
    MediaControl = 0x9200,
    MediaControlReply = 0x9300,
    TimeCode = 0x9700,
    TimeSync = 0x9800,
    Trigger = 0x9900,
    Directory = 0x9A00,
    DirectoryReply = 0x9B00,
    VideoSetup = 0xA010,
    VideoPalette = 0xA020,
    VideoData = 0xA040,
    MacMaster = 0xF000,
    MacSlave = 0xF100,
    FirmwareMaster = 0xF200,
    FirmwareReply = 0xF300,
    FileTnMaster = 0xF400,
    FileFnMaster = 0xF500,
    FileFnReply = 0xF600,
    IpProg = 0xF800,
    IpProgReply = 0xF900,
}

impl OpCode {
    /// Look up an opcode by its wire value. Unknown values are `None`, not
    /// an error.
    pub fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            0x2000 => Self::Poll,
            0x2100 => Self::PollReply,
            0x2300 => Self::DiagData,
            0x2400 => Self::Command,
            0x5000 => Self::Dmx,
            0x5100 => Self::Nzs,
            0x5200 => Self::Sync,
            0x6000 => Self::Address,
            0x7000 => Self::Input,
            0x8000 => Self::TodRequest,
            0x8100 => Self::TodData,
            0x8200 => Self::TodControl,
            0x8300 => Self::Rdm,
            0x8400 => Self::RdmSub,
            0x9000 => Self::Media,
            0x9100 => Self::MediaPatch,
            0x9200 => Self::MediaControl,
            0x9300 => Self::MediaControlReply,
            0x9700 => Self::TimeCode,
            0x9800 => Self::TimeSync,
            0x9900 => Self::Trigger,
            0x9A00 => Self::Directory,
            0x9B00 => Self::DirectoryReply,
            0xA010 => Self::VideoSetup,
            0xA020 => Self::VideoPalette,
            0xA040 => Self::VideoData,
            0xF000 => Self::MacMaster,
            0xF100 => Self::MacSlave,
            0xF200 => Self::FirmwareMaster,
            0xF300 => Self::FirmwareReply,
            0xF400 => Self::FileTnMaster,
            0xF500 => Self::FileFnMaster,
            0xF600 => Self::FileFnReply,
            0xF800 => Self::IpProg,
            0xF900 => Self::IpProgReply,
            _ => return None,
        })
    }

    /// The opcode's wire value
    pub fn value(self) -> u16 {
        self as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_known_values() {
        for op in [
            OpCode::Poll,
            OpCode::PollReply,
            OpCode::DiagData,
            OpCode::Command,
            OpCode::Dmx,
            OpCode::TimeCode,
            OpCode::Trigger,
            OpCode::IpProgReply,
        ] {
            assert_eq!(OpCode::from_u16(op.value()), Some(op));
        }
    }

    #[test]
    fn test_unknown_value_is_none() {
        assert_eq!(OpCode::from_u16(0x1234), None);
    }
}
