//! Status bitfields and wire enums
//!
//! Every bit-packed byte on the wire is defined here exactly once, as a
//! `to_byte`/`from_byte` pair sharing the same bit positions. The Art-Net 4
//! field tables are the reference for the positions.

use serde::{Deserialize, Serialize};

use crate::{error::ProtoError, Result};

/// Front-panel indicator state reported in ArtPollReply Status1 (bits 7-6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndicatorState {
    #[default]
    Unknown = 0,
    /// Identify mode: the node is asking to be located
    LocateIdentify = 1,
    /// Indicators muted
    MuteMode = 2,
    NormalMode = 3,
}

impl IndicatorState {
    pub(crate) fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            1 => Self::LocateIdentify,
            2 => Self::MuteMode,
            3 => Self::NormalMode,
            _ => Self::Unknown,
        }
    }
}

/// How the node's port address was last programmed (Status1 bits 5-4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProgrammingAuthority {
    #[default]
    Unknown = 0,
    FrontPanel = 1,
    Programmatic = 2,
}

impl ProgrammingAuthority {
    pub(crate) fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            1 => Self::FrontPanel,
            2 => Self::Programmatic,
            // 3 is undefined on the wire
            _ => Self::Unknown,
        }
    }
}

/// Firmware boot source (Status1 bit 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BootProcess {
    #[default]
    Rom,
    Flash,
}

/// Output failure behaviour (Status3 bits 7-6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailsafeState {
    #[default]
    HoldLastState = 0,
    AllOutputsZero = 1,
    AllOutputsFull = 2,
    PlaybackScene = 3,
}

impl FailsafeState {
    pub(crate) fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            1 => Self::AllOutputsZero,
            2 => Self::AllOutputsFull,
            3 => Self::PlaybackScene,
            _ => Self::HoldLastState,
        }
    }
}

/// Device style reported in ArtPollReply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StyleCode {
    /// A DMX to/from Art-Net device
    Node = 0x00,
    /// A lighting console
    #[default]
    Controller = 0x01,
    /// A media server
    Media = 0x02,
    /// A network routing device
    Route = 0x03,
    /// A backup device
    Backup = 0x04,
    /// A configuration or diagnostic tool
    Config = 0x05,
    /// A visualiser
    Visual = 0x06,
}

impl StyleCode {
    pub(crate) fn from_byte(byte: u8) -> Result<Self> {
        Ok(match byte {
            0x00 => Self::Node,
            0x01 => Self::Controller,
            0x02 => Self::Media,
            0x03 => Self::Route,
            0x04 => Self::Backup,
            0x05 => Self::Config,
            0x06 => Self::Visual,
            other => {
                return Err(ProtoError::InvalidValue(format!(
                    "unknown style code {:#04x}",
                    other
                )))
            }
        })
    }
}

/// Priority of an ArtDiagData message, also requested in ArtPoll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum DiagnosticsPriority {
    #[default]
    Low = 0x10,
    Medium = 0x40,
    High = 0x80,
    Critical = 0xE0,
    Volatile = 0xF0,
}

impl DiagnosticsPriority {
    pub(crate) fn from_byte(byte: u8) -> Result<Self> {
        Ok(match byte {
            0x10 => Self::Low,
            0x40 => Self::Medium,
            0x80 => Self::High,
            0xE0 => Self::Critical,
            0xF0 => Self::Volatile,
            other => {
                return Err(ProtoError::InvalidValue(format!(
                    "unknown diagnostics priority {:#04x}",
                    other
                )))
            }
        })
    }
}

/// Whether diagnostics replies should be unicast to the poller or broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DiagnosticsMode {
    #[default]
    Broadcast,
    Unicast,
}

/// Physical protocol on a node port (low 6 bits of the port-types byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PortType {
    #[default]
    Dmx512 = 0,
    Midi = 1,
    Avab = 2,
    ColortranCmx = 3,
    Adb62_5 = 4,
    ArtNet = 5,
    Dali = 6,
}

impl PortType {
    pub(crate) fn from_bits(bits: u8) -> Result<Self> {
        Ok(match bits & 0b11_1111 {
            0 => Self::Dmx512,
            1 => Self::Midi,
            2 => Self::Avab,
            3 => Self::ColortranCmx,
            4 => Self::Adb62_5,
            5 => Self::ArtNet,
            6 => Self::Dali,
            other => {
                return Err(ProtoError::InvalidValue(format!(
                    "unknown port type {}",
                    other
                )))
            }
        })
    }
}

/// Node status codes used in the ArtPollReply NodeReport field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeReportCode {
    Debug,
    PowerOk,
    PowerFail,
    SocketWrite,
    ParseFail,
    UdpFail,
    ShortNameOk,
    LongNameOk,
    DmxError,
    DmxUdpFull,
    DmxRxFull,
    SwitchError,
    ConfigError,
    DmxShort,
    FirmwareFail,
    UserFail,
    FactoryReset,
}

impl NodeReportCode {
    /// Numeric code as printed in the report string
    pub fn code(self) -> u16 {
        match self {
            Self::Debug => 0x0000,
            Self::PowerOk => 0x0001,
            Self::PowerFail => 0x0002,
            Self::SocketWrite => 0x0003,
            Self::ParseFail => 0x0004,
            Self::UdpFail => 0x0005,
            Self::ShortNameOk => 0x0006,
            Self::LongNameOk => 0x0007,
            Self::DmxError => 0x0008,
            Self::DmxUdpFull => 0x0009,
            Self::DmxRxFull => 0x000A,
            Self::SwitchError => 0x000B,
            Self::ConfigError => 0x000C,
            Self::DmxShort => 0x000D,
            Self::FirmwareFail => 0x000E,
            Self::UserFail => 0x000F,
            Self::FactoryReset => 0x0010,
        }
    }

    /// Render the "#xxxx [count] text" form carried in ArtPollReply.
    pub fn format(self, counter: u32, text: &str) -> String {
        format!("#{:04x} [{}] {}", self.code(), counter, text)
    }
}

/// Input-port status byte (GoodInput).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GoodInput {
    pub data_received: bool,
    pub includes_test_packets: bool,
    pub includes_sips: bool,
    pub includes_text_packets: bool,
    pub input_disabled: bool,
    pub receive_errors: bool,
}

impl GoodInput {
    pub(crate) fn to_byte(self) -> u8 {
        (self.data_received as u8) << 7
            | (self.includes_test_packets as u8) << 6
            | (self.includes_sips as u8) << 5
            | (self.includes_text_packets as u8) << 4
            | (self.input_disabled as u8) << 3
            | (self.receive_errors as u8) << 2
    }

    pub(crate) fn from_byte(byte: u8) -> Self {
        Self {
            data_received: byte >> 7 & 1 == 1,
            includes_test_packets: byte >> 6 & 1 == 1,
            includes_sips: byte >> 5 & 1 == 1,
            includes_text_packets: byte >> 4 & 1 == 1,
            input_disabled: byte >> 3 & 1 == 1,
            receive_errors: byte >> 2 & 1 == 1,
        }
    }
}

/// Primary output-port status byte (GoodOutputA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GoodOutputA {
    pub data_being_transmitted: bool,
    pub includes_test_packets: bool,
    pub includes_sips: bool,
    pub includes_text_packets: bool,
    pub merging_enabled: bool,
    pub short_detected: bool,
    pub merge_is_ltp: bool,
    pub use_sacn: bool,
}

impl GoodOutputA {
    pub(crate) fn to_byte(self) -> u8 {
        (self.data_being_transmitted as u8) << 7
            | (self.includes_test_packets as u8) << 6
            | (self.includes_sips as u8) << 5
            | (self.includes_text_packets as u8) << 4
            | (self.merging_enabled as u8) << 3
            | (self.short_detected as u8) << 2
            | (self.merge_is_ltp as u8) << 1
            | self.use_sacn as u8
    }

    pub(crate) fn from_byte(byte: u8) -> Self {
        Self {
            data_being_transmitted: byte >> 7 & 1 == 1,
            includes_test_packets: byte >> 6 & 1 == 1,
            includes_sips: byte >> 5 & 1 == 1,
            includes_text_packets: byte >> 4 & 1 == 1,
            merging_enabled: byte >> 3 & 1 == 1,
            short_detected: byte >> 2 & 1 == 1,
            merge_is_ltp: byte >> 1 & 1 == 1,
            use_sacn: byte & 1 == 1,
        }
    }
}

/// Secondary output-port status byte (GoodOutputB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GoodOutputB {
    pub rdm_enabled: bool,
    pub output_continuous: bool,
}

impl GoodOutputB {
    pub(crate) fn to_byte(self) -> u8 {
        (self.rdm_enabled as u8) << 7 | (self.output_continuous as u8) << 6
    }

    pub(crate) fn from_byte(byte: u8) -> Self {
        Self {
            rdm_enabled: byte >> 7 & 1 == 1,
            output_continuous: byte >> 6 & 1 == 1,
        }
    }
}

/// One physical/logical DMX port as reported in ArtPollReply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Port {
    pub input: bool,
    pub output: bool,
    pub port_type: PortType,
    pub good_input: GoodInput,
    pub good_output: GoodOutputA,
    pub good_output_b: GoodOutputB,
    /// Low byte of the input universe for this port
    pub sw_in: u8,
    /// Low byte of the output universe for this port
    pub sw_out: u8,
}

impl Port {
    /// The port-types byte: output bit 7, input bit 6, protocol in bits 5-0.
    pub(crate) fn types_byte(&self) -> u8 {
        (self.output as u8) << 7 | (self.input as u8) << 6 | self.port_type as u8
    }

    pub(crate) fn apply_types_byte(&mut self, byte: u8) -> Result<()> {
        self.output = byte >> 7 & 1 == 1;
        self.input = byte >> 6 & 1 == 1;
        self.port_type = PortType::from_bits(byte)?;
        Ok(())
    }
}
