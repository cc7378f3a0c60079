//! Engine configuration

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use lumenflow_proto::ARTNET_PORT;
use serde::{Deserialize, Serialize};

/// Configuration consumed by [`ArtNetEngine`](crate::ArtNetEngine).
///
/// All fields have working defaults; a host application typically only sets
/// the names and OEM code it wants advertised in poll replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Short name advertised in poll replies (17 bytes on the wire)
    pub short_name: String,
    /// Long name advertised in poll replies (63 bytes on the wire)
    pub long_name: String,
    /// OEM code advertised in poll replies
    pub oem: u16,
    /// ESTA manufacturer code
    pub esta: u16,
    /// Firmware revision advertised in poll replies
    pub firmware_version: u16,
    /// Broadcast ArtPoll on a recurring interval
    pub polling_enabled: bool,
    /// Sequence-number outgoing DMX frames 1-255; when disabled, frames
    /// carry sequence 0
    pub sequencing_enabled: bool,
    /// Local address to bind the UDP socket to
    pub bind_ip: IpAddr,
    /// UDP port, 6454 unless testing
    pub port: u16,
    /// Destination for broadcast traffic
    pub broadcast_ip: IpAddr,
    /// Pause between DMX retransmission cycles, in milliseconds
    pub retransmit_interval_ms: u64,
    /// Lower bound of the jittered poll interval, in milliseconds
    pub poll_interval_min_ms: u64,
    /// Upper bound of the jittered poll interval, in milliseconds
    pub poll_interval_max_ms: u64,
    /// Delay between a poll broadcast and the staleness sweep it triggers
    pub sweep_delay_ms: u64,
    /// Nodes unseen for this long are evicted by the sweep
    pub node_ttl_ms: u64,
    /// Upper bound of the random delay before processing a poll reply
    pub reply_delay_max_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            short_name: "lumenflow".into(),
            long_name: "LumenFlow Art-Net engine".into(),
            oem: 0x00FF,
            esta: u16::from_le_bytes(*b"LF"),
            firmware_version: 1,
            polling_enabled: true,
            sequencing_enabled: true,
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: ARTNET_PORT,
            broadcast_ip: IpAddr::V4(Ipv4Addr::BROADCAST),
            retransmit_interval_ms: 800,
            // the Art-Net spec wants polls every 2.5-3 s; jitter inside
            // that window keeps controllers from synchronizing
            poll_interval_min_ms: 2500,
            poll_interval_max_ms: 3000,
            sweep_delay_ms: 500,
            node_ttl_ms: 9000,
            reply_delay_max_ms: 25,
        }
    }
}

impl EngineConfig {
    pub fn retransmit_interval(&self) -> Duration {
        Duration::from_millis(self.retransmit_interval_ms)
    }

    pub fn sweep_delay(&self) -> Duration {
        Duration::from_millis(self.sweep_delay_ms)
    }

    pub fn node_ttl(&self) -> Duration {
        Duration::from_millis(self.node_ttl_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.port, 6454);
        assert!(config.polling_enabled);
        assert!(config.poll_interval_min_ms <= config.poll_interval_max_ms);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"short_name": "studio-rig", "polling_enabled": false}"#)
                .unwrap();
        assert_eq!(config.short_name, "studio-rig");
        assert!(!config.polling_enabled);
        assert_eq!(config.port, 6454);
        assert_eq!(config.retransmit_interval_ms, 800);
    }
}
