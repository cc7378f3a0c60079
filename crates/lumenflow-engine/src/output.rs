//! Output distribution: per-port retransmission loops

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, trace, warn};

use lumenflow_proto::{ArtDmx, Port, PortAddress, PortType};

use crate::engine::EngineInner;

/// Result of a [`send`](crate::ArtNetEngine::send) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// A retransmission loop is now feeding the subscribers
    Started,
    /// The node table is empty; discovery has likely not completed yet
    NoNodesKnown,
    /// Nodes are known, but none serves this port address
    NoSubscribers,
}

/// A locally-owned port address with current output data and at most one
/// retransmission task.
pub(crate) struct OwnPort {
    pub(crate) port: Port,
    /// Channel data most recently handed to `send`, up to 512 bytes
    pub(crate) data: Vec<u8>,
    sequence: u8,
    pub(crate) task: Option<JoinHandle<()>>,
}

impl OwnPort {
    pub(crate) fn new(address: PortAddress) -> Self {
        let sw = (address.universe() & 0xFF) as u8;
        Self {
            port: Port {
                input: true,
                output: true,
                port_type: PortType::ArtNet,
                sw_in: sw,
                sw_out: sw,
                ..Default::default()
            },
            data: Vec::new(),
            sequence: 1,
            task: None,
        }
    }

    /// Next sequence number for an outgoing frame. With sequencing enabled
    /// the counter runs 1-255 and wraps back to 1; 0 is reserved for
    /// "sequencing disabled" and is never produced here.
    pub(crate) fn next_sequence(&mut self, enabled: bool) -> u8 {
        if !enabled {
            return 0;
        }
        let current = self.sequence;
        self.sequence = if current == 255 { 1 } else { current + 1 };
        current
    }
}

enum Cycle {
    Send(Vec<u8>, Vec<SocketAddr>),
    Stop { notify: bool },
}

/// Feed every subscriber of `address` with the port's current data until
/// the subscriber set empties or the task is cancelled. The subscriber set
/// is re-resolved every cycle; nodes may come and go between frames.
pub(crate) async fn run_retransmit_loop(inner: Arc<EngineInner>, address: PortAddress) {
    let interval = inner.config.retransmit_interval();
    loop {
        let cycle = {
            let mut state = inner.state.lock();
            let state = &mut *state;
            let targets: Vec<SocketAddr> = state
                .nodes
                .lookup(address)
                .into_iter()
                .map(|node| SocketAddr::from((node.id.ip, node.udp_port)))
                .collect();
            match state.own_ports.get_mut(&address) {
                // unregistered while we slept
                None => Cycle::Stop { notify: false },
                Some(own) if targets.is_empty() => {
                    let notify = own.port.good_output.data_being_transmitted;
                    own.port.good_output.data_being_transmitted = false;
                    Cycle::Stop { notify }
                }
                Some(own) => {
                    let sequence = own.next_sequence(inner.config.sequencing_enabled);
                    let frame = ArtDmx::new(sequence, address, own.data.clone());
                    Cycle::Send(frame.encode(), targets)
                }
            }
        };

        match cycle {
            Cycle::Stop { notify } => {
                if notify {
                    info!("no subscribers left for {}, stopping output", address);
                    inner.notify_change();
                }
                return;
            }
            Cycle::Send(frame, targets) => {
                for target in targets {
                    trace!("DMX frame for {} -> {}", address, target);
                    if let Err(e) = inner.socket.send_to(&frame, target).await {
                        warn!("DMX send to {} failed: {}", target, e);
                    }
                }
            }
        }
        tokio::time::sleep(interval).await;
    }
}
