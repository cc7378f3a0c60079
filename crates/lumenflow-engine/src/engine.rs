//! Engine core: socket lifecycle, shared state, and the collaborator API

use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use lumenflow_proto::{IndicatorState, NodeReportCode, PortAddress};

use crate::config::EngineConfig;
use crate::node::{Node, NodeId, NodeTable};
use crate::output::{self, OwnPort, SendOutcome};
use crate::{discovery, server, EngineError, Result};

/// Node-set change notifications delivered to [`ArtNetEngine::subscribe`]
/// receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    /// A previously unseen node answered discovery
    Discovered(NodeId),
    /// A known node reported a new configuration
    Updated(NodeId),
    /// A node fell out of the staleness window
    Evicted(NodeId),
}

/// Callback invoked with decoded channel data for a registered port address.
pub type DmxHandler = Arc<dyn Fn(PortAddress, &[u8]) + Send + Sync>;

/// The Art-Net protocol engine.
///
/// One instance owns the UDP socket, the node table, and the locally
/// registered output ports. Cheap to clone; all clones share the same
/// engine.
///
/// ```rust,no_run
/// use lumenflow_engine::{ArtNetEngine, EngineConfig};
/// use lumenflow_proto::PortAddress;
///
/// # async fn run() -> lumenflow_engine::Result<()> {
/// let engine = ArtNetEngine::bind(EngineConfig::default()).await?;
/// engine.start();
///
/// let address = PortAddress::try_new(0, 0, 1)?;
/// engine.register_port(address)?;
/// engine.send(address, &[255; 512])?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ArtNetEngine {
    inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    pub(crate) socket: UdpSocket,
    pub(crate) local_addr: SocketAddr,
    pub(crate) broadcast_addr: SocketAddr,
    pub(crate) state: Mutex<EngineState>,
    pub(crate) events: broadcast::Sender<NodeEvent>,
    pub(crate) dmx_handler: Mutex<Option<DmxHandler>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

pub(crate) struct EngineState {
    pub(crate) nodes: NodeTable,
    pub(crate) own_ports: BTreeMap<PortAddress, OwnPort>,
    /// Pollers that asked for unsolicited replies on change
    pub(crate) change_subscribers: HashSet<SocketAddr>,
    pub(crate) indicator_state: IndicatorState,
    pub(crate) report_code: NodeReportCode,
    pub(crate) report_counter: u32,
    pub(crate) status_message: String,
}

impl EngineState {
    pub(crate) fn new() -> Self {
        Self {
            nodes: NodeTable::new(),
            own_ports: BTreeMap::new(),
            change_subscribers: HashSet::new(),
            // locate mode until discovery finds a first node
            indicator_state: IndicatorState::LocateIdentify,
            report_code: NodeReportCode::PowerOk,
            report_counter: 0,
            status_message: "Power On Tests successful".into(),
        }
    }

    /// Lowest and highest locally-owned port address, or `None` when no
    /// ports are registered and discovery has nothing to handle.
    pub(crate) fn bounds(&self) -> Option<(PortAddress, PortAddress)> {
        let bottom = *self.own_ports.first_key_value()?.0;
        let top = *self.own_ports.last_key_value()?.0;
        Some((bottom, top))
    }
}

impl ArtNetEngine {
    /// Bind the engine's UDP socket. The engine is idle until
    /// [`start`](Self::start) is called.
    pub async fn bind(config: EngineConfig) -> Result<Self> {
        let socket = server::bind_socket(&config)?;
        let socket = UdpSocket::from_std(socket)?;
        let local_addr = socket.local_addr()?;
        let broadcast_addr = SocketAddr::new(config.broadcast_ip, config.port);
        info!("Art-Net socket bound on {}", local_addr);

        let (events, _) = broadcast::channel(64);
        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                socket,
                local_addr,
                broadcast_addr,
                state: Mutex::new(EngineState::new()),
                events,
                dmx_handler: Mutex::new(None),
                tasks: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Spawn the receive loop and, if enabled, the discovery poll loop.
    pub fn start(&self) {
        let mut tasks = self.inner.tasks.lock();
        tasks.push(tokio::spawn(server::run_recv_loop(self.inner.clone())));
        if self.inner.config.polling_enabled {
            tasks.push(tokio::spawn(discovery::run_poll_loop(self.inner.clone())));
        }
    }

    /// Abort every engine task. The node table and port registry are
    /// dropped with the last engine clone.
    pub fn shutdown(&self) {
        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }
        let mut state = self.inner.state.lock();
        for own in state.own_ports.values_mut() {
            if let Some(task) = own.task.take() {
                task.abort();
            }
        }
        info!("Art-Net engine shut down");
    }

    /// The address the UDP socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.inner.local_addr
    }

    /// Register a locally-owned output port address.
    pub fn register_port(&self, address: PortAddress) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if state.own_ports.contains_key(&address) {
                return Err(EngineError::InvalidParameter(format!(
                    "port address {} already registered",
                    address
                )));
            }
            state.own_ports.insert(address, OwnPort::new(address));
        }
        info!("registered port address {}", address);
        self.inner.notify_change();
        Ok(())
    }

    /// Unregister a port address, cancelling any active retransmission.
    pub fn unregister_port(&self, address: PortAddress) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            let mut own = state
                .own_ports
                .remove(&address)
                .ok_or(EngineError::UnknownPort(address))?;
            if let Some(task) = own.task.take() {
                task.abort();
            }
        }
        info!("unregistered port address {}", address);
        self.inner.notify_change();
        Ok(())
    }

    /// Start (or restart) transmitting channel data for a registered port
    /// address.
    ///
    /// Returns [`SendOutcome::NoNodesKnown`] or
    /// [`SendOutcome::NoSubscribers`] without transmitting when nobody
    /// would receive the data; both are non-fatal. A previous
    /// retransmission loop for the same address is cancelled first, so at
    /// most one sender per address is ever active.
    pub fn send(&self, address: PortAddress, data: &[u8]) -> Result<SendOutcome> {
        let flipped = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let Some(own) = state.own_ports.get_mut(&address) else {
                return Err(EngineError::UnknownPort(address));
            };
            if state.nodes.is_empty() {
                warn!("no nodes discovered yet, dropping data for {}", address);
                return Ok(SendOutcome::NoNodesKnown);
            }
            if state.nodes.lookup(address).is_empty() {
                warn!("no node serves port address {}, dropping data", address);
                return Ok(SendOutcome::NoSubscribers);
            }

            if let Some(task) = own.task.take() {
                task.abort();
            }
            own.data = data[..data.len().min(512)].to_vec();
            let flipped = !own.port.good_output.data_being_transmitted;
            own.port.good_output.data_being_transmitted = true;
            own.task = Some(tokio::spawn(output::run_retransmit_loop(
                self.inner.clone(),
                address,
            )));
            flipped
        };
        debug!("transmitting {} channels on {}", data.len().min(512), address);
        if flipped {
            self.inner.notify_change();
        }
        Ok(SendOutcome::Started)
    }

    /// Install the callback invoked when DMX data addressed to a registered
    /// port arrives from the network. Replaces any previous handler.
    pub fn on_dmx(&self, handler: impl Fn(PortAddress, &[u8]) + Send + Sync + 'static) {
        *self.inner.dmx_handler.lock() = Some(Arc::new(handler));
    }

    /// Subscribe to node-set change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.inner.events.subscribe()
    }

    /// Snapshot of the currently known nodes.
    pub fn nodes(&self) -> Vec<Node> {
        self.inner.state.lock().nodes.iter().cloned().collect()
    }

    /// The nodes currently serving a port address.
    pub fn nodes_for(&self, address: PortAddress) -> Vec<Node> {
        self.inner
            .state
            .lock()
            .nodes
            .lookup(address)
            .into_iter()
            .cloned()
            .collect()
    }
}

impl EngineInner {
    /// Push the current port status to every change subscriber. Called
    /// whenever a port is added or removed or a transmit flag flips.
    pub(crate) fn notify_change(&self) {
        let (subscribers, replies) = {
            let mut state = self.state.lock();
            state.report_counter += 1;
            if state.change_subscribers.is_empty() {
                return;
            }
            let replies = discovery::build_poll_replies(&state, &self.config, self.local_addr);
            (state.change_subscribers.clone(), replies)
        };
        for subscriber in subscribers {
            for reply in &replies {
                if let Err(e) = self.socket.try_send_to(&reply.encode(), subscriber) {
                    warn!("change notification to {} failed: {}", subscriber, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(net: u8, sub: u8, universe: u16) -> PortAddress {
        PortAddress::try_new(net, sub, universe).unwrap()
    }

    #[test]
    fn test_bounds_empty_state() {
        let state = EngineState::new();
        assert!(state.bounds().is_none());
    }

    #[test]
    fn test_bounds_spans_registered_ports() {
        let mut state = EngineState::new();
        for a in [addr(0, 0, 5), addr(0, 0, 1), addr(1, 2, 3)] {
            state.own_ports.insert(a, OwnPort::new(a));
        }
        assert_eq!(state.bounds(), Some((addr(0, 0, 1), addr(1, 2, 3))));
    }
}
