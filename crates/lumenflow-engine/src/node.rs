//! Remote node bookkeeping
//!
//! The table keeps two views that must stay consistent: nodes by identity
//! and node sets by port address. Updates reconcile the address index by
//! diffing the node's derived address set before and after, because a node
//! can reconfigure its switches or drop a port between two poll replies.

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use lumenflow_proto::{ArtPollReply, Port, PortAddress, StyleCode, ARTNET_PORT};
use tracing::debug;

/// Identity of a remote node. The bind index disambiguates multiple logical
/// nodes reported from one physical IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub ip: Ipv4Addr,
    pub bind_index: u8,
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.ip, self.bind_index)
    }
}

/// A remote device discovered via poll reply.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub short_name: String,
    pub long_name: String,
    pub style: StyleCode,
    /// The node's configured net switch
    pub net_switch: u8,
    /// The node's configured sub-net switch
    pub sub_switch: u8,
    /// Up to 4 port descriptors, as last reported
    pub ports: Vec<Port>,
    /// UDP port the node answers on, echoed from its poll reply
    pub udp_port: u16,
    pub last_seen: Instant,
}

impl Node {
    /// The set of port addresses this node currently serves: input ports
    /// contribute their sw_in, output ports their sw_out, both under the
    /// node's net/sub-net switches. Ports reporting switches outside the
    /// addressable range are skipped.
    pub fn port_addresses(&self) -> HashSet<PortAddress> {
        let mut addresses = HashSet::new();
        for port in &self.ports {
            if port.input {
                if let Ok(addr) =
                    PortAddress::try_new(self.net_switch, self.sub_switch, port.sw_in as u16)
                {
                    addresses.insert(addr);
                }
            }
            if port.output {
                if let Ok(addr) =
                    PortAddress::try_new(self.net_switch, self.sub_switch, port.sw_out as u16)
                {
                    addresses.insert(addr);
                }
            }
        }
        addresses
    }
}

/// What an upsert did to the table.
#[derive(Debug, Default)]
pub struct UpsertOutcome {
    /// The identity was not in the table before
    pub created: bool,
    /// Addresses this node now serves but did not before
    pub added: Vec<PortAddress>,
    /// Addresses this node no longer serves
    pub removed: Vec<PortAddress>,
}

/// Authoritative record of which remote nodes exist and which port
/// addresses each currently serves.
#[derive(Debug, Default)]
pub struct NodeTable {
    by_id: HashMap<NodeId, Node>,
    by_address: HashMap<PortAddress, HashSet<NodeId>>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a poll reply, creating or updating the node it describes.
    pub fn upsert(&mut self, reply: &ArtPollReply, source_ip: Ipv4Addr, now: Instant) -> UpsertOutcome {
        let id = NodeId {
            ip: source_ip,
            bind_index: reply.bind_index,
        };

        let mut outcome = UpsertOutcome::default();
        let old_addresses = match self.by_id.get(&id) {
            Some(node) => node.port_addresses(),
            None => {
                outcome.created = true;
                HashSet::new()
            }
        };

        let node = Node {
            id,
            short_name: reply.short_name.clone(),
            long_name: reply.long_name.clone(),
            style: reply.style,
            net_switch: reply.net_switch,
            sub_switch: reply.sub_switch,
            ports: reply.ports.clone(),
            udp_port: if reply.port == 0 { ARTNET_PORT } else { reply.port },
            last_seen: now,
        };
        let new_addresses = node.port_addresses();
        self.by_id.insert(id, node);

        for addr in old_addresses.difference(&new_addresses) {
            self.unindex(*addr, &id);
            outcome.removed.push(*addr);
        }
        for addr in new_addresses.difference(&old_addresses) {
            self.by_address.entry(*addr).or_default().insert(id);
            outcome.added.push(*addr);
        }
        outcome
    }

    /// Remove a node from both indexes.
    pub fn evict(&mut self, id: &NodeId) -> Option<Node> {
        let node = self.by_id.remove(id)?;
        for addr in node.port_addresses() {
            self.unindex(addr, id);
        }
        Some(node)
    }

    /// Evict every node not seen within the TTL. Returns the evicted
    /// identities.
    pub fn sweep(&mut self, now: Instant, ttl: Duration) -> Vec<NodeId> {
        let stale: Vec<NodeId> = self
            .by_id
            .values()
            .filter(|node| now.duration_since(node.last_seen) > ttl)
            .map(|node| node.id)
            .collect();
        for id in &stale {
            debug!("evicting stale node {}", id);
            self.evict(id);
        }
        stale
    }

    /// The nodes currently serving an address. Possibly empty, never an
    /// error.
    pub fn lookup(&self, address: PortAddress) -> Vec<&Node> {
        self.by_address
            .get(&address)
            .into_iter()
            .flatten()
            .filter_map(|id| self.by_id.get(id))
            .collect()
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.by_id.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Drop `id` from an address's node set, removing the set entirely when
    /// it empties.
    fn unindex(&mut self, address: PortAddress, id: &NodeId) {
        if let Some(set) = self.by_address.get_mut(&address) {
            set.remove(id);
            if set.is_empty() {
                self.by_address.remove(&address);
            }
        }
    }
}
