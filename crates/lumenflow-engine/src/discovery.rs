//! Node discovery: outbound poll cycle, inbound poll/poll-reply handling,
//! and change notification to subscribed controllers.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::RngExt;
use tracing::{debug, info, trace, warn};

use lumenflow_proto::{
    peek_opcode, ArtCommand, ArtDiagData, ArtDmx, ArtPoll, ArtPollReply, ArtTimeCode, ArtTrigger,
    BootProcess, DiagnosticsMode, DiagnosticsPriority, IndicatorState, OpCode, PortAddress,
    ProgrammingAuthority, StyleCode,
};

use crate::config::EngineConfig;
use crate::engine::{EngineInner, EngineState, NodeEvent};
use crate::node::NodeId;

/// Broadcast a poll every 2.5-3 s (jittered) and trail each poll with a
/// staleness sweep.
pub(crate) async fn run_poll_loop(inner: Arc<EngineInner>) {
    loop {
        let delay_ms = {
            let mut rng = rand::rng();
            rng.random_range(inner.config.poll_interval_min_ms..=inner.config.poll_interval_max_ms)
        };
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

        broadcast_poll(&inner).await;

        let sweeper = inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(sweeper.config.sweep_delay()).await;
            sweep(&sweeper);
        });
    }
}

async fn broadcast_poll(inner: &Arc<EngineInner>) {
    let poll = {
        let state = inner.state.lock();
        let mut poll = ArtPoll {
            notify_on_change: true,
            ..Default::default()
        }
        .with_diagnostics(DiagnosticsMode::Unicast, DiagnosticsPriority::High);
        if let Some((bottom, top)) = state.bounds() {
            poll = poll.with_targets(bottom, top);
        }
        poll
    };
    match inner.socket.send_to(&poll.encode(), inner.broadcast_addr).await {
        Ok(_) => trace!("poll broadcast to {}", inner.broadcast_addr),
        Err(e) => warn!("poll broadcast failed: {}", e),
    }
}

/// Evict nodes that have not answered within the TTL.
pub(crate) fn sweep(inner: &EngineInner) {
    let evicted = inner
        .state
        .lock()
        .nodes
        .sweep(Instant::now(), inner.config.node_ttl());
    for id in evicted {
        info!("node {} timed out", id);
        let _ = inner.events.send(NodeEvent::Evicted(id));
    }
}

/// Classify one inbound datagram by opcode and dispatch it. Malformed
/// packets are logged and dropped; they never propagate.
pub(crate) fn handle_datagram(inner: &Arc<EngineInner>, buf: &[u8], from: SocketAddr) {
    let Some(opcode) = peek_opcode(buf) else {
        debug!("ignoring non-Art-Net datagram from {}", from);
        return;
    };
    match opcode {
        OpCode::Poll => match ArtPoll::decode(buf) {
            Ok(poll) => handle_poll(inner, poll, from),
            Err(e) => warn!("malformed ArtPoll from {}: {}", from, e),
        },
        OpCode::PollReply => {
            // our own broadcast comes back to us; the echo carries our
            // bound address as its source
            if from == inner.local_addr {
                trace!("ignoring our own poll reply echo");
                return;
            }
            match ArtPollReply::decode(buf) {
                Ok(reply) => {
                    tokio::spawn(process_poll_reply(inner.clone(), reply, from));
                }
                Err(e) => warn!("malformed ArtPollReply from {}: {}", from, e),
            }
        }
        OpCode::Dmx => match ArtDmx::decode(buf) {
            Ok(dmx) => handle_dmx(inner, dmx, from),
            Err(e) => warn!("malformed ArtDmx from {}: {}", from, e),
        },
        OpCode::DiagData => match ArtDiagData::decode(buf) {
            Ok(diag) => trace!("diagnostics from {}: {}", from, diag.text),
            Err(e) => warn!("malformed ArtDiagData from {}: {}", from, e),
        },
        OpCode::Command => match ArtCommand::decode(buf) {
            Ok(command) => debug!("command from {}: {}", from, command.command),
            Err(e) => warn!("malformed ArtCommand from {}: {}", from, e),
        },
        OpCode::Trigger => match ArtTrigger::decode(buf) {
            Ok(trigger) => debug!(
                "trigger from {}: key {} sub-key {}",
                from, trigger.key, trigger.sub_key
            ),
            Err(e) => warn!("malformed ArtTrigger from {}: {}", from, e),
        },
        OpCode::TimeCode => match ArtTimeCode::decode(buf) {
            Ok(tc) => trace!(
                "timecode from {}: {:02}:{:02}:{:02}.{:02}",
                from,
                tc.hours,
                tc.minutes,
                tc.seconds,
                tc.frames
            ),
            Err(e) => warn!("malformed ArtTimeCode from {}: {}", from, e),
        },
        other => trace!("ignoring {:?} from {}", other, from),
    }
}

/// Answer a discovery request targeted at (or overlapping) our ports.
fn handle_poll(inner: &Arc<EngineInner>, poll: ArtPoll, from: SocketAddr) {
    let replies = {
        let mut state = inner.state.lock();
        let Some((bottom, top)) = state.bounds() else {
            debug!("no local ports, nothing to handle for poll from {}", from);
            return;
        };
        if poll.targeted_mode && !ranges_overlap(poll.target_bottom, poll.target_top, bottom, top) {
            trace!(
                "poll from {} targets {}..{}, outside our {}..{}",
                from,
                poll.target_bottom,
                poll.target_top,
                bottom,
                top
            );
            return;
        }
        if poll.notify_on_change {
            state.change_subscribers.insert(from);
        }
        build_poll_replies(&state, &inner.config, inner.local_addr)
    };

    debug!("answering poll from {} with {} replies", from, replies.len());
    for reply in &replies {
        if let Err(e) = inner.socket.try_send_to(&reply.encode(), from) {
            warn!("poll reply to {} failed: {}", from, e);
        }
    }

    if poll.enable_diagnostics {
        let text = inner.state.lock().status_message.clone();
        let diag = ArtDiagData::new(poll.diag_priority, 0, text);
        let target = match poll.diag_mode {
            DiagnosticsMode::Unicast => from,
            DiagnosticsMode::Broadcast => inner.broadcast_addr,
        };
        if let Err(e) = inner.socket.try_send_to(&diag.encode(), target) {
            warn!("diagnostics reply to {} failed: {}", target, e);
        }
    }
}

/// Fold a poll reply into the node table.
///
/// The Art-Net spec asks receivers to wait a short random time before
/// acting on a reply so that a poll answered by a large rig does not turn
/// into a synchronized storm.
pub(crate) async fn process_poll_reply(inner: Arc<EngineInner>, reply: ArtPollReply, from: SocketAddr) {
    let SocketAddr::V4(from_v4) = from else {
        return;
    };
    let delay_ms = {
        let mut rng = rand::rng();
        rng.random_range(0..=inner.config.reply_delay_max_ms)
    };
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    let source_ip = *from_v4.ip();
    let id = NodeId {
        ip: source_ip,
        bind_index: reply.bind_index,
    };
    let (event, known) = {
        let mut state = inner.state.lock();
        let outcome = state.nodes.upsert(&reply, source_ip, Instant::now());
        if !outcome.added.is_empty() {
            state.status_message = format!("Discovered {} nodes", state.nodes.len());
            state.report_counter += 1;
            // one-way transition: stop asking to be located once we have
            // found anyone at all
            if state.indicator_state == IndicatorState::LocateIdentify {
                state.indicator_state = IndicatorState::MuteMode;
            }
        }
        let event = if outcome.created {
            Some(NodeEvent::Discovered(id))
        } else if !outcome.added.is_empty() || !outcome.removed.is_empty() {
            Some(NodeEvent::Updated(id))
        } else {
            None
        };
        (event, state.nodes.len())
    };

    if let Some(event) = event {
        if matches!(event, NodeEvent::Discovered(_)) {
            info!(
                "discovered node {} ({}), {} known",
                id, reply.short_name, known
            );
        }
        let _ = inner.events.send(event);
    }
}

/// Forward channel data addressed to one of our registered ports.
fn handle_dmx(inner: &Arc<EngineInner>, dmx: ArtDmx, from: SocketAddr) {
    let handler = {
        let mut state = inner.state.lock();
        match state.own_ports.get_mut(&dmx.port_address) {
            Some(own) => own.port.good_input.data_received = true,
            None => {
                trace!(
                    "DMX for unregistered address {} from {}",
                    dmx.port_address,
                    from
                );
                return;
            }
        }
        inner.dmx_handler.lock().clone()
    };
    trace!(
        "DMX for {} from {}: {} channels",
        dmx.port_address,
        from,
        dmx.data.len()
    );
    if let Some(handler) = handler {
        handler(dmx.port_address, &dmx.data);
    }
}

/// Whether the closed ranges `[bottom_a, top_a]` and `[bottom_b, top_b]`
/// share any address.
fn ranges_overlap(
    bottom_a: PortAddress,
    top_a: PortAddress,
    bottom_b: PortAddress,
    top_b: PortAddress,
) -> bool {
    !(top_a < bottom_b || top_b < bottom_a)
}

/// Build the poll-reply sequence describing our registered ports: ports are
/// grouped by (net, sub-net), each group split into chunks of up to 4, and
/// every packet gets the next bind index, starting at 1.
pub(crate) fn build_poll_replies(
    state: &EngineState,
    config: &EngineConfig,
    local_addr: SocketAddr,
) -> Vec<ArtPollReply> {
    let local_ip = local_ipv4(local_addr);
    let node_report =
        state
            .report_code
            .format(state.report_counter, &state.status_message);

    let mut groups: Vec<((u8, u8), Vec<(&PortAddress, &crate::output::OwnPort)>)> = Vec::new();
    for (address, own) in &state.own_ports {
        let key = (address.net(), address.sub_net());
        match groups.last_mut() {
            Some((last_key, members)) if *last_key == key => members.push((address, own)),
            _ => groups.push((key, vec![(address, own)])),
        }
    }

    let mut replies = Vec::new();
    let mut bind_index = 1u8;
    for ((net, sub), members) in &groups {
        for chunk in members.chunks(4) {
            replies.push(ArtPollReply {
                source_ip: local_ip,
                firmware_version: config.firmware_version,
                net_switch: *net,
                sub_switch: *sub,
                oem: config.oem,
                indicator_state: state.indicator_state,
                programming_authority: ProgrammingAuthority::Programmatic,
                boot_process: BootProcess::Flash,
                esta: config.esta,
                short_name: config.short_name.clone(),
                long_name: config.long_name.clone(),
                node_report: node_report.clone(),
                ports: chunk.iter().map(|(_, own)| own.port).collect(),
                style: StyleCode::Controller,
                bind_ip: local_ip,
                bind_index,
                supports_web_config: true,
                dhcp_configured: true,
                dhcp_capable: true,
                supports_15_bit_address: true,
                ..Default::default()
            });
            bind_index = bind_index.saturating_add(1);
        }
    }
    replies
}

fn local_ipv4(addr: SocketAddr) -> Ipv4Addr {
    match addr {
        SocketAddr::V4(v4) => *v4.ip(),
        SocketAddr::V6(_) => Ipv4Addr::UNSPECIFIED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(net: u8, sub: u8, universe: u16) -> PortAddress {
        PortAddress::try_new(net, sub, universe).unwrap()
    }

    #[test]
    fn test_poll_replies_chunk_by_four_with_bind_indexes() {
        let mut state = EngineState::new();
        // 5 ports in net 0 sub 0, 1 port in net 1 sub 0
        for universe in 1..=5 {
            let a = addr(0, 0, universe);
            state.own_ports.insert(a, crate::output::OwnPort::new(a));
        }
        let extra = addr(1, 0, 0);
        state.own_ports.insert(extra, crate::output::OwnPort::new(extra));

        let config = EngineConfig::default();
        let local = "127.0.0.1:6454".parse().unwrap();
        let replies = build_poll_replies(&state, &config, local);

        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0].bind_index, 1);
        assert_eq!(replies[0].ports.len(), 4);
        assert_eq!(replies[0].net_switch, 0);
        assert_eq!(replies[1].bind_index, 2);
        assert_eq!(replies[1].ports.len(), 1);
        assert_eq!(replies[2].bind_index, 3);
        assert_eq!(replies[2].net_switch, 1);
        assert_eq!(replies[2].ports.len(), 1);

        for reply in &replies {
            assert_eq!(reply.short_name, config.short_name);
            assert_eq!(reply.esta, config.esta);
        }
    }

    #[test]
    fn test_poll_reply_ports_carry_universe_switches() {
        let mut state = EngineState::new();
        let a = addr(0, 2, 9);
        state.own_ports.insert(a, crate::output::OwnPort::new(a));

        let replies = build_poll_replies(
            &state,
            &EngineConfig::default(),
            "127.0.0.1:6454".parse().unwrap(),
        );
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].sub_switch, 2);
        assert_eq!(replies[0].ports[0].sw_in, 9);
        assert!(replies[0].ports[0].input);
        assert!(replies[0].ports[0].output);
    }

    #[test]
    fn test_ranges_overlap() {
        // disjoint: poll targets net 1, we live in net 0
        assert!(!ranges_overlap(
            addr(1, 0, 0),
            addr(1, 15, 511),
            addr(0, 0, 1),
            addr(0, 0, 8),
        ));
        // touching at a single address
        assert!(ranges_overlap(
            addr(0, 0, 8),
            addr(0, 0, 20),
            addr(0, 0, 1),
            addr(0, 0, 8),
        ));
        // containment
        assert!(ranges_overlap(
            addr(0, 0, 0),
            addr(7, 15, 511),
            addr(0, 0, 3),
            addr(0, 0, 3),
        ));
    }
}
