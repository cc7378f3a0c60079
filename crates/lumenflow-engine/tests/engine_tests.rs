use std::net::SocketAddr;
use std::time::{Duration, Instant};

use lumenflow_engine::{ArtNetEngine, EngineConfig, NodeEvent, SendOutcome};
use lumenflow_proto::{
    ArtDmx, ArtPoll, ArtPollReply, OpCode, Port, PortAddress, peek_opcode,
};
use tokio::net::UdpSocket;
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn test_config() -> EngineConfig {
    EngineConfig {
        bind_ip: "127.0.0.1".parse().unwrap(),
        port: 0,
        broadcast_ip: "127.0.0.1".parse().unwrap(),
        polling_enabled: false,
        retransmit_interval_ms: 50,
        reply_delay_max_ms: 0,
        ..Default::default()
    }
}

async fn spawn_engine(config: EngineConfig) -> (ArtNetEngine, SocketAddr) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    let engine = ArtNetEngine::bind(config).await.unwrap();
    engine.start();
    let addr = engine.local_addr();
    (engine, addr)
}

/// A fake remote node: a plain UDP socket we craft poll replies from and
/// receive DMX frames on.
async fn spawn_node() -> (UdpSocket, u16) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

/// Poll reply advertising a single input port listening on `universe`,
/// answering on `udp_port`.
fn node_reply(udp_port: u16, universe: u8) -> ArtPollReply {
    ArtPollReply {
        port: udp_port,
        bind_index: 1,
        ports: vec![Port {
            input: true,
            sw_in: universe,
            ..Default::default()
        }],
        ..Default::default()
    }
}

async fn recv_packet(socket: &UdpSocket) -> Vec<u8> {
    let mut buf = [0u8; 1024];
    let (len, _) = timeout(RECV_TIMEOUT, socket.recv_from(&mut buf))
        .await
        .expect("timed out waiting for packet")
        .unwrap();
    buf[..len].to_vec()
}

async fn wait_for_condition<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + RECV_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within timeout");
}

fn addr(universe: u16) -> PortAddress {
    PortAddress::try_new(0, 0, universe).unwrap()
}

#[tokio::test]
async fn test_send_without_discovery_reports_no_nodes() {
    let (engine, _) = spawn_engine(test_config()).await;
    engine.register_port(addr(1)).unwrap();

    let outcome = engine.send(addr(1), &[0; 512]).unwrap();
    assert_eq!(outcome, SendOutcome::NoNodesKnown);
    engine.shutdown();
}

#[tokio::test]
async fn test_send_on_unregistered_address_is_an_error() {
    let (engine, _) = spawn_engine(test_config()).await;
    assert!(engine.send(addr(1), &[0; 512]).is_err());
    engine.shutdown();
}

#[tokio::test]
async fn test_scenario_register_discover_send() {
    let (engine, engine_addr) = spawn_engine(test_config()).await;
    engine.register_port(addr(1)).unwrap();

    // nothing discovered yet: data is dropped
    assert_eq!(
        engine.send(addr(1), &[0; 512]).unwrap(),
        SendOutcome::NoNodesKnown
    );

    // a node claiming net=0, sub=0, one input port with sw_in=1 appears
    let (node, node_port) = spawn_node().await;
    node.send_to(&node_reply(node_port, 1).encode(), engine_addr)
        .await
        .unwrap();
    wait_for_condition(|| engine.nodes().len() == 1).await;
    assert_eq!(engine.nodes_for(addr(1)).len(), 1);

    // the same send now starts a retransmission loop
    assert_eq!(
        engine.send(addr(1), &[7; 512]).unwrap(),
        SendOutcome::Started
    );

    let frame = ArtDmx::decode(&recv_packet(&node).await).unwrap();
    assert_eq!(frame.port_address, addr(1));
    assert_eq!(frame.data, vec![7; 512]);
    assert_eq!(frame.sequence, 1);

    // frames keep coming, sequence counting up
    let frame = ArtDmx::decode(&recv_packet(&node).await).unwrap();
    assert_eq!(frame.sequence, 2);
    engine.shutdown();
}

#[tokio::test]
async fn test_send_distinguishes_no_subscribers_from_no_nodes() {
    let (engine, engine_addr) = spawn_engine(test_config()).await;
    engine.register_port(addr(1)).unwrap();

    // node exists but serves universe 2, not 1
    let (node, node_port) = spawn_node().await;
    node.send_to(&node_reply(node_port, 2).encode(), engine_addr)
        .await
        .unwrap();
    wait_for_condition(|| engine.nodes().len() == 1).await;

    assert_eq!(
        engine.send(addr(1), &[0; 512]).unwrap(),
        SendOutcome::NoSubscribers
    );
    engine.shutdown();
}

#[tokio::test]
async fn test_second_send_replaces_the_first_loop() {
    let (engine, engine_addr) = spawn_engine(test_config()).await;
    engine.register_port(addr(1)).unwrap();

    let (node, node_port) = spawn_node().await;
    node.send_to(&node_reply(node_port, 1).encode(), engine_addr)
        .await
        .unwrap();
    wait_for_condition(|| engine.nodes().len() == 1).await;

    engine.send(addr(1), &[1; 512]).unwrap();
    engine.send(addr(1), &[2; 512]).unwrap();

    // the first loop may have emitted one frame before it was cancelled;
    // once the replacement's data shows up, nothing interleaves
    let mut saw_replacement = false;
    let mut frames = Vec::new();
    for _ in 0..6 {
        let frame = ArtDmx::decode(&recv_packet(&node).await).unwrap();
        if frame.data == vec![2u8; 512] {
            saw_replacement = true;
        } else {
            assert!(
                !saw_replacement,
                "old loop still transmitting after replacement"
            );
        }
        frames.push(frame);
    }
    assert!(saw_replacement);

    // a single live loop produces strictly consecutive sequence numbers
    for window in frames.windows(2) {
        let expected = if window[0].sequence == 255 {
            1
        } else {
            window[0].sequence + 1
        };
        assert_eq!(window[1].sequence, expected);
    }
    engine.shutdown();
}

#[tokio::test]
async fn test_unregister_cancels_transmission() {
    let (engine, engine_addr) = spawn_engine(test_config()).await;
    engine.register_port(addr(1)).unwrap();

    let (node, node_port) = spawn_node().await;
    node.send_to(&node_reply(node_port, 1).encode(), engine_addr)
        .await
        .unwrap();
    wait_for_condition(|| engine.nodes().len() == 1).await;

    engine.send(addr(1), &[9; 512]).unwrap();
    let _ = recv_packet(&node).await;

    engine.unregister_port(addr(1)).unwrap();
    // drain anything already in flight, then expect silence
    tokio::time::sleep(Duration::from_millis(150)).await;
    let mut buf = [0u8; 1024];
    while node.try_recv_from(&mut buf).is_ok() {}
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(node.try_recv_from(&mut buf).is_err());

    assert!(engine.unregister_port(addr(1)).is_err());
    engine.shutdown();
}

#[tokio::test]
async fn test_poll_is_answered_with_port_description() {
    let (engine, engine_addr) = spawn_engine(test_config()).await;
    engine.register_port(addr(1)).unwrap();
    engine.register_port(addr(2)).unwrap();

    let (controller, _) = spawn_node().await;
    controller
        .send_to(&ArtPoll::default().encode(), engine_addr)
        .await
        .unwrap();

    let reply = ArtPollReply::decode(&recv_packet(&controller).await).unwrap();
    assert_eq!(reply.bind_index, 1);
    assert_eq!(reply.ports.len(), 2);
    assert_eq!(reply.ports[0].sw_in, 1);
    assert_eq!(reply.ports[1].sw_in, 2);
    assert!(reply.node_report.starts_with('#'));
    engine.shutdown();
}

#[tokio::test]
async fn test_targeted_poll_outside_bounds_is_ignored() {
    let (engine, engine_addr) = spawn_engine(test_config()).await;
    engine.register_port(addr(1)).unwrap();

    let (controller, _) = spawn_node().await;
    // local bounds are entirely within net 0; target net 1 only
    let poll = ArtPoll::default().with_targets(
        PortAddress::try_new(1, 0, 0).unwrap(),
        PortAddress::try_new(1, 15, 511).unwrap(),
    );
    controller.send_to(&poll.encode(), engine_addr).await.unwrap();

    let mut buf = [0u8; 1024];
    let result = timeout(Duration::from_millis(300), controller.recv_from(&mut buf)).await;
    assert!(result.is_err(), "expected no reply to an off-range poll");
    engine.shutdown();
}

#[tokio::test]
async fn test_poll_with_no_registered_ports_is_ignored() {
    let (engine, engine_addr) = spawn_engine(test_config()).await;

    let (controller, _) = spawn_node().await;
    controller
        .send_to(&ArtPoll::default().encode(), engine_addr)
        .await
        .unwrap();

    let mut buf = [0u8; 1024];
    let result = timeout(Duration::from_millis(300), controller.recv_from(&mut buf)).await;
    assert!(result.is_err(), "nothing to handle, expected silence");
    engine.shutdown();
}

#[tokio::test]
async fn test_change_subscribers_get_unsolicited_replies() {
    let (engine, engine_addr) = spawn_engine(test_config()).await;
    engine.register_port(addr(1)).unwrap();

    let (controller, _) = spawn_node().await;
    let poll = ArtPoll {
        notify_on_change: true,
        ..Default::default()
    };
    controller.send_to(&poll.encode(), engine_addr).await.unwrap();
    let _ = recv_packet(&controller).await; // the direct answer

    // registering another port is a status change
    engine.register_port(addr(2)).unwrap();
    let unsolicited = ArtPollReply::decode(&recv_packet(&controller).await).unwrap();
    assert_eq!(unsolicited.ports.len(), 2);
    engine.shutdown();
}

#[tokio::test]
async fn test_inbound_dmx_reaches_the_handler() {
    let (engine, engine_addr) = spawn_engine(test_config()).await;
    engine.register_port(addr(1)).unwrap();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    engine.on_dmx(move |address, data| {
        let _ = tx.send((address, data.to_vec()));
    });

    let (node, _) = spawn_node().await;
    // data for the registered port reaches the handler
    let frame = ArtDmx::new(0, addr(1), vec![1, 2, 3, 4]);
    node.send_to(&frame.encode(), engine_addr).await.unwrap();
    let (address, data) = timeout(RECV_TIMEOUT, rx.recv()).await.unwrap().unwrap();
    assert_eq!(address, addr(1));
    assert_eq!(data, vec![1, 2, 3, 4]);

    // data for an unregistered port is dropped
    let frame = ArtDmx::new(0, addr(2), vec![9; 8]);
    node.send_to(&frame.encode(), engine_addr).await.unwrap();
    assert!(
        timeout(Duration::from_millis(300), rx.recv()).await.is_err(),
        "unregistered address must not reach the handler"
    );
    engine.shutdown();
}

#[tokio::test]
async fn test_stale_nodes_are_swept_while_polling() {
    let config = EngineConfig {
        polling_enabled: true,
        poll_interval_min_ms: 50,
        poll_interval_max_ms: 80,
        sweep_delay_ms: 10,
        node_ttl_ms: 150,
        ..test_config()
    };
    let (engine, engine_addr) = spawn_engine(config).await;
    engine.register_port(addr(1)).unwrap();
    let mut events = engine.subscribe();

    let (node, node_port) = spawn_node().await;
    node.send_to(&node_reply(node_port, 1).encode(), engine_addr)
        .await
        .unwrap();
    wait_for_condition(|| engine.nodes().len() == 1).await;

    // never refreshed: the sweep following a later poll evicts it
    wait_for_condition(|| engine.nodes().is_empty()).await;
    loop {
        let event = timeout(RECV_TIMEOUT, events.recv()).await.unwrap().unwrap();
        if let NodeEvent::Evicted(id) = event {
            assert_eq!(id.ip, "127.0.0.1".parse::<std::net::Ipv4Addr>().unwrap());
            break;
        }
    }
    engine.shutdown();
}

#[tokio::test]
async fn test_transmission_stops_when_last_subscriber_leaves() {
    let config = EngineConfig {
        polling_enabled: true,
        poll_interval_min_ms: 50,
        poll_interval_max_ms: 80,
        sweep_delay_ms: 10,
        node_ttl_ms: 150,
        ..test_config()
    };
    let (engine, engine_addr) = spawn_engine(config).await;
    engine.register_port(addr(1)).unwrap();

    let (node, node_port) = spawn_node().await;
    node.send_to(&node_reply(node_port, 1).encode(), engine_addr)
        .await
        .unwrap();
    wait_for_condition(|| engine.nodes().len() == 1).await;

    engine.send(addr(1), &[5; 512]).unwrap();
    let _ = recv_packet(&node).await;

    // let the node go stale; the retransmission loop sees the empty
    // subscriber set and stops on its own
    wait_for_condition(|| engine.nodes().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(150)).await;
    let mut buf = [0u8; 1024];
    while node.try_recv_from(&mut buf).is_ok() {}
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(node.try_recv_from(&mut buf).is_err());
    engine.shutdown();
}

#[tokio::test]
async fn test_foreign_traffic_is_ignored() {
    let (engine, engine_addr) = spawn_engine(test_config()).await;
    engine.register_port(addr(1)).unwrap();

    let (sender, _) = spawn_node().await;
    // not Art-Net at all, too short, and a recognized-but-unhandled opcode
    sender.send_to(b"GET / HTTP/1.0\r\n", engine_addr).await.unwrap();
    sender.send_to(b"Art", engine_addr).await.unwrap();
    let mut sync_packet = b"Art-Net\0".to_vec();
    sync_packet.extend_from_slice(&0x5200u16.to_le_bytes());
    sync_packet.extend_from_slice(&[0, 14, 0, 0]);
    assert_eq!(peek_opcode(&sync_packet), Some(OpCode::Sync));
    sender.send_to(&sync_packet, engine_addr).await.unwrap();

    // engine is still alive and answering
    sender
        .send_to(&ArtPoll::default().encode(), engine_addr)
        .await
        .unwrap();
    let reply = ArtPollReply::decode(&recv_packet(&sender).await).unwrap();
    assert_eq!(reply.ports.len(), 1);
    engine.shutdown();
}
