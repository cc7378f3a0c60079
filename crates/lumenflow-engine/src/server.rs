//! UDP socket setup and the inbound datagram loop

use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::warn;

use crate::config::EngineConfig;
use crate::discovery;
use crate::engine::EngineInner;
use crate::Result;

/// Bind the engine's UDP socket: broadcast-capable, address reuse on, and
/// non-blocking for the tokio reactor.
pub(crate) fn bind_socket(config: &EngineConfig) -> Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.set_nonblocking(true)?;
    let bind_addr = std::net::SocketAddr::new(config.bind_ip, config.port);
    socket.bind(&socket2::SockAddr::from(bind_addr))?;
    Ok(socket.into())
}

/// Receive datagrams and dispatch them until the task is aborted.
pub(crate) async fn run_recv_loop(inner: Arc<EngineInner>) {
    // largest legal Art-Net packet is an ArtDmx at 530 bytes; leave slack
    // for foreign traffic on the port
    let mut buf = [0u8; 1024];
    loop {
        match inner.socket.recv_from(&mut buf).await {
            Ok((len, from)) => discovery::handle_datagram(&inner, &buf[..len], from),
            Err(e) => warn!("UDP receive failed: {}", e),
        }
    }
}
