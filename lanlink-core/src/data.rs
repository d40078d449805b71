//! UDP data-channel socket construction.
//!
//! The data channel is stateless: loss, duplication and reordering
//! are all handled by the session state machine, never here. This
//! module only builds the two socket shapes a session needs.

use std::net::{Ipv4Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::config::UDP_RECV_BUFFER;
use crate::error::TransferError;

/// Bind the receiver-side session socket on an ephemeral port.
///
/// The 4 MiB receive buffer is requested best-effort; the kernel may
/// clamp or refuse it without failing the bind.
pub fn bind_session_socket() -> Result<UdpSocket, TransferError> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    let _ = socket.set_recv_buffer_size(UDP_RECV_BUFFER);
    socket.set_nonblocking(true)?;

    let any: SocketAddr = (Ipv4Addr::UNSPECIFIED, 0).into();
    socket.bind(&any.into())?;

    let udp = UdpSocket::from_std(socket.into())?;
    let addr = udp.local_addr()?;
    debug!(%addr, "session UDP socket bound");
    Ok(udp)
}

/// Open the sender-side socket, connected to the receiver's
/// announced session port.
pub async fn connect_session_socket(peer: SocketAddr) -> Result<UdpSocket, TransferError> {
    let udp = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
    udp.connect(peer).await?;
    debug!(%peer, "session UDP socket connected");
    Ok(udp)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_allocates_an_ephemeral_port() {
        let a = bind_session_socket().unwrap();
        let b = bind_session_socket().unwrap();
        let pa = a.local_addr().unwrap().port();
        let pb = b.local_addr().unwrap().port();
        assert_ne!(pa, 0);
        assert_ne!(pb, 0);
        // Two concurrent sessions never share a port.
        assert_ne!(pa, pb);
    }

    #[tokio::test]
    async fn connected_socket_reaches_bound_socket() {
        let receiver = bind_session_socket().unwrap();
        let port = receiver.local_addr().unwrap().port();

        let sender = connect_session_socket((Ipv4Addr::LOCALHOST, port).into())
            .await
            .unwrap();
        sender.send(b"ping").await.unwrap();

        let mut buf = [0u8; 16];
        let (n, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"ping");
    }
}
