//! Request dispatcher (spec §4.3): one acceptor loop multiplexing a
//! datagram endpoint and a stream endpoint on the same port. UDP requests
//! are handled inline; each accepted TCP connection is handed to an
//! independent task so a slow `PST`/`RTV` transfer never blocks the next
//! UDP request or TCP accept (spec §5).

use ds_proto::tags::MAX_REQUEST_UDP;
use ds_store::Store;
use std::io;
use tokio::net::{TcpListener, UdpSocket};

use crate::{tcp, udp};

pub async fn run(store: Store, port: u16) -> io::Result<()> {
    let udp_socket = UdpSocket::bind(("0.0.0.0", port)).await?;
    let tcp_listener = TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("listening on UDP+TCP port {port}");

    let mut udp_buf = vec![0u8; MAX_REQUEST_UDP];

    loop {
        tokio::select! {
            result = udp_socket.recv_from(&mut udp_buf) => {
                let (len, peer) = result?;
                log::debug!("udp datagram from {peer}");
                let reply = udp::dispatch(&store, &udp_buf[..len]).await;
                if let Err(e) = udp_socket.send_to(&reply, peer).await {
                    log::error!("failed to send UDP reply to {peer}: {e}");
                }
            }
            result = tcp_listener.accept() => {
                let (stream, peer) = result?;
                log::debug!("tcp connection from {peer}");
                let store = store.clone();
                tokio::spawn(async move {
                    tcp::handle_connection(&store, stream).await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("received shutdown signal");
                return Ok(());
            }
        }
    }
}
