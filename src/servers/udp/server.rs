//! The UDP server: a single read loop per socket dispatching datagrams to
//! worker tasks.
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::handlers::{self, UdpService};
use super::{UdpRequest, MAX_PACKET_SIZE};
use crate::bootstrap::jobs::Started;
use crate::servers::signals::{shutdown_signal_with_message, Halted};

/// Starts the UDP server task.
///
/// The task binds the socket, reports the bound address through `tx_start`
/// and serves datagrams until the halt channel or a global shutdown signal
/// fires.
#[must_use]
pub fn start_job(
    bind_to: SocketAddr,
    service: Arc<UdpService>,
    tx_start: oneshot::Sender<Started>,
    rx_halt: oneshot::Receiver<Halted>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_with_graceful_shutdown(bind_to, service, tx_start, rx_halt).await;
    })
}

async fn run_with_graceful_shutdown(
    bind_to: SocketAddr,
    service: Arc<UdpService>,
    tx_start: oneshot::Sender<Started>,
    rx_halt: oneshot::Receiver<Halted>,
) {
    let socket = match UdpSocket::bind(bind_to).await {
        Ok(socket) => Arc::new(socket),
        Err(e) => {
            error!("could not bind udp tracker to {bind_to}: {e}");
            return;
        }
    };

    let address = socket.local_addr().expect("a bound socket has a local address");

    info!("udp tracker listening on udp://{address}");

    tx_start
        .send(Started { address })
        .expect("the server starter should wait for the started message");

    tokio::select! {
        () = shutdown_signal_with_message(rx_halt, format!("shutting down udp tracker on {address}")) => {},
        () = receive_loop(socket, service) => {}
    }
}

async fn receive_loop(socket: Arc<UdpSocket>, service: Arc<UdpService>) {
    let mut buffer = [0u8; MAX_PACKET_SIZE];

    loop {
        match socket.recv_from(&mut buffer).await {
            Ok((len, from)) => {
                let request = UdpRequest {
                    payload: buffer[..len].to_vec(),
                    from,
                };

                let socket = socket.clone();
                let service = service.clone();

                tokio::spawn(async move {
                    if let Some(response) = handlers::handle_packet(request, &service).await {
                        send_response(&socket, from, &response).await;
                    }
                });
            }
            Err(e) => {
                warn!("error receiving udp datagram: {e}");
            }
        }
    }
}

async fn send_response(socket: &UdpSocket, to: SocketAddr, response: &aquatic_udp_protocol::Response) {
    let mut cursor = Cursor::new(Vec::with_capacity(MAX_PACKET_SIZE));

    match response.write(&mut cursor) {
        Ok(()) => {
            let payload = cursor.get_ref();

            debug!("sending {} response bytes to {to}", payload.len());

            if let Err(e) = socket.send_to(payload, to).await {
                warn!("could not send udp response to {to}: {e}");
            }
        }
        Err(e) => {
            error!("could not serialize udp response for {to}: {e}");
        }
    }
}
