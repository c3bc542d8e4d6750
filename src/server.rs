//! UDP session server.
//!
//! Every datagram is one command and gets exactly one reply datagram. Each
//! is handled on its own task; the station itself sits behind a single
//! mutex, taken on the blocking pool because commands sleep through relay
//! settle delays while holding it.

use crate::error::DaemonError;
use crate::protocol::{Reply, MAX_DATAGRAM_SIZE};
use crate::station::Station;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub struct StationServer {
    socket: Arc<UdpSocket>,
    station: Arc<Mutex<Station>>,
}

impl StationServer {
    pub async fn bind(addr: SocketAddr, station: Station) -> Result<Self, DaemonError> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Listening for commands on udp://{}", socket.local_addr()?);
        Ok(Self {
            socket: Arc::new(socket),
            station: Arc::new(Mutex::new(station)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn station(&self) -> Arc<Mutex<Station>> {
        Arc::clone(&self.station)
    }

    /// Serve until `shutdown` resolves, then wait for every command already
    /// received to send its reply.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), DaemonError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let mut handlers = JoinSet::new();

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!(in_flight = handlers.len(), "Shutdown requested, no longer accepting commands");
                    break;
                }
                Some(finished) = handlers.join_next(), if !handlers.is_empty() => {
                    if let Err(e) = finished {
                        error!("Reply task failed: {e}");
                    }
                }
                received = self.socket.recv_from(&mut buf) => {
                    let (len, peer) = match received {
                        Ok(received) => received,
                        Err(e) => {
                            warn!("Failed to receive datagram: {e}");
                            continue;
                        }
                    };
                    let datagram = String::from_utf8_lossy(&buf[..len]).into_owned();
                    debug!(%peer, datagram = datagram.trim(), "Received");

                    let socket = Arc::clone(&self.socket);
                    let station = Arc::clone(&self.station);
                    handlers.spawn(async move {
                        let reply = handle_datagram(station, datagram).await.to_string();
                        info!(%peer, reply = reply.trim_end(), "Replied");
                        if let Err(e) = socket.send_to(reply.as_bytes(), peer).await {
                            warn!(%peer, "Failed to send reply: {e}");
                        }
                    });
                }
            }
        }

        while let Some(finished) = handlers.join_next().await {
            if let Err(e) = finished {
                error!("Reply task failed: {e}");
            }
        }
        info!("All replies sent");
        Ok(())
    }

    pub async fn run(self) -> Result<(), DaemonError> {
        self.run_until(std::future::pending()).await
    }
}

/// Run one command under the station lock.
///
/// A panic inside the handler unwinds through the lock guard, so the lock is
/// released and the peer still gets a reply.
pub async fn handle_datagram(station: Arc<Mutex<Station>>, datagram: String) -> Reply {
    let handled =
        tokio::task::spawn_blocking(move || station.blocking_lock().handle(&datagram)).await;

    match handled {
        Ok(reply) => reply,
        Err(e) => {
            error!("Command handler failed: {e}");
            Reply::InternalError
        }
    }
}
