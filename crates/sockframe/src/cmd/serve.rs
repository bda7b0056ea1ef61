use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use sockframe_conn::{Connection, ConnectionConfig};
use sockframe_frame::FlushStatus;
use sockframe_transport::{StreamSocket, TcpSocket, TcpSocketFactory};
use tracing::{info, warn};

use crate::exit::{io_error, CliError, CliResult, INTERNAL};

/// Sleep between polls when neither the listener nor the client has work.
const IDLE_POLL: Duration = Duration::from_millis(2);

/// How long a departing client's queued replies may take to drain.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

pub type ServerConnection = Connection<TcpSocketFactory>;

/// What to do after a message has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    /// Drop this client and accept the next one.
    Disconnect,
    /// Stop serving altogether.
    Stop,
}

pub fn bind(addr: SocketAddr) -> CliResult<TcpListener> {
    let listener =
        TcpListener::bind(addr).map_err(|err| io_error(&format!("bind {addr} failed"), err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| io_error("listener setup failed", err))?;
    Ok(listener)
}

/// Accept clients one at a time and hand every received message to
/// `on_message` until `running` is cleared or the handler says stop.
pub fn serve<H>(
    listener: TcpListener,
    config: &ConnectionConfig,
    running: &AtomicBool,
    mut on_message: H,
) -> CliResult<()>
where
    H: FnMut(&mut ServerConnection, Bytes) -> Disposition,
{
    if let Ok(local) = listener.local_addr() {
        info!(%local, "listening");
    }

    while running.load(Ordering::SeqCst) {
        let (stream, peer) = match listener.accept() {
            Ok(pair) => pair,
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                thread::sleep(IDLE_POLL);
                continue;
            }
            Err(err) => return Err(io_error("accept failed", err)),
        };

        let mut conn = match adopt(stream, peer, config) {
            Ok(conn) => conn,
            Err(err) => {
                warn!(%peer, error = %err, "could not configure accepted socket");
                continue;
            }
        };
        info!(%peer, "client connected");

        if serve_client(&mut conn, running, &mut on_message) == Disposition::Stop {
            return Ok(());
        }
    }

    Ok(())
}

fn adopt(
    stream: TcpStream,
    peer: SocketAddr,
    config: &ConnectionConfig,
) -> std::io::Result<ServerConnection> {
    let mut socket = TcpSocket::from_stream(stream);
    socket.set_non_blocking()?;
    socket.set_no_delay()?;
    Ok(Connection::adopt(
        TcpSocketFactory,
        socket,
        peer,
        config.clone(),
    ))
}

fn serve_client<H>(conn: &mut ServerConnection, running: &AtomicBool, on_message: &mut H) -> Disposition
where
    H: FnMut(&mut ServerConnection, Bytes) -> Disposition,
{
    while running.load(Ordering::SeqCst) {
        match conn.get_message() {
            Ok(Some(message)) => match on_message(conn, message) {
                Disposition::Continue => {}
                other => {
                    drain_before_leaving(conn);
                    return other;
                }
            },
            Ok(None) => {
                if let Err(err) = conn.flush() {
                    warn!(peer = ?conn.peer_addr(), error = %err, "client dropped");
                    return Disposition::Disconnect;
                }
                thread::sleep(IDLE_POLL);
            }
            Err(err) if err.is_peer_closed() => {
                info!(peer = ?conn.peer_addr(), "client disconnected");
                return Disposition::Disconnect;
            }
            Err(err) => {
                warn!(peer = ?conn.peer_addr(), error = %err, "client dropped");
                return Disposition::Disconnect;
            }
        }
    }
    Disposition::Stop
}

/// Push out replies still queued before a client is let go. Gives up after
/// `DRAIN_GRACE` so a stalled reader cannot hold the server.
fn drain_before_leaving(conn: &mut ServerConnection) -> bool {
    if !conn.is_connected() {
        return false;
    }
    let deadline = Instant::now() + DRAIN_GRACE;
    loop {
        match conn.flush() {
            Ok(FlushStatus::Drained) => return true,
            Ok(FlushStatus::Pending) if Instant::now() < deadline => thread::sleep(IDLE_POLL),
            Ok(FlushStatus::Pending) => {
                warn!(
                    peer = ?conn.peer_addr(),
                    unsent = conn.writer().amount_buffered(),
                    "replies left unsent"
                );
                return false;
            }
            Err(err) => {
                warn!(peer = ?conn.peer_addr(), error = %err, "final flush failed");
                return false;
            }
        }
    }
}

pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
