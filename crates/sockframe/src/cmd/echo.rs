use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{info, warn};

use crate::cmd::serve::{self, Disposition, ServerConnection};
use crate::cmd::EchoArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: EchoArgs, _format: OutputFormat) -> CliResult<i32> {
    let config = args.buffers.to_config()?;
    let listener = serve::bind(args.bind)?;

    let running = Arc::new(AtomicBool::new(true));
    serve::install_ctrlc_handler(running.clone())?;

    serve::serve(listener, &config, &running, echo_message)?;
    Ok(SUCCESS)
}

fn echo_message(conn: &mut ServerConnection, message: Bytes) -> Disposition {
    let max = conn.config().max_outbound_payload();
    if message.len() > max {
        warn!(
            peer = ?conn.peer_addr(),
            size = message.len(),
            max,
            "message larger than write buffer; not echoed"
        );
        return Disposition::Continue;
    }

    info!(peer = ?conn.peer_addr(), size = message.len(), "echoing message");
    match conn.send_message(&message) {
        Ok(()) => Disposition::Continue,
        Err(err) => {
            warn!(error = %err, "echo send failed");
            Disposition::Disconnect
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{SocketAddr, TcpListener, TcpStream};

    use sockframe_conn::{Connection, ConnectionConfig, ConnectionState};
    use sockframe_transport::{StreamSocket, TcpSocket, TcpSocketFactory};

    use super::*;

    fn server_with_writer(writer_capacity: usize) -> (ServerConnection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (stream, peer): (TcpStream, SocketAddr) = listener.accept().unwrap();

        let mut socket = TcpSocket::from_stream(stream);
        socket.set_non_blocking().unwrap();
        let config = ConnectionConfig {
            writer_capacity,
            flush_threshold: None,
            ..ConnectionConfig::default()
        };
        (Connection::adopt(TcpSocketFactory, socket, peer, config), client)
    }

    #[test]
    fn oversized_for_writer_is_skipped_and_client_kept() {
        let (mut server, _client) = server_with_writer(8);

        let disposition = echo_message(&mut server, Bytes::from_static(b"0123456789"));

        assert_eq!(disposition, Disposition::Continue);
        assert_eq!(server.state(), ConnectionState::Connected);
        assert_eq!(server.writer().amount_buffered(), 0);
    }

    #[test]
    fn fitting_message_is_queued() {
        let (mut server, _client) = server_with_writer(8);

        let disposition = echo_message(&mut server, Bytes::from_static(b"012345"));

        assert_eq!(disposition, Disposition::Continue);
        assert_eq!(server.writer().pending(), b"\x00\x06012345");
    }
}
