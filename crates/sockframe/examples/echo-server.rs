//! Minimal echo server: accepts one client and echoes messages back.
//!
//! Run with:
//!   cargo run --example echo-server
//!
//! In another terminal:
//!   cargo run --features cli -- send 127.0.0.1:7878 --data hello --wait

use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use sockframe::conn::{Connection, ConnectionConfig};
use sockframe::transport::{StreamSocket, TcpSocket, TcpSocketFactory};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:7878")?;
    eprintln!("Listening on {}", listener.local_addr()?);

    let (stream, peer) = listener.accept()?;
    eprintln!("Client connected: {peer}");

    let mut socket = TcpSocket::from_stream(stream);
    socket.set_non_blocking()?;
    socket.set_no_delay()?;
    let mut conn = Connection::adopt(TcpSocketFactory, socket, peer, ConnectionConfig::default());

    loop {
        match conn.get_message() {
            Ok(Some(message)) => {
                eprintln!("Received {} bytes", message.len());
                conn.send_message(&message)?;
            }
            Ok(None) => {
                conn.flush()?;
                thread::sleep(Duration::from_millis(1));
            }
            Err(e) => {
                eprintln!("Client disconnected: {e}");
                break;
            }
        }
    }

    Ok(())
}
