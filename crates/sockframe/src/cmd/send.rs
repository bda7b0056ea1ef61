use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use sockframe_conn::{Connection, ConnectionError, ConnectionState};
use sockframe_frame::FlushStatus;
use sockframe_transport::{SocketFactory, TcpSocketFactory};
use tracing::{debug, info, warn};

use crate::cmd::SendArgs;
use crate::exit::{connection_error, CliError, CliResult, DATA_INVALID, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_message, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let config = args.buffers.to_config()?;
    let payload = resolve_payload(&args)?;
    if payload.len() > config.max_outbound_payload() {
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "payload is {} bytes; at most {} fit in one message",
                payload.len(),
                config.max_outbound_payload()
            ),
        ));
    }

    let mut conn = Connection::new(TcpSocketFactory, config);
    for addr in &args.addrs {
        if !conn.add_address(*addr) {
            warn!(%addr, "duplicate address ignored");
        }
    }

    let deadline = Instant::now() + timeout;
    connect(&mut conn, deadline)?;

    conn.send_message(&payload)
        .map_err(|err| connection_error("send failed", err))?;
    drain(&mut conn, deadline)?;
    info!(peer = ?conn.peer_addr(), size = payload.len(), "message sent");

    if args.wait {
        let reply = wait_for_message(&mut conn, deadline)?;
        print_message(&reply, conn.peer_addr(), format);
    }

    Ok(SUCCESS)
}

/// Drive the connection through the address queue until one connects.
fn connect<F: SocketFactory>(conn: &mut Connection<F>, deadline: Instant) -> CliResult<()> {
    let mut last_error = None;
    loop {
        let attempt = if conn.state().can_connect() {
            conn.do_connect()
        } else {
            conn.poll_connect()
        };

        match attempt {
            Ok(ConnectionState::Connected) => return Ok(()),
            Ok(_) => {}
            Err(ConnectionError::NoAddresses) => {
                return Err(connection_error("connect failed", ConnectionError::NoAddresses))
            }
            Err(err) => {
                debug!(peer = ?conn.peer_addr(), error = %err, "connect attempt failed");
                last_error = Some(err);
            }
        }

        if Instant::now() >= deadline {
            let detail = last_error
                .map(|err| err.to_string())
                .unwrap_or_else(|| "still connecting".to_string());
            return Err(CliError::new(TIMEOUT, format!("connect timed out: {detail}")));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn drain<F: SocketFactory>(conn: &mut Connection<F>, deadline: Instant) -> CliResult<()> {
    loop {
        match conn
            .flush()
            .map_err(|err| connection_error("send failed", err))?
        {
            FlushStatus::Drained => return Ok(()),
            FlushStatus::Pending if Instant::now() >= deadline => {
                return Err(CliError::new(TIMEOUT, "timed out flushing message"))
            }
            FlushStatus::Pending => thread::sleep(POLL_INTERVAL),
        }
    }
}

fn wait_for_message<F: SocketFactory>(
    conn: &mut Connection<F>,
    deadline: Instant,
) -> CliResult<Bytes> {
    loop {
        if let Some(message) = conn
            .get_message()
            .map_err(|err| connection_error("receive failed", err))?
        {
            return Ok(message);
        }
        if Instant::now() >= deadline {
            return Err(CliError::new(TIMEOUT, "timed out waiting for reply"));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.as_bytes().to_vec());
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Ok(Vec::new())
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener};

    use sockframe_conn::ConnectionConfig;

    use super::*;
    use crate::cmd::BufferArgs;

    fn send_args(json: Option<&str>, data: Option<&str>) -> SendArgs {
        SendArgs {
            addrs: vec!["127.0.0.1:1".parse().unwrap()],
            json: json.map(str::to_string),
            data: data.map(str::to_string),
            file: None,
            wait: false,
            timeout: "1s".to_string(),
            buffers: BufferArgs {
                reader_capacity: 64,
                writer_capacity: 64,
                flush_threshold: 16,
                no_auto_flush: false,
            },
        }
    }

    fn unused_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert_eq!(parse_duration("  ").unwrap_err().code, USAGE);
    }

    #[test]
    fn json_payload_must_parse() {
        let err = resolve_payload(&send_args(Some("{oops"), None)).unwrap_err();
        assert_eq!(err.code, USAGE);
        assert_eq!(
            resolve_payload(&send_args(Some("{\"a\":1}"), None)).unwrap(),
            b"{\"a\":1}"
        );
    }

    #[test]
    fn missing_payload_is_empty_message() {
        assert!(resolve_payload(&send_args(None, None)).unwrap().is_empty());
        assert_eq!(resolve_payload(&send_args(None, Some("hi"))).unwrap(), b"hi");
    }

    #[test]
    fn oversized_payload_rejected_before_connecting() {
        let mut args = send_args(None, None);
        args.data = Some("x".repeat(63));
        let err = run(args, OutputFormat::Json).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn connect_times_out_against_closed_ports() {
        let mut conn = Connection::new(TcpSocketFactory, ConnectionConfig::default());
        conn.add_address(unused_addr());
        conn.add_address(unused_addr());

        let err = connect(&mut conn, Instant::now() + Duration::from_millis(200)).unwrap_err();
        assert_eq!(err.code, TIMEOUT);
        assert!(!conn.is_connected());
    }

    #[test]
    fn connect_without_addresses_is_usage_error() {
        let mut conn = Connection::new(TcpSocketFactory, ConnectionConfig::default());
        let err = connect(&mut conn, Instant::now() + Duration::from_secs(1)).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn fails_over_to_live_address_and_reads_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let live = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut frame = [0u8; 6];
            stream.read_exact(&mut frame).unwrap();
            stream.write_all(&frame).unwrap();
        });

        let mut conn = Connection::new(TcpSocketFactory, ConnectionConfig::default());
        conn.add_address(unused_addr());
        conn.add_address(live);

        let deadline = Instant::now() + Duration::from_secs(5);
        connect(&mut conn, deadline).unwrap();
        assert_eq!(conn.peer_addr(), Some(live));

        conn.send_message(b"ping").unwrap();
        drain(&mut conn, deadline).unwrap();
        assert_eq!(wait_for_message(&mut conn, deadline).unwrap().as_ref(), b"ping");
        server.join().unwrap();
    }
}
