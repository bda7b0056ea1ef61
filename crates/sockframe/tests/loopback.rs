#![cfg(all(unix, feature = "conn"))]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread;
use std::time::{Duration, Instant};

use sockframe::conn::{Connection, ConnectionConfig, ConnectionError, ConnectionState};
use sockframe::frame::{FlushStatus, FrameError, MAX_PAYLOAD};
use sockframe::transport::{StreamSocket, TcpSocket, TcpSocketFactory};

type TcpConnection = Connection<TcpSocketFactory>;

const DEADLINE: Duration = Duration::from_secs(5);

fn connect(addrs: &[SocketAddr]) -> TcpConnection {
    let mut conn = Connection::new(TcpSocketFactory, ConnectionConfig::default());
    for addr in addrs {
        conn.add_address(*addr);
    }

    let start = Instant::now();
    loop {
        let attempt = if conn.state().can_connect() {
            conn.do_connect()
        } else {
            conn.poll_connect()
        };
        if let Ok(ConnectionState::Connected) = attempt {
            return conn;
        }
        assert!(start.elapsed() < DEADLINE, "connect timed out");
        thread::sleep(Duration::from_millis(1));
    }
}

fn accept(listener: &TcpListener) -> TcpConnection {
    let (stream, peer) = listener.accept().expect("accept should succeed");
    let mut socket = TcpSocket::from_stream(stream);
    socket.set_non_blocking().unwrap();
    socket.set_no_delay().unwrap();
    Connection::adopt(TcpSocketFactory, socket, peer, ConnectionConfig::default())
}

fn flush_all(conn: &mut TcpConnection) {
    let start = Instant::now();
    while conn.flush().expect("flush should succeed") == FlushStatus::Pending {
        assert!(start.elapsed() < DEADLINE, "flush timed out");
        thread::sleep(Duration::from_millis(1));
    }
}

fn recv(conn: &mut TcpConnection) -> Vec<u8> {
    let start = Instant::now();
    loop {
        if let Some(message) = conn.get_message().expect("receive should succeed") {
            return message.to_vec();
        }
        assert!(start.elapsed() < DEADLINE, "receive timed out");
        thread::sleep(Duration::from_millis(1));
    }
}

fn dead_addr() -> SocketAddr {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .unwrap()
}

#[test]
fn ping_pong_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let mut conn = accept(&listener);
        let request = recv(&mut conn);
        assert_eq!(request, b"ping");
        conn.send_message(b"pong").unwrap();
        flush_all(&mut conn);
        // Hold the socket open until the client has read the reply.
        let start = Instant::now();
        loop {
            match conn.get_message() {
                Err(err) if err.is_peer_closed() => break,
                _ if start.elapsed() > DEADLINE => panic!("client never closed"),
                _ => thread::sleep(Duration::from_millis(1)),
            }
        }
    });

    let mut client = connect(&[addr]);
    client.send_message(b"ping").unwrap();
    flush_all(&mut client);
    assert_eq!(recv(&mut client), b"pong");
    drop(client);

    server.join().unwrap();
}

#[test]
fn largest_message_crosses_the_wire_intact() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let payload: Vec<u8> = (0..MAX_PAYLOAD).map(|i| (i % 251) as u8).collect();
    let expected = payload.clone();

    let server = thread::spawn(move || {
        let mut conn = accept(&listener);
        recv(&mut conn)
    });

    let mut client = connect(&[addr]);
    client.send_message(&payload).unwrap();
    flush_all(&mut client);

    assert_eq!(server.join().unwrap(), expected);
}

#[test]
fn many_small_messages_keep_order() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let mut conn = accept(&listener);
        (0..500).map(|_| recv(&mut conn)).collect::<Vec<_>>()
    });

    let mut client = connect(&[addr]);
    for i in 0..500u32 {
        client
            .send_message(&i.to_be_bytes())
            .unwrap_or_else(|err| panic!("send {i} failed: {err}"));
    }
    flush_all(&mut client);

    let received = server.join().unwrap();
    for (i, message) in received.iter().enumerate() {
        assert_eq!(message.as_slice(), (i as u32).to_be_bytes());
    }
}

#[test]
fn round_robin_skips_refused_address() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let live = listener.local_addr().unwrap();
    let server = thread::spawn(move || listener.accept().map(|(_, peer)| peer));

    let client = connect(&[dead_addr(), live]);
    assert_eq!(client.peer_addr(), Some(live));
    assert!(server.join().unwrap().is_ok());
}

#[test]
fn peer_shutdown_resets_client() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        // Half a frame, then hang up.
        stream.write_all(&[0, 10, b'a', b'b']).unwrap();
    });

    let mut client = connect(&[addr]);
    server.join().unwrap();

    let start = Instant::now();
    let err = loop {
        match client.get_message() {
            Ok(None) => {}
            Ok(Some(message)) => panic!("unexpected message {message:?}"),
            Err(err) => break err,
        }
        assert!(start.elapsed() < DEADLINE, "close never observed");
        thread::sleep(Duration::from_millis(1));
    };

    assert!(matches!(
        err,
        ConnectionError::Frame(FrameError::PeerClosed | FrameError::Io(_))
    ));
    assert_eq!(client.state(), ConnectionState::Closed);
    assert_eq!(client.reader().amount_buffered(), 0);
}

#[test]
fn raw_peer_sees_length_prefixed_bytes() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut wire = [0u8; 12];
        stream.read_exact(&mut wire).unwrap();
        wire
    });

    let mut client = connect(&[addr]);
    client.send_message(b"ping").unwrap();
    client.send_message(b"pong").unwrap();
    flush_all(&mut client);

    assert_eq!(
        server.join().unwrap(),
        [0, 4, b'p', b'i', b'n', b'g', 0, 4, b'p', b'o', b'n', b'g']
    );
}

#[test]
fn client_reads_frames_split_across_segments() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.set_nodelay(true).unwrap();
        let wire = [0u8, 4, b'p', b'i', b'n', b'g', 0, 4, b'p', b'o', b'n', b'g'];
        stream.write_all(&wire[..5]).unwrap();
        thread::sleep(Duration::from_millis(50));
        stream.write_all(&wire[5..]).unwrap();
        thread::sleep(Duration::from_millis(200));
    });

    let mut client = connect(&[addr]);
    assert_eq!(recv(&mut client), b"ping");
    assert_eq!(recv(&mut client), b"pong");
    server.join().unwrap();
}
