use std::io::{self, ErrorKind, Read, Write};
use std::mem;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, FromRawFd, RawFd};

use tracing::debug;

use crate::stream::{ByteStream, ConnectStatus, SocketFactory, StreamSocket};

/// TCP socket with a genuinely non-blocking connect.
///
/// `std::net::TcpStream::connect` always blocks, so the socket is created and
/// connected through `libc`, then handed to `TcpStream` for the data path.
pub struct TcpSocket {
    stream: Option<TcpStream>,
    peer: Option<SocketAddr>,
}

impl TcpSocket {
    /// Create an unconnected TCP socket for the address family of `addr`.
    pub fn open(addr: SocketAddr) -> io::Result<Self> {
        let domain = match addr {
            SocketAddr::V4(_) => libc::AF_INET,
            SocketAddr::V6(_) => libc::AF_INET6,
        };

        // SAFETY: plain socket(2) call with constant arguments.
        let fd = unsafe { libc::socket(domain, libc::SOCK_STREAM, 0) };
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: `fd` was just returned by socket(2) and is owned by nobody else.
        let stream = unsafe { TcpStream::from_raw_fd(fd) };
        set_cloexec(fd)?;

        Ok(Self {
            stream: Some(stream),
            peer: None,
        })
    }

    /// Wrap an already-connected stream (e.g. one returned by `accept`).
    pub fn from_stream(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok();
        Self {
            stream: Some(stream),
            peer,
        }
    }

    /// Address passed to the last `connect`, or the accepted peer.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Whether the handle is still open.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn stream(&self) -> io::Result<&TcpStream> {
        self.stream
            .as_ref()
            .ok_or_else(|| io::Error::from(ErrorKind::NotConnected))
    }

    fn stream_mut(&mut self) -> io::Result<&mut TcpStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::from(ErrorKind::NotConnected))
    }
}

impl ByteStream for TcpSocket {
    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream_mut()?.write(buf)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream_mut()?.read(buf)
    }
}

impl StreamSocket for TcpSocket {
    fn set_non_blocking(&mut self) -> io::Result<()> {
        self.stream()?.set_nonblocking(true)
    }

    fn set_no_delay(&mut self) -> io::Result<()> {
        self.stream()?.set_nodelay(true)
    }

    fn connect(&mut self, addr: SocketAddr) -> io::Result<ConnectStatus> {
        let fd = self.stream()?.as_raw_fd();
        self.peer = Some(addr);

        let rc = match addr {
            SocketAddr::V4(v4) => {
                // SAFETY: all-zero is a valid `sockaddr_in`.
                let mut sin: libc::sockaddr_in = unsafe { mem::zeroed() };
                sin.sin_family = libc::AF_INET as libc::sa_family_t;
                sin.sin_port = v4.port().to_be();
                sin.sin_addr = libc::in_addr {
                    s_addr: u32::from_ne_bytes(v4.ip().octets()),
                };
                // SAFETY: `sin` outlives the call and the length matches its type.
                unsafe {
                    libc::connect(
                        fd,
                        (&sin as *const libc::sockaddr_in).cast::<libc::sockaddr>(),
                        mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
                    )
                }
            }
            SocketAddr::V6(v6) => {
                // SAFETY: all-zero is a valid `sockaddr_in6`.
                let mut sin6: libc::sockaddr_in6 = unsafe { mem::zeroed() };
                sin6.sin6_family = libc::AF_INET6 as libc::sa_family_t;
                sin6.sin6_port = v6.port().to_be();
                sin6.sin6_flowinfo = v6.flowinfo();
                sin6.sin6_addr = libc::in6_addr {
                    s6_addr: v6.ip().octets(),
                };
                sin6.sin6_scope_id = v6.scope_id();
                // SAFETY: `sin6` outlives the call and the length matches its type.
                unsafe {
                    libc::connect(
                        fd,
                        (&sin6 as *const libc::sockaddr_in6).cast::<libc::sockaddr>(),
                        mem::size_of::<libc::sockaddr_in6>() as libc::socklen_t,
                    )
                }
            }
        };

        if rc == 0 {
            debug!(%addr, "connected immediately");
            return Ok(ConnectStatus::Connected);
        }

        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(code) if code == libc::EINPROGRESS || code == libc::EINTR => {
                debug!(%addr, "connect in progress");
                Ok(ConnectStatus::InProgress)
            }
            _ => Err(err),
        }
    }

    fn poll_connect(&mut self) -> io::Result<bool> {
        let stream = self.stream()?;
        let mut pfd = libc::pollfd {
            fd: stream.as_raw_fd(),
            events: libc::POLLOUT,
            revents: 0,
        };

        // SAFETY: `pfd` is a valid pollfd and a zero timeout never blocks.
        let rc = unsafe { libc::poll(&mut pfd, 1, 0) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(err);
        }
        if rc == 0 {
            return Ok(false);
        }

        if let Some(err) = stream.take_error()? {
            return Err(err);
        }
        if pfd.revents & (libc::POLLERR | libc::POLLHUP) != 0 {
            return Err(io::Error::from(ErrorKind::ConnectionRefused));
        }
        Ok(true)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            // Not-connected sockets report ENOTCONN here; the fd is released on drop either way.
            let _ = stream.shutdown(Shutdown::Both);
            debug!(peer = ?self.peer, "socket closed");
        }
    }
}

impl std::fmt::Debug for TcpSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpSocket")
            .field("open", &self.stream.is_some())
            .field("peer", &self.peer)
            .finish()
    }
}

fn set_cloexec(fd: RawFd) -> io::Result<()> {
    // SAFETY: fcntl on an fd we own; F_GETFD/F_SETFD take plain integer flags.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above.
    if unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Opens [`TcpSocket`]s for a connection's address queue.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpSocketFactory;

impl SocketFactory for TcpSocketFactory {
    type Socket = TcpSocket;

    fn open(&mut self, addr: SocketAddr) -> io::Result<TcpSocket> {
        TcpSocket::open(addr)
    }
}
