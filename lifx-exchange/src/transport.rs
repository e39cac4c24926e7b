//! UDP transport.
//!
//! A [`Transport`] opens one [`DatagramSocket`] per exchange. The socket is
//! closed when the handle is dropped, so every exit path of an exchange
//! releases it exactly once.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::broadcast;
use crate::error::{ExchangeError, Result};

/// Outcome of a single receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Datagram(Vec<u8>, SocketAddr),
    /// Nothing arrived within the wait. Not an error: it drives retries.
    Timeout,
}

/// One open socket, owned by a single exchange.
pub trait DatagramSocket: Send {
    fn send_to(&mut self, bytes: &[u8], addr: SocketAddr) -> Result<()>;

    /// Block for at most `wait` for the next datagram
    fn recv(&mut self, wait: Duration) -> Result<Received>;
}

/// Factory for sockets plus knowledge of where broadcasts go.
pub trait Transport: Send + Sync {
    /// Open a socket whose receives wait `timeout` by default
    fn open(&self, timeout: Duration) -> Result<Box<dyn DatagramSocket>>;

    fn broadcast_addresses(&self) -> Vec<Ipv4Addr>;
}

/// Real UDP sockets with broadcast and address reuse enabled, bound to an
/// ephemeral port on all interfaces.
#[derive(Debug, Clone)]
pub struct UdpTransport {
    buffer_size: usize,
}

impl UdpTransport {
    pub fn new(buffer_size: usize) -> Self {
        Self { buffer_size }
    }
}

impl Transport for UdpTransport {
    fn open(&self, timeout: Duration) -> Result<Box<dyn DatagramSocket>> {
        let socket = bind_broadcast_socket(timeout).map_err(ExchangeError::SocketOpen)?;
        tracing::debug!(
            "Opened UDP socket on {:?}",
            socket.local_addr().ok()
        );
        Ok(Box::new(UdpDatagramSocket {
            socket,
            read_timeout: timeout,
            buffer: vec![0; self.buffer_size],
        }))
    }

    fn broadcast_addresses(&self) -> Vec<Ipv4Addr> {
        broadcast::broadcast_addresses().to_vec()
    }
}

fn bind_broadcast_socket(timeout: Duration) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.set_read_timeout(Some(timeout))?;
    let any = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    socket.bind(&SockAddr::from(any))?;
    Ok(socket.into())
}

struct UdpDatagramSocket {
    socket: UdpSocket,
    read_timeout: Duration,
    buffer: Vec<u8>,
}

impl DatagramSocket for UdpDatagramSocket {
    fn send_to(&mut self, bytes: &[u8], addr: SocketAddr) -> Result<()> {
        self.socket.send_to(bytes, addr)?;
        Ok(())
    }

    fn recv(&mut self, wait: Duration) -> Result<Received> {
        // std rejects a zero read timeout
        let wait = wait.max(Duration::from_millis(1));
        if wait != self.read_timeout {
            self.socket.set_read_timeout(Some(wait))?;
            self.read_timeout = wait;
        }

        match self.socket.recv_from(&mut self.buffer) {
            Ok((size, from)) => Ok(Received::Datagram(self.buffer[..size].to_vec(), from)),
            Err(e) if is_timeout(&e) => Ok(Received::Timeout),
            Err(e) => Err(ExchangeError::Network(e)),
        }
    }
}

impl Drop for UdpDatagramSocket {
    fn drop(&mut self) {
        tracing::trace!("Closing UDP socket {:?}", self.socket.local_addr().ok());
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
