//! TCP transport for the command channel
//!
//! Messages are newline-delimited UTF-8. Only one client is attached at a
//! time; further connections wait in the listen backlog until it leaves.
//!
//! A message cannot contain a newline. A text payload with an embedded
//! newline arrives as two messages: the payload up to the first newline,
//! then the remainder, which the channel treats as a request.

use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream, UdpSocket};

use crate::channel::{ChannelError, Transport};

/// Longest accepted message, excluding the newline
pub const MAX_MESSAGE_LEN: usize = 4096;

const READ_CHUNK: usize = 512;

struct Client {
    stream: TcpStream,
    peer: SocketAddr,
    buffer: Vec<u8>,
}

impl Client {
    /// Pop one complete line from the buffer
    fn take_line(&mut self) -> Result<Option<String>, ChannelError> {
        let Some(end) = self.buffer.iter().position(|&b| b == b'\n') else {
            return Ok(None);
        };
        let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        if line.len() > MAX_MESSAGE_LEN {
            return Err(ChannelError::MessageTooLong {
                limit: MAX_MESSAGE_LEN,
            });
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

/// Non-blocking TCP listener serving a single client at a time
pub struct TcpTransport {
    listener: TcpListener,
    client: Option<Client>,
}

impl TcpTransport {
    pub fn bind(addr: SocketAddr) -> Result<Self, ChannelError> {
        let listener = TcpListener::bind(addr).map_err(|source| ChannelError::Bind { addr, source })?;
        listener.set_nonblocking(true)?;
        tracing::info!(addr = %listener.local_addr()?, "command channel listening");
        Ok(Self {
            listener,
            client: None,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    fn accept(&mut self) -> Result<bool, ChannelError> {
        match self.listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(true)?;
                stream.set_nodelay(true)?;
                tracing::info!(%peer, "command client connected");
                self.client = Some(Client {
                    stream,
                    peer,
                    buffer: Vec::new(),
                });
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn drop_client(&mut self) {
        if let Some(client) = self.client.take() {
            tracing::info!(peer = %client.peer, "command client disconnected");
        }
    }
}

impl Transport for TcpTransport {
    fn try_recv(&mut self) -> Result<Option<String>, ChannelError> {
        if self.client.is_none() && !self.accept()? {
            return Ok(None);
        }
        let Some(client) = self.client.as_mut() else {
            return Ok(None);
        };

        match client.take_line() {
            Ok(Some(line)) => return Ok(Some(line)),
            Ok(None) => {}
            Err(e) => {
                self.drop_client();
                return Err(e);
            }
        }

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match client.stream.read(&mut chunk) {
                Ok(0) => {
                    self.drop_client();
                    return Err(ChannelError::Disconnected);
                }
                Ok(n) => {
                    client.buffer.extend_from_slice(&chunk[..n]);
                    match client.take_line() {
                        Ok(Some(line)) => return Ok(Some(line)),
                        Ok(None) => {}
                        Err(e) => {
                            self.drop_client();
                            return Err(e);
                        }
                    }
                    if client.buffer.len() > MAX_MESSAGE_LEN {
                        self.drop_client();
                        return Err(ChannelError::MessageTooLong {
                            limit: MAX_MESSAGE_LEN,
                        });
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
                    ) =>
                {
                    self.drop_client();
                    return Err(ChannelError::Disconnected);
                }
                Err(e) => {
                    self.drop_client();
                    return Err(e.into());
                }
            }
        }
    }

    fn send(&mut self, reply: &str) -> Result<(), ChannelError> {
        let Some(client) = self.client.as_mut() else {
            return Err(ChannelError::Disconnected);
        };

        let mut framed = Vec::with_capacity(reply.len() + 1);
        framed.extend_from_slice(reply.as_bytes());
        framed.push(b'\n');
        if let Err(e) = client.stream.write_all(&framed) {
            self.drop_client();
            return Err(e.into());
        }
        Ok(())
    }
}

/// Address of the interface that routes off-host, or loopback
///
/// Connecting a UDP socket sends nothing; the target does not have to exist.
pub fn local_ip() -> IpAddr {
    let probe = || -> io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect((Ipv4Addr::new(10, 255, 255, 255), 1))?;
        Ok(socket.local_addr()?.ip())
    };
    probe().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
