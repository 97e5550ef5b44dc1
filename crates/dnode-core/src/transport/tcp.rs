//! TCP transport using length-prefixed frames.
//!
//! # Thread Safety
//!
//! The stream is split into read and write halves, each behind its own tokio
//! `Mutex`, so stubs can send from other tasks while the receive loop is
//! parked in `receive`.

use super::frame::{read_frame, write_frame};
use super::{Properties, Transport};
use crate::error::{DnodeError, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tracing::debug;

pub struct TcpTransport {
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    peer_addr: SocketAddr,
    properties: Properties,
}

impl TcpTransport {
    /// Wrap an accepted or connected stream.
    pub fn new(stream: TcpStream) -> Result<Self> {
        let peer_addr = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        Ok(Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            peer_addr,
            properties: Properties::new(),
        })
    }

    /// Connect to a listening peer.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let transport = Self::new(stream)?;
        debug!("dnode TCP transport connected to {}", transport.peer_addr);
        Ok(transport)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn remote_addr(&self) -> String {
        self.peer_addr.to_string()
    }

    async fn send(&self, msg: &[u8]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, msg).await
    }

    async fn receive(&self) -> Result<Vec<u8>> {
        let mut reader = self.reader.lock().await;
        read_frame(&mut *reader).await?.ok_or(DnodeError::Closed)
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_roundtrip_and_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            TcpTransport::new(stream).unwrap()
        });

        let client = TcpTransport::connect(addr).await.unwrap();
        let server = accept.await.unwrap();

        assert_eq!(client.peer_addr(), addr);

        client.send(br#"{"method":"ping"}"#).await.unwrap();
        assert_eq!(server.receive().await.unwrap(), br#"{"method":"ping"}"#);

        server.send(b"reply").await.unwrap();
        assert_eq!(client.receive().await.unwrap(), b"reply");

        drop(client);
        assert!(server.receive().await.unwrap_err().is_closed());
    }
}
