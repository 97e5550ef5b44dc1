//! TCP accept loop serving one dnode instance per connection.

use dnode_core::{Dnode, TcpTransport};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Handle to a running server. Dropping it stops accepting connections.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections. Open connections run until the peer
    /// closes them.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Bind and start accepting in the background.
///
/// Returns the actual address the server is bound to (useful when port=0).
pub async fn start_server(template: Dnode, host: &str, port: u16) -> anyhow::Result<ServerHandle> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("Server listening on {}", actual_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(accept_loop(listener, template, shutdown_rx));

    Ok(ServerHandle {
        addr: actual_addr,
        shutdown_tx: Some(shutdown_tx),
    })
}

async fn accept_loop(listener: TcpListener, template: Dnode, mut shutdown_rx: oneshot::Receiver<()>) {
    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                info!("Server shutting down");
                break;
            }
            accept_result = listener.accept() => {
                let (stream, peer_addr) = match accept_result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        continue;
                    }
                };

                let transport = match TcpTransport::new(stream) {
                    Ok(transport) => transport,
                    Err(e) => {
                        warn!("Failed to set up connection from {}: {}", peer_addr, e);
                        continue;
                    }
                };

                let conn = template.copy(transport);
                tokio::spawn(async move {
                    debug!("Connection opened: {}", peer_addr);
                    let err = conn.run().await;
                    if err.is_closed() {
                        debug!("Connection closed: {}", peer_addr);
                    } else {
                        warn!("Connection {} ended: {}", peer_addr, err);
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dnode_core::{Callback, Detached, Value};
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn serve() -> ServerHandle {
        let template = Dnode::new(Detached::new());
        crate::handlers::register(&template);
        start_server(template, "127.0.0.1", 0).await.unwrap()
    }

    #[tokio::test]
    async fn test_ping_over_tcp() {
        let handle = serve().await;

        let client = Dnode::new(TcpTransport::connect(handle.addr()).await.unwrap());
        let c = client.clone();
        tokio::spawn(async move { c.run().await });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let pong = Callback::from_fn(move |args| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(args);
                Ok(())
            }
        });
        client.send("ping", vec![Value::from(pong)]).await.unwrap();

        let args = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(args.str(0).unwrap(), "pong");
    }

    #[tokio::test]
    async fn test_shutdown_stops_accepting() {
        let mut handle = serve().await;
        let addr = handle.addr();
        handle.shutdown();

        // The listener is dropped once the accept loop sees the signal.
        let mut refused = false;
        for _ in 0..50 {
            if TcpTransport::connect(addr).await.is_err() {
                refused = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(refused);
    }

    #[tokio::test]
    async fn test_bad_host_is_rejected() {
        let template = Dnode::new(Detached::new());
        assert!(start_server(template, "not a host", 0).await.is_err());
    }
}
