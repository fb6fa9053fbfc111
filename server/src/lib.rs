//! Picstash image server
//!
//! Exposes an `FsImageStore` over the gallery wire protocol:
//! - `POST /api/images/upload` - multipart batch upload
//! - `GET  /api/images/list`   - current store contents, newest first
//! - `POST /api/images/delete` - delete one stored file
//!
//! Every response is JSON with a structured `ok` status; expected bad
//! input never surfaces as a transport-level failure.

mod routes;

pub use routes::handle_request;

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use picstash_core::FsImageStore;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::info;

/// Handle to a running server that can be used to stop it
pub struct ServerHandle {
    shutdown_tx: oneshot::Sender<()>,
    port: u16,
}

impl ServerHandle {
    /// Get the port the server is running on
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL clients should point `HttpImageStore` at
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Stop the server
    pub fn stop(self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Start the image server on a random port
pub async fn start_server(store: FsImageStore) -> anyhow::Result<ServerHandle> {
    start_server_on("127.0.0.1", 0, store).await
}

/// Start the image server on the specified host and port
pub async fn start_server_on(
    host: &str,
    port: u16,
    store: FsImageStore,
) -> anyhow::Result<ServerHandle> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let actual_port = local_addr.port();

    info!("Starting picstash server on {}", local_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let store = Arc::new(store);

    tokio::spawn(async move {
        let mut shutdown_rx = shutdown_rx;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutting down picstash server");
                    break;
                }
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let io = TokioIo::new(stream);
                            let store = Arc::clone(&store);

                            tokio::spawn(async move {
                                if let Err(err) = http1::Builder::new()
                                    .serve_connection(
                                        io,
                                        service_fn(move |req| {
                                            let store = Arc::clone(&store);
                                            async move { routes::handle_request(req, store).await }
                                        }),
                                    )
                                    .await
                                {
                                    tracing::error!("Error serving connection: {:?}", err);
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }
    });

    Ok(ServerHandle {
        shutdown_tx,
        port: actual_port,
    })
}
