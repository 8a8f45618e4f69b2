//! TCP accept loop for the expense sync server.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use outlay_store::ExpenseStore;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{HandlerContext, RequestHandler};

/// The expense sync server.
///
/// Owns the TCP listener and serves the three expense operations over
/// HTTP/1.1, one task per connection. Store calls run on the blocking
/// pool, so a slow file write for one token never stalls the accept
/// loop or other tokens' requests.
pub struct SyncServer {
    listener: TcpListener,
    handler: Arc<RequestHandler>,
    local_addr: SocketAddr,
}

impl SyncServer {
    /// Binds the configured address and prepares the handler.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`](crate::ServerError::Io) if the
    /// address cannot be bound.
    pub async fn bind(config: ServerConfig, store: Arc<ExpenseStore>) -> ServerResult<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        let context = Arc::new(HandlerContext::new(config, store));
        let handler = Arc::new(RequestHandler::new(context));
        Ok(Self {
            listener,
            handler,
            local_addr,
        })
    }

    /// Returns the bound address (the real port when binding port 0).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts and serves connections until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`](crate::ServerError::Io) if accepting
    /// a connection fails. Errors on individual connections are logged
    /// and do not stop the loop.
    pub async fn serve(self) -> ServerResult<()> {
        info!(addr = %self.local_addr, "expense sync server listening");

        loop {
            let (stream, peer) = self.listener.accept().await?;
            let handler = Arc::clone(&self.handler);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let handler = Arc::clone(&handler);
                    async move { Ok::<_, Infallible>(handler.handle(req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(peer = %peer, error = %err, "connection ended with error");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outlay_store::StoreDir;
    use tempfile::tempdir;

    #[tokio::test]
    async fn bind_reports_the_local_address() {
        let temp = tempdir().unwrap();
        let store = Arc::new(ExpenseStore::new(StoreDir::open(temp.path()).unwrap()));
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());

        let server = SyncServer::bind(config, store).await.unwrap();
        assert_ne!(server.local_addr().port(), 0);
        assert!(server.local_addr().ip().is_loopback());
    }

    #[tokio::test]
    async fn bind_fails_on_a_taken_port() {
        let temp = tempdir().unwrap();
        let store = Arc::new(ExpenseStore::new(StoreDir::open(temp.path()).unwrap()));

        let first = SyncServer::bind(
            ServerConfig::new("127.0.0.1:0".parse().unwrap()),
            Arc::clone(&store),
        )
        .await
        .unwrap();
        let taken = first.local_addr();

        let result = SyncServer::bind(ServerConfig::new(taken), store).await;
        assert!(result.is_err());
    }
}
