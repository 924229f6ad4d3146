use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wirehouse_core::net::Socket;

use crate::backend::MySqlBackend;
use crate::connection::MySqlConnection;
use crate::error::Error;
use crate::options::MySqlServerOptions;

/// Counters shared by every connection of a server, reported by `COM_STATISTICS`.
#[derive(Debug)]
pub(crate) struct ServerStats {
    pub(crate) started: Instant,
    pub(crate) threads: AtomicUsize,
    pub(crate) questions: AtomicU64,
}

impl ServerStats {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
            threads: AtomicUsize::new(0),
            questions: AtomicU64::new(0),
        }
    }
}

/// Accepts MySQL clients and serves each on its own task with a clone of `B`.
///
/// ```rust,ignore
/// let server = MySqlServer::new(MySqlServerOptions::from_env()?, MyBackend::default());
/// server.listen().await?;
/// ```
#[derive(Debug)]
pub struct MySqlServer<B> {
    options: Arc<MySqlServerOptions>,
    backend: B,
    next_connection_id: AtomicU32,
    stats: Arc<ServerStats>,
    token: CancellationToken,
}

impl<B> MySqlServer<B>
where
    B: MySqlBackend + Clone,
{
    pub fn new(options: MySqlServerOptions, backend: B) -> Self {
        Self {
            options: Arc::new(options),
            backend,
            next_connection_id: AtomicU32::new(1),
            stats: Arc::new(ServerStats::new()),
            token: CancellationToken::new(),
        }
    }

    pub fn options(&self) -> &MySqlServerOptions {
        &self.options
    }

    /// Bind the configured host and port and serve until [`shutdown`](Self::shutdown).
    pub async fn listen(&self) -> Result<(), Error> {
        let listener =
            TcpListener::bind((self.options.host.as_str(), self.options.port)).await?;

        self.run(listener).await
    }

    /// Serve clients accepted from `listener` until [`shutdown`](Self::shutdown).
    pub async fn run(&self, listener: TcpListener) -> Result<(), Error> {
        if self.options.is_trust_mode() {
            tracing::warn!("no users are configured; every client will be accepted without a password");
        }

        tracing::info!(
            addr = ?listener.local_addr().ok(),
            null_bitmap = ?self.options.null_bitmap,
            "listening for MySQL clients"
        );

        loop {
            let accepted = tokio::select! {
                biased;

                _ = self.token.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            let (socket, addr) = match accepted {
                Ok(accepted) => accepted,

                // per-connection failures such as a reset before accept() returned
                Err(error) => {
                    tracing::warn!(%error, "failed to accept connection");
                    continue;
                }
            };

            let _ = socket.set_nodelay(true);

            let connection = self.serve_connection(socket, addr.ip().to_string());
            tokio::spawn(async move {
                let _ = connection.await;
            });
        }

        tracing::info!("stopped listening");

        Ok(())
    }

    /// Serve a single client over an already connected socket.
    ///
    /// `peer` is the host reported in "Access denied" errors.
    pub fn serve_connection<S: Socket>(
        &self,
        socket: S,
        peer: impl Into<String>,
    ) -> impl Future<Output = Result<(), Error>> + Send + 'static {
        let connection_id = self.next_connection_id();
        let options = Arc::clone(&self.options);
        let stats = Arc::clone(&self.stats);
        let backend = self.backend.clone();
        let token = self.token.child_token();
        let peer = peer.into();

        async move {
            tracing::info!(connection_id, peer = %peer, "accepted connection");

            stats.threads.fetch_add(1, Ordering::Relaxed);

            let result = match MySqlConnection::establish(
                socket,
                peer,
                connection_id,
                options,
                Arc::clone(&stats),
                backend,
                token,
            )
            .await
            {
                Ok(connection) => connection.run().await,
                Err(error) => Err(error),
            };

            stats.threads.fetch_sub(1, Ordering::Relaxed);

            result
        }
    }

    /// Stop accepting clients and cancel every connection.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// A token cancelled by [`shutdown`](Self::shutdown).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    // ids start at 1 and skip 0 when they wrap
    fn next_connection_id(&self) -> u32 {
        loop {
            let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);

            if id != 0 {
                return id;
            }
        }
    }
}
