//! HTTP server and graceful shutdown.
//!
//! On **SIGTERM** (or Ctrl-C) the server:
//! 1. stops calling `listener.accept()`, so no new connections are made;
//! 2. asks every open connection to finish its in-flight request and close,
//!    which ends idle keep-alive connections at once;
//! 3. waits up to [`DRAIN_TIMEOUT`] for them, then drops the rest;
//! 4. returns from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::middleware::Pipeline;

/// How long in-flight requests get to finish after a shutdown signal.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    pub fn bind(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Accepts connections and runs every request through `pipeline` until
    /// SIGTERM or Ctrl-C.
    pub async fn serve(self, pipeline: Pipeline) -> Result<(), Error> {
        self.serve_with_shutdown(pipeline, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops when `signal` resolves.
    pub async fn serve_with_shutdown(
        self,
        pipeline: Pipeline,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        run(listener, pipeline, signal, DRAIN_TIMEOUT).await;
        Ok(())
    }
}

async fn run(
    listener: TcpListener,
    pipeline: Pipeline,
    signal: impl Future<Output = ()>,
    drain_timeout: Duration,
) {
    let pipeline = Arc::new(pipeline);
    let builder = ConnBuilder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    let mut tasks = JoinSet::new();

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }

    tokio::pin!(signal);

    loop {
        tokio::select! {
            // Shutdown first, so a SIGTERM stops accepting even when
            // connections are queued.
            biased;

            () = &mut signal => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, peer) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let pipeline = Arc::clone(&pipeline);
                // Called once per request on the connection.
                let svc = service_fn(move |req| {
                    let pipeline = Arc::clone(&pipeline);
                    async move { Ok::<_, Infallible>(pipeline.handle(req).await.into_http()) }
                });

                // HTTP/1.1 or HTTP/2, whichever the client speaks.
                let conn = builder.serve_connection_with_upgrades(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tasks.spawn(async move {
                    if let Err(e) = conn.await {
                        error!(%peer, "connection error: {e}");
                    }
                });
            }

            // Reap finished connection tasks.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    drop(listener);

    tokio::select! {
        () = graceful.shutdown() => {}
        () = tokio::time::sleep(drain_timeout) => {
            warn!(remaining = tasks.len(), "drain timed out, closing remaining connections");
        }
    }
    tasks.shutdown().await;

    info!("stopped");
}

/// Resolves on the first SIGTERM or SIGINT.
///
/// A signal that cannot be installed is logged and never fires; the other
/// one still can.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Application;
    use crate::data::MemoryUserStore;
    use crate::middleware::Metrics;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    fn pipeline() -> Pipeline {
        Application::new("testing", Arc::new(MemoryUserStore::new()), Arc::new(Metrics::new()))
            .pipeline()
    }

    /// Sends one keep-alive request and returns the still-open stream.
    async fn idle_client(addr: SocketAddr) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /healthcheck HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();

        let mut seen = Vec::new();
        let mut buf = [0_u8; 1024];
        while !seen.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before a response arrived");
            seen.extend_from_slice(&buf[..n]);
        }
        assert!(seen.starts_with(b"HTTP/1.1 200"), "{}", String::from_utf8_lossy(&seen));
        stream
    }

    #[tokio::test]
    async fn shutdown_closes_idle_keep_alive_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(run(
            listener,
            pipeline(),
            async move {
                let _ = stopped.await;
            },
            Duration::from_secs(30),
        ));

        let mut client = idle_client(addr).await;
        stop.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not stop while a keep-alive connection was idle")
            .unwrap();

        let mut buf = [0_u8; 64];
        assert_eq!(client.read(&mut buf).await.unwrap_or(0), 0, "connection left open");
    }

    #[tokio::test]
    async fn drain_gives_up_after_the_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(run(
            listener,
            pipeline(),
            async move {
                let _ = stopped.await;
            },
            Duration::from_millis(200),
        ));

        // A client stuck halfway through its request line.
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"GET /healthcheck HT").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server ignored the drain deadline")
            .unwrap();
    }
}
