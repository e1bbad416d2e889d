//! Listeners, connection handling and graceful shutdown
//!
//! With `TLS_HOSTS` set, two listeners run side by side: HTTPS (HTTP/2 or
//! HTTP/1.1 per ALPN) serving the application and plain HTTP serving only the
//! redirect router. Without it, a single plain listener serves the
//! application for local development.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::{extract::ConnectInfo, Router};
use hyper::body::Incoming;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use mediagate_core::{Config, ConnectionTimeouts};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_rustls::server::TlsStream;
use tokio_rustls::LazyConfigAcceptor;
use tower::Service;

use super::redirect::{redirect_router, RedirectState};
use super::tls::CertificateManager;

/// How long in-flight connections get to finish once shutdown starts.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Start the listeners and run until a shutdown signal arrives
pub async fn start_server(config: &Config, app: Router) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let timeouts = config.timeouts();
    tracing::info!(
        read_header_secs = timeouts.read_header.as_secs(),
        read_secs = timeouts.read.as_secs(),
        write_secs = timeouts.write.as_secs(),
        idle_secs = timeouts.idle.as_secs(),
        max_image_mb = config.max_image_size_bytes() / 1024 / 1024,
        max_video_mb = config.max_video_size_bytes() / 1024 / 1024,
        ffmpeg_path = %config.video().ffmpeg_path,
        "Server ready and accepting connections"
    );

    match config.tls() {
        None => {
            let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port()));
            tracing::warn!(addr = %addr, "TLS_HOSTS not set, serving plain HTTP");
            let listener = TcpListener::bind(addr).await?;
            serve(listener, app, Transport::Plain, timeouts, shutdown_rx).await
        }
        Some(tls) => {
            let manager = Arc::new(CertificateManager::from_config(tls));
            let https_addr = SocketAddr::from(([0, 0, 0, 0], tls.https_port));
            let http_addr = SocketAddr::from(([0, 0, 0, 0], tls.http_port));
            let https = TcpListener::bind(https_addr).await?;
            let http = TcpListener::bind(http_addr).await?;
            tracing::info!(
                https = %https_addr,
                http = %http_addr,
                hosts = %tls.hosts.join(","),
                "Serving HTTPS with HTTP redirect listener"
            );

            let redirect = redirect_router(Arc::new(RedirectState::from_config(tls)));
            tokio::try_join!(
                serve(
                    https,
                    app,
                    Transport::Tls(manager),
                    timeouts,
                    shutdown_rx.clone()
                ),
                serve(http, redirect, Transport::Plain, timeouts, shutdown_rx),
            )?;
            Ok(())
        }
    }
}

#[derive(Clone)]
enum Transport {
    Plain,
    Tls(Arc<CertificateManager>),
}

/// Accept loop: one task per connection, drained on shutdown.
async fn serve(
    listener: TcpListener,
    app: Router,
    transport: Transport,
    timeouts: ConnectionTimeouts,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (tcp, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        // Usually fd exhaustion; back off instead of spinning.
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                };
                let _ = tcp.set_nodelay(true);

                let app = app.clone();
                let transport = transport.clone();
                let shutdown = shutdown.clone();
                connections.spawn(async move {
                    match transport {
                        Transport::Plain => {
                            serve_connection(tcp, peer, app, timeouts, shutdown).await
                        }
                        Transport::Tls(manager) => {
                            match tls_handshake(tcp, &manager, timeouts.read_header).await {
                                Ok(tls) => serve_connection(tls, peer, app, timeouts, shutdown).await,
                                Err(e) => {
                                    tracing::debug!(peer = %peer, error = %e, "TLS handshake refused");
                                }
                            }
                        }
                    }
                });
            }
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
            _ = shutdown.changed() => break,
        }
    }

    drop(listener);
    tracing::info!(
        open_connections = connections.len(),
        "Listener closed, draining connections"
    );
    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            remaining = connections.len(),
            "Connections still open after shutdown grace period, aborting"
        );
        connections.shutdown().await;
    }

    Ok(())
}

/// TLS handshake with the certificate chosen from the SNI name.
async fn tls_handshake(
    tcp: TcpStream,
    manager: &CertificateManager,
    deadline: Duration,
) -> io::Result<TlsStream<TcpStream>> {
    let handshake = async {
        let start = LazyConfigAcceptor::new(rustls::server::Acceptor::default(), tcp).await?;
        let server_name = start.client_hello().server_name().map(str::to_owned);
        let config = manager
            .server_config(server_name.as_deref())
            .await
            .map_err(io::Error::other)?;
        start.into_stream(config).await
    };

    tokio::time::timeout(deadline, handshake)
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "TLS handshake timed out"))?
}

async fn serve_connection<I>(
    io: I,
    peer: SocketAddr,
    app: Router,
    timeouts: ConnectionTimeouts,
    mut shutdown: watch::Receiver<bool>,
) where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = ActivityTracked::new(io);
    let activity = io.activity.clone();

    let request_activity = activity.clone();
    let service = hyper::service::service_fn(move |mut request: hyper::Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer));
        let mut app = app.clone();
        let in_flight = InFlight::enter(request_activity.clone());
        async move {
            let response = app.call(request).await;
            drop(in_flight);
            response
        }
    });

    let mut builder = Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.read_header);
    builder
        .http2()
        .timer(TokioTimer::new())
        .keep_alive_interval(timeouts.idle / 2)
        .keep_alive_timeout(timeouts.read_header);

    let conn = builder.serve_connection(TokioIo::new(io), service);
    tokio::pin!(conn);

    let idle_check = tokio::time::sleep(timeouts.idle);
    tokio::pin!(idle_check);
    let drain_deadline = tokio::time::sleep(timeouts.write);
    tokio::pin!(drain_deadline);
    let mut draining = false;

    loop {
        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    tracing::debug!(peer = %peer, error = %e, "Connection closed with error");
                }
                break;
            }
            _ = shutdown.changed(), if !draining => {
                conn.as_mut().graceful_shutdown();
                draining = true;
                drain_deadline.as_mut().reset(tokio::time::Instant::now() + SHUTDOWN_GRACE);
            }
            _ = &mut idle_check, if !draining => {
                let idle_for = activity.idle_for();
                if activity.in_flight() > 0 {
                    // A handler may legitimately run without socket I/O.
                    idle_check
                        .as_mut()
                        .reset(tokio::time::Instant::now() + timeouts.idle);
                } else if idle_for >= timeouts.idle {
                    tracing::debug!(peer = %peer, idle_secs = idle_for.as_secs(), "Closing idle connection");
                    conn.as_mut().graceful_shutdown();
                    draining = true;
                    drain_deadline.as_mut().reset(tokio::time::Instant::now() + timeouts.write);
                } else {
                    idle_check
                        .as_mut()
                        .reset(tokio::time::Instant::now() + (timeouts.idle - idle_for));
                }
            }
            _ = &mut drain_deadline, if draining => {
                tracing::debug!(peer = %peer, "Connection did not drain in time, dropping it");
                break;
            }
        }
    }
}

/// Last read or write progress on a connection, and its open requests.
#[derive(Debug)]
struct Activity {
    started: Instant,
    last_millis: AtomicU64,
    in_flight: AtomicUsize,
}

impl Activity {
    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    fn touch(&self) {
        self.last_millis
            .store(self.started.elapsed().as_millis() as u64, Ordering::Relaxed);
    }

    fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_millis.load(Ordering::Relaxed));
        self.started.elapsed().saturating_sub(last)
    }
}

/// IO wrapper recording activity so idle connections can be closed.
struct ActivityTracked<I> {
    inner: I,
    activity: Arc<Activity>,
}

impl<I> ActivityTracked<I> {
    fn new(inner: I) -> Self {
        Self {
            inner,
            activity: Arc::new(Activity {
                started: Instant::now(),
                last_millis: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
            }),
        }
    }
}

/// Marks a request as open until its handler returns.
struct InFlight(Arc<Activity>);

impl InFlight {
    fn enter(activity: Arc<Activity>) -> Self {
        activity.in_flight.fetch_add(1, Ordering::Relaxed);
        Self(activity)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::Relaxed);
        self.0.touch();
    }
}

impl<I: AsyncRead + Unpin> AsyncRead for ActivityTracked<I> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let before = buf.filled().len();
        let result = Pin::new(&mut this.inner).poll_read(cx, buf);
        if matches!(result, Poll::Ready(Ok(()))) && buf.filled().len() > before {
            this.activity.touch();
        }
        result
    }
}

impl<I: AsyncWrite + Unpin> AsyncWrite for ActivityTracked<I> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let result = Pin::new(&mut this.inner).poll_write(cx, buf);
        if matches!(result, Poll::Ready(Ok(n)) if n > 0) {
            this.activity.touch();
        }
        result
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let result = Pin::new(&mut this.inner).poll_write_vectored(cx, bufs);
        if matches!(result, Poll::Ready(Ok(n)) if n > 0) {
            this.activity.touch();
        }
        result
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

/// Signal handler for graceful shutdown
///
/// Listens for Ctrl+C (SIGINT) and SIGTERM signals to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }

    tracing::info!("Shutting down gracefully...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_activity_tracks_reads_and_writes() {
        let (client, server) = tokio::io::duplex(64);
        let mut tracked = ActivityTracked::new(server);
        let activity = tracked.activity.clone();
        let mut client = client;

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(activity.idle_for() >= Duration::from_millis(30));

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        tracked.read_exact(&mut buf).await.unwrap();
        assert!(activity.idle_for() < Duration::from_millis(30));

        tokio::time::sleep(Duration::from_millis(30)).await;
        tracked.write_all(b"pong").await.unwrap();
        assert!(activity.idle_for() < Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_plain_listener_serves_and_drains() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route("/", axum::routing::get(|| async { "hello" }));
        let (tx, rx) = watch::channel(false);
        let timeouts = ConnectionTimeouts {
            read_header: Duration::from_secs(5),
            read: Duration::from_secs(5),
            write: Duration::from_secs(5),
            idle: Duration::from_secs(30),
            upload: Duration::from_secs(60),
        };
        let server = tokio::spawn(serve(listener, app, Transport::Plain, timeouts, rx));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("hello"));

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_idle_close_waits_for_running_handler() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/slow",
            axum::routing::get(|| async {
                tokio::time::sleep(Duration::from_millis(700)).await;
                "done"
            }),
        );
        let (_tx, rx) = watch::channel(false);
        let timeouts = ConnectionTimeouts {
            read_header: Duration::from_secs(5),
            read: Duration::from_secs(5),
            write: Duration::from_millis(200),
            idle: Duration::from_millis(150),
            upload: Duration::from_secs(60),
        };
        tokio::spawn(serve(listener, app, Transport::Plain, timeouts, rx));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "got {:?}", response);
        assert!(response.ends_with("done"));
    }

    mod tls {
        use super::*;
        use crate::setup::tls::{CertificateIssuer, IssuedCertificate};
        use async_trait::async_trait;
        use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName};
        use tokio_rustls::TlsConnector;

        const HOST: &str = "api.example.com";

        /// Hands out one pre-generated certificate so the client can trust it.
        struct PinnedIssuer {
            cert: CertificateDer<'static>,
            key: Vec<u8>,
        }

        impl PinnedIssuer {
            fn generate() -> Arc<Self> {
                let key_pair = rcgen::KeyPair::generate().unwrap();
                let cert = rcgen::CertificateParams::new(vec![HOST.to_string()])
                    .unwrap()
                    .self_signed(&key_pair)
                    .unwrap();
                Arc::new(Self {
                    cert: cert.der().clone(),
                    key: key_pair.serialize_der(),
                })
            }
        }

        #[async_trait]
        impl CertificateIssuer for PinnedIssuer {
            async fn issue(&self, _host: &str) -> Result<IssuedCertificate, anyhow::Error> {
                Ok(IssuedCertificate {
                    chain: vec![self.cert.clone()],
                    key: PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.key.clone())),
                    not_after: chrono::Utc::now() + chrono::Duration::days(90),
                })
            }
        }

        fn connector(trusted: &CertificateDer<'static>, alpn: &[&[u8]]) -> TlsConnector {
            let mut roots = rustls::RootCertStore::empty();
            roots.add(trusted.clone()).unwrap();
            let mut config = rustls::ClientConfig::builder_with_provider(Arc::new(
                rustls::crypto::ring::default_provider(),
            ))
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_root_certificates(roots)
            .with_no_client_auth();
            config.alpn_protocols = alpn.iter().map(|p| p.to_vec()).collect();
            TlsConnector::from(Arc::new(config))
        }

        async fn spawn_tls_server(issuer: Arc<PinnedIssuer>) -> SocketAddr {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let manager = Arc::new(CertificateManager::new(
                &[HOST.to_string()],
                issuer,
                Duration::from_secs(3600),
            ));
            let app = Router::new().route("/", axum::routing::get(|| async { "over tls" }));
            let timeouts = ConnectionTimeouts {
                read_header: Duration::from_secs(5),
                read: Duration::from_secs(5),
                write: Duration::from_secs(5),
                idle: Duration::from_secs(30),
                upload: Duration::from_secs(60),
            };
            let (tx, rx) = watch::channel(false);
            tokio::spawn(async move {
                let _keep_open = tx;
                let _ = serve(listener, app, Transport::Tls(manager), timeouts, rx).await;
            });
            addr
        }

        #[tokio::test]
        async fn test_h2_negotiated_for_allowed_host() {
            let issuer = PinnedIssuer::generate();
            let addr = spawn_tls_server(issuer.clone()).await;

            let tcp = TcpStream::connect(addr).await.unwrap();
            let tls = connector(&issuer.cert, &[b"h2", b"http/1.1"])
                .connect(ServerName::try_from(HOST).unwrap(), tcp)
                .await
                .unwrap();
            assert_eq!(tls.get_ref().1.alpn_protocol(), Some(&b"h2"[..]));

            let (mut sender, conn) =
                hyper::client::conn::http2::handshake(TokioExecutor::new(), TokioIo::new(tls))
                    .await
                    .unwrap();
            tokio::spawn(conn);

            let request = hyper::Request::get(format!("https://{}/", HOST))
                .body(axum::body::Body::empty())
                .unwrap();
            let response = sender.send_request(request).await.unwrap();
            assert_eq!(response.status(), hyper::StatusCode::OK);
            assert_eq!(response.version(), hyper::Version::HTTP_2);

            let body = axum::body::to_bytes(axum::body::Body::new(response.into_body()), usize::MAX)
                .await
                .unwrap();
            assert_eq!(&body[..], b"over tls");
        }

        #[tokio::test]
        async fn test_http1_fallback_without_h2() {
            let issuer = PinnedIssuer::generate();
            let addr = spawn_tls_server(issuer.clone()).await;

            let tcp = TcpStream::connect(addr).await.unwrap();
            let mut tls = connector(&issuer.cert, &[b"http/1.1"])
                .connect(ServerName::try_from(HOST).unwrap(), tcp)
                .await
                .unwrap();
            assert_eq!(tls.get_ref().1.alpn_protocol(), Some(&b"http/1.1"[..]));

            tls.write_all(b"GET / HTTP/1.1\r\nHost: api.example.com\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            let mut response = Vec::new();
            // Peers may close without close_notify; what was read is enough.
            let _ = tls.read_to_end(&mut response).await;
            let response = String::from_utf8_lossy(&response);
            assert!(response.starts_with("HTTP/1.1 200"), "got {:?}", response);
        }

        #[tokio::test]
        async fn test_unlisted_host_refused_without_affecting_others() {
            let issuer = PinnedIssuer::generate();
            let addr = spawn_tls_server(issuer.clone()).await;

            let tcp = TcpStream::connect(addr).await.unwrap();
            let refused = connector(&issuer.cert, &[b"h2"])
                .connect(ServerName::try_from("evil.example.com").unwrap(), tcp)
                .await;
            assert!(refused.is_err());

            let tcp = TcpStream::connect(addr).await.unwrap();
            let accepted = connector(&issuer.cert, &[b"h2"])
                .connect(ServerName::try_from(HOST).unwrap(), tcp)
                .await;
            assert!(accepted.is_ok());
        }
    }
}
