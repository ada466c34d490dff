use std::future::Future;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::path::Path;

use axum_server::{tls_rustls::RustlsConfig, Handle};

use crate::config::ServerConfig;
use crate::error::ServeError;
use crate::routes::create_routes;

/// A static file server whose socket is already bound.
pub struct StaticServer {
    config: ServerConfig,
    listener: TcpListener,
    tls: Option<RustlsConfig>,
}

impl StaticServer {
    /// Resolve the root, load TLS credentials if configured, then bind.
    ///
    /// Nothing is left listening when this fails.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServeError> {
        let config = config.resolved()?;

        let tls = if config.tls {
            let files = config.tls_files();
            let rustls = RustlsConfig::from_pem_file(&files.cert_path, &files.key_path)
                .await
                .map_err(ServeError::Tls)?;
            Some(rustls)
        } else {
            None
        };

        let addr = config.socket_addr();
        let listener =
            TcpListener::bind(addr).map_err(|source| ServeError::Bind { addr, source })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| ServeError::Bind { addr, source })?;
        log::info!("listening on {}", addr);

        Ok(Self {
            config,
            listener,
            tls,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Absolute directory being served.
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Address to print for a browser on this machine.
    pub fn display_url(&self) -> String {
        let port = self
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or(self.config.port);
        format!("{}://localhost:{}/", self.config.scheme(), port)
    }

    /// Serve until `shutdown` resolves. Open connections are dropped, not drained.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = create_routes(&self.config);

        // Create shutdown handle
        let handle = Handle::new();
        tokio::spawn({
            let handle = handle.clone();
            async move {
                shutdown.await;
                handle.shutdown();
            }
        });

        let result = match self.tls {
            Some(tls) => {
                axum_server::from_tcp_rustls(self.listener, tls)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await
            }
            None => {
                axum_server::from_tcp(self.listener)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await
            }
        };

        result.map_err(ServeError::Serve)
    }
}

/// Resolves on Ctrl+C. Never resolves if the handler cannot be installed.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
