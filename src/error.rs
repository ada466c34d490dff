use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("cannot serve {}: {source}", path.display())]
    MissingRoot { path: PathBuf, source: io::Error },
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
    #[error("failed to load TLS credentials: {0}")]
    Tls(#[source] io::Error),
    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}
