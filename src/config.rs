use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::cert::TlsFiles;
use crate::error::ServeError;

/// Checkout that contains the front-end build.
pub const PROJECT_ROOT: &str = "/Users/derek/workspace/MyDailyFace/MyDailyFace";
/// Build output, relative to [`PROJECT_ROOT`].
pub const BUILD_OUTPUT: &str = "dist/my-daily-face/browser";

pub const HTTP_PORT: u16 = 8080;
pub const HTTPS_PORT: u16 = 8444;

pub const CERT_FILE: &str = "cert.pem";
pub const KEY_FILE: &str = "key.pem";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Directory requests are resolved against.
    pub root: PathBuf,
    /// Append `Cache-Control: no-cache` to every response.
    pub no_cache: bool,
    /// Answer extensionless misses with `index.html` instead of 404.
    pub spa_fallback: bool,
    /// Wrap the listener in TLS using the credential pair in `root`.
    pub tls: bool,
}

impl ServerConfig {
    /// Plain HTTP on every interface, caching disabled.
    pub fn plain() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: HTTP_PORT,
            root: Path::new(PROJECT_ROOT).join(BUILD_OUTPUT),
            no_cache: true,
            spa_fallback: false,
            tls: false,
        }
    }

    /// HTTPS on loopback only, serving the build output directly.
    pub fn tls() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: HTTPS_PORT,
            root: Path::new(PROJECT_ROOT).join(BUILD_OUTPUT),
            no_cache: false,
            spa_fallback: false,
            tls: true,
        }
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_spa_fallback(mut self, enabled: bool) -> Self {
        self.spa_fallback = enabled;
        self
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn scheme(&self) -> &'static str {
        if self.tls {
            "https"
        } else {
            "http"
        }
    }

    /// Credential pair kept next to the served files.
    pub fn tls_files(&self) -> TlsFiles {
        TlsFiles::in_dir(&self.root)
    }

    /// Replace `root` with its absolute form, failing if it is not a directory.
    pub fn resolved(mut self) -> Result<Self, ServeError> {
        let root = self
            .root
            .canonicalize()
            .map_err(|source| ServeError::MissingRoot {
                path: self.root.clone(),
                source,
            })?;
        if !root.is_dir() {
            return Err(ServeError::MissingRoot {
                path: root,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }
        self.root = root;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_listens_everywhere_without_tls() {
        let config = ServerConfig::plain();
        assert!(config.socket_addr().ip().is_unspecified());
        assert_eq!(config.port, 8080);
        assert!(config.no_cache);
        assert_eq!(config.scheme(), "http");
        assert!(config.root.ends_with("dist/my-daily-face/browser"));
    }

    #[test]
    fn tls_listens_on_loopback() {
        let config = ServerConfig::tls();
        assert!(config.socket_addr().ip().is_loopback());
        assert_eq!(config.port, 8444);
        assert!(!config.no_cache);
        assert_eq!(config.scheme(), "https");
        assert_ne!(config.port, ServerConfig::plain().port);
    }

    #[test]
    fn tls_files_follow_root() {
        let config = ServerConfig::tls().with_root("/srv/site");
        let files = config.tls_files();
        assert_eq!(files.cert_path, Path::new("/srv/site/cert.pem"));
        assert_eq!(files.key_path, Path::new("/srv/site/key.pem"));
    }

    #[test]
    fn resolving_missing_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::plain().with_root(dir.path().join("nope"));
        assert!(matches!(
            config.resolved(),
            Err(ServeError::MissingRoot { .. })
        ));
    }

    #[test]
    fn resolving_file_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("index.html");
        std::fs::write(&file, "hi").unwrap();
        let config = ServerConfig::plain().with_root(file);
        assert!(matches!(
            config.resolved(),
            Err(ServeError::MissingRoot { .. })
        ));
    }

    #[test]
    fn resolving_makes_root_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::plain()
            .with_root(dir.path())
            .resolved()
            .unwrap();
        assert!(config.root.is_absolute());
    }
}
