pub mod cert;
pub mod config;
pub mod error;
pub mod routes;
pub mod server;

pub use cert::{CertError, CertParams, Provisioned, TlsFiles};
pub use config::ServerConfig;
pub use error::ServeError;
pub use server::StaticServer;
