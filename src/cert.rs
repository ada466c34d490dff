//! Self-signed credential provisioning for the HTTPS server.
//!
//! Keys are generated with the `rsa` crate and the certificate is signed with
//! rcgen, so no external tooling has to be installed.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, PKCS_RSA_SHA256};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use tempfile::NamedTempFile;

use crate::config::{CERT_FILE, KEY_FILE};

/// Parameters for certificate generation.
#[derive(Debug, Clone)]
pub struct CertParams {
    /// RSA modulus size in bits
    pub key_bits: usize,
    pub validity_days: u32,
    pub country: String,
    pub state: String,
    pub locality: String,
    pub organization: String,
    pub common_name: String,
    /// DNS names or IP addresses
    pub subject_alt_names: Vec<String>,
}

impl Default for CertParams {
    fn default() -> Self {
        Self {
            key_bits: 4096,
            validity_days: 365,
            country: "US".to_string(),
            state: "CA".to_string(),
            locality: "SF".to_string(),
            organization: "Test".to_string(),
            common_name: "localhost".to_string(),
            subject_alt_names: vec!["localhost".to_string(), "127.0.0.1".to_string()],
        }
    }
}

/// A freshly generated certificate and its private key, both PEM encoded.
pub struct SelfSigned {
    pub cert_pem: String,
    pub key_pem: String,
}

impl std::fmt::Debug for SelfSigned {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfSigned")
            .field("cert_pem_len", &self.cert_pem.len())
            .finish()
    }
}

/// Generate an RSA key and a certificate signed by it.
pub fn generate_self_signed(params: &CertParams) -> Result<SelfSigned, CertError> {
    let mut rng = rand::thread_rng();
    let private_key =
        RsaPrivateKey::new(&mut rng, params.key_bits).map_err(CertError::KeyGeneration)?;
    let key_pem = private_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(CertError::KeyEncoding)?
        .to_string();
    let key_pair =
        KeyPair::from_pem_and_sign_algo(&key_pem, &PKCS_RSA_SHA256).map_err(CertError::KeyPair)?;

    let mut cert_params = CertificateParams::new(params.subject_alt_names.clone())
        .map_err(CertError::Generation)?;
    let mut name = DistinguishedName::new();
    name.push(DnType::CountryName, &params.country);
    name.push(DnType::StateOrProvinceName, &params.state);
    name.push(DnType::LocalityName, &params.locality);
    name.push(DnType::OrganizationName, &params.organization);
    name.push(DnType::CommonName, &params.common_name);
    cert_params.distinguished_name = name;

    cert_params.not_before = time::OffsetDateTime::now_utc();
    cert_params.not_after =
        cert_params.not_before + time::Duration::days(i64::from(params.validity_days));

    let cert = cert_params
        .self_signed(&key_pair)
        .map_err(CertError::Generation)?;

    Ok(SelfSigned {
        cert_pem: cert.pem(),
        key_pem,
    })
}

/// Printed before a new pair is generated.
pub const GENERATION_NOTICE: &str = "Generating self-signed certificate...";

/// What [`TlsFiles::ensure`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Generated,
    Reused,
}

/// Locations of the certificate and key on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl TlsFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            cert_path: dir.join(CERT_FILE),
            key_path: dir.join(KEY_FILE),
        }
    }

    /// Both files are present.
    pub fn is_complete(&self) -> bool {
        self.cert_path.exists() && self.key_path.exists()
    }

    /// Generate a new pair and move it into place, replacing whatever is there.
    ///
    /// Both files are staged next to their targets first. If the certificate
    /// cannot be moved into place the new key is removed again, so a failed
    /// run never leaves a mismatched pair that [`is_complete`](Self::is_complete)
    /// would accept.
    pub fn generate(&self, params: &CertParams) -> Result<(), CertError> {
        let pair = generate_self_signed(params)?;
        let key = stage(&self.key_path, &pair.key_pem, 0o600)?;
        let cert = stage(&self.cert_path, &pair.cert_pem, 0o644)?;

        persist(key, &self.key_path)?;
        if let Err(e) = persist(cert, &self.cert_path) {
            let _ = fs::remove_file(&self.key_path);
            return Err(e);
        }

        log::info!(
            "wrote self-signed certificate {} and key {}",
            self.cert_path.display(),
            self.key_path.display()
        );
        Ok(())
    }

    /// Reuse an existing pair untouched, otherwise write [`GENERATION_NOTICE`]
    /// to `out` and generate both files.
    pub fn ensure(
        &self,
        params: &CertParams,
        out: &mut impl Write,
    ) -> Result<Provisioned, CertError> {
        if self.is_complete() {
            log::debug!("reusing {}", self.cert_path.display());
            return Ok(Provisioned::Reused);
        }
        writeln!(out, "{}", GENERATION_NOTICE)
            .and_then(|()| out.flush())
            .map_err(CertError::Notice)?;
        self.generate(params)?;
        Ok(Provisioned::Generated)
    }
}

/// Write `contents` to a temporary file in the same directory as `target`.
fn stage(target: &Path, contents: &str, mode: u32) -> Result<NamedTempFile, CertError> {
    let write_error = |source| CertError::Write {
        path: target.to_path_buf(),
        source,
    };
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir).map_err(write_error)?;
    file.write_all(contents.as_bytes()).map_err(write_error)?;
    file.as_file().sync_all().map_err(write_error)?;
    set_mode(file.as_file(), mode).map_err(write_error)?;
    Ok(file)
}

fn persist(file: NamedTempFile, target: &Path) -> Result<(), CertError> {
    file.persist(target)
        .map(|_| ())
        .map_err(|e| CertError::Write {
            path: target.to_path_buf(),
            source: e.error,
        })
}

#[cfg(unix)]
fn set_mode(file: &fs::File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &fs::File, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Errors that can occur while provisioning credentials.
#[derive(Debug, thiserror::Error)]
pub enum CertError {
    #[error("failed to generate RSA key: {0}")]
    KeyGeneration(#[source] rsa::Error),
    #[error("failed to encode private key: {0}")]
    KeyEncoding(#[source] rsa::pkcs8::Error),
    #[error("failed to load key pair: {0}")]
    KeyPair(#[source] rcgen::Error),
    #[error("failed to generate certificate: {0}")]
    Generation(#[source] rcgen::Error),
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to report certificate generation: {0}")]
    Notice(#[source] io::Error),
}
