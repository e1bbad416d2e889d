//! Certificate lifecycle for the HTTPS listener
//!
//! Certificates are obtained per host on the first handshake that names it,
//! cached, and re-obtained once they enter the renewal window. Hosts outside
//! the allow-list are refused; only that handshake fails.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mediagate_core::{CertSource, TlsConfig};
use rustls::crypto::{ring, CryptoProvider};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::ServerConfig;

/// ALPN identifiers offered on the secure listener, most preferred first.
pub const ALPN_PROTOCOLS: [&[u8]; 2] = [b"h2", b"http/1.1"];

/// How often certificates provisioned on disk are re-read.
const DIR_RELOAD_INTERVAL: Duration = Duration::from_secs(60 * 60);

const SELF_SIGNED_VALIDITY_DAYS: i64 = 90;

pub struct IssuedCertificate {
    pub chain: Vec<CertificateDer<'static>>,
    pub key: PrivateKeyDer<'static>,
    pub not_after: DateTime<Utc>,
}

#[async_trait]
pub trait CertificateIssuer: Send + Sync {
    async fn issue(&self, host: &str) -> Result<IssuedCertificate, anyhow::Error>;
}

/// Reads `<dir>/<host>/fullchain.pem` and `<dir>/<host>/privkey.pem`, as
/// written by an external ACME client.
#[derive(Debug, Clone)]
pub struct DirCertificateIssuer {
    dir: PathBuf,
    renew_before: Duration,
}

impl DirCertificateIssuer {
    pub fn new(dir: impl Into<PathBuf>, renew_before: Duration) -> Self {
        Self {
            dir: dir.into(),
            renew_before,
        }
    }
}

#[async_trait]
impl CertificateIssuer for DirCertificateIssuer {
    async fn issue(&self, host: &str) -> Result<IssuedCertificate, anyhow::Error> {
        let host_dir = self.dir.join(host);
        let chain_pem = tokio::fs::read(host_dir.join("fullchain.pem")).await?;
        let key_pem = tokio::fs::read(host_dir.join("privkey.pem")).await?;

        let chain = CertificateDer::pem_slice_iter(&chain_pem).collect::<Result<Vec<_>, _>>()?;
        if chain.is_empty() {
            anyhow::bail!("no certificates in {}", host_dir.display());
        }
        let key = PrivateKeyDer::from_pem_slice(&key_pem)?;

        // The files are not parsed for expiry; the entry is simply treated as
        // due for renewal once the reload interval has passed.
        let not_after = Utc::now() + to_chrono(self.renew_before + DIR_RELOAD_INTERVAL);

        Ok(IssuedCertificate {
            chain,
            key,
            not_after,
        })
    }
}

/// Self-signed certificates for local and staging deployments.
#[derive(Debug, Clone, Default)]
pub struct SelfSignedIssuer;

#[async_trait]
impl CertificateIssuer for SelfSignedIssuer {
    async fn issue(&self, host: &str) -> Result<IssuedCertificate, anyhow::Error> {
        let mut params = rcgen::CertificateParams::new(vec![host.to_string()])?;
        let now = time::OffsetDateTime::now_utc();
        params.not_before = now - time::Duration::minutes(5);
        params.not_after = now + time::Duration::days(SELF_SIGNED_VALIDITY_DAYS);

        let key_pair = rcgen::KeyPair::generate()?;
        let cert = params.self_signed(&key_pair)?;

        Ok(IssuedCertificate {
            chain: vec![cert.der().clone()],
            key: PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der())),
            not_after: Utc::now() + chrono::Duration::days(SELF_SIGNED_VALIDITY_DAYS),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CertLookupError {
    #[error("client hello carried no server name")]
    MissingServerName,

    #[error("host {0} is not on the allow-list")]
    HostNotAllowed(String),

    #[error("failed to obtain certificate for {host}: {source}")]
    Issue {
        host: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Clone)]
struct CachedConfig {
    config: Arc<ServerConfig>,
    not_after: DateTime<Utc>,
}

pub struct CertificateManager {
    allowed: HashSet<String>,
    issuer: Arc<dyn CertificateIssuer>,
    renew_before: chrono::Duration,
    provider: Arc<CryptoProvider>,
    cache: RwLock<HashMap<String, CachedConfig>>,
}

impl CertificateManager {
    pub fn new(
        hosts: &[String],
        issuer: Arc<dyn CertificateIssuer>,
        renew_before: Duration,
    ) -> Self {
        Self {
            allowed: hosts.iter().map(|h| normalize_host(h)).collect(),
            issuer,
            renew_before: to_chrono(renew_before),
            provider: Arc::new(ring::default_provider()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &TlsConfig) -> Self {
        let issuer: Arc<dyn CertificateIssuer> = match config.cert_source {
            CertSource::Directory => Arc::new(DirCertificateIssuer::new(
                config.cert_dir.clone(),
                config.renew_before,
            )),
            CertSource::SelfSigned => Arc::new(SelfSignedIssuer),
        };
        Self::new(&config.hosts, issuer, config.renew_before)
    }

    pub fn is_allowed(&self, host: &str) -> bool {
        self.allowed.contains(&normalize_host(host))
    }

    /// TLS configuration for the host named in the client hello.
    pub async fn server_config(
        &self,
        server_name: Option<&str>,
    ) -> Result<Arc<ServerConfig>, CertLookupError> {
        let host = server_name
            .map(normalize_host)
            .ok_or(CertLookupError::MissingServerName)?;
        if !self.allowed.contains(&host) {
            return Err(CertLookupError::HostNotAllowed(host));
        }

        let now = Utc::now();
        let cached = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&host)
            .cloned();

        if let Some(entry) = &cached {
            let fresh = entry
                .not_after
                .checked_sub_signed(self.renew_before)
                .is_some_and(|renew_at| now < renew_at);
            if fresh {
                return Ok(entry.config.clone());
            }
        }

        match self.obtain(&host).await {
            Ok(entry) => {
                tracing::info!(host = %host, not_after = %entry.not_after, "Certificate obtained");
                let config = entry.config.clone();
                self.cache
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(host, entry);
                Ok(config)
            }
            Err(source) => match cached {
                Some(entry) if now < entry.not_after => {
                    tracing::warn!(
                        host = %host,
                        error = %source,
                        not_after = %entry.not_after,
                        "Certificate renewal failed, serving cached certificate"
                    );
                    Ok(entry.config)
                }
                _ => Err(CertLookupError::Issue { host, source }),
            },
        }
    }

    async fn obtain(&self, host: &str) -> Result<CachedConfig, anyhow::Error> {
        let issued = self.issuer.issue(host).await?;
        let not_after = issued.not_after;

        let mut config = ServerConfig::builder_with_provider(self.provider.clone())
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(issued.chain, issued.key)?;
        config.alpn_protocols = ALPN_PROTOCOLS.iter().map(|p| p.to_vec()).collect();

        Ok(CachedConfig {
            config: Arc::new(config),
            not_after,
        })
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(365))
}
