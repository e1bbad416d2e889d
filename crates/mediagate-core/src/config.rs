//! Configuration module
//!
//! Configuration is read once at process start from the environment (a `.env`
//! file is honoured through `dotenvy`). Everything else in the gateway receives
//! the values it needs through constructors.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_TOKEN_COOKIE_NAME, MIN_TOKEN_SECRET_LEN};

// Common constants
const PORT: u16 = 8085;
const HTTPS_PORT: u16 = 443;
const HTTP_PORT: u16 = 80;
const DB_MAX_CONNECTIONS: u32 = 10;
const TOKEN_TTL_MINUTES: i64 = 30;
const CERT_RENEW_BEFORE_HOURS: u64 = 720;
const MAX_IMAGE_SIZE_MB: usize = 20;
const MAX_VIDEO_SIZE_MB: usize = 500;
const VIDEO_THUMBNAIL_OFFSET_SECS: u64 = 4;
const VIDEO_TIMEOUT_SECS: u64 = 60;
const READ_HEADER_TIMEOUT_SECS: u64 = 5;
const READ_TIMEOUT_SECS: u64 = 5;
const WRITE_TIMEOUT_SECS: u64 = 10;
const IDLE_TIMEOUT_SECS: u64 = 120;
const UPLOAD_TIMEOUT_SECS: u64 = 300;

/// Where certificates for allow-listed hosts come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CertSource {
    /// Certificates provisioned into `<cert_dir>/<host>/{fullchain,privkey}.pem`.
    Directory,
    /// Certificates generated in-process (staging and local use).
    SelfSigned,
}

/// Certificate and listener settings. Absent when no TLS host is configured.
#[derive(Clone, Debug)]
pub struct TlsConfig {
    pub hosts: Vec<String>,
    pub https_port: u16,
    pub http_port: u16,
    pub cert_dir: PathBuf,
    pub challenge_dir: PathBuf,
    pub cert_source: CertSource,
    pub renew_before: Duration,
}

/// Signing key and session settings for the token service.
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_minutes: i64,
    pub cookie_name: String,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("ttl_minutes", &self.ttl_minutes)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

/// Settings for the external decoder process used by the video pipeline.
#[derive(Clone, Debug)]
pub struct VideoConfig {
    pub ffmpeg_path: String,
    pub temp_dir: PathBuf,
    pub thumbnail_offset: Duration,
    pub timeout: Duration,
}

/// Per-connection phase timeouts.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionTimeouts {
    pub read_header: Duration,
    /// Longest gap between two body frames
    pub read: Duration,
    pub write: Duration,
    pub idle: Duration,
    /// Whole-request bound on upload routes, body included
    pub upload: Duration,
}

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub environment: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub token: TokenConfig,
    pub tls: Option<TlsConfig>,
    pub video: VideoConfig,
    pub timeouts: ConnectionTimeouts,
    pub max_image_size_bytes: usize,
    pub max_video_size_bytes: usize,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<GatewayConfig>);

impl Config {
    fn inner(&self) -> &GatewayConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = GatewayConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn environment(&self) -> &str {
        &self.inner().environment
    }

    pub fn server_port(&self) -> u16 {
        self.inner().server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().cors_origins
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().db_max_connections
    }

    pub fn token(&self) -> &TokenConfig {
        &self.inner().token
    }

    pub fn tls(&self) -> Option<&TlsConfig> {
        self.inner().tls.as_ref()
    }

    pub fn video(&self) -> &VideoConfig {
        &self.inner().video
    }

    pub fn timeouts(&self) -> ConnectionTimeouts {
        self.inner().timeouts
    }

    pub fn max_image_size_bytes(&self) -> usize {
        self.inner().max_image_size_bytes
    }

    pub fn max_video_size_bytes(&self) -> usize {
        self.inner().max_video_size_bytes
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins = split_list(
            &env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:4200".to_string()),
        );

        let server_port = env::var("PORT")
            .unwrap_or_else(|_| PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let token = TokenConfig {
            secret: env::var("TOKEN_SECRET")
                .map_err(|_| anyhow::anyhow!("TOKEN_SECRET must be set for authentication"))?,
            ttl_minutes: env_or("TOKEN_TTL_MINUTES", TOKEN_TTL_MINUTES),
            cookie_name: env::var("TOKEN_COOKIE_NAME")
                .unwrap_or_else(|_| DEFAULT_TOKEN_COOKIE_NAME.to_string()),
        };

        let hosts: Vec<String> = split_list(&env::var("TLS_HOSTS").unwrap_or_default())
            .into_iter()
            .map(|h| h.to_lowercase())
            .collect();
        let tls = if hosts.is_empty() {
            None
        } else {
            let cert_dir = PathBuf::from(env::var("CERT_DIR").unwrap_or_else(|_| "/certs".into()));
            let challenge_dir = env::var("ACME_CHALLENGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| cert_dir.join("acme-challenge"));
            let cert_source = match env::var("CERT_SOURCE")
                .unwrap_or_else(|_| "directory".to_string())
                .to_lowercase()
                .as_str()
            {
                "directory" | "dir" => CertSource::Directory,
                "self-signed" | "selfsigned" => CertSource::SelfSigned,
                other => {
                    return Err(anyhow::anyhow!(
                        "CERT_SOURCE must be 'directory' or 'self-signed', got '{}'",
                        other
                    ))
                }
            };
            Some(TlsConfig {
                hosts,
                https_port: env_or("HTTPS_PORT", HTTPS_PORT),
                http_port: env_or("HTTP_PORT", HTTP_PORT),
                cert_dir,
                challenge_dir,
                cert_source,
                renew_before: Duration::from_secs(
                    env_or("CERT_RENEW_BEFORE_HOURS", CERT_RENEW_BEFORE_HOURS) * 3600,
                ),
            })
        };

        let video = VideoConfig {
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            temp_dir: env::var("VIDEO_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            thumbnail_offset: Duration::from_secs(env_or(
                "VIDEO_THUMBNAIL_OFFSET_SECS",
                VIDEO_THUMBNAIL_OFFSET_SECS,
            )),
            timeout: Duration::from_secs(env_or("VIDEO_TIMEOUT_SECS", VIDEO_TIMEOUT_SECS)),
        };

        let timeouts = ConnectionTimeouts {
            read_header: Duration::from_secs(env_or(
                "READ_HEADER_TIMEOUT_SECS",
                READ_HEADER_TIMEOUT_SECS,
            )),
            read: Duration::from_secs(env_or("READ_TIMEOUT_SECS", READ_TIMEOUT_SECS)),
            write: Duration::from_secs(env_or("WRITE_TIMEOUT_SECS", WRITE_TIMEOUT_SECS)),
            idle: Duration::from_secs(env_or("IDLE_TIMEOUT_SECS", IDLE_TIMEOUT_SECS)),
            upload: Duration::from_secs(env_or("UPLOAD_TIMEOUT_SECS", UPLOAD_TIMEOUT_SECS)),
        };

        Ok(GatewayConfig {
            environment,
            server_port,
            cors_origins,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", DB_MAX_CONNECTIONS),
            token,
            tls,
            video,
            timeouts,
            max_image_size_bytes: env_or("MAX_IMAGE_SIZE_MB", MAX_IMAGE_SIZE_MB) * 1024 * 1024,
            max_video_size_bytes: env_or("MAX_VIDEO_SIZE_MB", MAX_VIDEO_SIZE_MB) * 1024 * 1024,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.token.secret.len() < MIN_TOKEN_SECRET_LEN {
            return Err(anyhow::anyhow!(
                "TOKEN_SECRET must be at least {} characters long",
                MIN_TOKEN_SECRET_LEN
            ));
        }
        if self.token.ttl_minutes <= 0 {
            return Err(anyhow::anyhow!("TOKEN_TTL_MINUTES must be positive"));
        }
        if self.token.cookie_name.is_empty()
            || !self
                .token
                .cookie_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(anyhow::anyhow!(
                "TOKEN_COOKIE_NAME must be a non-empty token of [A-Za-z0-9_-]"
            ));
        }

        let env = self.environment.to_lowercase();
        let is_production = env == "production" || env == "prod";
        if self.cors_origins.is_empty() {
            return Err(anyhow::anyhow!("CORS_ORIGINS must list at least one origin"));
        }
        if is_production && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if let Some(tls) = &self.tls {
            for host in &tls.hosts {
                let valid = !host.starts_with('.')
                    && !host.ends_with('.')
                    && host
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');
                if !valid {
                    return Err(anyhow::anyhow!("TLS_HOSTS contains invalid hostname '{}'", host));
                }
            }
            if tls.https_port == tls.http_port {
                return Err(anyhow::anyhow!("HTTPS_PORT and HTTP_PORT must differ"));
            }
        }

        if self.video.ffmpeg_path.trim().is_empty() {
            return Err(anyhow::anyhow!("FFMPEG_PATH must not be empty"));
        }
        if self.timeouts.read.is_zero() || self.timeouts.read_header.is_zero() {
            return Err(anyhow::anyhow!(
                "READ_TIMEOUT_SECS and READ_HEADER_TIMEOUT_SECS must be positive"
            ));
        }
        if self.timeouts.upload <= self.video.timeout {
            return Err(anyhow::anyhow!(
                "UPLOAD_TIMEOUT_SECS ({}) must exceed VIDEO_TIMEOUT_SECS ({})",
                self.timeouts.upload.as_secs(),
                self.video.timeout.as_secs()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> GatewayConfig {
        GatewayConfig {
            environment: "development".to_string(),
            server_port: PORT,
            cors_origins: vec!["http://localhost:4200".to_string()],
            database_url: None,
            db_max_connections: DB_MAX_CONNECTIONS,
            token: TokenConfig {
                secret: "k".repeat(MIN_TOKEN_SECRET_LEN),
                ttl_minutes: TOKEN_TTL_MINUTES,
                cookie_name: DEFAULT_TOKEN_COOKIE_NAME.to_string(),
            },
            tls: None,
            video: VideoConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                temp_dir: env::temp_dir(),
                thumbnail_offset: Duration::from_secs(4),
                timeout: Duration::from_secs(60),
            },
            timeouts: ConnectionTimeouts {
                read_header: Duration::from_secs(5),
                read: Duration::from_secs(5),
                write: Duration::from_secs(10),
                idle: Duration::from_secs(120),
                upload: Duration::from_secs(300),
            },
            max_image_size_bytes: MAX_IMAGE_SIZE_MB * 1024 * 1024,
            max_video_size_bytes: MAX_VIDEO_SIZE_MB * 1024 * 1024,
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut cfg = base();
        cfg.token.secret = "short".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let mut cfg = base();
        cfg.cors_origins = vec!["*".to_string()];
        assert!(cfg.validate().is_ok());
        cfg.environment = "production".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_invalid_tls_host_rejected() {
        let mut cfg = base();
        cfg.tls = Some(TlsConfig {
            hosts: vec!["api.example.com".to_string()],
            https_port: HTTPS_PORT,
            http_port: HTTP_PORT,
            cert_dir: PathBuf::from("/certs"),
            challenge_dir: PathBuf::from("/certs/acme-challenge"),
            cert_source: CertSource::Directory,
            renew_before: Duration::from_secs(3600),
        });
        assert!(cfg.validate().is_ok());

        if let Some(tls) = cfg.tls.as_mut() {
            tls.hosts.push("bad host/..".to_string());
        }
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_upload_timeout_must_exceed_video_deadline() {
        let mut cfg = base();
        cfg.timeouts.upload = cfg.video.timeout;
        assert!(cfg.validate().is_err());

        cfg.timeouts.upload = cfg.video.timeout + Duration::from_secs(1);
        assert!(cfg.validate().is_ok());

        cfg.timeouts.read = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_token_config_debug_redacts_secret() {
        let cfg = base();
        let rendered = format!("{:?}", cfg.token);
        assert!(!rendered.contains(&cfg.token.secret));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_split_list_trims_and_drops_empty() {
        assert_eq!(
            split_list(" a.example.com, ,b.example.com "),
            vec!["a.example.com".to_string(), "b.example.com".to_string()]
        );
    }
}
