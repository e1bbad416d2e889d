//! Mediagate Core Library
//!
//! This crate provides the domain models, error types and configuration
//! shared by the gateway, its storage facade and the media pipelines.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{
    CertSource, Config, ConnectionTimeouts, GatewayConfig, TlsConfig, TokenConfig, VideoConfig,
};
pub use error::{AppError, AppStatusCode, ErrorMetadata, LogLevel};
