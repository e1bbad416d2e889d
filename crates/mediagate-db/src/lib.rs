//! Mediagate Storage Facade
//!
//! This crate provides the persistence boundary consumed by the gateway's
//! handlers: a media repository and an identity/document store. Both are
//! traits so handlers stay agnostic of the backing store.
//!
// Module declarations
pub mod db;

// Re-exports: repository traits and factories
pub use db::{
    create_identity_store, create_media_repository, IdentityStore, InMemoryIdentityStore,
    InMemoryMediaRepository, MediaRepository,
};

#[cfg(feature = "postgres")]
pub use db::PgMediaRepository;
