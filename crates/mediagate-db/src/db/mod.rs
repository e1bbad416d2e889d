//! Repositories for the Storage Facade
//!
//! `media` holds the relational media listings; `identity` holds profiles,
//! sales and withdrawals from the document/identity store.

pub mod identity;
pub mod media;

pub use identity::{create_identity_store, IdentityStore, InMemoryIdentityStore};
#[cfg(feature = "postgres")]
pub use media::PgMediaRepository;
pub use media::{create_media_repository, InMemoryMediaRepository, MediaRepository};
