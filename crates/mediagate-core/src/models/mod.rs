//! Data models for the application
//!
//! Records exchanged with the Storage Facade. The gateway treats these as
//! opaque payloads; it never interprets credits or amounts itself.

mod identity;
mod media;

pub use identity::*;
pub use media::*;
