//! Token issuance and the auth middleware

pub mod middleware;
pub mod models;
pub mod token;

pub use middleware::{find_token, require_token, AuthState};
pub use models::{Credentials, Identity, IssuedToken, VerifiedClaim};
pub use token::{Clock, ServerKey, SystemClock, TokenService};
