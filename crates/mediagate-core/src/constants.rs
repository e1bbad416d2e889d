//! Constants shared across crates.

/// Default name of the session cookie carrying the signed token.
pub const DEFAULT_TOKEN_COOKIE_NAME: &str = "pro_token";

/// Header a non-browser client may use instead of the cookie.
pub const TOKEN_HEADER_NAME: &str = "pro_token";

/// Legacy header still sent by older web clients.
pub const LEGACY_TOKEN_HEADER_NAME: &str = "user_token";

/// Minimum length of the server-held signing key.
pub const MIN_TOKEN_SECRET_LEN: usize = 32;

/// Uniform message for every authentication failure.
pub const AUTH_FAILURE_MESSAGE: &str = "no or wrong token found in header";
