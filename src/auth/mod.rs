//! Credential store: password hashing, token issuance and token resolution.

pub mod claims;
pub mod extractors;
pub mod jwt;
pub mod password;

pub use claims::JwtKeys;
pub use extractors::AuthUser;
