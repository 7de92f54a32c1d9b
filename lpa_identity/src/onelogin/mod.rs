mod claim;
mod client;
mod config;
mod discovery;
mod errors;
mod idtoken;
#[cfg(test)]
pub(crate) mod test_keys;
mod types;

pub use claim::parse_identity_claim;
pub use client::{IdentityProvider, OneLoginClient, SigningKey};
pub use config::OneLoginConfig;
pub use discovery::Endpoints;
pub use errors::OneLoginError;
pub use types::{CORE_IDENTITY_CLAIM, IdentityClaimResult, TokenResponse, UserInfo};
