//! Logging in with the identity provider and linking the result to a case.

mod binding;
mod callback;
mod errors;
mod flow;
mod sign_out;
#[cfg(test)]
pub(crate) mod test_utils;
mod types;
mod vendor;

pub use errors::LoginError;
pub use flow::LoginFlow;
pub use types::{CallbackOutcome, CallbackQuery, LoginQuery, VendorCallbackQuery, VendorStart};
