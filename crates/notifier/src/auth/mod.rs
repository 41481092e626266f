//! OAuth2 credential lifecycle
//!
//! - [`TokenStore`] persists the credential pair to disk
//! - [`OAuthSession`] owns the live credential and routes provider calls
//!   through it, refreshing and persisting as needed

mod session;
mod token_store;

pub use session::{OAuthSession, extract_auth_code};
pub use token_store::TokenStore;
