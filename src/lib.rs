//! # Zaguan (Portal Authentication & Access Control)
//!
//! `zaguan` is the authentication and access-control service for the web
//! portal. It handles self-service registration, password login with
//! per-client throttling, stateless session tokens, password reset and
//! Google-linked external identities.
//!
//! ## Sessions
//!
//! Sessions are HMAC-SHA256 signed tokens with no server-side state: once
//! issued, a token stays valid until it expires. Account deactivation still
//! takes effect immediately because every authenticated request re-reads the
//! active flag from storage.
//!
//! ## Enumeration Resistance
//!
//! Login answers identically for unknown emails and wrong passwords, and the
//! password-reset request endpoint returns the same generic acknowledgement
//! whether or not the address is registered.

pub mod api;
pub mod cli;
pub mod storage;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
