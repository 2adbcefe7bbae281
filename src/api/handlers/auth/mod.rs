//! Authentication, session and access-control handlers.
//!
//! This module covers registration, password login, password reset and the
//! external identity callback, plus the bearer-token gate used by the
//! authenticated endpoints.
//!
//! ## Login Throttling
//!
//! Login attempts are throttled per client key (proxy-reported IP):
//!
//! - **Attempt Limit:** 5 failed attempts within a 15-minute window.
//! - **Lockout:** further attempts are refused until the window elapses,
//!   with the remaining wait reported in whole minutes.
//!
//! The counters live in process memory; each instance throttles its own
//! traffic and a restart clears them.
//!
//! ## Session Tokens
//!
//! Sessions are HMAC-SHA256 signed tokens carrying the user id and role.
//! They are stateless: nothing is stored server-side and issued tokens stay
//! valid until they expire. Deactivated accounts are still blocked because
//! every authenticated request re-reads the active flag.

pub(crate) mod admin;
pub(crate) mod bot_check;
pub(crate) mod error;
pub(crate) mod external;
pub(crate) mod login;
pub(crate) mod password;
pub(crate) mod principal;
pub(crate) mod register;
pub(crate) mod reset;
mod state;
pub(crate) mod throttle;
mod token;
pub(crate) mod types;
mod utils;

pub use bot_check::{BotCheck, HttpBotCheck, NoopBotCheck};
pub use external::{DisabledProvider, ExternalProvider, GoogleProvider};
pub use state::{AuthConfig, AuthState};
pub use throttle::{spawn_sweeper, LoginThrottle, ThrottleConfig};
pub use token::TokenSigner;
