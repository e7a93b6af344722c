//! One-time-passcode ledger.
//!
//! A user has at most one live challenge at a time: creating a new one
//! supersedes everything still pending. Challenges expire after five minutes,
//! allow five verify attempts, and are retained afterwards as audit history.

pub mod crypto;
pub mod models;
pub mod repo;
pub mod service;

pub use models::{OtpMethod, OtpRequest, OtpStatus};
pub use service::{OtpConfig, OtpLedger, VerifyOutcome};
