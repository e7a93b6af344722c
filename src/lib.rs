//! # Luna Auth (Account Authentication Core)
//!
//! `luna-auth` is the account authentication service: signup and login with
//! password credentials, social login through Google and Facebook, and
//! one-time-passcode account verification.
//!
//! ## Accounts
//!
//! An account authenticates exactly one way: with a password hash (local) or
//! with a provider identity (social). The two are never mixed on one record.
//! Usernames and emails are unique case-insensitively; social accounts get a
//! generated username derived from the provider profile name.
//!
//! ## Verification (OTP)
//!
//! Local accounts start unverified and cannot log in until a six-digit
//! passcode, delivered out of band, is presented. A user has at most one live
//! passcode; requesting a new one supersedes the old. Passcodes expire after
//! five minutes, allow five guesses, and issuance is capped at five per hour
//! per user.
//!
//! ## Sessions
//!
//! Successful authentication yields an HS256 access/refresh token pair. The
//! `token_type` claim is enforced on decode, so a refresh token can never be
//! replayed where an access token is expected.

pub mod api;
pub mod cli;
pub mod error;
pub mod identity;
pub mod notify;
pub mod otp;
pub mod password;
pub mod token;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
