//! Identity records and the flows that create and authenticate them.

pub mod models;
pub mod providers;
pub mod repo;
pub mod service;
pub mod username;

pub use models::{AccountStatus, AuthMode, SocialProvider, User};
pub use providers::{FacebookProvider, GoogleProvider, IdentityProvider, VerifiedIdentity};
pub use service::{IdentityResolver, LoginGrant, SignupInput, SocialGrant};
