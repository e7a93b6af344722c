//! Authentication routes.

pub mod login;
pub mod otp;
pub mod signup;
pub mod social;
pub mod types;
