//! Login gate in front of the review tools.
//!
//! [`SessionGate`] delegates credential checks to an [`IdentityProvider`]
//! (Firebase Authentication in production) and hands out a [`Session`] only
//! on success.

pub mod firebase;
mod provider;
mod session;

pub use provider::{Identity, IdentityProvider};
pub use session::{Session, SessionGate};
