//! Credentials, bearer token models, and the credential exchange contract.

pub mod credentials;
pub mod exchange;
pub mod secret;
pub mod token;

pub use credentials::*;
pub use exchange::*;
pub use secret::*;
pub use token::*;
