pub mod error;
pub mod extract;
pub mod service;
pub mod token;

pub use error::AuthError;
pub use extract::{AppCredential, SessionUser};
pub use service::TokenService;
pub use token::{TokenIssuer, TokenValidity};
