pub mod auth;
pub mod nonce;
pub mod validation;
