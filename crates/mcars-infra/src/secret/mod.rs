//! Secret lookup for the model API credential.

pub mod env;

pub use env::EnvSecretProvider;
