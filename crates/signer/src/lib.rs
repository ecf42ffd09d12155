pub mod config;
pub mod error;
pub mod keys;
pub mod lifecycle;
pub mod logging;
pub mod server;
pub mod signing;

#[cfg(test)]
mod fixtures;

pub use config::{ConfigStore, Configuration};
pub use error::ServiceError;
pub use keys::{PrivateKeyHandle, load_private_key, load_public_key_text, validate_selection};
pub use server::{AppState, ServiceHandle, router};
pub use signing::{SignatureArtifact, sign};
