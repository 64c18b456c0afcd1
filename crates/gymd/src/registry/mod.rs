//! Session registry.
//!
//! Owns every live environment, keyed by an opaque session id, and enforces
//! the session lifecycle: a session must exist before it can be reset or
//! stepped, and a deleted id never becomes valid again.

mod error;
mod models;
mod service;

pub use error::RegistryError;
pub use models::RegistryConfig;
pub use service::SessionRegistry;
