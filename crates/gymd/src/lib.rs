//! gymd - session server for stateful simulation environments.
//!
//! Clients create an environment bound to an opaque session id, drive it with
//! reset and step calls, and delete it when done. The [`registry`] owns every
//! live environment; the [`api`] module exposes it over HTTP.

pub mod api;
pub mod config;
pub mod env;
pub mod normalize;
pub mod registry;
pub mod tasks;
