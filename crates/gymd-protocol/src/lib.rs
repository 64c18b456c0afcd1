//! Wire types for the gymd environment session API.
//!
//! This crate defines the JSON request and response bodies exchanged between
//! clients and the `gymd` server:
//!
//! ```text
//! Client --[POST /environments]--> create  -> EnvironmentInfo
//!        --[POST .../reset]------> reset   -> ResetResponse
//!        --[POST .../step]-------> step    -> StepResponse
//!        --[DELETE ...]----------> delete  -> DeleteResponse
//! ```
//!
//! Everything here is plain serde data. Observations are always flat `f64`
//! sequences; the shape needed to reconstruct them is carried by
//! [`ObservationSpaceInfo`]. Non-finite floats in observations and rewards
//! travel as strings, see [`float`].

pub mod action;
pub mod float;
pub mod requests;
pub mod responses;

pub use action::Action;
pub use requests::{CreateEnvironmentRequest, ResetRequest, StepRequest};
pub use responses::{
    ActionSpaceInfo, DeleteResponse, EnvironmentInfo, ObservationSpaceInfo, ResetResponse,
    SessionList, SessionState, SessionSummary, StepResponse, TaskList,
};

/// JSON object used for task parameters and `info` payloads.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
