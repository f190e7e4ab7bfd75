//! Session Orchestration
//!
//! Runs one controller per interactive session and tracks live sessions
//! for the health endpoint.

mod controller;
mod registry;

pub use controller::{
    Frame, HostInput, SessionConfig, SessionController, SessionExit, SessionHandle,
};
pub use registry::{RegistryStats, SessionId, SessionInfo, SessionRegistry};
