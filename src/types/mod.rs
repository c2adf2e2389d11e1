//! Public types for the Huginn API.

mod access;
mod job;
mod options;

pub use access::{AccessDecision, RequestContext};
pub use job::{PROBE_TIMEOUT_MS, PROBE_URL, RenderJob, RenderRequest};
pub use options::{
    DEFAULT_TIMEOUT_MS, DEFAULT_TIMEOUT_RAW, DEFAULT_WAIT_UNTIL, RenderOptions, WaitUntil,
    resolve,
};
