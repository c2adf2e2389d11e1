//! HTTP service mode.
//!
//! - `http`: the axum router exposing [`RenderProxy`](crate::RenderProxy)
//! - `config`: configuration and secrets loading for `huginnd`

pub mod config;
pub mod http;

pub use http::{HttpState, build_router};
