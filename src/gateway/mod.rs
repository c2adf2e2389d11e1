//! Gateway implementations

mod builder;
mod proxy;

pub use builder::{Huginn, HuginnBuilder};
pub use proxy::{InboundRequest, Outcome, RenderProxy};
