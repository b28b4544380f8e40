//! Gateway construction and request orchestration

mod builder;
mod orchestrator;

pub use builder::{GenerationDefaults, Muninn, MuninnBuilder};
pub use orchestrator::{GatewayStatus, QueryGateway};
