pub mod json_repair;
pub mod pricing;
pub mod providers;
pub mod roles;
mod runner;

pub use providers::{build_provider, Completion, LocalEchoProvider, Provider, TokenUsage};
pub use runner::{AgentMetadata, AgentRole, AgentRun, AgentRunner};
