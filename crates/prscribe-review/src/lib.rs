//! Pull request review pipeline for prscribe.
//!
//! Provides the outbound gateways (GitHub, inference backend), prompt
//! construction from templates, and the orchestrator that sequences them.

pub mod github;
pub mod llm;
pub mod pipeline;
pub mod prompt;
mod upstream;
