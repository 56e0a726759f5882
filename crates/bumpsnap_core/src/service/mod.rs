//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate state mutation and persistence into use-case level APIs.
//! - Keep host/UI layers decoupled from storage details.

pub mod setup_flow;
pub mod tracker;
