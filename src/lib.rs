//! Learnloop is the decision core of a chat/knowledge-management front end:
//! it routes each user query to a direct answer or a tool-assisted learning
//! loop, and reconstructs live tool progress from the conversation log.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`classifier`] decides SIMPLE vs COMPLEX for a query via a heuristic
//!   pre-filter, a model classification, and a safety-net re-check, with a
//!   deterministic fallback when the model stage fails.
//! - [`tools`] tracks each tool invocation's lifecycle and rebuilds that
//!   state by replaying tool-status events embedded in the message log.
//! - [`orchestrator`] owns per-turn state and glues the two together for the
//!   surrounding application.
//! - [`api`] defines the chat-completion payloads used by the HTTP invoker.
//! - [`core`] holds the message model, configuration, and shared constants.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`cli::run`].

pub mod api;
pub mod classifier;
pub mod cli;
pub mod core;
pub mod orchestrator;
pub mod tools;
