//! Application wiring for the Vesper voice assistant.

pub mod orchestrator;

pub use orchestrator::{AudioSourceControl, Orchestrator, Phase, Speaker};
