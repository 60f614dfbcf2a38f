//! Conversation state and reasoning.
//!
//! Owns the bounded dialogue history, interprets control phrases
//! before any remote call, and talks to the reasoning service through
//! the [`ReasoningClient`] seam. Remote failures surface as canned
//! fallback replies, never as errors to the orchestrator.

pub mod client;
pub mod directive;
pub mod engine;
pub mod history;

pub use client::{BrainError, HttpReasoningClient, ReasoningClient};
pub use directive::AssistantDirective;
pub use engine::{ConversationEngine, Exchange};
pub use history::{ConversationHistory, ConversationTurn, Role};
