//! Conversation runtime and hosted-agent forwarding for the structure agent.
//!
//! - `confirmation` and `conversation` implement the classifier and extractor
//!   seams the core dialogue engine is generic over.
//! - `runtime` keeps per-session dialogue state and applies turns.
//! - `llm`, `remote` and `reply` forward a prompt to the hosted agents service,
//!   poll the run and inspect the relayed reply.
//!
//! The dialogue itself is deterministic: pattern tables and regular
//! expressions decide every transition, never a model.

pub mod confirmation;
pub mod conversation;
pub mod instructions;
pub mod llm;
pub mod remote;
pub mod reply;
pub mod runtime;
