//! # Promptwright Core
//!
//! Domain types, traits, and error definitions for the Promptwright
//! prompt-engineering assistant. This crate has **zero framework dependencies**:
//! it defines the conversation model that every other crate builds on.
//!
//! ## Design Philosophy
//!
//! The two external collaborators (the completion provider and the session
//! store) are traits here. Implementations live in their own crates, so the
//! orchestrator can be tested against scripted providers and a plain
//! in-process session without any network or HTTP layer.

pub mod error;
pub mod message;
pub mod provider;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, SessionError};
pub use message::{Role, Transcript, Turn};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use session::{ConversationState, Session, SessionHandle, SessionId, SessionLease, SessionStore};
