//! Chat-completion provider implementations for Promptwright.
//!
//! All providers implement the `promptwright_core::Provider` trait.
//! [`build_from_config`] assembles the provider the gateway and CLI use.

pub mod openai_compat;
pub mod resilient;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use resilient::{ResilientProvider, RetryPolicy};
pub use router::build_from_config;
