//! The Promptwright conversation orchestrator.
//!
//! Each prompt moves a session through one of two branches, chosen from the
//! role of the turn just before the new user turn:
//!
//! 1. **Collect details** when that turn is not an assistant reply: ask the
//!    model for the top three missing details.
//! 2. **Finalize** when it is: answer the clarification, summarize the
//!    requirements with a suggested persona, then produce the final response
//!    written in that persona.

pub mod instructions;
pub mod orchestrator;

#[cfg(test)]
mod test_helpers;

pub use instructions::{CLARIFYING_INSTRUCTION, SUMMARY_INSTRUCTION, final_instruction};
pub use orchestrator::{Orchestrator, OrchestratorError, TurnOutcome};
