//! The clarify → summarize → finalize state machine.

use crate::instructions::{CLARIFYING_INSTRUCTION, SUMMARY_INSTRUCTION, final_instruction};
use promptwright_config::FailurePolicy;
use promptwright_core::error::ProviderError;
use promptwright_core::message::Turn;
use promptwright_core::provider::{Provider, ProviderRequest};
use promptwright_core::session::{ConversationState, Session};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// What a successful turn produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TurnOutcome {
    /// The assistant's clarifying questions.
    Clarification { response: String },
    /// The summary/persona block and the answer written in that persona.
    Finalized {
        summary: String,
        final_response: String,
    },
}

/// Why a turn failed.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("prompt is empty")]
    InvalidInput,

    #[error("completion call failed: {0}")]
    ApiCallFailed(#[source] ProviderError),

    #[error("summary generation failed: {0}")]
    SummaryGenerationFailed(#[source] ProviderError),

    #[error("final response generation failed: {0}")]
    FinalResponseGenerationFailed(#[source] ProviderError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// The message shown to clients. Never includes upstream details.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidInput => "No prompt provided",
            Self::ApiCallFailed(_) => "API call failed",
            Self::SummaryGenerationFailed(_) => "Summary generation failed",
            Self::FinalResponseGenerationFailed(_) => "Final response generation failed",
            Self::Internal(_) => "An error occurred",
        }
    }

    /// Whether the caller is at fault (as opposed to an upstream or internal failure).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput)
    }
}

/// Drives one session's conversation through the clarify/finalize protocol.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    failure_policy: FailurePolicy,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: None,
            max_tokens: None,
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Build an orchestrator with the model, sampling and failure settings from `config`.
    pub fn from_config(provider: Arc<dyn Provider>, config: &promptwright_config::AppConfig) -> Self {
        let orchestrator = Self::new(provider, &config.default_model)
            .with_max_tokens(config.max_tokens)
            .with_failure_policy(config.session.failure_policy);
        match config.temperature {
            Some(temperature) => orchestrator.with_temperature(temperature),
            None => orchestrator,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the output-length cap per completion call.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Ask the provider whether it can take requests. Errors count as unreachable.
    pub async fn provider_reachable(&self) -> bool {
        match self.provider.health_check().await {
            Ok(reachable) => reachable,
            Err(e) => {
                warn!(provider = %self.provider.name(), error = %e, "Provider health check failed");
                false
            }
        }
    }

    /// Handle one user prompt against `session`.
    ///
    /// An empty prompt is rejected before the transcript is touched. Otherwise
    /// the prompt is appended, the conversation state is decided from the
    /// transcript, and the matching branch runs.
    pub async fn handle_turn(
        &self,
        session: &mut Session,
        user_text: &str,
    ) -> Result<TurnOutcome, OrchestratorError> {
        if user_text.is_empty() {
            return Err(OrchestratorError::InvalidInput);
        }

        session.transcript.push(Turn::user(user_text));
        session.touch();
        let state = session.refresh_state();

        info!(
            session = %session.id,
            state = %state,
            turns = session.transcript.len(),
            prompt_len = user_text.len(),
            "Received prompt"
        );

        match state {
            ConversationState::AwaitingDetails => self.collect_details(session).await,
            ConversationState::ReadyToFinalize => self.finalize(session).await,
        }
    }

    /// State A: ask for the most important missing details.
    async fn collect_details(&self, session: &mut Session) -> Result<TurnOutcome, OrchestratorError> {
        // The instruction only exists in this request; the transcript never sees it.
        let messages = session
            .transcript
            .with_leading(Turn::system(CLARIFYING_INSTRUCTION));

        let response = self
            .complete(messages)
            .await
            .map_err(OrchestratorError::ApiCallFailed)?;

        session.transcript.push(Turn::assistant(&response));
        session.touch();
        info!(session = %session.id, response_len = response.len(), "Clarifying questions generated");

        Ok(TurnOutcome::Clarification { response })
    }

    /// State B: answer the clarification, then summarize and finalize.
    async fn finalize(&self, session: &mut Session) -> Result<TurnOutcome, OrchestratorError> {
        let clarification = self
            .complete(session.transcript.to_vec())
            .await
            .map_err(OrchestratorError::ApiCallFailed)?;
        session.transcript.push(Turn::assistant(&clarification));
        session.touch();

        let checkpoint = session.transcript.len();

        let result = self.summarize_and_answer(session).await;
        if result.is_err() && self.failure_policy == FailurePolicy::Rewind {
            let dropped = session.transcript.len() - checkpoint;
            session.transcript.truncate(checkpoint);
            debug!(session = %session.id, dropped, "Rewound failed finalization");
        }
        session.touch();
        result
    }

    async fn summarize_and_answer(
        &self,
        session: &mut Session,
    ) -> Result<TurnOutcome, OrchestratorError> {
        session.transcript.push(Turn::system(SUMMARY_INSTRUCTION));
        let summary = self
            .complete(session.transcript.to_vec())
            .await
            .map_err(OrchestratorError::SummaryGenerationFailed)?;
        info!(session = %session.id, summary_len = summary.len(), "Summary generated");

        session.transcript.push(Turn::assistant(&summary));
        session.transcript.push(Turn::system(final_instruction(&summary)));
        let final_response = self
            .complete(session.transcript.to_vec())
            .await
            .map_err(OrchestratorError::FinalResponseGenerationFailed)?;
        info!(
            session = %session.id,
            final_len = final_response.len(),
            "Final response generated"
        );

        Ok(TurnOutcome::Finalized {
            summary,
            final_response,
        })
    }

    async fn complete(&self, messages: Vec<Turn>) -> Result<String, ProviderError> {
        debug!(
            provider = %self.provider.name(),
            messages = ?messages,
            "Messages sent to provider"
        );

        let mut request = ProviderRequest::new(&self.model, messages);
        if let Some(temperature) = self.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        match self.provider.complete(request).await {
            Ok(response) => {
                let content = response.content.trim();
                if content.is_empty() {
                    warn!(provider = %self.provider.name(), "Provider returned empty content");
                    Err(ProviderError::EmptyResponse)
                } else {
                    Ok(content.to_string())
                }
            }
            Err(e) => {
                warn!(provider = %self.provider.name(), error = %e, "API call failed");
                Err(e)
            }
        }
    }
}
