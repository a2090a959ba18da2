//! Session domain model and the store abstraction.
//!
//! A session owns exactly one transcript plus the conversation state derived
//! from it. Stores hand sessions out behind an async mutex so that requests
//! for the same client are serialized end to end.

use crate::error::SessionError;
use crate::message::{Role, Transcript};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Opaque identifier for a client session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse a client-supplied id. Only canonical UUIDs are accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim())
            .ok()
            .map(|uuid| Self(uuid.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a conversation stands, derived from the transcript's role sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// The assistant has not yet asked a follow-up the user is answering.
    #[default]
    AwaitingDetails,
    /// The user has just answered a clarifying follow-up.
    ReadyToFinalize,
}

impl ConversationState {
    /// Decide the state for a transcript whose last turn is the new user prompt.
    ///
    /// Pure function of the length and the role of the second-to-last turn.
    pub fn derive(transcript: &Transcript) -> Self {
        match transcript.second_to_last_role() {
            Some(Role::Assistant) => Self::ReadyToFinalize,
            _ => Self::AwaitingDetails,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingDetails => "awaiting_details",
            Self::ReadyToFinalize => "ready_to_finalize",
        }
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One client's conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,

    pub transcript: Transcript,

    /// State decided for the most recent request
    pub state: ConversationState,

    pub created_at: DateTime<Utc>,

    /// When the transcript was last touched
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            transcript: Transcript::new(),
            state: ConversationState::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Recompute and record the state from the current transcript.
    pub fn refresh_state(&mut self) -> ConversationState {
        self.state = ConversationState::derive(&self.transcript);
        self.state
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A session shared between the store and the request currently holding it.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Result of resolving a client's session.
#[derive(Debug, Clone)]
pub struct SessionLease {
    pub id: SessionId,
    pub handle: SessionHandle,
    /// True when the store had to start a fresh session (new or unknown id).
    pub created: bool,
}

/// Session storage keyed by client identity.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// Look up `id`, or start a new session when it is absent or unknown.
    async fn get_or_create(&self, id: Option<&SessionId>) -> Result<SessionLease, SessionError>;

    /// Look up an existing session.
    async fn get(&self, id: &SessionId) -> Result<Option<SessionHandle>, SessionError>;

    /// Drop a session. Returns whether it existed.
    async fn remove(&self, id: &SessionId) -> Result<bool, SessionError>;

    /// Number of live sessions.
    async fn count(&self) -> Result<usize, SessionError>;

    /// Evict expired sessions. Returns how many were removed.
    async fn purge_expired(&self) -> Result<usize, SessionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Turn;

    #[test]
    fn session_id_parse_accepts_uuid() {
        let id = SessionId::new();
        assert_eq!(SessionId::parse(id.as_str()), Some(id));
    }

    #[test]
    fn session_id_parse_rejects_garbage() {
        assert!(SessionId::parse("not-a-session").is_none());
        assert!(SessionId::parse("").is_none());
    }

    #[test]
    fn fresh_transcript_awaits_details() {
        let transcript: Transcript = vec![Turn::user("Build me a website")].into();
        assert_eq!(
            ConversationState::derive(&transcript),
            ConversationState::AwaitingDetails
        );
    }

    #[test]
    fn answer_to_follow_up_is_ready_to_finalize() {
        let transcript: Transcript = vec![
            Turn::user("Build me a website"),
            Turn::assistant("What is it for?"),
            Turn::user("A bakery"),
        ]
        .into();
        assert_eq!(
            ConversationState::derive(&transcript),
            ConversationState::ReadyToFinalize
        );
    }

    #[test]
    fn state_only_looks_at_second_to_last_role() {
        for (roles, expected) in [
            (vec![Role::User, Role::User], ConversationState::AwaitingDetails),
            (vec![Role::System, Role::User], ConversationState::AwaitingDetails),
            (vec![Role::Assistant, Role::User], ConversationState::ReadyToFinalize),
            (
                vec![Role::User, Role::Assistant, Role::System, Role::User],
                ConversationState::AwaitingDetails,
            ),
            (
                vec![Role::System, Role::User, Role::Assistant, Role::User],
                ConversationState::ReadyToFinalize,
            ),
        ] {
            let transcript: Transcript = roles
                .into_iter()
                .map(|role| Turn::new(role, "x"))
                .collect::<Vec<_>>()
                .into();
            assert_eq!(ConversationState::derive(&transcript), expected);
        }
    }

    #[test]
    fn refresh_state_records_decision() {
        let mut session = Session::new(SessionId::new());
        session.transcript.push(Turn::user("hi"));
        session.transcript.push(Turn::assistant("details?"));
        session.transcript.push(Turn::user("here"));
        assert_eq!(session.refresh_state(), ConversationState::ReadyToFinalize);
        assert_eq!(session.state, ConversationState::ReadyToFinalize);
    }
}
