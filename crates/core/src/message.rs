//! Turn and Transcript domain types.
//!
//! A transcript is the ordered chat history of one session:
//! User sends a prompt → Orchestrator appends it → Provider generates the next turn.

use serde::{Deserialize, Serialize};

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// One-shot steering instructions
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create a new system turn.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// The ordered history of turns for one session.
///
/// Append-only from the outside: the only way to shrink it is
/// [`Transcript::truncate`], which the orchestrator uses to rewind a failed
/// finalization. Temporary instructions are never inserted; callers build a
/// separate request list with [`Transcript::with_leading`] instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    /// Create a new empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Role of the turn just before the last one, if the transcript has at least two.
    pub fn second_to_last_role(&self) -> Option<Role> {
        self.turns
            .len()
            .checked_sub(2)
            .map(|idx| self.turns[idx].role)
    }

    /// Drop every turn at or after `len`.
    pub fn truncate(&mut self, len: usize) {
        self.turns.truncate(len);
    }

    /// The full history as a request payload.
    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    /// The history with `turn` placed at position 0, leaving `self` untouched.
    pub fn with_leading(&self, turn: Turn) -> Vec<Turn> {
        let mut turns = Vec::with_capacity(self.turns.len() + 1);
        turns.push(turn);
        turns.extend(self.turns.iter().cloned());
        turns
    }

    /// Whether any persisted turn carries exactly this content.
    pub fn contains_content(&self, content: &str) -> bool {
        self.turns.iter().any(|t| t.content == content)
    }
}

impl From<Vec<Turn>> for Transcript {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}
