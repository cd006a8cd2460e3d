//! Conversation domain entities

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a turn in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a wire role name. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single turn in a conversation (Entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A conversation turn as received from a caller, before validation.
///
/// Both fields are loosely typed so that a malformed entry can be dropped
/// instead of failing the whole request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTurn {
    pub role: Option<Value>,
    pub content: Option<Value>,
}

impl RawTurn {
    /// Validate into a [`ConversationTurn`]: a known role and non-empty
    /// string content are both required.
    pub fn validate(&self) -> Option<ConversationTurn> {
        let role = self.role.as_ref()?.as_str().and_then(Role::parse)?;
        let content = self.content.as_ref()?.as_str()?;
        if content.trim().is_empty() {
            return None;
        }
        Some(ConversationTurn {
            role,
            content: content.to_string(),
        })
    }
}

/// Ordered, validated sequence of conversation turns.
///
/// Constructed once at the transport boundary; every turn it holds has a
/// known role and non-empty content. Turns are only ever appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<RawTurn>", into = "Vec<ConversationTurn>")]
pub struct Transcript {
    turns: Vec<ConversationTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a transcript from caller-supplied turns, dropping invalid ones.
    pub fn from_raw(raw: impl IntoIterator<Item = RawTurn>) -> Self {
        Self {
            turns: raw.into_iter().filter_map(|t| t.validate()).collect(),
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// An empty transcript marks a new session.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// The first turn authored by the user, if any.
    pub fn first_user(&self) -> Option<&ConversationTurn> {
        self.turns.iter().find(|t| t.role == Role::User)
    }

    /// Turns other than system prompts, in order.
    pub fn non_system(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter().filter(|t| t.role != Role::System)
    }

    /// Copy of this transcript with one user/assistant exchange appended.
    pub fn with_exchange(&self, user: impl Into<String>, assistant: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.push(ConversationTurn::user(user));
        next.push(ConversationTurn::assistant(assistant));
        next
    }
}

impl From<Vec<RawTurn>> for Transcript {
    fn from(raw: Vec<RawTurn>) -> Self {
        Transcript::from_raw(raw)
    }
}

impl From<Vec<ConversationTurn>> for Transcript {
    fn from(turns: Vec<ConversationTurn>) -> Self {
        Self {
            turns: turns
                .into_iter()
                .filter(|t| !t.content.trim().is_empty())
                .collect(),
        }
    }
}

impl From<Transcript> for Vec<ConversationTurn> {
    fn from(transcript: Transcript) -> Self {
        transcript.turns
    }
}
