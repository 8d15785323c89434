//! Session Management
//!
//! A session is one conversation thread plus bookkeeping. Nothing is
//! persisted implicitly; `save_to`/`load_from` are there for applications
//! that want to resume a thread later.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::message::{Conversation, Role};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
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

/// Session metadata
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Session title (auto-generated or user-set)
    pub title: Option<String>,

    /// Model used for this session
    pub model: Option<String>,

    /// Custom tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One conversation thread
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Conversation history
    pub conversation: Conversation,

    /// Session metadata
    pub metadata: SessionMetadata,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session
    pub fn new() -> Self {
        Self::with_conversation(Conversation::new())
    }

    /// Wrap an existing conversation
    pub fn with_conversation(conversation: Conversation) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            conversation,
            metadata: SessionMetadata::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Set session title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.metadata.title = Some(title.into());
        self.touch();
    }

    /// Get or generate title
    pub fn title(&self) -> String {
        self.metadata.title.clone().unwrap_or_else(|| {
            // Generate from first user message
            self.conversation
                .messages()
                .iter()
                .find(|m| m.role == Role::User)
                .map(|m| {
                    let preview: String = m.content.chars().take(50).collect();
                    if m.content.chars().count() > 50 {
                        format!("{preview}...")
                    } else {
                        preview
                    }
                })
                .unwrap_or_else(|| format!("Session {}", &self.id.0[..8]))
        })
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }

    /// Write the session as pretty JSON
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        tracing::debug!(session = %self.id, path = %path.as_ref().display(), "session saved");
        Ok(())
    }

    /// Read a session written by `save_to`
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    #[test]
    fn test_session_creation() {
        let session = Session::new();
        assert_eq!(session.message_count(), 0);
        assert!(session.title().starts_with("Session "));
    }

    #[test]
    fn test_title_from_first_user_message() {
        let mut session = Session::with_conversation(Conversation::with_system_prompt("sys"));
        session
            .conversation
            .push(Message::user("Plan me a day trip somewhere warm with good food and beaches please"));
        let title = session.title();
        assert!(title.ends_with("..."));
        assert_eq!(title.chars().count(), 53);

        session.set_title("Beach trip");
        assert_eq!(session.title(), "Beach trip");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut session = Session::with_conversation(Conversation::with_system_prompt("sys"));
        session.conversation.push(Message::user("Hi"));
        session.conversation.push(Message::assistant("Hello!"));
        session.save_to(&path).unwrap();

        let loaded = Session::load_from(&path).unwrap();
        assert_eq!(loaded.id, session.id);
        let contents: Vec<_> = loaded
            .conversation
            .messages()
            .iter()
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(contents, vec!["sys", "Hi", "Hello!"]);
    }
}
