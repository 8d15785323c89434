//! User Preference Tool
//!
//! Remembers preferences the user states (budget, travel style, duration) so
//! later turns can honor them.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use turnloop_core::tool::{ParameterSchema, Tool, ToolArgs, ToolSchema};
use turnloop_core::Result as CoreResult;

/// Preference map shared between the tool and the application
#[derive(Clone, Debug, Default)]
pub struct Preferences {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, kind: impl Into<String>, value: impl Into<String>) {
        self.inner.write().await.insert(kind.into(), value.into());
    }

    pub async fn get(&self, kind: &str) -> Option<String> {
        self.inner.read().await.get(kind).cloned()
    }

    /// Copy of every saved preference
    pub async fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner.read().await.clone()
    }
}

/// Saves a user preference into a `Preferences` map
pub struct SavePreferenceTool {
    preferences: Preferences,
}

impl SavePreferenceTool {
    pub const fn new(preferences: Preferences) -> Self {
        Self { preferences }
    }
}

#[async_trait]
impl Tool for SavePreferenceTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            "save_user_preference",
            "Save a user preference for trip planning. Use when the user states a preference such as budget level \
             (budget/moderate/luxury), travel style (adventure/relaxation/cultural), or duration.",
        )
        .param(ParameterSchema::string(
            "preference_type",
            "The type of preference being saved, e.g. 'budget', 'style', 'duration'",
        ))
        .param(ParameterSchema::string("preference_value", "The value of the preference"))
    }

    async fn execute(&self, args: &ToolArgs) -> CoreResult<String> {
        let kind = args.str("preference_type")?;
        let value = args.str("preference_value")?;

        self.preferences.set(kind, value).await;
        tracing::info!(preference = kind, value, "preference saved");

        Ok(format!(
            "Preference saved: {kind} is now set to '{value}'. I'll remember this for future recommendations."
        ))
    }
}
