//! Advisory responder strategies.
//!
//! The [`AdvisoryResponder`] trait maps a conversation to one advisory
//! string. Two implementations exist, chosen once at startup from the
//! `[responder]` config section — never by branching on request data:
//! keyword-routed canned advice ([`rules`]) or a Gemini-style generative
//! call ([`generative`]).

pub mod generative;
pub mod rules;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ResponderConfig;
use crate::error::ApiResult;

/// One role/content pair in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Produces advisory text from an ordered conversation.
///
/// `system` overrides the implementation's default persona instruction where
/// one applies; the rule-based strategy ignores it.
#[async_trait]
pub trait AdvisoryResponder: Send + Sync {
    async fn respond(&self, turns: &[ChatTurn], system: Option<&str>) -> ApiResult<String>;
}

/// Create a responder from config.
///
/// `"rules"` needs nothing; `"generative"` requires an API key (usually via
/// `GEMINI_API_KEY`) and fails fast at startup without one.
pub fn create_responder(config: &ResponderConfig) -> anyhow::Result<Box<dyn AdvisoryResponder>> {
    match config.provider.as_str() {
        "rules" => Ok(Box::new(rules::RuleBasedResponder)),
        "generative" => {
            let responder = generative::GenerativeResponder::new(config)?;
            Ok(Box::new(responder))
        }
        other => anyhow::bail!("unknown responder provider: {other}. Supported: rules, generative"),
    }
}

/// The latest user-authored message, falling back to the last turn of any
/// role. Both strategies anchor on this.
pub(crate) fn latest_user_message(turns: &[ChatTurn]) -> Option<&str> {
    turns
        .iter()
        .rev()
        .find(|t| t.role == "user")
        .or_else(|| turns.last())
        .map(|t| t.content.as_str())
}
