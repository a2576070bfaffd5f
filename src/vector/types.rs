//! Vector collection vocabulary and entry types.

use serde::{Deserialize, Serialize};

/// The three independent vector collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// General health knowledge snippets.
    KnowledgeBase,
    /// Serialized conversation transcripts.
    Conversations,
    /// Serialized user profile documents.
    UserProfiles,
}

impl Collection {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KnowledgeBase => "knowledge_base",
            Self::Conversations => "conversations",
            Self::UserProfiles => "user_profiles",
        }
    }

    /// The vec0 virtual table holding this collection's embeddings.
    pub fn vec_table(&self) -> &'static str {
        match self {
            Self::KnowledgeBase => "vec_knowledge_base",
            Self::Conversations => "vec_conversations",
            Self::UserProfiles => "vec_user_profiles",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "knowledge_base" => Ok(Self::KnowledgeBase),
            "conversations" => Ok(Self::Conversations),
            "user_profiles" => Ok(Self::UserProfiles),
            _ => Err(format!("unknown collection: {s}")),
        }
    }
}

/// A stored entry, without its embedding.
#[derive(Debug, Clone, Serialize)]
pub struct VectorEntry {
    pub id: String,
    pub document: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// One nearest-neighbor result.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub document: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Cosine distance — 0.0 is identical, 2.0 is opposite.
    pub distance: f64,
}
