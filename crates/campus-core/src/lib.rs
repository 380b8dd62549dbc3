//! campus-core: assistant core library.
//!
//! Holds the matching-and-fallback core of the Campus Companion assistant:
//! the file-backed question/answer knowledge base, the fuzzy matcher that
//! decides whether a user question can be answered locally, and the dialogue
//! engine that orchestrates local answers, remote fallback, and teach-back.
//!
//! The remote model itself lives behind the [`FallbackModel`] trait; see the
//! campus-llm crate for the Gemini-backed implementation.

mod dialogue;
mod knowledge;
pub mod matcher;
mod shared;

pub use dialogue::{
    ConversationTurn, DialogueEngine, FallbackError, FallbackModel, Role, TurnOutcome,
};
pub use knowledge::{KnowledgeBase, KnowledgeEntry, KnowledgeStore, StoreError};
pub use matcher::{best_match, similarity_ratio};
pub use shared::{CoreConfig, SessionContext};
