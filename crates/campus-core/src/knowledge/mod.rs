//! File-backed question/answer knowledge base.
//!
//! The store holds an ordered sequence of question/answer pairs in a single
//! JSON document with one top-level `questions` collection. It is loaded
//! once at session start, mutated in memory, and flushed back in full on
//! every successful teach-back event.

mod store;

pub use store::{KnowledgeBase, KnowledgeEntry, KnowledgeStore, StoreError};
