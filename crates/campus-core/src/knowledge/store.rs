//! JSON-backed knowledge store.
//!
//! Persistent format: `{ "questions": [ { "question": ..., "answer": ... } ] }`.
//! Saving replaces the whole file (not atomic; a crash mid-write can corrupt
//! the store). Entry order is preserved across load/save, and duplicate
//! questions are allowed: lookups resolve to the first entry in insertion
//! order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// One question/answer pair. Immutable once created; corrections are made by
/// appending a new entry, never by editing in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub question: String,
    pub answer: String,
}

/// Ordered sequence of knowledge entries. Invariant: no entry has an empty
/// question string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub questions: Vec<KnowledgeEntry>,
}

impl KnowledgeBase {
    /// Question strings in insertion order.
    pub fn questions(&self) -> impl Iterator<Item = &str> {
        self.questions.iter().map(|e| e.question.as_str())
    }

    /// First answer whose question equals `question` exactly. Duplicate
    /// questions with different answers resolve to the first-listed one.
    pub fn answer_for(&self, question: &str) -> Option<&str> {
        self.questions
            .iter()
            .find(|e| e.question == question)
            .map(|e| e.answer.as_str())
    }

    /// Appends a new entry to the end of the sequence. Does not deduplicate.
    pub fn append(
        &mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<(), StoreError> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(StoreError::EmptyQuestion);
        }
        self.questions.push(KnowledgeEntry {
            question,
            answer: answer.into(),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Errors from loading or saving the knowledge base.
#[derive(Debug)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    Io(std::io::Error),
    /// The backing file is not a valid knowledge base document.
    Malformed(String),
    /// Rejected append: entries must have a non-empty question.
    EmptyQuestion,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "knowledge store I/O error: {e}"),
            StoreError::Malformed(detail) => {
                write!(f, "knowledge store is not a valid question/answer document: {detail}")
            }
            StoreError::EmptyQuestion => {
                write!(f, "knowledge entries must have a non-empty question")
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Malformed(e.to_string())
    }
}

/// Handle to the knowledge base file.
pub struct KnowledgeStore {
    path: PathBuf,
}

impl KnowledgeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses the backing file into a [`KnowledgeBase`]. A missing file,
    /// invalid JSON, a missing `questions` collection, or an entry with an
    /// empty question all fail here; callers should treat this as fatal at
    /// startup rather than silently starting with an empty base.
    pub fn load(&self) -> Result<KnowledgeBase, StoreError> {
        let raw = fs::read_to_string(&self.path)?;
        let base: KnowledgeBase = serde_json::from_str(&raw)?;
        if base.questions.iter().any(|e| e.question.trim().is_empty()) {
            return Err(StoreError::Malformed(
                "entry with empty question".to_string(),
            ));
        }
        tracing::info!(
            target: "campus::knowledge",
            path = %self.path.display(),
            entries = base.len(),
            "knowledge base loaded"
        );
        Ok(base)
    }

    /// Serializes the full base back to the file, overwriting prior content.
    /// Output is deterministic: saving the same base twice produces
    /// byte-identical files.
    pub fn save(&self, base: &KnowledgeBase) -> Result<(), StoreError> {
        let mut body = serde_json::to_string_pretty(base)?;
        body.push('\n');
        fs::write(&self.path, body)?;
        tracing::info!(
            target: "campus::knowledge",
            path = %self.path.display(),
            entries = base.len(),
            "knowledge base saved"
        );
        Ok(())
    }
}
