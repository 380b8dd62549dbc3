//! Dialogue engine: local-match vs remote-fallback orchestration.
//!
//! Each user message is first matched against the knowledge base; a
//! confident match answers locally and leaves conversation history alone.
//! Anything else goes to the fallback model with the accumulated history,
//! after which the caller may run a teach-back and persist the new pair.
//!
//! The conversation history is an explicit, engine-owned value handed to the
//! model on every call, never state hidden inside the client. One uniform
//! turn shape is used for both sending and appending.

use crate::knowledge::{KnowledgeBase, KnowledgeStore, StoreError};
use crate::matcher;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One role-tagged turn of the fallback conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Opaque error from a fallback model call.
#[derive(Debug)]
pub struct FallbackError(Box<dyn std::error::Error + Send + Sync>);

impl FallbackError {
    pub fn new(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(source.into())
    }
}

impl fmt::Display for FallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fallback model error: {}", self.0)
    }
}

impl std::error::Error for FallbackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}

/// Remote generative model consulted when no local answer is confident
/// enough. One blocking call per fallback turn; history grows monotonically
/// only when this path is taken.
#[async_trait::async_trait]
pub trait FallbackModel: Send + Sync {
    async fn generate(
        &self,
        history: &[ConversationTurn],
        message: &str,
    ) -> Result<String, FallbackError>;
}

/// Result of handling one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Answered from the knowledge base.
    Local { question: String, answer: String },
    /// Answered by the fallback model; the caller should offer teach-back.
    Fallback { reply: String },
    /// The fallback model failed; `reply` is an apology turn. No teach-back.
    Unavailable { reply: String },
    /// The exit token was received; the session is over.
    Exit,
}

const UNAVAILABLE_REPLY: &str =
    "Sorry, I can't reach my answer service right now. Please try again in a moment.";

/// Orchestrates one session: owns the knowledge base, the conversation
/// history, and the fallback model.
pub struct DialogueEngine<M> {
    store: KnowledgeStore,
    base: KnowledgeBase,
    history: Vec<ConversationTurn>,
    threshold: f64,
    exit_token: String,
    model: M,
}

impl<M: FallbackModel> DialogueEngine<M> {
    pub fn new(
        store: KnowledgeStore,
        base: KnowledgeBase,
        model: M,
        threshold: f64,
        exit_token: impl Into<String>,
    ) -> Self {
        Self {
            store,
            base,
            history: Vec::new(),
            threshold,
            exit_token: exit_token.into(),
            model,
        }
    }

    /// Loads the knowledge base from the store and builds an engine around
    /// it. A malformed or missing store is fatal here.
    pub fn open(
        store: KnowledgeStore,
        model: M,
        threshold: f64,
        exit_token: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let base = store.load()?;
        Ok(Self::new(store, base, model, threshold, exit_token))
    }

    pub fn base(&self) -> &KnowledgeBase {
        &self.base
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    /// Handles one user message. The exit token is recognized before
    /// anything else and never reaches the fallback model. Fallback failures
    /// are recoverable: they surface as an apology turn and leave history
    /// untouched.
    pub async fn handle(&mut self, input: &str) -> TurnOutcome {
        let input = input.trim();
        if input.eq_ignore_ascii_case(&self.exit_token) {
            return TurnOutcome::Exit;
        }

        if let Some(question) = matcher::best_match(input, self.base.questions(), self.threshold) {
            let question = question.to_string();
            // Second pass over the full base by exact equality, so duplicate
            // questions resolve to the first-listed answer.
            if let Some(answer) = self.base.answer_for(&question) {
                tracing::info!(
                    target: "campus::dialogue",
                    matched = %question,
                    "answered from knowledge base"
                );
                return TurnOutcome::Local {
                    answer: answer.to_string(),
                    question,
                };
            }
        }

        match self.model.generate(&self.history, input).await {
            Ok(reply) => {
                self.history.push(ConversationTurn::user(input));
                self.history.push(ConversationTurn::model(reply.clone()));
                tracing::info!(
                    target: "campus::dialogue",
                    history_turns = self.history.len(),
                    "answered by fallback model"
                );
                TurnOutcome::Fallback { reply }
            }
            Err(e) => {
                tracing::warn!(
                    target: "campus::dialogue",
                    error = %e,
                    "fallback model unavailable"
                );
                TurnOutcome::Unavailable {
                    reply: UNAVAILABLE_REPLY.to_string(),
                }
            }
        }
    }

    /// Records a taught answer for `question` and flushes the whole base to
    /// the store immediately. On a write error the in-memory entry is kept
    /// (the session keeps using it) and the error is returned so the caller
    /// can warn the user; the file and memory may then disagree until the
    /// next successful save.
    pub fn teach(&mut self, question: &str, answer: &str) -> Result<(), StoreError> {
        self.base.append(question, answer)?;
        self.store.save(&self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeEntry;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Fallback double: counts calls, replies with a fixed string or fails.
    struct ScriptedModel {
        reply: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    reply: Some(reply.to_string()),
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }

        fn failing() -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    reply: None,
                    calls: Arc::clone(&calls),
                },
                calls,
            )
        }
    }

    #[async_trait::async_trait]
    impl FallbackModel for ScriptedModel {
        async fn generate(
            &self,
            _history: &[ConversationTurn],
            _message: &str,
        ) -> Result<String, FallbackError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(reply) => Ok(reply.clone()),
                None => Err(FallbackError::new("simulated outage")),
            }
        }
    }

    fn seeded_engine(
        dir: &tempfile::TempDir,
        entries: &[(&str, &str)],
        model: ScriptedModel,
    ) -> DialogueEngine<ScriptedModel> {
        let store = KnowledgeStore::new(dir.path().join("kb.json"));
        let mut base = KnowledgeBase::default();
        for (q, a) in entries {
            base.append(*q, *a).unwrap();
        }
        store.save(&base).unwrap();
        DialogueEngine::open(store, model, 0.6, "exit").unwrap()
    }

    #[tokio::test]
    async fn close_variant_resolves_locally_without_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let (model, calls) = ScriptedModel::replying("unused");
        let mut engine =
            seeded_engine(&dir, &[("When is spring break?", "March 10-14")], model);

        let outcome = engine.handle("when is spring break").await;
        assert_eq!(
            outcome,
            TurnOutcome::Local {
                question: "When is spring break?".to_string(),
                answer: "March 10-14".to_string(),
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(engine.history().is_empty());
    }

    #[tokio::test]
    async fn unmatched_input_takes_fallback_and_grows_history() {
        let dir = tempfile::tempdir().unwrap();
        let (model, calls) = ScriptedModel::replying("They vary by term.");
        let mut engine =
            seeded_engine(&dir, &[("When is spring break?", "March 10-14")], model);

        let outcome = engine.handle("What are the gym opening times?").await;
        assert_eq!(
            outcome,
            TurnOutcome::Fallback {
                reply: "They vary by term.".to_string()
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            engine.history(),
            &[
                ConversationTurn::user("What are the gym opening times?"),
                ConversationTurn::model("They vary by term."),
            ]
        );
    }

    #[tokio::test]
    async fn teach_back_persists_and_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let (model, _) = ScriptedModel::replying("Usually 9 to 9, check the website.");
        let mut engine = seeded_engine(&dir, &[], model);

        let outcome = engine.handle("What are the library hours?").await;
        assert!(matches!(outcome, TurnOutcome::Fallback { .. }));

        engine
            .teach("What are the library hours?", "9am-9pm Mon-Fri")
            .unwrap();
        assert_eq!(engine.base().len(), 1);

        let reloaded = KnowledgeStore::new(dir.path().join("kb.json")).load().unwrap();
        assert_eq!(
            reloaded.questions,
            vec![KnowledgeEntry {
                question: "What are the library hours?".to_string(),
                answer: "9am-9pm Mon-Fri".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn exit_token_never_reaches_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let (model, calls) = ScriptedModel::replying("unused");
        let mut engine = seeded_engine(&dir, &[], model);

        assert_eq!(engine.handle("exit").await, TurnOutcome::Exit);
        assert_eq!(engine.handle("  EXIT  ").await, TurnOutcome::Exit);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(engine.history().is_empty());
    }

    #[tokio::test]
    async fn fallback_failure_is_a_recoverable_apology_turn() {
        let dir = tempfile::tempdir().unwrap();
        let (model, calls) = ScriptedModel::failing();
        let mut engine = seeded_engine(&dir, &[], model);

        let outcome = engine.handle("Is the cafeteria open on Sunday?").await;
        match outcome {
            TurnOutcome::Unavailable { reply } => assert!(!reply.is_empty()),
            other => panic!("expected Unavailable, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(engine.history().is_empty());

        // The session keeps going: the next message still gets handled.
        let again = engine.handle("Is the cafeteria open on Sunday?").await;
        assert!(matches!(again, TurnOutcome::Unavailable { .. }));
    }

    #[tokio::test]
    async fn duplicate_questions_answer_with_first_entry() {
        let dir = tempfile::tempdir().unwrap();
        let (model, _) = ScriptedModel::replying("unused");
        let mut engine = seeded_engine(
            &dir,
            &[
                ("Where is the registrar?", "Main hall, desk 3"),
                ("Where is the registrar?", "Building B"),
            ],
            model,
        );

        let outcome = engine.handle("Where is the registrar?").await;
        assert_eq!(
            outcome,
            TurnOutcome::Local {
                question: "Where is the registrar?".to_string(),
                answer: "Main hall, desk 3".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn teach_rejects_empty_question_without_mutating() {
        let dir = tempfile::tempdir().unwrap();
        let (model, _) = ScriptedModel::replying("unused");
        let mut engine = seeded_engine(&dir, &[], model);

        match engine.teach("  ", "answer") {
            Err(StoreError::EmptyQuestion) => {}
            other => panic!("expected EmptyQuestion, got {other:?}"),
        }
        assert!(engine.base().is_empty());
    }
}
