//! Gemini client: sends the conversation history plus a new user message to
//! a `generateContent` endpoint and returns the generated reply.
//!
//! All model/session configuration (generation parameters, safety
//! thresholds, system instruction) lives in an explicit configuration object
//! on the client, and the conversation history is caller-owned and passed on
//! every call; the client itself is stateless between calls.

use campus_core::{ConversationTurn, FallbackError, FallbackModel, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

const ENV_LLM_MODE: &str = "CAMPUS_LLM_MODE";
const ENV_LLM_API_KEY: &str = "CAMPUS_LLM_API_KEY";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL_NAME: &str = "gemini-2.0-flash";

/// Default persona for the assistant.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are a virtual assistant and customer service \
chatbot for university students, helping them answer their university questions from the comfort \
of their home. Help in a minimalistic manner and focus on academics. Use informative sentences \
and sound interesting.";

/// Mode for fallback invocation: mock (deterministic offline generation) or
/// live (calls the remote API).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LlmMode {
    #[default]
    Mock,
    Live,
}

impl LlmMode {
    pub fn from_env() -> Self {
        match std::env::var(ENV_LLM_MODE).as_deref() {
            Ok("live") => LlmMode::Live,
            _ => LlmMode::Mock,
        }
    }

    /// Parses a config string ("live"/"mock", any case). Unknown values fall
    /// back to mock so a typo never silently burns quota.
    pub fn from_config(mode: &str) -> Self {
        if mode.eq_ignore_ascii_case("live") {
            LlmMode::Live
        } else {
            LlmMode::Mock
        }
    }
}

/// Generation parameters sent with every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 2.0,
            top_p: 0.95,
            top_k: 64,
            max_output_tokens: 65536,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

/// Content-safety category recognized by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmCategory {
    HarmCategoryHarassment,
    HarmCategoryHateSpeech,
    HarmCategorySexuallyExplicit,
    HarmCategoryDangerousContent,
}

/// Blocking threshold for one safety category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

/// One per-category safety threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// All four categories at `BLOCK_MEDIUM_AND_ABOVE`.
pub fn default_safety_settings() -> Vec<SafetySetting> {
    [
        HarmCategory::HarmCategoryHarassment,
        HarmCategory::HarmCategoryHateSpeech,
        HarmCategory::HarmCategorySexuallyExplicit,
        HarmCategory::HarmCategoryDangerousContent,
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: HarmBlockThreshold::BlockMediumAndAbove,
    })
    .collect()
}

/// Errors from the live API path.
#[derive(Debug)]
pub enum LlmError {
    /// Live mode requires `CAMPUS_LLM_API_KEY` (or an explicit key).
    MissingApiKey,
    /// Transport-level failure.
    Http(reqwest::Error),
    /// Non-success HTTP status from the API.
    Api { status: u16, body: String },
    /// The API answered but produced no candidate text.
    EmptyResponse,
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::MissingApiKey => {
                write!(f, "no API key configured (set {ENV_LLM_API_KEY})")
            }
            LlmError::Http(e) => write!(f, "request to model API failed: {e}"),
            LlmError::Api { status, body } => {
                write!(f, "model API returned status {status}: {body}")
            }
            LlmError::EmptyResponse => write!(f, "model API returned no candidate text"),
        }
    }
}

impl std::error::Error for LlmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LlmError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Http(e)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content>,
    system_instruction: Content,
    generation_config: &'a GenerationConfig,
    safety_settings: &'a [SafetySetting],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Model => "model",
    }
}

/// First candidate's parts joined into one reply string, if any.
fn reply_text(response: &GenerateContentResponse) -> Option<String> {
    let content = response.candidates.first()?.content.as_ref()?;
    let text: String = content
        .parts
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("");
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Fallback client for a Gemini-style `generateContent` API.
pub struct GeminiClient {
    http: reqwest::Client,
    mode: LlmMode,
    api_key: Option<String>,
    model_name: String,
    base_url: String,
    system_instruction: String,
    generation: GenerationConfig,
    safety: Vec<SafetySetting>,
}

impl GeminiClient {
    /// Builds a client in the given mode; the API key is taken from
    /// `CAMPUS_LLM_API_KEY` if present.
    pub fn new(mode: LlmMode) -> Self {
        Self {
            http: reqwest::Client::new(),
            mode,
            api_key: std::env::var(ENV_LLM_API_KEY).ok(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.to_string(),
            generation: GenerationConfig::default(),
            safety: default_safety_settings(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    /// Overrides the API base URL (mainly for tests against a local server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_safety(mut self, safety: Vec<SafetySetting>) -> Self {
        self.safety = safety;
        self
    }

    fn request_body<'a>(
        &'a self,
        history: &[ConversationTurn],
        message: &str,
    ) -> GenerateContentRequest<'a> {
        let mut contents: Vec<Content> = history
            .iter()
            .map(|turn| Content {
                role: Some(wire_role(turn.role).to_string()),
                parts: vec![Part {
                    text: turn.text.clone(),
                }],
            })
            .collect();
        contents.push(Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: message.to_string(),
            }],
        });
        GenerateContentRequest {
            contents,
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: self.system_instruction.clone(),
                }],
            },
            generation_config: &self.generation,
            safety_settings: &self.safety,
        }
    }

    /// Mock generation: deterministic reply derived from the prompt, usable
    /// offline and in tests.
    fn mock_generate(&self, history: &[ConversationTurn], message: &str) -> String {
        let preview: String = message.chars().take(80).collect();
        format!(
            "[Generated – Mock LLM]\n\nI don't have \"{}\" in my notes yet ({} earlier turns in \
this chat). As a general pointer: check the student portal or ask student services for the \
latest details.",
            preview,
            history.len()
        )
    }

    async fn live_generate(
        &self,
        history: &[ConversationTurn],
        message: &str,
    ) -> Result<String, LlmError> {
        let key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model_name, key
        );
        let body = self.request_body(history, message);
        let response = self.http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: GenerateContentResponse = response.json().await?;
        tracing::debug!(
            target: "campus::llm",
            model = %self.model_name,
            candidates = parsed.candidates.len(),
            "generateContent response received"
        );
        reply_text(&parsed).ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait::async_trait]
impl FallbackModel for GeminiClient {
    async fn generate(
        &self,
        history: &[ConversationTurn],
        message: &str,
    ) -> Result<String, FallbackError> {
        match self.mode {
            LlmMode::Mock => Ok(self.mock_generate(history, message)),
            LlmMode::Live => self
                .live_generate(history, message)
                .await
                .map_err(FallbackError::new),
        }
    }
}
