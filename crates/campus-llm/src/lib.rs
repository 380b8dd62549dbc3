//! campus-llm: fallback model client for the Campus Companion assistant.
//!
//! Implements [`campus_core::FallbackModel`] against a Gemini-style
//! `generateContent` HTTP API, with a deterministic mock mode so the
//! assistant works offline and in tests without an API key.

mod client;

pub use client::{
    default_safety_settings, GeminiClient, GenerationConfig, HarmBlockThreshold, HarmCategory,
    LlmError, LlmMode, SafetySetting, DEFAULT_SYSTEM_INSTRUCTION,
};
