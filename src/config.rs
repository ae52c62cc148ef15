//! Process-wide configuration, read once from the environment at startup.

use std::fmt;

use crate::error::{AppError, Result};
use crate::http::cors::{CorsPolicy, OriginFallback};

pub const DEFAULT_PLANNER_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_EXECUTOR_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_FIRESTORE_DATABASE: &str = "(default)";
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] =
    ["http://localhost:5173", "http://localhost:5174", "http://localhost:5175"];

/// How a generation request is turned into a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryMode {
    /// Plan first (conditioned on stored preferences), then write from the plan.
    Planned,
    /// Write straight from the keywords. Responds with `{story}` only.
    Direct,
}

impl StoryMode {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "planned" => Ok(StoryMode::Planned),
            "direct" => Ok(StoryMode::Direct),
            other => Err(AppError::Config(format!(
                "STORY_MODE must be 'planned' or 'direct', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

impl StoreBackend {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::Config(format!(
                "STORY_STORE must be 'firestore' or 'memory', got '{other}'"
            ))),
        }
    }
}

#[derive(Clone)]
pub struct FirestoreConfig {
    /// `None` means "take it from the credentials".
    pub project_id: Option<String>,
    pub database: String,
    pub emulator_host: Option<String>,
    pub access_token: Option<String>,
    /// Inline service account key. Without it (and without a static token) Application
    /// Default Credentials are used.
    pub credentials_json: Option<String>,
}

impl fmt::Debug for FirestoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirestoreConfig")
            .field("project_id", &self.project_id)
            .field("database", &self.database)
            .field("emulator_host", &self.emulator_host)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("credentials_json", &self.credentials_json.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Clone)]
pub struct StoryConfig {
    /// Only used by the startup key check. `gemini_rs` reads `GEMINI_API_KEY` from the process
    /// environment on its own, so a key supplied through [`StoryConfig::from_lookup`] never
    /// reaches generation.
    pub gemini_api_key: String,
    /// Base URL for the startup key check (`GEMINI_API_BASE`). Generation always goes to the
    /// endpoint `gemini_rs` is built for.
    pub gemini_api_base: String,
    pub planner_model: String,
    pub executor_model: String,
    pub mode: StoryMode,
    pub cors: CorsPolicy,
    pub store: StoreBackend,
    pub firestore: FirestoreConfig,
}

impl fmt::Debug for StoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoryConfig")
            .field("gemini_api_key", &"[REDACTED]")
            .field("gemini_api_base", &self.gemini_api_base)
            .field("planner_model", &self.planner_model)
            .field("executor_model", &self.executor_model)
            .field("mode", &self.mode)
            .field("cors", &self.cors)
            .field("store", &self.store)
            .field("firestore", &self.firestore)
            .finish()
    }
}

impl StoryConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let gemini_api_key = get("GEMINI_API_KEY").ok_or_else(|| {
            AppError::Config("GEMINI_API_KEY environment variable is not set".into())
        })?;

        let mode = match get("STORY_MODE") {
            Some(raw) => StoryMode::parse(&raw)?,
            None => StoryMode::Planned,
        };
        let store = match get("STORY_STORE") {
            Some(raw) => StoreBackend::parse(&raw)?,
            None => StoreBackend::Firestore,
        };

        let allowed_origins = match get("CORS_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };
        let fallback = match get("CORS_FALLBACK") {
            Some(raw) => OriginFallback::parse(&raw)?,
            None => OriginFallback::Wildcard,
        };

        Ok(Self {
            gemini_api_key,
            gemini_api_base: get("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string()),
            planner_model: get("PLANNER_MODEL").unwrap_or_else(|| DEFAULT_PLANNER_MODEL.to_string()),
            executor_model: get("EXECUTOR_MODEL")
                .unwrap_or_else(|| DEFAULT_EXECUTOR_MODEL.to_string()),
            mode,
            cors: CorsPolicy::new(allowed_origins, fallback),
            store,
            firestore: FirestoreConfig {
                project_id: get("GOOGLE_CLOUD_PROJECT").or_else(|| get("GCLOUD_PROJECT")),
                database: get("FIRESTORE_DATABASE")
                    .unwrap_or_else(|| DEFAULT_FIRESTORE_DATABASE.to_string()),
                emulator_host: get("FIRESTORE_EMULATOR_HOST"),
                access_token: get("FIRESTORE_ACCESS_TOKEN"),
                credentials_json: get("FIRESTORE_CREDENTIALS_JSON"),
            },
        })
    }
}
