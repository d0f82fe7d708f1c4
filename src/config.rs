// Configuration module for sklint
// Reads from environment variables with sensible defaults

use std::env;
use std::str::FromStr;
use std::sync::OnceLock;

/// Global configuration instance
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Names owned by the fluent injection API and its attribute library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    /// Attribute marking an injected member (SKLINT_INJECT_MARKER)
    pub inject_marker: String,
    /// Attribute exposing a field to serialization (SKLINT_SERIALIZE_MARKER)
    pub serialize_marker: String,
    /// Call that starts an injection chain (SKLINT_START_CALL)
    pub start_call: String,
    /// Call that attaches a cancellation token (SKLINT_CANCEL_CALL)
    pub cancel_call: String,
    /// Terminal call without a token (SKLINT_UNSAFE_EXECUTE)
    pub unsafe_execute: String,
    /// Terminal call taking the token directly (SKLINT_SAFE_EXECUTE)
    pub safe_execute: String,
    /// Token expression inserted by fixes (SKLINT_TOKEN_EXPR)
    pub token_expr: String,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            inject_marker: "InjectService".to_string(),
            serialize_marker: "SerializeField".to_string(),
            start_call: "InjectServicesAsync".to_string(),
            cancel_call: "WithCancellation".to_string(),
            unsafe_execute: "ExecuteAsync".to_string(),
            safe_execute: "ExecuteWithCancellationAsync".to_string(),
            token_expr: "destroyCancellationToken".to_string(),
        }
    }
}

impl Vocabulary {
    pub fn with_token_expr(mut self, token_expr: &str) -> Self {
        self.token_expr = token_expr.to_string();
        self
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub vocabulary: Vocabulary,

    /// Upper bound on re-analysis rounds in batch fixing (SKLINT_MAX_FIX_PASSES)
    pub max_fix_passes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Vocabulary::default())
    }
}

impl Config {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            vocabulary,
            max_fix_passes: 4,
        }
    }

    /// Load configuration from environment variables
    fn from_env() -> Self {
        let mut config = Config::new(Vocabulary::default());
        let vocab = &mut config.vocabulary;

        override_name("SKLINT_INJECT_MARKER", &mut vocab.inject_marker);
        override_name("SKLINT_SERIALIZE_MARKER", &mut vocab.serialize_marker);
        override_name("SKLINT_START_CALL", &mut vocab.start_call);
        override_name("SKLINT_CANCEL_CALL", &mut vocab.cancel_call);
        override_name("SKLINT_UNSAFE_EXECUTE", &mut vocab.unsafe_execute);
        override_name("SKLINT_SAFE_EXECUTE", &mut vocab.safe_execute);
        override_name("SKLINT_TOKEN_EXPR", &mut vocab.token_expr);
        override_parsed("SKLINT_MAX_FIX_PASSES", &mut config.max_fix_passes);

        config
    }

    /// Get the global configuration instance
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(Config::from_env)
    }

    /// Marker names with environment overrides applied
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}

fn override_name(key: &str, slot: &mut String) {
    let Ok(val) = env::var(key) else {
        return;
    };
    let trimmed = val.trim();
    if trimmed.is_empty() {
        tracing::warn!(key, default = %slot, "empty value, using default");
        return;
    }
    *slot = trimmed.to_string();
}

fn override_parsed<T>(key: &str, slot: &mut T)
where
    T: FromStr + std::fmt::Display,
{
    let Ok(val) = env::var(key) else {
        return;
    };
    match val.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => {
            tracing::warn!(key, value = %val, default = %slot, "invalid value, using default");
        }
    }
}
