use std::env;
use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{Result, ScoutError};

pub const DEFAULT_ARXIV_ENDPOINT: &str = "https://export.arxiv.org/api/query";

const APP_DIR: &str = "paper-scout";

/// Which LLM service summarizes the papers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    Gemini,
}

impl Provider {
    pub fn key_var(&self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Anthropic => "claude-3-5-haiku-20241022",
            Provider::Gemini => "gemini-2.5-flash",
        }
    }

    fn key_help_url(&self) -> &'static str {
        match self {
            Provider::Anthropic => "https://console.anthropic.com/settings/keys",
            Provider::Gemini => "https://aistudio.google.com/app/apikey",
        }
    }
}

impl FromStr for Provider {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "gemini" | "google" => Ok(Provider::Gemini),
            other => Err(ScoutError::Config(format!(
                "Unknown SCOUT_LLM_PROVIDER '{}'. Use 'anthropic' or 'gemini'",
                other
            ))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::Gemini => write!(f, "gemini"),
        }
    }
}

/// Process-level settings, read once at start-up and passed down explicitly.
#[derive(Clone)]
pub struct Config {
    pub provider: Provider,
    pub api_key: String,
    pub model: String,
    pub arxiv_endpoint: Url,
}

// Hand-written so the key never ends up in logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("arxiv_endpoint", &self.arxiv_endpoint.as_str())
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load .env from multiple locations
        Self::try_load_dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let provider = match non_empty("SCOUT_LLM_PROVIDER") {
            Some(raw) => raw.parse::<Provider>()?,
            None => Provider::Anthropic,
        };

        let api_key = non_empty(provider.key_var()).ok_or_else(|| {
            ScoutError::Config(format!(
                "{var} not found.\n\n\
                To fix this, create ~/.config/{app}/.env with:\n  \
                SCOUT_LLM_PROVIDER={provider}\n  \
                {var}=your_key_here\n\n\
                Get an API key from: {help}",
                var = provider.key_var(),
                app = APP_DIR,
                provider = provider,
                help = provider.key_help_url(),
            ))
        })?;

        let model = non_empty("SCOUT_LLM_MODEL")
            .unwrap_or_else(|| provider.default_model().to_string());

        let endpoint = non_empty("ARXIV_API_URL").unwrap_or_else(|| DEFAULT_ARXIV_ENDPOINT.into());
        let arxiv_endpoint = Url::parse(endpoint.trim()).map_err(|e| {
            ScoutError::Config(format!("ARXIV_API_URL '{}' is not a valid URL: {}", endpoint, e))
        })?;

        Ok(Self {
            provider,
            api_key,
            model,
            arxiv_endpoint,
        })
    }

    fn try_load_dotenv() {
        // Try locations in order of preference:

        // 1. Current directory (for development)
        if dotenvy::dotenv().is_ok() {
            return;
        }

        // 2. ~/.config/paper-scout/.env (standard config location)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join(APP_DIR).join(".env");
            if config_path.exists() && dotenvy::from_path(&config_path).is_ok() {
                return;
            }
        }

        // 3. ~/.env (home directory)
        if let Some(home_dir) = dirs::home_dir() {
            let home_path = home_dir.join(".env");
            if home_path.exists() {
                let _ = dotenvy::from_path(&home_path);
            }
        }

        // If none found, that's okay - environment variables might be set system-wide
    }
}
