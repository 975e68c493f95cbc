use std::env;
use std::str::FromStr;

use url::Url;

use crate::errors::SummaryError;
use crate::prompt::{DEFAULT_SYSTEM_PROMPT, sanitize_system_prompt};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_PROJECT_NAME: &str = "smart-summary-backend";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" => Ok(Self::Text),
            other => Err(SummaryError::ConfigError(format!(
                "LOG_FORMAT: unsupported value '{other}' (expected 'json' or 'text')"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_host: String,
    pub app_port: u16,
    pub project_name: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_org_id: Option<String>,
    pub openai_base_url: String,
    /// Instruction prefix composed with the user's text; `None` sends the text as-is.
    pub system_prompt: Option<String>,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_host: DEFAULT_HOST.to_string(),
            app_port: DEFAULT_PORT,
            project_name: DEFAULT_PROJECT_NAME.to_string(),
            openai_api_key: String::new(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_org_id: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            log_format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `SummaryError::ConfigError` when a variable is set to a value
    /// that cannot be parsed.
    pub fn from_env() -> Result<Self, SummaryError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, falling back to
    /// defaults for anything the lookup does not provide.
    ///
    /// # Errors
    ///
    /// Returns `SummaryError::ConfigError` for unparseable values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SummaryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let app_port = match lookup("APP_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                SummaryError::ConfigError(format!("APP_PORT: invalid port '{raw}': {e}"))
            })?,
            None => defaults.app_port,
        };

        let openai_base_url = match lookup("OPENAI_BASE_URL") {
            Some(raw) => {
                let parsed = Url::parse(raw.trim()).map_err(|e| {
                    SummaryError::ConfigError(format!("OPENAI_BASE_URL: invalid URL '{raw}': {e}"))
                })?;
                parsed.as_str().trim_end_matches('/').to_string()
            }
            None => defaults.openai_base_url,
        };

        // An explicitly empty prompt disables the template and sends the text directly.
        let system_prompt = match lookup("SUMMARY_SYSTEM_PROMPT") {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(sanitize_system_prompt(&raw)),
            None => defaults.system_prompt,
        };

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => defaults.log_format,
        };

        Ok(Self {
            app_host: lookup("APP_HOST").unwrap_or(defaults.app_host),
            app_port,
            project_name: lookup("PROJECT_NAME").unwrap_or(defaults.project_name),
            openai_api_key: lookup("OPENAI_API_KEY").unwrap_or(defaults.openai_api_key),
            openai_model: lookup("OPENAI_MODEL")
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(defaults.openai_model),
            openai_org_id: lookup("OPENAI_ORG_ID").filter(|o| !o.trim().is_empty()),
            openai_base_url,
            system_prompt,
            log_format,
        })
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.app_host, self.app_port)
    }
}
