//! Application configuration sourced from the environment
//!
//! Settings are read from process environment variables, optionally seeded
//! from a `.env` file. The LLM API key is required; model name and sampling
//! temperature fall back to conservative defaults when unset.

use crate::error::Error;
use tracing::debug;

/// Default chat model when `GPT_MODEL` is unset
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Default sampling temperature when `GPT_TEMPERATURE` is unset
pub const DEFAULT_TEMPERATURE: f64 = 0.1;

/// Configuration for the query and chat pipeline
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// OpenAI API key
    pub openai_api_key: String,

    /// Chat model name
    pub model: String,

    /// Sampling temperature for completions
    pub temperature: f64,

    /// Private documentation URL fragment for the reference harvester
    pub secret_url: Option<String>,
}

impl AppConfig {
    /// Load configuration from the environment, reading `.env` if present.
    pub fn from_env() -> Result<Self, Error> {
        // A missing .env file is fine; variables may come from the process env.
        let _ = dotenvy::dotenv();

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::Config("OPENAI_API_KEY environment variable must be set".into()))?;

        let model = std::env::var("GPT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let temperature = match std::env::var("GPT_TEMPERATURE") {
            Ok(raw) => raw.parse::<f64>().map_err(|e| {
                Error::Config(format!("GPT_TEMPERATURE must be a number: {}", e))
            })?,
            Err(_) => DEFAULT_TEMPERATURE,
        };

        let secret_url = std::env::var("VBT_PRO_SECRET_URL").ok().filter(|s| !s.is_empty());

        debug!(model, temperature, "loaded configuration");

        Ok(Self {
            openai_api_key,
            model,
            temperature,
            secret_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(DEFAULT_MODEL, "gpt-3.5-turbo");
        assert!(DEFAULT_TEMPERATURE < 1.0);
    }

    #[test]
    fn test_temperature_parse_error_message() {
        let err = "abc".parse::<f64>().unwrap_err();
        let wrapped = Error::Config(format!("GPT_TEMPERATURE must be a number: {}", err));
        assert!(wrapped.to_string().contains("GPT_TEMPERATURE"));
    }
}
