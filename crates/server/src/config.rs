//! Server configuration

use std::str::FromStr;

/// Which large-language-model vendor backs the AI features
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmVendor {
    Anthropic,
    OpenAi,
}

impl FromStr for LlmVendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(LlmVendor::Anthropic),
            "openai" => Ok(LlmVendor::OpenAi),
            other => Err(format!("Unknown LLM provider: {other}")),
        }
    }
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    /// Local store for EHR connections and the medication catalog.
    /// In-memory when unset.
    pub database_url: Option<String>,
    /// FHIR base URL of the upstream server (Aidbox)
    pub aidbox_url: String,
    pub aidbox_client_id: Option<String>,
    pub aidbox_client_secret: Option<String>,
    pub api_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub rate_limit_rps: u32,
    pub llm_provider: Option<LlmVendor>,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub llm_model: Option<String>,
    /// Overrides the vendor API base URL (proxies, tests)
    pub llm_base_url: Option<String>,
    /// Externally visible base URL, used to build the SMART redirect URI
    pub public_base_url: String,
    pub audit_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".into(),
            database_url: None,
            aidbox_url: "http://localhost:8888/fhir".into(),
            aidbox_client_id: None,
            aidbox_client_secret: None,
            api_key: None,
            cors_origins: vec!["*".into()],
            rate_limit_rps: 100,
            llm_provider: None,
            anthropic_api_key: None,
            openai_api_key: None,
            llm_model: None,
            llm_base_url: None,
            public_base_url: "http://localhost:8080".into(),
            audit_capacity: 1000,
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Config {
    /// Load configuration from environment variables (after `.env`, if present)
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let llm_provider = env_opt("LLM_PROVIDER").and_then(|v| match v.parse() {
            Ok(vendor) => Some(vendor),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring LLM_PROVIDER");
                None
            }
        });

        Self {
            bind_address: env_opt("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            database_url: env_opt("DATABASE_URL"),
            aidbox_url: env_opt("AIDBOX_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.aidbox_url),
            aidbox_client_id: env_opt("AIDBOX_CLIENT_ID"),
            aidbox_client_secret: env_opt("AIDBOX_CLIENT_SECRET"),
            api_key: env_opt("API_KEY"),
            cors_origins: env_opt("CORS_ORIGINS")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: env_opt("RATE_LIMIT_RPS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.rate_limit_rps),
            llm_provider,
            anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            llm_model: env_opt("LLM_MODEL"),
            llm_base_url: env_opt("LLM_BASE_URL"),
            public_base_url: env_opt("PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.public_base_url),
            audit_capacity: env_opt("AUDIT_CAPACITY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.audit_capacity),
        }
    }

    /// Vendor the AI features will use: the explicit choice, else whichever
    /// API key is present (Anthropic first).
    pub fn resolved_llm_vendor(&self) -> Option<LlmVendor> {
        match self.llm_provider {
            Some(LlmVendor::Anthropic) => self.anthropic_api_key.as_ref().map(|_| LlmVendor::Anthropic),
            Some(LlmVendor::OpenAi) => self.openai_api_key.as_ref().map(|_| LlmVendor::OpenAi),
            None if self.anthropic_api_key.is_some() => Some(LlmVendor::Anthropic),
            None if self.openai_api_key.is_some() => Some(LlmVendor::OpenAi),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_lists() {
        assert_eq!(
            parse_list(" https://a.example, ,https://b.example "),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn parses_vendor_names() {
        assert_eq!("Anthropic".parse::<LlmVendor>().unwrap(), LlmVendor::Anthropic);
        assert_eq!("openai".parse::<LlmVendor>().unwrap(), LlmVendor::OpenAi);
        assert!("llama".parse::<LlmVendor>().is_err());
    }

    #[test]
    fn vendor_falls_back_to_available_key() {
        let config = Config {
            openai_api_key: Some("sk".into()),
            ..Config::default()
        };
        assert_eq!(config.resolved_llm_vendor(), Some(LlmVendor::OpenAi));

        let explicit_without_key = Config {
            llm_provider: Some(LlmVendor::Anthropic),
            openai_api_key: Some("sk".into()),
            ..Config::default()
        };
        assert_eq!(explicit_without_key.resolved_llm_vendor(), None);

        assert_eq!(Config::default().resolved_llm_vendor(), None);
    }
}
