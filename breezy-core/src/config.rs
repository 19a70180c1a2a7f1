use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Default contact properties requested from the CRM.
pub const CONTACT_PROPERTIES: &[&str] = &[
    "firstname",
    "lastname",
    "email",
    "jobtitle",
    "company",
    "createdate",
];

/// Default deal properties requested from the CRM.
pub const DEAL_PROPERTIES: &[&str] = &["dealname", "amount", "dealstage", "closedate", "pipeline"];

#[derive(Debug, Deserialize, Clone, Default)]
pub struct BreezyConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub crm: CrmConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    /// Seconds to wait for in-flight requests before forcing exit.
    pub shutdown_grace_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            shutdown_grace_seconds: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CrmConfig {
    pub base_url: String,
    /// HubSpot private app token. Falls back to `HUBSPOT_ACCESS_TOKEN`.
    pub access_token: Option<String>,
    pub page_size: u32,
    pub contact_properties: Vec<String>,
    pub deal_properties: Vec<String>,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.hubapi.com".to_string(),
            access_token: None,
            page_size: 50,
            contact_properties: CONTACT_PROPERTIES.iter().map(|s| s.to_string()).collect(),
            deal_properties: DEAL_PROPERTIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CrmConfig {
    /// Configured token, else the `HUBSPOT_ACCESS_TOKEN` environment variable.
    pub fn resolved_token(&self) -> Option<String> {
        self.token_or(std::env::var("HUBSPOT_ACCESS_TOKEN").ok())
    }

    /// Configured token, else `fallback`. Blank values count as missing.
    pub fn token_or(&self, fallback: Option<String>) -> Option<String> {
        non_blank(self.access_token.clone()).or_else(|| non_blank(fallback))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AiConfig {
    pub base_url: String,
    pub model: String,
    /// Gemini API key. Falls back to `GEMINI_API_KEY`.
    pub api_key: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
        }
    }
}

impl AiConfig {
    /// Configured key, else the `GEMINI_API_KEY` environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key_or(std::env::var("GEMINI_API_KEY").ok())
    }

    /// Configured key, else `fallback`. Blank values count as missing.
    pub fn api_key_or(&self, fallback: Option<String>) -> Option<String> {
        non_blank(self.api_key.clone()).or_else(|| non_blank(fallback))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl BreezyConfig {
    /// Load from an optional TOML file, then `BREEZY__SECTION__KEY` env overrides.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("BREEZY")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> BreezyConfig {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let config = from_toml("");
        assert_eq!(config.http.port, 3001);
        assert_eq!(config.http.host, "127.0.0.1");
        assert_eq!(config.crm.base_url, "https://api.hubapi.com");
        assert_eq!(config.crm.page_size, 50);
        assert_eq!(config.crm.deal_properties, DEAL_PROPERTIES);
        assert_eq!(config.ai.model, "gemini-2.0-flash");
        assert_eq!(config.service.log_level, "info");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = from_toml(
            r#"
            [http]
            port = 9000

            [crm]
            page_size = 10
            access_token = "pat-123"
            "#,
        );
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.http.shutdown_grace_seconds, 10);
        assert_eq!(config.crm.page_size, 10);
        assert_eq!(config.crm.resolved_token().as_deref(), Some("pat-123"));
        assert_eq!(config.crm.contact_properties, CONTACT_PROPERTIES);
    }

    #[test]
    fn test_configured_key_wins_over_environment() {
        let ai = AiConfig {
            api_key: Some("from-file".to_string()),
            ..AiConfig::default()
        };
        assert_eq!(ai.resolved_api_key().as_deref(), Some("from-file"));
    }

    #[test]
    fn test_blank_credentials_fall_back_then_count_as_missing() {
        let crm = CrmConfig {
            access_token: Some("  ".to_string()),
            ..CrmConfig::default()
        };
        assert_eq!(crm.token_or(Some("pat-env".to_string())).as_deref(), Some("pat-env"));
        assert_eq!(crm.token_or(Some(String::new())), None);
        assert_eq!(crm.token_or(None), None);

        let ai = AiConfig::default();
        assert_eq!(ai.api_key_or(Some("key-env".to_string())).as_deref(), Some("key-env"));
        assert_eq!(ai.api_key_or(None), None);
    }

    #[test]
    fn test_load_missing_file_is_not_an_error() {
        let config = BreezyConfig::load("definitely-not-here-breezy.toml").unwrap();
        assert_eq!(config.crm.page_size, 50);
    }
}
