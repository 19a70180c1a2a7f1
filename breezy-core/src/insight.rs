//! Insight orchestration: credential pre-flight, prompt, one completion,
//! normalization into [`Insight`].

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::config::AiConfig;
use crate::error::BreezyError;
use crate::generation::{GeminiClient, GenerationError, TextGenerator};
use crate::hubspot::CrmBackend;
use crate::models::{Contact, Deal};
use crate::prompt::{self, FunnelStatus, RiskLevel, NO_INSIGHT_FALLBACK};
use crate::resolver;

pub const NOT_CONFIGURED_MESSAGE: &str = "AI is not configured. Please set GEMINI_API_KEY in .env.";

/// Generated customer insight. `insight` is the completion verbatim; the
/// classification fields are filled when the completion states them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub insight: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funnel_status: Option<FunnelStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
}

impl Insight {
    pub fn from_completion(text: String) -> Self {
        let insight = if text.trim().is_empty() {
            NO_INSIGHT_FALLBACK.to_string()
        } else {
            text
        };
        Self {
            funnel_status: parse_funnel_status(&insight),
            risk_level: parse_risk_level(&insight),
            insight,
        }
    }
}

/// Value after the first `Status:` line, ignoring the "Funnel Status:" heading.
fn parse_funnel_status(text: &str) -> Option<FunnelStatus> {
    text.lines()
        .filter_map(|line| labelled_value(line, "status:"))
        .find_map(FunnelStatus::from_label)
}

fn parse_risk_level(text: &str) -> Option<RiskLevel> {
    text.lines()
        .filter_map(|line| labelled_value(line, "risk level:"))
        .find_map(RiskLevel::from_label)
}

fn labelled_value<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let lower = line.to_ascii_lowercase();
    let at = lower.find(label)?;
    let value = line[at + label.len()..].trim();
    (!value.is_empty()).then_some(value)
}

/// Check the request body shape. Both fields must be present; `deals` may be empty.
pub fn parse_insight_request(body: &Value) -> Result<(Contact, Vec<Deal>), BreezyError> {
    let contact = match body.get("contact") {
        Some(c) if c.is_object() => c,
        _ => {
            return Err(BreezyError::InvalidInput(
                "Missing 'contact' in request body.".to_string(),
            ))
        }
    };
    let deals = match body.get("deals") {
        Some(d) if d.is_array() => d,
        _ => {
            return Err(BreezyError::InvalidInput(
                "Missing or invalid 'deals' array in request body.".to_string(),
            ))
        }
    };

    let contact: Contact = serde_json::from_value(contact.clone())
        .map_err(|e| BreezyError::InvalidInput(format!("Invalid 'contact': {e}")))?;
    let deals: Vec<Deal> = serde_json::from_value(deals.clone())
        .map_err(|e| BreezyError::InvalidInput(format!("Invalid 'deals': {e}")))?;
    Ok((contact, deals))
}

pub struct InsightService {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl InsightService {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    /// Gemini-backed service. A missing key leaves the service unconfigured
    /// rather than failing startup.
    pub fn from_config(config: &AiConfig) -> Result<Self, GenerationError> {
        Self::from_client(GeminiClient::new(config))
    }

    fn from_client(client: Result<GeminiClient, GenerationError>) -> Result<Self, GenerationError> {
        match client {
            Ok(client) => {
                tracing::info!(model = client.model(), "Insight generation enabled");
                Ok(Self::new(Some(Arc::new(client))))
            }
            Err(GenerationError::MissingApiKey) => {
                tracing::warn!("GEMINI_API_KEY not set; insight generation disabled");
                Ok(Self::new(None))
            }
            Err(e) => Err(e),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    fn generator(&self) -> Result<&dyn TextGenerator, BreezyError> {
        self.generator
            .as_deref()
            .ok_or_else(|| BreezyError::NotConfigured(NOT_CONFIGURED_MESSAGE.to_string()))
    }

    pub async fn generate_insight(
        &self,
        contact: &Contact,
        deals: &[Deal],
    ) -> Result<Insight, BreezyError> {
        let generator = self.generator()?;

        let prompt = prompt::build_prompt(contact, deals)?;
        tracing::debug!(
            contact_id = %contact.id,
            deals = deals.len(),
            prompt_bytes = prompt.len(),
            backend = generator.name(),
            "Requesting insight"
        );

        let text = generator.generate(&prompt).await.map_err(|e| {
            tracing::error!(error = %e, contact_id = %contact.id, "Insight generation failed");
            BreezyError::Upstream {
                status: e.status(),
                message: e.to_string(),
                details: None,
            }
        })?;

        Ok(Insight::from_completion(text))
    }

    /// Fetch the contact, resolve its deals, then generate. Nothing is
    /// generated if any earlier step fails.
    pub async fn insight_for_contact(
        &self,
        crm: &dyn CrmBackend,
        contact_id: &str,
        deal_properties: &[String],
    ) -> Result<Insight, BreezyError> {
        self.generator()?;
        let contact_id = resolver::validate_contact_id(contact_id)?;

        let contact = crm.get_contact(contact_id).await?;
        let deals = resolver::resolve_deals_for_contact(crm, contact_id, deal_properties).await?;
        self.generate_insight(&contact, &deals).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEAL_PROPERTIES;
    use crate::resolver::tests::FakeCrm;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Generator that replays a canned reply and keeps every prompt.
    struct Scripted {
        reply: Result<String, u16>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(code: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(code),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(code) => Err(GenerationError::Api {
                    code: *code,
                    message: "boom".to_string(),
                }),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    const SCHEMA_REPLY: &str = "1. Customer Journey Summary:\n   Ann has no recorded purchases.\n\n\
        2. Subscription Funnel Status:\n   - Status: No subscription started\n   - Reason: no deals.\n\n\
        3. Risk / Opportunity:\n   - Risk Level: Medium\n   - Explanation: new lead.\n";

    fn ann() -> Contact {
        serde_json::from_value(json!({ "id": "1", "properties": { "firstname": "Ann" } })).unwrap()
    }

    fn deal_props() -> Vec<String> {
        DEAL_PROPERTIES.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_not_configured_makes_no_network_call() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let config = AiConfig {
            base_url: mock_server.uri(),
            api_key: Some(String::new()),
            ..AiConfig::default()
        };
        let client = GeminiClient::with_api_key(&config, config.api_key_or(None), mock_server.uri());
        let service = InsightService::from_client(client).unwrap();
        assert!(!service.is_configured());

        let err = service.generate_insight(&ann(), &[]).await.unwrap_err();
        match err {
            BreezyError::NotConfigured(msg) => assert_eq!(msg, NOT_CONFIGURED_MESSAGE),
            other => panic!("Expected NotConfigured, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_deals_reports_no_subscription_started() {
        let generator = Scripted::replying(SCHEMA_REPLY);
        let service = InsightService::new(Some(generator.clone()));

        let insight = service.generate_insight(&ann(), &[]).await.unwrap();
        assert_eq!(insight.insight, SCHEMA_REPLY);
        assert_eq!(insight.funnel_status, Some(FunnelStatus::NoSubscriptionStarted));
        assert_eq!(insight.risk_level, Some(RiskLevel::Medium));

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(FunnelStatus::NoSubscriptionStarted.label()));
        assert!(prompts[0].ends_with("Deals (JSON):\n[]"));
    }

    #[tokio::test]
    async fn test_empty_completion_uses_fallback() {
        let service = InsightService::new(Some(Scripted::replying("  \n")));
        let insight = service.generate_insight(&ann(), &[]).await.unwrap();
        assert_eq!(insight.insight, NO_INSIGHT_FALLBACK);
        assert_eq!(insight.funnel_status, None);
        assert_eq!(
            serde_json::to_value(&insight).unwrap(),
            json!({ "insight": "No insights generated." })
        );
    }

    #[tokio::test]
    async fn test_generator_failure_is_upstream_error() {
        let service = InsightService::new(Some(Scripted::failing(503)));
        let err = service.generate_insight(&ann(), &[]).await.unwrap_err();
        assert!(matches!(err, BreezyError::Upstream { status: Some(503), .. }));
    }

    #[tokio::test]
    async fn test_insight_for_contact_composes_resolution_and_generation() {
        let crm = FakeCrm::default()
            .with_contact(ann())
            .link("1", &["d1", "d2"])
            .with_deal(Deal::new("d1").with_property("dealname", "Thermostat 1 pack"));
        let generator = Scripted::replying(SCHEMA_REPLY);
        let service = InsightService::new(Some(generator.clone()));

        let insight = service
            .insight_for_contact(&crm, "1", &deal_props())
            .await
            .unwrap();
        assert_eq!(insight.funnel_status, Some(FunnelStatus::NoSubscriptionStarted));

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Thermostat 1 pack"));
        assert!(!prompts[0].contains("\"d2\""));
    }

    #[tokio::test]
    async fn test_resolution_failure_skips_generation() {
        let crm = FakeCrm::default().with_contact(Contact::new("unknown"));
        let generator = Scripted::replying(SCHEMA_REPLY);
        let service = InsightService::new(Some(generator.clone()));

        let err = service
            .insight_for_contact(&crm, "unknown", &deal_props())
            .await
            .unwrap_err();
        assert!(matches!(err, BreezyError::NotFound { .. }));
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_unconfigured_composition_touches_nothing() {
        let crm = FakeCrm::default().with_contact(ann());
        let service = InsightService::new(None);
        let err = service
            .insight_for_contact(&crm, "1", &deal_props())
            .await
            .unwrap_err();
        assert!(matches!(err, BreezyError::NotConfigured(_)));
        assert!(crm.association_calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_parse_insight_request_shapes() {
        let (contact, deals) =
            parse_insight_request(&json!({ "contact": { "id": 1 }, "deals": [] })).unwrap();
        assert_eq!(contact.id, "1");
        assert!(deals.is_empty());

        let err = parse_insight_request(&json!({ "deals": [] })).unwrap_err();
        assert_eq!(err.to_string(), "Missing 'contact' in request body.");

        let err = parse_insight_request(&json!({ "contact": {}, "deals": {} })).unwrap_err();
        assert_eq!(err.to_string(), "Missing or invalid 'deals' array in request body.");

        let err = parse_insight_request(&json!({ "contact": {} })).unwrap_err();
        assert!(matches!(err, BreezyError::InvalidInput(_)));
    }

    #[test]
    fn test_status_heading_is_not_mistaken_for_value() {
        let text = "2. Subscription Funnel Status:\n   - Status: On free trial\n";
        assert_eq!(parse_funnel_status(text), Some(FunnelStatus::OnFreeTrial));
        assert_eq!(parse_funnel_status("no status here"), None);
    }
}
