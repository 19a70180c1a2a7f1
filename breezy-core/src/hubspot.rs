//! HubSpot CRM v3 client.
//!
//! Provides a `CrmBackend` trait with one implementation:
//! - **HubSpotClient** — bearer-token REST calls against `api.hubapi.com`
//!
//! Every call is a single pass-through: upstream failures become
//! `BreezyError::Upstream` (or `NotFound` for 404) carrying the provider's
//! status and body. Nothing is retried and nothing is cached.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::CrmConfig;
use crate::error::BreezyError;
use crate::models::{Association, Contact, Deal, ListEnvelope, Properties};

/// Deal→contact association type id defined by HubSpot.
pub const DEAL_TO_CONTACT_ASSOCIATION: u32 = 3;

// ============================================================================
// CrmBackend trait
// ============================================================================

/// Abstraction over the CRM object store.
#[async_trait]
pub trait CrmBackend: Send + Sync {
    async fn list_contacts(&self) -> Result<ListEnvelope<Contact>, BreezyError>;

    async fn get_contact(&self, contact_id: &str) -> Result<Contact, BreezyError>;

    async fn create_contact(&self, properties: Properties) -> Result<Contact, BreezyError>;

    async fn list_deals(&self) -> Result<ListEnvelope<Deal>, BreezyError>;

    /// Create a deal, linking it to `contact_id` when one is given.
    async fn create_deal(
        &self,
        properties: Properties,
        contact_id: Option<&str>,
    ) -> Result<Deal, BreezyError>;

    /// Deal associations for a contact, in provider order.
    async fn contact_deal_associations(
        &self,
        contact_id: &str,
    ) -> Result<Vec<Association>, BreezyError>;

    /// Full deal records for `deal_ids`. The provider may omit ids.
    async fn batch_read_deals(
        &self,
        deal_ids: &[String],
        properties: &[String],
    ) -> Result<Vec<Deal>, BreezyError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// HubSpot API structs
// ============================================================================

#[derive(Debug, Serialize)]
struct CreateObjectRequest<'a> {
    properties: &'a Properties,
    #[serde(skip_serializing_if = "Option::is_none")]
    associations: Option<Vec<AssociationInput>>,
}

#[derive(Debug, Serialize)]
struct AssociationInput {
    to: ObjectRef,
    types: Vec<AssociationSpec>,
}

#[derive(Debug, Serialize)]
struct ObjectRef {
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AssociationSpec {
    association_category: &'static str,
    association_type_id: u32,
}

#[derive(Debug, Serialize)]
struct BatchReadRequest<'a> {
    inputs: Vec<ObjectRef>,
    properties: &'a [String],
}

/// Association list for a deal create body. Empty unless a non-blank contact id is given.
fn deal_associations(contact_id: Option<&str>) -> Vec<AssociationInput> {
    contact_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            vec![AssociationInput {
                to: ObjectRef { id: id.to_string() },
                types: vec![AssociationSpec {
                    association_category: "HUBSPOT_DEFINED",
                    association_type_id: DEAL_TO_CONTACT_ASSOCIATION,
                }],
            }]
        })
        .unwrap_or_default()
}

// ============================================================================
// HubSpotClient
// ============================================================================

#[derive(Debug, Clone)]
pub struct HubSpotClient {
    client: Client,
    token: String,
    base_url: String,
    page_size: u32,
    contact_properties: Vec<String>,
    deal_properties: Vec<String>,
}

impl HubSpotClient {
    /// Build from config. Fails with `NotConfigured` when no token is available.
    pub fn new(config: &CrmConfig) -> Result<Self, BreezyError> {
        Self::with_base_url(config, config.base_url.clone())
    }

    /// Create a client with a custom base URL (for testing / integration)
    pub fn with_base_url(config: &CrmConfig, base_url: String) -> Result<Self, BreezyError> {
        Self::with_token(config, config.resolved_token(), base_url)
    }

    fn with_token(
        config: &CrmConfig,
        token: Option<String>,
        base_url: String,
    ) -> Result<Self, BreezyError> {
        let token = token.ok_or_else(|| {
            BreezyError::NotConfigured(
                "HUBSPOT_ACCESS_TOKEN is not set. Add your HubSpot private app token to .env"
                    .to_string(),
            )
        })?;

        // No explicit timeout: requests run under reqwest's defaults.
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            contact_properties: config.contact_properties.clone(),
            deal_properties: config.deal_properties.clone(),
        })
    }

    pub fn deal_properties(&self) -> &[String] {
        &self.deal_properties
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, BreezyError> {
        let response = self.authorized(request).send().await.map_err(|e| {
            tracing::error!(error = %e, "HubSpot request failed: {}", what);
            BreezyError::from(e)
        })?;
        let response = check_status(response, what).await?;
        response.json::<T>().await.map_err(|e| {
            tracing::error!(error = %e, "Malformed HubSpot response: {}", what);
            BreezyError::upstream(None, format!("malformed response for {what}: {e}"))
        })
    }
}

/// Turn a non-2xx response into `NotFound`/`Upstream`, keeping the provider body.
async fn check_status(response: Response, what: &str) -> Result<Response, BreezyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let details = serde_json::from_str::<Value>(&body)
        .ok()
        .or_else(|| (!body.is_empty()).then(|| Value::String(body.clone())));
    let message = details
        .as_ref()
        .and_then(|d| d.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{what} returned {status}"));

    tracing::error!(status = status.as_u16(), message = %message, "HubSpot API error: {}", what);

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(BreezyError::NotFound { message, details });
    }
    Err(BreezyError::Upstream {
        status: Some(status.as_u16()),
        message,
        details,
    })
}

#[async_trait]
impl CrmBackend for HubSpotClient {
    async fn list_contacts(&self) -> Result<ListEnvelope<Contact>, BreezyError> {
        let request = self
            .client
            .get(self.url("/crm/v3/objects/contacts"))
            .query(&[
                ("limit", self.page_size.to_string()),
                ("properties", self.contact_properties.join(",")),
            ]);
        self.send(request, "list contacts").await
    }

    async fn get_contact(&self, contact_id: &str) -> Result<Contact, BreezyError> {
        let request = self
            .client
            .get(self.url(&format!("/crm/v3/objects/contacts/{contact_id}")))
            .query(&[("properties", self.contact_properties.join(","))]);
        self.send(request, "get contact").await
    }

    async fn create_contact(&self, properties: Properties) -> Result<Contact, BreezyError> {
        let body = CreateObjectRequest {
            properties: &properties,
            associations: None,
        };
        let request = self
            .client
            .post(self.url("/crm/v3/objects/contacts"))
            .json(&body);
        self.send(request, "create contact").await
    }

    async fn list_deals(&self) -> Result<ListEnvelope<Deal>, BreezyError> {
        let request = self
            .client
            .get(self.url("/crm/v3/objects/deals"))
            .query(&[
                ("limit", self.page_size.to_string()),
                ("properties", self.deal_properties.join(",")),
            ]);
        self.send(request, "list deals").await
    }

    async fn create_deal(
        &self,
        properties: Properties,
        contact_id: Option<&str>,
    ) -> Result<Deal, BreezyError> {
        let body = CreateObjectRequest {
            properties: &properties,
            associations: Some(deal_associations(contact_id)),
        };
        let request = self.client.post(self.url("/crm/v3/objects/deals")).json(&body);
        self.send(request, "create deal").await
    }

    async fn contact_deal_associations(
        &self,
        contact_id: &str,
    ) -> Result<Vec<Association>, BreezyError> {
        let request = self.client.get(self.url(&format!(
            "/crm/v3/objects/contacts/{contact_id}/associations/deals"
        )));
        let list: ListEnvelope<Association> = self.send(request, "deal associations").await?;
        Ok(list.into_results())
    }

    async fn batch_read_deals(
        &self,
        deal_ids: &[String],
        properties: &[String],
    ) -> Result<Vec<Deal>, BreezyError> {
        let body = BatchReadRequest {
            inputs: deal_ids
                .iter()
                .map(|id| ObjectRef { id: id.clone() })
                .collect(),
            properties,
        };
        let request = self
            .client
            .post(self.url("/crm/v3/objects/deals/batch/read"))
            .json(&body);
        let list: ListEnvelope<Deal> = self.send(request, "batch read deals").await?;
        Ok(list.into_results())
    }

    fn name(&self) -> &str {
        "hubspot"
    }
}

// ============================================================================
// TESTS
// ============================================================================
