pub mod config;
pub mod error;
pub mod generation;
pub mod hubspot;
pub mod insight;
pub mod models;
pub mod prompt;
pub mod resolver;

pub use config::BreezyConfig;
pub use error::BreezyError;
pub use generation::{GeminiClient, GenerationError, TextGenerator};
pub use hubspot::{CrmBackend, HubSpotClient};
pub use insight::{Insight, InsightService};
pub use models::{Association, Contact, Deal, ListEnvelope, Properties};
pub use prompt::{build_prompt, FunnelStatus, InsightPrompt, Pipeline, RiskLevel};
pub use resolver::resolve_deals_for_contact;
