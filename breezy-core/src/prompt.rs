//! Customer-insight prompt construction.
//!
//! The interpretive schema (pipelines, subscription stages, funnel states,
//! risk levels, campaign fields) lives in enumerated constants. The prompt is
//! rendered from those constants plus the pretty-printed contact and deal
//! records, so identical input always yields byte-identical text.

use serde::{Deserialize, Serialize};

use crate::models::{Contact, Deal};

/// Upper bound on deals embedded in one prompt. Later deals are dropped.
pub const MAX_PROMPT_DEALS: usize = 50;

/// Number of campaign ideas the model must propose.
pub const CAMPAIGN_COUNT: usize = 3;

/// Fields every proposed campaign must carry.
pub const CAMPAIGN_FIELDS: [&str; 3] = ["Campaign Title", "1–2 sentence Focus", "Example subject line"];

/// Lifecycle stages a subscriptions-pipeline deal typically moves through.
pub const SUBSCRIPTION_STAGES: [&str; 7] = [
    "Trial Started",
    "Trial Active",
    "Trial Ending Soon",
    "Converted – Monthly",
    "Converted – Annual",
    "At Risk / Payment Issue",
    "Cancelled / Churned",
];

/// Deal fields the model is told to expect on each record.
pub const DEAL_FIELDS: [&str; 6] = [
    "dealname",
    "dealstage",
    "amount",
    "pipeline",
    "createdate",
    "closedate",
];

/// Rules for mapping pipeline/stage onto the customer lifecycle.
pub const INTERPRETATION_RULES: [&str; 4] = [
    "Treat deals in the hardware pipeline as thermostat purchases.",
    "Treat deals in the subscriptions pipeline as Breezy Premium subscription events.",
    "If a customer has hardware but no subscription deals → likely used free trial only and never converted.",
    "Use closedate and createdate to infer timing (e.g., mid trial, post trial, renewal, churn).",
];

const SECTION_RULE: &str = "---------------------------------------------------";

/// Returned instead of an empty completion.
pub const NO_INSIGHT_FALLBACK: &str = "No insights generated.";

// ============================================================================
// Schema enums
// ============================================================================

/// The two mutually exclusive deal pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    Hardware,
    Subscriptions,
}

impl Pipeline {
    pub const ALL: [Pipeline; 2] = [Pipeline::Hardware, Pipeline::Subscriptions];

    pub fn title(self) -> &'static str {
        match self {
            Pipeline::Hardware => "Hardware pipeline",
            Pipeline::Subscriptions => "Subscriptions pipeline",
        }
    }

    fn description(self) -> &'static [&'static str] {
        match self {
            Pipeline::Hardware => &[
                "Represents thermostat purchases",
                "A closed-won deal = completed thermostat sale",
                "Multiple closed-won hardware deals = multiple thermostats owned",
                "Deal names may include pack/quantity (e.g. \"1 pack\", \"3 pack\").",
            ],
            Pipeline::Subscriptions => &[
                "Represents the Breezy Premium subscription lifecycle",
            ],
        }
    }
}

/// Where the customer sits in the subscription funnel. Exactly one is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunnelStatus {
    OnFreeTrial,
    ConvertedMonthly,
    ConvertedAnnual,
    RenewalInProgress,
    Cancelled,
    TrialExpired,
    NoSubscriptionStarted,
}

impl FunnelStatus {
    pub const ALL: [FunnelStatus; 7] = [
        FunnelStatus::OnFreeTrial,
        FunnelStatus::ConvertedMonthly,
        FunnelStatus::ConvertedAnnual,
        FunnelStatus::RenewalInProgress,
        FunnelStatus::Cancelled,
        FunnelStatus::TrialExpired,
        FunnelStatus::NoSubscriptionStarted,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FunnelStatus::OnFreeTrial => "On free trial",
            FunnelStatus::ConvertedMonthly => "Converted to paid monthly",
            FunnelStatus::ConvertedAnnual => "Converted to paid annual",
            FunnelStatus::RenewalInProgress => "Renewal in progress",
            FunnelStatus::Cancelled => "Cancelled subscription",
            FunnelStatus::TrialExpired => "Trial expired — not converted",
            FunnelStatus::NoSubscriptionStarted => "No subscription started",
        }
    }

    /// Match a label case-insensitively; hyphen and dash variants are accepted.
    pub fn from_label(text: &str) -> Option<Self> {
        let wanted = normalize_label(text);
        Self::ALL
            .into_iter()
            .find(|status| wanted.contains(&normalize_label(status.label())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    /// First risk level named in `text`, ignoring case.
    pub fn from_label(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        Self::ALL
            .into_iter()
            .filter_map(|level| lower.find(&level.label().to_lowercase()).map(|at| (at, level)))
            .min_by_key(|(at, _)| *at)
            .map(|(_, level)| level)
    }
}

fn normalize_label(text: &str) -> String {
    text.to_lowercase()
        .replace(['—', '–'], "-")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Prompt builder
// ============================================================================

/// A prompt ready to render: the contact plus at most [`MAX_PROMPT_DEALS`] deals.
#[derive(Debug, Clone, Copy)]
pub struct InsightPrompt<'a> {
    contact: &'a Contact,
    deals: &'a [Deal],
}

impl<'a> InsightPrompt<'a> {
    pub fn new(contact: &'a Contact, deals: &'a [Deal]) -> Self {
        let kept = deals.len().min(MAX_PROMPT_DEALS);
        Self {
            contact,
            deals: &deals[..kept],
        }
    }

    pub fn contact(&self) -> &Contact {
        self.contact
    }

    /// Deals that will be embedded, in input order.
    pub fn deals(&self) -> &[Deal] {
        self.deals
    }

    pub fn render(&self) -> Result<String, serde_json::Error> {
        let contact_json = serde_json::to_string_pretty(self.contact)?;
        let deals_json = serde_json::to_string_pretty(self.deals)?;

        let mut out = String::new();
        out.push_str(&preamble());
        out.push_str(&data_model_section());
        out.push_str(&task_section());
        out.push_str(&format!(
            "{SECTION_RULE}\nContact (JSON):\n{contact_json}\n\nDeals (JSON):\n{deals_json}\n"
        ));
        Ok(out.trim().to_string())
    }
}

/// Render the insight prompt for a contact and its deals.
pub fn build_prompt(contact: &Contact, deals: &[Deal]) -> Result<String, serde_json::Error> {
    InsightPrompt::new(contact, deals).render()
}

fn heading(title: &str) -> String {
    format!("{SECTION_RULE}\n{title}\n{SECTION_RULE}\n\n")
}

fn preamble() -> String {
    "You are an AI assistant for Breezy, a smart home technology company that sells:\n\
     \n\
     - Smart thermostats (hardware) via e-commerce\n\
     - A companion SaaS subscription \u{201c}Breezy Premium\u{201d} that includes:\n  \
       - AI climate optimization\n  \
       - Energy analytics\n  \
       - Remote access & scheduling\n  \
       - Smart home integrations\n\
     \n\
     Pricing:\n\
     - Hardware: $299 per thermostat\n\
     - Subscription: $9.99 monthly or $99 annually\n\
     - Each hardware purchase includes a 30-day free trial of Breezy Premium.\n\
     \n"
        .to_string()
}

fn data_model_section() -> String {
    let mut out = heading("DATA MODEL FOR THIS PROOF OF CONCEPT");
    out.push_str(&format!(
        "In HubSpot, Breezy represents customer activity as DEALS in {} separate pipelines:\n\n",
        number_word(Pipeline::ALL.len())
    ));

    for (i, pipeline) in Pipeline::ALL.into_iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, pipeline.title()));
        for line in pipeline.description() {
            out.push_str(&format!("   - {line}\n"));
        }
        if pipeline == Pipeline::Subscriptions {
            out.push_str("   - Stages typically include:\n");
            for stage in SUBSCRIPTION_STAGES {
                out.push_str(&format!("       - {stage}\n"));
            }
            out.push_str(
                "   - Deals here represent:\n\
                 \x20      - free trials,\n\
                 \x20      - subscription activations,\n\
                 \x20      - renewals,\n\
                 \x20      - cancellations or churn.\n",
            );
        }
        out.push('\n');
    }

    out.push_str("Each deal you receive has:\n");
    for field in DEAL_FIELDS {
        out.push_str(&format!("- {field}"));
        if field == "pipeline" {
            out.push_str(" (indicating which pipeline it belongs to)");
        }
        out.push('\n');
    }

    out.push_str("\nInterpretation guidance:\n");
    for rule in INTERPRETATION_RULES {
        out.push_str(&format!("- {rule}\n"));
    }
    out.push('\n');
    out
}

fn task_section() -> String {
    let mut out = heading("YOUR TASK");
    out.push_str(
        "Using ONLY the contact and deals data provided, analyze this specific customer and produce:\n\n",
    );

    out.push_str(
        "1. Customer Journey Summary:\n   \
         - 2–3 sentences describing:\n     \
         - where they are in their Breezy journey,\n     \
         - approximately how many thermostats they own,\n     \
         - whether they appear to be on trial, converted, renewed, or churned.\n\n",
    );

    out.push_str("2. Subscription Funnel Status:\n   - Status: choose exactly ONE of:\n");
    for status in FunnelStatus::ALL {
        out.push_str(&format!("     - {}\n", status.label()));
    }
    out.push_str(
        "   - Reason: briefly explain which deals (pipelines/stages) led you to that conclusion.\n\n",
    );

    let levels = RiskLevel::ALL.map(RiskLevel::label).join(" / ");
    out.push_str(&format!(
        "3. Risk / Opportunity:\n   \
         - Risk Level: {levels}\n   \
         - Explanation: 1–2 sentences\n   \
         - Mention any obvious expansion/upsell opportunities:\n     \
         - more thermostats,\n     \
         - upgrade to annual,\n     \
         - reactivation campaigns, etc.\n\n"
    ));

    out.push_str(&format!(
        "4. Recommended Campaigns:\n   - Propose {CAMPAIGN_COUNT} targeted campaign ideas. For each:\n"
    ));
    for field in CAMPAIGN_FIELDS {
        out.push_str(&format!("     - {field}\n"));
    }
    out.push('\n');
    out
}

fn number_word(n: usize) -> String {
    match n {
        2 => "two".to_string(),
        3 => "three".to_string(),
        other => other.to_string(),
    }
}
