//! breezy-cli — admin client for the Breezy HTTP API
//!
//! Terminal counterpart of the admin panel: browse and create contacts and
//! deals, and generate AI customer insights.
//!
//! # Subcommands
//! - `contacts`                          — newest 50 contacts
//! - `create-contact --firstname … `     — create a contact (blank fields omitted)
//! - `deals [--contact <id>]`            — all deals, or the deals of one contact
//! - `create-deal --contact <id> …`      — create a deal linked to a contact
//! - `insight <contact-id>`              — AI insight for a contact
//! - `status`                            — server health

mod store;

use breezy_core::models::{Contact, Deal, ListEnvelope, Properties};
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use store::{ContactStore, NEWEST_LIMIT};

const DEFAULT_SERVER: &str = "http://127.0.0.1:3001";

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "breezy-cli",
    version,
    about = "Breezy admin client — contacts, deals and AI customer insights"
)]
struct Cli {
    /// Breezy HTTP server URL (overrides BREEZY_HTTP_URL env var)
    #[arg(long, env = "BREEZY_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    /// Print raw JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the newest contacts
    Contacts,

    /// Create a contact
    CreateContact(ContactFields),

    /// List deals, optionally only those associated with one contact
    Deals {
        #[arg(long)]
        contact: Option<String>,
    },

    /// Create a deal associated with a contact
    CreateDeal(DealFields),

    /// Generate an AI insight for a contact
    Insight {
        contact_id: String,
    },

    /// Show Breezy server status
    Status,
}

#[derive(Debug, Args)]
struct ContactFields {
    #[arg(long)]
    firstname: Option<String>,
    #[arg(long)]
    lastname: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    jobtitle: Option<String>,
    #[arg(long)]
    company: Option<String>,
}

#[derive(Debug, Args)]
struct DealFields {
    /// Contact to associate the deal with
    #[arg(long)]
    contact: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    amount: Option<String>,
    #[arg(long)]
    stage: Option<String>,
    #[arg(long)]
    pipeline: Option<String>,
    #[arg(long)]
    close_date: Option<String>,
}

/// Keep only non-blank fields, keyed by CRM property name.
fn properties(fields: &[(&str, &Option<String>)]) -> Properties {
    fields
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (key.to_string(), Value::String(v.to_string())))
        })
        .collect()
}

impl ContactFields {
    fn properties(&self) -> Properties {
        properties(&[
            ("firstname", &self.firstname),
            ("lastname", &self.lastname),
            ("email", &self.email),
            ("jobtitle", &self.jobtitle),
            ("company", &self.company),
        ])
    }
}

impl DealFields {
    fn properties(&self) -> Properties {
        properties(&[
            ("dealname", &self.name),
            ("amount", &self.amount),
            ("dealstage", &self.stage),
            ("pipeline", &self.pipeline),
            ("closedate", &self.close_date),
        ])
    }
}

// ============================================================================
// HTTP Client
// ============================================================================

/// Error body returned by the Breezy API.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

#[derive(Debug, Deserialize)]
struct InsightResponse {
    insight: String,
    funnel_status: Option<String>,
    risk_level: Option<String>,
}

struct ApiClient {
    http: reqwest::blocking::Client,
    server: String,
}

impl ApiClient {
    fn new(server: &str) -> anyhow::Result<Self> {
        Ok(Self {
            http: reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?,
            server: server.trim_end_matches('/').to_string(),
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> anyhow::Result<T> {
        let url = format!("{}{}", self.server, path);
        let resp = self
            .http
            .get(&url)
            .send()
            .map_err(|e| anyhow::anyhow!("connection failed to {}: {}", url, e))?;
        Self::decode(resp)
    }

    fn post<T: DeserializeOwned>(&self, path: &str, body: &Value) -> anyhow::Result<T> {
        let url = format!("{}{}", self.server, path);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .map_err(|e| anyhow::anyhow!("connection failed to {}: {}", url, e))?;
        Self::decode(resp)
    }

    fn decode<T: DeserializeOwned>(resp: reqwest::blocking::Response) -> anyhow::Result<T> {
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("server returned {}: {}", status, message);
        }
        serde_json::from_str(&body)
            .map_err(|e| anyhow::anyhow!("failed to parse server response: {}", e))
    }

    fn contacts(&self) -> anyhow::Result<ContactStore> {
        let listing: ListEnvelope<Contact> = self.get("/api/contacts")?;
        Ok(ContactStore::from_listing(listing))
    }

    fn deals_for_contact(&self, contact_id: &str) -> anyhow::Result<Vec<Deal>> {
        let listing: ListEnvelope<Deal> =
            self.get(&format!("/api/contacts/{}/deals", contact_id))?;
        Ok(listing.into_results())
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn cell(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

fn render_contacts(store: &ContactStore) -> String {
    if store.is_empty() {
        return "No contacts found".to_string();
    }
    let mut out = format!(
        "{:<12} {:<14} {:<14} {:<28} {:<20} {}\n",
        "ID", "FIRST", "LAST", "EMAIL", "JOB TITLE", "COMPANY"
    );
    for c in store.newest(NEWEST_LIMIT) {
        out.push_str(&format!(
            "{:<12} {:<14} {:<14} {:<28} {:<20} {}\n",
            c.id,
            cell(c.first_name()),
            cell(c.last_name()),
            cell(c.email()),
            cell(c.property("jobtitle")),
            cell(c.property("company")),
        ));
    }
    if store.len() > NEWEST_LIMIT {
        out.push_str(&format!("({} of {} contacts shown)\n", NEWEST_LIMIT, store.len()));
    }
    out
}

fn render_deals(deals: &[Deal]) -> String {
    if deals.is_empty() {
        return "No deals found".to_string();
    }
    let mut out = format!(
        "{:<12} {:<32} {:>10} {:<20} {}\n",
        "ID", "NAME", "AMOUNT", "STAGE", "PIPELINE"
    );
    for d in deals {
        let amount = d.amount().map(|a| format!("{:.2}", a)).unwrap_or_default();
        out.push_str(&format!(
            "{:<12} {:<32} {:>10} {:<20} {}\n",
            d.id,
            cell(d.name()),
            amount,
            cell(d.stage()),
            cell(d.pipeline()),
        ));
    }
    out
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Commands
// ============================================================================

fn do_insight(api: &ApiClient, contact_id: &str, json_output: bool) -> anyhow::Result<()> {
    let store = api.contacts()?;
    let Some(contact) = store.find(contact_id) else {
        anyhow::bail!("Contact not found.");
    };

    eprintln!("Analyzing customer journey for {}...", contact.display_name());
    let deals = api
        .deals_for_contact(contact_id)
        .map_err(|e| anyhow::anyhow!("Error loading deals: {}", e))?;

    let body = json!({ "contact": contact, "deals": deals });
    let resp: Value = api
        .post("/api/insights", &body)
        .map_err(|e| anyhow::anyhow!("AI error: {}", e))?;

    if json_output {
        return print_json(&resp);
    }

    let insight: InsightResponse = serde_json::from_value(resp)?;
    if let Some(status) = insight.funnel_status {
        eprintln!("funnel status: {}", status);
    }
    if let Some(risk) = insight.risk_level {
        eprintln!("risk level: {}", risk);
    }
    println!("{}", insight.insight);
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let api = ApiClient::new(&cli.server)?;

    match cli.command {
        Commands::Contacts => {
            let store = api.contacts()?;
            if cli.json {
                print_json(&store.newest(NEWEST_LIMIT))?;
            } else {
                print!("{}", render_contacts(&store));
            }
        }
        Commands::CreateContact(fields) => {
            let body = json!({ "properties": fields.properties() });
            let created: Contact = api.post("/api/contacts", &body)?;
            if cli.json {
                print_json(&created)?;
            } else {
                println!("✅ Contact synced successfully! ({})", created.id);
            }
        }
        Commands::Deals { contact } => {
            let deals = match contact {
                Some(id) => api.deals_for_contact(&id)?,
                None => api.get::<ListEnvelope<Deal>>("/api/deals")?.into_results(),
            };
            if cli.json {
                print_json(&deals)?;
            } else {
                print!("{}", render_deals(&deals));
            }
        }
        Commands::CreateDeal(fields) => {
            let body = json!({
                "dealProperties": fields.properties(),
                "contactId": fields.contact,
            });
            let created: Deal = api.post("/api/deals", &body)?;
            if cli.json {
                print_json(&created)?;
            } else {
                println!("✅ Deal created successfully! ({})", created.id);
            }
        }
        Commands::Insight { contact_id } => do_insight(&api, &contact_id, cli.json)?,
        Commands::Status => {
            let health: Value = api.get("/health")?;
            if cli.json {
                print_json(&health)?;
            } else {
                println!(
                    "{} ({})",
                    health["status"].as_str().unwrap_or("unknown"),
                    health["timestamp"].as_str().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("breezy-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
