use std::sync::Arc;
use std::time::Duration;

use breezy_core::{BreezyConfig, CrmBackend, HubSpotClient, InsightService};
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use breezy_server::http::{self, AppState};
use breezy_server::shutdown;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "breezy.toml")]
    config: String,

    /// Probe HubSpot with the configured token and exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match BreezyConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    let crm = match HubSpotClient::new(&config.crm) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ ERROR: {}", e);
            eprintln!("Please create a .env file and add your HubSpot Private App token");
            std::process::exit(1);
        }
    };

    let insights = InsightService::from_config(&config.ai)?;

    if args.health {
        match crm.list_contacts().await {
            Ok(list) => println!("✅ HubSpot reachable ({} contacts on first page)", list.len()),
            Err(e) => {
                println!("❌ HubSpot check failed: {}", e);
                std::process::exit(1);
            }
        }
        if insights.is_configured() {
            println!("✅ AI insights configured ({})", config.ai.model);
        } else {
            println!("⚠️  AI insights disabled: GEMINI_API_KEY not set");
        }
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let grace = Duration::from_secs(config.http.shutdown_grace_seconds);
    tokio::spawn(shutdown::on_signal(tx.clone(), grace));

    let state = Arc::new(AppState {
        crm: Arc::new(crm),
        insights,
        config,
    });

    http::start_http_server(state, tx.subscribe()).await?;

    tracing::info!("Server closed successfully");
    Ok(())
}
