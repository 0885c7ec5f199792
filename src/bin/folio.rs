//! folio: portfolio data CLI
//!
//! Loads portfolio data through the caching layer and prints it as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use folio::{DataService, Domain, EmailJsSender, FolioConfig, LeadForm};

/// Folio portfolio data client
#[derive(Parser)]
#[command(name = "folio")]
#[command(version = folio::PKG_VERSION)]
#[command(about = "Fetch portfolio data through the route-aware cache")]
struct Args {
    /// Config file (default: <config dir>/folio/config.toml)
    #[arg(short, long, env = "FOLIO_CONFIG")]
    config: Option<PathBuf>,

    /// Route the data is loaded for; sets the cache context
    #[arg(short, long, default_value = "/")]
    route: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load every domain and print the snapshot
    Load,

    /// Load a single domain and print its section
    Section {
        /// Domain name (e.g. "skills", "projects")
        domain: Domain,
    },

    /// Load everything, then print per-service cache statistics
    Stats,

    /// Send a contact message through the configured mail service
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Message body
        message: String,
    },

    /// Print build information
    Version,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let config = FolioConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Version => {
            println!("folio {}", folio::version_string());
            println!("built {}", folio::version::BUILD_TIMESTAMP);
        }
        Command::Contact {
            name,
            email,
            message,
        } => {
            let Some(email_config) = config.email.as_ref() else {
                return Err("no [email] section in the configuration".into());
            };
            let form = LeadForm::new(Arc::new(EmailJsSender::new(email_config)), "cli");
            if let Err(e) = form.submit(&name, &email, &message).await {
                eprintln!("error: {}", folio::lead::user_message(&e));
                std::process::exit(1);
            }
            println!("{}", serde_json::to_string_pretty(&form.state())?);
        }
        Command::Load => {
            let data = service(&config, &args.route)?;
            let snapshot = data.load_all_data().await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Command::Section { domain } => {
            let data = service(&config, &args.route)?;
            let snapshot = data.refresh_section(domain).await;
            let section = match domain {
                Domain::Personal => serde_json::to_value(&snapshot.personal)?,
                Domain::Projects => serde_json::to_value(&snapshot.projects)?,
                Domain::Education => serde_json::to_value(&snapshot.education)?,
                Domain::Skills => serde_json::to_value(&snapshot.skills)?,
                Domain::Technologies => serde_json::to_value(&snapshot.technologies)?,
                Domain::Timeline => serde_json::to_value(&snapshot.timeline)?,
                Domain::Volunteer => serde_json::to_value(&snapshot.volunteer)?,
                Domain::Contact => serde_json::to_value(&snapshot.contact)?,
                Domain::Certificates => serde_json::to_value(&snapshot.certificates)?,
            };
            if let Some(error) = snapshot.errors.get(domain) {
                eprintln!("warning: {domain}: {error}");
            }
            println!("{}", serde_json::to_string_pretty(&section)?);
        }
        Command::Stats => {
            let data = service(&config, &args.route)?;
            data.load_all_data().await;
            println!("{}", serde_json::to_string_pretty(&data.cache_stats())?);
        }
    }

    Ok(())
}

fn service(config: &FolioConfig, route: &str) -> folio::Result<DataService> {
    let data = DataService::new(&config.service_context())?;
    // the sweep tasks end once `data` is dropped
    let _sweeps = data.start_cleanup();
    data.route_changed(route);
    Ok(data)
}
