//! NASK EPP CLI Application
//!
//! A command-line interface for the NASK (.pl) registry: domain availability
//! checks, contact checks and creation, and domain registration.
//! This CLI application drives the nask-epp-lib registrar façade.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args as ClapArgs, Parser, Subcommand};
use nask_epp_lib::{
    derive_contact_id, load_env_config, ConfigManager, ContactRecord, DomainCreateRequest,
    EnvConfig, FileConfig, Period, Registrant, Registrar, RegistrarSettings,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for nask-epp
#[derive(Parser, Debug)]
#[command(name = "nask-epp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "EPP client for the NASK (.pl) domain registry")]
#[command(
    long_about = "EPP client for the NASK (.pl) domain registry.\n\nChecks domain and contact availability, creates contacts and registers domains over mutual-TLS HTTPS. Every exchange is audit-logged with credentials redacted."
)]
#[command(styles = STYLES)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", global = true, help_heading = "Configuration")]
    pub config: Option<PathBuf>,

    /// Output results in JSON format
    #[arg(short = 'j', long = "json", global = true, help_heading = "Output Format")]
    pub json: bool,

    /// Log protocol frames and audit records (redacted)
    #[arg(short = 'd', long = "debug", global = true, help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", global = true, help_heading = "Configuration")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a name against one or more TLDs
    Check {
        /// Second-level label (e.g. "example")
        #[arg(value_name = "LABEL")]
        label: String,

        /// TLDs to check (comma-separated or multiple -t flags)
        #[arg(short = 't', long = "tld", value_name = "TLD", value_delimiter = ',', action = clap::ArgAction::Append, default_value = ".pl")]
        tlds: Vec<String>,

        /// Max check commands in flight (overrides config)
        #[arg(short = 'c', long = "concurrency")]
        concurrency: Option<usize>,
    },

    /// Check whether a contact identifier is free
    Contact {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Create a contact from a registrant JSON file
    CreateContact {
        #[command(flatten)]
        registrant: RegistrantArgs,

        /// Contact id to create (derived from --user-id when omitted)
        #[arg(long = "id", value_name = "ID")]
        id: Option<String>,
    },

    /// Register a domain
    Register {
        /// Domain name (Unicode or ASCII)
        #[arg(value_name = "DOMAIN")]
        domain: String,

        /// Existing registrant contact id
        #[arg(long = "contact", value_name = "ID", conflicts_with = "user_id")]
        contact: Option<String>,

        #[command(flatten)]
        registrant: OptionalRegistrantArgs,

        /// Registration period in years
        #[arg(long = "period", default_value = "1", value_parser = clap::value_parser!(u8).range(1..=10))]
        period: u8,

        /// Nameservers (comma-separated, at most 5)
        #[arg(long = "ns", value_name = "HOST", value_delimiter = ',', action = clap::ArgAction::Append)]
        nameservers: Vec<String>,
    },

    /// Print the contact id derived for a registrant
    ContactId {
        #[command(flatten)]
        registrant: RegistrantArgs,

        /// Contact prefix (overrides config)
        #[arg(long = "prefix", value_name = "PREFIX")]
        prefix: Option<String>,
    },
}

#[derive(ClapArgs, Debug)]
pub struct RegistrantArgs {
    /// Registrant details as JSON
    #[arg(long = "registrant", value_name = "FILE")]
    pub registrant: PathBuf,

    /// Host user id used in derived contact ids
    #[arg(long = "user-id", value_name = "USER_ID")]
    pub user_id: Option<String>,
}

#[derive(ClapArgs, Debug)]
pub struct OptionalRegistrantArgs {
    /// Registrant details as JSON; creates the contact when needed
    #[arg(long = "registrant", value_name = "FILE", requires = "user_id")]
    pub registrant: Option<PathBuf>,

    /// Host user id used in derived contact ids
    #[arg(long = "user-id", value_name = "USER_ID", requires = "registrant")]
    pub user_id: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let file_config = match load_file_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    let env_config = load_env_config(false);

    let config_debug = env_config
        .debug
        .or_else(|| file_config.registry.as_ref().and_then(|r| r.debug))
        .unwrap_or(false);
    init_tracing(args.debug || config_debug, args.verbose);
    tracing::info!("nask-epp v{} starting", env!("CARGO_PKG_VERSION"));

    match run(args, file_config, env_config).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Install the stderr subscriber; `RUST_LOG` wins over the flags.
fn init_tracing(debug: bool, verbose: bool) {
    let default_level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .init();
}

fn load_file_config(path: Option<&Path>) -> Result<FileConfig, Box<dyn std::error::Error>> {
    let manager = ConfigManager::new(false);
    let config = match path {
        Some(path) => manager.load_file(path)?,
        None => manager.discover_and_load()?,
    };
    Ok(config)
}

/// Run the selected command. `Ok(false)` means the registry said no.
async fn run(
    args: Args,
    file_config: FileConfig,
    env_config: EnvConfig,
) -> Result<bool, Box<dyn std::error::Error>> {
    if let Commands::ContactId { registrant, prefix } = &args.command {
        let prefix = prefix
            .clone()
            .or(env_config.contact_prefix)
            .or(file_config.registry.and_then(|r| r.contact_prefix))
            .unwrap_or_default();
        let user_id = registrant.user_id.as_deref().unwrap_or_default();
        let id = derive_contact_id(&prefix, user_id, &read_registrant(&registrant.registrant)?)?;
        ui::print_contact_id(&id, args.json)?;
        return Ok(true);
    }

    let mut settings = RegistrarSettings::resolve(&file_config, &env_config)?;
    settings.debug |= args.debug;
    if let Commands::Check {
        concurrency: Some(concurrency),
        ..
    } = &args.command
    {
        settings.chunk_concurrency = (*concurrency).max(1);
    }
    tracing::info!(
        host = settings.session.registry_host(),
        "registry settings resolved"
    );
    let registrar = Registrar::new(settings);

    match args.command {
        Commands::Check { label, tlds, .. } => {
            let report = registrar.check_domains_availability(&label, &tlds).await;
            ui::print_check_report(&report, args.json)?;
            Ok(true)
        }
        Commands::Contact { id } => {
            let availability = registrar.is_contact_available(&id).await;
            ui::print_contact_availability(&id, &availability, args.json)?;
            Ok(true)
        }
        Commands::CreateContact { registrant, id } => {
            let details = read_registrant(&registrant.registrant)?;
            let id = match (id, registrant.user_id) {
                (Some(id), _) => id,
                (None, Some(user_id)) => registrar.contact_id_for(&user_id, &details)?,
                (None, None) => return Err("either --id or --user-id is required".into()),
            };
            let contact = ContactRecord::from_registrant(id.clone(), &details);
            let outcome = registrar.create_contact(&contact).await;
            ui::print_outcome(&format!("contact {}", id), &outcome, args.json)?;
            Ok(outcome.is_success())
        }
        Commands::Register {
            domain,
            contact,
            registrant,
            period,
            nameservers,
        } => {
            let period = Period::years(period).ok_or("period must be at least one year")?;
            let mut request = DomainCreateRequest {
                domain_name: domain.clone(),
                registrant_contact_id: contact.unwrap_or_default(),
                period,
                nameservers,
            };

            let outcome = match (registrant.registrant, registrant.user_id) {
                (Some(path), Some(user_id)) => {
                    let details = read_registrant(&path)?;
                    registrar
                        .register_with_registrant(&user_id, &details, &request)
                        .await
                }
                _ if request.registrant_contact_id.is_empty() => {
                    return Err("either --contact or --registrant with --user-id is required".into())
                }
                _ => {
                    request.registrant_contact_id = request.registrant_contact_id.trim().to_string();
                    registrar.register_domain(&request).await
                }
            };
            ui::print_outcome(&format!("domain {}", domain), &outcome, args.json)?;
            Ok(outcome.is_success())
        }
        Commands::ContactId { .. } => Ok(true),
    }
}

/// Read registrant details from a JSON file.
fn read_registrant(path: &Path) -> Result<Registrant, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read registrant file '{}': {}", path.display(), e))?;
    let registrant = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid registrant file '{}': {}", path.display(), e))?;
    Ok(registrant)
}
