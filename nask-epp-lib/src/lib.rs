//! # NASK EPP Library
//!
//! An EPP client for the NASK (.pl) domain registry, talking to the registry
//! over HTTPS with mutual TLS.
//!
//! The library translates registrar operations into EPP frames, exchanges
//! them on an authenticated session, and turns the responses back into plain
//! result records. Every exchange is written to an audit log with credentials
//! redacted.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nask_epp_lib::{load_env_config, ConfigManager, Registrar, RegistrarSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = ConfigManager::new(false).discover_and_load()?;
//!     let settings = RegistrarSettings::resolve(&file, &load_env_config(false))?;
//!     let registrar = Registrar::new(settings);
//!
//!     let contact = registrar.is_contact_available("ABC42xyz").await;
//!     println!("contact free: {}", contact.is_available());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Batched checks**: one label against many TLDs, at most 20 names per command
//! - **Claims window**: reason code 9072 is reported as available
//! - **Contact ids**: stable ids derived from registrant details
//! - **Audit log**: every exchange recorded, passwords and auth-info masked

// Re-export main public API types and functions
pub use audit::{AuditEntry, AuditSink, MemoryAuditLog, TracingAuditSink, AUDIT_COMPONENT};
pub use config::{
    load_env_config, parse_timeout_string, ConfigManager, EnvConfig, FileConfig,
    RegistrarSettings, RegistryFileConfig, SessionConfig, DEFAULT_REGISTRY_HOST,
};
pub use error::RegistryError;
pub use protocols::{ProtocolCapabilities, CLAIMS_WINDOW_REASON};
pub use registrar::Registrar;
pub use session::{Connect, HttpsConnect, HttpsTransport, Session, Transport};
pub use types::{
    Availability, CheckItem, CheckReport, CheckResult, ContactAvailability, ContactRecord,
    Created, DomainCreateRequest, OperationOutcome, Period, Registrant, Secret,
};
pub use utils::{derive_contact_id, normalize_tld};

// Public modules
pub mod batch;
pub mod protocols;

// Internal modules - re-exported above
mod audit;
mod config;
mod error;
mod registrar;
mod session;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, RegistryError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

/// Get library information for debugging or display purposes.
pub fn info() -> LibraryInfo {
    let caps = ProtocolCapabilities::default();
    LibraryInfo {
        version: VERSION,
        author: AUTHOR,
        epp_version: caps.version,
        services: caps.services.iter().map(|s| s.prefix).collect(),
    }
}

/// Information about the library build and the protocol dialect it speaks
#[derive(Debug, Clone)]
pub struct LibraryInfo {
    pub version: &'static str,
    pub author: &'static str,
    pub epp_version: &'static str,
    pub services: Vec<&'static str>,
}
