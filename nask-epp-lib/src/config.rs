//! Configuration loading and session settings.
//!
//! This module handles the registry connection settings: the validated
//! `SessionConfig` a transport session is built from, TOML configuration
//! files with precedence-based merging, and `NASK_*` environment overrides.

use crate::error::RegistryError;
use crate::protocols::ProtocolCapabilities;
use crate::types::Secret;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Production EPP endpoint of the registry.
pub const DEFAULT_REGISTRY_HOST: &str = "https://registry.dns.pl/registry/epp";

/// Ceiling on waiting for one response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Namespace served by the registry behind this transport.
pub const DEFAULT_SUPPORTED_SUFFIX: &str = ".pl";

/// Connection profile for one transport session.
///
/// Immutable after construction; all six connection fields are required.
#[derive(Clone)]
pub struct SessionConfig {
    registry_host: String,
    username: String,
    password: Secret,
    ca_cert_path: PathBuf,
    client_cert_path: PathBuf,
    private_key_path: PathBuf,
    timeout: Duration,
    capabilities: ProtocolCapabilities,
}

impl SessionConfig {
    /// Create a session configuration.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::ConfigError` naming the first empty field.
    pub fn new<P: Into<PathBuf>>(
        registry_host: &str,
        username: &str,
        password: &str,
        ca_cert_path: P,
        client_cert_path: P,
        private_key_path: P,
    ) -> Result<Self, RegistryError> {
        let config = Self {
            registry_host: registry_host.trim().to_string(),
            username: username.trim().to_string(),
            password: Secret::new(password),
            ca_cert_path: ca_cert_path.into(),
            client_cert_path: client_cert_path.into(),
            private_key_path: private_key_path.into(),
            timeout: DEFAULT_TIMEOUT,
            capabilities: ProtocolCapabilities::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let required = [
            ("registry host", self.registry_host.is_empty()),
            ("username", self.username.is_empty()),
            ("password", self.password.is_empty()),
            ("CA certificate path", is_blank(&self.ca_cert_path)),
            ("client certificate path", is_blank(&self.client_cert_path)),
            ("private key path", is_blank(&self.private_key_path)),
        ];

        if let Some((field, _)) = required.iter().find(|(_, missing)| *missing) {
            return Err(RegistryError::config(format!("{} is required", field)));
        }
        if !self.registry_host.starts_with("https://") && !self.registry_host.starts_with("http://") {
            return Err(RegistryError::config(format!(
                "registry host '{}' must be an http(s) URL",
                self.registry_host
            )));
        }
        Ok(())
    }

    /// Set the response timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a different protocol dialect.
    pub fn with_capabilities(mut self, capabilities: ProtocolCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn registry_host(&self) -> &str {
        &self.registry_host
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &Secret {
        &self.password
    }

    pub fn ca_cert_path(&self) -> &Path {
        &self.ca_cert_path
    }

    pub fn client_cert_path(&self) -> &Path {
        &self.client_cert_path
    }

    pub fn private_key_path(&self) -> &Path {
        &self.private_key_path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn capabilities(&self) -> &ProtocolCapabilities {
        &self.capabilities
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("registry_host", &self.registry_host)
            .field("username", &self.username)
            .field("password", &self.password)
            .field("ca_cert_path", &self.ca_cert_path)
            .field("client_cert_path", &self.client_cert_path)
            .field("private_key_path", &self.private_key_path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().to_string_lossy().trim().is_empty()
}

/// Fully resolved settings for a registrar façade.
#[derive(Debug, Clone)]
pub struct RegistrarSettings {
    pub session: SessionConfig,
    /// Registry-assigned contact id prefix
    pub contact_prefix: String,
    pub supported_suffix: String,
    /// Check chunks in flight at once; 1 keeps dispatch sequential
    pub chunk_concurrency: usize,
    pub debug: bool,
}

impl RegistrarSettings {
    /// Settings with defaults around an existing session configuration.
    pub fn new(session: SessionConfig) -> Self {
        Self {
            session,
            contact_prefix: String::new(),
            supported_suffix: DEFAULT_SUPPORTED_SUFFIX.to_string(),
            chunk_concurrency: 1,
            debug: false,
        }
    }

    /// Resolve settings from a merged file configuration and environment.
    ///
    /// Environment values win over file values.
    pub fn resolve(file: &FileConfig, env: &EnvConfig) -> Result<Self, RegistryError> {
        let registry = file.registry.clone().unwrap_or_default();

        let host = env
            .host
            .clone()
            .or(registry.host)
            .unwrap_or_else(|| DEFAULT_REGISTRY_HOST.to_string());
        let username = env.username.clone().or(registry.username).unwrap_or_default();
        let password = env.password.clone().or(registry.password).unwrap_or_default();
        let ca_cert = env.ca_cert.clone().or(registry.ca_cert).unwrap_or_default();
        let client_cert = env
            .client_cert
            .clone()
            .or(registry.client_cert)
            .unwrap_or_default();
        let private_key = env
            .private_key
            .clone()
            .or(registry.private_key)
            .unwrap_or_default();

        let timeout = match env.timeout.as_ref().or(registry.timeout.as_ref()) {
            Some(raw) => parse_timeout_string(raw)
                .map(Duration::from_secs)
                .ok_or_else(|| RegistryError::config(format!("Invalid timeout '{}'", raw)))?,
            None => DEFAULT_TIMEOUT,
        };

        let session = SessionConfig::new(
            &host,
            &username,
            &password,
            ca_cert,
            client_cert,
            private_key,
        )?
        .with_timeout(timeout);

        Ok(Self {
            session,
            contact_prefix: env
                .contact_prefix
                .clone()
                .or(registry.contact_prefix)
                .unwrap_or_default(),
            supported_suffix: registry
                .supported_suffix
                .unwrap_or_else(|| DEFAULT_SUPPORTED_SUFFIX.to_string()),
            chunk_concurrency: registry.chunk_concurrency.unwrap_or(1),
            debug: env.debug.or(registry.debug).unwrap_or(false),
        })
    }

    /// The validated session configuration.
    pub fn into_session_config(self) -> SessionConfig {
        self.session
    }
}

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistryFileConfig>,
}

/// `[registry]` section of a configuration file.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct RegistryFileConfig {
    /// EPP endpoint URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Mandatory contact id prefix assigned by the registry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_prefix: Option<String>,

    /// CA chain; relative paths are resolved against the file's directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_cert: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<PathBuf>,

    /// Response timeout (as string, e.g., "30s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_suffix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_concurrency: Option<usize>,
}

impl fmt::Debug for RegistryFileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryFileConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("contact_prefix", &self.contact_prefix)
            .field("ca_cert", &self.ca_cert)
            .field("client_cert", &self.client_cert)
            .field("private_key", &self.private_key)
            .field("timeout", &self.timeout)
            .field("debug", &self.debug)
            .field("supported_suffix", &self.supported_suffix)
            .field("chunk_concurrency", &self.chunk_concurrency)
            .finish()
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to log which files were picked up
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// Relative certificate paths are rewritten against the file's directory.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, RegistryError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(RegistryError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            RegistryError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let mut config: FileConfig = toml::from_str(&content)?;

        self.validate_config(&config)?;

        if let (Some(registry), Some(base)) = (config.registry.as_mut(), path.parent()) {
            for cert_path in [
                &mut registry.ca_cert,
                &mut registry.client_cert,
                &mut registry.private_key,
            ] {
                if let Some(p) = cert_path.as_mut() {
                    if p.is_relative() && !is_blank(p) {
                        *p = base.join(&*p);
                    }
                }
            }
        }

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is the lowest precedence, then the home directory file,
    /// then `./nask-epp.toml`.
    pub fn discover_and_load(&self) -> Result<FileConfig, RegistryError> {
        let mut merged_config = FileConfig::default();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            let config = self.load_file(&path)?;
            if self.verbose {
                tracing::info!(path = %path.display(), "loaded configuration file");
            }
            merged_config = self.merge_configs(merged_config, config);
        }

        Ok(merged_config)
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./nask-epp.toml", "./.nask-epp.toml"]
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".nask-epp.toml", "nask-epp.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|p| p.exists())
    }

    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("nask-epp").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations; values from `higher` win.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        let registry = match (lower.registry, higher.registry) {
            (Some(lower), Some(higher)) => Some(RegistryFileConfig {
                host: higher.host.or(lower.host),
                username: higher.username.or(lower.username),
                password: higher.password.or(lower.password),
                contact_prefix: higher.contact_prefix.or(lower.contact_prefix),
                ca_cert: higher.ca_cert.or(lower.ca_cert),
                client_cert: higher.client_cert.or(lower.client_cert),
                private_key: higher.private_key.or(lower.private_key),
                timeout: higher.timeout.or(lower.timeout),
                debug: higher.debug.or(lower.debug),
                supported_suffix: higher.supported_suffix.or(lower.supported_suffix),
                chunk_concurrency: higher.chunk_concurrency.or(lower.chunk_concurrency),
            }),
            (lower, higher) => higher.or(lower),
        };
        FileConfig { registry }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), RegistryError> {
        let Some(registry) = &config.registry else {
            return Ok(());
        };

        if let Some(timeout_str) = &registry.timeout {
            if parse_timeout_string(timeout_str).is_none() {
                return Err(RegistryError::config(format!(
                    "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                    timeout_str
                )));
            }
        }

        if let Some(concurrency) = registry.chunk_concurrency {
            if concurrency == 0 || concurrency > 16 {
                return Err(RegistryError::config(
                    "chunk_concurrency must be between 1 and 16",
                ));
            }
        }

        if let Some(prefix) = &registry.contact_prefix {
            if prefix.len() >= crate::types::MAX_CONTACT_ID_LEN {
                return Err(RegistryError::config(format!(
                    "contact_prefix '{}' is too long",
                    prefix
                )));
            }
        }

        if let Some(suffix) = &registry.supported_suffix {
            if suffix.trim().trim_matches('.').is_empty() {
                return Err(RegistryError::config("supported_suffix cannot be empty"));
            }
        }

        Ok(())
    }
}

/// Environment variable configuration (`NASK_*`).
#[derive(Clone, Default)]
pub struct EnvConfig {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub contact_prefix: Option<String>,
    pub ca_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub private_key: Option<PathBuf>,
    pub timeout: Option<String>,
    pub debug: Option<bool>,
}

impl fmt::Debug for EnvConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("contact_prefix", &self.contact_prefix)
            .field("ca_cert", &self.ca_cert)
            .field("client_cert", &self.client_cert)
            .field("private_key", &self.private_key)
            .field("timeout", &self.timeout)
            .field("debug", &self.debug)
            .finish()
    }
}

/// Load configuration from `NASK_*` environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config(verbose: bool) -> EnvConfig {
    let text = |name: &str| -> Option<String> {
        let value = env::var(name).ok()?;
        let value = value.trim().to_string();
        if value.is_empty() {
            return None;
        }
        if verbose {
            tracing::info!("using {}", name);
        }
        Some(value)
    };

    let mut env_config = EnvConfig {
        host: text("NASK_HOST"),
        username: text("NASK_USERNAME"),
        password: text("NASK_PASSWORD"),
        contact_prefix: text("NASK_PREFIX"),
        ca_cert: text("NASK_CA_CERT").map(PathBuf::from),
        client_cert: text("NASK_CERT").map(PathBuf::from),
        private_key: text("NASK_PRIVATE_KEY").map(PathBuf::from),
        timeout: None,
        debug: None,
    };

    if let Some(timeout_str) = text("NASK_TIMEOUT") {
        if parse_timeout_string(&timeout_str).is_some() {
            env_config.timeout = Some(timeout_str);
        } else {
            tracing::warn!(
                "Invalid NASK_TIMEOUT='{}', use format like '5s', '30s', '2m'",
                timeout_str
            );
        }
    }

    if let Some(val) = text("NASK_DEBUG") {
        env_config.debug = parse_bool(&val);
        if env_config.debug.is_none() {
            tracing::warn!("Invalid NASK_DEBUG='{}', use true/false", val);
        }
    }

    env_config
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a timeout string like "5s", "30s", "2m" into seconds.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let seconds = if let Some(s) = timeout_str.strip_suffix('s') {
        s.parse::<u64>().ok()
    } else if let Some(m) = timeout_str.strip_suffix('m') {
        m.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        // Assume seconds if no unit
        timeout_str.parse::<u64>().ok()
    };

    seconds.filter(|s| *s > 0)
}
