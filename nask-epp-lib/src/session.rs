//! Transport session to the registry.
//!
//! A `Session` owns one authenticated connection profile. It logs in lazily
//! before the first command, exchanges one frame at a time, records every
//! exchange in the audit log and logs out when closed.
//!
//! The wire itself sits behind the `Transport` trait so the session can be
//! driven by the HTTPS client in production and by scripted transports in
//! tests.

use crate::audit::{AuditEntry, AuditSink};
use crate::config::SessionConfig;
use crate::error::RegistryError;
use crate::protocols::frame::{self, Command};
use crate::protocols::EppResponse;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Certificate, Identity};
use std::fs;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const HTTP_TIMEOUT_MARGIN: Duration = Duration::from_secs(2);

/// Carries one serialized frame to the registry and returns the raw reply.
pub trait Transport: Send + Sync {
    fn post(&self, body: String) -> impl Future<Output = Result<String, RegistryError>> + Send;
}

/// Opens transports for a connection profile.
pub trait Connect: Send + Sync {
    type Transport: Transport;

    fn connect(&self, config: &SessionConfig) -> Result<Self::Transport, RegistryError>;
}

/// Production connector: HTTPS POST with mutual TLS.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpsConnect;

impl Connect for HttpsConnect {
    type Transport = HttpsTransport;

    fn connect(&self, config: &SessionConfig) -> Result<HttpsTransport, RegistryError> {
        HttpsTransport::new(config)
    }
}

/// reqwest client holding the client identity, CA chain and session cookie.
#[derive(Clone)]
pub struct HttpsTransport {
    http_client: reqwest::Client,
    url: String,
}

impl HttpsTransport {
    /// Build the client from the PEM files named in the configuration.
    ///
    /// # Errors
    ///
    /// `FileError` when a certificate or key cannot be read, `Transport`
    /// when the TLS material is rejected.
    pub fn new(config: &SessionConfig) -> Result<Self, RegistryError> {
        let ca = read_pem(config.ca_cert_path())?;
        let mut identity_pem = read_pem(config.client_cert_path())?;
        identity_pem.push(b'\n');
        identity_pem.extend(read_pem(config.private_key_path())?);

        let root = Certificate::from_pem(&ca).map_err(|e| {
            RegistryError::transport_with_source("Invalid CA certificate", e.to_string())
        })?;
        let identity = Identity::from_pem(&identity_pem).map_err(|e| {
            RegistryError::transport_with_source("Invalid client certificate or key", e.to_string())
        })?;

        let http_client = reqwest::Client::builder()
            .use_rustls_tls()
            .add_root_certificate(root)
            .identity(identity)
            .cookie_store(true)
            .timeout(http_timeout(config.timeout()))
            .build()
            .map_err(|e| {
                RegistryError::transport_with_source(
                    "Failed to create registry HTTPS client",
                    e.to_string(),
                )
            })?;

        Ok(Self {
            http_client,
            url: config.registry_host().to_string(),
        })
    }
}

/// The HTTP client gets a margin over the exchange ceiling so that
/// `Session` reports the timeout with the configured duration.
fn http_timeout(timeout: Duration) -> Duration {
    timeout.saturating_add(HTTP_TIMEOUT_MARGIN)
}

impl Transport for HttpsTransport {
    async fn post(&self, body: String) -> Result<String, RegistryError> {
        let response = self
            .http_client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/xml; charset=UTF-8")
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>, RegistryError> {
    fs::read(path).map_err(|e| RegistryError::file_error(path.to_string_lossy(), e.to_string()))
}

/// One logical conversation with the registry.
pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    audit: Arc<dyn AuditSink>,
    logged_in: bool,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, config: SessionConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            transport,
            config,
            audit,
            logged_in: false,
        }
    }

    /// Send a command and parse the response.
    ///
    /// Logs in first if this is the session's first command. A registry
    /// failure code is returned as a parsed response; only login failures,
    /// transport errors and undecodable replies come back as `Err`.
    pub async fn request(&mut self, command: &Command) -> Result<EppResponse, RegistryError> {
        if !self.logged_in {
            let login = frame::login(self.config.username(), self.config.password().expose());
            self.exchange(&login).await?.into_success()?;
            self.logged_in = true;
        }
        self.exchange(command).await
    }

    /// Log out if logged in. Failures are logged and otherwise ignored.
    pub async fn close(mut self) {
        if !self.logged_in {
            return;
        }
        self.logged_in = false;
        if let Err(e) = self.exchange(&Command::Logout).await {
            tracing::warn!("logout failed: {}", e);
        }
    }

    async fn exchange(&mut self, command: &Command) -> Result<EppResponse, RegistryError> {
        let request = command.to_xml(self.config.capabilities())?;
        tracing::debug!(operation = command.name(), "sending frame");

        let timeout = self.config.timeout();
        let raw = match tokio::time::timeout(timeout, self.transport.post(request.clone())).await {
            Ok(result) => result,
            Err(_) => Err(RegistryError::timeout(command.name(), timeout)),
        };

        let parsed = raw
            .as_ref()
            .map_err(Clone::clone)
            .and_then(|body| EppResponse::parse(body));

        let result = match &parsed {
            Ok(response) => format!("{} {}", response.code, response.message),
            Err(e) => e.to_string(),
        };
        let mut secrets = command.secrets();
        secrets.push(("password", self.config.password().expose()));
        secrets.push(("username", self.config.username()));
        self.audit.record(AuditEntry::new(
            command.name(),
            &request,
            raw.as_deref().unwrap_or_default(),
            &result,
            &secrets,
        ));

        parsed
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    pub(crate) const OK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<epp xmlns="http://www.dns.pl/nask-epp-schema/epp-2.1"><response><result code="1000"><msg>Command completed successfully</msg></result></response></epp>"#;

    /// Replays canned replies in order and records every sent frame.
    #[derive(Clone, Default)]
    pub(crate) struct Scripted {
        replies: Arc<Mutex<VecDeque<Result<String, RegistryError>>>>,
        pub(crate) sent: Arc<Mutex<Vec<String>>>,
        delay: Option<Duration>,
    }

    impl Scripted {
        pub(crate) fn new(replies: Vec<Result<String, RegistryError>>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                ..Default::default()
            }
        }

        pub(crate) fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Transport for Scripted {
        async fn post(&self, body: String) -> Result<String, RegistryError> {
            self.sent.lock().unwrap().push(body);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let next = self.replies.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(OK.to_string()))
        }
    }

    pub(crate) fn config() -> SessionConfig {
        SessionConfig::new(
            "https://registry.example/epp",
            "registrar",
            "s3cret-pass",
            "ca.pem",
            "cert.pem",
            "key.pem",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_login_precedes_first_command_only() {
        let transport = Scripted::new(vec![]);
        let log = MemoryAuditLog::new();
        let mut session = Session::new(transport.clone(), config(), Arc::new(log.clone()));

        let check = frame::check_contact("ABC42").unwrap();
        session.request(&check).await.unwrap();
        session.request(&check).await.unwrap();
        session.close().await;

        let sent = transport.sent();
        assert_eq!(sent.len(), 4);
        assert!(sent[0].contains("<login>"));
        assert!(sent[1].contains("<contact:check"));
        assert!(sent[2].contains("<contact:check"));
        assert!(sent[3].contains("<logout"));

        let operations: Vec<String> = log.entries().into_iter().map(|e| e.operation).collect();
        assert_eq!(
            operations,
            vec!["login", "contact:check", "contact:check", "logout"]
        );
    }

    #[tokio::test]
    async fn test_password_never_reaches_audit_log() {
        let transport = Scripted::new(vec![]);
        let log = MemoryAuditLog::new();
        let mut session = Session::new(transport.clone(), config(), Arc::new(log.clone()));

        session
            .request(&frame::check_contact("ABC42").unwrap())
            .await
            .unwrap();

        assert!(transport.sent()[0].contains("s3cret-pass"));
        assert!(transport.sent()[0].contains("<clID>registrar</clID>"));
        let entries = log.entries();
        assert_eq!(entries[0].operation, "login");
        assert!(entries[0].request.contains("<clID>********</clID>"));
        for entry in entries {
            assert!(!entry.request.contains("s3cret-pass"));
            assert!(!entry.request.contains("registrar"));
            assert!(entry.redacted_fields.contains(&"password".to_string()));
            assert!(entry.redacted_fields.contains(&"username".to_string()));
        }
    }

    #[tokio::test]
    async fn test_login_failure_stops_the_command() {
        let rejected = OK.replace("1000", "2200").replace(
            "Command completed successfully",
            "Authentication error",
        );
        let transport = Scripted::new(vec![Ok(rejected)]);
        let mut session = Session::new(
            transport.clone(),
            config(),
            Arc::new(MemoryAuditLog::new()),
        );

        let err = session
            .request(&frame::check_contact("ABC42").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(2200));
        session.close().await;

        // no command and no logout after a rejected login
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_is_audited() {
        let transport = Scripted::new(vec![Err(RegistryError::transport("connection refused"))]);
        let log = MemoryAuditLog::new();
        let mut session = Session::new(transport, config(), Arc::new(log.clone()));

        let err = session
            .request(&frame::check_contact("ABC42").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_transport());

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].result.contains("connection refused"));
        assert_eq!(entries[0].response, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_registry_times_out() {
        let transport = Scripted {
            delay: Some(Duration::from_secs(60)),
            ..Default::default()
        };
        let config = config().with_timeout(Duration::from_secs(5));
        let mut session = Session::new(transport, config, Arc::new(MemoryAuditLog::new()));

        let err = session
            .request(&frame::check_contact("ABC42").unwrap())
            .await
            .unwrap_err();
        assert!(
            matches!(err, RegistryError::Timeout { duration, .. } if duration == Duration::from_secs(5))
        );
    }

    #[test]
    fn test_http_client_outlasts_exchange_ceiling() {
        assert_eq!(http_timeout(Duration::from_secs(5)), Duration::from_secs(7));
        assert!(http_timeout(Duration::from_secs(30)) > Duration::from_secs(30));
        assert_eq!(http_timeout(Duration::MAX), Duration::MAX);
    }

    #[test]
    fn test_missing_certificate_is_file_error() {
        let err = HttpsConnect.connect(&config()).err().unwrap();
        assert!(matches!(err, RegistryError::FileError { .. }));
    }

    #[test]
    fn test_garbage_reply_is_data_error() {
        let transport = Scripted::new(vec![Ok(OK.to_string()), Ok("<html>oops</html>".into())]);
        let mut session = Session::new(transport, config(), Arc::new(MemoryAuditLog::new()));

        let result = tokio_test::block_on(session.request(&frame::check_contact("ABC42").unwrap()));
        assert!(matches!(result, Err(RegistryError::Data { .. })));
    }
}
