//! Registrar operation façade.
//!
//! This module provides the `Registrar` struct that turns high-level registrar
//! operations into registry exchanges and hands back plain result records.

use crate::audit::{AuditSink, TracingAuditSink};
use crate::batch;
use crate::config::{RegistrarSettings, SessionConfig};
use crate::error::RegistryError;
use crate::protocols::frame::{self, Command};
use crate::protocols::{contact_availability, decode_domain_check, ensure_created, EppResponse};
use crate::session::{Connect, HttpsConnect, Session};
use crate::types::{
    CheckReport, ContactAvailability, ContactRecord, Created, DomainCreateRequest,
    OperationOutcome, Registrant,
};
use crate::utils::derive_contact_id;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Entry point for registrar operations against the registry.
///
/// Every operation opens its own session, so a `Registrar` can be shared
/// freely between tasks. None of the operations return `Err`: failures come
/// back inside the plain result shapes.
///
/// # Example
///
/// ```rust,no_run
/// use nask_epp_lib::{Registrar, RegistrarSettings, SessionConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let session = SessionConfig::new(
///         "https://registry.dns.pl/registry/epp",
///         "registrar-login",
///         "registrar-password",
///         "/etc/nask/root_ca.pem",
///         "/etc/nask/cert.pem",
///         "/etc/nask/key.pem",
///     )?;
///     let registrar = Registrar::new(RegistrarSettings::new(session));
///
///     let report = registrar
///         .check_domains_availability("example", &[".pl".into(), ".com.pl".into()])
///         .await;
///     for result in report.entries() {
///         println!("{}: {}", result.key, result.availability);
///     }
///     Ok(())
/// }
/// ```
pub struct Registrar<K: Connect = HttpsConnect> {
    settings: RegistrarSettings,
    connector: K,
    audit: Arc<dyn AuditSink>,
}

impl Registrar<HttpsConnect> {
    /// Create a registrar talking HTTPS to the configured registry.
    ///
    /// Exchanges are audited through `tracing`; with `debug` set the audit
    /// records carry the redacted frames as well.
    pub fn new(settings: RegistrarSettings) -> Self {
        Self::with_connector(settings, HttpsConnect)
    }

    /// Shorthand for a registrar with default settings around `config`.
    pub fn from_session_config(config: SessionConfig) -> Self {
        Self::new(RegistrarSettings::new(config))
    }
}

impl<K: Connect> Registrar<K> {
    /// Create a registrar with a custom transport connector.
    pub fn with_connector(settings: RegistrarSettings, connector: K) -> Self {
        let audit = Arc::new(TracingAuditSink::new(settings.debug));
        Self {
            settings,
            connector,
            audit,
        }
    }

    /// Send audit records to `sink` instead of `tracing`.
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn settings(&self) -> &RegistrarSettings {
        &self.settings
    }

    /// Whether a contact identifier is free at the registry.
    ///
    /// Anything short of a definite answer is `Unknown`.
    pub async fn is_contact_available(&self, contact_id: &str) -> ContactAvailability {
        let command = match frame::check_contact(contact_id) {
            Ok(command) => command,
            Err(e) => {
                return ContactAvailability::Unknown {
                    reason: e.to_string(),
                }
            }
        };
        contact_availability(self.execute(command).await, contact_id)
    }

    /// Create a contact object.
    pub async fn create_contact(&self, contact: &ContactRecord) -> OperationOutcome {
        self.try_create_contact(contact).await.into()
    }

    /// Register a domain for an existing registrant contact.
    pub async fn register_domain(&self, request: &DomainCreateRequest) -> OperationOutcome {
        self.try_register_domain(request).await.into()
    }

    /// Check one label against a list of TLDs.
    ///
    /// TLDs outside the supported suffix are reported as `UnsupportedTld`
    /// without touching the network.
    pub async fn check_domains_availability(&self, label: &str, tlds: &[String]) -> CheckReport {
        let plan = batch::plan(label, tlds, &self.settings.supported_suffix);
        if plan.chunks.is_empty() {
            return plan.report;
        }

        // Each chunk in flight borrows an idle session or opens a new one.
        let idle: Mutex<Vec<Session<K::Transport>>> = Mutex::new(Vec::new());
        let pool = &idle;
        let report = batch::run(plan, self.settings.chunk_concurrency, move |names| async move {
            let command = frame::check_domain(&names)?;
            let reused = lock(pool).pop();
            let mut session = match reused {
                Some(session) => session,
                None => self.open()?,
            };

            let exchange = session.request(&command).await;
            if !matches!(&exchange, Err(e) if e.is_transport()) {
                lock(pool).push(session);
            }
            decode_domain_check(&exchange?.into_success()?)
        })
        .await;

        for session in idle.into_inner().unwrap_or_else(PoisonError::into_inner) {
            session.close().await;
        }

        report
    }

    /// Derive the registry contact id for a host user.
    pub fn contact_id_for(&self, user_id: &str, registrant: &Registrant) -> Result<String, RegistryError> {
        derive_contact_id(&self.settings.contact_prefix, user_id, registrant)
    }

    /// Full registration flow for a host user.
    ///
    /// Derives the user's contact id, creates the contact if the registry
    /// reports it free, then registers the domain with that contact as
    /// registrant. A contact the registry already holds is reused.
    pub async fn register_with_registrant(
        &self,
        user_id: &str,
        registrant: &Registrant,
        request: &DomainCreateRequest,
    ) -> OperationOutcome {
        let contact_id = match self.contact_id_for(user_id, registrant) {
            Ok(id) => id,
            Err(e) => return OperationOutcome::error(e.user_message(), e.code()),
        };

        match self.is_contact_available(&contact_id).await {
            ContactAvailability::Available => {
                let contact = ContactRecord::from_registrant(contact_id.clone(), registrant);
                if let Err(e) = self.try_create_contact(&contact).await {
                    return OperationOutcome::error(e.user_message(), e.code());
                }
            }
            ContactAvailability::Taken => {
                tracing::debug!(contact = %contact_id, "reusing existing registrant contact");
            }
            ContactAvailability::Unknown { reason } => {
                return OperationOutcome::error(
                    format!("Could not verify contact {}: {}", contact_id, reason),
                    None,
                );
            }
        }

        let request = DomainCreateRequest {
            registrant_contact_id: contact_id,
            ..request.clone()
        };
        self.register_domain(&request).await
    }

    async fn try_create_contact(&self, contact: &ContactRecord) -> Result<Created, RegistryError> {
        let command = frame::create_contact(contact)?;
        ensure_created(self.execute(command).await?)
    }

    async fn try_register_domain(&self, request: &DomainCreateRequest) -> Result<Created, RegistryError> {
        let command = frame::create_domain(
            &request.domain_name,
            &request.registrant_contact_id,
            request.period,
            &request.nameservers,
        )?;
        ensure_created(self.execute(command).await?)
    }

    /// One command on a fresh session.
    async fn execute(&self, command: Command) -> Result<EppResponse, RegistryError> {
        let mut session = self.open()?;
        let result = session.request(&command).await;
        session.close().await;
        result
    }

    fn open(&self) -> Result<Session<K::Transport>, RegistryError> {
        let transport = self.connector.connect(&self.settings.session)?;
        Ok(Session::new(
            transport,
            self.settings.session.clone(),
            self.audit.clone(),
        ))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::session::tests::{config, Scripted, OK};
    use crate::types::{Availability, Period};

    struct ScriptedConnect(Scripted);

    impl Connect for ScriptedConnect {
        type Transport = Scripted;

        fn connect(&self, _config: &SessionConfig) -> Result<Scripted, RegistryError> {
            Ok(self.0.clone())
        }
    }

    fn registrar(transport: &Scripted) -> (Registrar<ScriptedConnect>, MemoryAuditLog) {
        let log = MemoryAuditLog::new();
        let mut settings = RegistrarSettings::new(config());
        settings.contact_prefix = "ABC".to_string();
        let registrar = Registrar::with_connector(settings, ScriptedConnect(transport.clone()))
            .with_audit_sink(Arc::new(log.clone()));
        (registrar, log)
    }

    fn failure(code: u32, message: &str) -> Result<String, RegistryError> {
        Ok(OK
            .replace("1000", &code.to_string())
            .replace("Command completed successfully", message))
    }

    #[tokio::test]
    async fn test_register_drops_empty_nameservers() {
        let transport = Scripted::new(vec![]);
        let (registrar, _) = registrar(&transport);

        let outcome = registrar
            .register_domain(&DomainCreateRequest {
                domain_name: "test.pl".to_string(),
                registrant_contact_id: "ABC42".to_string(),
                period: Period::years(1).unwrap(),
                nameservers: vec!["ns1.example.pl".to_string(), "".to_string()],
            })
            .await;
        assert!(outcome.is_success());

        let sent = transport.sent();
        let create = sent.iter().find(|f| f.contains("<domain:create")).unwrap();
        assert_eq!(create.matches("<domain:ns>").count(), 1);
        assert!(create.contains("<domain:period unit=\"y\">1</domain:period>"));
    }

    #[tokio::test]
    async fn test_create_contact_failure_carries_code() {
        let transport = Scripted::new(vec![Ok(OK.to_string()), failure(2302, "Object exists")]);
        let (registrar, _) = registrar(&transport);

        let contact = ContactRecord::from_registrant("ABC42x", &Registrant {
            full_name: "Jan Kowalski".into(),
            email: "jan@example.pl".into(),
            address1: "ul. Prosta 1".into(),
            city: "Warszawa".into(),
            postcode: "00-001".into(),
            country_code: "PL".into(),
            phone: "+48.123456789".into(),
            ..Default::default()
        });
        let outcome = registrar.create_contact(&contact).await;
        assert_eq!(outcome, OperationOutcome::error("Object exists", Some(2302)));
    }

    #[tokio::test]
    async fn test_invalid_contact_never_reaches_network() {
        let transport = Scripted::new(vec![]);
        let (registrar, log) = registrar(&transport);

        let mut contact = ContactRecord::from_registrant("ABC42", &Registrant::default());
        contact.street_lines = vec!["".to_string()];

        assert!(!registrar.create_contact(&contact).await.is_success());
        assert!(transport.sent().is_empty());
        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_only_batch_opens_no_session() {
        let transport = Scripted::new(vec![]);
        let (registrar, _) = registrar(&transport);

        let report = registrar
            .check_domains_availability("example", &[".com".into(), ".de".into()])
            .await;
        assert_eq!(report.count(Availability::UnsupportedTld), 2);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_sequential_batch_reuses_one_session() {
        let tlds: Vec<String> = (0..25).map(|i| format!(".x{}.pl", i)).collect();
        let transport = Scripted::new(vec![]);
        let (registrar, _) = registrar(&transport);

        // the default OK reply has no check data, so every chunk fails
        let report = registrar.check_domains_availability("example", &tlds).await;
        assert_eq!(report.count(Availability::Error), 25);

        let sent = transport.sent();
        assert_eq!(sent.iter().filter(|f| f.contains("<login>")).count(), 1);
        assert_eq!(sent.iter().filter(|f| f.contains("<domain:check")).count(), 2);
        assert_eq!(sent.iter().filter(|f| f.contains("<logout")).count(), 1);
    }
}
