// nask-epp-lib/tests/integration.rs

//! Integration tests driving the registrar façade through a scripted registry

use nask_epp_lib::{
    derive_contact_id, Availability, Connect, ContactAvailability, DomainCreateRequest,
    MemoryAuditLog, OperationOutcome, Period, Registrant, Registrar, RegistrarSettings,
    RegistryError, SessionConfig, Transport,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const PASSWORD: &str = "Registrar-Pa55";

type Responder = dyn Fn(&str, usize) -> Result<String, RegistryError> + Send + Sync;

/// Fake registry: answers each frame through a responder and keeps every
/// frame it saw. The second argument to the responder counts check frames.
#[derive(Clone)]
struct FakeRegistry {
    responder: Arc<Responder>,
    sent: Arc<Mutex<Vec<String>>>,
    checks: Arc<AtomicUsize>,
}

impl FakeRegistry {
    fn new<F>(responder: F) -> Self
    where
        F: Fn(&str, usize) -> Result<String, RegistryError> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            sent: Arc::new(Mutex::new(Vec::new())),
            checks: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn frames_containing(&self, needle: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|frame| frame.contains(needle))
            .collect()
    }
}

impl Transport for FakeRegistry {
    async fn post(&self, body: String) -> Result<String, RegistryError> {
        // let concurrent chunks interleave like real network calls
        tokio::task::yield_now().await;
        self.sent.lock().unwrap().push(body.clone());
        let n = if body.contains("<domain:check") {
            self.checks.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            0
        };
        (self.responder)(&body, n)
    }
}

impl Connect for FakeRegistry {
    type Transport = FakeRegistry;

    fn connect(&self, _config: &SessionConfig) -> Result<FakeRegistry, RegistryError> {
        Ok(self.clone())
    }
}

fn result_frame(code: u32, message: &str, res_data: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<epp xmlns="http://www.dns.pl/nask-epp-schema/epp-2.1">
  <response>
    <result code="{}"><msg>{}</msg></result>
    {}
    <trID><svTRID>TEST-1</svTRID></trID>
  </response>
</epp>"#,
        code, message, res_data
    )
}

fn ok() -> Result<String, RegistryError> {
    Ok(result_frame(1000, "Command completed successfully", ""))
}

fn contact_check_reply(avail: bool, id: &str) -> Result<String, RegistryError> {
    Ok(result_frame(
        1000,
        "Command completed successfully",
        &format!(
            r#"<resData><contact:chkData xmlns:contact="http://www.dns.pl/nask-epp-schema/contact-2.1"><contact:cd><contact:id avail="{}">{}</contact:id></contact:cd></contact:chkData></resData>"#,
            if avail { 1 } else { 0 },
            id
        ),
    ))
}

fn element_texts(frame: &str, tag: &str) -> Vec<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    frame
        .split(open.as_str())
        .skip(1)
        .filter_map(|part| part.split(close.as_str()).next())
        .map(str::to_string)
        .collect()
}

fn names_in(frame: &str) -> Vec<String> {
    element_texts(frame, "domain:name")
}

/// Domain check reply: names starting with "free" are available, names
/// containing "claims" carry reason 9072, everything else is registered.
fn domain_check_reply(frame: &str) -> Result<String, RegistryError> {
    let items: String = names_in(frame)
        .iter()
        .map(|name| {
            let avail = name.starts_with("free");
            let reason = if name.contains("claims") {
                r#"<domain:reason code="9072">claims window expired</domain:reason>"#
            } else {
                ""
            };
            format!(
                r#"<domain:cd><domain:name avail="{}">{}</domain:name>{}</domain:cd>"#,
                if avail { 1 } else { 0 },
                name,
                reason
            )
        })
        .collect();
    Ok(result_frame(
        1000,
        "Command completed successfully",
        &format!(
            r#"<resData><domain:chkData xmlns:domain="http://www.dns.pl/nask-epp-schema/domain-2.1">{}</domain:chkData></resData>"#,
            items
        ),
    ))
}

fn settings() -> RegistrarSettings {
    let session = SessionConfig::new(
        "https://registry.example/epp",
        "registrar",
        PASSWORD,
        "ca.pem",
        "cert.pem",
        "key.pem",
    )
    .unwrap();
    let mut settings = RegistrarSettings::new(session);
    settings.contact_prefix = "ABC".to_string();
    settings
}

fn registrar(registry: &FakeRegistry) -> (Registrar<FakeRegistry>, MemoryAuditLog) {
    let log = MemoryAuditLog::new();
    let registrar = Registrar::with_connector(settings(), registry.clone())
        .with_audit_sink(Arc::new(log.clone()));
    (registrar, log)
}

fn registrant() -> Registrant {
    Registrant {
        full_name: "Jan Kowalski".to_string(),
        company: None,
        email: "jan@example.pl".to_string(),
        address1: "ul. Prosta 1".to_string(),
        address2: Some("lok. 2".to_string()),
        address3: None,
        city: "Warszawa".to_string(),
        province: None,
        postcode: "00-001".to_string(),
        country_code: "PL".to_string(),
        phone: "+48.123456789".to_string(),
    }
}

fn domain_request(name: &str) -> DomainCreateRequest {
    DomainCreateRequest {
        domain_name: name.to_string(),
        registrant_contact_id: String::new(),
        period: Period::years(1).unwrap(),
        nameservers: vec!["ns1.example.pl".to_string(), "".to_string()],
    }
}

#[tokio::test]
async fn test_contact_availability_answers() {
    let registry = FakeRegistry::new(|frame, _| {
        if frame.contains("<contact:check") {
            contact_check_reply(frame.contains("FREE"), "X")
        } else {
            ok()
        }
    });
    let (registrar, _) = registrar(&registry);

    assert_eq!(
        registrar.is_contact_available("ABCFREE1").await,
        ContactAvailability::Available
    );
    assert_eq!(
        registrar.is_contact_available("ABCTAKEN1").await,
        ContactAvailability::Taken
    );
}

#[tokio::test]
async fn test_contact_unavailable_when_registry_unreachable() {
    let registry = FakeRegistry::new(|_, _| Err(RegistryError::transport("connection refused")));
    let (registrar, log) = registrar(&registry);

    let availability = registrar.is_contact_available("ABC42").await;
    assert!(!availability.is_available());
    assert!(matches!(availability, ContactAvailability::Unknown { .. }));

    // only the login was attempted
    assert_eq!(log.entries().len(), 1);
}

#[tokio::test]
async fn test_batch_sends_one_frame_per_twenty_names() {
    let registry = FakeRegistry::new(|frame, _| {
        if frame.contains("<domain:check") {
            domain_check_reply(frame)
        } else {
            ok()
        }
    });
    let (registrar, _) = registrar(&registry);

    let mut tlds: Vec<String> = (0..45).map(|i| format!(".z{}.pl", i)).collect();
    tlds.push(".com".to_string());
    tlds.push(".eu".to_string());

    let report = registrar.check_domains_availability("example", &tlds).await;

    assert_eq!(registry.frames_containing("<domain:check").len(), 3);
    assert_eq!(report.len(), 47);
    assert_eq!(report.count(Availability::Registered), 45);
    assert_eq!(report.count(Availability::UnsupportedTld), 2);
    for frame in registry.frames_containing("<domain:check") {
        assert!(names_in(&frame).len() <= 20);
    }
}

#[tokio::test]
async fn test_failing_middle_chunk_leaves_others_intact() {
    let registry = FakeRegistry::new(|frame, check| {
        if check == 2 {
            Ok(result_frame(2400, "Command failed", ""))
        } else if check > 0 {
            domain_check_reply(frame)
        } else {
            ok()
        }
    });
    let (registrar, _) = registrar(&registry);

    let tlds: Vec<String> = (0..60).map(|i| format!(".z{}.pl", i)).collect();
    let report = registrar.check_domains_availability("free", &tlds).await;

    assert_eq!(report.count(Availability::Available), 40);
    assert_eq!(report.count(Availability::Error), 20);
    for i in 20..40 {
        let failed = report.get(&format!("free.z{}.pl", i)).unwrap();
        assert_eq!(failed.availability, Availability::Error);
        assert_eq!(failed.registry_reason_code, Some(2400));
        assert_eq!(failed.error_message.as_deref(), Some("Command failed"));
    }
}

#[tokio::test]
async fn test_concurrent_chunks_share_and_close_sessions() {
    let registry = FakeRegistry::new(|frame, _| {
        if frame.contains("<domain:check") {
            domain_check_reply(frame)
        } else {
            ok()
        }
    });
    let log = MemoryAuditLog::new();
    let mut settings = settings();
    settings.chunk_concurrency = 3;
    let registrar =
        Registrar::with_connector(settings, registry.clone()).with_audit_sink(Arc::new(log.clone()));

    let tlds: Vec<String> = (0..100).map(|i| format!(".z{}.pl", i)).collect();
    let report = registrar.check_domains_availability("free", &tlds).await;

    assert_eq!(report.len(), 100);
    assert_eq!(report.count(Availability::Available), 100);
    assert_eq!(registry.frames_containing("<domain:check").len(), 5);

    // three chunks in flight, later chunks reuse idle sessions
    let logins = registry.frames_containing("<login>").len();
    let logouts = registry.frames_containing("<logout").len();
    assert_eq!(logins, 3);
    assert_eq!(logouts, logins);

    let operations: Vec<String> = log.entries().into_iter().map(|e| e.operation).collect();
    assert_eq!(operations.iter().filter(|op| *op == "login").count(), 3);
    assert_eq!(operations.iter().filter(|op| *op == "logout").count(), 3);
}

#[tokio::test]
async fn test_duplicate_tld_and_claims_window() {
    let registry = FakeRegistry::new(|frame, _| {
        if frame.contains("<domain:check") {
            domain_check_reply(frame)
        } else {
            ok()
        }
    });
    let (registrar, _) = registrar(&registry);

    let tlds = vec![".pl".to_string(), ".com".to_string(), ".PL".to_string()];
    let report = registrar.check_domains_availability("claims", &tlds).await;

    let checks = registry.frames_containing("<domain:check");
    assert_eq!(checks.len(), 1);
    assert_eq!(names_in(&checks[0]), vec!["claims.pl", "claims.pl"]);

    assert_eq!(report.len(), 2);
    let pl = report.get("claims.pl").unwrap();
    assert_eq!(pl.availability, Availability::Available);
    assert_eq!(pl.registry_reason_code, Some(9072));
    assert_eq!(
        report.get("claims.com").unwrap().availability,
        Availability::UnsupportedTld
    );
}

#[tokio::test]
async fn test_register_with_registrant_creates_contact_then_domain() {
    let registry = FakeRegistry::new(|frame, _| {
        if frame.contains("<contact:check") {
            contact_check_reply(true, "ignored")
        } else {
            ok()
        }
    });
    let (registrar, log) = registrar(&registry);
    let expected_id = derive_contact_id("ABC", "42", &registrant()).unwrap();

    let outcome = registrar
        .register_with_registrant("42", &registrant(), &domain_request("żółw.pl"))
        .await;
    assert_eq!(outcome, OperationOutcome::success());

    let contact_create = registry.frames_containing("<contact:create");
    assert_eq!(contact_create.len(), 1);
    assert!(contact_create[0].contains(&format!("<contact:id>{}</contact:id>", expected_id)));
    assert!(contact_create[0].contains("<extcon:individual>true</extcon:individual>"));

    let domain_create = registry.frames_containing("<domain:create");
    assert_eq!(domain_create.len(), 1);
    assert!(domain_create[0].contains("<domain:name>xn--w-uga1v8h.pl</domain:name>"));
    assert!(domain_create[0]
        .contains(&format!("<domain:registrant>{}</domain:registrant>", expected_id)));
    assert_eq!(domain_create[0].matches("<domain:ns>").count(), 1);

    let operations: Vec<String> = log
        .entries()
        .into_iter()
        .map(|e| e.operation)
        .filter(|op| op != "login" && op != "logout")
        .collect();
    assert_eq!(
        operations,
        vec!["contact:check", "contact:create", "domain:create"]
    );
}

#[tokio::test]
async fn test_register_with_taken_contact_skips_creation() {
    let registry = FakeRegistry::new(|frame, _| {
        if frame.contains("<contact:check") {
            contact_check_reply(false, "ignored")
        } else {
            ok()
        }
    });
    let (registrar, _) = registrar(&registry);

    let outcome = registrar
        .register_with_registrant("42", &registrant(), &domain_request("example.pl"))
        .await;
    assert!(outcome.is_success());
    assert!(registry.frames_containing("<contact:create").is_empty());
    assert_eq!(registry.frames_containing("<domain:create").len(), 1);
}

#[tokio::test]
async fn test_register_domain_reports_registry_error() {
    let registry = FakeRegistry::new(|frame, _| {
        if frame.contains("<domain:create") {
            Ok(result_frame(2302, "Object exists", ""))
        } else {
            ok()
        }
    });
    let (registrar, _) = registrar(&registry);

    let mut request = domain_request("example.pl");
    request.registrant_contact_id = "ABC42".to_string();
    let outcome = registrar.register_domain(&request).await;

    assert_eq!(outcome, OperationOutcome::error("Object exists", Some(2302)));
    assert_eq!(
        serde_json::to_value(&outcome).unwrap(),
        serde_json::json!({"error": "Object exists", "code": 2302})
    );
}

#[tokio::test]
async fn test_audit_log_never_holds_credentials() {
    let registry = FakeRegistry::new(|frame, _| {
        if frame.contains("<contact:check") {
            contact_check_reply(true, "ignored")
        } else {
            ok()
        }
    });
    let (registrar, log) = registrar(&registry);

    registrar
        .register_with_registrant("42", &registrant(), &domain_request("example.pl"))
        .await;

    let secrets: Vec<String> = registry
        .sent()
        .iter()
        .flat_map(|frame| {
            let mut found = element_texts(frame, "contact:pw");
            found.extend(element_texts(frame, "domain:pw"));
            found
        })
        .collect();
    // one auth-info per create command
    assert_eq!(secrets.len(), 2);

    let entries = log.entries();
    assert!(!entries.is_empty());
    for entry in entries {
        assert_eq!(entry.component, "registry");
        assert!(entry.redacted_fields.contains(&"password".to_string()));
        assert!(entry.redacted_fields.contains(&"username".to_string()));
        for field in [&entry.request, &entry.response, &entry.result] {
            assert!(!field.contains(PASSWORD));
            assert!(!field.contains("<clID>registrar</clID>"));
            for secret in &secrets {
                assert!(!field.contains(secret.as_str()), "{} leaked", secret);
            }
        }
    }
}
