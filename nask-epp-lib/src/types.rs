//! Core data types for registry operations.
//!
//! Inbound records (contacts, domain create requests, registrant parameters)
//! and the plain result records handed back to the host platform.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Longest contact identifier the registry accepts.
pub const MAX_CONTACT_ID_LEN: usize = 16;

/// Most street lines a postal address may carry.
pub const MAX_STREET_LINES: usize = 3;

/// Most nameservers accepted for a domain create.
pub const MAX_NAMESERVERS: usize = 5;

/// A secret string (password, auth-info) that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self(value.into())
    }

    /// The raw value, for the wire only.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Flat registrant parameters as supplied by the host platform.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Registrant {
    /// First name and last name combined
    pub full_name: String,
    #[serde(default)]
    pub company: Option<String>,
    pub email: String,
    pub address1: String,
    #[serde(default)]
    pub address2: Option<String>,
    #[serde(default)]
    pub address3: Option<String>,
    pub city: String,
    #[serde(default)]
    pub province: Option<String>,
    pub postcode: String,
    /// ISO 3166-1 alpha-2
    pub country_code: String,
    /// Format: +CC.xxxxxxxxxxxx
    pub phone: String,
}

/// Contact object as sent to the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactRecord {
    pub id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    pub street_lines: Vec<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    pub postal_code: String,
    pub country_code: String,
    pub phone: String,
    pub email: String,
}

impl ContactRecord {
    /// Build a contact record from host registrant parameters.
    pub fn from_registrant<I: Into<String>>(id: I, registrant: &Registrant) -> Self {
        let street_lines = [
            Some(registrant.address1.clone()),
            registrant.address2.clone(),
            registrant.address3.clone(),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            id: id.into(),
            display_name: registrant.full_name.clone(),
            organization: registrant
                .company
                .clone()
                .filter(|c| !c.trim().is_empty()),
            street_lines,
            city: registrant.city.clone(),
            province: registrant
                .province
                .clone()
                .filter(|p| !p.trim().is_empty()),
            postal_code: registrant.postcode.clone(),
            country_code: registrant.country_code.to_uppercase(),
            phone: registrant.phone.clone(),
            email: registrant.email.clone(),
        }
    }

    /// A contact is an individual unless an organization is set.
    pub fn is_individual(&self) -> bool {
        self.organization
            .as_deref()
            .map_or(true, |org| org.trim().is_empty())
    }

    /// Street lines that actually carry text.
    pub fn non_empty_street_lines(&self) -> impl Iterator<Item = &str> {
        self.street_lines
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
    }
}

/// Registration period in whole years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8")]
pub struct Period(u8);

impl Period {
    /// Create a period; zero years is rejected.
    pub fn years(years: u8) -> Option<Self> {
        (years > 0).then_some(Self(years))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn unit(&self) -> &'static str {
        "y"
    }
}

impl TryFrom<u8> for Period {
    type Error = String;

    fn try_from(years: u8) -> Result<Self, Self::Error> {
        Self::years(years).ok_or_else(|| "registration period must be at least one year".to_string())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0, self.unit())
    }
}

/// Domain create request as received from the host platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainCreateRequest {
    /// Unicode or ASCII domain name; encoded before sending
    pub domain_name: String,
    pub registrant_contact_id: String,
    pub period: Period,
    /// Up to five hostnames; empty entries are dropped
    #[serde(default)]
    pub nameservers: Vec<String>,
}

/// One (label, TLD) candidate for an availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckItem {
    pub second_level_label: String,
    pub top_level_domain: String,
}

impl CheckItem {
    /// Full name as sent to the registry.
    pub fn domain_name(&self) -> String {
        format!("{}{}", self.second_level_label, self.top_level_domain)
    }
}

/// Availability of a checked name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    #[serde(rename = "available")]
    Available,
    #[serde(rename = "registered")]
    Registered,
    #[serde(rename = "unsupported_tld")]
    UnsupportedTld,
    #[serde(rename = "error")]
    Error,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Available => write!(f, "Available"),
            Availability::Registered => write!(f, "Registered"),
            Availability::UnsupportedTld => write!(f, "Unsupported TLD"),
            Availability::Error => write!(f, "Error"),
        }
    }
}

/// Result for one checked name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Full domain name (label + tld)
    pub key: String,
    /// Normalized, leading-dot TLD
    pub tld: String,
    pub availability: Availability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_reason_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl CheckResult {
    pub fn unsupported(key: String, tld: String) -> Self {
        Self {
            key,
            tld,
            availability: Availability::UnsupportedTld,
            registry_reason_code: None,
            error_message: None,
        }
    }

    pub fn failed(key: String, tld: String, message: String, code: Option<u32>) -> Self {
        Self {
            key,
            tld,
            availability: Availability::Error,
            registry_reason_code: code,
            error_message: Some(message),
        }
    }
}

/// Merged batch result keyed by full domain name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    pub results: BTreeMap<String, CheckResult>,
}

impl CheckReport {
    /// Insert a result; an existing entry for the same name is replaced.
    pub fn insert(&mut self, result: CheckResult) {
        self.results.insert(result.key.clone(), result);
    }

    pub fn get(&self, domain: &str) -> Option<&CheckResult> {
        self.results.get(domain)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Per-TLD records in key order.
    pub fn entries(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.values()
    }

    pub fn count(&self, availability: Availability) -> usize {
        self.entries()
            .filter(|r| r.availability == availability)
            .count()
    }
}

/// Outcome of a contact availability check.
///
/// Any failure to get a definite answer is `Unknown`, which callers must
/// treat as not available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContactAvailability {
    Available,
    Taken,
    Unknown { reason: String },
}

impl ContactAvailability {
    pub fn is_available(&self) -> bool {
        matches!(self, ContactAvailability::Available)
    }
}

/// Acknowledgment of a successful create command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Created;

/// Plain result of a mutating operation: `{success: true}` or `{error: ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperationOutcome {
    Success {
        success: bool,
    },
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<u32>,
    },
}

impl OperationOutcome {
    pub fn success() -> Self {
        OperationOutcome::Success { success: true }
    }

    pub fn error<M: Into<String>>(message: M, code: Option<u32>) -> Self {
        OperationOutcome::Error {
            error: message.into(),
            code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OperationOutcome::Success { .. })
    }
}

impl From<crate::Result<Created>> for OperationOutcome {
    fn from(result: crate::Result<Created>) -> Self {
        match result {
            Ok(Created) => OperationOutcome::success(),
            Err(e) => OperationOutcome::error(e.user_message(), e.code()),
        }
    }
}
