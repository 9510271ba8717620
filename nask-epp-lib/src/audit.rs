//! Audit log of registry exchanges.
//!
//! Every exchange produces an `AuditEntry`. Secret values are scrubbed when
//! the entry is built, so a recorded entry never holds raw credentials.

use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Component name stamped on every entry.
pub const AUDIT_COMPONENT: &str = "registry";

/// Replacement text for scrubbed values.
const MASK: &str = "********";

/// One recorded request/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub component: &'static str,
    pub operation: String,
    pub request: String,
    pub response: String,
    /// Decoded result as seen by the caller
    pub result: String,
    /// Names of the fields whose values were masked
    pub redacted_fields: Vec<String>,
}

impl AuditEntry {
    /// Build an entry, masking every given secret value.
    ///
    /// `password` is always listed as redacted, even when the exchange
    /// itself carried no password.
    pub fn new(
        operation: &str,
        request: &str,
        response: &str,
        result: &str,
        secrets: &[(&str, &str)],
    ) -> Self {
        let mut entry = Self {
            component: AUDIT_COMPONENT,
            operation: operation.to_string(),
            request: request.to_string(),
            response: response.to_string(),
            result: result.to_string(),
            redacted_fields: vec!["password".to_string()],
        };

        for (field, value) in secrets {
            if !entry.redacted_fields.iter().any(|f| f == field) {
                entry.redacted_fields.push(field.to_string());
            }
            entry.request = mask(&entry.request, value);
            entry.response = mask(&entry.response, value);
            entry.result = mask(&entry.result, value);
        }

        entry
    }
}

fn mask(text: &str, secret: &str) -> String {
    if secret.trim().is_empty() {
        return text.to_string();
    }
    let escaped = quick_xml::escape::escape(secret);
    text.replace(secret, MASK).replace(escaped.as_ref(), MASK)
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Writes entries to `tracing` under the `registry::audit` target.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink {
    /// Include the (already scrubbed) frames, not just the outcome
    pub include_frames: bool,
}

impl TracingAuditSink {
    pub fn new(include_frames: bool) -> Self {
        Self { include_frames }
    }
}

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        if self.include_frames {
            tracing::info!(
                target: "registry::audit",
                component = entry.component,
                operation = %entry.operation,
                result = %entry.result,
                redacted = ?entry.redacted_fields,
                request = %entry.request,
                response = %entry.response,
                "registry exchange"
            );
        } else {
            tracing::info!(
                target: "registry::audit",
                component = entry.component,
                operation = %entry.operation,
                result = %entry.result,
                redacted = ?entry.redacted_fields,
                "registry exchange"
            );
        }
    }
}

/// Keeps entries in memory; handy for hosts that persist them elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLog {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded entries.
    pub fn entries(&self) -> Vec<AuditEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for MemoryAuditLog {
    fn record(&self, entry: AuditEntry) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}
