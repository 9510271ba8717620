//! EPP responses and their interpretation.
//!
//! `EppResponse::parse` turns the wire document into a result code, message
//! and payload tree. The decoder functions below map payloads onto the plain
//! values the façade hands back: contact availability, per-name domain check
//! results and create acknowledgments.

use crate::error::RegistryError;
use crate::protocols::xml::Element;
use crate::types::{ContactAvailability, Created};

/// Registry reason code for a registered name whose claims window has
/// expired. Names carrying it are offered as available.
pub const CLAIMS_WINDOW_REASON: u32 = 9072;

/// A parsed registry response.
#[derive(Debug, Clone, PartialEq)]
pub struct EppResponse {
    pub code: u32,
    pub message: String,
    /// The `<response>` element
    pub payload: Element,
}

impl EppResponse {
    /// Parse a response document.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Data` when the document is not well-formed or
    /// lacks a `<response><result code=...>` element.
    pub fn parse(document: &str) -> Result<Self, RegistryError> {
        let root = Element::parse(document).map_err(|e| match e {
            RegistryError::Data { message, .. } => RegistryError::Data {
                message,
                content: Some(truncate(document, 512)),
            },
            other => other,
        })?;

        if root.local_name() != "epp" {
            return Err(RegistryError::data(format!(
                "Expected <epp> root element, found <{}>",
                root.name
            )));
        }

        let payload = root
            .find("response")
            .cloned()
            .ok_or_else(|| RegistryError::data("Response frame has no <response> element"))?;
        let result = payload
            .find("result")
            .ok_or_else(|| RegistryError::data("Response frame has no <result> element"))?;

        let code = result
            .attribute("code")
            .and_then(|c| c.trim().parse::<u32>().ok())
            .ok_or_else(|| RegistryError::data("Result element has no numeric code"))?;
        let message = result
            .find("msg")
            .map(|m| m.text.trim().to_string())
            .unwrap_or_default();

        Ok(Self {
            code,
            message,
            payload,
        })
    }

    /// Whether the registry reported success (1xxx result codes).
    pub fn succeeded(&self) -> bool {
        (1000..2000).contains(&self.code)
    }

    /// The `<resData>` element, if any.
    pub fn res_data(&self) -> Option<&Element> {
        self.payload.find("resData")
    }

    /// Turn a non-success result into `RegistryError::Protocol`.
    pub fn into_success(self) -> Result<Self, RegistryError> {
        if self.succeeded() {
            Ok(self)
        } else {
            Err(RegistryError::protocol(self.message, self.code))
        }
    }
}

/// One decoded entry of a domain check response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainCheck {
    /// Name as echoed by the registry
    pub name: String,
    /// The registry's own `avail` flag
    pub registry_avail: bool,
    pub reason_code: Option<u32>,
    pub reason: Option<String>,
}

impl DomainCheck {
    /// Availability for the registration flow.
    pub fn available(&self) -> bool {
        is_available(self.registry_avail, self.reason_code)
    }
}

/// `avail` OR reason code 9072. No other reason code changes the answer.
pub fn is_available(registry_avail: bool, reason_code: Option<u32>) -> bool {
    registry_avail || reason_code == Some(CLAIMS_WINDOW_REASON)
}

/// Interpret a contact check exchange.
///
/// Available only if the exchange succeeded and the registry flagged the
/// identifier as available. Transport, protocol and decoding failures all
/// become `Unknown`.
pub fn contact_availability(
    exchange: Result<EppResponse, RegistryError>,
    contact_id: &str,
) -> ContactAvailability {
    let response = match exchange.and_then(EppResponse::into_success) {
        Ok(response) => response,
        Err(e) => {
            return ContactAvailability::Unknown {
                reason: e.to_string(),
            }
        }
    };

    let Some(check) = response.res_data().and_then(|d| d.find("chkData")) else {
        return ContactAvailability::Unknown {
            reason: "Contact check response carries no check data".to_string(),
        };
    };

    let id = check
        .find_all("cd")
        .filter_map(|cd| cd.find("id"))
        .find(|id| id.text.trim().eq_ignore_ascii_case(contact_id.trim()));

    match id {
        Some(id) if is_truthy(id.attribute("avail")) => ContactAvailability::Available,
        Some(_) => ContactAvailability::Taken,
        None => ContactAvailability::Unknown {
            reason: format!("Contact '{}' missing from check response", contact_id),
        },
    }
}

/// Decode a domain check response into one entry per checked name.
///
/// The registry answers with one or many `<cd>` items; both shapes come
/// back as a list.
pub fn decode_domain_check(response: &EppResponse) -> Result<Vec<DomainCheck>, RegistryError> {
    let check = response
        .res_data()
        .and_then(|d| d.find("chkData"))
        .ok_or_else(|| RegistryError::data("Domain check response carries no check data"))?;

    check
        .find_all("cd")
        .map(|cd| {
            let name = cd
                .find("name")
                .ok_or_else(|| RegistryError::data("Check item has no <name>"))?;
            let reason = cd.find("reason");
            Ok(DomainCheck {
                name: name.text.trim().to_lowercase(),
                registry_avail: is_truthy(name.attribute("avail")),
                reason_code: reason.and_then(reason_code),
                reason: reason
                    .map(|r| r.text.trim().to_string())
                    .filter(|r| !r.is_empty()),
            })
        })
        .collect()
}

/// Interpret a create exchange.
pub fn ensure_created(response: EppResponse) -> Result<Created, RegistryError> {
    response.into_success().map(|_| Created)
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1") | Some("true")
    )
}

/// Numeric reason code from a `code` attribute or a leading number in the text.
fn reason_code(reason: &Element) -> Option<u32> {
    if let Some(code) = reason.attribute("code").and_then(|c| c.trim().parse().ok()) {
        return Some(code);
    }
    let digits: String = reason
        .text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
