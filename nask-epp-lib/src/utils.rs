//! Utility functions for name normalization and identifier derivation.
//!
//! This module contains helpers for TLD normalization, IDNA encoding of
//! domain and host names, nameserver filtering and contact id derivation.

use crate::error::RegistryError;
use crate::types::{Registrant, MAX_CONTACT_ID_LEN, MAX_NAMESERVERS};
use md5::{Digest, Md5};

/// Normalize a TLD to its lowercase, leading-dot form (`"PL"` -> `".pl"`).
pub fn normalize_tld(tld: &str) -> String {
    let trimmed = tld.trim().trim_end_matches('.').to_lowercase();
    if trimmed.starts_with('.') {
        trimmed
    } else {
        format!(".{}", trimmed)
    }
}

/// Whether a normalized TLD falls under the supported registry suffix.
///
/// Second-level registry zones count as supported (`.com.pl` under `.pl`).
pub fn is_supported_tld(normalized_tld: &str, supported_suffix: &str) -> bool {
    let suffix = normalize_tld(supported_suffix);
    normalized_tld.len() > 1 && normalized_tld.ends_with(&suffix)
}

/// Encode a (possibly internationalized) name to its ASCII-compatible form.
///
/// # Arguments
///
/// * `field` - Name of the input field, used in the error
/// * `name` - Domain or host name to encode
pub fn to_ascii_name(field: &str, name: &str) -> Result<String, RegistryError> {
    let name = name.trim().trim_end_matches('.');
    if name.is_empty() {
        return Err(RegistryError::invalid_input(field, "name cannot be empty"));
    }

    idna::domain_to_ascii(name)
        .map_err(|e| RegistryError::invalid_input(field, format!("'{}' is not a valid name: {:?}", name, e)))
}

/// Drop empty nameserver entries and ACE-encode the rest.
///
/// More than five non-empty entries is an input error.
pub fn prepare_nameservers(nameservers: &[String]) -> Result<Vec<String>, RegistryError> {
    let filled: Vec<&str> = nameservers
        .iter()
        .map(|ns| ns.trim())
        .filter(|ns| !ns.is_empty())
        .collect();

    if filled.len() > MAX_NAMESERVERS {
        return Err(RegistryError::invalid_input(
            "nameservers",
            format!("at most {} nameservers are allowed, got {}", MAX_NAMESERVERS, filled.len()),
        ));
    }

    filled
        .into_iter()
        .map(|ns| to_ascii_name("nameserver", ns))
        .collect()
}

/// Derive a stable contact id for a registrant.
///
/// The id is `prefix + user_id` followed by a base-36 rendering of the MD5
/// fingerprint of the registrant's details, cut so the whole id is exactly
/// 16 characters. The same inputs always produce the same id.
///
/// # Errors
///
/// Returns `RegistryError::InvalidInput` if the prefix and user id alone
/// leave no room for the fingerprint suffix.
pub fn derive_contact_id(
    prefix: &str,
    user_id: &str,
    registrant: &Registrant,
) -> Result<String, RegistryError> {
    let base = format!("{}{}", prefix.trim(), user_id.trim());
    if base.is_empty() {
        return Err(RegistryError::invalid_input("contact id", "prefix and user id are empty"));
    }
    if base.chars().count() >= MAX_CONTACT_ID_LEN {
        return Err(RegistryError::invalid_input(
            "contact id",
            format!("'{}' leaves no room for the fingerprint suffix", base),
        ));
    }

    let fingerprint = [
        registrant.full_name.as_str(),
        registrant.company.as_deref().unwrap_or(""),
        registrant.email.as_str(),
        registrant.address1.as_str(),
        registrant.address2.as_deref().unwrap_or(""),
        registrant.city.as_str(),
        registrant.postcode.as_str(),
        registrant.phone.as_str(),
    ]
    .concat();

    let digest = Md5::digest(fingerprint.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    let suffix = to_base36(u128::from_be_bytes(bytes));

    let room = MAX_CONTACT_ID_LEN - base.chars().count();
    Ok(format!("{}{}", base, &suffix[..room.min(suffix.len())]))
}

/// Lowercase base-36 rendering of an unsigned integer.
fn to_base36(mut value: u128) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
