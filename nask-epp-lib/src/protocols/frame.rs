//! EPP command frames.
//!
//! Each registry operation is one `Command` variant. Builders normalize and
//! validate their input; `Command::to_xml` renders the frame for a given
//! protocol dialect.

use crate::error::RegistryError;
use crate::protocols::capabilities::ProtocolCapabilities;
use crate::protocols::xml::Element;
use crate::types::{ContactRecord, Period, Secret, MAX_CONTACT_ID_LEN, MAX_STREET_LINES};
use crate::utils::{prepare_nameservers, to_ascii_name};
use rand::seq::SliceRandom;
use rand::Rng;

/// Length of generated auth-info secrets.
const AUTH_INFO_LEN: usize = 16;

/// A single EPP command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login {
        username: String,
        password: Secret,
    },
    Logout,
    CheckContact {
        id: String,
    },
    CreateContact {
        contact: ContactRecord,
        auth_info: Secret,
    },
    CheckDomain {
        names: Vec<String>,
    },
    CreateDomain {
        name: String,
        registrant: String,
        period: Period,
        nameservers: Vec<String>,
        auth_info: Secret,
    },
}

/// Build a check-contact command for exactly one identifier.
pub fn check_contact(contact_id: &str) -> Result<Command, RegistryError> {
    let id = contact_id.trim();
    if id.is_empty() {
        return Err(RegistryError::invalid_input("contact id", "cannot be empty"));
    }
    Ok(Command::CheckContact { id: id.to_string() })
}

/// Build a create-contact command.
///
/// Only non-empty street lines are sent. A fresh auth-info secret is
/// generated and attached; it is never returned to the caller.
pub fn create_contact(contact: &ContactRecord) -> Result<Command, RegistryError> {
    let id = contact.id.trim();
    if id.is_empty() {
        return Err(RegistryError::invalid_input("contact id", "cannot be empty"));
    }
    if id.chars().count() > MAX_CONTACT_ID_LEN {
        return Err(RegistryError::invalid_input(
            "contact id",
            format!("'{}' is longer than {} characters", id, MAX_CONTACT_ID_LEN),
        ));
    }

    let streets: Vec<String> = contact
        .non_empty_street_lines()
        .map(str::to_string)
        .collect();
    if streets.is_empty() {
        return Err(RegistryError::invalid_input(
            "street",
            "at least one street line is required",
        ));
    }
    if streets.len() > MAX_STREET_LINES {
        return Err(RegistryError::invalid_input(
            "street",
            format!("at most {} street lines are allowed", MAX_STREET_LINES),
        ));
    }

    let mut contact = contact.clone();
    contact.id = id.to_string();
    contact.street_lines = streets;
    contact.organization = contact.organization.filter(|o| !o.trim().is_empty());
    contact.province = contact.province.filter(|p| !p.trim().is_empty());

    Ok(Command::CreateContact {
        contact,
        auth_info: generate_auth_info(),
    })
}

/// Build a create-domain command.
///
/// The domain and every nameserver are ACE-encoded; empty nameserver
/// entries are dropped.
pub fn create_domain(
    domain_name: &str,
    registrant_id: &str,
    period: Period,
    nameservers: &[String],
) -> Result<Command, RegistryError> {
    let registrant = registrant_id.trim();
    if registrant.is_empty() {
        return Err(RegistryError::invalid_input("registrant", "cannot be empty"));
    }

    Ok(Command::CreateDomain {
        name: to_ascii_name("domain", domain_name)?,
        registrant: registrant.to_string(),
        period,
        nameservers: prepare_nameservers(nameservers)?,
        auth_info: generate_auth_info(),
    })
}

/// Build a check-domain command listing all names in one request.
///
/// The caller keeps the list within the registry's per-command limit.
pub fn check_domain(domain_names: &[String]) -> Result<Command, RegistryError> {
    if domain_names.is_empty() {
        return Err(RegistryError::invalid_input("domains", "nothing to check"));
    }
    let names = domain_names
        .iter()
        .map(|name| to_ascii_name("domain", name))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Command::CheckDomain { names })
}

/// Build the session login command.
pub fn login(username: &str, password: &str) -> Command {
    Command::Login {
        username: username.to_string(),
        password: Secret::new(password),
    }
}

/// Random auth-info secret with lower, upper, digit and symbol characters.
pub fn generate_auth_info() -> Secret {
    const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
    const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
    const DIGITS: &[u8] = b"23456789";
    const SYMBOLS: &[u8] = b"!#$%*+-=?@";

    let mut rng = rand::thread_rng();
    let all: Vec<u8> = [LOWER, UPPER, DIGITS, SYMBOLS].concat();

    let mut secret: Vec<u8> = [LOWER, UPPER, DIGITS, SYMBOLS]
        .iter()
        .map(|class| class[rng.gen_range(0..class.len())])
        .collect();
    while secret.len() < AUTH_INFO_LEN {
        secret.push(all[rng.gen_range(0..all.len())]);
    }
    secret.shuffle(&mut rng);

    Secret::new(String::from_utf8_lossy(&secret))
}

impl Command {
    /// Operation name used in logs and audit records.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login { .. } => "login",
            Command::Logout => "logout",
            Command::CheckContact { .. } => "contact:check",
            Command::CreateContact { .. } => "contact:create",
            Command::CheckDomain { .. } => "domain:check",
            Command::CreateDomain { .. } => "domain:create",
        }
    }

    /// Secret values carried by this command, by field name.
    pub fn secrets(&self) -> Vec<(&'static str, &str)> {
        match self {
            Command::Login { password, .. } => vec![("password", password.expose())],
            Command::CreateContact { auth_info, .. } | Command::CreateDomain { auth_info, .. } => {
                vec![("authInfo", auth_info.expose())]
            }
            _ => Vec::new(),
        }
    }

    /// Render the command as an EPP document.
    pub fn to_xml(&self, caps: &ProtocolCapabilities) -> Result<String, RegistryError> {
        self.to_element(caps)?.to_document()
    }

    /// Build the `<epp>` element tree for this command.
    pub fn to_element(&self, caps: &ProtocolCapabilities) -> Result<Element, RegistryError> {
        let mut command = Element::new("command");

        match self {
            Command::Login { username, password } => {
                command = command.child(login_element(caps, username, password.expose()));
            }
            Command::Logout => {
                command = command.child(Element::new("logout"));
            }
            Command::CheckContact { id } => {
                let check = object_element(caps, "contact", "check")?.leaf("contact:id", id.as_str());
                command = command.child(Element::new("check").child(check));
            }
            Command::CreateContact { contact, auth_info } => {
                let (create, extension) = contact_create_elements(caps, contact, auth_info.expose())?;
                command = command
                    .child(Element::new("create").child(create))
                    .child(Element::new("extension").child(extension));
            }
            Command::CheckDomain { names } => {
                let check = names
                    .iter()
                    .fold(object_element(caps, "domain", "check")?, |el, name| {
                        el.leaf("domain:name", name.as_str())
                    });
                command = command.child(Element::new("check").child(check));
            }
            Command::CreateDomain {
                name,
                registrant,
                period,
                nameservers,
                auth_info,
            } => {
                let mut create = object_element(caps, "domain", "create")?
                    .leaf("domain:name", name.as_str())
                    .child(
                        Element::new("domain:period")
                            .attr("unit", period.unit())
                            .text(period.value().to_string()),
                    );
                for ns in nameservers {
                    create = create.leaf("domain:ns", ns.as_str());
                }
                create = create
                    .leaf("domain:registrant", registrant.as_str())
                    .child(Element::new("domain:authInfo").leaf("domain:pw", auth_info.expose()));
                command = command.child(Element::new("create").child(create));
            }
        }

        Ok(Element::new("epp")
            .attr("xmlns", caps.epp_namespace)
            .child(command))
    }
}

fn object_element(
    caps: &ProtocolCapabilities,
    prefix: &str,
    verb: &str,
) -> Result<Element, RegistryError> {
    let uri = caps.namespace(prefix).ok_or_else(|| {
        RegistryError::config(format!("Protocol capabilities lack the '{}' service", prefix))
    })?;
    Ok(Element::new(format!("{}:{}", prefix, verb)).attr(format!("xmlns:{}", prefix), uri))
}

fn login_element(caps: &ProtocolCapabilities, username: &str, password: &str) -> Element {
    let mut svcs = Element::new("svcs");
    for service in &caps.services {
        svcs = svcs.leaf("objURI", service.uri);
    }
    if !caps.extensions.is_empty() {
        let ext = caps
            .extensions
            .iter()
            .fold(Element::new("svcExtension"), |el, svc| el.leaf("extURI", svc.uri));
        svcs = svcs.child(ext);
    }

    Element::new("login")
        .leaf("clID", username)
        .leaf("pw", password)
        .child(
            Element::new("options")
                .leaf("version", caps.version)
                .leaf("lang", caps.lang),
        )
        .child(svcs)
}

fn contact_create_elements(
    caps: &ProtocolCapabilities,
    contact: &ContactRecord,
    auth_info: &str,
) -> Result<(Element, Element), RegistryError> {
    let mut postal = Element::new("contact:postalInfo")
        .attr("type", "loc")
        .leaf("contact:name", contact.display_name.as_str());
    if let Some(org) = &contact.organization {
        postal = postal.leaf("contact:org", org.as_str());
    }

    let mut addr = contact
        .non_empty_street_lines()
        .fold(Element::new("contact:addr"), |el, street| el.leaf("contact:street", street))
        .leaf("contact:city", contact.city.as_str());
    if let Some(province) = &contact.province {
        addr = addr.leaf("contact:sp", province.as_str());
    }
    addr = addr
        .leaf("contact:pc", contact.postal_code.as_str())
        .leaf("contact:cc", contact.country_code.as_str());

    let create = object_element(caps, "contact", "create")?
        .leaf("contact:id", contact.id.as_str())
        .child(postal.child(addr))
        .leaf("contact:voice", contact.phone.as_str())
        .leaf("contact:email", contact.email.as_str())
        .child(Element::new("contact:authInfo").leaf("contact:pw", auth_info));

    let extension = object_element(caps, "extcon", "create")?
        .leaf("extcon:individual", if contact.is_individual() { "true" } else { "false" });

    Ok((create, extension))
}
