//! Protocol capability descriptor.
//!
//! Names the EPP namespace, object services and service extensions a session
//! announces at login and uses when building frames. The descriptor is plain
//! immutable data handed to each session.

/// Prefix/URI pair for one object service or extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUri {
    pub prefix: &'static str,
    pub uri: &'static str,
}

/// Immutable description of the registry's protocol dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolCapabilities {
    /// Root `<epp>` namespace
    pub epp_namespace: &'static str,
    pub version: &'static str,
    pub lang: &'static str,
    /// Object services announced as `<objURI>`
    pub services: Vec<ServiceUri>,
    /// Extensions announced as `<extURI>`
    pub extensions: Vec<ServiceUri>,
}

impl ProtocolCapabilities {
    /// Dialect spoken by the NASK registry (schema version 2.1).
    pub fn nask() -> Self {
        Self {
            epp_namespace: "http://www.dns.pl/nask-epp-schema/epp-2.1",
            version: "1.0",
            lang: "en",
            services: vec![
                ServiceUri {
                    prefix: "contact",
                    uri: "http://www.dns.pl/nask-epp-schema/contact-2.1",
                },
                ServiceUri {
                    prefix: "host",
                    uri: "http://www.dns.pl/nask-epp-schema/host-2.1",
                },
                ServiceUri {
                    prefix: "domain",
                    uri: "http://www.dns.pl/nask-epp-schema/domain-2.1",
                },
                ServiceUri {
                    prefix: "future",
                    uri: "http://www.dns.pl/nask-epp-schema/future-2.1",
                },
            ],
            extensions: vec![
                ServiceUri {
                    prefix: "extcon",
                    uri: "http://www.dns.pl/nask-epp-schema/extcon-2.1",
                },
                ServiceUri {
                    prefix: "extdom",
                    uri: "http://www.dns.pl/nask-epp-schema/extdom-2.1",
                },
            ],
        }
    }

    /// Namespace URI registered for a service or extension prefix.
    pub fn namespace(&self, prefix: &str) -> Option<&'static str> {
        self.services
            .iter()
            .chain(self.extensions.iter())
            .find(|svc| svc.prefix == prefix)
            .map(|svc| svc.uri)
    }
}

impl Default for ProtocolCapabilities {
    fn default() -> Self {
        Self::nask()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nask_namespaces() {
        let caps = ProtocolCapabilities::nask();
        assert_eq!(
            caps.namespace("domain"),
            Some("http://www.dns.pl/nask-epp-schema/domain-2.1")
        );
        assert_eq!(
            caps.namespace("extcon"),
            Some("http://www.dns.pl/nask-epp-schema/extcon-2.1")
        );
        assert_eq!(caps.namespace("secDNS"), None);
    }
}
