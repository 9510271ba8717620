//! EPP protocol implementation.
//!
//! This module contains the wire-level pieces: the XML element tree, the
//! capability descriptor, command frames and response interpretation.

/// Protocol dialect descriptor (namespaces, services, extensions)
pub mod capabilities;

/// Command frames and their builders
pub mod frame;

/// Response parsing and interpretation
pub mod response;

/// XML element tree shared by frames and responses
pub mod xml;

// Re-export commonly used functions and types
pub use capabilities::{ProtocolCapabilities, ServiceUri};
pub use frame::Command;
pub use response::{
    contact_availability, decode_domain_check, ensure_created, is_available, DomainCheck,
    EppResponse, CLAIMS_WINDOW_REASON,
};
pub use xml::Element;
