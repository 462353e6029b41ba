//! OAI-PMH 2.0 responder
//!
//! Exposes the published catalog to harvesters using the `oai_dc`
//! (Dublin Core) metadata format only:
//! - `verb` - the five supported verbs
//! - `request` - argument validation into a typed `OaiRequest`
//! - `error` - the in-band error vocabulary
//! - `record` - `<header>` / `<record>` rendering
//! - `service` - dispatch and envelope rendering
//!
//! Resumption tokens are not implemented: list verbs return at most
//! `oai.max_records` entries, newest first.

mod error;
mod record;
mod request;
mod service;
mod verb;

pub use error::{OaiError, OaiErrorCode};
pub use record::{datestamp, write_header, write_record};
pub use request::{IdentifierScheme, OaiRequest, VerbRequest};
pub use service::{HarvestService, OaiResponse};
pub use verb::{UnknownVerb, Verb};

/// The only metadata format this repository disseminates
pub const METADATA_PREFIX: &str = "oai_dc";

/// `Content-Type` of every OAI-PMH response
pub const CONTENT_TYPE: &str = "text/xml; charset=utf-8";

pub const PROTOCOL_VERSION: &str = "2.0";
pub const GRANULARITY: &str = "YYYY-MM-DDThh:mm:ssZ";

pub const OAI_NAMESPACE: &str = "http://www.openarchives.org/OAI/2.0/";
pub const OAI_SCHEMA: &str = "http://www.openarchives.org/OAI/2.0/OAI-PMH.xsd";
pub const OAI_DC_NAMESPACE: &str = "http://www.openarchives.org/OAI/2.0/oai_dc/";
pub const OAI_DC_SCHEMA: &str = "http://www.openarchives.org/OAI/2.0/oai_dc.xsd";
pub const OAI_IDENTIFIER_NAMESPACE: &str = "http://www.openarchives.org/OAI/2.0/oai-identifier";
pub const OAI_IDENTIFIER_SCHEMA: &str = "http://www.openarchives.org/OAI/2.0/oai-identifier.xsd";
pub const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
