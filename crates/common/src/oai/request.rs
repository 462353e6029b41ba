//! Request validation
//!
//! Arguments are checked in a fixed order before anything touches the
//! store: verb presence, verb name, the GetRecord identifier, then
//! metadataPrefix.

use super::error::OaiError;
use super::verb::Verb;
use super::METADATA_PREFIX;
use crate::errors::{AppError, Result};
use regex_lite::Regex;
use std::collections::HashMap;

/// Parses and builds `oai:<domain>:article/<id>` identifiers
#[derive(Debug, Clone)]
pub struct IdentifierScheme {
    domain: String,
    pattern: Regex,
}

impl IdentifierScheme {
    pub fn new(domain: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(
            r"^oai:{}:article/([a-f0-9-]+)$",
            regex_lite::escape(domain)
        ))
        .map_err(|e| AppError::Configuration {
            message: format!("Invalid repository domain '{}': {}", domain, e),
        })?;

        Ok(Self {
            domain: domain.to_string(),
            pattern,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Local article id carried by a well-formed identifier
    pub fn article_id<'a>(&self, identifier: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(identifier)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// A request whose arguments passed validation, one variant per verb
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerbRequest {
    Identify,
    ListRecords,
    GetRecord { identifier: String, article_id: String },
    ListIdentifiers,
    ListMetadataFormats,
}

impl VerbRequest {
    pub fn verb(&self) -> Verb {
        match self {
            VerbRequest::Identify => Verb::Identify,
            VerbRequest::ListRecords => Verb::ListRecords,
            VerbRequest::GetRecord { .. } => Verb::GetRecord,
            VerbRequest::ListIdentifiers => Verb::ListIdentifiers,
            VerbRequest::ListMetadataFormats => Verb::ListMetadataFormats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OaiRequest {
    pub verb: VerbRequest,
    /// Present only when the client sent one; always `oai_dc` then
    pub metadata_prefix: Option<String>,
}

impl OaiRequest {
    pub fn parse(params: &HashMap<String, String>, scheme: &IdentifierScheme) -> std::result::Result<Self, OaiError> {
        let verb = match params.get("verb").map(String::as_str) {
            None | Some("") => return Err(OaiError::missing_verb()),
            Some(name) => name.parse::<Verb>().map_err(|e| OaiError::bad_verb(&e.0))?,
        };

        let verb = match verb {
            Verb::Identify => VerbRequest::Identify,
            Verb::ListRecords => VerbRequest::ListRecords,
            Verb::ListIdentifiers => VerbRequest::ListIdentifiers,
            Verb::ListMetadataFormats => VerbRequest::ListMetadataFormats,
            Verb::GetRecord => {
                let identifier = match params.get("identifier").map(String::as_str) {
                    None | Some("") => return Err(OaiError::missing_identifier()),
                    Some(identifier) => identifier,
                };
                let article_id = scheme
                    .article_id(identifier)
                    .ok_or_else(OaiError::invalid_identifier)?;
                VerbRequest::GetRecord {
                    identifier: identifier.to_string(),
                    article_id: article_id.to_string(),
                }
            }
        };

        let metadata_prefix = match params.get("metadataPrefix") {
            None => None,
            Some(prefix) if prefix == METADATA_PREFIX => Some(prefix.clone()),
            Some(_) => return Err(OaiError::unsupported_metadata_prefix()),
        };

        Ok(Self {
            verb,
            metadata_prefix,
        })
    }

    /// Attributes for the response's `<request>` element
    pub fn echo_attributes(&self) -> Vec<(&'static str, &str)> {
        let mut attrs = vec![("verb", self.verb.verb().as_str())];
        if let VerbRequest::GetRecord { identifier, .. } = &self.verb {
            attrs.push(("identifier", identifier.as_str()));
        }
        if let Some(prefix) = &self.metadata_prefix {
            attrs.push(("metadataPrefix", prefix.as_str()));
        }
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oai::OaiErrorCode;

    fn scheme() -> IdentifierScheme {
        IdentifierScheme::new("ajvs.org").unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_verbs_without_arguments_validate() {
        for verb in ["Identify", "ListRecords", "ListIdentifiers", "ListMetadataFormats"] {
            let req = OaiRequest::parse(&params(&[("verb", verb)]), &scheme()).unwrap();
            assert_eq!(req.verb.verb().as_str(), verb);
            assert_eq!(req.metadata_prefix, None);
        }
    }

    #[test]
    fn test_missing_verb_is_bad_argument() {
        let err = OaiRequest::parse(&params(&[]), &scheme()).unwrap_err();
        assert_eq!(err.code, OaiErrorCode::BadArgument);
        assert_eq!(err.message, "Missing required parameter: verb");
    }

    #[test]
    fn test_unknown_verb_is_bad_verb() {
        let err = OaiRequest::parse(&params(&[("verb", "ListSets")]), &scheme()).unwrap_err();
        assert_eq!(err.code, OaiErrorCode::BadVerb);
    }

    #[test]
    fn test_get_record_extracts_article_id() {
        let id = "0b6f8a52-7c1e-4d0a-9f3b-2a4c6e8d0f12";
        let identifier = format!("oai:ajvs.org:article/{}", id);
        let req = OaiRequest::parse(
            &params(&[("verb", "GetRecord"), ("identifier", &identifier), ("metadataPrefix", "oai_dc")]),
            &scheme(),
        )
        .unwrap();

        assert_eq!(
            req.verb,
            VerbRequest::GetRecord {
                identifier: identifier.clone(),
                article_id: id.to_string(),
            }
        );
        assert_eq!(
            req.echo_attributes(),
            vec![("verb", "GetRecord"), ("identifier", identifier.as_str()), ("metadataPrefix", "oai_dc")]
        );
    }

    #[test]
    fn test_get_record_identifier_errors() {
        let missing = OaiRequest::parse(&params(&[("verb", "GetRecord")]), &scheme()).unwrap_err();
        assert_eq!(missing.message, "Missing required parameter: identifier");

        for bad in [
            "oai:ajvs.org:article/not-an-id",
            "oai:ajvs.org:article/ABCDEF",
            "oai:other.org:article/abc123",
            "oai:ajvsXorg:article/abc123",
            "oai:ajvs.org:article/",
            "oai:ajvs.org:article/abc123/extra",
        ] {
            let err = OaiRequest::parse(&params(&[("verb", "GetRecord"), ("identifier", bad)]), &scheme())
                .unwrap_err();
            assert_eq!(err.code, OaiErrorCode::BadArgument, "{}", bad);
            assert_eq!(err.message, "Invalid identifier format", "{}", bad);
        }
    }

    #[test]
    fn test_unsupported_metadata_prefix_for_every_verb() {
        for verb in ["Identify", "ListRecords", "ListIdentifiers", "ListMetadataFormats"] {
            let err = OaiRequest::parse(&params(&[("verb", verb), ("metadataPrefix", "mods")]), &scheme())
                .unwrap_err();
            assert_eq!(err.code, OaiErrorCode::BadArgument);
            assert!(err.message.contains("oai_dc"));
        }
    }

    #[test]
    fn test_identifier_checked_before_metadata_prefix() {
        let err = OaiRequest::parse(
            &params(&[("verb", "GetRecord"), ("identifier", "bogus"), ("metadataPrefix", "mods")]),
            &scheme(),
        )
        .unwrap_err();
        assert_eq!(err.message, "Invalid identifier format");
    }
}
