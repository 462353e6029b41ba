//! Verb dispatch and envelope rendering

use super::error::OaiError;
use super::record::{datestamp, write_header, write_record};
use super::request::{IdentifierScheme, OaiRequest, VerbRequest};
use super::{
    GRANULARITY, METADATA_PREFIX, OAI_DC_NAMESPACE, OAI_DC_SCHEMA, OAI_IDENTIFIER_NAMESPACE,
    OAI_IDENTIFIER_SCHEMA, OAI_NAMESPACE, OAI_SCHEMA, PROTOCOL_VERSION, XSI_NAMESPACE,
};
use crate::config::{AppConfig, RepositoryConfig};
use crate::db::{with_query_timeout, ArticleStore};
use crate::errors::Result;
use crate::metrics;
use crate::xml::XmlDocument;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Served if an error document itself fails to render
const FALLBACK_ERROR_DOCUMENT: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8"?>"#,
    "\n",
    r#"<OAI-PMH xmlns="http://www.openarchives.org/OAI/2.0/">"#,
    r#"<error code="badRequest">Internal server error</error>"#,
    "</OAI-PMH>\n",
);

const SAMPLE_ARTICLE_ID: &str = "123e4567-e89b-12d3-a456-426614174000";

/// A rendered OAI-PMH document and the status it is sent with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OaiResponse {
    pub status: StatusCode,
    pub body: String,
}

/// OAI-PMH 2.0 responder over a read-only `ArticleStore`
#[derive(Debug, Clone)]
pub struct HarvestService {
    repository: RepositoryConfig,
    scheme: IdentifierScheme,
    max_records: u64,
    query_timeout: Duration,
}

impl HarvestService {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            scheme: IdentifierScheme::new(&config.repository.domain)?,
            repository: config.repository.clone(),
            max_records: config.oai.max_records,
            query_timeout: config.query_timeout(),
        })
    }

    /// Override the store deadline
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn max_records(&self) -> u64 {
        self.max_records
    }

    /// Validate, dispatch and render one request.
    ///
    /// Never fails: every outcome, including store failures and timeouts,
    /// is a well-formed OAI-PMH document.
    pub async fn handle(
        &self,
        store: &dyn ArticleStore,
        params: &HashMap<String, String>,
        now: DateTime<Utc>,
    ) -> OaiResponse {
        let request = match OaiRequest::parse(params, &self.scheme) {
            Ok(request) => request,
            Err(err) => {
                debug!(error = %err, "Rejected OAI-PMH request");
                return self.error_response(&err, None, now);
            }
        };

        let verb = request.verb.verb();
        metrics::record_oai_verb(verb.as_str());

        match self.dispatch(store, &request, now).await {
            Ok(body) => OaiResponse {
                status: StatusCode::OK,
                body,
            },
            Err(err) => {
                debug!(verb = %verb, error = %err, "OAI-PMH error response");
                self.error_response(&err, Some(&request), now)
            }
        }
    }

    /// Error document for a request turned away by the rate limiter
    pub fn rate_limited(&self, now: DateTime<Utc>) -> OaiResponse {
        self.error_response(&OaiError::rate_limited(), None, now)
    }

    /// Error document for a request whose arguments could not be decoded
    pub fn unreadable_arguments(&self, now: DateTime<Utc>) -> OaiResponse {
        self.error_response(&OaiError::unreadable_arguments(), None, now)
    }

    async fn dispatch(
        &self,
        store: &dyn ArticleStore,
        request: &OaiRequest,
        now: DateTime<Utc>,
    ) -> std::result::Result<String, OaiError> {
        let body = match &request.verb {
            VerbRequest::Identify => self.render(Some(request), now, |doc| self.write_identify(doc))?,

            VerbRequest::ListMetadataFormats => {
                self.render(Some(request), now, write_metadata_formats)?
            }

            VerbRequest::ListRecords => {
                let articles = with_query_timeout(
                    "list_published_articles",
                    self.query_timeout,
                    store.list_published_articles(self.max_records),
                )
                .await?;

                if articles.is_empty() {
                    return Err(OaiError::no_records_match());
                }

                self.render(Some(request), now, |doc| {
                    doc.element("ListRecords", &[], |doc| {
                        articles
                            .iter()
                            .try_for_each(|article| write_record(doc, &self.repository, article))
                    })
                })?
            }

            VerbRequest::GetRecord {
                identifier,
                article_id,
            } => {
                // The identifier grammar admits strings that are not UUIDs;
                // those cannot exist in the catalog.
                let id = Uuid::parse_str(article_id)
                    .map_err(|_| OaiError::id_does_not_exist(identifier))?;

                let article = with_query_timeout(
                    "get_published_article_by_id",
                    self.query_timeout,
                    store.get_published_article_by_id(id),
                )
                .await?
                .ok_or_else(|| OaiError::id_does_not_exist(identifier))?;

                self.render(Some(request), now, |doc| {
                    doc.element("GetRecord", &[], |doc| {
                        write_record(doc, &self.repository, &article)
                    })
                })?
            }

            VerbRequest::ListIdentifiers => {
                let identifiers = with_query_timeout(
                    "list_published_article_identifiers",
                    self.query_timeout,
                    store.list_published_article_identifiers(self.max_records),
                )
                .await?;

                if identifiers.is_empty() {
                    return Err(OaiError::no_records_match());
                }

                self.render(Some(request), now, |doc| {
                    doc.element("ListIdentifiers", &[], |doc| {
                        identifiers.iter().try_for_each(|entry| {
                            write_header(doc, &self.repository, entry.id, entry.created_at)
                        })
                    })
                })?
            }
        };

        Ok(body)
    }

    /// `<OAI-PMH>` envelope with `responseDate`, `request` echo and payload
    fn render<F>(&self, request: Option<&OaiRequest>, now: DateTime<Utc>, payload: F) -> Result<String>
    where
        F: FnOnce(&mut XmlDocument) -> Result<()>,
    {
        let schema_location = format!("{} {}", OAI_NAMESPACE, OAI_SCHEMA);
        let echo = request.map(OaiRequest::echo_attributes).unwrap_or_default();

        let mut doc = XmlDocument::new()?;
        doc.element(
            "OAI-PMH",
            &[
                ("xmlns", OAI_NAMESPACE),
                ("xmlns:xsi", XSI_NAMESPACE),
                ("xsi:schemaLocation", schema_location.as_str()),
            ],
            |doc| {
                doc.text_element("responseDate", &[], &datestamp(now))?;
                doc.text_element("request", &echo, &self.repository.base_url)?;
                payload(doc)
            },
        )?;
        doc.finish()
    }

    fn error_response(&self, err: &OaiError, request: Option<&OaiRequest>, now: DateTime<Utc>) -> OaiResponse {
        metrics::record_oai_error(err.code.as_str());

        let echo = request.filter(|_| err.echoes_request());
        let body = self
            .render(echo, now, |doc| {
                doc.text_element("error", &[("code", err.code.as_str())], &err.message)
            })
            .unwrap_or_else(|render_err| {
                error!(error = %render_err, "Failed to render OAI-PMH error document");
                FALLBACK_ERROR_DOCUMENT.to_string()
            });

        if err.status.is_server_error() {
            warn!(code = err.code.as_str(), status = err.status.as_u16(), "OAI-PMH request failed");
        }

        OaiResponse {
            status: err.status,
            body,
        }
    }

    fn write_identify(&self, doc: &mut XmlDocument) -> Result<()> {
        let repo = &self.repository;
        let schema_location = format!("{} {}", OAI_IDENTIFIER_NAMESPACE, OAI_IDENTIFIER_SCHEMA);

        doc.element("Identify", &[], |doc| {
            doc.text_element("repositoryName", &[], &repo.name)?;
            doc.text_element("baseURL", &[], &repo.base_url)?;
            doc.text_element("protocolVersion", &[], PROTOCOL_VERSION)?;
            doc.text_element("adminEmail", &[], &repo.admin_email)?;
            doc.text_element("earliestDatestamp", &[], &repo.earliest_datestamp)?;
            doc.text_element("deletedRecord", &[], "no")?;
            doc.text_element("granularity", &[], GRANULARITY)?;

            doc.element("description", &[], |doc| {
                doc.element(
                    "oai-identifier",
                    &[
                        ("xmlns", OAI_IDENTIFIER_NAMESPACE),
                        ("xmlns:xsi", XSI_NAMESPACE),
                        ("xsi:schemaLocation", schema_location.as_str()),
                    ],
                    |doc| {
                        doc.text_element("scheme", &[], "oai")?;
                        doc.text_element("repositoryIdentifier", &[], self.scheme.domain())?;
                        doc.text_element("delimiter", &[], ":")?;
                        doc.text_element("sampleIdentifier", &[], &repo.oai_identifier(SAMPLE_ARTICLE_ID))
                    },
                )
            })
        })
    }
}

fn write_metadata_formats(doc: &mut XmlDocument) -> Result<()> {
    doc.element("ListMetadataFormats", &[], |doc| {
        doc.element("metadataFormat", &[], |doc| {
            doc.text_element("metadataPrefix", &[], METADATA_PREFIX)?;
            doc.text_element("schema", &[], OAI_DC_SCHEMA)?;
            doc.text_element("metadataNamespace", &[], OAI_DC_NAMESPACE)
        })
    })
}
