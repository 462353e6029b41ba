//! Dublin Core record rendering shared by ListRecords and GetRecord

use super::{DC_NAMESPACE, OAI_DC_NAMESPACE, OAI_DC_SCHEMA, XSI_NAMESPACE};
use crate::config::RepositoryConfig;
use crate::db::ArticleRecord;
use crate::errors::Result;
use crate::xml::XmlDocument;
use chrono::{DateTime, Utc};

/// OAI-PMH datestamp at seconds granularity
pub fn datestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// `"<journal>, Vol V, No N (Year)"`
pub fn source_citation(journal: &str, volume: i32, number: i32, year: i32) -> String {
    format!("{}, Vol {}, No {} ({})", journal, volume, number, year)
}

pub fn rights_statement(publisher: &str, year: i32) -> String {
    format!("Copyright (c) {} {}. All rights reserved.", year, publisher)
}

/// `<header>` with identifier, datestamp and set membership
pub fn write_header(
    doc: &mut XmlDocument,
    repository: &RepositoryConfig,
    id: impl std::fmt::Display,
    created_at: DateTime<Utc>,
) -> Result<()> {
    doc.element("header", &[], |doc| {
        doc.text_element("identifier", &[], &repository.oai_identifier(id))?;
        doc.text_element("datestamp", &[], &datestamp(created_at))?;
        doc.text_element("setSpec", &[], &repository.set_spec)
    })
}

/// Full `<record>`: header plus `oai_dc` metadata
pub fn write_record(doc: &mut XmlDocument, repository: &RepositoryConfig, article: &ArticleRecord) -> Result<()> {
    let manuscript = &article.manuscript;
    let issue = &article.issue;
    let schema_location = format!("{} {}", OAI_DC_NAMESPACE, OAI_DC_SCHEMA);

    doc.element("record", &[], |doc| {
        write_header(doc, repository, article.id, article.created_at)?;

        doc.element("metadata", &[], |doc| {
            doc.element(
                "oai_dc:dc",
                &[
                    ("xmlns:oai_dc", OAI_DC_NAMESPACE),
                    ("xmlns:dc", DC_NAMESPACE),
                    ("xmlns:xsi", XSI_NAMESPACE),
                    ("xsi:schemaLocation", schema_location.as_str()),
                ],
                |doc| {
                    doc.text_element("dc:title", &[], &manuscript.title)?;

                    for author in &manuscript.authors {
                        doc.text_element("dc:creator", &[], &author.display_with_institution())?;
                    }

                    doc.optional_text_element("dc:subject", Some(manuscript.subject_area.as_str()))?;
                    // Keywords are copied verbatim, blank ones included
                    for keyword in &manuscript.keywords {
                        doc.text_element("dc:subject", &[], keyword)?;
                    }

                    doc.optional_text_element("dc:description", Some(manuscript.abstract_text.as_str()))?;
                    doc.text_element("dc:publisher", &[], &repository.publisher)?;
                    doc.text_element("dc:date", &[], &article.published_date.format("%Y-%m-%d").to_string())?;
                    doc.text_element("dc:type", &[], "text")?;
                    doc.text_element("dc:format", &[], "application/pdf")?;

                    doc.optional_text_element("dc:identifier", manuscript.doi_url().as_deref())?;
                    doc.text_element("dc:identifier", &[], &repository.article_url(article.id))?;

                    doc.text_element(
                        "dc:source",
                        &[],
                        &source_citation(&repository.journal_title, issue.volume, issue.number, issue.year),
                    )?;
                    doc.text_element("dc:language", &[], "en")?;
                    doc.text_element("dc:rights", &[], &rights_statement(&repository.publisher, issue.year))
                },
            )
        })
    })
}
