//! Canned catalog rows for tests

use super::store::{ArticleRecord, AuthorInfo, IssueInfo, ManuscriptInfo};
use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

/// Deterministic article id for sequence number `seq`
pub fn article_id(seq: u128) -> Uuid {
    Uuid::from_u128(0x0b6f8a52_7c1e_4d0a_9f3b_000000000000 + seq)
}

/// A published article `days` days after 2024-01-01, with two authors,
/// two keywords and a DOI
pub fn article(seq: u128, days: i64) -> ArticleRecord {
    let published = Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).single().unwrap_or_default()
        + Duration::days(days);

    ArticleRecord {
        id: article_id(seq),
        published_date: published,
        page_range: Some("1-12".to_string()),
        created_at: published - Duration::days(2),
        manuscript: ManuscriptInfo {
            title: format!("Seroprevalence of Rift Valley fever in cattle, study {}", seq),
            abstract_text: "Serum samples were collected from 412 cattle.".to_string(),
            subject_area: "Veterinary Epidemiology".to_string(),
            keywords: vec!["a".to_string(), "b".to_string()],
            doi: Some("10.1234/x".to_string()),
            authors: vec![
                AuthorInfo {
                    full_name: "Amina Diallo".to_string(),
                    institution: Some("Cheikh Anta Diop University".to_string()),
                },
                AuthorInfo {
                    full_name: "Kwame Mensah".to_string(),
                    institution: Some("University of Ghana".to_string()),
                },
            ],
        },
        issue: IssueInfo {
            volume: 12,
            number: 3,
            year: 2024,
        },
    }
}

/// Free text fields loaded with markup-significant characters
pub fn hostile_article(seq: u128, days: i64) -> ArticleRecord {
    let mut record = article(seq, days);
    record.manuscript.title = r#"Ticks & <b>lice</b> in "free-range" goats: O'Neill's survey"#.to_string();
    record.manuscript.abstract_text = "Prevalence < 5% & load > 10 per animal]]>".to_string();
    record.manuscript.keywords = vec!["<script>".to_string(), "Q&A".to_string()];
    record.manuscript.authors[0].full_name = "D'Souza <editor>".to_string();
    record.manuscript.authors[0].institution = Some("R&D \"Unit\"".to_string());
    record
}

/// Convenience for tests that need a fixed render instant
pub fn render_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().unwrap_or_default()
}
