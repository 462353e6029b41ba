//! Read-only catalog interface
//!
//! The export services never write. They see the catalog through
//! `ArticleStore`, which returns published articles already joined with
//! their manuscript, authors and issue.

use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub full_name: String,
    pub institution: Option<String>,
}

impl AuthorInfo {
    /// `"<full name> (<institution>)"`, or just the name without an institution
    pub fn display_with_institution(&self) -> String {
        match self.institution.as_deref().map(str::trim) {
            Some(institution) if !institution.is_empty() => {
                format!("{} ({})", self.full_name, institution)
            }
            _ => self.full_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptInfo {
    pub title: String,
    pub abstract_text: String,
    pub subject_area: String,
    pub keywords: Vec<String>,
    pub doi: Option<String>,
    /// Byline order
    pub authors: Vec<AuthorInfo>,
}

impl ManuscriptInfo {
    /// DOI without any resolver or `doi:` prefix
    pub fn bare_doi(&self) -> Option<&str> {
        let doi = self.doi.as_deref()?.trim();
        let doi = ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "http://dx.doi.org/", "doi:"]
            .iter()
            .find_map(|prefix| doi.strip_prefix(*prefix))
            .unwrap_or(doi)
            .trim();
        (!doi.is_empty()).then_some(doi)
    }

    /// Resolvable `https://doi.org/...` URL
    pub fn doi_url(&self) -> Option<String> {
        self.bare_doi().map(|doi| format!("https://doi.org/{}", doi))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueInfo {
    pub volume: i32,
    pub number: i32,
    pub year: i32,
}

/// A published article joined with its manuscript and issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: Uuid,
    pub published_date: DateTime<Utc>,
    pub page_range: Option<String>,
    pub created_at: DateTime<Utc>,
    pub manuscript: ManuscriptInfo,
    pub issue: IssueInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleIdentifier {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Read-only query interface over published articles
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Most recently published articles first, at most `limit`
    async fn list_published_articles(&self, limit: u64) -> Result<Vec<ArticleRecord>>;

    /// A single published article
    async fn get_published_article_by_id(&self, id: Uuid) -> Result<Option<ArticleRecord>>;

    /// `(id, created_at)` pairs, newest first, at most `limit`
    async fn list_published_article_identifiers(&self, limit: u64) -> Result<Vec<ArticleIdentifier>>;

    /// Check connectivity to the backing store
    async fn ping(&self) -> Result<()>;
}

#[cfg(any(test, feature = "test-helpers"))]
pub use memory::{MemoryStore, StoreBehavior};

#[cfg(any(test, feature = "test-helpers"))]
mod memory {
    use super::*;
    use crate::errors::AppError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// How a `MemoryStore` answers queries
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum StoreBehavior {
        Normal,
        Fail,
        Hang,
    }

    /// In-memory `ArticleStore` for tests
    pub struct MemoryStore {
        articles: Mutex<Vec<ArticleRecord>>,
        behavior: Mutex<StoreBehavior>,
        calls: AtomicUsize,
    }

    impl MemoryStore {
        pub fn new(articles: Vec<ArticleRecord>) -> Self {
            Self {
                articles: Mutex::new(articles),
                behavior: Mutex::new(StoreBehavior::Normal),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn set_behavior(&self, behavior: StoreBehavior) {
            *self.behavior.lock().unwrap_or_else(|e| e.into_inner()) = behavior;
        }

        /// Number of queries issued against this store
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn enter(&self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let behavior = *self.behavior.lock().unwrap_or_else(|e| e.into_inner());
            match behavior {
                StoreBehavior::Normal => Ok(()),
                StoreBehavior::Fail => Err(AppError::DatabaseConnection {
                    message: "connection refused (relation \"published_articles\")".to_string(),
                }),
                StoreBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
            }
        }

        fn snapshot(&self) -> Vec<ArticleRecord> {
            self.articles.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }
    }

    impl Default for MemoryStore {
        fn default() -> Self {
            Self::new(Vec::new())
        }
    }

    #[async_trait]
    impl ArticleStore for MemoryStore {
        async fn list_published_articles(&self, limit: u64) -> Result<Vec<ArticleRecord>> {
            self.enter().await?;
            let mut articles = self.snapshot();
            articles.sort_by(|a, b| b.published_date.cmp(&a.published_date));
            articles.truncate(limit as usize);
            Ok(articles)
        }

        async fn get_published_article_by_id(&self, id: Uuid) -> Result<Option<ArticleRecord>> {
            self.enter().await?;
            Ok(self.snapshot().into_iter().find(|a| a.id == id))
        }

        async fn list_published_article_identifiers(&self, limit: u64) -> Result<Vec<ArticleIdentifier>> {
            self.enter().await?;
            let mut articles = self.snapshot();
            articles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(articles
                .into_iter()
                .take(limit as usize)
                .map(|a| ArticleIdentifier {
                    id: a.id,
                    created_at: a.created_at,
                })
                .collect())
        }

        async fn ping(&self) -> Result<()> {
            self.enter().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(n: u32, day: u32) -> ArticleRecord {
        let date = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        ArticleRecord {
            id: Uuid::from_u128(n as u128),
            published_date: date,
            page_range: None,
            created_at: date,
            manuscript: ManuscriptInfo {
                title: format!("Article {}", n),
                abstract_text: String::new(),
                subject_area: "Virology".into(),
                keywords: vec![],
                doi: None,
                authors: vec![],
            },
            issue: IssueInfo { volume: 1, number: 1, year: 2024 },
        }
    }

    #[test]
    fn test_author_display_with_institution() {
        let author = AuthorInfo {
            full_name: "Amina Diallo".into(),
            institution: Some("University of Dakar".into()),
        };
        assert_eq!(author.display_with_institution(), "Amina Diallo (University of Dakar)");

        let bare = AuthorInfo { full_name: "K. Mensah".into(), institution: Some(" ".into()) };
        assert_eq!(bare.display_with_institution(), "K. Mensah");
    }

    #[test]
    fn test_doi_normalization() {
        let mut manuscript = record(1, 1).manuscript;
        for stored in ["10.1234/x", "https://doi.org/10.1234/x", "doi:10.1234/x", " http://dx.doi.org/10.1234/x "] {
            manuscript.doi = Some(stored.to_string());
            assert_eq!(manuscript.bare_doi(), Some("10.1234/x"), "{}", stored);
            assert_eq!(manuscript.doi_url().as_deref(), Some("https://doi.org/10.1234/x"));
        }

        manuscript.doi = Some("  ".into());
        assert_eq!(manuscript.doi_url(), None);
    }

    #[test]
    fn test_memory_store_orders_and_limits() {
        let store = MemoryStore::new(vec![record(1, 3), record(2, 9), record(3, 5)]);
        let listed = tokio_test::block_on(store.list_published_articles(2)).unwrap();
        let ids: Vec<_> = listed.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![Uuid::from_u128(2), Uuid::from_u128(3)]);
        assert_eq!(store.calls(), 1);
    }

    #[test]
    fn test_memory_store_failure_mode() {
        let store = MemoryStore::new(vec![record(1, 1)]);
        store.set_behavior(StoreBehavior::Fail);
        assert!(tokio_test::block_on(store.get_published_article_by_id(Uuid::from_u128(1))).is_err());
    }
}
