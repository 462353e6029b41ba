//! SeaORM-backed catalog repository
//!
//! Each listing runs one ordered, limited query over `published_articles`
//! and then resolves manuscripts, authors and issues with batched `IN`
//! lookups, so a page of 1000 records costs four round trips.

use crate::db::models::*;
use crate::db::store::{
    ArticleIdentifier, ArticleRecord, ArticleStore, AuthorInfo, IssueInfo, ManuscriptInfo,
};
use crate::db::DbPool;
use crate::errors::Result;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

/// Repository for catalog reads
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Join published articles with their manuscript, authors and issue,
    /// keeping the input order
    async fn assemble(&self, articles: Vec<PublishedArticle>) -> Result<Vec<ArticleRecord>> {
        if articles.is_empty() {
            return Ok(Vec::new());
        }

        let manuscript_ids: Vec<Uuid> = articles.iter().map(|a| a.manuscript_id).collect();
        let issue_ids: Vec<Uuid> = articles.iter().map(|a| a.issue_id).collect();

        let manuscripts: HashMap<Uuid, Manuscript> = ManuscriptEntity::find()
            .filter(ManuscriptColumn::Id.is_in(manuscript_ids.clone()))
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|m| (m.id, m))
            .collect();

        let mut authors: HashMap<Uuid, Vec<AuthorInfo>> = HashMap::new();
        for author in ManuscriptAuthorEntity::find()
            .filter(ManuscriptAuthorColumn::ManuscriptId.is_in(manuscript_ids))
            .order_by_asc(ManuscriptAuthorColumn::ManuscriptId)
            .order_by_asc(ManuscriptAuthorColumn::AuthorOrder)
            .all(self.read_conn())
            .await?
        {
            authors.entry(author.manuscript_id).or_default().push(AuthorInfo {
                full_name: author.full_name,
                institution: author.institution,
            });
        }

        let issues: HashMap<Uuid, Issue> = IssueEntity::find()
            .filter(IssueColumn::Id.is_in(issue_ids))
            .all(self.read_conn())
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        let mut records = Vec::with_capacity(articles.len());
        for article in articles {
            let (Some(manuscript), Some(issue)) = (
                manuscripts.get(&article.manuscript_id),
                issues.get(&article.issue_id),
            ) else {
                warn!(
                    article_id = %article.id,
                    manuscript_id = %article.manuscript_id,
                    issue_id = %article.issue_id,
                    "Published article references a missing manuscript or issue, skipping"
                );
                continue;
            };

            records.push(ArticleRecord {
                id: article.id,
                published_date: article.published_date.with_timezone(&Utc),
                page_range: article.page_range,
                created_at: article.created_at.with_timezone(&Utc),
                manuscript: ManuscriptInfo {
                    title: manuscript.title.clone(),
                    abstract_text: manuscript.abstract_text.clone(),
                    subject_area: manuscript.subject_area.clone(),
                    keywords: manuscript.keyword_list(),
                    doi: manuscript.doi.clone(),
                    authors: authors.get(&manuscript.id).cloned().unwrap_or_default(),
                },
                issue: IssueInfo {
                    volume: issue.volume,
                    number: issue.number,
                    year: issue.year,
                },
            });
        }

        Ok(records)
    }
}

#[async_trait]
impl ArticleStore for Repository {
    async fn list_published_articles(&self, limit: u64) -> Result<Vec<ArticleRecord>> {
        let articles = PublishedArticleEntity::find()
            .order_by_desc(PublishedArticleColumn::PublishedDate)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        self.assemble(articles).await
    }

    async fn get_published_article_by_id(&self, id: Uuid) -> Result<Option<ArticleRecord>> {
        let Some(article) = PublishedArticleEntity::find_by_id(id)
            .one(self.read_conn())
            .await?
        else {
            return Ok(None);
        };

        Ok(self.assemble(vec![article]).await?.into_iter().next())
    }

    async fn list_published_article_identifiers(&self, limit: u64) -> Result<Vec<ArticleIdentifier>> {
        let rows: Vec<(Uuid, DateTimeWithTimeZone)> = PublishedArticleEntity::find()
            .select_only()
            .column(PublishedArticleColumn::Id)
            .column(PublishedArticleColumn::CreatedAt)
            .order_by_desc(PublishedArticleColumn::CreatedAt)
            .limit(limit)
            .into_tuple()
            .all(self.read_conn())
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, created_at)| ArticleIdentifier {
                id,
                created_at: created_at.with_timezone(&Utc),
            })
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}
