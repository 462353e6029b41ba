//! RSS 2.0 feed of recently published articles
//!
//! The channel lists the newest `feed.item_limit` articles by published
//! date. Dates use RFC 1123 as RSS 2.0 requires; the DOI, when present, is
//! carried as `prism:doi`.

use crate::config::{AppConfig, FeedConfig, RepositoryConfig};
use crate::db::{with_query_timeout, ArticleRecord, ArticleStore};
use crate::errors::Result;
use crate::metrics;
use crate::xml::XmlDocument;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

pub const RSS_VERSION: &str = "2.0";
pub const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";
pub const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";
pub const PRISM_NAMESPACE: &str = "http://prismstandard.org/namespaces/basic/2.0/";

/// `Content-Type` of a rendered feed
pub const CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

/// RFC 1123 date, e.g. `Sat, 01 Jun 2024 12:00:00 GMT`
pub fn rfc1123(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Renders the RSS channel over a read-only `ArticleStore`
#[derive(Debug, Clone)]
pub struct FeedRenderer {
    feed: FeedConfig,
    repository: RepositoryConfig,
    query_timeout: Duration,
}

impl FeedRenderer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            feed: config.feed.clone(),
            repository: config.repository.clone(),
            query_timeout: config.query_timeout(),
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn item_limit(&self) -> u64 {
        self.feed.item_limit
    }

    /// `Cache-Control` value for successful responses
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.feed.cache_max_age_secs)
    }

    /// Query the newest articles and render the feed
    pub async fn latest(&self, store: &dyn ArticleStore, now: DateTime<Utc>) -> Result<String> {
        let articles = with_query_timeout(
            "list_published_articles",
            self.query_timeout,
            store.list_published_articles(self.feed.item_limit),
        )
        .await?;

        self.render(&articles, now)
    }

    /// Render a feed from already-fetched articles.
    ///
    /// Items are ordered by published date, newest first, and capped at
    /// the item limit whatever order and length the input has.
    pub fn render(&self, articles: &[ArticleRecord], now: DateTime<Utc>) -> Result<String> {
        let mut items: Vec<&ArticleRecord> = articles.iter().collect();
        items.sort_by(|a, b| b.published_date.cmp(&a.published_date));
        items.truncate(self.feed.item_limit as usize);

        let build_date = rfc1123(now);
        let ttl = self.feed.ttl_minutes.to_string();

        let mut doc = XmlDocument::new()?;
        doc.element(
            "rss",
            &[
                ("version", RSS_VERSION),
                ("xmlns:atom", ATOM_NAMESPACE),
                ("xmlns:dc", crate::oai::DC_NAMESPACE),
                ("xmlns:content", CONTENT_NAMESPACE),
                ("xmlns:prism", PRISM_NAMESPACE),
            ],
            |doc| {
                doc.element("channel", &[], |doc| {
                    doc.text_element("title", &[], &self.feed.title)?;
                    doc.text_element("link", &[], &self.repository.site_url)?;
                    doc.text_element("description", &[], &self.feed.description)?;
                    doc.text_element("language", &[], "en")?;
                    doc.text_element("lastBuildDate", &[], &build_date)?;
                    doc.text_element("pubDate", &[], &build_date)?;
                    doc.text_element("ttl", &[], &ttl)?;
                    doc.empty(
                        "atom:link",
                        &[
                            ("href", self.feed.self_url.as_str()),
                            ("rel", "self"),
                            ("type", "application/rss+xml"),
                        ],
                    )?;
                    doc.element("image", &[], |doc| {
                        doc.text_element("url", &[], &self.feed.image_url)?;
                        doc.text_element("title", &[], &self.feed.title)?;
                        doc.text_element("link", &[], &self.repository.site_url)
                    })?;

                    items.iter().try_for_each(|article| self.write_item(doc, article))
                })
            },
        )?;

        metrics::record_feed_items(items.len());
        debug!(items = items.len(), "Rendered RSS feed");

        doc.finish()
    }

    fn write_item(&self, doc: &mut XmlDocument, article: &ArticleRecord) -> Result<()> {
        let manuscript = &article.manuscript;
        let url = self.repository.article_url(article.id);
        let authors = manuscript
            .authors
            .iter()
            .map(|a| a.full_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        doc.element("item", &[], |doc| {
            doc.text_element("title", &[], &manuscript.title)?;
            doc.text_element("link", &[], &url)?;
            doc.text_element("description", &[], &manuscript.abstract_text)?;
            doc.optional_text_element("author", Some(authors.as_str()))?;
            doc.text_element("pubDate", &[], &rfc1123(article.published_date))?;
            doc.text_element("guid", &[("isPermaLink", "true")], &url)?;
            doc.optional_text_element("prism:doi", manuscript.bare_doi())?;

            for keyword in &manuscript.keywords {
                doc.text_element("category", &[], keyword)?;
            }

            doc.text_element(
                "source",
                &[("url", self.feed.self_url.as_str())],
                &self.repository.journal_title,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::{article, article_id, hostile_article, render_instant};
    use crate::db::{MemoryStore, StoreBehavior};
    use crate::errors::AppError;
    use pretty_assertions::assert_eq;

    fn renderer() -> FeedRenderer {
        FeedRenderer::new(&AppConfig::default())
    }

    fn item_texts(body: &str, name: &str) -> Vec<String> {
        let doc = roxmltree::Document::parse(body).expect("well-formed XML");
        doc.descendants()
            .filter(|n| n.has_tag_name("item"))
            .flat_map(|item| item.children().filter(move |c| c.is_element() && c.tag_name().name() == name))
            .map(|n| n.text().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_rfc1123() {
        assert_eq!(rfc1123(render_instant()), "Sat, 01 Jun 2024 12:00:00 GMT");
    }

    #[test]
    fn test_channel_fields() {
        let body = renderer().render(&[article(1, 0)], render_instant()).unwrap();
        let doc = roxmltree::Document::parse(&body).unwrap();

        let rss = doc.root_element();
        assert_eq!(rss.tag_name().name(), "rss");
        assert_eq!(rss.attribute("version"), Some("2.0"));

        let channel = rss.children().find(|n| n.has_tag_name("channel")).unwrap();
        let field = |name: &str| {
            channel
                .children()
                .find(|n| n.is_element() && n.tag_name().name() == name)
                .and_then(|n| n.text())
                .map(str::to_string)
        };
        assert_eq!(field("language").as_deref(), Some("en"));
        assert_eq!(field("ttl").as_deref(), Some("1440"));
        assert_eq!(field("lastBuildDate").as_deref(), Some("Sat, 01 Jun 2024 12:00:00 GMT"));
        assert_eq!(field("pubDate"), field("lastBuildDate"));

        let self_link = channel
            .children()
            .find(|n| n.has_tag_name((ATOM_NAMESPACE, "link")))
            .unwrap();
        assert_eq!(self_link.attribute("rel"), Some("self"));
        assert_eq!(self_link.attribute("href"), Some("https://ajvs.org/api/rss"));
        assert!(channel.children().any(|n| n.has_tag_name("image")));
    }

    #[test]
    fn test_item_fields() {
        let body = renderer().render(&[article(1, 0)], render_instant()).unwrap();
        let url = format!("https://ajvs.org/articles/{}", article_id(1));

        assert_eq!(item_texts(&body, "link"), vec![url.clone()]);
        assert_eq!(item_texts(&body, "guid"), vec![url]);
        assert_eq!(item_texts(&body, "author"), vec!["Amina Diallo, Kwame Mensah"]);
        assert_eq!(item_texts(&body, "pubDate"), vec!["Mon, 01 Jan 2024 08:30:00 GMT"]);
        assert_eq!(item_texts(&body, "doi"), vec!["10.1234/x"]);
        assert_eq!(item_texts(&body, "category"), vec!["a", "b"]);
        assert_eq!(item_texts(&body, "source"), vec!["African Journal of Veterinary Sciences"]);
    }

    #[test]
    fn test_one_category_per_keyword_verbatim() {
        let mut record = article(1, 0);
        record.manuscript.keywords = vec![" spaced ".into(), String::new(), "b".into()];
        let body = renderer().render(&[record], render_instant()).unwrap();
        assert_eq!(item_texts(&body, "category"), vec![" spaced ", "", "b"]);
    }

    #[test]
    fn test_doi_omitted_when_absent() {
        let mut record = article(1, 0);
        record.manuscript.doi = None;
        let body = renderer().render(&[record], render_instant()).unwrap();
        assert!(item_texts(&body, "doi").is_empty());
    }

    #[test]
    fn test_at_most_fifty_items_newest_first() {
        let articles: Vec<_> = (0..75).map(|n| article(n, (n as i64 * 37) % 75)).collect();
        let body = renderer().render(&articles, render_instant()).unwrap();

        let dates: Vec<DateTime<Utc>> = item_texts(&body, "pubDate")
            .iter()
            .map(|d| DateTime::parse_from_rfc2822(&d.replace("GMT", "+0000")).unwrap().with_timezone(&Utc))
            .collect();

        assert_eq!(dates.len(), 50);
        assert!(dates.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(dates[0], articles.iter().map(|a| a.published_date).max().unwrap());
    }

    #[test]
    fn test_hostile_text_escaped_like_oai() {
        let hostile = hostile_article(1, 0);
        let body = renderer().render(&[hostile.clone()], render_instant()).unwrap();

        assert!(body.contains("Ticks &amp; &lt;b&gt;lice&lt;/b&gt; in &quot;free-range&quot; goats: O&apos;Neill&apos;s survey"));
        assert_eq!(item_texts(&body, "title"), vec![hostile.manuscript.title.clone()]);
        assert_eq!(item_texts(&body, "author"), vec!["D'Souza <editor>, Kwame Mensah"]);
        assert_eq!(item_texts(&body, "category"), vec!["<script>", "Q&A"]);
    }

    #[tokio::test]
    async fn test_latest_queries_item_limit() {
        let store = MemoryStore::new((0..60).map(|n| article(n, n as i64)).collect());
        let body = renderer().latest(&store, render_instant()).await.unwrap();

        assert_eq!(item_texts(&body, "title").len(), 50);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_latest_surfaces_store_errors() {
        let store = MemoryStore::new(vec![article(1, 0)]);
        store.set_behavior(StoreBehavior::Hang);

        let err = renderer()
            .with_query_timeout(Duration::from_millis(20))
            .latest(&store, render_instant())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StoreTimeout { .. }));
    }

    #[test]
    fn test_cache_control() {
        assert_eq!(renderer().cache_control(), "public, max-age=3600");
    }
}
