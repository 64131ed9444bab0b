//! # Storage
//! Persistence collaborator for articles, Reddit posts and market rows.
//!
//! The HTTP surface and the ingestion run only see the [`Storage`] trait.
//! [`MemoryStorage`] is the in-process implementation: rows live in maps keyed
//! by their natural identity (article URL, post id, coin id), so repeated
//! upserts of the same item never create a second row.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::ingest::types::{Article, Sentiment};
use crate::market::Cryptocurrency;

/// Article as returned to API consumers, with a storage id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredArticle {
    pub id: String,
    #[serde(flatten)]
    pub article: Article,
}

/// Reddit post as listed by `/api/reddit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedditPost {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub author: String,
    pub subreddit: String,
    pub upvotes: i64,
    pub comments: i64,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Optional filters for article listings. Matching is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub source: Option<String>,
    pub category: Option<String>,
    pub sentiment: Option<Sentiment>,
}

impl ArticleFilter {
    fn matches(&self, a: &Article) -> bool {
        let eq = |want: &Option<String>, have: Option<&str>| match want {
            Some(w) => have.is_some_and(|h| h.eq_ignore_ascii_case(w)),
            None => true,
        };
        eq(&self.source, Some(a.source.as_str()))
            && eq(&self.category, a.category.as_deref())
            && self.sentiment.map_or(true, |s| s == a.sentiment)
    }
}

/// Stable short id for an article URL (first 6 bytes of SHA-256, hex).
pub fn article_id(url: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(url.trim().as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// Create an article unless one with the same URL exists.
    /// Returns the new row, or `None` when the URL was already stored.
    async fn create_article(&self, article: Article) -> Result<Option<StoredArticle>>;
    /// Articles matching `filter`, newest `published_at` first.
    async fn get_articles(&self, limit: usize, filter: &ArticleFilter) -> Result<Vec<StoredArticle>>;
    async fn upsert_reddit_post(&self, post: RedditPost) -> Result<RedditPost>;
    /// Posts of one subreddit (case-insensitive), newest first.
    async fn get_reddit_posts(&self, subreddit: &str, limit: usize) -> Result<Vec<RedditPost>>;
    async fn upsert_cryptocurrency(&self, coin: Cryptocurrency) -> Result<Cryptocurrency>;
    /// All market rows ordered by market-cap rank (unranked last).
    async fn get_cryptocurrencies(&self) -> Result<Vec<Cryptocurrency>>;
}

#[derive(Debug, Default)]
struct Inner {
    articles: HashMap<String, StoredArticle>,
    reddit: HashMap<String, RedditPost>,
    coins: HashMap<String, Cryptocurrency>,
}

/// Thread-safe in-memory [`Storage`].
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| anyhow!("storage lock poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| anyhow!("storage lock poisoned"))
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn create_article(&self, article: Article) -> Result<Option<StoredArticle>> {
        let id = article_id(&article.url);
        let mut inner = self.write()?;
        match inner.articles.entry(id.clone()) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(slot) => Ok(Some(slot.insert(StoredArticle { id, article }).clone())),
        }
    }

    async fn get_articles(&self, limit: usize, filter: &ArticleFilter) -> Result<Vec<StoredArticle>> {
        let inner = self.read()?;
        let mut rows: Vec<StoredArticle> = inner
            .articles
            .values()
            .filter(|r| filter.matches(&r.article))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.article
                .published_at
                .cmp(&a.article.published_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn upsert_reddit_post(&self, post: RedditPost) -> Result<RedditPost> {
        let mut inner = self.write()?;
        inner.reddit.insert(post.id.clone(), post.clone());
        Ok(post)
    }

    async fn get_reddit_posts(&self, subreddit: &str, limit: usize) -> Result<Vec<RedditPost>> {
        let inner = self.read()?;
        let mut rows: Vec<RedditPost> = inner
            .reddit
            .values()
            .filter(|p| p.subreddit.eq_ignore_ascii_case(subreddit))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn upsert_cryptocurrency(&self, coin: Cryptocurrency) -> Result<Cryptocurrency> {
        let mut inner = self.write()?;
        inner.coins.insert(coin.id.clone(), coin.clone());
        Ok(coin)
    }

    async fn get_cryptocurrencies(&self) -> Result<Vec<Cryptocurrency>> {
        let inner = self.read()?;
        let mut rows: Vec<Cryptocurrency> = inner.coins.values().cloned().collect();
        rows.sort_by(|a, b| {
            let ra = a.market_cap_rank.unwrap_or(u32::MAX);
            let rb = b.market_cap_rank.unwrap_or(u32::MAX);
            ra.cmp(&rb).then_with(|| a.id.cmp(&b.id))
        });
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article(url: &str, title: &str, hour: u32) -> Article {
        Article {
            title: title.into(),
            description: "d".into(),
            content: None,
            url: url.into(),
            source: "CoinTelegraph".into(),
            author: None,
            published_at: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
            image_url: "https://img.test/x.png".into(),
            sentiment: Sentiment::Neutral,
            category: Some("Bitcoin".into()),
            summary: "s".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_url_keeps_first_row() {
        let st = MemoryStorage::new();
        let a = st.create_article(article("https://x.test/1", "first", 1)).await.unwrap();
        let b = st.create_article(article("https://x.test/1", "second", 2)).await.unwrap();
        assert!(a.is_some());
        assert!(b.is_none(), "duplicate url reports no new row");
        let rows = st.get_articles(10, &ArticleFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].article.title, "first");
    }

    #[tokio::test]
    async fn articles_are_newest_first_and_filtered() {
        let st = MemoryStorage::new();
        st.create_article(article("https://x.test/1", "old", 1)).await.unwrap();
        st.create_article(article("https://x.test/2", "new", 5)).await.unwrap();
        let mut other = article("https://x.test/3", "other", 3);
        other.source = "Reddit Crypto".into();
        other.sentiment = Sentiment::Bullish;
        st.create_article(other).await.unwrap();

        let rows = st.get_articles(10, &ArticleFilter::default()).await.unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r.article.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "other", "old"]);

        let f = ArticleFilter {
            source: Some("reddit crypto".into()),
            ..Default::default()
        };
        assert_eq!(st.get_articles(10, &f).await.unwrap().len(), 1);

        let f = ArticleFilter {
            sentiment: Some(Sentiment::Neutral),
            ..Default::default()
        };
        assert_eq!(st.get_articles(1, &f).await.unwrap()[0].article.title, "new");
    }

    #[test]
    fn article_id_is_stable_and_short() {
        assert_eq!(article_id("https://a.test"), article_id(" https://a.test "));
        assert_ne!(article_id("https://a.test"), article_id("https://b.test"));
        assert_eq!(article_id("https://a.test").len(), 12);
    }
}
