// tests/ingest_pipeline.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use crypto_news_pipeline::ingest::providers::reddit::RedditProvider;
use crypto_news_pipeline::ingest::types::{Article, Sentiment, SourceProvider};
use crypto_news_pipeline::ingest;
use crypto_news_pipeline::market::Cryptocurrency;
use crypto_news_pipeline::storage::{
    ArticleFilter, MemoryStorage, RedditPost, Storage, StoredArticle,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn article(title: &str, url: &str) -> Article {
    Article {
        title: title.to_string(),
        description: "desc".to_string(),
        content: None,
        url: url.to_string(),
        source: "Mock".to_string(),
        author: None,
        published_at: Utc::now(),
        image_url: "https://img.test/a.png".to_string(),
        sentiment: Sentiment::Neutral,
        category: None,
        summary: "summary".to_string(),
    }
}

struct FailingProvider;

#[async_trait]
impl SourceProvider for FailingProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        Err(anyhow!("simulated network error"))
    }
    fn name(&self) -> &'static str {
        "CryptoCompare"
    }
}

struct CountingProvider {
    calls: Arc<AtomicUsize>,
    articles: Vec<Article>,
}

#[async_trait]
impl SourceProvider for CountingProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.articles.clone())
    }
    fn name(&self) -> &'static str {
        "Counting"
    }
}

#[tokio::test]
async fn failing_provider_does_not_stop_the_next_one() {
    let reddit_json = std::fs::read_to_string("tests/fixtures/reddit_hot.json").expect("fixture");
    let providers: Vec<Box<dyn SourceProvider>> = vec![
        Box::new(FailingProvider),
        Box::new(RedditProvider::from_fixture("CryptoCurrency", &reddit_json)),
    ];
    let storage = MemoryStorage::new();

    let persisted = ingest::run_ingestion(&providers, &storage).await;

    assert_eq!(persisted.len(), 2, "reddit link posts still persisted");
    assert!(persisted.iter().all(|r| r.article.source == "Reddit Crypto"));
}

#[tokio::test]
async fn every_provider_is_invoked_once_per_run() {
    let calls = Arc::new(AtomicUsize::new(0));
    let providers: Vec<Box<dyn SourceProvider>> = vec![
        Box::new(FailingProvider),
        Box::new(CountingProvider {
            calls: calls.clone(),
            articles: vec![article("a", "https://x.test/a")],
        }),
    ];
    let storage = MemoryStorage::new();
    ingest::run_ingestion(&providers, &storage).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn same_url_twice_in_one_run_is_one_row() {
    let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(CountingProvider {
        calls: Arc::new(AtomicUsize::new(0)),
        articles: vec![
            article("First take", "https://x.test/dup"),
            article("Second take", "https://x.test/dup"),
        ],
    })];
    let storage = MemoryStorage::new();
    ingest::run_ingestion(&providers, &storage).await;

    let rows = storage
        .get_articles(10, &ArticleFilter::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].article.title, "First take");
}

#[tokio::test]
async fn rerun_of_already_stored_articles_persists_nothing() {
    let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(CountingProvider {
        calls: Arc::new(AtomicUsize::new(0)),
        articles: vec![
            article("Alpha", "https://x.test/a"),
            article("Beta", "https://x.test/b"),
        ],
    })];
    let storage = MemoryStorage::new();
    assert_eq!(ingest::run_ingestion(&providers, &storage).await.len(), 2);
    assert!(
        ingest::run_ingestion(&providers, &storage).await.is_empty(),
        "second run only sees stored urls"
    );
    let rows = storage
        .get_articles(10, &ArticleFilter::default())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn invalid_articles_are_skipped_siblings_kept() {
    let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(CountingProvider {
        calls: Arc::new(AtomicUsize::new(0)),
        articles: vec![
            article("", "https://x.test/no-title"),
            article("No url", ""),
            article("Good", "https://x.test/good"),
        ],
    })];
    let storage = MemoryStorage::new();
    let persisted = ingest::run_ingestion(&providers, &storage).await;
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].article.title, "Good");
}

/// Storage that rejects one URL and delegates the rest.
struct FlakyStorage {
    inner: MemoryStorage,
    bad_url: &'static str,
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn create_article(&self, article: Article) -> Result<Option<StoredArticle>> {
        if article.url == self.bad_url {
            return Err(anyhow!("unique constraint exploded"));
        }
        self.inner.create_article(article).await
    }
    async fn get_articles(&self, limit: usize, filter: &ArticleFilter) -> Result<Vec<StoredArticle>> {
        self.inner.get_articles(limit, filter).await
    }
    async fn upsert_reddit_post(&self, post: RedditPost) -> Result<RedditPost> {
        self.inner.upsert_reddit_post(post).await
    }
    async fn get_reddit_posts(&self, subreddit: &str, limit: usize) -> Result<Vec<RedditPost>> {
        self.inner.get_reddit_posts(subreddit, limit).await
    }
    async fn upsert_cryptocurrency(&self, coin: Cryptocurrency) -> Result<Cryptocurrency> {
        self.inner.upsert_cryptocurrency(coin).await
    }
    async fn get_cryptocurrencies(&self) -> Result<Vec<Cryptocurrency>> {
        self.inner.get_cryptocurrencies().await
    }
}

#[tokio::test]
async fn storage_failure_skips_only_that_article() {
    let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(CountingProvider {
        calls: Arc::new(AtomicUsize::new(0)),
        articles: vec![
            article("Bad", "https://x.test/bad"),
            article("Fine", "https://x.test/fine"),
        ],
    })];
    let storage = FlakyStorage {
        inner: MemoryStorage::new(),
        bad_url: "https://x.test/bad",
    };
    let persisted = ingest::run_ingestion(&providers, &storage).await;
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].article.url, "https://x.test/fine");
}

#[tokio::test]
async fn run_with_no_contributors_returns_empty() {
    let providers: Vec<Box<dyn SourceProvider>> = vec![Box::new(FailingProvider)];
    let storage = MemoryStorage::new();
    assert!(ingest::run_ingestion(&providers, &storage).await.is_empty());
}
