// src/ingest/providers/reddit.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

use super::{epoch_or, http_client, non_empty};
use crate::ingest::normalize_text;
use crate::ingest::summary::{derive_image_url, derive_summary, truncate_description, DESCRIPTION_MAX_CHARS};
use crate::ingest::types::{Article, Sentiment, SourceProvider};
use crate::storage::RedditPost;

pub const SOURCE_NAME: &str = "Reddit Crypto";
pub const LISTING_LIMIT: usize = 10;
pub const MAX_ARTICLES: usize = 5;
pub const CATEGORY: &str = "Community";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: PostData,
}

/// Fields used from a `t3` listing entry.
#[derive(Debug, Default, Deserialize)]
pub struct PostData {
    pub id: Option<String>,
    pub title: Option<String>,
    pub selftext: Option<String>,
    pub author: Option<String>,
    pub subreddit: Option<String>,
    pub url: Option<String>,
    pub permalink: Option<String>,
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub is_self: bool,
    pub ups: Option<i64>,
    pub score: Option<i64>,
    pub num_comments: Option<i64>,
    pub thumbnail: Option<String>,
    pub preview: Option<Preview>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Preview {
    #[serde(default)]
    pub images: Vec<PreviewImage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PreviewImage {
    pub source: Option<ImageSource>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImageSource {
    pub url: Option<String>,
}

impl PostData {
    /// Link posts to off-site content; self-posts and reddit.com links are not news.
    pub fn is_external_link(&self) -> bool {
        !self.is_self
            && self
                .url
                .as_deref()
                .is_some_and(|u| !u.is_empty() && !u.to_ascii_lowercase().contains("reddit.com"))
    }

    fn image(&self) -> Option<String> {
        let preview = self
            .preview
            .as_ref()
            .and_then(|p| p.images.first())
            .and_then(|i| i.source.as_ref())
            .and_then(|s| s.url.as_deref())
            .map(|u| html_escape::decode_html_entities(u).to_string());
        let thumb = self
            .thumbnail
            .as_deref()
            .filter(|t| t.starts_with("http"))
            .map(str::to_string);
        preview.or(thumb)
    }

    fn created(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        epoch_or(self.created_utc.map(|t| t as i64), now)
    }
}

pub fn parse_listing(body: &str) -> Result<Vec<PostData>> {
    let listing: Listing = serde_json::from_str(body).context("parsing reddit listing json")?;
    Ok(listing.data.children.into_iter().map(|c| c.data).collect())
}

/// Query string of the hot listing request.
pub fn listing_query() -> Vec<(&'static str, String)> {
    vec![("limit", LISTING_LIMIT.to_string())]
}

/// Map a link post to a canonical article. Never fails; gaps get defaults.
pub fn map_post<R: Rng + ?Sized>(post: PostData, now: DateTime<Utc>, rng: &mut R) -> Article {
    let title = non_empty(post.title.clone()).map(|t| normalize_text(&t)).unwrap_or_default();
    let content = non_empty(post.selftext.clone())
        .map(|t| normalize_text(&t))
        .filter(|t| !t.is_empty());
    let image_url = post
        .image()
        .unwrap_or_else(|| derive_image_url(&title, rng).to_string());
    let summary = derive_summary(content.as_deref(), Some(&title));
    let description = truncate_description(content.as_deref().unwrap_or(&summary), DESCRIPTION_MAX_CHARS);

    Article {
        published_at: post.created(now),
        title,
        description,
        content,
        url: non_empty(post.url).unwrap_or_default(),
        source: SOURCE_NAME.to_string(),
        author: non_empty(post.author),
        image_url,
        sentiment: Sentiment::Neutral,
        category: Some(CATEGORY.to_string()),
        summary,
    }
}

/// Map any listing entry to a stored Reddit post row.
pub fn map_reddit_post(post: PostData, subreddit: &str, now: DateTime<Utc>) -> RedditPost {
    let created_at = post.created(now);
    let url = match non_empty(post.permalink) {
        Some(p) if p.starts_with('/') => format!("https://www.reddit.com{p}"),
        Some(p) => p,
        None => non_empty(post.url).unwrap_or_default(),
    };
    RedditPost {
        id: non_empty(post.id).unwrap_or_else(|| crate::storage::article_id(&url)),
        title: non_empty(post.title).unwrap_or_default(),
        content: non_empty(post.selftext),
        author: non_empty(post.author).unwrap_or_else(|| "[deleted]".to_string()),
        subreddit: non_empty(post.subreddit).unwrap_or_else(|| subreddit.to_string()),
        upvotes: post.ups.or(post.score).unwrap_or(0),
        comments: post.num_comments.unwrap_or(0),
        url,
        created_at,
    }
}

pub struct RedditProvider {
    subreddit: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        base_url: String,
        client: reqwest::Client,
    },
}

impl RedditProvider {
    pub fn from_fixture(subreddit: &str, s: &str) -> Self {
        Self {
            subreddit: subreddit.to_string(),
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(base_url: &str, subreddit: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            subreddit: subreddit.to_string(),
            mode: Mode::Http {
                base_url: base_url.trim_end_matches('/').to_string(),
                client: http_client(timeout)?,
            },
        })
    }

    async fn listing(&self, subreddit: &str) -> Result<Vec<PostData>> {
        match &self.mode {
            Mode::Fixture(s) => parse_listing(s),
            Mode::Http { base_url, client } => {
                let url = format!("{base_url}/r/{subreddit}/hot.json");
                let body = client
                    .get(&url)
                    .query(&listing_query())
                    .send()
                    .await
                    .context("reddit http get()")?
                    .error_for_status()
                    .context("reddit http status")?
                    .text()
                    .await
                    .context("reddit http .text()")?;
                parse_listing(&body)
            }
        }
    }

    /// Hot posts of `subreddit` as stored rows (self-posts included).
    pub async fn fetch_posts(&self, subreddit: &str) -> Result<Vec<RedditPost>> {
        let posts = self.listing(subreddit).await?;
        let now = Utc::now();
        Ok(posts
            .into_iter()
            .take(LISTING_LIMIT)
            .map(|p| map_reddit_post(p, subreddit, now))
            .collect())
    }
}

#[async_trait]
impl SourceProvider for RedditProvider {
    async fn fetch_latest(&self) -> Result<Vec<Article>> {
        let posts = self.listing(&self.subreddit).await?;
        let t0 = std::time::Instant::now();
        let now = Utc::now();
        let mut rng = rand::rng();
        let out: Vec<Article> = posts
            .into_iter()
            .filter(PostData::is_external_link)
            .take(MAX_ARTICLES)
            .map(|p| map_post(p, now, &mut rng))
            .collect();

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_events_total").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "Reddit"
    }
}
