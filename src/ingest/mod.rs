// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod scheduler;
pub mod summary;
pub mod types;

use crate::ingest::types::{Article, SourceProvider};
use crate::storage::{Storage, StoredArticle};
use anyhow::{bail, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Total articles parsed from providers.");
        describe_counter!(
            "ingest_persisted_total",
            "Articles handed to storage successfully."
        );
        describe_counter!(
            "ingest_rejected_total",
            "Articles rejected by validation (missing title/url)."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Provider fetch/parse errors."
        );
        describe_counter!("ingest_storage_errors_total", "Storage write errors.");
        describe_counter!("ingest_runs_total", "Completed ingestion runs.");
        describe_histogram!("ingest_parse_ms", "Provider parse time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when ingest pipeline last ran."
        );
    });
}

/// Normalize text: decode entities, strip tags, ASCII quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&out, " ").trim().to_string()
}

/// Reject candidates without the identity fields every stored article needs.
pub fn validate_article(a: &Article) -> Result<()> {
    if a.title.trim().is_empty() {
        bail!("article has no title (url={:?})", a.url);
    }
    if a.url.trim().is_empty() {
        bail!("article has no url (title={:?})", a.title);
    }
    Ok(())
}

/// Validate and persist one provider's candidates. Failures are per article.
/// Returns only rows that were newly created; already-stored URLs are skipped.
pub async fn persist_articles(
    provider: &str,
    articles: Vec<Article>,
    storage: &dyn Storage,
) -> Vec<StoredArticle> {
    ensure_metrics_described();

    let mut out = Vec::with_capacity(articles.len());
    for a in articles {
        if let Err(e) = validate_article(&a) {
            tracing::warn!(target: "ingest", provider, error = %e, "skipping invalid article");
            counter!("ingest_rejected_total").increment(1);
            continue;
        }
        match storage.create_article(a).await {
            Ok(Some(row)) => out.push(row),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(target: "ingest", provider, error = ?e, "storage write failed");
                counter!("ingest_storage_errors_total").increment(1);
            }
        }
    }
    counter!("ingest_persisted_total").increment(out.len() as u64);
    out
}

/// Run every provider in order and persist what they yield.
/// A failing provider contributes nothing; the run always completes.
pub async fn run_ingestion(
    providers: &[Box<dyn SourceProvider>],
    storage: &dyn Storage,
) -> Vec<StoredArticle> {
    ensure_metrics_described();

    let mut persisted = Vec::new();
    let mut contributors: Vec<&'static str> = Vec::new();
    for p in providers {
        match p.fetch_latest().await {
            Ok(articles) => {
                let rows = persist_articles(p.name(), articles, storage).await;
                if !rows.is_empty() {
                    contributors.push(p.name());
                }
                persisted.extend(rows);
            }
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, provider = p.name(), "provider error");
                counter!("ingest_provider_errors_total").increment(1);
            }
        }
    }

    let now = chrono::Utc::now().timestamp().max(0);
    counter!("ingest_runs_total").increment(1);
    gauge!("ingest_pipeline_last_run_ts").set(now as f64);

    if contributors.is_empty() {
        tracing::info!(target: "ingest", "ingestion run finished: no new articles");
    } else {
        tracing::info!(
            target: "ingest",
            persisted = persisted.len(),
            providers = %contributors.join(", "),
            "ingestion run finished"
        );
    }
    persisted
}
