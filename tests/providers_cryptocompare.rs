use crypto_news_pipeline::ingest::providers::cryptocompare::{CryptoCompareProvider, MAX_ITEMS};
use crypto_news_pipeline::ingest::summary::{image_pool, Topic};
use crypto_news_pipeline::ingest::types::{Sentiment, SourceProvider};
use std::fs;

fn fixture() -> String {
    fs::read_to_string("tests/fixtures/cryptocompare_news.json")
        .expect("missing tests/fixtures/cryptocompare_news.json")
}

#[tokio::test]
async fn fifteen_items_yield_at_most_ten_neutral_articles() {
    let provider = CryptoCompareProvider::from_fixture(&fixture());
    let items = provider.fetch_latest().await.expect("cryptocompare parse ok");

    assert_eq!(items.len(), MAX_ITEMS, "response has 15 items, adapter keeps 10");
    assert!(items.iter().all(|a| a.sentiment == Sentiment::Neutral));
    assert!(items.iter().all(|a| a.source == "CoinDesk"));
    assert!(items.iter().all(|a| !a.summary.is_empty() && !a.image_url.is_empty()));
    assert!(items.iter().all(|a| a.description.chars().count() <= 200));
}

#[tokio::test]
async fn gaps_are_filled_from_guid_and_heuristics() {
    let provider = CryptoCompareProvider::from_fixture(&fixture());
    let items = provider.fetch_latest().await.expect("cryptocompare parse ok");

    // Item 4 has an empty url; the guid stands in.
    assert_eq!(items[4].url, "https://news.example.com/guid/4");

    // Item 0 ships without an image; its title is about Bitcoin.
    assert!(image_pool(Some(Topic::Bitcoin)).contains(&items[0].image_url.as_str()));
    assert_eq!(
        items[1].image_url,
        "https://images.cryptocompare.com/news/default/1.png"
    );

    assert_eq!(items[0].category.as_deref(), Some("BTC"));
    assert_eq!(items[0].published_at.timestamp(), 1_714_550_000);
    assert!(items[0]
        .summary
        .starts_with("Bitcoin extended its rally during the Asian session"));
}

#[tokio::test]
async fn malformed_payload_is_an_error() {
    let provider = CryptoCompareProvider::from_fixture("<html>rate limited</html>");
    assert!(provider.fetch_latest().await.is_err());
}
