// tests/ingest_config.rs
use crypto_news_pipeline::ingest::config::{load_config_default, load_config_from, DEMO_API_KEY};
use std::{env, fs};

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("ingest.toml");
    fs::write(
        &p_toml,
        r#"
subreddit = "Bitcoin"
startup_delay_secs = 1
market_limit = 25
"#,
    )
    .unwrap();
    let c = load_config_from(&p_toml).unwrap();
    assert_eq!(c.subreddit, "Bitcoin");
    assert_eq!(c.startup_delay_secs, 1);
    assert_eq!(c.market_limit, 25);
    assert_eq!(c.news_page_size, 20, "unset fields keep defaults");

    let p_json = dir.path().join("ingest.json");
    fs::write(&p_json, r#"{"news_page_size": 30, "http_timeout_secs": 3}"#).unwrap();
    let cj = load_config_from(&p_json).unwrap();
    assert_eq!(cj.news_page_size, 30);
    assert_eq!(cj.http_timeout_secs, 3);

    let p_bad = dir.path().join("broken.toml");
    fs::write(&p_bad, "subreddit = [").unwrap();
    assert!(load_config_from(&p_bad).is_err());
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the real repo config/ is not read.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var("INGEST_CONFIG_PATH");
    env::remove_var("CRYPTOCOMPARE_API_KEY");
    env::remove_var("NEWS_API_KEY");

    // 1) Nothing on disk → defaults with the demo key
    let c = load_config_default().unwrap();
    assert_eq!(c.subreddit, "CryptoCurrency");
    assert_eq!(c.news_api_key, DEMO_API_KEY);

    // 2) Fallback TOML in ./config/
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("ingest.toml"), r#"subreddit = "ethereum""#).unwrap();
    assert_eq!(load_config_default().unwrap().subreddit, "ethereum");

    // 3) Env path wins
    let p_env = tmp.path().join("custom.json");
    fs::write(&p_env, r#"{"subreddit": "defi"}"#).unwrap();
    env::set_var("INGEST_CONFIG_PATH", p_env.display().to_string());
    assert_eq!(load_config_default().unwrap().subreddit, "defi");

    // 4) Missing env path is an error
    env::set_var("INGEST_CONFIG_PATH", tmp.path().join("nope.toml").display().to_string());
    assert!(load_config_default().is_err());
    env::remove_var("INGEST_CONFIG_PATH");

    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn api_key_env_overrides() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    env::remove_var("INGEST_CONFIG_PATH");

    env::remove_var("CRYPTOCOMPARE_API_KEY");
    env::set_var("NEWS_API_KEY", "legacy-key");
    assert_eq!(load_config_default().unwrap().news_api_key, "legacy-key");

    env::set_var("CRYPTOCOMPARE_API_KEY", "primary-key");
    let c = load_config_default().unwrap();
    assert_eq!(c.news_api_key, "primary-key");
    assert!(c.has_news_api_key());

    env::remove_var("CRYPTOCOMPARE_API_KEY");
    env::remove_var("NEWS_API_KEY");
    env::set_current_dir(&old).unwrap();
}
