//! Summary and image heuristics for articles that arrive without either.
//!
//! Both work off a coarse topic detected from the title. Summaries are
//! extractive (leading sentences of the body) with a canned per-topic paragraph
//! as fallback; images are drawn at random from a fixed per-topic pool.

use once_cell::sync::Lazy;
use rand::seq::IndexedRandom;
use rand::Rng;
use regex::Regex;

const MIN_BODY_CHARS: usize = 10;
const MIN_SENTENCE_CHARS: usize = 15;
const MAX_SENTENCES: usize = 4;
const TARGET_WORDS: usize = 150;
const THIN_SUMMARY_WORDS: usize = 30;

pub const DESCRIPTION_MAX_CHARS: usize = 200;

/// Coarse subject of an article, derived from title keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Bitcoin,
    Ethereum,
    Defi,
    Nft,
    Trading,
    Regulation,
}

/// Priority order used when picking a fallback summary.
pub const SUMMARY_TOPICS: [Topic; 6] = [
    Topic::Bitcoin,
    Topic::Ethereum,
    Topic::Defi,
    Topic::Nft,
    Topic::Trading,
    Topic::Regulation,
];

/// Priority order used when picking an image pool. Regulation has no pool.
pub const IMAGE_TOPICS: [Topic; 5] = [
    Topic::Bitcoin,
    Topic::Ethereum,
    Topic::Defi,
    Topic::Trading,
    Topic::Nft,
];

impl Topic {
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Topic::Bitcoin => &["bitcoin", "btc"],
            Topic::Ethereum => &["ethereum", "eth"],
            Topic::Defi => &["defi", "yield", "staking"],
            Topic::Nft => &["nft", "art", "collection"],
            Topic::Trading => &["trading", "market", "price"],
            Topic::Regulation => &["regulation", "sec", "legal"],
        }
    }

    /// First topic in `order` whose keywords appear as a word of `title`.
    ///
    /// Matching is per word (case-insensitive, plural `s` tolerated) so that
    /// "sec" does not fire on "security" and "art" does not fire on "start".
    pub fn detect(title: &str, order: &[Topic]) -> Option<Topic> {
        let lower = title.to_lowercase();
        let words: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        order.iter().copied().find(|topic| {
            topic.keywords().iter().any(|kw| {
                words
                    .iter()
                    .any(|w| *w == *kw || w.strip_suffix('s') == Some(*kw))
            })
        })
    }

    fn paragraph(&self) -> &'static str {
        match self {
            Topic::Bitcoin => "Bitcoin remains the bellwether of the digital asset market. Movements in BTC continue to shape sentiment across the wider crypto ecosystem, with traders watching on-chain activity, institutional flows and macroeconomic signals for clues about the next leg of the cycle. Analysts note that network fundamentals such as hash rate and long-term holder supply stay central to the outlook.",
            Topic::Ethereum => "Ethereum continues to anchor the smart contract landscape. Developments around ETH touch everything from layer-two scaling and staking participation to the applications built on top of the network. Market participants are tracking gas usage, validator activity and upgrade progress as indicators of the ecosystem's health and long-term demand.",
            Topic::Defi => "Decentralized finance keeps evolving as protocols compete on yield, security and capital efficiency. Staking rewards, lending markets and liquidity incentives remain in focus while users weigh returns against smart contract and market risk. Total value locked and protocol revenue are the figures most closely watched by the sector.",
            Topic::Nft => "The NFT market is reshaping how digital art and collectibles are created, traded and owned. Collections and marketplaces are experimenting with new royalty models, utility features and community incentives. Trading volumes and floor prices remain volatile as the sector searches for sustainable demand beyond speculation.",
            Topic::Trading => "Crypto markets continue to react to shifting liquidity, derivatives positioning and broader risk appetite. Traders are monitoring price action across major assets, funding rates and exchange flows for signs of momentum or exhaustion. Volatility remains elevated, making risk management a priority for both retail and institutional participants.",
            Topic::Regulation => "Regulatory developments remain a major driver for the digital asset industry. Agencies including the SEC continue to refine their approach to exchanges, token issuers and custody, while lawmakers debate clearer legal frameworks. Market participants are watching closely, as policy decisions can shape institutional adoption and compliance costs across the sector.",
        }
    }
}

const GENERIC_PARAGRAPH: &str = "The cryptocurrency ecosystem continues advancing as builders, investors and regulators adapt to a fast-moving market. New protocols, infrastructure upgrades and institutional products are launching alongside ongoing debates about security and sustainability. Observers expect continued innovation to drive both opportunity and volatility across digital assets in the months ahead.";

const BOILERPLATE: &str = "Stay informed with the latest developments in the cryptocurrency market, covering prices, technology and regulation across the digital asset space.";

const BITCOIN_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1518546305927-5a555bb7020d?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1621761191319-c6fb62004040?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1605792657660-596af9009e82?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1543699565-003b8adda5fc?w=800&h=400&fit=crop",
];

const ETHEREUM_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1622630998477-20aa696ecb05?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1639762681057-408e52192e55?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1621504450181-5d356f61d307?w=800&h=400&fit=crop",
];

const DEFI_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1639322537228-f710d846310a?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1642104704074-907c0698cbd9?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1640340434855-6084b1f4901c?w=800&h=400&fit=crop",
];

const TRADING_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1611974789855-9c2a0a7236a3?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1590283603385-17ffb3a7f29f?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1642790106117-e829e14a795f?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1535320903710-d993d3d77d29?w=800&h=400&fit=crop",
];

const NFT_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1645731504636-fae7b3e1a1c4?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1646463535368-0c6ad6e6d0f6?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1620321023374-d1a68fbc720d?w=800&h=400&fit=crop",
];

const GENERAL_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1639762681485-074b7f938ba0?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1620321023374-d1a68fbc720d?w=800&h=400&fit=crop&q=80",
    "https://images.unsplash.com/photo-1516245834210-c4c142787335?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1559526324-4b87b5e36e44?w=800&h=400&fit=crop",
    "https://images.unsplash.com/photo-1563986768609-322da13575f3?w=800&h=400&fit=crop",
];

/// Image pool for a topic; `None` (or a topic without a pool) yields the general pool.
pub fn image_pool(topic: Option<Topic>) -> &'static [&'static str] {
    match topic {
        Some(Topic::Bitcoin) => BITCOIN_IMAGES,
        Some(Topic::Ethereum) => ETHEREUM_IMAGES,
        Some(Topic::Defi) => DEFI_IMAGES,
        Some(Topic::Trading) => TRADING_IMAGES,
        Some(Topic::Nft) => NFT_IMAGES,
        Some(Topic::Regulation) | None => GENERAL_IMAGES,
    }
}

/// Pick an illustrative image URL for `title`.
pub fn derive_image_url<R: Rng + ?Sized>(title: &str, rng: &mut R) -> &'static str {
    let pool = image_pool(Topic::detect(title, &IMAGE_TOPICS));
    pool.choose(rng).copied().unwrap_or(GENERAL_IMAGES[0])
}

/// Canned paragraph for the title's topic, or boilerplate without a title.
pub fn fallback_summary(title: Option<&str>) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => Topic::detect(t, &SUMMARY_TOPICS)
            .map(|topic| topic.paragraph())
            .unwrap_or(GENERIC_PARAGRAPH)
            .to_string(),
        None => BOILERPLATE.to_string(),
    }
}

static RE_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^\p{L}\p{N}\s.,!?'"%$:;\-]"#).expect("noise regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Sentences of `text` long enough to carry meaning, in order, without terminators.
pub fn split_sentences(text: &str) -> Vec<String> {
    let cleaned = RE_NOISE.replace_all(text, " ");
    let cleaned = RE_WS.replace_all(&cleaned, " ");
    cleaned
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.chars().count() >= MIN_SENTENCE_CHARS)
        .map(str::to_string)
        .collect()
}

/// Short extractive summary of `body`, falling back to a topic paragraph.
pub fn derive_summary(body: Option<&str>, title: Option<&str>) -> String {
    let body = match body.map(str::trim) {
        Some(b) if b.chars().count() >= MIN_BODY_CHARS => b,
        _ => return fallback_summary(title),
    };

    let mut picked: Vec<String> = Vec::new();
    let mut words = 0usize;
    for sentence in split_sentences(body) {
        let n = sentence.split_whitespace().count();
        if !picked.is_empty() && (picked.len() >= MAX_SENTENCES || words + n > TARGET_WORDS) {
            break;
        }
        words += n;
        picked.push(format!("{sentence}."));
    }

    let has_title = title.is_some_and(|t| !t.trim().is_empty());
    if picked.is_empty() || (words < THIN_SUMMARY_WORDS && has_title) {
        return fallback_summary(title);
    }
    picked.join(" ")
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_description(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.truncate(out.trim_end().len());
    out.push_str("...");
    out
}
