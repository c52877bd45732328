// crates/config/src/lib.rs

use std::collections::HashMap;

use pipa_core::NewsCategory;
use serde::{Deserialize, Serialize};

pub mod loader;
pub mod validator;

pub use loader::ConfigLoader;
pub use validator::ConfigValidator;

/// Main configuration structure. Loaded once at startup, read-only at call
/// time; the core never mutates it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipaConfig {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub home: HomeConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub music: MusicConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub temporal: TemporalConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub holiday: HolidayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// When false (the default) the `data` debug payload is stripped from
    /// every response envelope.
    #[serde(default)]
    pub debug_payload: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            language: default_language(),
            log_level: default_log_level(),
            debug_payload: false,
        }
    }
}

fn default_timezone() -> String {
    "Australia/Melbourne".to_string()
}

fn default_language() -> String {
    "zh".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Home-automation platform endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeConfig {
    #[serde(default = "default_home_api_url")]
    pub api_url: String,
    #[serde(default = "default_home_token_env")]
    pub api_token_env: String,
    #[serde(default = "default_home_timeout_s")]
    pub timeout_s: u64,
    /// Clamp for a server-suggested retry delay on 429 responses.
    #[serde(default = "default_max_retry_after_s")]
    pub max_retry_after_s: u64,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            api_url: default_home_api_url(),
            api_token_env: default_home_token_env(),
            timeout_s: default_home_timeout_s(),
            max_retry_after_s: default_max_retry_after_s(),
        }
    }
}

fn default_home_api_url() -> String {
    "http://homeassistant.local:8123".to_string()
}

fn default_home_token_env() -> String {
    "HASS_TOKEN".to_string()
}

fn default_home_timeout_s() -> u64 {
    10
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Required for the weather route. There is no guessing fallback: when
    /// unset the route returns a configuration guidance message.
    #[serde(default)]
    pub default_entity: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub default_entity: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicConfig {
    #[serde(default)]
    pub default_player: Option<String>,
    /// Spoken room name (or alias) to media player entity id. Longest alias
    /// wins when several occur in one utterance.
    #[serde(default)]
    pub room_aliases: HashMap<String, String>,
    #[serde(default = "default_volume_step")]
    pub volume_step: f64,
    #[serde(default = "default_max_volume_steps")]
    pub max_volume_steps: u32,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            default_player: None,
            room_aliases: HashMap::new(),
            volume_step: default_volume_step(),
            max_volume_steps: default_max_volume_steps(),
        }
    }
}

fn default_volume_step() -> f64 {
    0.05
}

fn default_max_volume_steps() -> u32 {
    10
}

/// Per-category article filtering rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRule {
    /// When non-empty, the article host must match one of these.
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// Required in title or snippet, not in broader metadata.
    #[serde(default)]
    pub anchors: Vec<String>,
    /// Topic vocabulary; also drives classification into this category.
    #[serde(default)]
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_news_categories")]
    pub categories: HashMap<NewsCategory, CategoryRule>,
    /// Cross-category blacklist for international noise items.
    #[serde(default = "default_noise_blacklist")]
    pub noise_blacklist: Vec<String>,
    #[serde(default = "default_news_max_items")]
    pub max_items: usize,
    #[serde(default = "default_news_fetch_limit")]
    pub fetch_limit: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            categories: default_news_categories(),
            noise_blacklist: default_noise_blacklist(),
            max_items: default_news_max_items(),
            fetch_limit: default_news_fetch_limit(),
        }
    }
}

fn default_news_categories() -> HashMap<NewsCategory, CategoryRule> {
    let mut categories = HashMap::new();
    categories.insert(
        NewsCategory::Tech,
        CategoryRule {
            whitelist: Vec::new(),
            blacklist: vec!["彩票".to_string()],
            anchors: vec!["科技".to_string(), "tech".to_string(), "ai".to_string()],
            topics: vec![
                "科技".to_string(),
                "人工智能".to_string(),
                "芯片".to_string(),
                "tech".to_string(),
                "ai".to_string(),
            ],
        },
    );
    categories.insert(
        NewsCategory::Finance,
        CategoryRule {
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            anchors: vec!["财经".to_string(), "股".to_string(), "market".to_string()],
            topics: vec![
                "财经".to_string(),
                "股市".to_string(),
                "汇率".to_string(),
                "finance".to_string(),
                "stocks".to_string(),
            ],
        },
    );
    categories.insert(
        NewsCategory::Sports,
        CategoryRule {
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            anchors: vec!["体育".to_string(), "赛".to_string(), "sport".to_string()],
            topics: vec![
                "体育".to_string(),
                "足球".to_string(),
                "篮球".to_string(),
                "nba".to_string(),
                "sports".to_string(),
            ],
        },
    );
    categories.insert(
        NewsCategory::World,
        CategoryRule {
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            anchors: vec!["国际".to_string(), "world".to_string()],
            topics: vec![
                "国际新闻".to_string(),
                "国际".to_string(),
                "world news".to_string(),
            ],
        },
    );
    categories.insert(
        NewsCategory::Local,
        CategoryRule {
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            anchors: vec!["本地".to_string(), "墨尔本".to_string(), "local".to_string()],
            topics: vec![
                "本地新闻".to_string(),
                "墨尔本".to_string(),
                "维州".to_string(),
                "local news".to_string(),
            ],
        },
    );
    categories
}

fn default_noise_blacklist() -> Vec<String> {
    vec!["广告".to_string(), "推广".to_string(), "sponsored".to_string()]
}

fn default_news_max_items() -> usize {
    5
}

fn default_news_fetch_limit() -> usize {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalConfig {
    /// Upper bound on resolved range length, to stay within downstream
    /// provider limits.
    #[serde(default = "default_max_range_days")]
    pub max_range_days: i64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            max_range_days: default_max_range_days(),
        }
    }
}

fn default_max_range_days() -> i64 {
    5
}

/// Outbound search / news-feed backend. Shared across requests, hence the
/// rate limit interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_search_timeout_s")]
    pub timeout_s: u64,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// Clamp for a server-suggested retry delay on 429 responses.
    #[serde(default = "default_max_retry_after_s")]
    pub max_retry_after_s: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            timeout_s: default_search_timeout_s(),
            min_interval_ms: default_min_interval_ms(),
            max_retry_after_s: default_max_retry_after_s(),
        }
    }
}

fn default_search_endpoint() -> String {
    "http://localhost:8080/digest".to_string()
}

fn default_search_timeout_s() -> u64 {
    10
}

fn default_min_interval_ms() -> u64 {
    1000
}

fn default_max_retry_after_s() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayConfig {
    /// `{year}` and `{country}` placeholders are substituted at call time.
    #[serde(default = "default_holiday_api_url")]
    pub api_url: String,
    #[serde(default = "default_holiday_country")]
    pub country: String,
}

impl Default for HolidayConfig {
    fn default() -> Self {
        Self {
            api_url: default_holiday_api_url(),
            country: default_holiday_country(),
        }
    }
}

fn default_holiday_api_url() -> String {
    "https://date.nager.at/api/v3/PublicHolidays/{year}/{country}".to_string()
}

fn default_holiday_country() -> String {
    "AU".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_section() {
        let config = PipaConfig::default();
        assert_eq!(config.temporal.max_range_days, 5);
        assert_eq!(config.music.max_volume_steps, 10);
        assert!(config.weather.default_entity.is_none());
        assert_eq!(config.news.categories.len(), NewsCategory::ALL.len());
        assert_eq!(config.home.max_retry_after_s, 10);
        assert_eq!(config.search.max_retry_after_s, 10);
    }

    #[test]
    fn home_retry_clamp_is_operator_configurable() {
        let yaml = r#"
home:
  max_retry_after_s: 3
"#;
        let config: PipaConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.home.max_retry_after_s, 3);
    }

    #[test]
    fn category_tables_deserialize_from_enum_keys() {
        let yaml = r#"
news:
  categories:
    tech:
      topics: ["科技"]
      anchors: ["科技"]
"#;
        let config: PipaConfig = serde_yaml::from_str(yaml).unwrap();
        let rule = config.news.categories.get(&NewsCategory::Tech).unwrap();
        assert_eq!(rule.topics, vec!["科技".to_string()]);
    }
}
