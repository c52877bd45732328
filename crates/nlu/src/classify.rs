// crates/nlu/src/classify.rs
//
// Keyword-set intent classification. Categories overlap lexically, so the
// membership tests run in a fixed priority order: holiday, calendar, weather,
// entity reference, music, news, then the open-domain fallback.

use std::collections::HashMap;

use pipa_core::{NewsCategory, RouteType};
use regex::Regex;
use tracing::{debug, warn};

const HOLIDAY_KEYWORDS: &[&str] = &[
    "公众假期",
    "公共假期",
    "节假日",
    "假日",
    "假期",
    "public holiday",
    "holidays",
];

// Recognition vocabulary is intentionally broader than the wording used in
// generated responses.
const CALENDAR_KEYWORDS: &[&str] = &[
    "日程",
    "行程",
    "安排",
    "提醒",
    "事件",
    "会议",
    "日历",
    "calendar",
    "schedule",
    "agenda",
    "appointment",
    "meeting",
];

const WEATHER_KEYWORDS: &[&str] = &[
    "天气",
    "气温",
    "温度",
    "下雨",
    "降雨",
    "降温",
    "气象",
    "weather",
    "forecast",
    "temperature",
    "rain",
];

const MUSIC_KEYWORDS: &[&str] = &[
    "播放",
    "暂停",
    "继续放",
    "放一首",
    "来一首",
    "放首歌",
    "放歌",
    "下一首",
    "上一首",
    "切歌",
    "音量",
    "静音",
    "大声",
    "小声",
    "pause",
    "volume",
    "mute",
    "unmute",
    "louder",
    "quieter",
];

const MUSIC_TOKENS: &[&str] = &["歌", "音乐", "歌曲", "一首"];

/// ASCII tokens too ambiguous to carry a match on their own.
const AMBIGUOUS_ASCII: &[&str] = &["home", "new", "the", "and"];

pub struct IntentClassifier {
    entity_re: Regex,
    wish_listen_re: Regex,
    play_word_re: Regex,
    news_topics: Vec<(NewsCategory, Vec<String>)>,
}

impl IntentClassifier {
    pub fn new(news_topics: &HashMap<NewsCategory, Vec<String>>) -> Self {
        // Domain-dot-object-id shape, restricted to known domains so that a
        // bare ambiguous token never looks like an entity reference.
        let entity_re = Regex::new(
            r"\b(light|switch|sensor|binary_sensor|climate|media_player|cover|fan|lock|vacuum|camera|person|device_tracker|input_boolean|scene|script|automation|humidifier|weather|calendar)\.[a-z0-9_]+\b",
        )
        .expect("entity id pattern");

        // "想…听" spanning up to ten characters handles natural requests that
        // contain no literal control verb, e.g. "我想在卧室听周杰伦".
        let wish_listen_re = Regex::new(r"想.{0,10}听").expect("wish-listen pattern");
        let play_word_re = Regex::new(r"\bplay\b").expect("play word pattern");

        let mut topics = Vec::new();
        for category in NewsCategory::ALL {
            let Some(words) = news_topics.get(&category) else {
                continue;
            };
            let mut kept = Vec::new();
            for word in words {
                let lower = word.to_lowercase();
                if lower.is_ascii() && (lower.chars().count() < 2 || AMBIGUOUS_ASCII.contains(&lower.as_str())) {
                    warn!(keyword = %word, "Dropping ambiguous news keyword");
                    continue;
                }
                kept.push(lower);
            }
            if !kept.is_empty() {
                topics.push((category, kept));
            }
        }

        Self {
            entity_re,
            wish_listen_re,
            play_word_re,
            news_topics: topics,
        }
    }

    /// Deterministic and total: always yields exactly one route type.
    pub fn classify(&self, normalized_text: &str) -> RouteType {
        let text = normalized_text.to_lowercase();

        let route = if self.is_holiday(&text) {
            RouteType::StructuredHoliday
        } else if contains_any(&text, CALENDAR_KEYWORDS) {
            RouteType::StructuredCalendar
        } else if self.is_weather(&text) {
            RouteType::StructuredWeather
        } else if self.entity_re.is_match(&text) {
            RouteType::StructuredState
        } else if self.is_music(&text) {
            RouteType::StructuredMusic
        } else if self.news_category(&text).is_some() {
            RouteType::SemiStructuredNews
        } else {
            RouteType::OpenDomain
        };

        debug!(route = route.as_str(), "Classified utterance");
        route
    }

    /// First entity-id shaped token in the text, if any.
    pub fn extract_entity_id(&self, text: &str) -> Option<String> {
        self.entity_re
            .find(&text.to_lowercase())
            .map(|m| m.as_str().to_string())
    }

    /// Which news category's topic table the text matches, in fixed category
    /// order. Used by the news route as well, so both sides agree.
    pub fn news_category(&self, text: &str) -> Option<NewsCategory> {
        let lower = text.to_lowercase();
        for (category, keywords) in &self.news_topics {
            if keywords.iter().any(|kw| lower.contains(kw.as_str())) {
                return Some(*category);
            }
        }
        None
    }

    fn is_holiday(&self, text: &str) -> bool {
        if contains_any(text, HOLIDAY_KEYWORDS) {
            return true;
        }
        // Region qualifier plus the holiday character.
        (text.contains("维州") || text.contains("victoria")) && text.contains('假')
    }

    fn is_weather(&self, text: &str) -> bool {
        if contains_any(text, WEATHER_KEYWORDS) {
            return true;
        }
        // "风" alone is too broad; require a compound.
        text.contains('风') && (text.contains('速') || text.contains('大'))
    }

    fn is_music(&self, text: &str) -> bool {
        if contains_any(text, MUSIC_KEYWORDS) || self.play_word_re.is_match(text) {
            return true;
        }
        if text.contains('听') && MUSIC_TOKENS.iter().any(|t| text.contains(t)) {
            return true;
        }
        self.wish_listen_re.is_match(text)
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}
