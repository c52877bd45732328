// crates/core/src/types.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Discrete category an utterance is classified into. Classification is total:
/// every utterance maps to exactly one value, defaulting to `OpenDomain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteType {
    StructuredWeather,
    StructuredCalendar,
    StructuredHoliday,
    StructuredState,
    StructuredMusic,
    SemiStructuredNews,
    OpenDomain,
}

impl RouteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteType::StructuredWeather => "structured_weather",
            RouteType::StructuredCalendar => "structured_calendar",
            RouteType::StructuredHoliday => "structured_holiday",
            RouteType::StructuredState => "structured_state",
            RouteType::StructuredMusic => "structured_music",
            RouteType::SemiStructuredNews => "semi_structured_news",
            RouteType::OpenDomain => "open_domain",
        }
    }

    /// Routes for which the temporal resolver runs before dispatch.
    pub fn is_date_sensitive(&self) -> bool {
        matches!(
            self,
            RouteType::StructuredWeather | RouteType::StructuredCalendar
        )
    }
}

/// News categories with per-category filtering rules. Typed key for the
/// configuration tables instead of free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NewsCategory {
    Tech,
    Finance,
    Sports,
    World,
    Local,
}

impl NewsCategory {
    pub const ALL: [NewsCategory; 5] = [
        NewsCategory::Tech,
        NewsCategory::Finance,
        NewsCategory::Sports,
        NewsCategory::World,
        NewsCategory::Local,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NewsCategory::Tech => "tech",
            NewsCategory::Finance => "finance",
            NewsCategory::Sports => "sports",
            NewsCategory::World => "world",
            NewsCategory::Local => "local",
        }
    }

    /// Spoken label used when rendering a digest.
    pub fn label(&self) -> &'static str {
        match self {
            NewsCategory::Tech => "科技",
            NewsCategory::Finance => "财经",
            NewsCategory::Sports => "体育",
            NewsCategory::World => "国际",
            NewsCategory::Local => "本地",
        }
    }
}

/// Script hint derived from the raw text. A hint only, never a hard gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Script {
    Chinese,
    Latin,
    Other,
}

impl Script {
    pub fn detect(text: &str) -> Self {
        let mut saw_latin = false;
        for ch in text.chars() {
            if ('\u{4E00}'..='\u{9FFF}').contains(&ch) || ('\u{3400}'..='\u{4DBF}').contains(&ch) {
                return Script::Chinese;
            }
            if ch.is_ascii_alphabetic() {
                saw_latin = true;
            }
        }
        if saw_latin {
            Script::Latin
        } else {
            Script::Other
        }
    }
}

/// A single request's utterance: raw input, normalized form, script hint.
/// Immutable after construction.
#[derive(Debug, Clone, Serialize)]
pub struct Utterance {
    pub raw: String,
    pub normalized: String,
    pub script: Script,
}

impl Utterance {
    pub fn new(raw: impl Into<String>, normalized: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalized.into();
        let script = Script::detect(&normalized);
        Self {
            raw,
            normalized,
            script,
        }
    }
}

/// Resolved temporal expression: a concrete date or date range anchored to
/// the caller-supplied "now".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TemporalQuery {
    Single {
        date: NaiveDate,
        /// Signed day distance from "now".
        offset: i64,
        label: String,
    },
    Range {
        start: NaiveDate,
        /// Invariant: `end >= start`.
        end: NaiveDate,
        label: String,
    },
}

impl TemporalQuery {
    pub fn single(date: NaiveDate, offset: i64, label: impl Into<String>) -> Self {
        TemporalQuery::Single {
            date,
            offset,
            label: label.into(),
        }
    }

    pub fn range(start: NaiveDate, end: NaiveDate, label: impl Into<String>) -> Self {
        debug_assert!(end >= start);
        TemporalQuery::Range {
            start,
            end,
            label: label.into(),
        }
    }

    pub fn start(&self) -> NaiveDate {
        match self {
            TemporalQuery::Single { date, .. } => *date,
            TemporalQuery::Range { start, .. } => *start,
        }
    }

    pub fn end(&self) -> NaiveDate {
        match self {
            TemporalQuery::Single { date, .. } => *date,
            TemporalQuery::Range { end, .. } => *end,
        }
    }

    /// Inclusive length in days, always >= 1.
    pub fn days(&self) -> i64 {
        (self.end() - self.start()).num_days() + 1
    }

    pub fn label(&self) -> &str {
        match self {
            TemporalQuery::Single { label, .. } => label,
            TemporalQuery::Range { label, .. } => label,
        }
    }
}

/// Response envelope for every front-door call. The contract is "always
/// return a RouteResult": nothing is raised across the external boundary.
#[derive(Debug, Clone, Serialize)]
pub struct RouteResult {
    pub ok: bool,
    pub route_type: RouteType,
    #[serde(rename = "final")]
    pub final_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RouteResult {
    /// Successful result with speakable text.
    pub fn speech(route_type: RouteType, final_text: impl Into<String>) -> Self {
        Self {
            ok: true,
            route_type,
            final_text: final_text.into(),
            error: None,
            data: None,
        }
    }

    /// Downstream failure or configuration gap, still delivered inside an
    /// `ok: true` envelope with a named error code and speakable text.
    pub fn degraded(
        route_type: RouteType,
        final_text: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            ok: true,
            route_type,
            final_text: final_text.into(),
            error: Some(error.into()),
            data: None,
        }
    }

    /// Pre-dispatch rejection of structurally invalid caller input. The only
    /// case that sets `ok: false`.
    pub fn rejected(
        route_type: RouteType,
        final_text: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            ok: false,
            route_type,
            final_text: final_text.into(),
            error: Some(error.into()),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_type_serializes_to_wire_names() {
        let json = serde_json::to_string(&RouteType::SemiStructuredNews).unwrap();
        assert_eq!(json, "\"semi_structured_news\"");
        assert_eq!(RouteType::StructuredWeather.as_str(), "structured_weather");
    }

    #[test]
    fn only_weather_and_calendar_are_date_sensitive() {
        assert!(RouteType::StructuredWeather.is_date_sensitive());
        assert!(RouteType::StructuredCalendar.is_date_sensitive());
        assert!(!RouteType::StructuredHoliday.is_date_sensitive());
        assert!(!RouteType::StructuredMusic.is_date_sensitive());
        assert!(!RouteType::OpenDomain.is_date_sensitive());
    }

    #[test]
    fn script_detection_prefers_chinese() {
        assert_eq!(Script::detect("帮我查一下 Home Assistant"), Script::Chinese);
        assert_eq!(Script::detect("what is the weather"), Script::Latin);
        assert_eq!(Script::detect("12345 !"), Script::Other);
    }

    #[test]
    fn range_days_is_inclusive() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        let q = TemporalQuery::range(start, end, "范围");
        assert_eq!(q.days(), 3);
    }

    #[test]
    fn final_field_uses_wire_name() {
        let result = RouteResult::speech(RouteType::OpenDomain, "好的");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["final"], "好的");
        assert!(json.get("error").is_none());
    }
}
