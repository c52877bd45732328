// crates/core/src/provider.rs
//
// Collaborator contracts. Each is implemented elsewhere (a reqwest client in
// production, mocks in tests) and consumed here as an opaque capability.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::Deserialize;
use serde_json::{Map as JsonMap, Value};

use crate::{NewsCategory, PipaResult};

/// State snapshot of a single entity.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: JsonMap<String, Value>,
}

impl EntityState {
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn attribute_f64(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastGranularity {
    Daily,
    Hourly,
}

impl ForecastGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastGranularity::Daily => "daily",
            ForecastGranularity::Hourly => "hourly",
        }
    }
}

/// One forecast slot as returned by the forecast provider. Fields are
/// optional because upstream payloads are not uniform across integrations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastEntry {
    #[serde(default)]
    pub datetime: String,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub templow: Option<f64>,
    #[serde(default)]
    pub precipitation: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
}

impl ForecastEntry {
    /// Calendar date of the slot, parsed leniently: RFC 3339 first, then a
    /// bare `YYYY-MM-DD` prefix. Malformed values yield `None` rather than
    /// an error.
    pub fn date(&self) -> Option<NaiveDate> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.datetime) {
            return Some(dt.date_naive());
        }
        let prefix = self.datetime.get(..10)?;
        NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
    }
}

/// Start or end of a calendar event: timed events carry `dateTime`, all-day
/// events carry `date`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default)]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl EventTime {
    pub fn is_all_day(&self) -> bool {
        self.date_time.is_none()
    }

    pub fn day(&self) -> Option<NaiveDate> {
        self.date_time
            .map(|dt| dt.date_naive())
            .or(self.date)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarEvent {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewsArticle {
    pub title: String,
    pub snippet: String,
    pub url: String,
    pub source: String,
    pub is_video: bool,
}

/// Home-automation platform: device state, service calls, forecast and
/// calendar data sources.
#[async_trait]
pub trait HomeApi: Send + Sync {
    async fn entity_state(&self, entity_id: &str) -> PipaResult<EntityState>;

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        payload: Value,
    ) -> PipaResult<Value>;

    async fn forecast(
        &self,
        entity_id: &str,
        granularity: ForecastGranularity,
    ) -> PipaResult<Vec<ForecastEntry>>;

    async fn calendar_events(
        &self,
        entity_id: &str,
        start_iso: &str,
        end_iso: &str,
    ) -> PipaResult<Vec<CalendarEvent>>;
}

/// Public-holiday list source, keyed by year.
#[async_trait]
pub trait HolidayApi: Send + Sync {
    async fn holidays(&self, year: i32) -> PipaResult<Vec<Holiday>>;
}

/// News-feed digest source.
#[async_trait]
pub trait NewsApi: Send + Sync {
    async fn digest(&self, category: NewsCategory, max: usize) -> PipaResult<Vec<NewsArticle>>;
}
