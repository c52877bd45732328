// tests/front_door.rs
//
// End-to-end checks through the front door with canned providers and a
// pinned clock. Monday 2025-03-10, 09:00 Melbourne time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use chrono_tz::Australia::Melbourne;
use pipa_config::PipaConfig;
use pipa_core::{
    CalendarEvent, EntityState, EventTime, FixedClock, ForecastEntry, ForecastGranularity,
    Holiday, HolidayApi, HomeApi, NewsApi, NewsArticle, NewsCategory, PipaResult, RouteType,
};
use pipa_routes::{FrontDoor, FrontDoorRequest};
use serde_json::Value;

#[derive(Default)]
struct CannedProviders {
    forecasts: Vec<ForecastEntry>,
    events: Vec<CalendarEvent>,
    holidays: Vec<Holiday>,
    articles: Vec<NewsArticle>,
}

#[async_trait]
impl HomeApi for CannedProviders {
    async fn entity_state(&self, entity_id: &str) -> PipaResult<EntityState> {
        Ok(EntityState {
            entity_id: entity_id.to_string(),
            state: "on".to_string(),
            attributes: serde_json::Map::new(),
        })
    }

    async fn call_service(&self, _: &str, _: &str, _: Value) -> PipaResult<Value> {
        Ok(Value::Null)
    }

    async fn forecast(&self, _: &str, _: ForecastGranularity) -> PipaResult<Vec<ForecastEntry>> {
        Ok(self.forecasts.clone())
    }

    async fn calendar_events(&self, _: &str, _: &str, _: &str) -> PipaResult<Vec<CalendarEvent>> {
        Ok(self.events.clone())
    }
}

#[async_trait]
impl HolidayApi for CannedProviders {
    async fn holidays(&self, _: i32) -> PipaResult<Vec<Holiday>> {
        Ok(self.holidays.clone())
    }
}

#[async_trait]
impl NewsApi for CannedProviders {
    async fn digest(&self, _: NewsCategory, _: usize) -> PipaResult<Vec<NewsArticle>> {
        Ok(self.articles.clone())
    }
}

fn front_door(config: PipaConfig, providers: CannedProviders) -> FrontDoor {
    let providers = Arc::new(providers);
    FrontDoor::new(
        &config,
        providers.clone(),
        providers.clone(),
        providers,
        Arc::new(FixedClock::at(Melbourne, 2025, 3, 10, 9, 0)),
    )
}

fn configured() -> PipaConfig {
    let mut config = PipaConfig::default();
    config.weather.default_entity = Some("weather.home".to_string());
    config.calendar.default_entity = Some("calendar.family".to_string());
    config
}

fn daily(date: &str, condition: &str, hi: f64, lo: f64) -> ForecastEntry {
    ForecastEntry {
        datetime: format!("{}T00:00:00+11:00", date),
        condition: Some(condition.to_string()),
        temperature: Some(hi),
        templow: Some(lo),
        precipitation: Some(0.0),
        wind_speed: Some(10.0),
    }
}

fn timed_event(summary: &str, start: &str) -> CalendarEvent {
    CalendarEvent {
        summary: summary.to_string(),
        start: EventTime {
            date_time: Some(DateTime::parse_from_rfc3339(start).unwrap()),
            date: None,
        },
        end: EventTime::default(),
        location: None,
    }
}

fn all_day_event(summary: &str, date: &str) -> CalendarEvent {
    CalendarEvent {
        summary: summary.to_string(),
        start: EventTime {
            date_time: None,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
        },
        end: EventTime::default(),
        location: None,
    }
}

fn news(title: &str, snippet: &str, url: &str, is_video: bool) -> NewsArticle {
    NewsArticle {
        title: title.to_string(),
        snippet: snippet.to_string(),
        url: url.to_string(),
        source: String::new(),
        is_video,
    }
}

#[tokio::test]
async fn weekend_weather_covers_both_days() {
    let providers = CannedProviders {
        forecasts: vec![
            daily("2025-03-14", "cloudy", 20.0, 12.0),
            daily("2025-03-15", "sunny", 24.0, 13.0),
            daily("2025-03-16", "rainy", 18.0, 11.0),
        ],
        ..CannedProviders::default()
    };

    let result = front_door(configured(), providers)
        .handle(&FrontDoorRequest::text("这个周末天气怎么样"))
        .await;

    assert!(result.ok);
    assert_eq!(result.route_type, RouteType::StructuredWeather);
    assert!(result.final_text.contains("3月15日"), "got: {}", result.final_text);
    assert!(result.final_text.contains("3月16日"), "got: {}", result.final_text);
    assert!(!result.final_text.contains("14日"), "got: {}", result.final_text);
}

#[tokio::test]
async fn missing_weather_entity_returns_guidance() {
    let mut config = configured();
    config.weather.default_entity = None;

    let result = front_door(config, CannedProviders::default())
        .handle(&FrontDoorRequest::text("明天天气怎么样"))
        .await;

    assert!(result.ok);
    assert_eq!(result.error.as_deref(), Some("missing_weather_entity"));
    assert!(result.final_text.contains("weather.default_entity"));
}

#[tokio::test]
async fn busy_day_speaks_three_events_and_elides_the_rest() {
    let providers = CannedProviders {
        events: vec![
            all_day_event("垃圾回收", "2025-03-11"),
            timed_event("牙医", "2025-03-11T15:30:00+11:00"),
            timed_event("早会", "2025-03-11T09:00:00+11:00"),
            all_day_event("生日", "2025-03-11"),
            timed_event("站会", "2025-03-11T14:00:00+11:00"),
        ],
        ..CannedProviders::default()
    };

    let result = front_door(configured(), providers)
        .handle(&FrontDoorRequest::text("明天有什么安排"))
        .await;

    assert!(result.ok);
    assert_eq!(result.route_type, RouteType::StructuredCalendar);
    assert!(result.final_text.contains("共有5个日程"), "got: {}", result.final_text);
    assert!(result.final_text.contains("其余已省略"), "got: {}", result.final_text);
    // Timed events lead, earliest first; the all-day tail is elided.
    assert!(result.final_text.contains("早会"));
    assert!(result.final_text.contains("站会"));
    assert!(result.final_text.contains("牙医"));
    assert!(!result.final_text.contains("生日"));
}

#[tokio::test]
async fn next_holiday_reports_countdown() {
    let providers = CannedProviders {
        holidays: vec![
            Holiday {
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                name: "元旦".to_string(),
            },
            Holiday {
                date: NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(),
                name: "某假日".to_string(),
            },
        ],
        ..CannedProviders::default()
    };

    let result = front_door(configured(), providers)
        .handle(&FrontDoorRequest::text("下一个公众假期是什么时候"))
        .await;

    assert!(result.ok);
    assert_eq!(result.route_type, RouteType::StructuredHoliday);
    assert!(result.final_text.contains("某假日"));
    assert!(result.final_text.contains("还有10天"), "got: {}", result.final_text);
}

#[tokio::test]
async fn news_digest_dedupes_and_drops_noise() {
    let providers = CannedProviders {
        articles: vec![
            news(
                "芯片新突破（视频）",
                "科技前沿报道",
                "https://a.example/tech/chip-breakthrough",
                true,
            ),
            news(
                "芯片新突破",
                "科技前沿报道",
                "https://b.example/news/chip-breakthrough-text",
                false,
            ),
            news("AI助手上线", "科技公司发布新品", "https://a.example/tech/ai-launch", false),
            news("【推广】某产品", "科技广告", "https://a.example/ads/promo", false),
        ],
        ..CannedProviders::default()
    };

    let result = front_door(configured(), providers)
        .handle(&FrontDoorRequest::text("今天有什么科技新闻"))
        .await;

    assert!(result.ok);
    assert_eq!(result.route_type, RouteType::SemiStructuredNews);
    assert!(result.final_text.contains("共2条"), "got: {}", result.final_text);
    assert!(result.final_text.contains("芯片新突破"));
    assert!(result.final_text.contains("AI助手上线"));
    assert!(!result.final_text.contains("推广"));
    // Video duplicate lost to the article copy, so no video tail remains.
    assert!(!result.final_text.contains("视频"));
}
