// crates/routes/src/lib.rs
//
// The structured route layer: classification result in, response envelope
// out. Every handler answers with a RouteResult, never an error.

use std::sync::Arc;

use pipa_config::PipaConfig;
use pipa_core::{Clock, HolidayApi, HomeApi, NewsApi, NewsCategory, RouteResult, RouteType};
use pipa_nlu::{utterance, IntentClassifier, TemporalResolver};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

pub mod calendar;
pub mod feeds;
pub mod format;
pub mod hass;
pub mod holiday;
pub mod music;
pub mod news;
pub mod rate_limit;
pub mod state;
pub mod weather;

pub use feeds::FeedClient;
pub use format::Formatter;
pub use hass::HassClient;
pub use rate_limit::RateLimiter;

use calendar::CalendarRoute;
use holiday::HolidayRoute;
use music::MusicRoute;
use news::NewsRoute;
use state::StateRoute;
use weather::WeatherRoute;

/// One inbound front-door call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrontDoorRequest {
    pub text: String,
    /// Output language override, e.g. "zh" or "en". Falls back to the
    /// configured default.
    #[serde(default)]
    pub language: Option<String>,
}

impl FrontDoorRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
        }
    }
}

/// Statically wired route handlers. One field per route type keeps dispatch
/// a plain match instead of a name registry.
pub struct Dispatcher {
    weather: WeatherRoute,
    calendar: CalendarRoute,
    holiday: HolidayRoute,
    state: StateRoute,
    music: MusicRoute,
    news: NewsRoute,
}

impl Dispatcher {
    pub fn new(
        config: &PipaConfig,
        home: Arc<dyn HomeApi>,
        holidays: Arc<dyn HolidayApi>,
        news: Arc<dyn NewsApi>,
    ) -> Self {
        Self {
            weather: WeatherRoute::new(config.weather.default_entity.clone(), home.clone()),
            calendar: CalendarRoute::new(config.calendar.default_entity.clone(), home.clone()),
            holiday: HolidayRoute::new(holidays),
            state: StateRoute::new(home.clone()),
            music: MusicRoute::new(config.music.clone(), home),
            news: NewsRoute::new(config.news.clone(), news),
        }
    }
}

/// Single entry point of the assistant: normalize, classify, resolve dates
/// when the route needs them, dispatch, and shape the envelope.
pub struct FrontDoor {
    classifier: IntentClassifier,
    resolver: TemporalResolver,
    dispatcher: Dispatcher,
    clock: Arc<dyn Clock>,
    language: String,
    debug_payload: bool,
}

impl FrontDoor {
    pub fn new(
        config: &PipaConfig,
        home: Arc<dyn HomeApi>,
        holidays: Arc<dyn HolidayApi>,
        news: Arc<dyn NewsApi>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let topics = config
            .news
            .categories
            .iter()
            .map(|(category, rule)| (*category, rule.topics.clone()))
            .collect();

        Self {
            classifier: IntentClassifier::new(&topics),
            resolver: TemporalResolver::new(config.temporal.max_range_days),
            dispatcher: Dispatcher::new(config, home, holidays, news),
            clock,
            language: config.app.language.clone(),
            debug_payload: config.app.debug_payload,
        }
    }

    pub async fn handle(&self, request: &FrontDoorRequest) -> RouteResult {
        if request.text.trim().is_empty() {
            return RouteResult::rejected(
                RouteType::OpenDomain,
                "我没有听清，请再说一遍。",
                "empty_input",
            );
        }

        let utt = utterance(&request.text);
        let route = self.classifier.classify(&utt.normalized);
        let now = self.clock.now();
        let language = request.language.as_deref().unwrap_or(&self.language);
        info!(route = route.as_str(), "Utterance classified");

        let mut temporal = None;
        let mut result = match route {
            RouteType::StructuredWeather => {
                let t = temporal.insert(self.resolver.resolve(&utt.normalized, now));
                self.dispatcher.weather.handle(t).await
            }
            RouteType::StructuredCalendar => {
                let t = temporal.insert(self.resolver.resolve(&utt.normalized, now));
                self.dispatcher.calendar.handle(t).await
            }
            RouteType::StructuredHoliday => {
                self.dispatcher.holiday.handle(&utt.normalized, now).await
            }
            RouteType::StructuredState => {
                let entity_id = self.classifier.extract_entity_id(&utt.normalized);
                self.dispatcher.state.handle(entity_id.as_deref()).await
            }
            RouteType::StructuredMusic => self.dispatcher.music.handle(&utt.normalized).await,
            RouteType::SemiStructuredNews => {
                let category = self
                    .classifier
                    .news_category(&utt.normalized)
                    .unwrap_or(NewsCategory::World);
                self.dispatcher.news.handle(category, Some(language)).await
            }
            // Nothing structured matched. Hand the normalized query through
            // for a downstream conversational engine to pick up.
            RouteType::OpenDomain => {
                RouteResult::speech(RouteType::OpenDomain, utt.normalized.clone())
            }
        };

        if self.debug_payload {
            result = result.with_data(json!({
                "normalized": utt.normalized,
                "script": utt.script,
                "route_type": route,
                "temporal": temporal,
            }));
        } else {
            result.data = None;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono_tz::Australia::Melbourne;
    use pipa_core::{
        CalendarEvent, EntityState, FixedClock, ForecastEntry, ForecastGranularity, Holiday,
        NewsArticle, PipaError, PipaResult,
    };
    use serde_json::Value;

    struct MockProviders;

    #[async_trait]
    impl HomeApi for MockProviders {
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

        async fn forecast(
            &self,
            _: &str,
            _: ForecastGranularity,
        ) -> PipaResult<Vec<ForecastEntry>> {
            Ok(vec![ForecastEntry {
                datetime: "2025-03-11T00:00:00+11:00".to_string(),
                condition: Some("sunny".to_string()),
                temperature: Some(24.0),
                templow: Some(13.0),
                precipitation: Some(0.0),
                wind_speed: Some(10.0),
            }])
        }

        async fn calendar_events(
            &self,
            _: &str,
            _: &str,
            _: &str,
        ) -> PipaResult<Vec<CalendarEvent>> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl HolidayApi for MockProviders {
        async fn holidays(&self, _: i32) -> PipaResult<Vec<Holiday>> {
            Err(PipaError::Upstream("offline".to_string()))
        }
    }

    #[async_trait]
    impl NewsApi for MockProviders {
        async fn digest(&self, _: NewsCategory, _: usize) -> PipaResult<Vec<NewsArticle>> {
            Ok(Vec::new())
        }
    }

    fn front_door(debug_payload: bool) -> FrontDoor {
        let mut config = PipaConfig::default();
        config.weather.default_entity = Some("weather.home".to_string());
        config.app.debug_payload = debug_payload;
        let providers = Arc::new(MockProviders);
        FrontDoor::new(
            &config,
            providers.clone(),
            providers.clone(),
            providers,
            Arc::new(FixedClock::at(Melbourne, 2025, 3, 10, 9, 0)),
        )
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let result = front_door(false).handle(&FrontDoorRequest::text("   ")).await;
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("empty_input"));
        assert!(!result.final_text.is_empty());
    }

    #[tokio::test]
    async fn weather_question_resolves_tomorrow_and_answers() {
        let result = front_door(false)
            .handle(&FrontDoorRequest::text("明天天气怎么样"))
            .await;
        assert!(result.ok);
        assert_eq!(result.route_type, RouteType::StructuredWeather);
        assert!(result.final_text.contains("明天"));
        assert!(result.final_text.contains("晴"));
    }

    #[tokio::test]
    async fn unmatched_text_hands_off_as_open_domain() {
        let result = front_door(false)
            .handle(&FrontDoorRequest::text("给我讲个故事"))
            .await;
        assert!(result.ok);
        assert_eq!(result.route_type, RouteType::OpenDomain);
        assert_eq!(result.final_text, "给我讲个故事");
    }

    #[tokio::test]
    async fn upstream_failure_stays_inside_the_envelope() {
        let result = front_door(false)
            .handle(&FrontDoorRequest::text("下一个假期是什么时候"))
            .await;
        assert!(result.ok);
        assert_eq!(result.error.as_deref(), Some("upstream_failed"));
        assert!(!result.final_text.is_empty());
    }

    #[tokio::test]
    async fn debug_payload_gate_controls_data() {
        let request = FrontDoorRequest::text("明天天气怎么样");
        let without = front_door(false).handle(&request).await;
        assert!(without.data.is_none());

        let with = front_door(true).handle(&request).await;
        let data = with.data.expect("debug payload");
        assert_eq!(data["route_type"], "structured_weather");
        assert_eq!(data["normalized"], "明天天气怎么样");
    }
}
