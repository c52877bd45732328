// crates/routes/src/calendar.rs

use std::cmp::Ordering;
use std::sync::Arc;

use pipa_core::{CalendarEvent, HomeApi, RouteResult, RouteType, TemporalQuery};
use tracing::warn;

const MAX_SPOKEN_EVENTS: usize = 3;

pub struct CalendarRoute {
    entity: Option<String>,
    home: Arc<dyn HomeApi>,
}

impl CalendarRoute {
    pub fn new(entity: Option<String>, home: Arc<dyn HomeApi>) -> Self {
        Self { entity, home }
    }

    pub async fn handle(&self, temporal: &TemporalQuery) -> RouteResult {
        let Some(entity) = self.entity.as_deref() else {
            return RouteResult::degraded(
                RouteType::StructuredCalendar,
                "尚未配置默认日历，请在配置的 calendar.default_entity 中设置。",
                "missing_calendar_entity",
            );
        };

        let start_iso = format!("{}T00:00:00", temporal.start());
        let end_iso = format!("{}T23:59:59", temporal.end());

        let mut events = match self
            .home
            .calendar_events(entity, &start_iso, &end_iso)
            .await
        {
            Ok(events) => events,
            Err(err) => {
                warn!(entity, error = %err, "Calendar lookup failed");
                return RouteResult::degraded(
                    RouteType::StructuredCalendar,
                    "抱歉，日历服务暂时不可用，请稍后再试。",
                    "upstream_failed",
                );
            }
        };

        let label = temporal.label();
        if events.is_empty() {
            return RouteResult::speech(
                RouteType::StructuredCalendar,
                format!("{}没有日程安排。", label),
            );
        }

        sort_events(&mut events);

        let total = events.len();
        let spoken: Vec<String> = events
            .iter()
            .take(MAX_SPOKEN_EVENTS)
            .map(describe_event)
            .collect();

        let mut text = format!("{}共有{}个日程：{}。", label, total, spoken.join("；"));
        if total > MAX_SPOKEN_EVENTS {
            text.push_str("其余已省略。");
        }

        RouteResult::speech(RouteType::StructuredCalendar, text)
    }
}

/// Timed events come before all-day events; timed events order by start
/// instant, all-day events by date.
fn sort_events(events: &mut [CalendarEvent]) {
    events.sort_by(|a, b| match (a.start.date_time, b.start.date_time) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.start.date.cmp(&b.start.date),
    });
}

fn describe_event(event: &CalendarEvent) -> String {
    let when = event
        .start
        .date_time
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| "全天".to_string());

    let mut text = format!("{}（{}", event.summary, when);
    if let Some(location) = event.location.as_deref() {
        if !location.is_empty() {
            text.push_str("，在");
            text.push_str(location);
        }
    }
    text.push('）');
    text
}
