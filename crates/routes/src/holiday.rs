// crates/routes/src/holiday.rs

use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate};
use chrono_tz::Tz;
use pipa_core::{Holiday, HolidayApi, RouteResult, RouteType};
use regex::Regex;
use tracing::warn;

const NEXT_INTENT_KEYWORDS: &[&str] = &["下一个", "下个", "最近", "next", "upcoming"];

pub struct HolidayRoute {
    provider: Arc<dyn HolidayApi>,
    year_re: Regex,
}

impl HolidayRoute {
    pub fn new(provider: Arc<dyn HolidayApi>) -> Self {
        Self {
            provider,
            year_re: Regex::new(r"(19|20)\d{2}").expect("year pattern"),
        }
    }

    pub async fn handle(&self, text: &str, now: DateTime<Tz>) -> RouteResult {
        let today = now.date_naive();
        let year = self
            .year_re
            .find(text)
            .and_then(|m| m.as_str().parse::<i32>().ok())
            .unwrap_or_else(|| today.year());

        let holidays = match self.provider.holidays(year).await {
            Ok(holidays) => holidays,
            Err(err) => {
                warn!(year, error = %err, "Holiday lookup failed");
                return RouteResult::degraded(
                    RouteType::StructuredHoliday,
                    format!("抱歉，无法获取{}年的假期信息。", year),
                    "upstream_failed",
                );
            }
        };

        if holidays.is_empty() {
            return RouteResult::speech(
                RouteType::StructuredHoliday,
                format!("没有找到{}年的公众假期信息。", year),
            );
        }

        let lower = text.to_lowercase();
        if NEXT_INTENT_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return RouteResult::speech(
                RouteType::StructuredHoliday,
                describe_next(&holidays, today, year),
            );
        }

        RouteResult::speech(
            RouteType::StructuredHoliday,
            format!("{}年共有{}个公众假期。", year, holidays.len()),
        )
    }
}

/// Nearest future-or-today entry, or a calm empty-state line.
fn describe_next(holidays: &[Holiday], today: NaiveDate, year: i32) -> String {
    let next = holidays
        .iter()
        .filter(|h| h.date >= today)
        .min_by_key(|h| h.date);

    match next {
        Some(holiday) => {
            let offset = (holiday.date - today).num_days();
            if offset == 0 {
                format!("今天就是{}。", holiday.name)
            } else {
                format!(
                    "下一个公众假期是{}（{}月{}日），还有{}天。",
                    holiday.name,
                    holiday.date.month(),
                    holiday.date.day(),
                    offset
                )
            }
        }
        None => format!("{}年剩下的时间里没有公众假期了。", year),
    }
}
