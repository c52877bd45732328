// crates/routes/src/weather.rs

use std::sync::Arc;

use chrono::Datelike;
use pipa_core::{ForecastEntry, ForecastGranularity, HomeApi, RouteResult, RouteType, TemporalQuery};
use tracing::warn;

pub struct WeatherRoute {
    entity: Option<String>,
    home: Arc<dyn HomeApi>,
}

impl WeatherRoute {
    pub fn new(entity: Option<String>, home: Arc<dyn HomeApi>) -> Self {
        Self { entity, home }
    }

    pub async fn handle(&self, temporal: &TemporalQuery) -> RouteResult {
        // Never silently guess an entity.
        let Some(entity) = self.entity.as_deref() else {
            return RouteResult::degraded(
                RouteType::StructuredWeather,
                "尚未配置默认天气实体，请在配置的 weather.default_entity 中设置，或直接调用天气查询能力。",
                "missing_weather_entity",
            );
        };

        let entries = match self.home.forecast(entity, ForecastGranularity::Daily).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(entity, error = %err, "Forecast lookup failed");
                return RouteResult::degraded(
                    RouteType::StructuredWeather,
                    "抱歉，天气服务暂时不可用，请稍后再试。",
                    "upstream_failed",
                );
            }
        };

        let selected: Vec<&ForecastEntry> = entries
            .iter()
            .filter(|entry| {
                entry
                    .date()
                    .map(|d| d >= temporal.start() && d <= temporal.end())
                    .unwrap_or(false)
            })
            .collect();

        if selected.is_empty() {
            return RouteResult::degraded(
                RouteType::StructuredWeather,
                format!("暂时没有{}的天气预报数据。", temporal.label()),
                "forecast_unavailable",
            );
        }

        let single_day = temporal.days() == 1;
        let mut lines = Vec::with_capacity(selected.len());
        for entry in &selected {
            let day_prefix = if single_day {
                temporal.label().to_string()
            } else {
                entry
                    .date()
                    .map(|d| format!("{}月{}日", d.month(), d.day()))
                    .unwrap_or_else(|| temporal.label().to_string())
            };
            lines.push(format!("{}{}", day_prefix, summarize(entry)));
        }

        RouteResult::speech(RouteType::StructuredWeather, lines.join("；"))
    }
}

fn summarize(entry: &ForecastEntry) -> String {
    let mut parts = Vec::new();

    if let Some(condition) = entry.condition.as_deref() {
        parts.push(translate_condition(condition).to_string());
    }

    match (entry.temperature, entry.templow) {
        (Some(hi), Some(lo)) => parts.push(format!("最高{:.0}度，最低{:.0}度", hi, lo)),
        (Some(hi), None) => parts.push(format!("气温约{:.0}度", hi)),
        _ => {}
    }

    // Humans get a rain statement, not a number dump.
    let rain = entry.precipitation.unwrap_or(0.0);
    if rain <= 0.0 {
        parts.push("预计无降雨".to_string());
    } else {
        parts.push(format!("预计有降雨约{:.0}毫米", rain));
    }

    if let Some(wind) = entry.wind_speed {
        parts.push(wind_band(wind).to_string());
    }

    format!("：{}", parts.join("，"))
}

/// Banded wind description instead of raw speed.
fn wind_band(kmh: f64) -> &'static str {
    if kmh < 15.0 {
        "微风"
    } else if kmh < 30.0 {
        "风比较大"
    } else {
        "风很大"
    }
}

fn translate_condition(condition: &str) -> &str {
    match condition {
        "sunny" => "晴",
        "clear" | "clear-night" => "晴朗",
        "partlycloudy" => "多云",
        "cloudy" => "阴",
        "rainy" => "有雨",
        "pouring" => "大雨",
        "lightning" | "lightning-rainy" => "雷雨",
        "snowy" => "有雪",
        "snowy-rainy" => "雨夹雪",
        "hail" => "冰雹",
        "fog" => "有雾",
        "windy" | "windy-variant" => "大风",
        "exceptional" => "极端天气",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wind_bands_are_three_way() {
        assert_eq!(wind_band(5.0), "微风");
        assert_eq!(wind_band(20.0), "风比较大");
        assert_eq!(wind_band(45.0), "风很大");
    }

    #[test]
    fn zero_precipitation_reads_as_no_rain() {
        let entry = ForecastEntry {
            datetime: "2025-03-11".to_string(),
            condition: Some("sunny".to_string()),
            temperature: Some(24.0),
            templow: Some(13.0),
            precipitation: Some(0.0),
            wind_speed: Some(10.0),
        };
        let text = summarize(&entry);
        assert!(text.contains("预计无降雨"));
        assert!(text.contains("晴"));
        assert!(text.contains("最高24度"));
        assert!(text.contains("微风"));
    }

    #[test]
    fn positive_precipitation_reads_as_rain() {
        let entry = ForecastEntry {
            precipitation: Some(6.4),
            ..Default::default()
        };
        assert!(summarize(&entry).contains("预计有降雨约6毫米"));
    }
}
