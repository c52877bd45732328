// crates/routes/src/feeds.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use pipa_config::{HolidayConfig, NewsConfig, SearchConfig};
use pipa_core::{Clock, Holiday, HolidayApi, NewsApi, NewsArticle, NewsCategory, PipaError, PipaResult};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::rate_limit::RateLimiter;

/// Client for the two public feed backends: the holiday calendar API and the
/// search-based news digest. Both go through one rate limiter because they
/// share the outbound connection budget.
pub struct FeedClient {
    search: SearchConfig,
    holiday: HolidayConfig,
    client: Client,
    limiter: RateLimiter,
    queries: HashMap<NewsCategory, String>,
}

impl FeedClient {
    pub fn new(
        search: SearchConfig,
        holiday: HolidayConfig,
        news: &NewsConfig,
        clock: Arc<dyn Clock>,
    ) -> PipaResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(search.timeout_s))
            .build()
            .map_err(|e| PipaError::Network(e.to_string()))?;

        let queries = news
            .categories
            .iter()
            .map(|(category, rule)| (*category, category_query(*category, &rule.topics)))
            .collect();

        let limiter = RateLimiter::new(Duration::from_millis(search.min_interval_ms), clock);

        Ok(Self {
            search,
            holiday,
            client,
            limiter,
            queries,
        })
    }

    /// Send with a single retry on 429, honoring Retry-After up to the
    /// configured clamp.
    async fn send<F>(&self, build: F) -> PipaResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        self.limiter.acquire().await;

        let response = build()
            .send()
            .await
            .map_err(|e| PipaError::Network(format!("feed request failed: {}", e)))?;

        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            return check_status(response);
        }

        let delay_s = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(1)
            .min(self.search.max_retry_after_s);
        debug!(delay_s, "Feed backend rate limited, retrying once");
        tokio::time::sleep(Duration::from_secs(delay_s)).await;

        self.limiter.acquire().await;
        let retried = build()
            .send()
            .await
            .map_err(|e| PipaError::Network(format!("feed retry failed: {}", e)))?;
        check_status(retried)
    }
}

fn check_status(response: Response) -> PipaResult<Response> {
    if !response.status().is_success() {
        return Err(PipaError::Upstream(format!(
            "feed backend error: {}",
            response.status()
        )));
    }
    Ok(response)
}

fn category_query(category: NewsCategory, topics: &[String]) -> String {
    if topics.is_empty() {
        category.as_str().to_string()
    } else {
        topics.join(" OR ")
    }
}

fn holiday_url(template: &str, year: i32, country: &str) -> String {
    template
        .replace("{year}", &year.to_string())
        .replace("{country}", country)
}

/// Row shape of the public-holiday API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HolidayRow {
    date: NaiveDate,
    #[serde(default)]
    local_name: Option<String>,
    name: String,
}

impl From<HolidayRow> for Holiday {
    fn from(row: HolidayRow) -> Self {
        Holiday {
            date: row.date,
            name: row.local_name.unwrap_or(row.name),
        }
    }
}

/// Row shape of the search digest backend. Field aliases cover the common
/// SearXNG-style response keys.
#[derive(Debug, Default, Deserialize)]
struct DigestRow {
    #[serde(default)]
    title: String,
    #[serde(default, alias = "content")]
    snippet: String,
    #[serde(default)]
    url: String,
    #[serde(default, alias = "engine")]
    source: String,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DigestResponse {
    #[serde(default)]
    results: Vec<DigestRow>,
}

impl From<DigestRow> for NewsArticle {
    fn from(row: DigestRow) -> Self {
        let is_video = row.category.as_deref() == Some("videos")
            || Url::parse(&row.url)
                .ok()
                .and_then(|u| u.host_str().map(|h| h.contains("youtube") || h.contains("youtu.be")))
                .unwrap_or(false);

        NewsArticle {
            title: row.title,
            snippet: row.snippet,
            url: row.url,
            source: row.source,
            is_video,
        }
    }
}

#[async_trait]
impl HolidayApi for FeedClient {
    async fn holidays(&self, year: i32) -> PipaResult<Vec<Holiday>> {
        let url = holiday_url(&self.holiday.api_url, year, &self.holiday.country);
        let response = self.send(|| self.client.get(&url)).await?;

        let rows: Vec<HolidayRow> = response
            .json()
            .await
            .map_err(|e| PipaError::Upstream(format!("invalid holiday payload: {}", e)))?;
        Ok(rows.into_iter().map(Holiday::from).collect())
    }
}

#[async_trait]
impl NewsApi for FeedClient {
    async fn digest(&self, category: NewsCategory, max: usize) -> PipaResult<Vec<NewsArticle>> {
        let query = self
            .queries
            .get(&category)
            .cloned()
            .unwrap_or_else(|| category.as_str().to_string());
        let url = format!(
            "{}?q={}&format=json&limit={}",
            self.search.endpoint,
            urlencoding::encode(&query),
            max
        );

        let response = self.send(|| self.client.get(&url)).await?;
        let body: DigestResponse = response
            .json()
            .await
            .map_err(|e| PipaError::Upstream(format!("invalid digest payload: {}", e)))?;

        if body.results.is_empty() {
            warn!(category = category.as_str(), "Feed backend returned no results");
        }
        Ok(body.results.into_iter().map(NewsArticle::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holiday_url_substitutes_placeholders() {
        let url = holiday_url(
            "https://date.nager.at/api/v3/PublicHolidays/{year}/{country}",
            2025,
            "AU",
        );
        assert_eq!(url, "https://date.nager.at/api/v3/PublicHolidays/2025/AU");
    }

    #[test]
    fn holiday_row_prefers_local_name() {
        let row: HolidayRow = serde_json::from_str(
            r#"{"date": "2025-12-25", "localName": "Christmas Day", "name": "Christmas"}"#,
        )
        .unwrap();
        let holiday = Holiday::from(row);
        assert_eq!(holiday.name, "Christmas Day");
        assert_eq!(holiday.date, NaiveDate::from_ymd_opt(2025, 12, 25).unwrap());
    }

    #[test]
    fn digest_row_marks_video_results() {
        let row: DigestRow = serde_json::from_str(
            r#"{"title": "clip", "url": "https://www.youtube.com/watch?v=1", "engine": "yt"}"#,
        )
        .unwrap();
        let article = NewsArticle::from(row);
        assert!(article.is_video);
        assert_eq!(article.source, "yt");

        let row: DigestRow = serde_json::from_str(
            r#"{"title": "story", "url": "https://news.example.com/a", "content": "text"}"#,
        )
        .unwrap();
        let article = NewsArticle::from(row);
        assert!(!article.is_video);
        assert_eq!(article.snippet, "text");
    }

    #[test]
    fn category_query_joins_topics() {
        assert_eq!(
            category_query(NewsCategory::Tech, &["科技".to_string(), "ai".to_string()]),
            "科技 OR ai"
        );
        assert_eq!(category_query(NewsCategory::World, &[]), "world");
    }
}
