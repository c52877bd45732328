// crates/routes/src/news.rs

use std::collections::HashMap;
use std::sync::Arc;

use pipa_config::{CategoryRule, NewsConfig};
use pipa_core::{NewsApi, NewsArticle, NewsCategory, RouteResult, RouteType};
use tracing::{debug, warn};
use url::Url;

use crate::format::Formatter;

const MAX_TITLE_CHARS: usize = 60;

/// Path segments that carry no identity: the same article is often served
/// under an amp or index variant of its canonical path.
const NOISE_SEGMENTS: &[&str] = &["amp", "index.html", "index.htm", "index.php"];

pub struct NewsRoute {
    config: NewsConfig,
    news: Arc<dyn NewsApi>,
    formatter: Formatter,
}

impl NewsRoute {
    pub fn new(config: NewsConfig, news: Arc<dyn NewsApi>) -> Self {
        Self {
            config,
            news,
            formatter: Formatter::new(),
        }
    }

    pub async fn handle(&self, category: NewsCategory, language: Option<&str>) -> RouteResult {
        let articles = match self.news.digest(category, self.config.fetch_limit).await {
            Ok(articles) => articles,
            Err(err) => {
                warn!(category = category.as_str(), error = %err, "News fetch failed");
                return RouteResult::degraded(
                    RouteType::SemiStructuredNews,
                    "抱歉，新闻服务暂时不可用，请稍后再试。",
                    "upstream_failed",
                );
            }
        };

        let rule = self.config.categories.get(&category).cloned().unwrap_or_default();
        let fetched = articles.len();

        let filtered: Vec<NewsArticle> = articles
            .into_iter()
            .filter(|article| self.passes(article, &rule))
            .collect();
        let deduped = dedupe(filtered, &self.formatter);
        debug!(
            category = category.as_str(),
            fetched,
            kept = deduped.len(),
            "News digest filtered"
        );

        let (selected, _) = self.formatter.cap_items(deduped, self.config.max_items);
        if selected.is_empty() {
            return RouteResult::speech(
                RouteType::SemiStructuredNews,
                format!("暂时没有{}的新内容。", category.label()),
            );
        }

        let mut lines = Vec::with_capacity(selected.len());
        for (idx, article) in selected.iter().enumerate() {
            lines.push(format!(
                "{}、{}",
                idx + 1,
                self.render_title(article, language)
            ));
        }

        RouteResult::speech(
            RouteType::SemiStructuredNews,
            format!(
                "为您播报{}，共{}条：{}。",
                category.label(),
                selected.len(),
                lines.join("；")
            ),
        )
    }

    /// Host lists apply to the article URL; anchors must appear in the title
    /// or snippet, never in broader metadata.
    fn passes(&self, article: &NewsArticle, rule: &CategoryRule) -> bool {
        let title = article.title.to_lowercase();
        let snippet = article.snippet.to_lowercase();
        let host = Url::parse(&article.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .unwrap_or_default();

        if !rule.whitelist.is_empty()
            && !rule.whitelist.iter().any(|w| host.contains(&w.to_lowercase()))
        {
            return false;
        }

        let blocked = |needle: &String| {
            let needle = needle.to_lowercase();
            host.contains(&needle) || title.contains(&needle)
        };
        if rule.blacklist.iter().any(blocked) {
            return false;
        }
        if self.config.noise_blacklist.iter().any(|needle| {
            let needle = needle.to_lowercase();
            title.contains(&needle) || snippet.contains(&needle)
        }) {
            return false;
        }

        let mentions = |words: &[String]| {
            words.iter().any(|w| {
                let w = w.to_lowercase();
                title.contains(&w) || snippet.contains(&w)
            })
        };
        if !rule.anchors.is_empty() && !mentions(&rule.anchors) {
            return false;
        }
        // Anchors alone are not enough: the article must also carry one of
        // the category's topic words.
        if !rule.topics.is_empty() && !mentions(&rule.topics) {
            return false;
        }

        true
    }

    fn render_title(&self, article: &NewsArticle, language: Option<&str>) -> String {
        let mut title = self.formatter.strip_markup(&article.title);
        title = self.formatter.strip_urls(&title);
        title = self.formatter.strip_video_tail(&title);
        title = self.formatter.enforce_language(&title, language);
        title = self.formatter.truncate_chars(&title, MAX_TITLE_CHARS);

        if article.source.is_empty() {
            title
        } else {
            format!("{}（{}）", title, article.source)
        }
    }
}

/// Collapse duplicates by canonical URL path, then by normalized title.
/// When a video and a non-video copy of the same story both survive
/// filtering, the non-video copy wins.
fn dedupe(articles: Vec<NewsArticle>, formatter: &Formatter) -> Vec<NewsArticle> {
    let mut kept: Vec<NewsArticle> = Vec::with_capacity(articles.len());
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for article in articles {
        let mut keys = Vec::with_capacity(2);
        if let Some(key) = canonical_url_key(&article.url) {
            keys.push(key);
        }
        let title_key = formatter
            .strip_video_tail(&article.title)
            .to_lowercase()
            .split_whitespace()
            .collect::<String>();
        if !title_key.is_empty() {
            keys.push(format!("t:{}", title_key));
        }

        let existing = keys.iter().find_map(|k| by_key.get(k).copied());
        match existing {
            Some(idx) => {
                // The duplicate's keys still identify the same story, so a
                // later third copy matching only these keys collapses too.
                for key in keys {
                    by_key.insert(key, idx);
                }
                if kept[idx].is_video && !article.is_video {
                    kept[idx] = article;
                }
            }
            None => {
                let idx = kept.len();
                for key in keys {
                    by_key.insert(key, idx);
                }
                kept.push(article);
            }
        }
    }

    kept
}

/// Lowercased URL path with scheme, host, query and noise segments removed.
/// Mirror hosts serving the same path then collapse to one entry.
fn canonical_url_key(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let segments: Vec<String> = url
        .path_segments()?
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .filter(|s| !NOISE_SEGMENTS.contains(&s.as_str()))
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}
