// crates/routes/src/format.rs
//
// Shared text shaping for voice-friendly output.

use regex::Regex;

pub struct Formatter {
    url_re: Regex,
    markup_re: Regex,
    video_tail_re: Regex,
    latin_run_re: Regex,
    cjk_run_re: Regex,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self {
            url_re: Regex::new(r"https?://\S+").expect("url pattern"),
            markup_re: Regex::new(r"<[^>]+>|&(?:amp|lt|gt|quot|nbsp|#\d+);").expect("markup pattern"),
            // Trailing "video"/"视频" markers: plain, bracketed or dashed.
            video_tail_re: Regex::new(
                r"(?i)[\s\-–—|:：·]*(?:[(\[（【]\s*)?(?:video|watch|视频)(?:\s*[)\]）】])?\s*$",
            )
            .expect("video tail pattern"),
            latin_run_re: Regex::new(r"[A-Za-z][A-Za-z0-9 ,.'&\-]{24,}").expect("latin run pattern"),
            cjk_run_re: Regex::new(r"[\u{4E00}-\u{9FFF}]+").expect("cjk run pattern"),
        }
    }

    /// Clamp to a character budget, appending an ellipsis when truncated.
    /// Operates on chars, never bytes.
    pub fn truncate_chars(&self, text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        out.push('…');
        out
    }

    pub fn strip_urls(&self, text: &str) -> String {
        self.url_re.replace_all(text, "").trim().to_string()
    }

    pub fn strip_markup(&self, text: &str) -> String {
        self.markup_re.replace_all(text, "").trim().to_string()
    }

    /// Remove trailing video markers from a title, repeatedly so stacked
    /// variants ("… - Video 视频") also come off.
    pub fn strip_video_tail(&self, title: &str) -> String {
        let mut current = title.trim().to_string();
        loop {
            let stripped = self.video_tail_re.replace(&current, "").trim().to_string();
            if stripped == current {
                return current;
            }
            current = stripped;
        }
    }

    /// Drop fragments of the wrong script when the caller requested a
    /// specific language. Short Latin tokens (product names, acronyms) stay
    /// even in Chinese output.
    pub fn enforce_language(&self, text: &str, language: Option<&str>) -> String {
        let Some(lang) = language else {
            return text.to_string();
        };

        let cleaned = if lang.starts_with("zh") {
            self.latin_run_re.replace_all(text, "").to_string()
        } else if lang.starts_with("en") {
            self.cjk_run_re.replace_all(text, "").to_string()
        } else {
            return text.to_string();
        };

        collapse_spaces(&cleaned)
    }

    /// Cap the number of rendered items for speakability.
    pub fn cap_items<T>(&self, items: Vec<T>, max: usize) -> (Vec<T>, usize) {
        if items.len() <= max {
            (items, 0)
        } else {
            let dropped = items.len() - max;
            (items.into_iter().take(max).collect(), dropped)
        }
    }
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending = false;
    for ch in text.chars() {
        if ch == ' ' {
            pending = true;
            continue;
        }
        if pending && !out.is_empty() {
            out.push(' ');
        }
        pending = false;
        out.push(ch);
    }
    out
}
